use std::fmt;

use crate::settings::keys::{FAVICON, LOGO_DARK, LOGO_LIGHT};

/// Extension used when neither the file name nor the content tells us anything.
pub const FALLBACK_EXTENSION: &str = "png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BrandSlot {
    LogoDark,
    LogoLight,
    Favicon,
}

impl BrandSlot {
    pub const ALL: [BrandSlot; 3] = [BrandSlot::LogoDark, BrandSlot::LogoLight, BrandSlot::Favicon];

    /// Settings key holding the slot's stored path.
    pub fn setting_key(self) -> &'static str {
        match self {
            BrandSlot::LogoDark => LOGO_DARK,
            BrandSlot::LogoLight => LOGO_LIGHT,
            BrandSlot::Favicon => FAVICON,
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            BrandSlot::LogoDark => "logo-dark",
            BrandSlot::LogoLight => "logo-light",
            BrandSlot::Favicon => "favicon",
        }
    }

    /// Slot for an upload form field name (same as the settings key).
    pub fn from_field(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.setting_key() == name)
    }
}

impl fmt::Display for BrandSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting_key())
    }
}

/// An uploaded file as handed over by the request adapter.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(original_name: Option<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self { original_name, content_type, bytes }
    }

    /// Declared extension, else sniffed from content, else `png`.
    pub fn extension(&self) -> String {
        let ext = self
            .declared_extension()
            .or_else(|| sniff_extension(&self.bytes).map(str::to_string))
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        normalize_extension(&ext)
    }

    fn declared_extension(&self) -> Option<String> {
        let name = self.original_name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_string())
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.to_ascii_lowercase();
    if ext == "jpeg" {
        "jpg".to_string()
    } else {
        ext
    }
}

/// Guess an image extension from magic bytes.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("webp");
    }
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return Some("ico");
    }
    let head = &bytes[..bytes.len().min(256)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg")) {
        return Some("svg");
    }
    None
}

/// `logo-dark.png`, `favicon.ico`, ...
pub fn canonical_filename(slot: BrandSlot, file: &UploadedFile) -> String {
    format!("{}.{}", slot.file_stem(), file.extension())
}

/// Per-user directory that holds brand assets.
pub fn brand_directory(user_id: i32) -> String {
    format!("brand/{user_id}")
}
