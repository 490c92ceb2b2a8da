//! Setting keys the settings layer knows by name, and the key/value allow-list.

use once_cell::sync::Lazy;
use regex::Regex;

pub const LOGO_DARK: &str = "logo_dark";
pub const LOGO_LIGHT: &str = "logo_light";
pub const FAVICON: &str = "favicon";
pub const FAVICON_V: &str = "favicon_v";
pub const COMPANY_NAME: &str = "company_name";
pub const COMPANY_ADDRESS: &str = "company_address";

/// Keys merged into the branding bundle.
pub const BRANDING_KEYS: [&str; 6] = [LOGO_DARK, LOGO_LIGHT, FAVICON, FAVICON_V, COMPANY_NAME, COMPANY_ADDRESS];

/// Keys merged into the salary slip defaults bundle.
pub const SALARY_SLIP_DEFAULT_KEYS: [&str; 2] = [COMPANY_NAME, COMPANY_ADDRESS];

/// Longest accepted key; matches the `setting.key` column width.
pub const MAX_KEY_CHARS: usize = 191;

/// Longest accepted value, in characters.
pub const MAX_VALUE_CHARS: usize = 10_000;

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("setting key pattern compiles"));

pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_CHARS && KEY_PATTERN.is_match(key)
}

pub fn is_valid_value(value: &str) -> bool {
    value.chars().count() <= MAX_VALUE_CHARS
}

/// Whether a write to `key` can change a cached branding or salary slip bundle.
pub fn affects_cached_bundles(key: &str) -> bool {
    BRANDING_KEYS.contains(&key) || SALARY_SLIP_DEFAULT_KEYS.contains(&key)
}
