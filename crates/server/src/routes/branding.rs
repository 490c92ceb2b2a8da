//! Multipart branding form. Upload limits are enforced here; the asset
//! manager trusts what it is given.

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use service::branding::{BrandSlot, BrandingUpdate, UploadedFile};

use crate::errors::ApiError;
use crate::identity::AuthUser;
use crate::state::AppState;

pub const MAX_FILE_BYTES: usize = 4 * 1024 * 1024;
pub const MAX_COMPANY_NAME_CHARS: usize = 255;
pub const MAX_COMPANY_ADDRESS_CHARS: usize = 1000;
/// Three files at the cap plus room for text fields and multipart framing.
pub const MAX_REQUEST_BYTES: usize = 3 * MAX_FILE_BYTES + 64 * 1024;

pub async fn post_branding(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let update = read_form(multipart).await?;
    if !update.is_empty() {
        state.branding.apply_update(&requester, update).await?;
    }
    Ok(Json(json!({"ok": true})))
}

async fn read_form(mut multipart: Multipart) -> Result<BrandingUpdate, ApiError> {
    let mut update = BrandingUpdate::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(slot) = BrandSlot::from_field(&name) {
            if let Some(file) = read_image(slot, field).await? {
                update = update.with_file(slot, file);
            }
            continue;
        }
        match name.as_str() {
            "company_name" => update.company_name = Some(read_text(field, &name, MAX_COMPANY_NAME_CHARS).await?),
            "company_address" => update.company_address = Some(read_text(field, &name, MAX_COMPANY_ADDRESS_CHARS).await?),
            _ => debug!(field = %name, "ignoring unknown branding field"),
        }
    }
    Ok(update)
}

async fn read_image(slot: BrandSlot, field: Field<'_>) -> Result<Option<UploadedFile>, ApiError> {
    let original_name = field.file_name().filter(|n| !n.is_empty()).map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(bad_request)?;
    // browsers send an empty part when no file was picked
    if bytes.is_empty() && original_name.is_none() {
        return Ok(None);
    }
    if !content_type.as_deref().is_some_and(is_image_mime) {
        return Err(ApiError::BadRequest(format!("{slot} must be an image")));
    }
    if bytes.len() > MAX_FILE_BYTES {
        return Err(ApiError::BadRequest(format!("{slot} must not exceed 4 MB")));
    }
    Ok(Some(UploadedFile::new(original_name, content_type, bytes.to_vec())))
}

async fn read_text(field: Field<'_>, name: &str, max_chars: usize) -> Result<String, ApiError> {
    let text = field.text().await.map_err(bad_request)?;
    if text.chars().count() > max_chars {
        return Err(ApiError::BadRequest(format!("{name} must not exceed {max_chars} characters")));
    }
    Ok(text)
}

fn is_image_mime(mime: &str) -> bool {
    matches!(
        mime.to_ascii_lowercase().as_str(),
        "image/png"
            | "image/jpeg"
            | "image/jpg"
            | "image/gif"
            | "image/webp"
            | "image/svg+xml"
            | "image/bmp"
            | "image/x-icon"
            | "image/vnd.microsoft.icon"
    )
}

fn bad_request(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(e.to_string())
}
