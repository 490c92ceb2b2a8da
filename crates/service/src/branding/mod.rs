//! Brand asset uploads: canonical file names per slot, orphan cleanup and
//! presentation-ready URLs.

pub mod assets;
pub mod manager;

pub use assets::{BrandSlot, UploadedFile};
pub use manager::{BrandingAssetManager, BrandingUpdate, BrandingUpdateOutcome};
