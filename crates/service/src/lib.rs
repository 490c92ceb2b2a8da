//! Service layer for per-user settings and branding.
//! - Separates business logic from data access (`models`).
//! - Settings resolve as "user value, else designated admin value" behind a TTL cache.
//! - Branding assets live on a blob backend and are referenced from settings.

pub mod errors;
pub mod best_effort;
pub mod metrics;
pub mod identity;
pub mod runtime;
#[cfg(test)]
pub mod test_support;
pub mod storage;
pub mod settings;
pub mod branding;
pub mod props;
