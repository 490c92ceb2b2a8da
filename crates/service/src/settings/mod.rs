//! Per-user settings: storage, admin fallback and cached resolution.
//!
//! Layers, leaves first: [`store::SettingsStore`] persists sanitized
//! [`patch::SettingsPatch`]es, [`resolver::FallbackResolver`] merges a user's
//! values over the designated admin's, [`cache::SettingsCache`] memoizes the
//! merged bundles, and [`service::SettingsService`] ties writes to eviction.

use std::collections::BTreeMap;

pub mod keys;
pub mod patch;
pub mod repository;
pub mod repo;
pub mod store;
pub mod resolver;
pub mod cache;
pub mod service;

pub use service::SettingsService;

/// Stored settings of one user: key to optional value.
pub type SettingsMap = BTreeMap<String, Option<String>>;

/// Result of a fallback merge: only keys that resolved to a value.
pub type ResolvedBundle = BTreeMap<String, String>;
