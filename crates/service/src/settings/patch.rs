//! Validated batch of setting writes.
//!
//! Inbound bags of arbitrary JSON are filtered here and nowhere else: keys must
//! match the allow-list pattern, values must be scalars (or null) and, once
//! stringified, no longer than [`super::keys::MAX_VALUE_CHARS`]. Offending entries are
//! dropped, never reported.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::keys::{affects_cached_bundles, is_valid_key, is_valid_value};
use crate::metrics;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    entries: BTreeMap<String, Option<String>>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter a raw JSON object down to the entries that pass the allow-list.
    pub fn sanitize(raw: &Map<String, Value>) -> Self {
        let mut patch = Self::new();
        let mut rejected = 0u64;
        for (key, value) in raw {
            let accepted = match coerce_scalar(value) {
                Some(v) => patch.insert(key.clone(), v),
                None => false,
            };
            if !accepted {
                rejected += 1;
                debug!(key = %key, "setting entry rejected");
            }
        }
        if rejected > 0 {
            metrics::SETTINGS_REJECTED_TOTAL.inc_by(rejected);
        }
        patch
    }

    /// Builder form of [`SettingsPatch::insert`].
    pub fn with(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add one entry; returns `false` (and keeps the patch unchanged) when the
    /// key or value fails the allow-list. A later insert of the same key wins.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) -> bool {
        let key = key.into();
        if !is_valid_key(&key) {
            return false;
        }
        if let Some(v) = &value {
            if !is_valid_value(v) {
                return false;
            }
        }
        self.entries.insert(key, value);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Option<String>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether any entry feeds a cached branding or salary slip bundle.
    pub fn affects_cached_bundles(&self) -> bool {
        self.keys().any(affects_cached_bundles)
    }

    pub fn into_entries(self) -> Vec<(String, Option<String>)> {
        self.entries.into_iter().collect()
    }
}

/// `None` rejects the value; `Some(None)` is an explicit null.
fn coerce_scalar(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        Value::Number(n) => Some(Some(n.to_string())),
        Value::Bool(b) => Some(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::keys::MAX_VALUE_CHARS;
    use serde_json::json;

    fn raw(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn keeps_scalars_and_coerces_to_strings() {
        let patch = SettingsPatch::sanitize(&raw(json!({
            "company_name": "Acme",
            "invoice_start": 1001,
            "tax_rate": 7.5,
            "show_logo": true,
            "company_address": null
        })));
        assert_eq!(patch.len(), 5);
        assert_eq!(patch.get("company_name"), Some(&Some("Acme".to_string())));
        assert_eq!(patch.get("invoice_start"), Some(&Some("1001".to_string())));
        assert_eq!(patch.get("tax_rate"), Some(&Some("7.5".to_string())));
        assert_eq!(patch.get("show_logo"), Some(&Some("true".to_string())));
        assert_eq!(patch.get("company_address"), Some(&None));
    }

    #[test]
    fn drops_bad_keys_composites_and_oversized_values() {
        let patch = SettingsPatch::sanitize(&raw(json!({
            "bad key!": "v",
            "": "empty",
            "nested": {"a": 1},
            "list": [1, 2],
            "huge": "x".repeat(MAX_VALUE_CHARS + 1),
            "ok": "fine"
        })));
        assert_eq!(patch.keys().collect::<Vec<_>>(), vec!["ok"]);
    }

    #[test]
    fn keys_longer_than_the_column_are_dropped() {
        let mut raw = Map::new();
        raw.insert("k".repeat(200), json!("v"));
        raw.insert("company_name".into(), json!("Acme"));
        let patch = SettingsPatch::sanitize(&raw);
        assert_eq!(patch.keys().collect::<Vec<_>>(), vec!["company_name"]);
    }

    #[test]
    fn insert_reports_rejection() {
        let mut patch = SettingsPatch::new();
        assert!(!patch.insert("no spaces", Some("v".into())));
        assert!(patch.insert("logo_dark", Some("a.png".into())));
        assert!(patch.insert("logo_dark", Some("b.png".into())));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("logo_dark"), Some(&Some("b.png".to_string())));
    }

    #[test]
    fn cached_bundle_detection() {
        assert!(!SettingsPatch::new().with("invoice_prefix", Some("INV".into())).affects_cached_bundles());
        assert!(SettingsPatch::new().with("favicon", Some("f.ico".into())).affects_cached_bundles());
    }
}
