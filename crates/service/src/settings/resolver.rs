//! Effective settings: a user's own value, else the designated admin's.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::keys::{BRANDING_KEYS, SALARY_SLIP_DEFAULT_KEYS};
use super::repository::AdminDirectory;
use super::store::SettingsStore;
use super::{ResolvedBundle, SettingsMap};
use crate::errors::ServiceError;
use crate::identity::Requester;

/// The single fallback rule for every setting: the user's value if present,
/// else the admin's, else nothing. Null and empty values count as absent.
///
/// ```
/// use service::settings::{resolver::resolve_value, SettingsMap};
/// let user: SettingsMap = [("favicon".to_string(), Some("u/favicon.png".to_string()))].into();
/// let admin: SettingsMap = [
///     ("favicon".to_string(), Some("a/favicon.png".to_string())),
///     ("logo_dark".to_string(), Some("a/logo.png".to_string())),
/// ].into();
/// assert_eq!(resolve_value("favicon", &user, &admin), Some("u/favicon.png"));
/// assert_eq!(resolve_value("logo_dark", &user, &admin), Some("a/logo.png"));
/// assert_eq!(resolve_value("logo_light", &user, &admin), None);
/// ```
pub fn resolve_value<'a>(key: &str, user: &'a SettingsMap, admin: &'a SettingsMap) -> Option<&'a str> {
    present(user, key).or_else(|| present(admin, key))
}

fn present<'a>(map: &'a SettingsMap, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(|v| v.as_deref())
        .filter(|v| !v.is_empty())
}

/// Apply [`resolve_value`] to each of `keys`; unresolved keys are left out.
pub fn merge(keys: &[&str], user: &SettingsMap, admin: &SettingsMap) -> ResolvedBundle {
    keys.iter()
        .filter_map(|k| resolve_value(k, user, admin).map(|v| (k.to_string(), v.to_string())))
        .collect()
}

/// Combines a requester's settings with the designated admin's.
#[derive(Clone)]
pub struct FallbackResolver {
    store: SettingsStore,
    directory: Arc<dyn AdminDirectory>,
}

impl FallbackResolver {
    /// `directory` is consulted for non-admin and anonymous requesters; pass a
    /// cached directory to avoid a lookup per request.
    pub fn new(store: SettingsStore, directory: Arc<dyn AdminDirectory>) -> Self {
        Self { store, directory }
    }

    /// The requester itself when it holds the admin role, otherwise the lowest-id admin.
    pub async fn resolve_admin_id(&self, requester: Option<&Requester>) -> Result<Option<i32>, ServiceError> {
        match requester {
            Some(r) if r.is_admin() => Ok(Some(r.id)),
            _ => self.directory.find_admin_user_id().await,
        }
    }

    #[instrument(skip(self, requester, keys), fields(user_id = requester.map(|r| r.id)))]
    pub async fn resolve(&self, requester: Option<&Requester>, keys: &[&str]) -> Result<ResolvedBundle, ServiceError> {
        let user_map = match requester {
            Some(r) => self.store.get_keys(r.id, keys).await?,
            None => SettingsMap::new(),
        };
        let admin_id = self.resolve_admin_id(requester).await?;
        let admin_map = match admin_id {
            // an admin requester is its own fallback; its map is already loaded
            Some(id) if requester.map(|r| r.id) == Some(id) => SettingsMap::new(),
            Some(id) => self.store.get_keys(id, keys).await?,
            None => SettingsMap::new(),
        };
        debug!(?admin_id, user_keys = user_map.len(), admin_keys = admin_map.len(), "settings resolved");
        Ok(merge(keys, &user_map, &admin_map))
    }

    pub async fn resolve_branding(&self, requester: Option<&Requester>) -> Result<ResolvedBundle, ServiceError> {
        self.resolve(requester, &BRANDING_KEYS).await
    }

    pub async fn resolve_salary_slip_defaults(&self, requester: Option<&Requester>) -> Result<ResolvedBundle, ServiceError> {
        self.resolve(requester, &SALARY_SLIP_DEFAULT_KEYS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::keys::{FAVICON, LOGO_DARK};
    use crate::settings::patch::SettingsPatch;
    use crate::settings::repository::mock::{MockSettingsRepository, StaticAdminDirectory};

    const ADMIN: i32 = 1;
    const USER: i32 = 2;

    fn map(pairs: &[(&str, Option<&str>)]) -> SettingsMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.map(str::to_string))).collect()
    }

    fn resolver(admin: Option<i32>) -> (SettingsStore, Arc<StaticAdminDirectory>, FallbackResolver) {
        let store = SettingsStore::new(Arc::new(MockSettingsRepository::default()));
        let directory = Arc::new(StaticAdminDirectory::new(admin));
        let resolver = FallbackResolver::new(store.clone(), directory.clone());
        (store, directory, resolver)
    }

    #[test]
    fn resolve_value_precedence_for_every_bundle_key() {
        for &key in BRANDING_KEYS.iter().chain(SALARY_SLIP_DEFAULT_KEYS.iter()) {
            let both = (map(&[(key, Some("user"))]), map(&[(key, Some("admin"))]));
            assert_eq!(resolve_value(key, &both.0, &both.1), Some("user"), "{key}: user wins");

            let admin_only = (SettingsMap::new(), map(&[(key, Some("admin"))]));
            assert_eq!(resolve_value(key, &admin_only.0, &admin_only.1), Some("admin"), "{key}: admin fills gap");

            let neither = (SettingsMap::new(), SettingsMap::new());
            assert_eq!(resolve_value(key, &neither.0, &neither.1), None, "{key}: absent");
        }
    }

    #[test]
    fn null_and_empty_fall_through() {
        let admin = map(&[("favicon", Some("a/favicon.png"))]);
        assert_eq!(resolve_value("favicon", &map(&[("favicon", None)]), &admin), Some("a/favicon.png"));
        assert_eq!(resolve_value("favicon", &map(&[("favicon", Some(""))]), &admin), Some("a/favicon.png"));
    }

    #[test]
    fn merge_leaves_out_unresolved_keys() {
        let user = map(&[("company_name", Some("Mine"))]);
        let admin = map(&[("company_address", Some("HQ"))]);
        let merged = merge(&SALARY_SLIP_DEFAULT_KEYS, &user, &admin);
        assert_eq!(merged.get("company_name").map(String::as_str), Some("Mine"));
        assert_eq!(merged.get("company_address").map(String::as_str), Some("HQ"));
        assert!(merge(&["logo_dark"], &user, &admin).is_empty());
    }

    #[tokio::test]
    async fn admin_requester_is_its_own_admin() -> anyhow::Result<()> {
        let (_store, directory, resolver) = resolver(Some(ADMIN));
        let me = Requester::new(9, ["admin"]);
        assert_eq!(resolver.resolve_admin_id(Some(&me)).await?, Some(9));
        assert_eq!(directory.lookups(), 0);

        let plain = Requester::new(USER, Vec::<String>::new());
        assert_eq!(resolver.resolve_admin_id(Some(&plain)).await?, Some(ADMIN));
        assert_eq!(resolver.resolve_admin_id(None).await?, Some(ADMIN));
        Ok(())
    }

    #[tokio::test]
    async fn user_without_settings_inherits_admin_logo() -> anyhow::Result<()> {
        let (store, _directory, resolver) = resolver(Some(ADMIN));
        store.upsert_patch(ADMIN, SettingsPatch::new().with(LOGO_DARK, Some("admin/logo.png".into()))).await?;

        let user = Requester::new(USER, Vec::<String>::new());
        let bundle = resolver.resolve_branding(Some(&user)).await?;
        assert_eq!(bundle.get(LOGO_DARK).map(String::as_str), Some("admin/logo.png"));
        Ok(())
    }

    #[tokio::test]
    async fn user_favicon_beats_admin_favicon() -> anyhow::Result<()> {
        let (store, _directory, resolver) = resolver(Some(ADMIN));
        store.upsert_patch(ADMIN, SettingsPatch::new().with(FAVICON, Some("a/favicon.png".into()))).await?;
        store.upsert_patch(USER, SettingsPatch::new().with(FAVICON, Some("u/favicon.png".into()))).await?;

        let user = Requester::new(USER, Vec::<String>::new());
        let bundle = resolver.resolve_branding(Some(&user)).await?;
        assert_eq!(bundle.get(FAVICON).map(String::as_str), Some("u/favicon.png"));
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_requester_gets_admin_values_only() -> anyhow::Result<()> {
        let (store, _directory, resolver) = resolver(Some(ADMIN));
        store.upsert_patch(ADMIN, SettingsPatch::new().with("company_name", Some("Admin Co".into()))).await?;
        store.upsert_patch(USER, SettingsPatch::new().with("company_name", Some("User Co".into()))).await?;

        let bundle = resolver.resolve_salary_slip_defaults(None).await?;
        assert_eq!(bundle.get("company_name").map(String::as_str), Some("Admin Co"));
        Ok(())
    }

    #[tokio::test]
    async fn no_admin_anywhere_yields_empty_bundle() -> anyhow::Result<()> {
        let (_store, _directory, resolver) = resolver(None);
        let user = Requester::new(USER, Vec::<String>::new());
        assert_eq!(resolver.resolve_admin_id(Some(&user)).await?, None);
        assert!(resolver.resolve_branding(Some(&user)).await?.is_empty());
        assert!(resolver.resolve_branding(None).await?.is_empty());
        Ok(())
    }
}
