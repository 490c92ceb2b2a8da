use async_trait::async_trait;

use super::SettingsMap;
use crate::errors::ServiceError;

/// Repository abstraction for per-user setting persistence.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_all(&self, user_id: i32) -> Result<SettingsMap, ServiceError>;
    /// Stored entries among `keys`; callers never pass an empty slice.
    async fn get_keys(&self, user_id: i32, keys: &[String]) -> Result<SettingsMap, ServiceError>;
    /// Atomic bulk upsert keyed on (user_id, key); returns the number of entries written.
    async fn upsert(&self, user_id: i32, entries: Vec<(String, Option<String>)>) -> Result<usize, ServiceError>;
}

/// Role-membership query used to find the designated admin.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Lowest user id holding the admin role, if any.
    async fn find_admin_user_id(&self) -> Result<Option<i32>, ServiceError>;
}

/// Simple in-memory mock repositories for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockSettingsRepository {
        rows: Mutex<HashMap<(i32, String), Option<String>>>, // key: (user_id, key)
        reads: AtomicUsize,
        writes: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockSettingsRepository {
        /// Number of read calls that reached the repository.
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        /// Number of upsert calls that reached the repository.
        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Make every subsequent call fail as if the database were unreachable.
        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), ServiceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ServiceError::Db("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SettingsRepository for MockSettingsRepository {
        async fn get_all(&self, user_id: i32) -> Result<SettingsMap, ServiceError> {
            self.check()?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|((uid, _), _)| *uid == user_id)
                .map(|((_, k), v)| (k.clone(), v.clone()))
                .collect())
        }

        async fn get_keys(&self, user_id: i32, keys: &[String]) -> Result<SettingsMap, ServiceError> {
            self.check()?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            let rows = self.rows.lock().unwrap();
            Ok(keys
                .iter()
                .filter_map(|k| rows.get(&(user_id, k.clone())).map(|v| (k.clone(), v.clone())))
                .collect())
        }

        async fn upsert(&self, user_id: i32, entries: Vec<(String, Option<String>)>) -> Result<usize, ServiceError> {
            self.check()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            let count = entries.len();
            for (k, v) in entries {
                rows.insert((user_id, k), v);
            }
            Ok(count)
        }
    }

    /// Directory answering with a fixed admin id and counting lookups.
    #[derive(Default)]
    pub struct StaticAdminDirectory {
        admin_id: Mutex<Option<i32>>,
        lookups: AtomicUsize,
    }

    impl StaticAdminDirectory {
        pub fn new(admin_id: Option<i32>) -> Self {
            Self { admin_id: Mutex::new(admin_id), lookups: AtomicUsize::new(0) }
        }

        pub fn set_admin(&self, admin_id: Option<i32>) {
            *self.admin_id.lock().unwrap() = admin_id;
        }

        pub fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdminDirectory for StaticAdminDirectory {
        async fn find_admin_user_id(&self) -> Result<Option<i32>, ServiceError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(*self.admin_id.lock().unwrap())
        }
    }
}
