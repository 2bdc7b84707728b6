//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::config::Config;
use crate::kv::{KvError, KvStore};
use crate::store::FlagStore;
use crate::AppState;

/// Well-formed ConfigCat SDK key (two 22-character sections).
pub const CONFIGCAT_TEST_KEY: &str = "abcdefghijklmnopqrstuv/abcdefghijklmnopqrstuv";

/// In-process stand-in for Redis.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put_if_absent(&self, key: &str, value: &str) -> Result<bool, KvError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_owned(), value.to_owned());
        Ok(true)
    }
}

/// Configuration built only from the given variables, ignoring the real environment.
pub fn config_with(pairs: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config is valid")
}

/// Application state over a temporary database and an in-memory KV.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub kv: Arc<MemoryKv>,
    pub store: FlagStore,
    _dir: TempDir,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FlagStore::open(dir.path().join("flags.db"), 2).expect("open store");
        store.migrate().expect("migrate");
        let kv = Arc::new(MemoryKv::default());
        let state = AppState::new(config, kv.clone(), store.clone()).expect("build state");

        Self {
            state: Arc::new(state),
            kv,
            store,
            _dir: dir,
        }
    }
}
