use serde_json::json;
use tracing::info;

use crate::kv::{KvError, KvStore};
use crate::store::{FlagStore, StoreError};

/// Flag served by `/db` and described by the KV document.
const FLAG_NAME: &str = "iswinter";
const FLAG_KIND: &str = "boolean";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// What `ensure_fixtures` actually wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub flag_row: bool,
    pub kv_document: bool,
}

/// Make sure `/db` and `/kv` have something to read. Existing data is never
/// overwritten, so this is safe on every start.
pub async fn ensure_fixtures(
    store: &FlagStore,
    kv: &dyn KvStore,
    kv_key: &str,
) -> Result<SeedReport, SeedError> {
    let flag_row = store.ensure_flag(FLAG_NAME, FLAG_KIND, false).await?;
    let kv_document = kv
        .put_if_absent(kv_key, &kv_document().to_string())
        .await?;

    info!(flag_row, kv_document, kv_key, "fixtures checked");
    Ok(SeedReport {
        flag_row,
        kv_document,
    })
}

/// Shaped like a LaunchDarkly flag listing, so `/kv` and `/ldflag`
/// return comparable payloads.
fn kv_document() -> serde_json::Value {
    json!({
        "items": [{
            "key": FLAG_NAME,
            "name": FLAG_NAME,
            "kind": FLAG_KIND,
            "variations": [{"value": true}, {"value": false}],
            "environments": {
                "production": {"on": false, "offVariation": 1}
            }
        }],
        "totalCount": 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::get_json;
    use crate::testing::MemoryKv;

    #[tokio::test]
    async fn seeds_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlagStore::open(dir.path().join("flags.db"), 1).unwrap();
        store.migrate().unwrap();
        let kv = MemoryKv::default();

        let first = ensure_fixtures(&store, &kv, "ld").await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                flag_row: true,
                kv_document: true
            }
        );

        let second = ensure_fixtures(&store, &kv, "ld").await.unwrap();
        assert_eq!(second, SeedReport::default());

        let rows = store.flags_by_id(1).await.unwrap();
        assert_eq!(rows[0].name, "iswinter");
        assert_eq!(rows[0].value, Some(false));

        let doc = get_json(&kv, "ld").await.unwrap();
        assert_eq!(doc["items"][0]["key"], "iswinter");
    }

    #[tokio::test]
    async fn existing_kv_value_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlagStore::open(dir.path().join("flags.db"), 1).unwrap();
        store.migrate().unwrap();
        let kv = MemoryKv::default();
        kv.put_if_absent("ld", r#"{"mine":true}"#).await.unwrap();

        let report = ensure_fixtures(&store, &kv, "ld").await.unwrap();
        assert!(!report.kv_document);
        assert_eq!(get_json(&kv, "ld").await.unwrap(), json!({"mine": true}));
    }
}
