//! Catalog storage over a [`KvBackend`].
//!
//! Writes that touch a primary record and its indexes go out as a single
//! compare-and-write transaction; a failed precondition rejects the whole
//! write and is surfaced to the caller without retry. Reads either hit an
//! index directly or sieve the primary index (see [`ObjectLookup`]).

pub mod bootstrap;
pub mod catalog_types;
mod codec;
pub mod object;
pub mod object_definition;
pub mod partition;
pub mod property_definition;

pub use object::{DeleteReport, ObjectLookup};
pub use property_definition::PropertyDefinitionLookup;

use crate::catalog::types::{well_known_object_types, well_known_provider_types};
use crate::config::MetaConfig;
use crate::error::{KvError, MetaError};
use crate::keys::KeyCodec;
use crate::kv::{GetRequest, KvBackend, KvEntry, Txn, TxnOutcome};
use crate::type_cache::ObjectTypeCache;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

pub struct Store {
    kv: Arc<dyn KvBackend>,
    keys: KeyCodec,
    config: MetaConfig,
    type_cache: Arc<ObjectTypeCache>,
}

impl Store {
    pub async fn open(kv: Arc<dyn KvBackend>, config: MetaConfig) -> Result<Self, MetaError> {
        Self::open_with_cache(kv, config, Arc::new(ObjectTypeCache::new())).await
    }

    /// Opens a store that shares `type_cache` with other stores in the
    /// process.
    pub async fn open_with_cache(
        kv: Arc<dyn KvBackend>,
        config: MetaConfig,
        type_cache: Arc<ObjectTypeCache>,
    ) -> Result<Self, MetaError> {
        config.validate()?;
        info!(
            root_prefix = %config.root_prefix,
            request_timeout_ms = config.request_timeout_ms,
            max_scan_entries = config.max_scan_entries,
            bootstrap_token_pinned = config.bootstrap_token_sha256.is_some(),
            seed_well_known = config.seed_well_known,
            "metacat store config"
        );
        let store = Self {
            kv,
            keys: KeyCodec::new(config.root_prefix.clone()),
            config,
            type_cache,
        };
        if store.config.seed_well_known {
            store.seed_well_known().await?;
        }
        Ok(store)
    }

    /// Idempotent: entries another process already wrote are left alone.
    pub async fn seed_well_known(&self) -> Result<(), MetaError> {
        let object_types = self.ensure_object_types(&well_known_object_types()).await?;
        let provider_types = self
            .ensure_provider_types(&well_known_provider_types())
            .await?;
        let definitions = self.ensure_default_object_definitions().await?;
        info!(
            object_types,
            provider_types,
            definitions,
            "seeded well-known catalog entries"
        );
        Ok(())
    }

    pub fn keys(&self) -> &KeyCodec {
        &self.keys
    }

    pub fn config(&self) -> &MetaConfig {
        &self.config
    }

    pub fn type_cache(&self) -> &Arc<ObjectTypeCache> {
        &self.type_cache
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.kv
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, KvError>>,
    ) -> Result<T, MetaError> {
        match tokio::time::timeout(self.config.request_timeout(), call).await {
            Ok(result) => result.map_err(MetaError::from),
            Err(_) => Err(MetaError::Timeout {
                operation,
                timeout_ms: self.config.request_timeout_ms,
            }),
        }
    }

    pub(crate) async fn kv_get(&self, key: &str) -> Result<Option<KvEntry>, MetaError> {
        let entries = self
            .bounded("get", self.kv.get(GetRequest::key(key)))
            .await?;
        Ok(entries.into_iter().next())
    }

    /// Ordered prefix read capped at `max_scan_entries`. Hitting the cap is
    /// an error rather than a silently truncated result.
    pub(crate) async fn kv_scan(&self, prefix: String) -> Result<Vec<KvEntry>, MetaError> {
        let cap = self.config.max_scan_entries;
        let request = GetRequest::prefix(prefix.clone()).with_limit(cap.saturating_add(1));
        let entries = self.bounded("scan", self.kv.get(request)).await?;
        if entries.len() > cap {
            return Err(MetaError::InvalidInput(format!(
                "scan of '{prefix}' exceeds {cap} entries, narrow the filter"
            )));
        }
        Ok(entries)
    }

    pub(crate) async fn kv_put(&self, key: String, value: Vec<u8>) -> Result<(), MetaError> {
        self.bounded("put", self.kv.put(key, value)).await?;
        Ok(())
    }

    pub(crate) async fn kv_delete(&self, key: String) -> Result<u64, MetaError> {
        self.bounded("delete", self.kv.delete(key)).await
    }

    pub(crate) async fn kv_txn(&self, txn: Txn) -> Result<TxnOutcome, MetaError> {
        self.bounded("txn", self.kv.txn(txn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::config::MetaConfig;
    use crate::error::MetaError;
    use crate::kv::{KvBackend, MemoryKv};
    use std::sync::Arc;

    #[tokio::test]
    async fn open_rejects_invalid_config() {
        let kv: Arc<dyn KvBackend> = Arc::new(MemoryKv::new());
        let err = Store::open(kv, MetaConfig::default().with_root_prefix("a/b"))
            .await
            .err()
            .expect("invalid root");
        assert!(matches!(err, MetaError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn scan_cap_is_enforced() {
        let kv: Arc<dyn KvBackend> = Arc::new(MemoryKv::new());
        let store = Store::open(kv, MetaConfig::default().with_max_scan_entries(2))
            .await
            .expect("open");
        let prefix = store.keys().object_types_prefix("");
        let err = store.kv_scan(prefix).await.expect_err("three seeded types");
        assert!(matches!(err, MetaError::InvalidInput(_)));
    }
}
