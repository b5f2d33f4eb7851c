use crate::catalog::{ObjectScope, ObjectType};
use crate::error::MetaError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Where the cache reads object types from on a miss.
#[async_trait]
pub trait ObjectTypeSource: Send + Sync {
    async fn load_object_type(&self, code: &str) -> Result<ObjectType, MetaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Process-local read-through cache of object types.
///
/// Only successful loads are cached. The lock is never held across a load.
#[derive(Debug, Default)]
pub struct ObjectTypeCache {
    entries: RwLock<HashMap<String, ObjectType>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ObjectTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<S: ObjectTypeSource + ?Sized>(
        &self,
        source: &S,
        code: &str,
    ) -> Result<ObjectType, MetaError> {
        let cached = self.entries.read().get(code).cloned();
        if let Some(found) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(found);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let loaded = source.load_object_type(code).await?;
        self.insert(loaded.clone());
        Ok(loaded)
    }

    /// Scope of `code`, falling back to the coarser partition scope when the
    /// type cannot be loaded.
    pub async fn scope_of<S: ObjectTypeSource + ?Sized>(
        &self,
        source: &S,
        code: &str,
    ) -> ObjectScope {
        match self.get(source, code).await {
            Ok(object_type) => object_type.scope,
            Err(err) => {
                warn!(
                    object_type = code,
                    error = %err,
                    "object type unresolved, assuming partition scope"
                );
                ObjectScope::Partition
            }
        }
    }

    pub fn insert(&self, object_type: ObjectType) {
        self.entries
            .write()
            .insert(object_type.code.clone(), object_type);
    }

    pub fn invalidate(&self, code: &str) {
        self.entries.write().remove(code);
    }

    pub fn stats(&self) -> TypeCacheStats {
        TypeCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().len(),
        }
    }
}
