use crate::catalog::{ObjectType, Partition, ProviderType};
use crate::condition::{Matches, StringMatch, TypeCodeCondition};
use crate::error::{MetaError, ResourceType};
use crate::filter::{CatalogResolver, SearchTerm};
use crate::kv::{Precondition, Txn};
use crate::store::Store;
use crate::store::codec::{decode, encode};
use crate::type_cache::ObjectTypeSource;
use async_trait::async_trait;
use tracing::debug;

impl Store {
    /// Create-if-absent for each type. Returns how many were written; a
    /// type another writer got to first is skipped, not reported.
    pub async fn ensure_object_types(&self, types: &[ObjectType]) -> Result<usize, MetaError> {
        let mut created = 0;
        for object_type in types {
            let key = self.keys.object_type(&object_type.code)?;
            if self.put_if_absent(key, encode(object_type)?).await? {
                created += 1;
            } else {
                debug!(object_type = %object_type.code, "object type already seeded");
            }
        }
        Ok(created)
    }

    pub async fn ensure_provider_types(
        &self,
        types: &[ProviderType],
    ) -> Result<usize, MetaError> {
        let mut created = 0;
        for provider_type in types {
            let key = self.keys.provider_type(&provider_type.code)?;
            if self.put_if_absent(key, encode(provider_type)?).await? {
                created += 1;
            } else {
                debug!(provider_type = %provider_type.code, "provider type already seeded");
            }
        }
        Ok(created)
    }

    pub(crate) async fn put_if_absent(&self, key: String, value: Vec<u8>) -> Result<bool, MetaError> {
        let txn = Txn::new()
            .require(Precondition::absent(key.clone()))
            .put(key, value);
        Ok(self.kv_txn(txn).await?.succeeded)
    }

    pub async fn create_object_type(&self, object_type: ObjectType) -> Result<ObjectType, MetaError> {
        let key = self.keys.object_type(&object_type.code)?;
        if !self.put_if_absent(key, encode(&object_type)?).await? {
            return Err(MetaError::duplicate(
                ResourceType::ObjectType,
                object_type.code,
            ));
        }
        self.type_cache.insert(object_type.clone());
        Ok(object_type)
    }

    /// Uncached read; see [`Store::object_type`] for the cached path.
    pub async fn get_object_type(&self, code: &str) -> Result<ObjectType, MetaError> {
        let key = self.keys.object_type(code)?;
        match self.kv_get(&key).await? {
            Some(entry) => decode(&entry),
            None => Err(MetaError::not_found(ResourceType::ObjectType, code)),
        }
    }

    pub async fn object_type(&self, code: &str) -> Result<ObjectType, MetaError> {
        self.type_cache.get(self, code).await
    }

    pub async fn list_object_types(
        &self,
        term: Option<&StringMatch>,
    ) -> Result<Vec<ObjectType>, MetaError> {
        let prefix = positive_value(term);
        let condition = term.cloned().map(TypeCodeCondition);
        let mut out = Vec::new();
        for entry in self.kv_scan(self.keys.object_types_prefix(prefix)).await? {
            let object_type: ObjectType = decode(&entry)?;
            if condition.as_ref().is_none_or(|c| c.matches(&object_type)) {
                out.push(object_type);
            }
        }
        Ok(out)
    }

    pub async fn get_provider_type(&self, code: &str) -> Result<ProviderType, MetaError> {
        let key = self.keys.provider_type(code)?;
        match self.kv_get(&key).await? {
            Some(entry) => decode(&entry),
            None => Err(MetaError::not_found(ResourceType::ProviderType, code)),
        }
    }

    pub async fn list_provider_types(
        &self,
        term: Option<&StringMatch>,
    ) -> Result<Vec<ProviderType>, MetaError> {
        let prefix = positive_value(term);
        let condition = term.cloned().map(TypeCodeCondition);
        let mut out = Vec::new();
        for entry in self.kv_scan(self.keys.provider_types_prefix(prefix)).await? {
            let provider_type: ProviderType = decode(&entry)?;
            if condition.as_ref().is_none_or(|c| c.matches(&provider_type)) {
                out.push(provider_type);
            }
        }
        Ok(out)
    }
}

/// Key prefix a positive term narrows a catalog scan to.
fn positive_value(term: Option<&StringMatch>) -> &str {
    term.and_then(|t| t.exact_value().or(t.prefix_value()))
        .unwrap_or_default()
}

#[async_trait]
impl ObjectTypeSource for Store {
    async fn load_object_type(&self, code: &str) -> Result<ObjectType, MetaError> {
        self.get_object_type(code).await
    }
}

#[async_trait]
impl CatalogResolver for Store {
    async fn resolve_partitions(&self, term: &SearchTerm) -> Result<Vec<Partition>, MetaError> {
        self.list_partitions(Some(&term.to_match())).await
    }

    async fn resolve_object_types(
        &self,
        term: &SearchTerm,
    ) -> Result<Vec<ObjectType>, MetaError> {
        self.list_object_types(Some(&term.to_match())).await
    }
}
