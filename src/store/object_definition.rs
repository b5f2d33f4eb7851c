use crate::catalog::ObjectDefinition;
use crate::catalog::schema::default_provider_definition;
use crate::error::{MetaError, ResourceType};
use crate::store::Store;
use crate::store::codec::{decode, encode};
use tracing::debug;

impl Store {
    /// Unconditional write of a global (`partition: None`) or
    /// partition-specific definition.
    pub async fn put_object_definition(
        &self,
        definition: ObjectDefinition,
    ) -> Result<ObjectDefinition, MetaError> {
        definition.check()?;
        let key = self.object_definition_key(&definition)?;
        self.kv_put(key, encode(&definition)?).await?;
        Ok(definition)
    }

    /// Writes `definition` only when nothing is stored at its key yet.
    pub async fn ensure_object_definition(
        &self,
        definition: &ObjectDefinition,
    ) -> Result<bool, MetaError> {
        definition.check()?;
        let key = self.object_definition_key(definition)?;
        self.put_if_absent(key, encode(definition)?).await
    }

    /// Partition override when one exists, otherwise the global default.
    pub async fn get_object_definition(
        &self,
        object_type: &str,
        partition: Option<&str>,
    ) -> Result<ObjectDefinition, MetaError> {
        if let Some(partition) = partition.filter(|p| !p.is_empty()) {
            let key = self.keys.object_definition(object_type, Some(partition))?;
            if let Some(entry) = self.kv_get(&key).await? {
                return decode(&entry);
            }
            debug!(object_type, partition, "no partition object definition, using global");
        }
        let key = self.keys.object_definition(object_type, None)?;
        match self.kv_get(&key).await? {
            Some(entry) => decode(&entry),
            None => Err(MetaError::not_found(
                ResourceType::ObjectDefinition,
                object_type,
            )),
        }
    }

    pub async fn delete_object_definition(
        &self,
        object_type: &str,
        partition: Option<&str>,
    ) -> Result<(), MetaError> {
        let key = self
            .keys
            .object_definition(object_type, partition.filter(|p| !p.is_empty()))?;
        if self.kv_delete(key).await? == 0 {
            let id = match partition {
                Some(partition) if !partition.is_empty() => format!("{partition}/{object_type}"),
                _ => object_type.to_string(),
            };
            return Err(MetaError::not_found(ResourceType::ObjectDefinition, id));
        }
        Ok(())
    }

    pub async fn ensure_default_object_definitions(&self) -> Result<usize, MetaError> {
        let created = self
            .ensure_object_definition(&default_provider_definition())
            .await?;
        Ok(usize::from(created))
    }

    fn object_definition_key(&self, definition: &ObjectDefinition) -> Result<String, MetaError> {
        let partition = definition.partition.as_deref().filter(|p| !p.is_empty());
        self.keys
            .object_definition(&definition.object_type, partition)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::ObjectDefinition;
    use crate::catalog::types::PROVIDER_OBJECT_TYPE;
    use crate::config::MetaConfig;
    use crate::error::MetaError;
    use crate::kv::MemoryKv;
    use crate::store::Store;
    use std::sync::Arc;

    const P1: &str = "00000000-0000-4000-8000-0000000000b1";

    #[tokio::test]
    async fn partition_override_falls_back_to_global() {
        let store = Store::open(Arc::new(MemoryKv::new()), MetaConfig::default())
            .await
            .expect("open");
        let global = store
            .get_object_definition(PROVIDER_OBJECT_TYPE, Some(P1))
            .await
            .expect("seeded default");
        assert!(global.is_global());

        let override_def = ObjectDefinition::new(PROVIDER_OBJECT_TYPE, r#"{"type":"object"}"#)
            .for_partition(P1);
        store
            .put_object_definition(override_def.clone())
            .await
            .expect("put");
        assert_eq!(
            store
                .get_object_definition(PROVIDER_OBJECT_TYPE, Some(P1))
                .await
                .expect("override"),
            override_def
        );
        assert_eq!(
            store
                .get_object_definition(PROVIDER_OBJECT_TYPE, None)
                .await
                .expect("global"),
            global
        );

        store
            .delete_object_definition(PROVIDER_OBJECT_TYPE, Some(P1))
            .await
            .expect("delete");
        assert!(matches!(
            store.delete_object_definition(PROVIDER_OBJECT_TYPE, Some(P1)).await,
            Err(MetaError::NotFound { .. })
        ));
        assert!(matches!(
            store.get_object_definition("machine", None).await,
            Err(MetaError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn ensure_does_not_overwrite_and_rejects_bad_json() {
        let store = Store::open(Arc::new(MemoryKv::new()), MetaConfig::default())
            .await
            .expect("open");
        assert_eq!(
            store.ensure_default_object_definitions().await.expect("again"),
            0
        );
        let bad = ObjectDefinition::new("machine", "{not json");
        assert!(matches!(
            store.put_object_definition(bad).await,
            Err(MetaError::InvalidInput(_))
        ));
    }
}
