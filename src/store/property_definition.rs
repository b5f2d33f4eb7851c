use crate::catalog::PropertyDefinition;
use crate::condition::{Matches, PropertyDefinitionCondition};
use crate::error::{MetaError, ResourceType};
use crate::kv::{KvEntry, Precondition, Txn};
use crate::store::codec::{decode, encode};
use crate::store::{DeleteReport, Store};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyDefinitionLookup {
    ByKey {
        partition: String,
        object_type: String,
        key: String,
        prefix: bool,
    },
    ByType {
        partition: String,
        object_type: String,
    },
    ByPartition {
        partition: String,
    },
    /// Every partition's definitions.
    Sieve,
}

impl PropertyDefinitionLookup {
    pub fn plan(condition: &PropertyDefinitionCondition) -> Self {
        let Some(partition) = condition.exact_partition() else {
            return PropertyDefinitionLookup::Sieve;
        };
        let Some(object_type) = condition.exact_type() else {
            return PropertyDefinitionLookup::ByPartition {
                partition: partition.to_string(),
            };
        };
        match condition.key_term() {
            Some((key, prefix)) => PropertyDefinitionLookup::ByKey {
                partition: partition.to_string(),
                object_type: object_type.to_string(),
                key: key.to_string(),
                prefix,
            },
            None => PropertyDefinitionLookup::ByType {
                partition: partition.to_string(),
                object_type: object_type.to_string(),
            },
        }
    }
}

impl Store {
    pub async fn create_property_definition(
        &self,
        definition: PropertyDefinition,
    ) -> Result<PropertyDefinition, MetaError> {
        definition.schema.check()?;
        let key = self.keys.property_definition(
            &definition.partition,
            &definition.object_type,
            &definition.key,
        )?;
        if !self.put_if_absent(key, encode(&definition)?).await? {
            return Err(MetaError::duplicate(
                ResourceType::PropertyDefinition,
                definition.display_id(),
            ));
        }
        Ok(definition)
    }

    /// Replaces schema, requiredness and permissions of an existing
    /// definition.
    pub async fn update_property_definition(
        &self,
        definition: PropertyDefinition,
    ) -> Result<PropertyDefinition, MetaError> {
        definition.schema.check()?;
        let key = self.keys.property_definition(
            &definition.partition,
            &definition.object_type,
            &definition.key,
        )?;
        let Some(entry) = self.kv_get(&key).await? else {
            return Err(MetaError::not_found(
                ResourceType::PropertyDefinition,
                definition.display_id(),
            ));
        };
        let txn = Txn::new()
            .require(Precondition::at_version(key.clone(), entry.version))
            .put(key, encode(&definition)?);
        if !self.kv_txn(txn).await?.succeeded {
            return Err(MetaError::conflict(
                ResourceType::PropertyDefinition,
                definition.display_id(),
            ));
        }
        Ok(definition)
    }

    pub async fn delete_property_definition(
        &self,
        partition: &str,
        object_type: &str,
        key: &str,
    ) -> Result<PropertyDefinition, MetaError> {
        let store_key = self.keys.property_definition(partition, object_type, key)?;
        let display = format!("{partition}/{object_type}/{key}");
        let Some(entry) = self.kv_get(&store_key).await? else {
            return Err(MetaError::not_found(ResourceType::PropertyDefinition, display));
        };
        let definition: PropertyDefinition = decode(&entry)?;
        let txn = Txn::new()
            .require(Precondition::at_version(store_key.clone(), entry.version))
            .delete(store_key);
        if !self.kv_txn(txn).await?.succeeded {
            return Err(MetaError::conflict(ResourceType::PropertyDefinition, display));
        }
        Ok(definition)
    }

    pub async fn get_property_definition(
        &self,
        partition: &str,
        object_type: &str,
        key: &str,
    ) -> Result<PropertyDefinition, MetaError> {
        let store_key = self.keys.property_definition(partition, object_type, key)?;
        match self.kv_get(&store_key).await? {
            Some(entry) => decode(&entry),
            None => Err(MetaError::not_found(
                ResourceType::PropertyDefinition,
                format!("{partition}/{object_type}/{key}"),
            )),
        }
    }

    /// All definitions constraining objects of `object_type` in `partition`.
    pub async fn property_definitions_for(
        &self,
        partition: &str,
        object_type: &str,
    ) -> Result<Vec<PropertyDefinition>, MetaError> {
        let prefix = self
            .keys
            .property_definitions_by_type(partition, object_type)?;
        self.kv_scan(prefix).await?.iter().map(decode).collect()
    }

    async fn run_property_definition_lookup(
        &self,
        lookup: &PropertyDefinitionLookup,
    ) -> Result<Vec<PropertyDefinition>, MetaError> {
        let entries: Vec<KvEntry> = match lookup {
            PropertyDefinitionLookup::ByKey {
                partition,
                object_type,
                key,
                prefix: false,
            } => {
                let store_key = self.keys.property_definition(partition, object_type, key)?;
                self.kv_get(&store_key).await?.into_iter().collect()
            }
            PropertyDefinitionLookup::ByKey {
                partition,
                object_type,
                key,
                prefix: true,
            } => {
                let prefix = self
                    .keys
                    .property_definition_key_prefix(partition, object_type, key)?;
                self.kv_scan(prefix).await?
            }
            PropertyDefinitionLookup::ByType {
                partition,
                object_type,
            } => {
                let prefix = self
                    .keys
                    .property_definitions_by_type(partition, object_type)?;
                self.kv_scan(prefix).await?
            }
            PropertyDefinitionLookup::ByPartition { partition } => {
                let prefix = self.keys.property_definitions_in_partition(partition)?;
                self.kv_scan(prefix).await?
            }
            PropertyDefinitionLookup::Sieve => {
                let mut all = Vec::new();
                for partition in self.list_partitions(None).await? {
                    let prefix = self.keys.property_definitions_in_partition(&partition.uuid)?;
                    all.extend(self.kv_scan(prefix).await?);
                }
                all
            }
        };
        entries.iter().map(decode).collect()
    }

    /// OR of `conditions`, each `(partition, type, key)` reported once.
    pub async fn list_property_definitions(
        &self,
        conditions: &[PropertyDefinitionCondition],
    ) -> Result<Vec<PropertyDefinition>, MetaError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for condition in conditions {
            let lookup = PropertyDefinitionLookup::plan(condition);
            for definition in self.run_property_definition_lookup(&lookup).await? {
                let id = (
                    definition.partition.clone(),
                    definition.object_type.clone(),
                    definition.key.clone(),
                );
                if condition.matches(&definition) && seen.insert(id) {
                    out.push(definition);
                }
            }
        }
        Ok(out)
    }

    pub async fn delete_property_definitions(
        &self,
        conditions: &[PropertyDefinitionCondition],
    ) -> Result<DeleteReport, MetaError> {
        let mut report = DeleteReport::default();
        for definition in self.list_property_definitions(conditions).await? {
            match self
                .delete_property_definition(
                    &definition.partition,
                    &definition.object_type,
                    &definition.key,
                )
                .await
            {
                Ok(_) => report.num_deleted += 1,
                Err(err) => {
                    debug!(
                        definition = %definition.display_id(),
                        error = %err,
                        "bulk property definition delete skipped"
                    );
                    report.errors.push(format!(
                        "{}: {}",
                        definition.display_id(),
                        err.public_message()
                    ));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyDefinitionLookup;
    use crate::catalog::{PropertyDefinition, PropertySchema, PropertyValueType};
    use crate::condition::PropertyDefinitionCondition;
    use crate::config::MetaConfig;
    use crate::error::MetaError;
    use crate::kv::MemoryKv;
    use crate::store::Store;
    use std::sync::Arc;

    async fn store_with_partitions() -> (Store, String, String) {
        let store = Store::open(Arc::new(MemoryKv::new()), MetaConfig::default())
            .await
            .expect("open");
        let a = store.create_partition("a", None).await.expect("a").uuid;
        let b = store.create_partition("b", None).await.expect("b").uuid;
        (store, a, b)
    }

    #[tokio::test]
    async fn tuple_is_unique_and_updatable() {
        let (store, a, _) = store_with_partitions().await;
        let def = PropertyDefinition::new(a.clone(), "machine", "vcpus")
            .with_schema(PropertySchema::of_type(PropertyValueType::Integer));
        store
            .create_property_definition(def.clone())
            .await
            .expect("create");
        assert!(matches!(
            store.create_property_definition(def.clone()).await,
            Err(MetaError::Duplicate { .. })
        ));
        let updated = store
            .update_property_definition(def.clone().required())
            .await
            .expect("update");
        assert!(
            store
                .get_property_definition(&a, "machine", "vcpus")
                .await
                .expect("get")
                .is_required
        );
        store
            .delete_property_definition(&a, "machine", "vcpus")
            .await
            .expect("delete");
        assert!(matches!(
            store.update_property_definition(updated).await,
            Err(MetaError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn listing_spans_partitions_and_dedupes() {
        let (store, a, b) = store_with_partitions().await;
        for (partition, key) in [(&a, "arch"), (&a, "arch-level"), (&b, "arch")] {
            store
                .create_property_definition(PropertyDefinition::new(
                    partition.clone(),
                    "machine",
                    key,
                ))
                .await
                .expect("create");
        }
        let by_prefix = PropertyDefinitionCondition::new()
            .in_partition(a.clone())
            .of_type("machine")
            .with_key_prefix("arch");
        assert!(matches!(
            PropertyDefinitionLookup::plan(&by_prefix),
            PropertyDefinitionLookup::ByKey { prefix: true, .. }
        ));
        let in_a = store
            .list_property_definitions(&[by_prefix.clone(), by_prefix])
            .await
            .expect("list");
        assert_eq!(in_a.len(), 2);

        let everywhere = PropertyDefinitionCondition::new().with_key("arch");
        assert_eq!(
            PropertyDefinitionLookup::plan(&everywhere),
            PropertyDefinitionLookup::Sieve
        );
        let arch = store
            .list_property_definitions(&[everywhere.clone()])
            .await
            .expect("sieve");
        assert_eq!(arch.len(), 2);

        let report = store
            .delete_property_definitions(&[everywhere])
            .await
            .expect("bulk delete");
        assert_eq!(report.num_deleted, 2);
        assert_eq!(
            store
                .property_definitions_for(&a, "machine")
                .await
                .expect("remaining")
                .len(),
            1
        );
    }
}
