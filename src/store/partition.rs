use crate::catalog::{Partition, normalize_uuid, parse_uuid};
use crate::condition::{Matches, PartitionSearchCondition, StringMatch};
use crate::error::{MetaError, ResourceType};
use crate::keys::validate_segment;
use crate::kv::{Precondition, Txn};
use crate::store::Store;
use crate::store::codec::{decode, decode_index, encode};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl Store {
    pub async fn create_partition(
        &self,
        name: &str,
        uuid: Option<&str>,
    ) -> Result<Partition, MetaError> {
        let partition = self.new_partition(name, uuid)?;
        let txn = self.partition_create_txn(Txn::new(), &partition)?;
        let outcome = self.kv_txn(txn).await?;
        if !outcome.succeeded {
            return Err(partition_duplicate(&partition, outcome.failed_precondition, 0));
        }
        info!(partition = %partition.uuid, name = %partition.name, "partition created");
        Ok(partition)
    }

    pub(crate) fn new_partition(
        &self,
        name: &str,
        uuid: Option<&str>,
    ) -> Result<Partition, MetaError> {
        validate_segment("partition name", name)?;
        // `get_partition` reads uuid-shaped input as a uuid.
        if parse_uuid(name).is_some() {
            return Err(MetaError::InvalidInput(format!(
                "partition name '{name}' must not be a uuid"
            )));
        }
        let uuid = normalize_uuid(uuid.unwrap_or_default())?;
        Ok(Partition::new(uuid, name))
    }

    /// Appends the create-if-absent checks and writes for `partition` to
    /// `txn`.
    pub(crate) fn partition_create_txn(
        &self,
        txn: Txn,
        partition: &Partition,
    ) -> Result<Txn, MetaError> {
        let by_uuid = self.keys.partition_by_uuid(&partition.uuid)?;
        let by_name = self.keys.partition_by_name(&partition.name)?;
        Ok(txn
            .require(Precondition::absent(by_uuid.clone()))
            .require(Precondition::absent(by_name.clone()))
            .put(by_uuid, encode(partition)?)
            .put(by_name, partition.uuid.as_bytes().to_vec()))
    }

    pub async fn get_partition_by_uuid(&self, uuid: &str) -> Result<Partition, MetaError> {
        let Some(normalized) = parse_uuid(uuid) else {
            return Err(MetaError::not_found(ResourceType::Partition, uuid));
        };
        let key = self.keys.partition_by_uuid(&normalized)?;
        match self.kv_get(&key).await? {
            Some(entry) => decode(&entry),
            None => Err(MetaError::not_found(ResourceType::Partition, uuid)),
        }
    }

    pub async fn get_partition_by_name(&self, name: &str) -> Result<Partition, MetaError> {
        let key = self.keys.partition_by_name(name)?;
        let Some(entry) = self.kv_get(&key).await? else {
            return Err(MetaError::not_found(ResourceType::Partition, name));
        };
        let uuid = decode_index(&entry)?;
        match self.get_partition_by_uuid(&uuid).await {
            Err(MetaError::NotFound { .. }) => {
                debug!(key = %entry.key, uuid = %uuid, "dangling partition name index entry");
                Err(MetaError::not_found(ResourceType::Partition, name))
            }
            other => other,
        }
    }

    /// Resolves a uuid-shaped identifier by uuid and anything else by name.
    pub async fn get_partition(&self, uuid_or_name: &str) -> Result<Partition, MetaError> {
        if parse_uuid(uuid_or_name).is_some() {
            self.get_partition_by_uuid(uuid_or_name).await
        } else {
            self.get_partition_by_name(uuid_or_name).await
        }
    }

    /// Partitions whose uuid or name satisfies `term`, ordered by name.
    /// A positive term narrows both indexes to its value as a key prefix.
    pub async fn list_partitions(
        &self,
        term: Option<&StringMatch>,
    ) -> Result<Vec<Partition>, MetaError> {
        let narrowed = term.and_then(|t| t.exact_value().or(t.prefix_value()));
        let mut found: BTreeMap<String, Partition> = BTreeMap::new();

        let uuid_prefix = narrowed.map(str::to_ascii_lowercase).unwrap_or_default();
        for entry in self
            .kv_scan(self.keys.partitions_by_uuid_prefix(&uuid_prefix))
            .await?
        {
            let partition: Partition = decode(&entry)?;
            found.insert(partition.uuid.clone(), partition);
        }

        if let Some(value) = narrowed {
            for entry in self
                .kv_scan(self.keys.partitions_by_name_prefix(value))
                .await?
            {
                let uuid = decode_index(&entry)?;
                if found.contains_key(&uuid) {
                    continue;
                }
                match self.get_partition_by_uuid(&uuid).await {
                    Ok(partition) => {
                        found.insert(partition.uuid.clone(), partition);
                    }
                    Err(MetaError::NotFound { .. }) => {
                        debug!(key = %entry.key, uuid = %uuid, "dangling partition name index entry");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        let condition = term.cloned().map(PartitionSearchCondition);
        let mut partitions: Vec<Partition> = found
            .into_values()
            .filter(|p| condition.as_ref().is_none_or(|c| c.matches(p)))
            .collect();
        partitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(partitions)
    }
}

/// Maps the failed precondition of a partition create back to the index
/// that collided. `offset` is the number of preconditions ahead of the
/// partition's own.
pub(crate) fn partition_duplicate(
    partition: &Partition,
    failed: Option<usize>,
    offset: usize,
) -> MetaError {
    match failed.map(|i| i.saturating_sub(offset)) {
        Some(0) => MetaError::duplicate(ResourceType::Partition, partition.uuid.clone()),
        _ => MetaError::duplicate(ResourceType::Partition, partition.name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use crate::condition::StringMatch;
    use crate::config::MetaConfig;
    use crate::error::MetaError;
    use crate::kv::MemoryKv;
    use crate::store::Store;
    use std::sync::Arc;

    async fn store() -> Store {
        Store::open(Arc::new(MemoryKv::new()), MetaConfig::default())
            .await
            .expect("open")
    }

    #[tokio::test]
    async fn names_and_uuids_are_unique() {
        let store = store().await;
        let alpha = store.create_partition("alpha", None).await.expect("alpha");
        let err = store
            .create_partition("alpha", None)
            .await
            .expect_err("same name");
        assert!(matches!(err, MetaError::Duplicate { ref resource_id, .. } if resource_id == "alpha"));
        let err = store
            .create_partition("beta", Some(&alpha.uuid))
            .await
            .expect_err("same uuid");
        assert!(matches!(err, MetaError::Duplicate { ref resource_id, .. } if *resource_id == alpha.uuid));
    }

    #[tokio::test]
    async fn get_by_uuid_or_name() {
        let store = store().await;
        let created = store
            .create_partition("alpha", Some("6F9619FF-8B86-D011-B42D-00C04FC964FF"))
            .await
            .expect("create");
        assert_eq!(created.uuid, "6f9619ff-8b86-d011-b42d-00c04fc964ff");
        assert_eq!(store.get_partition("alpha").await.expect("name"), created);
        assert_eq!(
            store.get_partition(&created.uuid.to_uppercase()).await.expect("uuid"),
            created
        );
        assert!(matches!(
            store.get_partition("beta").await,
            Err(MetaError::NotFound { .. })
        ));
        assert!(matches!(
            store.create_partition("a/b", None).await,
            Err(MetaError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn uuid_shaped_names_are_rejected() {
        let store = store().await;
        for name in [
            "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "6F9619FF-8B86-D011-B42D-00C04FC964FF",
        ] {
            assert!(matches!(
                store.create_partition(name, None).await,
                Err(MetaError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            store
                .bootstrap("tok1", "6f9619ff-8b86-d011-b42d-00c04fc964ff", None)
                .await,
            Err(MetaError::InvalidInput(_))
        ));
        assert!(store.bootstrap_record().await.expect("marker").is_none());

        let almost = store
            .create_partition("6f9619ff-8b86", None)
            .await
            .expect("not a full uuid");
        assert_eq!(
            store.get_partition("6f9619ff-8b86").await.expect("by name"),
            almost
        );
    }

    #[tokio::test]
    async fn list_by_prefix_matches_names_and_uuids() {
        let store = store().await;
        for name in ["prod-east", "prod-west", "staging"] {
            store.create_partition(name, None).await.expect("create");
        }
        let prod = store
            .list_partitions(Some(&StringMatch::prefix("prod")))
            .await
            .expect("list");
        let names: Vec<&str> = prod.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["prod-east", "prod-west"]);

        let all = store.list_partitions(None).await.expect("all");
        assert_eq!(all.len(), 3);

        let by_uuid = store
            .list_partitions(Some(&StringMatch::exact(all[2].uuid.clone())))
            .await
            .expect("by uuid");
        assert_eq!(by_uuid, vec![all[2].clone()]);

        let not_staging = store
            .list_partitions(Some(&StringMatch::exact("staging").negated()))
            .await
            .expect("negated");
        assert_eq!(not_staging.len(), 2);
    }
}
