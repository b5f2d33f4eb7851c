use crate::catalog::{Object, ObjectScope, normalize_uuid, parse_uuid};
use crate::condition::{Matches, ObjectCondition};
use crate::error::{MetaError, ResourceType};
use crate::keys::{NameScope, validate_segment};
use crate::kv::{KvEntry, Precondition, Txn};
use crate::store::Store;
use crate::store::codec::{decode, decode_index, encode};
use std::collections::HashSet;
use tracing::{debug, warn};

/// How a single condition is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLookup {
    /// Point read on the primary index.
    ByUuid(String),
    /// Name index key, or key prefix when `prefix` is set.
    ByName {
        partition: String,
        object_type: String,
        project: Option<String>,
        name: String,
        prefix: bool,
    },
    ByType {
        partition: String,
        object_type: String,
    },
    ByPartition {
        partition: String,
    },
    /// Full scan of the primary index.
    Sieve,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteReport {
    pub num_deleted: usize,
    pub errors: Vec<String>,
}

impl Store {
    /// Writes the object together with its name index entry. Either key
    /// already existing rejects the whole write as a duplicate.
    pub async fn create_object(&self, mut object: Object) -> Result<Object, MetaError> {
        object.uuid = normalize_uuid(&object.uuid)?;
        let scope = self.object_scope(&object.object_type).await?;
        let primary = self.keys.object_by_uuid(&object.uuid)?;
        let name_key = self.name_index_key(&object, scope)?;

        let txn = Txn::new()
            .require(Precondition::absent(primary.clone()))
            .require(Precondition::absent(name_key.clone()))
            .put(primary, encode(&object)?)
            .put(name_key, object.uuid.as_bytes().to_vec());
        let outcome = self.kv_txn(txn).await?;
        if !outcome.succeeded {
            let id = match outcome.failed_precondition {
                Some(0) => object.uuid.clone(),
                _ => object.display_id(),
            };
            return Err(MetaError::duplicate(ResourceType::Object, id));
        }
        debug!(uuid = %object.uuid, object = %object.display_id(), "object created");
        Ok(object)
    }

    /// Replaces properties and tags of an existing object. Identity fields
    /// that feed the name index cannot change here; rename by deleting and
    /// re-creating.
    pub async fn update_object(&self, mut object: Object) -> Result<Object, MetaError> {
        object.uuid = parse_uuid(&object.uuid).ok_or_else(|| {
            MetaError::InvalidInput(format!("'{}' is not a valid uuid", object.uuid))
        })?;
        let primary = self.keys.object_by_uuid(&object.uuid)?;
        let Some(entry) = self.kv_get(&primary).await? else {
            return Err(MetaError::not_found(ResourceType::Object, object.uuid));
        };
        let current: Object = decode(&entry)?;
        if current.partition != object.partition
            || current.object_type != object.object_type
            || current.project != object.project
            || current.name != object.name
        {
            return Err(MetaError::InvalidInput(format!(
                "object '{}' cannot change partition, type, project or name in place",
                object.uuid
            )));
        }
        let scope = self.object_scope(&current.object_type).await?;
        let name_key = self.name_index_key(&current, scope)?;

        let txn = Txn::new()
            .require(Precondition::at_version(primary.clone(), entry.version))
            .require(Precondition::exists(name_key))
            .put(primary, encode(&object)?);
        if !self.kv_txn(txn).await?.succeeded {
            return Err(MetaError::conflict(ResourceType::Object, object.uuid));
        }
        Ok(object)
    }

    /// Removes the object and its name index entry atomically. The write is
    /// conditioned on both keys still holding the versions read here, so a
    /// concurrent update, or a re-create under the same name, turns into a
    /// conflict instead of a lost write.
    pub async fn delete_object(&self, uuid: &str) -> Result<Object, MetaError> {
        let uuid = parse_uuid(uuid)
            .ok_or_else(|| MetaError::InvalidInput(format!("'{uuid}' is not a valid uuid")))?;
        let primary = self.keys.object_by_uuid(&uuid)?;
        let Some(entry) = self.kv_get(&primary).await? else {
            return Err(MetaError::not_found(ResourceType::Object, uuid));
        };
        let object: Object = decode(&entry)?;
        let scope = self.object_scope(&object.object_type).await?;
        let name_key = self.name_index_key(&object, scope)?;

        let mut txn = Txn::new().require(Precondition::at_version(primary.clone(), entry.version));
        match self.kv_get(&name_key).await? {
            Some(index) if decode_index(&index).is_ok_and(|owner| owner == uuid) => {
                txn = txn
                    .require(Precondition::at_version(name_key.clone(), index.version))
                    .delete(name_key);
            }
            _ => debug!(key = %name_key, uuid = %uuid, "name index entry missing or reassigned"),
        }
        txn = txn.delete(primary);

        if !self.kv_txn(txn).await?.succeeded {
            return Err(MetaError::conflict(ResourceType::Object, uuid));
        }
        debug!(uuid = %uuid, object = %object.display_id(), "object deleted");
        Ok(object)
    }

    pub async fn get_object(&self, uuid: &str) -> Result<Object, MetaError> {
        let normalized = parse_uuid(uuid)
            .ok_or_else(|| MetaError::InvalidInput(format!("'{uuid}' is not a valid uuid")))?;
        match self.load_object(&normalized).await? {
            Some(object) => Ok(object),
            None => Err(MetaError::not_found(ResourceType::Object, uuid)),
        }
    }

    pub async fn get_object_by_name(
        &self,
        partition: &str,
        object_type: &str,
        project: Option<&str>,
        name: &str,
    ) -> Result<Object, MetaError> {
        let scope = self.type_cache.scope_of(self, object_type).await;
        let name_scope = match (scope, project) {
            (ObjectScope::Partition, _) => NameScope::Partition,
            (ObjectScope::Project, Some(project)) => NameScope::Project(project),
            (ObjectScope::Project, None) => {
                return Err(MetaError::InvalidInput(format!(
                    "object type '{object_type}' is project scoped, a project is required"
                )));
            }
        };
        let key = self
            .keys
            .object_name_index(partition, object_type, name_scope, name)?;
        let display = match name_scope {
            NameScope::Partition => format!("{partition}/{object_type}/{name}"),
            NameScope::Project(project) => format!("{partition}/{object_type}/{project}/{name}"),
        };
        let Some(entry) = self.kv_get(&key).await? else {
            return Err(MetaError::not_found(ResourceType::Object, display));
        };
        self.load_indexed(vec![entry])
            .await?
            .pop()
            .ok_or_else(|| MetaError::not_found(ResourceType::Object, display))
    }

    /// Chooses the cheapest read able to answer `condition`.
    pub async fn plan_object_lookup(&self, condition: &ObjectCondition) -> ObjectLookup {
        if let Some(uuid) = condition.exact_uuid() {
            return ObjectLookup::ByUuid(parse_uuid(uuid).unwrap_or_else(|| uuid.to_string()));
        }
        let Some(partition) = condition.exact_partition() else {
            return ObjectLookup::Sieve;
        };
        let Some(object_type) = condition.exact_type() else {
            return ObjectLookup::ByPartition {
                partition: partition.to_string(),
            };
        };
        if let Some((name, prefix)) = condition.name_term() {
            let project = match self.type_cache.scope_of(self, object_type).await {
                ObjectScope::Partition => Some(None),
                ObjectScope::Project => condition.exact_project().map(|p| Some(p.to_string())),
            };
            if let Some(project) = project {
                return ObjectLookup::ByName {
                    partition: partition.to_string(),
                    object_type: object_type.to_string(),
                    project,
                    name: name.to_string(),
                    prefix,
                };
            }
        }
        ObjectLookup::ByType {
            partition: partition.to_string(),
            object_type: object_type.to_string(),
        }
    }

    /// Candidates for a lookup plan. Callers still apply the condition.
    async fn run_object_lookup(&self, lookup: &ObjectLookup) -> Result<Vec<Object>, MetaError> {
        match lookup {
            ObjectLookup::ByUuid(uuid) => {
                if validate_segment("object uuid", uuid).is_err() {
                    return Ok(Vec::new());
                }
                Ok(self.load_object(uuid).await?.into_iter().collect())
            }
            ObjectLookup::ByName {
                partition,
                object_type,
                project,
                name,
                prefix,
            } => {
                let scope = match project {
                    Some(project) => NameScope::Project(project),
                    None => NameScope::Partition,
                };
                let entries = if *prefix {
                    let key = self
                        .keys
                        .object_name_prefix(partition, object_type, scope, name)?;
                    self.kv_scan(key).await?
                } else {
                    let key = self
                        .keys
                        .object_name_index(partition, object_type, scope, name)?;
                    self.kv_get(&key).await?.into_iter().collect()
                };
                self.load_indexed(entries).await
            }
            ObjectLookup::ByType {
                partition,
                object_type,
            } => {
                let key = self.keys.object_type_subtree(partition, object_type)?;
                let entries = self.kv_scan(key).await?;
                self.load_indexed(entries).await
            }
            ObjectLookup::ByPartition { partition } => {
                let key = self.keys.partition_objects_subtree(partition)?;
                let entries = self.kv_scan(key).await?;
                self.load_indexed(entries).await
            }
            ObjectLookup::Sieve => {
                let entries = self.kv_scan(self.keys.objects_by_uuid_prefix()).await?;
                entries.iter().map(decode).collect()
            }
        }
    }

    /// OR of `conditions`, each uuid reported once, in first-seen order.
    pub async fn list_objects(
        &self,
        conditions: &[ObjectCondition],
    ) -> Result<Vec<Object>, MetaError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for condition in conditions {
            let lookup = self.plan_object_lookup(condition).await;
            for object in self.run_object_lookup(&lookup).await? {
                if condition.matches(&object) && seen.insert(object.uuid.clone()) {
                    out.push(object);
                }
            }
        }
        Ok(out)
    }

    /// Exactly one object matching `conditions`.
    pub async fn get_object_by_conditions(
        &self,
        conditions: &[ObjectCondition],
    ) -> Result<Object, MetaError> {
        let mut found = self.list_objects(conditions).await?;
        match found.len() {
            0 => Err(MetaError::not_found(
                ResourceType::Object,
                describe(conditions),
            )),
            1 => Ok(found.remove(0)),
            count => Err(MetaError::MultipleRecordsFound {
                resource_type: ResourceType::Object,
                query: describe(conditions),
                count,
            }),
        }
    }

    /// Deletes every match one transaction at a time, collecting per-object
    /// failures instead of stopping at the first.
    pub async fn delete_objects(
        &self,
        conditions: &[ObjectCondition],
    ) -> Result<DeleteReport, MetaError> {
        let found = self.list_objects(conditions).await?;
        Ok(self.delete_listed(&found).await)
    }

    /// Deletes each of `objects` by uuid. Failures are reported per object.
    pub async fn delete_listed(&self, objects: &[Object]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for object in objects {
            match self.delete_object(&object.uuid).await {
                Ok(_) => report.num_deleted += 1,
                Err(err) => {
                    debug!(uuid = %object.uuid, error = %err, "bulk object delete skipped");
                    report
                        .errors
                        .push(format!("{}: {}", object.uuid, err.public_message()));
                }
            }
        }
        report
    }

    /// Scope of `code` for callers that write or authorize. An unregistered
    /// type is partition scoped; any other failure to load it is returned
    /// rather than guessed around.
    pub async fn object_scope(&self, code: &str) -> Result<ObjectScope, MetaError> {
        match self.type_cache.get(self, code).await {
            Ok(object_type) => Ok(object_type.scope),
            Err(MetaError::NotFound { .. }) => {
                warn!(object_type = %code, "unregistered object type, using partition scope");
                Ok(ObjectScope::Partition)
            }
            Err(err) => Err(err),
        }
    }

    fn name_index_key(&self, object: &Object, scope: ObjectScope) -> Result<String, MetaError> {
        let name_scope = match scope {
            ObjectScope::Partition => NameScope::Partition,
            ObjectScope::Project => match object.project.as_deref() {
                Some(project) => NameScope::Project(project),
                None => {
                    return Err(MetaError::InvalidInput(format!(
                        "object '{}' has a project scoped type but no project",
                        object.display_id()
                    )));
                }
            },
        };
        self.keys.object_name_index(
            &object.partition,
            &object.object_type,
            name_scope,
            &object.name,
        )
    }

    async fn load_object(&self, uuid: &str) -> Result<Option<Object>, MetaError> {
        let key = self.keys.object_by_uuid(uuid)?;
        match self.kv_get(&key).await? {
            Some(entry) => Ok(Some(decode(&entry)?)),
            None => Ok(None),
        }
    }

    /// Follows name index entries to their primary records, skipping any
    /// that point at a record that no longer exists.
    async fn load_indexed(&self, entries: Vec<KvEntry>) -> Result<Vec<Object>, MetaError> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let uuid = decode_index(&entry)?;
            match self.load_object(&uuid).await? {
                Some(object) => out.push(object),
                None => debug!(key = %entry.key, uuid = %uuid, "dangling object index entry"),
            }
        }
        Ok(out)
    }
}

fn describe(conditions: &[ObjectCondition]) -> String {
    match conditions {
        [single] => match (single.exact_uuid(), single.name_term()) {
            (Some(uuid), _) => uuid.to_string(),
            (None, Some((name, false))) => name.to_string(),
            (None, Some((name, true))) => format!("{name}*"),
            (None, None) => "object filter".to_string(),
        },
        many => format!("{} object filters", many.len()),
    }
}
