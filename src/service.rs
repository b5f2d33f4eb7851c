//! Request handling in front of the [`Store`].
//!
//! Every session-bearing call resolves the session partition once, checks
//! referenced entities exist before writing, confines callers to their own
//! partition and project, and never lets internal error detail reach the
//! caller.

use crate::catalog::{
    Object, ObjectDefinition, ObjectScope, ObjectType, Partition, PropertyDefinition,
    ProviderType,
};
use crate::condition::StringMatch;
use crate::error::{MetaError, MetaErrorCode, ResourceType};
use crate::filter::{
    ObjectFilter, PropertyDefinitionFilter, SearchTerm, normalize_object_filters,
    normalize_property_definition_filters,
};
use crate::permission::{PermissionBits, Session, permits};
use crate::store::{DeleteReport, Store};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::error;

async fn guarded<T>(
    operation: &'static str,
    call: impl Future<Output = Result<T, MetaError>>,
) -> Result<T, MetaError> {
    match call.await {
        Err(err) if err.code() == MetaErrorCode::Unknown => {
            error!(operation, error = %err, "request failed");
            Err(MetaError::Internal)
        }
        other => other,
    }
}

#[derive(Clone)]
pub struct MetadataService {
    store: Arc<Store>,
}

impl MetadataService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Validates `session` and rewrites its partition to the resolved uuid.
    pub async fn resolve_session(&self, session: &Session) -> Result<Session, MetaError> {
        guarded("resolve_session", self.resolve(session)).await
    }

    async fn resolve(&self, session: &Session) -> Result<Session, MetaError> {
        session.validate()?;
        let partition = self.store.get_partition(&session.partition).await?;
        Ok(Session {
            partition: partition.uuid,
            ..session.clone()
        })
    }

    /// The only entry point that needs no session.
    pub async fn bootstrap(
        &self,
        token: &str,
        partition_name: &str,
        partition_uuid: Option<&str>,
    ) -> Result<Partition, MetaError> {
        guarded(
            "bootstrap",
            self.store.bootstrap(token, partition_name, partition_uuid),
        )
        .await
    }

    pub async fn create_partition(
        &self,
        session: &Session,
        name: &str,
        uuid: Option<&str>,
    ) -> Result<Partition, MetaError> {
        guarded("create_partition", async {
            self.resolve(session).await?;
            self.store.create_partition(name, uuid).await
        })
        .await
    }

    pub async fn get_partition(
        &self,
        session: &Session,
        uuid_or_name: &str,
    ) -> Result<Partition, MetaError> {
        guarded("get_partition", async {
            self.resolve(session).await?;
            self.store.get_partition(uuid_or_name).await
        })
        .await
    }

    pub async fn list_partitions(
        &self,
        session: &Session,
        term: Option<&SearchTerm>,
    ) -> Result<Vec<Partition>, MetaError> {
        guarded("list_partitions", async {
            self.resolve(session).await?;
            let term = term.map(SearchTerm::to_match);
            self.store.list_partitions(term.as_ref()).await
        })
        .await
    }

    pub async fn get_object_type(
        &self,
        session: &Session,
        code: &str,
    ) -> Result<ObjectType, MetaError> {
        guarded("get_object_type", async {
            self.resolve(session).await?;
            self.store.object_type(code).await
        })
        .await
    }

    pub async fn list_object_types(
        &self,
        session: &Session,
        term: Option<&SearchTerm>,
    ) -> Result<Vec<ObjectType>, MetaError> {
        guarded("list_object_types", async {
            self.resolve(session).await?;
            let term = term.map(SearchTerm::to_match);
            self.store.list_object_types(term.as_ref()).await
        })
        .await
    }

    pub async fn list_provider_types(
        &self,
        session: &Session,
        term: Option<&SearchTerm>,
    ) -> Result<Vec<ProviderType>, MetaError> {
        guarded("list_provider_types", async {
            self.resolve(session).await?;
            let term: Option<StringMatch> = term.map(SearchTerm::to_match);
            self.store.list_provider_types(term.as_ref()).await
        })
        .await
    }

    pub async fn create_object(
        &self,
        session: &Session,
        object: Object,
    ) -> Result<Object, MetaError> {
        guarded("create_object", async {
            let session = self.resolve(session).await?;
            let object = self.stamp_object(&session, object).await?;
            self.check_properties(&session, &object, None).await?;
            self.store.create_object(object).await
        })
        .await
    }

    /// Replaces properties and tags of an object the session owns.
    pub async fn update_object(
        &self,
        session: &Session,
        object: Object,
    ) -> Result<Object, MetaError> {
        guarded("update_object", async {
            let session = self.resolve(session).await?;
            let current = self.owned_object(&session, &object.uuid).await?;
            let mut object = object;
            if object.partition.is_empty() {
                object.partition = current.partition.clone();
            }
            if object.project.is_none() {
                object.project = current.project.clone();
            }
            let object = self.stamp_object(&session, object).await?;
            self.check_properties(&session, &object, Some(&current.properties))
                .await?;
            self.store.update_object(object).await
        })
        .await
    }

    pub async fn get_object(&self, session: &Session, uuid: &str) -> Result<Object, MetaError> {
        guarded("get_object", async {
            let session = self.resolve(session).await?;
            self.owned_object(&session, uuid).await
        })
        .await
    }

    /// Looks the name up in the session partition, and the session project
    /// for project-scoped types.
    pub async fn get_object_by_name(
        &self,
        session: &Session,
        object_type: &str,
        name: &str,
    ) -> Result<Object, MetaError> {
        guarded("get_object_by_name", async {
            let session = self.resolve(session).await?;
            self.store
                .get_object_by_name(
                    &session.partition,
                    object_type,
                    Some(session.project.as_str()),
                    name,
                )
                .await
        })
        .await
    }

    pub async fn delete_object(&self, session: &Session, uuid: &str) -> Result<Object, MetaError> {
        guarded("delete_object", async {
            let session = self.resolve(session).await?;
            let owned = self.owned_object(&session, uuid).await?;
            self.store.delete_object(&owned.uuid).await
        })
        .await
    }

    pub async fn list_objects(
        &self,
        session: &Session,
        filters: &[ObjectFilter],
    ) -> Result<Vec<Object>, MetaError> {
        guarded("list_objects", async {
            let session = self.resolve(session).await?;
            self.owned_matches(&session, filters).await
        })
        .await
    }

    pub async fn get_object_by_filters(
        &self,
        session: &Session,
        filters: &[ObjectFilter],
    ) -> Result<Object, MetaError> {
        guarded("get_object_by_filters", async {
            let session = self.resolve(session).await?;
            let mut found = self.owned_matches(&session, filters).await?;
            match found.len() {
                0 => Err(MetaError::not_found(ResourceType::Object, "object filter")),
                1 => Ok(found.remove(0)),
                count => Err(MetaError::MultipleRecordsFound {
                    resource_type: ResourceType::Object,
                    query: format!("{} object filters", filters.len()),
                    count,
                }),
            }
        })
        .await
    }

    pub async fn delete_objects(
        &self,
        session: &Session,
        filters: &[ObjectFilter],
    ) -> Result<DeleteReport, MetaError> {
        guarded("delete_objects", async {
            let session = self.resolve(session).await?;
            let owned = self.owned_matches(&session, filters).await?;
            Ok(self.store.delete_listed(&owned).await)
        })
        .await
    }

    pub async fn create_property_definition(
        &self,
        session: &Session,
        definition: PropertyDefinition,
    ) -> Result<PropertyDefinition, MetaError> {
        guarded("create_property_definition", async {
            let session = self.resolve(session).await?;
            let definition = self.stamp_definition(&session, definition).await?;
            self.store.create_property_definition(definition).await
        })
        .await
    }

    pub async fn update_property_definition(
        &self,
        session: &Session,
        definition: PropertyDefinition,
    ) -> Result<PropertyDefinition, MetaError> {
        guarded("update_property_definition", async {
            let session = self.resolve(session).await?;
            let definition = self.stamp_definition(&session, definition).await?;
            self.store.update_property_definition(definition).await
        })
        .await
    }

    pub async fn get_property_definition(
        &self,
        session: &Session,
        object_type: &str,
        key: &str,
    ) -> Result<PropertyDefinition, MetaError> {
        guarded("get_property_definition", async {
            let session = self.resolve(session).await?;
            self.store
                .get_property_definition(&session.partition, object_type, key)
                .await
        })
        .await
    }

    pub async fn delete_property_definition(
        &self,
        session: &Session,
        object_type: &str,
        key: &str,
    ) -> Result<PropertyDefinition, MetaError> {
        guarded("delete_property_definition", async {
            let session = self.resolve(session).await?;
            self.store
                .delete_property_definition(&session.partition, object_type, key)
                .await
        })
        .await
    }

    pub async fn list_property_definitions(
        &self,
        session: &Session,
        filters: &[PropertyDefinitionFilter],
    ) -> Result<Vec<PropertyDefinition>, MetaError> {
        guarded("list_property_definitions", async {
            let session = self.resolve(session).await?;
            let conditions =
                normalize_property_definition_filters(self.store.as_ref(), filters, &session)
                    .await?;
            self.store.list_property_definitions(&conditions).await
        })
        .await
    }

    pub async fn delete_property_definitions(
        &self,
        session: &Session,
        filters: &[PropertyDefinitionFilter],
    ) -> Result<DeleteReport, MetaError> {
        guarded("delete_property_definitions", async {
            let session = self.resolve(session).await?;
            let conditions =
                normalize_property_definition_filters(self.store.as_ref(), filters, &session)
                    .await?;
            self.store.delete_property_definitions(&conditions).await
        })
        .await
    }

    /// The definition governing `object_type` in the session partition.
    pub async fn get_object_definition(
        &self,
        session: &Session,
        object_type: &str,
    ) -> Result<ObjectDefinition, MetaError> {
        guarded("get_object_definition", async {
            let session = self.resolve(session).await?;
            self.store.object_type(object_type).await?;
            self.store
                .get_object_definition(object_type, Some(&session.partition))
                .await
        })
        .await
    }

    /// Writes a partition override for the session partition; the global
    /// default is only written through the store.
    pub async fn put_object_definition(
        &self,
        session: &Session,
        definition: ObjectDefinition,
    ) -> Result<ObjectDefinition, MetaError> {
        guarded("put_object_definition", async {
            let session = self.resolve(session).await?;
            self.store.object_type(&definition.object_type).await?;
            let definition = ObjectDefinition {
                partition: Some(session.partition.clone()),
                ..definition
            };
            self.store.put_object_definition(definition).await
        })
        .await
    }

    /// Resolves the partition the request names, which must be the session
    /// partition.
    async fn session_partition(
        &self,
        session: &Session,
        requested: &str,
    ) -> Result<String, MetaError> {
        if requested.is_empty() || requested == session.partition {
            return Ok(session.partition.clone());
        }
        let partition = self.store.get_partition(requested).await?;
        if partition.uuid != session.partition {
            return Err(MetaError::PermissionDenied(format!(
                "partition '{requested}' is outside the session partition"
            )));
        }
        Ok(partition.uuid)
    }

    /// Fills in defaults and checks the partition, type and project an
    /// object write refers to.
    async fn stamp_object(&self, session: &Session, mut object: Object) -> Result<Object, MetaError> {
        object.partition = self.session_partition(session, &object.partition).await?;
        let object_type = self.store.object_type(&object.object_type).await?;
        match object_type.scope {
            ObjectScope::Project => {
                let project = object
                    .project
                    .take()
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| session.project.clone());
                if project != session.project {
                    return Err(MetaError::PermissionDenied(format!(
                        "project '{project}' is outside the session project"
                    )));
                }
                object.project = Some(project);
            }
            ObjectScope::Partition => object.project = None,
        }
        Ok(object)
    }

    async fn stamp_definition(
        &self,
        session: &Session,
        mut definition: PropertyDefinition,
    ) -> Result<PropertyDefinition, MetaError> {
        definition.partition = self
            .session_partition(session, &definition.partition)
            .await?;
        self.store.object_type(&definition.object_type).await?;
        Ok(definition)
    }

    /// The object, unless it lives outside the session's partition or, for
    /// project-scoped types, project. Foreign objects read as missing.
    async fn owned_object(&self, session: &Session, uuid: &str) -> Result<Object, MetaError> {
        let object = self.store.get_object(uuid).await?;
        if !self.owns(session, &object).await? {
            return Err(MetaError::not_found(ResourceType::Object, uuid));
        }
        Ok(object)
    }

    /// Filter matches restricted to what the session owns. Filters may name
    /// other partitions and projects; objects found there are dropped.
    async fn owned_matches(
        &self,
        session: &Session,
        filters: &[ObjectFilter],
    ) -> Result<Vec<Object>, MetaError> {
        let conditions = normalize_object_filters(self.store.as_ref(), filters, session).await?;
        let mut owned = Vec::new();
        for object in self.store.list_objects(&conditions).await? {
            if self.owns(session, &object).await? {
                owned.push(object);
            }
        }
        Ok(owned)
    }

    /// Same partition, and same project for project scoped types.
    async fn owns(&self, session: &Session, object: &Object) -> Result<bool, MetaError> {
        if object.partition != session.partition {
            return Ok(false);
        }
        Ok(match self.store.object_scope(&object.object_type).await? {
            ObjectScope::Partition => true,
            ObjectScope::Project => object.project.as_deref() == Some(session.project.as_str()),
        })
    }

    /// Checks property values against the partition's definitions for the
    /// object's type. WRITE permission is required for every defined
    /// property whose value the request sets or changes, and for every
    /// property the effective object definition lists permissions for.
    async fn check_properties(
        &self,
        session: &Session,
        object: &Object,
        previous: Option<&BTreeMap<String, String>>,
    ) -> Result<(), MetaError> {
        let definitions = self
            .store
            .property_definitions_for(&object.partition, &object.object_type)
            .await?;
        for definition in &definitions {
            match object.properties.get(&definition.key) {
                Some(value) => {
                    definition.validate_value(value)?;
                    let changed = previous
                        .and_then(|p| p.get(&definition.key))
                        .is_none_or(|old| old != value);
                    if changed && !definition.allows(session, PermissionBits::WRITE) {
                        return Err(MetaError::PermissionDenied(format!(
                            "no write permission on property '{}'",
                            definition.key
                        )));
                    }
                }
                None if definition.is_required => {
                    return Err(MetaError::InvalidInput(format!(
                        "property '{}' is required",
                        definition.key
                    )));
                }
                None => {}
            }
        }

        let envelope = match self
            .store
            .get_object_definition(&object.object_type, Some(object.partition.as_str()))
            .await
        {
            Ok(definition) => definition,
            Err(MetaError::NotFound { .. }) => return Ok(()),
            Err(err) => return Err(err),
        };
        for (key, value) in &object.properties {
            let Some(entries) = envelope.property_permissions.get(key) else {
                continue;
            };
            let changed = previous.and_then(|p| p.get(key)).is_none_or(|old| old != value);
            if changed && !permits(entries, session, PermissionBits::WRITE) {
                return Err(MetaError::PermissionDenied(format!(
                    "object definition for '{}' denies writing '{key}'",
                    object.object_type
                )));
            }
        }
        Ok(())
    }
}
