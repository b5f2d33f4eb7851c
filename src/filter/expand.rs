use crate::catalog::{ObjectType, Partition, is_uuid_like, parse_uuid};
use crate::condition::{
    NameCondition, ObjectCondition, ObjectTypeCondition, PartitionCondition, ProjectCondition,
    PropertyDefinitionCondition, UuidCondition,
};
use crate::error::MetaError;
use crate::filter::{ObjectFilter, PropertyDefinitionFilter, SearchTerm};
use crate::permission::Session;
use async_trait::async_trait;
use tracing::debug;

/// Lookups the expander needs to turn search terms into concrete entities.
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    async fn resolve_partitions(&self, term: &SearchTerm) -> Result<Vec<Partition>, MetaError>;

    async fn resolve_object_types(&self, term: &SearchTerm)
    -> Result<Vec<ObjectType>, MetaError>;
}

/// Partition uuids a filter element targets. Empty means the element
/// matches nothing.
async fn resolve_partition_uuids<R: CatalogResolver + ?Sized>(
    resolver: &R,
    term: Option<&SearchTerm>,
    session: &Session,
) -> Result<Vec<String>, MetaError> {
    match term {
        None => Ok(vec![session.partition.clone()]),
        Some(term) => Ok(resolver
            .resolve_partitions(term)
            .await?
            .into_iter()
            .map(|p| p.uuid)
            .collect()),
    }
}

/// `None` leaves the type unconstrained; `Some(empty)` matches nothing.
async fn resolve_type_codes<R: CatalogResolver + ?Sized>(
    resolver: &R,
    term: Option<&SearchTerm>,
) -> Result<Option<Vec<String>>, MetaError> {
    match term {
        None => Ok(None),
        Some(term) => Ok(Some(
            resolver
                .resolve_object_types(term)
                .await?
                .into_iter()
                .map(|t| t.code)
                .collect(),
        )),
    }
}

fn cross<T>(
    partitions: &[String],
    types: &Option<Vec<String>>,
    mut f: impl FnMut(&str, Option<&str>) -> T,
) -> Vec<T> {
    let mut out = Vec::new();
    for partition in partitions {
        match types {
            None => out.push(f(partition, None)),
            Some(codes) => {
                for code in codes {
                    out.push(f(partition, Some(code)));
                }
            }
        }
    }
    out
}

/// Expands one filter element into one condition per resolved
/// `(partition, type)` pair, stamping the residual predicates onto each.
pub async fn expand_object_filter<R: CatalogResolver + ?Sized>(
    resolver: &R,
    filter: &ObjectFilter,
    session: &Session,
) -> Result<Vec<ObjectCondition>, MetaError> {
    let partitions = resolve_partition_uuids(resolver, filter.partition.as_ref(), session).await?;
    if partitions.is_empty() {
        debug!(term = ?filter.partition, "object filter matched no partition");
        return Ok(Vec::new());
    }
    let types = resolve_type_codes(resolver, filter.object_type.as_ref()).await?;
    if types.as_ref().is_some_and(Vec::is_empty) {
        debug!(term = ?filter.object_type, "object filter matched no object type");
        return Ok(Vec::new());
    }

    let mut residual = ObjectCondition::new();
    if let Some(term) = &filter.uuid_or_name {
        match uuid_term(term) {
            Some(uuid) => residual.uuid = Some(UuidCondition::equal(uuid)),
            None => residual.name = Some(NameCondition(term.to_match())),
        }
    }
    let project = filter.project.as_deref().unwrap_or(&session.project);
    residual.project = Some(ProjectCondition::equal(project));
    residual.properties = filter.properties.clone().filter(|p| !p.is_empty());

    Ok(cross(&partitions, &types, |partition, code| {
        let mut cond = residual.clone();
        cond.partition = Some(PartitionCondition::equal(partition));
        cond.object_type = code.map(ObjectTypeCondition::equal);
        cond
    }))
}

/// A term names an object uuid only when it is an exact, uuid-shaped value.
fn uuid_term(term: &SearchTerm) -> Option<String> {
    if term.use_prefix || !is_uuid_like(&term.value) {
        return None;
    }
    parse_uuid(&term.value)
}

/// OR-combined expansion of a filter list. An empty list yields a single
/// condition confined to the session partition and project.
pub async fn normalize_object_filters<R: CatalogResolver + ?Sized>(
    resolver: &R,
    filters: &[ObjectFilter],
    session: &Session,
) -> Result<Vec<ObjectCondition>, MetaError> {
    if filters.is_empty() {
        return Ok(vec![
            ObjectCondition::new()
                .in_partition(session.partition.clone())
                .in_project(session.project.clone()),
        ]);
    }
    let mut conditions = Vec::new();
    for filter in filters {
        conditions.extend(expand_object_filter(resolver, filter, session).await?);
    }
    Ok(conditions)
}

pub async fn expand_property_definition_filter<R: CatalogResolver + ?Sized>(
    resolver: &R,
    filter: &PropertyDefinitionFilter,
    session: &Session,
) -> Result<Vec<PropertyDefinitionCondition>, MetaError> {
    let partitions = resolve_partition_uuids(resolver, filter.partition.as_ref(), session).await?;
    if partitions.is_empty() {
        debug!(term = ?filter.partition, "property definition filter matched no partition");
        return Ok(Vec::new());
    }
    let types = resolve_type_codes(resolver, filter.object_type.as_ref()).await?;
    if types.as_ref().is_some_and(Vec::is_empty) {
        debug!(term = ?filter.object_type, "property definition filter matched no object type");
        return Ok(Vec::new());
    }
    let key = filter.key.as_ref().map(SearchTerm::to_match);

    Ok(cross(&partitions, &types, |partition, code| {
        PropertyDefinitionCondition {
            partition: Some(PartitionCondition::equal(partition)),
            object_type: code.map(ObjectTypeCondition::equal),
            key: key.clone(),
        }
    }))
}

pub async fn normalize_property_definition_filters<R: CatalogResolver + ?Sized>(
    resolver: &R,
    filters: &[PropertyDefinitionFilter],
    session: &Session,
) -> Result<Vec<PropertyDefinitionCondition>, MetaError> {
    if filters.is_empty() {
        return Ok(vec![
            PropertyDefinitionCondition::new().in_partition(session.partition.clone()),
        ]);
    }
    let mut conditions = Vec::new();
    for filter in filters {
        conditions.extend(expand_property_definition_filter(resolver, filter, session).await?);
    }
    Ok(conditions)
}
