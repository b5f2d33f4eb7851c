use serde::{Deserialize, Serialize};

pub const PROVIDER_OBJECT_TYPE: &str = "provider";
pub const IMAGE_OBJECT_TYPE: &str = "image";
pub const MACHINE_OBJECT_TYPE: &str = "machine";

/// Domain in which an object's name must be unique.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ObjectScope {
    /// Unique per `(partition, type)`.
    #[default]
    Partition,
    /// Unique per `(partition, type, project)`.
    Project,
}

impl std::fmt::Display for ObjectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectScope::Partition => write!(f, "PARTITION"),
            ObjectScope::Project => write!(f, "PROJECT"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectType {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub scope: ObjectScope,
}

impl ObjectType {
    pub fn new(code: impl Into<String>, description: impl Into<String>, scope: ObjectScope) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            scope,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderType {
    pub code: String,
    pub description: String,
}

impl ProviderType {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }
}

pub fn well_known_object_types() -> Vec<ObjectType> {
    vec![
        ObjectType::new(
            PROVIDER_OBJECT_TYPE,
            "A provider of resources",
            ObjectScope::Partition,
        ),
        ObjectType::new(
            IMAGE_OBJECT_TYPE,
            "A bootable bit image",
            ObjectScope::Project,
        ),
        ObjectType::new(
            MACHINE_OBJECT_TYPE,
            "Virtual or bare-metal machine",
            ObjectScope::Project,
        ),
    ]
}

pub fn well_known_provider_types() -> Vec<ProviderType> {
    vec![
        ProviderType::new("compute", "Provides compute resources"),
        ProviderType::new("storage", "Provides block or object storage"),
        ProviderType::new("network", "Provides network connectivity"),
    ]
}

#[cfg(test)]
mod tests {
    use super::{ObjectScope, well_known_object_types, well_known_provider_types};
    use std::collections::BTreeSet;

    #[test]
    fn well_known_codes_are_unique() {
        let objects: BTreeSet<String> = well_known_object_types()
            .into_iter()
            .map(|t| t.code)
            .collect();
        assert_eq!(objects.len(), well_known_object_types().len());
        let providers: BTreeSet<String> = well_known_provider_types()
            .into_iter()
            .map(|t| t.code)
            .collect();
        assert_eq!(providers.len(), well_known_provider_types().len());
    }

    #[test]
    fn provider_type_is_partition_scoped() {
        let provider = well_known_object_types()
            .into_iter()
            .find(|t| t.code == "provider")
            .expect("provider");
        assert_eq!(provider.scope, ObjectScope::Partition);
        assert_eq!(ObjectScope::default(), ObjectScope::Partition);
    }
}
