use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Object {
    /// Empty on create means "generate one".
    pub uuid: String,
    pub partition: String,
    pub object_type: String,
    #[serde(default)]
    pub project: Option<String>,
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Object {
    pub fn new(
        partition: impl Into<String>,
        object_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            object_type: object_type.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Human readable identity used in error messages.
    pub fn display_id(&self) -> String {
        match &self.project {
            Some(project) => format!(
                "{}/{}/{}/{}",
                self.partition, self.object_type, project, self.name
            ),
            None => format!("{}/{}/{}", self.partition, self.object_type, self.name),
        }
    }
}
