//! Client-facing filters and their expansion into concrete conditions.

pub mod expand;

pub use expand::{
    CatalogResolver, expand_object_filter, expand_property_definition_filter,
    normalize_object_filters, normalize_property_definition_filters,
};

use crate::condition::{PropertyCondition, StringMatch};

/// A client search term that may name several entities when `use_prefix`
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm {
    pub value: String,
    pub use_prefix: bool,
}

impl SearchTerm {
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            use_prefix: false,
        }
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            use_prefix: true,
        }
    }

    pub fn to_match(&self) -> StringMatch {
        if self.use_prefix {
            StringMatch::prefix(self.value.clone())
        } else {
            StringMatch::exact(self.value.clone())
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.to_match().is_match(candidate)
    }
}

/// One element of an OR-combined object filter list.
///
/// `partition` defaults to the session partition and `project` to the
/// session project; an unset `object_type` spans every type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectFilter {
    pub partition: Option<SearchTerm>,
    pub object_type: Option<SearchTerm>,
    pub uuid_or_name: Option<SearchTerm>,
    pub project: Option<String>,
    pub properties: Option<PropertyCondition>,
}

impl ObjectFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(mut self, term: SearchTerm) -> Self {
        self.partition = Some(term);
        self
    }

    pub fn object_type(mut self, term: SearchTerm) -> Self {
        self.object_type = Some(term);
        self
    }

    pub fn uuid_or_name(mut self, term: SearchTerm) -> Self {
        self.uuid_or_name = Some(term);
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn properties(mut self, properties: PropertyCondition) -> Self {
        self.properties = Some(properties);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyDefinitionFilter {
    pub partition: Option<SearchTerm>,
    pub object_type: Option<SearchTerm>,
    pub key: Option<SearchTerm>,
}

impl PropertyDefinitionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(mut self, term: SearchTerm) -> Self {
        self.partition = Some(term);
        self
    }

    pub fn object_type(mut self, term: SearchTerm) -> Self {
        self.object_type = Some(term);
        self
    }

    pub fn key(mut self, term: SearchTerm) -> Self {
        self.key = Some(term);
        self
    }
}
