use crate::catalog::PropertyDefinition;
use crate::condition::{Comparison, Matches, ObjectTypeCondition, PartitionCondition, StringMatch};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyDefinitionCondition {
    pub partition: Option<PartitionCondition>,
    pub object_type: Option<ObjectTypeCondition>,
    pub key: Option<StringMatch>,
}

impl PropertyDefinitionCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(PartitionCondition::equal(partition));
        self
    }

    pub fn of_type(mut self, code: impl Into<String>) -> Self {
        self.object_type = Some(ObjectTypeCondition::equal(code));
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(StringMatch::exact(key));
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key = Some(StringMatch::prefix(prefix));
        self
    }

    pub fn exact_partition(&self) -> Option<&str> {
        self.partition
            .as_ref()
            .filter(|c| c.comparison == Comparison::Equal)
            .map(|c| c.partition.as_str())
    }

    pub fn exact_type(&self) -> Option<&str> {
        self.object_type
            .as_ref()
            .filter(|c| c.comparison == Comparison::Equal)
            .map(|c| c.code.as_str())
    }

    /// Positive key test as `(value, is_prefix)`.
    pub fn key_term(&self) -> Option<(&str, bool)> {
        let key = self.key.as_ref()?;
        match (key.exact_value(), key.prefix_value()) {
            (Some(exact), _) => Some((exact, false)),
            (None, Some(prefix)) => Some((prefix, true)),
            _ => None,
        }
    }
}

impl Matches<PropertyDefinition> for PropertyDefinitionCondition {
    fn matches(&self, item: &PropertyDefinition) -> bool {
        self.partition
            .as_ref()
            .is_none_or(|c| c.is_match(&item.partition))
            && self
                .object_type
                .as_ref()
                .is_none_or(|c| c.is_match(&item.object_type))
            && self.key.as_ref().is_none_or(|k| k.is_match(&item.key))
    }
}
