//! In-memory predicates over decoded catalog entities.
//!
//! Each condition tests one attribute; the composite
//! [`ObjectCondition`] and [`PropertyDefinitionCondition`] AND their parts
//! together. The store also inspects a composite to decide whether an index
//! can answer it directly, and always re-applies [`Matches`] to whatever the
//! index returned.

pub mod catalog;
pub mod object;
pub mod property;

pub use catalog::{PartitionSearchCondition, TypeCodeCondition};
pub use object::{
    NameCondition, ObjectCondition, ObjectTypeCondition, PartitionCondition, ProjectCondition,
    PropertyCondition, UuidCondition,
};
pub use property::PropertyDefinitionCondition;

pub trait Matches<T: ?Sized> {
    fn matches(&self, item: &T) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Comparison {
    #[default]
    Equal,
    NotEqual,
}

impl Comparison {
    pub fn apply(self, hit: bool) -> bool {
        match self {
            Comparison::Equal => hit,
            Comparison::NotEqual => !hit,
        }
    }
}

/// A string test that is either exact or a prefix test, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringMatch {
    pub value: String,
    pub prefix: bool,
    pub comparison: Comparison,
}

impl StringMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            prefix: false,
            comparison: Comparison::Equal,
        }
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            prefix: true,
            comparison: Comparison::Equal,
        }
    }

    pub fn negated(mut self) -> Self {
        self.comparison = match self.comparison {
            Comparison::Equal => Comparison::NotEqual,
            Comparison::NotEqual => Comparison::Equal,
        };
        self
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        let hit = if self.prefix {
            candidate.starts_with(self.value.as_str())
        } else {
            candidate == self.value
        };
        self.comparison.apply(hit)
    }

    /// The value when this is a positive exact test.
    pub fn exact_value(&self) -> Option<&str> {
        (self.comparison == Comparison::Equal && !self.prefix).then_some(self.value.as_str())
    }

    /// The value when this is a positive prefix test.
    pub fn prefix_value(&self) -> Option<&str> {
        (self.comparison == Comparison::Equal && self.prefix).then_some(self.value.as_str())
    }
}
