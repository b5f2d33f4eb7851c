use crate::catalog::{ObjectType, Partition, ProviderType};
use crate::condition::{Comparison, Matches, StringMatch};

/// Matches a partition whose uuid or name satisfies the term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSearchCondition(pub StringMatch);

impl Matches<Partition> for PartitionSearchCondition {
    fn matches(&self, item: &Partition) -> bool {
        let term = &self.0;
        let uuid_term = StringMatch {
            value: term.value.to_ascii_lowercase(),
            ..term.clone()
        };
        // a negated term must miss both identifiers
        match term.comparison {
            Comparison::Equal => uuid_term.is_match(&item.uuid) || term.is_match(&item.name),
            Comparison::NotEqual => {
                uuid_term.is_match(&item.uuid) && term.is_match(&item.name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCodeCondition(pub StringMatch);

impl Matches<ObjectType> for TypeCodeCondition {
    fn matches(&self, item: &ObjectType) -> bool {
        self.0.is_match(&item.code)
    }
}

impl Matches<ProviderType> for TypeCodeCondition {
    fn matches(&self, item: &ProviderType) -> bool {
        self.0.is_match(&item.code)
    }
}

#[cfg(test)]
mod tests {
    use super::{PartitionSearchCondition, TypeCodeCondition};
    use crate::catalog::{ObjectScope, ObjectType, Partition};
    use crate::condition::{Matches, StringMatch};

    #[test]
    fn partition_term_matches_uuid_or_name() {
        let p = Partition::new("6f9619ff-8b86-d011-b42d-00c04fc964ff", "alpha");
        assert!(PartitionSearchCondition(StringMatch::exact("alpha")).matches(&p));
        assert!(PartitionSearchCondition(StringMatch::prefix("6F96")).matches(&p));
        assert!(!PartitionSearchCondition(StringMatch::prefix("be")).matches(&p));
        assert!(!PartitionSearchCondition(StringMatch::exact("alpha").negated()).matches(&p));
        assert!(PartitionSearchCondition(StringMatch::exact("beta").negated()).matches(&p));
    }

    #[test]
    fn type_code_prefix() {
        let t = ObjectType::new("machine", "", ObjectScope::Project);
        assert!(TypeCodeCondition(StringMatch::prefix("ma")).matches(&t));
        assert!(!TypeCodeCondition(StringMatch::exact("ma")).matches(&t));
    }
}
