use crate::catalog::Object;
use crate::condition::{Comparison, Matches, StringMatch};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidCondition {
    pub uuid: String,
    pub comparison: Comparison,
}

impl UuidCondition {
    pub fn equal(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            comparison: Comparison::Equal,
        }
    }

    pub fn not_equal(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            comparison: Comparison::NotEqual,
        }
    }
}

impl Matches<Object> for UuidCondition {
    fn matches(&self, item: &Object) -> bool {
        self.comparison.apply(item.uuid == self.uuid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCondition {
    pub partition: String,
    pub comparison: Comparison,
}

impl PartitionCondition {
    pub fn equal(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            comparison: Comparison::Equal,
        }
    }

    pub fn not_equal(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            comparison: Comparison::NotEqual,
        }
    }

    pub fn is_match(&self, partition: &str) -> bool {
        self.comparison.apply(partition == self.partition)
    }
}

impl Matches<Object> for PartitionCondition {
    fn matches(&self, item: &Object) -> bool {
        self.is_match(&item.partition)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTypeCondition {
    pub code: String,
    pub comparison: Comparison,
}

impl ObjectTypeCondition {
    pub fn equal(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            comparison: Comparison::Equal,
        }
    }

    pub fn not_equal(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            comparison: Comparison::NotEqual,
        }
    }

    pub fn is_match(&self, code: &str) -> bool {
        self.comparison.apply(code == self.code)
    }
}

impl Matches<Object> for ObjectTypeCondition {
    fn matches(&self, item: &Object) -> bool {
        self.is_match(&item.object_type)
    }
}

/// Objects without a project (partition-scoped types) pass any project
/// condition; the project only narrows project-scoped objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCondition {
    pub project: String,
    pub comparison: Comparison,
}

impl ProjectCondition {
    pub fn equal(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            comparison: Comparison::Equal,
        }
    }

    pub fn not_equal(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            comparison: Comparison::NotEqual,
        }
    }
}

impl Matches<Object> for ProjectCondition {
    fn matches(&self, item: &Object) -> bool {
        match &item.project {
            None => true,
            Some(project) => self.comparison.apply(*project == self.project),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCondition(pub StringMatch);

impl NameCondition {
    pub fn equal(name: impl Into<String>) -> Self {
        Self(StringMatch::exact(name))
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self(StringMatch::prefix(prefix))
    }
}

impl Matches<Object> for NameCondition {
    fn matches(&self, item: &Object) -> bool {
        self.0.is_match(&item.name)
    }
}

/// Key and key/value predicates over an object's properties.
///
/// `require_*`: all must be present. `any_*`: at least one must be present.
/// `forbid_*`: none may be present. A list left empty places no constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyCondition {
    pub require_keys: Vec<String>,
    pub any_keys: Vec<String>,
    pub forbid_keys: Vec<String>,
    pub require_items: Vec<(String, String)>,
    pub any_items: Vec<(String, String)>,
    pub forbid_items: Vec<(String, String)>,
}

impl PropertyCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_key(mut self, key: impl Into<String>) -> Self {
        self.require_keys.push(key.into());
        self
    }

    pub fn any_key(mut self, key: impl Into<String>) -> Self {
        self.any_keys.push(key.into());
        self
    }

    pub fn forbid_key(mut self, key: impl Into<String>) -> Self {
        self.forbid_keys.push(key.into());
        self
    }

    pub fn require_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.require_items.push((key.into(), value.into()));
        self
    }

    pub fn any_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.any_items.push((key.into(), value.into()));
        self
    }

    pub fn forbid_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.forbid_items.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.require_keys.is_empty()
            && self.any_keys.is_empty()
            && self.forbid_keys.is_empty()
            && self.require_items.is_empty()
            && self.any_items.is_empty()
            && self.forbid_items.is_empty()
    }
}

impl Matches<BTreeMap<String, String>> for PropertyCondition {
    fn matches(&self, properties: &BTreeMap<String, String>) -> bool {
        let has_key = |k: &String| properties.contains_key(k);
        let has_item = |(k, v): &(String, String)| properties.get(k) == Some(v);

        self.require_keys.iter().all(has_key)
            && (self.any_keys.is_empty() || self.any_keys.iter().any(has_key))
            && !self.forbid_keys.iter().any(has_key)
            && self.require_items.iter().all(has_item)
            && (self.any_items.is_empty() || self.any_items.iter().any(has_item))
            && !self.forbid_items.iter().any(has_item)
    }
}

impl Matches<Object> for PropertyCondition {
    fn matches(&self, item: &Object) -> bool {
        <Self as Matches<BTreeMap<String, String>>>::matches(self, &item.properties)
    }
}

/// Conjunction of per-attribute object conditions. An attribute left unset
/// is unconstrained; the default condition matches every object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectCondition {
    pub uuid: Option<UuidCondition>,
    pub partition: Option<PartitionCondition>,
    pub object_type: Option<ObjectTypeCondition>,
    pub project: Option<ProjectCondition>,
    pub name: Option<NameCondition>,
    pub properties: Option<PropertyCondition>,
}

impl ObjectCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(UuidCondition::equal(uuid));
        self
    }

    pub fn in_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(PartitionCondition::equal(partition));
        self
    }

    pub fn of_type(mut self, code: impl Into<String>) -> Self {
        self.object_type = Some(ObjectTypeCondition::equal(code));
        self
    }

    pub fn in_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(ProjectCondition::equal(project));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(NameCondition::equal(name));
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name = Some(NameCondition::prefix(prefix));
        self
    }

    pub fn with_properties(mut self, properties: PropertyCondition) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn exact_uuid(&self) -> Option<&str> {
        self.uuid
            .as_ref()
            .filter(|c| c.comparison == Comparison::Equal)
            .map(|c| c.uuid.as_str())
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

    pub fn exact_project(&self) -> Option<&str> {
        self.project
            .as_ref()
            .filter(|c| c.comparison == Comparison::Equal)
            .map(|c| c.project.as_str())
    }

    /// Positive name test as `(value, is_prefix)`.
    pub fn name_term(&self) -> Option<(&str, bool)> {
        let name = &self.name.as_ref()?.0;
        match (name.exact_value(), name.prefix_value()) {
            (Some(exact), _) => Some((exact, false)),
            (None, Some(prefix)) => Some((prefix, true)),
            _ => None,
        }
    }
}

impl Matches<Object> for ObjectCondition {
    fn matches(&self, item: &Object) -> bool {
        self.uuid.as_ref().is_none_or(|c| c.matches(item))
            && self.partition.as_ref().is_none_or(|c| c.matches(item))
            && self.object_type.as_ref().is_none_or(|c| c.matches(item))
            && self.project.as_ref().is_none_or(|c| c.matches(item))
            && self.name.as_ref().is_none_or(|c| c.matches(item))
            && self.properties.as_ref().is_none_or(|c| c.matches(item))
    }
}

#[cfg(test)]
mod tests {
    use super::{ObjectCondition, ProjectCondition, PropertyCondition, UuidCondition};
    use crate::catalog::Object;
    use crate::condition::Matches;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn require_keys_need_every_key() {
        let cond = PropertyCondition::new().require_key("a").require_key("b");
        assert!(cond.matches(&props(&[("a", "1"), ("b", "2"), ("c", "3")])));
        assert!(!cond.matches(&props(&[("a", "1"), ("c", "3")])));
    }

    #[test]
    fn any_and_forbid_semantics() {
        let any = PropertyCondition::new().any_key("x").any_key("b");
        assert!(any.matches(&props(&[("b", "2")])));
        assert!(!any.matches(&props(&[("c", "2")])));

        let forbid = PropertyCondition::new().forbid_item("arch", "arm");
        assert!(forbid.matches(&props(&[("arch", "x86")])));
        assert!(!forbid.matches(&props(&[("arch", "arm")])));

        let items = PropertyCondition::new()
            .require_item("zone", "a")
            .any_item("tier", "gold")
            .any_item("tier", "silver");
        assert!(items.matches(&props(&[("zone", "a"), ("tier", "silver")])));
        assert!(!items.matches(&props(&[("zone", "b"), ("tier", "silver")])));
    }

    #[test]
    fn composite_ands_its_parts() {
        let obj = Object::new("p1", "machine", "web-1")
            .with_uuid("u1")
            .with_project("ops")
            .with_property("arch", "x86");
        let cond = ObjectCondition::new()
            .in_partition("p1")
            .of_type("machine")
            .in_project("ops")
            .with_name_prefix("web")
            .with_properties(PropertyCondition::new().require_key("arch"));
        assert!(cond.matches(&obj));
        assert!(!cond.clone().of_type("image").matches(&obj));
        assert!(ObjectCondition::new().matches(&obj));

        let mut not_u1 = ObjectCondition::new();
        not_u1.uuid = Some(UuidCondition::not_equal("u1"));
        assert!(!not_u1.matches(&obj));
        assert_eq!(not_u1.exact_uuid(), None);
    }

    #[test]
    fn project_condition_passes_partition_wide_objects() {
        let provider = Object::new("p1", "provider", "aws");
        let machine = Object::new("p1", "machine", "web-1").with_project("dev");
        let cond = ProjectCondition::equal("ops");
        assert!(cond.matches(&provider));
        assert!(!cond.matches(&machine));
    }

    #[test]
    fn name_term_reports_prefix_flag() {
        let exact = ObjectCondition::new().with_name("web-1");
        assert_eq!(exact.name_term(), Some(("web-1", false)));
        let prefix = ObjectCondition::new().with_name_prefix("web");
        assert_eq!(prefix.name_term(), Some(("web", true)));
    }

    fn arb_properties() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("[a-e]", "[0-3]", 0..5)
    }

    proptest! {
        #[test]
        fn empty_condition_matches_anything(properties in arb_properties()) {
            prop_assert!(PropertyCondition::new().matches(&properties));
        }

        #[test]
        fn present_keys_satisfy_require_and_fail_forbid(properties in arb_properties()) {
            let keys: Vec<String> = properties.keys().cloned().collect();
            let require = PropertyCondition {
                require_keys: keys.clone(),
                ..PropertyCondition::default()
            };
            prop_assert!(require.matches(&properties));

            if !keys.is_empty() {
                let forbid = PropertyCondition {
                    forbid_keys: keys.clone(),
                    ..PropertyCondition::default()
                };
                prop_assert!(!forbid.matches(&properties));

                let any = PropertyCondition {
                    any_keys: vec![keys[0].clone(), "zz".into()],
                    ..PropertyCondition::default()
                };
                prop_assert!(any.matches(&properties));
            }
        }

        #[test]
        fn absent_key_fails_require(properties in arb_properties()) {
            let cond = PropertyCondition::new().require_key("zz");
            prop_assert!(!cond.matches(&properties));
        }
    }
}
