use crate::error::MetaError;

const SEP: char = '/';

/// Uniqueness domain of an object name index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope<'a> {
    Partition,
    Project(&'a str),
}

/// Maps catalog entities to keys in the backing store.
///
/// Every key lives under `{root}/`. Builders that take a whole identifier
/// validate it and return `InvalidInput` for an empty segment or a `/` in a
/// non-terminal position. `*_prefix` builders take a partial, caller-typed
/// term and never validate it, since a prefix is allowed to be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    root: String,
}

impl KeyCodec {
    pub fn new(root: impl Into<String>) -> Self {
        let root: String = root.into();
        Self {
            root: root.trim_end_matches(SEP).to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn join(&self, parts: &[&str]) -> String {
        let mut out = String::with_capacity(
            self.root.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>(),
        );
        out.push_str(&self.root);
        for part in parts {
            out.push(SEP);
            out.push_str(part);
        }
        out
    }

    pub fn partition_by_uuid(&self, uuid: &str) -> Result<String, MetaError> {
        validate_segment("partition uuid", uuid)?;
        Ok(self.join(&["partitions", "by-uuid", uuid]))
    }

    pub fn partition_by_name(&self, name: &str) -> Result<String, MetaError> {
        validate_segment("partition name", name)?;
        Ok(self.join(&["partitions", "by-name", name]))
    }

    pub fn partitions_by_uuid_prefix(&self, partial: &str) -> String {
        self.join(&["partitions", "by-uuid", partial])
    }

    pub fn partitions_by_name_prefix(&self, partial: &str) -> String {
        self.join(&["partitions", "by-name", partial])
    }

    pub fn object_by_uuid(&self, uuid: &str) -> Result<String, MetaError> {
        validate_segment("object uuid", uuid)?;
        Ok(self.join(&["objects", "by-uuid", uuid]))
    }

    /// Range covering the whole primary object index.
    pub fn objects_by_uuid_prefix(&self) -> String {
        self.join(&["objects", "by-uuid", ""])
    }

    pub fn object_name_index(
        &self,
        partition: &str,
        object_type: &str,
        scope: NameScope<'_>,
        name: &str,
    ) -> Result<String, MetaError> {
        validate_terminal_segment("object name", name)?;
        let mut key = self.name_index_base(partition, object_type, scope)?;
        key.push_str(name);
        Ok(key)
    }

    /// Names under one `(partition, type[, project])` starting with `partial`.
    pub fn object_name_prefix(
        &self,
        partition: &str,
        object_type: &str,
        scope: NameScope<'_>,
        partial: &str,
    ) -> Result<String, MetaError> {
        let mut key = self.name_index_base(partition, object_type, scope)?;
        key.push_str(partial);
        Ok(key)
    }

    fn name_index_base(
        &self,
        partition: &str,
        object_type: &str,
        scope: NameScope<'_>,
    ) -> Result<String, MetaError> {
        let mut key = self.object_type_subtree(partition, object_type)?;
        if let NameScope::Project(project) = scope {
            validate_segment("project", project)?;
            key.push_str("by-project/");
            key.push_str(project);
            key.push(SEP);
        }
        key.push_str("by-name/");
        Ok(key)
    }

    /// Every name index entry of one type within one partition, across
    /// projects.
    pub fn object_type_subtree(
        &self,
        partition: &str,
        object_type: &str,
    ) -> Result<String, MetaError> {
        validate_segment("object type", object_type)?;
        let mut key = self.partition_objects_subtree(partition)?;
        key.push_str("by-type/");
        key.push_str(object_type);
        key.push(SEP);
        Ok(key)
    }

    pub fn partition_objects_subtree(&self, partition: &str) -> Result<String, MetaError> {
        validate_segment("partition uuid", partition)?;
        Ok(self.join(&["partitions", partition, "objects", ""]))
    }

    pub fn object_type(&self, code: &str) -> Result<String, MetaError> {
        validate_segment("object type", code)?;
        Ok(self.join(&["types", "object", code]))
    }

    pub fn object_types_prefix(&self, partial: &str) -> String {
        self.join(&["types", "object", partial])
    }

    pub fn provider_type(&self, code: &str) -> Result<String, MetaError> {
        validate_segment("provider type", code)?;
        Ok(self.join(&["types", "provider", code]))
    }

    pub fn provider_types_prefix(&self, partial: &str) -> String {
        self.join(&["types", "provider", partial])
    }

    pub fn property_definition(
        &self,
        partition: &str,
        object_type: &str,
        key: &str,
    ) -> Result<String, MetaError> {
        validate_terminal_segment("property key", key)?;
        let mut out = self.property_definitions_by_type(partition, object_type)?;
        out.push_str(key);
        Ok(out)
    }

    pub fn property_definition_key_prefix(
        &self,
        partition: &str,
        object_type: &str,
        partial: &str,
    ) -> Result<String, MetaError> {
        let mut out = self.property_definitions_by_type(partition, object_type)?;
        out.push_str(partial);
        Ok(out)
    }

    pub fn property_definitions_by_type(
        &self,
        partition: &str,
        object_type: &str,
    ) -> Result<String, MetaError> {
        validate_segment("object type", object_type)?;
        let mut out = self.property_definitions_in_partition(partition)?;
        out.push_str("by-type/");
        out.push_str(object_type);
        out.push(SEP);
        Ok(out)
    }

    pub fn property_definitions_in_partition(&self, partition: &str) -> Result<String, MetaError> {
        validate_segment("partition uuid", partition)?;
        Ok(self.join(&["partitions", partition, "property-definitions", ""]))
    }

    /// `None` addresses the global default for the type.
    pub fn object_definition(
        &self,
        object_type: &str,
        partition: Option<&str>,
    ) -> Result<String, MetaError> {
        validate_segment("object type", object_type)?;
        match partition {
            None => Ok(self.join(&["definitions", "by-type", object_type, "default"])),
            Some(partition) => {
                validate_segment("partition uuid", partition)?;
                Ok(self.join(&[
                    "partitions",
                    partition,
                    "definitions",
                    "by-type",
                    object_type,
                    "default",
                ]))
            }
        }
    }

    pub fn bootstrap_marker(&self) -> String {
        self.join(&["bootstrap", "consumed"])
    }
}

pub fn validate_segment(what: &str, segment: &str) -> Result<(), MetaError> {
    validate_terminal_segment(what, segment)?;
    if segment.contains(SEP) {
        return Err(MetaError::InvalidInput(format!(
            "{what} '{segment}' must not contain '/'"
        )));
    }
    Ok(())
}

pub fn validate_terminal_segment(what: &str, segment: &str) -> Result<(), MetaError> {
    if segment.is_empty() {
        return Err(MetaError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{KeyCodec, NameScope};
    use crate::error::MetaError;

    const P: &str = "0b1c2d3e-0000-4000-8000-000000000001";

    #[test]
    fn object_indexes_follow_layout() {
        let keys = KeyCodec::new("metacat/");
        assert_eq!(
            keys.object_by_uuid("abc").expect("key"),
            "metacat/objects/by-uuid/abc"
        );
        assert_eq!(
            keys.object_name_index(P, "provider", NameScope::Partition, "aws")
                .expect("key"),
            format!("metacat/partitions/{P}/objects/by-type/provider/by-name/aws")
        );
        assert_eq!(
            keys.object_name_index(P, "machine", NameScope::Project("ops"), "web-1")
                .expect("key"),
            format!("metacat/partitions/{P}/objects/by-type/machine/by-project/ops/by-name/web-1")
        );
    }

    #[test]
    fn subtrees_cover_their_name_keys() {
        let keys = KeyCodec::new("root");
        let name_key = keys
            .object_name_index(P, "machine", NameScope::Project("ops"), "web-1")
            .expect("key");
        let prefix = keys
            .object_name_prefix(P, "machine", NameScope::Project("ops"), "we")
            .expect("prefix");
        let by_type = keys.object_type_subtree(P, "machine").expect("type");
        let by_partition = keys.partition_objects_subtree(P).expect("partition");
        assert!(name_key.starts_with(&prefix));
        assert!(name_key.starts_with(&by_type));
        assert!(name_key.starts_with(&by_partition));
        assert!(!keys
            .object_type_subtree(P, "machines")
            .expect("other")
            .starts_with(&by_type));
    }

    #[test]
    fn catalog_and_definition_keys() {
        let keys = KeyCodec::new("m");
        assert_eq!(keys.object_type("image").expect("key"), "m/types/object/image");
        assert_eq!(
            keys.provider_type("compute").expect("key"),
            "m/types/provider/compute"
        );
        assert_eq!(
            keys.property_definition(P, "machine", "arch").expect("key"),
            format!("m/partitions/{P}/property-definitions/by-type/machine/arch")
        );
        assert_eq!(
            keys.object_definition("provider", None).expect("key"),
            "m/definitions/by-type/provider/default"
        );
        assert_eq!(
            keys.object_definition("provider", Some(P)).expect("key"),
            format!("m/partitions/{P}/definitions/by-type/provider/default")
        );
        assert_eq!(keys.bootstrap_marker(), "m/bootstrap/consumed");
        assert_eq!(keys.partitions_by_name_prefix("al"), "m/partitions/by-name/al");
    }

    #[test]
    fn malformed_segments_are_rejected() {
        let keys = KeyCodec::new("m");
        assert!(matches!(
            keys.partition_by_name("a/b"),
            Err(MetaError::InvalidInput(_))
        ));
        assert!(matches!(
            keys.object_type(""),
            Err(MetaError::InvalidInput(_))
        ));
        assert!(matches!(
            keys.object_name_index(P, "machine", NameScope::Project(""), "web"),
            Err(MetaError::InvalidInput(_))
        ));
        // object names are the final segment and may carry a slash
        keys.object_name_index(P, "image", NameScope::Project("ops"), "debian/12")
            .expect("terminal slash");
    }
}
