pub mod object;
pub mod partition;
pub mod schema;
pub mod types;

pub use object::Object;
pub use partition::Partition;
pub use schema::{ObjectDefinition, PropertyDefinition, PropertySchema, PropertyValueType};
pub use types::{ObjectScope, ObjectType, ProviderType};

use crate::error::MetaError;
use uuid::Uuid;

/// Lowercase hyphenated form of `raw`, or `None` when it is not a uuid.
pub fn parse_uuid(raw: &str) -> Option<String> {
    Uuid::parse_str(raw.trim())
        .ok()
        .map(|u| u.as_hyphenated().to_string())
}

pub fn is_uuid_like(raw: &str) -> bool {
    parse_uuid(raw).is_some()
}

/// Normalizes a caller-supplied primary identifier, generating one when the
/// caller left it empty.
pub fn normalize_uuid(raw: &str) -> Result<String, MetaError> {
    if raw.trim().is_empty() {
        return Ok(Uuid::new_v4().as_hyphenated().to_string());
    }
    parse_uuid(raw).ok_or_else(|| MetaError::InvalidInput(format!("'{raw}' is not a valid uuid")))
}

#[cfg(test)]
mod tests {
    use super::{is_uuid_like, normalize_uuid, parse_uuid};
    use crate::error::MetaError;

    #[test]
    fn uuids_are_normalized_to_lowercase_hyphenated() {
        let parsed = parse_uuid("6F9619FF8B86D011B42D00C04FC964FF").expect("uuid");
        assert_eq!(parsed, "6f9619ff-8b86-d011-b42d-00c04fc964ff");
        assert!(is_uuid_like("6f9619ff-8b86-d011-b42d-00c04fc964ff"));
        assert!(!is_uuid_like("web-1"));
    }

    #[test]
    fn empty_uuid_is_generated_and_garbage_rejected() {
        let a = normalize_uuid("").expect("generated");
        let b = normalize_uuid("  ").expect("generated");
        assert_ne!(a, b);
        assert!(is_uuid_like(&a));

        let err = normalize_uuid("not-a-uuid").expect_err("garbage");
        assert!(matches!(err, MetaError::InvalidInput(_)));
    }
}
