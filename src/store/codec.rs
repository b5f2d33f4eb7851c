use crate::error::MetaError;
use crate::kv::KvEntry;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, MetaError> {
    rmp_serde::to_vec_named(value).map_err(|e| MetaError::Encode(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(entry: &KvEntry) -> Result<T, MetaError> {
    rmp_serde::from_slice(&entry.value).map_err(|e| MetaError::Decode {
        key: entry.key.clone(),
        message: e.to_string(),
    })
}

/// Index entries hold the uuid they point at as UTF-8.
pub(crate) fn decode_index(entry: &KvEntry) -> Result<String, MetaError> {
    String::from_utf8(entry.value.clone()).map_err(|e| MetaError::Decode {
        key: entry.key.clone(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_index, encode};
    use crate::catalog::{Object, PropertyDefinition, PropertySchema, PropertyValueType};
    use crate::error::MetaError;
    use crate::kv::KvEntry;
    use crate::permission::{PermissionBits, PropertyPermission};

    fn entry(value: Vec<u8>) -> KvEntry {
        KvEntry {
            key: "k".into(),
            value,
            version: 1,
            create_revision: 1,
            mod_revision: 1,
        }
    }

    #[test]
    fn records_survive_the_record_codec() {
        let object = Object::new("p1", "machine", "web-1")
            .with_uuid("u1")
            .with_project("ops")
            .with_property("arch", "x86")
            .with_tag("edge");
        let back: Object = decode(&entry(encode(&object).expect("encode"))).expect("decode");
        assert_eq!(back, object);

        let def = PropertyDefinition::new("p1", "machine", "arch")
            .with_schema(PropertySchema::of_type(PropertyValueType::String))
            .with_permission(PropertyPermission::for_role(
                "admin",
                PermissionBits::READ | PermissionBits::WRITE,
            ))
            .required();
        let back: PropertyDefinition =
            decode(&entry(encode(&def).expect("encode"))).expect("decode");
        assert_eq!(back, def);
    }

    #[test]
    fn garbage_reports_the_key() {
        let err = decode::<Object>(&entry(vec![0xc1])).expect_err("garbage");
        assert!(matches!(err, MetaError::Decode { ref key, .. } if key == "k"));
        assert!(decode_index(&entry(vec![0xff, 0xfe])).is_err());
        assert_eq!(
            decode_index(&entry(b"abc".to_vec())).expect("utf8"),
            "abc"
        );
    }
}
