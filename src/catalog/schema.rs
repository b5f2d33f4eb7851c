use crate::catalog::types::PROVIDER_OBJECT_TYPE;
use crate::error::MetaError;
use crate::permission::{PermissionBits, PropertyPermission, Session, permits};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValueType {
    String,
    Integer,
    Number,
    Boolean,
}

/// The subset of JSON schema that property values are checked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub value_type: Option<PropertyValueType>,
    #[serde(rename = "enum")]
    pub allowed: Vec<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl PropertySchema {
    pub fn of_type(value_type: PropertyValueType) -> Self {
        Self {
            value_type: Some(value_type),
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, MetaError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let schema: Self = serde_json::from_str(text)
            .map_err(|e| MetaError::InvalidInput(format!("invalid property schema: {e}")))?;
        schema.check()?;
        Ok(schema)
    }

    pub fn to_json(&self) -> Result<String, MetaError> {
        serde_json::to_string(self).map_err(|e| MetaError::Encode(e.to_string()))
    }

    pub fn check(&self) -> Result<(), MetaError> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length)
            && min > max
        {
            return Err(MetaError::InvalidInput(
                "property schema minLength exceeds maxLength".into(),
            ));
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum)
            && min > max
        {
            return Err(MetaError::InvalidInput(
                "property schema minimum exceeds maximum".into(),
            ));
        }
        Ok(())
    }

    pub fn validate(&self, key: &str, value: &str) -> Result<(), MetaError> {
        let invalid = |reason: String| {
            Err(MetaError::InvalidInput(format!(
                "property '{key}' value '{value}' {reason}"
            )))
        };
        let numeric = match self.value_type {
            None | Some(PropertyValueType::String) => None,
            Some(PropertyValueType::Integer) => match value.parse::<i64>() {
                Ok(v) => Some(v as f64),
                Err(_) => return invalid("is not an integer".into()),
            },
            Some(PropertyValueType::Number) => match value.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => return invalid("is not a number".into()),
            },
            Some(PropertyValueType::Boolean) => {
                if value != "true" && value != "false" {
                    return invalid("is not a boolean".into());
                }
                None
            }
        };
        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == value) {
            return invalid(format!("is not one of {:?}", self.allowed));
        }
        let length = value.chars().count();
        if let Some(min) = self.min_length
            && length < min
        {
            return invalid(format!("is shorter than {min}"));
        }
        if let Some(max) = self.max_length
            && length > max
        {
            return invalid(format!("is longer than {max}"));
        }
        if let Some(number) = numeric {
            if let Some(min) = self.minimum
                && number < min as f64
            {
                return invalid(format!("is below the minimum {min}"));
            }
            if let Some(max) = self.maximum
                && number > max as f64
            {
                return invalid(format!("is above the maximum {max}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub partition: String,
    pub object_type: String,
    pub key: String,
    #[serde(default)]
    pub schema: PropertySchema,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub permissions: Vec<PropertyPermission>,
}

impl PropertyDefinition {
    pub fn new(
        partition: impl Into<String>,
        object_type: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            object_type: object_type.into(),
            key: key.into(),
            schema: PropertySchema::default(),
            is_required: false,
            permissions: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: PropertySchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_permission(mut self, permission: PropertyPermission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn validate_value(&self, value: &str) -> Result<(), MetaError> {
        self.schema.validate(&self.key, value)
    }

    pub fn allows(&self, session: &Session, wanted: PermissionBits) -> bool {
        permits(&self.permissions, session, wanted)
    }

    pub fn display_id(&self) -> String {
        format!("{}/{}/{}", self.partition, self.object_type, self.key)
    }
}

/// Validation and authorization envelope for one object type. `partition`
/// of `None` is the global default.
///
/// `property_permissions` gates object writes through the service: setting
/// or changing a listed property needs WRITE from one of its entries.
/// `schema` is carried for clients and only checked to be valid JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectDefinition {
    pub object_type: String,
    #[serde(default)]
    pub partition: Option<String>,
    pub schema: String,
    #[serde(default)]
    pub property_permissions: BTreeMap<String, Vec<PropertyPermission>>,
}

impl ObjectDefinition {
    pub fn new(object_type: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            partition: None,
            schema: schema.into(),
            property_permissions: BTreeMap::new(),
        }
    }

    pub fn for_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn with_property_permissions(
        mut self,
        key: impl Into<String>,
        permissions: Vec<PropertyPermission>,
    ) -> Self {
        self.property_permissions.insert(key.into(), permissions);
        self
    }

    pub fn is_global(&self) -> bool {
        self.partition.as_deref().map(str::is_empty).unwrap_or(true)
    }

    pub fn check(&self) -> Result<(), MetaError> {
        if self.object_type.is_empty() {
            return Err(MetaError::InvalidInput(
                "object definition requires an object type".into(),
            ));
        }
        serde_json::from_str::<serde_json::Value>(&self.schema).map_err(|e| {
            MetaError::InvalidInput(format!(
                "object definition schema for '{}' is not valid JSON: {e}",
                self.object_type
            ))
        })?;
        Ok(())
    }
}

pub fn default_provider_definition() -> ObjectDefinition {
    ObjectDefinition::new(
        PROVIDER_OBJECT_TYPE,
        r#"{"type":"object","properties":{"provider_type":{"type":"string"},"parent":{"type":"string"}}}"#,
    )
    .with_property_permissions(
        "provider_type",
        vec![PropertyPermission::global(
            PermissionBits::READ | PermissionBits::WRITE,
        )],
    )
}
