//! Metadata catalog over a versioned key-value store.
//!
//! Partitions, object types, objects, property definitions and object
//! definitions are stored under a single root prefix. Every multi-key write
//! is a compare-and-swap transaction, so uniqueness of names and uuids holds
//! without any lock outside the store.

pub mod catalog;
pub mod condition;
pub mod config;
pub mod error;
pub mod filter;
pub mod keys;
pub mod kv;
pub mod permission;
pub mod service;
pub mod store;
pub mod type_cache;

pub use catalog::{
    Object, ObjectDefinition, ObjectScope, ObjectType, Partition, PropertyDefinition,
    PropertySchema, PropertyValueType, ProviderType,
};
pub use condition::{
    Matches, ObjectCondition, PropertyCondition, PropertyDefinitionCondition, StringMatch,
};
pub use config::MetaConfig;
pub use error::{MetaError, MetaErrorCode, ResourceType};
pub use filter::{ObjectFilter, PropertyDefinitionFilter, SearchTerm};
pub use keys::KeyCodec;
pub use kv::{KvBackend, MemoryKv};
pub use permission::{PermissionBits, PropertyPermission, Session};
pub use service::MetadataService;
pub use store::{DeleteReport, Store};
pub use type_cache::ObjectTypeCache;
