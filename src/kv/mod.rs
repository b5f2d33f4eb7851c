pub mod memory;

use crate::error::KvError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryKv;

pub type Revision = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
    /// Number of writes since the key was (re)created. A missing key has
    /// version 0.
    pub version: u64,
    pub create_revision: Revision,
    pub mod_revision: Revision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascend,
    Descend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRange {
    Exact(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub range: KeyRange,
    pub sort: SortOrder,
    pub limit: Option<usize>,
}

impl GetRequest {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            range: KeyRange::Exact(key.into()),
            sort: SortOrder::Ascend,
            limit: None,
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            range: KeyRange::Prefix(prefix.into()),
            sort: SortOrder::Ascend,
            limit: None,
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    VersionEquals { key: String, version: u64 },
    VersionGreaterThan { key: String, version: u64 },
}

impl Precondition {
    pub fn absent(key: impl Into<String>) -> Self {
        Precondition::VersionEquals {
            key: key.into(),
            version: 0,
        }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Precondition::VersionGreaterThan {
            key: key.into(),
            version: 0,
        }
    }

    pub fn at_version(key: impl Into<String>, version: u64) -> Self {
        Precondition::VersionEquals {
            key: key.into(),
            version,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Precondition::VersionEquals { key, .. }
            | Precondition::VersionGreaterThan { key, .. } => key,
        }
    }

    pub fn holds(&self, current_version: u64) -> bool {
        match self {
            Precondition::VersionEquals { version, .. } => current_version == *version,
            Precondition::VersionGreaterThan { version, .. } => current_version > *version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl TxnOp {
    pub fn key(&self) -> &str {
        match self {
            TxnOp::Put { key, .. } | TxnOp::Delete { key } => key,
        }
    }
}

/// A multi-key compare-and-write: every precondition must hold for any of
/// the operations to apply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Txn {
    pub preconditions: Vec<Precondition>,
    pub ops: Vec<TxnOp>,
}

impl Txn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn put(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.ops.push(TxnOp::Put {
            key: key.into(),
            value,
        });
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push(TxnOp::Delete { key: key.into() });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnOutcome {
    pub succeeded: bool,
    pub revision: Revision,
    pub failed_precondition: Option<usize>,
}

/// Capability contract of the backing store: linearizable reads, per-key
/// versions, atomic multi-key compare-and-write and ordered prefix scans.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, request: GetRequest) -> Result<Vec<KvEntry>, KvError>;

    async fn put(&self, key: String, value: Vec<u8>) -> Result<Revision, KvError>;

    /// Returns the number of keys removed (0 or 1).
    async fn delete(&self, key: String) -> Result<u64, KvError>;

    async fn txn(&self, txn: Txn) -> Result<TxnOutcome, KvError>;
}
