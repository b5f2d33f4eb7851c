use crate::error::KvError;
use crate::kv::{
    GetRequest, KeyRange, KvBackend, KvEntry, Revision, SortOrder, Txn, TxnOp, TxnOutcome,
};
use async_trait::async_trait;
use im::OrdMap;
use parking_lot::RwLock;
use std::ops::Bound;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entries: OrdMap<String, KvEntry>,
    revision: Revision,
}

impl MemoryState {
    fn version_of(&self, key: &str) -> u64 {
        self.entries.get(key).map(|e| e.version).unwrap_or(0)
    }

    fn apply_put(&mut self, key: String, value: Vec<u8>, revision: Revision) {
        let (version, create_revision) = match self.entries.get(&key) {
            Some(existing) => (existing.version + 1, existing.create_revision),
            None => (1, revision),
        };
        self.entries.insert(
            key.clone(),
            KvEntry {
                key,
                value,
                version,
                create_revision,
                mod_revision: revision,
            },
        );
    }
}

/// In-process backend. Every call takes the state lock once, which makes
/// reads linearizable and transactions atomic.
#[derive(Debug, Default)]
pub struct MemoryKv {
    state: RwLock<MemoryState>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persistent clone of every entry at the current revision.
    pub fn snapshot(&self) -> OrdMap<String, KvEntry> {
        self.state.read().entries.clone()
    }

    pub fn revision(&self) -> Revision {
        self.state.read().revision
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, request: GetRequest) -> Result<Vec<KvEntry>, KvError> {
        let state = self.state.read();
        let limit = request.limit.unwrap_or(usize::MAX);
        let mut out: Vec<KvEntry> = match &request.range {
            KeyRange::Exact(key) => state.entries.get(key).cloned().into_iter().collect(),
            KeyRange::Prefix(prefix) => {
                let range = (Bound::Included(prefix.clone()), Bound::Unbounded);
                let matching = state
                    .entries
                    .range(range)
                    .take_while(|(k, _)| k.starts_with(prefix.as_str()))
                    .map(|(_, v)| v.clone());
                match request.sort {
                    SortOrder::Ascend => matching.take(limit).collect(),
                    SortOrder::Descend => matching.collect::<Vec<_>>(),
                }
            }
        };
        if request.sort == SortOrder::Descend {
            out.reverse();
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn put(&self, key: String, value: Vec<u8>) -> Result<Revision, KvError> {
        if key.is_empty() {
            return Err(KvError::InvalidRequest("empty key".into()));
        }
        let mut state = self.state.write();
        state.revision += 1;
        let revision = state.revision;
        state.apply_put(key, value, revision);
        Ok(revision)
    }

    async fn delete(&self, key: String) -> Result<u64, KvError> {
        let mut state = self.state.write();
        if state.entries.remove(&key).is_none() {
            return Ok(0);
        }
        state.revision += 1;
        Ok(1)
    }

    async fn txn(&self, txn: Txn) -> Result<TxnOutcome, KvError> {
        if txn.ops.iter().any(|op| op.key().is_empty()) {
            return Err(KvError::InvalidRequest("empty key in transaction".into()));
        }
        let mut state = self.state.write();
        for (index, precondition) in txn.preconditions.iter().enumerate() {
            if !precondition.holds(state.version_of(precondition.key())) {
                return Ok(TxnOutcome {
                    succeeded: false,
                    revision: state.revision,
                    failed_precondition: Some(index),
                });
            }
        }
        if txn.ops.is_empty() {
            return Ok(TxnOutcome {
                succeeded: true,
                revision: state.revision,
                failed_precondition: None,
            });
        }
        state.revision += 1;
        let revision = state.revision;
        for op in txn.ops {
            match op {
                TxnOp::Put { key, value } => state.apply_put(key, value, revision),
                TxnOp::Delete { key } => {
                    state.entries.remove(&key);
                }
            }
        }
        Ok(TxnOutcome {
            succeeded: true,
            revision,
            failed_precondition: None,
        })
    }
}
