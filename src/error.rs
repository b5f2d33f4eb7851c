use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Partition,
    ObjectType,
    ProviderType,
    Object,
    PropertyDefinition,
    ObjectDefinition,
    Bootstrap,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Partition => write!(f, "partition"),
            ResourceType::ObjectType => write!(f, "object type"),
            ResourceType::ProviderType => write!(f, "provider type"),
            ResourceType::Object => write!(f, "object"),
            ResourceType::PropertyDefinition => write!(f, "property definition"),
            ResourceType::ObjectDefinition => write!(f, "object definition"),
            ResourceType::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaErrorCode {
    NotFound,
    Duplicate,
    GenerationConflict,
    MultipleRecordsFound,
    InvalidInput,
    PermissionDenied,
    Timeout,
    Unknown,
}

impl MetaErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            MetaErrorCode::NotFound => "not_found",
            MetaErrorCode::Duplicate => "duplicate",
            MetaErrorCode::GenerationConflict => "generation_conflict",
            MetaErrorCode::MultipleRecordsFound => "multiple_records_found",
            MetaErrorCode::InvalidInput => "invalid_input",
            MetaErrorCode::PermissionDenied => "permission_denied",
            MetaErrorCode::Timeout => "timeout",
            MetaErrorCode::Unknown => "unknown",
        }
    }
}

/// Failures reported by a [`crate::kv::KvBackend`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid backend request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("{resource_type} '{resource_id}' not found")]
    NotFound {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("{resource_type} '{resource_id}' already exists")]
    Duplicate {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("{resource_type} '{resource_id}' was modified concurrently")]
    GenerationConflict {
        resource_type: ResourceType,
        resource_id: String,
    },
    #[error("{count} {resource_type} records matched '{query}', expected exactly one")]
    MultipleRecordsFound {
        resource_type: ResourceType,
        query: String,
        count: usize,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("backing store call '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error for key '{key}': {message}")]
    Decode { key: String, message: String },
    #[error("backing store error: {0}")]
    Backend(#[from] KvError),
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
    #[error("internal error")]
    Internal,
}

impl MetaError {
    pub fn not_found(resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        MetaError::NotFound {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    pub fn duplicate(resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        MetaError::Duplicate {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    pub fn conflict(resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        MetaError::GenerationConflict {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    pub fn code(&self) -> MetaErrorCode {
        match self {
            MetaError::NotFound { .. } => MetaErrorCode::NotFound,
            MetaError::Duplicate { .. } => MetaErrorCode::Duplicate,
            MetaError::GenerationConflict { .. } => MetaErrorCode::GenerationConflict,
            MetaError::MultipleRecordsFound { .. } => MetaErrorCode::MultipleRecordsFound,
            MetaError::InvalidInput(_) => MetaErrorCode::InvalidInput,
            MetaError::PermissionDenied(_) => MetaErrorCode::PermissionDenied,
            MetaError::Timeout { .. } => MetaErrorCode::Timeout,
            MetaError::Encode(_)
            | MetaError::Decode { .. }
            | MetaError::Backend(_)
            | MetaError::InvalidConfig { .. }
            | MetaError::Internal => MetaErrorCode::Unknown,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    /// Conflicts and timeouts are worth a caller-side retry; nothing is
    /// retried inside the store.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MetaError::Timeout { .. } | MetaError::GenerationConflict { .. }
        )
    }

    /// Message safe to hand back to a remote caller.
    pub fn public_message(&self) -> String {
        match self.code() {
            MetaErrorCode::Unknown => MetaError::Internal.to_string(),
            _ => self.to_string(),
        }
    }
}
