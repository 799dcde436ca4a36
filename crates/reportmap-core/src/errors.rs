use reportmap_core_types::SessionId;
use thiserror::Error;

use crate::model::EntityKind;

/// Result type alias using the canonical ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Lookup
    NotFound,

    // Identity map invariants
    /// A second instance was offered for an already-mapped (kind, id)
    DuplicateIdentity,

    // Store boundary
    Persistence,
    /// A row returned by the store does not match the entity's row schema
    MalformedRow,

    // Unit of work
    /// A queued operation failed while the queue was being flushed
    Flush,

    // Document structure
    CycleDetected,
    MultipleParents,

    // Validation / integration
    InvalidInput,
    Serialization,
    Io,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::DuplicateIdentity => "ERR_DUPLICATE_IDENTITY",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::MalformedRow => "ERR_MALFORMED_ROW",
            ExErrorKind::Flush => "ERR_FLUSH",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::MultipleParents => "ERR_MULTIPLE_PARENTS",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and, for flush
/// failures, the record of which queued operations were already applied.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<EntityKind>,
    entity_id: Option<i64>,
    session_id: Option<SessionId>,
    message: String,
    source: Option<Box<ExError>>,
    applied: Option<Vec<String>>,
    failed_op: Option<String>,
    remaining: Option<usize>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            entity_id: None,
            session_id: None,
            message: String::new(),
            source: None,
            applied: None,
            failed_op: None,
            remaining: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity kind and primary key context
    pub fn with_entity(mut self, entity: EntityKind, id: i64) -> Self {
        self.entity = Some(entity);
        self.entity_id = Some(id);
        self
    }

    /// Add session context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Labels of the operations a failed flush had already applied
    pub fn with_applied(mut self, labels: Vec<String>) -> Self {
        self.applied = Some(labels);
        self
    }

    /// Label of the queued operation that failed
    pub fn with_failed_op(mut self, label: impl Into<String>) -> Self {
        self.failed_op = Some(label.into());
        self
    }

    /// Number of operations still queued after the failure
    pub fn with_remaining(mut self, remaining: usize) -> Self {
        self.remaining = Some(remaining);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity kind context, if any
    pub fn entity(&self) -> Option<EntityKind> {
        self.entity
    }

    /// Get the primary key context, if any
    pub fn entity_id(&self) -> Option<i64> {
        self.entity_id
    }

    /// Get the session context, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Operations applied before a flush failed (populated on `Flush`)
    pub fn applied(&self) -> Option<&[String]> {
        self.applied.as_deref()
    }

    /// The operation a flush failed on (populated on `Flush`)
    pub fn failed_op(&self) -> Option<&str> {
        self.failed_op.as_deref()
    }

    /// Operations left in the queue (populated on `Flush`)
    pub fn remaining(&self) -> Option<usize> {
        self.remaining
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let (Some(entity), Some(id)) = (self.entity, self.entity_id) {
            write!(f, " ({}#{})", entity, id)?;
        }
        if let Some(failed) = &self.failed_op {
            write!(f, " (failed: {})", failed)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain-level error taxonomy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    /// No row matches the requested primary key
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: i64 },

    /// A different instance is already registered for this key
    #[error("{entity}#{id} is already mapped to another instance")]
    DuplicateIdentity { entity: EntityKind, id: i64 },

    /// Operation needs a persisted entity but got a transient one
    #[error("{entity} has no primary key yet")]
    Unsaved { entity: EntityKind },

    /// Insert was asked to persist an entity that already has a key
    #[error("{entity}#{id} is already persisted")]
    AlreadyPersisted { entity: EntityKind, id: i64 },

    /// Identity field name outside the entity's schema
    #[error("{entity} has no identity field '{field}'")]
    UnknownField { entity: EntityKind, field: String },

    /// Store row is missing a column or holds the wrong scalar type
    #[error("Malformed {entity} row: column '{column}' {reason}")]
    MalformedRow {
        entity: EntityKind,
        column: String,
        reason: String,
    },

    /// Attaching a document node would create a cycle
    #[error("Attaching node '{node}' would create a cycle")]
    CycleDetected { node: String },

    /// Document node already has a parent
    #[error("Node '{node}' already has parent '{parent}'")]
    MultipleParents { node: String, parent: String },

    /// Node handle does not belong to the document
    #[error("Unknown document node: {index}")]
    UnknownNode { index: usize },

    /// Operation needs a composite node but got a field (or vice versa)
    #[error("Node '{node}' is not a {expected}")]
    WrongNodeKind { node: String, expected: String },

    /// The identity map session behind a collection was dropped
    #[error("Session is closed")]
    SessionClosed,

    /// Document encoding or decoding failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<MapError> for ExError {
    fn from(err: MapError) -> Self {
        let message = err.to_string();
        match err {
            MapError::NotFound { entity, id } => ExError::new(ExErrorKind::NotFound)
                .with_entity(entity, id)
                .with_message(message),
            MapError::DuplicateIdentity { entity, id } => {
                ExError::new(ExErrorKind::DuplicateIdentity)
                    .with_entity(entity, id)
                    .with_op("add_to_map")
                    .with_message(message)
            }
            MapError::Unsaved { .. } | MapError::UnknownField { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            MapError::AlreadyPersisted { entity, id } => ExError::new(ExErrorKind::InvalidInput)
                .with_entity(entity, id)
                .with_message(message),
            MapError::MalformedRow { .. } => {
                ExError::new(ExErrorKind::MalformedRow).with_message(message)
            }
            MapError::CycleDetected { .. } => {
                ExError::new(ExErrorKind::CycleDetected).with_message(message)
            }
            MapError::MultipleParents { .. } => {
                ExError::new(ExErrorKind::MultipleParents).with_message(message)
            }
            MapError::UnknownNode { .. } | MapError::WrongNodeKind { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            MapError::SessionClosed => ExError::new(ExErrorKind::Internal).with_message(message),
            MapError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            MapError::Internal { .. } => ExError::new(ExErrorKind::Internal).with_message(message),
        }
    }
}
