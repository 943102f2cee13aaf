use ulid::Ulid;

use crate::model::{AllocationKind, DateRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NotFound(Ulid),
    /// Local validation failure. Never reaches the allocation calendar.
    InvalidInput(&'static str),
    LimitExceeded(&'static str),
    /// The requested range overlaps an ACTIVE allocation on the property.
    Conflict {
        property_id: String,
        range: DateRange,
        with: AllocationKind,
    },
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Conflict {
                property_id,
                range,
                with,
            } => {
                write!(
                    f,
                    "dates {} to {} on property {property_id} conflict with an existing {with}",
                    range.start, range.end
                )
            }
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
