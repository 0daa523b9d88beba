use core_types::SlotId;
use thiserror::Error;

/// Failures surfaced by indexing and related-content queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("similarity index is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },
    #[error("vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("slot {slot} returned by the similarity index has no content key")]
    ConsistencyViolation { slot: SlotId },
}
