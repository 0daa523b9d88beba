//! Similarity index capability and the in-process implementation.

mod flat;

pub use flat::{FlatIndex, MAX_SLOTS};

use crate::SemanticError;
use core_types::SlotId;

/// One search hit: a slot and its distance to the query (smaller is closer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub slot: SlotId,
    pub distance: f32,
}

/// Fixed-capacity vector store answering k-nearest-neighbour queries.
///
/// Implementations hold at most [`SimilarityIndex::capacity`] slots, each with
/// one vector of [`SimilarityIndex::dimensions`] components. Inserting into an
/// occupied slot replaces its vector.
pub trait SimilarityIndex: Send {
    fn dimensions(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Number of occupied slots.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `vector` under `slot`. Fails with `CapacityExceeded` when
    /// `slot >= capacity`.
    fn insert(&mut self, slot: SlotId, vector: &[f32]) -> Result<(), SemanticError>;

    /// Up to `k` occupied slots ordered by ascending distance to `query`.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, SemanticError>;
}

pub(crate) const fn check_dimensions(expected: usize, actual: usize) -> Result<(), SemanticError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SemanticError::DimensionMismatch { expected, actual })
    }
}
