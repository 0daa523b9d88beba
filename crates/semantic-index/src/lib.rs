//! Identifier-stable nearest-neighbour index for related-content queries.
//!
//! Content keys (site paths) grow without bound across builds, while the
//! similarity index only understands dense slots in `[0, capacity)`.
//! [`RelatedIndex`] reconciles the two: [`LabelMap`] keeps a one-to-one
//! slot/key mapping, the indexer hands out slots and forwards vectors, and the
//! resolver turns nearest slots back into keys.

pub mod ann;
pub mod bimap;
mod error;
mod indexer;
mod related;

pub use ann::{FlatIndex, Neighbor, SimilarityIndex};
pub use bimap::{BiMap, LabelMap};
pub use error::SemanticError;
pub use related::SelfMatch;

use core_types::config::{Metric, SemanticConfig};
use core_types::{ContentKey, SlotId};

/// Slot mapping plus the similarity index it addresses.
///
/// Not internally synchronised: callers that index from several tasks must
/// serialise access, since slot assignment reads then writes.
pub struct RelatedIndex {
    labels: LabelMap,
    index: Box<dyn SimilarityIndex>,
    next_slot: u32,
}

impl RelatedIndex {
    pub fn new(index: impl SimilarityIndex + 'static) -> Self {
        Self {
            labels: LabelMap::new(),
            index: Box::new(index),
            next_slot: 0,
        }
    }

    /// Exact in-process index sized from configuration.
    pub fn flat(dimensions: usize, capacity: usize, metric: Metric) -> Self {
        Self::new(FlatIndex::new(dimensions, capacity, metric))
    }

    pub fn from_config(cfg: &SemanticConfig) -> Self {
        Self::flat(cfg.dimensions, cfg.capacity, cfg.metric)
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Number of registered content keys.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub const fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn slot_of(&self, key: &str) -> Option<SlotId> {
        self.labels.get_by_value(key).copied()
    }

    pub fn key_of(&self, slot: SlotId) -> Option<&ContentKey> {
        self.labels.get(&slot)
    }
}

impl std::fmt::Debug for RelatedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelatedIndex")
            .field("len", &self.labels.len())
            .field("next_slot", &self.next_slot)
            .field("dimensions", &self.index.dimensions())
            .field("capacity", &self.index.capacity())
            .finish_non_exhaustive()
    }
}
