use super::{Neighbor, SimilarityIndex, check_dimensions};
use crate::SemanticError;
use core_types::SlotId;
use core_types::config::Metric;

/// Largest capacity addressable by a `u32` slot id.
pub const MAX_SLOTS: usize = u32::MAX as usize;

/// Exhaustive similarity index over a contiguous vector buffer.
///
/// Exact search standing in for an approximate (HNSW) index: it is cheap at
/// site scale (a few thousand posts) and makes neighbour order deterministic,
/// with ties broken by slot id. An ANN backend plugs in through
/// [`SimilarityIndex`].
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    capacity: usize,
    metric: Metric,
    // Row `i` holds the vector for slot `i`; rows grow lazily up to `capacity`.
    vectors: Vec<f32>,
    occupied: Vec<bool>,
    len: usize,
}

impl FlatIndex {
    /// `capacity` is clamped to [`MAX_SLOTS`].
    pub const fn new(dimensions: usize, capacity: usize, metric: Metric) -> Self {
        Self {
            dimensions,
            capacity: if capacity > MAX_SLOTS { MAX_SLOTS } else { capacity },
            metric,
            vectors: Vec::new(),
            occupied: Vec::new(),
            len: 0,
        }
    }

    pub const fn metric(&self) -> Metric {
        self.metric
    }

    /// Stored vector for `slot`, if occupied.
    pub fn vector(&self, slot: SlotId) -> Option<&[f32]> {
        let idx = slot.index();
        if !self.occupied.get(idx).copied().unwrap_or(false) {
            return None;
        }
        let start = idx * self.dimensions;
        Some(&self.vectors[start..start + self.dimensions])
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            Metric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            Metric::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
                for (x, y) in a.iter().zip(b) {
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    return 1.0;
                }
                1.0 - dot / (na.sqrt() * nb.sqrt())
            }
        }
    }
}

impl SimilarityIndex for FlatIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.len
    }

    fn insert(&mut self, slot: SlotId, vector: &[f32]) -> Result<(), SemanticError> {
        check_dimensions(self.dimensions, vector.len())?;
        let idx = slot.index();
        if idx >= self.capacity {
            return Err(SemanticError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        if idx >= self.occupied.len() {
            self.occupied.resize(idx + 1, false);
            self.vectors.resize((idx + 1) * self.dimensions, 0.0);
        }
        let start = idx * self.dimensions;
        self.vectors[start..start + self.dimensions].copy_from_slice(vector);
        if !self.occupied[idx] {
            self.occupied[idx] = true;
            self.len += 1;
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, SemanticError> {
        check_dimensions(self.dimensions, query.len())?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = self
            .vectors
            .chunks_exact(self.dimensions.max(1))
            .zip(&self.occupied)
            .enumerate()
            .filter(|(_, (_, occupied))| **occupied)
            .filter_map(|(idx, (row, _))| {
                Some(Neighbor {
                    slot: SlotId(u32::try_from(idx).ok()?),
                    distance: self.distance(query, row),
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.slot.cmp(&b.slot)));
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(hits: &[Neighbor]) -> Vec<u32> {
        hits.iter().map(|n| n.slot.0).collect()
    }

    #[test]
    fn capacity_is_clamped_to_slot_id_range() {
        assert_eq!(FlatIndex::new(4, usize::MAX, Metric::L2).capacity(), MAX_SLOTS);
        assert_eq!(FlatIndex::new(4, 16, Metric::L2).capacity(), 16);

        let mut index = FlatIndex::new(1, usize::MAX, Metric::L2);
        assert_eq!(
            index.insert(SlotId(u32::MAX), &[1.0]),
            Err(SemanticError::CapacityExceeded { capacity: MAX_SLOTS })
        );
    }

    #[test]
    fn search_orders_by_l2_distance() {
        let mut index = FlatIndex::new(2, 4, Metric::L2);
        index.insert(SlotId(0), &[1.0, 0.0]).unwrap();
        index.insert(SlotId(1), &[0.0, 1.0]).unwrap();
        index.insert(SlotId(2), &[1.0, 1.0]).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(slots(&hits), vec![0, 2, 1]);
        assert!(hits[0].distance.abs() < f32::EPSILON);
        assert!((hits[1].distance - 1.0).abs() < 1e-6);
        assert!((hits[2].distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let mut index = FlatIndex::new(2, 4, Metric::Cosine);
        index.insert(SlotId(0), &[10.0, 0.0]).unwrap();
        index.insert(SlotId(1), &[0.0, 0.5]).unwrap();

        let hits = index.search(&[0.1, 0.0], 2).unwrap();
        assert_eq!(slots(&hits), vec![0, 1]);
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn insert_into_occupied_slot_replaces_vector() {
        let mut index = FlatIndex::new(2, 2, Metric::L2);
        index.insert(SlotId(0), &[1.0, 0.0]).unwrap();
        index.insert(SlotId(0), &[0.0, 0.0]).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.vector(SlotId(0)), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn slot_beyond_capacity_is_rejected() {
        let mut index = FlatIndex::new(2, 2, Metric::L2);
        let err = index.insert(SlotId(2), &[1.0, 1.0]).unwrap_err();
        assert_eq!(err, SemanticError::CapacityExceeded { capacity: 2 });
        assert!(index.is_empty());
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mut index = FlatIndex::new(3, 2, Metric::L2);
        assert_eq!(
            index.insert(SlotId(0), &[1.0]).unwrap_err(),
            SemanticError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        );
        assert!(index.search(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn sparse_slots_are_skipped_and_k_caps_results() {
        let mut index = FlatIndex::new(1, 8, Metric::L2);
        index.insert(SlotId(5), &[5.0]).unwrap();
        index.insert(SlotId(1), &[1.0]).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.vector(SlotId(3)), None);
        assert_eq!(slots(&index.search(&[0.0], 10).unwrap()), vec![1, 5]);
        assert_eq!(slots(&index.search(&[0.0], 1).unwrap()), vec![1]);
        assert!(index.search(&[0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn equal_distances_break_ties_by_slot() {
        let mut index = FlatIndex::new(1, 4, Metric::L2);
        index.insert(SlotId(2), &[1.0]).unwrap();
        index.insert(SlotId(0), &[-1.0]).unwrap();
        assert_eq!(slots(&index.search(&[0.0], 2).unwrap()), vec![0, 2]);
    }
}
