use crate::{RelatedIndex, SemanticError};
use core_types::{ContentKey, SlotId};
use tracing::error;

/// How the querying item's own hit is removed from the neighbour list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfMatch {
    /// Drop this slot wherever it ranks. Correct even when another item has a
    /// byte-identical embedding.
    Slot(SlotId),
    /// Drop the nearest hit, assuming it is the query itself.
    Leading,
    /// The query is not indexed; keep every hit.
    None,
}

impl RelatedIndex {
    /// Keys of the items nearest to `query`, closest first.
    ///
    /// `k` counts the querying item itself, so at most `k - 1` keys come back.
    /// A hit whose slot has no registered key is an internal inconsistency and
    /// fails the whole query instead of being skipped.
    pub fn find_related(
        &self,
        query: &[f32],
        k: usize,
        self_match: SelfMatch,
    ) -> Result<Vec<ContentKey>, SemanticError> {
        if k < 2 {
            return Ok(Vec::new());
        }

        let mut hits = self.index.search(query, k)?.into_iter();
        if self_match == SelfMatch::Leading {
            hits.next();
        }

        hits.filter(|hit| !matches!(self_match, SelfMatch::Slot(own) if own == hit.slot))
            .take(k - 1)
            .map(|hit| self.resolve(hit.slot))
            .collect()
    }

    fn resolve(&self, slot: SlotId) -> Result<ContentKey, SemanticError> {
        self.labels.get(&slot).cloned().ok_or_else(|| {
            error!(
                %slot,
                indexed = self.index.len(),
                labelled = self.labels.len(),
                "similarity index returned a slot with no content key"
            );
            SemanticError::ConsistencyViolation { slot }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::config::Metric;

    fn keys(found: &[ContentKey]) -> Vec<&str> {
        found.iter().map(ContentKey::as_str).collect()
    }

    fn abc() -> RelatedIndex {
        let mut index = RelatedIndex::flat(2, 3, Metric::L2);
        index.index_content("a", &[1.0, 0.0]).unwrap();
        index.index_content("b", &[0.0, 1.0]).unwrap();
        index.index_content("c", &[1.0, 1.0]).unwrap();
        index
    }

    #[test]
    fn unindexed_query_returns_nearest_keys() {
        let index = abc();
        let found = index.find_related(&[1.0, 0.0], 2, SelfMatch::None).unwrap();
        assert_eq!(keys(&found), vec!["a"]);
    }

    #[test]
    fn own_slot_is_excluded_by_identity() {
        let index = abc();
        let own = index.slot_of("a").unwrap();
        let found = index
            .find_related(&[1.0, 0.0], 3, SelfMatch::Slot(own))
            .unwrap();
        assert_eq!(keys(&found), vec!["c", "b"]);
    }

    #[test]
    fn leading_hit_is_dropped_positionally() {
        let index = abc();
        let found = index.find_related(&[1.0, 0.0], 3, SelfMatch::Leading).unwrap();
        assert_eq!(keys(&found), vec!["c", "b"]);
    }

    #[test]
    fn identical_twin_is_kept_when_excluding_by_slot() {
        let mut index = RelatedIndex::flat(2, 4, Metric::L2);
        index.index_content("twin-1", &[0.5, 0.5]).unwrap();
        index.index_content("twin-2", &[0.5, 0.5]).unwrap();
        index.index_content("far", &[9.0, 9.0]).unwrap();

        let own = index.slot_of("twin-2").unwrap();
        let found = index
            .find_related(&[0.5, 0.5], 3, SelfMatch::Slot(own))
            .unwrap();
        assert_eq!(keys(&found), vec!["twin-1", "far"]);
    }

    #[test]
    fn result_never_exceeds_k_minus_one() {
        let index = abc();
        let found = index.find_related(&[0.0, 0.0], 3, SelfMatch::None).unwrap();
        assert_eq!(found.len(), 2);
        assert!(index.find_related(&[0.0, 0.0], 1, SelfMatch::None).unwrap().is_empty());
        assert!(index.find_related(&[0.0, 0.0], 0, SelfMatch::None).unwrap().is_empty());
    }

    #[test]
    fn small_index_returns_fewer_results() {
        let mut index = RelatedIndex::flat(2, 8, Metric::L2);
        index.index_content("only", &[1.0, 0.0]).unwrap();
        let own = index.slot_of("only").unwrap();
        assert!(index
            .find_related(&[1.0, 0.0], 5, SelfMatch::Slot(own))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reindexed_vector_moves_in_ranking() {
        let mut index = abc();
        assert_eq!(index.index_content("a", &[0.0, 0.0]), Ok(SlotId(0)));

        let own = index.slot_of("c").unwrap();
        let found = index
            .find_related(&[1.0, 1.0], 3, SelfMatch::Slot(own))
            .unwrap();
        assert_eq!(keys(&found), vec!["b", "a"]);
    }

    #[test]
    fn unlabelled_slot_is_a_consistency_violation() {
        let mut index = abc();
        index.labels.remove(&SlotId(2));

        let err = index
            .find_related(&[1.0, 1.0], 2, SelfMatch::None)
            .unwrap_err();
        assert_eq!(err, SemanticError::ConsistencyViolation { slot: SlotId(2) });
    }

    #[test]
    fn query_dimension_mismatch_is_reported() {
        let index = abc();
        assert_eq!(
            index.find_related(&[1.0], 2, SelfMatch::None).unwrap_err(),
            SemanticError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
