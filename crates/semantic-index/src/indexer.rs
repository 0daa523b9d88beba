use crate::ann::check_dimensions;
use crate::{RelatedIndex, SemanticError};
use core_types::{ContentKey, SlotId};
use tracing::{debug, trace};

impl RelatedIndex {
    /// Index `vector` under `key`, returning the key's slot.
    ///
    /// A key seen before keeps its slot and its vector is replaced. A new key
    /// takes the next fresh slot, which is only registered once the similarity
    /// index accepted the vector; on failure the mapping is left untouched.
    pub fn index_content(&mut self, key: &str, vector: &[f32]) -> Result<SlotId, SemanticError> {
        check_dimensions(self.index.dimensions(), vector.len())?;

        if let Some(slot) = self.slot_of(key) {
            self.index.insert(slot, vector)?;
            debug!(key, %slot, "re-indexed existing content");
            return Ok(slot);
        }

        // The last u32 is never handed out, so a fresh slot cannot alias one in use.
        let Some(after) = self.next_slot.checked_add(1) else {
            return Err(SemanticError::CapacityExceeded {
                capacity: self.index.capacity(),
            });
        };
        let slot = SlotId(self.next_slot);
        self.index.insert(slot, vector)?;
        self.labels.insert(slot, ContentKey::from(key));
        self.next_slot = after;
        trace!(key, %slot, "indexed new content");
        Ok(slot)
    }
}
