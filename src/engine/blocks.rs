use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_available, validate_property_id, validate_range};
use super::{Engine, EngineError};

impl Engine {
    /// Create a block if the dates are free. Same atomic unit as booking
    /// creation: nothing persists on rejection.
    pub async fn create_block(
        &self,
        property_id: String,
        range: DateRange,
    ) -> Result<Block, EngineError> {
        validate_property_id(&property_id)?;
        validate_range(&range)?;

        let cal = self.store.calendar(&property_id);
        let mut guard = cal.write_owned().await;
        if guard.len() >= MAX_ALLOCATIONS_PER_PROPERTY {
            return Err(EngineError::LimitExceeded("too many allocations on property"));
        }
        check_available(&guard, &range, None)?;

        let block = Block {
            id: Ulid::new(),
            property_id,
            range,
        };
        let event = Event::BlockCreated {
            id: block.id,
            property_id: block.property_id.clone(),
            range,
        };
        self.wal_append(&event).await?;
        self.apply_event_locked(&event, &mut guard, None);
        Ok(block)
    }

    /// Update a block's property and range. The conflict check runs against
    /// the candidate values on the target property with the block's own
    /// allocation excluded. Moving to another property locks both calendars
    /// in sorted key order.
    pub async fn update_block(
        &self,
        id: Ulid,
        property_id: String,
        range: DateRange,
    ) -> Result<Block, EngineError> {
        validate_property_id(&property_id)?;
        validate_range(&range)?;

        loop {
            // lock_block guarantees the guard is the block's current home.
            let (block, mut guard) = self.lock_block(id).await?;

            if block.property_id == property_id {
                check_available(&guard, &range, Some(id))?;
                let event = Event::BlockUpdated {
                    id,
                    property_id: property_id.clone(),
                    range,
                };
                self.wal_append(&event).await?;
                self.apply_event_locked(&event, &mut guard, None);
                return Ok(Block {
                    id,
                    property_id,
                    range,
                });
            }
            let source_property = block.property_id;
            drop(guard);

            // Cross-property move: take both calendar locks in sorted key
            // order (same discipline everywhere, so no lock cycles).
            let source_cal = self.store.calendar(&source_property);
            let dest_cal = self.store.calendar(&property_id);
            let (mut source_guard, mut dest_guard) = if source_property < property_id {
                let s = source_cal.write_owned().await;
                let d = dest_cal.write_owned().await;
                (s, d)
            } else {
                let d = dest_cal.write_owned().await;
                let s = source_cal.write_owned().await;
                (s, d)
            };

            // Re-read under the locks; the block may have moved or vanished
            // while we waited.
            match self.blocks.get(&id).map(|b| b.property_id.clone()) {
                Some(current) if current == source_property => {}
                Some(_) => continue, // moved while we waited, re-resolve
                None => return Err(EngineError::NotFound(id)),
            }

            if dest_guard.len() >= MAX_ALLOCATIONS_PER_PROPERTY {
                return Err(EngineError::LimitExceeded("too many allocations on property"));
            }
            check_available(&dest_guard, &range, Some(id))?;

            let event = Event::BlockUpdated {
                id,
                property_id: property_id.clone(),
                range,
            };
            self.wal_append(&event).await?;
            self.apply_event_locked(&event, &mut source_guard, Some(&mut *dest_guard));
            return Ok(Block {
                id,
                property_id,
                range,
            });
        }
    }

    /// Remove a block and its mirrored allocation. Unknown ids are a
    /// success with no effect.
    pub async fn delete_block(&self, id: Ulid) -> Result<(), EngineError> {
        let (_, mut guard) = match self.lock_block(id).await {
            Ok(locked) => locked,
            Err(EngineError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        let event = Event::BlockDeleted { id };
        self.wal_append(&event).await?;
        self.apply_event_locked(&event, &mut guard, None);
        Ok(())
    }

    /// Blocks of a property overlapping the window, ordered by start date.
    pub fn list_blocks(&self, property_id: &str, range: &DateRange) -> Vec<Block> {
        let mut out: Vec<Block> = self
            .blocks
            .iter()
            .filter(|e| e.value().property_id == property_id && e.value().range.overlaps(range))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|b| b.range.start);
        out
    }
}
