use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::{Allocation, AllocationKind, AllocationStatus, DateRange};

pub type SharedCalendar = Arc<RwLock<PropertyCalendar>>;

/// All allocations on a single property, sorted by `range.start`.
///
/// One calendar is one lock scope: every check-then-write against a property
/// runs under this shard's write lock, so writes to different properties
/// never contend.
#[derive(Debug)]
pub struct PropertyCalendar {
    pub property_id: String,
    allocations: Vec<Allocation>,
}

impl PropertyCalendar {
    pub fn new(property_id: String) -> Self {
        Self {
            property_id,
            allocations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Insert maintaining sort order by range.start.
    pub fn insert(&mut self, allocation: Allocation) {
        let pos = self
            .allocations
            .binary_search_by_key(&allocation.range.start, |a| a.range.start)
            .unwrap_or_else(|e| e);
        self.allocations.insert(pos, allocation);
    }

    pub fn find_by_entity(&self, entity_id: Ulid) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.entity_id == entity_id)
    }

    pub fn remove_by_entity(&mut self, entity_id: Ulid) -> Option<Allocation> {
        let pos = self.allocations.iter().position(|a| a.entity_id == entity_id)?;
        Some(self.allocations.remove(pos))
    }

    /// All allocations whose range overlaps the query window, any status.
    /// Binary search skips allocations starting after `query.end`.
    pub fn overlapping(&self, query: &DateRange) -> impl Iterator<Item = &Allocation> {
        // Everything at index >= right_bound starts after query.end → can't
        // overlap under inclusive bounds.
        let right_bound = self
            .allocations
            .partition_point(|a| a.range.start <= query.end);
        self.allocations[..right_bound]
            .iter()
            .filter(move |a| a.range.end >= query.start)
    }

    /// ACTIVE allocations overlapping the window, the conflict-query
    /// contract. Canceled rows never count.
    pub fn find_overlapping(&self, query: &DateRange) -> Vec<Allocation> {
        self.overlapping(query)
            .filter(|a| a.status == AllocationStatus::Active)
            .cloned()
            .collect()
    }

    /// Move the entity's single row to a new range, keeping id, kind and
    /// status. Returns false if the entity has no row here.
    pub fn update_range_by_entity(&mut self, entity_id: Ulid, range: DateRange) -> bool {
        match self.remove_by_entity(entity_id) {
            Some(mut row) => {
                row.range = range;
                self.insert(row);
                true
            }
            None => false,
        }
    }

    /// Flip the status of the entity's row, matching on kind. Returns false
    /// if no row matches.
    pub fn update_status_by_entity(
        &mut self,
        entity_id: Ulid,
        kind: AllocationKind,
        status: AllocationStatus,
    ) -> bool {
        match self
            .allocations
            .iter_mut()
            .find(|a| a.entity_id == entity_id && a.kind == kind)
        {
            Some(row) => {
                row.status = status;
                true
            }
            None => false,
        }
    }
}

/// The allocation mirror, sharded per property.
///
/// Calendars are created lazily on first use and never removed; an empty
/// calendar is just a name and a lock.
pub struct AllocationStore {
    calendars: DashMap<String, SharedCalendar>,
    /// Reverse lookup: owning entity id → property id.
    entity_to_property: DashMap<Ulid, String>,
}

impl Default for AllocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationStore {
    pub fn new() -> Self {
        Self {
            calendars: DashMap::new(),
            entity_to_property: DashMap::new(),
        }
    }

    /// Get or lazily create the calendar shard for a property.
    pub fn calendar(&self, property_id: &str) -> SharedCalendar {
        self.calendars
            .entry(property_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(PropertyCalendar::new(property_id.to_string()))))
            .clone()
    }

    pub fn get_calendar(&self, property_id: &str) -> Option<SharedCalendar> {
        self.calendars.get(property_id).map(|e| e.value().clone())
    }

    pub fn property_of(&self, entity_id: Ulid) -> Option<String> {
        self.entity_to_property
            .get(&entity_id)
            .map(|e| e.value().clone())
    }

    pub fn map_entity(&self, entity_id: Ulid, property_id: String) {
        self.entity_to_property.insert(entity_id, property_id);
    }

    pub fn unmap_entity(&self, entity_id: Ulid) {
        self.entity_to_property.remove(&entity_id);
    }
}
