//! Lifecycle synchronization between owning entities and the allocation
//! mirror. Every function here runs inside the same atomic unit as the
//! entity mutation: the caller already holds the calendar write lock(s) and
//! the WAL append has been acknowledged.
//!
//! Invariant across all operations: at most one allocation row per entity at
//! any time, exactly one while the entity is live.

use ulid::Ulid;

use crate::model::{Allocation, AllocationKind, AllocationStatus, DateRange};

use super::store::{AllocationStore, PropertyCalendar};

/// Mirror a newly created entity: one ACTIVE row keyed by `entity_id`.
/// Callers reach this only after the conflict policy approved the range.
pub(super) fn on_create(
    store: &AllocationStore,
    calendar: &mut PropertyCalendar,
    entity_id: Ulid,
    kind: AllocationKind,
    range: DateRange,
) {
    calendar.insert(Allocation {
        id: Ulid::new(),
        property_id: calendar.property_id.clone(),
        range,
        kind,
        status: AllocationStatus::Active,
        entity_id,
    });
    store.map_entity(entity_id, calendar.property_id.clone());
}

/// Reflect a range (and possibly property) change on the single mirrored
/// row. The row keeps its id and status. With `destination` set the row
/// relocates between calendar shards; both locks are held, so no state with
/// zero or two rows for the entity is ever observable.
pub(super) fn on_update_range(
    store: &AllocationStore,
    source: &mut PropertyCalendar,
    destination: Option<&mut PropertyCalendar>,
    entity_id: Ulid,
    range: DateRange,
) {
    match destination {
        None => {
            source.update_range_by_entity(entity_id, range);
        }
        Some(dest) => {
            if let Some(mut row) = source.remove_by_entity(entity_id) {
                row.property_id = dest.property_id.clone();
                row.range = range;
                dest.insert(row);
                store.map_entity(entity_id, dest.property_id.clone());
            }
        }
    }
}

/// Booking canceled: the row stays but stops counting in conflict queries.
pub(super) fn on_cancel(calendar: &mut PropertyCalendar, entity_id: Ulid) {
    calendar.update_status_by_entity(entity_id, AllocationKind::Booking, AllocationStatus::Canceled);
}

/// Booking reactivated. The conflict re-check (self-excluded) already ran in
/// the booking service before the rebook event was emitted.
pub(super) fn on_rebook(calendar: &mut PropertyCalendar, entity_id: Ulid) {
    calendar.update_status_by_entity(entity_id, AllocationKind::Booking, AllocationStatus::Active);
}

/// Entity deleted: drop the mirrored row. Absence is not an error.
pub(super) fn on_delete(
    store: &AllocationStore,
    calendar: &mut PropertyCalendar,
    entity_id: Ulid,
) {
    calendar.remove_by_entity(entity_id);
    store.unmap_entity(entity_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn r(s: u32, e: u32) -> DateRange {
        DateRange::new(d(2025, 6, s), d(2025, 6, e))
    }

    #[test]
    fn create_then_delete_round_trip() {
        let store = AllocationStore::new();
        let mut cal = PropertyCalendar::new("p1".into());
        let entity = Ulid::new();

        on_create(&store, &mut cal, entity, AllocationKind::Booking, r(1, 3));
        assert_eq!(cal.len(), 1);
        assert_eq!(store.property_of(entity).as_deref(), Some("p1"));
        let row = cal.find_by_entity(entity).unwrap();
        assert_eq!(row.status, AllocationStatus::Active);
        assert_eq!(row.kind, AllocationKind::Booking);

        on_delete(&store, &mut cal, entity);
        assert!(cal.is_empty());
        assert!(store.property_of(entity).is_none());

        // Deleting again is harmless.
        on_delete(&store, &mut cal, entity);
        assert!(cal.is_empty());
    }

    #[test]
    fn cancel_and_rebook_toggle_status() {
        let store = AllocationStore::new();
        let mut cal = PropertyCalendar::new("p1".into());
        let entity = Ulid::new();
        on_create(&store, &mut cal, entity, AllocationKind::Booking, r(1, 3));

        on_cancel(&mut cal, entity);
        assert_eq!(cal.find_by_entity(entity).unwrap().status, AllocationStatus::Canceled);
        assert!(cal.find_overlapping(&r(1, 3)).is_empty());

        on_rebook(&mut cal, entity);
        assert_eq!(cal.find_by_entity(entity).unwrap().status, AllocationStatus::Active);
        assert_eq!(cal.find_overlapping(&r(1, 3)).len(), 1);
    }

    #[test]
    fn update_range_same_property_keeps_single_row() {
        let store = AllocationStore::new();
        let mut cal = PropertyCalendar::new("p1".into());
        let entity = Ulid::new();
        on_create(&store, &mut cal, entity, AllocationKind::Block, r(1, 3));

        on_update_range(&store, &mut cal, None, entity, r(10, 12));
        assert_eq!(cal.len(), 1);
        assert_eq!(cal.find_by_entity(entity).unwrap().range, r(10, 12));
    }

    #[test]
    fn update_range_moves_between_properties() {
        let store = AllocationStore::new();
        let mut source = PropertyCalendar::new("p1".into());
        let mut dest = PropertyCalendar::new("p2".into());
        let entity = Ulid::new();
        on_create(&store, &mut source, entity, AllocationKind::Block, r(1, 3));
        let row_id = source.find_by_entity(entity).unwrap().id;

        on_update_range(&store, &mut source, Some(&mut dest), entity, r(5, 7));
        assert!(source.is_empty());
        assert_eq!(dest.len(), 1);
        let row = dest.find_by_entity(entity).unwrap();
        assert_eq!(row.id, row_id);
        assert_eq!(row.property_id, "p2");
        assert_eq!(row.range, r(5, 7));
        assert_eq!(store.property_of(entity).as_deref(), Some("p2"));
    }
}
