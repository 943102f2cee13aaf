use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_available, validate_guest, validate_property_id, validate_range};
use super::{Engine, EngineError};

impl Engine {
    /// Create an ACTIVE booking if the dates are free. Validation, conflict
    /// check, entity write and mirror write form one atomic unit under the
    /// property's calendar lock; a rejection persists nothing.
    pub async fn create_booking(
        &self,
        property_id: String,
        guest_name: String,
        guest_email: String,
        range: DateRange,
    ) -> Result<Booking, EngineError> {
        validate_property_id(&property_id)?;
        validate_guest(&guest_name, &guest_email)?;
        validate_range(&range)?;

        let cal = self.store.calendar(&property_id);
        let mut guard = cal.write_owned().await;
        if guard.len() >= MAX_ALLOCATIONS_PER_PROPERTY {
            return Err(EngineError::LimitExceeded("too many allocations on property"));
        }
        check_available(&guard, &range, None)?;

        let booking = Booking {
            id: Ulid::new(),
            property_id,
            guest_name,
            guest_email,
            range,
            status: BookingStatus::Active,
        };
        let event = Event::BookingCreated {
            id: booking.id,
            property_id: booking.property_id.clone(),
            guest_name: booking.guest_name.clone(),
            guest_email: booking.guest_email.clone(),
            range,
        };
        self.wal_append(&event).await?;
        self.apply_event_locked(&event, &mut guard, None);
        Ok(booking)
    }

    pub fn get_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        self.bookings
            .get(&id)
            .map(|b| b.value().clone())
            .ok_or(EngineError::NotFound(id))
    }

    /// Replace guest details and date range. The conflict check runs against
    /// the candidate range with the booking's own allocation excluded, so an
    /// unchanged range always passes. Every update re-validates in full.
    pub async fn update_booking(
        &self,
        id: Ulid,
        guest_name: String,
        guest_email: String,
        range: DateRange,
    ) -> Result<Booking, EngineError> {
        validate_guest(&guest_name, &guest_email)?;
        validate_range(&range)?;

        let (booking, mut guard) = self.lock_booking(id).await?;
        check_available(&guard, &range, Some(id))?;

        let event = Event::BookingUpdated {
            id,
            guest_name: guest_name.clone(),
            guest_email: guest_email.clone(),
            range,
        };
        self.wal_append(&event).await?;
        self.apply_event_locked(&event, &mut guard, None);
        Ok(Booking {
            guest_name,
            guest_email,
            range,
            ..booking
        })
    }

    /// Cancel a booking. Canceling an already-canceled booking is a no-op
    /// success and emits no event.
    pub async fn cancel_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let (booking, mut guard) = self.lock_booking(id).await?;
        if booking.status == BookingStatus::Canceled {
            return Ok(booking);
        }
        let event = Event::BookingCanceled { id };
        self.wal_append(&event).await?;
        self.apply_event_locked(&event, &mut guard, None);
        Ok(Booking {
            status: BookingStatus::Canceled,
            ..booking
        })
    }

    /// Reactivate a canceled booking if its stored range is still free.
    /// Already-active bookings return unchanged. On conflict the booking
    /// stays CANCELED and the error surfaces to the caller.
    pub async fn rebook_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let (booking, mut guard) = self.lock_booking(id).await?;
        if booking.status == BookingStatus::Active {
            return Ok(booking);
        }
        check_available(&guard, &booking.range, Some(id))?;

        let event = Event::BookingRebooked { id };
        self.wal_append(&event).await?;
        self.apply_event_locked(&event, &mut guard, None);
        Ok(Booking {
            status: BookingStatus::Active,
            ..booking
        })
    }

    /// Remove a booking and its mirrored allocation. Unknown ids are a
    /// success with no effect.
    pub async fn delete_booking(&self, id: Ulid) -> Result<(), EngineError> {
        let (_, mut guard) = match self.lock_booking(id).await {
            Ok(locked) => locked,
            Err(EngineError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        let event = Event::BookingDeleted { id };
        self.wal_append(&event).await?;
        self.apply_event_locked(&event, &mut guard, None);
        Ok(())
    }

    /// Bookings of a property overlapping the window, any status, ordered by
    /// start date. Point-in-time read, runs concurrently with writes.
    pub fn list_bookings(&self, property_id: &str, range: &DateRange) -> Vec<Booking> {
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().property_id == property_id && e.value().range.overlaps(range))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|b| b.range.start);
        out
    }
}
