use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Inclusive calendar-date interval `[start, end]`.
///
/// Both endpoints are occupied days: two ranges that merely touch
/// (`a.end == b.start`) overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "DateRange start must not be after end");
        Self { start, end }
    }

    /// Width in days, inclusive of both endpoints.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    #[allow(dead_code)]
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// First through last day of a calendar month. `None` for out-of-range input.
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(DateRange { start, end })
}

/// What claimed an allocation on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationKind {
    Booking,
    Block,
}

impl std::fmt::Display for AllocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationKind::Booking => write!(f, "booking"),
            AllocationKind::Block => write!(f, "block"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Active,
    Canceled,
}

/// One date range claimed on a property: the unified mirror row shared by
/// bookings and blocks. `entity_id` is the owning Booking or Block.
///
/// Canceled rows stay on the calendar but are invisible to conflict queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub id: Ulid,
    pub property_id: String,
    pub range: DateRange,
    pub kind: AllocationKind,
    pub status: AllocationStatus,
    pub entity_id: Ulid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Active,
    Canceled,
}

/// A guest reservation. Created Active; cancel/rebook toggle the status,
/// delete removes it entirely. The property never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: Ulid,
    pub property_id: String,
    pub guest_name: String,
    pub guest_email: String,
    pub range: DateRange,
    pub status: BookingStatus,
}

/// An owner-maintenance hold on a property. No status field; existence implies
/// active. Updates may move it to a different property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: Ulid,
    pub property_id: String,
    pub range: DateRange,
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        id: Ulid,
        property_id: String,
        guest_name: String,
        guest_email: String,
        range: DateRange,
    },
    BookingUpdated {
        id: Ulid,
        guest_name: String,
        guest_email: String,
        range: DateRange,
    },
    BookingCanceled {
        id: Ulid,
    },
    BookingRebooked {
        id: Ulid,
    },
    BookingDeleted {
        id: Ulid,
    },
    BlockCreated {
        id: Ulid,
        property_id: String,
        range: DateRange,
    },
    BlockUpdated {
        id: Ulid,
        property_id: String,
        range: DateRange,
    },
    BlockDeleted {
        id: Ulid,
    },
}
