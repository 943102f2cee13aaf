use ulid::Ulid;

use crate::limits::*;
use crate::model::DateRange;

use super::store::PropertyCalendar;
use super::EngineError;

/// Decide whether `range` may be claimed on this property.
///
/// Only ACTIVE allocations count. With `exclude` set (update/rebook paths)
/// the entity's own row is ignored, so re-claiming an unchanged range is
/// always legal. Read-only; safe to call repeatedly.
pub(crate) fn check_available(
    calendar: &PropertyCalendar,
    range: &DateRange,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    let conflict = calendar
        .find_overlapping(range)
        .into_iter()
        .find(|a| exclude.is_none_or(|entity_id| a.entity_id != entity_id));

    match conflict {
        Some(hit) => Err(EngineError::Conflict {
            property_id: calendar.property_id.clone(),
            range: *range,
            with: hit.kind,
        }),
        None => Ok(()),
    }
}

// ── Local input validation (fail fast, never touches a calendar) ──

pub(crate) fn validate_property_id(property_id: &str) -> Result<(), EngineError> {
    if property_id.trim().is_empty() {
        return Err(EngineError::InvalidInput("propertyId must not be empty"));
    }
    if property_id.len() > MAX_PROPERTY_ID_LEN {
        return Err(EngineError::LimitExceeded("propertyId too long"));
    }
    Ok(())
}

pub(crate) fn validate_range(range: &DateRange) -> Result<(), EngineError> {
    if range.end < range.start {
        return Err(EngineError::InvalidInput(
            "endDate must not be before startDate",
        ));
    }
    if range.days() > MAX_RANGE_DAYS {
        return Err(EngineError::LimitExceeded("date range too wide"));
    }
    Ok(())
}

pub(crate) fn validate_guest(name: &str, email: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidInput("guestName must not be empty"));
    }
    if name.len() > MAX_GUEST_NAME_LEN {
        return Err(EngineError::LimitExceeded("guestName too long"));
    }
    if email.len() > MAX_GUEST_EMAIL_LEN {
        return Err(EngineError::LimitExceeded("guestEmail too long"));
    }
    if !is_valid_email(email) {
        return Err(EngineError::InvalidInput(
            "guestEmail is not a valid email address",
        ));
    }
    Ok(())
}

/// Syntactic check only: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
