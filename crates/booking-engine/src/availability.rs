//! Per-window availability search.
//!
//! Linear scan: every active space matching the optional type filter is
//! included iff no confirmed reservation on it overlaps the requested
//! window. The overlapping reservation set is fetched once and the scan
//! runs against it in memory.

use chrono::{NaiveDate, NaiveTime};

use crate::config::CalendarConfig;
use crate::error::{BookingError, Result};
use crate::interval::resolve_local;
use crate::store::{ReservationStore, SpaceDirectory};
use crate::types::{Space, SpaceType};

/// Find every active space free for the whole `[start, end)` window on
/// `date`, optionally restricted to one space type.
///
/// The wall-clock inputs are interpreted in the configured zone and
/// normalized to absolute instants before any comparison.
///
/// # Errors
/// `Validation` when `start >= end` or a boundary falls in a DST gap.
pub fn search_available<S: SpaceDirectory, R: ReservationStore>(
    spaces: &S,
    reservations: &R,
    config: &CalendarConfig,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    kind: Option<SpaceType>,
) -> Result<Vec<Space>> {
    if start >= end {
        return Err(BookingError::Validation(
            "start time must be before end time".into(),
        ));
    }

    let tz = config.timezone;
    let window_start = resolve_local(tz, date.and_time(start)).ok_or_else(|| {
        BookingError::Validation(format!("{start} does not exist on {date} in {tz}"))
    })?;
    let window_end = resolve_local(tz, date.and_time(end)).ok_or_else(|| {
        BookingError::Validation(format!("{end} does not exist on {date} in {tz}"))
    })?;

    let candidates: Vec<Space> = spaces
        .list_active()?
        .into_iter()
        .filter(|s| kind.is_none_or(|k| s.kind == k))
        .collect();

    // Everything returned here already overlaps the window, so a space is
    // busy iff any loaded reservation belongs to it.
    let busy = reservations.find_confirmed_overlapping(None, window_start, window_end)?;

    Ok(candidates
        .into_iter()
        .filter(|space| !busy.iter().any(|r| r.space_id == space.id))
        .collect())
}
