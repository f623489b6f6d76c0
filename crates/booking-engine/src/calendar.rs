//! Calendar slot materialization.
//!
//! Produces per-day grids of fixed-width slots between the configured
//! operating hours, in the configured time zone. Slots are computed on
//! every request and never persisted. Confirmed reservations for the
//! whole requested range are fetched once, then every slot is converted
//! to absolute instants and tested with the interval primitive.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::CalendarConfig;
use crate::error::{BookingError, Result};
use crate::interval::{overlaps, resolve_local};
use crate::store::{ReservationStore, SpaceDirectory};
use crate::types::{Reservation, ReservationId, Space, SpaceId};

/// Requested calendar extent: one day, or seven consecutive days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarRange {
    Day,
    Week,
}

/// Availability status of a slot.
///
/// Space-scoped grids use `Available`/`Busy`; aggregate grids use
/// `Available` (at least one free space) or `Full` (none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Busy,
    Full,
}

/// Per-space availability inside one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSlot {
    pub id: SpaceId,
    pub status: SlotStatus,
    /// Occupying reservation when `status` is busy.
    pub reservation_id: Option<ReservationId>,
}

/// A computed slot within one calendar day. Times of day are in the
/// configured zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub status: SlotStatus,
    /// Occupying reservation in space-scoped mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
    /// Per-space breakdown.
    pub spaces: Vec<SpaceSlot>,
    /// Aggregate mode only: number of free spaces in this slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_spaces: Option<usize>,
    /// Aggregate mode only: number of occupied spaces in this slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_spaces: Option<usize>,
}

/// One day's slot grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGrid {
    pub day: NaiveDate,
    pub slots: Vec<Slot>,
}

/// The full calendar response. Collaborating calendar and reporting
/// consumers depend on this shape staying stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub date: NaiveDate,
    pub range: CalendarRange,
    pub days: Vec<DayGrid>,
}

/// Build a calendar grid for `date` (and the following six days when
/// `range` is `Week`).
///
/// With a `space_id`, every slot is scoped to that space and reports
/// `available`/`busy` plus the occupying reservation; the space must
/// exist and be active. Without one, every slot carries a per-space
/// breakdown across all active spaces plus availableSpaces /
/// reservedSpaces counts, and zero active spaces yields the day skeleton
/// with empty slot lists rather than an error.
///
/// # Errors
/// `Validation` for a malformed config, `NotFound` for an absent or
/// inactive space.
pub fn build_calendar<S: SpaceDirectory, R: ReservationStore>(
    spaces: &S,
    reservations: &R,
    config: &CalendarConfig,
    date: NaiveDate,
    range: CalendarRange,
    space_id: Option<SpaceId>,
) -> Result<CalendarView> {
    config.validate()?;
    let tz = config.timezone;

    let days: Vec<NaiveDate> = match range {
        CalendarRange::Day => vec![date],
        CalendarRange::Week => (0..7).map(|i| date + Duration::days(i)).collect(),
    };

    // Resolve the target space list up front so a bad space id fails
    // before any reservation scan.
    let scoped_space = match space_id {
        Some(id) => {
            let space = spaces
                .get(id)?
                .filter(|s| s.active)
                .ok_or_else(|| BookingError::NotFound(format!("space {id} absent or inactive")))?;
            Some(space)
        }
        None => None,
    };
    let active_spaces: Vec<Space> = match &scoped_space {
        Some(space) => vec![space.clone()],
        None => spaces.list_active()?,
    };

    // Zero active spaces in aggregate mode: return the day skeleton.
    if scoped_space.is_none() && active_spaces.is_empty() {
        return Ok(CalendarView {
            date,
            range,
            days: days.into_iter().map(|day| DayGrid { day, slots: vec![] }).collect(),
        });
    }

    // One bulk fetch covering the entire requested range, half-open
    // [first day 00:00 local, day-after-last 00:00 local).
    let range_start = window_bound(tz, days[0].and_time(NaiveTime::MIN), -Duration::hours(1));
    let last = days[days.len() - 1] + Duration::days(1);
    let range_end = window_bound(tz, last.and_time(NaiveTime::MIN), Duration::hours(1));
    let loaded = reservations.find_confirmed_overlapping(space_id, range_start, range_end)?;

    let mut grids = Vec::with_capacity(days.len());
    for day in days {
        let mut slots = Vec::new();
        for (slot_start, slot_end) in slot_times(day, config) {
            // Slots whose wall-clock boundaries do not exist on this day
            // (DST spring-forward gap) are skipped.
            let (Some(abs_start), Some(abs_end)) =
                (resolve_local(tz, slot_start), resolve_local(tz, slot_end))
            else {
                continue;
            };

            let slot = match &scoped_space {
                Some(space) => scoped_slot(space, &loaded, slot_start, slot_end, abs_start, abs_end),
                None => {
                    aggregate_slot(&active_spaces, &loaded, slot_start, slot_end, abs_start, abs_end)
                }
            };
            slots.push(slot);
        }
        grids.push(DayGrid { day, slots });
    }

    Ok(CalendarView {
        date,
        range,
        days: grids,
    })
}

/// Wall-clock slot boundaries for one day: fixed width, first slot at
/// day start, and a trailing slot shorter than the configured width is
/// omitted rather than truncated.
fn slot_times(day: NaiveDate, config: &CalendarConfig) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let step = Duration::minutes(i64::from(config.slot_minutes));
    let limit = day.and_time(config.day_end);
    let mut cursor = day.and_time(config.day_start);

    let mut out = Vec::new();
    while cursor < limit {
        let next = cursor + step;
        if next > limit {
            break;
        }
        out.push((cursor, next));
        cursor = next;
    }
    out
}

fn scoped_slot(
    space: &Space,
    loaded: &[Reservation],
    slot_start: NaiveDateTime,
    slot_end: NaiveDateTime,
    abs_start: DateTime<Utc>,
    abs_end: DateTime<Utc>,
) -> Slot {
    let occupying = loaded
        .iter()
        .find(|r| r.space_id == space.id && overlaps(r.start, r.end, abs_start, abs_end));
    let status = if occupying.is_some() {
        SlotStatus::Busy
    } else {
        SlotStatus::Available
    };
    Slot {
        start: slot_start.time(),
        end: slot_end.time(),
        status,
        reservation_id: occupying.map(|r| r.id),
        spaces: vec![SpaceSlot {
            id: space.id,
            status,
            reservation_id: occupying.map(|r| r.id),
        }],
        available_spaces: None,
        reserved_spaces: None,
    }
}

fn aggregate_slot(
    active_spaces: &[Space],
    loaded: &[Reservation],
    slot_start: NaiveDateTime,
    slot_end: NaiveDateTime,
    abs_start: DateTime<Utc>,
    abs_end: DateTime<Utc>,
) -> Slot {
    let spaces: Vec<SpaceSlot> = active_spaces
        .iter()
        .map(|space| {
            let occupying = loaded
                .iter()
                .find(|r| r.space_id == space.id && overlaps(r.start, r.end, abs_start, abs_end));
            SpaceSlot {
                id: space.id,
                status: if occupying.is_some() {
                    SlotStatus::Busy
                } else {
                    SlotStatus::Available
                },
                reservation_id: occupying.map(|r| r.id),
            }
        })
        .collect();

    let reserved = spaces.iter().filter(|s| s.status == SlotStatus::Busy).count();
    let available = active_spaces.len() - reserved;
    Slot {
        start: slot_start.time(),
        end: slot_end.time(),
        status: if available > 0 {
            SlotStatus::Available
        } else {
            SlotStatus::Full
        },
        reservation_id: None,
        spaces,
        available_spaces: Some(available),
        reserved_spaces: Some(reserved),
    }
}

/// Resolve a local fetch-window bound to UTC, widening by `step` while
/// the wall-clock time sits inside a DST gap. Widening only ever grows
/// the fetch window, so no reservation in range is missed.
fn window_bound(tz: Tz, local: NaiveDateTime, step: Duration) -> DateTime<Utc> {
    let mut probe = local;
    for _ in 0..4 {
        match tz.from_local_datetime(&probe) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                return dt.with_timezone(&Utc)
            }
            LocalResult::None => probe += step,
        }
    }
    // Unreachable for real zones (gaps are at most a few hours); treat
    // the wall-clock value as UTC rather than failing the read path.
    probe.and_utc()
}
