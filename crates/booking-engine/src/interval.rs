//! Half-open interval primitive used by every other module.
//!
//! All overlap decisions in the engine reduce to [`overlaps`] over absolute
//! (zone-independent) instants. Wall-clock inputs must be normalized with
//! [`resolve_local`] before comparison; comparing local clock strings
//! directly is incorrect across daylight-saving or cross-midnight
//! boundaries.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// True iff `[a_start, a_end)` and `[b_start, b_end)` overlap.
///
/// Two intervals overlap iff `a_start < b_end && b_start < a_end`. This
/// excludes the adjacent case where one ends exactly when the other
/// starts. Callers reject inverted ranges (`start >= end`) before calling;
/// this predicate never sees them.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Resolve a wall-clock datetime in `tz` to an absolute UTC instant.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier of the two
/// instants. Returns `None` for local times that do not exist (DST
/// spring-forward gap); callers decide whether that means skip or error.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
