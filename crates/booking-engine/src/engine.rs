//! Reservation lifecycle, waitlist queue, and promotion cascade.
//!
//! [`BookingEngine`] ties the injected stores and notifier together and
//! exposes the typed operation surface. The overlap-check-then-write
//! sequences (create, modify, the promotion's nested create, and the
//! waitlist's existence-check-then-insert) are serialized with an
//! exclusive in-process lock per space id; that lock is what upholds the
//! per-space non-overlap invariant under concurrent callers. A storage
//! backend with its own transactional uniqueness guarantee makes the
//! lock redundant but never incorrect.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::availability;
use crate::calendar::{self, CalendarRange, CalendarView};
use crate::config::CalendarConfig;
use crate::error::{BookingError, Result};
use crate::notify::Notifier;
use crate::store::{
    NewReservation, NewWaitlistEntry, ReservationStore, SpaceDirectory, WaitlistStore,
};
use crate::types::{
    Identity, Reservation, ReservationId, ReservationStatus, Space, SpaceId, SpaceType, UserId,
    WaitlistEntry, WaitlistStatus,
};

/// The core reservation engine.
///
/// Stateless per request apart from the injected stores; the only piece
/// of engine-owned state is the per-space lock registry.
pub struct BookingEngine<S, R, W, N> {
    spaces: S,
    reservations: R,
    waitlist: W,
    notifier: N,
    config: CalendarConfig,
    locks: DashMap<SpaceId, Arc<Mutex<()>>>,
}

impl<S, R, W, N> BookingEngine<S, R, W, N>
where
    S: SpaceDirectory,
    R: ReservationStore,
    W: WaitlistStore,
    N: Notifier,
{
    /// Build an engine from its collaborators.
    ///
    /// # Errors
    /// `Validation` when the calendar configuration is malformed.
    pub fn new(
        spaces: S,
        reservations: R,
        waitlist: W,
        notifier: N,
        config: CalendarConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            spaces,
            reservations,
            waitlist,
            notifier,
            config,
            locks: DashMap::new(),
        })
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Reservation lifecycle
    // -----------------------------------------------------------------

    /// Create a confirmed reservation for `user_id` on `space_id`.
    ///
    /// # Errors
    /// `NotFound` (space absent), `Validation` (`start >= end`), `State`
    /// (space inactive), `Conflict` (overlap with another confirmed
    /// reservation on the space).
    pub fn create_reservation(
        &self,
        space_id: SpaceId,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Reservation> {
        let reservation = self.create_confirmed(space_id, user_id, start, end)?;
        self.dispatch(
            user_id,
            "Reservation confirmed",
            &format!(
                "Your reservation {} for space {} from {} to {} is confirmed.",
                reservation.receipt_code, space_id, start, end
            ),
        );
        Ok(reservation)
    }

    /// Move an existing reservation to a new window, in place. Id and
    /// receipt code are preserved. The reservation being modified is
    /// excluded from its own overlap check.
    ///
    /// # Errors
    /// `NotFound`, `Authorization` (requester neither owner nor admin),
    /// `Validation`, `State` (already cancelled), `Conflict`.
    pub fn modify_reservation(
        &self,
        reservation_id: ReservationId,
        requester: &Identity,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Reservation> {
        let mut reservation = self.require_owned(reservation_id, requester)?;
        if new_start >= new_end {
            return Err(BookingError::Validation("start must be before end".into()));
        }
        if reservation.status == ReservationStatus::Cancelled {
            return Err(BookingError::State(
                "cannot modify a cancelled reservation".into(),
            ));
        }

        {
            let lock = self.space_lock(reservation.space_id);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            if self.reservations.has_confirmed_overlap(
                reservation.space_id,
                new_start,
                new_end,
                Some(reservation.id),
            )? {
                return Err(BookingError::Conflict(
                    "requested window is already reserved".into(),
                ));
            }
            reservation.start = new_start;
            reservation.end = new_end;
            self.reservations.update(&reservation)?;
        }

        self.dispatch(
            reservation.user_id,
            "Reservation updated",
            &format!(
                "Reservation {} now runs from {} to {}.",
                reservation.receipt_code, new_start, new_end
            ),
        );
        Ok(reservation)
    }

    /// Cancel a reservation. Idempotent: cancelling an already-cancelled
    /// reservation succeeds with no further side effects. A first-time
    /// cancellation persists the cancelled status, dispatches a
    /// best-effort notice, then makes exactly one promotion attempt for
    /// the freed window.
    ///
    /// # Errors
    /// `NotFound`, `Authorization`.
    pub fn cancel_reservation(
        &self,
        reservation_id: ReservationId,
        requester: &Identity,
    ) -> Result<Reservation> {
        let owned = self.require_owned(reservation_id, requester)?;

        let reservation = {
            let lock = self.space_lock(owned.space_id);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            // Re-read under the lock: a concurrent cancel may have won
            // the race between the ownership check and here. Whichever
            // caller flips the status first is the only one that
            // notifies and promotes.
            let mut current = self
                .reservations
                .get(reservation_id)?
                .ok_or_else(|| BookingError::NotFound(format!("reservation {reservation_id}")))?;
            if current.status == ReservationStatus::Cancelled {
                // No duplicate promotion, no duplicate notice.
                return Ok(current);
            }
            current.status = ReservationStatus::Cancelled;
            // The cancelled state must be durable before any promotion runs.
            self.reservations.update(&current)?;
            current
        };

        self.dispatch(
            reservation.user_id,
            "Reservation cancelled",
            &format!("Reservation {} was cancelled.", reservation.receipt_code),
        );

        // Promotion runs outside the lock: its nested create re-acquires
        // it, and any racer grabbing the freed window first is resolved
        // by that create's own serialized overlap check.
        self.promote(reservation.space_id, reservation.start, reservation.end);
        Ok(reservation)
    }

    // -----------------------------------------------------------------
    // Waitlist
    // -----------------------------------------------------------------

    /// Queue `user_id` for the exact `[start, end)` window on a space.
    ///
    /// Idempotent: if a pending entry for the exact (user, space, start,
    /// end) tuple already exists it is returned unchanged, with no
    /// position reassignment and no repeated notice.
    ///
    /// # Errors
    /// `Validation` (`start >= end`), `NotFound` (space absent).
    pub fn join_waitlist(
        &self,
        space_id: SpaceId,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WaitlistEntry> {
        if start >= end {
            return Err(BookingError::Validation("start must be before end".into()));
        }
        self.spaces
            .get(space_id)?
            .ok_or_else(|| BookingError::NotFound(format!("space {space_id}")))?;

        let entry = {
            // Serializes the existence check against concurrent identical
            // joins, so repeats can never race into duplicate rows.
            let lock = self.space_lock(space_id);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(existing) = self
                .waitlist
                .find_pending_exact(user_id, space_id, start, end)?
            {
                return Ok(existing);
            }
            let position = u32::try_from(self.waitlist.count_pending(space_id, start, end)?)
                .map_err(|_| BookingError::Storage("waitlist position overflow".into()))?
                + 1;
            self.waitlist.insert(NewWaitlistEntry {
                space_id,
                user_id,
                start,
                end,
                position,
            })?
        };

        self.dispatch(
            user_id,
            "Added to waitlist",
            &format!(
                "You are number {} in line for space {} from {} to {}.",
                entry.position, space_id, start, end
            ),
        );
        Ok(entry)
    }

    /// Every waitlist entry for a space, ordered by start, position, id.
    ///
    /// # Errors
    /// `NotFound` when the space does not exist.
    pub fn list_waitlist(&self, space_id: SpaceId) -> Result<Vec<WaitlistEntry>> {
        self.spaces
            .get(space_id)?
            .ok_or_else(|| BookingError::NotFound(format!("space {space_id}")))?;
        self.waitlist.list_for_space(space_id)
    }

    // -----------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------

    /// Materialize the calendar slot grid. See [`calendar::build_calendar`].
    pub fn get_calendar(
        &self,
        date: NaiveDate,
        range: CalendarRange,
        space_id: Option<SpaceId>,
    ) -> Result<CalendarView> {
        calendar::build_calendar(
            &self.spaces,
            &self.reservations,
            &self.config,
            date,
            range,
            space_id,
        )
    }

    /// Find spaces free for a window. See [`availability::search_available`].
    pub fn search_available(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        kind: Option<SpaceType>,
    ) -> Result<Vec<Space>> {
        availability::search_available(
            &self.spaces,
            &self.reservations,
            &self.config,
            date,
            start,
            end,
            kind,
        )
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Validate inputs and insert a confirmed reservation under the
    /// space lock. Shared by the public create path and the promotion
    /// cascade; does not dispatch any notification.
    fn create_confirmed(
        &self,
        space_id: SpaceId,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Reservation> {
        let space = self
            .spaces
            .get(space_id)?
            .ok_or_else(|| BookingError::NotFound(format!("space {space_id}")))?;
        if start >= end {
            return Err(BookingError::Validation("start must be before end".into()));
        }
        if !space.active {
            return Err(BookingError::State(format!(
                "space {space_id} is inactive"
            )));
        }

        let lock = self.space_lock(space_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self
            .reservations
            .has_confirmed_overlap(space_id, start, end, None)?
        {
            return Err(BookingError::Conflict(
                "requested window is already reserved".into(),
            ));
        }
        self.reservations.insert(NewReservation {
            space_id,
            user_id,
            start,
            end,
            receipt_code: receipt_code(),
        })
    }

    /// One promotion attempt for a freed window. Invoked only from
    /// cancellation; never surfaces a failure to the canceller.
    ///
    /// The lowest-position pending entry whose window exactly equals the
    /// freed one is promoted via the ordinary create path. If creation
    /// fails (someone raced in and booked the window first) the entry
    /// stays pending for the next cancellation of that same window; there
    /// is no fallback matching and no retry.
    fn promote(&self, space_id: SpaceId, start: DateTime<Utc>, end: DateTime<Utc>) {
        let entry = match self.waitlist.first_pending(space_id, start, end) {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(err) => {
                warn!(space_id, %err, "waitlist lookup failed; skipping promotion");
                return;
            }
        };

        match self.create_confirmed(space_id, entry.user_id, start, end) {
            Ok(reservation) => {
                let mut converted = entry;
                converted.status = WaitlistStatus::Converted;
                if let Err(err) = self.waitlist.update(&converted) {
                    warn!(
                        entry = converted.id,
                        %err,
                        "failed to mark waitlist entry converted"
                    );
                    return;
                }
                info!(
                    space_id,
                    user = converted.user_id,
                    reservation = reservation.id,
                    "promoted waitlist entry"
                );
                self.dispatch(
                    converted.user_id,
                    "Reservation confirmed",
                    &format!(
                        "A spot opened up: reservation {} for space {} from {} to {} is yours.",
                        reservation.receipt_code, space_id, start, end
                    ),
                );
            }
            Err(err) => {
                info!(space_id, entry = entry.id, %err, "promotion attempt failed; entry left pending");
            }
        }
    }

    /// Fetch a reservation and enforce the owner-or-admin rule.
    fn require_owned(
        &self,
        reservation_id: ReservationId,
        requester: &Identity,
    ) -> Result<Reservation> {
        let reservation = self
            .reservations
            .get(reservation_id)?
            .ok_or_else(|| BookingError::NotFound(format!("reservation {reservation_id}")))?;
        if !requester.is_admin() && reservation.user_id != requester.user_id {
            return Err(BookingError::Authorization(format!(
                "reservation {reservation_id} belongs to another user"
            )));
        }
        Ok(reservation)
    }

    /// The exclusive lock for a space, created on first use.
    fn space_lock(&self, space_id: SpaceId) -> Arc<Mutex<()>> {
        self.locks.entry(space_id).or_default().clone()
    }

    /// Fire-and-forget notification dispatch. Failures are logged and
    /// never fail the enclosing operation.
    fn dispatch(&self, recipient: UserId, subject: &str, body: &str) {
        if let Err(err) = self.notifier.send(recipient, subject, body) {
            warn!(recipient, subject, %err, "notification dispatch failed");
        }
    }
}

/// Globally-unique receipt code: millisecond timestamp plus a short
/// random suffix, e.g. `R-1767225600000-9f31ab`.
fn receipt_code() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("R-{}-{}", Utc::now().timestamp_millis(), &suffix[..6])
}
