//! Repository seams for the engine's collaborators.
//!
//! The engine depends only on these traits, never on a storage
//! technology. Storage faults surface as `BookingError::Storage`;
//! business failures never originate here.
//!
//! In-memory implementations ship alongside the traits. They are the
//! reference semantics for any real backend and are what the tests and
//! the CLI run against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::interval::overlaps;
use crate::types::{
    Reservation, ReservationId, ReservationStatus, Space, SpaceId, UserId, WaitlistEntry,
    WaitlistEntryId, WaitlistStatus,
};

/// Read-only directory of spaces. Spaces are owned externally; the
/// engine never writes them.
pub trait SpaceDirectory: Send + Sync {
    fn get(&self, id: SpaceId) -> Result<Option<Space>>;

    /// All spaces with the active flag set, in id order.
    fn list_active(&self) -> Result<Vec<Space>>;
}

/// Reservation fields chosen by the engine; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub receipt_code: String,
}

/// Atomic create/read/update for reservations. No delete: cancellation
/// is a status flip, never a removal.
pub trait ReservationStore: Send + Sync {
    fn insert(&self, new: NewReservation) -> Result<Reservation>;

    fn get(&self, id: ReservationId) -> Result<Option<Reservation>>;

    /// Overwrite an existing reservation in place, matched by id.
    fn update(&self, reservation: &Reservation) -> Result<()>;

    /// All confirmed reservations intersecting `[start, end)`, optionally
    /// restricted to one space, sorted by start then id. This is the
    /// single bulk fetch the calendar and availability scans run against.
    fn find_confirmed_overlapping(
        &self,
        space: Option<SpaceId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reservation>>;

    /// True iff any confirmed reservation on `space` overlaps
    /// `[start, end)`, skipping `exclude` (a reservation being modified
    /// is excluded from its own overlap check).
    fn has_confirmed_overlap(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<ReservationId>,
    ) -> Result<bool>;
}

/// Waitlist entry fields chosen by the engine; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewWaitlistEntry {
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub position: u32,
}

/// Atomic create/read/update for waitlist entries. Entries are never
/// deleted and positions are never renumbered.
pub trait WaitlistStore: Send + Sync {
    fn insert(&self, new: NewWaitlistEntry) -> Result<WaitlistEntry>;

    fn update(&self, entry: &WaitlistEntry) -> Result<()>;

    /// The pending entry for this exact (user, space, start, end) tuple,
    /// if one exists. At most one can exist at a time.
    fn find_pending_exact(
        &self,
        user: UserId,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>>;

    /// Count of pending entries for the exact (space, start, end) window.
    fn count_pending(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize>;

    /// The lowest-position pending entry for the exact window, if any.
    fn first_pending(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>>;

    /// Every entry for the space (any status), ordered by start, then
    /// position, then id.
    fn list_for_space(&self, space: SpaceId) -> Result<Vec<WaitlistEntry>>;
}

// Callers typically share stores between the engine and themselves (or
// between engines); delegating through Arc keeps that ergonomic.

impl<T: SpaceDirectory + ?Sized> SpaceDirectory for std::sync::Arc<T> {
    fn get(&self, id: SpaceId) -> Result<Option<Space>> {
        (**self).get(id)
    }

    fn list_active(&self) -> Result<Vec<Space>> {
        (**self).list_active()
    }
}

impl<T: ReservationStore + ?Sized> ReservationStore for std::sync::Arc<T> {
    fn insert(&self, new: NewReservation) -> Result<Reservation> {
        (**self).insert(new)
    }

    fn get(&self, id: ReservationId) -> Result<Option<Reservation>> {
        (**self).get(id)
    }

    fn update(&self, reservation: &Reservation) -> Result<()> {
        (**self).update(reservation)
    }

    fn find_confirmed_overlapping(
        &self,
        space: Option<SpaceId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        (**self).find_confirmed_overlapping(space, start, end)
    }

    fn has_confirmed_overlap(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<ReservationId>,
    ) -> Result<bool> {
        (**self).has_confirmed_overlap(space, start, end, exclude)
    }
}

impl<T: WaitlistStore + ?Sized> WaitlistStore for std::sync::Arc<T> {
    fn insert(&self, new: NewWaitlistEntry) -> Result<WaitlistEntry> {
        (**self).insert(new)
    }

    fn update(&self, entry: &WaitlistEntry) -> Result<()> {
        (**self).update(entry)
    }

    fn find_pending_exact(
        &self,
        user: UserId,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>> {
        (**self).find_pending_exact(user, space, start, end)
    }

    fn count_pending(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize> {
        (**self).count_pending(space, start, end)
    }

    fn first_pending(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>> {
        (**self).first_pending(space, start, end)
    }

    fn list_for_space(&self, space: SpaceId) -> Result<Vec<WaitlistEntry>> {
        (**self).list_for_space(space)
    }
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// In-memory space directory.
#[derive(Debug, Default)]
pub struct MemorySpaces {
    spaces: RwLock<HashMap<SpaceId, Space>>,
    next_id: AtomicU64,
}

impl MemorySpaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a space with a store-assigned id and return it.
    pub fn add(&self, name: &str, kind: crate::types::SpaceType, capacity: u32, active: bool) -> Space {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let space = Space {
            id,
            name: name.to_string(),
            kind,
            capacity,
            active,
        };
        self.spaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, space.clone());
        space
    }

    /// Insert a space with a caller-chosen id (dataset loading).
    pub fn put(&self, space: Space) {
        // Keep the id counter ahead of explicit ids.
        self.next_id.fetch_max(space.id, Ordering::Relaxed);
        self.spaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(space.id, space);
    }
}

impl SpaceDirectory for MemorySpaces {
    fn get(&self, id: SpaceId) -> Result<Option<Space>> {
        let map = self.spaces.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(&id).cloned())
    }

    fn list_active(&self) -> Result<Vec<Space>> {
        let map = self.spaces.read().unwrap_or_else(PoisonError::into_inner);
        let mut active: Vec<Space> = map.values().filter(|s| s.active).cloned().collect();
        active.sort_by_key(|s| s.id);
        Ok(active)
    }
}

/// In-memory reservation store.
#[derive(Debug, Default)]
pub struct MemoryReservations {
    reservations: RwLock<HashMap<ReservationId, Reservation>>,
    next_id: AtomicU64,
}

impl MemoryReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reservation with a caller-chosen id (dataset loading).
    pub fn put(&self, reservation: Reservation) {
        self.next_id.fetch_max(reservation.id, Ordering::Relaxed);
        self.reservations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reservation.id, reservation);
    }

    /// Every reservation regardless of status, sorted by id.
    pub fn all(&self) -> Vec<Reservation> {
        let map = self
            .reservations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<Reservation> = map.values().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }
}

impl ReservationStore for MemoryReservations {
    fn insert(&self, new: NewReservation) -> Result<Reservation> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let reservation = Reservation {
            id,
            space_id: new.space_id,
            user_id: new.user_id,
            start: new.start,
            end: new.end,
            status: ReservationStatus::Confirmed,
            receipt_code: new.receipt_code,
        };
        self.reservations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, reservation.clone());
        Ok(reservation)
    }

    fn get(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let map = self
            .reservations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(&id).cloned())
    }

    fn update(&self, reservation: &Reservation) -> Result<()> {
        let mut map = self
            .reservations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.insert(reservation.id, reservation.clone());
        Ok(())
    }

    fn find_confirmed_overlapping(
        &self,
        space: Option<SpaceId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        let map = self
            .reservations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut hits: Vec<Reservation> = map
            .values()
            .filter(|r| r.status == ReservationStatus::Confirmed)
            .filter(|r| space.is_none_or(|s| r.space_id == s))
            .filter(|r| overlaps(r.start, r.end, start, end))
            .cloned()
            .collect();
        hits.sort_by_key(|r| (r.start, r.id));
        Ok(hits)
    }

    fn has_confirmed_overlap(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<ReservationId>,
    ) -> Result<bool> {
        let map = self
            .reservations
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(map.values().any(|r| {
            r.status == ReservationStatus::Confirmed
                && r.space_id == space
                && exclude != Some(r.id)
                && overlaps(r.start, r.end, start, end)
        }))
    }
}

/// In-memory waitlist store.
#[derive(Debug, Default)]
pub struct MemoryWaitlist {
    entries: RwLock<HashMap<WaitlistEntryId, WaitlistEntry>>,
    next_id: AtomicU64,
}

impl MemoryWaitlist {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitlistStore for MemoryWaitlist {
    fn insert(&self, new: NewWaitlistEntry) -> Result<WaitlistEntry> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = WaitlistEntry {
            id,
            space_id: new.space_id,
            user_id: new.user_id,
            start: new.start,
            end: new.end,
            status: WaitlistStatus::Pending,
            position: new.position,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry.clone());
        Ok(entry)
    }

    fn update(&self, entry: &WaitlistEntry) -> Result<()> {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(entry.id, entry.clone());
        Ok(())
    }

    fn find_pending_exact(
        &self,
        user: UserId,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>> {
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map
            .values()
            .find(|e| {
                e.status == WaitlistStatus::Pending
                    && e.user_id == user
                    && e.space_id == space
                    && e.start == start
                    && e.end == end
            })
            .cloned())
    }

    fn count_pending(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize> {
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map
            .values()
            .filter(|e| {
                e.status == WaitlistStatus::Pending
                    && e.space_id == space
                    && e.start == start
                    && e.end == end
            })
            .count())
    }

    fn first_pending(
        &self,
        space: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>> {
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map
            .values()
            .filter(|e| {
                e.status == WaitlistStatus::Pending
                    && e.space_id == space
                    && e.start == start
                    && e.end == end
            })
            .min_by_key(|e| (e.position, e.id))
            .cloned())
    }

    fn list_for_space(&self, space: SpaceId) -> Result<Vec<WaitlistEntry>> {
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<WaitlistEntry> =
            map.values().filter(|e| e.space_id == space).cloned().collect();
        entries.sort_by_key(|e| (e.start, e.position, e.id));
        Ok(entries)
    }
}
