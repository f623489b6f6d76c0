//! # booking-engine
//!
//! Overlap-safe reservation management for shared, capacity-limited
//! spaces: reservation lifecycle with half-open interval conflict
//! enforcement, FIFO waitlist promotion triggered by cancellation, and
//! timezone-aware calendar slot materialization and availability search.
//!
//! Everything outside those concerns -- HTTP, authentication, storage
//! technology, mail transport -- is a collaborator injected through the
//! seams in [`store`] and [`notify`].
//!
//! ## Modules
//!
//! - [`interval`] — half-open overlap predicate and wall-clock normalization
//! - [`engine`] — reservation lifecycle, waitlist queue, promotion cascade
//! - [`calendar`] — per-day slot grid generation
//! - [`availability`] — per-window free-space search
//! - [`store`] — repository traits plus in-memory implementations
//! - [`notify`] — best-effort notification dispatch
//! - [`config`] — time zone, slot width, operating hours
//! - [`types`] — domain types
//! - [`error`] — error types

pub mod availability;
pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod interval;
pub mod notify;
pub mod store;
pub mod types;

pub use calendar::{CalendarRange, CalendarView, DayGrid, Slot, SlotStatus, SpaceSlot};
pub use config::CalendarConfig;
pub use engine::BookingEngine;
pub use error::{BookingError, Result};
pub use interval::overlaps;
pub use notify::{Notifier, NotifyError, NullNotifier, RecordingNotifier, SentMessage};
pub use store::{
    MemoryReservations, MemorySpaces, MemoryWaitlist, NewReservation, NewWaitlistEntry,
    ReservationStore, SpaceDirectory, WaitlistStore,
};
pub use types::{
    Identity, Reservation, ReservationId, ReservationStatus, Role, Space, SpaceId, SpaceType,
    UserId, WaitlistEntry, WaitlistEntryId, WaitlistStatus,
};
