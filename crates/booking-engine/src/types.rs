//! Domain types shared across the engine.
//!
//! All public shapes are serde-serializable with camelCase field names;
//! downstream calendar and reporting collaborators depend on these shapes
//! staying stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SpaceId = u64;
pub type UserId = u64;
pub type ReservationId = u64;
pub type WaitlistEntryId = u64;

/// Category of a bookable space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    Auditorium,
    Laboratory,
    Classroom,
    Systemsrooms,
    Other,
}

/// A bookable space. Owned by an external directory; the engine only
/// reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: SpaceId,
    /// Unique display name.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SpaceType,
    pub capacity: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

/// A time-bound reservation of a space.
///
/// Invariants upheld by the engine: `start < end`; for any space the set
/// of confirmed reservations is pairwise non-overlapping under half-open
/// `[start, end)` semantics; the receipt code is unique and immutable.
/// Reservations are never physically deleted -- cancellation flips the
/// status exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Assigned at creation, immutable thereafter. Used for external
    /// reference (confirmations, receipts).
    pub receipt_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitlistStatus {
    Pending,
    /// Reserved for a notify-before-promote flow; no operation currently
    /// sets it.
    Notified,
    Converted,
    Cancelled,
}

/// A queued request for an exact window on a space.
///
/// `position` is assigned at creation as the pending count for the exact
/// `(space, start, end)` window plus one, and is never renumbered when
/// earlier entries leave the pending state -- gaps are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub id: WaitlistEntryId,
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: WaitlistStatus,
    pub position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

/// A verified identity claim supplied by the external authentication
/// layer. The engine trusts it and performs only ownership/role checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn member(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Member,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
