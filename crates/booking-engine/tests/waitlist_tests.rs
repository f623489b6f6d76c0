//! Tests for the waitlist queue and the cancellation-triggered promotion
//! cascade.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use booking_engine::{
    BookingEngine, BookingError, CalendarConfig, Identity, MemoryReservations, MemorySpaces,
    MemoryWaitlist, RecordingNotifier, ReservationStatus, Space, SpaceType, WaitlistStatus,
};

type Engine = BookingEngine<
    Arc<MemorySpaces>,
    Arc<MemoryReservations>,
    Arc<MemoryWaitlist>,
    Arc<RecordingNotifier>,
>;

struct Fixture {
    spaces: Arc<MemorySpaces>,
    reservations: Arc<MemoryReservations>,
    notifier: Arc<RecordingNotifier>,
    engine: Engine,
}

fn fixture() -> Fixture {
    let spaces = Arc::new(MemorySpaces::new());
    let reservations = Arc::new(MemoryReservations::new());
    let waitlist = Arc::new(MemoryWaitlist::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = BookingEngine::new(
        Arc::clone(&spaces),
        Arc::clone(&reservations),
        Arc::clone(&waitlist),
        Arc::clone(&notifier),
        CalendarConfig::default(),
    )
    .expect("default config is valid");
    Fixture {
        spaces,
        reservations,
        notifier,
        engine,
    }
}

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).unwrap()
}

// ── join ────────────────────────────────────────────────────────────────────

#[test]
fn join_assigns_fifo_positions_per_exact_window() {
    let fx = fixture();
    let space = fx.spaces.add("Auditorium", SpaceType::Auditorium, 200, true);

    let u1 = fx
        .engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .unwrap();
    let u2 = fx
        .engine
        .join_waitlist(space.id, 2, at(8, 0), at(9, 0))
        .unwrap();
    // A different window has its own queue.
    let other = fx
        .engine
        .join_waitlist(space.id, 3, at(9, 0), at(10, 0))
        .unwrap();

    assert_eq!(u1.position, 1);
    assert_eq!(u2.position, 2);
    assert_eq!(other.position, 1);
    assert_eq!(u1.status, WaitlistStatus::Pending);
}

#[test]
fn join_is_idempotent_for_exact_tuple() {
    let fx = fixture();
    let space = fx.spaces.add("Auditorium", SpaceType::Auditorium, 200, true);

    let first = fx
        .engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .expect("first join succeeds");
    let second = fx
        .engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .expect("repeat join succeeds");

    assert_eq!(first.id, second.id);
    assert_eq!(first.position, second.position);
    assert_eq!(fx.engine.list_waitlist(space.id).unwrap().len(), 1);

    // The repeat join dispatches no second notice.
    let notices = fx
        .notifier
        .sent()
        .into_iter()
        .filter(|m| m.subject == "Added to waitlist")
        .count();
    assert_eq!(notices, 1);
}

#[test]
fn join_same_user_different_window_is_a_new_entry() {
    let fx = fixture();
    let space = fx.spaces.add("Auditorium", SpaceType::Auditorium, 200, true);

    let a = fx
        .engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .unwrap();
    let b = fx
        .engine
        .join_waitlist(space.id, 1, at(10, 0), at(11, 0))
        .unwrap();
    assert_ne!(a.id, b.id);
}

#[test]
fn join_inverted_range_is_validation_error() {
    let fx = fixture();
    let space = fx.spaces.add("Auditorium", SpaceType::Auditorium, 200, true);
    let err = fx
        .engine
        .join_waitlist(space.id, 1, at(9, 0), at(8, 0))
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)), "got {err:?}");
}

#[test]
fn join_unknown_space_is_not_found() {
    let fx = fixture();
    let err = fx
        .engine
        .join_waitlist(404, 1, at(8, 0), at(9, 0))
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)), "got {err:?}");
}

// ── promotion cascade ───────────────────────────────────────────────────────

#[test]
fn cancellation_promotes_lowest_position_exact_match() {
    // Space has a confirmed 08:00-09:00 reservation; U1 (position 1) and
    // U2 (position 2) both wait for exactly that window. Cancelling must
    // convert U1, create a confirmed reservation for U1, and leave U2
    // pending at position 2.
    let fx = fixture();
    let space = fx.spaces.add("Lab A", SpaceType::Laboratory, 30, true);
    let reservation = fx
        .engine
        .create_reservation(space.id, 10, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 2, at(8, 0), at(9, 0))
        .unwrap();

    fx.engine
        .cancel_reservation(reservation.id, &Identity::member(10))
        .unwrap();

    let entries = fx.engine.list_waitlist(space.id).unwrap();
    let u1 = entries.iter().find(|e| e.user_id == 1).unwrap();
    let u2 = entries.iter().find(|e| e.user_id == 2).unwrap();
    assert_eq!(u1.status, WaitlistStatus::Converted);
    assert_eq!(u2.status, WaitlistStatus::Pending);
    assert_eq!(u2.position, 2);

    let confirmed: Vec<_> = fx
        .reservations
        .all()
        .into_iter()
        .filter(|r| r.status == ReservationStatus::Confirmed)
        .collect();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].user_id, 1);
    assert_eq!(confirmed[0].start, at(8, 0));
    assert_eq!(confirmed[0].end, at(9, 0));

    // The promoted user hears about it.
    assert!(fx
        .notifier
        .sent()
        .iter()
        .any(|m| m.recipient == 1 && m.subject == "Reservation confirmed"));
}

#[test]
fn promotion_requires_the_identical_window() {
    // A partially-overlapping request does not advance when a different
    // window frees up.
    let fx = fixture();
    let space = fx.spaces.add("Lab A", SpaceType::Laboratory, 30, true);
    let reservation = fx
        .engine
        .create_reservation(space.id, 10, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 30))
        .unwrap();

    fx.engine
        .cancel_reservation(reservation.id, &Identity::member(10))
        .unwrap();

    let entries = fx.engine.list_waitlist(space.id).unwrap();
    assert_eq!(entries[0].status, WaitlistStatus::Pending);
    assert!(fx
        .reservations
        .all()
        .iter()
        .all(|r| r.status != ReservationStatus::Confirmed));
}

#[test]
fn one_cancellation_promotes_at_most_one_entry() {
    let fx = fixture();
    let space = fx.spaces.add("Lab A", SpaceType::Laboratory, 30, true);
    let reservation = fx
        .engine
        .create_reservation(space.id, 10, at(8, 0), at(9, 0))
        .unwrap();
    for user in 1..=3 {
        fx.engine
            .join_waitlist(space.id, user, at(8, 0), at(9, 0))
            .unwrap();
    }

    fx.engine
        .cancel_reservation(reservation.id, &Identity::member(10))
        .unwrap();

    let converted = fx
        .engine
        .list_waitlist(space.id)
        .unwrap()
        .into_iter()
        .filter(|e| e.status == WaitlistStatus::Converted)
        .count();
    assert_eq!(converted, 1, "only one slot was freed");
}

#[test]
fn repeat_cancel_does_not_promote_again() {
    let fx = fixture();
    let space = fx.spaces.add("Lab A", SpaceType::Laboratory, 30, true);
    let reservation = fx
        .engine
        .create_reservation(space.id, 10, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 2, at(8, 0), at(9, 0))
        .unwrap();

    fx.engine
        .cancel_reservation(reservation.id, &Identity::member(10))
        .unwrap();
    fx.engine
        .cancel_reservation(reservation.id, &Identity::member(10))
        .unwrap();

    let entries = fx.engine.list_waitlist(space.id).unwrap();
    let u2 = entries.iter().find(|e| e.user_id == 2).unwrap();
    assert_eq!(
        u2.status,
        WaitlistStatus::Pending,
        "idempotent cancel must not cascade a second promotion"
    );
}

#[test]
fn failed_promotion_leaves_entry_pending_and_cancel_succeeds() {
    // The space goes inactive between the waitlist join and the
    // cancellation, so the promotion's nested create fails. The failure
    // is isolated: cancel still succeeds, the entry stays pending.
    let fx = fixture();
    let space = fx.spaces.add("Lab A", SpaceType::Laboratory, 30, true);
    let reservation = fx
        .engine
        .create_reservation(space.id, 10, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .unwrap();

    fx.spaces.put(Space {
        active: false,
        ..space.clone()
    });

    let cancelled = fx
        .engine
        .cancel_reservation(reservation.id, &Identity::member(10))
        .expect("promotion failure must not fail the cancel");
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    let entries = fx.engine.list_waitlist(space.id).unwrap();
    assert_eq!(entries[0].status, WaitlistStatus::Pending);
}

#[test]
fn positions_keep_gaps_after_promotion() {
    // Positions are assigned at creation and never renumbered; a
    // promoted head leaves a gap.
    let fx = fixture();
    let space = fx.spaces.add("Lab A", SpaceType::Laboratory, 30, true);
    let reservation = fx
        .engine
        .create_reservation(space.id, 10, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 1, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 2, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 3, at(8, 0), at(9, 0))
        .unwrap();

    fx.engine
        .cancel_reservation(reservation.id, &Identity::member(10))
        .unwrap();

    let entries = fx.engine.list_waitlist(space.id).unwrap();
    let pending: Vec<u32> = entries
        .iter()
        .filter(|e| e.status == WaitlistStatus::Pending)
        .map(|e| e.position)
        .collect();
    assert_eq!(pending, vec![2, 3]);
}

// ── list ────────────────────────────────────────────────────────────────────

#[test]
fn list_waitlist_orders_by_window_then_position() {
    let fx = fixture();
    let space = fx.spaces.add("Lab A", SpaceType::Laboratory, 30, true);
    fx.engine
        .join_waitlist(space.id, 1, at(10, 0), at(11, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 2, at(8, 0), at(9, 0))
        .unwrap();
    fx.engine
        .join_waitlist(space.id, 3, at(8, 0), at(9, 0))
        .unwrap();

    let entries = fx.engine.list_waitlist(space.id).unwrap();
    let order: Vec<(u64, u32)> = entries.iter().map(|e| (e.user_id, e.position)).collect();
    assert_eq!(order, vec![(2, 1), (3, 2), (1, 1)]);
}

#[test]
fn list_waitlist_unknown_space_is_not_found() {
    let fx = fixture();
    let err = fx.engine.list_waitlist(404).unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)), "got {err:?}");
}
