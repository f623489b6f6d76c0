//! Best-effort notification dispatch.
//!
//! The engine treats every notifier as fire-and-forget: a failed send is
//! logged and never fails or reverts the operation that triggered it.
//! Transport (email, push, in-app feed) is a collaborator concern.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::types::UserId;

/// Failure reported by a notification transport.
#[derive(Debug, Error)]
#[error("notification dispatch failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification channel. Implementations must not block on
/// retries; the engine calls this inline with the primary operation.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        recipient: UserId,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), NotifyError>;
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn send(
        &self,
        recipient: UserId,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), NotifyError> {
        (**self).send(recipient, subject, body)
    }
}

/// Discards everything. Useful when a caller wants the engine without
/// any notification channel wired up.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, _: UserId, _: &str, _: &str) -> std::result::Result<(), NotifyError> {
        Ok(())
    }
}

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: UserId,
    pub subject: String,
    pub body: String,
}

/// Records every message in memory. The tests assert against this.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far, in dispatch order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(
        &self,
        recipient: UserId,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                recipient,
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
