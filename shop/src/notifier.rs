//! Notification collaborator: delivers low-stock notifications.
//!
//! Delivery is fire-and-forget from the shop's point of view. The reducer
//! spawns each request as its own effect and only logs failures.

use crate::types::NotificationRequest;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Errors a notifier can report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The platform refused to show notifications
    #[error("Notification permission denied")]
    PermissionDenied,

    /// Delivery failed
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Boxed future returned by [`Notifier::request_notification`]
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Something that can surface a notification to the operator
pub trait Notifier: Send + Sync {
    /// Requests that a notification be shown
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be delivered.
    fn request_notification(&self, request: NotificationRequest) -> NotifyFuture<'_>;
}

/// Delivers notifications as structured log warnings
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn request_notification(&self, request: NotificationRequest) -> NotifyFuture<'_> {
        Box::pin(async move {
            tracing::warn!(
                product_id = %request.product_id,
                title = %request.title,
                "{}",
                request.body
            );
            Ok(())
        })
    }
}

/// Captures requests for inspection
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    requests: Arc<Mutex<Vec<NotificationRequest>>>,
    denied: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that rejects every request with `PermissionDenied`
    #[must_use]
    pub fn denied() -> Self {
        let notifier = Self::new();
        notifier.set_denied(true);
        notifier
    }

    /// Toggles permission-denied mode
    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Requests accepted so far
    #[must_use]
    pub fn requests(&self) -> Vec<NotificationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests accepted so far
    #[must_use]
    pub fn count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Notifier for RecordingNotifier {
    fn request_notification(&self, request: NotificationRequest) -> NotifyFuture<'_> {
        Box::pin(async move {
            if self.denied.load(Ordering::SeqCst) {
                return Err(NotifyError::PermissionDenied);
            }
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            Ok(())
        })
    }
}
