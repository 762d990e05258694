//! # Sabalitos Testing
//!
//! Testing utilities and helpers for the Sabalitos point-of-sale engine.
//!
//! This crate provides:
//! - Deterministic clocks for cooldown and report-period tests
//! - A Given-When-Then builder for reducers
//! - Assertion helpers for effect descriptions
//! - Helpers for observing a running store
//!
//! ## Example
//!
//! ```ignore
//! use sabalitos_testing::{test_clock, helpers::recv_action};
//! use sabalitos_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_sale_flow() {
//!     let store = Store::new(ShopState::new(), ShopReducer::new(), test_environment());
//!     let mut actions = store.subscribe_actions();
//!
//!     store.send(ShopAction::Load).await.unwrap();
//!     recv_action(&mut actions, |a| matches!(a, ShopAction::Loaded { .. })).await;
//!
//!     // A first run has nothing stored yet
//!     let products = store.state(|s| s.catalog.len()).await;
//!     assert_eq!(products, 0);
//! }
//! ```

use chrono::{DateTime, Utc};
use sabalitos_core::environment::Clock;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use sabalitos_testing::mocks::FixedClock;
    /// use sabalitos_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that tests move forward by hand
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the environment under test.
    ///
    /// ```
    /// use sabalitos_testing::mocks::ManualClock;
    /// use sabalitos_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::new(start);
    /// let shared = clock.clone();
    ///
    /// clock.advance(Duration::hours(25));
    /// assert_eq!(shared.now(), start + Duration::hours(25));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward (or backward, with a negative duration)
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// The instant every test clock starts at (2025-01-01 12:00:00 UTC)
    ///
    /// Noon keeps "today" well clear of the midnight boundary in any timezone
    /// a CI machine is likely to run in.
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Create a default fixed clock for tests
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_instant())
    }

    /// Create a manual clock starting at [`test_instant`]
    #[must_use]
    pub fn manual_clock() -> ManualClock {
        ManualClock::new(test_instant())
    }
}

/// Test helpers and utilities
pub mod helpers {
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// How long [`recv_action`] waits before failing the test
    pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

    /// Wait for the next broadcast action matching `predicate`
    ///
    /// Non-matching actions are skipped. Lagged receivers keep going.
    ///
    /// # Panics
    ///
    /// Panics if no matching action arrives within [`RECV_TIMEOUT`] or the
    /// channel closes.
    #[allow(clippy::panic)] // Test helper
    pub async fn recv_action<A, F>(rx: &mut broadcast::Receiver<A>, mut predicate: F) -> A
    where
        A: Clone + std::fmt::Debug,
        F: FnMut(&A) -> bool,
    {
        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return action,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
                    Err(broadcast::error::RecvError::Closed) => {
                        panic!("action channel closed before a matching action arrived")
                    },
                }
            }
        };

        match tokio::time::timeout(RECV_TIMEOUT, wait).await {
            Ok(action) => action,
            Err(_) => panic!("no matching action within {RECV_TIMEOUT:?}"),
        }
    }

    /// Install a test-friendly tracing subscriber (idempotent)
    ///
    /// Output is captured by the test harness and only shown for failing tests.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{manual_clock, test_clock, test_instant, FixedClock, ManualClock};
pub use reducer_test::{assertions, ReducerTest};
