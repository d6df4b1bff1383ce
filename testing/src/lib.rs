//! # Helpdesk Testing
//!
//! Testing utilities for the helpdesk controllers.
//!
//! This crate provides:
//! - Deterministic clocks
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for returned effects
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(PollingListReducer)
//!     .with_env(test_environment())
//!     .given_state(PollingListState::new(vec![]))
//!     .when_action(PollingListAction::Tick)
//!     .then_state(|state| assert!(state.is_refreshing()))
//!     .then_effects(assertions::assert_has_future_effect)
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use helpdesk_core::environment::Clock;
use std::sync::Mutex;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Mutex, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use helpdesk_testing::mocks::FixedClock;
    /// use helpdesk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
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

    /// Clock that moves forward by a fixed step on every reading
    ///
    /// Gives each created record a distinct, increasing timestamp.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` after each reading
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = match self.next.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let current = *next;
            *next = current + self.step;
            current
        }
    }

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// Create a clock starting at the test epoch that advances one second per reading
    #[must_use]
    pub fn stepping_clock() -> SteppingClock {
        SteppingClock::new(test_epoch(), Duration::seconds(1))
    }
}

pub use mocks::{FixedClock, SteppingClock, stepping_clock, test_clock, test_epoch};
