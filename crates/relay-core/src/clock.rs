//! Time source for envelope timestamps.

use chrono::{DateTime, Utc};

/// Clock trait for dependency injection and testing.
pub trait Clock: Send + Sync {
    /// Get the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation (uses actual system time).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock.
    #[must_use]
    pub fn new(fixed: DateTime<Utc>) -> Self {
        Self { fixed }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.fixed
    }
}
