use std::time::Duration;

use tokio::time::Instant;

/// Absolute point in time after which an operation is abandoned.
///
/// Built on tokio's clock so paused-time tests drive expiry deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }
}
