//! Clock port - source of "now" for time-dependent logic.

use crate::domain::foundation::Timestamp;

/// Supplies the current wall-clock time in epoch milliseconds.
///
/// Injected wherever behavior depends on elapsed time, so tests can drive
/// time explicitly.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;

    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.now_millis())
    }
}
