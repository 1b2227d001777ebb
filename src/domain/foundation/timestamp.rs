//! UTC instants.
//!
//! Breakers and the optimizer read time through the `Clock` port as epoch
//! milliseconds; `Timestamp` is the serialized form on results and records.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Out-of-range values collapse to the Unix epoch.
    pub fn from_unix_millis(millis: u64) -> Self {
        let millis = i64::try_from(millis).unwrap_or(i64::MAX);
        Self(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }

    /// Zero for instants before the epoch.
    pub fn as_unix_millis(&self) -> u64 {
        u64::try_from(self.0.timestamp_millis()).unwrap_or(0)
    }

    /// Milliseconds from `earlier` to `self`, zero if `earlier` is later.
    pub fn millis_since(&self, earlier: &Timestamp) -> u64 {
        self.as_unix_millis().saturating_sub(earlier.as_unix_millis())
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn from_unix_millis_lands_on_the_right_day() {
        // 2024-01-15T00:00:00Z
        let ts = Timestamp::from_unix_millis(1_705_276_800_000);
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().month(), 1);
        assert_eq!(ts.as_datetime().day(), 15);
        assert_eq!(ts.as_unix_millis(), 1_705_276_800_000);
    }

    #[test]
    fn millis_since_saturates() {
        let start = Timestamp::from_unix_millis(1_000);
        let end = Timestamp::from_unix_millis(3_500);
        assert_eq!(end.millis_since(&start), 2_500);
        assert_eq!(start.millis_since(&end), 0);
    }

    #[test]
    fn serializes_as_rfc3339() {
        let json = serde_json::to_string(&Timestamp::from_unix_millis(1_705_276_800_000)).unwrap();
        assert_eq!(json, "\"2024-01-15T00:00:00Z\"");
    }

    #[test]
    fn now_is_after_2020() {
        assert!(Timestamp::now().as_unix_millis() > 1_577_836_800_000);
    }
}
