//! Calendar dates used by date based lifecycle actions.
//!
//! Lifecycle dates always denote midnight UTC. They're accepted from users
//! as `YYYY-MM-DD`, and carried on the wire (and in JSON) as RFC 3339.
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use std::fmt::{self, Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::ValidationError;

const SECONDS_PER_DAY: u64 = 86_400;
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A lifecycle date, truncated to midnight UTC.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LifecycleDate(SystemTime);

impl LifecycleDate {
    /// Parses either `YYYY-MM-DD` or a full RFC 3339 timestamp.
    pub fn parse(input: &str) -> Result<LifecycleDate, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidDate(input.to_string());

        // plain dates are expanded to midnight
        let parsed = if trimmed.len() == 10 {
            humantime::parse_rfc3339(&format!("{}T00:00:00Z", trimmed))
        } else {
            humantime::parse_rfc3339_weak(trimmed)
        };

        parsed.map(LifecycleDate::truncate).map_err(|_| invalid())
    }

    /// Returns the date containing the provided instant.
    pub fn truncate(time: SystemTime) -> LifecycleDate {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let days = secs / SECONDS_PER_DAY;
        LifecycleDate(UNIX_EPOCH + Duration::from_secs(days * SECONDS_PER_DAY))
    }

    /// Returns the `(year, month, day)` components of this date.
    pub fn ymd(&self) -> (u32, u32, u32) {
        let stamp = self.to_rfc3339();
        let part = |range: std::ops::Range<usize>| stamp[range].parse::<u32>().unwrap_or(0);
        (part(0..4), part(5..7), part(8..10))
    }

    /// Formats this date as an RFC 3339 timestamp at midnight.
    pub fn to_rfc3339(&self) -> String {
        humantime::format_rfc3339_seconds(self.0).to_string()
    }

    /// Formats this date for display, e.g. `17 Sep 2020`.
    pub fn to_label(&self) -> String {
        let (year, month, day) = self.ymd();
        let month = MONTHS
            .get(month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("???");
        format!("{} {} {}", day, month, year)
    }
}

/// Display implementation for `LifecycleDate`, as `YYYY-MM-DD`.
impl Display for LifecycleDate {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.to_rfc3339()[..10])
    }
}

impl Serialize for LifecycleDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for LifecycleDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        LifecycleDate::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleDate;

    #[test]
    fn parsing_plain_dates() {
        let date = LifecycleDate::parse("2020-09-17").unwrap();

        assert_eq!(date.ymd(), (2020, 9, 17));
        assert_eq!(date.to_string(), "2020-09-17");
        assert_eq!(date.to_rfc3339(), "2020-09-17T00:00:00Z");
        assert_eq!(date.to_label(), "17 Sep 2020");
    }

    #[test]
    fn parsing_wire_timestamps() {
        let date = LifecycleDate::parse("2021-01-02T00:00:00.000Z").unwrap();
        assert_eq!(date.to_string(), "2021-01-02");

        let date = LifecycleDate::parse("2021-01-02T13:45:00Z").unwrap();
        assert_eq!(date.to_rfc3339(), "2021-01-02T00:00:00Z");
    }

    #[test]
    fn rejecting_malformed_dates() {
        assert!(LifecycleDate::parse("2020-13-01").is_err());
        assert!(LifecycleDate::parse("17/09/2020").is_err());
        assert!(LifecycleDate::parse("").is_err());
    }

    #[test]
    fn ordering_dates() {
        let earlier = LifecycleDate::parse("2020-01-01").unwrap();
        let later = LifecycleDate::parse("2020-06-01").unwrap();

        assert!(earlier < later);
    }

    #[test]
    fn serializing_as_rfc3339() {
        let date = LifecycleDate::parse("2030-05-04").unwrap();
        let json = serde_json::to_string(&date).unwrap();

        assert_eq!(json, "\"2030-05-04T00:00:00Z\"");
        assert_eq!(serde_json::from_str::<LifecycleDate>(&json).unwrap(), date);
        assert_eq!(
            serde_json::from_str::<LifecycleDate>("\"2030-05-04\"").unwrap(),
            date
        );
    }
}
