use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// Resolution of the timestamps written to SiriDB.
///
/// Must match the `time_precision` the database was created with, SiriDB
/// rejects points that are out of range for the database precision.
#[derive(
    Debug, Default, Clone, Copy, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
pub enum TimePrecision {
    #[default]
    #[strum(to_string = "s")]
    #[serde(rename = "s")]
    #[value(name = "s")]
    Seconds,
    #[strum(to_string = "ms")]
    #[serde(rename = "ms")]
    #[value(name = "ms")]
    Milliseconds,
    #[strum(to_string = "us")]
    #[serde(rename = "us")]
    #[value(name = "us")]
    Microseconds,
    #[strum(to_string = "ns")]
    #[serde(rename = "ns")]
    #[value(name = "ns")]
    Nanoseconds,
}

impl TimePrecision {
    /// Converts a point in time to an integer timestamp in this precision.
    pub fn timestamp(&self, at: DateTime<Utc>) -> i64 {
        match self {
            TimePrecision::Seconds => at.timestamp(),
            TimePrecision::Milliseconds => at.timestamp_millis(),
            TimePrecision::Microseconds => at.timestamp_micros(),
            // Out of range after the year 2262.
            TimePrecision::Nanoseconds => at.timestamp_nanos_opt().unwrap_or(i64::MAX),
        }
    }

    pub fn now(&self) -> i64 {
        self.timestamp(Utc::now())
    }
}
