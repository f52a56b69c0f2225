use crate::sample::Sample;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

/// Measurement (table) every room reading is written to.
pub const MEASUREMENT: &str = "room_sensors";

pub const TAG_ROOM: &str = "room";
pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_PRESSURE: &str = "pressure";
pub const FIELD_HUMIDITY: &str = "humidity";

/// A timestamped, tagged, multi-field measurement as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: &'static str,
    pub ts: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, f64>,
}

impl Point {
    /// Derive the stored point for a sample.
    ///
    /// Pure: the same sample always yields the same point, timestamp truncated
    /// to whole seconds (the write precision of the store).
    pub fn from_sample(sample: &Sample) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_ROOM.to_string(), sample.room.clone());

        let mut fields = BTreeMap::new();
        fields.insert(FIELD_TEMPERATURE.to_string(), f64::from(sample.temperature));
        fields.insert(FIELD_PRESSURE.to_string(), f64::from(sample.pressure));
        fields.insert(FIELD_HUMIDITY.to_string(), f64::from(sample.humidity));

        Self {
            measurement: MEASUREMENT,
            ts: truncate_to_seconds(sample.observed_at),
            tags,
            fields,
        }
    }

    pub fn room(&self) -> Option<&str> {
        self.tags.get(TAG_ROOM).map(String::as_str)
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(ts.timestamp(), 0).single().unwrap_or(ts)
}
