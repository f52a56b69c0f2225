use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One aggregated bucket for one room, as returned by the store.
///
/// The room tag is always present; a field is `None` when the bucket had no
/// data for it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    pub room: String,
    pub bucket: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Bucket start, milliseconds since the Unix epoch.
    pub x: i64,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(rename = "label")]
    pub room: String,
    #[serde(rename = "data")]
    pub points: Vec<ChartPoint>,
}

impl Series {
    fn new(room: &str) -> Self {
        Self {
            room: room.to_string(),
            points: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSet {
    pub temperature: Vec<Series>,
    pub pressure: Vec<Series>,
    pub humidity: Vec<Series>,
}

impl SeriesSet {
    /// Group rows by room and split the three fields into separate series.
    ///
    /// Every bucket of a room yields a point in each of its three series, with
    /// a `null` y where the field is missing, so all series of a room share
    /// the same x-axis. Rooms come out sorted by name, buckets ascending.
    pub fn from_rows(rows: impl IntoIterator<Item = StoreRow>) -> Self {
        let mut by_room: BTreeMap<String, Vec<StoreRow>> = BTreeMap::new();
        for row in rows {
            by_room.entry(row.room.clone()).or_default().push(row);
        }

        let mut set = SeriesSet::default();
        for (room, mut rows) in by_room {
            rows.sort_by_key(|r| r.bucket);

            let mut temperature = Series::new(&room);
            let mut pressure = Series::new(&room);
            let mut humidity = Series::new(&room);
            for row in rows {
                let x = row.bucket.timestamp_millis();
                temperature.points.push(ChartPoint { x, y: row.temperature });
                pressure.points.push(ChartPoint { x, y: row.pressure });
                humidity.points.push(ChartPoint { x, y: row.humidity });
            }
            set.temperature.push(temperature);
            set.pressure.push(pressure);
            set.humidity.push(humidity);
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }

    pub fn rooms(&self) -> Vec<&str> {
        self.temperature.iter().map(|s| s.room.as_str()).collect()
    }
}
