//! In-memory [`TimeSeriesStore`] for tests.
//!
//! Emulates the upsert and the gap-filled bucket aggregation of the Timescale
//! store closely enough for end-to-end checks, and records how it was used.

use crate::error::{Result, TelemetryError};
use crate::point::{Point, FIELD_HUMIDITY, FIELD_PRESSURE, FIELD_TEMPERATURE};
use crate::query::AggregationQuery;
use crate::series::StoreRow;
use crate::store::TimeSeriesStore;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<(String, DateTime<Utc>), Point>>,
    failing_writes: AtomicUsize,
    failing_queries: AtomicUsize,
    write_attempts: AtomicUsize,
    query_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` writes fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` queries fail.
    pub fn fail_next_queries(&self, n: usize) {
        self.failing_queries.store(n, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn points(&self) -> Vec<Point> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn aggregate(&self, query: &AggregationQuery, now: DateTime<Utc>) -> Vec<StoreRow> {
        let step = query.interval().duration().num_milliseconds().max(1);
        let start = now - query.range().duration();
        let first_bucket = start.timestamp_millis().div_euclid(step) * step;
        let end = now.timestamp_millis();

        let rows = self.rows.lock().unwrap();
        let mut by_room: BTreeMap<String, BTreeMap<i64, Vec<&Point>>> = BTreeMap::new();
        for ((room, ts), point) in rows.iter() {
            if *ts < start || *ts >= now {
                continue;
            }
            let bucket = ts.timestamp_millis().div_euclid(step) * step;
            by_room
                .entry(room.clone())
                .or_default()
                .entry(bucket)
                .or_default()
                .push(point);
        }

        let mut out = Vec::new();
        for (room, buckets) in by_room {
            let mut bucket = first_bucket;
            while bucket < end {
                let points = buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[]);
                out.push(StoreRow {
                    room: room.clone(),
                    bucket: Utc.timestamp_millis_opt(bucket).unwrap(),
                    temperature: mean(points, FIELD_TEMPERATURE),
                    pressure: mean(points, FIELD_PRESSURE),
                    humidity: mean(points, FIELD_HUMIDITY),
                });
                bucket += step;
            }
        }
        out
    }
}

fn mean(points: &[&Point], field: &str) -> Option<f64> {
    let values: Vec<f64> = points.iter().filter_map(|p| p.field(field)).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn write_points(&self, points: &[Point]) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_writes) {
            return Err(TelemetryError::Store("injected write failure".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        for p in points {
            let room = p.room().unwrap_or_default().to_string();
            rows.insert((room, p.ts), p.clone());
        }
        Ok(())
    }

    async fn query_rows(&self, query: &AggregationQuery) -> Result<Vec<StoreRow>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_queries) {
            return Err(TelemetryError::Store("injected query failure".into()));
        }
        Ok(self.aggregate(query, Utc::now()))
    }
}
