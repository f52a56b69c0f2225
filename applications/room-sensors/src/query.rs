use crate::point::MEASUREMENT;
use crate::token::TimeToken;

/// Per-room mean of every field over `range`, in `interval` buckets, with
/// empty buckets filled with NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationQuery {
    range: TimeToken,
    interval: TimeToken,
}

impl AggregationQuery {
    pub fn new(range: TimeToken, interval: TimeToken) -> Self {
        Self { range, interval }
    }

    pub fn range(&self) -> TimeToken {
        self.range
    }

    pub fn interval(&self) -> TimeToken {
        self.interval
    }

    /// TimescaleDB statement for this query.
    ///
    /// Both tokens are interpolated; they can only hold digits and a unit
    /// name, which is what keeps this safe to build as a string.
    pub fn to_sql(&self) -> String {
        let range = self.range.sql_interval();
        let interval = self.interval.sql_interval();
        format!(
            r#"
            SELECT
                time_bucket_gapfill({interval}, ts, now() - {range}, now()) AS bucket,
                room,
                avg(temperature) AS temperature,
                avg(pressure) AS pressure,
                avg(humidity) AS humidity
            FROM {MEASUREMENT}
            WHERE ts >= now() - {range} AND ts < now()
            GROUP BY room, bucket
            ORDER BY room, bucket
            "#
        )
    }
}
