use crate::error::{Result, TelemetryError};
use crate::point::{Point, FIELD_HUMIDITY, FIELD_PRESSURE, FIELD_TEMPERATURE, MEASUREMENT};
use crate::query::AggregationQuery;
use crate::series::StoreRow;
use crate::store::TimeSeriesStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{FromRow, Pool, Postgres, Row};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub type DbPool = Pool<Postgres>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Server-side `statement_timeout` applied to every connection.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}
fn default_acquire_timeout_secs() -> u64 {
    5
}
fn default_statement_timeout_ms() -> u64 {
    10_000
}

pub async fn connect(cfg: &DbConfig) -> Result<DbPool> {
    let options = PgConnectOptions::from_str(&cfg.url)?
        .options([("statement_timeout", cfg.statement_timeout_ms.to_string())]);
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect_with(options)
        .await?;
    Ok(pool)
}

impl<'r> FromRow<'r, PgRow> for StoreRow {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            room: row.try_get("room")?,
            bucket: row.try_get("bucket")?,
            temperature: row.try_get("temperature")?,
            pressure: row.try_get("pressure")?,
            humidity: row.try_get("humidity")?,
        })
    }
}

/// TimescaleDB-backed store. The sqlx pool is safe for concurrent use.
#[derive(Clone)]
pub struct TimescaleStore {
    pool: DbPool,
}

impl TimescaleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        Ok(Self::new(connect(cfg).await?))
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the measurement table and hypertable if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {MEASUREMENT} (
                ts          TIMESTAMPTZ      NOT NULL,
                room        TEXT             NOT NULL,
                temperature DOUBLE PRECISION,
                pressure    DOUBLE PRECISION,
                humidity    DOUBLE PRECISION,
                PRIMARY KEY (room, ts)
            )
            "#
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!(
            "SELECT create_hypertable('{MEASUREMENT}', 'ts', if_not_exists => TRUE)"
        ))
        .execute(&self.pool)
        .await?;
        info!(table = MEASUREMENT, "schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Keyed on (room, ts): replaying a reading overwrites the same row.
const UPSERT_READING: &str = r#"
    INSERT INTO room_sensors (ts, room, temperature, pressure, humidity)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (room, ts) DO UPDATE SET
        temperature = EXCLUDED.temperature,
        pressure = EXCLUDED.pressure,
        humidity = EXCLUDED.humidity
"#;

#[async_trait]
impl TimeSeriesStore for TimescaleStore {
    async fn write_points(&self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for p in points {
            let room = p
                .room()
                .ok_or_else(|| TelemetryError::InvalidSample("point has no room tag".into()))?;
            sqlx::query(UPSERT_READING)
                .bind(p.ts)
                .bind(room)
                .bind(p.field(FIELD_TEMPERATURE))
                .bind(p.field(FIELD_PRESSURE))
                .bind(p.field(FIELD_HUMIDITY))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        debug!(table = MEASUREMENT, count = points.len(), "points written");
        Ok(())
    }

    async fn query_rows(&self, query: &AggregationQuery) -> Result<Vec<StoreRow>> {
        let rows = sqlx::query_as::<_, StoreRow>(&query.to_sql())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
