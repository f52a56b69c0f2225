use crate::error::Result;
use crate::point::Point;
use crate::query::AggregationQuery;
use crate::series::{SeriesSet, StoreRow};
use crate::token::TimeToken;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Boundary to the time-series database.
///
/// Implementations must be safe for concurrent use; the gateway shares one
/// instance between every writer and reader in the process.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn write_points(&self, points: &[Point]) -> Result<()>;

    async fn query_rows(&self, query: &AggregationQuery) -> Result<Vec<StoreRow>>;
}

#[derive(Clone)]
pub struct TimeSeriesGateway {
    store: Arc<dyn TimeSeriesStore>,
}

impl TimeSeriesGateway {
    pub fn new(store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { store }
    }

    pub async fn write(&self, point: &Point) -> Result<()> {
        self.store.write_points(std::slice::from_ref(point)).await
    }

    pub async fn query(&self, range: TimeToken, interval: TimeToken) -> Result<SeriesSet> {
        let query = AggregationQuery::new(range, interval);
        let rows = self.store.query_rows(&query).await?;
        debug!(range = %range, interval = %interval, rows = rows.len(), "aggregation query done");
        Ok(SeriesSet::from_rows(rows))
    }
}
