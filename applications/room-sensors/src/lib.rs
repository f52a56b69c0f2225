pub mod config;
pub mod error;
pub mod point;
pub mod query;
pub mod sample;
pub mod series;
pub mod shutdown;
pub mod store;
pub mod timescale;
pub mod token;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

// Re-export commonly used items
pub use error::{Result, TelemetryError};
pub use point::{Point, MEASUREMENT};
pub use query::AggregationQuery;
pub use sample::{Sample, SamplePayload};
pub use series::{ChartPoint, Series, SeriesSet, StoreRow};
pub use store::{TimeSeriesGateway, TimeSeriesStore};
pub use timescale::TimescaleStore;
pub use token::{TimeToken, TimeUnit};
