pub mod bridge;
pub mod config;
pub mod error;
pub mod redpanda;
pub mod subscription;

// Re-export commonly used items
pub use bridge::{InboundMessage, MessageBridge, Outcome};
pub use config::Config;
pub use error::SinkError;
pub use subscription::{run, RetryPolicy, Subscription};
