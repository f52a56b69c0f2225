pub mod agent;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mqtt;
pub mod sensor;

// Re-export commonly used items
pub use agent::{AgentState, DeviceAgent};
pub use config::AgentConfig;
pub use credentials::{Credential, CredentialProvider, KeyAlgorithm};
pub use error::AgentError;
pub use mqtt::{Broker, MqttBroker};
pub use sensor::{IioSensor, Reading, Sensor, SensorError};
