use std::path::{Path, PathBuf};
use thiserror::Error;

/// One reading in display units: °C, hPa and %RH.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f32,
    pub pressure: f32,
    pub humidity: f32,
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected value {value:?} in {path}")]
    Parse { path: PathBuf, value: String },
}

#[cfg_attr(test, mockall::automock)]
pub trait Sensor: Send {
    fn read(&mut self) -> Result<Reading, SensorError>;
}

const TEMPERATURE: &str = "in_temp_input";
const PRESSURE: &str = "in_pressure_input";
const HUMIDITY: &str = "in_humidityrelative_input";

/// Combined temperature/pressure/humidity chip exposed through the Linux
/// Industrial I/O sysfs interface (e.g. a BME280 on I2C).
///
/// The kernel reports temperature in milli-°C, pressure in kPa and humidity
/// in milli-percent.
#[derive(Debug, Clone)]
pub struct IioSensor {
    dir: PathBuf,
}

impl IioSensor {
    /// Open the device directory and check that every channel is present.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SensorError> {
        let dir = dir.into();
        for channel in [TEMPERATURE, PRESSURE, HUMIDITY] {
            let path = dir.join(channel);
            std::fs::metadata(&path).map_err(|source| SensorError::Io { path, source })?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn channel(&self, name: &str) -> Result<f64, SensorError> {
        let path = self.dir.join(name);
        let raw = std::fs::read_to_string(&path).map_err(|source| SensorError::Io {
            path: path.clone(),
            source,
        })?;
        let value = raw.trim();
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SensorError::Parse {
                path,
                value: value.to_string(),
            })
    }
}

impl Sensor for IioSensor {
    fn read(&mut self) -> Result<Reading, SensorError> {
        let temperature = self.channel(TEMPERATURE)? / 1000.0;
        let pressure = self.channel(PRESSURE)? * 10.0;
        let humidity = self.channel(HUMIDITY)? / 1000.0;
        Ok(Reading {
            temperature: temperature as f32,
            pressure: pressure as f32,
            humidity: humidity as f32,
        })
    }
}
