//! Error types for the rover host application

use rover_core::utils::behavior::AvoidanceError;
use rover_core::utils::controllers::TofError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for `AppConfig`
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Motor controller UART could not be opened
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I2C bus device could not be opened
    #[error("I2C error: {0}")]
    I2c(String),

    /// ToF sensor init or read failure
    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl<E: core::fmt::Debug> From<TofError<E>> for Error {
    fn from(e: TofError<E>) -> Self {
        Error::Sensor(format!("{:?}", e))
    }
}

impl<E: core::fmt::Debug> From<AvoidanceError<E>> for Error {
    fn from(e: AvoidanceError<E>) -> Self {
        match e {
            AvoidanceError::Sensor(inner) => Error::Sensor(format!("{:?}", inner)),
        }
    }
}
