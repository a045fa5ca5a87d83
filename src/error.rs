use thiserror::Error;

use crate::actuator::ChannelId;

/// Failure while reading OS counters. Always fatal.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("metrics are not supported on this platform")]
    Unsupported,

    #[error("no network interfaces to sample")]
    NoInterfaces,

    #[error("configured network interface `{0}` does not exist")]
    UnknownInterface(String),

    #[error("network interface `{0}` disappeared while sampling")]
    InterfaceVanished(String),

    #[error("metric source failed: {0}")]
    Source(String),
}

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("channel {0} is not provided by this actuator")]
    UnknownChannel(ChannelId),

    #[error("value {value} is outside channel {channel} range [0, {max}]")]
    OutOfRange {
        channel: ChannelId,
        value: f64,
        max: f64,
    },

    #[error("channel {0} was already shut down")]
    ChannelShutDown(ChannelId),

    #[error("output device error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::ValidationFailed {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Anything that ends the control loop with a non-zero exit.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("sampling failed: {0}")]
    Sampling(#[from] SamplingError),

    #[error("actuator write on channel {channel} failed: {source}")]
    Actuator {
        channel: ChannelId,
        #[source]
        source: ActuatorError,
    },
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
