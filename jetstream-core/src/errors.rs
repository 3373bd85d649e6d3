use crate::field::Time;
use thiserror::Error;

/// Error type for invalid grids, configurations and per-step computations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JetstreamError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Non-finite temperature {value} at time={time}, lat={lat}, lon={lon}")]
    NonFiniteTemperature {
        time: Time,
        lat: f64,
        lon: f64,
        value: f64,
    },
    #[error("Time step {0} contains no observations")]
    EmptyTimeStep(Time),
    #[error("Temperature {value} at time={time} is outside the fixed bucket range [{min}, {max}]")]
    TemperatureOutOfRange {
        time: Time,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Temperature range [{min}, {max}] needs more than {limit} buckets of width {width}")]
    TooManyBuckets {
        min: f64,
        max: f64,
        width: f64,
        limit: usize,
    },
    #[error("Cumulative area {area} km^2 exceeds the effective latitude domain (maximum {max_area} km^2)")]
    AreaOverflow { area: f64, max_area: f64 },
    #[error("Cannot interpolate along the effective latitude curve: {0}")]
    InterpolationDomainViolation(String),
    #[error("Could not parse configuration: {0}")]
    Config(String),
}

impl From<toml::de::Error> for JetstreamError {
    fn from(value: toml::de::Error) -> Self {
        JetstreamError::Config(value.to_string())
    }
}

/// Convenience type for `Result<T, JetstreamError>`.
pub type JetstreamResult<T> = Result<T, JetstreamError>;
