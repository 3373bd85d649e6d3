//! Selections of time, latitude and longitude applied before computing T'
use crate::errors::{ProductError, ProductResult};
use jetstream_core::field::{Observation, TemperatureField, Time};
use serde::{Deserialize, Serialize};

/// Inclusive window of time stamps
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Time,
    pub end: Time,
}

impl TimeWindow {
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: Time) -> bool {
        (self.start..=self.end).contains(&time)
    }
}

/// Optional lower and upper limits on a coordinate (degrees)
///
/// Whether the lower limit is inclusive depends on the data product.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl CoordinateBounds {
    /// Only values above `min`
    pub fn above(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    fn validate(&self, axis: &str) -> ProductResult<()> {
        for value in [self.min, self.max].into_iter().flatten() {
            if !value.is_finite() {
                return Err(ProductError::InvalidSubset(format!(
                    "{} bound {} is not finite",
                    axis, value
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ProductError::InvalidSubset(format!(
                    "{} bounds are reversed ({} > {})",
                    axis, min, max
                )));
            }
        }
        Ok(())
    }

    /// Test a value, with a strict or inclusive lower limit. The upper limit is always inclusive.
    pub(crate) fn admits(&self, value: f64, strict_min: bool) -> bool {
        let above_min = match self.min {
            Some(min) if strict_min => value > min,
            Some(min) => value >= min,
            None => true,
        };
        above_min && self.max.map_or(true, |max| value <= max)
    }
}

/// Region and period to keep from a temperature field
///
/// Unset parts select everything along that axis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetSpec {
    pub time: Option<TimeWindow>,
    pub lat: CoordinateBounds,
    pub lon: CoordinateBounds,
}

impl SubsetSpec {
    pub fn with_time(mut self, window: TimeWindow) -> Self {
        self.time = Some(window);
        self
    }

    pub fn with_lat(mut self, bounds: CoordinateBounds) -> Self {
        self.lat = bounds;
        self
    }

    pub fn with_lon(mut self, bounds: CoordinateBounds) -> Self {
        self.lon = bounds;
        self
    }

    pub fn validate(&self) -> ProductResult<()> {
        if let Some(window) = &self.time {
            if window.start > window.end {
                return Err(ProductError::InvalidSubset(format!(
                    "time window starts at {} after it ends at {}",
                    window.start, window.end
                )));
            }
        }
        self.lat.validate("lat")?;
        self.lon.validate("lon")
    }

    pub(crate) fn admits(&self, obs: &Observation, strict_min: bool) -> bool {
        self.time.map_or(true, |w| w.contains(obs.time))
            && self.lat.admits(obs.lat, strict_min)
            && self.lon.admits(obs.lon, strict_min)
    }
}

/// Map a longitude in [0, 360) onto [-180, 180)
pub fn rescale_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Rescale every longitude of a field onto [-180, 180)
///
/// # Errors
///
/// Fails if two cells land on the same longitude (for example a grid holding
/// both 0 and 360 degrees).
pub fn rescale_longitudes(field: &TemperatureField) -> ProductResult<TemperatureField> {
    let rescaled = field.observations().map(|obs| Observation {
        lon: rescale_longitude(obs.lon),
        ..obs
    });
    Ok(TemperatureField::from_observations(rescaled)?)
}
