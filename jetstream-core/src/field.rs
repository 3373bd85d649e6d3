//! Gridded surface-temperature observations grouped into time steps
//!
//! A [`TemperatureField`] is the in-memory hand-off from the ingestion layer: a
//! validated, time-ordered collection of [`TimeStep`]s. Structural problems with
//! the grid (mismatched columns, out-of-range latitudes, duplicated cells) are
//! rejected when the field is built. Problems with the temperature values
//! themselves are left for the per-step computation so that a single corrupt
//! step does not abort a whole run.

use crate::errors::{JetstreamError, JetstreamResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

/// Integer time stamp of an observation (for example hours since an epoch)
pub type Time = i64;

/// A single surface temperature value at one grid cell and time
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: Time,
    /// Latitude of the cell centre (degrees north)
    pub lat: f64,
    /// Longitude of the cell centre (degrees east)
    pub lon: f64,
    pub temperature: f64,
}

impl Observation {
    pub fn new(time: Time, lat: f64, lon: f64, temperature: f64) -> Self {
        Self {
            time,
            lat,
            lon,
            temperature,
        }
    }
}

/// Bit pattern used to compare coordinates exactly (`-0.0` and `0.0` are the same cell)
pub(crate) fn coordinate_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// All observations sharing a single time stamp, stored as columns
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStep {
    time: Time,
    lats: Array1<f64>,
    lons: Array1<f64>,
    temperatures: Array1<f64>,
}

impl TimeStep {
    fn from_observations(time: Time, observations: &[Observation]) -> Self {
        Self {
            time,
            lats: observations.iter().map(|o| o.lat).collect(),
            lons: observations.iter().map(|o| o.lon).collect(),
            temperatures: observations.iter().map(|o| o.temperature).collect(),
        }
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    pub fn lats(&self) -> &Array1<f64> {
        &self.lats
    }

    pub fn lons(&self) -> &Array1<f64> {
        &self.lons
    }

    pub fn temperatures(&self) -> &Array1<f64> {
        &self.temperatures
    }

    /// Distinct latitudes present in this step, ascending
    pub fn unique_latitudes(&self) -> Vec<f64> {
        let mut lats = self.lats.to_vec();
        lats.sort_by(f64::total_cmp);
        lats.dedup_by(|a, b| coordinate_key(*a) == coordinate_key(*b));
        lats
    }

    /// Check the step holds at least one observation and only finite temperatures
    pub fn validate_temperatures(&self) -> JetstreamResult<()> {
        if self.is_empty() {
            return Err(JetstreamError::EmptyTimeStep(self.time));
        }
        if let Some(i) = self.temperatures.iter().position(|t| !t.is_finite()) {
            return Err(JetstreamError::NonFiniteTemperature {
                time: self.time,
                lat: self.lats[i],
                lon: self.lons[i],
                value: self.temperatures[i],
            });
        }
        Ok(())
    }

    /// Iterate over the step as observations
    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.lats
            .iter()
            .zip(self.lons.iter())
            .zip(self.temperatures.iter())
            .map(move |((lat, lon), temperature)| {
                Observation::new(self.time, *lat, *lon, *temperature)
            })
    }
}

/// A validated gridded temperature field, ordered by time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperatureField {
    steps: Vec<TimeStep>,
}

impl TemperatureField {
    /// Build a field from individual observations
    ///
    /// Observations keep their input order within each time step.
    ///
    /// # Errors
    ///
    /// Returns [`JetstreamError::InvalidGrid`] if a coordinate is not finite, a
    /// latitude lies outside [-90, 90], or the same `(time, lat, lon)` appears
    /// more than once.
    pub fn from_observations<I>(observations: I) -> JetstreamResult<Self>
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut seen = HashSet::new();
        let mut grouped: BTreeMap<Time, Vec<Observation>> = BTreeMap::new();

        for obs in observations {
            if !obs.lat.is_finite() || !obs.lon.is_finite() {
                return Err(JetstreamError::InvalidGrid(format!(
                    "non-finite coordinate (lat={}, lon={}) at time {}",
                    obs.lat, obs.lon, obs.time
                )));
            }
            if !(-90.0..=90.0).contains(&obs.lat) {
                return Err(JetstreamError::InvalidGrid(format!(
                    "latitude {} at time {} is outside [-90, 90]",
                    obs.lat, obs.time
                )));
            }
            if !seen.insert((obs.time, coordinate_key(obs.lat), coordinate_key(obs.lon))) {
                return Err(JetstreamError::InvalidGrid(format!(
                    "duplicate cell (time={}, lat={}, lon={})",
                    obs.time, obs.lat, obs.lon
                )));
            }
            grouped.entry(obs.time).or_default().push(obs);
        }

        let steps = grouped
            .into_iter()
            .map(|(time, obs)| TimeStep::from_observations(time, &obs))
            .collect();
        Ok(Self { steps })
    }

    /// Build a field from parallel coordinate and value columns
    pub fn from_columns(
        times: &[Time],
        lats: &[f64],
        lons: &[f64],
        temperatures: &[f64],
    ) -> JetstreamResult<Self> {
        let n = temperatures.len();
        for (axis, len) in [("time", times.len()), ("lat", lats.len()), ("lon", lons.len())] {
            if len != n {
                return Err(JetstreamError::InvalidGrid(format!(
                    "{} axis has {} values but there are {} temperatures",
                    axis, len, n
                )));
            }
        }

        Self::from_observations(
            (0..n).map(|i| Observation::new(times[i], lats[i], lons[i], temperatures[i])),
        )
    }

    pub fn steps(&self) -> &[TimeStep] {
        &self.steps
    }

    pub fn times(&self) -> Vec<Time> {
        self.steps.iter().map(|s| s.time).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total number of observations across all time steps
    pub fn n_observations(&self) -> usize {
        self.steps.iter().map(|s| s.len()).sum()
    }

    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.steps.iter().flat_map(|s| s.observations())
    }

    /// Latitudes of every observation in the field
    pub fn all_latitudes(&self) -> Vec<f64> {
        self.steps.iter().flat_map(|s| s.lats.iter().copied()).collect()
    }

    /// Longitudes of every observation in the field
    pub fn all_longitudes(&self) -> Vec<f64> {
        self.steps.iter().flat_map(|s| s.lons.iter().copied()).collect()
    }

    /// Identity of the field contents, used as a cache key
    ///
    /// Two fields with the same observations in the same order share a fingerprint.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.n_observations().hash(&mut hasher);
        for obs in self.observations() {
            obs.time.hash(&mut hasher);
            coordinate_key(obs.lat).hash(&mut hasher);
            coordinate_key(obs.lon).hash(&mut hasher);
            obs.temperature.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(time: Time, lat: f64, lon: f64, t: f64) -> Observation {
        Observation::new(time, lat, lon, t)
    }

    #[test]
    fn test_groups_and_orders_by_time() {
        let field = TemperatureField::from_observations(vec![
            obs(2, 10.0, 0.0, 280.0),
            obs(1, 10.0, 0.0, 281.0),
            obs(2, 20.0, 0.0, 270.0),
        ])
        .unwrap();

        assert_eq!(field.times(), vec![1, 2]);
        assert_eq!(field.steps()[1].len(), 2);
        assert_eq!(field.n_observations(), 3);
        assert_eq!(field.steps()[1].temperatures().to_vec(), vec![280.0, 270.0]);
    }

    #[test]
    fn test_rejects_duplicate_cells() {
        let result = TemperatureField::from_observations(vec![
            obs(1, 10.0, 0.0, 280.0),
            obs(1, 10.0, -0.0, 281.0),
        ]);
        assert!(matches!(result, Err(JetstreamError::InvalidGrid(_))));
    }

    #[test]
    fn test_rejects_latitude_out_of_range() {
        let result = TemperatureField::from_observations(vec![obs(1, 90.5, 0.0, 280.0)]);
        assert!(matches!(result, Err(JetstreamError::InvalidGrid(_))));

        let result = TemperatureField::from_observations(vec![obs(1, f64::NAN, 0.0, 280.0)]);
        assert!(matches!(result, Err(JetstreamError::InvalidGrid(_))));
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        let result = TemperatureField::from_columns(&[1, 1], &[10.0, 20.0], &[0.0], &[1.0, 2.0]);
        match result {
            Err(JetstreamError::InvalidGrid(msg)) => assert!(msg.contains("lon")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nan_temperature_is_a_step_error() {
        let field = TemperatureField::from_observations(vec![
            obs(1, 10.0, 0.0, 280.0),
            obs(2, 10.0, 0.0, f64::NAN),
        ])
        .unwrap();

        assert!(field.steps()[0].validate_temperatures().is_ok());
        assert!(matches!(
            field.steps()[1].validate_temperatures(),
            Err(JetstreamError::NonFiniteTemperature { time: 2, .. })
        ));
    }

    #[test]
    fn test_unique_latitudes() {
        let field = TemperatureField::from_observations(vec![
            obs(1, 40.0, 0.0, 280.0),
            obs(1, 20.0, 0.0, 281.0),
            obs(1, 40.0, 1.0, 282.0),
        ])
        .unwrap();
        assert_eq!(field.steps()[0].unique_latitudes(), vec![20.0, 40.0]);
    }

    #[test]
    fn test_fingerprint_tracks_contents() {
        let a = TemperatureField::from_observations(vec![obs(1, 40.0, 0.0, 280.0)]).unwrap();
        let b = TemperatureField::from_observations(vec![obs(1, 40.0, 0.0, 280.0)]).unwrap();
        let c = TemperatureField::from_observations(vec![obs(1, 40.0, 0.0, 280.5)]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
