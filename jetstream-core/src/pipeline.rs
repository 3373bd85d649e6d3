//! End-to-end T-prime computation
//!
//! For each time step of a [`TemperatureField`]:
//!
//! 1. temperatures are bucketed ([`TemperatureBucketer`]),
//! 2. cell areas are summed per bucket and cumulated ([`AreaAccumulator`]),
//! 3. cumulative areas become effective latitudes ([`EffectiveLatitudeMapper`]),
//! 4. T_ref is interpolated at each true latitude
//!    ([`ReferenceTemperatureInterpolator`]) and joined back onto every cell
//!    of that latitude,
//! 5. `T' = T - T_ref`.
//!
//! Steps are independent and run through a caller-supplied [`StepExecutor`].
//! A step that fails is reported in [`TPrimeRun::failures`] and the remaining
//! steps are still computed.

use crate::accumulate::AreaAccumulator;
use crate::bucket::{TemperatureBucketer, TemperatureRange};
use crate::cache::MemoCache;
use crate::config::{BucketRange, TPrimeConfig};
use crate::effective_latitude::EffectiveLatitudeMapper;
use crate::errors::{JetstreamError, JetstreamResult};
use crate::executor::{SequentialExecutor, StepExecutor};
use crate::field::{coordinate_key, TemperatureField, Time, TimeStep};
use crate::grid::{GridAreaModel, GridSpacing};
use crate::interpolate::{effective_latitudes_of, ReferenceTemperatureInterpolator};
use log::{debug, info, warn};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One grid cell at one time with its reference temperature and anomaly
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub time: Time,
    pub lat: f64,
    pub lon: f64,
    pub temperature: f64,
    pub t_ref: f64,
    pub t_prime: f64,
}

/// Effective latitude of an observed temperature and its offset from the true latitude
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatitudeShift {
    pub time: Time,
    pub lat: f64,
    pub lon: f64,
    pub effective_latitude: f64,
    /// `lat - effective_latitude`
    pub phi_prime: f64,
}

/// Conditions worth knowing about that did not prevent a step from completing
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepDiagnostic {
    /// The step held a single distinct temperature; T_ref is that temperature everywhere
    DegenerateTimeStep,
    /// Cumulative areas of this many buckets were clamped into the cap domain
    AreaClamped { buckets: usize },
}

/// Intermediate distributions of one time step, coldest bucket first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepCurves {
    /// Lower temperature edge of each bucket
    pub bucket_labels: Vec<f64>,
    /// Area of the cells in each bucket (km^2)
    pub bucket_areas: Vec<f64>,
    /// Running total of `bucket_areas` (km^2)
    pub cumulative_areas: Vec<f64>,
    /// Effective latitude of each cumulative area (degrees)
    pub effective_latitudes: Vec<f64>,
}

/// Everything computed for one time step
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    pub time: Time,
    pub curves: StepCurves,
    /// One record per observation, in the step's observation order
    pub records: Vec<OutputRecord>,
    pub diagnostics: Vec<StepDiagnostic>,
}

impl StepResult {
    /// Reference temperature of each distinct latitude of the step, ascending by latitude
    pub fn reference_temperatures(&self) -> Vec<(f64, f64)> {
        let mut by_lat: Vec<(f64, f64)> = self.records.iter().map(|r| (r.lat, r.t_ref)).collect();
        by_lat.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_lat.dedup_by(|a, b| coordinate_key(a.0) == coordinate_key(b.0));
        by_lat
    }

    /// Effective latitude of every observed temperature of the step
    pub fn effective_latitude_of_temperature(&self) -> JetstreamResult<Vec<LatitudeShift>> {
        let temperatures = self.records.iter().map(|r| r.temperature).collect::<Vec<_>>();
        let effective = effective_latitudes_of(
            ArrayView1::from(&temperatures),
            &self.curves.bucket_labels,
            &self.curves.effective_latitudes,
        )?;

        Ok(self
            .records
            .iter()
            .zip(effective.iter())
            .map(|(r, &eff)| LatitudeShift {
                time: r.time,
                lat: r.lat,
                lon: r.lon,
                effective_latitude: eff,
                phi_prime: r.lat - eff,
            })
            .collect())
    }
}

/// A time step that could not be computed
#[derive(Clone, Debug, PartialEq)]
pub struct StepFailure {
    pub time: Time,
    pub error: JetstreamError,
}

/// Result of running the pipeline over a whole field
#[derive(Clone, Debug, PartialEq)]
pub struct TPrimeRun {
    spacing: GridSpacing,
    steps: Vec<StepResult>,
    failures: Vec<StepFailure>,
}

impl TPrimeRun {
    /// Grid spacing used for the cell areas
    pub fn spacing(&self) -> GridSpacing {
        self.spacing
    }

    /// Successful steps, ascending by time
    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Failed steps, ascending by time
    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// True if every time step was computed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn step(&self, time: Time) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.time == time)
    }

    /// All output records, ascending by time
    pub fn records(&self) -> impl Iterator<Item = &OutputRecord> {
        self.steps.iter().flat_map(|s| s.records.iter())
    }

    /// Diagnostics of every step that reported any
    pub fn diagnostics(&self) -> impl Iterator<Item = (Time, &StepDiagnostic)> {
        self.steps
            .iter()
            .flat_map(|s| s.diagnostics.iter().map(move |d| (s.time, d)))
    }

    /// Stop at the first failed step
    pub fn into_result(self) -> JetstreamResult<Self> {
        match self.failures.first() {
            Some(failure) => Err(failure.error.clone()),
            None => Ok(self),
        }
    }
}

/// The per-step stages, configured once per run
#[derive(Copy, Clone, Debug)]
struct Stages {
    bucketer: TemperatureBucketer,
    accumulator: AreaAccumulator,
    mapper: EffectiveLatitudeMapper,
}

impl Stages {
    fn process(&self, step: &TimeStep) -> JetstreamResult<StepResult> {
        step.validate_temperatures()?;

        let assignment = self
            .bucketer
            .bucketize(step.time(), step.temperatures().view())?;
        let areas = self.accumulator.accumulate(step.lats().view(), &assignment)?;
        let effective = self.mapper.map_curve(&areas)?;

        let mut diagnostics = vec![];
        if assignment.is_degenerate() {
            warn!(
                "Time step {} has a single distinct temperature, using a constant reference",
                step.time()
            );
            diagnostics.push(StepDiagnostic::DegenerateTimeStep);
        }
        if effective.clamped() > 0 {
            diagnostics.push(StepDiagnostic::AreaClamped {
                buckets: effective.clamped(),
            });
        }

        let labels = assignment.buckets().lower_edges();
        let interpolator = ReferenceTemperatureInterpolator;
        let latitudes = Array1::from(step.unique_latitudes());
        let zonal_t_ref = interpolator.t_ref(latitudes.view(), labels, effective.degrees())?;
        let t_ref_by_lat: HashMap<u64, f64> = latitudes
            .iter()
            .zip(zonal_t_ref.iter())
            .map(|(lat, t_ref)| (coordinate_key(*lat), *t_ref))
            .collect();

        // Every latitude of the step is a key
        let t_ref = step.lats().mapv(|lat| {
            t_ref_by_lat
                .get(&coordinate_key(lat))
                .copied()
                .unwrap_or(f64::NAN)
        });
        let t_prime = interpolator.t_prime(step.temperatures().view(), t_ref.view());

        let records = step
            .observations()
            .zip(t_ref.iter().zip(t_prime.iter()))
            .map(|(obs, (&t_ref, &t_prime))| OutputRecord {
                time: obs.time,
                lat: obs.lat,
                lon: obs.lon,
                temperature: obs.temperature,
                t_ref,
                t_prime,
            })
            .collect();

        debug!(
            "Time step {}: {} observations in {} buckets",
            step.time(),
            step.len(),
            labels.len()
        );

        Ok(StepResult {
            time: step.time(),
            curves: StepCurves {
                bucket_labels: labels.to_vec(),
                bucket_areas: areas.bucket_areas().to_vec(),
                cumulative_areas: areas.cumulative().to_vec(),
                effective_latitudes: effective.degrees().to_vec(),
            },
            records,
            diagnostics,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    field: u64,
    config: u64,
}

/// Computes T_ref and T' for temperature fields, memoising results per field
#[derive(Debug)]
pub struct TPrimeCalculator {
    config: TPrimeConfig,
    cache: MemoCache<CacheKey, TPrimeRun>,
}

impl TPrimeCalculator {
    pub fn new(config: TPrimeConfig) -> JetstreamResult<Self> {
        config.validate()?;
        Ok(Self {
            cache: MemoCache::with_capacity(config.cache_capacity),
            config,
        })
    }

    pub fn config(&self) -> &TPrimeConfig {
        &self.config
    }

    /// Replace the configuration, discarding every cached result
    pub fn set_config(&mut self, config: TPrimeConfig) -> JetstreamResult<()> {
        config.validate()?;
        self.cache = MemoCache::with_capacity(config.cache_capacity);
        self.config = config;
        Ok(())
    }

    /// Number of cached runs, at most `cache_capacity`
    pub fn cached_runs(&self) -> usize {
        self.cache.len()
    }

    /// Compute a field, reusing the cached run if this field was seen before
    pub fn compute<E: StepExecutor>(
        &self,
        field: &TemperatureField,
        executor: &E,
    ) -> JetstreamResult<Arc<TPrimeRun>> {
        let key = CacheKey {
            field: field.fingerprint(),
            config: self.config.fingerprint(),
        };
        self.cache
            .get_or_try_insert_with(key, || self.run(field, executor))
    }

    /// Compute a field without consulting the cache
    ///
    /// # Errors
    ///
    /// Only problems that affect every step are returned as errors (an unusable
    /// grid spacing or bucket range). Per-step problems are collected in
    /// [`TPrimeRun::failures`].
    pub fn run<E: StepExecutor>(
        &self,
        field: &TemperatureField,
        executor: &E,
    ) -> JetstreamResult<TPrimeRun> {
        let spacing = self.resolve_spacing(field)?;
        let stages = Stages {
            bucketer: TemperatureBucketer::new(self.config.bin_width, self.fixed_range(field))?,
            accumulator: AreaAccumulator::new(GridAreaModel::new(spacing)),
            mapper: EffectiveLatitudeMapper::new(
                self.config.cap_domain,
                self.config.overflow_tolerance,
            )?,
        };

        debug!(
            "Computing T' for {} time steps with the {} executor",
            field.steps().len(),
            executor.name()
        );
        let results = executor.execute(field.steps(), |step| {
            (step.time(), stages.process(step))
        });

        let mut steps = vec![];
        let mut failures = vec![];
        for (time, result) in results {
            match result {
                Ok(step) => steps.push(step),
                Err(error) => {
                    warn!("Time step {} failed: {}", time, error);
                    failures.push(StepFailure { time, error });
                }
            }
        }

        info!(
            "Computed T' for {} of {} time steps",
            steps.len(),
            steps.len() + failures.len()
        );

        Ok(TPrimeRun {
            spacing,
            steps,
            failures,
        })
    }

    fn resolve_spacing(&self, field: &TemperatureField) -> JetstreamResult<GridSpacing> {
        let spacing = match self.config.spacing {
            Some(spacing) => spacing,
            None => GridSpacing::infer(&field.all_latitudes(), &field.all_longitudes()),
        };
        spacing.validate()?;
        Ok(spacing)
    }

    fn fixed_range(&self, field: &TemperatureField) -> Option<TemperatureRange> {
        match self.config.bucket_range {
            BucketRange::PerStep => None,
            BucketRange::Fixed(range) => Some(range),
            BucketRange::WholeSeries => {
                TemperatureRange::enclosing(field.steps().iter().flat_map(|s| s.temperatures()))
            }
        }
    }
}

/// Compute T_ref and T' for every cell of a field on the calling thread
///
/// Grid spacing is inferred from the field. Fails on the first failing step;
/// use [`TPrimeCalculator`] to keep the successful steps of a partial run.
pub fn compute_t_prime(
    field: &TemperatureField,
    bin_width: f64,
    fixed_range: Option<TemperatureRange>,
) -> JetstreamResult<Vec<OutputRecord>> {
    let calculator = TPrimeCalculator::new(TPrimeConfig::new(bin_width, fixed_range))?;
    let run = calculator.run(field, &SequentialExecutor)?.into_result()?;
    Ok(run.records().copied().collect())
}
