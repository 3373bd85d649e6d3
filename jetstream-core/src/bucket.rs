//! Fixed-width temperature buckets
//!
//! Buckets are half-open intervals `[low, low + width)` labelled by their lower
//! edge. For a time step with temperatures in `[min, max]` the lower edges run
//! from `floor(min)` in steps of `width` up to the bucket that contains
//! `ceil(max)`. A fixed range can be supplied instead so that every time step
//! shares the same edges.

use crate::errors::{JetstreamError, JetstreamResult};
use crate::field::Time;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Slack used when counting how many widths fit between two edges
const EDGE_EPSILON: f64 = 1e-9;

/// Largest number of buckets a single time step may use
pub const MAX_BUCKETS: usize = 1_000_000;

/// Closed temperature interval used to build bucket edges
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl TemperatureRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> JetstreamResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(JetstreamError::InvalidConfig(format!(
                "temperature range [{}, {}] must be finite with min <= max",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Smallest range containing every value, or `None` if there are no finite values
    pub fn enclosing<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some(Self::new(v, v)),
                Some(r) => Some(Self::new(r.min.min(v), r.max.max(v))),
            })
    }
}

/// Ordered set of buckets, coldest first
#[derive(Clone, Debug, PartialEq)]
pub struct Buckets {
    lower_edges: Vec<f64>,
    width: f64,
}

impl Buckets {
    /// Number of buckets needed to cover `[floor(min), ceil(max)]`
    ///
    /// # Errors
    ///
    /// Returns [`JetstreamError::TooManyBuckets`] if the count is not finite or
    /// exceeds [`MAX_BUCKETS`], which happens for fill values such as `9.96921e36`.
    pub fn count(range: TemperatureRange, width: f64) -> JetstreamResult<usize> {
        let n = ((range.max.ceil() - range.min.floor()) / width + EDGE_EPSILON).floor() + 1.0;
        if !n.is_finite() || n > MAX_BUCKETS as f64 {
            return Err(JetstreamError::TooManyBuckets {
                min: range.min,
                max: range.max,
                width,
                limit: MAX_BUCKETS,
            });
        }
        Ok(n as usize)
    }

    /// Buckets covering `[floor(min), ceil(max)]`
    pub fn spanning(range: TemperatureRange, width: f64) -> JetstreamResult<Self> {
        let start = range.min.floor();
        let n = Self::count(range, width)?;
        Ok(Self {
            lower_edges: (0..n).map(|k| start + k as f64 * width).collect(),
            width,
        })
    }

    /// A single bucket starting at `low`
    pub fn single(low: f64, width: f64) -> Self {
        Self {
            lower_edges: vec![low],
            width,
        }
    }

    pub fn len(&self) -> usize {
        self.lower_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower_edges.is_empty()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn lower_edges(&self) -> &[f64] {
        &self.lower_edges
    }

    /// Index of the bucket holding `value`, if any
    ///
    /// Values below the first edge or at/after the last upper edge are outside.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        let first = *self.lower_edges.first()?;
        let last = self.lower_edges.len() - 1;
        if value < first || value >= self.lower_edges[last] + self.width {
            return None;
        }

        let mut k = (((value - first) / self.width).floor() as usize).min(last);
        // Keep the index consistent with the stored edges despite rounding
        if k < last && value >= self.lower_edges[k + 1] {
            k += 1;
        }
        if k > 0 && value < self.lower_edges[k] {
            k -= 1;
        }
        Some(k)
    }
}

/// Bucket membership for every observation of one time step
#[derive(Clone, Debug, PartialEq)]
pub struct BucketAssignment {
    buckets: Buckets,
    indices: Vec<usize>,
    degenerate: bool,
}

impl BucketAssignment {
    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Bucket index of each observation, in observation order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Bucket label (lower edge) of each observation
    pub fn labels(&self) -> Array1<f64> {
        self.indices
            .iter()
            .map(|&i| self.buckets.lower_edges[i])
            .collect()
    }

    /// True when the step held a single distinct temperature
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

/// Partitions temperatures into fixed-width buckets
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TemperatureBucketer {
    width: f64,
    fixed_range: Option<TemperatureRange>,
}

impl TemperatureBucketer {
    /// Create a bucketer with bin `width` (degrees)
    ///
    /// With `fixed_range` every time step uses the same edges, which keeps bucket
    /// labels comparable across time.
    pub fn new(width: f64, fixed_range: Option<TemperatureRange>) -> JetstreamResult<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(JetstreamError::InvalidConfig(format!(
                "bin width must be finite and positive, got {}",
                width
            )));
        }
        if let Some(range) = &fixed_range {
            range.validate()?;
            Buckets::count(*range, width)
                .map_err(|e| JetstreamError::InvalidConfig(e.to_string()))?;
        }
        Ok(Self { width, fixed_range })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn fixed_range(&self) -> Option<TemperatureRange> {
        self.fixed_range
    }

    /// Assign each temperature of a time step to a bucket
    ///
    /// A step with a single distinct temperature gets one bucket whose lower
    /// edge is that temperature, whatever the range policy.
    ///
    /// # Errors
    ///
    /// * [`JetstreamError::EmptyTimeStep`] if there are no temperatures
    /// * [`JetstreamError::NonFiniteTemperature`] for NaN or infinite values. Only
    ///   the values are seen here, so `lat` and `lon` are NaN; run
    ///   [`TimeStep::validate_temperatures`](crate::field::TimeStep::validate_temperatures)
    ///   first to report the offending cell
    /// * [`JetstreamError::TemperatureOutOfRange`] for values outside a fixed range
    /// * [`JetstreamError::TooManyBuckets`] if the range is too wide for the bin width
    pub fn bucketize(
        &self,
        time: Time,
        temperatures: ArrayView1<f64>,
    ) -> JetstreamResult<BucketAssignment> {
        if temperatures.is_empty() {
            return Err(JetstreamError::EmptyTimeStep(time));
        }
        if let Some(&value) = temperatures.iter().find(|t| !t.is_finite()) {
            return Err(JetstreamError::NonFiniteTemperature {
                time,
                lat: f64::NAN,
                lon: f64::NAN,
                value,
            });
        }

        let observed = TemperatureRange::enclosing(temperatures.iter())
            .ok_or(JetstreamError::EmptyTimeStep(time))?;

        let range = match self.fixed_range {
            Some(fixed) => {
                let outside = temperatures.iter().find(|t| !fixed.contains(**t));
                if let Some(&value) = outside {
                    return Err(JetstreamError::TemperatureOutOfRange {
                        time,
                        value,
                        min: fixed.min,
                        max: fixed.max,
                    });
                }
                fixed
            }
            None => observed,
        };

        if observed.min == observed.max {
            return Ok(BucketAssignment {
                buckets: Buckets::single(observed.min, self.width),
                indices: vec![0; temperatures.len()],
                degenerate: true,
            });
        }

        let buckets = Buckets::spanning(range, self.width)?;
        let indices = temperatures
            .iter()
            .map(|&t| {
                buckets
                    .index_of(t)
                    .ok_or(JetstreamError::TemperatureOutOfRange {
                        time,
                        value: t,
                        min: range.min,
                        max: range.max,
                    })
            })
            .collect::<JetstreamResult<Vec<_>>>()?;

        Ok(BucketAssignment {
            buckets,
            indices,
            degenerate: false,
        })
    }
}
