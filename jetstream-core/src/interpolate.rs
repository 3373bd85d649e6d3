//! Reference temperature by interpolation along the effective-latitude curve
//!
//! For a single time step the bucket labels (lower temperature edges) and their
//! effective latitudes form a curve that runs from the pole (coldest bucket) to
//! the equator (warmest bucket). The reference temperature at a true latitude
//! is the bucket temperature whose effective latitude equals that latitude:
//!
//! $$ T_{ref}(\phi) = \mathrm{interp}(\phi;\ \phi_{eff}^{rev},\ T_{bucket}^{rev}) $$
//!
//! The curve is reversed so that effective latitude ascends. Queries outside
//! the curve return the nearest edge value (flat extrapolation), the same as
//! standard one-dimensional linear interpolation.

use crate::errors::{JetstreamError, JetstreamResult};
use ndarray::{Array1, ArrayView1};

/// Piecewise-linear interpolation over ascending knots with flat extrapolation
///
/// Where knots repeat, the right-most knot not exceeding `x` is used, so
/// plateaus resolve towards the later (warmer after reversal) value.
/// `xp` must be non-empty, ascending and the same length as `fp`.
pub(crate) fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len();
    if x.is_nan() {
        return f64::NAN;
    }
    if x < xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }

    let j = xp.partition_point(|v| *v <= x) - 1;
    let slope = (fp[j + 1] - fp[j]) / (xp[j + 1] - xp[j]);
    fp[j] + slope * (x - xp[j])
}

/// Effective latitude curve of one time step, prepared for interpolation
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceCurve {
    effective_latitudes: Vec<f64>,
    temperatures: Vec<f64>,
}

impl ReferenceCurve {
    /// Build the curve from buckets ordered coldest to warmest
    ///
    /// Pairs with a NaN effective latitude are dropped. The remaining effective
    /// latitudes must be non-increasing in bucket order; the arrays are then
    /// reversed so that effective latitude ascends.
    ///
    /// # Errors
    ///
    /// Returns [`JetstreamError::InterpolationDomainViolation`] if the arrays
    /// differ in length, no usable pair remains, or the curve is not monotonic.
    pub fn new(bucket_labels: &[f64], effective_latitudes: &[f64]) -> JetstreamResult<Self> {
        if bucket_labels.len() != effective_latitudes.len() {
            return Err(JetstreamError::InterpolationDomainViolation(format!(
                "{} bucket labels for {} effective latitudes",
                bucket_labels.len(),
                effective_latitudes.len()
            )));
        }

        let (mut temperatures, mut lats): (Vec<f64>, Vec<f64>) = bucket_labels
            .iter()
            .zip(effective_latitudes)
            .filter(|(_, lat)| !lat.is_nan())
            .map(|(t, lat)| (*t, *lat))
            .unzip();

        if lats.is_empty() {
            return Err(JetstreamError::InterpolationDomainViolation(
                "no buckets with a defined effective latitude".to_string(),
            ));
        }

        if let Some(i) = lats.windows(2).position(|w| w[1] > w[0]) {
            return Err(JetstreamError::InterpolationDomainViolation(format!(
                "effective latitude increases from {} to {} between buckets {} and {}",
                lats[i],
                lats[i + 1],
                temperatures[i],
                temperatures[i + 1]
            )));
        }

        lats.reverse();
        temperatures.reverse();
        Ok(Self {
            effective_latitudes: lats,
            temperatures,
        })
    }

    /// Effective latitudes in ascending order
    pub fn effective_latitudes(&self) -> &[f64] {
        &self.effective_latitudes
    }

    /// Bucket temperatures matching [`effective_latitudes`](Self::effective_latitudes)
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Range of effective latitude covered by the curve
    pub fn latitude_bounds(&self) -> (f64, f64) {
        (
            self.effective_latitudes[0],
            self.effective_latitudes[self.effective_latitudes.len() - 1],
        )
    }

    /// Reference temperature at a true latitude
    pub fn evaluate(&self, latitude: f64) -> f64 {
        interp(latitude, &self.effective_latitudes, &self.temperatures)
    }
}

/// Derives T_ref and T' for the latitudes of a time step
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceTemperatureInterpolator;

impl ReferenceTemperatureInterpolator {
    /// Reference temperature at each true latitude
    ///
    /// `bucket_labels` and `effective_latitudes` are ordered coldest bucket first.
    pub fn t_ref(
        &self,
        true_latitudes: ArrayView1<f64>,
        bucket_labels: &[f64],
        effective_latitudes: &[f64],
    ) -> JetstreamResult<Array1<f64>> {
        let curve = ReferenceCurve::new(bucket_labels, effective_latitudes)?;
        Ok(true_latitudes.mapv(|lat| curve.evaluate(lat)))
    }

    /// Anomaly of observed temperature against the reference, `T - T_ref`
    pub fn t_prime(&self, temperatures: ArrayView1<f64>, t_ref: ArrayView1<f64>) -> Array1<f64> {
        &temperatures - &t_ref
    }
}

/// Effective latitude of each observed temperature
///
/// Interpolates along the bucket lower edges (ascending) against the effective
/// latitude of each bucket, so a temperature maps to the latitude at which it
/// would sit if the field were zonally symmetric. Out-of-range temperatures take
/// the edge value.
pub fn effective_latitudes_of(
    temperatures: ArrayView1<f64>,
    bucket_labels: &[f64],
    effective_latitudes: &[f64],
) -> JetstreamResult<Array1<f64>> {
    if bucket_labels.is_empty() || bucket_labels.len() != effective_latitudes.len() {
        return Err(JetstreamError::InterpolationDomainViolation(format!(
            "{} bucket labels for {} effective latitudes",
            bucket_labels.len(),
            effective_latitudes.len()
        )));
    }
    if bucket_labels.windows(2).any(|w| w[1] <= w[0]) {
        return Err(JetstreamError::InterpolationDomainViolation(
            "bucket labels must be strictly ascending".to_string(),
        ));
    }
    if effective_latitudes.iter().any(|l| l.is_nan()) {
        return Err(JetstreamError::InterpolationDomainViolation(
            "effective latitude curve contains NaN".to_string(),
        ));
    }
    Ok(temperatures.mapv(|t| interp(t, bucket_labels, effective_latitudes)))
}
