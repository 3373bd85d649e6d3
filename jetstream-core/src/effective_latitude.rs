//! Conversion of cumulative area to effective latitude
//!
//! The effective latitude of a cumulative area $A$ is the latitude whose
//! pole-ward spherical cap has the same area:
//!
//! $$ A = 2 \pi R^2 (1 - \sin\phi_{eff}) $$
//!
//! which inverts to
//!
//! $$ \phi_{eff} = 90^\circ - \arccos\left(1 - \frac{A}{2 \pi R^2}\right) $$
//!
//! The argument of $\arccos$ must stay inside the mapper's domain. Small
//! excursions (grids that tile the whole hemisphere slightly overshoot its area
//! through discretisation) are clamped and reported; anything larger is an
//! [`JetstreamError::AreaOverflow`] rather than a NaN.

use crate::accumulate::AreaCurve;
use crate::errors::{JetstreamError, JetstreamResult};
use crate::grid::R_EARTH;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default relative tolerance for clamping the `arccos` argument
pub const DEFAULT_OVERFLOW_TOLERANCE: f64 = 1e-3;

/// Area of a hemisphere of the Earth (km^2)
pub fn hemisphere_area() -> f64 {
    2.0 * PI * R_EARTH.powi(2)
}

/// Extent of the spherical-cap model
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CapDomain {
    /// Caps grow from the pole to the equator (maximum area $2\pi R^2$)
    #[default]
    Hemisphere,
    /// Caps may continue past the equator to the opposite pole (maximum area $4\pi R^2$)
    Globe,
}

impl CapDomain {
    /// Smallest allowed value of `1 - A / (2 pi R^2)`
    fn lower_ratio(&self) -> f64 {
        match self {
            CapDomain::Hemisphere => 0.0,
            CapDomain::Globe => -1.0,
        }
    }

    /// Largest cumulative area the domain can represent (km^2)
    pub fn max_area(&self) -> f64 {
        (1.0 - self.lower_ratio()) * hemisphere_area()
    }
}

/// An effective latitude and whether its area had to be clamped into the domain
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EffectiveLatitude {
    pub degrees: f64,
    pub clamped: bool,
}

/// Effective latitude of every bucket of an [`AreaCurve`], coldest bucket first
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectiveLatitudeCurve {
    degrees: Vec<f64>,
    clamped: usize,
}

impl EffectiveLatitudeCurve {
    pub fn degrees(&self) -> &[f64] {
        &self.degrees
    }

    /// Number of buckets whose area was clamped into the domain
    pub fn clamped(&self) -> usize {
        self.clamped
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }
}

/// Maps cumulative areas onto effective latitudes
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EffectiveLatitudeMapper {
    domain: CapDomain,
    overflow_tolerance: f64,
}

impl Default for EffectiveLatitudeMapper {
    fn default() -> Self {
        Self {
            domain: CapDomain::Hemisphere,
            overflow_tolerance: DEFAULT_OVERFLOW_TOLERANCE,
        }
    }
}

impl EffectiveLatitudeMapper {
    pub fn new(domain: CapDomain, overflow_tolerance: f64) -> JetstreamResult<Self> {
        if !overflow_tolerance.is_finite() || overflow_tolerance < 0.0 {
            return Err(JetstreamError::InvalidConfig(format!(
                "overflow tolerance must be finite and non-negative, got {}",
                overflow_tolerance
            )));
        }
        Ok(Self {
            domain,
            overflow_tolerance,
        })
    }

    pub fn domain(&self) -> CapDomain {
        self.domain
    }

    /// Effective latitude (degrees) of a cumulative area (km^2)
    pub fn to_effective_latitude(&self, cumulative_area: f64) -> JetstreamResult<f64> {
        self.map(cumulative_area).map(|lat| lat.degrees)
    }

    /// Effective latitude of a cumulative area, reporting whether it was clamped
    ///
    /// # Errors
    ///
    /// Returns [`JetstreamError::AreaOverflow`] if the area is not finite or lies
    /// further outside the domain than the overflow tolerance allows.
    pub fn map(&self, cumulative_area: f64) -> JetstreamResult<EffectiveLatitude> {
        let overflow = || JetstreamError::AreaOverflow {
            area: cumulative_area,
            max_area: self.domain.max_area(),
        };
        if !cumulative_area.is_finite() {
            return Err(overflow());
        }

        let ratio = 1.0 - cumulative_area / hemisphere_area();
        let lower = self.domain.lower_ratio();

        let (ratio, clamped) = if ratio < lower {
            if lower - ratio > self.overflow_tolerance {
                return Err(overflow());
            }
            (lower, true)
        } else if ratio > 1.0 {
            if ratio - 1.0 > self.overflow_tolerance {
                return Err(overflow());
            }
            (1.0, true)
        } else {
            (ratio, false)
        };

        if clamped {
            debug!(
                "Clamped cumulative area {} km^2 into the {:?} domain",
                cumulative_area, self.domain
            );
        }

        Ok(EffectiveLatitude {
            degrees: 90.0 - ratio.acos().to_degrees(),
            clamped,
        })
    }

    /// Effective latitude of every bucket of a cumulative area curve
    pub fn map_curve(&self, curve: &AreaCurve) -> JetstreamResult<EffectiveLatitudeCurve> {
        let mut clamped = 0;
        let degrees = curve
            .cumulative()
            .iter()
            .map(|&area| {
                let lat = self.map(area)?;
                if lat.clamped {
                    clamped += 1;
                }
                Ok(lat.degrees)
            })
            .collect::<JetstreamResult<Vec<_>>>()?;

        Ok(EffectiveLatitudeCurve { degrees, clamped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pole_and_equator() {
        let mapper = EffectiveLatitudeMapper::default();
        assert_eq!(mapper.to_effective_latitude(0.0).unwrap(), 90.0);
        assert_abs_diff_eq!(
            mapper.to_effective_latitude(hemisphere_area()).unwrap(),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_cap_area_round_trip() {
        let mapper = EffectiveLatitudeMapper::default();
        for lat in [10.0_f64, 30.0, 45.0, 60.0, 85.0] {
            let cap = hemisphere_area() * (1.0 - lat.to_radians().sin());
            assert_abs_diff_eq!(
                mapper.to_effective_latitude(cap).unwrap(),
                lat,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_small_overflow_is_clamped() {
        let mapper = EffectiveLatitudeMapper::default();
        let lat = mapper.map(hemisphere_area() * (1.0 + 1e-5)).unwrap();
        assert!(lat.clamped);
        assert_abs_diff_eq!(lat.degrees, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_large_overflow_is_an_error() {
        let mapper = EffectiveLatitudeMapper::default();
        let err = mapper.map(hemisphere_area() * 1.5).unwrap_err();
        assert!(matches!(err, JetstreamError::AreaOverflow { .. }));

        assert!(mapper.map(f64::NAN).is_err());
        assert!(mapper.map(-hemisphere_area()).is_err());
    }

    #[test]
    fn test_globe_domain_reaches_south_pole() {
        let mapper = EffectiveLatitudeMapper::new(CapDomain::Globe, 0.0).unwrap();
        assert_abs_diff_eq!(
            mapper.to_effective_latitude(hemisphere_area() * 1.5).unwrap(),
            -30.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            mapper.to_effective_latitude(CapDomain::Globe.max_area()).unwrap(),
            -90.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_map_curve_is_non_increasing() {
        let mapper = EffectiveLatitudeMapper::default();
        let h = hemisphere_area();
        let curve = AreaCurve::from_bucket_areas(vec![0.1 * h, 0.0, 0.3 * h, 0.5 * h]);
        let lats = mapper.map_curve(&curve).unwrap();
        assert_eq!(lats.len(), 4);
        assert!(lats.degrees().windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(lats.degrees()[0], lats.degrees()[1]);
        assert_eq!(lats.clamped(), 0);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        assert!(EffectiveLatitudeMapper::new(CapDomain::Hemisphere, -1.0).is_err());
    }
}
