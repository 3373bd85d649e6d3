//! Grid geometry: cell spacing and the surface area of latitude/longitude cells
//!
//! Each cell of a regular latitude/longitude mesh is approximated as a patch of
//! a sphere of radius [`R_EARTH`]:
//!
//! $$ A(\phi) = R^2 \cos(\phi) \, \Delta\phi \, \Delta\lambda $$
//!
//! where $\Delta\phi$ and $\Delta\lambda$ are the cell widths in radians.
//!
//! # Examples
//!
//! ```rust
//! use jetstream_core::grid::{GridAreaModel, GridSpacing};
//!
//! let model = GridAreaModel::new(GridSpacing::default());
//! let equator = model.area(0.0);
//! let pole_ward = model.area(60.0);
//! assert!((pole_ward / equator - 0.5).abs() < 1e-12);
//! ```

use crate::errors::{JetstreamError, JetstreamResult};
use is_close::is_close;
use log::warn;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Mean radius of the Earth (km)
pub const R_EARTH: f64 = 6367.47;

/// Grid resolution used when nothing else is known (degrees)
pub const DEFAULT_GRID_SIZE: f64 = 0.25;

/// Cell widths of a regular latitude/longitude grid (degrees)
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GridSpacing {
    /// Latitude cell width (degrees)
    pub dlat: f64,
    /// Longitude cell width (degrees)
    pub dlon: f64,
}

impl Default for GridSpacing {
    fn default() -> Self {
        Self {
            dlat: DEFAULT_GRID_SIZE,
            dlon: DEFAULT_GRID_SIZE,
        }
    }
}

impl GridSpacing {
    pub fn new(dlat: f64, dlon: f64) -> Self {
        Self { dlat, dlon }
    }

    /// Check that both widths are finite and strictly positive
    pub fn validate(&self) -> JetstreamResult<()> {
        for (name, value) in [("dlat", self.dlat), ("dlon", self.dlon)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(JetstreamError::InvalidConfig(format!(
                    "grid spacing {} must be finite and positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Infer the spacing from the coordinates present in a grid
    ///
    /// Each axis uses the unique difference between sorted unique coordinates.
    /// If the axis is not uniformly spaced the mean difference is used and a
    /// warning is logged. An axis with a single coordinate falls back to
    /// [`DEFAULT_GRID_SIZE`].
    pub fn infer(lats: &[f64], lons: &[f64]) -> Self {
        Self {
            dlat: axis_spacing("lat", lats),
            dlon: axis_spacing("lon", lons),
        }
    }

    /// Latitude width in radians
    pub fn dlat_rad(&self) -> f64 {
        self.dlat.to_radians()
    }

    /// Longitude width in radians
    pub fn dlon_rad(&self) -> f64 {
        self.dlon.to_radians()
    }
}

fn axis_spacing(axis: &str, coords: &[f64]) -> f64 {
    let mut unique: Vec<f64> = coords.to_vec();
    unique.sort_by(f64::total_cmp);
    unique.dedup();

    if unique.len() < 2 {
        warn!(
            "Cannot infer {} spacing from {} coordinate(s), using {} degrees",
            axis,
            unique.len(),
            DEFAULT_GRID_SIZE
        );
        return DEFAULT_GRID_SIZE;
    }

    let diffs: Vec<f64> = unique.windows(2).map(|w| w[1] - w[0]).collect();
    let first = diffs[0];
    if diffs.iter().all(|d| is_close!(*d, first)) {
        return first;
    }

    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    warn!(
        "{} coordinates are not uniformly spaced, approximating the cell width with the mean spacing {}",
        axis, mean
    );
    mean
}

/// Surface area of grid cells as a function of latitude
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GridAreaModel {
    spacing: GridSpacing,
}

impl GridAreaModel {
    pub fn new(spacing: GridSpacing) -> Self {
        Self { spacing }
    }

    pub fn spacing(&self) -> GridSpacing {
        self.spacing
    }

    /// Area of a single cell centred on `latitude` (km^2)
    ///
    /// Latitudes outside [-90, 90] are not checked here; grids are validated
    /// before any area is computed.
    pub fn area(&self, latitude: f64) -> f64 {
        R_EARTH.powi(2)
            * latitude.to_radians().cos()
            * self.spacing.dlat_rad()
            * self.spacing.dlon_rad()
    }

    /// Area of every cell in an array of latitudes (km^2)
    pub fn areas(&self, latitudes: ArrayView1<f64>) -> Array1<f64> {
        latitudes.mapv(|lat| self.area(lat))
    }
}
