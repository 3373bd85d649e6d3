//! One file describing a complete T' run
//!
//! ```toml
//! product = "climate_model"
//! rescale_longitudes = true
//!
//! [subset]
//! time = { start = 0, end = 90 }
//! lat = { min = 20.0 }
//!
//! [tprime]
//! bin_width = 1.0
//! bucket_range = "whole_series"
//! ```
//!
//! Every section is optional and falls back to its defaults.

use crate::errors::{ProductError, ProductResult};
use crate::products::ProductKind;
use crate::subset::{rescale_longitudes, SubsetSpec};
use jetstream_core::config::TPrimeConfig;
use jetstream_core::field::TemperatureField;
use jetstream_core::pipeline::TPrimeCalculator;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Kind of data product the field comes from.
    /// Default: reanalysis
    pub product: ProductKind,

    /// Map longitudes from [0, 360) onto [-180, 180) before cutting.
    /// Default: false
    pub rescale_longitudes: bool,

    pub subset: SubsetSpec,

    pub tprime: TPrimeConfig,
}

impl RunConfig {
    pub fn from_toml_str(s: &str) -> ProductResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProductResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ProductError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded run configuration from {:?}", path);
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> ProductResult<()> {
        self.subset.validate()?;
        self.tprime.validate()?;
        Ok(())
    }

    /// Apply the longitude convention and the subset to a field
    pub fn prepare(&self, field: &TemperatureField) -> ProductResult<TemperatureField> {
        let product = self.product.product();
        if self.rescale_longitudes {
            product.cut(&rescale_longitudes(field)?, &self.subset)
        } else {
            product.cut(field, &self.subset)
        }
    }

    pub fn calculator(&self) -> ProductResult<TPrimeCalculator> {
        Ok(TPrimeCalculator::new(self.tprime.clone())?)
    }
}
