//! Configuration of a T-prime computation
//!
//! [`TPrimeConfig`] can be built in code or loaded from TOML. Every field has a
//! default, so a TOML document only needs the values that differ:
//!
//! ```rust
//! use jetstream_core::config::{BucketRange, TPrimeConfig};
//!
//! let config = TPrimeConfig::from_toml_str(
//!     r#"
//!     bin_width = 1.0
//!     bucket_range = "whole_series"
//!
//!     [spacing]
//!     dlat = 0.5
//!     dlon = 0.5
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.bin_width, 1.0);
//! assert_eq!(config.bucket_range, BucketRange::WholeSeries);
//! ```

use crate::bucket::{Buckets, TemperatureRange};
use crate::effective_latitude::{CapDomain, DEFAULT_OVERFLOW_TOLERANCE};
use crate::errors::{JetstreamError, JetstreamResult};
use crate::grid::GridSpacing;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default temperature bin width (degrees)
pub const DEFAULT_BIN_WIDTH: f64 = 2.0;

/// Default number of runs kept by a calculator's result cache
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// How bucket edges are chosen for each time step
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BucketRange {
    /// Edges span the minimum and maximum of each time step
    #[default]
    PerStep,
    /// Edges span the minimum and maximum of the whole field, shared by all steps
    WholeSeries,
    /// Edges span a caller-supplied range, shared by all steps
    Fixed(TemperatureRange),
}

/// Parameters of the effective-latitude / T-prime pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TPrimeConfig {
    /// Width of the temperature buckets (degrees).
    /// Default: 2.0
    pub bin_width: f64,

    /// Policy for the bucket edges.
    /// Default: per time step
    pub bucket_range: BucketRange,

    /// Grid cell widths. When unset they are inferred from the field.
    pub spacing: Option<GridSpacing>,

    /// Extent of the spherical-cap model used for effective latitudes.
    /// Default: hemisphere
    pub cap_domain: CapDomain,

    /// How far (as a fraction of a hemisphere's area) a cumulative area may
    /// leave the cap domain and still be clamped instead of failing the step.
    /// Default: 1e-3
    pub overflow_tolerance: f64,

    /// Number of computed runs a calculator keeps; the oldest is evicted first.
    /// Zero disables caching. Not part of the fingerprint.
    /// Default: 8
    pub cache_capacity: usize,
}

impl Default for TPrimeConfig {
    fn default() -> Self {
        Self {
            bin_width: DEFAULT_BIN_WIDTH,
            bucket_range: BucketRange::PerStep,
            spacing: None,
            cap_domain: CapDomain::Hemisphere,
            overflow_tolerance: DEFAULT_OVERFLOW_TOLERANCE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl TPrimeConfig {
    /// Configuration with a bin width and an optional fixed bucket range
    pub fn new(bin_width: f64, fixed_range: Option<TemperatureRange>) -> Self {
        Self {
            bin_width,
            bucket_range: fixed_range.map_or(BucketRange::PerStep, BucketRange::Fixed),
            ..Self::default()
        }
    }

    pub fn with_spacing(mut self, spacing: GridSpacing) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn with_bucket_range(mut self, bucket_range: BucketRange) -> Self {
        self.bucket_range = bucket_range;
        self
    }

    pub fn with_cap_domain(mut self, cap_domain: CapDomain) -> Self {
        self.cap_domain = cap_domain;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn from_toml_str(s: &str) -> JetstreamResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all parameters are usable
    pub fn validate(&self) -> JetstreamResult<()> {
        if !self.bin_width.is_finite() || self.bin_width <= 0.0 {
            return Err(JetstreamError::InvalidConfig(format!(
                "bin width must be finite and positive, got {}",
                self.bin_width
            )));
        }
        if let BucketRange::Fixed(range) = &self.bucket_range {
            range.validate()?;
            Buckets::count(*range, self.bin_width)
                .map_err(|e| JetstreamError::InvalidConfig(e.to_string()))?;
        }
        if let Some(spacing) = &self.spacing {
            spacing.validate()?;
        }
        if !self.overflow_tolerance.is_finite() || self.overflow_tolerance < 0.0 {
            return Err(JetstreamError::InvalidConfig(format!(
                "overflow tolerance must be finite and non-negative, got {}",
                self.overflow_tolerance
            )));
        }
        Ok(())
    }

    /// Identity of the parameter values, used as part of cache keys
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.bin_width.to_bits().hash(&mut hasher);
        match self.bucket_range {
            BucketRange::PerStep => 0u8.hash(&mut hasher),
            BucketRange::WholeSeries => 1u8.hash(&mut hasher),
            BucketRange::Fixed(range) => {
                2u8.hash(&mut hasher);
                range.min.to_bits().hash(&mut hasher);
                range.max.to_bits().hash(&mut hasher);
            }
        }
        match self.spacing {
            Some(spacing) => {
                spacing.dlat.to_bits().hash(&mut hasher);
                spacing.dlon.to_bits().hash(&mut hasher);
            }
            None => u64::MAX.hash(&mut hasher),
        }
        self.cap_domain.hash(&mut hasher);
        self.overflow_tolerance.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}
