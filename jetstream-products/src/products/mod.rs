//! Kinds of temperature data product
//!
//! Reanalyses and climate models name their temperature variable differently
//! and are conventionally cut in slightly different ways. Both implement
//! [`DataProduct`]; [`ProductKind`] selects one from configuration.

mod climate_model;
mod reanalysis;

pub use climate_model::ClimateModel;
pub use reanalysis::Reanalysis;

use crate::errors::{ProductError, ProductResult};
use crate::subset::SubsetSpec;
use jetstream_core::field::TemperatureField;
use log::info;
use serde::{Deserialize, Serialize};

/// A source of gridded surface temperature
pub trait DataProduct: Send + Sync {
    /// Short name used in log messages and errors
    fn name(&self) -> &'static str;

    /// Name of the surface temperature variable in the product's files
    fn temperature_variable(&self) -> &'static str;

    /// Keep only the observations selected by `subset`
    ///
    /// # Errors
    ///
    /// Fails if the subset is invalid or selects nothing.
    fn cut(
        &self,
        field: &TemperatureField,
        subset: &SubsetSpec,
    ) -> ProductResult<TemperatureField>;
}

/// Shared implementation of [`DataProduct::cut`]
fn cut_with(
    product: &dyn DataProduct,
    field: &TemperatureField,
    subset: &SubsetSpec,
    strict_min: bool,
) -> ProductResult<TemperatureField> {
    subset.validate()?;
    let kept = TemperatureField::from_observations(
        field
            .observations()
            .filter(|obs| subset.admits(obs, strict_min)),
    )?;

    if kept.is_empty() {
        return Err(ProductError::EmptySubset {
            product: product.name(),
        });
    }
    info!(
        "Cut {} {} data from {} to {} observations",
        product.name(),
        product.temperature_variable(),
        field.n_observations(),
        kept.n_observations()
    );
    Ok(kept)
}

/// Which kind of product a field comes from
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[default]
    Reanalysis,
    ClimateModel,
}

impl ProductKind {
    pub fn product(&self) -> &'static dyn DataProduct {
        match self {
            ProductKind::Reanalysis => &Reanalysis,
            ProductKind::ClimateModel => &ClimateModel,
        }
    }
}
