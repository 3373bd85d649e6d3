use super::{cut_with, DataProduct};
use crate::errors::ProductResult;
use crate::subset::SubsetSpec;
use jetstream_core::field::TemperatureField;

/// Reanalysis output such as ERA5 2 m temperature
///
/// Lower coordinate limits are exclusive: a latitude limit of 20 keeps cells
/// strictly north of 20 degrees.
#[derive(Copy, Clone, Debug, Default)]
pub struct Reanalysis;

impl DataProduct for Reanalysis {
    fn name(&self) -> &'static str {
        "reanalysis"
    }

    fn temperature_variable(&self) -> &'static str {
        "t2m"
    }

    fn cut(
        &self,
        field: &TemperatureField,
        subset: &SubsetSpec,
    ) -> ProductResult<TemperatureField> {
        cut_with(self, field, subset, true)
    }
}
