use super::{cut_with, DataProduct};
use crate::errors::ProductResult;
use crate::subset::SubsetSpec;
use jetstream_core::field::TemperatureField;

/// General circulation model output (CMIP near-surface air temperature)
///
/// Coordinate limits are inclusive at both ends.
#[derive(Copy, Clone, Debug, Default)]
pub struct ClimateModel;

impl DataProduct for ClimateModel {
    fn name(&self) -> &'static str {
        "climate_model"
    }

    fn temperature_variable(&self) -> &'static str {
        "tas"
    }

    fn cut(
        &self,
        field: &TemperatureField,
        subset: &SubsetSpec,
    ) -> ProductResult<TemperatureField> {
        cut_with(self, field, subset, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subset::CoordinateBounds;
    use jetstream_core::field::Observation;

    #[test]
    fn test_limits_are_inclusive() {
        let field = TemperatureField::from_observations(
            [10.0, 20.0, 30.0, 40.0].map(|lat| Observation::new(0, lat, 0.0, 290.0 - lat)),
        )
        .unwrap();
        let subset = SubsetSpec::default().with_lat(CoordinateBounds::between(20.0, 30.0));
        let cut = ClimateModel.cut(&field, &subset).unwrap();
        assert_eq!(
            cut.observations().map(|o| o.lat).collect::<Vec<_>>(),
            vec![20.0, 30.0]
        );
    }
}
