//! End-to-end behaviour of the T' pipeline on synthetic fields.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use jetstream_core::bucket::TemperatureRange;
use jetstream_core::config::TPrimeConfig;
use jetstream_core::effective_latitude::CapDomain;
use jetstream_core::errors::JetstreamError;
use jetstream_core::executor::{RayonExecutor, SequentialExecutor};
use jetstream_core::field::{Observation, TemperatureField, Time};
use jetstream_core::grid::GridAreaModel;
use jetstream_core::pipeline::{compute_t_prime, StepDiagnostic, TPrimeCalculator};

/// Two longitudes at 80/60/40/20 degrees north, warming towards the equator
fn four_latitude_field() -> TemperatureField {
    let mut obs = vec![];
    for (lat, t) in [(80.0, 250.0), (60.0, 260.0), (40.0, 270.0), (20.0, 280.0)] {
        for lon in [0.0, 180.0] {
            obs.push(Observation::new(0, lat, lon, t));
        }
    }
    TemperatureField::from_observations(obs).unwrap()
}

/// One-degree grid where temperature falls linearly with latitude
fn zonal_field(
    time: Time,
    lats: impl Iterator<Item = f64>,
    t: impl Fn(f64) -> f64,
) -> Vec<Observation> {
    let mut obs = vec![];
    for lat in lats {
        for lon in 0..360 {
            obs.push(Observation::new(time, lat, lon as f64, t(lat)));
        }
    }
    obs
}

fn northern_rows() -> impl Iterator<Item = f64> {
    (0..90).map(|i| i as f64 + 0.5)
}

mod four_latitudes {
    use super::*;

    #[test]
    fn test_bucket_curves() {
        let calculator = TPrimeCalculator::new(TPrimeConfig::new(5.0, None)).unwrap();
        let run = calculator
            .run(&four_latitude_field(), &SequentialExecutor)
            .unwrap();
        assert!(run.is_complete());

        let curves = &run.steps()[0].curves;
        assert_eq!(
            curves.bucket_labels,
            vec![250.0, 255.0, 260.0, 265.0, 270.0, 275.0, 280.0]
        );

        let model = GridAreaModel::new(run.spacing());
        let expected = [
            2.0 * model.area(80.0),
            0.0,
            2.0 * model.area(60.0),
            0.0,
            2.0 * model.area(40.0),
            0.0,
            2.0 * model.area(20.0),
        ];
        for (area, expected) in curves.bucket_areas.iter().zip(expected) {
            assert_relative_eq!(*area, expected, max_relative = 1e-12);
        }

        // Empty buckets keep the cumulative area (and effective latitude) flat
        assert!(curves.cumulative_areas.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(curves.effective_latitudes[0], curves.effective_latitudes[1]);
        assert!(curves.effective_latitudes.windows(2).all(|w| w[1] <= w[0]));
        assert_relative_eq!(
            *curves.cumulative_areas.last().unwrap(),
            expected.iter().sum::<f64>(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_reference_temperature_near_observed() {
        let records = compute_t_prime(&four_latitude_field(), 5.0, None).unwrap();

        let at = |lat: f64| records.iter().find(|r| r.lat == lat).unwrap();
        // A finite cell spreads its bucket over a band of effective latitude,
        // so T_ref sits below the observed value. Effective latitudes of the
        // 250/255/.../275 edges are about 69.95, 49.89 and 29.83.
        assert_abs_diff_eq!(at(60.0).t_ref, 257.480, epsilon = 1e-2);
        assert_abs_diff_eq!(at(40.0).t_ref, 267.466, epsilon = 1e-2);
        assert!(at(60.0).t_ref < 260.0 && at(40.0).t_ref < 270.0);

        for r in &records {
            assert!(r.t_prime.abs() <= 5.0, "{:?}", r);
        }
    }

    #[test]
    fn test_latitude_beyond_curve_takes_edge_value() {
        let records = compute_t_prime(&four_latitude_field(), 5.0, None).unwrap();
        // 80N lies poleward of every effective latitude
        let polar = records.iter().find(|r| r.lat == 80.0).unwrap();
        assert_eq!(polar.t_ref, 250.0);
        assert_eq!(polar.t_prime, 0.0);
    }
}

#[test]
fn test_single_temperature_gives_zero_anomaly() {
    let obs = zonal_field(3, (0..10).map(|i| i as f64 * 5.0 + 2.5), |_| 263.7);
    let field = TemperatureField::from_observations(obs).unwrap();
    let calculator = TPrimeCalculator::new(TPrimeConfig::new(2.0, None)).unwrap();
    let run = calculator.run(&field, &SequentialExecutor).unwrap();

    let step = run.step(3).unwrap();
    assert_eq!(step.curves.bucket_labels, vec![263.7]);
    assert_eq!(step.diagnostics, vec![StepDiagnostic::DegenerateTimeStep]);
    for r in run.records() {
        assert_eq!(r.t_ref, 263.7);
        assert_eq!(r.t_prime, 0.0);
    }
}

#[test]
fn test_dense_hemisphere_anomaly_bounded_by_bin_width() {
    let bin_width = 2.0;
    let obs = zonal_field(0, northern_rows(), |lat| 300.0 - 0.5 * lat);
    let field = TemperatureField::from_observations(obs).unwrap();
    let calculator = TPrimeCalculator::new(TPrimeConfig::new(bin_width, None)).unwrap();
    let run = calculator.run(&field, &SequentialExecutor).unwrap();
    assert!(run.is_complete());

    let step = &run.steps()[0];
    // The full hemisphere slightly exceeds the analytic cap area
    assert!(step
        .diagnostics
        .iter()
        .any(|d| matches!(d, StepDiagnostic::AreaClamped { .. })));
    let equator = *step.curves.effective_latitudes.last().unwrap();
    assert_abs_diff_eq!(equator, 0.0, epsilon = 1e-9);

    for r in run.records() {
        assert!(r.t_prime >= -1e-6, "{:?}", r);
        assert!(r.t_prime <= bin_width + 1e-2, "{:?}", r);
    }
}

#[test]
fn test_globe_domain_reaches_south_pole() {
    let bin_width = 2.0;
    let rows = (0..180).map(|i| i as f64 - 89.5);
    let obs = zonal_field(0, rows, |lat| 270.0 - 0.3 * lat);
    let field = TemperatureField::from_observations(obs).unwrap();
    let config = TPrimeConfig::new(bin_width, None).with_cap_domain(CapDomain::Globe);
    let run = TPrimeCalculator::new(config)
        .unwrap()
        .run(&field, &SequentialExecutor)
        .unwrap();
    assert!(run.is_complete());

    let eff = &run.steps()[0].curves.effective_latitudes;
    assert_abs_diff_eq!(*eff.last().unwrap(), -90.0, epsilon = 1e-9);
    for r in run.records() {
        assert!(r.t_prime >= -1e-6 && r.t_prime < 2.0 * bin_width, "{:?}", r);
    }
}

#[test]
fn test_hemisphere_domain_rejects_whole_globe() {
    let rows = (0..180).map(|i| i as f64 - 89.5);
    let obs = zonal_field(0, rows, |lat| 270.0 - 0.3 * lat);
    let field = TemperatureField::from_observations(obs).unwrap();
    let run = TPrimeCalculator::new(TPrimeConfig::new(2.0, None))
        .unwrap()
        .run(&field, &SequentialExecutor)
        .unwrap();

    assert!(run.steps().is_empty());
    assert!(matches!(
        run.failures()[0].error,
        JetstreamError::AreaOverflow { .. }
    ));
}

mod runs {
    use super::*;

    fn multi_step_field() -> TemperatureField {
        let mut obs = vec![];
        for time in 0..6 {
            let rows = (0..18).map(|i| i as f64 * 5.0 + 2.5);
            let shift = time as f64;
            obs.extend(zonal_field(time, rows, move |lat| {
                290.0 - 0.6 * lat + (lat * 0.1 + shift).sin()
            }));
        }
        TemperatureField::from_observations(obs).unwrap()
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let field = multi_step_field();
        let calculator = TPrimeCalculator::new(TPrimeConfig::new(1.0, None)).unwrap();
        let first = calculator.run(&field, &SequentialExecutor).unwrap();
        let second = calculator.run(&field, &SequentialExecutor).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_executors_agree() {
        let field = multi_step_field();
        let calculator = TPrimeCalculator::new(TPrimeConfig::new(1.0, None)).unwrap();
        let sequential = calculator.run(&field, &SequentialExecutor).unwrap();
        let parallel = calculator.run(&field, &RayonExecutor::global()).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(
            parallel.steps().iter().map(|s| s.time).collect::<Vec<_>>(),
            field.times()
        );
    }

    #[test]
    fn test_failed_step_does_not_stop_run() {
        let mut obs = multi_step_field().observations().collect::<Vec<_>>();
        let corrupt = obs.iter().position(|o| o.time == 2).unwrap();
        obs[corrupt].temperature = f64::NAN;
        let field = TemperatureField::from_observations(obs).unwrap();

        let run = TPrimeCalculator::new(TPrimeConfig::new(1.0, None))
            .unwrap()
            .run(&field, &SequentialExecutor)
            .unwrap();
        assert!(!run.is_complete());
        assert_eq!(run.steps().len(), 5);
        assert!(run.step(2).is_none());
        assert_eq!(run.failures().len(), 1);
        assert_eq!(run.failures()[0].time, 2);
        match &run.failures()[0].error {
            JetstreamError::NonFiniteTemperature { time, lat, lon, .. } => {
                assert_eq!(*time, 2);
                assert!(lat.is_finite() && lon.is_finite());
                assert_eq!((*lat, *lon), non_finite_cell(&field, 2));
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(run.into_result().is_err());
    }

    /// Coordinates of the non-finite cell of a step
    fn non_finite_cell(field: &TemperatureField, time: Time) -> (f64, f64) {
        let o = field
            .observations()
            .find(|o| o.time == time && !o.temperature.is_finite())
            .unwrap();
        (o.lat, o.lon)
    }

    #[test]
    fn test_fill_value_fails_only_its_step() {
        let mut obs = multi_step_field().observations().collect::<Vec<_>>();
        // NetCDF's default fill value in one cell near 60N
        let corrupt = obs
            .iter()
            .position(|o| o.time == 1 && o.lat == 62.5)
            .unwrap();
        obs[corrupt].temperature = 9.96921e36;
        let field = TemperatureField::from_observations(obs).unwrap();

        let run = TPrimeCalculator::new(TPrimeConfig::new(2.0, None))
            .unwrap()
            .run(&field, &SequentialExecutor)
            .unwrap();
        assert_eq!(
            run.steps().iter().map(|s| s.time).collect::<Vec<_>>(),
            vec![0, 2, 3, 4, 5]
        );
        assert_eq!(run.failures().len(), 1);
        assert_eq!(run.failures()[0].time, 1);
        assert!(matches!(
            run.failures()[0].error,
            JetstreamError::TooManyBuckets { .. }
        ));
    }

    #[test]
    fn test_fixed_range_violation_is_step_failure() {
        let field = multi_step_field();
        let range = TemperatureRange::new(250.0, 285.0);
        let run = TPrimeCalculator::new(TPrimeConfig::new(1.0, Some(range)))
            .unwrap()
            .run(&field, &SequentialExecutor)
            .unwrap();
        // Every step has equatorial values near 290
        assert!(run.steps().is_empty());
        assert!(run
            .failures()
            .iter()
            .all(|f| matches!(f.error, JetstreamError::TemperatureOutOfRange { .. })));
    }

    #[test]
    fn test_results_are_cached_per_field_and_config() {
        let field = multi_step_field();
        let mut calculator = TPrimeCalculator::new(TPrimeConfig::new(1.0, None)).unwrap();

        let a = calculator.compute(&field, &SequentialExecutor).unwrap();
        let b = calculator.compute(&field, &RayonExecutor::global()).unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
        assert_eq!(calculator.cached_runs(), 1);

        let other = four_latitude_field();
        calculator.compute(&other, &SequentialExecutor).unwrap();
        assert_eq!(calculator.cached_runs(), 2);

        calculator.set_config(TPrimeConfig::new(2.0, None)).unwrap();
        assert_eq!(calculator.cached_runs(), 0);
        let c = calculator.compute(&field, &SequentialExecutor).unwrap();
        assert!(!std::sync::Arc::ptr_eq(&a, &c));
        assert_ne!(a.steps()[0].curves, c.steps()[0].curves);
    }

    #[test]
    fn test_cache_keeps_most_recent_runs() {
        let config = TPrimeConfig::new(5.0, None).with_cache_capacity(2);
        let calculator = TPrimeCalculator::new(config).unwrap();

        // Same grid with a different temperature offset per field
        let fields: Vec<TemperatureField> = (0..4)
            .map(|offset| {
                let base = four_latitude_field();
                let obs = base.observations().map(|mut o| {
                    o.temperature += offset as f64;
                    o
                });
                TemperatureField::from_observations(obs).unwrap()
            })
            .collect();

        let first = calculator.compute(&fields[0], &SequentialExecutor).unwrap();
        for field in &fields[1..] {
            calculator.compute(field, &SequentialExecutor).unwrap();
            assert!(calculator.cached_runs() <= 2);
        }
        assert_eq!(calculator.cached_runs(), 2);

        let again = calculator.compute(&fields[0], &SequentialExecutor).unwrap();
        assert!(!std::sync::Arc::ptr_eq(&first, &again));
        assert_eq!(first, again);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let config = TPrimeConfig::new(1.0, None).with_cache_capacity(0);
        let calculator = TPrimeCalculator::new(config).unwrap();
        calculator.compute(&multi_step_field(), &SequentialExecutor).unwrap();
        assert_eq!(calculator.cached_runs(), 0);
    }
}
