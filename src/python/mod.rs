//! Python extension module
//!
//! Fields cross the boundary as flat, equally sized numpy columns (one entry
//! per observation), which is what `DataFrame.to_numpy()` or a stacked xarray
//! object produce.

use jetstream_core::bucket::TemperatureRange;
use jetstream_core::config::TPrimeConfig;
use jetstream_core::executor::RayonExecutor;
use jetstream_core::field::TemperatureField;
use jetstream_core::grid::GridSpacing;
use jetstream_core::pipeline::{TPrimeCalculator, TPrimeRun};
use numpy::{PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn column<T: numpy::Element + Copy>(array: &PyReadonlyArray1<'_, T>) -> Vec<T> {
    array.as_array().iter().copied().collect()
}

/// Build the configuration from keyword arguments, or from a TOML document if one is given
fn build_config(
    bin_width: f64,
    fixed_range: Option<(f64, f64)>,
    spacing: Option<(f64, f64)>,
    config_toml: Option<&str>,
) -> PyResult<TPrimeConfig> {
    if let Some(document) = config_toml {
        return TPrimeConfig::from_toml_str(document).map_err(value_error);
    }
    let mut config = TPrimeConfig::new(
        bin_width,
        fixed_range.map(|(min, max)| TemperatureRange::new(min, max)),
    );
    if let Some((dlat, dlon)) = spacing {
        config = config.with_spacing(GridSpacing::new(dlat, dlon));
    }
    Ok(config)
}

fn run_to_dict<'py>(py: Python<'py>, run: &TPrimeRun) -> PyResult<Bound<'py, PyDict>> {
    let records: Vec<_> = run.records().collect();
    let dict = PyDict::new_bound(py);
    dict.set_item(
        "time",
        records.iter().map(|r| r.time).collect::<Vec<_>>().to_pyarray_bound(py),
    )?;
    dict.set_item(
        "lat",
        records.iter().map(|r| r.lat).collect::<Vec<_>>().to_pyarray_bound(py),
    )?;
    dict.set_item(
        "lon",
        records.iter().map(|r| r.lon).collect::<Vec<_>>().to_pyarray_bound(py),
    )?;
    dict.set_item(
        "temperature",
        records
            .iter()
            .map(|r| r.temperature)
            .collect::<Vec<_>>()
            .to_pyarray_bound(py),
    )?;
    dict.set_item(
        "t_ref",
        records.iter().map(|r| r.t_ref).collect::<Vec<_>>().to_pyarray_bound(py),
    )?;
    dict.set_item(
        "t_prime",
        records.iter().map(|r| r.t_prime).collect::<Vec<_>>().to_pyarray_bound(py),
    )?;

    let failures = PyDict::new_bound(py);
    for failure in run.failures() {
        failures.set_item(failure.time, failure.error.to_string())?;
    }
    dict.set_item("failures", failures)?;
    Ok(dict)
}

/// Compute T_ref and T' for a field given as flat columns
///
/// Returns a dict of numpy arrays (`time`, `lat`, `lon`, `temperature`,
/// `t_ref`, `t_prime`) ordered by time, plus `failures` mapping the time of
/// each step that could not be computed to its error message.
#[pyfunction]
#[pyo3(signature = (time, lat, lon, temperature, bin_width=2.0, fixed_range=None, spacing=None, config_toml=None))]
#[allow(clippy::too_many_arguments)]
fn compute_t_prime<'py>(
    py: Python<'py>,
    time: PyReadonlyArray1<'py, i64>,
    lat: PyReadonlyArray1<'py, f64>,
    lon: PyReadonlyArray1<'py, f64>,
    temperature: PyReadonlyArray1<'py, f64>,
    bin_width: f64,
    fixed_range: Option<(f64, f64)>,
    spacing: Option<(f64, f64)>,
    config_toml: Option<String>,
) -> PyResult<Bound<'py, PyDict>> {
    let config = build_config(bin_width, fixed_range, spacing, config_toml.as_deref())?;
    let field = TemperatureField::from_columns(
        &column(&time),
        &column(&lat),
        &column(&lon),
        &column(&temperature),
    )
    .map_err(value_error)?;

    let calculator = TPrimeCalculator::new(config).map_err(value_error)?;
    let run = py
        .allow_threads(|| calculator.run(&field, &RayonExecutor::global()))
        .map_err(value_error)?;
    run_to_dict(py, &run)
}

#[pymodule]
#[pyo3(name = "_lib")]
fn jetstream(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(compute_t_prime, m)?)?;
    Ok(())
}
