//! Data products feeding the T' pipeline
//!
//! Temperature fields arrive from different kinds of data product. Each
//! [`DataProduct`](products::DataProduct) knows how to cut a field down to
//! the region and period of interest, and [`RunConfig`](run_config::RunConfig)
//! ties a product, a subset and the pipeline configuration together in one
//! TOML file.

pub mod errors;
pub mod products;
pub mod run_config;
pub mod subset;
