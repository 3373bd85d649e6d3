//! Effective-latitude temperature anomalies for diagnosing the jet stream
//!
//! Temperatures on a latitude/longitude grid are sorted into buckets, the
//! area of the cells in each bucket is accumulated from the coldest bucket up
//! and converted into the latitude of a polar cap with the same area. The
//! resulting curve of bucket temperature against effective latitude gives a
//! zonally symmetric reference temperature `T_ref` for each true latitude,
//! and `T' = T - T_ref` marks where the observed field departs from it.
//!
//! ```rust
//! use jetstream_core::field::{Observation, TemperatureField};
//! use jetstream_core::pipeline::compute_t_prime;
//!
//! let observations = [(60.0, 255.0), (40.0, 265.0), (20.0, 280.0)]
//!     .iter()
//!     .flat_map(|&(lat, t)| {
//!         [0.0, 180.0]
//!             .into_iter()
//!             .map(move |lon| Observation::new(0, lat, lon, t))
//!     });
//! let field = TemperatureField::from_observations(observations).unwrap();
//!
//! let records = compute_t_prime(&field, 5.0, None).unwrap();
//! assert_eq!(records.len(), 6);
//! ```

pub mod accumulate;
pub mod bucket;
pub mod cache;
pub mod config;
pub mod effective_latitude;
pub mod executor;
pub mod field;
pub mod grid;
pub mod interpolate;
pub mod pipeline;

pub mod errors;
