//! T-prime jet-stream diagnostic
//!
//! Re-exports the computational core and the data-product layer. Building with
//! the `python` feature adds the `_lib` extension module.

pub use jetstream_core;
pub use jetstream_products;

#[cfg(feature = "python")]
mod python;
