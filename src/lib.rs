//! Measles and rubella case reporting.
//!
//! A CSV table is normalized ([`normalize`]), reshaped into long records
//! ([`reshape`]) and held as an immutable [`Dataset`]. Views are built by
//! filtering ([`filter`]) and aggregating ([`aggregate`]) through the named
//! queries in [`query`].

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod query;
pub mod reports;
pub mod reshape;
pub mod types;
pub mod util;

pub use dataset::Dataset;
pub use error::{PipelineError, Result};
pub use filter::FilterSpec;
