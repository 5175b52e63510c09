pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod remote;
pub mod sync;

pub use error::{DemandError, Result};
