//! Concurrent lookup dispatch
//!
//! - [`controller`] - Plans, starts and awaits the requested lookups
//! - [`response`] - Outcome aggregation and error de-duplication

pub mod controller;
pub mod response;

pub use controller::{FanOutController, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_MAX_CONCURRENT_LOOKUPS};
pub use response::{AggregatedResponse, ErrorEntry, ResourceEntry, ResourceResult, ResponseBuilder};
