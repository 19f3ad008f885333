//! Settings service for provisioning CI build agents on Google Compute Engine.
//!
//! The settings page asks for several provider lookups at once (zones,
//! networks, machine types, ...). [`dispatch::FanOutController`] runs them
//! concurrently and returns one aggregated response.

pub mod config;
pub mod dispatch;
pub mod gcp;
pub mod image;
pub mod resource;
pub mod server;
