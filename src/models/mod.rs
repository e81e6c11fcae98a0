//! Data structures shared between the engine and its callers.

pub mod config;
pub mod params;
pub mod request;
