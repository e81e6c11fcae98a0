//! Scripted credential lifecycle engine.
//!
//! Renders user-supplied shell statements with generated usernames,
//! passwords and root configuration values, then runs them to create,
//! rotate, and delete credentials on an external system.
//!
//! ## Modules
//! - `cli` — Command-line handlers
//! - `core` — Engine (parameters, templates, execution, lifecycle, redaction)
//! - `models` — Data structures
//! - `util` — Secret intake helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod util;

pub use crate::core::database::{new, Database, Sanitized};
pub use crate::core::lifecycle::ScriptedDatabase;
pub use crate::error::{Error, Result};
