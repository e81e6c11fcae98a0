//! Core engine modules.

pub mod database;
pub mod executor;
pub mod lifecycle;
pub mod params;
pub mod redact;
pub mod settings;
pub mod template;
pub mod username;
