//! Utility modules for secret intake.

pub mod secret;
