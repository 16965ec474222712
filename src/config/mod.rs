//! Configuration module
//!
//! Contains the user settings for output location and capture format.

mod settings;

pub use settings::*;
