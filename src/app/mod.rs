//! Application module
//!
//! Contains the main egui application, the playback controller and its state.

mod capturer_app;
pub mod controller;
pub mod state;

pub use capturer_app::CapturerApp;
pub use controller::{PlaybackController, TickOutcome};
pub use state::*;
