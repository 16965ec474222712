//! Render module
//!
//! Scales decoded frames into the display area.

mod frame_view;

pub use frame_view::{fit_rect, FrameView};
