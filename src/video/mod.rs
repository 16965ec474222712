//! Video module
//!
//! Frame-accurate access to a video file. The controller only talks to the
//! [`FrameSource`] trait; [`FfmpegDecoder`] is the implementation used by the
//! application.
//!
//! # Usage
//!
//! ```rust,ignore
//! use video::{FfmpegDecoder, FrameSource};
//!
//! let mut decoder = FfmpegDecoder::open(Path::new("clip.mp4"))?;
//! decoder.set_position(42);
//! if let Some(frame) = decoder.read_next_frame() {
//!     // frame 42
//! }
//! ```

mod decoder;

use std::path::Path;

use image::RgbImage;

use crate::error::Result;

pub use decoder::FfmpegDecoder;

/// Sequential frame reader with absolute positioning
///
/// Reading is forward-only: `read_next_frame` returns the frame at
/// `position()` and advances it by one. Dropping the source releases the
/// underlying handle.
pub trait FrameSource: Sized {
    /// Open a video file
    fn open(path: &Path) -> Result<Self>;

    /// Decode the frame at the current position, `None` at end of stream
    fn read_next_frame(&mut self) -> Option<RgbImage>;

    /// Index of the frame the next read will return
    fn position(&self) -> u64;

    /// Move the read position to an absolute frame index
    fn set_position(&mut self, frame: u64);

    /// Total number of frames (may be an estimate)
    fn total_frames(&self) -> u64;

    /// Nominal frame rate, 0.0 when unknown
    fn fps(&self) -> f64;
}
