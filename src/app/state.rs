//! Playback state
//!
//! Play/pause state machine and playback speed handling.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Delay between frames when the video reports no frame rate
pub const FALLBACK_FRAME_DELAY: Duration = Duration::from_millis(30);

/// Speed multipliers offered in the UI
pub const SPEED_PRESETS: [f64; 10] = [0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0, 8.0];

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// No video loaded
    NoVideo,
    /// Video loaded, cursor still
    Paused,
    /// Timer-driven playback
    Playing,
}

impl PlayState {
    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayState::NoVideo => "No Video",
            PlayState::Paused => "Paused",
            PlayState::Playing => "Playing",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayState::Playing)
    }
}

/// Playback speed multiplier, always positive and finite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speed(f64);

impl Speed {
    pub const NORMAL: Speed = Speed(1.0);

    pub fn new(multiplier: f64) -> Result<Self> {
        if multiplier.is_finite() && multiplier > 0.0 {
            Ok(Speed(multiplier))
        } else {
            Err(Error::InvalidSpeed(multiplier.to_string()))
        }
    }

    /// Parse a UI label such as `"2.0x"` (the trailing `x` is optional)
    pub fn parse(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        let number = trimmed.strip_suffix(['x', 'X']).unwrap_or(trimmed);
        number
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidSpeed(label.to_string()))
            .and_then(|m| Speed::new(m).map_err(|_| Error::InvalidSpeed(label.to_string())))
    }

    pub fn multiplier(&self) -> f64 {
        self.0
    }

    /// Delay between playback frames: `(1000 / fps) / speed` whole milliseconds
    pub fn frame_delay(&self, fps: f64) -> Duration {
        if fps > 0.0 {
            Duration::from_millis(((1000.0 / fps) / self.0) as u64)
        } else {
            FALLBACK_FRAME_DELAY
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 2 -> "2.0x", 0.25 -> "0.25x"
        if self.0.fract() == 0.0 {
            write!(f, "{:.1}x", self.0)
        } else {
            write!(f, "{}x", self.0)
        }
    }
}
