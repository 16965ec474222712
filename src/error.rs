//! Error types
//!
//! Every error here is recoverable: the UI shows it in an alert and carries on.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the playback controller and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// The decoder could not open or parse the video file
    #[error("Could not open video file '{}': {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    /// Capture was requested before any frame was decoded
    #[error("No frame to capture")]
    NoFrame,

    /// Writing the captured frame (or creating its directory) failed
    #[error("Failed to save frame to '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Speed label that is not a positive multiplier
    #[error("Invalid playback speed '{0}'")]
    InvalidSpeed(String),
}

impl Error {
    /// Title used for the alert dialog
    pub fn title(&self) -> &'static str {
        match self {
            Error::NoFrame => "Warning",
            _ => "Error",
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_titles() {
        assert_eq!(Error::NoFrame.title(), "Warning");
        assert_eq!(Error::open("a.mp4", "bad").title(), "Error");
    }

    #[test]
    fn test_open_error_message() {
        let err = Error::open("clip.mp4", "No video stream found in file");
        assert_eq!(
            err.to_string(),
            "Could not open video file 'clip.mp4': No video stream found in file"
        );
    }
}
