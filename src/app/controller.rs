//! Playback controller
//!
//! Owns the open video session and implements load, step, seek, play and
//! capture. Playback is cooperative: the UI loop calls [`PlaybackController::tick`]
//! every update and the controller only decodes once the scheduled instant
//! has passed, so nothing here blocks longer than a single decode.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info};

use crate::capture;
use crate::config::ImageFormat;
use crate::error::{Error, Result};
use crate::video::FrameSource;

use super::state::{PlayState, Speed};

/// Live state for one open video file
pub struct Session<S: FrameSource> {
    source: S,
    path: PathBuf,
    total_frames: u64,
    fps: f64,
    /// Index of the frame currently displayed
    cursor: u64,
    frame: Option<RgbImage>,
}

impl<S: FrameSource> Session<S> {
    fn new(path: PathBuf, source: S) -> Self {
        Self {
            total_frames: source.total_frames(),
            fps: source.fps(),
            source,
            path,
            cursor: 0,
            frame: None,
        }
    }

    /// Decode the frame at the decoder's read position and make it current
    fn show_next(&mut self) -> bool {
        match self.source.read_next_frame() {
            Some(frame) => {
                self.cursor = self.source.position().saturating_sub(1);
                self.frame = Some(frame);
                true
            }
            None => false,
        }
    }

    fn has_frame_after(&self, index: u64) -> bool {
        // Unknown length: let the decoder decide
        self.total_frames == 0 || index + 1 < self.total_frames
    }

    /// File name without extension, used to name captures
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

/// Result of one playback tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing
    Idle,
    /// Next frame not due yet
    Waiting(Instant),
    /// A frame was rendered; the next one is due at the given instant
    Rendered(Instant),
    /// Decoding failed; playback stopped and rewound to frame 0
    EndOfStream,
}

/// Playback controller
pub struct PlaybackController<S: FrameSource> {
    session: Option<Session<S>>,
    state: PlayState,
    speed: Speed,
    next_tick: Option<Instant>,
    /// Bumped whenever a new frame is rendered
    generation: u64,
}

impl<S: FrameSource> Default for PlaybackController<S> {
    fn default() -> Self {
        Self::new(Speed::NORMAL)
    }
}

impl<S: FrameSource> PlaybackController<S> {
    pub fn new(speed: Speed) -> Self {
        Self {
            session: None,
            state: PlayState::NoVideo,
            speed,
            next_tick: None,
            generation: 0,
        }
    }

    /// Open a video and display its first frame
    ///
    /// On failure the current session, if any, is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let source = S::open(path)?;
        let mut session = Session::new(path.to_path_buf(), source);

        if !session.show_next() {
            debug!("No decodable first frame in {}", path.display());
        }

        info!(
            "Loaded {}: {} frames @ {:.2}fps",
            path.display(),
            session.total_frames,
            session.fps
        );

        // Replacing the session drops the previous decoder
        self.session = Some(session);
        self.state = PlayState::Paused;
        self.next_tick = None;
        self.generation += 1;
        Ok(())
    }

    /// Advance one frame; no-op on the last frame
    pub fn step_forward(&mut self) -> bool {
        self.pause();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.has_frame_after(session.cursor) {
            return false;
        }
        let next = session.cursor + 1;
        session.source.set_position(next);
        self.render_next()
    }

    /// Go back one frame; no-op on frame 0
    ///
    /// Decoding only runs forward, so the read position (one past the cursor)
    /// is moved back two frames and the frame there is decoded, which leaves
    /// the cursor one frame earlier.
    pub fn step_backward(&mut self) -> bool {
        self.pause();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.cursor < 1 {
            return false;
        }
        let read_position = session.cursor + 1;
        session.source.set_position(read_position - 2);
        self.render_next()
    }

    /// Start or stop playback; the first frame is due immediately
    pub fn toggle_play(&mut self, now: Instant) {
        if self.session.is_none() {
            return;
        }
        if self.state.is_playing() {
            self.pause();
        } else {
            self.state = PlayState::Playing;
            self.next_tick = Some(now);
            debug!("Playback started at {}", self.speed);
        }
    }

    /// Run one playback cycle if it is due
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.state.is_playing() {
            return TickOutcome::Idle;
        }
        if let Some(due) = self.next_tick {
            if now < due {
                return TickOutcome::Waiting(due);
            }
        }
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Idle;
        };

        if session.show_next() {
            self.generation += 1;
            let next = now + self.speed.frame_delay(session.fps);
            self.next_tick = Some(next);
            return TickOutcome::Rendered(next);
        }

        // End of stream: stop and rewind to the first frame
        info!("End of video reached, rewinding");
        self.state = PlayState::Paused;
        self.next_tick = None;
        session.source.set_position(0);
        if session.show_next() {
            self.generation += 1;
        } else {
            session.cursor = 0;
        }
        TickOutcome::EndOfStream
    }

    pub fn set_speed(&mut self, speed: Speed) {
        debug!("Playback speed set to {}", speed);
        self.speed = speed;
    }

    /// Jump to an absolute frame; ignored while playing
    pub fn seek(&mut self, position: u64) -> bool {
        if self.state.is_playing() {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let target = if session.total_frames > 0 {
            position.min(session.total_frames - 1)
        } else {
            position
        };
        session.source.set_position(target);
        self.render_next()
    }

    /// Save the displayed frame under `output_dir`
    pub fn capture(&self, output_dir: &Path, format: ImageFormat) -> Result<PathBuf> {
        let session = self.session.as_ref().ok_or(Error::NoFrame)?;
        let frame = session.frame.as_ref().ok_or(Error::NoFrame)?;
        capture::save_frame(frame, output_dir, &session.stem(), format)
    }

    fn render_next(&mut self) -> bool {
        let rendered = self
            .session
            .as_mut()
            .map(|session| session.show_next())
            .unwrap_or(false);
        if rendered {
            self.generation += 1;
        }
        rendered
    }

    fn pause(&mut self) {
        if self.state.is_playing() {
            self.state = PlayState::Paused;
            self.next_tick = None;
            debug!("Playback paused");
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn session(&self) -> Option<&Session<S>> {
        self.session.as_ref()
    }

    pub fn cursor(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.cursor)
    }

    pub fn current_frame(&self) -> Option<&RgbImage> {
        self.session.as_ref().and_then(|s| s.frame.as_ref())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::video::testing::{write_video, write_video_reporting, SyntheticSource};

    type Controller = PlaybackController<SyntheticSource>;

    fn loaded(frames: u64, fps: f64) -> (tempfile::TempDir, Controller) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_video(dir.path(), "clip.mp4", frames, fps);
        let mut controller = Controller::default();
        controller.load(&path).unwrap();
        (dir, controller)
    }

    fn displayed(controller: &Controller) -> u8 {
        SyntheticSource::frame_index(controller.current_frame().unwrap())
    }

    #[test]
    fn test_initial_state() {
        let mut controller = Controller::default();
        assert_eq!(controller.state(), PlayState::NoVideo);
        assert_eq!(controller.cursor(), None);
        assert!(!controller.step_forward());
        assert!(!controller.seek(3));
        controller.toggle_play(Instant::now());
        assert_eq!(controller.state(), PlayState::NoVideo);
    }

    #[test]
    fn test_load_shows_first_frame() {
        let (_dir, controller) = loaded(100, 25.0);
        let session = controller.session().unwrap();
        assert_eq!(session.total_frames(), 100);
        assert_eq!(session.fps(), 25.0);
        assert_eq!(controller.cursor(), Some(0));
        assert_eq!(displayed(&controller), 0);
        assert_eq!(controller.state(), PlayState::Paused);
    }

    #[test]
    fn test_load_failure_keeps_session() {
        let (dir, mut controller) = loaded(10, 25.0);
        controller.step_forward();

        let bad = dir.path().join("broken.mp4");
        std::fs::write(&bad, "garbage").unwrap();
        assert!(matches!(controller.load(&bad), Err(Error::Open { .. })));
        assert!(matches!(
            controller.load(&dir.path().join("missing.mp4")),
            Err(Error::Open { .. })
        ));

        assert_eq!(controller.cursor(), Some(1));
        assert_eq!(controller.session().unwrap().stem(), "clip");
    }

    #[test]
    fn test_load_replaces_session() {
        let (dir, mut controller) = loaded(10, 25.0);
        controller.seek(5);
        let other = write_video(dir.path(), "other.mp4", 20, 30.0);
        controller.load(&other).unwrap();
        let session = controller.session().unwrap();
        assert_eq!(session.stem(), "other");
        assert_eq!(session.total_frames(), 20);
        assert_eq!(controller.cursor(), Some(0));
    }

    #[test]
    fn test_step_forward_five_times() {
        let (_dir, mut controller) = loaded(100, 25.0);
        for _ in 0..5 {
            assert!(controller.step_forward());
        }
        assert_eq!(controller.cursor(), Some(5));
        assert_eq!(displayed(&controller), 5);
    }

    #[test]
    fn test_step_round_trip() {
        let (_dir, mut controller) = loaded(100, 25.0);
        controller.seek(40);
        assert!(controller.step_forward());
        assert!(controller.step_backward());
        assert_eq!(controller.cursor(), Some(40));
        assert_eq!(displayed(&controller), 40);

        assert!(controller.step_backward());
        assert!(controller.step_forward());
        assert_eq!(controller.cursor(), Some(40));
    }

    #[test]
    fn test_step_boundaries() {
        let (_dir, mut controller) = loaded(10, 25.0);
        assert!(!controller.step_backward());
        assert_eq!(controller.cursor(), Some(0));

        controller.seek(9);
        let generation = controller.generation();
        assert!(!controller.step_forward());
        assert_eq!(controller.cursor(), Some(9));
        assert_eq!(controller.generation(), generation);
    }

    #[test]
    fn test_unknown_length_stops_at_decoder_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_video_reporting(dir.path(), "clip.mp4", 4, 25.0, 0);
        let mut controller = Controller::default();
        controller.load(&path).unwrap();
        assert_eq!(controller.session().unwrap().total_frames(), 0);

        for _ in 0..3 {
            assert!(controller.step_forward());
        }
        assert_eq!(controller.cursor(), Some(3));

        let generation = controller.generation();
        assert!(!controller.step_forward());
        assert!(!controller.seek(50));
        assert_eq!(controller.cursor(), Some(3));
        assert_eq!(displayed(&controller), 3);
        assert_eq!(controller.generation(), generation);

        assert!(controller.seek(1));
        assert_eq!(controller.cursor(), Some(1));
        assert_eq!(displayed(&controller), 1);
    }

    #[test]
    fn test_seek_clamps() {
        let (_dir, mut controller) = loaded(10, 25.0);
        assert!(controller.seek(500));
        assert_eq!(controller.cursor(), Some(9));
        assert!(controller.seek(3));
        assert_eq!(displayed(&controller), 3);
    }

    #[test]
    fn test_seek_while_playing_is_ignored() {
        let (_dir, mut controller) = loaded(100, 25.0);
        let now = Instant::now();
        controller.toggle_play(now);
        controller.tick(now);
        let cursor = controller.cursor();
        let generation = controller.generation();

        assert!(!controller.seek(50));
        assert_eq!(controller.cursor(), cursor);
        assert_eq!(controller.generation(), generation);
        assert_eq!(controller.state(), PlayState::Playing);
    }

    #[test]
    fn test_toggle_twice_keeps_cursor() {
        let (_dir, mut controller) = loaded(100, 25.0);
        controller.seek(12);
        let now = Instant::now();
        controller.toggle_play(now);
        assert_eq!(controller.state(), PlayState::Playing);
        controller.toggle_play(now);
        assert_eq!(controller.state(), PlayState::Paused);
        assert_eq!(controller.cursor(), Some(12));
        assert_eq!(controller.tick(now), TickOutcome::Idle);
    }

    #[test]
    fn test_step_pauses_playback() {
        let (_dir, mut controller) = loaded(100, 25.0);
        let now = Instant::now();
        controller.toggle_play(now);
        controller.tick(now);
        assert!(controller.step_forward());
        assert_eq!(controller.state(), PlayState::Paused);
        assert_eq!(controller.next_tick(), None);
    }

    #[test]
    fn test_playback_schedules_frames() {
        let (_dir, mut controller) = loaded(100, 25.0);
        let start = Instant::now();
        controller.toggle_play(start);

        let next = match controller.tick(start) {
            TickOutcome::Rendered(next) => next,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(next, start + Duration::from_millis(40));
        assert_eq!(controller.cursor(), Some(1));

        // Not due yet
        assert_eq!(controller.tick(start + Duration::from_millis(10)), TickOutcome::Waiting(next));
        assert_eq!(controller.cursor(), Some(1));

        assert!(matches!(controller.tick(next), TickOutcome::Rendered(_)));
        assert_eq!(controller.cursor(), Some(2));
    }

    #[test]
    fn test_double_speed_halves_delay() {
        let (_dir, mut controller) = loaded(100, 25.0);
        let start = Instant::now();

        controller.toggle_play(start);
        let TickOutcome::Rendered(normal) = controller.tick(start) else {
            panic!("expected a rendered frame");
        };
        controller.toggle_play(start);

        controller.set_speed(Speed::parse("2.0x").unwrap());
        controller.toggle_play(start);
        let TickOutcome::Rendered(fast) = controller.tick(start) else {
            panic!("expected a rendered frame");
        };

        assert_eq!(normal - start, Duration::from_millis(40));
        assert_eq!(fast - start, Duration::from_millis(20));
    }

    #[test]
    fn test_unknown_fps_uses_fallback_delay() {
        let (_dir, mut controller) = loaded(10, 0.0);
        let start = Instant::now();
        controller.toggle_play(start);
        assert_eq!(
            controller.tick(start),
            TickOutcome::Rendered(start + Duration::from_millis(30))
        );
    }

    #[test]
    fn test_end_of_stream_rewinds() {
        let (_dir, mut controller) = loaded(3, 25.0);
        let mut now = Instant::now();
        controller.toggle_play(now);

        let mut outcome = controller.tick(now);
        while let TickOutcome::Rendered(next) = outcome {
            now = next;
            outcome = controller.tick(now);
        }

        assert_eq!(outcome, TickOutcome::EndOfStream);
        assert_eq!(controller.state(), PlayState::Paused);
        assert_eq!(controller.cursor(), Some(0));
        assert_eq!(displayed(&controller), 0);

        // Playable again from the start
        controller.toggle_play(now);
        assert!(matches!(controller.tick(now), TickOutcome::Rendered(_)));
        assert_eq!(controller.cursor(), Some(1));
    }

    #[test]
    fn test_capture_without_video() {
        let dir = tempfile::tempdir().unwrap();
        let controller = Controller::default();
        assert!(matches!(
            controller.capture(dir.path(), ImageFormat::Jpg),
            Err(Error::NoFrame)
        ));
    }

    #[test]
    fn test_capture_scenario() {
        let (dir, mut controller) = loaded(100, 25.0);
        for _ in 0..5 {
            controller.step_forward();
        }
        let out = dir.path().join("frames");

        let first = controller.capture(&out, ImageFormat::Jpg).unwrap();
        assert_eq!(first.file_name().unwrap(), "clip_0001.jpg");
        let second = controller.capture(&out, ImageFormat::Jpg).unwrap();
        assert_eq!(second.file_name().unwrap(), "clip_0002.jpg");
    }

    #[test]
    fn test_capture_while_playing() {
        let (dir, mut controller) = loaded(100, 25.0);
        let now = Instant::now();
        controller.toggle_play(now);
        controller.tick(now);

        let path = controller.capture(dir.path(), ImageFormat::Png).unwrap();
        assert_eq!(path.file_name().unwrap(), "clip_0001.png");
        assert_eq!(controller.state(), PlayState::Playing);
    }
}
