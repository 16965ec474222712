//! Video decoder module
//!
//! Frame-indexed video decoding using FFmpeg.

use std::path::Path;

use image::RgbImage;
use tracing::{debug, error, info};

use ffmpeg_next as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::format::Pixel;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{Context as Scaler, Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::Rational;

use super::FrameSource;
use crate::error::{Error, Result};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Video decoder that extracts RGB frames from video files using FFmpeg
pub struct FfmpegDecoder {
    /// FFmpeg format context
    input_ctx: ffmpeg::format::context::Input,
    /// Video stream index
    video_stream_index: usize,
    /// Video decoder
    decoder: ffmpeg::codec::decoder::Video,
    /// Scaler for RGB24 conversion at native size
    scaler: Scaler,
    width: u32,
    height: u32,
    /// Stream time base, used to map pts to frame indices
    time_base: Rational,
    /// Stream start time in time base units
    start_pts: i64,
    /// Video FPS (0.0 when unknown)
    fps: f64,
    total_frames: u64,
    cursor: ReadCursor,
    /// Packet iterator state
    packet_iter_exhausted: bool,
}

impl FrameSource for FfmpegDecoder {
    fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::open(path, "file not found"));
        }

        // Initialize FFmpeg (safe to call multiple times)
        ffmpeg::init().map_err(|e| Error::open(path, format!("failed to initialize FFmpeg: {e}")))?;

        let input_ctx = input(path).map_err(|e| Error::open(path, e))?;

        let video_stream = input_ctx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| Error::open(path, "No video stream found in file"))?;

        let video_stream_index = video_stream.index();
        let time_base = video_stream.time_base();
        let start_pts = match video_stream.start_time() {
            start if start == ffmpeg::ffi::AV_NOPTS_VALUE => 0,
            start => start,
        };

        let fps = rational_to_f64(video_stream.avg_frame_rate())
            .or_else(|| rational_to_f64(video_stream.rate()))
            .unwrap_or(0.0);

        let stream_frames = video_stream.frames();

        let context_decoder =
            ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())
                .map_err(|e| Error::open(path, format!("failed to create decoder context: {e}")))?;
        let decoder = context_decoder
            .decoder()
            .video()
            .map_err(|e| Error::open(path, format!("failed to create video decoder: {e}")))?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = Scaler::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(|e| Error::open(path, format!("failed to create scaler: {e}")))?;

        let total_frames = if stream_frames > 0 {
            stream_frames as u64
        } else {
            estimate_total_frames(input_ctx.duration(), fps)
        };

        info!(
            "Opened video: {}x{} @ {:.1}fps, {} frames, format: {:?}",
            width,
            height,
            fps,
            total_frames,
            decoder.format()
        );

        Ok(Self {
            input_ctx,
            video_stream_index,
            decoder,
            scaler,
            width,
            height,
            time_base,
            start_pts,
            fps,
            total_frames,
            cursor: ReadCursor::default(),
            packet_iter_exhausted: false,
        })
    }

    fn read_next_frame(&mut self) -> Option<RgbImage> {
        loop {
            let decoded = self.decode_next()?;
            let pts_index = decoded
                .timestamp()
                .or(decoded.pts())
                .and_then(|pts| {
                    pts_to_frame_index(pts, self.start_pts, self.time_base, self.fps)
                });

            if self.cursor.admit(pts_index) {
                return self.convert_frame(&decoded);
            }
        }
    }

    fn position(&self) -> u64 {
        self.cursor.position
    }

    fn set_position(&mut self, frame: u64) {
        if frame == self.cursor.position && self.cursor.seek_target.is_none() {
            return;
        }

        // Without a frame rate pts cannot be mapped to frames, so rewind and count
        let counted = self.fps <= 0.0;
        let start_seconds = pts_to_seconds(self.start_pts, self.time_base);
        let frame_seconds = if counted { 0.0 } else { frame as f64 / self.fps };
        let timestamp = ((start_seconds + frame_seconds) * MICROS_PER_SECOND) as i64;

        // Lands on the keyframe at or before the target; read_next_frame
        // decodes forward from there.
        if let Err(e) = self.input_ctx.seek(timestamp, ..timestamp) {
            error!("Failed to seek to frame {}: {}", frame, e);
        }

        self.decoder.flush();
        self.packet_iter_exhausted = false;
        self.cursor.seek(frame, counted);
        debug!("Seeked to frame {} (ts {}us)", frame, timestamp);
    }

    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn fps(&self) -> f64 {
        self.fps
    }
}

impl FfmpegDecoder {
    /// Decode the next frame in stream order
    fn decode_next(&mut self) -> Option<VideoFrame> {
        // Try to receive already decoded frames first
        let mut decoded = VideoFrame::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return Some(decoded);
        }

        if self.packet_iter_exhausted {
            return None;
        }

        loop {
            let packet_result = self.input_ctx.packets().next();

            match packet_result {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }

                    if self.decoder.send_packet(&packet).is_err() {
                        continue;
                    }

                    let mut decoded = VideoFrame::empty();
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        return Some(decoded);
                    }
                }
                None => {
                    // End of stream, drain the decoder
                    self.packet_iter_exhausted = true;
                    if let Err(e) = self.decoder.send_eof() {
                        debug!("Failed to drain decoder: {}", e);
                    }

                    let mut decoded = VideoFrame::empty();
                    if self.decoder.receive_frame(&mut decoded).is_ok() {
                        return Some(decoded);
                    }
                    return None;
                }
            }
        }
    }

    /// Convert FFmpeg frame to RgbImage
    fn convert_frame(&mut self, decoded: &VideoFrame) -> Option<RgbImage> {
        let mut rgb_frame = VideoFrame::empty();

        if let Err(e) = self.scaler.run(decoded, &mut rgb_frame) {
            error!("Failed to convert frame: {}", e);
            return None;
        }

        let data = rgb_frame.data(0);
        let stride = rgb_frame.stride(0);
        let height = self.height as usize;
        let width = self.width as usize;

        if stride == width * 3 {
            RgbImage::from_raw(self.width, self.height, data[..width * height * 3].to_vec())
        } else {
            // Strip row padding
            let mut pixels = Vec::with_capacity(width * height * 3);
            for y in 0..height {
                let row_start = y * stride;
                pixels.extend_from_slice(&data[row_start..row_start + width * 3]);
            }
            RgbImage::from_raw(self.width, self.height, pixels)
        }
    }
}

/// Frame numbering across seeks
#[derive(Debug, Default)]
struct ReadCursor {
    /// Index of the frame the next read returns
    position: u64,
    /// After a seek, decoded frames before this index are dropped
    seek_target: Option<u64>,
}

impl ReadCursor {
    /// Record a seek to `frame`
    ///
    /// A `counted` seek has rewound to the start of the stream, so decoded
    /// frames are numbered from zero.
    fn seek(&mut self, frame: u64, counted: bool) {
        self.position = if counted { 0 } else { frame };
        self.seek_target = Some(frame);
    }

    /// Number the next decoded frame, from its pts when known
    ///
    /// Returns `false` while the frame is still before the seek target.
    fn admit(&mut self, pts_index: Option<u64>) -> bool {
        let index = pts_index.unwrap_or(self.position);
        self.position = index + 1;
        match self.seek_target {
            Some(target) if index < target => false,
            _ => {
                self.seek_target = None;
                true
            }
        }
    }
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    } else {
        None
    }
}

fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Map a presentation timestamp to a frame index, `None` when fps is unknown
fn pts_to_frame_index(pts: i64, start_pts: i64, time_base: Rational, fps: f64) -> Option<u64> {
    if fps <= 0.0 {
        return None;
    }
    let seconds = pts_to_seconds(pts - start_pts, time_base);
    Some((seconds * fps).round().max(0.0) as u64)
}

/// Frame count from container duration (microseconds) when the stream has none
fn estimate_total_frames(duration_us: i64, fps: f64) -> u64 {
    if duration_us <= 0 || fps <= 0.0 {
        return 0;
    }
    (duration_us as f64 / MICROS_PER_SECOND * fps).round() as u64
}
