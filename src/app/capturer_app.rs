//! Main capturer application
//!
//! Implements the egui App trait: controls, keyboard shortcuts, the frame
//! display and alert dialogs. All playback logic lives in the controller.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use egui::{Align2, Color32, Key, RichText};
use tracing::{error, info, warn};

use crate::config::CaptureConfig;
use crate::error::Error;
use crate::render::FrameView;
use crate::video::{FfmpegDecoder, FrameSource};

use super::controller::{PlaybackController, TickOutcome};
use super::state::{Speed, SPEED_PRESETS};

/// Extensions offered by the open dialog
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv"];

/// How often to poll for the file dialog result
const DIALOG_POLL_INTERVAL: Duration = Duration::from_millis(100);

const CONTROL_BAR_COLOR: Color32 = Color32::from_rgb(0x2c, 0x3e, 0x50);
const PROGRESS_BAR_COLOR: Color32 = Color32::from_rgb(0x34, 0x49, 0x5e);

/// Message shown in a modal window
#[derive(Debug, Clone, PartialEq)]
struct Alert {
    title: &'static str,
    message: String,
}

/// Main capturer application
pub struct CapturerApp<S: FrameSource = FfmpegDecoder> {
    config: CaptureConfig,
    controller: PlaybackController<S>,
    frame_view: FrameView,
    /// Status text in the control bar
    info_text: String,
    alert: Option<Alert>,
    /// Pending result of the native open dialog
    dialog_rx: Option<Receiver<Option<PathBuf>>>,
}

impl<S: FrameSource> CapturerApp<S> {
    /// Create the application, opening `initial_video` if given
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: CaptureConfig,
        initial_video: Option<PathBuf>,
    ) -> Self {
        let mut app = Self::with_config(config);
        if let Some(path) = initial_video {
            app.load_video(&path);
        }
        app
    }

    fn with_config(config: CaptureConfig) -> Self {
        let speed = Speed::new(config.default_speed).unwrap_or_else(|e| {
            warn!("{}, using {}", e, Speed::NORMAL);
            Speed::NORMAL
        });

        info!(
            "Capturer initialized: output={}, format={:?}",
            config.output_dir.display(),
            config.image_format
        );

        Self {
            config,
            controller: PlaybackController::new(speed),
            frame_view: FrameView::new(),
            info_text: "No video loaded".to_string(),
            alert: None,
            dialog_rx: None,
        }
    }

    /// Load a video, reporting failure in an alert
    fn load_video(&mut self, path: &Path) {
        match self.controller.load(path) {
            Ok(()) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.info_text = format!("Loaded: {name}");
            }
            Err(e) => {
                warn!("Failed to load video: {}", e);
                self.show_alert(&e);
            }
        }
    }

    fn capture_frame(&mut self) {
        match self
            .controller
            .capture(&self.config.output_dir, self.config.image_format)
        {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.info_text = format!("Saved: {name}");
            }
            Err(e) => {
                warn!("Capture failed: {}", e);
                self.show_alert(&e);
            }
        }
    }

    fn change_speed(&mut self, label: &str) {
        match Speed::parse(label) {
            Ok(speed) => self.controller.set_speed(speed),
            Err(e) => self.show_alert(&e),
        }
    }

    fn show_alert(&mut self, err: &Error) {
        self.alert = Some(Alert {
            title: err.title(),
            message: err.to_string(),
        });
    }

    /// Open the native file dialog on a helper thread
    fn open_file_dialog(&mut self) {
        if self.dialog_rx.is_some() {
            return;
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        let spawned = std::thread::Builder::new()
            .name("file-dialog".into())
            .spawn(move || {
                let path = rfd::FileDialog::new()
                    .set_title("Select Video File")
                    .add_filter("Video files", VIDEO_EXTENSIONS)
                    .add_filter("All files", &["*"])
                    .pick_file();
                let _ = tx.send(path);
            });

        match spawned {
            Ok(_) => self.dialog_rx = Some(rx),
            Err(e) => error!("Failed to open file dialog: {}", e),
        }
    }

    fn poll_file_dialog(&mut self) {
        let Some(rx) = self.dialog_rx.as_ref() else {
            return;
        };
        match rx.try_recv() {
            Ok(Some(path)) => {
                self.dialog_rx = None;
                self.load_video(&path);
            }
            Ok(None) | Err(TryRecvError::Disconnected) => {
                self.dialog_rx = None;
            }
            Err(TryRecvError::Empty) => {}
        }
    }

    /// Left/Right step, Space plays or pauses
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.alert.is_some() {
            return;
        }
        let (left, right, space) = ctx.input(|i| {
            (
                i.key_pressed(Key::ArrowLeft),
                i.key_pressed(Key::ArrowRight),
                i.key_pressed(Key::Space),
            )
        });
        if left {
            self.controller.step_backward();
        }
        if right {
            self.controller.step_forward();
        }
        if space {
            self.controller.toggle_play(Instant::now());
        }
    }

    fn frame_label(&self) -> String {
        match self.controller.session() {
            Some(session) => format!(
                "Frame: {} / {}",
                session.cursor() + 1,
                session.total_frames()
            ),
            None => "Frame: 0 / 0".to_string(),
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        let has_video = self.controller.session().is_some();

        ui.horizontal(|ui| {
            if ui.button(RichText::new("Load Video").strong()).clicked() {
                self.open_file_dialog();
            }

            if ui
                .add_enabled(has_video, egui::Button::new("◀ Prev Frame"))
                .clicked()
            {
                self.controller.step_backward();
            }

            let play_label = if self.controller.state().is_playing() {
                "⏸ Pause"
            } else {
                "▶ Play"
            };
            if ui
                .add_enabled(has_video, egui::Button::new(RichText::new(play_label).strong()))
                .clicked()
            {
                self.controller.toggle_play(Instant::now());
            }

            if ui
                .add_enabled(has_video, egui::Button::new("Next Frame ▶"))
                .clicked()
            {
                self.controller.step_forward();
            }

            ui.add_space(15.0);
            ui.label(RichText::new("Speed:").color(Color32::WHITE).strong());

            let current = self.controller.speed();
            let mut selected = None;
            egui::ComboBox::from_id_salt("speed")
                .selected_text(current.to_string())
                .width(70.0)
                .show_ui(ui, |ui| {
                    for preset in SPEED_PRESETS {
                        let Ok(speed) = Speed::new(preset) else { continue };
                        let label = speed.to_string();
                        if ui.selectable_label(speed == current, &label).clicked() {
                            selected = Some(label);
                        }
                    }
                });
            if let Some(label) = selected {
                self.change_speed(&label);
            }

            ui.add_space(15.0);
            if ui
                .add_enabled(has_video, egui::Button::new(RichText::new("📷 Capture").strong()))
                .clicked()
            {
                self.capture_frame();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(RichText::new(&self.info_text).color(Color32::WHITE));
            });
        });
    }

    fn show_progress(&mut self, ui: &mut egui::Ui) {
        let (max, has_video) = match self.controller.session() {
            Some(session) => (session.total_frames().saturating_sub(1), true),
            None => (0, false),
        };
        let mut position = self.controller.cursor().unwrap_or(0);

        ui.spacing_mut().slider_width = ui.available_width();
        let response = ui.add_enabled(
            has_video,
            egui::Slider::new(&mut position, 0..=max).show_value(false),
        );
        if response.changed() {
            self.controller.seek(position);
        }

        ui.horizontal(|ui| {
            ui.label(RichText::new(self.frame_label()).color(Color32::WHITE).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    RichText::new(format!(
                        "{} | {}",
                        self.controller.state().display_name(),
                        self.controller.speed()
                    ))
                    .color(Color32::LIGHT_GRAY)
                    .small(),
                );
            });
        });
    }

    fn show_alert_window(&mut self, ctx: &egui::Context) {
        let Some(alert) = self.alert.as_ref() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new(alert.title)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&alert.message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed || ctx.input(|i| i.key_pressed(Key::Escape) || i.key_pressed(Key::Enter)) {
            self.alert = None;
        }
    }
}

impl<S: FrameSource> eframe::App for CapturerApp<S> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_file_dialog();
        self.handle_shortcuts(ctx);

        // Cooperative playback: decode only once the scheduled frame is due
        let now = Instant::now();
        match self.controller.tick(now) {
            TickOutcome::Waiting(due) | TickOutcome::Rendered(due) => {
                ctx.request_repaint_after(due.saturating_duration_since(now));
            }
            TickOutcome::EndOfStream => ctx.request_repaint(),
            TickOutcome::Idle => {}
        }

        match self.controller.current_frame() {
            Some(frame) => self
                .frame_view
                .update(ctx, frame, self.controller.generation()),
            None => self.frame_view.clear(),
        }

        egui::TopBottomPanel::top("controls")
            .frame(egui::Frame::none().fill(CONTROL_BAR_COLOR).inner_margin(8.0))
            .show(ctx, |ui| self.show_controls(ui));

        egui::TopBottomPanel::bottom("progress")
            .frame(egui::Frame::none().fill(PROGRESS_BAR_COLOR).inner_margin(10.0))
            .show(ctx, |ui| self.show_progress(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                let surface = ui.available_rect_before_wrap();
                self.frame_view.paint(ui.painter(), surface);
            });

        self.show_alert_window(ctx);

        if self.dialog_rx.is_some() {
            ctx.request_repaint_after(DIALOG_POLL_INTERVAL);
        }
    }
}
