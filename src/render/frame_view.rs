//! Frame display
//!
//! Uploads decoded frames to an egui texture and paints them scaled to fit,
//! centered in the available area.

use egui::{Color32, ColorImage, Pos2, Rect, TextureHandle, TextureOptions, Vec2};
use image::RgbImage;

/// Largest rect with the image's aspect ratio that fits `surface`, centered
///
/// Returns `None` while the surface has no usable size.
pub fn fit_rect(surface: Rect, image_size: [usize; 2]) -> Option<Rect> {
    let (surface_w, surface_h) = (surface.width(), surface.height());
    if surface_w <= 1.0 || surface_h <= 1.0 || image_size[0] == 0 || image_size[1] == 0 {
        return None;
    }

    let aspect = image_size[0] as f32 / image_size[1] as f32;
    let size = if surface_w / surface_h > aspect {
        // Surface is wider than the image: fill height
        Vec2::new((surface_h * aspect).round(), surface_h)
    } else {
        Vec2::new(surface_w, (surface_w / aspect).round())
    };

    Some(Rect::from_center_size(surface.center(), size))
}

/// Texture-backed view of the current frame
pub struct FrameView {
    texture: Option<TextureHandle>,
    /// Reusable pixel buffer
    color_buffer: Vec<Color32>,
    /// Controller generation the texture was last built from
    generation: Option<u64>,
}

impl FrameView {
    pub fn new() -> Self {
        Self {
            texture: None,
            color_buffer: Vec::new(),
            generation: None,
        }
    }

    /// Whether a frame from `generation` still needs uploading
    pub fn is_stale(&self, generation: u64) -> bool {
        self.generation != Some(generation)
    }

    /// Upload `frame` unless this generation is already on the GPU
    pub fn update(&mut self, ctx: &egui::Context, frame: &RgbImage, generation: u64) {
        if !self.is_stale(generation) {
            return;
        }

        fill_color_buffer(&mut self.color_buffer, frame);
        let image = ColorImage {
            size: [frame.width() as usize, frame.height() as usize],
            pixels: self.color_buffer.clone(),
        };

        if let Some(ref mut texture) = self.texture {
            texture.set(image, TextureOptions::LINEAR);
        } else {
            self.texture = Some(ctx.load_texture("frame", image, TextureOptions::LINEAR));
        }
        self.generation = Some(generation);
    }

    /// Drop the texture (no video loaded)
    pub fn clear(&mut self) {
        self.texture = None;
        self.generation = None;
    }

    /// Paint the frame into `surface` on a black background
    pub fn paint(&self, painter: &egui::Painter, surface: Rect) {
        painter.rect_filled(surface, 0.0, Color32::BLACK);

        let Some(texture) = self.texture.as_ref() else {
            return;
        };
        if let Some(target) = fit_rect(surface, texture.size()) {
            painter.image(
                texture.id(),
                target,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }
}

/// Convert RGB pixels into a reused Color32 buffer
fn fill_color_buffer(buffer: &mut Vec<Color32>, img: &RgbImage) {
    buffer.clear();
    buffer.reserve(img.width() as usize * img.height() as usize);
    buffer.extend(
        img.as_raw()
            .chunks_exact(3)
            .map(|p| Color32::from_rgb(p[0], p[1], p[2])),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(w: f32, h: f32) -> Rect {
        Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(w, h))
    }

    #[test]
    fn test_fit_fills_height_when_surface_is_wider() {
        let area = surface(1000.0, 500.0);
        let rect = fit_rect(area, [640, 480]).unwrap();
        assert_eq!(rect.size(), Vec2::new(667.0, 500.0));
        assert_eq!(rect.center(), area.center());
    }

    #[test]
    fn test_fit_fills_width_when_surface_is_taller() {
        let area = surface(400.0, 800.0);
        let rect = fit_rect(area, [1920, 1080]).unwrap();
        assert_eq!(rect.size(), Vec2::new(400.0, 225.0));
        assert_eq!(rect.center(), area.center());
    }

    #[test]
    fn test_fit_unrealised_surface() {
        assert!(fit_rect(surface(1.0, 300.0), [640, 480]).is_none());
        assert!(fit_rect(surface(300.0, 0.0), [640, 480]).is_none());
        assert!(fit_rect(surface(300.0, 300.0), [0, 480]).is_none());
    }

    #[test]
    fn test_fill_color_buffer() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([1, 2, 3]));
        img.put_pixel(1, 0, image::Rgb([4, 5, 6]));

        let mut buffer = vec![Color32::RED; 10];
        fill_color_buffer(&mut buffer, &img);
        assert_eq!(buffer, vec![Color32::from_rgb(1, 2, 3), Color32::from_rgb(4, 5, 6)]);
    }

    #[test]
    fn test_staleness() {
        let view = FrameView::new();
        assert!(view.is_stale(0));
    }
}
