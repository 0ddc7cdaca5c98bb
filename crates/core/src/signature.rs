use std::io::Cursor;

use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, RgbImage};
use tracing::warn;

use crate::artifact::CaptureArtifact;

/// Fixed dimensions of the signature surface.
pub const SURFACE_WIDTH: u32 = 300;
pub const SURFACE_HEIGHT: u32 = 150;

const STROKE_RADIUS: f32 = 1.0;
const INK: [u8; 3] = [0, 0, 0];
const BACKGROUND: [u8; 3] = [255, 255, 255];

/// A point on the drawing surface, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Freehand signature surface.
///
/// Pointer events feed `begin`/`extend`/`end`; `has_content` is sticky until
/// an explicit `clear`. All operations are synchronous and total: there are
/// no error conditions in this state machine.
#[derive(Debug, Clone, Default)]
pub struct SignaturePad {
    strokes: Vec<Vec<Point>>,
    is_active: bool,
    has_content: bool,
}

impl SignaturePad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new path at `point` and marks the surface as having content.
    pub fn begin(&mut self, point: Point) {
        self.is_active = true;
        self.has_content = true;
        self.strokes.push(vec![point]);
    }

    /// Appends a line segment from the last point to `point`.
    ///
    /// No-op when no path is currently being drawn.
    pub fn extend(&mut self, point: Point) {
        if !self.is_active {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    /// Closes the current path. Idempotent.
    pub fn end(&mut self) {
        self.is_active = false;
    }

    /// Erases all drawn content and resets the surface background.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.is_active = false;
        self.has_content = false;
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn has_content(&self) -> bool {
        self.has_content
    }

    /// Renders the surface into a lossless PNG artifact of fixed dimensions.
    ///
    /// Returns [`CaptureArtifact::None`] when nothing has been drawn. An
    /// encoder failure is a non-fatal capture warning: it is logged and the
    /// artifact degrades to `None`.
    pub fn to_artifact(&self) -> CaptureArtifact {
        if !self.has_content {
            return CaptureArtifact::None;
        }
        match self.encode_png() {
            Ok(bytes) => CaptureArtifact::Image {
                bytes,
                mime_type: "image/png".to_string(),
            },
            Err(err) => {
                warn!(component = "signature", error = %err, "failed to encode signature surface");
                CaptureArtifact::None
            }
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut surface = RgbImage::from_pixel(SURFACE_WIDTH, SURFACE_HEIGHT, image::Rgb(BACKGROUND));

        for stroke in &self.strokes {
            match stroke.as_slice() {
                [] => {}
                [only] => stamp(&mut surface, *only),
                points => {
                    for pair in points.windows(2) {
                        draw_segment(&mut surface, pair[0], pair[1]);
                    }
                }
            }
        }

        let mut out = Cursor::new(Vec::new());
        PngEncoder::new(&mut out).write_image(
            surface.as_raw(),
            SURFACE_WIDTH,
            SURFACE_HEIGHT,
            ExtendedColorType::Rgb8,
        )?;
        Ok(out.into_inner())
    }
}

/// Stamps the stroke brush along the segment from `from` to `to`.
fn draw_segment(surface: &mut RgbImage, from: Point, to: Point) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp(surface, Point::new(from.x + dx * t, from.y + dy * t));
    }
}

fn stamp(surface: &mut RgbImage, center: Point) {
    let radius = STROKE_RADIUS.ceil() as i64;
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 || x >= SURFACE_WIDTH as i64 || y >= SURFACE_HEIGHT as i64 {
                continue;
            }
            let fx = x as f32 - center.x;
            let fy = y as f32 - center.y;
            if fx * fx + fy * fy <= STROKE_RADIUS * STROKE_RADIUS + f32::EPSILON {
                surface.put_pixel(x as u32, y as u32, image::Rgb(INK));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scribble(pad: &mut SignaturePad) {
        pad.begin(Point::new(10.0, 10.0));
        pad.extend(Point::new(120.0, 40.0));
        pad.extend(Point::new(200.0, 90.0));
        pad.end();
    }

    #[test]
    fn fresh_pad_yields_no_artifact() {
        let pad = SignaturePad::new();
        assert!(!pad.has_content());
        assert_eq!(pad.to_artifact(), CaptureArtifact::None);
    }

    #[test]
    fn drawing_produces_a_png_of_fixed_dimensions() {
        let mut pad = SignaturePad::new();
        scribble(&mut pad);
        assert!(pad.has_content());

        let artifact = pad.to_artifact();
        let CaptureArtifact::Image { bytes, mime_type } = artifact else {
            panic!("expected image artifact");
        };
        assert_eq!(mime_type, "image/png");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).expect("decode png");
        assert_eq!(decoded.width(), SURFACE_WIDTH);
        assert_eq!(decoded.height(), SURFACE_HEIGHT);
    }

    #[test]
    fn clear_resets_content_regardless_of_history() {
        let mut pad = SignaturePad::new();
        scribble(&mut pad);
        scribble(&mut pad);
        pad.clear();

        assert!(!pad.has_content());
        assert!(!pad.is_active());
        assert_eq!(pad.to_artifact(), CaptureArtifact::None);
    }

    #[test]
    fn extend_without_begin_is_a_no_op() {
        let mut pad = SignaturePad::new();
        pad.extend(Point::new(50.0, 50.0));
        assert!(!pad.has_content());
        assert_eq!(pad.to_artifact(), CaptureArtifact::None);
    }

    #[test]
    fn end_is_idempotent() {
        let mut pad = SignaturePad::new();
        pad.begin(Point::new(5.0, 5.0));
        pad.end();
        pad.end();
        assert!(!pad.is_active());
        assert!(pad.has_content());
    }

    #[test]
    fn content_stays_sticky_after_end() {
        let mut pad = SignaturePad::new();
        pad.begin(Point::new(5.0, 5.0));
        pad.end();
        assert!(pad.has_content());
        assert!(matches!(pad.to_artifact(), CaptureArtifact::Image { .. }));
    }

    #[test]
    fn drawn_pixels_land_inside_the_surface() {
        let mut pad = SignaturePad::new();
        pad.begin(Point::new(0.0, 0.0));
        // Runs off the surface; out-of-bounds pixels must be dropped.
        pad.extend(Point::new(400.0, 200.0));
        pad.end();

        let CaptureArtifact::Image { bytes, .. } = pad.to_artifact() else {
            panic!("expected image artifact");
        };
        let decoded = image::load_from_memory(&bytes).expect("decode png").to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
