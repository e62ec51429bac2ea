//! CPU frame canvas for the reveal animation.

use kurbo::{Affine, BezPath, PathEl};
use resvg::tiny_skia::{
    Color, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform,
};
use sketchcast_models::FrameSize;

use crate::error::{MediaError, MediaResult};

/// White paper with black pen strokes.
///
/// Completed strokes are drawn once onto `committed`; each frame copies it and
/// adds the stroke currently in progress.
pub struct RevealCanvas {
    committed: Pixmap,
    frame: Pixmap,
    /// Drawing space to frame space
    transform: Affine,
    paint: Paint<'static>,
    stroke: Stroke,
}

impl RevealCanvas {
    pub fn new(size: FrameSize, transform: Affine, stroke_width: f32) -> MediaResult<Self> {
        let mut committed = Pixmap::new(size.width, size.height).ok_or_else(|| {
            MediaError::invalid_frame(format!("cannot allocate {}", size.to_dimension_string()))
        })?;
        committed.fill(Color::WHITE);
        let frame = committed.clone();

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: stroke_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        Ok(Self {
            committed,
            frame,
            transform,
            paint,
            stroke,
        })
    }

    /// Permanently draw a finished stroke.
    pub fn commit(&mut self, path: &BezPath) {
        if let Some(path) = to_skia_path(&(self.transform * path.clone())) {
            self.committed
                .stroke_path(&path, &self.paint, &self.stroke, Transform::identity(), None);
        }
    }

    /// Compose the committed strokes plus an in-progress stroke.
    ///
    /// Returns opaque RGBA8 bytes.
    pub fn compose(&mut self, partial: Option<&BezPath>) -> &[u8] {
        self.frame.data_mut().copy_from_slice(self.committed.data());
        if let Some(partial) = partial {
            if let Some(path) = to_skia_path(&(self.transform * partial.clone())) {
                self.frame
                    .stroke_path(&path, &self.paint, &self.stroke, Transform::identity(), None);
            }
        }
        self.frame.data()
    }
}

/// Convert a kurbo path; `None` when nothing drawable remains.
fn to_skia_path(path: &BezPath) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p) => builder.quad_to(p1.x as f32, p1.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(p1, p2, p) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}
