//! Raster to line-art vectorization.
//!
//! The raster is flattened onto white, thresholded to black and white and
//! traced by `potrace`. The SVG it writes is parsed with `usvg` into strokes:
//! every subpath becomes one stroke, kept in document order so the reveal
//! draws them in the order the tracer emitted them.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{GrayImage, ImageEncoder, Luma};
use kurbo::{Affine, BezPath, Point};
use tokio::process::Command;
use tracing::debug;

use crate::command::{check_potrace, stderr_tail};
use crate::error::{MediaError, MediaResult};

/// Luminance at or above which a pixel counts as paper.
const THRESHOLD: u8 = 128;

/// Ordered strokes in a coordinate space of `width` x `height`.
#[derive(Debug, Clone, Default)]
pub struct VectorDrawing {
    pub width: f64,
    pub height: f64,
    pub strokes: Vec<BezPath>,
}

impl VectorDrawing {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }
}

/// Converts a raster image into ordered 2D strokes.
#[async_trait]
pub trait Vectorizer: Send + Sync {
    /// Trace `image`, using `scratch_dir` for intermediate files.
    ///
    /// An image with nothing to trace yields an empty drawing, not an error.
    async fn vectorize(&self, image: &Path, scratch_dir: &Path) -> MediaResult<VectorDrawing>;
}

/// [`Vectorizer`] backed by the `potrace` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct PotraceVectorizer {
    /// Speckles up to this many pixels are suppressed (`potrace -t`)
    turd_size: Option<u32>,
}

impl PotraceVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turd_size(mut self, pixels: u32) -> Self {
        self.turd_size = Some(pixels);
        self
    }
}

#[async_trait]
impl Vectorizer for PotraceVectorizer {
    async fn vectorize(&self, image: &Path, scratch_dir: &Path) -> MediaResult<VectorDrawing> {
        check_potrace()?;

        if !image.exists() {
            return Err(MediaError::FileNotFound(image.to_path_buf()));
        }

        tokio::fs::create_dir_all(scratch_dir).await?;
        let work = tempfile::Builder::new()
            .prefix("trace-")
            .tempdir_in(scratch_dir)?;
        let bitmap_path = work.path().join("bitmap.pgm");
        let svg_path = work.path().join("trace.svg");

        let source = image.to_path_buf();
        let bitmap_out = bitmap_path.clone();
        tokio::task::spawn_blocking(move || write_threshold_bitmap(&source, &bitmap_out))
            .await
            .map_err(|e| MediaError::internal(format!("bitmap task failed: {}", e)))??;

        let mut cmd = Command::new("potrace");
        cmd.arg(&bitmap_path).arg("-s").arg("-o").arg(&svg_path);
        if let Some(turd) = self.turd_size {
            cmd.arg("-t").arg(turd.to_string());
        }

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::potrace_failed(
                format!("potrace exited with {}", output.status),
                Some(stderr_tail(&output.stderr)),
            ));
        }

        let svg = tokio::fs::read(&svg_path).await?;
        let drawing = parse_svg_strokes(&svg)?;
        debug!(
            image = %image.display(),
            strokes = drawing.stroke_count(),
            "Vectorized image"
        );
        Ok(drawing)
    }
}

/// Flatten alpha onto white, threshold at 50% luminance and write a binary PGM.
pub fn write_threshold_bitmap(source: &Path, dest: &Path) -> MediaResult<()> {
    let bitmap = threshold_bitmap(&image::open(source)?.to_rgba8());
    let file = std::fs::File::create(dest)?;
    let writer = std::io::BufWriter::new(file);
    PnmEncoder::new(writer)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(
            bitmap.as_raw(),
            bitmap.width(),
            bitmap.height(),
            image::ColorType::L8,
        )?;
    Ok(())
}

/// Black-and-white version of `rgba` as seen on white paper.
pub fn threshold_bitmap(rgba: &image::RgbaImage) -> GrayImage {
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        // Rec. 601 luma
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        let alpha = a as u32;
        let on_white = (luma * alpha + 255 * (255 - alpha)) / 255;
        if on_white >= THRESHOLD as u32 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Parse an SVG document into ordered strokes in its viewport space.
pub fn parse_svg_strokes(svg: &[u8]) -> MediaResult<VectorDrawing> {
    let tree = usvg::Tree::from_data(svg, &usvg::Options::default())
        .map_err(|e| MediaError::Svg(e.to_string()))?;

    let size = tree.size();
    let mut drawing = VectorDrawing {
        width: size.width() as f64,
        height: size.height() as f64,
        strokes: Vec::new(),
    };
    collect_group(tree.root(), &mut drawing.strokes);
    Ok(drawing)
}

fn collect_group(group: &usvg::Group, out: &mut Vec<BezPath>) {
    for node in group.children() {
        match node {
            usvg::Node::Group(child) => collect_group(child, out),
            usvg::Node::Path(path) => collect_path(path, out),
            _ => {}
        }
    }
}

fn collect_path(path: &usvg::Path, out: &mut Vec<BezPath>) {
    use usvg::tiny_skia_path::PathSegment;

    let t = path.abs_transform();
    let affine = Affine::new([
        t.sx as f64,
        t.ky as f64,
        t.kx as f64,
        t.sy as f64,
        t.tx as f64,
        t.ty as f64,
    ]);
    let pt = |p: usvg::tiny_skia_path::Point| affine * Point::new(p.x as f64, p.y as f64);

    let mut current = BezPath::new();
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;

    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                flush(&mut current, out);
                start = pt(p);
                last = start;
                current.move_to(start);
            }
            PathSegment::LineTo(p) => {
                last = pt(p);
                current.line_to(last);
            }
            PathSegment::QuadTo(p1, p) => {
                last = pt(p);
                current.quad_to(pt(p1), last);
            }
            PathSegment::CubicTo(p1, p2, p) => {
                last = pt(p);
                current.curve_to(pt(p1), pt(p2), last);
            }
            PathSegment::Close => {
                if last != start {
                    current.line_to(start);
                }
                last = start;
            }
        }
    }
    flush(&mut current, out);
}

/// Push `current` if it draws anything and start a fresh path.
fn flush(current: &mut BezPath, out: &mut Vec<BezPath>) {
    let path = std::mem::take(current);
    if path.elements().len() > 1 {
        out.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{PathEl, Shape};

    const TWO_LINES: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50" viewBox="0 0 100 50">
        <path d="M10 10 L90 10 M10 40 L90 40" stroke="black" fill="none"/>
    </svg>"#;

    #[test]
    fn test_subpaths_become_ordered_strokes() {
        let drawing = parse_svg_strokes(TWO_LINES.as_bytes()).unwrap();

        assert_eq!(drawing.width, 100.0);
        assert_eq!(drawing.height, 50.0);
        assert_eq!(drawing.stroke_count(), 2);

        let first = drawing.strokes[0].bounding_box();
        let second = drawing.strokes[1].bounding_box();
        assert!((first.y0 - 10.0).abs() < 1e-3);
        assert!((second.y0 - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_group_transform_is_applied() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
            <g transform="translate(20,0)">
                <path d="M0 0 L10 0" stroke="black"/>
            </g>
        </svg>"#;
        let drawing = parse_svg_strokes(svg.as_bytes()).unwrap();

        assert_eq!(drawing.stroke_count(), 1);
        let bbox = drawing.strokes[0].bounding_box();
        assert!((bbox.x0 - 20.0).abs() < 1e-3);
        assert!((bbox.x1 - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_closed_subpath_returns_to_start() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <path d="M1 1 L9 1 L9 9 Z" fill="black"/>
        </svg>"#;
        let drawing = parse_svg_strokes(svg.as_bytes()).unwrap();

        assert_eq!(drawing.stroke_count(), 1);
        let elements = drawing.strokes[0].elements();
        match elements.last() {
            Some(PathEl::LineTo(p)) => {
                assert!((p.x - 1.0).abs() < 1e-3);
                assert!((p.y - 1.0).abs() < 1e-3);
            }
            other => panic!("unexpected final element: {:?}", other),
        }
    }

    #[test]
    fn test_blank_document_has_no_strokes() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;
        let drawing = parse_svg_strokes(svg.as_bytes()).unwrap();
        assert!(drawing.is_empty());
    }

    #[test]
    fn test_invalid_svg_is_an_error() {
        assert!(matches!(
            parse_svg_strokes(b"not an svg"),
            Err(MediaError::Svg(_))
        ));
    }

    #[test]
    fn test_threshold_flattens_alpha_onto_white() {
        let mut rgba = image::RgbaImage::new(3, 1);
        rgba.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        // Transparent black is paper
        rgba.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        rgba.put_pixel(2, 0, image::Rgba([200, 200, 200, 255]));

        let bitmap = threshold_bitmap(&rgba);
        assert_eq!(bitmap.get_pixel(0, 0).0, [0]);
        assert_eq!(bitmap.get_pixel(1, 0).0, [255]);
        assert_eq!(bitmap.get_pixel(2, 0).0, [255]);
    }

    #[tokio::test]
    #[ignore = "requires potrace"]
    async fn test_potrace_traces_a_square() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("square.png");
        let mut img = image::RgbaImage::from_pixel(64, 64, image::Rgba([255, 255, 255, 255]));
        for x in 16..48 {
            for y in 16..48 {
                img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
            }
        }
        img.save(&source).unwrap();

        let drawing = PotraceVectorizer::new()
            .vectorize(&source, dir.path())
            .await
            .unwrap();
        assert!(!drawing.is_empty());
    }
}
