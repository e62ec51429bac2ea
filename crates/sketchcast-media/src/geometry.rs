//! Aspect-preserving fit of a source into the output frame.

use kurbo::{Affine, Vec2};
use sketchcast_models::FrameSize;

/// Placement of a source of size `src` inside a target frame.
///
/// The source is scaled by `min(tw/sw, th/sh)` and centered; the rest of the
/// frame is padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitPlacement {
    pub scale: f64,
    /// Exact scaled size
    pub scaled_width: f64,
    pub scaled_height: f64,
    /// Exact top-left offset of the scaled source
    pub offset_x: f64,
    pub offset_y: f64,
}

impl FitPlacement {
    /// Fit a `src_width` x `src_height` source into `target`.
    pub fn fit(src_width: f64, src_height: f64, target: FrameSize) -> Option<Self> {
        if !(src_width > 0.0 && src_height > 0.0) {
            return None;
        }
        let tw = target.width as f64;
        let th = target.height as f64;
        let scale = (tw / src_width).min(th / src_height);
        let scaled_width = src_width * scale;
        let scaled_height = src_height * scale;

        Some(Self {
            scale,
            scaled_width,
            scaled_height,
            offset_x: (tw - scaled_width) / 2.0,
            offset_y: (th - scaled_height) / 2.0,
        })
    }

    /// Transform from source coordinates into frame coordinates.
    pub fn to_affine(&self) -> Affine {
        Affine::translate(Vec2::new(self.offset_x, self.offset_y)) * Affine::scale(self.scale)
    }

    /// Integer raster placement `(width, height, x, y)` clamped to the frame.
    pub fn pixel_rect(&self, target: FrameSize) -> (u32, u32, u32, u32) {
        let w = (self.scaled_width.round() as u32).clamp(1, target.width);
        let h = (self.scaled_height.round() as u32).clamp(1, target.height);
        let x = (target.width - w) / 2;
        let y = (target.height - h) / 2;
        (w, h, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_landscape_image_into_hd_frame_pillarboxes() {
        let fit = FitPlacement::fit(1536.0, 1024.0, FrameSize::new(1920, 1080)).unwrap();

        // Height is the binding dimension: 1080 / 1024
        assert!((fit.scale - 1.0546875).abs() < 1e-12);
        assert!((fit.scaled_width - 1620.0).abs() < 1e-9);
        assert!((fit.scaled_height - 1080.0).abs() < 1e-9);
        assert!((fit.offset_x - 150.0).abs() < 1e-9);
        assert_eq!(fit.offset_y, 0.0);
        assert_eq!(fit.pixel_rect(FrameSize::new(1920, 1080)), (1620, 1080, 150, 0));
    }

    #[test]
    fn test_wide_source_letterboxes() {
        let fit = FitPlacement::fit(400.0, 100.0, FrameSize::new(1080, 1080)).unwrap();
        assert!((fit.scale - 2.7).abs() < 1e-12);
        assert!((fit.offset_y - 405.0).abs() < 1e-9);
        assert_eq!(fit.offset_x, 0.0);
    }

    #[test]
    fn test_affine_maps_corners_inside_frame() {
        let fit = FitPlacement::fit(1024.0, 1024.0, FrameSize::new(1920, 1080)).unwrap();
        let affine = fit.to_affine();

        let top_left = affine * Point::new(0.0, 0.0);
        let bottom_right = affine * Point::new(1024.0, 1024.0);
        assert!((top_left.x - 420.0).abs() < 1e-9);
        assert!((bottom_right.x - 1500.0).abs() < 1e-9);
        assert!((bottom_right.y - 1080.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_source() {
        assert!(FitPlacement::fit(0.0, 10.0, FrameSize::new(10, 10)).is_none());
        assert!(FitPlacement::fit(f64::NAN, 10.0, FrameSize::new(10, 10)).is_none());
    }
}
