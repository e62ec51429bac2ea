//! Progressive reveal of strokes by arc length.

use kurbo::{BezPath, ParamCurve, ParamCurveArclen, PathSeg};

/// Arc length accuracy in output pixels.
const ARCLEN_ACCURACY: f64 = 0.25;

/// What is visible at one point of the reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealFrame {
    /// Strokes `0..completed` are fully drawn
    pub completed: usize,
    /// Leading part of stroke `completed`, if it has started
    pub partial: Option<BezPath>,
}

/// Strokes with their cumulative lengths, revealed as one continuous pen.
#[derive(Debug, Clone)]
pub struct RevealPlan {
    strokes: Vec<BezPath>,
    /// `ends[i]` is the pen distance at which stroke `i` is complete
    ends: Vec<f64>,
}

impl RevealPlan {
    pub fn new(strokes: Vec<BezPath>) -> Self {
        let mut ends = Vec::with_capacity(strokes.len());
        let mut total = 0.0;
        for stroke in &strokes {
            total += stroke_length(stroke);
            ends.push(total);
        }
        Self { strokes, ends }
    }

    pub fn strokes(&self) -> &[BezPath] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn total_length(&self) -> f64 {
        self.ends.last().copied().unwrap_or(0.0)
    }

    /// Visible state at `progress` in `[0, 1]`.
    pub fn frame_at(&self, progress: f64) -> RevealFrame {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        if progress >= 1.0 {
            return RevealFrame {
                completed: self.strokes.len(),
                partial: None,
            };
        }

        let total = self.total_length();
        if total <= 0.0 {
            // Nothing has length; show strokes proportionally by count
            let completed = (progress * self.strokes.len() as f64).floor() as usize;
            return RevealFrame {
                completed,
                partial: None,
            };
        }

        let target = progress * total;
        let completed = self.ends.partition_point(|end| *end <= target);
        let partial = self.strokes.get(completed).and_then(|stroke| {
            let start = if completed == 0 {
                0.0
            } else {
                self.ends[completed - 1]
            };
            trim_to_length(stroke, target - start)
        });

        RevealFrame { completed, partial }
    }
}

/// Total arc length of one stroke.
pub fn stroke_length(path: &BezPath) -> f64 {
    path.segments()
        .map(|seg| seg.arclen(ARCLEN_ACCURACY))
        .sum()
}

/// Leading part of `path` with arc length `length`.
pub fn trim_to_length(path: &BezPath, length: f64) -> Option<BezPath> {
    if length <= 0.0 {
        return None;
    }

    let mut remaining = length;
    let mut kept: Vec<PathSeg> = Vec::new();
    for seg in path.segments() {
        let seg_len = seg.arclen(ARCLEN_ACCURACY);
        if seg_len <= remaining {
            kept.push(seg);
            remaining -= seg_len;
            continue;
        }
        let t = seg.inv_arclen(remaining, ARCLEN_ACCURACY);
        if t > 0.0 {
            kept.push(seg.subsegment(0.0..t));
        }
        break;
    }

    if kept.is_empty() {
        None
    } else {
        Some(BezPath::from_path_segments(kept.into_iter()))
    }
}
