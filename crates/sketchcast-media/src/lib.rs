//! FFmpeg, FFprobe and potrace wrappers for the Sketchcast pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Media probing for measured narration and clip durations
//! - Raster to stroke vectorization via potrace and usvg
//! - Progressive stroke reveal rendered on a CPU canvas
//! - Ordered concatenation and the final audio/video mux

pub mod backend;
pub mod canvas;
pub mod clip;
pub mod command;
pub mod concat;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod mux;
pub mod probe;
pub mod reveal;
pub mod timing;
pub mod vector;

pub use backend::{ClipRequest, FfmpegMedia, MediaBackend};
pub use clip::{fit_on_white, render_reveal_clip, render_still_clip, RenderedClip};
pub use command::{check_ffmpeg, check_ffprobe, check_potrace, FfmpegCommand, FfmpegRunner};
pub use concat::{concat_audio, concat_list_contents, concat_video};
pub use error::{MediaError, MediaResult};
pub use geometry::FitPlacement;
pub use mux::mux_audio_video;
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use reveal::{RevealFrame, RevealPlan};
pub use timing::ClipTiming;
pub use vector::{parse_svg_strokes, PotraceVectorizer, VectorDrawing, Vectorizer};
