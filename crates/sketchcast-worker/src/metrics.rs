//! Prometheus metrics for the pipeline.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{PipelineError, PipelineResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "sketchcast_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "sketchcast_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "sketchcast_jobs_failed_total";
    pub const STAGE_DURATION_SECONDS: &str = "sketchcast_stage_duration_seconds";
    pub const DEGRADED_CLIPS_TOTAL: &str = "sketchcast_degraded_clips_total";
    pub const CLEANUP_FAILURES_TOTAL: &str = "sketchcast_cleanup_failures_total";
    pub const FINAL_VIDEO_SECONDS: &str = "sketchcast_final_video_seconds";
}

/// Serve metrics on `addr` from a Prometheus recorder.
pub fn init_metrics(addr: SocketAddr) -> PipelineResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| PipelineError::config(format!("failed to install metrics exporter: {}", e)))
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

pub fn record_job_completed(final_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::FINAL_VIDEO_SECONDS).record(final_secs);
}

pub fn record_job_failed(stage: &'static str) {
    counter!(names::JOBS_FAILED_TOTAL, "stage" => stage).increment(1);
}

pub fn record_stage_duration(stage: &'static str, secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(secs);
}

pub fn record_degraded_clip() {
    counter!(names::DEGRADED_CLIPS_TOTAL).increment(1);
}

pub fn record_cleanup_failures(count: usize) {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(count as u64);
}
