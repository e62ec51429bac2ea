//! Sketchcast job pipeline.
//!
//! Turns a script or topic into a narrated whiteboard video: split the script,
//! narrate and illustrate every sentence, render reveal clips, concatenate
//! in sentence order, mux against the narration and deliver to the job store.

pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod plan;
pub mod script;
mod stages;

pub use config::WorkerConfig;
pub use error::{Degradation, JobError, PipelineError, PipelineResult};
pub use ledger::{ArtifactLedger, ArtifactState, SweepReport};
pub use logging::JobLogger;
pub use pipeline::{JobReport, Pipeline, RetainedJob};
pub use plan::{plan_job, JobSettings};
pub use script::split_sentences;
pub use stages::assembly::{MuxedOutput, StoredTracks};
