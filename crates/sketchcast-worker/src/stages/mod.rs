//! Pipeline stages.
//!
//! Each stage takes the pipeline's capabilities and the job context, and
//! records what it stores in the job's ledger.

pub(crate) mod assembly;
pub(crate) mod delivery;
pub(crate) mod illustration;
pub(crate) mod narration;
pub(crate) mod render;

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use sketchcast_models::{Job, LocationRef};
use sketchcast_storage::ArtifactKey;

use crate::ledger::ArtifactLedger;
use crate::logging::JobLogger;
use crate::plan::JobSettings;

const SCRATCH_DIRS: [&str; 4] = ["narration", "illustration", "clips", "tracks"];

/// State shared by the stages of one job.
pub(crate) struct JobContext {
    pub job: Job,
    pub settings: JobSettings,
    /// Job-scoped scratch directory
    pub scratch: PathBuf,
    pub ledger: Mutex<ArtifactLedger>,
    pub logger: JobLogger,
}

impl JobContext {
    pub async fn create(
        job: Job,
        settings: JobSettings,
        work_dir: &Path,
        ledger: ArtifactLedger,
    ) -> std::io::Result<Self> {
        let scratch = work_dir.join(job.id.as_str());
        for dir in SCRATCH_DIRS {
            tokio::fs::create_dir_all(scratch.join(dir)).await?;
        }
        let logger = JobLogger::new(&job.id, "sketch_video");
        Ok(Self {
            job,
            settings,
            scratch,
            ledger: Mutex::new(ledger),
            logger,
        })
    }

    /// Sentence-scoped scratch file, e.g. `clips/0003.mp4`.
    pub fn sentence_file(&self, dir: &str, index: usize, extension: &str) -> PathBuf {
        self.scratch
            .join(dir)
            .join(format!("{:04}.{}", index, extension))
    }

    pub fn track_file(&self, name: &str) -> PathBuf {
        self.scratch.join("tracks").join(name)
    }

    pub async fn record(&self, key: ArtifactKey, location: LocationRef) {
        self.ledger.lock().await.record(key, location);
    }

    pub async fn consume(&self, key: &ArtifactKey) {
        self.ledger.lock().await.consume(key);
    }

    pub async fn ledger_snapshot(&self) -> ArtifactLedger {
        self.ledger.lock().await.clone()
    }

    /// Remove the scratch directory, logging rather than failing.
    pub async fn remove_scratch(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.scratch).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.logger.log_warning(&format!(
                    "failed to remove scratch directory {}: {}",
                    self.scratch.display(),
                    e
                ));
            }
        }
    }
}
