//! Lifecycle tracking of a job's intermediate artifacts.
//!
//! Every intermediate is recorded when stored, marked consumed when the next
//! stage has used it and deleted by a single sweep once the job is done.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sketchcast_models::LocationRef;
use sketchcast_storage::{ArtifactKey, JobStore, StoredObject};

/// Where an intermediate is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Created,
    Consumed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: ArtifactKey,
    pub location: LocationRef,
    pub state: ArtifactState,
}

/// An intermediate the sweep could not delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupFailure {
    pub location: String,
    pub error: String,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub deleted: usize,
    pub failed: Vec<CleanupFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactLedger {
    entries: Vec<LedgerEntry>,
}

impl ArtifactLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly stored intermediate. Final videos are never tracked.
    pub fn record(&mut self, key: ArtifactKey, location: LocationRef) {
        if !key.kind.is_intermediate() {
            return;
        }
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.location = location;
                entry.state = ArtifactState::Created;
            }
            None => self.entries.push(LedgerEntry {
                key,
                location,
                state: ArtifactState::Created,
            }),
        }
    }

    /// Mark an intermediate as used by its downstream stage.
    pub fn consume(&mut self, key: &ArtifactKey) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| &e.key == key && e.state == ArtifactState::Created)
        {
            Some(entry) => {
                entry.state = ArtifactState::Consumed;
                true
            }
            None => false,
        }
    }

    /// Take over stored intermediates this ledger has not seen, such as
    /// uploads from sentences abandoned mid-flight.
    pub fn adopt(&mut self, objects: Vec<StoredObject>) -> usize {
        let mut adopted = 0;
        for object in objects {
            if object.key.kind.is_intermediate() && !self.entries.iter().any(|e| e.key == object.key)
            {
                self.record(object.key, object.location);
                adopted += 1;
            }
        }
        adopted
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn count(&self, state: ArtifactState) -> usize {
        self.entries.iter().filter(|e| e.state == state).count()
    }

    /// Entries not yet deleted.
    pub fn outstanding(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.state != ArtifactState::Deleted)
    }

    /// Delete every outstanding intermediate, trying each up to `attempts` times.
    pub async fn sweep(&mut self, store: &dyn JobStore, attempts: u32) -> SweepReport {
        let mut report = SweepReport::default();
        let attempts = attempts.max(1);

        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.state != ArtifactState::Deleted)
        {
            let mut last_error = None;
            for attempt in 1..=attempts {
                match store.delete(&entry.location).await {
                    Ok(()) => {
                        last_error = None;
                        break;
                    }
                    Err(e) => {
                        debug!(attempt, "Delete of {} failed: {}", entry.location, e);
                        last_error = Some(e.to_string());
                        if attempt < attempts {
                            tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                        }
                    }
                }
            }

            match last_error {
                None => {
                    entry.state = ArtifactState::Deleted;
                    report.deleted += 1;
                }
                Some(error) => {
                    warn!(
                        location = %entry.location,
                        "Intermediate could not be deleted after {} attempts: {}",
                        attempts,
                        error
                    );
                    report.failed.push(CleanupFailure {
                        location: entry.location.uri(),
                        error,
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchcast_models::{ArtifactKind, JobId};
    use sketchcast_storage::LocalStore;
    use tempfile::TempDir;

    async fn stored(
        store: &LocalStore,
        scratch: &TempDir,
        job: &JobId,
        kind: ArtifactKind,
        index: usize,
    ) -> (ArtifactKey, LocationRef) {
        let src = scratch.path().join(format!("{}-{}", kind, index));
        tokio::fs::write(&src, b"x").await.unwrap();
        let key = ArtifactKey::sentence(job, kind, index);
        let location = store.put(&src, &key).await.unwrap();
        (key, location)
    }

    #[tokio::test]
    async fn test_lifecycle_and_sweep() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let store = LocalStore::new(root.path());
        let job = JobId::from_string("ledger-job");

        let mut ledger = ArtifactLedger::new();
        let (audio_key, audio_loc) = stored(&store, &scratch, &job, ArtifactKind::Audio, 0).await;
        let (image_key, image_loc) = stored(&store, &scratch, &job, ArtifactKind::Image, 0).await;
        ledger.record(audio_key.clone(), audio_loc.clone());
        ledger.record(image_key.clone(), image_loc);

        assert!(ledger.consume(&image_key));
        assert!(!ledger.consume(&image_key));
        assert_eq!(ledger.count(ArtifactState::Created), 1);
        assert_eq!(ledger.count(ArtifactState::Consumed), 1);

        let report = ledger.sweep(&store, 3).await;
        assert!(report.is_clean());
        assert_eq!(report.deleted, 2);
        assert_eq!(ledger.outstanding().count(), 0);
        assert!(store.list(&job).await.unwrap().is_empty());

        // A second sweep has nothing left to do
        assert_eq!(ledger.sweep(&store, 3).await.deleted, 0);
    }

    #[tokio::test]
    async fn test_final_video_is_never_tracked() {
        let job = JobId::from_string("j");
        let mut ledger = ArtifactLedger::new();
        ledger.record(
            ArtifactKey::job(&job, ArtifactKind::Final),
            LocationRef::local("/tmp/final.mp4"),
        );
        assert!(ledger.entries().is_empty());
    }

    #[tokio::test]
    async fn test_adopt_listed_objects() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let store = LocalStore::new(root.path());
        let job = JobId::from_string("adopt-job");

        let mut ledger = ArtifactLedger::new();
        let (key, location) = stored(&store, &scratch, &job, ArtifactKind::Audio, 0).await;
        ledger.record(key, location);
        stored(&store, &scratch, &job, ArtifactKind::Audio, 1).await;

        let adopted = ledger.adopt(store.list(&job).await.unwrap());
        assert_eq!(adopted, 1);
        assert_eq!(ledger.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_foreign_locations_are_reported() {
        let root = TempDir::new().unwrap();
        let store = LocalStore::new(root.path());
        let job = JobId::from_string("j");

        let mut ledger = ArtifactLedger::new();
        ledger.record(
            ArtifactKey::sentence(&job, ArtifactKind::Clip, 0),
            LocationRef::remote("j/clip/0000.mp4", "https://example.com/j/clip/0000.mp4"),
        );

        let report = ledger.sweep(&store, 2).await;
        assert!(!report.is_clean());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(ledger.count(ArtifactState::Created), 1);
    }
}
