//! Job pipeline: script → sentences → narration ∥ illustration → clips →
//! tracks → final video → cleanup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn, Instrument};

use sketchcast_media::MediaBackend;
use sketchcast_models::{AudioSegment, Clip, FinalVideo, Job, JobRequest, JobState, ScriptSource};
use sketchcast_providers::{Illustrator, Narrator, ScriptWriter};
use sketchcast_storage::JobStore;

use crate::config::WorkerConfig;
use crate::error::{Degradation, JobError, PipelineError, PipelineResult};
use crate::ledger::{ArtifactLedger, SweepReport};
use crate::metrics;
use crate::plan::{plan_job, JobSettings};
use crate::script::split_sentences;
use crate::stages::assembly::{self, LocalTracks, MuxedOutput, StoredTracks};
use crate::stages::{delivery, illustration, narration, render, JobContext};

/// Outcome of a delivered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job: Job,
    pub final_video: FinalVideo,
    pub degradations: Vec<Degradation>,
    pub cleanup: SweepReport,
}

/// Everything kept after a mux or delivery failure.
///
/// Serializable so an operator can resume in a later process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetainedJob {
    pub job: Job,
    pub settings: JobSettings,
    pub ledger: ArtifactLedger,
    pub audio: Vec<AudioSegment>,
    pub clips: Vec<Clip>,
    /// Concatenated tracks, when they were produced and stored
    pub tracks: Option<StoredTracks>,
    /// Muxed output awaiting delivery
    pub muxed: Option<MuxedOutput>,
    pub degradations: Vec<Degradation>,
    pub scratch_dir: PathBuf,
}

/// Per-job results carried from assembly to delivery.
struct Progress {
    audio: Vec<AudioSegment>,
    clips: Vec<Clip>,
    tracks: Option<StoredTracks>,
    muxed: Option<MuxedOutput>,
    degradations: Vec<Degradation>,
}

/// Runs jobs against a fixed set of capabilities.
pub struct Pipeline {
    pub(crate) config: WorkerConfig,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) media: Arc<dyn MediaBackend>,
    pub(crate) narrator: Arc<dyn Narrator>,
    pub(crate) illustrator: Arc<dyn Illustrator>,
    pub(crate) script_writer: Option<Arc<dyn ScriptWriter>>,
}

impl Pipeline {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn JobStore>,
        media: Arc<dyn MediaBackend>,
        narrator: Arc<dyn Narrator>,
        illustrator: Arc<dyn Illustrator>,
    ) -> Self {
        Self {
            config,
            store,
            media,
            narrator,
            illustrator,
            script_writer: None,
        }
    }

    /// Enable topic requests.
    pub fn with_script_writer(mut self, writer: Arc<dyn ScriptWriter>) -> Self {
        self.script_writer = Some(writer);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Run one job to completion.
    ///
    /// Any failure is returned as a [`JobError`]; mux and delivery failures
    /// carry a [`RetainedJob`] for [`Pipeline::resume`].
    pub async fn run(&self, request: JobRequest) -> Result<JobReport, JobError> {
        let job_id = request.job_id.clone().unwrap_or_default();
        metrics::record_job_started();

        let rejected = |error: PipelineError| {
            metrics::record_job_failed(error.stage());
            warn!(job_id = %job_id, "Job rejected: {}", error);
            JobError::new(job_id.clone(), JobState::Failed, error)
        };

        let script = self.resolve_script(&request).await.map_err(rejected)?;
        let sentences = split_sentences(&script);
        let (job, settings) = plan_job(job_id.clone(), sentences, &request, &self.config.render)
            .map_err(rejected)?;
        let ctx = JobContext::create(job, settings, &self.config.work_dir, ArtifactLedger::new())
            .await
            .map_err(|e| rejected(e.into()))?;

        let span = ctx.logger.create_span();
        self.execute(ctx).instrument(span).await
    }

    /// Retry a job that failed at mux or delivery, reusing what it kept.
    pub async fn resume(&self, retained: RetainedJob) -> Result<JobReport, JobError> {
        let RetainedJob {
            mut job,
            settings,
            ledger,
            audio,
            clips,
            tracks,
            muxed,
            degradations,
            scratch_dir: _,
        } = retained;

        job.completed_at = None;
        let job_id = job.id.clone();
        let mut ctx = JobContext::create(job, settings, &self.config.work_dir, ledger)
            .await
            .map_err(|e| JobError::new(job_id, JobState::Failed, e.into()))?;
        ctx.job.transition(JobState::Running);
        ctx.logger.log_start("resuming from retained intermediates");

        let progress = Progress {
            audio,
            clips,
            tracks,
            muxed,
            degradations,
        };
        let span = ctx.logger.create_span();
        self.complete(ctx, progress, None).instrument(span).await
    }

    async fn resolve_script(&self, request: &JobRequest) -> PipelineResult<String> {
        match &request.source {
            ScriptSource::Text { script } => Ok(script.clone()),
            ScriptSource::Topic { topic, style } => {
                let writer = self.script_writer.as_ref().ok_or_else(|| {
                    PipelineError::config("topic requests need a script writer")
                })?;
                writer
                    .generate_script(topic, style)
                    .await
                    .map_err(PipelineError::script_generation_failed)
            }
        }
    }

    async fn execute(&self, mut ctx: JobContext) -> Result<JobReport, JobError> {
        ctx.job.transition(JobState::Running);
        ctx.logger.log_start(&format!(
            "{} sentences, labels on {:?}",
            ctx.job.sentence_count(),
            ctx.settings.labels.indices()
        ));

        let started = Instant::now();
        let produced = match self.produce_clips(&ctx).await {
            Ok(produced) => produced,
            Err(e) => return Err(self.abandon(ctx, e).await),
        };
        metrics::record_stage_duration("sentences", started.elapsed().as_secs_f64());

        let (audio, clips): (Vec<AudioSegment>, Vec<Clip>) = produced.into_iter().unzip();
        let degradations: Vec<Degradation> = clips
            .iter()
            .filter(|c| c.degraded)
            .map(|c| Degradation::VectorizationDegraded {
                sentence_index: c.sentence_index,
            })
            .collect();
        for degradation in &degradations {
            ctx.logger.log_warning(&degradation.to_string());
        }

        let progress = Progress {
            audio,
            clips,
            tracks: None,
            muxed: None,
            degradations,
        };

        let started = Instant::now();
        let tracks = match assembly::sequence(self, &ctx, &progress.clips, &progress.audio).await {
            Ok(tracks) => tracks,
            Err(PipelineError::NoClipsProduced) => {
                return Err(self.abandon(ctx, PipelineError::NoClipsProduced).await)
            }
            Err(e) => return Err(self.retain(ctx, e, progress).await),
        };
        metrics::record_stage_duration("sequence", started.elapsed().as_secs_f64());

        self.complete(ctx, progress, Some(tracks)).await
    }

    /// Narrate and illustrate every sentence, then render its clip.
    ///
    /// Results come back in sentence order. The first failure cancels the
    /// remaining sentences.
    async fn produce_clips(&self, ctx: &JobContext) -> PipelineResult<Vec<(AudioSegment, Clip)>> {
        let sentence_permits = Semaphore::new(self.config.max_sentence_parallel.max(1));
        let render_permits = Semaphore::new(self.config.max_render_parallel.max(1));

        let sentences = ctx.job.sentences.iter().map(|sentence| {
            let sentence_permits = &sentence_permits;
            let render_permits = &render_permits;
            async move {
                let (audio, image) = {
                    let _permit = sentence_permits
                        .acquire()
                        .await
                        .map_err(|_| PipelineError::config("sentence limiter closed"))?;
                    tokio::try_join!(
                        narration::narrate(self, ctx, sentence),
                        illustration::illustrate(self, ctx, sentence)
                    )?
                };

                let clip = {
                    let _permit = render_permits
                        .acquire()
                        .await
                        .map_err(|_| PipelineError::config("render limiter closed"))?;
                    render::render_clip(self, ctx, &audio, &image).await?
                };

                ctx.logger.log_progress(&format!(
                    "sentence {} ready ({:.2}s narration, {:.2}s clip)",
                    sentence.index, audio.duration_secs, clip.duration_secs
                ));
                Ok::<_, PipelineError>((audio, clip))
            }
        });

        try_join_all(sentences).await
    }

    /// Mux (unless already muxed), deliver and sweep.
    async fn complete(
        &self,
        mut ctx: JobContext,
        mut progress: Progress,
        local: Option<LocalTracks>,
    ) -> Result<JobReport, JobError> {
        let started = Instant::now();
        let muxed = match progress.muxed.take().filter(|m| m.path.exists()) {
            Some(muxed) => muxed,
            None => {
                let local = match local {
                    Some(local) => local,
                    None => {
                        let loaded = match &progress.tracks {
                            Some(stored) => assembly::load_tracks(self, &ctx, stored).await,
                            None => {
                                assembly::sequence(self, &ctx, &progress.clips, &progress.audio)
                                    .await
                            }
                        };
                        match loaded {
                            Ok(local) => local,
                            Err(e) => return Err(self.retain(ctx, e, progress).await),
                        }
                    }
                };

                match assembly::mux(self, &ctx, &local).await {
                    Ok(muxed) => muxed,
                    Err(e) => {
                        if progress.tracks.is_none() {
                            progress.tracks = assembly::store_tracks(self, &ctx, &local).await;
                        }
                        return Err(self.retain(ctx, e, progress).await);
                    }
                }
            }
        };
        metrics::record_stage_duration("mux", started.elapsed().as_secs_f64());

        let started = Instant::now();
        let final_video = match delivery::deliver(self, &ctx, &muxed).await {
            Ok(final_video) => final_video,
            Err(e) => {
                progress.muxed = Some(muxed);
                return Err(self.retain(ctx, e, progress).await);
            }
        };
        metrics::record_stage_duration("delivery", started.elapsed().as_secs_f64());

        let cleanup = self.sweep(&mut ctx).await;
        ctx.remove_scratch().await;

        let state = if cleanup.is_clean() {
            JobState::Completed
        } else {
            JobState::PartiallyCleaned
        };
        ctx.job.transition(state);

        metrics::record_job_completed(final_video.duration_secs);
        info!(
            job_id = %ctx.job.id,
            duration_secs = final_video.duration_secs,
            location = %final_video.location,
            state = %state,
            "Final video delivered"
        );
        ctx.logger.log_completion(&format!(
            "{:.2}s video, {} intermediates deleted",
            final_video.duration_secs, cleanup.deleted
        ));

        Ok(JobReport {
            job: ctx.job,
            final_video,
            degradations: progress.degradations,
            cleanup,
        })
    }

    async fn sweep(&self, ctx: &mut JobContext) -> SweepReport {
        let started = Instant::now();
        let report = ctx
            .ledger
            .get_mut()
            .sweep(self.store.as_ref(), self.config.cleanup_attempts)
            .await;
        if !report.is_clean() {
            metrics::record_cleanup_failures(report.failed.len());
        }
        metrics::record_stage_duration("cleanup", started.elapsed().as_secs_f64());
        report
    }

    /// Fail the job and delete everything it stored.
    async fn abandon(&self, mut ctx: JobContext, error: PipelineError) -> JobError {
        ctx.logger.log_error(&error.to_string());

        // Sentences cancelled mid-upload may have stored artifacts the ledger never saw
        match self.store.list(&ctx.job.id).await {
            Ok(objects) => {
                ctx.ledger.get_mut().adopt(objects);
            }
            Err(e) => ctx
                .logger
                .log_warning(&format!("could not list stored artifacts: {}", e)),
        }

        let cleanup = self.sweep(&mut ctx).await;
        ctx.remove_scratch().await;

        let state = if cleanup.is_clean() {
            JobState::Failed
        } else {
            JobState::PartiallyCleaned
        };
        ctx.job.transition(state);
        metrics::record_job_failed(error.stage());

        JobError::new(ctx.job.id.clone(), state, error)
    }

    /// Fail the job but keep its intermediates for a retry.
    async fn retain(&self, mut ctx: JobContext, error: PipelineError, progress: Progress) -> JobError {
        ctx.logger.log_error(&format!(
            "{}; intermediates retained for retry",
            error
        ));
        ctx.job.transition(JobState::PartiallyCleaned);
        metrics::record_job_failed(error.stage());

        let retained = RetainedJob {
            ledger: ctx.ledger_snapshot().await,
            job: ctx.job.clone(),
            settings: ctx.settings.clone(),
            audio: progress.audio,
            clips: progress.clips,
            tracks: progress.tracks,
            muxed: progress.muxed,
            degradations: progress.degradations,
            scratch_dir: ctx.scratch.clone(),
        };

        JobError::new(ctx.job.id.clone(), JobState::PartiallyCleaned, error).with_retained(retained)
    }
}
