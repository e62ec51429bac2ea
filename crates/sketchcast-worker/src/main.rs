//! Sketchcast command-line worker.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use sketchcast_media::{check_potrace, FfmpegMedia, MediaBackend};
use sketchcast_models::{
    DriftPolicy, HoldMode, ImageQuality, JobId, JobRequest, ScriptSource, VideoFormat,
    VoiceConfig,
};
use sketchcast_providers::ProvidersConfig;
use sketchcast_storage::StorageConfig;
use sketchcast_worker::{logging, metrics, Pipeline, RetainedJob, WorkerConfig};

#[derive(Debug, Parser)]
#[command(name = "sketchcast", version, about = "Narrated whiteboard videos from a script or topic")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one video
    Render(RenderArgs),
    /// Retry a job that failed at mux or delivery
    Resume {
        /// Retained-job file written by a failed render
        retained: PathBuf,
    },
    /// List narration voices
    Voices,
    /// List every stored artifact of a job
    Files {
        job_id: String,
    },
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Script text
    #[arg(long, conflicts_with_all = ["script_file", "topic"])]
    script: Option<String>,

    /// File holding the script text
    #[arg(long, conflicts_with = "topic")]
    script_file: Option<PathBuf>,

    /// Topic to generate a script for
    #[arg(long)]
    topic: Option<String>,

    /// Script style for generated scripts
    #[arg(long, default_value = "educational")]
    style: String,

    #[arg(long, env = "DEFAULT_VOICE")]
    voice: Option<String>,

    #[arg(long, env = "DEFAULT_AUDIO_MODEL")]
    audio_model: Option<String>,

    /// low, medium or high
    #[arg(long, default_value = "medium")]
    quality: String,

    /// landscape or square
    #[arg(long, default_value = "landscape")]
    format: String,

    #[arg(long)]
    job_id: Option<String>,

    /// global or per_clip
    #[arg(long)]
    drift_policy: Option<String>,

    /// contained or additive
    #[arg(long)]
    hold_mode: Option<String>,
}

impl RenderArgs {
    async fn request(&self) -> anyhow::Result<JobRequest> {
        let source = match (&self.script, &self.script_file, &self.topic) {
            (Some(script), _, _) => ScriptSource::text(script),
            (None, Some(path), _) => ScriptSource::text(
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
            ),
            (None, None, Some(topic)) => ScriptSource::Topic {
                topic: topic.clone(),
                style: self.style.clone(),
            },
            (None, None, None) => bail!("one of --script, --script-file or --topic is required"),
        };

        let mut voice = VoiceConfig::default();
        if let Some(voice_id) = &self.voice {
            voice.voice_id = voice_id.clone();
        }
        if let Some(model_id) = &self.audio_model {
            voice.model_id = model_id.clone();
        }

        let mut request = JobRequest::new(source)
            .with_voice(voice)
            .with_video_format(self.format.parse::<VideoFormat>()?);
        request.image_quality = self.quality.parse::<ImageQuality>()?;
        if let Some(job_id) = &self.job_id {
            request = request.with_job_id(JobId::from_string(job_id));
        }
        Ok(request)
    }

    fn apply_render_overrides(&self, config: &mut WorkerConfig) -> anyhow::Result<()> {
        if let Some(policy) = &self.drift_policy {
            config.render.drift_policy = policy.parse::<DriftPolicy>()?;
        }
        if let Some(mode) = &self.hold_mode {
            config.render.hold_mode = mode.parse::<HoldMode>()?;
        }
        Ok(())
    }
}

fn build_pipeline(config: WorkerConfig, with_script_writer: bool) -> anyhow::Result<Pipeline> {
    let store = StorageConfig::from_env()?.build()?;

    let media = FfmpegMedia::default().with_timeout(config.ffmpeg_timeout_secs);
    media.ensure_tools()?;
    if let Err(e) = check_potrace() {
        warn!("{}; every clip will be a still image", e);
    }
    let media: Arc<dyn MediaBackend> = Arc::new(media);

    let providers = ProvidersConfig::from_env()?;
    let mut pipeline = Pipeline::new(
        config,
        store,
        media,
        providers.narrator()?,
        providers.illustrator()?,
    );
    if with_script_writer {
        pipeline = pipeline.with_script_writer(providers.script_writer()?);
    }
    Ok(pipeline)
}

async fn render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = WorkerConfig::from_env()?;
    args.apply_render_overrides(&mut config)?;
    let request = args.request().await?;
    let needs_writer = matches!(request.source, ScriptSource::Topic { .. });
    let pipeline = build_pipeline(config, needs_writer)?;

    match pipeline.run(request).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            if let Some(retained) = &err.retained {
                let path = save_retained(&pipeline, retained).await?;
                error!("{}", err);
                bail!(
                    "job {} failed; resume with `sketchcast resume {}`",
                    err.job_id,
                    path.display()
                );
            }
            Err(err.into())
        }
    }
}

async fn save_retained(pipeline: &Pipeline, retained: &RetainedJob) -> anyhow::Result<PathBuf> {
    let dir = &pipeline.config().work_dir;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.retained.json", retained.job.id));
    tokio::fs::write(&path, serde_json::to_vec_pretty(retained)?).await?;
    Ok(path)
}

async fn resume(path: PathBuf) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let retained: RetainedJob = serde_json::from_slice(&bytes)?;
    let pipeline = build_pipeline(WorkerConfig::from_env()?, false)?;

    match pipeline.resume(retained).await {
        Ok(report) => {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("could not remove {}: {}", path.display(), e);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(err) => {
            if let Some(retained) = &err.retained {
                save_retained(&pipeline, retained).await?;
            }
            Err(err.into())
        }
    }
}

async fn voices() -> anyhow::Result<()> {
    let narrator = ProvidersConfig::from_env()?.narrator()?;
    for voice in narrator.list_voices().await? {
        println!("{}\t{}\t{}", voice.id, voice.name, voice.category);
    }
    Ok(())
}

async fn files(job_id: String) -> anyhow::Result<()> {
    let store = StorageConfig::from_env()?.build()?;
    let objects = store.list(&JobId::from_string(job_id)).await?;
    if objects.is_empty() {
        info!("No stored artifacts");
    }
    for object in objects {
        let index = object
            .key
            .index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}\t{}",
            object.key.kind, index, object.size, object.location
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // TLS for the provider and S3 clients
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenvy::dotenv().ok();
    logging::init_tracing();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid METRICS_ADDR '{}'", addr))?;
        metrics::init_metrics(addr)?;
        info!("Serving metrics on {}", addr);
    }

    match Cli::parse().command {
        Command::Render(args) => render(args).await,
        Command::Resume { retained } => resume(retained).await,
        Command::Voices => voices().await,
        Command::Files { job_id } => files(job_id).await,
    }
}
