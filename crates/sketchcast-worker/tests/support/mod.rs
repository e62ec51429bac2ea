//! Deterministic fakes of every pipeline capability.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use sketchcast_media::{ClipRequest, MediaBackend, MediaError, MediaResult, RenderedClip};
use sketchcast_models::{ArtifactKind, JobId, LocationRef, VoiceConfig};
use sketchcast_providers::{
    IllustrationRequest, Illustrator, Narrator, ProviderError, ProviderResult, ScriptWriter, Voice,
};
use sketchcast_storage::{
    ArtifactKey, JobStore, LocalStore, StorageError, StorageResult, StoredObject,
};
use sketchcast_worker::{Pipeline, WorkerConfig};

/// Narration whose "audio" is a text line carrying its duration.
#[derive(Default)]
pub struct FakeNarrator {
    pub durations: HashMap<String, f64>,
    pub delays_ms: HashMap<String, u64>,
    pub fail_on: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeNarrator {
    pub fn with_durations(pairs: &[(&str, f64)]) -> Self {
        Self {
            durations: pairs.iter().map(|(t, d)| (t.to_string(), *d)).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Narrator for FakeNarrator {
    async fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> ProviderResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays_ms.get(text) {
            tokio::time::sleep(Duration::from_millis(*delay)).await;
        }
        if self.fail_on.as_deref() == Some(text) {
            return Err(ProviderError::Api {
                provider: "fake",
                status: 500,
                body: "speech backend down".to_string(),
            });
        }
        let secs = self.durations.get(text).copied().unwrap_or(2.0);
        Ok(format!("AUDIO {} {}\n", secs, text).into_bytes())
    }

    async fn list_voices(&self) -> ProviderResult<Vec<Voice>> {
        Ok(sketchcast_providers::default_voices())
    }
}

/// Illustration returning a tiny white PNG.
#[derive(Default)]
pub struct FakeIllustrator {
    pub fail_on_prompt_containing: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut buf, image::ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[async_trait]
impl Illustrator for FakeIllustrator {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn illustrate(&self, request: &IllustrationRequest) -> ProviderResult<Vec<u8>> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if let Some(needle) = &self.fail_on_prompt_containing {
            if request.prompt.contains(needle.as_str()) {
                return Err(ProviderError::invalid_response("fake", "no image"));
            }
        }
        Ok(png_bytes(12, 8))
    }
}

pub struct FakeScriptWriter(pub String);

#[async_trait]
impl ScriptWriter for FakeScriptWriter {
    async fn generate_script(&self, _topic: &str, _style: &str) -> ProviderResult<String> {
        Ok(self.0.clone())
    }
}

/// Media where every file is text: `AUDIO <secs> <text>` and `CLIP <index> <secs>` lines.
#[derive(Default)]
pub struct FakeMedia {
    pub degrade: HashSet<usize>,
    pub mux_failures: AtomicUsize,
    pub mux_calls: AtomicUsize,
    pub rendered: Mutex<Vec<(usize, f64)>>,
    pub audio_concats: Mutex<Vec<String>>,
}

fn read_text(path: &Path) -> MediaResult<String> {
    std::fs::read_to_string(path).map_err(|_| MediaError::FileNotFound(path.to_path_buf()))
}

fn concat_files(inputs: &[PathBuf], output: &Path) -> MediaResult<String> {
    let mut joined = String::new();
    for input in inputs {
        joined.push_str(&read_text(input)?);
    }
    std::fs::write(output, &joined)?;
    Ok(joined)
}

#[async_trait]
impl MediaBackend for FakeMedia {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        let text = read_text(path)?;
        Ok(text
            .lines()
            .filter_map(|line| line.strip_prefix("AUDIO "))
            .filter_map(|rest| rest.split_whitespace().next())
            .filter_map(|secs| secs.parse::<f64>().ok())
            .sum())
    }

    async fn render_clip(&self, request: ClipRequest) -> MediaResult<RenderedClip> {
        if !request.image.exists() {
            return Err(MediaError::FileNotFound(request.image));
        }
        let fps = request.settings.fps;
        let duration_secs = request.timing.encoded_secs(fps);
        std::fs::write(
            &request.output,
            format!("CLIP {} {}\n", request.sentence_index, duration_secs),
        )?;
        self.rendered
            .lock()
            .unwrap()
            .push((request.sentence_index, duration_secs));

        let degraded = self.degrade.contains(&request.sentence_index);
        Ok(RenderedClip {
            duration_secs,
            frames: request.timing.total_frames(fps),
            stroke_count: if degraded { 0 } else { 12 },
            degraded,
        })
    }

    async fn concat_video(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()> {
        concat_files(clips, output).map(|_| ())
    }

    async fn concat_audio(&self, segments: &[PathBuf], output: &Path) -> MediaResult<()> {
        let joined = concat_files(segments, output)?;
        self.audio_concats.lock().unwrap().push(joined);
        Ok(())
    }

    async fn mux(
        &self,
        video: &Path,
        _audio: &Path,
        output: &Path,
        audio_secs: f64,
    ) -> MediaResult<f64> {
        self.mux_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.mux_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.mux_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MediaError::internal("mux exploded"));
        }
        let video = read_text(video)?;
        std::fs::write(output, format!("FINAL {}\n{}", audio_secs, video))?;
        Ok(audio_secs)
    }
}

/// Local store that can refuse final uploads or deletes.
pub struct FlakyStore {
    pub inner: LocalStore,
    pub final_put_failures: AtomicUsize,
    pub fail_deletes: bool,
}

impl FlakyStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalStore::new(root),
            final_put_failures: AtomicUsize::new(0),
            fail_deletes: false,
        }
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    async fn put(&self, local: &Path, key: &ArtifactKey) -> StorageResult<LocationRef> {
        if key.kind == ArtifactKind::Final {
            let remaining = self.final_put_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.final_put_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::upload_failed("bucket unavailable"));
            }
        }
        self.inner.put(local, key).await
    }

    async fn get(&self, location: &LocationRef) -> StorageResult<Vec<u8>> {
        self.inner.get(location).await
    }

    async fn materialize(&self, location: &LocationRef, scratch_dir: &Path) -> StorageResult<PathBuf> {
        self.inner.materialize(location, scratch_dir).await
    }

    async fn list(&self, job_id: &JobId) -> StorageResult<Vec<StoredObject>> {
        self.inner.list(job_id).await
    }

    async fn delete(&self, location: &LocationRef) -> StorageResult<()> {
        if self.fail_deletes {
            return Err(StorageError::delete_failed("permission denied"));
        }
        self.inner.delete(location).await
    }
}

/// A pipeline wired to fakes, with its directories.
pub struct Harness {
    pub work: TempDir,
    pub root: TempDir,
    pub narrator: Arc<FakeNarrator>,
    pub illustrator: Arc<FakeIllustrator>,
    pub media: Arc<FakeMedia>,
    pub store: Arc<FlakyStore>,
}

impl Harness {
    pub fn new(narrator: FakeNarrator, media: FakeMedia) -> Self {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let store = Arc::new(FlakyStore::new(root.path()));
        Self {
            work,
            root,
            narrator: Arc::new(narrator),
            illustrator: Arc::new(FakeIllustrator::default()),
            media: Arc::new(media),
            store,
        }
    }

    pub fn with_illustrator(mut self, illustrator: FakeIllustrator) -> Self {
        self.illustrator = Arc::new(illustrator);
        self
    }

    pub fn config(&self) -> WorkerConfig {
        WorkerConfig::default().with_work_dir(self.work.path())
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with(self.config())
    }

    pub fn pipeline_with(&self, config: WorkerConfig) -> Pipeline {
        Pipeline::new(
            config,
            self.store.clone(),
            self.media.clone(),
            self.narrator.clone(),
            self.illustrator.clone(),
        )
    }

    pub async fn stored_kinds(&self, job_id: &JobId) -> Vec<ArtifactKind> {
        self.store
            .list(job_id)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key.kind)
            .collect()
    }
}
