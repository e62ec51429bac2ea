mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use sketchcast_models::{ArtifactKind, DriftPolicy, JobId, JobRequest, JobState, RenderSettings, ScriptSource};
use sketchcast_worker::{Degradation, PipelineError, RetainedJob};

use support::{FakeIllustrator, FakeMedia, FakeNarrator, FakeScriptWriter, Harness};

const SCRIPT: &str = "Arrays store data. Arrays have indices.";

fn durations() -> FakeNarrator {
    FakeNarrator::with_durations(&[("Arrays store data.", 2.0), ("Arrays have indices.", 1.5)])
}

fn request(job_id: &str, script: &str) -> JobRequest {
    let mut request = JobRequest::new(ScriptSource::text(script));
    request.job_id = Some(JobId::from_string(job_id));
    request
}

#[tokio::test]
async fn test_two_sentence_job_matches_narration() {
    let harness = Harness::new(durations(), FakeMedia::default());
    let report = harness.pipeline().run(request("job-ok", SCRIPT)).await.unwrap();

    assert_eq!(report.job.state, JobState::Completed);
    assert!((report.final_video.duration_secs - 3.5).abs() < 1e-9);
    assert!(report.degradations.is_empty());
    assert!(report.cleanup.is_clean());

    let mut rendered = harness.media.rendered.lock().unwrap().clone();
    rendered.sort_by_key(|(index, _)| *index);
    assert_eq!(rendered, vec![(0, 2.0), (1, 1.5)]);

    // Narration concatenated in sentence order
    let concats = harness.media.audio_concats.lock().unwrap().clone();
    assert_eq!(
        concats,
        vec!["AUDIO 2 Arrays store data.\nAUDIO 1.5 Arrays have indices.\n".to_string()]
    );

    let job_id = JobId::from_string("job-ok");
    assert_eq!(harness.stored_kinds(&job_id).await, vec![ArtifactKind::Final]);
    assert!(!harness.work.path().join("job-ok").exists());
}

#[tokio::test]
async fn test_out_of_order_completion_keeps_sentence_order() {
    let mut narrator = durations();
    narrator.delays_ms.insert("Arrays store data.".to_string(), 80);
    let harness = Harness::new(narrator, FakeMedia::default());

    harness.pipeline().run(request("job-slow", SCRIPT)).await.unwrap();

    let concats = harness.media.audio_concats.lock().unwrap().clone();
    assert!(concats[0].starts_with("AUDIO 2 Arrays store data."));
}

#[tokio::test]
async fn test_short_narration_gets_minimum_clip() {
    let narrator = FakeNarrator::with_durations(&[("Yes, indeed.", 0.3)]);
    let harness = Harness::new(narrator, FakeMedia::default());

    let report = harness
        .pipeline()
        .run(request("job-short", "Yes, indeed."))
        .await
        .unwrap();

    let rendered = harness.media.rendered.lock().unwrap().clone();
    assert_eq!(rendered, vec![(0, 1.0)]);
    // Final video follows the narration, not the clip
    assert!((report.final_video.duration_secs - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn test_per_clip_policy_matches_each_narration() {
    let narrator = FakeNarrator::with_durations(&[("Yes, indeed.", 0.3)]);
    let harness = Harness::new(narrator, FakeMedia::default());
    let config = harness
        .config()
        .with_render(RenderSettings::default().with_drift_policy(DriftPolicy::PerClip));

    harness
        .pipeline_with(config)
        .run(request("job-per-clip", "Yes, indeed."))
        .await
        .unwrap();

    let rendered = harness.media.rendered.lock().unwrap().clone();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].1 < 0.5);
}

#[tokio::test]
async fn test_degraded_clip_is_reported_not_fatal() {
    let media = FakeMedia {
        degrade: [1].into_iter().collect(),
        ..Default::default()
    };
    let harness = Harness::new(durations(), media);

    let report = harness.pipeline().run(request("job-degraded", SCRIPT)).await.unwrap();

    assert_eq!(report.job.state, JobState::Completed);
    assert_eq!(
        report.degradations,
        vec![Degradation::VectorizationDegraded { sentence_index: 1 }]
    );
}

#[tokio::test]
async fn test_empty_script_fails_before_any_call() {
    let harness = Harness::new(durations(), FakeMedia::default());

    let err = harness
        .pipeline()
        .run(request("job-empty", "Hi. Ok."))
        .await
        .unwrap_err();

    assert!(matches!(err.error, PipelineError::EmptyScript));
    assert_eq!(err.state, JobState::Failed);
    assert!(err.retained.is_none());
    assert_eq!(harness.narrator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_narration_failure_cancels_and_sweeps() {
    let mut narrator = durations();
    narrator.fail_on = Some("Arrays have indices.".to_string());
    let harness = Harness::new(narrator, FakeMedia::default());

    let err = harness
        .pipeline()
        .run(request("job-narration", SCRIPT))
        .await
        .unwrap_err();

    assert!(matches!(
        err.error,
        PipelineError::NarrationFailed { sentence_index: 1, .. }
    ));
    assert_eq!(err.state, JobState::Failed);
    assert!(!err.is_resumable());
    assert!(harness
        .stored_kinds(&JobId::from_string("job-narration"))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_illustration_failure_cancels_and_sweeps() {
    let illustrator = FakeIllustrator {
        fail_on_prompt_containing: Some("arrays have indices".to_string()),
        ..Default::default()
    };
    let harness = Harness::new(durations(), FakeMedia::default()).with_illustrator(illustrator);

    let err = harness
        .pipeline()
        .run(request("job-illustration", SCRIPT))
        .await
        .unwrap_err();

    assert!(matches!(
        err.error,
        PipelineError::IllustrationFailed { sentence_index: 1, .. }
    ));
    assert_eq!(err.state, JobState::Failed);
    assert!(err.retained.is_none());
    assert!(harness
        .stored_kinds(&JobId::from_string("job-illustration"))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_mux_failure_retains_tracks_and_resumes() {
    let media = FakeMedia::default();
    media.mux_failures.store(1, Ordering::SeqCst);
    let harness = Harness::new(durations(), media);
    let pipeline = harness.pipeline();
    let job_id = JobId::from_string("job-mux");

    let err = pipeline.run(request("job-mux", SCRIPT)).await.unwrap_err();
    assert!(matches!(err.error, PipelineError::MuxFailed(_)));
    assert_eq!(err.state, JobState::PartiallyCleaned);
    assert!(err.is_resumable());

    let stored = harness.stored_kinds(&job_id).await;
    assert!(stored.contains(&ArtifactKind::VideoTrack));
    assert!(stored.contains(&ArtifactKind::AudioTrack));
    assert!(stored.contains(&ArtifactKind::Clip));

    // Retained state survives a process boundary
    let retained = err.retained.unwrap();
    assert!(retained.tracks.is_some());
    let json = serde_json::to_string(&retained).unwrap();
    let retained: RetainedJob = serde_json::from_str(&json).unwrap();

    let report = pipeline.resume(retained).await.unwrap();
    assert_eq!(report.job.state, JobState::Completed);
    assert!((report.final_video.duration_secs - 3.5).abs() < 1e-9);
    assert_eq!(harness.media.mux_calls.load(Ordering::SeqCst), 2);
    assert_eq!(harness.stored_kinds(&job_id).await, vec![ArtifactKind::Final]);
}

#[tokio::test]
async fn test_delivery_failure_retains_muxed_output() {
    let harness = Harness::new(durations(), FakeMedia::default());
    harness.store.final_put_failures.store(1, Ordering::SeqCst);
    let pipeline = harness.pipeline();

    let err = pipeline.run(request("job-deliver", SCRIPT)).await.unwrap_err();
    assert!(matches!(err.error, PipelineError::DeliveryFailed(_)));
    let retained = *err.retained.unwrap();
    let muxed = retained.muxed.clone().unwrap();
    assert!(muxed.path.exists());

    let report = pipeline.resume(retained).await.unwrap();
    assert_eq!(report.job.state, JobState::Completed);
    assert_eq!(harness.media.mux_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        harness
            .stored_kinds(&JobId::from_string("job-deliver"))
            .await,
        vec![ArtifactKind::Final]
    );
}

#[tokio::test]
async fn test_topic_requires_script_writer() {
    let harness = Harness::new(durations(), FakeMedia::default());
    let mut topic = JobRequest::new(ScriptSource::topic("arrays"));
    topic.job_id = Some(JobId::from_string("job-topic"));

    let err = harness.pipeline().run(topic.clone()).await.unwrap_err();
    assert!(matches!(err.error, PipelineError::Config(_)));

    let report = harness
        .pipeline()
        .with_script_writer(Arc::new(FakeScriptWriter(SCRIPT.to_string())))
        .run(topic)
        .await
        .unwrap();
    assert_eq!(report.job.sentences.len(), 2);
    assert!((report.final_video.duration_secs - 3.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_rerun_is_reproducible() {
    let harness = Harness::new(durations(), FakeMedia::default());
    let pipeline = harness.pipeline();

    let first = pipeline.run(request("job-a", SCRIPT)).await.unwrap();
    let second = pipeline.run(request("job-b", SCRIPT)).await.unwrap();

    assert_eq!(
        first.final_video.duration_secs,
        second.final_video.duration_secs
    );
    let concats = harness.media.audio_concats.lock().unwrap().clone();
    assert_eq!(concats[0], concats[1]);
}

#[tokio::test]
async fn test_failed_sweep_leaves_job_partially_cleaned() {
    let harness = Harness::new(durations(), FakeMedia::default());
    let mut store = support::FlakyStore::new(harness.root.path());
    store.fail_deletes = true;
    let mut config = harness.config();
    config.cleanup_attempts = 1;
    let pipeline = sketchcast_worker::Pipeline::new(
        config,
        Arc::new(store),
        harness.media.clone(),
        harness.narrator.clone(),
        harness.illustrator.clone(),
    );

    let report = pipeline.run(request("job-sweep", SCRIPT)).await.unwrap();

    assert_eq!(report.job.state, JobState::PartiallyCleaned);
    assert!(!report.cleanup.is_clean());
    assert_eq!(report.cleanup.deleted, 0);
}
