//! Per-job planning: everything decided once, before any external call.

use serde::{Deserialize, Serialize};

use sketchcast_models::{
    FrameSize, ImageQuality, Job, JobId, JobRequest, RenderSettings, VoiceConfig,
};
use sketchcast_providers::LabelPlan;

use crate::error::{PipelineError, PipelineResult};

/// Settings computed at job start and passed down every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    pub render: RenderSettings,
    /// Output frame of every clip and of the final video
    pub frame: FrameSize,
    /// Size requested from the illustration provider
    pub image_size: FrameSize,
    pub image_quality: ImageQuality,
    pub voice: VoiceConfig,
    /// Sentences whose illustration may carry handwritten labels
    pub labels: LabelPlan,
}

/// Build the job and its settings from split sentences.
pub fn plan_job(
    job_id: JobId,
    sentences: Vec<String>,
    request: &JobRequest,
    render: &RenderSettings,
) -> PipelineResult<(Job, JobSettings)> {
    if sentences.is_empty() {
        return Err(PipelineError::EmptyScript);
    }
    render.validate()?;

    let job = Job::new(job_id, sentences, request);
    job.frame.validate()?;

    let settings = JobSettings {
        render: render.clone(),
        frame: job.frame,
        image_size: request.video_format.image_size(),
        image_quality: request.image_quality,
        voice: request.voice.clone(),
        labels: LabelPlan::for_job(&job.id, job.sentence_count()),
    };

    Ok((job, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchcast_models::{JobState, ScriptSource, VideoFormat};

    fn request(format: VideoFormat) -> JobRequest {
        JobRequest::new(ScriptSource::text("unused")).with_video_format(format)
    }

    #[test]
    fn test_plan_landscape_job() {
        let sentences = vec!["Arrays store data.".to_string(), "Arrays have indices.".to_string()];
        let (job, settings) = plan_job(
            JobId::from_string("job-a"),
            sentences,
            &request(VideoFormat::Landscape),
            &RenderSettings::default(),
        )
        .unwrap();

        assert_eq!(job.sentence_count(), 2);
        assert_eq!(job.sentences[1].index, 1);
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(settings.frame, FrameSize::new(1920, 1080));
        assert_eq!(settings.image_size, FrameSize::new(1536, 1024));
        assert!(settings.labels.indices().iter().all(|&i| i < 2));
    }

    #[test]
    fn test_plan_square_job() {
        let (_, settings) = plan_job(
            JobId::from_string("job-b"),
            vec!["A single sentence.".to_string()],
            &request(VideoFormat::Square),
            &RenderSettings::default(),
        )
        .unwrap();
        assert_eq!(settings.frame, FrameSize::new(1080, 1080));
        assert_eq!(settings.image_size, FrameSize::new(1024, 1024));
    }

    #[test]
    fn test_empty_script_is_rejected() {
        let err = plan_job(
            JobId::new(),
            Vec::new(),
            &request(VideoFormat::Landscape),
            &RenderSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyScript));
    }

    #[test]
    fn test_invalid_render_settings_are_rejected() {
        let mut render = RenderSettings::default();
        render.fps = 0;
        let err = plan_job(
            JobId::new(),
            vec!["Something to draw.".to_string()],
            &request(VideoFormat::Landscape),
            &render,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
    }
}
