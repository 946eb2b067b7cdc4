//! Full headless production against a stub service.

use std::sync::Arc;
use std::time::Duration;

use aniflow_core::project::{AspectRatio, Character, Project, Shot};
use aniflow_core::request::{ImageRequest, SpeechRequest, VideoRequest};
use aniflow_events::EventKind;
use aniflow_genai::media::to_data_uri;
use aniflow_genai::wav::{pcm_to_wav, SPEECH_SAMPLE_RATE};
use aniflow_genai::{GenerationError, GenerationService};
use aniflow_timeline::PlayState;
use aniflow_worker::{Studio, WorkerConfig};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Always succeeds; speech clips are one second long.
struct StubService;

#[async_trait]
impl GenerationService for StubService {
    async fn generate_story(
        &self,
        topic: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Project, GenerationError> {
        let mut project = Project::empty();
        project.title = topic.to_string();
        project.characters = vec![Character::new("Mika", "long braid, yellow raincoat")];

        let mut first = Shot::new(1);
        first.character_focus = "Mika".to_string();
        first.dialogue = "Wait for me!".to_string();
        first.duration = 3.0;
        let mut second = Shot::new(2);
        second.duration = 2.0;
        project.shots = vec![first, second];

        project.normalize(aspect_ratio);
        Ok(project)
    }

    async fn generate_image(&self, _request: &ImageRequest) -> Result<String, GenerationError> {
        Ok(to_data_uri("image/png", b"png"))
    }

    async fn generate_video(&self, _request: &VideoRequest) -> Result<String, GenerationError> {
        Ok(to_data_uri("video/mp4", b"mp4"))
    }

    async fn generate_speech(&self, _request: &SpeechRequest) -> Result<String, GenerationError> {
        let pcm = vec![0u8; SPEECH_SAMPLE_RATE as usize * 2];
        Ok(to_data_uri("audio/wav", &pcm_to_wav(&pcm, SPEECH_SAMPLE_RATE)?))
    }
}

fn config() -> WorkerConfig {
    WorkerConfig {
        topic: "Chasing the last train".to_string(),
        aspect_ratio: AspectRatio::Portrait,
        seed: Some(99),
        pacing: Duration::ZERO,
        tick_hz: 20,
        narration: true,
        play_through: true,
    }
}

#[tokio::test]
async fn production_fills_every_artifact() {
    let config = config();
    let studio = Studio::new(Arc::new(StubService), &config);

    let summary = studio.produce(&config).await.unwrap();

    assert_eq!(summary.title, "Chasing the last train");
    assert_eq!(summary.shots, 2);
    assert_eq!(summary.images.succeeded(), 3);
    assert_eq!(summary.narration.as_ref().map(|r| r.succeeded()), Some(1));
    assert_eq!(summary.total_duration, 5.0);

    let project = studio.store.current().await;
    assert_eq!(project.settings.seed, 99);
    assert_eq!(project.settings.aspect_ratio, AspectRatio::Portrait);
    assert!(project.shots.iter().all(|s| s.image_url.is_some()));
    assert!(project.shots[0].audio_url.is_some());
    assert!(project.shots[1].audio_url.is_none());
}

#[tokio::test(start_paused = true)]
async fn play_through_runs_to_the_end() {
    let config = config();
    let studio = Studio::new(Arc::new(StubService), &config);
    studio.produce(&config).await.unwrap();

    let cancel = CancellationToken::new();
    let timeline = Arc::clone(&studio.timeline);
    let loop_cancel = cancel.clone();
    let handle = tokio::spawn(async move { timeline.run(loop_cancel).await });

    studio.play_through().await.unwrap();

    assert_eq!(studio.timeline.play_state().await, PlayState::Stopped);
    assert_eq!(studio.timeline.position().await, 5.0);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn play_through_returns_when_the_stop_event_is_dropped() {
    let config = config();
    let studio = Arc::new(Studio::new(Arc::new(StubService), &config));
    studio.produce(&config).await.unwrap();

    let watcher = Arc::clone(&studio);
    let handle = tokio::spawn(async move { watcher.play_through().await });
    while studio.timeline.play_state().await != PlayState::Playing {
        tokio::task::yield_now().await;
    }

    tokio::time::advance(Duration::from_secs(6)).await;
    studio.timeline.tick().await;
    assert_eq!(studio.timeline.play_state().await, PlayState::Stopped);

    // Push the stop notification out of the watcher's buffer.
    for _ in 0..2_000 {
        studio.bus.emit(EventKind::SettingsChanged);
    }

    let finished = tokio::time::timeout(Duration::from_secs(1), handle).await;
    assert!(matches!(finished, Ok(Ok(Ok(())))));
}
