#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aniflow_core::project::{AspectRatio, Character, Project, Shot};
use aniflow_core::request::{ImageRequest, SpeechRequest, VideoRequest};
use aniflow_events::EventBus;
use aniflow_genai::media::to_data_uri;
use aniflow_genai::wav::{pcm_to_wav, SPEECH_SAMPLE_RATE};
use aniflow_genai::{GenerationError, GenerationService, WavProbe};
use aniflow_pipeline::{GenerationTasks, Pacing, PipelineOrchestrator, ProjectStore, ReauthPrompt};
use async_trait::async_trait;
use tokio::sync::Notify;

/// One recorded call to the mock service.
#[derive(Debug, Clone)]
pub enum Call {
    Story(String),
    Image(ImageRequest),
    Video(VideoRequest),
    Speech(SpeechRequest),
}

impl Call {
    pub fn is_portrait(&self) -> bool {
        matches!(self, Call::Image(r) if r.prompt.starts_with("Character portrait of"))
    }

    pub fn is_shot_image(&self) -> bool {
        matches!(self, Call::Image(_)) && !self.is_portrait()
    }
}

/// Parks the n-th image call until released.
struct ImageGate {
    at_call: usize,
    reached: Arc<Notify>,
    release: Arc<Notify>,
}

/// Scripted [`GenerationService`]: records every request in order and
/// fails the calls it is told to.
pub struct MockService {
    calls: Mutex<Vec<Call>>,
    image_calls: AtomicUsize,
    failing_prompts: Mutex<Vec<String>>,
    video_unauthorized: AtomicBool,
    empty_speech: AtomicBool,
    speech_secs: Mutex<f64>,
    gate: Mutex<Option<ImageGate>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            image_calls: AtomicUsize::new(0),
            failing_prompts: Mutex::new(Vec::new()),
            video_unauthorized: AtomicBool::new(false),
            empty_speech: AtomicBool::new(false),
            speech_secs: Mutex::new(2.0),
            gate: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Image(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn speech_requests(&self) -> Vec<SpeechRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Speech(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// Fail every image call whose action prompt contains `text`.
    pub fn fail_images_containing(&self, text: &str) {
        self.failing_prompts.lock().unwrap().push(text.to_string());
    }

    pub fn stop_failing(&self) {
        self.failing_prompts.lock().unwrap().clear();
    }

    pub fn reject_video_credentials(&self) {
        self.video_unauthorized.store(true, Ordering::SeqCst);
    }

    pub fn return_no_audio(&self) {
        self.empty_speech.store(true, Ordering::SeqCst);
    }

    /// Length of the clips returned by `generate_speech`.
    pub fn set_speech_secs(&self, secs: f64) {
        *self.speech_secs.lock().unwrap() = secs;
    }

    /// Park the `n`-th image call (1-based). Returns `(reached, release)`:
    /// `reached` fires when the call arrives, `release` lets it finish.
    pub fn pause_image_call(&self, n: usize) -> (Arc<Notify>, Arc<Notify>) {
        let reached = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(ImageGate {
            at_call: n,
            reached: Arc::clone(&reached),
            release: Arc::clone(&release),
        });
        (reached, release)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GenerationService for MockService {
    async fn generate_story(
        &self,
        topic: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Project, GenerationError> {
        self.record(Call::Story(topic.to_string()));
        let mut project = sample_project();
        project.normalize(aspect_ratio);
        Ok(project)
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<String, GenerationError> {
        self.record(Call::Image(request.clone()));
        let n = self.image_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let gate = {
            let mut slot = self.gate.lock().unwrap();
            if slot.as_ref().is_some_and(|g| g.at_call == n) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }

        let failing = self
            .failing_prompts
            .lock()
            .unwrap()
            .iter()
            .any(|text| request.prompt.contains(text.as_str()));
        if failing {
            return Err(GenerationError::Api {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(to_data_uri("image/png", format!("image-{n}").as_bytes()))
    }

    async fn generate_video(&self, request: &VideoRequest) -> Result<String, GenerationError> {
        self.record(Call::Video(request.clone()));
        if self.video_unauthorized.load(Ordering::SeqCst) {
            return Err(GenerationError::Unauthorized(
                "Requested entity was not found.".to_string(),
            ));
        }
        Ok(to_data_uri("video/mp4", b"clip"))
    }

    async fn generate_speech(&self, request: &SpeechRequest) -> Result<String, GenerationError> {
        self.record(Call::Speech(request.clone()));
        if self.empty_speech.load(Ordering::SeqCst) {
            return Err(GenerationError::EmptyPayload("audio"));
        }
        let secs = *self.speech_secs.lock().unwrap();
        let samples = (secs * f64::from(SPEECH_SAMPLE_RATE)).round() as usize;
        let wav = pcm_to_wav(&vec![0u8; samples * 2], SPEECH_SAMPLE_RATE)?;
        Ok(to_data_uri("audio/wav", &wav))
    }
}

/// Records every re-authentication request.
#[derive(Default)]
pub struct RecordingReauth {
    pub messages: Mutex<Vec<String>>,
}

impl ReauthPrompt for RecordingReauth {
    fn request_reauth(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Two characters and three shots:
///
/// | id | focus | dialogue | duration |
/// |----|-------|----------|----------|
/// | 1  | Aiko  | yes      | 3.0      |
/// | 2  | None  | no       | 2.0      |
/// | 3  | Ren   | yes      | 4.0      |
pub fn sample_project() -> Project {
    let mut project = Project::empty();
    project.title = "Lanterns".to_string();
    project.location_description = "Rain-slick shrine courtyard".to_string();
    project.settings.global_style = "Watercolor anime".to_string();
    project.settings.seed = 4242;

    let mut aiko = Character::new("Aiko", "short silver bob, red haori");
    aiko.voice_id = "Zephyr".to_string();
    let mut ren = Character::new("Ren", "black topknot, grey hakama");
    ren.voice_id = "Fenrir".to_string();
    project.characters = vec![aiko, ren];

    let mut first = Shot::new(1);
    first.visual_prompt = "Aiko steps through the torii".to_string();
    first.character_focus = "Aiko".to_string();
    first.character_emotion = "Nervous".to_string();
    first.dialogue = "Is anyone here?".to_string();
    first.duration = 3.0;

    let mut second = Shot::new(2);
    second.visual_prompt = "Lanterns sway in the wind".to_string();
    second.duration = 2.0;

    let mut third = Shot::new(3);
    third.visual_prompt = "Ren emerges from the mist".to_string();
    third.character_focus = "Ren".to_string();
    third.dialogue = "You should not have come.".to_string();
    third.duration = 4.0;

    project.shots = vec![first, second, third];
    project
}

/// Everything a pipeline test needs, wired against the mock.
pub struct Harness {
    pub bus: Arc<EventBus>,
    pub store: Arc<ProjectStore>,
    pub service: Arc<MockService>,
    pub reauth: Arc<RecordingReauth>,
    pub tasks: Arc<GenerationTasks>,
    pub orchestrator: Arc<PipelineOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_pacing(Pacing::none())
    }

    pub fn with_pacing(pacing: Pacing) -> Self {
        Self::with_project(sample_project(), pacing)
    }

    pub fn with_project(project: Project, pacing: Pacing) -> Self {
        let bus = Arc::new(EventBus::default());
        let store = Arc::new(ProjectStore::new(project, Arc::clone(&bus)));
        let service = Arc::new(MockService::new());
        let reauth = Arc::new(RecordingReauth::default());
        let tasks = Arc::new(GenerationTasks::new(
            Arc::clone(&store),
            service.clone(),
            Arc::new(WavProbe),
            reauth.clone(),
        ));
        let orchestrator = Arc::new(PipelineOrchestrator::new(Arc::clone(&tasks), pacing));
        Self {
            bus,
            store,
            service,
            reauth,
            tasks,
            orchestrator,
        }
    }

    pub async fn shot(&self, id: u32) -> Shot {
        self.store
            .read(|p| p.shot(id).cloned())
            .await
            .expect("shot exists")
    }

    pub async fn character(&self, name: &str) -> Character {
        self.store
            .read(|p| p.character(name).cloned())
            .await
            .expect("character exists")
    }
}
