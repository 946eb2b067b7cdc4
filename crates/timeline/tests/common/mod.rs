#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use aniflow_core::project::{Project, Shot};
use aniflow_core::types::ShotId;
use aniflow_events::{EventBus, EventKind};
use aniflow_pipeline::ProjectStore;
use aniflow_timeline::{MediaBinding, MediaSurface, Timeline};
use tokio::sync::broadcast;

/// Surface that records every call as a short string.
#[derive(Default, Clone)]
pub struct RecordingSurface(Arc<Mutex<Vec<String>>>);

impl RecordingSurface {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl MediaSurface for RecordingSurface {
    fn bind(&self, media: Option<&MediaBinding>) {
        let entry = match media {
            Some(m) => format!("bind {}", m.shot_id),
            None => "clear".to_string(),
        };
        self.0.lock().unwrap().push(entry);
    }

    fn play(&self) {
        self.0.lock().unwrap().push("play".to_string());
    }

    fn pause(&self) {
        self.0.lock().unwrap().push("pause".to_string());
    }
}

/// A project whose shots have the given ids and durations, in order.
pub fn project(shots: &[(ShotId, f64)]) -> Project {
    let mut project = Project::empty();
    project.shots = shots
        .iter()
        .map(|&(id, duration)| Shot {
            duration,
            ..Shot::new(id)
        })
        .collect();
    project
}

pub struct Harness {
    pub bus: Arc<EventBus>,
    pub store: Arc<ProjectStore>,
    pub surface: RecordingSurface,
    pub timeline: Arc<Timeline>,
}

impl Harness {
    pub fn new(shots: &[(ShotId, f64)]) -> Self {
        Self::with_project(project(shots))
    }

    pub fn with_project(project: Project) -> Self {
        let bus = Arc::new(EventBus::default());
        let store = Arc::new(ProjectStore::new(project, Arc::clone(&bus)));
        let surface = RecordingSurface::default();
        let timeline = Arc::new(Timeline::new(
            Arc::clone(&store),
            Box::new(surface.clone()),
        ));
        Self {
            bus,
            store,
            surface,
            timeline,
        }
    }
}

/// Everything currently buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<aniflow_events::StudioEvent>) -> Vec<EventKind> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| e.kind)
        .collect()
}
