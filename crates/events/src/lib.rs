//! In-process change notifications for the studio.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`StudioEvent`]: timestamped envelope around an [`EventKind`].
//!
//! The project store, generation tasks, the orchestrator and the timeline
//! all publish here; presentation layers subscribe.

pub mod bus;

pub use bus::{EventBus, EventKind, StudioEvent};
