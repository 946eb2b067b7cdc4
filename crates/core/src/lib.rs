//! Domain model and pure logic for the shot-based animation studio.
//!
//! Everything here is synchronous and free of I/O: the project graph,
//! task states, consistency-anchor request construction, focus
//! resolution, the shot locator and narration-duration fitting.

pub mod anchor;
pub mod assets;
pub mod error;
pub mod focus;
pub mod locator;
pub mod narration;
pub mod project;
pub mod request;
pub mod task;
pub mod types;
