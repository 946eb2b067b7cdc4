//! Re-authentication prompt collaborator.
//!
//! Invoked when the video service rejects the credentials. The pipeline
//! does not retry on its own; the user re-authenticates and re-triggers
//! the task.

/// Something that can ask the user to re-authenticate.
pub trait ReauthPrompt: Send + Sync {
    fn request_reauth(&self, message: &str);
}

/// Headless prompt: logs an actionable error.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReauth;

impl ReauthPrompt for LogReauth {
    fn request_reauth(&self, message: &str) {
        tracing::error!(
            reason = message,
            "API key invalid or expired. Update GEMINI_API_KEY and try again",
        );
    }
}
