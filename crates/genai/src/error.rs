use std::time::Duration;

/// Errors surfaced by the external generation services.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The call succeeded but carried no artifact of the expected kind.
    #[error("No {0} data returned from model")]
    EmptyPayload(&'static str),

    /// The credentials were rejected. The user must re-authenticate and
    /// retry; this is never treated as a generic failure.
    #[error("API key invalid or expired: {0}")]
    Unauthorized(String),

    /// A long-running job did not reach a terminal state in time.
    #[error("Generation job still running after {waited:?}")]
    Timeout { waited: Duration },

    /// A long-running job reached a terminal error state.
    #[error("Generation job failed: {0}")]
    Job(String),

    /// The response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Parse(String),

    /// A media payload could not be decoded.
    #[error("Invalid media: {0}")]
    Media(String),
}

impl GenerationError {
    /// Whether the caller should prompt for re-authentication.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
