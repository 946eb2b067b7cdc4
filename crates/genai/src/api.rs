//! REST API client for the Gemini HTTP endpoints.
//!
//! Wraps content generation, long-running video submission, operation
//! polling and file download using [`reqwest`]. Higher-level request
//! building lives in [`crate::client`].

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GenerationError;
use crate::messages::{GenerateContentRequest, GenerateContentResponse, Operation, PredictVideoRequest};

/// Header carrying the API key on every request.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Error text the video endpoints return when the key cannot see the model.
pub const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

/// HTTP client for a single Gemini API base URL.
pub struct GeminiApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiApi {
    /// Create a new API client.
    ///
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(base_url: String, api_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// `POST /models/{model}:generateContent`.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        self.post_json(&format!("models/{model}:generateContent"), request)
            .await
    }

    /// `POST /models/{model}:predictLongRunning`. Returns the operation
    /// handle to poll.
    pub async fn predict_long_running(
        &self,
        model: &str,
        request: &PredictVideoRequest,
    ) -> Result<Operation, GenerationError> {
        self.post_json(&format!("models/{model}:predictLongRunning"), request)
            .await
    }

    /// `GET /{operation_name}`.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, GenerationError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, name.trim_start_matches('/')))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch a generated file by its absolute URI.
    pub async fn download(&self, uri: &str) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GenerationError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Credential failures
    /// become [`GenerationError::Unauthorized`]; anything else non-2xx is a
    /// [`GenerationError::Api`] carrying the status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(classify_failure(status, body));
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GenerationError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Map a non-2xx response to the matching error variant.
pub fn classify_failure(status: StatusCode, body: String) -> GenerationError {
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains(ENTITY_NOT_FOUND)
    {
        return GenerationError::Unauthorized(body);
    }
    GenerationError::Api {
        status: status.as_u16(),
        body,
    }
}
