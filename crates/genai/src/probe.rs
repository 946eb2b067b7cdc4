//! Measuring the playback length of generated narration.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::media::decode_data_uri;
use crate::wav::wav_duration_secs;

/// Reports the native duration of a media reference.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn duration_secs(&self, media: &str) -> Result<f64, GenerationError>;
}

/// Probe for WAV clips carried as `data:` URIs, which is what
/// [`crate::client::GeminiClient::generate_speech`] produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavProbe;

#[async_trait]
impl MediaProbe for WavProbe {
    async fn duration_secs(&self, media: &str) -> Result<f64, GenerationError> {
        let (_mime, bytes) = decode_data_uri(media)?;
        wav_duration_secs(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::to_data_uri;
    use crate::wav::{pcm_to_wav, SPEECH_SAMPLE_RATE};

    #[tokio::test]
    async fn measures_wav_data_uri() {
        // 4.2 s of silence.
        let pcm = vec![0u8; 201_600];
        let uri = to_data_uri("audio/wav", &pcm_to_wav(&pcm, SPEECH_SAMPLE_RATE).unwrap());
        let secs = WavProbe.duration_secs(&uri).await.unwrap();
        assert!((secs - 4.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rejects_remote_urls() {
        assert!(WavProbe
            .duration_secs("https://cdn.example/clip.wav")
            .await
            .is_err());
    }
}
