//! WAV container support for synthesized speech.
//!
//! The speech service returns raw 16-bit mono PCM; players need a RIFF
//! container around it. The same header is read back to measure how long
//! a clip plays.

use std::io::Cursor;

use crate::error::GenerationError;

/// Sample rate of the speech service's PCM output.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

fn speech_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn media_error(e: hound::Error) -> GenerationError {
    GenerationError::Media(format!("WAV: {e}"))
}

/// Wrap raw little-endian mono 16-bit PCM in a WAV container. A trailing
/// odd byte is dropped.
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, GenerationError> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + pcm.len()));
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, speech_spec(sample_rate)).map_err(media_error)?;
        for frame in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([frame[0], frame[1]]))
                .map_err(media_error)?;
        }
        writer.finalize().map_err(media_error)?;
    }
    Ok(cursor.into_inner())
}

/// Playback length of a WAV file in seconds.
pub fn wav_duration_secs(bytes: &[u8]) -> Result<f64, GenerationError> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(media_error)?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return Err(GenerationError::Media("WAV: zero sample rate".to_string()));
    }
    Ok(f64::from(reader.duration()) / f64::from(sample_rate))
}
