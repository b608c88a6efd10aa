//! # audio-wav
//!
//! WAV container encoding and PCM sample conversion.
//!
//! Two encoding paths exist: [`encode_wav`] produces a complete, seekable
//! file via `hound` when the full sample buffer is available, and
//! [`streaming_wav_header`] emits a stand-alone RIFF header with unbounded
//! size fields so 16-bit PCM can be appended chunk by chunk over a transport
//! that never learns the total length.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};
use tts_core::{TtsError, TtsResult};

/// Size of the RIFF/fmt/data header emitted for streamed WAV bodies.
pub const WAV_HEADER_LEN: usize = 44;

/// Quantize f32 samples in [-1, 1] to 16-bit signed PCM.
///
/// Out-of-range input is clamped rather than wrapped.
pub fn pcm16_from_f32(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Serialize 16-bit PCM samples as little-endian bytes.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Build a 44-byte WAV header for a stream of unknown length.
///
/// The RIFF and data chunk sizes are set to `0xFFFF_FFFF`; players treat
/// this as "read until the transport ends", which is exactly the semantics
/// of a chunked HTTP body. A consumer detects truncation from the container
/// (samples stop mid-stream), not from HTTP framing.
pub fn streaming_wav_header(sample_rate: u32, channels: u16) -> [u8; WAV_HEADER_LEN] {
    const BITS_PER_SAMPLE: u16 = 16;
    let block_align = channels * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * block_align as u32;

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
    header
}

/// Encode 16-bit PCM samples as a complete in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> TtsResult<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| TtsError::Io(std::io::Error::other(e.to_string())))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| TtsError::Io(std::io::Error::other(e.to_string())))?;
        }
        writer
            .finalize()
            .map_err(|e| TtsError::Io(std::io::Error::other(e.to_string())))?;
    }

    Ok(cursor.into_inner())
}
