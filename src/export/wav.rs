// 16-bit PCM WAV encoding for exports.
//
// Always the canonical 44-byte header (fmt size 16, format tag 1), whatever
// the channel count. Samples follow interleaved, little-endian.

use crate::audio::SampleBuffer;
use crate::error::{EditorError, Result};

pub const HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Clip to [-1, 1] then scale asymmetrically so both rails are reachable.
#[inline]
pub fn to_pcm16(s: f32) -> i16 {
    let s = if s.is_nan() { 0.0 } else { s.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 0x8000 as f32) as i16
    } else {
        (s * 0x7FFF as f32) as i16
    }
}

pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| EditorError::invalid_state("too many channels to export"))?;
    let data_len = u32::try_from(buffer.len() * buffer.channel_count() * 2)
        .map_err(|_| EditorError::invalid_state("export too large for a wav file"))?;
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = buffer.sample_rate * block_align as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for i in 0..buffer.len() {
        for ch in &buffer.channels {
            out.extend_from_slice(&to_pcm16(ch[i]).to_le_bytes());
        }
    }
    Ok(out)
}
