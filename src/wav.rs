// src/wav.rs

//! 16-bit linear PCM WAV serialisation of rendered buffers.

use crate::host::AudioBuffer;
use std::fs;
use std::io;
use std::path::Path;

pub const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
const FORMAT_PCM: u16 = 1;

/// Converts one float sample to signed 16 bit. Out-of-range input is clamped;
/// the negative half scales by 32768 so -1.0 reaches `i16::MIN`.
pub fn to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Serialises `buffer` as a canonical 44-byte-header WAV with interleaved
/// little-endian samples. The result is `44 + frames * channels * 2` bytes.
pub fn encode(buffer: &AudioBuffer) -> Vec<u8> {
    let channels = buffer.channel_count();
    let frames = buffer.frames();
    let data_len = frames * channels * 2;
    let block_align = channels as u16 * (BITS_PER_SAMPLE / 8);
    let byte_rate = buffer.sample_rate() * block_align as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((HEADER_LEN + data_len - 8) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&(channels as u16).to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());

    for frame in 0..frames {
        for channel in buffer.channels() {
            out.extend_from_slice(&to_i16(channel[frame]).to_le_bytes());
        }
    }
    out
}

/// Encodes and writes in one go.
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> io::Result<()> {
    fs::write(path, encode(buffer))
}
