// src/decode.rs

//! Turns an audio file on disk into a planar float buffer.

use crate::host::AudioBuffer;
use rodio::source::Source;
use rodio::Decoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot open file: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported audio format: {0}")]
    Unsupported(#[from] rodio::decoder::DecoderError),
    #[error("file contains no audio")]
    Empty,
}

/// Decodes every channel of `path` at its native sample rate.
pub fn decode_file(path: &Path) -> Result<AudioBuffer, DecodeError> {
    let file = BufReader::new(File::open(path)?);
    let source = Decoder::new(file)?;
    let sample_rate = source.sample_rate();
    let channels = source.channels() as usize;

    // Rodio decodes to i16.
    let interleaved: Vec<f32> = source.map(|s| s as f32 / 32768.0).collect();
    if channels == 0 || sample_rate == 0 || interleaved.len() < channels {
        return Err(DecodeError::Empty);
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, channels, sample_rate);
    tracing::info!(
        path = %path.display(),
        channels,
        sample_rate,
        frames = buffer.frames(),
        "decoded audio file"
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for c in 0..channels {
                let value = if c == 0 { 16384 } else { -8192 };
                writer.write_sample(if i % 2 == 0 { value } else { 0i16 }).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn keeps_every_channel_at_the_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_test_wav(&path, 2, 1000);
        let buffer = decode_file(&path).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.frames(), 1000);
        assert_eq!(buffer.channel(0)[0], 0.5);
        assert_eq!(buffer.channel(1)[0], -0.25);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = decode_file(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"this is not audio at all").unwrap();
        assert!(matches!(decode_file(&path), Err(DecodeError::Unsupported(_))));
    }
}
