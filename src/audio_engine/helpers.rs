// src/audio_engine/helpers.rs

use crate::host::AudioBuffer;
use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const RESAMPLE_CHUNK: usize = 1024;

/// Converts `buffer` to `target_rate`, keeping every channel. Returns a copy
/// when the rates already match. The resampler's latency is trimmed off the
/// front and its tail flushed, so frame `n` of the input lands on frame
/// `n * ratio` of the output.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if buffer.sample_rate() == target_rate || buffer.frames() == 0 {
        return Ok(AudioBuffer::new(target_rate, buffer.channels().to_vec()));
    }
    tracing::info!(
        from = buffer.sample_rate(),
        to = target_rate,
        "resampling recording for playback"
    );
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = target_rate as f64 / buffer.sample_rate() as f64;
    let channel_count = buffer.channel_count();
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, channel_count)?;

    let delay = resampler.output_delay();
    let frames = buffer.frames();
    let expected = (frames as f64 * ratio).round() as usize;
    let mut waves_out: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channel_count];

    let mut pos = 0;
    while pos < frames {
        let end = (pos + RESAMPLE_CHUNK).min(frames);
        let chunk: Vec<&[f32]> = buffer.channels().iter().map(|c| &c[pos..end]).collect();
        let produced = if end - pos == RESAMPLE_CHUNK {
            resampler.process(chunk.as_slice(), None)?
        } else {
            resampler.process_partial(Some(chunk.as_slice()), None)?
        };
        append(&mut waves_out, produced);
        pos = end;
    }

    // Flush until the delayed tail is out.
    while waves_out.first().map(Vec::len).unwrap_or(0) < delay + expected {
        let produced = resampler.process_partial::<&[f32]>(None, None)?;
        if produced.first().map(Vec::is_empty).unwrap_or(true) {
            break;
        }
        append(&mut waves_out, produced);
    }

    for channel in &mut waves_out {
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected, 0.0);
    }
    Ok(AudioBuffer::new(target_rate, waves_out))
}

fn append(waves_out: &mut [Vec<f32>], produced: Vec<Vec<f32>>) {
    for (dst, src) in waves_out.iter_mut().zip(produced) {
        dst.extend_from_slice(&src);
    }
}

/// Writes `block`'s planar channels into an interleaved device buffer with
/// `device_channels` channels, starting at `block_offset`. Returns how many
/// frames were written.
pub fn interleave_into(
    block: &[[f32; crate::host::RENDER_QUANTUM]],
    block_offset: usize,
    out: &mut [f32],
    device_channels: usize,
) -> usize {
    let available = crate::host::RENDER_QUANTUM - block_offset;
    let frames = (out.len() / device_channels).min(available);
    for (i, frame) in out.chunks_mut(device_channels).take(frames).enumerate() {
        let index = block_offset + i;
        if device_channels == 1 {
            let sum: f32 = block.iter().map(|c| c[index]).sum();
            frame[0] = sum / block.len().max(1) as f32;
        } else {
            for (channel, sample) in frame.iter_mut().enumerate() {
                *sample = block.get(channel).map(|c| c[index]).unwrap_or(0.0);
            }
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RENDER_QUANTUM;

    #[test]
    fn matching_rates_are_a_copy() {
        let buffer = AudioBuffer::new(48000, vec![vec![0.1; 100], vec![0.2; 100]]);
        let out = resample(&buffer, 48000).unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn resampling_scales_length_and_keeps_channels() {
        let buffer = AudioBuffer::new(22050, vec![vec![0.0; 22050], vec![0.0; 22050]]);
        let out = resample(&buffer, 44100).unwrap();
        assert_eq!(out.channel_count(), 2);
        assert_eq!(out.sample_rate(), 44100);
        assert_eq!(out.frames(), 44100);
    }

    #[test]
    fn resampling_keeps_events_in_place() {
        let mut click = vec![0.0f32; 22050];
        click[1000] = 1.0;
        let buffer = AudioBuffer::new(22050, vec![click]);
        let out = resample(&buffer, 44100).unwrap();
        assert_eq!(out.frames(), 44100);
        let peak = out
            .channel(0)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak as i64 - 2000).abs() <= 2, "peak={peak}");
    }

    #[test]
    fn downsampling_keeps_the_tail() {
        let buffer = AudioBuffer::new(48000, vec![vec![0.5; 48000]]);
        let out = resample(&buffer, 44100).unwrap();
        assert_eq!(out.frames(), 44100);
        let tail = &out.channel(0)[43000..43900];
        assert!(tail.iter().all(|s| (s - 0.5).abs() < 0.01));
    }

    #[test]
    fn interleaving_handles_wider_and_mono_devices() {
        let mut block = [[0.0f32; RENDER_QUANTUM]; 2];
        block[0][0] = 1.0;
        block[1][0] = -1.0;
        block[0][1] = 0.5;

        let mut quad = vec![9.0; 8];
        assert_eq!(interleave_into(&block, 0, &mut quad, 4), 2);
        assert_eq!(quad, vec![1.0, -1.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0]);

        let mut mono = vec![9.0; 3];
        assert_eq!(interleave_into(&block, 0, &mut mono, 1), 3);
        assert_eq!(mono, vec![0.0, 0.25, 0.0]);

        let mut tail = vec![0.0; 10];
        assert_eq!(interleave_into(&block, RENDER_QUANTUM - 2, &mut tail, 2), 2);
    }
}
