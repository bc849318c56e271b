// src/host/delay.rs

//! Fractional delay line.
//!
//! The line emits from its history before it absorbs the current quantum,
//! so the graph may route its output back into its input. The effective
//! delay is never shorter than one render quantum.

use super::buffer::{AudioBlock, RENDER_QUANTUM};
use super::param::AudioParam;
use super::DspUnit;
use std::any::Any;

#[derive(Debug, Clone)]
pub struct DelayLine {
    delay_time: AudioParam,
    sample_rate: f32,
    max_delay_frames: usize,
    buffers: Vec<Vec<f32>>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(sample_rate: f32, channel_count: usize, max_delay_seconds: f32) -> Self {
        let max_delay_frames = ((max_delay_seconds * sample_rate).ceil() as usize).max(RENDER_QUANTUM);
        let len = max_delay_frames + RENDER_QUANTUM + 2;
        Self {
            delay_time: AudioParam::new(0.0, 0.0, max_delay_seconds, sample_rate),
            sample_rate,
            max_delay_frames,
            buffers: vec![vec![0.0; len]; channel_count.max(1)],
            write_pos: 0,
        }
    }

    pub fn delay_time(&self) -> &AudioParam {
        &self.delay_time
    }

    pub fn delay_time_mut(&mut self) -> &mut AudioParam {
        &mut self.delay_time
    }

    /// Zeroes the stored history.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
    }

    fn delay_frames(&self, seconds: f32) -> f32 {
        (seconds * self.sample_rate).clamp(RENDER_QUANTUM as f32, self.max_delay_frames as f32)
    }
}

impl DspUnit for DelayLine {
    fn process(&mut self, _input: &AudioBlock, output: &mut AudioBlock) {
        let len = self.buffers[0].len();
        for frame in 0..RENDER_QUANTUM {
            let seconds = self.delay_time.tick();
            let delay = self.delay_frames(seconds);
            let read = (self.write_pos + frame + len) as f32 - delay;
            let base = read.floor();
            let frac = read - base;
            let i0 = base as usize % len;
            let i1 = (i0 + 1) % len;
            for (channel, buffer) in self.buffers.iter().enumerate() {
                if channel < output.channel_count() {
                    output.channel_mut(channel)[frame] =
                        buffer[i0] + (buffer[i1] - buffer[i0]) * frac;
                }
            }
        }
    }

    fn breaks_cycles(&self) -> bool {
        true
    }

    fn absorb(&mut self, input: &AudioBlock) {
        let len = self.buffers[0].len();
        for (channel, buffer) in self.buffers.iter_mut().enumerate() {
            if channel >= input.channel_count() {
                break;
            }
            for (frame, sample) in input.channel(channel).iter().enumerate() {
                buffer[(self.write_pos + frame) % len] = *sample;
            }
        }
        self.write_pos = (self.write_pos + RENDER_QUANTUM) % len;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &mut DelayLine, input: &[f32], quanta: usize) -> Vec<f32> {
        let mut out = Vec::new();
        for q in 0..quanta {
            let mut block = AudioBlock::new(1);
            for (i, s) in block.channel_mut(0).iter_mut().enumerate() {
                *s = input.get(q * RENDER_QUANTUM + i).copied().unwrap_or(0.0);
            }
            let mut output = AudioBlock::new(1);
            line.process(&block, &mut output);
            line.absorb(&block);
            out.extend_from_slice(output.channel(0));
        }
        out
    }

    #[test]
    fn impulse_comes_back_after_the_delay_time() {
        let mut line = DelayLine::new(1000.0, 1, 1.0);
        line.delay_time_mut().set_value(0.25);
        let out = run(&mut line, &[1.0], 4);
        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(250));
        assert!((out[250] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn short_delays_are_clamped_to_one_quantum() {
        let mut line = DelayLine::new(44100.0, 1, 1.0);
        line.delay_time_mut().set_value(0.0);
        let out = run(&mut line, &[1.0], 3);
        assert!((out[RENDER_QUANTUM] - 1.0).abs() < 1e-6);
        assert!(out[..RENDER_QUANTUM].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn smoothed_time_change_glides_towards_target() {
        let mut line = DelayLine::new(1000.0, 1, 1.0);
        line.delay_time_mut().set_value(0.25);
        line.delay_time_mut().set_target_at_time(0.5, 0.05);
        run(&mut line, &[], 1);
        let reached = line.delay_time().value();
        assert!(reached > 0.25 && reached < 0.5, "reached={reached}");
        run(&mut line, &[], 20);
        assert_eq!(line.delay_time().value(), 0.5);
    }

    #[test]
    fn clear_forgets_history() {
        let mut line = DelayLine::new(1000.0, 1, 1.0);
        line.delay_time_mut().set_value(0.2);
        run(&mut line, &[1.0], 1);
        line.clear();
        let out = run(&mut line, &[], 4);
        assert!(out.iter().all(|s| *s == 0.0));
    }
}
