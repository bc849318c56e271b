// src/host/gain.rs

//! A simple audio gain unit.
//!
//! Multiplies the incoming signal by a smoothed linear factor. Also serves as
//! the junction node at the edges of every effect group and as the graph
//! destination.

use super::buffer::{AudioBlock, RENDER_QUANTUM};
use super::param::AudioParam;
use super::DspUnit;
use std::any::Any;

/// Upper bound of the linear gain parameter.
pub const MAX_GAIN: f32 = 16.0;

#[derive(Debug, Clone)]
pub struct Gain {
    gain: AudioParam,
}

impl Gain {
    pub fn new(sample_rate: f32, gain: f32) -> Self {
        Self {
            gain: AudioParam::new(gain, 0.0, MAX_GAIN, sample_rate),
        }
    }

    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut AudioParam {
        &mut self.gain
    }
}

impl DspUnit for Gain {
    #[inline]
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock) {
        if !self.gain.is_settling() {
            let gain = self.gain.value();
            // Optimization: unity gain is a plain copy.
            if gain == 1.0 {
                output.copy_from(input);
                return;
            }
            for (dst, src) in output.channels_mut().iter_mut().zip(input.channels()) {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = *s * gain;
                }
            }
            return;
        }

        for frame in 0..RENDER_QUANTUM {
            let gain = self.gain.tick();
            for (dst, src) in output.channels_mut().iter_mut().zip(input.channels()) {
                dst[frame] = src[frame] * gain;
            }
        }
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

    #[test]
    fn scales_every_channel() {
        let mut gain = Gain::new(44100.0, 0.5);
        let mut input = AudioBlock::new(2);
        input.channel_mut(0).fill(1.0);
        input.channel_mut(1).fill(-0.5);
        let mut output = AudioBlock::new(2);
        gain.process(&input, &mut output);
        assert!(output.channel(0).iter().all(|s| *s == 0.5));
        assert!(output.channel(1).iter().all(|s| *s == -0.25));
    }

    #[test]
    fn smoothed_change_has_no_step() {
        let mut gain = Gain::new(44100.0, 1.0);
        gain.gain_mut().set_target_at_time(0.0, 0.01);
        let mut input = AudioBlock::new(1);
        input.channel_mut(0).fill(1.0);
        let mut output = AudioBlock::new(1);
        gain.process(&input, &mut output);
        let samples = output.channel(0);
        assert!(samples[0] > 0.99);
        assert!(samples.windows(2).all(|w| w[1] <= w[0]));
        assert!(samples[RENDER_QUANTUM - 1] > 0.0);
    }
}
