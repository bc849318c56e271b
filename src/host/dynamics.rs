// src/host/dynamics.rs

//! Feed-forward dynamics compressor with a fixed soft knee and automatic
//! makeup gain. Channels share one detector so the stereo image holds.

use super::buffer::{AudioBlock, RENDER_QUANTUM};
use super::param::AudioParam;
use super::DspUnit;
use std::any::Any;

pub const DEFAULT_KNEE_DB: f32 = 30.0;
const DETECTOR_FLOOR: f32 = 1e-6;
const MAKEUP_EXPONENT: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct Dynamics {
    threshold: AudioParam,
    knee: AudioParam,
    ratio: AudioParam,
    attack: AudioParam,
    release: AudioParam,
    sample_rate: f32,
    /// Smoothed gain reduction in dB, zero or negative.
    envelope: f32,
}

impl Dynamics {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            threshold: AudioParam::new(-24.0, -100.0, 0.0, sample_rate),
            knee: AudioParam::new(DEFAULT_KNEE_DB, 0.0, 40.0, sample_rate),
            ratio: AudioParam::new(12.0, 1.0, 20.0, sample_rate),
            attack: AudioParam::new(0.003, 0.0, 1.0, sample_rate),
            release: AudioParam::new(0.25, 0.0, 1.0, sample_rate),
            sample_rate,
            envelope: 0.0,
        }
    }

    pub fn threshold_mut(&mut self) -> &mut AudioParam {
        &mut self.threshold
    }

    pub fn knee_mut(&mut self) -> &mut AudioParam {
        &mut self.knee
    }

    pub fn ratio_mut(&mut self) -> &mut AudioParam {
        &mut self.ratio
    }

    pub fn attack_mut(&mut self) -> &mut AudioParam {
        &mut self.attack
    }

    pub fn release_mut(&mut self) -> &mut AudioParam {
        &mut self.release
    }

    pub fn threshold(&self) -> &AudioParam {
        &self.threshold
    }

    pub fn ratio(&self) -> &AudioParam {
        &self.ratio
    }

    pub fn attack(&self) -> &AudioParam {
        &self.attack
    }

    pub fn release(&self) -> &AudioParam {
        &self.release
    }

    /// Current gain reduction in dB (zero or negative).
    pub fn reduction(&self) -> f32 {
        self.envelope
    }

    fn smoothing(&self, seconds: f32) -> f32 {
        if seconds <= 0.0 {
            0.0
        } else {
            (-1.0 / (seconds * self.sample_rate)).exp()
        }
    }
}

/// Static transfer curve: input level in dB to output level in dB.
pub fn curve(input_db: f32, threshold: f32, knee: f32, ratio: f32) -> f32 {
    let over = input_db - threshold;
    if 2.0 * over < -knee {
        input_db
    } else if knee > 0.0 && 2.0 * over.abs() <= knee {
        let x = over + knee / 2.0;
        input_db + (1.0 / ratio - 1.0) * x * x / (2.0 * knee)
    } else {
        threshold + over / ratio
    }
}

impl DspUnit for Dynamics {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock) {
        let threshold = self.threshold.advance(RENDER_QUANTUM);
        let knee = self.knee.advance(RENDER_QUANTUM);
        let ratio = self.ratio.advance(RENDER_QUANTUM);
        let attack_secs = self.attack.advance(RENDER_QUANTUM);
        let release_secs = self.release.advance(RENDER_QUANTUM);
        let attack = self.smoothing(attack_secs);
        let release = self.smoothing(release_secs);
        let makeup_db = MAKEUP_EXPONENT * -curve(0.0, threshold, knee, ratio);

        for frame in 0..RENDER_QUANTUM {
            let peak = input
                .channels()
                .iter()
                .map(|c| c[frame].abs())
                .fold(0.0f32, f32::max)
                .max(DETECTOR_FLOOR);
            let level_db = 20.0 * peak.log10();
            let wanted = curve(level_db, threshold, knee, ratio) - level_db;
            let coeff = if wanted < self.envelope { attack } else { release };
            self.envelope = wanted + coeff * (self.envelope - wanted);

            let gain = 10f32.powf((self.envelope + makeup_db) / 20.0);
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
    fn curve_is_continuous_at_the_knee_edges() {
        let (t, w, r) = (-24.0, 30.0, 4.0);
        let below = curve(t - w / 2.0 - 1e-3, t, w, r);
        let at_low = curve(t - w / 2.0, t, w, r);
        assert!((below - at_low).abs() < 1e-2);
        let above = curve(t + w / 2.0 + 1e-3, t, w, r);
        let at_high = curve(t + w / 2.0, t, w, r);
        assert!((above - at_high).abs() < 1e-2);
    }

    #[test]
    fn quiet_signals_pass_with_makeup_only() {
        let mut comp = Dynamics::new(44100.0);
        comp.threshold_mut().set_value(-10.0);
        comp.ratio_mut().set_value(4.0);
        let mut input = AudioBlock::new(1);
        input.channel_mut(0).fill(0.001);
        let mut output = AudioBlock::new(1);
        comp.process(&input, &mut output);
        let makeup = 10f32.powf(MAKEUP_EXPONENT * -curve(0.0, -10.0, DEFAULT_KNEE_DB, 4.0) / 20.0);
        assert!((output.channel(0)[127] - 0.001 * makeup).abs() < 1e-6);
    }

    #[test]
    fn loud_signals_are_reduced() {
        let mut comp = Dynamics::new(44100.0);
        comp.threshold_mut().set_value(-30.0);
        comp.ratio_mut().set_value(10.0);
        comp.attack_mut().set_value(0.0);
        let mut input = AudioBlock::new(2);
        input.channel_mut(0).fill(1.0);
        input.channel_mut(1).fill(1.0);
        let mut output = AudioBlock::new(2);
        comp.process(&input, &mut output);
        assert!(comp.reduction() < -20.0);
        assert_eq!(output.channel(0)[64], output.channel(1)[64]);
    }

    #[test]
    fn release_recovers_gradually() {
        let mut comp = Dynamics::new(44100.0);
        comp.attack_mut().set_value(0.0);
        let mut loud = AudioBlock::new(1);
        loud.channel_mut(0).fill(1.0);
        let mut output = AudioBlock::new(1);
        comp.process(&loud, &mut output);
        let squeezed = comp.reduction();
        comp.process(&AudioBlock::new(1), &mut output);
        assert!(comp.reduction() > squeezed);
        assert!(comp.reduction() < 0.0);
    }
}
