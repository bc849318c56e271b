// src/host/biquad.rs

//! Second-order shelving and peaking filters (RBJ cookbook).
//!
//! Coefficients are recomputed once per quantum whenever the gain differs
//! from the one they were designed for, and the recursion runs in `f64`.

use super::buffer::{AudioBlock, RENDER_QUANTUM};
use super::param::AudioParam;
use super::DspUnit;
use std::any::Any;
use std::f64::consts::PI;

/// Gain range in dB accepted by the filter's gain parameter.
pub const GAIN_RANGE_DB: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadKind {
    LowShelf,
    Peaking,
    HighShelf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

#[derive(Debug, Clone)]
pub struct Biquad {
    kind: BiquadKind,
    frequency: f32,
    q: f32,
    gain_db: AudioParam,
    sample_rate: f32,
    coefficients: Coefficients,
    /// Gain the current coefficients were designed for.
    designed_gain_db: f32,
    history: Vec<History>,
}

impl Biquad {
    pub fn new(kind: BiquadKind, frequency: f32, sample_rate: f32, channel_count: usize) -> Self {
        let gain_db = AudioParam::new(0.0, -GAIN_RANGE_DB, GAIN_RANGE_DB, sample_rate);
        let q = 1.0;
        Self {
            kind,
            frequency,
            q,
            coefficients: Self::design(kind, frequency, q, 0.0, sample_rate),
            designed_gain_db: 0.0,
            gain_db,
            sample_rate,
            history: vec![History::default(); channel_count],
        }
    }

    pub fn kind(&self) -> BiquadKind {
        self.kind
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn gain_db(&self) -> &AudioParam {
        &self.gain_db
    }

    pub fn gain_db_mut(&mut self) -> &mut AudioParam {
        &mut self.gain_db
    }

    fn design(kind: BiquadKind, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
        let nyquist = sample_rate as f64 / 2.0;
        let frequency = (frequency as f64).clamp(1.0, nyquist * 0.999);
        let a = 10f64.powf(gain_db as f64 / 40.0);
        let w0 = 2.0 * PI * frequency / sample_rate as f64;
        let (sin_w0, cos_w0) = w0.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match kind {
            BiquadKind::LowShelf => {
                // Shelf slope S = 1.
                let alpha = sin_w0 / 2.0 * 2f64.sqrt();
                let k = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + k),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - k),
                    (a + 1.0) + (a - 1.0) * cos_w0 + k,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - k,
                )
            }
            BiquadKind::HighShelf => {
                let alpha = sin_w0 / 2.0 * 2f64.sqrt();
                let k = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + k),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - k),
                    (a + 1.0) - (a - 1.0) * cos_w0 + k,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - k,
                )
            }
            BiquadKind::Peaking => {
                let alpha = sin_w0 / (2.0 * q as f64);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        Coefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

impl DspUnit for Biquad {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock) {
        let gain_db = self.gain_db.advance(RENDER_QUANTUM);
        if gain_db != self.designed_gain_db {
            self.coefficients =
                Self::design(self.kind, self.frequency, self.q, gain_db, self.sample_rate);
            self.designed_gain_db = gain_db;
        }
        let c = self.coefficients;

        for ((dst, src), h) in output
            .channels_mut()
            .iter_mut()
            .zip(input.channels())
            .zip(self.history.iter_mut())
        {
            for (d, s) in dst.iter_mut().zip(src) {
                let x = *s as f64;
                let y = c.b0 * x + c.b1 * h.x1 + c.b2 * h.x2 - c.a1 * h.y1 - c.a2 * h.y2;
                h.x2 = h.x1;
                h.x1 = x;
                h.y2 = h.y1;
                // Flush denormals in long silent tails.
                h.y1 = if y.abs() < 1e-30 { 0.0 } else { y };
                *d = y as f32;
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

    fn run(filter: &mut Biquad, signal: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(signal.len());
        for chunk in signal.chunks(RENDER_QUANTUM) {
            let mut input = AudioBlock::new(1);
            input.channel_mut(0)[..chunk.len()].copy_from_slice(chunk);
            let mut output = AudioBlock::new(1);
            filter.process(&input, &mut output);
            out.extend_from_slice(&output.channel(0)[..chunk.len()]);
        }
        out
    }

    fn sine(freq: f32, sr: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin() * 0.5)
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|s| s * s).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn zero_gain_is_transparent_for_every_shape() {
        let signal = sine(440.0, 44100.0, 4096);
        for kind in [BiquadKind::LowShelf, BiquadKind::Peaking, BiquadKind::HighShelf] {
            let mut filter = Biquad::new(kind, 1000.0, 44100.0, 1);
            let out = run(&mut filter, &signal);
            for (a, b) in signal.iter().zip(&out) {
                assert!((a - b).abs() < 1e-5, "{kind:?}");
            }
        }
    }

    #[test]
    fn low_shelf_boosts_lows_and_leaves_highs() {
        let sr = 44100.0;
        let mut low = Biquad::new(BiquadKind::LowShelf, 320.0, sr, 1);
        low.gain_db_mut().set_value(12.0);
        let bass = sine(50.0, sr, 44100);
        let out = run(&mut low, &bass);
        let gain = rms(&out[22050..]) / rms(&bass[22050..]);
        assert!((gain - 10f32.powf(12.0 / 20.0)).abs() < 0.2, "gain={gain}");

        let mut low = Biquad::new(BiquadKind::LowShelf, 320.0, sr, 1);
        low.gain_db_mut().set_value(12.0);
        let treble = sine(10000.0, sr, 44100);
        let out = run(&mut low, &treble);
        let gain = rms(&out[22050..]) / rms(&treble[22050..]);
        assert!((gain - 1.0).abs() < 0.05, "gain={gain}");
    }

    #[test]
    fn gain_set_after_construction_is_applied_on_next_block() {
        let sr = 44100.0;
        let bass = sine(100.0, sr, 8192);
        let mut flat = Biquad::new(BiquadKind::LowShelf, 320.0, sr, 1);
        let mut boosted = Biquad::new(BiquadKind::LowShelf, 320.0, sr, 1);
        boosted.gain_db_mut().set_value(24.0);
        assert!(!boosted.gain_db().is_settling());

        let flat_rms = rms(&run(&mut flat, &bass)[4096..]);
        let boosted_rms = rms(&run(&mut boosted, &bass)[4096..]);
        assert!(boosted_rms > 4.0 * flat_rms, "flat={flat_rms} boosted={boosted_rms}");

        boosted.gain_db_mut().set_value(0.0);
        let back = rms(&run(&mut boosted, &bass)[4096..]);
        assert!((back - flat_rms).abs() < 1e-3, "back={back}");
    }

    #[test]
    fn peaking_cut_attenuates_center() {
        let sr = 44100.0;
        let mut mid = Biquad::new(BiquadKind::Peaking, 1000.0, sr, 1);
        mid.gain_db_mut().set_value(-12.0);
        let tone = sine(1000.0, sr, 44100);
        let out = run(&mut mid, &tone);
        let gain = rms(&out[22050..]) / rms(&tone[22050..]);
        assert!((gain - 10f32.powf(-12.0 / 20.0)).abs() < 0.02, "gain={gain}");
    }
}
