// src/host/convolver.rs

//! Partitioned FFT convolution.
//!
//! The impulse is cut into blocks of one render quantum and transformed once
//! up front ([`PreparedImpulse`]), so the expensive part can run off the audio
//! thread. Each quantum the convolver transforms the last two input blocks,
//! multiplies them against every partition through a frequency-domain delay
//! line and keeps the second half of the inverse transform (overlap-save).
//! The result has no latency beyond the quantum itself.

use super::buffer::{AudioBlock, AudioBuffer, RENDER_QUANTUM};
use super::DspUnit;
use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::any::Any;
use std::sync::Arc;

const BLOCK: usize = RENDER_QUANTUM;
const FFT_SIZE: usize = 2 * BLOCK;
const BINS: usize = FFT_SIZE / 2 + 1;

/// Loudness normalization constants shared with browser convolvers, so an
/// impulse sounds equally loud regardless of its length.
const GAIN_CALIBRATION_DB: f32 = -58.0;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

/// Frequency-domain partitions of an impulse, one set per output channel,
/// with normalization already applied.
#[derive(Debug, Clone)]
pub struct PreparedImpulse {
    channels: Vec<Vec<Vec<Complex<f32>>>>,
    scale: f32,
    frames: usize,
}

impl PreparedImpulse {
    /// Partitions `impulse` for a graph with `channel_count` channels. A mono
    /// graph hears the average of every impulse channel; wider graphs take
    /// impulse channel `c % n` for output channel `c`.
    pub fn prepare(impulse: &AudioBuffer, channel_count: usize) -> Self {
        let scale = normalization_scale(impulse);
        let frames = impulse.frames();
        let source_channels = impulse.channel_count();
        if source_channels == 0 || frames == 0 {
            return Self {
                channels: Vec::new(),
                scale,
                frames: 0,
            };
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(FFT_SIZE);

        let mut channels = Vec::with_capacity(channel_count.max(1));
        for out_channel in 0..channel_count.max(1) {
            let taps: Vec<f32> = if channel_count == 1 && source_channels > 1 {
                (0..frames)
                    .map(|i| {
                        impulse.channels().iter().map(|c| c[i]).sum::<f32>() / source_channels as f32
                    })
                    .collect()
            } else {
                impulse.channel(out_channel % source_channels).to_vec()
            };
            channels.push(partition(&taps, scale, forward.as_ref()));
        }

        Self {
            channels,
            scale,
            frames,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Length of the impulse in frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn partitions(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }
}

fn normalization_scale(impulse: &AudioBuffer) -> f32 {
    let channels = impulse.channel_count();
    let frames = impulse.frames();
    let energy: f64 = impulse
        .channels()
        .iter()
        .flat_map(|c| c.iter())
        .map(|s| (*s as f64) * (*s as f64))
        .sum();
    let mut power = if channels == 0 || frames == 0 {
        0.0
    } else {
        (energy / (channels * frames) as f64).sqrt() as f32
    };
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }

    let mut scale = 1.0 / power;
    scale *= 10f32.powf(GAIN_CALIBRATION_DB / 20.0);
    scale *= GAIN_CALIBRATION_SAMPLE_RATE / impulse.sample_rate().max(1) as f32;
    if channels == 4 {
        scale *= 0.5;
    }
    scale
}

fn partition(taps: &[f32], scale: f32, forward: &dyn RealToComplex<f32>) -> Vec<Vec<Complex<f32>>> {
    let mut time = vec![0.0f32; FFT_SIZE];
    let mut partitions = Vec::with_capacity(taps.len().div_ceil(BLOCK));
    for chunk in taps.chunks(BLOCK) {
        time.fill(0.0);
        for (dst, src) in time.iter_mut().zip(chunk) {
            *dst = *src * scale;
        }
        let mut spectrum = vec![Complex::new(0.0, 0.0); BINS];
        if let Err(e) = forward.process(&mut time, &mut spectrum) {
            tracing::warn!("impulse partition transform failed: {}", e);
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        partitions.push(spectrum);
    }
    partitions
}

struct ChannelState {
    frame: Vec<f32>,
    history: Vec<Vec<Complex<f32>>>,
    head: usize,
}

impl ChannelState {
    fn new(partitions: usize) -> Self {
        Self {
            frame: vec![0.0; FFT_SIZE],
            history: vec![vec![Complex::new(0.0, 0.0); BINS]; partitions],
            head: 0,
        }
    }
}

pub struct Convolver {
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    channel_count: usize,
    impulse: Option<PreparedImpulse>,
    state: Vec<ChannelState>,
    time: Vec<f32>,
    accumulator: Vec<Complex<f32>>,
    forward_scratch: Vec<Complex<f32>>,
    inverse_scratch: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(channel_count: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(FFT_SIZE);
        let inverse = planner.plan_fft_inverse(FFT_SIZE);
        let forward_scratch = forward.make_scratch_vec();
        let inverse_scratch = inverse.make_scratch_vec();
        Self {
            forward,
            inverse,
            channel_count: channel_count.max(1),
            impulse: None,
            state: Vec::new(),
            time: vec![0.0; FFT_SIZE],
            accumulator: vec![Complex::new(0.0, 0.0); BINS],
            forward_scratch,
            inverse_scratch,
        }
    }

    pub fn has_impulse(&self) -> bool {
        self.impulse.is_some()
    }

    pub fn impulse(&self) -> Option<&PreparedImpulse> {
        self.impulse.as_ref()
    }

    /// Installs an already partitioned impulse and clears the running tail.
    pub fn set_impulse(&mut self, impulse: PreparedImpulse) {
        let partitions = impulse.partitions();
        self.state = (0..self.channel_count)
            .map(|_| ChannelState::new(partitions))
            .collect();
        self.impulse = Some(impulse);
    }

    /// Partitions `buffer` in place and installs it.
    pub fn set_buffer(&mut self, buffer: &AudioBuffer) {
        let prepared = PreparedImpulse::prepare(buffer, self.channel_count);
        self.set_impulse(prepared);
    }
}

impl DspUnit for Convolver {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock) {
        output.silence();
        let Some(impulse) = self.impulse.as_ref() else {
            return;
        };
        if impulse.channels.is_empty() {
            return;
        }

        let channels = output.channel_count().min(self.state.len());
        for channel in 0..channels {
            let partitions = &impulse.channels[channel % impulse.channels.len()];
            let state = &mut self.state[channel];
            let count = state.history.len();
            if count == 0 {
                continue;
            }

            state.frame.copy_within(BLOCK.., 0);
            state.frame[BLOCK..].copy_from_slice(input.channel(channel.min(input.channel_count() - 1)));
            self.time.copy_from_slice(&state.frame);

            state.head = (state.head + count - 1) % count;
            let head = state.head;
            if self
                .forward
                .process_with_scratch(&mut self.time, &mut state.history[head], &mut self.forward_scratch)
                .is_err()
            {
                continue;
            }

            self.accumulator.fill(Complex::new(0.0, 0.0));
            for (k, kernel) in partitions.iter().enumerate().take(count) {
                let spectrum = &state.history[(head + k) % count];
                for ((acc, x), h) in self.accumulator.iter_mut().zip(spectrum).zip(kernel) {
                    *acc += x * h;
                }
            }
            self.accumulator[0].im = 0.0;
            self.accumulator[BINS - 1].im = 0.0;

            if self
                .inverse
                .process_with_scratch(&mut self.accumulator, &mut self.time, &mut self.inverse_scratch)
                .is_err()
            {
                continue;
            }
            let norm = 1.0 / FFT_SIZE as f32;
            for (dst, src) in output.channel_mut(channel).iter_mut().zip(&self.time[BLOCK..]) {
                *dst = *src * norm;
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

    fn direct(x: &[f32], h: &[f32], scale: f32) -> Vec<f32> {
        (0..x.len())
            .map(|n| {
                (0..h.len())
                    .filter(|k| *k <= n)
                    .map(|k| x[n - k] * h[k] * scale)
                    .sum()
            })
            .collect()
    }

    fn run(convolver: &mut Convolver, x: &[f32]) -> Vec<f32> {
        let mut out = Vec::new();
        for chunk in x.chunks(BLOCK) {
            let mut input = AudioBlock::new(1);
            input.channel_mut(0)[..chunk.len()].copy_from_slice(chunk);
            let mut output = AudioBlock::new(1);
            convolver.process(&input, &mut output);
            out.extend_from_slice(&output.channel(0)[..chunk.len()]);
        }
        out
    }

    #[test]
    fn matches_direct_convolution_across_partitions() {
        let h: Vec<f32> = (0..300).map(|i| ((i * 7 % 13) as f32 - 6.0) / 10.0).collect();
        let x: Vec<f32> = (0..640).map(|i| ((i * 5 % 11) as f32 - 5.0) / 8.0).collect();
        let impulse = AudioBuffer::new(44100, vec![h.clone()]);
        let mut convolver = Convolver::new(1);
        convolver.set_buffer(&impulse);
        let scale = convolver.impulse().map(PreparedImpulse::scale).unwrap_or(1.0);
        assert_eq!(convolver.impulse().map(PreparedImpulse::partitions), Some(3));

        let got = run(&mut convolver, &x);
        let want = direct(&x, &h, scale);
        for (i, (a, b)) in got.iter().zip(&want).enumerate() {
            assert!((a - b).abs() < 1e-3 * scale.max(1.0), "sample {i}: {a} vs {b}");
        }
    }

    #[test]
    fn partitions_hold_the_scaled_impulse_spectrum() {
        let impulse = AudioBuffer::new(44100, vec![vec![1.0; 300]]);
        let prepared = PreparedImpulse::prepare(&impulse, 1);
        let scale = prepared.scale();
        let dc: Vec<f32> = prepared.channels[0].iter().map(|p| p[0].re).collect();
        assert_eq!(dc.len(), 3);
        for (got, taps) in dc.iter().zip([128.0f32, 128.0, 44.0]) {
            assert!((got - taps * scale).abs() < 1e-3 * taps * scale, "{got}");
        }
    }

    #[test]
    fn without_impulse_output_is_silent() {
        let mut convolver = Convolver::new(1);
        assert!(!convolver.has_impulse());
        let out = run(&mut convolver, &[1.0; 256]);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn normalization_follows_browser_calibration() {
        let impulse = AudioBuffer::new(44100, vec![vec![1.0; 100]]);
        let prepared = PreparedImpulse::prepare(&impulse, 2);
        let expected = 10f32.powf(-58.0 / 20.0);
        assert!((prepared.scale() - expected).abs() < 1e-6);

        let silent = AudioBuffer::new(22050, vec![vec![0.0; 100]]);
        let prepared = PreparedImpulse::prepare(&silent, 2);
        let expected = (1.0 / MIN_POWER) * 10f32.powf(-58.0 / 20.0) * 2.0;
        assert!((prepared.scale() - expected).abs() / expected < 1e-5);
    }

    #[test]
    fn mono_graph_hears_the_channel_average() {
        let impulse = AudioBuffer::new(44100, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let prepared = PreparedImpulse::prepare(&impulse, 1);
        let mut convolver = Convolver::new(1);
        let scale = prepared.scale();
        convolver.set_impulse(prepared);
        let out = run(&mut convolver, &[1.0]);
        assert!((out[0] - 0.5 * scale).abs() < 1e-4 * scale);
    }
}
