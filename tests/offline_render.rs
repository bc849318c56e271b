use fxrack::catalog::EffectKind;
use fxrack::chain::ChainState;
use fxrack::host::AudioBuffer;
use fxrack::{offline, wav};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f32::consts::TAU;
use std::sync::Arc;

fn stereo_tone(sample_rate: u32, seconds: f32) -> Arc<AudioBuffer> {
    let frames = (sample_rate as f32 * seconds) as usize;
    let left = (0..frames)
        .map(|i| 0.5 * (TAU * 220.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    let right = (0..frames)
        .map(|i| 0.3 * (TAU * 330.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    Arc::new(AudioBuffer::new(sample_rate, vec![left, right]))
}

fn max_difference(a: &AudioBuffer, b: &AudioBuffer) -> f32 {
    assert_eq!(a.channel_count(), b.channel_count());
    assert_eq!(a.frames(), b.frames());
    a.channels()
        .iter()
        .zip(b.channels())
        .flat_map(|(x, y)| x.iter().zip(y).map(|(p, q)| (p - q).abs()))
        .fold(0.0, f32::max)
}

#[test]
fn default_chain_renders_exact_length() {
    let source = stereo_tone(44100, 5.0);
    let rendered = offline::render(&ChainState::new(), source).unwrap();
    assert_eq!(rendered.frames(), 220500);
    assert_eq!(rendered.channel_count(), 2);
    assert_eq!(rendered.sample_rate(), 44100);
    assert!(rendered.channels().iter().flatten().all(|s| s.is_finite()));

    let bytes = wav::encode(&rendered);
    assert_eq!(bytes.len(), 44 + 220500 * 2 * 2);
}

#[test]
fn fully_bypassed_chain_reproduces_the_source() {
    let source = stereo_tone(44100, 0.5);
    let mut chain = ChainState::new();
    for kind in EffectKind::ALL {
        chain.set_bypass(kind, true);
    }
    let rendered = offline::render(&chain, source.clone()).unwrap();
    assert!(max_difference(&rendered, &source) < 1e-6);
}

#[test]
fn flat_eq_matches_compressor_alone() {
    let source = stereo_tone(44100, 1.0);

    let mut with_eq = ChainState::new();
    with_eq.set_bypass(EffectKind::Delay, true);
    with_eq.set_bypass(EffectKind::Reverb, true);
    for key in ["low_gain", "mid_gain", "high_gain"] {
        with_eq.set_parameter(EffectKind::Equalizer, key, 0.0);
    }

    let mut compressor_only = with_eq.clone();
    compressor_only.set_bypass(EffectKind::Equalizer, true);

    let a = offline::render(&with_eq, source.clone()).unwrap();
    let b = offline::render(&compressor_only, source).unwrap();
    assert!(max_difference(&a, &b) < 1e-4);
}

#[test]
fn bypass_toggle_round_trip_restores_output() {
    let source = stereo_tone(22050, 1.0);
    let mut chain = ChainState::new();
    chain.set_parameter(EffectKind::Reverb, "decay", 0.5);
    chain.set_parameter(EffectKind::Delay, "time", 0.1);

    let reference = offline::render_with(&mut StdRng::seed_from_u64(7), &chain, source.clone()).unwrap();

    chain.set_bypass(EffectKind::Compressor, true);
    chain.set_bypass(EffectKind::Compressor, false);
    let toggled = offline::render_with(&mut StdRng::seed_from_u64(7), &chain, source).unwrap();

    assert!(max_difference(&reference, &toggled) < 1e-6);
}

#[test]
fn reordering_changes_output_but_not_length() {
    let source = stereo_tone(22050, 0.5);
    let mut chain = ChainState::new();
    chain.set_bypass(EffectKind::Reverb, true);
    chain.set_parameter(EffectKind::Equalizer, "low_gain", 12.0);
    chain.set_parameter(EffectKind::Compressor, "threshold", -40.0);

    let before = offline::render(&chain, source.clone()).unwrap();
    chain.set_order(&[
        EffectKind::Compressor,
        EffectKind::Equalizer,
        EffectKind::Delay,
        EffectKind::Reverb,
    ]);
    let after = offline::render(&chain, source).unwrap();

    assert_eq!(before.frames(), after.frames());
    assert!(max_difference(&before, &after) > 1e-3);
}

#[test]
fn mono_source_renders_mono() {
    let frames = 8000;
    let samples = (0..frames).map(|i| ((i % 50) as f32 / 25.0) - 1.0).collect();
    let source = Arc::new(AudioBuffer::new(16000, vec![samples]));
    let rendered = offline::render(&ChainState::new(), source).unwrap();
    assert_eq!(rendered.channel_count(), 1);
    assert_eq!(rendered.frames(), frames);
    assert_eq!(rendered.sample_rate(), 16000);
}

fn only(kind: EffectKind) -> ChainState {
    let mut chain = ChainState::new();
    for other in EffectKind::ALL {
        chain.set_bypass(other, other != kind);
    }
    chain
}

fn rms(buffer: &AudioBuffer) -> f32 {
    let samples = buffer.channel(0);
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn mono_tone(sample_rate: u32, freq: f32, amplitude: f32, seconds: f32) -> Arc<AudioBuffer> {
    let frames = (sample_rate as f32 * seconds) as usize;
    let samples = (0..frames)
        .map(|i| amplitude * (TAU * freq * i as f32 / sample_rate as f32).sin())
        .collect();
    Arc::new(AudioBuffer::new(sample_rate, vec![samples]))
}

#[test]
fn eq_boost_reaches_the_render() {
    let source = mono_tone(44100, 100.0, 0.1, 0.5);
    let flat = offline::render(&only(EffectKind::Equalizer), source.clone()).unwrap();

    let mut boosted_chain = only(EffectKind::Equalizer);
    boosted_chain.set_parameter(EffectKind::Equalizer, "low_gain", 24.0);
    let boosted = offline::render(&boosted_chain, source).unwrap();

    assert!(rms(&boosted) > 4.0 * rms(&flat), "flat={} boosted={}", rms(&flat), rms(&boosted));
}

#[test]
fn compressor_threshold_reaches_the_render() {
    let source = mono_tone(44100, 440.0, 0.5, 0.5);
    let default = offline::render(&only(EffectKind::Compressor), source.clone()).unwrap();

    let mut chain = only(EffectKind::Compressor);
    chain.set_parameter(EffectKind::Compressor, "threshold", -60.0);
    let squeezed = offline::render(&chain, source).unwrap();

    assert!(max_difference(&default, &squeezed) > 1e-3);
}

#[test]
fn delay_time_reaches_the_render() {
    let source = mono_tone(22050, 330.0, 0.5, 0.2);
    let default = offline::render(&only(EffectKind::Delay), source.clone()).unwrap();

    let mut chain = only(EffectKind::Delay);
    chain.set_parameter(EffectKind::Delay, "time", 0.05);
    let short = offline::render(&chain, source).unwrap();

    assert!(max_difference(&default, &short) > 1e-3);
}

#[test]
fn reverb_mix_reaches_the_render() {
    let source = mono_tone(22050, 220.0, 0.5, 0.5);
    let mut dry_chain = only(EffectKind::Reverb);
    dry_chain.set_parameter(EffectKind::Reverb, "decay", 0.5);
    let mut wet_chain = dry_chain.clone();
    wet_chain.set_parameter(EffectKind::Reverb, "mix", 0.9);

    let default = offline::render_with(&mut StdRng::seed_from_u64(3), &dry_chain, source.clone()).unwrap();
    let wet = offline::render_with(&mut StdRng::seed_from_u64(3), &wet_chain, source).unwrap();

    assert!(max_difference(&default, &wet) > 1e-3);
}
