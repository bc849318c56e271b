// src/audio_io.rs

//! Opens the output device and drives the live graph from its callback.

use crate::audio_device;
use crate::audio_engine::{LiveEngine, LiveGraph};
use crate::chain::ChainState;
use anyhow::Result;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, Stream, StreamConfig};
use ringbuf::HeapProducer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A running output stream plus the control half of the engine bound to it.
pub struct LiveOutput {
    pub engine: LiveEngine,
    pub device_name: String,
    pub sample_rate: u32,
    pub xrun_count: Arc<AtomicUsize>,
    _stream: Stream,
}

pub fn init_and_run_stream(
    output_device_name: Option<&str>,
    chain: &ChainState,
    meter_tap: HeapProducer<f32>,
) -> Result<LiveOutput> {
    let device = audio_device::find_output_device(output_device_name)?;
    let device_name = device.name()?;
    let default_config = device.default_output_config()?;
    let sample_format = default_config.sample_format();
    let config: StreamConfig = default_config.into();
    let sample_rate = config.sample_rate.0;

    let (engine, graph) = LiveEngine::new(sample_rate, chain, meter_tap)?;
    let xrun_count = Arc::new(AtomicUsize::new(0));

    let stream = match sample_format {
        SampleFormat::F32 => build_output_stream::<f32>(&device, &config, graph, xrun_count.clone())?,
        SampleFormat::I16 => build_output_stream::<i16>(&device, &config, graph, xrun_count.clone())?,
        SampleFormat::U16 => build_output_stream::<u16>(&device, &config, graph, xrun_count.clone())?,
        format => return Err(anyhow::anyhow!("Unsupported sample format {}", format)),
    };
    stream.play()?;

    tracing::info!(
        device = %device_name,
        sample_rate,
        channels = config.channels,
        "output stream started"
    );

    Ok(LiveOutput {
        engine,
        device_name,
        sample_rate,
        xrun_count,
        _stream: stream,
    })
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut graph: LiveGraph,
    xrun_count: Arc<AtomicUsize>,
) -> Result<Stream>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = move |err| {
        tracing::error!("an error occurred on output stream: {}", err);
        xrun_count.fetch_add(1, Ordering::Relaxed);
    };
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            graph.handle_commands();
            scratch.resize(data.len(), 0.0);
            graph.render_interleaved(&mut scratch, channels);
            for (out, sample) in data.iter_mut().zip(&scratch) {
                *out = T::from_sample(*sample);
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
