// src/audio_device.rs

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

/// Output devices of the default host with their names.
pub fn get_output_devices() -> Result<Vec<(String, Device)>> {
    let host = cpal::default_host();
    let devices = host.output_devices()?;
    let mut result = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            result.push((name, device));
        }
    }
    Ok(result)
}

/// Looks a device up by name, falling back to the host default.
pub fn find_output_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        if let Some((_, device)) = get_output_devices()?.into_iter().find(|(n, _)| n == name) {
            return Ok(device);
        }
        tracing::warn!(device = name, "output device not found, using default");
    }
    host.default_output_device()
        .ok_or_else(|| anyhow::anyhow!("No default output device"))
}
