// src/host/analyser.rs

//! Pass-through tap that streams a mono mixdown to a meter.

use super::buffer::{AudioBlock, RENDER_QUANTUM};
use super::DspUnit;
use ringbuf::HeapProducer;
use std::any::Any;

pub struct Analyser {
    tap: HeapProducer<f32>,
    scratch: [f32; RENDER_QUANTUM],
}

impl Analyser {
    pub fn new(tap: HeapProducer<f32>) -> Self {
        Self {
            tap,
            scratch: [0.0; RENDER_QUANTUM],
        }
    }
}

impl DspUnit for Analyser {
    fn process(&mut self, input: &AudioBlock, output: &mut AudioBlock) {
        output.copy_from(input);
        let channels = input.channel_count().max(1) as f32;
        for (frame, slot) in self.scratch.iter_mut().enumerate() {
            *slot = input.channels().iter().map(|c| c[frame]).sum::<f32>() / channels;
        }
        // A slow reader just loses samples.
        self.tap.push_slice(&self.scratch);
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
    use ringbuf::HeapRb;

    #[test]
    fn passes_audio_and_feeds_the_tap() {
        let (producer, mut consumer) = HeapRb::<f32>::new(1024).split();
        let mut analyser = Analyser::new(producer);
        let mut input = AudioBlock::new(2);
        input.channel_mut(0).fill(1.0);
        let mut output = AudioBlock::new(2);
        analyser.process(&input, &mut output);
        assert_eq!(output.channel(0)[0], 1.0);
        let mut tapped = [0.0; RENDER_QUANTUM];
        assert_eq!(consumer.pop_slice(&mut tapped), RENDER_QUANTUM);
        assert_eq!(tapped[0], 0.5);
    }
}
