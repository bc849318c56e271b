// src/meter.rs

//! Master level meter fed from the analyser tap.

use ringbuf::HeapConsumer;
use std::time::{Duration, Instant};

pub const WINDOW: usize = 2048;
const STRIDE: usize = 4;
const FLOOR: f32 = 0.0001;
const RANGE_DB: f32 = 60.0;
const PEAK_HOLD: Duration = Duration::from_secs(1);
const PEAK_DECAY: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterReading {
    /// RMS level in dBFS.
    pub db: f32,
    /// RMS level mapped onto 0..=1 over the -60..0 dB range.
    pub level: f32,
    /// Held peak mapped the same way.
    pub peak: f32,
}

/// Maps a dB value onto the meter's 0..=1 scale.
pub fn db_to_fraction(db: f32) -> f32 {
    ((db + RANGE_DB) / RANGE_DB).clamp(0.0, 1.0)
}

fn to_db(linear: f32) -> f32 {
    let linear = if linear > 0.0 { linear } else { FLOOR };
    20.0 * linear.log10()
}

pub struct MasterMeter {
    consumer: HeapConsumer<f32>,
    window: Vec<f32>,
    write_pos: usize,
    held_peak: f32,
    peak_time: Option<Instant>,
}

impl MasterMeter {
    pub fn new(consumer: HeapConsumer<f32>) -> Self {
        Self {
            consumer,
            window: vec![0.0; WINDOW],
            write_pos: 0,
            held_peak: 0.0,
            peak_time: None,
        }
    }

    fn drain(&mut self) {
        let mut chunk = [0.0f32; 256];
        loop {
            let read = self.consumer.pop_slice(&mut chunk);
            if read == 0 {
                break;
            }
            for sample in &chunk[..read] {
                self.window[self.write_pos] = *sample;
                self.write_pos = (self.write_pos + 1) % WINDOW;
            }
        }
    }

    pub fn update(&mut self) -> MeterReading {
        self.update_at(Instant::now())
    }

    /// Reads whatever the audio side produced and refreshes the reading.
    pub fn update_at(&mut self, now: Instant) -> MeterReading {
        self.drain();

        let mut sum = 0.0;
        let mut peak = 0.0f32;
        for sample in self.window.iter().step_by(STRIDE) {
            sum += sample * sample;
            peak = peak.max(sample.abs());
        }
        let rms = (sum / (WINDOW / STRIDE) as f32).sqrt();
        let db = to_db(rms);

        if peak > self.held_peak {
            self.held_peak = peak;
            self.peak_time = Some(now);
        } else if self
            .peak_time
            .map_or(true, |t| now.duration_since(t) > PEAK_HOLD)
        {
            self.held_peak *= PEAK_DECAY;
        }

        MeterReading {
            db,
            level: db_to_fraction(db),
            peak: db_to_fraction(to_db(self.held_peak)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::HeapRb;

    #[test]
    fn silence_reads_as_the_floor() {
        let (_producer, consumer) = HeapRb::<f32>::new(WINDOW).split();
        let mut meter = MasterMeter::new(consumer);
        let reading = meter.update();
        assert!((reading.db + 80.0).abs() < 1e-3);
        assert_eq!(reading.level, 0.0);
    }

    #[test]
    fn full_scale_square_reads_zero_db() {
        let (mut producer, consumer) = HeapRb::<f32>::new(WINDOW * 2).split();
        let mut meter = MasterMeter::new(consumer);
        let square: Vec<f32> = (0..WINDOW).map(|i| if i % 8 < 4 { 1.0 } else { -1.0 }).collect();
        producer.push_slice(&square);
        let reading = meter.update();
        assert!(reading.db.abs() < 1e-3);
        assert!((reading.level - 1.0).abs() < 1e-6);
        assert!((reading.peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn peak_holds_then_decays() {
        let (mut producer, consumer) = HeapRb::<f32>::new(WINDOW * 2).split();
        let mut meter = MasterMeter::new(consumer);
        producer.push_slice(&[0.5; WINDOW]);
        let start = Instant::now();
        let first = meter.update_at(start);
        producer.push_slice(&[0.0; WINDOW]);

        let held = meter.update_at(start + Duration::from_millis(500));
        assert_eq!(held.peak, first.peak);

        let decayed = meter.update_at(start + Duration::from_millis(1500));
        assert!(decayed.peak < first.peak);
    }

    #[test]
    fn fraction_maps_the_sixty_db_range() {
        assert_eq!(db_to_fraction(0.0), 1.0);
        assert_eq!(db_to_fraction(-30.0), 0.5);
        assert_eq!(db_to_fraction(-90.0), 0.0);
        assert_eq!(db_to_fraction(6.0), 1.0);
    }
}
