use rodio::{OutputStream, Sink, Source};
use std::f32::consts::PI;
use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};
use std::thread;
use std::time::Duration;

use super::CompletionSignal;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Short sine beep whose gain decays exponentially to near silence.
pub struct ChimeTone {
    frequency: f32,
    start_gain: f32,
    end_gain: f32,
    sample_rate: u32,
    total_samples: usize,
    num_sample: usize,
}

impl ChimeTone {
    pub fn new(frequency: f32, volume: f32) -> Self {
        let sample_rate = 44100;
        Self {
            frequency,
            start_gain: volume.clamp(0.0, 1.0),
            end_gain: 0.01,
            sample_rate,
            total_samples: (sample_rate as f32 * 0.5) as usize,
            num_sample: 0,
        }
    }

    fn gain_at(&self, progress: f32) -> f32 {
        if self.start_gain <= self.end_gain {
            return self.start_gain;
        }
        self.start_gain * (self.end_gain / self.start_gain).powf(progress)
    }
}

impl Iterator for ChimeTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / self.sample_rate as f32;
        let progress = self.num_sample as f32 / self.total_samples as f32;
        self.num_sample += 1;

        Some((2.0 * PI * self.frequency * t).sin() * self.gain_at(progress))
    }
}

impl Source for ChimeTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(500))
    }
}

/// Plays the chime on a dedicated thread that owns the (non-`Send`) output
/// stream. Requests are queued and never block the timer.
pub struct ChimePlayer {
    tx: Mutex<Option<Sender<ChimeTone>>>,
    frequency: f32,
    volume: f32,
}

impl ChimePlayer {
    pub fn new(frequency: f32, volume: f32) -> Self {
        Self {
            tx: Mutex::new(None),
            frequency,
            volume,
        }
    }

    fn ensure_thread(&self) -> Result<Sender<ChimeTone>, String> {
        let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<ChimeTone>();
        thread::Builder::new()
            .name("chime".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => output,
                    Err(e) => {
                        log_warn!("Failed to open audio output for chime: {}", e);
                        return;
                    }
                };
                while let Ok(tone) = rx.recv() {
                    match Sink::try_new(&handle) {
                        Ok(sink) => {
                            sink.append(tone);
                            sink.sleep_until_end();
                        }
                        Err(e) => log_warn!("Failed to create chime sink: {}", e),
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl CompletionSignal for ChimePlayer {
    fn notify_completion(&self, task_name: &str) {
        log_info!("Playing completion chime for {}", task_name);
        let sent = self
            .ensure_thread()
            .and_then(|tx| tx.send(ChimeTone::new(self.frequency, self.volume)).map_err(|e| e.to_string()));
        if let Err(e) = sent {
            log_warn!("Completion chime unavailable: {}", e);
            // Drop the dead sender so the next finish retries the device.
            if let Ok(mut guard) = self.tx.lock() {
                *guard = None;
            }
        }
    }
}
