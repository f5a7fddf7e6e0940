use crate::clock::ManualClock;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use thiserror::Error;

/// One camera frame reduced to a brightness value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub brightness: f64,
    pub timestamp_ms: i64,
}

impl Frame {
    pub fn new(brightness: f64, timestamp_ms: i64) -> Self {
        Self {
            brightness,
            timestamp_ms,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("camera access denied")]
    Denied,
    #[error("frame source unavailable: {0}")]
    Unavailable(String),
    #[error("frame source i/o failure")]
    Io(#[from] std::io::Error),
}

/// Something that can yield brightness frames at roughly camera rate.
///
/// The session opens the source on start and releases it on stop or on an
/// acquisition error. `release` may be called more than once.
pub trait FrameSource {
    fn open(&mut self) -> Result<(), SourceError>;
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
    fn release(&mut self);
}

/// Mean of the red channel over tightly packed RGBA pixels.
pub fn mean_red(rgba: &[u8]) -> f64 {
    let pixels = rgba.len() / 4;
    if pixels == 0 {
        return 0.0;
    }
    let sum: u64 = rgba.chunks_exact(4).map(|px| px[0] as u64).sum();
    sum as f64 / pixels as f64
}

/// In-memory source useful for tests and deterministic playback.
#[derive(Debug, Default)]
pub struct ReplaySource {
    queue: VecDeque<Frame>,
    deny: bool,
    open: bool,
    releases: Arc<AtomicUsize>,
    clock: Option<ManualClock>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            queue: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A source whose `open` fails, as when camera permission is refused.
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    /// Move `clock` to each frame's timestamp as the frame is yielded, so a
    /// recording replays on its own timeline.
    pub fn driving(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Shared counter of `release` calls that actually closed the source.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl FrameSource for ReplaySource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.deny {
            return Err(SourceError::Denied);
        }
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if !self.open {
            return Err(SourceError::Unavailable("source not open".into()));
        }
        let frame = self.queue.pop_front();
        if let (Some(clock), Some(frame)) = (&self.clock, &frame) {
            clock.set(frame.timestamp_ms);
        }
        Ok(frame)
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Parameters of a synthetic fingertip recording.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyntheticPulseSpec {
    pub bpm: f64,
    pub seconds: f64,
    pub fps: f64,
    /// Half-width of the uniform sensor noise, in brightness units.
    pub noise: f64,
    pub seed: u64,
    pub start_ms: i64,
}

impl Default for SyntheticPulseSpec {
    fn default() -> Self {
        Self {
            bpm: 60.0,
            seconds: 20.0,
            fps: 30.0,
            noise: 0.3,
            seed: 7,
            start_ms: 0,
        }
    }
}

const BASELINE: f64 = 180.0;
const PULSE_AMPLITUDE: f64 = 2.0;
const DRIFT_AMPLITUDE: f64 = 0.8;
const DRIFT_HZ: f64 = 0.07;

/// Systolic upstroke followed by a smaller dicrotic wave, over one beat phase in `[0, 1)`.
fn pulse_shape(phase: f64) -> f64 {
    let systolic = (-((phase - 0.15) / 0.07).powi(2)).exp();
    let dicrotic = 0.35 * (-((phase - 0.45) / 0.09).powi(2)).exp();
    systolic + dicrotic
}

/// Generate a pulse-modulated brightness trace with slow drift and seeded noise.
pub fn synthesize_pulse(spec: &SyntheticPulseSpec) -> Vec<Frame> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let count = (spec.seconds * spec.fps).max(0.0) as usize;
    let beat_hz = spec.bpm / 60.0;
    (0..count)
        .map(|i| {
            let t = i as f64 / spec.fps;
            let phase = (t * beat_hz).fract();
            let mut value = BASELINE
                + PULSE_AMPLITUDE * pulse_shape(phase)
                + DRIFT_AMPLITUDE * (2.0 * PI * DRIFT_HZ * t).sin();
            if spec.noise > 0.0 {
                value += rng.gen_range(-spec.noise..=spec.noise);
            }
            let timestamp_ms = spec.start_ms + (i as f64 * 1000.0 / spec.fps).round() as i64;
            Frame::new(value, timestamp_ms)
        })
        .collect()
}
