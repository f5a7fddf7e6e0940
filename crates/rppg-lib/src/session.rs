use crate::{
    clock::{Clock, MonotonicClock},
    detectors::ppg::{detect_window_beats, BeatTracker, PpgPipelineConfig},
    metrics::{
        hrv::{analyze_with, HrvSummary},
        spectrum::SpectrumScratch,
    },
    signal::SampleStream,
    source::{FrameSource, SourceError},
};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Detecting,
    Ready,
    Disconnected,
    Error,
}

/// Coarse progress shown to the user next to the numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Initializing,
    Connecting,
    Detecting,
    PulseDetected,
    Disconnected,
    CameraError,
}

impl Status {
    pub fn message(&self) -> &'static str {
        match self {
            Status::Initializing => "Initializing...",
            Status::Connecting => "Connecting to camera...",
            Status::Detecting => "Detecting pulse. Please wait...",
            Status::PulseDetected => "Pulse detected. Ready to begin.",
            Status::Disconnected => "Disconnected",
            Status::CameraError => "Error accessing camera.",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Snapshot published to the UI. Always replaced whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub bpm: Option<i64>,
    pub hrv_rmssd_ms: Option<f64>,
    pub coherence_pct: Option<f64>,
    pub status: Status,
    pub ready: bool,
}

impl AnalysisResult {
    pub fn with_status(status: Status) -> Self {
        Self {
            bpm: None,
            hrv_rmssd_ms: None,
            coherence_pct: None,
            status,
            ready: false,
        }
    }

    pub fn initializing() -> Self {
        Self::with_status(Status::Initializing)
    }

    pub fn disconnected() -> Self {
        Self::with_status(Status::Disconnected)
    }

    pub fn pulse(bpm: i64, hrv: &HrvSummary) -> Self {
        Self {
            bpm: Some(bpm),
            hrv_rmssd_ms: Some(hrv.rmssd_ms),
            coherence_pct: Some(hrv.coherence_pct),
            status: Status::PulseDetected,
            ready: true,
        }
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self::initializing()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("frame acquisition failed: {0}")]
    Acquisition(#[from] SourceError),
    #[error("session is not running")]
    NotRunning,
    #[error("sample at {got} ms is older than the last sample at {last} ms")]
    OutOfOrder { last: i64, got: i64 },
}

/// Outcome of pulling one frame from the session's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// A frame was ingested; `published` is set when it triggered a new result.
    Frame { published: bool },
    /// The source has no more frames.
    Exhausted,
}

type BoxedSource = Box<dyn FrameSource + Send>;

pub struct Session<C: Clock = MonotonicClock> {
    cfg: PpgPipelineConfig,
    clock: C,
    state: SessionState,
    source: Option<BoxedSource>,
    stream: SampleStream,
    tracker: BeatTracker,
    scratch: SpectrumScratch,
    last_analysis_ms: Option<i64>,
    result: AnalysisResult,
}

impl Session<MonotonicClock> {
    pub fn with_defaults() -> Self {
        Self::new(PpgPipelineConfig::default(), MonotonicClock::new())
    }
}

impl<C: Clock> Session<C> {
    pub fn new(cfg: PpgPipelineConfig, clock: C) -> Self {
        Self {
            cfg,
            clock,
            state: SessionState::Idle,
            source: None,
            stream: SampleStream::new(),
            tracker: BeatTracker::new(),
            scratch: SpectrumScratch::default(),
            last_analysis_ms: None,
            result: AnalysisResult::initializing(),
        }
    }

    pub fn config(&self) -> &PpgPipelineConfig {
        &self.cfg
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Detecting | SessionState::Ready)
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    /// Full RR series of the session (ms), oldest first.
    pub fn rr_intervals(&self) -> &[f64] {
        &self.tracker.rr().rr
    }

    /// The last `n` RR intervals, for charting.
    pub fn recent_rr(&self, n: usize) -> &[f64] {
        self.tracker.rr().tail(n)
    }

    pub fn peak_timestamps(&self) -> &[i64] {
        self.tracker.peak_timestamps()
    }

    pub fn samples(&self) -> &SampleStream {
        &self.stream
    }

    /// Open `source` and begin detecting. A running session is stopped first.
    pub fn start<S>(&mut self, source: S) -> Result<(), SessionError>
    where
        S: FrameSource + Send + 'static,
    {
        if self.source.is_some() || self.is_running() {
            self.stop();
        }
        self.state = SessionState::Connecting;
        self.result = AnalysisResult::with_status(Status::Connecting);
        info!("session connecting to frame source");

        let mut source: BoxedSource = Box::new(source);
        if let Err(err) = source.open() {
            source.release();
            return Err(self.fail(err));
        }
        self.clear_buffers();
        self.source = Some(source);
        self.last_analysis_ms = Some(self.clock.now_ms());
        self.state = SessionState::Detecting;
        self.result = AnalysisResult::with_status(Status::Detecting);
        info!("session detecting");
        Ok(())
    }

    /// Append one sample, trim the window and run an analysis pass when one
    /// is due. Returns whether a new result was published.
    pub fn ingest(&mut self, brightness: f64, timestamp_ms: i64) -> Result<bool, SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        if !self.stream.push(brightness, timestamp_ms) {
            let last = self.stream.last_timestamp().unwrap_or(timestamp_ms);
            warn!("dropping sample at {timestamp_ms} ms, last sample was at {last} ms");
            return Err(SessionError::OutOfOrder {
                last,
                got: timestamp_ms,
            });
        }
        let trimmed = self.stream.trim_before(timestamp_ms - self.cfg.window_ms);
        if trimmed > 0 {
            trace!("trimmed {trimmed} sample(s) older than the window");
        }

        let now = self.clock.now_ms();
        let due = self
            .last_analysis_ms
            .map_or(true, |last| now - last > self.cfg.analysis_interval_ms);
        if !due {
            return Ok(false);
        }
        self.last_analysis_ms = Some(now);
        Ok(self.run_pass())
    }

    /// Pull one frame from the owned source and ingest it.
    ///
    /// Out-of-order frames are dropped; a source failure ends the session
    /// in the error state.
    pub fn pump(&mut self) -> Result<Pump, SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        let next = match self.source.as_mut() {
            Some(source) => source.next_frame(),
            None => return Err(SessionError::NotRunning),
        };
        match next {
            Ok(Some(frame)) => match self.ingest(frame.brightness, frame.timestamp_ms) {
                Ok(published) => Ok(Pump::Frame { published }),
                Err(SessionError::OutOfOrder { .. }) => Ok(Pump::Frame { published: false }),
                Err(err) => Err(err),
            },
            Ok(None) => Ok(Pump::Exhausted),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Run an analysis pass immediately, ignoring the cadence throttle.
    pub fn analyze_now(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.last_analysis_ms = Some(self.clock.now_ms());
        self.run_pass()
    }

    /// Release the source, drop all buffers and publish "disconnected".
    /// Calling it again is a no-op.
    pub fn stop(&mut self) {
        if self.state == SessionState::Disconnected && self.source.is_none() {
            return;
        }
        self.release_source();
        self.clear_buffers();
        self.state = SessionState::Disconnected;
        self.result = AnalysisResult::disconnected();
        info!("session stopped");
    }

    pub fn reset(&mut self) {
        self.stop();
    }

    fn run_pass(&mut self) -> bool {
        if self.stream.len() < self.cfg.min_samples {
            debug!(
                "skipping pass: {} of {} samples buffered",
                self.stream.len(),
                self.cfg.min_samples
            );
            return false;
        }
        let (samples, timestamps) = self.stream.as_slices();
        let Some(beats) = detect_window_beats(samples, timestamps, &self.cfg) else {
            debug!("pass inconclusive: no usable beats in window");
            return false;
        };
        let added = self.tracker.merge(&beats.peak_timestamps);
        if added > 0 {
            trace!(
                "{added} new beat(s), {} RR interval(s) tracked",
                self.tracker.rr().len()
            );
        }
        if !self.cfg.bpm_is_plausible(beats.bpm) {
            debug!(
                "pass inconclusive: {} bpm outside plausible range",
                beats.bpm
            );
            return false;
        }
        let hrv = analyze_with(self.tracker.rr(), &self.cfg, &mut self.scratch);
        self.result = AnalysisResult::pulse(beats.bpm, &hrv);
        self.state = SessionState::Ready;
        debug!(
            "published {} bpm, rmssd {:.1} ms, coherence {:.1}%",
            beats.bpm, hrv.rmssd_ms, hrv.coherence_pct
        );
        true
    }

    fn fail(&mut self, err: SourceError) -> SessionError {
        warn!("frame source failed: {err}");
        self.release_source();
        self.clear_buffers();
        self.state = SessionState::Error;
        self.result = AnalysisResult::with_status(Status::CameraError);
        SessionError::Acquisition(err)
    }

    fn release_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }

    fn clear_buffers(&mut self) {
        self.stream.clear();
        self.tracker.clear();
        self.last_analysis_ms = None;
    }
}

impl<C: Clock> Drop for Session<C> {
    fn drop(&mut self) {
        self.release_source();
    }
}
