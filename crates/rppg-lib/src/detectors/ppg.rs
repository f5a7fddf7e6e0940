use crate::{
    filters::{bandpass, DEFAULT_DT_S},
    signal::{Events, RRSeries},
};
use serde::{Deserialize, Serialize};

/// Configurable parameters for the camera pulse pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpgPipelineConfig {
    /// Assumed frame interval fed to the filters (seconds).
    pub dt_s: f64,
    /// Cutoff of the single-pole high-pass filter (Hz).
    pub highpass_hz: f64,
    /// Cutoff of the single-pole low-pass filter (Hz).
    pub lowpass_hz: f64,
    /// Fraction of the (max − mean) range added to the mean to form the peak threshold.
    pub peak_threshold_factor: f64,
    /// Candidate intervals must be strictly longer than this (ms).
    pub min_rr_ms: f64,
    /// Candidate intervals must be strictly shorter than this (ms).
    pub max_rr_ms: f64,
    /// Published heart rates must be strictly above this.
    pub min_bpm: i64,
    /// Published heart rates must be strictly below this.
    pub max_bpm: i64,
    /// Sliding sample window (ms).
    pub window_ms: i64,
    /// Minimum spacing between analysis passes (ms).
    pub analysis_interval_ms: i64,
    /// Samples required before a pass is attempted.
    pub min_samples: usize,
    /// Tachogram resampling rate for the coherence spectrum (Hz).
    pub tachogram_fs: f64,
    /// Frequency band whose strongest bin scores coherence (Hz).
    pub lf_band_hz: [f64; 2],
}

impl Default for PpgPipelineConfig {
    fn default() -> Self {
        Self {
            dt_s: DEFAULT_DT_S,
            highpass_hz: 0.5,
            lowpass_hz: 3.0,
            peak_threshold_factor: 0.4,
            min_rr_ms: 300.0,
            max_rr_ms: 2000.0,
            min_bpm: 40,
            max_bpm: 180,
            window_ms: 20_000,
            analysis_interval_ms: 1_000,
            min_samples: 50,
            tachogram_fs: 4.0,
            lf_band_hz: [0.04, 0.15],
        }
    }
}

impl PpgPipelineConfig {
    pub fn rr_is_plausible(&self, rr_ms: f64) -> bool {
        rr_ms > self.min_rr_ms && rr_ms < self.max_rr_ms
    }

    pub fn bpm_is_plausible(&self, bpm: i64) -> bool {
        bpm > self.min_bpm && bpm < self.max_bpm
    }
}

/// Local maxima above `mean + threshold_factor · (max − mean)`.
///
/// The first and last samples are never reported.
pub fn find_peaks(data: &[f64], threshold_factor: f64) -> Events {
    if data.is_empty() {
        return Events::default();
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let threshold = mean + threshold_factor * (max - mean);
    let indices = data
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > threshold && w[1] > w[0] && w[1] > w[2])
        .map(|(i, _)| i + 1)
        .collect();
    Events::from_indices(indices)
}

/// Consecutive differences of `peak_timestamps` that fall inside the
/// plausible RR range.
pub fn candidate_intervals(peak_timestamps: &[i64], cfg: &PpgPipelineConfig) -> Vec<f64> {
    peak_timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64)
        .filter(|&d| cfg.rr_is_plausible(d))
        .collect()
}

/// `round(60000 / mean(intervals))`, or `None` without intervals.
pub fn instantaneous_bpm(intervals_ms: &[f64]) -> Option<i64> {
    if intervals_ms.is_empty() {
        return None;
    }
    let mean = intervals_ms.iter().sum::<f64>() / intervals_ms.len() as f64;
    if mean <= 0.0 {
        return None;
    }
    Some((60_000.0 / mean).round() as i64)
}

/// Beats found in one analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowBeats {
    pub events: Events,
    pub peak_timestamps: Vec<i64>,
    pub candidates: Vec<f64>,
    pub bpm: i64,
}

/// Window samples minus their mean. The filters seed their output with the
/// first sample, so an uncentred window starts with a DC-sized transient.
pub fn center(samples: &[f64]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    samples.iter().map(|x| x - mean).collect()
}

/// Centre and filter a window of samples, pick peaks and estimate an
/// instantaneous rate. `timestamps` pairs with `samples` index for index.
///
/// Returns `None` when the window is inconclusive: fewer than two peaks or no
/// interval inside the plausible RR range.
pub fn detect_window_beats(
    samples: &[f64],
    timestamps: &[i64],
    cfg: &PpgPipelineConfig,
) -> Option<WindowBeats> {
    debug_assert_eq!(samples.len(), timestamps.len());
    let centred = center(samples);
    let filtered = bandpass(&centred, cfg.highpass_hz, cfg.lowpass_hz, cfg.dt_s);
    let events = find_peaks(&filtered, cfg.peak_threshold_factor);
    if events.len() < 2 {
        log::trace!("window inconclusive: {} peak(s)", events.len());
        return None;
    }
    let peak_timestamps: Vec<i64> = events.indices.iter().map(|&i| timestamps[i]).collect();
    let candidates = candidate_intervals(&peak_timestamps, cfg);
    let bpm = instantaneous_bpm(&candidates)?;
    Some(WindowBeats {
        events,
        peak_timestamps,
        candidates,
        bpm,
    })
}

/// Monotonic record of beat timestamps seen during a session and the RR
/// series derived from them.
#[derive(Debug, Clone, Default)]
pub struct BeatTracker {
    peaks: Vec<i64>,
    rr: RRSeries,
}

impl BeatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the peaks of an overlapping analysis window.
    ///
    /// Nothing happens unless the window's newest peak is later than the last
    /// recorded beat; then every window peak later than the last recorded beat
    /// is appended and the RR series is rebuilt. Returns the number of beats
    /// appended.
    pub fn merge(&mut self, window_peaks: &[i64]) -> usize {
        let Some(&newest) = window_peaks.last() else {
            return 0;
        };
        if matches!(self.peaks.last(), Some(&last) if newest <= last) {
            return 0;
        }
        let before = self.peaks.len();
        for &t in window_peaks {
            if self.peaks.last().map_or(true, |&last| t > last) {
                self.peaks.push(t);
            }
        }
        let added = self.peaks.len() - before;
        if added > 0 {
            self.rr = RRSeries::from_timestamps(&self.peaks);
        }
        added
    }

    pub fn peak_timestamps(&self) -> &[i64] {
        &self.peaks
    }

    pub fn rr(&self) -> &RRSeries {
        &self.rr
    }

    pub fn clear(&mut self) {
        self.peaks.clear();
        self.rr = RRSeries::default();
    }
}
