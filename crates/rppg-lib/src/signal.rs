use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Point events on a timeline (e.g., pulse peak indices)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (milliseconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    /// Successive differences of beat timestamps (ms).
    pub fn from_timestamps(timestamps: &[i64]) -> Self {
        let rr = timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]) as f64)
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }

    /// The most recent `n` intervals, oldest first.
    pub fn tail(&self, n: usize) -> &[f64] {
        let start = self.rr.len().saturating_sub(n);
        &self.rr[start..]
    }
}

/// Rolling brightness buffer paired sample-for-sample with capture timestamps.
///
/// Both buffers always hold the same number of entries and timestamps never
/// decrease. Appends and front trims are amortised O(1); the window is laid
/// out contiguously only when an analysis pass asks for it.
#[derive(Debug, Clone, Default)]
pub struct SampleStream {
    samples: VecDeque<f64>,
    timestamps: VecDeque<i64>,
}

impl SampleStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &VecDeque<f64> {
        &self.samples
    }

    pub fn timestamps(&self) -> &VecDeque<i64> {
        &self.timestamps
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.timestamps.back().copied()
    }

    /// Both buffers as plain slices, oldest first.
    pub fn as_slices(&mut self) -> (&[f64], &[i64]) {
        (
            self.samples.make_contiguous(),
            self.timestamps.make_contiguous(),
        )
    }

    /// Append one sample. Returns `false` (and stores nothing) when the
    /// timestamp would go backwards.
    pub fn push(&mut self, sample: f64, timestamp_ms: i64) -> bool {
        if matches!(self.last_timestamp(), Some(last) if timestamp_ms < last) {
            return false;
        }
        self.samples.push_back(sample);
        self.timestamps.push_back(timestamp_ms);
        true
    }

    /// Drop every entry strictly older than `cutoff_ms`, returning how many
    /// were removed.
    pub fn trim_before(&mut self, cutoff_ms: i64) -> usize {
        let mut dropped = 0;
        while matches!(self.timestamps.front(), Some(&t) if t < cutoff_ms) {
            self.timestamps.pop_front();
            self.samples.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.timestamps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rr_from_timestamps_matches_differences() {
        let rr = RRSeries::from_timestamps(&[1000, 1800, 2650, 3400]);
        assert_eq!(rr.rr, vec![800.0, 850.0, 750.0]);
        assert_eq!(rr.tail(2), &[850.0, 750.0]);
        assert_eq!(rr.tail(10).len(), 3);
        assert!(RRSeries::from_timestamps(&[42]).is_empty());
    }

    #[test]
    fn stream_trims_in_lockstep() {
        let mut stream = SampleStream::new();
        for i in 0..10 {
            assert!(stream.push(i as f64, i * 100));
        }
        assert_eq!(stream.trim_before(450), 5);
        assert_eq!(stream.len(), 5);
        assert_eq!(stream.timestamps().len(), stream.samples().len());
        assert_eq!(stream.timestamps()[0], 500);
        assert_eq!(stream.samples()[0], 5.0);
        assert_eq!(stream.trim_before(0), 0);
    }

    #[test]
    fn stream_rejects_backwards_timestamps() {
        let mut stream = SampleStream::new();
        assert!(stream.push(1.0, 100));
        assert!(stream.push(2.0, 100));
        assert!(!stream.push(3.0, 99));
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn slices_follow_a_wrapped_window() {
        let mut stream = SampleStream::new();
        for i in 0..8 {
            stream.push(i as f64, i * 10);
            stream.trim_before(i * 10 - 30);
        }
        let (samples, timestamps) = stream.as_slices();
        assert_eq!(samples, &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(timestamps, &[40, 50, 60, 70]);
    }
}
