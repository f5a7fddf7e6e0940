use serde::{Deserialize, Serialize};

/// Coherence score above which the UI treats the user as coherent.
pub const COHERENT_THRESHOLD_PCT: f64 = 50.0;

const MIN_BREATHS_PER_MIN: f64 = 4.0;
const MAX_BREATHS_PER_MIN: f64 = 10.0;
/// Heart beats per breath targeted by the paced pattern.
const BEATS_PER_BREATH: f64 = 12.0;

/// Symmetric inhale/exhale pattern matched to the current heart rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathingPace {
    pub breaths_per_min: f64,
    pub cycle_s: f64,
    pub inhale_s: f64,
    pub hold_after_inhale_s: f64,
    pub exhale_s: f64,
    pub hold_after_exhale_s: f64,
}

impl BreathingPace {
    pub fn from_bpm(bpm: i64) -> Self {
        let breaths_per_min =
            (bpm as f64 / BEATS_PER_BREATH).clamp(MIN_BREATHS_PER_MIN, MAX_BREATHS_PER_MIN);
        let cycle_s = 60.0 / breaths_per_min;
        let half = cycle_s / 2.0;
        Self {
            breaths_per_min,
            cycle_s,
            inhale_s: half,
            hold_after_inhale_s: 0.0,
            exhale_s: half,
            hold_after_exhale_s: 0.0,
        }
    }
}

pub fn is_coherent(coherence_pct: Option<f64>) -> bool {
    coherence_pct.is_some_and(|c| c > COHERENT_THRESHOLD_PCT)
}
