use crate::{
    detectors::ppg::PpgPipelineConfig, metrics::spectrum::SpectrumScratch, signal::RRSeries,
};
use serde::{Deserialize, Serialize};

/// Time- and frequency-domain summary of an RR series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvSummary {
    pub n: usize,
    pub rmssd_ms: f64,
    pub coherence_pct: f64,
}

/// Root mean square of successive differences (ms). Zero below two intervals.
pub fn rmssd(rr: &[f64]) -> f64 {
    if rr.len() < 2 {
        return 0.0;
    }
    let sum_sq = rr.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>();
    (sum_sq / (rr.len() - 1) as f64).sqrt()
}

/// Zero-order-hold resampling of an RR series onto a uniform grid at `fs` Hz.
///
/// Walks the cumulative beat time and repeats each interval value until the
/// grid catches up with it.
pub fn resample_tachogram(rr: &[f64], fs: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut t = 0.0;
    for &interval in rr {
        t += interval / 1000.0;
        while (out.len() as f64) / fs < t {
            out.push(interval);
        }
    }
    out
}

/// Extend `series` with `fill` up to the next power-of-two length.
pub fn pad_to_power_of_two(series: &mut Vec<f64>, fill: f64) {
    let n = series.len().next_power_of_two();
    series.resize(n, fill);
}

/// Strongest bin inside `band_hz` over the total power of bins `1..n/2`,
/// as a percentage.
///
/// `power` is the full two-sided spectrum of an `n`-point transform sampled
/// at `fs`. DC and Nyquist are excluded from both sums.
pub fn peak_band_coherence(power: &[f64], fs: f64, band_hz: [f64; 2]) -> f64 {
    let n = power.len();
    let bin_start = (band_hz[0] * n as f64 / fs).floor() as usize;
    let bin_end = (band_hz[1] * n as f64 / fs).floor() as usize;
    let mut total = 0.0;
    let mut peak = 0.0;
    for (k, &p) in power.iter().enumerate().take(n / 2).skip(1) {
        if (bin_start..=bin_end).contains(&k) && p > peak {
            peak = p;
        }
        total += p;
    }
    if total > 0.0 {
        peak / total * 100.0
    } else {
        0.0
    }
}

/// Coherence score (0–100) of an RR series, reusing `scratch` for the FFT.
pub fn coherence_with(rr: &[f64], cfg: &PpgPipelineConfig, scratch: &mut SpectrumScratch) -> f64 {
    if rr.len() < 2 {
        return 0.0;
    }
    let mean = rr.iter().sum::<f64>() / rr.len() as f64;
    let mut tachogram = resample_tachogram(rr, cfg.tachogram_fs);
    pad_to_power_of_two(&mut tachogram, mean);
    let power = scratch.power_spectrum(&tachogram);
    peak_band_coherence(power, cfg.tachogram_fs, cfg.lf_band_hz)
}

/// RMSSD and coherence using a caller-owned FFT buffer.
pub fn analyze_with(
    rr: &RRSeries,
    cfg: &PpgPipelineConfig,
    scratch: &mut SpectrumScratch,
) -> HrvSummary {
    HrvSummary {
        n: rr.len(),
        rmssd_ms: rmssd(&rr.rr),
        coherence_pct: coherence_with(&rr.rr, cfg, scratch),
    }
}

/// RMSSD and coherence with the default band and tachogram rate.
pub fn analyze(rr: &RRSeries) -> HrvSummary {
    analyze_with(
        rr,
        &PpgPipelineConfig::default(),
        &mut SpectrumScratch::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    fn paced_rr(beats: usize, breath_period_s: f64) -> Vec<f64> {
        // Respiratory sinus arrhythmia: RR swings ±60 ms with the breath.
        let mut rr = Vec::with_capacity(beats);
        let mut t = 0.0;
        for _ in 0..beats {
            let value = 850.0 + 60.0 * (2.0 * std::f64::consts::PI * t / breath_period_s).sin();
            rr.push(value);
            t += value / 1000.0;
        }
        rr
    }

    #[test]
    fn rmssd_reference_values() {
        assert_eq!(rmssd(&[800.0, 800.0, 800.0]), 0.0);
        assert_close(rmssd(&[800.0, 900.0]), 100.0, 1e-12);
        assert_eq!(rmssd(&[800.0]), 0.0);
        assert_eq!(rmssd(&[]), 0.0);
        // diffs 100, -50 -> sqrt((10000 + 2500) / 2)
        assert_close(rmssd(&[800.0, 900.0, 850.0]), 6250f64.sqrt(), 1e-9);
    }

    #[test]
    fn tachogram_holds_each_interval() {
        // 1 s then 0.5 s at 4 Hz: four samples of 1000 then two of 500.
        let tach = resample_tachogram(&[1000.0, 500.0], 4.0);
        assert_eq!(tach, vec![1000.0, 1000.0, 1000.0, 1000.0, 500.0, 500.0]);
    }

    #[test]
    fn padding_reaches_power_of_two() {
        let mut s = vec![1.0; 6];
        pad_to_power_of_two(&mut s, 9.0);
        assert_eq!(s, vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 9.0, 9.0]);
        let mut exact = vec![2.0; 8];
        pad_to_power_of_two(&mut exact, 0.0);
        assert_eq!(exact.len(), 8);
    }

    #[test]
    fn flat_rr_has_zero_coherence() {
        let summary = analyze(&RRSeries {
            rr: vec![800.0; 40],
        });
        assert_eq!(summary.rmssd_ms, 0.0);
        assert_eq!(summary.coherence_pct, 0.0);
        assert_eq!(summary.n, 40);
    }

    #[test]
    fn short_series_is_degenerate() {
        let summary = analyze(&RRSeries { rr: vec![900.0] });
        assert_eq!(
            summary,
            HrvSummary {
                n: 1,
                rmssd_ms: 0.0,
                coherence_pct: 0.0
            }
        );
    }

    #[test]
    fn paced_breathing_concentrates_power_in_band() {
        // 10 s breath cycle = 0.1 Hz, inside the 0.04-0.15 Hz band.
        let coherent = analyze(&RRSeries {
            rr: paced_rr(120, 10.0),
        });
        // 3 s breath cycle = 0.33 Hz, outside it.
        let fast = analyze(&RRSeries {
            rr: paced_rr(120, 3.0),
        });
        assert!(coherent.coherence_pct > 50.0, "{coherent:?}");
        assert!(fast.coherence_pct < coherent.coherence_pct, "{fast:?}");
    }

    #[test]
    fn coherence_is_bounded() {
        let series: [&[f64]; 4] = [
            &[800.0, 900.0],
            &[600.0, 1200.0, 650.0, 1150.0, 700.0],
            &[1000.0, 1000.0, 400.0, 1900.0, 350.0, 1000.0, 990.0],
            &[750.0, 760.0, 770.0, 780.0, 790.0, 800.0, 810.0, 820.0],
        ];
        for rr in series {
            let c = analyze(&RRSeries { rr: rr.to_vec() }).coherence_pct;
            assert!((0.0..=100.0).contains(&c), "{c} for {rr:?}");
        }
    }

    #[test]
    fn band_edges_follow_transform_length() {
        // n = 64 at 4 Hz: bins 0..=2 form the band (floor(0.64), floor(2.4)).
        let mut power = vec![0.0; 64];
        power[2] = 3.0;
        power[3] = 1.0;
        assert_close(peak_band_coherence(&power, 4.0, [0.04, 0.15]), 75.0, 1e-12);
        power[2] = 0.0;
        assert_eq!(peak_band_coherence(&power, 4.0, [0.04, 0.15]), 0.0);
        // Only DC and the upper half: nothing counted.
        let mut dc_only = vec![0.0; 64];
        dc_only[0] = 1e6;
        dc_only[40] = 5.0;
        assert_eq!(peak_band_coherence(&dc_only, 4.0, [0.04, 0.15]), 0.0);
    }
}
