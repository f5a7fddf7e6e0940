use std::f64::consts::PI;

/// Nominal frame interval of a ~30 fps camera, in seconds.
pub const DEFAULT_DT_S: f64 = 0.033;

fn time_constant(cutoff_hz: f64) -> f64 {
    debug_assert!(cutoff_hz > 0.0, "cutoff must be positive, got {cutoff_hz}");
    1.0 / (2.0 * PI * cutoff_hz)
}

/// Single-pole high-pass: `y[i] = α·(y[i-1] + x[i] − x[i-1])`, `y[0] = x[0]`.
pub fn highpass(data: &[f64], cutoff_hz: f64, dt: f64) -> Vec<f64> {
    let Some(&first) = data.first() else {
        return Vec::new();
    };
    let rc = time_constant(cutoff_hz);
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    out.push(first);
    let mut prev_y = first;
    for w in data.windows(2) {
        let y = alpha * (prev_y + w[1] - w[0]);
        out.push(y);
        prev_y = y;
    }
    out
}

/// Single-pole low-pass: `y[i] = y[i-1] + α·(x[i] − y[i-1])`, `y[0] = x[0]`.
pub fn lowpass(data: &[f64], cutoff_hz: f64, dt: f64) -> Vec<f64> {
    let Some(&first) = data.first() else {
        return Vec::new();
    };
    let rc = time_constant(cutoff_hz);
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = first;
    out.push(prev);
    for &x in &data[1..] {
        prev += alpha * (x - prev);
        out.push(prev);
    }
    out
}

/// High-pass at `low_hz`, then low-pass at `high_hz`.
pub fn bandpass(data: &[f64], low_hz: f64, high_hz: f64, dt: f64) -> Vec<f64> {
    let hp = highpass(data, low_hz, dt);
    lowpass(&hp, high_hz, dt)
}
