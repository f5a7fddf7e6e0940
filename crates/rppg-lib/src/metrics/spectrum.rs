pub use realfft::num_complex::Complex;
use std::f64::consts::PI;

/// In-place forward transform. `buf.len()` must be a power of two (0 and 1
/// are left untouched).
pub fn fft_in_place(buf: &mut [Complex<f64>]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two(), "fft length {n} is not a power of two");

    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if j > i {
            buf.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        for k in 0..half {
            let angle = -2.0 * PI * k as f64 / len as f64;
            let w = Complex::new(angle.cos(), angle.sin());
            for start in (0..n).step_by(len) {
                let even = buf[start + k];
                let odd = w * buf[start + k + half];
                buf[start + k] = even + odd;
                buf[start + k + half] = even - odd;
            }
        }
        len <<= 1;
    }
}

/// Owns the complex work buffer and the power output so repeated analysis
/// passes do not reallocate once the largest transform size has been seen.
#[derive(Debug, Clone, Default)]
pub struct SpectrumScratch {
    buf: Vec<Complex<f64>>,
    power: Vec<f64>,
}

impl SpectrumScratch {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            buf: Vec::with_capacity(n),
            power: Vec::with_capacity(n),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Squared magnitude of every bin of the transform of `data`.
    pub fn power_spectrum(&mut self, data: &[f64]) -> &[f64] {
        self.buf.clear();
        self.buf.extend(data.iter().map(|&x| Complex::new(x, 0.0)));
        fft_in_place(&mut self.buf);
        self.power.clear();
        self.power.extend(self.buf.iter().map(|c| c.norm_sqr()));
        &self.power
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realfft::RealFftPlanner;

    fn naive_dft(data: &[f64]) -> Vec<Complex<f64>> {
        let n = data.len();
        (0..n)
            .map(|k| {
                data.iter()
                    .enumerate()
                    .map(|(t, &x)| {
                        let angle = -2.0 * PI * (k * t) as f64 / n as f64;
                        Complex::new(angle.cos(), angle.sin()) * x
                    })
                    .sum()
            })
            .collect()
    }

    fn sample_signal(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                800.0 + 40.0 * (0.3 * t).sin() + 15.0 * (1.7 * t).cos() + (i % 5) as f64
            })
            .collect()
    }

    #[test]
    fn matches_naive_dft() {
        for n in [1usize, 2, 4, 8, 64] {
            let data = sample_signal(n);
            let mut buf: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
            fft_in_place(&mut buf);
            for (got, want) in buf.iter().zip(naive_dft(&data)) {
                assert!((got - want).norm() < 1e-6 * want.norm().max(1.0));
            }
        }
    }

    #[test]
    fn power_matches_realfft_half_spectrum() {
        let n = 256;
        let data = sample_signal(n);
        let mut scratch = SpectrumScratch::with_capacity(n);
        let power = scratch.power_spectrum(&data).to_vec();
        assert_eq!(power.len(), n);

        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(n);
        let mut input = data.clone();
        let mut spectrum = r2c.make_output_vec();
        r2c.process(&mut input, &mut spectrum).unwrap();
        for (k, c) in spectrum.iter().enumerate() {
            let want = c.norm_sqr();
            assert!((power[k] - want).abs() <= 1e-9 * want.max(1.0), "bin {k}");
        }
        // Real input: mirrored bins carry the same power.
        for k in 1..n / 2 {
            assert!((power[k] - power[n - k]).abs() <= 1e-6 * power[k].max(1.0));
        }
    }

    #[test]
    fn scratch_reuses_allocation() {
        let mut scratch = SpectrumScratch::with_capacity(128);
        let cap = scratch.capacity();
        scratch.power_spectrum(&sample_signal(128));
        scratch.power_spectrum(&sample_signal(32));
        assert_eq!(scratch.capacity(), cap);
    }
}
