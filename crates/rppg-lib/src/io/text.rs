use crate::signal::RRSeries;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse newline-delimited RR intervals in milliseconds, ignoring blank and
/// `#` comment lines. Every interval must be a positive finite number.
pub fn parse_rr_ms(text: &str) -> Result<RRSeries> {
    let mut rr = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not a number: {}", idx + 1, trimmed))?;
        if !value.is_finite() || value <= 0.0 {
            anyhow::bail!(
                "line {}: RR interval must be positive, got {}",
                idx + 1,
                value
            );
        }
        rr.push(value);
    }
    if rr.is_empty() {
        anyhow::bail!("no RR intervals found");
    }
    Ok(RRSeries { rr })
}

/// Read RR intervals (ms) from disk.
pub fn read_rr_ms(path: &Path) -> Result<RRSeries> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_rr_ms(&text).with_context(|| format!("parsing {}", path.display()))
}
