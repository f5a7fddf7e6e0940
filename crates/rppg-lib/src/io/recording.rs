use crate::source::Frame;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct FrameRow {
    timestamp_ms: i64,
    brightness: f64,
}

pub fn read_recording(path: &Path) -> Result<Vec<Frame>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);
    let mut frames = Vec::new();
    for (idx, row) in reader.deserialize::<FrameRow>().enumerate() {
        let frame_no = idx + 1;
        let row = row.with_context(|| format!("{}: frame {frame_no}", path.display()))?;
        frames.push(Frame::new(row.brightness, row.timestamp_ms));
    }
    Ok(frames)
}

pub fn write_recording(path: &Path, frames: &[Frame]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for frame in frames {
        writer.serialize(FrameRow {
            timestamp_ms: frame.timestamp_ms,
            brightness: frame.brightness,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_reads_recording() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.csv");
        let frames = vec![
            Frame::new(180.25, 0),
            Frame::new(181.5, 33),
            Frame::new(179.0, 67),
        ];
        write_recording(&path, &frames).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("timestamp_ms,brightness"));
        assert_eq!(read_recording(&path).unwrap(), frames);
    }

    #[test]
    fn reports_bad_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "timestamp_ms,brightness\n0,180\nsoon,181\n").unwrap();
        let err = read_recording(&path).unwrap_err();
        assert!(format!("{err:#}").contains("frame 2"));
    }
}
