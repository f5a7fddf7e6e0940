use crate::signal::RRSeries;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
    /// Display range, when the figure fixes one.
    pub range: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis {
                label: None,
                range: None,
            },
            y: Axis {
                label: None,
                range: None,
            },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

/// Line chart of the most recent `max_points` RR intervals, with the y range
/// padded 10% around the data.
pub fn figure_from_rr_limit(rr: &RRSeries, max_points: usize) -> Figure {
    let tail = rr.tail(max_points);
    let mut fig = Figure::new(Some("RR intervals".into()));
    fig.x.label = Some("beat".into());
    fig.y.label = Some("RR (ms)".into());
    if tail.len() >= 2 {
        let min = tail.iter().copied().fold(f64::INFINITY, f64::min);
        let max = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        fig.y.range = Some([min * 0.9, max * 1.1]);
        fig.x.range = Some([0.0, (tail.len() - 1) as f64]);
    }
    fig.add_series(Series::Line(LineSeries {
        name: "RR".into(),
        points: tail
            .iter()
            .enumerate()
            .map(|(i, value)| [i as f64, *value])
            .collect(),
        style: Style {
            width: 2.0,
            color: Color(0x64FFDA),
        },
    }));
    fig
}

pub fn figure_from_rr(rr: &RRSeries) -> Figure {
    figure_from_rr_limit(rr, 50)
}
