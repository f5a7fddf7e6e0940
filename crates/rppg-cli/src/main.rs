use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use plotters::prelude::*;
use rppg_lib::{
    clock::ManualClock,
    detectors::ppg::PpgPipelineConfig,
    io::{recording, text as text_io},
    metrics::hrv::{analyze_with, HrvSummary},
    metrics::spectrum::SpectrumScratch,
    pacing::{is_coherent, BreathingPace},
    plot::{figure_from_rr_limit, Figure, Series},
    session::{AnalysisResult, Pump, Session},
    signal::RRSeries,
    source::{synthesize_pulse, ReplaySource, SyntheticPulseSpec},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "rppg",
    version,
    about = "Fingertip rPPG heart rate, HRV and coherence tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a `timestamp_ms,brightness` recording through a measurement session
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// TOML file overriding pipeline parameters
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print every published result as a JSON line before the summary
        #[arg(long)]
        trace: bool,
    },
    /// Write a synthetic fingertip recording as CSV
    Simulate {
        #[arg(long, default_value_t = 60.0)]
        bpm: f64,
        #[arg(long, default_value_t = 30.0)]
        seconds: f64,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
        #[arg(long, default_value_t = 0.3)]
        noise: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
    /// RMSSD and coherence from newline-delimited RR intervals (ms)
    Hrv {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Render the most recent RR intervals to a PNG line chart
    RrPlot {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 50)]
        last: usize,
    },
    /// Paced-breathing pattern for a heart rate
    Pace {
        #[arg(long)]
        bpm: i64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            input,
            config,
            trace,
        } => cmd_analyze(&input, config.as_deref(), trace),
        Commands::Simulate {
            bpm,
            seconds,
            fps,
            noise,
            seed,
            out,
        } => cmd_simulate(
            SyntheticPulseSpec {
                bpm,
                seconds,
                fps,
                noise,
                seed,
                start_ms: 0,
            },
            &out,
        ),
        Commands::Hrv { input, config } => cmd_hrv(&input, config.as_deref()),
        Commands::RrPlot { input, out, last } => cmd_rr_plot(&input, &out, last),
        Commands::Pace { bpm } => cmd_pace(bpm),
    }
}

fn load_config(path: Option<&Path>) -> Result<PpgPipelineConfig> {
    let Some(path) = path else {
        return Ok(PpgPipelineConfig::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: PpgPipelineConfig =
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    if cfg.window_ms <= 0 || cfg.analysis_interval_ms < 0 || cfg.tachogram_fs <= 0.0 {
        return Err(anyhow!(
            "{}: window_ms and tachogram_fs must be positive",
            path.display()
        ));
    }
    Ok(cfg)
}

#[derive(Serialize)]
struct AnalyzeOutput {
    result: AnalysisResult,
    coherent: bool,
    rr_ms: Vec<f64>,
}

fn cmd_analyze(input: &Path, config: Option<&Path>, trace: bool) -> Result<()> {
    let cfg = load_config(config)?;
    let frames = recording::read_recording(input)?;
    info!(
        "replaying {} frame(s) from {}",
        frames.len(),
        input.display()
    );

    let clock = ManualClock::new(frames.first().map_or(0, |f| f.timestamp_ms));
    let mut session = Session::new(cfg, clock.clone());
    session.start(ReplaySource::new(frames).driving(clock))?;
    loop {
        match session.pump()? {
            Pump::Frame { published: true } if trace => {
                println!("{}", serde_json::to_string(session.result())?);
            }
            Pump::Frame { .. } => {}
            Pump::Exhausted => break,
        }
    }

    let result = session.result().clone();
    let output = AnalyzeOutput {
        coherent: is_coherent(result.coherence_pct),
        rr_ms: session.rr_intervals().to_vec(),
        result,
    };
    session.stop();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_simulate(spec: SyntheticPulseSpec, out: &Path) -> Result<()> {
    if spec.fps <= 0.0 || spec.seconds <= 0.0 {
        return Err(anyhow!("--fps and --seconds must be positive"));
    }
    let frames = synthesize_pulse(&spec);
    recording::write_recording(out, &frames)?;
    info!("wrote {} frame(s) to {}", frames.len(), out.display());
    Ok(())
}

fn cmd_hrv(input: &Path, config: Option<&Path>) -> Result<()> {
    let cfg = load_config(config)?;
    let rr = text_io::read_rr_ms(input)?;
    let mut scratch = SpectrumScratch::default();
    let summary: HrvSummary = analyze_with(&rr, &cfg, &mut scratch);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_rr_plot(input: &Path, out: &Path, last: usize) -> Result<()> {
    let rr: RRSeries = text_io::read_rr_ms(input)?;
    let fig = figure_from_rr_limit(&rr, last.max(1));
    draw_plotters_figure(out, &fig)?;
    info!("rendered RR chart to {}", out.display());
    Ok(())
}

fn cmd_pace(bpm: i64) -> Result<()> {
    if bpm <= 0 {
        return Err(anyhow!("--bpm must be positive"));
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&BreathingPace::from_bpm(bpm))?
    );
    Ok(())
}

fn axis_range(fixed: Option<[f64; 2]>, values: impl Iterator<Item = f64>) -> (f64, f64) {
    if let Some([lo, hi]) = fixed {
        return (lo, hi);
    }
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        (0.0, 1.0)
    } else if lo == hi {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    }
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let points = || {
        fig.series.iter().flat_map(|series| match series {
            Series::Line(line) => line.points.iter(),
        })
    };
    let (x_min, x_max) = axis_range(fig.x.range, points().map(|p| p[0]));
    let (y_min, y_max) = axis_range(fig.y.range, points().map(|p| p[1]));
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "RR".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    let mut mesh = chart.configure_mesh();
    if let Some(label) = &fig.x.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &fig.y.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    RGBColor(r, g, b).stroke_width(line.style.width.round() as u32),
                ))?;
            }
        }
    }
    root.present()?;
    Ok(())
}
