use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chartrace", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every tick and write the derived frames as a JSON array.
    Frames(FramesArgs),
    /// Replay ticks up to a frame and print that frame as JSON.
    Frame(FrameArgs),
    /// Print snapshot, frame and entity counts.
    Summary(InputArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Input snapshot JSON (date-keyed object or list of {date, values}).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Engine config JSON; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collapse each calendar week to its last snapshot.
    #[arg(long)]
    weekly: bool,

    /// Override the number of visible entities.
    #[arg(long)]
    top_n: Option<usize>,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output JSON path (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frames(args) => cmd_frames(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Summary(args) => cmd_summary(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<chartrace::RaceConfig> {
    let Some(path) = path else {
        return Ok(chartrace::RaceConfig::default());
    };
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    chartrace::RaceConfig::from_json_str(&s)
        .with_context(|| format!("parse config '{}'", path.display()))
}

fn build_engine(args: &InputArgs) -> anyhow::Result<(chartrace::RaceEngine, usize)> {
    let mut config = read_config(args.config.as_deref())?;
    if args.weekly {
        config.aggregation = chartrace::Aggregation::Weekly;
    }
    if let Some(n) = args.top_n {
        config.top_n = n;
    }

    let snapshots = chartrace::load_snapshots(&args.in_path)
        .with_context(|| format!("load snapshots '{}'", args.in_path.display()))?;
    let count = snapshots.len();
    let engine = chartrace::RaceEngine::new(snapshots, config)?;
    Ok((engine, count))
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let (mut engine, _) = build_engine(&args.input)?;

    let mut frames = Vec::with_capacity(engine.frame_count());
    engine.reset();
    while let Some(f) = engine.advance() {
        frames.push(f);
    }

    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            let f = File::create(out).with_context(|| format!("create '{}'", out.display()))?;
            let mut w = BufWriter::new(f);
            serde_json::to_writer(&mut w, &frames).with_context(|| "write frames JSON")?;
            w.flush()?;
            eprintln!("wrote {} frames to {}", frames.len(), out.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            serde_json::to_writer(&mut w, &frames).with_context(|| "write frames JSON")?;
            writeln!(w)?;
        }
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (mut engine, _) = build_engine(&args.input)?;
    if args.frame >= engine.frame_count() {
        anyhow::bail!(
            "frame {} is out of range ({} frames)",
            args.frame,
            engine.frame_count()
        );
    }

    // Fade states depend on every earlier tick.
    let mut last = None;
    for f in 0..=args.frame {
        last = Some(engine.tick(chartrace::FrameIndex(f))?);
    }
    let frame = last.context("no frame rendered")?;
    println!("{}", serde_json::to_string_pretty(&frame)?);
    Ok(())
}

fn cmd_summary(args: InputArgs) -> anyhow::Result<()> {
    let (engine, snapshots) = build_engine(&args)?;
    println!("snapshots: {snapshots}");
    println!("frames:    {}", engine.frame_count());
    println!("anchors:   {}", engine.timeline().anchors().len());
    println!("entities:  {}", engine.tracks().len());
    Ok(())
}
