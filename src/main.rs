//! Report on a batch of molecular dynamics runs: how far along they are, which fragments their
//! last frame holds, and whether they have finished or broken apart.
use std::io::{BufWriter, Write};
use std::num::ParseIntError;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use fragwatch::contacts::pair_contacts;
use fragwatch::{classify, formula, monitor, run, SimulatedTime, Snapshot, XYZReader};
use fragwatch::{FrameSelection, Settings, Thresholds};

#[derive(Parser)]
#[command(name = "fragwatch", version, about, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log more to stderr. Repeat for more detail (`-vv`, `-vvv`).
    ///
    /// `RUST_LOG` takes precedence when it is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print one status line for every run in the batch.
    Status(StatusArgs),

    /// Describe the last frame of a single trajectory.
    Frame(FrameArgs),

    /// Report the frame intervals in which pairs of atoms stay in contact.
    Contacts(ContactsArgs),
}

/// Options that override the settings file. Anything left out keeps the value from the file, or
/// the default.
#[derive(Args)]
struct StatusArgs {
    /// Settings file (TOML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory that holds the run directories.
    #[arg(short, long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Inclusive range of run numbers in the format `start:end`, or a single run number.
    #[arg(short, long, value_name = "START:END", value_parser = run_range_parser)]
    runs: Option<(u64, u64)>,

    /// Prefix of the run directory names.
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Trajectory file name within a run directory.
    #[arg(long, value_name = "NAME")]
    trajectory: Option<String>,

    /// Log file name within a run directory.
    #[arg(long, value_name = "NAME")]
    log: Option<String>,

    /// Configuration file name within a run directory.
    #[arg(long, value_name = "NAME")]
    run_config: Option<String>,

    /// Simulated time per iteration (fs).
    #[arg(short, long, value_name = "FS")]
    time_step: Option<f64>,

    /// Atoms closer than this are bonded (Å).
    #[arg(long, value_name = "Å")]
    cluster_threshold: Option<f64>,

    /// Atoms further apart than this mean the run has broken up (Å).
    #[arg(long, value_name = "Å")]
    breakup_threshold: Option<f64>,

    /// Text on the last log line that marks a finished run.
    #[arg(long, value_name = "TEXT")]
    finished_marker: Option<String>,

    /// Key of the temperature field in the run configuration.
    #[arg(long, value_name = "KEY")]
    temperature_key: Option<String>,

    /// Number of worker threads. Zero uses one per core, one processes runs in sequence.
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
}

impl StatusArgs {
    fn settings(self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("could not load settings from {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(base_dir) = self.base_dir {
            settings.base_dir = base_dir;
        }
        if let Some(prefix) = self.prefix {
            settings.run_prefix = prefix;
        }
        if let Some(trajectory) = self.trajectory {
            settings.trajectory_file = trajectory;
        }
        if let Some(log) = self.log {
            settings.log_file = log;
        }
        if let Some(run_config) = self.run_config {
            settings.config_file = run_config;
        }
        if let Some(time_step) = self.time_step {
            settings.time_step_fs = time_step;
        }
        if let Some(cluster) = self.cluster_threshold {
            settings.cluster_threshold = cluster;
        }
        if let Some(breakup) = self.breakup_threshold {
            settings.breakup_threshold = breakup;
        }
        if let Some(marker) = self.finished_marker {
            settings.finished_marker = marker;
        }
        if let Some(key) = self.temperature_key {
            settings.temperature_key = key;
        }
        if let Some(jobs) = self.jobs {
            settings.jobs = jobs;
        }
        if let Some((first, last)) = self.runs {
            settings.first_run = first;
            settings.last_run = last;
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Args)]
struct FrameArgs {
    /// Input path (xyz).
    input: PathBuf,

    /// Simulated time per iteration (fs).
    #[arg(short, long, value_name = "FS", default_value_t = Settings::default().time_step_fs)]
    time_step: f64,

    /// Atoms closer than this are bonded (Å).
    #[arg(long, value_name = "Å", default_value_t = Thresholds::default().cluster)]
    cluster_threshold: f64,

    /// Atoms further apart than this mean the system has broken up (Å).
    #[arg(long, value_name = "Å", default_value_t = Thresholds::default().breakup)]
    breakup_threshold: f64,
}

#[derive(Args)]
struct ContactsArgs {
    /// Input path (xyz).
    input: PathBuf,

    /// The two elements to pair up, in the format `A-B`.
    #[arg(short, long, value_name = "A-B", default_value = "C-H", value_parser = pair_parser)]
    pair: (String, String),

    /// A pair is in contact while its distance is at most this (Å).
    #[arg(short, long, value_name = "Å", default_value_t = 2.0)]
    cutoff: f64,

    /// Leave out intervals shorter than this many frames.
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    min_frames: usize,

    /// Time between two frames (fs).
    #[arg(long, value_name = "FS", default_value_t = 0.5)]
    frame_dt: f64,

    /// Frame selection in the format `start:stop:step`. Each of these values is optional.
    ///
    /// - `:100` will select the first 100 frames.
    ///
    /// - `3:14` will select the 4th up to and including the 14th frames, 11 frames in total.
    ///
    /// - `:100:2` will select every second frame from the first 100 frames, 50 in total.
    #[arg(short, long, value_name = "SELECTION")]
    frames: Option<FrameSelection>,

    /// Monitor file with `INFOLINE` electron count records.
    #[arg(long, value_name = "FILE")]
    monitor: Option<PathBuf>,

    /// Electron count below which the system counts as ionized.
    #[arg(long, value_name = "X", default_value_t = 9.5)]
    ne_threshold: f64,
}

fn run_range_parser(range: &str) -> Result<(u64, u64), ParseIntError> {
    match range.split_once(':') {
        Some((first, last)) => Ok((first.trim().parse()?, last.trim().parse()?)),
        None => {
            let single = range.trim().parse()?;
            Ok((single, single))
        }
    }
}

fn pair_parser(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('-') {
        Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            Ok((a.trim().to_string(), b.trim().to_string()))
        }
        _ => Err(format!("expected two elements like `C-H`, found {pair:?}")),
    }
}

/// Initialize `env_logger` for this crate at `level`, unless `RUST_LOG` says otherwise.
fn init_logging(level: log::LevelFilter) {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
        return;
    }
    let filter = format!(
        "{}={}",
        env!("CARGO_CRATE_NAME"),
        level.to_string().to_lowercase()
    );
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(match (cli.quiet, cli.verbose) {
        (true, _) => log::LevelFilter::Error,
        (false, 0) => log::LevelFilter::Warn,
        (false, 1) => log::LevelFilter::Info,
        (false, 2) => log::LevelFilter::Debug,
        (false, _) => log::LevelFilter::Trace,
    });

    let mut stdout = BufWriter::new(std::io::stdout().lock());
    match cli.command {
        Command::Status(args) => status(args, &mut stdout)?,
        Command::Frame(args) => frame(args, &mut stdout)?,
        Command::Contacts(args) => contacts(args, &mut stdout)?,
    }
    stdout.flush()?;
    Ok(())
}

fn status(args: StatusArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let settings = args.settings()?;
    let reports = run::status_batch(&settings)?;
    let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
    for report in &reports {
        writeln!(out, "{report}")?;
    }
    log::info!("{} run(s) reported, {failed} with errors", reports.len());
    Ok(())
}

fn frame(args: FrameArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let frame = match fragwatch::last_frame(&args.input)? {
        Snapshot::Missing => bail!("no trajectory at {}", args.input.display()),
        Snapshot::Empty => {
            writeln!(out, "{}: no atoms", args.input.display())?;
            return Ok(());
        }
        Snapshot::Frame(frame) => frame,
    };

    let time = SimulatedTime::from_iteration(frame.iteration, args.time_step);
    match frame.iteration {
        Some(iteration) => writeln!(out, "iteration: {iteration} (t={time})")?,
        None => writeln!(out, "iteration: unknown")?,
    }
    writeln!(out, "atoms: {}", frame.natoms())?;
    if let Some(fragments) = formula::describe(&frame, args.cluster_threshold) {
        writeln!(out, "fragments: {fragments}")?;
    }
    let coords: Vec<_> = frame.coords().collect();
    match classify::breakup_pair(&coords, args.breakup_threshold) {
        Some((i, j)) => writeln!(
            out,
            "breakup: atoms {} and {} are {:.3} Å apart",
            i + 1,
            j + 1,
            coords[i].distance(coords[j])
        )?,
        None => writeln!(out, "breakup: none")?,
    }
    Ok(())
}

fn contacts(args: ContactsArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let mut reader = XYZReader::open(&args.input)
        .with_context(|| format!("could not open {}", args.input.display()))?;
    let mut frames = Vec::new();
    let selection = args.frames.unwrap_or_default();
    let nframes = reader.read_frames(&mut frames, &selection)?;
    let (first, second) = &args.pair;

    writeln!(out, "=== {} ===", args.input.display())?;
    let t_end = frames.last().map_or(0.0, |(idx, _)| *idx as f64 * args.frame_dt);
    writeln!(out, "  frames: {nframes} (t_end = {t_end:.2} fs)")?;

    if let Some(path) = &args.monitor {
        match monitor::ionization_onset(path, args.ne_threshold)? {
            Some(t_ion) => writeln!(
                out,
                "  first Ne < {}: t_ion = {t_ion:.3} fs",
                args.ne_threshold
            )?,
            None => writeln!(out, "  Ne never drops below {}", args.ne_threshold)?,
        }
    }

    let contacts = pair_contacts(&frames, first, second, args.cutoff, args.min_frames)?;
    if contacts.is_empty() {
        writeln!(
            out,
            "  no {first}-{second} pair stays within {:.2} Å for {} frame(s)",
            args.cutoff, args.min_frames
        )?;
        return Ok(());
    }

    writeln!(out, "  {first}-{second} within {:.2} Å (fs):", args.cutoff)?;
    for pair in &contacts {
        // Atom labels are 1-based, like the line numbers of an xyz frame.
        writeln!(
            out,
            "    {first}({}) - {second}({}):",
            pair.first + 1,
            pair.second + 1
        )?;
        for interval in &pair.intervals {
            writeln!(
                out,
                "      frames [{:5} - {:5}]  t = [{:8.2}, {:8.2}] fs  (dt = {:8.2} fs)",
                interval.start,
                interval.end,
                interval.start_fs(args.frame_dt),
                interval.end_fs(args.frame_dt),
                interval.duration_fs(args.frame_dt),
            )?;
        }
    }
    Ok(())
}
