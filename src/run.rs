//! Resolve the status of every run in a batch.
//!
//! Runs share nothing, so they may be processed in parallel. Reports always come back in run
//! order.
use std::fmt;

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::status::{self, RunStatus, Signals};
use crate::{last_frame, signals};

/// The outcome for one run. A run whose files could not be read still gets a report.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: Result<RunStatus>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(status) => fmt::Display::fmt(status, f),
            Err(err) => write!(f, "{}  status=error ({err})", self.run_id),
        }
    }
}

/// Resolve the status of the run `run_id`, reading its files under the base directory.
pub fn process_run(settings: &Settings, run_id: &str) -> Result<RunStatus> {
    let dir = settings.run_dir(run_id);
    let snapshot = last_frame(dir.join(&settings.trajectory_file))?;
    let signals = Signals {
        finished: signals::log_finished(dir.join(&settings.log_file), &settings.finished_marker)?,
        temperature: signals::lookup(dir.join(&settings.config_file), &settings.temperature_key)?,
    };
    log::debug!("{run_id}: {snapshot:?} {signals:?}", snapshot = SnapshotSummary(&snapshot));

    Ok(status::resolve(
        run_id,
        &snapshot,
        signals,
        settings.time_step_fs,
        &settings.thresholds(),
    ))
}

pub fn report(settings: &Settings, run_id: &str) -> RunReport {
    let outcome = process_run(settings, run_id);
    if let Err(err) = &outcome {
        log::warn!("{run_id}: {err}");
    }
    RunReport {
        run_id: run_id.to_string(),
        outcome,
    }
}

/// Resolve every run in the batch described by `settings`.
///
/// With `jobs` set to one the runs are processed in sequence on the calling thread, otherwise on
/// a pool of that many threads (zero meaning one per core).
pub fn status_batch(settings: &Settings) -> Result<Vec<RunReport>> {
    let run_ids: Vec<String> = settings.run_ids().collect();
    log::info!(
        "resolving {} run(s) under {}",
        run_ids.len(),
        settings.base_dir.display()
    );

    if settings.jobs == 1 {
        return Ok(run_ids.iter().map(|id| report(settings, id)).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs)
        .build()
        .map_err(|err| Error::Config(format!("could not start {} workers: {err}", settings.jobs)))?;
    Ok(pool.install(|| {
        run_ids
            .par_iter()
            .map(|id| report(settings, id))
            .collect()
    }))
}

struct SnapshotSummary<'s>(&'s crate::Snapshot);

impl fmt::Debug for SnapshotSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            crate::Snapshot::Missing => f.write_str("no trajectory"),
            crate::Snapshot::Empty => f.write_str("empty trajectory"),
            crate::Snapshot::Frame(frame) => f
                .debug_struct("Frame")
                .field("iteration", &frame.iteration)
                .field("natoms", &frame.natoms())
                .finish(),
        }
    }
}
