//! Combine the last frame of a run with its outside signals into a [`RunStatus`].
use std::fmt;

use crate::config::Thresholds;
use crate::{classify, formula, Snapshot};

/// Simulated time of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulatedTime {
    /// Time in femtoseconds.
    Known(f64),
    /// There is a frame, but it does not say which iteration it belongs to.
    Unknown,
}

impl SimulatedTime {
    /// The time of a run that has not written a trajectory yet.
    pub const NOT_STARTED: Self = Self::Known(0.0);

    pub fn from_iteration(iteration: Option<u64>, time_step_fs: f64) -> Self {
        match iteration {
            Some(iteration) => Self::Known(iteration as f64 * time_step_fs),
            None => Self::Unknown,
        }
    }

    pub fn femtoseconds(&self) -> Option<f64> {
        match self {
            Self::Known(fs) => Some(*fs),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for SimulatedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(fs) => write!(f, "{fs:.3}fs"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Running,
    /// Two atoms have moved further apart than the breakup threshold.
    Fragmented,
    /// The run log says the simulation is done.
    Finished,
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Fragmented => "fragmented",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// What a run's log and configuration have to say.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Signals {
    /// The log ends in the finished marker.
    pub finished: bool,
    pub temperature: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunStatus {
    pub run_id: String,
    pub time: SimulatedTime,
    /// Formulas of the fragments in the last frame, if there is one with atoms.
    pub fragments: Option<String>,
    pub completion: Completion,
    pub temperature: Option<String>,
}

impl fmt::Display for RunStatus {
    /// `<run_id>  t=<time>  [fragments=<formula>  ]status=<keyword>[ (T=<temperature>)]`
    ///
    /// The time is `<femtoseconds>fs`, or a bare `unknown` without the unit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  t={}", self.run_id, self.time)?;
        if let Some(fragments) = &self.fragments {
            write!(f, "  fragments={fragments}")?;
        }
        write!(f, "  status={}", self.completion)?;
        if let Some(temperature) = &self.temperature {
            write!(f, " (T={temperature})")?;
        }
        Ok(())
    }
}

/// Resolve the status of one run.
///
/// Fragments are reported for any frame with atoms, whether or not the run is complete.
/// Breakup of the frame takes precedence over the finished marker in the log.
pub fn resolve(
    run_id: impl Into<String>,
    snapshot: &Snapshot,
    signals: Signals,
    time_step_fs: f64,
    thresholds: &Thresholds,
) -> RunStatus {
    let run_id = run_id.into();
    let (time, fragments, fragmented) = match snapshot {
        Snapshot::Missing => (SimulatedTime::NOT_STARTED, None, false),
        Snapshot::Empty => (SimulatedTime::Unknown, None, false),
        Snapshot::Frame(frame) => {
            let time = SimulatedTime::from_iteration(frame.iteration, time_step_fs);
            let fragments = formula::describe(frame, thresholds.cluster);
            let coords: Vec<_> = frame.coords().collect();
            let breakup = classify::breakup_pair(&coords, thresholds.breakup);
            if let Some((i, j)) = breakup {
                log::debug!(
                    "{run_id}: atoms {i} and {j} are {:.3} apart",
                    coords[i].distance(coords[j])
                );
            }
            (time, fragments, breakup.is_some())
        }
    };

    let completion = if fragmented {
        Completion::Fragmented
    } else if signals.finished {
        Completion::Finished
    } else {
        Completion::Running
    };

    RunStatus {
        run_id,
        time,
        fragments,
        completion,
        temperature: signals.temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Atom, Frame};

    const STEP: f64 = 0.001;

    fn snapshot(iteration: Option<u64>, atoms: &[(&str, [f64; 3])]) -> Snapshot {
        let atoms = atoms.iter().map(|&(el, pos)| Atom::new(el, pos)).collect();
        Snapshot::Frame(Frame::new(iteration, atoms))
    }

    fn resolve_with(snapshot: &Snapshot, signals: Signals) -> RunStatus {
        resolve("td1", snapshot, signals, STEP, &Thresholds::default())
    }

    #[test]
    fn time_from_iteration() {
        let time = SimulatedTime::from_iteration(Some(430500), STEP);
        assert_eq!(time.to_string(), "430.500fs");
        assert!((time.femtoseconds().unwrap() - 430.5).abs() < 1e-9);
        assert_eq!(SimulatedTime::from_iteration(None, STEP), SimulatedTime::Unknown);
        assert_eq!(SimulatedTime::Unknown.to_string(), "unknown");
    }

    #[test]
    fn bonded_pair_is_running() {
        let snap = snapshot(Some(10), &[("H", [0.0; 3]), ("H", [0.0, 0.0, 1.0])]);
        let status = resolve_with(&snap, Signals::default());
        assert_eq!(status.fragments.as_deref(), Some("H2"));
        assert_eq!(status.completion, Completion::Running);
        assert!(!status.completion.is_complete());
    }

    #[test]
    fn broken_apart() {
        let snap = snapshot(Some(10), &[("O", [0.0; 3]), ("O", [0.0, 0.0, 10.0])]);
        let status = resolve_with(&snap, Signals::default());
        assert_eq!(status.fragments.as_deref(), Some("O+O"));
        assert_eq!(status.completion, Completion::Fragmented);
        assert!(status.completion.is_complete());
    }

    #[test]
    fn breakup_beats_log_marker() {
        let snap = snapshot(None, &[("O", [0.0; 3]), ("O", [0.0, 0.0, 10.0])]);
        let signals = Signals {
            finished: true,
            temperature: None,
        };
        assert_eq!(resolve_with(&snap, signals).completion, Completion::Fragmented);
    }

    #[test]
    fn log_marker_without_breakup() {
        let snap = snapshot(Some(1), &[("H", [0.0; 3]), ("H", [0.0, 0.0, 0.74])]);
        let signals = Signals {
            finished: true,
            temperature: None,
        };
        assert_eq!(resolve_with(&snap, signals).completion, Completion::Finished);
    }

    #[test]
    fn missing_trajectory() {
        let signals = Signals {
            finished: true,
            temperature: None,
        };
        let status = resolve_with(&Snapshot::Missing, signals);
        assert_eq!(status.time, SimulatedTime::Known(0.0));
        assert_eq!(status.fragments, None);
        assert_eq!(status.completion, Completion::Finished);

        let status = resolve_with(&Snapshot::Missing, Signals::default());
        assert_eq!(status.completion, Completion::Running);
    }

    #[test]
    fn empty_trajectory_falls_through_to_log() {
        let status = resolve_with(&Snapshot::Empty, Signals::default());
        assert_eq!(status.time, SimulatedTime::Unknown);
        assert_eq!(status.fragments, None);
        assert_eq!(status.completion, Completion::Running);

        let signals = Signals {
            finished: true,
            temperature: None,
        };
        assert_eq!(
            resolve_with(&Snapshot::Empty, signals).completion,
            Completion::Finished
        );
    }

    #[test]
    fn render() {
        let snap = snapshot(Some(430500), &[("H", [0.0; 3]), ("H", [0.0, 0.0, 1.0])]);
        let signals = Signals {
            finished: false,
            temperature: Some("300".to_string()),
        };
        let status = resolve_with(&snap, signals);
        assert_eq!(
            status.to_string(),
            "td1  t=430.500fs  fragments=H2  status=running (T=300)"
        );

        let status = resolve_with(&Snapshot::Missing, Signals::default());
        assert_eq!(status.to_string(), "td1  t=0.000fs  status=running");

        let snap = snapshot(None, &[("O", [0.0; 3]), ("O", [0.0, 0.0, 10.0])]);
        let status = resolve_with(&snap, Signals::default());
        assert_eq!(
            status.to_string(),
            "td1  t=unknown  fragments=O+O  status=fragmented"
        );
    }

    #[test]
    fn idempotent() {
        let snap = snapshot(Some(7), &[("C", [0.0; 3]), ("O", [1.1, 0.0, 0.0])]);
        let first = resolve_with(&snap, Signals::default());
        let second = resolve_with(&snap, Signals::default());
        assert_eq!(first, second);
    }
}
