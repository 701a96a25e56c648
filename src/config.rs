//! Settings for a batch of runs.
//!
//! Every value has a default. A TOML file may override any subset of them, for example:
//!
//! ```toml
//! base_dir = "/scratch/md"
//! first_run = 1
//! last_run = 40
//! time_step_fs = 0.001
//! cluster_threshold = 2.0
//! breakup_threshold = 5.0
//! ```
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// The two distance thresholds, in ångström.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Atoms closer than this are bonded.
    pub cluster: f64,
    /// Atoms further apart than this mean the system has broken up.
    pub breakup: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cluster: 2.0,
            breakup: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory that holds the run directories.
    pub base_dir: PathBuf,
    /// A run directory is named by this prefix followed by the run number, like `td12`.
    pub run_prefix: String,
    pub first_run: u64,
    /// Inclusive.
    pub last_run: u64,
    pub trajectory_file: String,
    pub log_file: String,
    pub config_file: String,
    /// Simulated time per iteration, in femtoseconds.
    pub time_step_fs: f64,
    pub cluster_threshold: f64,
    pub breakup_threshold: f64,
    /// A run is finished when the last line of its log contains this.
    pub finished_marker: String,
    /// Key of the temperature field in the run configuration.
    pub temperature_key: String,
    /// Worker threads. Zero picks one per core, one processes runs strictly in sequence.
    pub jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            base_dir: PathBuf::from("."),
            run_prefix: "td".to_string(),
            first_run: 1,
            last_run: 1,
            trajectory_file: "trajectory.xyz".to_string(),
            log_file: "monitor.out".to_string(),
            config_file: "input.inp".to_string(),
            time_step_fs: 0.001,
            cluster_threshold: thresholds.cluster,
            breakup_threshold: thresholds.breakup,
            finished_marker: "finished".to_string(),
            temperature_key: "temperature".to_string(),
            jobs: 0,
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))
    }

    /// Rejects values that cannot describe a batch.
    ///
    /// A cluster threshold that is not below the breakup threshold is allowed, but logged.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("time_step_fs", self.time_step_fs),
            ("cluster_threshold", self.cluster_threshold),
            ("breakup_threshold", self.breakup_threshold),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "{name} must be a positive number, found {value}"
                )));
            }
        }
        if self.first_run > self.last_run {
            return Err(Error::Config(format!(
                "the run range {}..={} is empty",
                self.first_run, self.last_run
            )));
        }
        if self.cluster_threshold >= self.breakup_threshold {
            log::warn!(
                "cluster threshold {} is not below the breakup threshold {}",
                self.cluster_threshold,
                self.breakup_threshold
            );
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            cluster: self.cluster_threshold,
            breakup: self.breakup_threshold,
        }
    }

    /// The identifiers of all runs in the batch, in order.
    pub fn run_ids(&self) -> impl Iterator<Item = String> + '_ {
        (self.first_run..=self.last_run).map(move |n| format!("{}{n}", self.run_prefix))
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.thresholds(), Thresholds::default());
        assert_eq!(settings.run_ids().collect::<Vec<_>>(), ["td1"]);
    }

    #[test]
    fn partial_toml() {
        let settings = Settings::from_toml(
            r#"
            base_dir = "/scratch/md"
            run_prefix = "run"
            first_run = 3
            last_run = 5
            breakup_threshold = 6.5
            "#,
        )
        .unwrap();
        assert_eq!(settings.base_dir, PathBuf::from("/scratch/md"));
        assert_eq!(settings.breakup_threshold, 6.5);
        assert_eq!(settings.cluster_threshold, 2.0);
        assert_eq!(
            settings.run_ids().collect::<Vec<_>>(),
            ["run3", "run4", "run5"]
        );
        assert_eq!(
            settings.run_dir("run4"),
            PathBuf::from("/scratch/md").join("run4")
        );
    }

    #[test]
    fn unknown_key() {
        let err = Settings::from_toml("cluster_treshold = 2.0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            Settings {
                time_step_fs: 0.0,
                ..Settings::default()
            },
            Settings {
                cluster_threshold: f64::NAN,
                ..Settings::default()
            },
            Settings {
                breakup_threshold: -5.0,
                ..Settings::default()
            },
            Settings {
                first_run: 4,
                last_run: 3,
                ..Settings::default()
            },
        ];
        for settings in bad {
            assert!(settings.validate().is_err(), "{settings:?}");
        }
    }

    #[test]
    fn inverted_thresholds_only_warn() {
        let settings = Settings {
            cluster_threshold: 6.0,
            ..Settings::default()
        };
        settings.validate().unwrap();
    }
}
