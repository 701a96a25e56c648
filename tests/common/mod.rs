#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fragwatch::Settings;
use tempfile::TempDir;

pub mod trajectories {
    pub const WATER: &str = "tests/trajectories/water.xyz";
    pub const BREAKUP: &str = "tests/trajectories/oxygen_breakup.xyz";
    pub const NO_ITER: &str = "tests/trajectories/no_iteration.xyz";
    pub const ZERO: &str = "tests/trajectories/zero_atoms.xyz";
    pub const MALFORMED: &str = "tests/trajectories/malformed.xyz";
    pub const TRUNCATED: &str = "tests/trajectories/truncated.xyz";
    pub const METHANE: &str = "tests/trajectories/methane_scatter.xyz";
}

/// A throwaway base directory holding run directories `td1`, `td2`, ...
pub struct Batch {
    base: TempDir,
}

impl Batch {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            base: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.base.path()
    }

    /// Creates the directory for `run_id`, if needed, and returns its path.
    pub fn run(&self, run_id: &str) -> io::Result<PathBuf> {
        let dir = self.base.path().join(run_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Copies a fixture trajectory into the run directory.
    pub fn trajectory(&self, run_id: &str, fixture: &str) -> io::Result<()> {
        let settings = Settings::default();
        fs::copy(fixture, self.run(run_id)?.join(settings.trajectory_file))?;
        Ok(())
    }

    pub fn log(&self, run_id: &str, contents: &str) -> io::Result<()> {
        let settings = Settings::default();
        fs::write(self.run(run_id)?.join(settings.log_file), contents)
    }

    pub fn config(&self, run_id: &str, contents: &str) -> io::Result<()> {
        let settings = Settings::default();
        fs::write(self.run(run_id)?.join(settings.config_file), contents)
    }

    /// Default settings covering the runs `td<first>` up to and including `td<last>`.
    pub fn settings(&self, first: u64, last: u64) -> Settings {
        Settings {
            base_dir: self.base.path().to_path_buf(),
            first_run: first,
            last_run: last,
            ..Settings::default()
        }
    }
}
