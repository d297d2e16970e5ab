//! Where per-generation average fitness goes.

use crate::agent::Role;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Receives one average-fitness figure per role per generation, just before
/// that generation is evolved away.
pub trait FitnessSink {
    fn record(&mut self, role: Role, generation: u32, average: f32) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessRecord {
    pub role: Role,
    pub generation: u32,
    pub average: f32,
}

/// Appends `{:.5}` lines to `forager_averages.txt` and `pursuer_averages.txt`.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates `dir` if needed and removes averages left by an earlier run.
    pub fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let sink = Self { dir: dir.into() };
        fs::create_dir_all(&sink.dir)?;
        for role in Role::BOTH {
            match fs::remove_file(sink.path_for(role)) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(sink)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, role: Role) -> PathBuf {
        self.dir.join(format!("{}_averages.txt", role.name()))
    }
}

impl FitnessSink for FileSink {
    fn record(&mut self, role: Role, _generation: u32, average: f32) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(self.path_for(role))?;
        writeln!(file, "{average:.5}")
    }
}

/// Keeps records in memory. Clones share the same buffer, so a caller can
/// hand one clone to a simulation and read the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<FitnessRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FitnessRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Averages for one role in generation order.
    pub fn curve(&self, role: Role) -> Vec<f32> {
        self.records().into_iter().filter(|r| r.role == role).map(|r| r.average).collect()
    }
}

impl FitnessSink for MemorySink {
    fn record(&mut self, role: Role, generation: u32, average: f32) -> io::Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push(FitnessRecord { role, generation, average });
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FitnessSink for NullSink {
    fn record(&mut self, _role: Role, _generation: u32, _average: f32) -> io::Result<()> {
        Ok(())
    }
}
