//! Persistent history tracking for the SolvraPad shell.

use anyhow::Context;
use directories::ProjectDirs;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

const HISTORY_FILE: &str = "history";

/// Manages command history persistence and de-duplication.
#[derive(Debug)]
pub struct HistoryManager {
    path: PathBuf,
    entries: VecDeque<String>,
    capacity: usize,
}

impl HistoryManager {
    /// Load history from disk creating the data directory when required.
    pub fn load(capacity: usize) -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "Solvra", "solvrapad")
            .ok_or_else(|| anyhow::anyhow!("unable to determine data directory"))?;
        let data_dir = dirs.data_local_dir();
        fs::create_dir_all(data_dir).context("creating SolvraPad data directory")?;
        let mut manager = Self::with_path(data_dir.join(HISTORY_FILE), capacity);
        manager.read_existing()?;
        Ok(manager)
    }

    /// Construct an empty manager backed by the provided file path.
    pub fn with_path(path: PathBuf, capacity: usize) -> Self {
        Self {
            path,
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn read_existing(&mut self) -> anyhow::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("opening history file {}", self.path.display()))?;
        for line in BufReader::new(file)
            .lines()
            .map_while(std::result::Result::ok)
        {
            self.add(&line);
        }
        Ok(())
    }

    /// Append an entry while skipping blanks and consecutive duplicates.
    pub fn add(&mut self, entry: &str) {
        if entry.trim().is_empty() {
            return;
        }
        if self.entries.back().is_some_and(|last| last == entry) {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.to_string());
    }

    /// Persist history entries to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .with_context(|| format!("opening history file {}", self.path.display()))?;
        for line in &self.entries {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// Borrow history entries.
    pub fn entries(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    /// Most recent entry, if any.
    pub fn last(&self) -> Option<&String> {
        self.entries.back()
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
