//! Data types and error definitions for process management.

use chrono::{DateTime, Local};
use std::fmt;
use thiserror::Error;

/// Scheduler state of a process as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    Running,
    Sleeping,
    DiskSleep,
    Zombie,
    Stopped,
    Idle,
    Other(char),
}

impl ProcessState {
    /// Map the single-letter state code found in `/proc/<pid>/stat` and `ps`.
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskSleep,
            'Z' => ProcessState::Zombie,
            'T' | 't' => ProcessState::Stopped,
            'I' => ProcessState::Idle,
            other => ProcessState::Other(other),
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessState::Running => "running",
            ProcessState::Sleeping => "sleeping",
            ProcessState::DiskSleep => "disk-sleep",
            ProcessState::Zombie => "zombie",
            ProcessState::Stopped => "stopped",
            ProcessState::Idle => "idle",
            ProcessState::Other(_) => "other",
        };
        f.write_str(label)
    }
}

/// Represents a process entry, captured once and never mutated.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: i32,
    pub ppid: i32,
    pub user: String,
    /// Full command line, arguments joined by single spaces.
    pub command: String,
    /// `argv[0]` as the kernel reported it, empty when unknown.
    pub program: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub memory_percent: f32,
    pub start_time: DateTime<Local>,
    pub state: ProcessState,
}

impl ProcessInfo {
    /// Text the display name is derived from.
    ///
    /// `argv[0]` keeps a bundle path with spaces apart from its arguments;
    /// the joined command line is the fallback.
    pub fn name_source(&self) -> &str {
        if self.program.trim().is_empty() {
            &self.command
        } else {
            &self.program
        }
    }
}

/// A point-in-time list of processes.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Vec<ProcessInfo>,
    pub captured_at: DateTime<Local>,
}

impl Snapshot {
    pub fn new(records: Vec<ProcessInfo>) -> Self {
        Self {
            records,
            captured_at: Local::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_memory_bytes(&self) -> u64 {
        self.records.iter().map(|p| p.memory_bytes).sum()
    }
}

/// Errors that can occur during process management.
#[derive(Error, Debug)]
pub enum ProcError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Failed to enumerate processes: {0}")]
    EnumerationFailure(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Procfs error: {0}")]
    ProcfsError(String),
}

impl From<procfs::ProcError> for ProcError {
    fn from(err: procfs::ProcError) -> Self {
        ProcError::ProcfsError(err.to_string())
    }
}
