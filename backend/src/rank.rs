//! Sorting and filtering of a snapshot into a numbered, display-ready list.

use crate::filter::ProcessFilter;
use crate::naming::format_name;
use crate::types::{ProcError, ProcessInfo, ProcessState, Snapshot};
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const HEAVY_MEMORY_PERCENT: f32 = 30.0;
const HEAVY_CPU_PERCENT: f32 = 100.0;
const LONG_RUNNING_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    General,
    Memory,
    Cpu,
    Uptime,
    Zombie,
    Search(String),
}

impl SortMode {
    pub fn key(&self) -> &'static str {
        match self {
            SortMode::General => "general",
            SortMode::Memory => "memory",
            SortMode::Cpu => "cpu",
            SortMode::Uptime => "uptime",
            SortMode::Zombie => "zombie",
            SortMode::Search(_) => "search",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SortMode::General => "General (CPU + Memory)",
            SortMode::Memory => "Memory usage",
            SortMode::Cpu => "CPU usage",
            SortMode::Uptime => "Uptime (oldest first)",
            SortMode::Zombie => "Zombie processes",
            SortMode::Search(_) => "Search by name",
        }
    }

    fn admits(&self, proc: &ProcessInfo, display_name: &str) -> bool {
        match self {
            SortMode::Zombie => proc.state == ProcessState::Zombie,
            SortMode::Search(query) if !query.is_empty() => {
                let query = query.to_lowercase();
                proc.command.to_lowercase().contains(&query)
                    || display_name.to_lowercase().contains(&query)
            }
            _ => true,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Search(query) if !query.is_empty() => write!(f, "search \"{query}\""),
            other => f.write_str(other.key()),
        }
    }
}

impl FromStr for SortMode {
    type Err = ProcError;

    /// Accepts a mode key; `search:<query>` carries a query.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(query) = s.strip_prefix("search:") {
            return Ok(SortMode::Search(query.trim().to_string()));
        }
        match s.to_lowercase().as_str() {
            "general" => Ok(SortMode::General),
            "memory" => Ok(SortMode::Memory),
            "cpu" => Ok(SortMode::Cpu),
            "uptime" => Ok(SortMode::Uptime),
            "zombie" => Ok(SortMode::Zombie),
            "search" => Ok(SortMode::Search(String::new())),
            other => Err(ProcError::Config(format!(
                "unknown sorting mode '{other}' (expected one of: general, memory, cpu, uptime, zombie, search)"
            ))),
        }
    }
}

/// The available sorting modes, in menu order.
pub fn list_modes() -> Vec<SortMode> {
    vec![
        SortMode::General,
        SortMode::Memory,
        SortMode::Cpu,
        SortMode::Uptime,
        SortMode::Zombie,
        SortMode::Search(String::new()),
    ]
}

/// Weights of the `general` composite score. Each metric is first divided by
/// its maximum over the candidates, so both terms range over `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub cpu_weight: f64,
    pub memory_weight: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            cpu_weight: 1.0,
            memory_weight: 1.0,
        }
    }
}

/// Attention markers shown next to a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags {
    pub zombie: bool,
    pub heavy: bool,
    pub long_running: bool,
}

impl EntryFlags {
    fn of(proc: &ProcessInfo, now: DateTime<Local>) -> Self {
        Self {
            zombie: proc.state == ProcessState::Zombie,
            heavy: proc.memory_percent >= HEAVY_MEMORY_PERCENT
                || proc.cpu_percent >= HEAVY_CPU_PERCENT,
            long_running: now - proc.start_time >= Duration::days(LONG_RUNNING_DAYS),
        }
    }

    pub fn any(&self) -> bool {
        self.zombie || self.heavy || self.long_running
    }
}

/// One numbered row of a rendered list.
#[derive(Debug, Clone)]
pub struct RankedEntry {
    /// 1-based position, only meaningful for the list it came from.
    pub index: usize,
    pub record: ProcessInfo,
    pub display_name: String,
    pub flags: EntryFlags,
}

struct Candidate<'a> {
    record: &'a ProcessInfo,
    display_name: String,
    score: f64,
}

/// Filter and order a snapshot, numbering the result from 1.
pub fn rank(
    snapshot: &Snapshot,
    mode: &SortMode,
    weights: &RankWeights,
    filter: &ProcessFilter,
) -> Vec<RankedEntry> {
    let mut candidates: Vec<Candidate<'_>> = snapshot
        .records
        .iter()
        .map(|record| Candidate {
            display_name: format_name(record.name_source()),
            record,
            score: 0.0,
        })
        .filter(|c| filter.keeps(c.record, &c.display_name))
        .collect();

    // scores are scaled over every kept record, so a search never reorders
    // its matches relative to the general list
    if matches!(mode, SortMode::General | SortMode::Search(_)) {
        assign_scores(&mut candidates, weights);
    }
    candidates.retain(|c| mode.admits(c.record, &c.display_name));

    match mode {
        SortMode::General | SortMode::Search(_) => {
            candidates.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then_with(|| ord_f32(b.record.cpu_percent, a.record.cpu_percent))
                    .then_with(|| a.record.pid.cmp(&b.record.pid))
            });
        }
        SortMode::Memory => candidates.sort_by(|a, b| {
            b.record
                .memory_bytes
                .cmp(&a.record.memory_bytes)
                .then_with(|| a.record.pid.cmp(&b.record.pid))
        }),
        SortMode::Cpu => candidates.sort_by(|a, b| {
            ord_f32(b.record.cpu_percent, a.record.cpu_percent)
                .then_with(|| a.record.pid.cmp(&b.record.pid))
        }),
        SortMode::Uptime => candidates.sort_by(|a, b| {
            a.record
                .start_time
                .cmp(&b.record.start_time)
                .then_with(|| a.record.pid.cmp(&b.record.pid))
        }),
        SortMode::Zombie => candidates.sort_by_key(|c| c.record.pid),
    }

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| RankedEntry {
            index: i + 1,
            flags: EntryFlags::of(c.record, snapshot.captured_at),
            record: c.record.clone(),
            display_name: c.display_name,
        })
        .collect()
}

fn assign_scores(candidates: &mut [Candidate<'_>], weights: &RankWeights) {
    let max_cpu = candidates
        .iter()
        .map(|c| c.record.cpu_percent as f64)
        .fold(0.0, f64::max);
    let max_mem = candidates
        .iter()
        .map(|c| c.record.memory_bytes as f64)
        .fold(0.0, f64::max);

    for c in candidates.iter_mut() {
        let cpu = normalized(c.record.cpu_percent as f64, max_cpu);
        let mem = normalized(c.record.memory_bytes as f64, max_mem);
        c.score = weights.cpu_weight * cpu + weights.memory_weight * mem;
    }
}

fn normalized(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

// Total f32 ordering so sorts stay well-defined even with NaN
fn ord_f32(a: f32, b: f32) -> Ordering {
    a.total_cmp(&b)
}
