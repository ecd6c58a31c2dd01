//! Process listing from procfs.

use crate::types::{ProcError, ProcessInfo, ProcessState, Snapshot};
use chrono::{DateTime, Local};
use nix::unistd::{Uid, User};
use procfs::{Current, Meminfo};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::debug;

/// Anything that can produce a fresh process snapshot.
pub trait ProcessSource {
    fn snapshot(&mut self) -> Result<Snapshot, ProcError>;
}

struct ProcessCpuData {
    total_time: u64,
    last_update: Instant,
    last_percent: f32,
}

/// Per-pid CPU bookkeeping between two snapshots.
struct CpuTracker {
    ticks_per_second: u64,
    process_data: HashMap<i32, ProcessCpuData>,
}

impl CpuTracker {
    fn new(ticks_per_second: u64) -> Self {
        Self {
            ticks_per_second: ticks_per_second.max(1),
            process_data: HashMap::new(),
        }
    }

    /// First sighting reports the lifetime average (like `ps`); later calls
    /// report usage since the previous sample once a second has passed.
    fn calculate_cpu_percent(
        &mut self,
        pid: i32,
        total_time: u64,
        start_time: DateTime<Local>,
        captured_at: DateTime<Local>,
    ) -> f32 {
        let now = Instant::now();
        let ticks_per_second = self.ticks_per_second as f64;

        if let Some(prev) = self.process_data.get_mut(&pid) {
            // a shrinking counter means the pid was reused
            if total_time >= prev.total_time {
                let elapsed_seconds = now.duration_since(prev.last_update).as_secs_f64();
                if elapsed_seconds < 1.0 {
                    return prev.last_percent;
                }
                let cpu_seconds = (total_time - prev.total_time) as f64 / ticks_per_second;
                let percent = (cpu_seconds / elapsed_seconds * 100.0).max(0.0) as f32;
                *prev = ProcessCpuData {
                    total_time,
                    last_update: now,
                    last_percent: percent,
                };
                return percent;
            }
        }

        let lifetime_seconds = (captured_at - start_time).num_milliseconds() as f64 / 1000.0;
        let percent = if lifetime_seconds > 0.0 {
            (total_time as f64 / ticks_per_second / lifetime_seconds * 100.0) as f32
        } else {
            0.0
        };
        self.process_data.insert(
            pid,
            ProcessCpuData {
                total_time,
                last_update: now,
                last_percent: percent,
            },
        );
        percent
    }

    fn cleanup_old_processes(&mut self, current_pids: &HashSet<i32>) {
        self.process_data.retain(|pid, _| current_pids.contains(pid));
    }
}

/// Linux process source backed by `/proc`.
pub struct ProcfsSource {
    tracker: CpuTracker,
    users: HashMap<u32, String>,
    boot_time: i64,
    ticks_per_second: u64,
    page_size: u64,
    mem_total_bytes: u64,
}

impl ProcfsSource {
    pub fn new() -> Result<Self, ProcError> {
        let boot_time = procfs::boot_time_secs()? as i64;
        let mem_total_bytes = Meminfo::current()?.mem_total;
        let ticks_per_second = procfs::ticks_per_second();

        Ok(Self {
            tracker: CpuTracker::new(ticks_per_second),
            users: HashMap::new(),
            boot_time,
            ticks_per_second: ticks_per_second.max(1),
            page_size: procfs::page_size(),
            mem_total_bytes,
        })
    }

    fn user_name(&mut self, uid: u32) -> String {
        self.users
            .entry(uid)
            .or_insert_with(|| {
                User::from_uid(Uid::from_raw(uid))
                    .ok()
                    .flatten()
                    .map(|u| u.name)
                    .unwrap_or_else(|| uid.to_string())
            })
            .clone()
    }

    fn start_time(&self, starttime_ticks: u64, fallback: DateTime<Local>) -> DateTime<Local> {
        let since_boot_ms = starttime_ticks * 1000 / self.ticks_per_second;
        let secs = self.boot_time + (since_boot_ms / 1000) as i64;
        let nanos = ((since_boot_ms % 1000) * 1_000_000) as u32;
        DateTime::from_timestamp(secs, nanos)
            .map(|utc| utc.with_timezone(&Local))
            .unwrap_or(fallback)
    }

    fn memory_percent(&self, memory_bytes: u64) -> f32 {
        if self.mem_total_bytes == 0 {
            return 0.0;
        }
        (memory_bytes as f64 / self.mem_total_bytes as f64 * 100.0) as f32
    }
}

impl ProcessSource for ProcfsSource {
    fn snapshot(&mut self) -> Result<Snapshot, ProcError> {
        let all_procs = procfs::process::all_processes()
            .map_err(|e| ProcError::EnumerationFailure(format!("Failed to read /proc: {}", e)))?;

        let captured_at = Local::now();
        let mut records = Vec::new();
        let mut current_pids = HashSet::new();

        for proc_result in all_procs {
            let Ok(proc) = proc_result else { continue };
            // the process may exit while we read it
            let Ok(stat) = proc.stat() else { continue };

            let (command, program) = match proc.cmdline() {
                Ok(args) if !args.is_empty() => (args.join(" "), args[0].clone()),
                _ => (format!("[{}]", stat.comm), String::new()),
            };
            let user = match proc.uid() {
                Ok(uid) => self.user_name(uid),
                Err(_) => "?".to_string(),
            };
            let memory_bytes = proc.statm().map(|m| m.resident * self.page_size).unwrap_or(0);
            let start_time = self.start_time(stat.starttime, captured_at);
            let cpu_percent = self.tracker.calculate_cpu_percent(
                stat.pid,
                stat.utime + stat.stime,
                start_time,
                captured_at,
            );

            current_pids.insert(stat.pid);
            records.push(ProcessInfo {
                pid: stat.pid,
                ppid: stat.ppid,
                user,
                command,
                program,
                cpu_percent,
                memory_bytes,
                memory_percent: self.memory_percent(memory_bytes),
                start_time,
                state: ProcessState::from_code(stat.state),
            });
        }

        self.tracker.cleanup_old_processes(&current_pids);
        debug!(count = records.len(), "captured process snapshot");

        Ok(Snapshot {
            records,
            captured_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn snapshot_contains_the_current_process() {
        let mut source = ProcfsSource::new().expect("procfs available");
        let snapshot = source.snapshot().expect("snapshot");
        let own_pid = std::process::id() as i32;

        let me = snapshot
            .records
            .iter()
            .find(|p| p.pid == own_pid)
            .expect("own pid listed");
        assert!(!me.command.is_empty());
        assert!(me.start_time <= snapshot.captured_at + Duration::seconds(1));
        assert!(me.memory_bytes > 0);
        assert!(me.cpu_percent >= 0.0);
        assert_ne!(me.state, ProcessState::Zombie);
        assert!(!me.program.is_empty());
        assert!(me.command.starts_with(&me.program));
    }

    #[test]
    fn system_values_come_from_the_kernel() {
        let source = ProcfsSource::new().expect("procfs available");
        assert_eq!(source.page_size, procfs::page_size());
        assert_eq!(source.ticks_per_second, procfs::ticks_per_second());
        assert_eq!(
            source.mem_total_bytes,
            Meminfo::current().expect("meminfo").mem_total
        );
        assert_eq!(
            source.boot_time,
            procfs::boot_time_secs().expect("boot time") as i64
        );

        let half = source.mem_total_bytes / 2;
        assert!((source.memory_percent(half) - 50.0).abs() < 0.01);
    }

    #[test]
    fn resident_memory_is_whole_pages() {
        let mut source = ProcfsSource::new().expect("procfs available");
        let snapshot = source.snapshot().expect("snapshot");
        let page = procfs::page_size();
        assert!(snapshot.records.iter().all(|p| p.memory_bytes % page == 0));
    }

    #[test]
    fn tracker_reports_lifetime_average_on_first_sighting() {
        let mut tracker = CpuTracker::new(250);
        let now = Local::now();
        // 50 seconds of CPU over 100 seconds of life
        let percent = tracker.calculate_cpu_percent(7, 50 * 250, now - Duration::seconds(100), now);
        assert!((percent - 50.0).abs() < 0.01, "{percent}");

        // a second sample inside one second repeats the last value
        let again = tracker.calculate_cpu_percent(7, 60 * 250, now - Duration::seconds(100), now);
        assert_eq!(again, percent);
    }

    #[test]
    fn tracker_forgets_exited_processes() {
        let mut tracker = CpuTracker::new(100);
        let now = Local::now();
        tracker.calculate_cpu_percent(1, 10, now, now);
        tracker.calculate_cpu_percent(2, 10, now, now);
        tracker.cleanup_old_processes(&HashSet::from([2]));
        assert!(!tracker.process_data.contains_key(&1));
        assert!(tracker.process_data.contains_key(&2));
    }
}
