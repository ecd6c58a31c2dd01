//! Plain-terminal rendering of ranked lists and termination reports.

use chrono::{DateTime, Local};
use console::{pad_str, style, Alignment};
use psk_backend::{RankedEntry, SortMode, TerminationOutcome, TerminationResult};

const NAME_WIDTH: usize = 56;

pub fn print_table(entries: &[RankedEntry], mode: &SortMode, captured_at: DateTime<Local>) {
    println!(
        "\n{} {} ({} processes)",
        style("Sorted by").bold(),
        style(mode).cyan(),
        entries.len()
    );
    for entry in entries {
        println!("{}", format_row(entry, captured_at));
    }
    println!();
}

pub fn format_row(entry: &RankedEntry, captured_at: DateTime<Local>) -> String {
    let mut name = entry.display_name.clone();
    let marks = flag_marks(entry);
    if !marks.is_empty() {
        name = format!("{name} {marks}");
    }
    let proc = &entry.record;
    format!(
        "{:>3}. {} PID: {:<7} CPU: {:>6.1}% MEM: {:>6.1}% UP: {}",
        entry.index,
        pad_str(&name, NAME_WIDTH, Alignment::Left, Some("...")),
        proc.pid,
        proc.cpu_percent,
        proc.memory_percent,
        format_uptime(proc.start_time, captured_at)
    )
}

fn flag_marks(entry: &RankedEntry) -> String {
    if !entry.flags.any() {
        return String::new();
    }
    let mut marks = Vec::new();
    if entry.flags.zombie {
        marks.push("🧟");
    }
    if entry.flags.heavy {
        marks.push("🔥");
    }
    if entry.flags.long_running {
        marks.push("⏰");
    }
    marks.join(" ")
}

/// Compact age such as `3d4h`, `5h12m` or `7m`.
pub fn format_uptime(start: DateTime<Local>, now: DateTime<Local>) -> String {
    let minutes = (now - start).num_minutes().max(0);
    let (days, hours, mins) = (minutes / 1440, minutes / 60 % 24, minutes % 60);
    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{mins}m")
    } else {
        format!("{mins}m")
    }
}

pub fn print_targets(targets: &[&RankedEntry]) {
    println!("\n{}", style(format!("Terminate {} process(es)?", targets.len())).yellow().bold());
    for entry in targets {
        println!("  • {} (PID: {})", entry.record.command, entry.record.pid);
    }
}

pub fn print_report(results: &[TerminationResult], targets: &[&RankedEntry]) {
    println!();
    for result in results {
        println!("{}", format_result(result, command_for(targets, result.pid)));
    }

    let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
    let failed = results.len() - succeeded;
    let summary = format!("{succeeded} terminated, {failed} failed");
    if failed == 0 {
        println!("\n{}", style(summary).green());
    } else {
        println!("\n{}", style(summary).yellow());
    }
}

pub fn format_result(result: &TerminationResult, command: &str) -> String {
    let mark = if result.outcome.is_success() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    let signals = if result.signal_sequence.is_empty() {
        "no signal sent".to_string()
    } else {
        result
            .signal_sequence
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" → ")
    };
    let outcome = match result.outcome {
        TerminationOutcome::TimedOut => style(result.outcome).red(),
        _ => style(result.outcome),
    };
    format!("{mark} {command} (PID: {}) {outcome} [{signals}]", result.pid)
}

fn command_for<'a>(targets: &[&'a RankedEntry], pid: i32) -> &'a str {
    targets
        .iter()
        .find(|entry| entry.record.pid == pid)
        .map(|entry| entry.record.command.as_str())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use psk_backend::{EntryFlags, ProcessInfo, ProcessState, SignalKind};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 5, 4, 18, 0, 0).unwrap()
    }

    fn entry(flags: EntryFlags) -> RankedEntry {
        RankedEntry {
            index: 7,
            record: ProcessInfo {
                pid: 4242,
                ppid: 1,
                user: "alice".to_string(),
                command: "/usr/bin/python3 -m http.server".to_string(),
                program: "/usr/bin/python3".to_string(),
                cpu_percent: 12.345,
                memory_bytes: 1 << 20,
                memory_percent: 1.5,
                start_time: now() - Duration::minutes(135),
                state: ProcessState::Sleeping,
            },
            display_name: "usr / python3".to_string(),
            flags,
        }
    }

    #[test]
    fn uptime_is_compact() {
        assert_eq!(format_uptime(now() - Duration::minutes(7), now()), "7m");
        assert_eq!(format_uptime(now() - Duration::minutes(312), now()), "5h12m");
        assert_eq!(format_uptime(now() - Duration::hours(76), now()), "3d4h");
        assert_eq!(format_uptime(now() + Duration::minutes(5), now()), "0m");
    }

    #[test]
    fn row_shows_index_name_and_metrics() {
        console::set_colors_enabled(false);
        let row = format_row(&entry(EntryFlags::default()), now());
        assert!(row.starts_with("  7. usr / python3 "), "{row}");
        assert!(row.contains("PID: 4242"), "{row}");
        assert!(row.contains("CPU:   12.3%"), "{row}");
        assert!(row.contains("MEM:    1.5%"), "{row}");
        assert!(row.ends_with("UP: 2h15m"), "{row}");
    }

    #[test]
    fn row_appends_flag_marks() {
        let flags = EntryFlags {
            zombie: true,
            heavy: false,
            long_running: true,
        };
        let row = format_row(&entry(flags), now());
        assert!(row.contains("usr / python3 🧟 ⏰"), "{row}");
    }

    #[test]
    fn result_line_lists_signals_sent() {
        console::set_colors_enabled(false);
        let result = TerminationResult {
            pid: 4242,
            outcome: TerminationOutcome::ForceKilled,
            signal_sequence: vec![SignalKind::Graceful, SignalKind::Forced],
        };
        let line = format_result(&result, "/usr/bin/python3");
        assert_eq!(
            line,
            "✓ /usr/bin/python3 (PID: 4242) force killed [SIGTERM → SIGKILL]"
        );

        let denied = TerminationResult {
            pid: 1,
            outcome: TerminationOutcome::PermissionDenied,
            signal_sequence: Vec::new(),
        };
        assert!(format_result(&denied, "/sbin/init").starts_with("✗ /sbin/init (PID: 1) permission denied"));
    }
}
