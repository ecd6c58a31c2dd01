use chrono::Local;
use psk_backend::{
    parse_selection, rank, ProcError, ProcessFilter, ProcessInfo, ProcessState, RankWeights, Snapshot, SortMode,
};

fn record(pid: i32, command: &str, cpu: f32) -> ProcessInfo {
    ProcessInfo {
        pid,
        ppid: 1,
        user: "alice".to_string(),
        command: command.to_string(),
        program: String::new(),
        cpu_percent: cpu,
        memory_bytes: 1 << 20,
        memory_percent: 0.5,
        start_time: Local::now(),
        state: ProcessState::Sleeping,
    }
}

fn snapshot() -> Snapshot {
    Snapshot::new(vec![
        record(101, "/opt/homebrew/Cellar/node@22/22.17.0/bin/node server.js", 12.0),
        record(102, "/usr/bin/python3 worker.py", 40.0),
        record(103, "/Applications/Slack.app/Contents/MacOS/Slack", 3.0),
        record(104, "node build.js", 25.0),
    ])
}

#[test]
fn selection_resolves_to_pids_of_the_rendered_list() {
    let snapshot = snapshot();
    let ranked = rank(&snapshot, &SortMode::Cpu, &RankWeights::default(), &ProcessFilter::default());
    let names: Vec<&str> = ranked.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["usr / python3", "(no path) / node", "homebrew / node", "Applications / Slack.app"]
    );

    let selection = parse_selection("1, 3-4", ranked.len()).expect("valid selection");
    let pids: Vec<i32> = selection.pick(&ranked).iter().map(|e| e.record.pid).collect();
    assert_eq!(pids, vec![102, 101, 103]);
}

#[test]
fn selection_is_checked_against_the_filtered_length() {
    let snapshot = snapshot();
    let ranked = rank(
        &snapshot,
        &SortMode::Search("node".to_string()),
        &RankWeights::default(),
        &ProcessFilter::default(),
    );
    assert_eq!(ranked.len(), 2);
    assert!(parse_selection("1-2", ranked.len()).is_ok());
    assert!(matches!(parse_selection("3", ranked.len()), Err(ProcError::InvalidSelection(_))));
}
