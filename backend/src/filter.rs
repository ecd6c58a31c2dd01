//! Process filtering: system processes, exclusion keywords and name filter.
//!
//! All keyword matching is case-insensitive and runs against the formatted
//! display name, not the raw command line.

use crate::types::ProcessInfo;

/// Accounts that only own system services.
pub const SYSTEM_USERS: &[&str] = &[
    "root",
    "daemon",
    "nobody",
    "www",
    "www-data",
    "mail",
    "sshd",
    "postfix",
    "messagebus",
    "polkitd",
    "systemd-network",
    "systemd-resolve",
    "systemd-timesync",
];

/// Daemons that are never a sensible kill target, matched inside the display name.
pub const SYSTEM_PROCESS_NAMES: &[&str] = &[
    "kernel_task",
    "launchd",
    "windowserver",
    "loginwindow",
    "kthreadd",
    "systemd-journald",
    "systemd-logind",
    "dbus-daemon",
];

const SYSTEM_PATHS: &[&str] = &["/system/", "/usr/libexec/"];

const KTHREADD_PID: i32 = 2;

#[derive(Debug, Clone, Default)]
pub struct ProcessFilter {
    pub hide_system: bool,
    pub excludes: Vec<String>,
    pub name_filter: Option<String>,
    /// Pid that must never be listed, normally our own.
    pub own_pid: Option<i32>,
}

impl ProcessFilter {
    /// Filter for the running tool: hides itself and, optionally, system processes.
    pub fn for_current_process(hide_system: bool) -> Self {
        Self {
            hide_system,
            own_pid: Some(std::process::id() as i32),
            ..Self::default()
        }
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(
            excludes
                .into_iter()
                .map(|s| {
                    let s: String = s.into();
                    s.trim().to_string()
                })
                .filter(|s| !s.is_empty()),
        );
        self
    }

    pub fn with_name_filter(mut self, name: Option<String>) -> Self {
        self.name_filter = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn is_system_process(&self, proc: &ProcessInfo, display_name: &str) -> bool {
        if proc.pid == 1 || proc.pid == KTHREADD_PID || proc.ppid == KTHREADD_PID {
            return true;
        }
        if SYSTEM_USERS.contains(&proc.user.as_str()) {
            return true;
        }

        let name = display_name.to_lowercase();
        if SYSTEM_PROCESS_NAMES.iter().any(|sys| name.contains(sys)) {
            return true;
        }

        let command = proc.command.to_lowercase();
        SYSTEM_PATHS.iter().any(|path| command.starts_with(path))
    }

    pub fn is_excluded(&self, display_name: &str) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let name = display_name.to_lowercase();
        self.excludes
            .iter()
            .any(|keyword| name.contains(&keyword.to_lowercase()))
    }

    pub fn matches_name_filter(&self, display_name: &str) -> bool {
        match &self.name_filter {
            Some(filter) => display_name
                .to_lowercase()
                .contains(&filter.to_lowercase()),
            None => true,
        }
    }

    /// Whether a record survives every configured filter.
    pub fn keeps(&self, proc: &ProcessInfo, display_name: &str) -> bool {
        if self.own_pid == Some(proc.pid) {
            return false;
        }
        if self.hide_system && self.is_system_process(proc, display_name) {
            return false;
        }
        !self.is_excluded(display_name) && self.matches_name_filter(display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcessState;
    use chrono::Local;

    fn proc(pid: i32, ppid: i32, user: &str, command: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            ppid,
            user: user.to_string(),
            command: command.to_string(),
            program: String::new(),
            cpu_percent: 0.0,
            memory_bytes: 0,
            memory_percent: 0.0,
            start_time: Local::now(),
            state: ProcessState::Sleeping,
        }
    }

    #[test]
    fn detects_system_processes() {
        let filter = ProcessFilter::default();
        assert!(filter.is_system_process(&proc(1, 0, "alice", "/sbin/init"), "bin / init"));
        assert!(filter.is_system_process(&proc(57, 2, "alice", "kworker/0:1"), "kworker / 0:1"));
        assert!(filter.is_system_process(&proc(300, 1, "root", "/usr/sbin/cron"), "usr / cron"));
        assert!(filter.is_system_process(
            &proc(400, 1, "alice", "/usr/libexec/trustd"),
            "libexec / trustd"
        ));
        assert!(filter.is_system_process(
            &proc(500, 1, "alice", "/usr/bin/dbus-daemon --session"),
            "usr / dbus-daemon"
        ));
        assert!(!filter.is_system_process(&proc(600, 1, "alice", "node app.js"), "(no path) / node"));
    }

    #[test]
    fn keeps_honours_every_rule() {
        let filter = ProcessFilter {
            hide_system: true,
            excludes: vec!["Chrome".to_string()],
            name_filter: Some("NODE".to_string()),
            own_pid: Some(42),
        };
        assert!(filter.keeps(&proc(10, 1, "alice", "node a.js"), "(no path) / node"));
        assert!(!filter.keeps(&proc(42, 1, "alice", "node a.js"), "(no path) / node"));
        assert!(!filter.keeps(&proc(11, 1, "root", "node a.js"), "(no path) / node"));
        assert!(!filter.keeps(&proc(12, 1, "alice", "python3"), "(no path) / python3"));
        assert!(!filter.keeps(
            &proc(13, 1, "alice", "/Applications/Google Chrome.app/Contents/MacOS/node"),
            "Applications / Google Chrome / node"
        ));
    }

    #[test]
    fn builders_drop_blank_keywords() {
        let filter = ProcessFilter::default()
            .with_excludes(vec![" Cursor ", "", "  "])
            .with_name_filter(Some("   ".to_string()));
        assert_eq!(filter.excludes, vec!["Cursor".to_string()]);
        assert_eq!(filter.name_filter, None);
        assert!(filter.is_excluded("Applications / Cursor.app"));
    }
}
