//! Display-name normalization.
//!
//! Turns a raw command line into a short `"<context> / <executable>"` label.
//! Rules are tried in table order and the first one that matches wins.

/// Labels never exceed this many characters.
pub const MAX_LABEL_LEN: usize = 50;

const SEPARATOR: &str = " / ";
const ELLIPSIS: &str = "...";

/// A label split into the part that may be shortened and the part that may not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName {
    pub context: String,
    pub executable: String,
}

impl DisplayName {
    fn new(context: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            executable: executable.into(),
        }
    }

    /// Render the label, shortening the context until it fits in `max_len`.
    pub fn render(&self, max_len: usize) -> String {
        let full = format!("{}{SEPARATOR}{}", self.context, self.executable);
        if char_len(&full) <= max_len {
            return full;
        }

        let exec_len = char_len(&self.executable);
        let room = max_len.saturating_sub(exec_len + SEPARATOR.len() + ELLIPSIS.len());
        if room > 0 {
            let prefix: String = self.context.chars().take(room).collect();
            return format!("{}{ELLIPSIS}{SEPARATOR}{}", prefix.trim_end(), self.executable);
        }

        if exec_len <= max_len {
            return self.executable.clone();
        }
        let cut: String = self
            .executable
            .chars()
            .take(max_len.saturating_sub(ELLIPSIS.len()))
            .collect();
        format!("{cut}{ELLIPSIS}")
    }
}

/// One entry of the naming rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRule {
    /// `/Applications/<App>.app/Contents/<Sub>/.../<Exec>`
    AppBundle,
    /// Anything under `/opt/homebrew/`, Cellar and version segments collapsed.
    Homebrew,
    /// Well-known system directories mapped to a fixed short context.
    SystemPath {
        prefixes: &'static [&'static str],
        context: &'static str,
    },
    /// A bare command resolved through `$PATH`.
    NoPath,
    /// `<parent dir> / <exec>` for everything else. Always matches.
    Fallback,
}

/// The rule table, highest priority first.
pub const RULES: &[PathRule] = &[
    PathRule::AppBundle,
    PathRule::Homebrew,
    PathRule::SystemPath {
        prefixes: &["/usr/bin/", "/usr/sbin/"],
        context: "usr",
    },
    PathRule::SystemPath {
        prefixes: &["/usr/local/bin/"],
        context: "local",
    },
    PathRule::SystemPath {
        prefixes: &["/bin/", "/sbin/"],
        context: "bin",
    },
    PathRule::NoPath,
    PathRule::Fallback,
];

impl PathRule {
    /// Returns the label this rule produces, or `None` if it does not apply.
    pub fn apply(&self, command: &str) -> Option<DisplayName> {
        let token = first_token(command);
        match *self {
            PathRule::AppBundle => app_bundle(command),
            PathRule::Homebrew => token
                .strip_prefix("/opt/homebrew/")
                .map(|_| DisplayName::new("homebrew", last_segment(token))),
            PathRule::SystemPath { prefixes, context } => prefixes
                .iter()
                .any(|prefix| token.starts_with(prefix))
                .then(|| DisplayName::new(context, last_segment(token))),
            PathRule::NoPath => {
                (!token.is_empty() && !token.contains('/')).then(|| DisplayName::new("(no path)", token))
            }
            PathRule::Fallback => Some(fallback(token)),
        }
    }
}

/// Produce the display label for a raw command line.
pub fn format_name(command: &str) -> String {
    resolve(command).render(MAX_LABEL_LEN)
}

/// Run the rule table without rendering.
pub fn resolve(command: &str) -> DisplayName {
    let command = command.trim();
    RULES
        .iter()
        .find_map(|rule| rule.apply(command))
        .unwrap_or_else(|| fallback(first_token(command)))
}

fn app_bundle(command: &str) -> Option<DisplayName> {
    let rest = strip_arguments(command).strip_prefix("/Applications/")?;
    let (app, inner) = rest.split_once(".app/Contents/")?;
    if app.is_empty() || app.contains('/') {
        return None;
    }
    let (sub, tail) = inner.split_once('/')?;
    let exec = last_segment(tail);
    if sub.is_empty() || exec.is_empty() {
        return None;
    }

    let name = match sub {
        "MacOS" if exec == app => DisplayName::new("Applications", format!("{app}.app")),
        "MacOS" => DisplayName::new(format!("Applications / {app}"), exec),
        _ => DisplayName::new(format!("Applications / {app}.app"), exec),
    };
    Some(name)
}

fn fallback(token: &str) -> DisplayName {
    match token.rsplit_once('/') {
        Some(("", exec)) => DisplayName::new("/", exec),
        Some((dir, exec)) => DisplayName::new(last_segment(dir), exec),
        None => DisplayName::new("", token),
    }
}

/// Bundle paths may contain spaces, so the executable path runs up to the
/// first argument that looks like an option or another absolute path.
///
/// A plain argument such as `notes.txt` cannot be told apart from a space in
/// the executable name here. Callers that know `argv[0]` should format that
/// instead (see `ProcessInfo::name_source`).
fn strip_arguments(command: &str) -> &str {
    let bytes = command.as_bytes();
    let cut = bytes
        .windows(2)
        .position(|w| w[0].is_ascii_whitespace() && (w[1] == b'-' || w[1] == b'/'));
    match cut {
        Some(i) => command[..i].trim_end(),
        None => command,
    }
}

fn first_token(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
