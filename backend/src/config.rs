//! Configuration loaded from TOML.

use crate::filter::ProcessFilter;
use crate::rank::RankWeights;
use crate::types::ProcError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ranking: RankWeights,
    pub termination: TerminationSettings,
    pub filter: FilterSettings,
}

/// Timeouts for the graceful and forced phases of a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationSettings {
    pub graceful_timeout_ms: u64,
    pub forced_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TerminationSettings {
    fn default() -> Self {
        Self {
            graceful_timeout_ms: 2000,
            forced_timeout_ms: 1000,
            poll_interval_ms: 100,
        }
    }
}

impl TerminationSettings {
    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_millis(self.graceful_timeout_ms)
    }

    pub fn forced_timeout(&self) -> Duration {
        Duration::from_millis(self.forced_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub hide_system: bool,
    pub excludes: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            hide_system: true,
            excludes: Vec::new(),
        }
    }
}

impl Config {
    /// `<config dir>/psk/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("psk").join("config.toml"))
    }

    /// Load from an explicit path, or from the default path if it exists.
    ///
    /// A missing default file yields the built-in defaults; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ProcError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ProcError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProcError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ProcError::Config(format!("invalid {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProcError> {
        let weights = &self.ranking;
        let valid_weight = |w: f64| w.is_finite() && w >= 0.0;
        if !valid_weight(weights.cpu_weight) || !valid_weight(weights.memory_weight) {
            return Err(ProcError::Config(
                "ranking weights must be finite and non-negative".to_string(),
            ));
        }
        if self.termination.poll_interval_ms == 0 {
            return Err(ProcError::Config(
                "termination.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Process filter for this run, seeded from the configured settings.
    pub fn process_filter(&self) -> ProcessFilter {
        ProcessFilter::for_current_process(self.filter.hide_system)
            .with_excludes(self.filter.excludes.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.ranking, RankWeights::default());
        assert_eq!(config.termination.graceful_timeout(), Duration::from_secs(2));
        assert_eq!(config.termination.forced_timeout(), Duration::from_secs(1));
        assert_eq!(config.termination.poll_interval(), Duration::from_millis(100));
        assert!(config.filter.hide_system);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let file = write_config(
            r#"
            [ranking]
            cpu_weight = 2.5

            [filter]
            excludes = ["Cursor", "Google Chrome"]
            "#,
        );
        let config = Config::load(Some(file.path())).expect("valid config");
        assert_eq!(config.ranking.cpu_weight, 2.5);
        assert_eq!(config.ranking.memory_weight, 1.0);
        assert_eq!(config.termination, TerminationSettings::default());
        assert!(config.filter.hide_system);

        let filter = config.process_filter();
        assert_eq!(filter.excludes, vec!["Cursor".to_string(), "Google Chrome".to_string()]);
        assert_eq!(filter.own_pid, Some(std::process::id() as i32));
    }

    #[test]
    fn rejects_invalid_values() {
        let file = write_config("[ranking]\nmemory_weight = -1.0\n");
        assert!(matches!(Config::load(Some(file.path())), Err(ProcError::Config(_))));

        let file = write_config("[termination]\npoll_interval_ms = 0\n");
        assert!(matches!(Config::load(Some(file.path())), Err(ProcError::Config(_))));

        let file = write_config("not toml at all [");
        assert!(matches!(Config::load(Some(file.path())), Err(ProcError::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(ProcError::Config(_))));
    }
}
