use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration loaded from widthseek.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct DriverConfig {
    pub solver: SolverConfig,
    pub watchdog: WatchdogConfig,
    pub search: SearchConfig,
}

/// How to invoke the external decomposer. `{width}` and `{graph}` in
/// the argument template are substituted per attempt.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub budget_ticks: u64,
    pub tick_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_iterations: u32,
}

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The config file is not valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error: the defaults stand in, so the
    /// tool runs without any config file present.
    pub fn load(path: &Path) -> Result<DriverConfig, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(DriverConfig::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl WatchdogConfig {
    /// Tick interval as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// --- Default implementations ---

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            command: "balancedgo".to_string(),
            args: vec![
                "-width".to_string(),
                "{width}".to_string(),
                "-graph".to_string(),
                "{graph}".to_string(),
                "-det".to_string(),
            ],
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            budget_ticks: 3600,
            tick_interval_ms: 1000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_iterations: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_solver_contract() {
        let config = DriverConfig::default();
        assert_eq!(config.solver.command, "balancedgo");
        assert_eq!(config.watchdog.budget_ticks, 3600);
        assert_eq!(config.watchdog.tick_interval_ms, 1000);
        assert_eq!(config.search.max_iterations, 64);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DriverConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.solver.command, "balancedgo");
    }

    #[test]
    fn load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widthseek.toml");
        std::fs::write(
            &path,
            r#"
[solver]
command = "/opt/solvers/balanced"
args = ["-width", "{width}", "-graph", "{graph}"]

[watchdog]
budget_ticks = 120
tick_interval_ms = 500

[search]
max_iterations = 10
"#,
        )
        .unwrap();

        let config = DriverConfig::load(&path).unwrap();
        assert_eq!(config.solver.command, "/opt/solvers/balanced");
        assert_eq!(config.solver.args.len(), 4);
        assert_eq!(config.watchdog.budget_ticks, 120);
        assert_eq!(config.watchdog.tick_interval_ms, 500);
        assert_eq!(config.search.max_iterations, 10);
    }

    #[test]
    fn load_partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widthseek.toml");
        std::fs::write(&path, "[watchdog]\nbudget_ticks = 60\n").unwrap();

        let config = DriverConfig::load(&path).unwrap();
        assert_eq!(config.watchdog.budget_ticks, 60);
        assert_eq!(config.watchdog.tick_interval_ms, 1000);
        assert_eq!(config.solver.command, "balancedgo");
    }

    #[test]
    fn load_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widthseek.toml");
        std::fs::write(&path, "[solver\ncommand=").unwrap();

        let err = DriverConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn tick_interval_converts_to_duration() {
        let watchdog = WatchdogConfig {
            budget_ticks: 1,
            tick_interval_ms: 250,
        };
        assert_eq!(watchdog.tick_interval(), Duration::from_millis(250));
    }
}
