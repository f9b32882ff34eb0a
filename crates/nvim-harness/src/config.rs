//! Harness configuration.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! configuration that launches `nvim`. Files ending in `.yaml`/`.yml` are read
//! as YAML, anything else as JSON.

use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::READY_SENTINEL;
use crate::model::TerminalSize;
use portable_pty::CommandBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest accepted terminal dimension.
pub const MIN_TERMINAL_DIMENSION: u16 = 1;
/// Largest accepted terminal dimension.
pub const MAX_TERMINAL_DIMENSION: u16 = 500;

/// Environment variables the harness always sets and a config may not override.
const RESERVED_ENV_VARS: &[&str] = &["XDG_CONFIG_HOME"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Scratch root; provisioned directories live under its `testdirs/`.
    pub test_environment_dir: PathBuf,
    pub editor: EditorConfig,
    pub terminal: TerminalSize,
    pub readiness: ReadinessConfig,
    pub session: SessionConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_environment_dir: std::env::temp_dir().join("nvim-harness"),
            editor: EditorConfig::default(),
            terminal: TerminalSize::default(),
            readiness: ReadinessConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// How the editor process is started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub command: String,
    /// Arguments placed before the file to open.
    pub args: Vec<String>,
    pub env: EnvConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: "nvim".to_string(),
            args: Vec::new(),
            env: EnvConfig::default(),
        }
    }
}

/// Environment passed to the editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Inherit variables from the harness process.
    pub inherit: bool,
    /// When inheriting, only these names pass through. Empty passes everything.
    pub allowlist: Vec<String>,
    /// Explicit values, applied after inheritance.
    pub set: BTreeMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        let mut set = BTreeMap::new();
        set.insert("TERM".to_string(), "xterm-256color".to_string());
        Self {
            inherit: true,
            allowlist: Vec::new(),
            set,
        }
    }
}

impl EnvConfig {
    /// Apply this environment to a PTY command.
    pub fn apply(&self, cmd: &mut CommandBuilder) {
        cmd.env_clear();
        if self.inherit {
            if self.allowlist.is_empty() {
                for (key, value) in std::env::vars_os() {
                    cmd.env(key, value);
                }
            } else {
                for key in &self.allowlist {
                    if let Some(value) = std::env::var_os(key) {
                        cmd.env(key, value);
                    }
                }
            }
        }
        for (key, value) in &self.set {
            cmd.env(key, value);
        }
    }
}

/// Readiness check settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Text whose appearance on screen marks the editor as ready.
    pub sentinel: String,
    /// Single bounded wait; expiry fails the launch.
    pub timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            sentinel: READY_SENTINEL.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time between SIGTERM and SIGKILL when terminating the editor.
    pub termination_grace_ms: u64,
    /// Delete the provisioned directory when its session terminates.
    pub cleanup_on_terminate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            termination_grace_ms: 500,
            cleanup_on_terminate: false,
        }
    }
}

impl SessionConfig {
    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }
}

impl HarnessConfig {
    /// Reject configurations the harness cannot run with.
    pub fn validate(&self) -> HarnessResult<()> {
        if !self.test_environment_dir.is_absolute() {
            return Err(HarnessError::config(
                "test_environment_dir must be an absolute path",
                serde_json::json!({ "received": self.test_environment_dir.display().to_string() }),
            ));
        }
        if self.editor.command.trim().is_empty() {
            return Err(HarnessError::config("editor.command must not be empty", None));
        }
        if self.readiness.sentinel.is_empty() {
            return Err(HarnessError::config(
                "readiness.sentinel must not be empty",
                None,
            ));
        }
        if self.readiness.timeout_ms == 0 {
            return Err(HarnessError::config(
                "readiness.timeout_ms must be greater than zero",
                None,
            ));
        }
        let range = MIN_TERMINAL_DIMENSION..=MAX_TERMINAL_DIMENSION;
        if !range.contains(&self.terminal.rows) || !range.contains(&self.terminal.cols) {
            return Err(HarnessError::config(
                format!(
                    "terminal size must be between {MIN_TERMINAL_DIMENSION} and {MAX_TERMINAL_DIMENSION} in both dimensions"
                ),
                serde_json::json!({ "rows": self.terminal.rows, "cols": self.terminal.cols }),
            ));
        }
        for key in self.editor.env.set.keys() {
            if RESERVED_ENV_VARS
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(key))
            {
                return Err(HarnessError::config(
                    format!("editor.env.set may not override {key}"),
                    serde_json::json!({ "reserved": RESERVED_ENV_VARS }),
                ));
            }
        }
        Ok(())
    }
}

/// Load and validate a configuration file.
pub fn load_config_file(path: &Path) -> HarnessResult<HarnessConfig> {
    let data = fs::read_to_string(path).map_err(|err| {
        HarnessError::config(
            "failed to read config file",
            serde_json::json!({ "path": path.display().to_string(), "source": err.to_string() }),
        )
    })?;
    let config = parse_config(path, &data)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path, data: &str) -> HarnessResult<HarnessConfig> {
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let parsed = if is_yaml {
        serde_yml::from_str(data).map_err(|err| err.to_string())
    } else {
        serde_json::from_str(data).map_err(|err| err.to_string())
    };
    parsed.map_err(|err| {
        HarnessError::config(
            "failed to parse config file",
            serde_json::json!({ "path": path.display().to_string(), "source": err }),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_config_is_valid() {
        HarnessConfig::default().validate().unwrap();
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let yaml = "editor:\n  command: /usr/local/bin/nvim\nreadiness:\n  timeout_ms: 2500\n";
        let config = parse_config(Path::new("harness.yaml"), yaml).unwrap();
        assert_eq!(config.editor.command, "/usr/local/bin/nvim");
        assert_eq!(config.readiness.timeout(), Duration::from_millis(2500));
        assert_eq!(config.readiness.sentinel, READY_SENTINEL);
        assert_eq!(config.terminal, TerminalSize::default());
    }

    #[test]
    fn json_is_used_for_other_extensions() {
        let json = r#"{ "terminal": { "rows": 40, "cols": 120 } }"#;
        let config = parse_config(Path::new("harness.json"), json).unwrap();
        assert_eq!(config.terminal, TerminalSize { rows: 40, cols: 120 });
    }

    #[test]
    fn zero_readiness_timeout_is_rejected() {
        let mut config = HarnessConfig::default();
        config.readiness.timeout_ms = 0;
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::Config);
    }

    #[test]
    fn relative_environment_dir_is_rejected() {
        let config = HarnessConfig {
            test_environment_dir: PathBuf::from("relative/dir"),
            ..HarnessConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::Config);
    }

    #[test]
    fn oversized_terminal_is_rejected() {
        let mut config = HarnessConfig::default();
        config.terminal.cols = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reserved_env_vars_are_rejected() {
        let mut config = HarnessConfig::default();
        config
            .editor
            .env
            .set
            .insert("xdg_config_home".to_string(), "/tmp".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = load_config_file(Path::new("/nonexistent/harness.yaml")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
    }
}
