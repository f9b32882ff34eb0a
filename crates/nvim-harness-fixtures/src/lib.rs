//! Test utilities for nvim-harness integration tests.
//!
//! - [`ConfigBuilder`] - Fluent API for a [`HarnessConfig`] that runs the fake editor
//! - [`test_environment`] - A scratch test environment directory
//! - [`fixture_path`] - Locate a fixture binary built alongside the tests
//!
//! The `nvim-harness-fake-editor` binary in this crate stands in for Neovim:
//! it shows the opened file, has a small file browser on `{upArrow}` and a
//! search-and-replace panel on `{ctrl+g}`, so end-to-end flows can run on
//! machines without Neovim installed.
//!
//! # Example
//!
//! ```ignore
//! use nvim_harness_fixtures::{fixture_path, test_environment, ConfigBuilder, FAKE_EDITOR};
//!
//! let env = test_environment("scenario");
//! let config = ConfigBuilder::new(env.path())
//!     .with_editor(fixture_path(FAKE_EDITOR))
//!     .with_cols(200)
//!     .build();
//! ```

// Test fixtures crate - relaxed lints for test utilities
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use nvim_harness::config::HarnessConfig;
use std::path::{Path, PathBuf};

/// Binary name of the fake editor.
pub const FAKE_EDITOR: &str = "nvim-harness-fake-editor";

/// Create a scratch test environment directory, removed on drop.
///
/// # Example
///
/// ```ignore
/// let env = test_environment("resize");
/// // env.path() is something like /tmp/nvim-harness-resize-XXXXXX
/// ```
#[must_use]
pub fn test_environment(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(&format!("nvim-harness-{prefix}-"))
        .tempdir()
        .expect("failed to create test environment directory")
}

/// Path of a binary from this workspace's target directory.
///
/// Integration tests run from `target/<profile>/deps`; binaries live one
/// level up.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    let exe = std::env::current_exe().expect("current test executable");
    let deps = exe.parent().expect("test executable directory");
    let profile = if deps.ends_with("deps") {
        deps.parent().expect("target profile directory")
    } else {
        deps
    };
    let path = profile.join(name);
    assert!(
        path.exists(),
        "Fixture binary not found: {}. Run 'cargo build --workspace' first.",
        path.display()
    );
    path
}

/// Fluent builder for [`HarnessConfig`] values used in tests.
///
/// Defaults to a short readiness timeout, a short termination grace and a
/// wide terminal so long paths are not wrapped.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: HarnessConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new(test_environment_dir: &Path) -> Self {
        let mut config = HarnessConfig {
            test_environment_dir: test_environment_dir.to_path_buf(),
            ..HarnessConfig::default()
        };
        config.readiness.timeout_ms = 10_000;
        config.session.termination_grace_ms = 200;
        config.terminal.cols = 200;
        Self { config }
    }

    /// Editor command; clears any arguments set earlier.
    #[must_use]
    pub fn with_editor(mut self, command: impl AsRef<Path>) -> Self {
        self.config.editor.command = command.as_ref().display().to_string();
        self.config.editor.args.clear();
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.config.editor.args = args;
        self
    }

    #[must_use]
    pub fn with_cols(mut self, cols: u16) -> Self {
        self.config.terminal.cols = cols;
        self
    }

    #[must_use]
    pub fn with_readiness_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.readiness.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_cleanup_on_terminate(mut self, cleanup: bool) -> Self {
        self.config.session.cleanup_on_terminate = cleanup;
        self
    }

    #[must_use]
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}
