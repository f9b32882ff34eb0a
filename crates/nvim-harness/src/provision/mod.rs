//! Directory provisioner.
//!
//! Each call to [`Provisioner::provision`] allocates a fresh directory under
//! `<test environment>/testdirs/`, named by a random UUID and created with
//! `create_dir` so an existing path fails instead of being reused. The
//! requested fixtures and the editor's startup configuration are written into
//! it, and the returned [`TestDirectory`] lists exactly the fixtures found on
//! disk afterwards.
//!
//! # Example
//!
//! ```no_run
//! use nvim_harness::model::FileSelection;
//! use nvim_harness::provision::Provisioner;
//!
//! # fn example() -> nvim_harness::HarnessResult<()> {
//! let provisioner = Provisioner::new("/tmp/nvim-harness");
//! let dir = provisioner.provision(FileSelection::All)?;
//! assert!(dir.root_path.starts_with("/tmp/nvim-harness/testdirs"));
//! # Ok(())
//! # }
//! ```

mod startup;

pub use startup::STARTUP_SCRIPT;

use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::{FixtureKey, FixtureKind};
use crate::model::{DirectoryId, FileSelection, StartupScriptModification, TestDirectory};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the directory under the test environment holding provisioned roots.
pub const TEST_DIRS: &str = "testdirs";

/// Directory inside a root used as `XDG_CONFIG_HOME` for the editor.
pub fn config_home(root: &Path) -> PathBuf {
    root.join(".config")
}

/// Path of the startup script inside a root.
pub fn startup_script_path(root: &Path) -> PathBuf {
    config_home(root).join("nvim").join("init.lua")
}

/// Materializes fixture directories and tracks the roots it handed out.
///
/// The registry keeps its own copy of every issued [`TestDirectory`], keyed
/// by root. Callers only name a root; the recorded contents are what the
/// harness trusts.
#[derive(Debug)]
pub struct Provisioner {
    test_environment_dir: PathBuf,
    issued: Mutex<HashMap<PathBuf, TestDirectory>>,
}

impl Provisioner {
    /// Provisioner rooted at `test_environment_dir`. Nothing is created until
    /// the first [`Provisioner::provision`].
    pub fn new(test_environment_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_environment_dir: test_environment_dir.into(),
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Directory that holds `testdirs/`.
    pub fn test_environment_dir(&self) -> &Path {
        &self.test_environment_dir
    }

    /// Create a unique root and populate it with `selection`.
    pub fn provision(&self, selection: FileSelection) -> HarnessResult<TestDirectory> {
        let testdirs = self.test_environment_dir.join(TEST_DIRS);
        fs::create_dir_all(&testdirs).map_err(|err| {
            HarnessError::provision("failed to create testdirs directory", &testdirs, err)
        })?;

        let relative = Path::new(TEST_DIRS).join(DirectoryId::new().to_string());
        let root = self.test_environment_dir.join(&relative);
        fs::create_dir(&root)
            .map_err(|err| HarnessError::provision("failed to allocate test directory", &root, err))?;

        let keys = selection.keys();
        for key in &keys {
            write_fixture(&root, *key)?;
        }
        write_startup_script(&root)?;

        let contents = collect_contents(&root, &keys)?;
        let directory = TestDirectory {
            root_path: root,
            root_path_relative_to_test_environment_dir: relative,
            contents,
        };

        let mut issued = self.registry()?;
        // Roots deleted behind our back are no longer startable.
        issued.retain(|root, _| root.exists());
        issued.insert(directory.root_path.clone(), directory.clone());
        drop(issued);

        tracing::info!(
            root = %directory.root_path.display(),
            selection = %selection,
            fixtures = directory.contents.len(),
            "provisioned test directory"
        );
        Ok(directory)
    }

    /// Apply startup script modifications, in order, to a provisioned root.
    pub fn apply_modifications(
        &self,
        directory: &TestDirectory,
        modifications: &[StartupScriptModification],
    ) -> HarnessResult<()> {
        self.verify_issued(&directory.root_path)?;
        if modifications.is_empty() {
            return Ok(());
        }
        let path = startup_script_path(&directory.root_path);
        let mut script = fs::read_to_string(&path)
            .map_err(|err| HarnessError::provision("failed to read startup script", &path, err))?;
        for modification in modifications {
            script = startup::rewrite(&script, *modification)?;
            tracing::debug!(
                root = %directory.root_path.display(),
                modification = %modification,
                "applied startup script modification"
            );
        }
        fs::write(&path, script)
            .map_err(|err| HarnessError::provision("failed to write startup script", &path, err))
    }

    /// The directory this provisioner recorded for `root`.
    ///
    /// # Errors
    /// `ProvisionFailed` if `root` was not produced by this provisioner or has
    /// since been removed.
    pub fn verify_issued(&self, root: &Path) -> HarnessResult<TestDirectory> {
        self.registry()?.get(root).cloned().ok_or_else(|| {
            HarnessError::new(
                crate::error::ErrorKind::ProvisionFailed,
                "directory was not provisioned by this harness",
                serde_json::json!({ "path": root.display().to_string() }),
            )
        })
    }

    /// Delete a provisioned root. Removing an already removed root is a no-op.
    pub fn remove(&self, directory: &TestDirectory) -> HarnessResult<()> {
        let was_issued = self.registry()?.remove(&directory.root_path).is_some();
        if !was_issued {
            return Ok(());
        }
        fs::remove_dir_all(&directory.root_path).map_err(|err| {
            HarnessError::provision(
                "failed to remove test directory",
                &directory.root_path,
                err,
            )
        })?;
        tracing::debug!(root = %directory.root_path.display(), "removed test directory");
        Ok(())
    }

    fn registry(&self) -> HarnessResult<std::sync::MutexGuard<'_, HashMap<PathBuf, TestDirectory>>> {
        self.issued
            .lock()
            .map_err(|_| HarnessError::internal("provisioner registry lock poisoned"))
    }
}

fn write_fixture(root: &Path, key: FixtureKey) -> HarnessResult<()> {
    let path = root.join(key.relative_path());
    match (key.kind(), key.contents()) {
        (FixtureKind::File, Some(contents)) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|err| {
                    HarnessError::provision("failed to create fixture directory", parent, err)
                })?;
            }
            fs::write(&path, contents)
                .map_err(|err| HarnessError::provision("failed to write fixture file", &path, err))
        }
        _ => fs::create_dir_all(&path)
            .map_err(|err| HarnessError::provision("failed to create fixture directory", &path, err)),
    }
}

fn write_startup_script(root: &Path) -> HarnessResult<()> {
    let path = startup_script_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            HarnessError::provision("failed to create editor config directory", parent, err)
        })?;
    }
    fs::write(&path, STARTUP_SCRIPT)
        .map_err(|err| HarnessError::provision("failed to write startup script", &path, err))
}

/// Build `contents` from what is on disk, failing if a requested key is absent.
fn collect_contents(
    root: &Path,
    keys: &[FixtureKey],
) -> HarnessResult<BTreeMap<FixtureKey, crate::fixtures::FileEntry>> {
    let mut contents = BTreeMap::new();
    for key in keys {
        let path = root.join(key.relative_path());
        let metadata = fs::symlink_metadata(&path)
            .map_err(|err| HarnessError::provision("fixture missing after provisioning", &path, err))?;
        let matches_kind = match key.kind() {
            FixtureKind::File => metadata.is_file(),
            FixtureKind::Directory => metadata.is_dir(),
        };
        if !matches_kind {
            return Err(HarnessError::provision(
                "fixture has the wrong file type",
                &path,
                format!("expected {:?}", key.kind()),
            ));
        }
        contents.insert(*key, key.entry());
    }
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_script_lives_under_config_home() {
        let root = Path::new("/tmp/env/testdirs/abc");
        assert_eq!(
            startup_script_path(root),
            PathBuf::from("/tmp/env/testdirs/abc/.config/nvim/init.lua")
        );
        assert!(startup_script_path(root).starts_with(config_home(root)));
    }
}
