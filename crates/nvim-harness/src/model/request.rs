//! Session request and response types shared by the client and the server.

use crate::error::HarnessError;
use crate::fixtures::{FileEntry, FixtureKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Wire form of [`FileSelection::All`].
pub const ALL_FIXTURES: &str = ".";

/// Which part of the catalog to provision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FileSelection {
    /// Every catalog entry (`"."`).
    #[default]
    All,
    /// One entry and its enclosing directories.
    Single(FixtureKey),
}

impl FileSelection {
    /// Keys materialized for this selection, in catalog order.
    pub fn keys(self) -> Vec<FixtureKey> {
        match self {
            Self::All => FixtureKey::ALL.to_vec(),
            Self::Single(key) => key.with_ancestors(),
        }
    }
}

impl From<FixtureKey> for FileSelection {
    fn from(key: FixtureKey) -> Self {
        Self::Single(key)
    }
}

impl FromStr for FileSelection {
    type Err = HarnessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == ALL_FIXTURES {
            Ok(Self::All)
        } else {
            value.parse().map(Self::Single)
        }
    }
}

impl TryFrom<String> for FileSelection {
    type Error = HarnessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FileSelection> for String {
    fn from(selection: FileSelection) -> Self {
        selection.to_string()
    }
}

impl fmt::Display for FileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_FIXTURES),
            Self::Single(key) => key.fmt(f),
        }
    }
}

/// Named transformation of the editor's startup configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StartupScriptModification {
    /// Switch the file manager plugin to read its events through `ya`.
    UseYaAsEventReader,
}

impl StartupScriptModification {
    pub const ALL: [StartupScriptModification; 1] = [Self::UseYaAsEventReader];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UseYaAsEventReader => "modify_yazi_config_to_use_ya_as_event_reader.lua",
        }
    }
}

impl fmt::Display for StartupScriptModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartupScriptModification {
    type Err = HarnessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|modification| modification.as_str() == value)
            .ok_or_else(|| HarnessError::unknown_modification(value))
    }
}

impl TryFrom<String> for StartupScriptModification {
    type Error = HarnessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StartupScriptModification> for String {
    fn from(modification: StartupScriptModification) -> Self {
        modification.as_str().to_string()
    }
}

/// Arguments a test sends to start the editor.
///
/// No `filename` means the whole catalog is provisioned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartNeovimArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<FileSelection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub startup_script_modifications: Vec<StartupScriptModification>,
}

impl StartNeovimArguments {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, selection: impl Into<FileSelection>) -> Self {
        self.filename = Some(selection.into());
        self
    }

    #[must_use]
    pub fn with_modification(mut self, modification: StartupScriptModification) -> Self {
        self.startup_script_modifications.push(modification);
        self
    }

    /// Effective selection, defaulting to the whole catalog.
    pub fn selection(&self) -> FileSelection {
        self.filename.unwrap_or_default()
    }
}

/// Untyped request body as received over the wire.
///
/// Converting it into [`StartNeovimArguments`] reports unknown names with
/// their specific error kinds instead of a generic decode failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartNeovimRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub startup_script_modifications: Option<Vec<String>>,
}

impl TryFrom<StartNeovimRequest> for StartNeovimArguments {
    type Error = HarnessError;

    fn try_from(request: StartNeovimRequest) -> Result<Self, Self::Error> {
        let filename = request
            .filename
            .as_deref()
            .map(str::parse::<FileSelection>)
            .transpose()?;
        let startup_script_modifications = request
            .startup_script_modifications
            .unwrap_or_default()
            .iter()
            .map(|name| name.parse::<StartupScriptModification>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            filename,
            startup_script_modifications,
        })
    }
}

impl From<&StartNeovimArguments> for StartNeovimRequest {
    fn from(arguments: &StartNeovimArguments) -> Self {
        Self {
            filename: arguments.filename.map(String::from),
            startup_script_modifications: if arguments.startup_script_modifications.is_empty() {
                None
            } else {
                Some(
                    arguments
                        .startup_script_modifications
                        .iter()
                        .map(|modification| modification.as_str().to_string())
                        .collect(),
                )
            },
        }
    }
}

/// Start arguments plus the directory the server provisioned for them.
///
/// Only the bootstrap service builds this; clients never choose `directory`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartNeovimServerArguments {
    directory: PathBuf,
    #[serde(flatten)]
    arguments: StartNeovimArguments,
}

impl StartNeovimServerArguments {
    pub(crate) fn new(directory: PathBuf, arguments: StartNeovimArguments) -> Self {
        Self {
            directory,
            arguments,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn arguments(&self) -> &StartNeovimArguments {
        &self.arguments
    }

    /// Fixture the editor opens: the selected entry, or the initial file when
    /// the whole catalog was selected.
    pub fn file_to_open(&self) -> FixtureKey {
        match self.arguments.selection() {
            FileSelection::Single(key) => key,
            FileSelection::All => FixtureKey::InitialFile,
        }
    }
}

/// Handle describing a provisioned test directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDirectory {
    /// Absolute path of the unique root.
    pub root_path: PathBuf,
    /// Root relative to the test environment directory, e.g. `testdirs/<id>`.
    pub root_path_relative_to_test_environment_dir: PathBuf,
    /// Every fixture that exists under the root.
    pub contents: BTreeMap<FixtureKey, FileEntry>,
}

impl TestDirectory {
    pub fn entry(&self, key: FixtureKey) -> Option<&FileEntry> {
        self.contents.get(&key)
    }

    pub fn contains(&self, key: FixtureKey) -> bool {
        self.contents.contains_key(&key)
    }

    /// Absolute path of a fixture under this root.
    pub fn path_of(&self, key: FixtureKey) -> PathBuf {
        self.root_path.join(key.relative_path())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn dot_selects_everything() {
        assert_eq!(".".parse::<FileSelection>().unwrap(), FileSelection::All);
        assert_eq!(FileSelection::All.keys().len(), FixtureKey::ALL.len());
    }

    #[test]
    fn single_selection_includes_ancestors() {
        let selection: FileSelection = "subdirectory/sub.txt".parse().unwrap();
        assert_eq!(
            selection.keys(),
            vec![FixtureKey::Subdirectory, FixtureKey::SubdirectorySub]
        );
    }

    #[test]
    fn request_without_filename_means_full_catalog() {
        let request: StartNeovimRequest = serde_json::from_str("{}").unwrap();
        let arguments = StartNeovimArguments::try_from(request).unwrap();
        assert_eq!(arguments.filename, None);
        assert_eq!(arguments.selection(), FileSelection::All);
        assert!(arguments.startup_script_modifications.is_empty());
    }

    #[test]
    fn request_with_unknown_filename_is_rejected() {
        let request: StartNeovimRequest =
            serde_json::from_str(r#"{"filename": "does/not/exist.txt"}"#).unwrap();
        let err = StartNeovimArguments::try_from(request).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownFixtureKey);
    }

    #[test]
    fn request_with_unknown_modification_is_rejected() {
        let request: StartNeovimRequest = serde_json::from_str(
            r#"{"filename": ".", "startupScriptModifications": ["make_it_fast.lua"]}"#,
        )
        .unwrap();
        let err = StartNeovimArguments::try_from(request).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownModification);
    }

    #[test]
    fn typed_arguments_serialize_to_wire_shape() {
        let arguments = StartNeovimArguments::new()
            .with_file(FixtureKey::File)
            .with_modification(StartupScriptModification::UseYaAsEventReader);
        let json = serde_json::to_value(&arguments).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "filename": "file.txt",
                "startupScriptModifications": [
                    "modify_yazi_config_to_use_ya_as_event_reader.lua"
                ]
            })
        );

        let request: StartNeovimRequest = serde_json::from_value(json).unwrap();
        assert_eq!(StartNeovimArguments::try_from(request).unwrap(), arguments);
    }

    #[test]
    fn server_arguments_flatten_client_fields() {
        let server = StartNeovimServerArguments::new(
            PathBuf::from("/tmp/env/testdirs/abc"),
            StartNeovimArguments::new().with_file(FileSelection::All),
        );
        let json = serde_json::to_value(&server).unwrap();
        assert_eq!(json["directory"], "/tmp/env/testdirs/abc");
        assert_eq!(json["filename"], ".");
        assert_eq!(server.file_to_open(), FixtureKey::InitialFile);
    }

    #[test]
    fn test_directory_uses_key_strings_on_the_wire() {
        let mut contents = BTreeMap::new();
        contents.insert(FixtureKey::File, FixtureKey::File.entry());
        let dir = TestDirectory {
            root_path: PathBuf::from("/tmp/env/testdirs/abc"),
            root_path_relative_to_test_environment_dir: PathBuf::from("testdirs/abc"),
            contents,
        };
        let json = serde_json::to_value(&dir).unwrap();
        assert_eq!(json["rootPath"], "/tmp/env/testdirs/abc");
        assert_eq!(json["contents"]["file.txt"]["stem"], "file");

        let back: TestDirectory = serde_json::from_value(json).unwrap();
        assert_eq!(back, dir);
    }
}
