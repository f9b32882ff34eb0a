//! Fixture catalog: the closed set of files and directories a test may
//! reference.
//!
//! Tests name fixtures through [`FixtureKey`], so a reference to a file that
//! the harness does not create is a compile error rather than a runtime
//! "file not found". The catalog is pure data; nothing here touches disk.
//!
//! # Example
//!
//! ```
//! use nvim_harness::fixtures::FixtureKey;
//!
//! let entry = FixtureKey::RoutesPostIdAdjacentFile.entry();
//! assert_eq!(entry.name, "adjacent-file.tsx");
//! assert_eq!(entry.stem, "adjacent-file");
//! assert_eq!(entry.extension, ".tsx");
//! ```

mod contents;

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use contents::READY_SENTINEL;

/// Identity of one fixture item.
///
/// Catalog entries borrow static strings; decoded entries own theirs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name including extension, e.g. `file.txt`.
    pub name: Cow<'static, str>,
    /// File name without extension, e.g. `file`.
    pub stem: Cow<'static, str>,
    /// Extension including the leading dot, e.g. `.txt`. Empty for directories.
    pub extension: Cow<'static, str>,
}

/// Whether a fixture is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    File,
    Directory,
}

/// Key of a fixture, relative to the test directory root.
///
/// Ordering follows the catalog: a directory sorts before everything inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FixtureKey {
    /// `initial-file.txt`, opened at startup; its text is the readiness sentinel.
    InitialFile,
    /// `test.lua`
    TestLua,
    /// `file.txt`
    File,
    /// `subdirectory/`
    Subdirectory,
    /// `subdirectory/sub.txt`
    SubdirectorySub,
    /// `routes/`
    Routes,
    /// `routes/posts.$postId/`
    RoutesPostId,
    /// `routes/posts.$postId/route.tsx`
    RoutesPostIdRoute,
    /// `routes/posts.$postId/adjacent-file.tsx`
    RoutesPostIdAdjacentFile,
}

struct CatalogRow {
    key: FixtureKey,
    path: &'static str,
    entry: FileEntry,
    parent: Option<FixtureKey>,
    contents: Option<&'static str>,
}

const fn file(
    key: FixtureKey,
    path: &'static str,
    name: &'static str,
    stem: &'static str,
    extension: &'static str,
    parent: Option<FixtureKey>,
    contents: &'static str,
) -> CatalogRow {
    CatalogRow {
        key,
        path,
        entry: FileEntry {
            name: Cow::Borrowed(name),
            stem: Cow::Borrowed(stem),
            extension: Cow::Borrowed(extension),
        },
        parent,
        contents: Some(contents),
    }
}

const fn directory(
    key: FixtureKey,
    path: &'static str,
    name: &'static str,
    parent: Option<FixtureKey>,
) -> CatalogRow {
    CatalogRow {
        key,
        path,
        entry: FileEntry {
            name: Cow::Borrowed(name),
            stem: Cow::Borrowed(name),
            extension: Cow::Borrowed(""),
        },
        parent,
        contents: None,
    }
}

// Row order matches `FixtureKey::ALL`.
static CATALOG: [CatalogRow; 9] = [
    file(
        FixtureKey::InitialFile,
        "initial-file.txt",
        "initial-file.txt",
        "initial-file",
        ".txt",
        None,
        contents::INITIAL_FILE,
    ),
    file(
        FixtureKey::TestLua,
        "test.lua",
        "test.lua",
        "test",
        ".lua",
        None,
        contents::TEST_LUA,
    ),
    file(
        FixtureKey::File,
        "file.txt",
        "file.txt",
        "file",
        ".txt",
        None,
        contents::FILE_TXT,
    ),
    directory(FixtureKey::Subdirectory, "subdirectory", "subdirectory", None),
    file(
        FixtureKey::SubdirectorySub,
        "subdirectory/sub.txt",
        "sub.txt",
        "sub",
        ".txt",
        Some(FixtureKey::Subdirectory),
        contents::SUB_TXT,
    ),
    directory(FixtureKey::Routes, "routes", "routes", None),
    directory(
        FixtureKey::RoutesPostId,
        "routes/posts.$postId",
        "posts.$postId",
        Some(FixtureKey::Routes),
    ),
    file(
        FixtureKey::RoutesPostIdRoute,
        "routes/posts.$postId/route.tsx",
        "route.tsx",
        "route",
        ".tsx",
        Some(FixtureKey::RoutesPostId),
        contents::ROUTE_TSX,
    ),
    file(
        FixtureKey::RoutesPostIdAdjacentFile,
        "routes/posts.$postId/adjacent-file.tsx",
        "adjacent-file.tsx",
        "adjacent-file",
        ".tsx",
        Some(FixtureKey::RoutesPostId),
        contents::ADJACENT_FILE_TSX,
    ),
];

impl FixtureKey {
    /// Every key in catalog order.
    pub const ALL: [FixtureKey; 9] = [
        FixtureKey::InitialFile,
        FixtureKey::TestLua,
        FixtureKey::File,
        FixtureKey::Subdirectory,
        FixtureKey::SubdirectorySub,
        FixtureKey::Routes,
        FixtureKey::RoutesPostId,
        FixtureKey::RoutesPostIdRoute,
        FixtureKey::RoutesPostIdAdjacentFile,
    ];

    fn row(self) -> &'static CatalogRow {
        match self {
            FixtureKey::InitialFile => &CATALOG[0],
            FixtureKey::TestLua => &CATALOG[1],
            FixtureKey::File => &CATALOG[2],
            FixtureKey::Subdirectory => &CATALOG[3],
            FixtureKey::SubdirectorySub => &CATALOG[4],
            FixtureKey::Routes => &CATALOG[5],
            FixtureKey::RoutesPostId => &CATALOG[6],
            FixtureKey::RoutesPostIdRoute => &CATALOG[7],
            FixtureKey::RoutesPostIdAdjacentFile => &CATALOG[8],
        }
    }

    /// Key string, e.g. `subdirectory/sub.txt`.
    pub fn as_str(self) -> &'static str {
        self.row().path
    }

    /// Path relative to the test directory root.
    pub fn relative_path(self) -> &'static Path {
        Path::new(self.row().path)
    }

    pub fn entry(self) -> FileEntry {
        self.row().entry.clone()
    }

    pub fn kind(self) -> FixtureKind {
        if self.row().contents.is_some() {
            FixtureKind::File
        } else {
            FixtureKind::Directory
        }
    }

    /// File contents, `None` for directories.
    pub fn contents(self) -> Option<&'static str> {
        self.row().contents
    }

    /// Enclosing directory fixture, `None` at the root.
    pub fn parent(self) -> Option<FixtureKey> {
        self.row().parent
    }

    /// This key and every enclosing directory, outermost first.
    pub fn with_ancestors(self) -> Vec<FixtureKey> {
        let mut chain = vec![self];
        let mut current = self.parent();
        while let Some(parent) = current {
            chain.push(parent);
            current = parent.parent();
        }
        chain.reverse();
        chain
    }
}

/// Total lookup over the closed key set.
pub fn entry_for(key: FixtureKey) -> FileEntry {
    key.entry()
}

impl fmt::Display for FixtureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixtureKey {
    type Err = HarnessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FixtureKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| HarnessError::unknown_fixture_key(value))
    }
}

impl TryFrom<String> for FixtureKey {
    type Error = HarnessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FixtureKey> for String {
    fn from(key: FixtureKey) -> Self {
        key.as_str().to_string()
    }
}
