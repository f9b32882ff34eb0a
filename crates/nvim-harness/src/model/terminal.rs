use crate::model::SnapshotId;
use serde::{Deserialize, Serialize};

/// Terminal dimensions in rows and columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

/// Cursor position and visibility. Coordinates are 0-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
    pub visible: bool,
}

/// Rendered terminal content at a point in time.
///
/// `sequence` counts the output chunks fed through the emulator before the
/// snapshot was taken, so a later snapshot of the same session never has a
/// smaller sequence than an earlier one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    pub snapshot_id: SnapshotId,
    pub sequence: u64,
    pub rows: u16,
    pub cols: u16,
    pub cursor: Cursor,
    pub alternate_screen: bool,
    /// One entry per row, trailing blanks trimmed.
    pub lines: Vec<String>,
}

impl ScreenSnapshot {
    /// Screen text with rows joined by newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether `needle` is visible on screen. Matches within a single row.
    pub fn contains(&self, needle: &str) -> bool {
        needle.is_empty() || self.lines.iter().any(|line| line.contains(needle))
    }
}
