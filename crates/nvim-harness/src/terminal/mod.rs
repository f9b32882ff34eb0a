//! Terminal emulation for editor output.
//!
//! [`Terminal`] feeds raw PTY bytes through `vt100` and turns the resulting
//! screen into a [`ScreenSnapshot`]. Each non-empty chunk bumps the
//! snapshot's `sequence`, which is what screen watchers compare against.
//!
//! # Example
//!
//! ```
//! use nvim_harness::model::TerminalSize;
//! use nvim_harness::terminal::Terminal;
//!
//! let mut terminal = Terminal::new(TerminalSize { rows: 24, cols: 80 });
//! terminal.process_bytes(b"Hello, \x1b[1mBold\x1b[0m World!\r\n");
//!
//! let snapshot = terminal.snapshot();
//! assert_eq!(snapshot.sequence, 1);
//! assert!(snapshot.lines[0].contains("Hello, Bold World!"));
//! ```

use crate::model::{Cursor, ScreenSnapshot, SnapshotId, TerminalSize};
use vt100::Parser;

/// vt100 emulator that counts the output chunks it has applied.
pub struct Terminal {
    parser: Parser,
    sequence: u64,
}

impl Terminal {
    /// Blank screen of `size` with no scrollback.
    pub fn new(size: TerminalSize) -> Self {
        Self {
            parser: Parser::new(size.rows, size.cols, 0),
            sequence: 0,
        }
    }

    pub fn resize(&mut self, size: TerminalSize) {
        self.parser.set_size(size.rows, size.cols);
    }

    /// Apply one chunk of output. Empty chunks do not advance the sequence.
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.parser.process(bytes);
        self.sequence += 1;
    }

    /// Number of chunks applied so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Capture the visible screen.
    pub fn snapshot(&self) -> ScreenSnapshot {
        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        let (row, col) = screen.cursor_position();
        ScreenSnapshot {
            snapshot_id: SnapshotId::new(),
            sequence: self.sequence,
            rows,
            cols,
            cursor: Cursor {
                row,
                col,
                visible: !screen.hide_cursor(),
            },
            alternate_screen: screen.alternate_screen(),
            lines: screen.rows(0, cols).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn renders_text_and_tracks_sequence() {
        let mut terminal = Terminal::new(TerminalSize { rows: 4, cols: 20 });
        assert_eq!(terminal.snapshot().sequence, 0);

        terminal.process_bytes(b"hello\r\n");
        terminal.process_bytes(b"");
        terminal.process_bytes(b"world");

        let snapshot = terminal.snapshot();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.lines.len(), 4);
        assert_eq!(snapshot.lines[0], "hello");
        assert_eq!(snapshot.lines[1], "world");
        assert_eq!((snapshot.cursor.row, snapshot.cursor.col), (1, 5));
    }

    #[test]
    fn clear_screen_replaces_contents() {
        let mut terminal = Terminal::new(TerminalSize { rows: 3, cols: 10 });
        terminal.process_bytes(b"old");
        terminal.process_bytes(b"\x1b[2J\x1b[Hnew");
        let snapshot = terminal.snapshot();
        assert!(snapshot.contains("new"));
        assert!(!snapshot.contains("old"));
    }

    #[test]
    fn alternate_screen_is_reported() {
        let mut terminal = Terminal::new(TerminalSize::default());
        terminal.process_bytes(b"\x1b[?1049h");
        assert!(terminal.snapshot().alternate_screen);
        terminal.process_bytes(b"\x1b[?1049l");
        assert!(!terminal.snapshot().alternate_screen);
    }

    #[test]
    fn resize_changes_reported_dimensions() {
        let mut terminal = Terminal::new(TerminalSize::default());
        terminal.resize(TerminalSize { rows: 10, cols: 40 });
        let snapshot = terminal.snapshot();
        assert_eq!((snapshot.rows, snapshot.cols), (10, 40));
    }
}
