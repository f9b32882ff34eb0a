//! Fixture: a tiny full-screen editor standing in for Neovim.
//!
//! Usage: `nvim-harness-fake-editor <file>`, run from the test directory.
//!
//! - Editor view shows the file, so the readiness sentinel appears on start.
//! - `{upArrow}` opens a file browser on the working directory. In the
//!   browser `/` starts a search (Enter jumps to the first match), arrows
//!   move and enter directories, and the hovered directory is previewed.
//! - `{ctrl+g}` in the browser opens a search-and-replace panel on the
//!   browsed directory. `i` starts typing into its search field.
//! - `Esc` goes back one view; `{ctrl+q}` quits.

// Test fixtures require special allowances - they are not production code
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]

use nix::sys::termios::{self, SetArg, Termios};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Ctrl(char),
}

#[derive(Debug)]
enum View {
    Editor,
    Browser(Browser),
    Grug(Grug),
}

#[derive(Debug)]
struct Browser {
    dir: PathBuf,
    entries: Vec<Entry>,
    cursor: usize,
    search: Option<String>,
}

#[derive(Debug)]
struct Entry {
    name: String,
    is_dir: bool,
}

#[derive(Debug)]
struct Grug {
    paths: PathBuf,
    search: String,
    inserting: bool,
}

struct App {
    file: PathBuf,
    text: String,
    typed: String,
    view: View,
    previous_browser: Option<Browser>,
}

fn main() -> io::Result<()> {
    let file = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "usage: fake-editor <file>"))?;

    let stdin = io::stdin();
    let saved = enter_raw_mode(&stdin);
    let result = run(file);
    if let Some(saved) = saved {
        let _ = termios::tcsetattr(&stdin, SetArg::TCSANOW, &saved);
    }
    result
}

/// Put stdin in raw mode so escape sequences arrive unbuffered.
fn enter_raw_mode(stdin: &io::Stdin) -> Option<Termios> {
    let saved = termios::tcgetattr(stdin).ok()?;
    let mut raw = saved.clone();
    termios::cfmakeraw(&mut raw);
    termios::tcsetattr(stdin, SetArg::TCSANOW, &raw).ok()?;
    Some(saved)
}

fn run(file: PathBuf) -> io::Result<()> {
    let text = fs::read_to_string(&file).unwrap_or_default();
    let mut app = App {
        file,
        text,
        typed: String::new(),
        view: View::Editor,
        previous_browser: None,
    };
    let mut stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut buffer = [0u8; 1024];

    render(&mut stdout, &app)?;
    loop {
        let count = stdin.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        for key in decode(&buffer[..count]) {
            if key == Key::Ctrl('q') {
                write!(stdout, "\x1b[2J\x1b[H")?;
                stdout.flush()?;
                return Ok(());
            }
            handle(&mut app, key);
        }
        render(&mut stdout, &app)?;
    }
    Ok(())
}

fn decode(bytes: &[u8]) -> Vec<Key> {
    let mut keys = Vec::new();
    let text = String::from_utf8_lossy(bytes);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let key = match c {
            '\x1b' if chars.peek() == Some(&'[') => {
                chars.next();
                match chars.next() {
                    Some('A') => Key::Up,
                    Some('B') => Key::Down,
                    Some('C') => Key::Right,
                    Some('D') => Key::Left,
                    _ => continue,
                }
            }
            '\x1b' => Key::Escape,
            '\r' | '\n' => Key::Enter,
            '\x7f' | '\x08' => Key::Backspace,
            c if u32::from(c) < 0x20 => match char::from_u32(u32::from(c) + 0x60) {
                Some(letter) => Key::Ctrl(letter),
                None => continue,
            },
            c => Key::Char(c),
        };
        keys.push(key);
    }
    keys
}

fn handle(app: &mut App, key: Key) {
    match &mut app.view {
        View::Editor => match key {
            Key::Up => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                app.view = View::Browser(Browser::open(cwd));
            }
            Key::Char(c) => app.typed.push(c),
            Key::Backspace => {
                app.typed.pop();
            }
            _ => {}
        },
        View::Browser(browser) => match key {
            Key::Escape if browser.search.is_some() => browser.search = None,
            Key::Escape => app.view = View::Editor,
            Key::Ctrl('g') => {
                let paths = browser.dir.clone();
                if let View::Browser(browser) = std::mem::replace(
                    &mut app.view,
                    View::Grug(Grug {
                        paths,
                        search: String::new(),
                        inserting: false,
                    }),
                ) {
                    app.previous_browser = Some(browser);
                }
            }
            key => browser.handle(key),
        },
        View::Grug(grug) => match key {
            Key::Escape if grug.inserting => grug.inserting = false,
            Key::Escape => {
                app.view = match app.previous_browser.take() {
                    Some(browser) => View::Browser(browser),
                    None => View::Editor,
                };
            }
            Key::Char('i') if !grug.inserting => grug.inserting = true,
            Key::Char(c) if grug.inserting => grug.search.push(c),
            Key::Backspace if grug.inserting => {
                grug.search.pop();
            }
            _ => {}
        },
    }
}

impl Browser {
    fn open(dir: PathBuf) -> Self {
        let entries = list(&dir);
        Self {
            dir,
            entries,
            cursor: 0,
            search: None,
        }
    }

    fn hovered(&self) -> Option<&Entry> {
        self.entries.get(self.cursor)
    }

    fn handle(&mut self, key: Key) {
        if let Some(search) = &mut self.search {
            match key {
                Key::Char(c) => search.push(c),
                Key::Backspace => {
                    search.pop();
                }
                Key::Enter => {
                    let query = search.clone();
                    if let Some(index) = self.entries.iter().position(|e| e.name.contains(&query)) {
                        self.cursor = index;
                    }
                    self.search = None;
                }
                _ => {}
            }
            return;
        }
        match key {
            Key::Char('/') => self.search = Some(String::new()),
            Key::Down | Key::Char('j') => {
                if self.cursor + 1 < self.entries.len() {
                    self.cursor += 1;
                }
            }
            Key::Up | Key::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            Key::Right | Key::Enter | Key::Char('l') => {
                if let Some(entry) = self.hovered().filter(|e| e.is_dir) {
                    let dir = self.dir.join(&entry.name);
                    *self = Browser::open(dir);
                }
            }
            Key::Left | Key::Char('h') => {
                if let Some(parent) = self.dir.parent().map(Path::to_path_buf) {
                    let name = self.dir.file_name().map(|n| n.to_string_lossy().into_owned());
                    *self = Browser::open(parent);
                    if let Some(index) = name
                        .and_then(|name| self.entries.iter().position(|e| e.name == name))
                    {
                        self.cursor = index;
                    }
                }
            }
            _ => {}
        }
    }
}

/// Directory listing, directories first, then by name.
fn list(dir: &Path) -> Vec<Entry> {
    let mut entries: Vec<Entry> = fs::read_dir(dir)
        .map(|read| {
            read.filter_map(Result::ok)
                .map(|entry| Entry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_dir: entry.file_type().map(|t| t.is_dir()).unwrap_or(false),
                })
                .collect()
        })
        .unwrap_or_default();
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    entries
}

fn render(stdout: &mut dyn Write, app: &App) -> io::Result<()> {
    let mut lines: Vec<String> = Vec::new();
    match &app.view {
        View::Editor => {
            lines.extend(app.text.lines().map(str::to_string));
            if !app.typed.is_empty() {
                lines.push(app.typed.clone());
            }
            lines.push(String::new());
            lines.push(format!("-- {} --", app.file.display()));
        }
        View::Browser(browser) => {
            lines.push(format!("browse: {}", browser.dir.display()));
            for (index, entry) in browser.entries.iter().enumerate() {
                let marker = if index == browser.cursor { ">" } else { " " };
                let suffix = if entry.is_dir { "/" } else { "" };
                lines.push(format!("{marker} {}{suffix}", entry.name));
            }
            if let Some(entry) = browser.hovered().filter(|e| e.is_dir) {
                lines.push(String::new());
                lines.push(format!("preview: {}/", entry.name));
                for child in list(&browser.dir.join(&entry.name)) {
                    let suffix = if child.is_dir { "/" } else { "" };
                    lines.push(format!("  {}{suffix}", child.name));
                }
            }
            if let Some(search) = &browser.search {
                lines.push(String::new());
                lines.push(format!("find: {search}"));
            }
        }
        View::Grug(grug) => {
            lines.push("Grug FAR - 1: Search and Replace".to_string());
            lines.push(format!("Search: {}", grug.search));
            lines.push("Replace:".to_string());
            lines.push(format!("Paths: {}", grug.paths.display()));
            if grug.inserting {
                lines.push(String::new());
                lines.push("-- INSERT --".to_string());
            }
        }
    }

    write!(stdout, "\x1b[2J\x1b[H{}", lines.join("\r\n"))?;
    stdout.flush()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_arrows_controls_and_text() {
        let keys = decode(b"\x1b[Aa\r\x07\x1b\x7f");
        assert_eq!(
            keys,
            vec![
                Key::Up,
                Key::Char('a'),
                Key::Enter,
                Key::Ctrl('g'),
                Key::Escape,
                Key::Backspace,
            ]
        );
    }

    #[test]
    fn listing_puts_directories_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir(dir.path().join("z")).unwrap();
        let names: Vec<String> = list(dir.path()).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["z".to_string(), "a.txt".to_string()]);
    }

    #[test]
    fn search_moves_the_cursor_and_right_enters() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("routes/posts")).unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        let mut browser = Browser::open(dir.path().to_path_buf());
        for key in decode(b"/routes\r\x1b[C") {
            browser.handle(key);
        }
        assert_eq!(browser.dir, dir.path().join("routes"));
        assert_eq!(browser.hovered().map(|e| e.name.as_str()), Some("posts"));
    }
}
