//! Symbolic key tokens for terminal input.
//!
//! Input strings mix literal text with `{token}` sequences, e.g.
//! `"{upArrow}/routes{enter}"`. [`parse_keys`] splits a string into
//! [`KeyInput`]s and [`encode`] turns them into the bytes a terminal
//! application reads from its PTY.
//!
//! # Example
//!
//! ```
//! use nvim_harness::keys::{encode, parse_keys};
//!
//! let keys = parse_keys("ab{enter}{control+g}").unwrap();
//! assert_eq!(encode(&keys), b"ab\r\x07".to_vec());
//! ```

use crate::error::{HarnessError, HarnessResult};

/// Token names accepted inside `{...}`, compared case-insensitively.
pub const SUPPORTED_TOKENS: &[&str] = &[
    "upArrow",
    "downArrow",
    "leftArrow",
    "rightArrow",
    "enter",
    "esc",
    "backspace",
    "del",
    "home",
    "end",
    "pageUp",
    "pageDown",
    "tab",
    "{",
    "control+<letter>",
    "ctrl+<letter>",
    "alt+<char>",
];

/// Named keys without a printable form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Tab,
}

impl NamedKey {
    fn bytes(self) -> &'static [u8] {
        match self {
            Self::Up => b"\x1b[A",
            Self::Down => b"\x1b[B",
            Self::Right => b"\x1b[C",
            Self::Left => b"\x1b[D",
            Self::Enter => b"\r",
            Self::Escape => b"\x1b",
            Self::Backspace => b"\x7f",
            Self::Delete => b"\x1b[3~",
            Self::Home => b"\x1b[H",
            Self::End => b"\x1b[F",
            Self::PageUp => b"\x1b[5~",
            Self::PageDown => b"\x1b[6~",
            Self::Tab => b"\t",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        let key = match token.to_ascii_lowercase().as_str() {
            "uparrow" => Self::Up,
            "downarrow" => Self::Down,
            "leftarrow" => Self::Left,
            "rightarrow" => Self::Right,
            "enter" => Self::Enter,
            "esc" => Self::Escape,
            "backspace" => Self::Backspace,
            "del" => Self::Delete,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" => Self::PageUp,
            "pagedown" => Self::PageDown,
            "tab" => Self::Tab,
            _ => return None,
        };
        Some(key)
    }
}

/// One unit of terminal input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyInput {
    /// Literal text, written as UTF-8.
    Text(String),
    Named(NamedKey),
    /// `control+<letter>`, stored lowercase.
    Control(char),
    /// `alt+<char>`, sent as ESC followed by the character.
    Alt(char),
}

impl KeyInput {
    fn push_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Text(text) => out.extend_from_slice(text.as_bytes()),
            Self::Named(key) => out.extend_from_slice(key.bytes()),
            // Letters are ASCII, checked at parse time.
            #[allow(clippy::cast_possible_truncation)]
            Self::Control(letter) => out.push((*letter as u8) & 0x1f),
            Self::Alt(ch) => {
                out.push(0x1b);
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

/// Split `input` into literal text and key tokens.
///
/// # Errors
/// `UnknownKeyToken` for an unrecognized or unclosed token.
pub fn parse_keys(input: &str) -> HarnessResult<Vec<KeyInput>> {
    let mut keys = Vec::new();
    let mut text = String::new();
    let mut rest = input;

    while let Some((before, after)) = rest.split_once('{') {
        text.push_str(before);

        if let Some(stripped) = after.strip_prefix('{') {
            text.push('{');
            rest = stripped;
            continue;
        }

        let (token, remainder) = after
            .split_once('}')
            .ok_or_else(|| HarnessError::unknown_key_token(after))?;

        if !text.is_empty() {
            keys.push(KeyInput::Text(std::mem::take(&mut text)));
        }
        keys.push(parse_token(token)?);
        rest = remainder;
    }
    text.push_str(rest);
    if !text.is_empty() {
        keys.push(KeyInput::Text(text));
    }
    Ok(keys)
}

fn parse_token(token: &str) -> HarnessResult<KeyInput> {
    if let Some(key) = NamedKey::from_token(token) {
        return Ok(KeyInput::Named(key));
    }

    let Some((modifier, rest)) = token.split_once('+') else {
        return Err(HarnessError::unknown_key_token(token));
    };
    let mut chars = rest.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return Err(HarnessError::unknown_key_token(token));
    };

    match modifier.to_ascii_lowercase().as_str() {
        "control" | "ctrl" if ch.is_ascii_alphabetic() => {
            Ok(KeyInput::Control(ch.to_ascii_lowercase()))
        }
        "alt" => Ok(KeyInput::Alt(ch)),
        _ => Err(HarnessError::unknown_key_token(token)),
    }
}

/// Bytes to write to the PTY for `keys`.
pub fn encode(keys: &[KeyInput]) -> Vec<u8> {
    let mut out = Vec::new();
    for key in keys {
        key.push_bytes(&mut out);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn bytes(input: &str) -> Vec<u8> {
        encode(&parse_keys(input).unwrap())
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(bytes("hello world"), b"hello world".to_vec());
        assert_eq!(
            parse_keys("abc").unwrap(),
            vec![KeyInput::Text("abc".to_string())]
        );
    }

    #[test]
    fn empty_input_has_no_keys() {
        assert!(parse_keys("").unwrap().is_empty());
    }

    #[test]
    fn arrows_use_cursor_sequences() {
        assert_eq!(bytes("{upArrow}"), b"\x1b[A".to_vec());
        assert_eq!(bytes("{downArrow}"), b"\x1b[B".to_vec());
        assert_eq!(bytes("{rightArrow}"), b"\x1b[C".to_vec());
        assert_eq!(bytes("{leftArrow}"), b"\x1b[D".to_vec());
    }

    #[test]
    fn tokens_are_case_insensitive() {
        assert_eq!(bytes("{ENTER}"), bytes("{enter}"));
        assert_eq!(bytes("{UpArrow}"), bytes("{uparrow}"));
    }

    #[test]
    fn text_and_tokens_keep_their_order() {
        assert_eq!(
            parse_keys("/routes{enter}x").unwrap(),
            vec![
                KeyInput::Text("/routes".to_string()),
                KeyInput::Named(NamedKey::Enter),
                KeyInput::Text("x".to_string()),
            ]
        );
        assert_eq!(bytes("/routes{enter}"), b"/routes\r".to_vec());
    }

    #[test]
    fn control_chords_map_to_c0_codes() {
        assert_eq!(bytes("{control+g}"), vec![0x07]);
        assert_eq!(bytes("{ctrl+C}"), vec![0x03]);
        assert_eq!(bytes("{Control+a}"), vec![0x01]);
    }

    #[test]
    fn alt_chords_prefix_escape() {
        assert_eq!(bytes("{alt+x}"), b"\x1bx".to_vec());
    }

    #[test]
    fn double_brace_is_a_literal_brace() {
        assert_eq!(bytes("a{{b}"), b"a{b}".to_vec());
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = parse_keys("{hyperspace}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownKeyToken);
        assert_eq!(err.context.unwrap()["received"], "hyperspace");
    }

    #[test]
    fn bad_chords_are_rejected() {
        for input in ["{control+1}", "{control+ab}", "{alt+}", "{shift+a}", "{}"] {
            let err = parse_keys(input).unwrap_err();
            assert_eq!(err.kind, ErrorKind::UnknownKeyToken, "{input}");
        }
    }

    #[test]
    fn unclosed_token_is_rejected() {
        let err = parse_keys("abc{enter").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownKeyToken);
    }

    #[test]
    fn named_keys_match_common_terminal_sequences() {
        assert_eq!(bytes("{esc}"), vec![0x1b]);
        assert_eq!(bytes("{backspace}"), vec![0x7f]);
        assert_eq!(bytes("{del}"), b"\x1b[3~".to_vec());
        assert_eq!(bytes("{tab}"), vec![b'\t']);
        assert_eq!(bytes("{pageDown}"), b"\x1b[6~".to_vec());
    }
}
