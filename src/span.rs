//! Balanced-delimiter span location
//!
//! Finds the extent of a `{...}` or `[...]` initializer whose length is not
//! known in advance. This is a scanner, not a parser: it only tracks
//! delimiter nesting, and optionally skips over string literals and comments.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How the locator treats delimiters that appear inside literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Count every delimiter, including those inside strings and comments
    Blind,
    /// Skip `'..'`, `".."`, `` `..` `` literals and `//`, `/* */` comments
    #[default]
    LiteralAware,
}

/// Inclusive byte range `[start, end]` of a balanced region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Offset the scan started from
    pub start: usize,
    /// Offset of the closing delimiter that brought depth back to zero
    pub end: usize,
}

impl Span {
    /// Exclusive end offset, for slicing
    pub fn end_exclusive(&self) -> usize {
        self.end + 1
    }
}

/// Locate the balanced region that starts at or after `start`
///
/// Scanning begins at `start`, which must sit at or before the first opening
/// `{` or `[`. The returned span runs from `start` to the delimiter that
/// closes that first opener. Nested openers must be closed by the matching
/// kind.
pub fn locate(text: &str, start: usize, mode: ScanMode) -> Result<Span> {
    scan(text, start, mode, false)
}

/// Like [`locate`], with parentheses tracked as a third delimiter kind
///
/// Used for call arguments and parameter lists, where the first opener is
/// usually `(`.
pub fn locate_group(text: &str, start: usize, mode: ScanMode) -> Result<Span> {
    scan(text, start, mode, true)
}

fn scan(text: &str, start: usize, mode: ScanMode, parens: bool) -> Result<Span> {
    let bytes = text.as_bytes();
    if start > bytes.len() {
        return Err(Error::UnbalancedDelimiter { start, depth: 0 });
    }

    let mut stack: Vec<u8> = Vec::new();
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];

        if mode == ScanMode::LiteralAware {
            match b {
                b'\'' | b'"' | b'`' => {
                    i = skip_string(bytes, i);
                    continue;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    i = skip_line_comment(bytes, i);
                    continue;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = skip_block_comment(bytes, i);
                    continue;
                }
                _ => {}
            }
        }

        match b {
            b'{' | b'[' => stack.push(b),
            b'(' if parens => stack.push(b),
            b'}' | b']' | b')' if parens || b != b')' => {
                let expected = opener_for(b);
                match stack.pop() {
                    Some(open) if open == expected => {
                        if stack.is_empty() {
                            return Ok(Span { start, end: i });
                        }
                    }
                    Some(open) => {
                        return Err(Error::MismatchedDelimiter {
                            offset: i,
                            expected: closer_for(open),
                            found: b as char,
                        });
                    }
                    // a closer before any opener would take depth negative
                    None => return Err(Error::UnbalancedDelimiter { start, depth: 0 }),
                }
            }
            _ => {}
        }
        i += 1;
    }

    Err(Error::UnbalancedDelimiter {
        start,
        depth: stack.len(),
    })
}

fn closer_for(open: u8) -> char {
    match open {
        b'{' => '}',
        b'(' => ')',
        _ => ']',
    }
}

fn opener_for(close: u8) -> u8 {
    match close {
        b'}' => b'{',
        b')' => b'(',
        _ => b'[',
    }
}

/// Returns the offset just past the closing quote.
///
/// Single and double quoted strings also end at a newline, which keeps an
/// apostrophe in free text from swallowing the rest of the file.
fn skip_string(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |pos| start + pos)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}
