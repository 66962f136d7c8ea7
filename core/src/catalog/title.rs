//! Display titles derived from file and directory names.

use std::ffi::OsStr;
use std::path::Path;

use crate::types::ContainerKind;

/// Derive a book title from a unit path: archives lose their extension,
/// directories keep their full name.
pub fn title_for_unit(path: &Path, kind: ContainerKind) -> String {
    let stem = match kind {
        ContainerKind::Directory => path.file_name(),
        _ => path.file_stem(),
    };
    derive_title(stem.and_then(OsStr::to_str).unwrap_or(""))
}

/// Clean a raw name into a display title: bracketed/parenthesized/braced
/// groups removed, `_`/`-`/whitespace runs collapsed to single spaces,
/// trimmed. An empty result falls back to the trimmed raw name, or
/// `"Untitled"` when nothing is left at all.
pub fn derive_title(stem: &str) -> String {
    let cleaned = collapse_separators(&strip_groups(stem));
    if !cleaned.is_empty() {
        return cleaned;
    }

    let raw = stem.trim();
    if raw.is_empty() { "Untitled".to_string() } else { raw.to_string() }
}

fn strip_groups(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut square = 0u32;
    let mut paren = 0u32;
    let mut brace = 0u32;

    for ch in input.chars() {
        match ch {
            '[' => square += 1,
            ']' => square = square.saturating_sub(1),
            '(' => paren += 1,
            ')' => paren = paren.saturating_sub(1),
            '{' => brace += 1,
            '}' => brace = brace.saturating_sub(1),
            _ if square == 0 && paren == 0 && brace == 0 => out.push(ch),
            _ => {}
        }
    }

    out
}

fn collapse_separators(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for ch in input.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }

    out
}
