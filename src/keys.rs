//! Key Namespacer
//!
//! Derives the block store keys that back one logical key.
//!
//! ## Layout
//! ```text
//! size record:  escape(key) + "_" + "-1"
//! block i:      escape(key) + "_" + i
//! ```
//!
//! `escape` doubles `\` and prefixes `_` with `\`, so the first unescaped
//! `_` in a derived key is always the separator. Logical keys `"a"` and
//! `"a_0"` therefore map to `a_0` and `a\_0_0`, which can never meet.

/// Separator between the escaped logical key and the index
pub const SEPARATOR: char = '_';

/// Escape character used inside the logical key part
pub const ESCAPE: char = '\\';

/// Sentinel index reserved for the size record
pub const SIZE_INDEX: i64 = -1;

/// Key of the block-count record for `key`
pub fn size_key(key: &str) -> Vec<u8> {
    derive(key, SIZE_INDEX)
}

/// Key of block `index` for `key`
pub fn block_key(key: &str, index: u64) -> Vec<u8> {
    derive(key, index as i64)
}

/// Escape separator and escape characters in a logical key
pub fn escape(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 2);
    for c in key.chars() {
        if c == ESCAPE || c == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Split a derived key back into its logical key and index
///
/// Returns `None` for bytes no call to [`size_key`] or [`block_key`] could
/// have produced.
pub fn decode(derived: &[u8]) -> Option<(String, i64)> {
    let text = std::str::from_utf8(derived).ok()?;
    let mut key = String::with_capacity(text.len());
    let mut chars = text.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some((_, next)) if next == ESCAPE || next == SEPARATOR => key.push(next),
                _ => return None,
            },
            SEPARATOR => {
                let digits = &text[pos + SEPARATOR.len_utf8()..];
                let index: i64 = digits.parse().ok()?;
                // Reject "+1", "01" and friends: only canonical indices are derived
                if index < SIZE_INDEX || index.to_string() != digits {
                    return None;
                }
                return Some((key, index));
            }
            _ => key.push(c),
        }
    }

    None
}

fn derive(key: &str, index: i64) -> Vec<u8> {
    let mut derived = escape(key);
    derived.push(SEPARATOR);
    derived.push_str(&index.to_string());
    derived.into_bytes()
}
