//! Natural (alphanumeric-aware) string ordering for host names.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(value: &str) -> impl Iterator<Item = Chunk<'_>> {
    let bytes = value.as_bytes();
    let mut start = 0;
    std::iter::from_fn(move || {
        if start >= bytes.len() {
            return None;
        }
        let digits = bytes[start].is_ascii_digit();
        let end = bytes[start..]
            .iter()
            .position(|byte| byte.is_ascii_digit() != digits)
            .map_or(bytes.len(), |offset| start + offset);
        // ASCII digits never split a UTF-8 sequence, so both bounds are char boundaries.
        let slice = &value[start..end];
        start = end;
        Some(if digits {
            Chunk::Digits(slice)
        } else {
            Chunk::Text(slice)
        })
    })
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()))
}

/// Compare two strings treating embedded digit runs as numbers.
///
/// `host2` sorts before `host10`. Text runs compare ASCII case-insensitively
/// and equal-looking strings fall back to byte order, so the result is a total
/// order suitable for `sort_by`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => compare_digits(x, y),
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => compare_text(x, y),
            // Digits sort before letters, matching ASCII.
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}
