//! Separator-priority text chunker with overlap.
//!
//! Splits normalized page text into [`Passage`]s of a target character
//! size, preferring to break at natural boundaries and carrying an
//! overlap between consecutive passages from the same page.
//!
//! # Algorithm
//!
//! 1. If the remaining text fits within `chunk_size` characters, it is
//!    the final passage.
//! 2. Otherwise look at the `chunk_size`-character window at the front
//!    of the remaining text and walk the separator priority list
//!    (`"\n\n"`, `"\n"`, `"."`, `"!"`, `"?"`, `","`, `" "`). The first
//!    separator that occurs in the window wins; the cut lands just
//!    after its last occurrence, so the passage stays within the
//!    target size.
//! 3. If no separator occurs in the window, cut hard at `chunk_size`
//!    characters (snapped to a UTF-8 boundary).
//! 4. The next passage starts `overlap` characters before the cut
//!    (no overlap when the cut is shorter than the overlap itself,
//!    which guarantees forward progress).
//! 5. Passages whose trimmed length is at most `min_chunk_chars` are
//!    discarded.
//!
//! Chunking a byte-identical page with identical parameters always
//! yields an identical passage sequence.

use crate::config::ChunkingConfig;

/// Boundary separators in priority order.
pub const SEPARATORS: [&str; 7] = ["\n\n", "\n", ".", "!", "?", ",", " "];

/// A bounded passage of normalized page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    /// Zero-based page number the passage came from.
    pub page: usize,
}

/// Split one normalized page into overlapping passages.
pub fn split_page(text: &str, page: usize, opts: &ChunkingConfig) -> Vec<Passage> {
    let mut passages = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let remaining = &text[start..];

        if remaining.chars().count() <= opts.chunk_size {
            push_passage(&mut passages, remaining, page, opts);
            break;
        }

        let window_end = char_floor(remaining, opts.chunk_size);
        let window = &remaining[..window_end];

        let cut = SEPARATORS
            .iter()
            .find_map(|sep| window.rfind(sep).map(|pos| pos + sep.len()))
            .filter(|&cut| cut > 0)
            .unwrap_or(window_end);

        push_passage(&mut passages, &remaining[..cut], page, opts);

        // Step back `overlap` characters from the cut; skip the overlap
        // entirely if the cut is too short for it.
        let next = back_up_chars(remaining, cut, opts.overlap);
        start += if next > 0 { next } else { cut };
    }

    passages
}

/// Split a sequence of normalized pages, preserving page order.
/// Overlap never crosses a page boundary.
pub fn split_pages(pages: &[(String, usize)], opts: &ChunkingConfig) -> Vec<Passage> {
    pages
        .iter()
        .flat_map(|(text, page)| split_page(text, *page, opts))
        .collect()
}

fn push_passage(passages: &mut Vec<Passage>, raw: &str, page: usize, opts: &ChunkingConfig) {
    let trimmed = raw.trim();
    if trimmed.chars().count() > opts.min_chunk_chars {
        passages.push(Passage {
            text: trimmed.to_string(),
            page,
        });
    }
}

/// Byte index of the `n_chars`-th character, or the string length if the
/// string is shorter.
fn char_floor(s: &str, n_chars: usize) -> usize {
    s.char_indices()
        .nth(n_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

/// Byte index `n_chars` characters before `byte_idx` (which must lie on a
/// char boundary). Returns 0 when the prefix is shorter than `n_chars`.
fn back_up_chars(s: &str, byte_idx: usize, n_chars: usize) -> usize {
    let mut idx = byte_idx;
    let mut it = s[..byte_idx].char_indices().rev();
    for _ in 0..n_chars {
        match it.next() {
            Some((i, _)) => idx = i,
            None => return 0,
        }
    }
    idx
}
