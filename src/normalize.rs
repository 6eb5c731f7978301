//! Text normalization for extracted document pages and client input.
//!
//! [`clean_text`] prepares raw extracted page text for chunking: whitespace
//! runs collapse to single spaces, characters outside the allow-list become
//! spaces, and short garbage lines are dropped. The allow-list covers ASCII
//! alphanumerics and common punctuation, Latin-accented letters, and the
//! Arabic block, matching the languages the assistant serves.
//!
//! [`sanitize_input`] is the lighter cleanup applied to client-supplied
//! questions and history turns: tag spans are stripped and whitespace is
//! collapsed.
//!
//! All functions are pure; empty input yields empty output.

/// Minimum trimmed line length kept by [`clean_text`].
const MIN_LINE_CHARS: usize = 15;

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || matches!(
            c,
            '.' | ',' | ';' | ':' | '!' | '?' | '-' | '(' | ')' | '/' | '\'' | '"'
        )
        // Latin-1 Supplement + Latin Extended-A letters (é, è, ç, ñ, …)
        || ('\u{00C0}'..='\u{017F}').contains(&c)
        // Arabic block
        || ('\u{0600}'..='\u{06FF}').contains(&c)
}

/// Normalize raw extracted page text.
///
/// Steps, in order:
/// 1. Collapse every whitespace run to a single space.
/// 2. Replace each character outside the allow-list with a space.
/// 3. Split on newlines, keep only lines whose trimmed length exceeds
///    15 characters, and rejoin with newline.
///
/// The output may be empty; that is not an error.
pub fn clean_text(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_whitespace = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            collapsed.push(if is_allowed(c) { c } else { ' ' });
        }
    }

    collapsed
        .split('\n')
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `<...>` tag spans from client input.
///
/// A span is an opening `<`, at least one non-`>` character, and a closing
/// `>`. An unmatched `<` (or a bare `<>`) is kept verbatim.
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) if end > 0 => {
                rest = &after[end + 1..];
            }
            _ => {
                // No well-formed span here; keep the '<' and move on.
                out.push('<');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Sanitize a client-supplied string: strip tag spans, collapse whitespace
/// runs to single spaces, and trim.
pub fn sanitize_input(text: &str) -> String {
    strip_tags(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate a string to at most `max_chars` characters, respecting UTF-8
/// boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
