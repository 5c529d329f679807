//! Variable expression detection at a cursor position.
//!
//! The hover/evaluate UI wants the whole accessor chain under the cursor
//! (`local.foo['bar'].baz`), not just the word segment DAP clients fall back
//! to. Matching is layered: an accessor-run pattern first, then a plain word.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// Identifier followed by any run of dotted or bracket/quoted subscript
/// accessors.
static ACCESSOR_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\[['"][^'"\[\]]*['"]\])*"#)
        .expect("must compile")
});

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("must compile"));

/// Byte range of the variable-like expression touching `offset`, or `None`
/// when the offset sits on pure whitespace/punctuation.
pub fn expression_range(text: &str, offset: usize) -> Option<Range<usize>> {
    range_touching(&ACCESSOR_RUN, text, offset).or_else(|| range_touching(&WORD, text, offset))
}

fn range_touching(pattern: &Regex, text: &str, offset: usize) -> Option<Range<usize>> {
    if offset > text.len() {
        return None;
    }

    pattern
        .find_iter(text)
        .map(|m| m.range())
        .find(|range| range.start <= offset && offset <= range.end)
}
