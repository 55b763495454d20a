//! Phrase matching helpers shared by the classifier, detector and composer.
//!
//! All offsets are byte offsets into the searched text. Lowercasing is ASCII
//! only so offsets computed on the folded text stay valid for the original.

/// A byte range of a phrase occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if `other` lies entirely within this span.
    pub fn covers(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Find every occurrence of `phrase` in `text`.
///
/// ASCII phrases match case-insensitively and only at word boundaries, so
/// "pan" never matches inside "company" and "Thor" never inside "Thorin".
/// Other phrases (CJK in practice) have no word separators and match as
/// plain substrings.
pub(crate) fn find_phrase(text: &str, phrase: &str) -> Vec<Span> {
    let phrase = phrase.trim();
    if phrase.is_empty() || phrase.len() > text.len() {
        return Vec::new();
    }

    let haystack = text.to_ascii_lowercase();
    let needle = phrase.to_ascii_lowercase();
    let bounded = needle.is_ascii();
    let bytes = haystack.as_bytes();

    haystack
        .match_indices(needle.as_str())
        .map(|(start, m)| Span::new(start, start + m.len()))
        .filter(|span| !bounded || at_word_boundary(bytes, *span))
        .collect()
}

/// First occurrence of `phrase` that does not overlap any `protected` span.
pub(crate) fn find_free(text: &str, phrase: &str, protected: &[Span]) -> Option<Span> {
    find_phrase(text, phrase)
        .into_iter()
        .find(|span| !protected.iter().any(|p| p.overlaps(span)))
}

/// Check that every character of `original` survives, in order, in `enhanced`.
pub(crate) fn retains_in_order(original: &str, enhanced: &str) -> bool {
    let mut remaining = enhanced.chars();
    original
        .chars()
        .all(|wanted| remaining.by_ref().any(|c| c == wanted))
}

/// Replace every character inside `spans` with spaces of the same byte
/// length, so offsets into the result stay valid for `text`.
pub(crate) fn blank_out(text: &str, spans: &[Span]) -> String {
    if spans.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (at, c) in text.char_indices() {
        if spans.iter().any(|s| s.start <= at && at < s.end) {
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        } else {
            out.push(c);
        }
    }
    out
}

/// Check if a match sits between non-alphanumeric neighbours.
fn at_word_boundary(bytes: &[u8], span: Span) -> bool {
    let left_ok = span.start == 0 || !bytes[span.start - 1].is_ascii_alphanumeric();
    let right_ok = span.end == bytes.len() || !bytes[span.end].is_ascii_alphanumeric();
    left_ok && right_ok
}
