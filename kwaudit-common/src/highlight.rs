//! Evidence and keyword highlighting over result text
//!
//! Backend offsets count characters and are not trusted: an evidence span
//! is relocated by its matched text when that text occurs verbatim, and
//! otherwise its offsets are clamped into the text.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

use crate::model::HighlightedSection;

/// Evidence span resolved against the text it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedEvidence {
    /// Character offsets into the text
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub reason: String,
}

/// Run of text that either is or is not a keyword hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    pub text: String,
    pub is_keyword: bool,
}

impl TextSegment {
    fn new(text: &str, is_keyword: bool) -> Self {
        Self {
            text: text.to_string(),
            is_keyword,
        }
    }
}

/// Byte offset of the `index`-th character, or the text length past the end
fn char_to_byte(text: &str, index: i64) -> usize {
    if index <= 0 {
        return 0;
    }
    text.char_indices()
        .nth(index as usize)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Byte range of an evidence span within `text`
///
/// The first verbatim occurrence of `matched_text` wins; otherwise the
/// backend offsets are used, clamped so `start <= end <= text.len()`.
/// Both ends fall on char boundaries.
pub fn locate_evidence(text: &str, section: &HighlightedSection) -> (usize, usize) {
    if !section.matched_text.trim().is_empty() {
        if let Some(pos) = text.find(&section.matched_text) {
            return (pos, pos + section.matched_text.len());
        }
    }

    let start = char_to_byte(text, section.start_index);
    let end = char_to_byte(text, section.end_index).max(start);
    (start, end)
}

/// Every evidence span of a result, in backend order
pub fn locate_all(text: &str, sections: &[HighlightedSection]) -> Vec<LocatedEvidence> {
    sections
        .iter()
        .map(|section| {
            let (start, end) = locate_evidence(text, section);
            let char_start = text[..start].chars().count();
            let span = &text[start..end];
            LocatedEvidence {
                start: char_start,
                end: char_start + span.chars().count(),
                text: span.to_string(),
                reason: section.reason.clone(),
            }
        })
        .collect()
}

/// Case-insensitive alternation of the keywords, longest first
fn keyword_pattern(keywords: &[String]) -> Option<Regex> {
    let mut cleaned: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    cleaned.dedup();

    let alternation = cleaned
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");

    match RegexBuilder::new(&alternation).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Keyword pattern rejected: {}", e);
            None
        }
    }
}

/// Split `text` into alternating plain and keyword segments
///
/// Longer keywords take precedence where keywords overlap. Concatenating
/// the segments reproduces `text`.
pub fn keyword_segments(text: &str, keywords: &[String]) -> Vec<TextSegment> {
    if text.is_empty() {
        return Vec::new();
    }
    let Some(pattern) = keyword_pattern(keywords) else {
        return vec![TextSegment::new(text, false)];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for hit in pattern.find_iter(text) {
        if hit.start() > last {
            segments.push(TextSegment::new(&text[last..hit.start()], false));
        }
        segments.push(TextSegment::new(hit.as_str(), true));
        last = hit.end();
    }
    if last < text.len() {
        segments.push(TextSegment::new(&text[last..], false));
    }
    segments
}
