//! Section attribution
//!
//! Explains *where* in a source a matched keyword was found ("Course
//! Description", "Program Title", a CSV column header, ...). Each strategy is
//! a pure function over [`AttributionInput`]; strategies are tried in order
//! until one produces labels. Every label comes from [`Section::label`] or,
//! for CSV rows, from the row's own headers.

use crate::model::{AnalysisResult, ContentType, HighlightedSection};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Label used when nothing more specific is known about a text match
pub const GENERIC_LABEL: &str = "Content";

/// Label used for CSV rows (and rows without matches)
pub const CSV_FALLBACK_LABEL: &str = "-";

static ROW_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\brow\s+\d+").expect("valid row marker pattern"));

/// Which family of labels a section belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Course,
    Program,
    Plain,
}

impl Scope {
    fn of(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Course => Scope::Course,
            ContentType::Program => Scope::Program,
            _ => Scope::Plain,
        }
    }
}

/// Fixed section vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Title,
    Description,
    Objectives,
    LearningOutcomes,
    Prerequisites,
    Requirements,
    College,
    Level,
    Code,
}

impl Section {
    pub fn label(self, scope: Scope) -> &'static str {
        use Scope::*;
        use Section::*;
        match (self, scope) {
            (Title, Course) => "Course Title",
            (Title, Program) => "Program Title",
            (Title, Plain) => "Title",
            (Description, Course) => "Course Description",
            (Description, Program) => "Program Description",
            (Description, Plain) => "Description",
            (Objectives, Course) => "Course Objectives",
            (Objectives, _) => "Objectives",
            (LearningOutcomes, _) => "Learning Outcomes",
            (Prerequisites, _) => "Prerequisites",
            (Requirements, Program) => "Program Requirements",
            (Requirements, _) => "Requirements",
            (College, Program) => "Program College",
            (College, _) => "College",
            (Level, _) => "Program Level",
            (Code, _) => "Course Code",
        }
    }
}

/// Embedded section markers: marker → (section, scope)
pub const SECTION_MARKERS: &[(&str, Section, Scope)] = &[
    ("[[SECTION:COURSE_TITLE]]", Section::Title, Scope::Course),
    ("[[SECTION:COURSE_DESCRIPTION]]", Section::Description, Scope::Course),
    ("[[SECTION:COURSE_OBJECTIVES]]", Section::Objectives, Scope::Course),
    ("[[SECTION:LEARNING_OUTCOMES]]", Section::LearningOutcomes, Scope::Plain),
    ("[[SECTION:PREREQUISITES]]", Section::Prerequisites, Scope::Plain),
    ("[[SECTION:PROGRAM_TITLE]]", Section::Title, Scope::Program),
    ("[[SECTION:PROGRAM_DESCRIPTION]]", Section::Description, Scope::Program),
    ("[[SECTION:PROGRAM_FORMATTED_DESCRIPTION]]", Section::Description, Scope::Program),
    ("[[SECTION:PROGRAM_LEVEL]]", Section::Level, Scope::Program),
    ("[[SECTION:PROGRAM_REQUIREMENTS]]", Section::Requirements, Scope::Program),
    ("[[SECTION:PROGRAM_COLLEGE]]", Section::College, Scope::Program),
];

/// Words sniffed around an unmarked occurrence, in priority order
const CONTEXT_WORDS: &[(&str, Section)] = &[
    ("title", Section::Title),
    ("description", Section::Description),
    ("objectives", Section::Objectives),
    ("outcomes", Section::LearningOutcomes),
    ("prerequisites", Section::Prerequisites),
    ("requirements", Section::Requirements),
];

/// Field labels looked for just before an evidence span, in priority order
const EVIDENCE_SENTINELS: &[(&str, Section)] = &[
    ("title:", Section::Title),
    ("name:", Section::Title),
    ("description:", Section::Description),
    ("objectives:", Section::Objectives),
    ("outcomes:", Section::LearningOutcomes),
    ("prerequisites:", Section::Prerequisites),
    ("requirements:", Section::Requirements),
    ("college:", Section::College),
    ("school:", Section::College),
];

const CONTEXT_RADIUS: usize = 100;
const TITLE_OFFSET: usize = 200;
const EVIDENCE_LOOKBEHIND: usize = 200;
const EVIDENCE_TITLE_OFFSET: usize = 300;
const EVIDENCE_TITLE_MAX_LEN: usize = 100;
const EVIDENCE_DESCRIPTION_OFFSET: usize = 1000;
const CSV_MIN_VALUE_LEN: usize = 3;

/// Everything a strategy may look at
pub struct AttributionInput<'a> {
    pub result: &'a AnalysisResult,
    pub keyword: &'a str,
    keyword_lower: String,
}

impl<'a> AttributionInput<'a> {
    pub fn new(result: &'a AnalysisResult, keyword: &'a str) -> Self {
        Self {
            result,
            keyword,
            keyword_lower: keyword.trim().to_lowercase(),
        }
    }

    fn scope(&self) -> Scope {
        Scope::of(self.result.content_type)
    }

    /// Evidence spans whose text mentions the keyword
    fn keyword_evidence(&self) -> impl Iterator<Item = &'a HighlightedSection> + '_ {
        self.result
            .highlighted_sections
            .iter()
            .filter(move |s| s.matched_text.to_lowercase().contains(&self.keyword_lower))
    }
}

/// One attribution strategy
pub type Strategy = fn(&AttributionInput<'_>) -> Option<Vec<String>>;

/// Strategies consulted when the text itself gives nothing specific
const REFINING_STRATEGIES: &[Strategy] = &[evidence_sections, metadata_fields];

/// Strategies for CSV rows, replacing the text strategies entirely
const CSV_STRATEGIES: &[Strategy] = &[
    csv_value_in_evidence,
    csv_value_contains_keyword,
    csv_row_marker,
    csv_header_in_evidence,
    csv_leading_headers,
];

/// Labels for one keyword of one result; never empty
pub fn attribute(result: &AnalysisResult, keyword: &str) -> Vec<String> {
    let input = AttributionInput::new(result, keyword);

    if result.is_csv() {
        if input.keyword_lower.is_empty() {
            return vec![CSV_FALLBACK_LABEL.to_string()];
        }
        return first_match(&input, CSV_STRATEGIES)
            .unwrap_or_else(|| vec![CSV_FALLBACK_LABEL.to_string()]);
    }

    if input.keyword_lower.is_empty() || result.original_text.is_empty() {
        return vec![GENERIC_LABEL.to_string()];
    }

    let located = text_occurrences(&input);
    let only_generic = located.iter().all(|l| l == GENERIC_LABEL);
    if !located.is_empty() && !only_generic {
        return located;
    }

    first_match(&input, REFINING_STRATEGIES).unwrap_or_else(|| vec![GENERIC_LABEL.to_string()])
}

/// `"label, label"` for one keyword
pub fn keyword_source(result: &AnalysisResult, keyword: &str) -> String {
    attribute(result, keyword).join(", ")
}

/// Match-source cell for a whole result: `"kw: labels; kw: labels"` or `"-"`
pub fn match_source(result: &AnalysisResult) -> String {
    if result.keywords_matched.is_empty() {
        return CSV_FALLBACK_LABEL.to_string();
    }
    result
        .keywords_matched
        .iter()
        .map(|kw| format!("{}: {}", kw, keyword_source(result, kw)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn first_match(input: &AttributionInput<'_>, strategies: &[Strategy]) -> Option<Vec<String>> {
    strategies
        .iter()
        .find_map(|strategy| strategy(input).filter(|labels| !labels.is_empty()))
}

fn push_unique(labels: &mut Vec<String>, label: &str) {
    if !labels.iter().any(|l| l == label) {
        labels.push(label.to_string());
    }
}

fn floor_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn window(text: &str, start: usize, end: usize) -> &str {
    let start = floor_boundary(text, start);
    let end = floor_boundary(text, end).max(start);
    &text[start..end]
}

fn keyword_pattern(keyword: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(keyword.trim()))
        .case_insensitive(true)
        .build()
        .ok()
}

struct MarkerSpan {
    start: usize,
    end: usize,
    label: &'static str,
}

/// Marker token ranges and the spans they open, spans sorted by start
fn marker_spans(text: &str) -> (Vec<(usize, usize)>, Vec<MarkerSpan>) {
    let mut tokens: Vec<(usize, usize, &'static str)> = SECTION_MARKERS
        .iter()
        .flat_map(|(marker, section, scope)| {
            text.match_indices(marker)
                .map(move |(idx, m)| (idx, idx + m.len(), section.label(*scope)))
        })
        .collect();
    tokens.sort_by_key(|(start, _, _)| *start);

    let spans = tokens
        .iter()
        .enumerate()
        .map(|(i, (_, token_end, label))| MarkerSpan {
            start: *token_end,
            end: tokens.get(i + 1).map(|t| t.0).unwrap_or(text.len()),
            label: *label,
        })
        .collect();

    let ranges = tokens.iter().map(|(s, e, _)| (*s, *e)).collect();
    (ranges, spans)
}

/// Marker spans, then context sniffing, per occurrence of the keyword
///
/// Hits inside a `[[SECTION:...]]` token itself are dropped instead of
/// being context-sniffed: `description` in `[[SECTION:COURSE_DESCRIPTION]]`
/// is marker syntax, not content.
fn text_occurrences(input: &AttributionInput<'_>) -> Vec<String> {
    let text = input.result.original_text.as_str();
    let Some(pattern) = keyword_pattern(input.keyword) else {
        return Vec::new();
    };
    let (tokens, spans) = marker_spans(text);

    let mut labels = Vec::new();
    for occurrence in pattern.find_iter(text) {
        let offset = occurrence.start();
        if tokens.iter().any(|(s, e)| offset >= *s && offset < *e) {
            continue;
        }

        if let Some(span) = spans.iter().find(|s| offset >= s.start && offset < s.end) {
            push_unique(&mut labels, span.label);
            continue;
        }

        let context = window(
            text,
            offset.saturating_sub(CONTEXT_RADIUS),
            offset + CONTEXT_RADIUS,
        )
        .to_lowercase();

        let label = CONTEXT_WORDS
            .iter()
            .find(|(word, _)| context.contains(word))
            .map(|(_, section)| section.label(Scope::Plain))
            .unwrap_or(if offset < TITLE_OFFSET {
                Section::Title.label(Scope::Plain)
            } else {
                GENERIC_LABEL
            });
        push_unique(&mut labels, label);
    }

    labels
}

/// Evidence spans mentioning the keyword: explicit section, else the field
/// label just before the span, else its position
fn evidence_sections(input: &AttributionInput<'_>) -> Option<Vec<String>> {
    let text = input.result.original_text.as_str();
    let scope = input.scope();
    let mut labels = Vec::new();

    for section in input.keyword_evidence() {
        if let Some(explicit) = section.section_matched.as_deref().map(str::trim) {
            if !explicit.is_empty() && !explicit.to_lowercase().contains("url") {
                push_unique(&mut labels, explicit);
            }
            continue;
        }

        if section.matched_text.is_empty() {
            continue;
        }
        let Some(start) = text.find(&section.matched_text) else {
            continue;
        };

        let before = window(text, start.saturating_sub(EVIDENCE_LOOKBEHIND), start).to_lowercase();
        let sentinel = EVIDENCE_SENTINELS
            .iter()
            .find(|(word, _)| before.contains(word))
            .map(|(_, section)| *section);

        let section_kind = match sentinel {
            Some(kind) => Some(kind),
            None if start < EVIDENCE_TITLE_OFFSET
                && section.matched_text.chars().count() < EVIDENCE_TITLE_MAX_LEN =>
            {
                Some(Section::Title)
            }
            None if start < EVIDENCE_DESCRIPTION_OFFSET => Some(Section::Description),
            None => None,
        };

        if let Some(kind) = section_kind {
            push_unique(&mut labels, kind.label(scope));
        }
    }

    Some(labels)
}

/// Metadata fields checked for program results: keys → label
const PROGRAM_FIELDS: &[(&[&str], &str)] = &[
    (&["programTitle", "displayName"], "Program Title"),
    (
        &["programDescription", "textDescription", "formattedDescription"],
        "Program Description",
    ),
    (&["programCollege"], "Program College"),
    (&["learningOutcomes"], "Learning Outcomes"),
    (&["requirements"], "Program Requirements"),
];

const COURSE_FIELDS: &[(&[&str], &str)] = &[
    (&["courseCode"], "Course Code"),
    (&["courseTitle"], "Course Title"),
];

/// Keyword found in a known metadata field
fn metadata_fields(input: &AttributionInput<'_>) -> Option<Vec<String>> {
    let result = input.result;
    let contains = |keys: &[&str]| {
        keys.iter().any(|key| {
            result
                .metadata_str(key)
                .map(|v| v.to_lowercase().contains(&input.keyword_lower))
                .unwrap_or(false)
        })
    };

    let checks = match result.content_type {
        ContentType::Program => PROGRAM_FIELDS,
        ContentType::Course => COURSE_FIELDS,
        _ => return None,
    };

    let mut labels = Vec::new();
    for &(keys, label) in checks {
        if contains(keys) {
            push_unique(&mut labels, label);
        }
    }

    Some(labels)
}

fn csv_columns<'a>(input: &AttributionInput<'a>) -> Vec<(&'a str, &'a str)> {
    input
        .result
        .csv
        .as_ref()
        .map(|csv| csv.ordered_columns())
        .unwrap_or_default()
}

fn csv_headers<'a>(input: &AttributionInput<'a>) -> Vec<&'a str> {
    match input.result.csv.as_ref() {
        Some(csv) if !csv.headers.is_empty() => csv.headers.iter().map(String::as_str).collect(),
        _ => csv_columns(input).into_iter().map(|(h, _)| h).collect(),
    }
}

/// Longest column value quoted by keyword evidence
fn csv_value_in_evidence(input: &AttributionInput<'_>) -> Option<Vec<String>> {
    let evidence: Vec<String> = input
        .keyword_evidence()
        .map(|s| s.matched_text.to_lowercase())
        .collect();
    if evidence.is_empty() {
        return None;
    }

    let mut best: Option<(&str, usize)> = None;
    for (header, value) in csv_columns(input) {
        let value_lower = value.trim().to_lowercase();
        let len = value_lower.chars().count();
        if len <= CSV_MIN_VALUE_LEN {
            continue;
        }
        if evidence.iter().any(|e| e.contains(&value_lower))
            && best.map(|(_, l)| len > l).unwrap_or(true)
        {
            best = Some((header, len));
        }
    }

    best.map(|(header, _)| vec![header.to_string()])
}

/// First column, in header order, whose value mentions the keyword
fn csv_value_contains_keyword(input: &AttributionInput<'_>) -> Option<Vec<String>> {
    csv_columns(input)
        .into_iter()
        .find(|(_, value)| value.to_lowercase().contains(&input.keyword_lower))
        .map(|(header, _)| vec![header.to_string()])
}

/// Evidence quoting a `Row N` block: the column whose value recurs most
fn csv_row_marker(input: &AttributionInput<'_>) -> Option<Vec<String>> {
    let evidence: Vec<&str> = input
        .result
        .highlighted_sections
        .iter()
        .map(|s| s.matched_text.as_str())
        .filter(|text| ROW_MARKER.is_match(text))
        .collect();
    if evidence.is_empty() {
        return None;
    }

    let mut best: Option<(&str, usize)> = None;
    for (header, value) in csv_columns(input) {
        let value = value.trim();
        if value.chars().count() <= CSV_MIN_VALUE_LEN {
            continue;
        }
        let Some(pattern) = keyword_pattern(value) else {
            continue;
        };
        let count: usize = evidence.iter().map(|e| pattern.find_iter(e).count()).sum();
        if count > 0 && best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((header, count));
        }
    }

    best.map(|(header, _)| vec![header.to_string()])
}

/// Evidence naming a column header outright
fn csv_header_in_evidence(input: &AttributionInput<'_>) -> Option<Vec<String>> {
    let evidence: Vec<String> = input
        .result
        .highlighted_sections
        .iter()
        .map(|s| s.matched_text.to_lowercase())
        .collect();

    csv_headers(input)
        .into_iter()
        .find(|header| {
            let header = header.trim().to_lowercase();
            !header.is_empty() && evidence.iter().any(|e| e.contains(&header))
        })
        .map(|header| vec![header.to_string()])
}

fn csv_leading_headers(input: &AttributionInput<'_>) -> Option<Vec<String>> {
    let headers = csv_headers(input);
    if headers.is_empty() {
        return None;
    }
    Some(vec![headers.iter().take(2).copied().collect::<Vec<_>>().join(", ")])
}
