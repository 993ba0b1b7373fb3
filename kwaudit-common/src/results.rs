//! Result aggregation: display names, filtering and sorting
//!
//! The working result list is never reordered in place. A [`ResultView`]
//! derives the visible rows from it on demand.

use crate::model::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const UNKNOWN_COURSE: &str = "Unknown Course";
pub const UNKNOWN_PROGRAM: &str = "Unknown Program";
pub const NOT_AVAILABLE: &str = "N/A";

const COURSE_NAME_DELIMITER: &str = "This course";
const COURSE_NAME_MAX_CHARS: usize = 100;
const COURSE_NAME_PREVIEW_CHARS: usize = 40;

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Course display name derived from its analyzed text
pub fn course_name(original_text: &str) -> String {
    if original_text.is_empty() {
        return UNKNOWN_COURSE.to_string();
    }

    match original_text.split_once(COURSE_NAME_DELIMITER) {
        Some((before, _)) => {
            let name = before.trim();
            if name.chars().count() > COURSE_NAME_MAX_CHARS {
                format!("{}...", truncate_chars(name, COURSE_NAME_MAX_CHARS))
            } else {
                name.to_string()
            }
        }
        None => format!(
            "{}...",
            truncate_chars(original_text, COURSE_NAME_PREVIEW_CHARS)
        ),
    }
}

/// Program display name: `programTitle` metadata, else the first paragraph
pub fn program_name(result: &AnalysisResult) -> String {
    if let Some(title) = result.metadata_str("programTitle") {
        return title.to_string();
    }
    match result.original_text.split("\n\n").next() {
        Some(first) if !first.is_empty() => first.to_string(),
        _ => UNKNOWN_PROGRAM.to_string(),
    }
}

/// Name shown in the name column for any result
pub fn display_name(result: &AnalysisResult) -> String {
    if result.is_program() {
        program_name(result)
    } else {
        course_name(&result.original_text)
    }
}

/// College shown for a result, `N/A` when unknown
pub fn college_name(result: &AnalysisResult) -> String {
    result
        .metadata_str("programCollege")
        .or_else(|| result.metadata_str("courseCollege"))
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Free-text filter plus the matched-only toggle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFilter {
    #[serde(default)]
    pub filter_text: String,
    #[serde(default)]
    pub matched_only: bool,
}

impl ResultFilter {
    pub fn matches(&self, result: &AnalysisResult) -> bool {
        if self.matched_only && !result.has_matches() {
            return false;
        }

        let needle = self.filter_text.to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let keywords = result.keywords_matched.join(", ").to_lowercase();
        if keywords.contains(&needle) {
            return true;
        }

        if let Some(csv) = result.csv.as_ref() {
            return csv
                .data
                .values()
                .any(|value| value.to_lowercase().contains(&needle));
        }

        result.source_id.to_lowercase().contains(&needle)
            || result.original_text.to_lowercase().contains(&needle)
            || college_name(result).to_lowercase().contains(&needle)
    }
}

/// Sortable columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CourseName,
    CollegeName,
    MatchedKeywords,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "courseName" => Some(SortField::CourseName),
            "collegeName" => Some(SortField::CollegeName),
            "matchedKeywords" => Some(SortField::MatchedKeywords),
            _ => None,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::CourseName => "courseName",
            SortField::CollegeName => "collegeName",
            SortField::MatchedKeywords => "matchedKeywords",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Current sort column and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortState {
    /// Same field flips direction; another field starts ascending
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }
}

/// Case-insensitive comparison, raw text as the tie breaker
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare(field: SortField, a: &AnalysisResult, b: &AnalysisResult) -> Ordering {
    match field {
        SortField::CourseName => compare_text(&display_name(a), &display_name(b)),
        SortField::CollegeName => compare_text(&college_name(a), &college_name(b)),
        SortField::MatchedKeywords => a.keywords_matched.len().cmp(&b.keywords_matched.len()),
    }
}

/// Filter and sort state applied to the working list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    #[serde(flatten)]
    pub filter: ResultFilter,
    #[serde(default)]
    pub sort: SortState,
}

impl ResultView {
    /// Visible rows, in display order
    pub fn apply<'a>(&self, results: &'a [AnalysisResult]) -> Vec<&'a AnalysisResult> {
        let mut visible: Vec<(usize, &AnalysisResult)> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| self.filter.matches(r))
            .collect();

        if results.iter().any(AnalysisResult::is_csv) {
            visible.sort_by_key(|(idx, r)| {
                (r.csv.as_ref().map(|c| c.row_index).unwrap_or(usize::MAX), *idx)
            });
            return visible.into_iter().map(|(_, r)| r).collect();
        }

        visible.sort_by(|(ia, a), (ib, b)| compare(self.sort.field, a, b).then(ia.cmp(ib)));
        if self.sort.direction == SortDirection::Desc {
            visible.reverse();
        }

        visible.into_iter().map(|(_, r)| r).collect()
    }

    pub fn summary(visible: usize, total: usize) -> String {
        format!("Showing {} of {} results", visible, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentType, CsvSource};
    use serde_json::json;

    fn result(source_id: &str, text: &str, matched: &[&str]) -> AnalysisResult {
        serde_json::from_value(json!({
            "id": source_id,
            "source_id": source_id,
            "content_type": "course",
            "original_text": text,
            "keywords_searched": ["equity", "bias", "access"],
            "keywords_matched": matched,
        }))
        .unwrap()
    }

    #[test]
    fn test_course_name_before_delimiter() {
        assert_eq!(
            course_name("  Ethics in Business  This course explores..."),
            "Ethics in Business"
        );
        let long = format!("{}This course", "a".repeat(120));
        assert_eq!(course_name(&long), format!("{}...", "a".repeat(100)));
    }

    #[test]
    fn test_course_name_preview_and_unknown() {
        let text = "An overview of organizational leadership and ethics in depth";
        assert_eq!(course_name(text), format!("{}...", &text[..40]));
        assert_eq!(course_name(""), UNKNOWN_COURSE);
    }

    #[test]
    fn test_program_name_sources() {
        let mut r = result("BSB-v1", "Bachelor of Science\n\nA degree for...", &[]);
        r.content_type = ContentType::Program;
        assert_eq!(display_name(&r), "Bachelor of Science");

        r.metadata = json!({"programTitle": "BS Business"}).as_object().cloned().unwrap();
        assert_eq!(display_name(&r), "BS Business");

        let empty = AnalysisResult {
            original_text: String::new(),
            metadata: serde_json::Map::new(),
            ..r
        };
        assert_eq!(program_name(&empty), UNKNOWN_PROGRAM);
    }

    #[test]
    fn test_college_default() {
        let r = result("ETH/101", "text", &[]);
        assert_eq!(college_name(&r), NOT_AVAILABLE);
    }

    #[test]
    fn test_filter_fields() {
        let mut r = result("ETH/101", "Ethics This course covers fairness", &["equity"]);
        r.metadata = json!({"programCollege": "College of Business"})
            .as_object()
            .cloned()
            .unwrap();

        let filter = |text: &str| ResultFilter {
            filter_text: text.to_string(),
            matched_only: false,
        };
        assert!(filter("eth/1").matches(&r));
        assert!(filter("FAIRNESS").matches(&r));
        assert!(filter("equity").matches(&r));
        assert!(filter("business").matches(&r));
        assert!(!filter("chemistry").matches(&r));
        assert!(filter("n/a").matches(&result("X", "", &[])));
    }

    #[test]
    fn test_filter_csv_rows_use_column_values() {
        let mut r = result("csv-row-1-1", "derived text", &[]);
        r.content_type = ContentType::CsvUpload;
        r.csv = Some(CsvSource {
            row_index: 1,
            headers: vec!["title".to_string()],
            data: [("title".to_string(), "Intro to Ethics".to_string())]
                .into_iter()
                .collect(),
            file_name: "f.csv".to_string(),
        });
        let filter = |text: &str| ResultFilter {
            filter_text: text.to_string(),
            matched_only: false,
        };
        assert!(filter("intro").matches(&r));
        assert!(!filter("derived").matches(&r));
    }

    #[test]
    fn test_matched_only_is_monotonic() {
        let results = vec![
            result("A", "alpha", &["equity"]),
            result("B", "beta", &[]),
            result("C", "gamma", &["bias", "access"]),
        ];
        for text in ["", "a", "beta", "zzz"] {
            let mut view = ResultView::default();
            view.filter.filter_text = text.to_string();
            let all = view.apply(&results).len();
            view.filter.matched_only = true;
            let matched = view.apply(&results);
            assert!(matched.len() <= all);
            assert!(matched.iter().all(|r| r.has_matches()));
        }
    }

    #[test]
    fn test_count_sort_desc_is_exact_reverse() {
        let results = vec![
            result("A", "a", &["equity"]),
            result("B", "b", &[]),
            result("C", "c", &["equity"]),
            result("D", "d", &["equity", "bias"]),
            result("E", "e", &[]),
        ];
        let mut view = ResultView::default();
        view.sort.toggle(SortField::MatchedKeywords);
        let asc: Vec<&str> = view.apply(&results).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(asc, vec!["B", "E", "A", "C", "D"]);

        view.sort.toggle(SortField::MatchedKeywords);
        assert_eq!(view.sort.direction, SortDirection::Desc);
        let mut desc: Vec<&str> = view.apply(&results).iter().map(|r| r.id.as_str()).collect();
        desc.reverse();
        assert_eq!(desc, asc);
    }

    #[test]
    fn test_toggle_resets_on_new_field() {
        let mut sort = SortState::default();
        sort.toggle(SortField::CourseName);
        assert_eq!(sort.direction, SortDirection::Desc);
        sort.toggle(SortField::CollegeName);
        assert_eq!(sort.field, SortField::CollegeName);
        assert_eq!(sort.direction, SortDirection::Asc);
    }

    #[test]
    fn test_name_sort_case_insensitive() {
        let results = vec![
            result("1", "zeta This course", &[]),
            result("2", "Alpha This course", &[]),
            result("3", "beta This course", &[]),
        ];
        let view = ResultView::default();
        let ids: Vec<&str> = view.apply(&results).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_csv_results_sort_by_row_index() {
        let mut results = Vec::new();
        for (id, row) in [("r3", 3), ("r1", 1), ("r2", 2)] {
            let mut r = result(id, "x", &["equity"]);
            r.content_type = ContentType::CsvUpload;
            r.csv = Some(CsvSource {
                row_index: row,
                ..CsvSource::default()
            });
            results.push(r);
        }
        let mut view = ResultView::default();
        view.sort.toggle(SortField::MatchedKeywords);
        view.sort.toggle(SortField::MatchedKeywords);
        let ids: Vec<&str> = view.apply(&results).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_summary() {
        assert_eq!(ResultView::summary(2, 5), "Showing 2 of 5 results");
    }

    #[test]
    fn test_sort_field_names() {
        assert_eq!(SortField::parse("collegeName"), Some(SortField::CollegeName));
        assert_eq!(SortField::MatchedKeywords.to_string(), "matchedKeywords");
        assert_eq!(SortField::parse("bogus"), None);
    }
}
