//! CSV export of the current result view

use crate::attribution::match_source;
use crate::model::AnalysisResult;
use crate::results::{college_name, course_name, program_name};
use crate::{Error, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROGRAM_LINK_TEMPLATE: &str = "https://www.phoenix.edu/programs/{id}.html";
pub const DEFAULT_COURSE_LINK_TEMPLATE: &str = "https://phoenix.edu/courses/{code}";

const PROGRAM_HEADERS: &[&str] = &[
    "Program_ID",
    "Version",
    "Program_Name",
    "College_Name",
    "Keywords_Matched",
    "Search_Type",
    "Program_Link",
];

const COURSE_HEADERS: &[&str] = &[
    "Course_Code",
    "Course_Name",
    "College_Name",
    "Keywords_Matched",
    "Search_Type",
    "Course_Link",
];

const CSV_EXTRA_HEADERS: &[&str] = &[
    "Keywords_Matched",
    "Match_Source",
    "Confidence_Scores",
    "Search_Type",
];

/// Column layout of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportShape {
    /// Original upload columns plus match columns
    Csv,
    Program,
    Course,
}

impl ExportShape {
    /// CSV batches always export as CSV; otherwise any program result wins
    pub fn for_results(results: &[&AnalysisResult]) -> Self {
        if results.iter().any(|r| r.is_csv()) {
            ExportShape::Csv
        } else if results.iter().any(|r| r.is_program()) {
            ExportShape::Program
        } else {
            ExportShape::Course
        }
    }
}

/// Link fallbacks used when a result's metadata carries no link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTemplates {
    /// `{id}` is replaced by the lower-cased program id, `/` → `-`
    pub program: String,
    /// `{code}` is replaced by the course code, `/` → `-`
    pub course: String,
}

impl Default for LinkTemplates {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM_LINK_TEMPLATE.to_string(),
            course: DEFAULT_COURSE_LINK_TEMPLATE.to_string(),
        }
    }
}

impl LinkTemplates {
    /// Template link for a program id
    pub fn program_url(&self, program_id: &str) -> String {
        self.program
            .replace("{id}", &program_id.to_lowercase().replace('/', "-"))
    }

    pub fn program_link(&self, result: &AnalysisResult, program_id: &str) -> String {
        match result.metadata_str("programURL") {
            Some(url) => url.to_string(),
            None => self.program_url(program_id),
        }
    }

    pub fn course_link(&self, result: &AnalysisResult) -> String {
        match result.metadata_str("courseLink") {
            Some(url) => url.to_string(),
            None => self
                .course
                .replace("{code}", &result.source_id.replace('/', "-")),
        }
    }
}

/// Encoded export plus its suggested download name
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub shape: ExportShape,
    pub file_name: String,
    pub content: String,
}

/// Confidence cell: evidence confidences, else matched/searched, else `0%`
pub fn confidence_display(result: &AnalysisResult) -> String {
    if !result.highlighted_sections.is_empty() {
        return result
            .highlighted_sections
            .iter()
            .map(|s| format!("{}%", s.confidence.percent()))
            .collect::<Vec<_>>()
            .join(", ");
    }

    if result.keywords_searched.is_empty() {
        return "0%".to_string();
    }

    let ratio = result.keywords_matched.len() as f64 / result.keywords_searched.len() as f64;
    format!("{}%", (ratio * 100.0).round() as u32)
}

/// Suggested download name for an export
pub fn suggested_file_name(shape: ExportShape, upload_name: Option<&str>) -> String {
    match shape {
        ExportShape::Program => "program_results.csv".to_string(),
        ExportShape::Course => "course_results.csv".to_string(),
        ExportShape::Csv => {
            let name = upload_name.unwrap_or("").trim();
            let stem = if name.to_ascii_lowercase().ends_with(".csv") {
                &name[..name.len() - 4]
            } else {
                name
            };
            let stem = if stem.is_empty() { "csv" } else { stem };
            format!("{}_results.csv", stem)
        }
    }
}

fn keywords_cell(result: &AnalysisResult) -> String {
    result.keywords_matched.join(",")
}

/// Header row and data rows for the chosen shape
fn rows(
    shape: ExportShape,
    results: &[&AnalysisResult],
    links: &LinkTemplates,
) -> (Vec<String>, Vec<Vec<String>>) {
    match shape {
        ExportShape::Csv => {
            let headers: Vec<String> = results
                .iter()
                .find_map(|r| r.csv.as_ref().filter(|c| !c.headers.is_empty()))
                .map(|c| c.headers.clone())
                .unwrap_or_default();

            let mut header_row = headers.clone();
            header_row.extend(CSV_EXTRA_HEADERS.iter().map(|h| h.to_string()));

            let data = results
                .iter()
                .map(|r| {
                    let mut row: Vec<String> = headers
                        .iter()
                        .map(|h| {
                            r.csv
                                .as_ref()
                                .map(|c| c.value(h).to_string())
                                .unwrap_or_default()
                        })
                        .collect();
                    row.push(keywords_cell(r));
                    row.push(match_source(r));
                    row.push(confidence_display(r));
                    row.push(r.effective_search_type().to_string());
                    row
                })
                .collect();

            (header_row, data)
        }
        ExportShape::Program => {
            let data = results
                .iter()
                .map(|r| {
                    if r.is_program() {
                        let (id, version) = r.program_id_and_version();
                        let link = links.program_link(r, &id);
                        vec![
                            id,
                            version,
                            program_name(r),
                            college_name(r),
                            keywords_cell(r),
                            r.effective_search_type().to_string(),
                            link,
                        ]
                    } else {
                        vec![
                            r.source_id.clone(),
                            "N/A".to_string(),
                            course_name(&r.original_text),
                            college_name(r),
                            keywords_cell(r),
                            r.effective_search_type().to_string(),
                            links.course_link(r),
                        ]
                    }
                })
                .collect();
            (to_strings(PROGRAM_HEADERS), data)
        }
        ExportShape::Course => {
            let data = results
                .iter()
                .map(|r| {
                    vec![
                        r.source_id.clone(),
                        course_name(&r.original_text),
                        college_name(r),
                        keywords_cell(r),
                        r.effective_search_type().to_string(),
                        links.course_link(r),
                    ]
                })
                .collect();
            (to_strings(COURSE_HEADERS), data)
        }
    }
}

fn to_strings(headers: &[&str]) -> Vec<String> {
    headers.iter().map(|h| h.to_string()).collect()
}

/// Encode the visible results, in display order
pub fn export_csv(results: &[&AnalysisResult], links: &LinkTemplates) -> Result<CsvExport> {
    if results.is_empty() {
        return Err(Error::InvalidInput("No results to export".to_string()));
    }

    let shape = ExportShape::for_results(results);
    let (header, data) = rows(shape, results, links);

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(&header)?;
    for row in &data {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("CSV writer flush failed: {}", e)))?;
    let content = String::from_utf8(bytes)
        .map_err(|e| Error::Internal(format!("CSV output is not UTF-8: {}", e)))?;

    let upload_name = results
        .iter()
        .find_map(|r| r.csv.as_ref().map(|c| c.file_name.as_str()));

    Ok(CsvExport {
        shape,
        file_name: suggested_file_name(shape, upload_name),
        content,
    })
}
