//! Sequential audit runner
//!
//! Builds one analysis request per selected source and submits them one at a
//! time. A failing source becomes an error placeholder and the batch moves
//! on; only an authorization failure stops the batch.

use crate::client::{AnalysisClient, AnalyzeRequest, CourseSummary, ProgramDetails};
use crate::csv_rows::CsvRow;
use crate::db::clean_keywords;
use crate::export::LinkTemplates;
use crate::model::{AnalysisResult, ContentType, SearchType};
use crate::time::epoch_millis;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

pub const TEXT_INPUT_SOURCE: &str = "text-input";
const DEFAULT_CSV_FILE_NAME: &str = "uploaded_csv";

/// A course picked from the directory
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSelection {
    pub code: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub college_name: Option<String>,
}

impl From<&CourseSummary> for CourseSelection {
    fn from(course: &CourseSummary) -> Self {
        Self {
            code: course.code.clone(),
            title: Some(course.title.clone()).filter(|t| !t.is_empty()),
            college_name: Some(course.college_name.clone()).filter(|c| !c.is_empty()),
        }
    }
}

/// One thing to analyze
#[derive(Debug, Clone, PartialEq)]
pub enum AuditSource {
    Text(String),
    Course(CourseSelection),
    /// Program id; every version is analyzed
    Program(String),
    CsvRow(CsvRow),
}

impl AuditSource {
    fn describe(&self) -> String {
        match self {
            AuditSource::Text(_) => "manual text".to_string(),
            AuditSource::Course(course) => format!("course {}", course.code),
            AuditSource::Program(id) => format!("program {}", id),
            AuditSource::CsvRow(row) => format!("CSV row {}", row.row_index),
        }
    }
}

/// A batch of sources sharing keywords, search type and user metadata
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuditRequest {
    pub keywords: Vec<String>,
    pub search_type: SearchType,
    /// User-supplied key/value pairs merged into every request
    pub metadata: Map<String, Value>,
    pub sources: Vec<AuditSource>,
}

impl AuditRequest {
    pub fn validate(&self) -> Result<()> {
        if clean_keywords(&self.keywords).is_empty() {
            return Err(Error::InvalidInput(
                "At least one keyword is required".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(Error::InvalidInput(
                "Select at least one source to analyze".to_string(),
            ));
        }
        if self
            .sources
            .iter()
            .any(|s| matches!(s, AuditSource::Text(text) if text.trim().is_empty()))
        {
            return Err(Error::InvalidInput("Text to analyze is empty".to_string()));
        }
        Ok(())
    }

    /// User metadata plus the batch's search type
    fn base_metadata(&self) -> Map<String, Value> {
        let mut metadata: Map<String, Value> = self
            .metadata
            .iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| (key.trim().to_string(), value.clone()))
            .collect();
        metadata.insert("searchType".to_string(), json!(self.search_type.as_str()));
        metadata
    }
}

/// Results of a finished batch, in submission order
#[derive(Debug, Clone, Default)]
pub struct AuditOutcome {
    pub results: Vec<AnalysisResult>,
    pub failed: usize,
}

/// `ABC/123` → the public online-course page
pub fn online_course_link(course_code: &str) -> Option<String> {
    let mut parts = course_code.split('/');
    match (parts.next(), parts.next()) {
        (Some(prefix), Some(number)) if !prefix.is_empty() && !number.is_empty() => Some(format!(
            "https://www.phoenix.edu/online-courses/{}{}.html",
            prefix, number
        )),
        _ => None,
    }
}

/// Metadata describing one program version
pub fn program_metadata(program_id: &str, details: &ProgramDetails, links: &LinkTemplates) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("programId".to_string(), json!(program_id));
    metadata.insert("programVersion".to_string(), json!(details.version));
    metadata.insert("programTitle".to_string(), json!(details.display_name));
    metadata.insert("programDescription".to_string(), json!(details.text_description));
    metadata.insert("programLevel".to_string(), json!(details.program_level_description));
    metadata.insert("programCollege".to_string(), json!(details.college_name));
    metadata.insert("programDepartment".to_string(), json!(details.college_department));
    metadata.insert(
        "programExpirationDate".to_string(),
        json!(details.version_expiration_date),
    );
    let url = details
        .program_url
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| links.program_url(program_id));
    metadata.insert("programURL".to_string(), json!(url));
    metadata
}

/// Metadata describing one CSV row; every column also appears as `csv_{key}`
pub fn csv_metadata(row: &CsvRow) -> Map<String, Value> {
    let file_name = if row.file_name.trim().is_empty() {
        DEFAULT_CSV_FILE_NAME
    } else {
        row.file_name.as_str()
    };

    let mut metadata = Map::new();
    metadata.insert("rowIndex".to_string(), json!(row.row_index));
    metadata.insert("sourceType".to_string(), json!("csv"));
    metadata.insert("fileName".to_string(), json!(file_name));
    metadata.insert("originalHeaders".to_string(), json!(row.original_headers));
    for (key, value) in &row.data {
        metadata.insert(format!("csv_{}", key), json!(value));
    }
    metadata
}

/// Runs a batch against the analysis backend on behalf of one user
pub struct AuditRunner<'a> {
    client: &'a AnalysisClient,
    token: Option<&'a str>,
    links: &'a LinkTemplates,
}

impl<'a> AuditRunner<'a> {
    pub fn new(client: &'a AnalysisClient, token: Option<&'a str>, links: &'a LinkTemplates) -> Self {
        Self { client, token, links }
    }

    /// Submit every source in order
    ///
    /// # Errors
    /// Validation failures, and [`Error::Unauthorized`] as soon as the
    /// backend rejects the token. Any other failure is confined to its
    /// source's placeholder.
    pub async fn run(&self, request: &AuditRequest) -> Result<AuditOutcome> {
        request.validate()?;

        let keywords = clean_keywords(&request.keywords);
        let base_metadata = request.base_metadata();
        let total = request.sources.len();
        let mut outcome = AuditOutcome::default();

        info!(
            "Starting audit of {} source(s) for {} keyword(s) using {} search",
            total,
            keywords.len(),
            request.search_type.as_str()
        );

        let job = Job {
            keywords: &keywords,
            search_type: request.search_type,
            base_metadata: &base_metadata,
        };

        for (i, source) in request.sources.iter().enumerate() {
            info!(
                "Analyzing {} ({}/{}) using {} search",
                source.describe(),
                i + 1,
                total,
                request.search_type.as_str()
            );

            match source {
                AuditSource::Text(text) => {
                    let analyze = AnalyzeRequest {
                        source_id: TEXT_INPUT_SOURCE.to_string(),
                        content_type: ContentType::Default,
                        text: text.clone(),
                        keywords: keywords.clone(),
                        metadata: base_metadata.clone(),
                    };
                    let result = self
                        .submit_or_placeholder(&job, analyze, "Failed to process manual text".to_string())
                        .await?;
                    outcome.push(result);
                }
                AuditSource::Course(course) => {
                    let result = self.run_course(&job, course).await?;
                    outcome.push(result);
                }
                AuditSource::Program(program_id) => {
                    for result in self.run_program(&job, program_id).await? {
                        outcome.push(result);
                    }
                }
                AuditSource::CsvRow(row) => {
                    let result = self.run_csv_row(&job, row).await?;
                    outcome.push(result);
                }
            }
        }

        info!(
            "Audit complete: {} result(s), {} failed",
            outcome.results.len(),
            outcome.failed
        );
        Ok(outcome)
    }

    async fn run_course(&self, job: &Job<'_>, course: &CourseSelection) -> Result<AnalysisResult> {
        let code = course.code.trim();
        let failure = format!("Failed to process {}", code);

        let details = match self.client.course_details(self.token, code).await {
            Ok(details) => details,
            Err(Error::Unauthorized(msg)) => return Err(Error::Unauthorized(msg)),
            Err(e) => {
                warn!("Could not load details for course {}: {}", code, e);
                return Ok(job.placeholder(code, ContentType::Course, failure));
            }
        };

        let mut metadata = job.base_metadata.clone();
        metadata.insert("courseCode".to_string(), json!(code));
        if let Some(link) = online_course_link(code) {
            metadata.insert("courseLink".to_string(), json!(link));
        }
        let title = course
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| details.title.clone());
        if let Some(title) = title {
            metadata.insert("courseTitle".to_string(), json!(title));
        }
        if let Some(college) = course.college_name.as_deref().filter(|c| !c.is_empty()) {
            metadata.insert("courseCollege".to_string(), json!(college));
        }

        let analyze = AnalyzeRequest {
            source_id: code.to_string(),
            content_type: ContentType::Course,
            text: details.combined_text(),
            keywords: job.keywords.to_vec(),
            metadata,
        };
        self.submit_or_placeholder(job, analyze, failure).await
    }

    /// One result per program version, newest first
    async fn run_program(&self, job: &Job<'_>, program_id: &str) -> Result<Vec<AnalysisResult>> {
        let program_id = program_id.trim();
        let versions = match self.client.program_details(self.token, program_id).await {
            Ok(versions) => versions,
            Err(Error::Unauthorized(msg)) => return Err(Error::Unauthorized(msg)),
            Err(e) => {
                warn!("Could not load details for program {}: {}", program_id, e);
                return Ok(vec![job.placeholder(
                    program_id,
                    ContentType::Program,
                    format!("Failed to process {}", program_id),
                )]);
            }
        };

        if versions.is_empty() {
            warn!("No details found for program {}", program_id);
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(versions.len());
        for details in &versions {
            let version_id = format!("{}-v{}", program_id, details.version);
            debug!("Analyzing program {} version {}", program_id, details.version);

            let mut metadata = job.base_metadata.clone();
            metadata.extend(program_metadata(program_id, details, self.links));

            let analyze = AnalyzeRequest {
                source_id: version_id.clone(),
                content_type: ContentType::Program,
                text: details.combined_text(),
                keywords: job.keywords.to_vec(),
                metadata,
            };
            let failure = format!("Failed to process {}", version_id);
            results.push(self.submit_or_placeholder(job, analyze, failure).await?);
        }
        Ok(results)
    }

    async fn run_csv_row(&self, job: &Job<'_>, row: &CsvRow) -> Result<AnalysisResult> {
        let source_id = format!("csv-row-{}-{}", row.row_index, epoch_millis());

        let mut metadata = job.base_metadata.clone();
        metadata.extend(csv_metadata(row));

        let analyze = AnalyzeRequest {
            source_id,
            content_type: ContentType::CsvUpload,
            text: row.text.clone(),
            keywords: job.keywords.to_vec(),
            metadata,
        };
        let failure = format!("Failed to process row {}", row.row_index);
        let mut result = self.submit_or_placeholder(job, analyze, failure).await?;
        result.csv = Some(row.to_source());
        Ok(result)
    }

    async fn submit_or_placeholder(
        &self,
        job: &Job<'_>,
        request: AnalyzeRequest,
        failure: String,
    ) -> Result<AnalysisResult> {
        match self.client.analyze(self.token, job.search_type, &request).await {
            Ok(result) => Ok(result),
            Err(Error::Unauthorized(msg)) => Err(Error::Unauthorized(msg)),
            Err(e) => {
                warn!("{}: {}", failure, e);
                Ok(job.placeholder(&request.source_id, request.content_type, failure))
            }
        }
    }
}

/// Batch-wide values shared by every source
struct Job<'a> {
    keywords: &'a [String],
    search_type: SearchType,
    base_metadata: &'a Map<String, Value>,
}

impl Job<'_> {
    fn placeholder(&self, source_id: &str, content_type: ContentType, message: String) -> AnalysisResult {
        AnalysisResult::failed(source_id, content_type, message, self.keywords, self.search_type)
    }
}

impl AuditOutcome {
    fn push(&mut self, result: AnalysisResult) {
        if result.is_error() {
            self.failed += 1;
        }
        self.results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn keywords() -> Vec<String> {
        vec!["equity".to_string()]
    }

    #[test]
    fn test_validation() {
        let empty = AuditRequest::default();
        assert!(matches!(empty.validate(), Err(Error::InvalidInput(_))));

        let no_sources = AuditRequest {
            keywords: keywords(),
            ..AuditRequest::default()
        };
        assert!(no_sources.validate().is_err());

        let blank_keywords = AuditRequest {
            keywords: vec!["  ".to_string()],
            sources: vec![AuditSource::Text("x".to_string())],
            ..AuditRequest::default()
        };
        assert!(blank_keywords.validate().is_err());

        let blank_text = AuditRequest {
            keywords: keywords(),
            sources: vec![AuditSource::Text(" ".to_string())],
            ..AuditRequest::default()
        };
        assert!(blank_text.validate().is_err());

        let ok = AuditRequest {
            keywords: keywords(),
            sources: vec![AuditSource::Program("BSB/A".to_string())],
            ..AuditRequest::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_base_metadata_adds_search_type() {
        let mut metadata = Map::new();
        metadata.insert(" dept ".to_string(), json!("finance"));
        metadata.insert("".to_string(), json!("dropped"));
        let request = AuditRequest {
            search_type: SearchType::Concept,
            metadata,
            ..AuditRequest::default()
        };
        let base = request.base_metadata();
        assert_eq!(base.get("dept"), Some(&json!("finance")));
        assert_eq!(base.get("searchType"), Some(&json!("concept")));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_online_course_link() {
        assert_eq!(
            online_course_link("ETH/316").as_deref(),
            Some("https://www.phoenix.edu/online-courses/ETH316.html")
        );
        assert_eq!(online_course_link("ETH316"), None);
        assert_eq!(online_course_link("/316"), None);
    }

    #[test]
    fn test_program_metadata() {
        let details = ProgramDetails {
            program_id: "BSB/A".to_string(),
            version: "025".to_string(),
            display_name: "BS Business".to_string(),
            college_name: "College of Business".to_string(),
            ..ProgramDetails::default()
        };
        let metadata = program_metadata("BSB/A", &details, &LinkTemplates::default());
        assert_eq!(metadata["programVersion"], json!("025"));
        assert_eq!(metadata["programTitle"], json!("BS Business"));
        assert_eq!(metadata["programCollege"], json!("College of Business"));
        assert_eq!(
            metadata["programURL"],
            json!("https://www.phoenix.edu/programs/bsb-a.html")
        );
    }

    #[test]
    fn test_csv_metadata() {
        let mut data = BTreeMap::new();
        data.insert("description".to_string(), "covers equity".to_string());
        let row = CsvRow {
            row_index: 3,
            data,
            text: "covers equity".to_string(),
            original_headers: vec!["Description".to_string()],
            file_name: String::new(),
        };
        let metadata = csv_metadata(&row);
        assert_eq!(metadata["rowIndex"], json!(3));
        assert_eq!(metadata["sourceType"], json!("csv"));
        assert_eq!(metadata["fileName"], json!("uploaded_csv"));
        assert_eq!(metadata["originalHeaders"], json!(["Description"]));
        assert_eq!(metadata["csv_description"], json!("covers equity"));
    }

    #[test]
    fn test_outcome_counts_failures() {
        let mut outcome = AuditOutcome::default();
        outcome.push(AnalysisResult::failed("a", ContentType::Course, "x", &keywords(), SearchType::Hybrid));
        outcome.push(AnalysisResult {
            id: "r-1".to_string(),
            error: None,
            ..AnalysisResult::failed("b", ContentType::Course, "x", &keywords(), SearchType::Hybrid)
        });
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.results.len(), 2);
    }
}
