//! Analysis backend HTTP client
//!
//! Thin typed wrapper over the backend's REST contract. Every call carries
//! the caller's identity token (header `X-Azure-Token`) when one is known;
//! a `401` surfaces as [`Error::Unauthorized`] so the caller can drop the
//! session.

use crate::model::{AnalysisResult, ContentType, SearchType};
use crate::suggestions::{
    AlternateTextRequest, AlternateTextResponse, AlternativeSuggestion, FullTextRequest,
    FullTextResponse,
};
use crate::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

pub const TOKEN_HEADER: &str = "X-Azure-Token";
const USER_AGENT: &str = concat!("kwaudit/", env!("CARGO_PKG_VERSION"));
pub const NO_SUGGESTIONS: &str = "No alternative suggestions were found. Try refining your prompt.";

/// Body of the analyze endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeRequest {
    pub source_id: String,
    pub content_type: ContentType,
    pub text: String,
    pub keywords: Vec<String>,
    pub metadata: Map<String, Value>,
}

/// Course directory entry (`GET /api/templates`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseSummary {
    pub id: Option<String>,
    pub code: String,
    pub title: String,
    pub college_name: String,
    pub department_name: String,
}

/// Course body (`GET /api/course-details`)
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseDetails {
    pub title: Option<String>,
    pub course_description: Option<String>,
    pub outline_body: Option<String>,
}

impl CourseDetails {
    /// Title, description and outline joined by spaces
    pub fn combined_text(&self) -> String {
        [&self.title, &self.course_description, &self.outline_body]
            .iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Program directory entry (`GET /api/programs`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramSummary {
    pub id: Option<String>,
    pub code: String,
    pub title: String,
    pub college_code: Option<String>,
    pub college_name: String,
    pub level_code: Option<String>,
    pub level_name: String,
    pub is_active: bool,
}

/// One version of a program (`GET /api/programs-details`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramDetails {
    pub id: Option<String>,
    pub program_id: String,
    pub version: String,
    pub display_name: String,
    pub text_description: String,
    pub formatted_description: String,
    pub college_name: String,
    pub college_department: String,
    pub program_level: String,
    pub program_level_description: String,
    pub version_effective_date: String,
    pub version_expiration_date: String,
    #[serde(rename = "programURL", alias = "programUrl")]
    pub program_url: Option<String>,
}

impl ProgramDetails {
    pub fn combined_text(&self) -> String {
        format!(
            "{}\n\n{}\n\n{}",
            self.display_name, self.text_description, self.formatted_description
        )
    }

    /// Leading digits of the version (`"025A"` → 25); none sorts last
    pub fn version_number(&self) -> Option<u64> {
        let digits: String = self
            .version
            .trim()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }
}

/// Newest version first
pub fn sort_versions_newest_first(details: &mut [ProgramDetails]) {
    details.sort_by(|a, b| b.version_number().cmp(&a.version_number()));
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProgramList {
    Bare(Vec<ProgramSummary>),
    Wrapped {
        #[serde(default)]
        programs: Option<Vec<ProgramSummary>>,
        #[serde(default)]
        items: Option<Vec<ProgramSummary>>,
    },
}

/// Message carried by an error body: FastAPI-style `detail`, else raw text
fn error_message(body: &str, fallback: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => return detail.clone(),
            Some(detail) if !detail.is_null() => return detail.to_string(),
            _ => {}
        }
    }
    let body = body.trim();
    if body.is_empty() {
        fallback.to_string()
    } else {
        body.to_string()
    }
}

/// Client for the analysis backend
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) if !token.is_empty() => builder.header(TOKEN_HEADER, token),
            _ => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        token: Option<&str>,
        failure: &str,
    ) -> Result<T> {
        let response = Self::authorize(builder, token).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized(
                "Backend rejected the session token".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend {
                status: status.as_u16(),
                message: error_message(&body, failure),
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Submit one source; the backend may answer with a single result or an
    /// array. A missing search type is filled in from `search_type`.
    pub async fn analyze(
        &self,
        token: Option<&str>,
        search_type: SearchType,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisResult> {
        debug!(
            source_id = %request.source_id,
            endpoint = search_type.endpoint(),
            "Submitting source for analysis"
        );

        let builder = self.http.post(self.url(search_type.endpoint())).json(request);
        let response: OneOrMany<AnalysisResult> = self
            .send(builder, token, "Failed to analyze source")
            .await?;

        let mut result = response.into_first().ok_or_else(|| Error::Backend {
            status: 200,
            message: format!("No result returned for {}", request.source_id),
        })?;

        if result.search_type.is_none() {
            result.search_type = Some(search_type);
        }
        Ok(result)
    }

    pub async fn list_courses(&self, token: Option<&str>) -> Result<Vec<CourseSummary>> {
        let builder = self.http.get(self.url("/api/templates"));
        self.send(builder, token, "Failed to fetch courses").await
    }

    pub async fn course_details(&self, token: Option<&str>, course_code: &str) -> Result<CourseDetails> {
        let builder = self
            .http
            .get(self.url("/api/course-details"))
            .query(&[("courseCode", course_code)]);
        let details: OneOrMany<CourseDetails> = self
            .send(builder, token, "Failed to fetch course details")
            .await?;
        details
            .into_first()
            .ok_or_else(|| Error::NotFound(format!("Course {}", course_code)))
    }

    pub async fn list_programs(&self, token: Option<&str>) -> Result<Vec<ProgramSummary>> {
        let builder = self.http.get(self.url("/api/programs"));
        let list: ProgramList = self.send(builder, token, "Failed to fetch programs").await?;
        Ok(match list {
            ProgramList::Bare(programs) => programs,
            ProgramList::Wrapped { programs, items } => programs.or(items).unwrap_or_default(),
        })
    }

    /// All versions of a program, newest first
    pub async fn program_details(&self, token: Option<&str>, program_id: &str) -> Result<Vec<ProgramDetails>> {
        let builder = self
            .http
            .get(self.url("/api/programs-details"))
            .query(&[("programId", program_id)]);
        let mut details: Vec<ProgramDetails> = self
            .send(builder, token, "Failed to fetch program details")
            .await?;
        sort_versions_newest_first(&mut details);
        Ok(details)
    }

    pub async fn alternate_text_suggestions(
        &self,
        token: Option<&str>,
        request: &AlternateTextRequest,
    ) -> Result<Vec<AlternativeSuggestion>> {
        let builder = self
            .http
            .post(self.url("/api/alternate-text-suggestion"))
            .json(request);
        let response: AlternateTextResponse = self
            .send(builder, token, "Failed to get alternative text suggestions")
            .await?;
        if response.alternative_suggestions.is_empty() {
            return Err(Error::NotFound(NO_SUGGESTIONS.to_string()));
        }
        Ok(response.alternative_suggestions)
    }

    pub async fn full_text_alternatives(
        &self,
        token: Option<&str>,
        request: &FullTextRequest,
    ) -> Result<Vec<String>> {
        let builder = self
            .http
            .post(self.url("/api/full-sentence-suggestion"))
            .json(request);
        let response: FullTextResponse = self
            .send(builder, token, "Failed to get full text alternatives")
            .await?;
        if response.alternatives.is_empty() {
            return Err(Error::NotFound(NO_SUGGESTIONS.to_string()));
        }
        Ok(response.alternatives)
    }
}
