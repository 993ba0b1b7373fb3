//! Analysis result model
//!
//! Types mirroring the analysis backend's response contract. Values the
//! backend sends in more than one shape (confidence, content type) are
//! resolved once here so consumers never branch on representation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Kind of source a result was produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    /// Pasted free text
    #[default]
    Default,
    /// Course record from the course directory
    Course,
    /// One version of a program record
    Program,
    /// One row of an uploaded CSV file
    CsvUpload,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Default => "default",
            ContentType::Course => "course",
            ContentType::Program => "program",
            ContentType::CsvUpload => "csv upload",
        }
    }

    /// Parse a backend content type; unknown values fall back to `Default`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "course" => ContentType::Course,
            "program" => ContentType::Program,
            "csv upload" | "csv_upload" | "csv" => ContentType::CsvUpload,
            _ => ContentType::Default,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|v| ContentType::parse(&v)).unwrap_or_default())
    }
}

/// Backend search mode, passed through but not interpreted locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Hybrid,
    Keyword,
    Concept,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Hybrid => "hybrid",
            SearchType::Keyword => "keyword",
            SearchType::Concept => "concept",
        }
    }

    /// Backend endpoint path serving this search mode
    pub fn endpoint(&self) -> &'static str {
        match self {
            SearchType::Hybrid => "/api/analyze",
            SearchType::Keyword => "/api/keywordsearch",
            SearchType::Concept => "/api/conceptsearch",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Some(SearchType::Hybrid),
            "keyword" => Some(SearchType::Keyword),
            "concept" => Some(SearchType::Concept),
            _ => None,
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence confidence as a fraction in [0, 1]
///
/// The backend reports either a float in [0, 1], a whole-number percentage,
/// or a pre-formatted string such as `"85%"`. All forms are normalized on
/// deserialization; unparseable values become 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(fraction: f64) -> Self {
        if fraction.is_finite() {
            Self(fraction.clamp(0.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    pub fn fraction(&self) -> f64 {
        self.0
    }

    /// Whole-number percentage (rounded)
    pub fn percent(&self) -> u32 {
        (self.0 * 100.0).round() as u32
    }

    fn from_number(n: f64) -> Self {
        if n > 1.0 && n <= 100.0 {
            Self::new(n / 100.0)
        } else {
            Self::new(n)
        }
    }

    /// Resolve any backend representation into a fraction
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(Self::from_number).unwrap_or_default(),
            Value::String(s) => {
                let trimmed = s.trim();
                if let Some(pct) = trimmed.strip_suffix('%') {
                    pct.trim()
                        .parse::<f64>()
                        .map(|p| Self::new(p / 100.0))
                        .unwrap_or_default()
                } else {
                    trimmed
                        .parse::<f64>()
                        .map(Self::from_number)
                        .unwrap_or_default()
                }
            }
            _ => Self::default(),
        }
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Confidence::from_json(&value))
    }
}

/// Backend-supplied evidence span justifying a match
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HighlightedSection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_index: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_index: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matched_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_matched: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_matched: Option<String>,
}

/// Original CSV row a result was produced from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CsvSource {
    /// 1-based data row index
    pub row_index: usize,
    /// Header order as uploaded
    #[serde(default)]
    pub headers: Vec<String>,
    /// Column → value
    #[serde(default)]
    pub data: HashMap<String, String>,
    #[serde(default)]
    pub file_name: String,
}

impl CsvSource {
    /// Columns in upload order; keys missing from the header list follow, sorted
    pub fn ordered_columns(&self) -> Vec<(&str, &str)> {
        let mut columns: Vec<(&str, &str)> = self
            .headers
            .iter()
            .filter_map(|h| self.data.get(h).map(|v| (h.as_str(), v.as_str())))
            .collect();

        if columns.is_empty() {
            let mut keys: Vec<&String> = self.data.keys().collect();
            keys.sort();
            columns = keys
                .into_iter()
                .map(|k| (k.as_str(), self.data[k].as_str()))
                .collect();
        }

        columns
    }

    pub fn value(&self, header: &str) -> &str {
        self.data.get(header).map(String::as_str).unwrap_or("")
    }
}

/// One analyzed source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default = "generate_result_id", deserialize_with = "id_or_generated")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_id: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords_searched: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords_matched: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub highlighted_sections: Vec<HighlightedSection>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_flags: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Unknown modes read as absent
    #[serde(
        default,
        deserialize_with = "lenient_search_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub search_type: Option<SearchType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<CsvSource>,
    /// Set only on per-source failure placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn generate_result_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `null` reads the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_or_generated<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generate_result_id))
}

fn lenient_search_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SearchType>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(SearchType::parse))
}

impl AnalysisResult {
    /// Placeholder recorded when a single source fails during a batch
    pub fn failed(
        source_id: impl Into<String>,
        content_type: ContentType,
        message: impl Into<String>,
        keywords: &[String],
        search_type: SearchType,
    ) -> Self {
        let source_id = source_id.into();
        Self {
            id: format!("error-{}", source_id),
            request_id: None,
            source_id,
            content_type,
            original_text: String::new(),
            keywords_searched: keywords.to_vec(),
            keywords_matched: Vec::new(),
            highlighted_sections: Vec::new(),
            has_flags: false,
            metadata: Map::new(),
            created_at: None,
            search_type: Some(search_type),
            csv: None,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn status(&self) -> &'static str {
        if self.is_error() {
            "error"
        } else {
            "ok"
        }
    }

    pub fn is_csv(&self) -> bool {
        self.content_type == ContentType::CsvUpload || self.csv.is_some()
    }

    pub fn is_program(&self) -> bool {
        self.content_type == ContentType::Program
    }

    pub fn has_matches(&self) -> bool {
        !self.keywords_matched.is_empty()
    }

    /// Non-empty string metadata value
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Search type recorded on the result, falling back to metadata
    pub fn effective_search_type(&self) -> SearchType {
        self.search_type
            .or_else(|| self.metadata_str("searchType").and_then(SearchType::parse))
            .unwrap_or_default()
    }

    /// `(program_id, version)` from a `CODE-vVERSION` source id
    pub fn program_id_and_version(&self) -> (String, String) {
        let mut parts = self.source_id.split("-v");
        let id = parts.next().unwrap_or_default().to_string();
        let version = parts
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| "N/A".to_string());
        (id, version)
    }
}
