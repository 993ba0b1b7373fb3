//! CSV row normalizer
//!
//! Turns an uploaded CSV file into rows ready for submission: sanitized
//! column keys, the original header/value pairs, and a free-text blob that
//! is what the backend actually analyzes.

use crate::model::CsvSource;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Text submitted when a row has nothing usable
pub const NO_TEXT_PLACEHOLDER: &str = "No text content available in this row";

/// Value stored under `row_data` when no column key survives sanitization
pub const NO_VALID_DATA: &str = "No valid data in row";

/// Column-name fragments marking a column as analyzable prose
pub const CONTENT_FIELDS: &[&str] = &[
    "text",
    "content",
    "description",
    "curriculum",
    "syllabus",
    "course_content",
    "program_content",
    "details",
];

/// One data row of an uploaded CSV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    /// 1-based, counting data rows only
    pub row_index: usize,
    /// Sanitized keys merged with the original header/value pairs
    pub data: BTreeMap<String, String>,
    /// Derived analysis text, never empty
    pub text: String,
    pub original_headers: Vec<String>,
    pub file_name: String,
}

impl CsvRow {
    /// Snapshot attached to results produced from this row
    pub fn to_source(&self) -> CsvSource {
        CsvSource {
            row_index: self.row_index,
            headers: self.original_headers.clone(),
            data: self
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            file_name: self.file_name.clone(),
        }
    }
}

/// Sanitize a column key: trim, whitespace runs to `_`, drop anything
/// outside `[A-Za-z0-9_]`, lower-case.
pub fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut in_space = false;
    for c in key.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

/// Sanitized column map in header order; duplicate keys keep the last value
fn sanitize_row(headers: &[String], values: &[String]) -> Vec<(String, String)> {
    let mut sanitized: Vec<(String, String)> = Vec::new();

    for (header, value) in headers.iter().zip(values.iter()) {
        let key = sanitize_key(header);
        if key.is_empty() {
            continue;
        }
        match sanitized.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value.clone(),
            None => sanitized.push((key, value.clone())),
        }
    }

    if sanitized.is_empty() {
        sanitized.push(("row_data".to_string(), NO_VALID_DATA.to_string()));
    }

    sanitized
}

/// Analysis text for a sanitized row
pub fn derive_text(sanitized: &[(String, String)]) -> String {
    let content: Vec<&str> = sanitized
        .iter()
        .filter(|(key, _)| CONTENT_FIELDS.iter().any(|field| key.contains(field)))
        .map(|(_, value)| value.as_str())
        .collect();

    let text = if content.is_empty() {
        sanitized
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        content.join("\n\n")
    };

    if text.trim().is_empty() {
        NO_TEXT_PLACEHOLDER.to_string()
    } else {
        text
    }
}

/// Reject uploads that are not CSV by name
pub fn check_file_name(file_name: &str) -> Result<()> {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(Error::InvalidInput("Please upload a CSV file".to_string()))
    }
}

/// Parse a whole CSV upload; any parse error fails the import
pub fn parse_csv(bytes: &[u8], file_name: &str) -> Result<Vec<CsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    debug!("CSV {} headers: {:?}", file_name, headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let values: Vec<String> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();

        let sanitized = sanitize_row(&headers, &values);
        let text = derive_text(&sanitized);

        let mut data: BTreeMap<String, String> = sanitized.into_iter().collect();
        for (header, value) in headers.iter().zip(values.iter()) {
            data.insert(header.clone(), value.clone());
        }

        rows.push(CsvRow {
            row_index: rows.len() + 1,
            data,
            text,
            original_headers: headers.clone(),
            file_name: file_name.to_string(),
        });
    }

    if rows.is_empty() {
        return Err(Error::InvalidInput("CSV file has no data".to_string()));
    }

    info!("Parsed {} rows from {}", rows.len(), file_name);
    Ok(rows)
}
