//! # Keyword Audit Common Library
//!
//! Shared code for the keyword audit service including:
//! - Analysis result model (AnalysisResult, evidence spans, confidence)
//! - CSV upload normalization
//! - Match-source (section) attribution
//! - Evidence relocation and keyword highlighting
//! - Result filtering, sorting and CSV export
//! - Analysis backend client and sequential audit runner
//! - AI rewrite suggestion requests
//! - Session token handling and durable storage
//! - Configuration loading

pub mod attribution;
pub mod audit;
pub mod client;
pub mod config;
pub mod csv_rows;
pub mod db;
pub mod error;
pub mod export;
pub mod highlight;
pub mod model;
pub mod results;
pub mod session;
pub mod suggestions;
pub mod time;

pub use error::{Error, Result};
pub use model::{AnalysisResult, Confidence, ContentType, HighlightedSection, SearchType};
