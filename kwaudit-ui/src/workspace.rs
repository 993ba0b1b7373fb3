//! In-memory audit workspace
//!
//! Holds the current batch's result payloads, the table view state and the
//! most recently previewed CSV upload. Only result IDs are persisted; after a
//! restart the stored IDs come back as `stale_ids` until a new audit runs.

use kwaudit_common::attribution::match_source;
use kwaudit_common::csv_rows::CsvRow;
use kwaudit_common::export::{confidence_display, export_csv, CsvExport, LinkTemplates};
use kwaudit_common::results::{college_name, display_name, ResultView, SortField};
use kwaudit_common::{AnalysisResult, Result, SearchType};
use serde::Serialize;

/// CSV rows parsed by the preview endpoint, waiting to be audited
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvUpload {
    pub file_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

impl CsvUpload {
    pub fn new(file_name: &str, rows: Vec<CsvRow>) -> Self {
        let headers = rows
            .first()
            .map(|r| r.original_headers.clone())
            .unwrap_or_default();
        Self {
            file_name: file_name.to_string(),
            headers,
            rows,
        }
    }
}

/// One table row: the result plus its derived display columns
#[derive(Debug, Serialize)]
pub struct ResultRow<'a> {
    #[serde(flatten)]
    pub result: &'a AnalysisResult,
    pub status: &'static str,
    pub name: String,
    pub college: String,
    pub match_source: String,
    pub confidence: String,
}

impl<'a> ResultRow<'a> {
    pub fn new(result: &'a AnalysisResult) -> Self {
        Self {
            result,
            status: result.status(),
            name: display_name(result),
            college: college_name(result),
            match_source: match_source(result),
            confidence: confidence_display(result),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsPage<'a> {
    pub search_type: SearchType,
    pub view: &'a ResultView,
    pub total: usize,
    pub visible: usize,
    pub summary: String,
    pub results: Vec<ResultRow<'a>>,
    /// Persisted IDs whose payloads were lost on restart
    pub stale_ids: &'a [String],
}

#[derive(Debug, Default)]
pub struct AuditWorkspace {
    results: Vec<AnalysisResult>,
    search_type: SearchType,
    view: ResultView,
    csv_upload: Option<CsvUpload>,
    stale_ids: Vec<String>,
}

impl AuditWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace after a restart: the persisted IDs have no payloads
    pub fn with_stale_ids(stale_ids: Vec<String>) -> Self {
        Self {
            stale_ids,
            ..Self::default()
        }
    }

    /// Replace the current batch; the view filter resets, sort is kept
    pub fn install(&mut self, results: Vec<AnalysisResult>, search_type: SearchType) {
        self.results = results;
        self.search_type = search_type;
        self.view.filter = Default::default();
        self.stale_ids.clear();
    }

    /// Start over: results, view and pending upload are discarded
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn result_ids(&self) -> Vec<String> {
        self.results.iter().map(|r| r.id.clone()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&AnalysisResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn view(&self) -> &ResultView {
        &self.view
    }

    pub fn set_view(&mut self, view: ResultView) {
        self.view = view;
    }

    /// Column header click
    pub fn toggle_sort(&mut self, field: SortField) {
        self.view.sort.toggle(field);
    }

    pub fn visible(&self) -> Vec<&AnalysisResult> {
        self.view.apply(&self.results)
    }

    pub fn page(&self) -> ResultsPage<'_> {
        let visible = self.visible();
        ResultsPage {
            search_type: self.search_type,
            view: &self.view,
            total: self.results.len(),
            visible: visible.len(),
            summary: ResultView::summary(visible.len(), self.results.len()),
            results: visible.into_iter().map(ResultRow::new).collect(),
            stale_ids: &self.stale_ids,
        }
    }

    /// Encode the current filtered, sorted view
    pub fn export(&self, links: &LinkTemplates) -> Result<CsvExport> {
        export_csv(&self.visible(), links)
    }

    pub fn set_csv_upload(&mut self, upload: CsvUpload) {
        self.csv_upload = Some(upload);
    }

    pub fn csv_upload(&self) -> Option<&CsvUpload> {
        self.csv_upload.as_ref()
    }
}
