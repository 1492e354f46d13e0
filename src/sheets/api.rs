//! Pluggable trait for the spreadsheet API.
//!
//! The appender and record reader only talk to this trait, so the REST
//! client can be swapped for an in-memory spreadsheet in tests.

use async_trait::async_trait;

use super::types::{BatchUpdateRequest, BatchUpdateResponse, SpreadsheetMetadata, ValueRange};

/// Result type for spreadsheet operations.
pub type SheetsResult<T> = Result<T, SheetsError>;

/// Errors from spreadsheet operations.
///
/// Transport and API failures are passed through as-is; nothing here is
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Invalid credentials: {0}")]
    Credentials(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Sheet {0} not found in spreadsheet")]
    UnknownSheet(i64),
    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),
    #[error("Worksheet index {0} out of range")]
    WorksheetNotFound(usize),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Trait for spreadsheet API backends.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Fetch spreadsheet properties and the list of sheets.
    async fn spreadsheet_metadata(&self, spreadsheet_id: &str)
        -> SheetsResult<SpreadsheetMetadata>;

    /// Fetch several A1 ranges in one call. Results are in request order.
    async fn batch_get_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> SheetsResult<Vec<ValueRange>>;

    /// Fetch a single A1 range.
    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> SheetsResult<ValueRange>;

    /// Apply a batch of structural and cell updates atomically.
    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        body: &BatchUpdateRequest,
    ) -> SheetsResult<BatchUpdateResponse>;

    /// Find a spreadsheet id by its title.
    async fn find_spreadsheet_by_title(&self, title: &str) -> SheetsResult<Option<String>>;
}

#[async_trait]
impl<T: SheetsApi + ?Sized> SheetsApi for std::sync::Arc<T> {
    async fn spreadsheet_metadata(
        &self,
        spreadsheet_id: &str,
    ) -> SheetsResult<SpreadsheetMetadata> {
        (**self).spreadsheet_metadata(spreadsheet_id).await
    }

    async fn batch_get_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> SheetsResult<Vec<ValueRange>> {
        (**self).batch_get_values(spreadsheet_id, ranges).await
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> SheetsResult<ValueRange> {
        (**self).get_values(spreadsheet_id, range).await
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        body: &BatchUpdateRequest,
    ) -> SheetsResult<BatchUpdateResponse> {
        (**self).batch_update(spreadsheet_id, body).await
    }

    async fn find_spreadsheet_by_title(&self, title: &str) -> SheetsResult<Option<String>> {
        (**self).find_spreadsheet_by_title(title).await
    }
}
