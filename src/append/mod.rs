//! Batched row appends with header reconciliation.
//!
//! An append batch costs three API calls regardless of its size: spreadsheet
//! metadata, one `values:batchGet` for the header rows of every sheet
//! touched, and one `batchUpdate` carrying header changes first and row
//! appends after.

mod flatten;
mod headers;
mod requests;

pub use flatten::flatten;
pub use headers::SheetHeaders;
pub use requests::{add_columns_request, append_row_request, update_headers_request};

use std::collections::HashMap;

use chrono_tz::Tz;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::sheets::types::{BatchUpdateRequest, Request, SpreadsheetMetadata};
use crate::sheets::{SheetsApi, SheetsError, SheetsResult};
use crate::value::{CellValue, Row};

/// Zone used when the spreadsheet does not report one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Vancouver;

/// One row to append to one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendRow {
    /// Numeric sheet (tab) id, not its title or position.
    pub sheet_id: i64,
    pub data: Row,
}

impl AppendRow {
    pub fn new(sheet_id: i64, data: Row) -> Self {
        Self { sheet_id, data }
    }

    /// Set a field, keeping insertion order.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }
}

/// What an append batch changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendSummary {
    pub rows_appended: usize,
    /// New header names per sheet id, in column order.
    pub columns_added: HashMap<i64, Vec<String>>,
    /// Number of requests in the batchUpdate (0 when nothing was sent).
    pub requests_sent: usize,
}

/// Appends rows to a spreadsheet in as few requests as possible.
#[derive(Debug, Clone)]
pub struct GoogleSheetAppender<A> {
    api: A,
    default_timezone: Tz,
}

impl<A: SheetsApi> GoogleSheetAppender<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            default_timezone: DEFAULT_TIMEZONE,
        }
    }

    /// Zone used for zoned date-times when the spreadsheet has none set.
    pub fn with_default_timezone(mut self, tz: Tz) -> Self {
        self.default_timezone = tz;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Append every row in `batch`, adding header columns as needed.
    ///
    /// Rows may target different sheets of the same spreadsheet. Every
    /// referenced sheet must exist; otherwise nothing is written.
    pub async fn append_batch(
        &self,
        spreadsheet_id: &str,
        batch: &[AppendRow],
    ) -> SheetsResult<AppendSummary> {
        let metadata = self.api.spreadsheet_metadata(spreadsheet_id).await?;
        let tz = self.sheet_timezone(&metadata);

        let sheet_ids = unique_sheet_ids(batch);
        let ranges = sheet_ids
            .iter()
            .map(|id| {
                metadata
                    .sheet(*id)
                    .map(|p| p.header_range())
                    .ok_or(SheetsError::UnknownSheet(*id))
            })
            .collect::<SheetsResult<Vec<_>>>()?;

        let value_ranges = self.api.batch_get_values(spreadsheet_id, &ranges).await?;
        let mut headers: IndexMap<i64, SheetHeaders> = sheet_ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let existing = value_ranges
                    .get(i)
                    .map(|r| r.first_row_text())
                    .unwrap_or_default();
                (*id, SheetHeaders::new(existing))
            })
            .collect();

        let body = build_batch_update(&mut headers, batch, &tz);
        let summary = AppendSummary {
            rows_appended: batch.len(),
            columns_added: headers
                .iter()
                .filter(|(_, h)| h.has_added())
                .map(|(id, h)| (*id, h.added().to_vec()))
                .collect(),
            requests_sent: body.requests.len(),
        };

        if body.requests.is_empty() {
            debug!("Nothing to append to spreadsheet {}", spreadsheet_id);
            return Ok(summary);
        }

        self.api.batch_update(spreadsheet_id, &body).await?;

        info!(
            "Appended {} rows to spreadsheet {} ({} new columns)",
            summary.rows_appended,
            spreadsheet_id,
            summary.columns_added.values().map(Vec::len).sum::<usize>()
        );
        Ok(summary)
    }

    /// Current header row of one sheet.
    pub async fn headers(&self, spreadsheet_id: &str, sheet_id: i64) -> SheetsResult<Vec<String>> {
        let metadata = self.api.spreadsheet_metadata(spreadsheet_id).await?;
        let props = metadata
            .sheet(sheet_id)
            .ok_or(SheetsError::UnknownSheet(sheet_id))?;
        let range = self
            .api
            .get_values(spreadsheet_id, &props.header_range())
            .await?;
        Ok(range.first_row_text())
    }

    fn sheet_timezone(&self, metadata: &SpreadsheetMetadata) -> Tz {
        metadata
            .properties
            .time_zone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(self.default_timezone)
    }
}

/// Sheet ids in the order they first appear in the batch.
fn unique_sheet_ids(batch: &[AppendRow]) -> Vec<i64> {
    let mut ids = Vec::new();
    for row in batch {
        if !ids.contains(&row.sheet_id) {
            ids.push(row.sheet_id);
        }
    }
    ids
}

/// Lay out every row against its sheet's headers and assemble the update.
///
/// `headers` must hold an entry for every sheet id in `batch`; entries gain
/// any new field names as a side effect.
pub fn build_batch_update(
    headers: &mut IndexMap<i64, SheetHeaders>,
    batch: &[AppendRow],
    tz: &Tz,
) -> BatchUpdateRequest {
    let mut row_requests = Vec::with_capacity(batch.len());

    for row in batch {
        let sheet_headers = headers.entry(row.sheet_id).or_default();
        let mut ordered: Vec<Option<&CellValue>> = vec![None; sheet_headers.len()];

        for (field, value) in flatten(&row.data) {
            let idx = sheet_headers.position_or_insert(&field);
            if idx >= ordered.len() {
                ordered.resize(idx + 1, None);
            }
            ordered[idx] = Some(value);
        }

        row_requests.push(append_row_request(row.sheet_id, &ordered, tz));
    }

    let mut requests: Vec<Request> = Vec::new();
    for (sheet_id, sheet_headers) in headers.iter() {
        if sheet_headers.has_added() {
            requests.push(add_columns_request(*sheet_id, sheet_headers.added().len()));
            requests.push(update_headers_request(*sheet_id, sheet_headers.headers()));
        }
    }
    requests.extend(row_requests);

    BatchUpdateRequest::new(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::types::{AppendCellsRequest, ExtendedValue, UpdateCellsRequest};

    fn headers_for(entries: &[(i64, &[&str])]) -> IndexMap<i64, SheetHeaders> {
        entries
            .iter()
            .map(|(id, names)| {
                (
                    *id,
                    SheetHeaders::new(names.iter().map(|s| s.to_string()).collect()),
                )
            })
            .collect()
    }

    fn row_strings(request: &Request) -> Vec<String> {
        let Request::AppendCells(AppendCellsRequest { rows, .. }) = request else {
            panic!("expected appendCells, got {:?}", request);
        };
        rows[0]
            .values
            .iter()
            .map(|c| match &c.user_entered_value {
                ExtendedValue::StringValue(s) => s.clone(),
                ExtendedValue::NumberValue(n) => n.to_string(),
                ExtendedValue::BoolValue(b) => b.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_unique_sheet_ids_keeps_first_seen_order() {
        let batch = vec![
            AppendRow::new(3, Row::new()),
            AppendRow::new(1, Row::new()),
            AppendRow::new(3, Row::new()),
        ];
        assert_eq!(unique_sheet_ids(&batch), vec![3, 1]);
    }

    #[test]
    fn test_existing_headers_only_appends_rows() {
        let mut headers = headers_for(&[(0, &["name", "email"])]);
        let batch = vec![AppendRow::new(0, Row::new())
            .with("email", "ada@example.com")
            .with("name", "Ada")];

        let body = build_batch_update(&mut headers, &batch, &DEFAULT_TIMEZONE);
        assert_eq!(body.requests.len(), 1);
        assert_eq!(row_strings(&body.requests[0]), vec!["Ada", "ada@example.com"]);
    }

    #[test]
    fn test_new_fields_added_once_across_rows() {
        let mut headers = headers_for(&[(0, &["name"])]);
        let batch = vec![
            AppendRow::new(0, Row::new()).with("name", "Ada").with("phone", "1"),
            AppendRow::new(0, Row::new()).with("phone", "2").with("city", "Paris"),
        ];

        let body = build_batch_update(&mut headers, &batch, &DEFAULT_TIMEZONE);

        // appendDimension + updateCells, then two row appends
        assert_eq!(body.requests.len(), 4);
        assert_eq!(body.requests[0], add_columns_request(0, 2));
        let Request::UpdateCells(UpdateCellsRequest { rows, .. }) = &body.requests[1] else {
            panic!("expected updateCells");
        };
        let header_names: Vec<_> = rows[0]
            .values
            .iter()
            .map(|c| c.user_entered_value.clone())
            .collect();
        assert_eq!(
            header_names,
            vec![
                ExtendedValue::StringValue("name".to_string()),
                ExtendedValue::StringValue("phone".to_string()),
                ExtendedValue::StringValue("city".to_string()),
            ]
        );

        // The first row predates "city" and is shorter; the second fills the gap.
        assert_eq!(row_strings(&body.requests[2]), vec!["Ada", "1"]);
        assert_eq!(row_strings(&body.requests[3]), vec!["", "2", "Paris"]);
    }

    #[test]
    fn test_nested_fields_matched_against_existing_headers() {
        let mut headers = headers_for(&[(0, &["address[city]", "name"])]);
        let mut address = Row::new();
        address.insert("city".to_string(), "Oslo".into());
        let batch = vec![AppendRow::new(0, Row::new())
            .with("name", "Ada")
            .with("address", address)];

        let body = build_batch_update(&mut headers, &batch, &DEFAULT_TIMEZONE);
        assert_eq!(body.requests.len(), 1);
        assert_eq!(row_strings(&body.requests[0]), vec!["Oslo", "Ada"]);
    }

    #[test]
    fn test_sheets_reconciled_independently() {
        let mut headers = headers_for(&[(1, &["a"]), (2, &["b"])]);
        let batch = vec![
            AppendRow::new(1, Row::new()).with("b", 1i64),
            AppendRow::new(2, Row::new()).with("b", 2i64),
        ];

        let body = build_batch_update(&mut headers, &batch, &DEFAULT_TIMEZONE);

        // Only sheet 1 gains a column.
        assert_eq!(body.requests.len(), 4);
        assert_eq!(body.requests[0], add_columns_request(1, 1));
        assert_eq!(headers[&1].headers(), &["a", "b"]);
        assert_eq!(headers[&2].headers(), &["b"]);
        assert_eq!(row_strings(&body.requests[2]), vec!["", "1"]);
        assert_eq!(row_strings(&body.requests[3]), vec!["2"]);
    }

    #[test]
    fn test_empty_batch_has_no_requests() {
        let mut headers = IndexMap::new();
        let body = build_batch_update(&mut headers, &[], &DEFAULT_TIMEZONE);
        assert!(body.requests.is_empty());
    }
}
