//! Reading a worksheet back as a list of records.

use indexmap::IndexMap;
use tracing::debug;

use crate::sheets::types::{cell_text, ValueRange};
use crate::sheets::{SheetsApi, SheetsError, SheetsResult};

/// One data row keyed by header.
pub type Record = IndexMap<String, serde_json::Value>;

/// How to find a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetRef {
    /// The id from the spreadsheet URL.
    Key(String),
    /// The spreadsheet title, looked up through Drive.
    Title(String),
}

/// Resolve a spreadsheet reference to its id.
pub async fn resolve_spreadsheet<A: SheetsApi + ?Sized>(
    api: &A,
    spreadsheet: &SpreadsheetRef,
) -> SheetsResult<String> {
    match spreadsheet {
        SpreadsheetRef::Key(key) => Ok(key.clone()),
        SpreadsheetRef::Title(title) => api
            .find_spreadsheet_by_title(title)
            .await?
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(title.clone())),
    }
}

/// Read every record of the worksheet at `worksheet_index` (zero-based).
///
/// The first row is the header. Numeric-looking cells come back as numbers.
pub async fn read_sheet<A: SheetsApi + ?Sized>(
    api: &A,
    spreadsheet: &SpreadsheetRef,
    worksheet_index: usize,
) -> SheetsResult<Vec<Record>> {
    let spreadsheet_id = resolve_spreadsheet(api, spreadsheet).await?;
    let metadata = api.spreadsheet_metadata(&spreadsheet_id).await?;

    let mut sheets: Vec<_> = metadata.sheets.iter().map(|s| &s.properties).collect();
    sheets.sort_by_key(|p| p.index);
    let props = sheets
        .get(worksheet_index)
        .ok_or(SheetsError::WorksheetNotFound(worksheet_index))?;

    let range = api.get_values(&spreadsheet_id, &props.full_range()).await?;
    let records = records_from_values(&range);
    debug!(
        "Read {} records from sheet {:?} of spreadsheet {}",
        records.len(),
        props.title,
        spreadsheet_id
    );
    Ok(records)
}

/// Turn a value grid into records keyed by the first row.
///
/// Short rows are padded with empty strings. Cells past the last header are
/// dropped. A repeated header keeps the rightmost value.
pub fn records_from_values(range: &ValueRange) -> Vec<Record> {
    let Some((header_row, rows)) = range.values.split_first() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_row.iter().map(cell_text).collect();

    rows.iter()
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let value = row.get(idx).map(numericise).unwrap_or_else(empty_cell);
                    (header.clone(), value)
                })
                .collect()
        })
        .collect()
}

fn empty_cell() -> serde_json::Value {
    serde_json::Value::String(String::new())
}

/// Convert numeric text to a JSON number; leave everything else alone.
pub fn numericise(value: &serde_json::Value) -> serde_json::Value {
    let serde_json::Value::String(text) = value else {
        return value.clone();
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return value.clone();
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return serde_json::Value::from(n);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return serde_json::Value::Number(n);
        }
    }
    value.clone()
}
