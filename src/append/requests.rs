//! Builders for the batchUpdate requests an append needs.

use chrono_tz::Tz;

use crate::sheets::types::{
    AppendCellsRequest, AppendDimensionRequest, CellData, Dimension, ExtendedValue,
    GridCoordinate, Request, RowData, UpdateCellsRequest,
};
use crate::value::CellValue;

/// Grow the sheet by `num_columns` columns on the right.
pub fn add_columns_request(sheet_id: i64, num_columns: usize) -> Request {
    Request::AppendDimension(AppendDimensionRequest {
        sheet_id,
        dimension: Dimension::Columns,
        length: num_columns,
    })
}

/// Overwrite row 1 with `headers`, starting at column A.
pub fn update_headers_request(sheet_id: i64, headers: &[String]) -> Request {
    let values = headers
        .iter()
        .map(|h| CellData {
            user_entered_format: None,
            user_entered_value: ExtendedValue::StringValue(h.clone()),
        })
        .collect();

    Request::UpdateCells(UpdateCellsRequest {
        rows: vec![RowData { values }],
        start: GridCoordinate {
            sheet_id,
            row_index: 0,
            column_index: 0,
        },
        fields: "*".to_string(),
    })
}

/// Append one row after the last row with data.
///
/// `None` cells are columns this row has no value for; they are written as
/// empty strings.
pub fn append_row_request(sheet_id: i64, values: &[Option<&CellValue>], tz: &Tz) -> Request {
    let values = values
        .iter()
        .map(|v| v.unwrap_or(&CellValue::Null).to_cell_data(tz))
        .collect();

    Request::AppendCells(AppendCellsRequest {
        sheet_id,
        rows: vec![RowData { values }],
        fields: "*".to_string(),
    })
}
