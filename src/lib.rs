//! sheetappend - batch row appends into Google Sheets.
//!
//! Rows are plain field/value maps. Field names are matched against the
//! target sheet's header row by name; unknown fields become new columns.
//! A whole batch, across any number of sheets in one spreadsheet, is written
//! with a single `batchUpdate`.

pub mod append;
pub mod auth;
pub mod config;
pub mod records;
pub mod sheets;
pub mod value;

pub use append::{AppendRow, AppendSummary, GoogleSheetAppender};
pub use records::{read_sheet, Record, SpreadsheetRef};
pub use sheets::{SheetsApi, SheetsClient, SheetsError, SheetsResult};
pub use value::{CellValue, Row};
