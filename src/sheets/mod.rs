//! Google Sheets API access.

mod api;
mod client;
pub mod types;

pub use api::{SheetsApi, SheetsError, SheetsResult};
pub use client::{SheetsClient, DEFAULT_DRIVE_ENDPOINT, DEFAULT_SHEETS_ENDPOINT};
