//! Credentials for the Google APIs.
//!
//! Service account keys are turned into short-lived OAuth tokens with the
//! JWT bearer grant; tokens are cached until shortly before they expire.

mod service_account;
mod token;

pub use service_account::{AccessToken, ServiceAccountKey, SHEETS_SCOPES};
pub use token::{Credentials, TokenProvider};
