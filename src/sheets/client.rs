//! REST client for the Sheets v4 and Drive v3 APIs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::api::{SheetsApi, SheetsError, SheetsResult};
use super::types::{
    ApiErrorEnvelope, BatchGetValuesResponse, BatchUpdateRequest, BatchUpdateResponse,
    DriveFileList, SpreadsheetMetadata, ValueRange,
};
use crate::auth::{Credentials, TokenProvider};

pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_DRIVE_ENDPOINT: &str = "https://www.googleapis.com/drive/v3";

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Only the metadata fields the appender and record reader look at.
const METADATA_FIELDS: &str =
    "spreadsheetId,properties(title,timeZone),sheets(properties(sheetId,title,index))";

/// Sheets API client authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    tokens: Arc<TokenProvider>,
    sheets_endpoint: String,
    drive_endpoint: String,
}

impl SheetsClient {
    /// Create a client against the public Google endpoints.
    pub fn new(credentials: Credentials, timeout: Duration) -> SheetsResult<Self> {
        Self::with_endpoints(
            credentials,
            timeout,
            DEFAULT_SHEETS_ENDPOINT,
            DEFAULT_DRIVE_ENDPOINT,
        )
    }

    /// Create a client against custom endpoints (proxies, emulators).
    pub fn with_endpoints(
        credentials: Credentials,
        timeout: Duration,
        sheets_endpoint: &str,
        drive_endpoint: &str,
    ) -> SheetsResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("sheetappend/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            tokens: Arc::new(TokenProvider::new(credentials, client.clone())),
            client,
            sheets_endpoint: sheets_endpoint.trim_end_matches('/').to_string(),
            drive_endpoint: drive_endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str, suffix: &str) -> SheetsResult<Url> {
        let url = format!(
            "{}/spreadsheets/{}{}",
            self.sheets_endpoint,
            urlencoding::encode(spreadsheet_id),
            suffix
        );
        Ok(Url::parse(&url)?)
    }

    /// Attach auth, send, and decode a JSON response.
    ///
    /// Non-2xx responses become [`SheetsError::Api`] carrying Google's error
    /// message when the body has one.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> SheetsResult<T> {
        let token = self.tokens.token().await?;
        let resp = request.bearer_auth(token).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        Ok(resp.json().await?)
    }
}

/// Map a failed response to [`SheetsError::Api`], preferring the message from
/// Google's error envelope over the raw body.
fn api_error(status: StatusCode, body: String) -> SheetsError {
    let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body,
    };
    SheetsError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn spreadsheet_metadata(
        &self,
        spreadsheet_id: &str,
    ) -> SheetsResult<SpreadsheetMetadata> {
        let mut url = self.spreadsheet_url(spreadsheet_id, "")?;
        url.query_pairs_mut().append_pair("fields", METADATA_FIELDS);

        debug!("Fetching metadata for spreadsheet {}", spreadsheet_id);
        self.send_json(self.client.get(url)).await
    }

    async fn batch_get_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> SheetsResult<Vec<ValueRange>> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = self.spreadsheet_url(spreadsheet_id, "/values:batchGet")?;
        {
            let mut query = url.query_pairs_mut();
            for range in ranges {
                query.append_pair("ranges", range);
            }
            query.append_pair("majorDimension", "ROWS");
        }

        debug!(
            "Fetching {} ranges from spreadsheet {}",
            ranges.len(),
            spreadsheet_id
        );
        let resp: BatchGetValuesResponse = self.send_json(self.client.get(url)).await?;
        Ok(resp.value_ranges)
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> SheetsResult<ValueRange> {
        let suffix = format!("/values/{}", urlencoding::encode(range));
        let mut url = self.spreadsheet_url(spreadsheet_id, &suffix)?;
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");

        debug!("Fetching range {} from spreadsheet {}", range, spreadsheet_id);
        self.send_json(self.client.get(url)).await
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        body: &BatchUpdateRequest,
    ) -> SheetsResult<BatchUpdateResponse> {
        let url = self.spreadsheet_url(spreadsheet_id, ":batchUpdate")?;

        debug!(
            "Sending {} update requests to spreadsheet {}",
            body.requests.len(),
            spreadsheet_id
        );
        self.send_json(self.client.post(url).json(body)).await
    }

    async fn find_spreadsheet_by_title(&self, title: &str) -> SheetsResult<Option<String>> {
        let mut url = Url::parse(&format!("{}/files", self.drive_endpoint))?;
        url.query_pairs_mut()
            .append_pair("q", &drive_title_query(title))
            .append_pair("fields", "files(id,name)")
            .append_pair("pageSize", "1")
            .append_pair("supportsAllDrives", "true")
            .append_pair("includeItemsFromAllDrives", "true");

        debug!("Searching Drive for spreadsheet titled {:?}", title);
        let list: DriveFileList = self.send_json(self.client.get(url)).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }
}

/// Drive search query matching a spreadsheet by exact title.
fn drive_title_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME_TYPE
    )
}
