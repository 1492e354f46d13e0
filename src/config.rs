//! Configuration management using the prefer crate.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::append::GoogleSheetAppender;
use crate::auth::{Credentials, ServiceAccountKey};
use crate::sheets::{
    SheetsClient, SheetsError, SheetsResult, DEFAULT_DRIVE_ENDPOINT, DEFAULT_SHEETS_ENDPOINT,
};

/// Google API configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Inline service account key JSON.
    #[serde(
        default,
        alias = "service account credentials",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_account_credentials: Option<String>,
    /// Path to a service account key file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_file: Option<String>,
    /// Pre-issued bearer token (skips the service account exchange).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Zone for zoned date-times when a spreadsheet reports none.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Sheets API base URL.
    #[serde(default = "default_sheets_endpoint")]
    pub sheets_endpoint: String,
    /// Drive API base URL.
    #[serde(default = "default_drive_endpoint")]
    pub drive_endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("GoogleConfig")
            .field(
                "service_account_credentials",
                &redact(&self.service_account_credentials),
            )
            .field("service_account_file", &self.service_account_file)
            .field("access_token", &redact(&self.access_token))
            .field("default_timezone", &self.default_timezone)
            .field("sheets_endpoint", &self.sheets_endpoint)
            .field("drive_endpoint", &self.drive_endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn default_timezone() -> String {
    "America/Vancouver".to_string()
}

fn default_sheets_endpoint() -> String {
    DEFAULT_SHEETS_ENDPOINT.to_string()
}

fn default_drive_endpoint() -> String {
    DEFAULT_DRIVE_ENDPOINT.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl GoogleConfig {
    /// Base default without env overrides.
    fn base_default() -> Self {
        Self {
            service_account_credentials: None,
            service_account_file: None,
            access_token: None,
            default_timezone: default_timezone(),
            sheets_endpoint: default_sheets_endpoint(),
            drive_endpoint: default_drive_endpoint(),
            request_timeout: default_request_timeout(),
        }
    }

    /// Check if the config equals the default (for skip_serializing_if).
    pub fn is_default(&self) -> bool {
        *self == Self::base_default()
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GOOGLE_SERVICE_ACCOUNT_CREDENTIALS`: inline service account JSON
    /// - `GOOGLE_APPLICATION_CREDENTIALS`: path to a service account key file
    /// - `GOOGLE_ACCESS_TOKEN`: pre-issued bearer token
    /// - `SHEETS_DEFAULT_TIMEZONE`: IANA zone name
    /// - `SHEETS_ENDPOINT`: Sheets API base URL
    /// - `SHEETS_REQUEST_TIMEOUT`: request timeout in seconds
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("GOOGLE_SERVICE_ACCOUNT_CREDENTIALS") {
            self.service_account_credentials = Some(val);
        }
        if let Ok(val) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            self.service_account_file = Some(val);
        }
        if let Ok(val) = std::env::var("GOOGLE_ACCESS_TOKEN") {
            self.access_token = Some(val);
        }
        if let Ok(val) = std::env::var("SHEETS_DEFAULT_TIMEZONE") {
            self.default_timezone = val;
        }
        if let Ok(val) = std::env::var("SHEETS_ENDPOINT") {
            self.sheets_endpoint = val;
        }
        if let Ok(val) = std::env::var("SHEETS_REQUEST_TIMEOUT") {
            if let Ok(n) = val.parse() {
                self.request_timeout = n;
            }
        }
        self
    }

    /// Parse the configured default time zone.
    pub fn timezone(&self) -> SheetsResult<Tz> {
        self.default_timezone.parse::<Tz>().map_err(|_| {
            SheetsError::Config(format!("Unknown time zone: {}", self.default_timezone))
        })
    }

    /// Resolve credentials: a bearer token wins, then inline JSON, then the
    /// key file (relative paths resolve against `base_dir`).
    pub async fn credentials(&self, base_dir: &Path) -> SheetsResult<Credentials> {
        if let Some(ref token) = self.access_token {
            return Ok(Credentials::Static(token.clone()));
        }
        if let Some(ref json) = self.service_account_credentials {
            return Ok(Credentials::ServiceAccount(ServiceAccountKey::from_json(
                json,
            )?));
        }
        if let Some(ref file) = self.service_account_file {
            let path = resolve_path(file, base_dir);
            return Ok(Credentials::ServiceAccount(
                ServiceAccountKey::from_file(&path).await?,
            ));
        }
        Err(SheetsError::Config(
            "No Google credentials configured. Set google.service_account_credentials, \
             google.service_account_file, or GOOGLE_APPLICATION_CREDENTIALS."
                .to_string(),
        ))
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Google API settings.
    #[serde(default, skip_serializing_if = "GoogleConfig::is_default")]
    pub google: GoogleConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers sheetappend config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("sheetappend").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("Ignoring config file {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found, use defaults with env overrides
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML, and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> SheetsResult<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SheetsError::Config(format!("Failed to read config file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| SheetsError::Config(format!("Failed to parse TOML config: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| SheetsError::Config(format!("Failed to parse YAML config: {}", e)))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| SheetsError::Config(format!("Failed to parse JSON config: {}", e)))?,
        };

        config.source_path = Some(path.to_path_buf());
        config.google = config.google.with_env_overrides();
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory, or the current directory.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Build an authenticated API client from this configuration.
    pub async fn sheets_client(&self) -> SheetsResult<SheetsClient> {
        let credentials = self.google.credentials(&self.base_dir()).await?;
        SheetsClient::with_endpoints(
            credentials,
            Duration::from_secs(self.google.request_timeout),
            &self.google.sheets_endpoint,
            &self.google.drive_endpoint,
        )
    }

    /// Build an appender backed by the REST client.
    pub async fn appender(&self) -> SheetsResult<GoogleSheetAppender<SheetsClient>> {
        let client = self.sheets_client().await?;
        Ok(GoogleSheetAppender::new(client).with_default_timezone(self.google.timezone()?))
    }
}

/// Resolve a path that may be relative to the config file.
/// - Absolute paths are returned as-is
/// - Paths starting with ~ are expanded
/// - Relative paths are resolved relative to `base_dir`
pub fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path_str);
    let path = Path::new(expanded.as_ref());

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_default() {
        let config = GoogleConfig::base_default();
        assert_eq!(config.default_timezone, "America/Vancouver");
        assert_eq!(config.sheets_endpoint, DEFAULT_SHEETS_ENDPOINT);
        assert_eq!(config.request_timeout, 30);
        assert!(config.is_default());
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::Vancouver);
    }

    #[test]
    fn test_unknown_timezone() {
        let mut config = GoogleConfig::base_default();
        config.default_timezone = "Mars/Olympus".to_string();
        assert!(matches!(config.timezone(), Err(SheetsError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = GoogleConfig::base_default();
        config.access_token = Some("ya29.secret".to_string());
        config.service_account_credentials = Some(r#"{"private_key": "pem"}"#.to_string());
        config.service_account_file = Some("key.json".to_string());

        let rendered = format!("{:?}", Config { google: config, source_path: None });
        assert!(!rendered.contains("ya29.secret"));
        assert!(!rendered.contains("private_key"));
        assert!(rendered.contains("key.json"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/etc/sheetappend");
        assert_eq!(
            resolve_path("key.json", base),
            PathBuf::from("/etc/sheetappend/key.json")
        );
        assert_eq!(
            resolve_path("/abs/key.json", base),
            PathBuf::from("/abs/key.json")
        );
    }

    #[tokio::test]
    async fn test_credentials_prefers_access_token() {
        let mut config = GoogleConfig::base_default();
        config.access_token = Some("tok".to_string());
        config.service_account_credentials = Some("{not json".to_string());
        let creds = config.credentials(Path::new(".")).await.unwrap();
        assert!(matches!(creds, Credentials::Static(ref t) if t == "tok"));
    }

    #[tokio::test]
    async fn test_credentials_inline_json() {
        let mut config = GoogleConfig::base_default();
        config.service_account_credentials =
            Some(r#"{"client_email": "a@b.c", "private_key": "k"}"#.to_string());
        let creds = config.credentials(Path::new(".")).await.unwrap();
        assert!(matches!(creds, Credentials::ServiceAccount(ref k) if k.client_email == "a@b.c"));
    }

    #[tokio::test]
    async fn test_credentials_missing() {
        let config = GoogleConfig::base_default();
        let err = config.credentials(Path::new(".")).await.unwrap_err();
        assert!(matches!(err, SheetsError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_toml_with_relative_key_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("key.json"),
            r#"{"client_email": "svc@proj.iam.gserviceaccount.com", "private_key": "k"}"#,
        )
        .unwrap();
        let config_path = dir.path().join("sheetappend.toml");
        std::fs::write(
            &config_path,
            "[google]\nservice_account_file = \"key.json\"\ndefault_timezone = \"Europe/Berlin\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_path).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(config_path.as_path()));
        assert_eq!(config.base_dir(), dir.path());
        assert_eq!(config.google.default_timezone, "Europe/Berlin");
        assert_eq!(config.google.request_timeout, 30);

        let creds = config.google.credentials(&config.base_dir()).await.unwrap();
        assert!(matches!(
            creds,
            Credentials::ServiceAccount(ref k) if k.client_email == "svc@proj.iam.gserviceaccount.com"
        ));
    }

    #[tokio::test]
    async fn test_load_json_with_spaced_key() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"google": {"service account credentials": "{}"}}"#,
        )
        .unwrap();

        let config = Config::load_from_path(&config_path).await.unwrap();
        assert!(config.google.service_account_credentials.is_some());
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "google: [unterminated").unwrap();

        let err = Config::load_from_path(&config_path).await.unwrap_err();
        assert!(err.to_string().contains("YAML"));
    }
}
