//! Google service account keys and the JWT bearer grant.

use std::fmt;
use std::path::Path;

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sheets::{SheetsError, SheetsResult};

/// Scopes needed to read and write spreadsheets and to find them by title.
pub const SHEETS_SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service account JSON key that the token exchange needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[redacted]")
            .field("token_uri", &self.token_uri)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
}

impl ServiceAccountKey {
    /// Parse a service account key from its JSON text.
    pub fn from_json(input: &str) -> SheetsResult<Self> {
        serde_json::from_str(input).map_err(|e| {
            SheetsError::Credentials(format!("Failed to parse service account key: {}", e))
        })
    }

    /// Read and parse a service account key file.
    pub async fn from_file(path: &Path) -> SheetsResult<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            SheetsError::Credentials(format!(
                "Failed to read service account key {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Build and sign the JWT assertion for the bearer grant.
    pub fn signed_assertion(&self, scope: &str, now: DateTime<Utc>) -> SheetsResult<String> {
        let iat = now.timestamp();
        let exp = (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp();

        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.private_key_id.as_deref(),
        };
        let claims = JwtClaims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            exp,
            iat,
        };

        let header_b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let claims_b64 = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let key_pair = self.key_pair()?;

        // PKCS#1 v1.5 with SHA-256 (RS256)
        let mut signature = vec![0; key_pair.public().modulus_len()];
        key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| SheetsError::Credentials("Failed to sign JWT assertion".to_string()))?;

        Ok(format!(
            "{}.{}",
            signing_input,
            BASE64_URL_SAFE_NO_PAD.encode(&signature)
        ))
    }

    fn key_pair(&self) -> SheetsResult<RsaKeyPair> {
        let mut reader = std::io::Cursor::new(self.private_key.as_bytes());
        let item = rustls_pemfile::read_one(&mut reader).map_err(|e| {
            SheetsError::Credentials(format!("Invalid PEM private key: {}", e))
        })?;

        match item {
            Some(rustls_pemfile::Item::Pkcs8Key(der)) => {
                RsaKeyPair::from_pkcs8(der.secret_pkcs8_der()).map_err(|e| {
                    SheetsError::Credentials(format!("Invalid PKCS#8 RSA key: {}", e))
                })
            }
            Some(rustls_pemfile::Item::Pkcs1Key(der)) => {
                RsaKeyPair::from_der(der.secret_pkcs1_der()).map_err(|e| {
                    SheetsError::Credentials(format!("Invalid PKCS#1 RSA key: {}", e))
                })
            }
            _ => Err(SheetsError::Credentials(
                "No RSA private key found in service account key".to_string(),
            )),
        }
    }

    /// Exchange a freshly signed assertion for an access token.
    pub async fn fetch_access_token(
        &self,
        client: &Client,
        scope: &str,
    ) -> SheetsResult<AccessToken> {
        let assertion = self.signed_assertion(scope, Utc::now())?;
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        debug!("Requesting access token for {}", self.client_email);
        let resp = client.post(&self.token_uri).form(&params).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!(
                "Token exchange failed with HTTP {}: {}",
                status, body
            )));
        }

        Ok(resp.json().await?)
    }
}
