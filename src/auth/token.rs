//! Access token caching.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;

use super::service_account::{ServiceAccountKey, SHEETS_SCOPES};
use crate::sheets::SheetsResult;

/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Where bearer tokens come from.
#[derive(Clone)]
pub enum Credentials {
    /// Signed JWT exchanged for short-lived tokens.
    ServiceAccount(ServiceAccountKey),
    /// A pre-issued bearer token, used as-is.
    Static(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ServiceAccount(key) => {
                f.debug_tuple("ServiceAccount").field(key).finish()
            }
            Credentials::Static(_) => f.debug_tuple("Static").field(&"[redacted]").finish(),
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Hands out bearer tokens, fetching a new one only when the cached token
/// is about to expire.
#[derive(Debug)]
pub struct TokenProvider {
    credentials: Credentials,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(credentials: Credentials, client: Client) -> Self {
        Self {
            credentials,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Get a valid bearer token.
    pub async fn token(&self) -> SheetsResult<String> {
        let key = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };

        // Held across the exchange so only one refresh runs at a time.
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(tok) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(tok.token.clone());
        }

        let fetched = key.fetch_access_token(&self.client, SHEETS_SCOPES).await?;
        debug!("Fetched access token valid for {}s", fetched.expires_in);

        let expires_at = now + Duration::seconds(fetched.expires_in as i64);
        *cached = Some(CachedToken {
            token: fetched.access_token.clone(),
            expires_at,
        });
        Ok(fetched.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_token_freshness() {
        let now = Utc::now();
        let tok = CachedToken {
            token: "t".to_string(),
            expires_at: now + Duration::seconds(3600),
        };
        assert!(tok.is_fresh(now));
        assert!(!tok.is_fresh(now + Duration::seconds(3550)));
        assert!(!tok.is_fresh(now + Duration::seconds(4000)));
    }

    #[tokio::test]
    async fn test_debug_redacts_tokens() {
        let provider =
            TokenProvider::new(Credentials::Static("secret-token".to_string()), Client::new());
        provider.token().await.unwrap();
        let rendered = format!("{:?}", provider);
        assert!(rendered.contains("Static(\"[redacted]\")"));
        assert!(!rendered.contains("secret-token"));

        let cached = CachedToken {
            token: "ya29.secret".to_string(),
            expires_at: Utc::now(),
        };
        assert!(!format!("{:?}", cached).contains("ya29"));
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = TokenProvider::new(Credentials::Static("abc".to_string()), Client::new());
        assert_eq!(provider.token().await.unwrap(), "abc");
        assert_eq!(provider.token().await.unwrap(), "abc");
    }
}
