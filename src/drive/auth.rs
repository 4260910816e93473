// Google credentials. Parsed once at startup from the JSON blob and passed
// explicitly to the Drive client; the access token is cached here and
// re-minted when it is about to expire.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_SLACK_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialKey {
    ServiceAccount {
        client_email: String,
        private_key: String,
        #[serde(default)]
        token_uri: Option<String>,
    },
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        #[serde(default)]
        token_uri: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SLACK_SECS) < self.expires_at
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// The credential key plus the currently cached access token.
#[derive(Debug)]
pub struct DriveCredentials {
    key: CredentialKey,
    token: Mutex<Option<AccessToken>>,
}

impl DriveCredentials {
    pub fn from_json(json: &str) -> Result<Self> {
        let key: CredentialKey = serde_json::from_str(json).map_err(|e| {
            Error::Authentication(format!(
                "unsupported Google credential JSON ({e}); expected a service_account or authorized_user key"
            ))
        })?;
        Ok(DriveCredentials {
            key,
            token: Mutex::new(None),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Authentication(format!(
                "cannot read Google credentials at {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    /// A valid bearer token, minting a new one if none is cached or the
    /// cached one is about to expire.
    pub fn bearer(&self, http: &Client) -> Result<String> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| Error::Authentication("credential cache poisoned".into()))?;
        let now = Utc::now();
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }
        let token = self.mint(http, now)?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    fn mint(&self, http: &Client, now: DateTime<Utc>) -> Result<AccessToken> {
        let (token_uri, form) = match &self.key {
            CredentialKey::ServiceAccount {
                client_email,
                private_key,
                token_uri,
            } => {
                let uri = token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
                let assertion = signed_assertion(client_email, private_key, uri, now)?;
                debug!(%client_email, "requesting service account token");
                (
                    uri.to_string(),
                    vec![
                        ("grant_type", JWT_BEARER_GRANT.to_string()),
                        ("assertion", assertion),
                    ],
                )
            }
            CredentialKey::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
                token_uri,
            } => {
                if refresh_token.is_empty() {
                    return Err(Error::Authentication(
                        "authorized_user credentials have no refresh_token".into(),
                    ));
                }
                debug!(%client_id, "refreshing user token");
                (
                    token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI).to_string(),
                    vec![
                        ("grant_type", "refresh_token".to_string()),
                        ("client_id", client_id.clone()),
                        ("client_secret", client_secret.clone()),
                        ("refresh_token", refresh_token.clone()),
                    ],
                )
            }
        };

        let res = http.post(&token_uri).form(&form).send()?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(Error::Authentication(format!(
                "Google token endpoint answered {status}: {body}"
            )));
        }
        let parsed: TokenResponse = res.json()?;
        info!(expires_in = parsed.expires_in, "obtained Google access token");
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: now + Duration::seconds(parsed.expires_in),
        })
    }
}

fn signed_assertion(
    client_email: &str,
    private_key: &str,
    audience: &str,
    now: DateTime<Utc>,
) -> Result<String> {
    let claims = Claims {
        iss: client_email,
        scope: DRIVE_READONLY_SCOPE,
        aud: audience,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|e| Error::Authentication(format!("invalid service account private key: {e}")))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| Error::Authentication(format!("cannot sign token request: {e}")))
}
