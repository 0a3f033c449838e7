use chrono::{DateTime, Datelike, TimeDelta, Utc};
use oauth2::{
    basic::{BasicTokenResponse, BasicTokenType},
    AccessToken, RefreshToken, TokenResponse,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Tokens are treated as expired slightly ahead of their actual expiry.
const EXPIRY_SKEW_SECS: i64 = 10;

/// The cached OAuth credential.
///
/// The field order is the on-disk order, keep it stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: AccessToken,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

/// Caches written by other OAuth libraries store a zero timestamp for tokens without expiry.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|expiry| expiry.year() > 1))
}

impl Credential {
    /// Builds a credential from a token endpoint response.
    ///
    /// Refresh responses usually omit the refresh token, in which case `previous` is kept.
    pub fn from_token_response(
        response: &BasicTokenResponse,
        previous: Option<&RefreshToken>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let token_type = match response.token_type() {
            BasicTokenType::Bearer => bearer(),
            other => other.as_ref().to_string(),
        };
        let expiry = response
            .expires_in()
            .and_then(|expires_in| TimeDelta::from_std(expires_in).ok())
            .map(|expires_in| issued_at + expires_in);

        Self {
            access_token: response.access_token().clone(),
            token_type,
            refresh_token: response.refresh_token().or(previous).cloned(),
            expiry,
        }
    }

    /// A credential without expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - TimeDelta::seconds(EXPIRY_SKEW_SECS) <= now)
    }

    /// Encodes the credential as a single JSON line.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut json = serde_json::to_vec(self)?;
        json.push(b'\n');
        Ok(json)
    }
}
