//! Google sign-in: ID token verification through the tokeninfo
//! endpoint.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sumbong_auth::OAuthProfile;
use sumbong_core::error::{SumbongError, SumbongResult};
use tracing::debug;

use crate::config::OAuthConfig;
use crate::error::UpstreamError;

const SERVICE: &str = "Google tokeninfo";

/// Turns a provider ID token into a verified profile.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, id_token: &str) -> impl Future<Output = SumbongResult<OAuthProfile>> + Send;
}

fn rejected(code: &'static str, reason: &str) -> SumbongError {
    SumbongError::AuthenticationFailed {
        code,
        reason: reason.into(),
    }
}

/// Google encodes some booleans as `"true"` strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => s == "true",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<Flag>,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

fn profile_from(info: TokenInfo, client_id: &str) -> SumbongResult<OAuthProfile> {
    if info.aud != client_id {
        return Err(rejected(
            "OAUTH_TOKEN_INVALID",
            "Google token was issued for another application",
        ));
    }
    let Some(email) = info.email else {
        return Err(rejected(
            "OAUTH_TOKEN_INVALID",
            "Google token carries no email address",
        ));
    };
    if !info.email_verified.as_ref().is_some_and(Flag::is_true) {
        return Err(rejected(
            "OAUTH_EMAIL_UNVERIFIED",
            "Google has not verified this email address",
        ));
    }

    let first_name = info
        .given_name
        .or(info.name)
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
    Ok(OAuthProfile {
        email,
        first_name,
        last_name: info.family_name.unwrap_or_default(),
        picture: info.picture,
    })
}

pub struct GoogleIdentityVerifier {
    client: Client,
    client_id: String,
    tokeninfo_url: String,
}

impl GoogleIdentityVerifier {
    /// `None` when no client id is configured.
    pub fn from_config(config: &OAuthConfig) -> SumbongResult<Option<Self>> {
        let Some(client_id) = config.google_client_id.clone() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;
        Ok(Some(Self {
            client,
            client_id,
            tokeninfo_url: config.google_tokeninfo_url.clone(),
        }))
    }
}

impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, id_token: &str) -> SumbongResult<OAuthProfile> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST => {
                return Err(rejected(
                    "OAUTH_TOKEN_INVALID",
                    "Google token is invalid or expired",
                ));
            }
            status => {
                return Err(UpstreamError::Status {
                    service: SERVICE,
                    status: status.as_u16(),
                }
                .into());
            }
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        debug!(email = ?info.email, "google token verified");
        profile_from(info, &self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(json: serde_json::Value) -> TokenInfo {
        serde_json::from_value(json).unwrap()
    }

    fn code(err: SumbongError) -> &'static str {
        match err {
            SumbongError::AuthenticationFailed { code, .. } => code,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn verified_profile_is_accepted() {
        let profile = profile_from(
            info(serde_json::json!({
                "aud": "client-1",
                "email": "jose@example.com",
                "email_verified": "true",
                "given_name": "Jose",
                "family_name": "Rizal",
                "picture": "https://lh3.example.com/a.jpg",
            })),
            "client-1",
        )
        .unwrap();
        assert_eq!(profile.email, "jose@example.com");
        assert_eq!(profile.first_name, "Jose");
        assert_eq!(profile.last_name, "Rizal");
    }

    #[test]
    fn boolean_flag_is_accepted() {
        let profile = profile_from(
            info(serde_json::json!({
                "aud": "client-1",
                "email": "ana@example.com",
                "email_verified": true,
            })),
            "client-1",
        )
        .unwrap();
        assert_eq!(profile.first_name, "ana");
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let err = profile_from(
            info(serde_json::json!({
                "aud": "someone-else",
                "email": "jose@example.com",
                "email_verified": "true",
            })),
            "client-1",
        )
        .unwrap_err();
        assert_eq!(code(err), "OAUTH_TOKEN_INVALID");
    }

    #[test]
    fn unverified_email_is_rejected() {
        let err = profile_from(
            info(serde_json::json!({
                "aud": "client-1",
                "email": "jose@example.com",
                "email_verified": "false",
            })),
            "client-1",
        )
        .unwrap_err();
        assert_eq!(code(err), "OAUTH_EMAIL_UNVERIFIED");
    }
}
