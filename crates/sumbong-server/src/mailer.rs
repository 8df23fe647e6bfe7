//! Outbound email delivery.
//!
//! [`HttpMailer`] posts `{from, to, subject, html}` to a transactional
//! email API with a bearer key. [`LogMailer`] only logs, for local
//! development without an API key.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use sumbong_core::error::{SumbongError, SumbongResult};
use sumbong_core::notifier::{Mailer, OutgoingEmail};
use tracing::{debug, info};

use crate::config::MailConfig;
use crate::error::UpstreamError;

const SERVICE: &str = "email API";

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }

    async fn post(&self, email: &OutgoingEmail) -> Result<(), UpstreamError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from,
                to: [email.to.as_str()],
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> SumbongResult<()> {
        self.post(&email).await?;
        debug!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> SumbongResult<()> {
        // Bodies carry single-use links; keep them out of info logs.
        info!(
            to = %email.to,
            subject = %email.subject,
            "email delivery disabled, logging instead"
        );
        debug!(to = %email.to, body = %email.html, "undelivered email body");
        Ok(())
    }
}

/// The mailer chosen at startup.
#[derive(Clone)]
pub enum AppMailer {
    Http(HttpMailer),
    Log(LogMailer),
}

impl AppMailer {
    pub fn from_config(config: &MailConfig) -> SumbongResult<Self> {
        match &config.api_key {
            Some(key) => Ok(Self::Http(
                HttpMailer::new(config.api_url.clone(), key.clone(), config.from.clone())
                    .map_err(SumbongError::from)?,
            )),
            None => {
                info!("no mail API key configured, emails will be logged");
                Ok(Self::Log(LogMailer))
            }
        }
    }
}

impl Mailer for AppMailer {
    async fn send(&self, email: OutgoingEmail) -> SumbongResult<()> {
        match self {
            Self::Http(mailer) => mailer.send(email).await,
            Self::Log(mailer) => mailer.send(email).await,
        }
    }
}
