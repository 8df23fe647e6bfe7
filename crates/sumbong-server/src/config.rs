//! Process configuration from environment variables.
//!
//! Optional settings fall back to a logged default. Secrets (JWT keys,
//! pepper, API keys, database password) can be given inline or through
//! a `<NAME>_FILE` variable pointing at a mounted secret file.

use std::env;
use std::fmt::Display;
use std::fs::read_to_string;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use sumbong_auth::AuthConfig;
use sumbong_db::DbConfig;
use sumbong_realtime::RealtimeConfig;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("cannot read secret file {path} for {key}: {source}")]
    SecretFile {
        key: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Origins allowed by CORS, typically the web client.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_origins: vec!["http://localhost:5173".into()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// JSON endpoint of the transactional email API.
    pub api_url: String,
    /// Without a key, emails are only logged.
    pub api_key: Option<String>,
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com/emails".into(),
            api_key: None,
            from: "Sumbong <no-reply@sumbong.local>".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Google sign-in is disabled when unset.
    pub google_client_id: Option<String>,
    pub google_tokeninfo_url: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            google_client_id: None,
            google_tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub oauth: OAuthConfig,
    pub realtime: RealtimeConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from any key/value lookup.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let src = Source { lookup };
        let defaults = Config::default();

        let server = ServerConfig {
            bind_addr: src.parsed("SUMBONG_BIND_ADDR", defaults.server.bind_addr)?,
            cors_origins: match src.var("SUMBONG_CORS_ORIGINS") {
                Some(list) => list
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect(),
                None => defaults.server.cors_origins,
            },
        };

        let db = DbConfig {
            endpoint: src.parsed("SUMBONG_DB_ENDPOINT", defaults.db.endpoint)?,
            namespace: src.parsed("SUMBONG_DB_NAMESPACE", defaults.db.namespace)?,
            database: src.parsed("SUMBONG_DB_DATABASE", defaults.db.database)?,
            username: src.var("SUMBONG_DB_USERNAME").or(defaults.db.username),
            password: src.secret("SUMBONG_DB_PASSWORD")?.or(defaults.db.password),
        };

        let auth = AuthConfig {
            jwt_private_key_pem: src.required_secret("SUMBONG_JWT_PRIVATE_KEY")?,
            jwt_public_key_pem: src.required_secret("SUMBONG_JWT_PUBLIC_KEY")?,
            session_lifetime_secs: src.parsed(
                "SUMBONG_SESSION_LIFETIME_SECS",
                defaults.auth.session_lifetime_secs,
            )?,
            jwt_issuer: src.parsed("SUMBONG_JWT_ISSUER", defaults.auth.jwt_issuer)?,
            pepper: src.secret("SUMBONG_PASSWORD_PEPPER")?,
            app_base_url: src
                .parsed("SUMBONG_APP_BASE_URL", defaults.auth.app_base_url)?
                .trim_end_matches('/')
                .to_string(),
            ..defaults.auth
        };

        let mail = MailConfig {
            api_url: src.parsed("SUMBONG_MAIL_API_URL", defaults.mail.api_url)?,
            api_key: src.secret("SUMBONG_MAIL_API_KEY")?,
            from: src.parsed("SUMBONG_MAIL_FROM", defaults.mail.from)?,
        };

        let oauth = OAuthConfig {
            google_client_id: src.var("SUMBONG_GOOGLE_CLIENT_ID"),
            google_tokeninfo_url: src.parsed(
                "SUMBONG_GOOGLE_TOKENINFO_URL",
                defaults.oauth.google_tokeninfo_url,
            )?,
        };

        let heartbeat_secs: u64 = src.parsed(
            "SUMBONG_HEARTBEAT_SECS",
            defaults.realtime.heartbeat_interval.as_secs(),
        )?;
        let buffer_size: usize =
            src.parsed("SUMBONG_STREAM_BUFFER", defaults.realtime.buffer_size)?;
        if heartbeat_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SUMBONG_HEARTBEAT_SECS",
                reason: "must be at least 1".into(),
            });
        }
        if buffer_size == 0 {
            return Err(ConfigError::Invalid {
                key: "SUMBONG_STREAM_BUFFER",
                reason: "must be at least 1".into(),
            });
        }
        let realtime = RealtimeConfig {
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            buffer_size,
        };

        Ok(Self {
            server,
            db,
            auth,
            mail,
            oauth,
            realtime,
        })
    }
}

struct Source<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Source<F> {
    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Display,
        T::Err: Display,
    {
        match self.var(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }),
            None => {
                info!("{key} not set, using default: {default}");
                Ok(default)
            }
        }
    }

    /// `<key>_FILE` wins over `<key>`.
    fn secret(&self, key: &'static str) -> Result<Option<String>, ConfigError> {
        if let Some(path) = self.var(&format!("{key}_FILE")) {
            let value = read_to_string(&path).map_err(|source| ConfigError::SecretFile {
                key,
                path: path.clone(),
                source,
            })?;
            return Ok(Some(value.trim().to_string()).filter(|v| !v.is_empty()));
        }
        Ok(self.var(key))
    }

    fn required_secret(&self, key: &'static str) -> Result<String, ConfigError> {
        self.secret(key)?.ok_or(ConfigError::Missing(key))
    }
}
