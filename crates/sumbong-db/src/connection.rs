//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Endpoint with scheme, e.g. `ws://127.0.0.1:8000` or `mem://`.
    pub endpoint: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root credentials; `None` skips sign-in (embedded engines).
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000".into(),
            namespace: "sumbong".into(),
            database: "main".into(),
            username: Some("root".into()),
            password: Some("root".into()),
        }
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Signs in as root when credentials are configured, selects the
    /// namespace and database, and returns a ready-to-use manager.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = any::connect(config.endpoint.as_str()).await?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.clone(),
                password: password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}
