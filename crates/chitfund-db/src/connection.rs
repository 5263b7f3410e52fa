//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Where the chit-fund data lives and how to sign in to it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Host and port of the WebSocket endpoint, e.g. `127.0.0.1:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "chitfund".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// An open, authenticated SurrealDB session scoped to one namespace
/// and database.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let connect_err = |source| DbError::Connection {
            url: config.url.clone(),
            source,
        };

        let db = Surreal::new::<Ws>(config.url.as_str())
            .await
            .map_err(connect_err)?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await
        .map_err(connect_err)?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connected to SurrealDB"
        );
        Ok(Self { db })
    }

    /// Connect and apply every pending schema migration.
    pub async fn connect_and_migrate(config: &DbConfig) -> Result<Self, DbError> {
        let manager = Self::connect(config).await?;
        run_migrations(&manager.db).await?;
        Ok(manager)
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
