//! Database seam for index operations
//!
//! The lifecycle only needs three server commands. `IndexBackend` names
//! them so the manager can run against a real deployment or an in-memory
//! stand-in.

use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::{Client, options::ClientOptions};
use mongostate_core::{ClientConfig, IndexIdentity, MongostateError, Result};
use std::time::Duration;

/// Server error code for a missing database or collection
pub const NAMESPACE_NOT_FOUND: i32 = 26;

/// Server error code for dropping an index that does not exist
pub const INDEX_NOT_FOUND: i32 = 27;

/// Failure reported by a backend, with the server error code when there is one
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub code: Option<i32>,
    pub message: String,
}

impl BackendError {
    /// Error carrying a server error code
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Error without a server error code
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// The database or collection does not exist
    pub fn is_namespace_not_found(&self) -> bool {
        self.code == Some(NAMESPACE_NOT_FOUND)
    }

    /// The named index does not exist
    pub fn is_index_not_found(&self) -> bool {
        self.code == Some(INDEX_NOT_FOUND)
    }

    /// Wrap as a database error for an operation on `identity`
    pub fn into_database(self, operation: &'static str, identity: &IndexIdentity) -> MongostateError {
        let message = match self.code {
            Some(code) => format!("{} (code {})", self.message, code),
            None => self.message,
        };
        MongostateError::Database {
            operation,
            identity: identity.clone(),
            message,
        }
    }
}

impl From<mongodb::error::Error> for BackendError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Command(command) => Self::with_code(command.code, command.message.clone()),
            _ => Self::other(err.to_string()),
        }
    }
}

/// The server commands the index lifecycle is built on
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Run `createIndexes` with a single index description
    async fn create_indexes(
        &self,
        database: &str,
        collection: &str,
        index: Document,
    ) -> std::result::Result<(), BackendError>;

    /// Run `listIndexes` and drain the cursor
    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> std::result::Result<Vec<Document>, BackendError>;

    /// Run `dropIndexes` for one index name
    async fn drop_index(
        &self,
        database: &str,
        collection: &str,
        name: &str,
    ) -> std::result::Result<(), BackendError>;
}

/// `IndexBackend` over the official MongoDB driver
#[derive(Clone)]
pub struct MongoBackend {
    client: Client,
}

impl MongoBackend {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from `config` and check the deployment answers a ping
    #[tracing::instrument(skip(config), fields(server = %config.redacted_connection_string()))]
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!("connecting to MongoDB");

        let connection_string = config.connection_string();
        let mut options = ClientOptions::parse(connection_string.as_str())
            .await
            .map_err(|e| MongostateError::Connection(format!("Failed to parse MongoDB options: {}", e)))?;

        let timeout = Duration::from_secs(u64::from(config.timeout_seconds));
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name = Some("mongostate".to_string());

        let client = Client::with_options(options)
            .map_err(|e| MongostateError::Connection(format!("Failed to create MongoDB client: {}", e)))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MongostateError::Connection(format!("Failed to connect to MongoDB: {}", e)))?;

        Ok(Self::new(client))
    }

    /// The underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl IndexBackend for MongoBackend {
    #[tracing::instrument(skip(self, index))]
    async fn create_indexes(
        &self,
        database: &str,
        collection: &str,
        index: Document,
    ) -> std::result::Result<(), BackendError> {
        let command = doc! {
            "createIndexes": collection,
            "indexes": [index],
        };
        let reply = self.client.database(database).run_command(command).await?;
        tracing::debug!(%reply, "createIndexes reply");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> std::result::Result<Vec<Document>, BackendError> {
        let cursor = self
            .client
            .database(database)
            .run_cursor_command(doc! { "listIndexes": collection })
            .await?;
        let indexes: Vec<Document> = cursor.try_collect().await?;
        tracing::debug!(count = indexes.len(), "listed indexes");
        Ok(indexes)
    }

    #[tracing::instrument(skip(self))]
    async fn drop_index(
        &self,
        database: &str,
        collection: &str,
        name: &str,
    ) -> std::result::Result<(), BackendError> {
        self.client
            .database(database)
            .run_command(doc! { "dropIndexes": collection, "index": name })
            .await?;
        Ok(())
    }
}
