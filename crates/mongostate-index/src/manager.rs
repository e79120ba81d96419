//! Index lifecycle over an `IndexBackend`

use crate::backend::IndexBackend;
use crate::normalize::normalize;
use crate::reconcile::reconcile;
use mongostate_core::{Index, IndexIdentity, Result};

/// Create, read, delete and replace indexes.
///
/// Holds no mutable state, so one manager can be shared across tasks.
pub struct IndexManager<B> {
    backend: B,
}

impl<B: IndexBackend> IndexManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend commands are sent through
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create the index and return it as the server now reports it
    #[tracing::instrument(skip(self, index), fields(index = %index.identity))]
    pub async fn create(&self, index: &Index) -> Result<Index> {
        let command = normalize(index)?;
        let identity = &index.identity;

        self.backend
            .create_indexes(
                &identity.database,
                &identity.collection,
                command.to_index_document(&identity.name),
            )
            .await
            .map_err(|e| e.into_database("create index", identity))?;

        tracing::info!(kind = %command.kind(), "index created");
        self.read(identity).await
    }

    /// Read the index back in declared shape.
    ///
    /// A missing collection reads as an empty listing, so both a missing
    /// collection and a missing index end in `NotFound`.
    #[tracing::instrument(skip(self, identity), fields(index = %identity))]
    pub async fn read(&self, identity: &IndexIdentity) -> Result<Index> {
        let indexes = match self
            .backend
            .list_indexes(&identity.database, &identity.collection)
            .await
        {
            Ok(indexes) => indexes,
            Err(e) if e.is_namespace_not_found() => {
                tracing::debug!("collection does not exist");
                Vec::new()
            }
            Err(e) => return Err(e.into_database("read index", identity)),
        };

        reconcile(&indexes, identity)
    }

    /// Drop the index. Dropping an index or collection that is already gone
    /// succeeds.
    #[tracing::instrument(skip(self, identity), fields(index = %identity))]
    pub async fn delete(&self, identity: &IndexIdentity) -> Result<()> {
        match self
            .backend
            .drop_index(&identity.database, &identity.collection, &identity.name)
            .await
        {
            Ok(()) => {
                tracing::info!("index dropped");
                Ok(())
            }
            Err(e) if e.is_index_not_found() || e.is_namespace_not_found() => {
                tracing::debug!(error = %e, "index already absent");
                Ok(())
            }
            Err(e) => Err(e.into_database("delete index", identity)),
        }
    }

    /// Drop and recreate. Every index attribute forces a replacement, so this
    /// is the only form of update.
    #[tracing::instrument(skip(self, index), fields(index = %index.identity))]
    pub async fn replace(&self, index: &Index) -> Result<Index> {
        normalize(index)?;
        self.delete(&index.identity).await?;
        self.create(index).await
    }
}
