//! Index identity triple

use crate::{MongostateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The immutable key of one index: database, collection and index name.
///
/// Changing any of the three means a different index; the only way to move
/// an index is to drop it and create it again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexIdentity {
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
    /// Index name
    pub name: String,
}

impl IndexIdentity {
    /// Create a new identity
    pub fn new(
        database: impl Into<String>,
        collection: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            name: name.into(),
        }
    }

    /// Check that no part of the triple is empty
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(MongostateError::configuration(
                "Database name cannot be empty",
            ));
        }
        if self.collection.is_empty() {
            return Err(MongostateError::configuration(
                "Collection name cannot be empty",
            ));
        }
        if self.name.is_empty() {
            return Err(MongostateError::configuration("Index name cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Display for IndexIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.collection, self.name)
    }
}

/// Parses import identifiers of the form `database.collection.index_name`.
impl FromStr for IndexIdentity {
    type Err = MongostateError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(MongostateError::configuration(format!(
                "Invalid import ID '{}': expected the format database.collection.index_name",
                s
            )));
        }

        let identity = Self::new(parts[0], parts[1], parts[2]);
        identity.validate()?;
        Ok(identity)
    }
}
