//! In-memory stand-in for a MongoDB deployment
//!
//! Stores index descriptions the way a 7.x server reports them: text
//! fields collapse to `_fts`/`_ftsx`, text and 2dsphere defaults are filled
//! in and collations gain every knob plus an ICU version.

use crate::backend::{BackendError, INDEX_NOT_FOUND, IndexBackend, NAMESPACE_NOT_FOUND};
use async_trait::async_trait;
use bson::{Bson, Document, doc};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Server error code for an existing index with the same name and other keys
pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;

type Namespace = (String, String);

#[derive(Default)]
pub struct SimulatedServer {
    collections: Mutex<BTreeMap<Namespace, Vec<Document>>>,
    calls: Mutex<Vec<String>>,
    fail_next: Mutex<Option<BackendError>>,
}

impl SimulatedServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection holding only the `_id_` index
    pub fn with_collection(self, database: &str, collection: &str) -> Self {
        self.collections
            .lock()
            .insert(namespace(database, collection), vec![id_index()]);
        self
    }

    /// Store a raw description as if the server had produced it
    pub fn insert_raw(&self, database: &str, collection: &str, raw: Document) {
        self.collections
            .lock()
            .entry(namespace(database, collection))
            .or_insert_with(|| vec![id_index()])
            .push(raw);
    }

    /// Make the next command fail with `error`
    pub fn fail_next(&self, error: BackendError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Commands received so far, as `command db.coll`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Raw stored description of one index
    pub fn raw_index(&self, database: &str, collection: &str, name: &str) -> Option<Document> {
        self.collections
            .lock()
            .get(&namespace(database, collection))?
            .iter()
            .find(|doc| doc.get_str("name").is_ok_and(|n| n == name))
            .cloned()
    }

    fn record(&self, command: &str, database: &str, collection: &str) -> Result<(), BackendError> {
        self.calls
            .lock()
            .push(format!("{} {}.{}", command, database, collection));
        match self.fail_next.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IndexBackend for SimulatedServer {
    async fn create_indexes(
        &self,
        database: &str,
        collection: &str,
        index: Document,
    ) -> Result<(), BackendError> {
        self.record("createIndexes", database, collection)?;

        let stored = describe(&index);
        let name = stored.get_str("name").unwrap_or_default().to_string();

        let mut collections = self.collections.lock();
        let indexes = collections
            .entry(namespace(database, collection))
            .or_insert_with(|| vec![id_index()]);

        if let Some(existing) = indexes
            .iter()
            .find(|doc| doc.get_str("name").is_ok_and(|n| n == name))
        {
            if existing.get_document("key").ok() == stored.get_document("key").ok() {
                return Ok(());
            }
            return Err(BackendError::with_code(
                INDEX_KEY_SPECS_CONFLICT,
                format!("An existing index has the same name as the requested index: {}", name),
            ));
        }

        indexes.push(stored);
        Ok(())
    }

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Document>, BackendError> {
        self.record("listIndexes", database, collection)?;
        self.collections
            .lock()
            .get(&namespace(database, collection))
            .cloned()
            .ok_or_else(|| {
                BackendError::with_code(
                    NAMESPACE_NOT_FOUND,
                    format!("ns does not exist: {}.{}", database, collection),
                )
            })
    }

    async fn drop_index(
        &self,
        database: &str,
        collection: &str,
        name: &str,
    ) -> Result<(), BackendError> {
        self.record("dropIndexes", database, collection)?;

        let mut collections = self.collections.lock();
        let Some(indexes) = collections.get_mut(&namespace(database, collection)) else {
            return Err(BackendError::with_code(
                NAMESPACE_NOT_FOUND,
                format!("ns not found {}.{}", database, collection),
            ));
        };
        let before = indexes.len();
        indexes.retain(|doc| doc.get_str("name").map_or(true, |n| n != name));
        if indexes.len() == before {
            return Err(BackendError::with_code(
                INDEX_NOT_FOUND,
                format!("index not found with name [{}]", name),
            ));
        }
        Ok(())
    }
}

fn namespace(database: &str, collection: &str) -> Namespace {
    (database.to_string(), collection.to_string())
}

fn id_index() -> Document {
    doc! { "v": 2, "key": { "_id": 1 }, "name": "_id_" }
}

/// Turn a `createIndexes` entry into what `listIndexes` would report
fn describe(index: &Document) -> Document {
    let key = index.get_document("key").cloned().unwrap_or_default();
    let text_fields: Vec<String> = key
        .iter()
        .filter(|(_, v)| matches!(v, Bson::String(s) if s == "text"))
        .map(|(k, _)| k.clone())
        .collect();
    let is_sphere = key
        .values()
        .any(|v| matches!(v, Bson::String(s) if s == "2dsphere"));

    let mut stored = doc! {
        "v": index.get("v").cloned().unwrap_or(Bson::Int32(2)),
        "key": collapse_text_keys(&key),
        "name": index.get_str("name").unwrap_or_default(),
    };

    for (field, value) in index {
        if matches!(field.as_str(), "v" | "key" | "name") {
            continue;
        }
        let value = match (field.as_str(), value) {
            ("collation", Bson::Document(collation)) => Bson::Document(fill_collation(collation)),
            _ => value.clone(),
        };
        stored.insert(field.clone(), value);
    }

    if !text_fields.is_empty() {
        let declared = index.get_document("weights").ok();
        let weights: BTreeMap<String, Bson> = text_fields
            .iter()
            .map(|f| {
                let weight = declared
                    .and_then(|w| w.get(f).cloned())
                    .unwrap_or(Bson::Int32(1));
                (f.clone(), weight)
            })
            .collect();
        stored.insert("weights", weights.into_iter().collect::<Document>());
        if !stored.contains_key("default_language") {
            stored.insert("default_language", "english");
        }
        if !stored.contains_key("language_override") {
            stored.insert("language_override", "language");
        }
        if !stored.contains_key("textIndexVersion") {
            stored.insert("textIndexVersion", 3);
        }
    }

    if is_sphere && !stored.contains_key("2dsphereIndexVersion") {
        stored.insert("2dsphereIndexVersion", 3);
    }

    stored
}

fn collapse_text_keys(key: &Document) -> Document {
    let mut collapsed = Document::new();
    let mut sentinel_written = false;
    for (field, value) in key {
        if matches!(value, Bson::String(s) if s == "text") {
            if !sentinel_written {
                collapsed.insert("_fts", "text");
                collapsed.insert("_ftsx", 1);
                sentinel_written = true;
            }
            continue;
        }
        collapsed.insert(field.clone(), value.clone());
    }
    collapsed
}

fn fill_collation(collation: &Document) -> Document {
    let mut filled = collation.clone();
    let defaults = doc! {
        "caseLevel": false,
        "caseFirst": "off",
        "strength": 3,
        "numericOrdering": false,
        "alternate": "non-ignorable",
        "maxVariable": "punct",
        "normalization": false,
        "backwards": false,
        "version": "57.1",
    };
    for (knob, value) in defaults {
        if !filled.contains_key(&knob) {
            filled.insert(knob, value);
        }
    }
    filled
}
