//! Declared index to `createIndexes` translation
//!
//! The normalizer validates a declared `Index`, infers its kind and builds
//! the key document and option document the server expects. Options that
//! only make sense for another kind of index are dropped rather than sent,
//! because the server rejects some of them outright (a TTL on a wildcard
//! index, for example).

use bson::{Bson, Document, doc};
use mongostate_core::{
    Index, IndexKey, IndexKeyType, IndexKind, IndexValue, MongostateError, Result, ValueDocument,
    document_to_bson, wildcard_path,
};
use std::collections::{BTreeMap, HashSet};

/// Index format version stamped on every created index
pub const INDEX_FORMAT_VERSION: i32 = 2;

/// Query operators accepted inside a partial filter expression
pub const PARTIAL_FILTER_OPERATORS: &[&str] = &[
    "$eq", "$exists", "$gt", "$gte", "$lt", "$lte", "$type", "$and", "$or", "$in",
];

/// Field name suffixes that mark a key as a timestamp for TTL indexes
const TIMESTAMP_SUFFIXES: &[&str] = &["at", "date", "time"];

/// Text index versions the server supports
const TEXT_INDEX_VERSIONS: &[i32] = &[1, 2, 3];

/// A validated index ready to be sent in a `createIndexes` command
#[derive(Debug, Clone, PartialEq)]
pub struct IndexCommand {
    kind: IndexKind,
    keys: Document,
    options: Document,
}

impl IndexCommand {
    /// Inferred kind of the index
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Key document, in declared order
    pub fn keys(&self) -> &Document {
        &self.keys
    }

    /// Option document, always carrying `v`
    pub fn options(&self) -> &Document {
        &self.options
    }

    /// Element placed in the `indexes` array of a `createIndexes` command
    pub fn to_index_document(&self, name: &str) -> Document {
        let mut index = doc! {
            "key": self.keys.clone(),
            "name": name,
        };
        for (key, value) in &self.options {
            index.insert(key.clone(), value.clone());
        }
        index
    }

    /// Full `createIndexes` command for one index
    pub fn to_command(&self, collection: &str, name: &str) -> Document {
        doc! {
            "createIndexes": collection,
            "indexes": [self.to_index_document(name)],
        }
    }
}

/// Validate and translate a declared index
pub fn normalize(index: &Index) -> Result<IndexCommand> {
    validate(index)?;

    let kind = index.kind();
    let keys = key_document(&index.keys);
    let options = option_document(index, kind);

    tracing::debug!(
        index = %index.identity,
        kind = %kind,
        keys = %keys,
        options = %options,
        "normalized index"
    );

    Ok(IndexCommand {
        kind,
        keys,
        options,
    })
}

/// Check a declared index against the constraints the server enforces
/// plus the ones a declarative tool should catch before calling it.
pub fn validate(index: &Index) -> Result<()> {
    validate_keys(&index.keys)?;

    let options = &index.options;

    if options.expire_after_seconds.is_some() {
        validate_ttl(&index.keys)?;
    }

    if let Some(projection) = &options.wildcard_projection {
        validate_wildcard_projection(projection)?;
    }

    if index.has_key_type(IndexKeyType::Text) {
        if let Some(weights) = &options.weights {
            validate_weights(weights)?;
        }
        if let Some(version) = options.text_index_version
            && !TEXT_INDEX_VERSIONS.contains(&version)
        {
            return Err(MongostateError::configuration(format!(
                "text_index_version must be 1, 2 or 3, got {}",
                version
            )));
        }
    }

    if let Some(filter) = &options.partial_filter_expression {
        validate_partial_filter(filter)?;
    }

    if let Some(collation) = &options.collation
        && collation.locale.trim().is_empty()
    {
        return Err(MongostateError::configuration(
            "Collation locale cannot be empty",
        ));
    }

    Ok(())
}

fn validate_keys(keys: &[IndexKey]) -> Result<()> {
    if keys.is_empty() {
        return Err(MongostateError::configuration(
            "An index needs at least one key",
        ));
    }

    let mut seen = HashSet::new();
    for key in keys {
        if key.field.trim().is_empty() {
            return Err(MongostateError::configuration(
                "Index key field cannot be empty",
            ));
        }
        if !seen.insert(key.field.as_str()) {
            return Err(MongostateError::configuration(format!(
                "Duplicate index key field '{}'",
                key.field
            )));
        }
    }

    Ok(())
}

fn validate_ttl(keys: &[IndexKey]) -> Result<()> {
    if keys.iter().any(|k| k.key_type == IndexKeyType::Wildcard) {
        return Err(MongostateError::configuration(
            "expire_after_seconds cannot be used with a wildcard index",
        ));
    }

    let has_timestamp_field = keys.iter().any(|k| {
        let field = k.field.to_lowercase();
        TIMESTAMP_SUFFIXES.iter().any(|suffix| field.ends_with(suffix))
    });
    if !has_timestamp_field {
        return Err(MongostateError::configuration(
            "expire_after_seconds requires a date field (a key whose name ends in 'at', 'date' or 'time')",
        ));
    }

    Ok(())
}

fn validate_wildcard_projection(projection: &BTreeMap<String, i32>) -> Result<()> {
    if let Some((field, value)) = projection.iter().find(|(_, v)| !matches!(v, 0 | 1)) {
        return Err(MongostateError::configuration(format!(
            "wildcard_projection values must be 0 or 1, got {} for '{}'",
            value, field
        )));
    }

    let includes = projection.values().any(|v| *v == 1);
    let excludes = projection.values().any(|v| *v == 0);
    if includes && excludes {
        return Err(MongostateError::configuration(
            "Cannot mix inclusions (1) and exclusions (0) in wildcard_projection",
        ));
    }

    Ok(())
}

fn validate_weights(weights: &BTreeMap<String, i32>) -> Result<()> {
    match weights.iter().find(|(_, weight)| **weight <= 0) {
        Some((field, weight)) => Err(MongostateError::configuration(format!(
            "Text weight for '{}' must be positive, got {}",
            field, weight
        ))),
        None => Ok(()),
    }
}

/// Extended JSON wrapper for a regular expression literal
const REGEX_LITERAL: &str = "$regularExpression";

/// Reject any `$`-prefixed key that is not an allowed filter operator.
///
/// Extended JSON literal wrappers such as `{"$date": ...}` are values and
/// are not inspected, except regex literals: a regex match is not a
/// predicate a partial index can use.
pub fn validate_partial_filter(filter: &ValueDocument) -> Result<()> {
    if IndexValue::is_extended_json_literal(filter) {
        if filter.contains_key(REGEX_LITERAL) {
            return Err(MongostateError::configuration(
                "Regular expressions are not supported in partial_filter_expression",
            ));
        }
        return Ok(());
    }

    for (key, value) in filter {
        if key.starts_with('$') && !PARTIAL_FILTER_OPERATORS.contains(&key.as_str()) {
            return Err(MongostateError::configuration(format!(
                "Unsupported operator '{}' in partial_filter_expression; supported operators are {}",
                key,
                PARTIAL_FILTER_OPERATORS.join(", ")
            )));
        }
        validate_filter_value(value)?;
    }

    Ok(())
}

fn validate_filter_value(value: &IndexValue) -> Result<()> {
    match value {
        IndexValue::Document(doc) => validate_partial_filter(doc),
        IndexValue::Array(items) => items.iter().try_for_each(validate_filter_value),
        _ => Ok(()),
    }
}

/// Build the key document in declared order
pub fn key_document(keys: &[IndexKey]) -> Document {
    let mut doc = Document::new();
    for key in keys {
        match key.key_type {
            IndexKeyType::Ascending => {
                doc.insert(key.field.clone(), 1);
            }
            IndexKeyType::Descending => {
                doc.insert(key.field.clone(), -1);
            }
            IndexKeyType::Wildcard => {
                doc.insert(wildcard_path(&key.field), 1);
            }
            IndexKeyType::Text
            | IndexKeyType::TwoD
            | IndexKeyType::TwoDSphere
            | IndexKeyType::Hashed => {
                doc.insert(key.field.clone(), key.key_type.as_str());
            }
        }
    }
    doc
}

fn option_document(index: &Index, kind: IndexKind) -> Document {
    let options = &index.options;
    let mut doc = doc! { "v": INDEX_FORMAT_VERSION };

    if let Some(unique) = options.unique {
        doc.insert("unique", unique);
    }
    if let Some(sparse) = options.sparse {
        doc.insert("sparse", sparse);
    }
    if let Some(hidden) = options.hidden {
        doc.insert("hidden", hidden);
    }

    if let Some(ttl) = options
        .expire_after_seconds
        .filter(|_| kind.accepts_option("expire_after_seconds"))
    {
        doc.insert("expireAfterSeconds", ttl);
    }

    if let Some(collation) = &options.collation {
        doc.insert("collation", collation.to_document());
    }
    if let Some(filter) = &options.partial_filter_expression {
        doc.insert("partialFilterExpression", document_to_bson(filter));
    }

    match kind {
        IndexKind::Text => {
            if let Some(weights) = &options.weights {
                doc.insert("weights", int_map_document(weights));
            }
            if let Some(language) = &options.default_language {
                doc.insert("default_language", language.as_str());
            }
            if let Some(field) = &options.language_override {
                doc.insert("language_override", field.as_str());
            }
            if let Some(version) = options.text_index_version {
                doc.insert("textIndexVersion", version);
            }
        }
        IndexKind::Wildcard => {
            if let Some(projection) = &options.wildcard_projection {
                doc.insert("wildcardProjection", int_map_document(projection));
            }
        }
        IndexKind::TwoDSphere => {
            if let Some(version) = options.sphere_index_version {
                doc.insert("2dsphereIndexVersion", version);
            }
        }
        IndexKind::TwoD => {
            if let Some(bits) = options.bits {
                doc.insert("bits", bits);
            }
            if let Some(min) = options.min {
                doc.insert("min", min);
            }
            if let Some(max) = options.max {
                doc.insert("max", max);
            }
        }
        IndexKind::Hashed | IndexKind::Plain => {}
    }

    let suppressed = suppressed_options(index, kind);
    if !suppressed.is_empty() {
        tracing::debug!(
            index = %index.identity,
            kind = %kind,
            ?suppressed,
            "options ignored for this kind of index"
        );
    }

    doc
}

/// Declared options that belong to another kind of index
fn suppressed_options(index: &Index, kind: IndexKind) -> Vec<&'static str> {
    let options = &index.options;
    [
        ("expire_after_seconds", options.expire_after_seconds.is_some()),
        ("weights", options.weights.is_some()),
        ("default_language", options.default_language.is_some()),
        ("language_override", options.language_override.is_some()),
        ("text_index_version", options.text_index_version.is_some()),
        ("wildcard_projection", options.wildcard_projection.is_some()),
        ("sphere_index_version", options.sphere_index_version.is_some()),
        ("bits", options.bits.is_some()),
        ("min", options.min.is_some()),
        ("max", options.max.is_some()),
    ]
    .into_iter()
    .filter(|(option, declared)| *declared && !kind.accepts_option(option))
    .map(|(option, _)| option)
    .collect()
}

fn int_map_document(map: &BTreeMap<String, i32>) -> Document {
    map.iter()
        .map(|(k, v)| (k.clone(), Bson::Int32(*v)))
        .collect()
}
