//! `listIndexes` output to declared index translation
//!
//! The server does not echo back what it was sent. Text indexes come back
//! as `_fts`/`_ftsx` sentinels with a separate weights document, numbers
//! come back in whatever width the server chose and collations gain every
//! default knob. This module turns a raw description into the declared
//! shape so a later drift check compares like with like. Malformed fields
//! are omitted rather than reported.

use bson::{Bson, Document};
use mongostate_core::{
    Collation, Index, IndexIdentity, IndexKey, IndexKeyType, IndexOptions, MongostateError,
    Result, WILDCARD_MARKER, bson_as_f64, bson_as_i32, bson_as_i64, document_from_bson,
};
use std::collections::BTreeMap;

/// Key the server uses in place of the fields of a text index
pub const TEXT_INDEX_MARKER: &str = "_fts";

/// Companion key the server adds next to `_fts`
pub const TEXT_INDEX_TERM_MARKER: &str = "_ftsx";

/// Find the description named after `identity` and convert it
pub fn reconcile(indexes: &[Document], identity: &IndexIdentity) -> Result<Index> {
    indexes
        .iter()
        .find(|doc| doc.get_str("name").is_ok_and(|name| name == identity.name))
        .map(|doc| reconcile_document(doc, identity))
        .ok_or_else(|| MongostateError::NotFound(identity.clone()))
}

/// Convert one raw index description into the declared shape
pub fn reconcile_document(raw: &Document, identity: &IndexIdentity) -> Index {
    let keys = match raw.get_document("key") {
        Ok(key_doc) => reconcile_keys(key_doc, raw.get_document("weights").ok()),
        Err(_) => Vec::new(),
    };

    let index = Index {
        identity: identity.clone(),
        keys,
        options: reconcile_options(raw),
    };

    tracing::debug!(index = %identity, kind = %index.kind(), "reconciled index");
    index
}

/// Classify one raw key value.
///
/// Numeric values are read in any BSON width. Anything unrecognized is
/// treated as ascending.
pub fn classify_key_value(field: &str, value: &Bson) -> IndexKeyType {
    match value {
        Bson::String(tag) => match tag.as_str() {
            "text" => IndexKeyType::Text,
            "2dsphere" => IndexKeyType::TwoDSphere,
            "2d" => IndexKeyType::TwoD,
            "hashed" => IndexKeyType::Hashed,
            other => {
                tracing::debug!(field, tag = other, "unrecognized index key value, treating as ascending");
                IndexKeyType::Ascending
            }
        },
        other => match bson_as_i64(other) {
            Some(1) if field.ends_with(WILDCARD_MARKER) => IndexKeyType::Wildcard,
            Some(1) => IndexKeyType::Ascending,
            Some(-1) => IndexKeyType::Descending,
            _ => {
                tracing::debug!(field, value = %other, "unrecognized index key value, treating as ascending");
                IndexKeyType::Ascending
            }
        },
    }
}

/// Rebuild the declared key list from a raw key document.
///
/// A text index is recognised by `_fts: "text"`. Its text fields are taken
/// from the weights document, in the position of the sentinel; scalar prefix
/// and suffix fields of a compound text index keep their place.
pub fn reconcile_keys(key_doc: &Document, weights: Option<&Document>) -> Vec<IndexKey> {
    let is_text = key_doc
        .get_str(TEXT_INDEX_MARKER)
        .is_ok_and(|value| value == "text");

    let mut keys = Vec::with_capacity(key_doc.len());
    for (field, value) in key_doc {
        if is_text && field == TEXT_INDEX_MARKER {
            match weights.filter(|w| !w.is_empty()) {
                Some(weights) => keys.extend(
                    weights
                        .keys()
                        .map(|f| IndexKey::new(f.clone(), IndexKeyType::Text)),
                ),
                None => keys.push(IndexKey::new(TEXT_INDEX_MARKER, IndexKeyType::Text)),
            }
            continue;
        }
        if is_text && field == TEXT_INDEX_TERM_MARKER {
            continue;
        }
        keys.push(IndexKey::new(field.clone(), classify_key_value(field, value)));
    }
    keys
}

fn reconcile_options(raw: &Document) -> IndexOptions {
    IndexOptions {
        unique: raw.get_bool("unique").ok(),
        sparse: raw.get_bool("sparse").ok(),
        hidden: raw.get_bool("hidden").ok(),
        expire_after_seconds: raw.get("expireAfterSeconds").and_then(bson_as_i32),
        collation: raw
            .get_document("collation")
            .ok()
            .and_then(Collation::from_document),
        partial_filter_expression: raw
            .get_document("partialFilterExpression")
            .ok()
            .map(document_from_bson),
        wildcard_projection: raw.get_document("wildcardProjection").ok().map(int_map),
        weights: raw.get_document("weights").ok().map(int_map),
        default_language: raw.get_str("default_language").ok().map(String::from),
        language_override: raw.get_str("language_override").ok().map(String::from),
        text_index_version: raw.get("textIndexVersion").and_then(bson_as_i32),
        bits: raw.get("bits").and_then(bson_as_i32),
        min: raw.get("min").and_then(bson_as_f64),
        max: raw.get("max").and_then(bson_as_f64),
        sphere_index_version: raw.get("2dsphereIndexVersion").and_then(bson_as_i32),
        version: raw.get("v").and_then(bson_as_i32),
    }
}

/// Field to integer map; non-numeric entries are dropped
fn int_map(doc: &Document) -> BTreeMap<String, i32> {
    doc.iter()
        .filter_map(|(k, v)| bson_as_i32(v).map(|n| (k.clone(), n)))
        .collect()
}
