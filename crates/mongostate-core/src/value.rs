//! Typed generic values for open-ended index options
//!
//! Partial filter expressions are arbitrary predicate documents. Both the
//! create path and the read path carry them as `IndexValue` so that numbers
//! stay numbers and nothing is stringified on the way back.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document of typed values, keyed by field name
pub type ValueDocument = BTreeMap<String, IndexValue>;

/// Extended JSON wrapper keys that denote a literal BSON value rather than
/// a query operator.
pub const EXTENDED_JSON_KEYS: &[&str] = &[
    "$binary",
    "$code",
    "$date",
    "$maxKey",
    "$minKey",
    "$numberDecimal",
    "$numberDouble",
    "$numberInt",
    "$numberLong",
    "$oid",
    "$regularExpression",
    "$symbol",
    "$timestamp",
    "$uuid",
];

/// A typed value: null, bool, integer, float, string, array or document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<IndexValue>),
    Document(ValueDocument),
}

impl IndexValue {
    /// Try to get as i64. Floats with no fractional part count as integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            IndexValue::Int(v) => Some(*v),
            IndexValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a document
    pub fn as_document(&self) -> Option<&ValueDocument> {
        match self {
            IndexValue::Document(doc) => Some(doc),
            _ => None,
        }
    }

    /// Whether a document is an extended JSON literal such as `{"$date": ...}`
    pub fn is_extended_json_literal(doc: &ValueDocument) -> bool {
        match doc.keys().next() {
            Some(key) => doc.len() == 1 && EXTENDED_JSON_KEYS.contains(&key.as_str()),
            None => false,
        }
    }

    /// Convert to BSON.
    ///
    /// Integers become Int32 when they fit and Int64 otherwise, matching what
    /// the server echoes back. Extended JSON literals become their native BSON
    /// type.
    pub fn to_bson(&self) -> Bson {
        match self {
            IndexValue::Null => Bson::Null,
            IndexValue::Bool(b) => Bson::Boolean(*b),
            IndexValue::Int(i) => i32::try_from(*i)
                .map(Bson::Int32)
                .unwrap_or(Bson::Int64(*i)),
            IndexValue::Float(f) => Bson::Double(*f),
            IndexValue::String(s) => Bson::String(s.clone()),
            IndexValue::Array(items) => Bson::Array(items.iter().map(Self::to_bson).collect()),
            IndexValue::Document(doc) => {
                if Self::is_extended_json_literal(doc)
                    && let Ok(literal) = Bson::try_from(self.to_json())
                {
                    return literal;
                }
                Bson::Document(document_to_bson(doc))
            }
        }
    }

    /// Convert from BSON.
    ///
    /// BSON types with no JSON counterpart (dates, object ids, decimals, ...)
    /// become relaxed extended JSON wrapper documents.
    pub fn from_bson(bson: &Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => IndexValue::Null,
            Bson::Boolean(b) => IndexValue::Bool(*b),
            Bson::Int32(i) => IndexValue::Int(i64::from(*i)),
            Bson::Int64(i) => IndexValue::Int(*i),
            Bson::Double(d) => IndexValue::Float(*d),
            Bson::String(s) => IndexValue::String(s.clone()),
            Bson::Array(items) => IndexValue::Array(items.iter().map(Self::from_bson).collect()),
            Bson::Document(doc) => IndexValue::Document(document_from_bson(doc)),
            other => IndexValue::from(other.clone().into_relaxed_extjson()),
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            IndexValue::Null => serde_json::Value::Null,
            IndexValue::Bool(b) => serde_json::Value::Bool(*b),
            IndexValue::Int(i) => serde_json::Value::from(*i),
            IndexValue::Float(f) => serde_json::Value::from(*f),
            IndexValue::String(s) => serde_json::Value::String(s.clone()),
            IndexValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            IndexValue::Document(doc) => serde_json::Value::Object(
                doc.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for IndexValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => IndexValue::Null,
            serde_json::Value::Bool(b) => IndexValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => IndexValue::Int(i),
                None => IndexValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => IndexValue::String(s),
            serde_json::Value::Array(items) => {
                IndexValue::Array(items.into_iter().map(IndexValue::from).collect())
            }
            serde_json::Value::Object(obj) => IndexValue::Document(
                obj.into_iter()
                    .map(|(k, v)| (k, IndexValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Convert a typed value document into a BSON document
pub fn document_to_bson(doc: &ValueDocument) -> Document {
    doc.iter().map(|(k, v)| (k.clone(), v.to_bson())).collect()
}

/// Convert a BSON document into a typed value document
pub fn document_from_bson(doc: &Document) -> ValueDocument {
    doc.iter()
        .map(|(k, v)| (k.clone(), IndexValue::from_bson(v)))
        .collect()
}

/// Read any BSON numeric as i64. Doubles must be integral.
pub fn bson_as_i64(bson: &Bson) -> Option<i64> {
    match bson {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(d) if d.fract() == 0.0 => Some(*d as i64),
        _ => None,
    }
}

/// Read any BSON numeric as i32, dropping values that do not fit
pub fn bson_as_i32(bson: &Bson) -> Option<i32> {
    bson_as_i64(bson).and_then(|i| i32::try_from(i).ok())
}

/// Read any BSON numeric as f64
pub fn bson_as_f64(bson: &Bson) -> Option<f64> {
    match bson {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
