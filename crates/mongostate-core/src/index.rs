//! Declared index model
//!
//! An `Index` is the desired state of one MongoDB index in the flat shape a
//! declarative tool works with: an identity triple, an ordered key list of
//! (field, type) pairs and a sparse bag of options. Every option is an
//! `Option` so that an explicit `false` or `0` stays distinguishable from
//! "not declared".

use crate::value::{bson_as_i32, ValueDocument};
use crate::{IndexIdentity, MongostateError, Result};
use bson::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Path suffix MongoDB uses for wildcard index keys
pub const WILDCARD_MARKER: &str = "$**";

/// Path sent to the server for a wildcard key.
///
/// `$**` and paths already ending in `.$**` are kept; a bare field `f`
/// becomes `f.$**`.
pub fn wildcard_path(field: &str) -> String {
    if field == WILDCARD_MARKER || field.ends_with(&format!(".{}", WILDCARD_MARKER)) {
        field.to_string()
    } else {
        format!("{}.{}", field, WILDCARD_MARKER)
    }
}

/// Index key type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IndexKeyType {
    /// Ascending (1)
    Ascending,
    /// Descending (-1)
    Descending,
    /// Text index
    Text,
    /// Wildcard index on `$**` or `path.$**`
    Wildcard,
    /// Legacy 2d (planar) geo index
    TwoD,
    /// 2dsphere geo index
    TwoDSphere,
    /// Hashed index
    Hashed,
}

impl IndexKeyType {
    /// Parse a declared type tag.
    ///
    /// Unrecognized tags fall back to ascending.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "1" | "asc" | "ascending" => IndexKeyType::Ascending,
            "-1" | "desc" | "descending" => IndexKeyType::Descending,
            "text" => IndexKeyType::Text,
            "wildcard" => IndexKeyType::Wildcard,
            "2d" => IndexKeyType::TwoD,
            "2dsphere" => IndexKeyType::TwoDSphere,
            "hashed" => IndexKeyType::Hashed,
            other => {
                tracing::warn!(tag = other, "unrecognized index key type, treating as ascending");
                IndexKeyType::Ascending
            }
        }
    }

    /// Get the declared string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKeyType::Ascending => "1",
            IndexKeyType::Descending => "-1",
            IndexKeyType::Text => "text",
            IndexKeyType::Wildcard => "wildcard",
            IndexKeyType::TwoD => "2d",
            IndexKeyType::TwoDSphere => "2dsphere",
            IndexKeyType::Hashed => "hashed",
        }
    }
}

impl From<String> for IndexKeyType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<IndexKeyType> for String {
    fn from(key_type: IndexKeyType) -> Self {
        key_type.as_str().to_string()
    }
}

impl fmt::Display for IndexKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One (field, type) pair of an index key list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    /// Field path
    pub field: String,
    /// Key type
    #[serde(rename = "type")]
    pub key_type: IndexKeyType,
}

impl IndexKey {
    pub fn new(field: impl Into<String>, key_type: IndexKeyType) -> Self {
        Self {
            field: field.into(),
            key_type,
        }
    }

    /// The key as the server stores it: wildcard fields carry the `$**` marker
    pub fn canonical(&self) -> IndexKey {
        match self.key_type {
            IndexKeyType::Wildcard => IndexKey::new(wildcard_path(&self.field), self.key_type),
            _ => self.clone(),
        }
    }
}

/// Functional category of an index, inferred from its key types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Ascending/descending keys only
    Plain,
    Text,
    Wildcard,
    TwoDSphere,
    TwoD,
    Hashed,
}

impl IndexKind {
    /// Infer the kind of an index from its keys.
    ///
    /// Precedence when several signals are present: text, wildcard,
    /// 2dsphere, 2d, hashed, plain.
    pub fn infer(keys: &[IndexKey]) -> Self {
        let has = |key_type: IndexKeyType| keys.iter().any(|k| k.key_type == key_type);

        if has(IndexKeyType::Text) {
            IndexKind::Text
        } else if has(IndexKeyType::Wildcard) {
            IndexKind::Wildcard
        } else if has(IndexKeyType::TwoDSphere) {
            IndexKind::TwoDSphere
        } else if has(IndexKeyType::TwoD) {
            IndexKind::TwoD
        } else if has(IndexKeyType::Hashed) {
            IndexKind::Hashed
        } else {
            IndexKind::Plain
        }
    }

    /// Whether an index of this kind is created with the named option.
    ///
    /// Option groups that belong to another kind are dropped before the
    /// index is sent, so the server never reports them back.
    pub fn accepts_option(self, option: &str) -> bool {
        match option {
            "weights" | "default_language" | "language_override" | "text_index_version" => {
                self == IndexKind::Text
            }
            "wildcard_projection" => self == IndexKind::Wildcard,
            "sphere_index_version" => self == IndexKind::TwoDSphere,
            "bits" | "min" | "max" => self == IndexKind::TwoD,
            "expire_after_seconds" => self != IndexKind::Wildcard,
            _ => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Plain => "plain",
            IndexKind::Text => "text",
            IndexKind::Wildcard => "wildcard",
            IndexKind::TwoDSphere => "2dsphere",
            IndexKind::TwoD => "2d",
            IndexKind::Hashed => "hashed",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// String comparison rules for an index.
///
/// Only `locale` is required; every other knob is left to the server
/// default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collation {
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_level: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_ordering: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backwards: Option<bool>,
}

impl Collation {
    /// Create a collation for a locale with every knob unset
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Default::default()
        }
    }

    /// Set the comparison strength
    pub fn with_strength(mut self, strength: i32) -> Self {
        self.strength = Some(strength);
        self
    }

    /// Set case level comparison
    pub fn with_case_level(mut self, case_level: bool) -> Self {
        self.case_level = Some(case_level);
        self
    }

    /// Set numeric ordering
    pub fn with_numeric_ordering(mut self, numeric_ordering: bool) -> Self {
        self.numeric_ordering = Some(numeric_ordering);
        self
    }

    /// Build the BSON document sent to the server, declared knobs only
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("locale", self.locale.as_str());
        if let Some(v) = self.case_level {
            doc.insert("caseLevel", v);
        }
        if let Some(v) = &self.case_first {
            doc.insert("caseFirst", v.as_str());
        }
        if let Some(v) = self.strength {
            doc.insert("strength", v);
        }
        if let Some(v) = self.numeric_ordering {
            doc.insert("numericOrdering", v);
        }
        if let Some(v) = &self.alternate {
            doc.insert("alternate", v.as_str());
        }
        if let Some(v) = &self.max_variable {
            doc.insert("maxVariable", v.as_str());
        }
        if let Some(v) = self.backwards {
            doc.insert("backwards", v);
        }
        doc
    }

    /// Rebuild a collation from the fields the server returned.
    ///
    /// Returns `None` without a locale. Missing knobs stay unset.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let locale = doc.get_str("locale").ok()?;
        Some(Self {
            locale: locale.to_string(),
            case_level: doc.get_bool("caseLevel").ok(),
            case_first: doc.get_str("caseFirst").ok().map(String::from),
            strength: doc.get("strength").and_then(bson_as_i32),
            numeric_ordering: doc.get_bool("numericOrdering").ok(),
            alternate: doc.get_str("alternate").ok().map(String::from),
            max_variable: doc.get_str("maxVariable").ok().map(String::from),
            backwards: doc.get_bool("backwards").ok(),
        })
    }

    /// Whether every knob declared here matches `observed`
    fn is_satisfied_by(&self, observed: &Collation) -> bool {
        fn knob<T: PartialEq>(declared: &Option<T>, observed: &Option<T>) -> bool {
            declared.is_none() || declared == observed
        }

        self.locale == observed.locale
            && knob(&self.case_level, &observed.case_level)
            && knob(&self.case_first, &observed.case_first)
            && knob(&self.strength, &observed.strength)
            && knob(&self.numeric_ordering, &observed.numeric_ordering)
            && knob(&self.alternate, &observed.alternate)
            && knob(&self.max_variable, &observed.max_variable)
            && knob(&self.backwards, &observed.backwards)
    }
}

/// Optional index settings. `None` always means "not declared".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// TTL in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<Collation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_filter_expression: Option<ValueDocument>,
    /// Field inclusion (1) or exclusion (0) for wildcard indexes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard_projection: Option<BTreeMap<String, i32>>,
    /// Text search weights per field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<String, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_index_version: Option<i32>,
    /// 2d geohash precision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<i32>,
    /// 2d lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// 2d upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sphere_index_version: Option<i32>,
    /// Index format version reported by the server. Never sent; the create
    /// command always uses the fixed format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

/// A MongoDB index in declared shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(flatten)]
    pub identity: IndexIdentity,
    pub keys: Vec<IndexKey>,
    #[serde(flatten)]
    pub options: IndexOptions,
}

impl Index {
    /// Create an index with no options
    pub fn new(identity: IndexIdentity, keys: Vec<IndexKey>) -> Self {
        Self {
            identity,
            keys,
            options: IndexOptions::default(),
        }
    }

    /// Set the options
    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse a declared index from its JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let index: Index = serde_json::from_str(json).map_err(|e| {
            MongostateError::configuration(format!("Invalid index configuration: {}", e))
        })?;
        index.identity.validate()?;
        Ok(index)
    }

    /// Kind inferred from the key list
    pub fn kind(&self) -> IndexKind {
        IndexKind::infer(&self.keys)
    }

    /// Whether any key has the given type
    pub fn has_key_type(&self, key_type: IndexKeyType) -> bool {
        self.keys.iter().any(|k| k.key_type == key_type)
    }

    /// Names of the attributes where this observed index differs from `declared`.
    ///
    /// Keys compare as a set, wildcard fields with their `$**` marker. The
    /// server-reported format version is ignored, and so are server-defaulted
    /// settings the declaration leaves unset and options the declared kind
    /// of index does not take.
    pub fn drift(&self, declared: &Index) -> Vec<&'static str> {
        fn defaulted<T: PartialEq>(declared: &Option<T>, observed: &Option<T>) -> bool {
            declared.is_some() && declared != observed
        }
        fn flag(declared: Option<bool>, observed: Option<bool>) -> bool {
            declared.unwrap_or(false) != observed.unwrap_or(false)
        }

        let mut drifted = Vec::new();
        let observed = &self.options;
        let wanted = &declared.options;

        if self.identity.database != declared.identity.database {
            drifted.push("database");
        }
        if self.identity.collection != declared.identity.collection {
            drifted.push("collection");
        }
        if self.identity.name != declared.identity.name {
            drifted.push("name");
        }
        let observed_keys: Vec<IndexKey> = self.keys.iter().map(IndexKey::canonical).collect();
        if observed_keys.len() != declared.keys.len()
            || !declared
                .keys
                .iter()
                .all(|k| observed_keys.contains(&k.canonical()))
        {
            drifted.push("keys");
        }
        if flag(wanted.unique, observed.unique) {
            drifted.push("unique");
        }
        if flag(wanted.sparse, observed.sparse) {
            drifted.push("sparse");
        }
        if flag(wanted.hidden, observed.hidden) {
            drifted.push("hidden");
        }
        if wanted.expire_after_seconds != observed.expire_after_seconds {
            drifted.push("expire_after_seconds");
        }
        let collation_matches = match (&wanted.collation, &observed.collation) {
            (None, None) => true,
            (Some(declared), Some(observed)) => declared.is_satisfied_by(observed),
            _ => false,
        };
        if !collation_matches {
            drifted.push("collation");
        }
        if wanted.partial_filter_expression != observed.partial_filter_expression {
            drifted.push("partial_filter_expression");
        }
        if wanted.wildcard_projection != observed.wildcard_projection {
            drifted.push("wildcard_projection");
        }
        if defaulted(&wanted.weights, &observed.weights) {
            drifted.push("weights");
        }
        if defaulted(&wanted.default_language, &observed.default_language) {
            drifted.push("default_language");
        }
        if defaulted(&wanted.language_override, &observed.language_override) {
            drifted.push("language_override");
        }
        if defaulted(&wanted.text_index_version, &observed.text_index_version) {
            drifted.push("text_index_version");
        }
        if defaulted(&wanted.bits, &observed.bits) {
            drifted.push("bits");
        }
        if defaulted(&wanted.min, &observed.min) {
            drifted.push("min");
        }
        if defaulted(&wanted.max, &observed.max) {
            drifted.push("max");
        }
        if defaulted(&wanted.sphere_index_version, &observed.sphere_index_version) {
            drifted.push("sphere_index_version");
        }

        let kind = declared.kind();
        drifted.retain(|option| kind.accepts_option(option));
        drifted
    }
}
