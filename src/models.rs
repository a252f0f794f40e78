//! Core data models used throughout the catalog.
//!
//! A [`ProductRecord`] is the canonical, dealer-independent shape every raw
//! export record is normalized into. Dealer-defined values that have no fixed
//! schema are carried as [`AttrValue`], a closed set of JSON-like variants.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Locale code (`"en"`, `"fr"`, ...) to localized text.
pub type LocaleMap = IndexMap<String, String>;

/// Flattened template attributes, keyed by field slug, in input order.
pub type Attributes = IndexMap<String, AttrValue>;

/// Region code to availability flag for one distribution center.
pub type RegionFlags = IndexMap<String, AttrValue>;

/// Distribution center code to its region flags.
pub type DcAvailability = IndexMap<String, RegionFlags>;

/// Distribution center code to dealer-defined overrides.
pub type DcSpecific = IndexMap<String, IndexMap<String, AttrValue>>;

/// Bucket used in the per-dealer indexes for records without a dealer.
pub const UNKNOWN_DEALER: &str = "unknown";

/// A dealer-defined attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<AttrValue>),
    Object(IndexMap<String, AttrValue>),
}

impl AttrValue {
    /// True only for the numeric value `1`. `true` and `"1"` do not count.
    pub fn is_one(&self) -> bool {
        matches!(self, AttrValue::Number(n) if n.as_f64() == Some(1.0))
    }
}

impl From<&serde_json::Value> for AttrValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => AttrValue::Number(n.clone()),
            Value::String(s) => AttrValue::String(s.clone()),
            Value::Array(items) => AttrValue::List(items.iter().map(AttrValue::from).collect()),
            Value::Object(map) => AttrValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), AttrValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Normalized product record held by the catalog.
///
/// Immutable once built. The same SKU ingested twice produces two records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub sku: String,
    pub slug: Option<String>,
    pub external_ref: Option<String>,
    pub mpn: Option<String>,
    #[serde(rename = "upc_ean")]
    pub upc_ean: Option<String>,
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<LocaleMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<LocaleMap>,
    pub commodity_type: Option<String>,
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_id: Option<String>,
    #[serde(rename = "dc_availability", skip_serializing_if = "Option::is_none")]
    pub dc_availability: Option<DcAvailability>,
    #[serde(rename = "dc_specific", skip_serializing_if = "Option::is_none")]
    pub dc_specific: Option<DcSpecific>,
    pub source_file: PathBuf,
}

impl ProductRecord {
    /// Key under which this record is indexed per dealer.
    pub fn dealer_key(&self) -> &str {
        self.dealer_id.as_deref().unwrap_or(UNKNOWN_DEALER)
    }
}
