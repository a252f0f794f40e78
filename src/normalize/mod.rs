//! Record normalization.
//!
//! Turns one raw dealer record into one [`ProductRecord`]. Dealer exports
//! disagree on shape, so every extractor here is best-effort: anything that
//! does not look like the expected shape becomes an absent field, never an
//! error. That policy lives in exactly one place, [`parse_or_absent`], and
//! each extractor composes it.
//!
//! | Extractor | Input | Output |
//! |-----------|-------|--------|
//! | [`extract_locale_map`] | string, `[{locale, value}]`, or map | [`LocaleMap`] |
//! | [`flatten_attributes`] | `[{templateAttributes: [{fieldSlug, value}]}]` | [`Attributes`] |
//! | [`resolve_dc_availability`] | `attributes["dc_availability"]` | [`DcAvailability`] |
//! | [`resolve_dc_specific`] | `attributes["dc_specific"]` | [`DcSpecific`] |

mod attributes;
mod dc;
mod locale;

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::models::{AttrValue, ProductRecord};

pub use attributes::flatten_attributes;
pub use dc::{resolve_dc_availability, resolve_dc_specific, DC_AVAILABILITY_KEY, DC_SPECIFIC_KEY};
pub use locale::extract_locale_map;

static DEALER_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"products-([A-Za-z0-9_-]+)-").expect("valid dealer file regex"));

/// Values that can be "falsy" in a dealer export (`null`, `false`, `0`, `""`).
pub(crate) trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

impl Truthy for AttrValue {
    fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Null => false,
            AttrValue::Bool(b) => *b,
            AttrValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            AttrValue::String(s) => !s.is_empty(),
            AttrValue::List(_) | AttrValue::Object(_) => true,
        }
    }
}

/// Decoded values that may still carry nothing (an empty map).
pub(crate) trait Presence {
    fn is_present(&self) -> bool;
}

impl<K, V> Presence for IndexMap<K, V> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

/// The single degrade-to-absent policy.
///
/// Missing or falsy input is absent; a decode that fails is absent; a decode
/// that succeeds but yields nothing is absent.
pub(crate) fn parse_or_absent<R, T, F>(raw: Option<&R>, decode: F) -> Option<T>
where
    R: Truthy + ?Sized,
    T: Presence,
    F: FnOnce(&R) -> Option<T>,
{
    let raw = raw.filter(|r| r.is_truthy())?;
    decode(raw).filter(Presence::is_present)
}

/// String form of a scalar export value. `null` becomes the empty string,
/// strings pass through, everything else is rendered as JSON text.
pub(crate) fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(coerce_text)
}

/// Normalize one raw record.
///
/// `dealer_id` has already been resolved for the whole file (see
/// [`resolve_dealer_id`]). Non-object input yields a record whose every
/// optional field is absent and whose SKU is empty.
pub fn normalize_record(raw: &Value, dealer_id: Option<&str>, source_file: &Path) -> ProductRecord {
    let attributes = flatten_attributes(raw.get("attributes"));
    let dc_availability = resolve_dc_availability(attributes.as_ref());
    let dc_specific = resolve_dc_specific(attributes.as_ref());

    ProductRecord {
        sku: raw.get("sku").map(coerce_text).unwrap_or_default(),
        slug: optional_string(raw.get("slug")),
        external_ref: optional_string(raw.get("externalRef")),
        mpn: optional_string(raw.get("mpn")),
        upc_ean: optional_string(raw.get("upc_ean")),
        product_type: optional_string(raw.get("productType")),
        name: extract_locale_map(raw.get("name")),
        description: extract_locale_map(raw.get("description")),
        commodity_type: optional_string(raw.get("commodityType")),
        status: optional_string(raw.get("status")),
        attributes,
        dealer_id: dealer_id.map(str::to_string),
        dc_availability,
        dc_specific,
        source_file: source_file.to_path_buf(),
    }
}

/// Resolve the dealer for every record of one file.
///
/// An explicit, non-empty id wins. Otherwise, when inference is enabled, the
/// basename is matched against `products-<dealer>-*`.
pub fn resolve_dealer_id(path: &Path, explicit: Option<&str>, infer: bool) -> Option<String> {
    if let Some(id) = explicit.filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    if !infer {
        return None;
    }
    let base = path.file_name()?.to_string_lossy();
    DEALER_FILE_RE
        .captures(&base)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
