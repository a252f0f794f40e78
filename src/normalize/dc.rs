use indexmap::IndexMap;

use super::parse_or_absent;
use crate::models::{AttrValue, Attributes, DcAvailability, DcSpecific};

pub const DC_AVAILABILITY_KEY: &str = "dc_availability";
pub const DC_SPECIFIC_KEY: &str = "dc_specific";

/// Decode `attributes["dc_availability"]`.
pub fn resolve_dc_availability(attributes: Option<&Attributes>) -> Option<DcAvailability> {
    sub_document(attributes, DC_AVAILABILITY_KEY)
}

/// Decode `attributes["dc_specific"]`.
pub fn resolve_dc_specific(attributes: Option<&Attributes>) -> Option<DcSpecific> {
    sub_document(attributes, DC_SPECIFIC_KEY)
}

// Values arrive either already structured or as JSON-encoded strings. The
// document must be an object; entries that are not objects are dropped and
// the rest kept.
fn sub_document(
    attributes: Option<&Attributes>,
    key: &str,
) -> Option<IndexMap<String, IndexMap<String, AttrValue>>> {
    parse_or_absent(attributes?.get(key), |raw| {
        let document = match raw {
            AttrValue::String(text) => serde_json::from_str(text).ok()?,
            structured => structured.clone(),
        };
        let AttrValue::Object(entries) = document else {
            return None;
        };
        Some(
            entries
                .into_iter()
                .filter_map(|(code, entry)| match entry {
                    AttrValue::Object(fields) => Some((code, fields)),
                    _ => None,
                })
                .collect(),
        )
    })
}
