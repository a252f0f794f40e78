use serde_json::Value;

use super::{coerce_text, parse_or_absent};
use crate::models::{AttrValue, Attributes};

/// Collapse template groups into one flat `fieldSlug -> value` map.
///
/// Groups without a `templateAttributes` array and attribute items that are
/// not objects are skipped. On slug collision the later item wins while the
/// key keeps its first position.
pub fn flatten_attributes(raw: Option<&Value>) -> Option<Attributes> {
    parse_or_absent(raw, |value| {
        let groups = value.as_array()?;
        let mut out = Attributes::new();
        let template_attrs = groups
            .iter()
            .filter_map(|group| group.get("templateAttributes")?.as_array());
        for attr in template_attrs.flatten().filter_map(Value::as_object) {
            let slug = attr.get("fieldSlug").map(coerce_text).unwrap_or_default();
            let value = attr.get("value").map_or(AttrValue::Null, AttrValue::from);
            out.insert(slug, value);
        }
        Some(out)
    })
}
