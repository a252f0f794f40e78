use serde_json::{Map, Value};

use super::{coerce_text, parse_or_absent};
use crate::models::LocaleMap;

const DEFAULT_LOCALE: &str = "en";

/// The shapes a localized field arrives in.
enum LocaleInput<'a> {
    Text(&'a str),
    Pairs(&'a [Value]),
    Map(&'a Map<String, Value>),
    Unsupported,
}

impl<'a> From<&'a Value> for LocaleInput<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(s) => LocaleInput::Text(s),
            Value::Array(items) => LocaleInput::Pairs(items),
            Value::Object(map) => LocaleInput::Map(map),
            _ => LocaleInput::Unsupported,
        }
    }
}

/// Normalize a localized text field into a locale map.
pub fn extract_locale_map(raw: Option<&Value>) -> Option<LocaleMap> {
    parse_or_absent(raw, |value| match LocaleInput::from(value) {
        LocaleInput::Text(text) => Some(LocaleMap::from([(
            DEFAULT_LOCALE.to_string(),
            text.to_string(),
        )])),
        LocaleInput::Pairs(items) => Some(items.iter().filter_map(locale_pair).collect()),
        LocaleInput::Map(map) => Some(
            map.iter()
                .map(|(locale, text)| (locale.clone(), coerce_text(text)))
                .collect(),
        ),
        LocaleInput::Unsupported => None,
    })
}

// Items without a `value` are dropped.
fn locale_pair(item: &Value) -> Option<(String, String)> {
    let item = item.as_object()?;
    let value = item.get("value")?;
    let locale = item
        .get("locale")
        .filter(|l| !l.is_null())
        .map_or_else(|| DEFAULT_LOCALE.to_string(), coerce_text);
    Some((locale, coerce_text(value)))
}
