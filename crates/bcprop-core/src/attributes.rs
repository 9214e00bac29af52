//! Alias-based field extraction from untyped feature attribute maps.
//!
//! Upstream layers rename fields between table versions (`PID` vs
//! `PID_FORMATTED`, `ZONING` vs `ZONECODE`), so every typed extraction in the
//! resolver goes through [`pick_field`] with an ordered alias list.

use serde_json::Value;

/// String-keyed attribute map as returned by a feature service.
pub type AttributeMap = serde_json::Map<String, Value>;

/// Returns the first alias, in priority order, whose value is present and
/// non-blank once rendered as text.
///
/// Strings are trimmed; numbers and booleans are rendered with their JSON
/// text. `null`, arrays and objects never match.
pub fn pick_field<I, S>(attrs: &AttributeMap, aliases: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    aliases
        .into_iter()
        .find_map(|alias| attrs.get(alias.as_ref()).and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attrs(value: Value) -> AttributeMap {
        value.as_object().cloned().expect("object fixture")
    }

    #[test]
    fn returns_first_present_alias() {
        let map = attrs(json!({ "PID_FORMATTED": "012-345-678", "PID": "012345678" }));
        assert_eq!(
            pick_field(&map, ["PID_FORMATTED", "PID"]),
            Some("012-345-678".to_string())
        );
    }

    #[test]
    fn skips_null_and_blank_values() {
        let map = attrs(json!({ "ZONE": null, "ZONING": "   ", "ZONECODE": "RM-3" }));
        assert_eq!(
            pick_field(&map, ["ZONE", "ZONING", "ZONECODE"]),
            Some("RM-3".to_string())
        );
    }

    #[test]
    fn renders_numbers_as_text() {
        let map = attrs(json!({ "PID_NUMBER": 12_345_678 }));
        assert_eq!(
            pick_field(&map, ["PID", "PID_NUMBER"]),
            Some("12345678".to_string())
        );
    }

    #[test]
    fn ignores_structured_values() {
        let map = attrs(json!({ "ZONE": { "code": "R1" }, "ZONING": ["R1"] }));
        assert_eq!(pick_field(&map, ["ZONE", "ZONING"]), None);
    }

    #[test]
    fn missing_aliases_yield_none() {
        let map = attrs(json!({ "OTHER": "x" }));
        assert_eq!(pick_field(&map, ["PID"]), None);
    }

    #[test]
    fn accepts_owned_alias_lists() {
        let map = attrs(json!({ "ZoneCode": "RS-1" }));
        let aliases = vec!["ZONE".to_string(), "ZoneCode".to_string()];
        assert_eq!(pick_field(&map, &aliases), Some("RS-1".to_string()));
    }
}
