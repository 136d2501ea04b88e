//! 🔄 Transforms — the Rosetta Stone of integration glue 🎭
//!
//! 🎬 COLD OPEN — INT. CODE REVIEW — 4:55 PM FRIDAY
//!
//! "Why are there forty scripts that copy `d_number` into `documentNumber`?"
//! "Well, thirty-nine of them copy it. One copies it into `docNumber`."
//! "...Which one is right?"
//! "Yes."
//!
//! This module replaces every hand-written field copy with a table. A
//! [`FieldMapping`] says "take this path over there, put it over here". One generic
//! mapper walks the table. Flows declare tables. Nobody writes `target.x = source.y`
//! by hand ever again, and the duplicates collapse into data.
//!
//! ## Paths 🧭
//! Dot-separated. Numeric segments index arrays: `items.0.code`.
//! Missing source → empty string (or omitted, with the `_omitting` variant),
//! unless the mapping is `required`, in which case → `MissingField`.
//!
//! ## Knowledge Graph 🧠
//! - `json_xml`: JSON ⇄ XML tree conversion (objects → elements, `@attr` → attributes)
//! - `status`: the one enumerated business rule, `"S"` → SUCCESS, `"E"` → ERROR 🦆

use serde_json::{Map, Value};

use crate::error::{IntegrationError, Result};

pub mod json_xml;
pub mod status;

pub use json_xml::{json_to_xml, xml_to_json};
pub use status::StatusCode;

/// 📐 One row of a mapping table: source path → target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: &'static str,
    pub target: &'static str,
    pub required: bool,
}

impl FieldMapping {
    pub const fn new(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            target,
            required: false,
        }
    }

    pub const fn required(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            target,
            required: true,
        }
    }
}

/// 🔄 Apply `table` to `source`. Missing optional fields become `""`.
pub fn map_json(source: &Value, table: &[FieldMapping]) -> Result<Value> {
    apply(source, table, true)
}

/// 🔄 Same as [`map_json`], but missing optional fields are left out entirely.
pub fn map_json_omitting(source: &Value, table: &[FieldMapping]) -> Result<Value> {
    apply(source, table, false)
}

/// 🔁 Apply `table` to every element of the array at `array_path`.
/// A missing or non-array `array_path` maps to an empty list.
pub fn map_each(source: &Value, array_path: &str, table: &[FieldMapping]) -> Result<Vec<Value>> {
    match get_path(source, array_path) {
        Some(Value::Array(items)) => items.iter().map(|item| map_json(item, table)).collect(),
        _ => Ok(Vec::new()),
    }
}

fn apply(source: &Value, table: &[FieldMapping], fill_missing: bool) -> Result<Value> {
    let mut target = Value::Object(Map::new());
    for mapping in table {
        match get_path(source, mapping.source) {
            Some(value) if !value.is_null() => set_path(&mut target, mapping.target, value.clone()),
            _ if mapping.required => {
                return Err(IntegrationError::missing(mapping.source, "source payload"));
            }
            _ if fill_missing => {
                set_path(&mut target, mapping.target, Value::String(String::new()))
            }
            _ => {}
        }
    }
    Ok(target)
}

/// 🧭 Look up a dot path. Numeric segments index arrays.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

/// 📝 Look up a dot path and render it as a string (numbers and bools stringified).
pub fn get_string(value: &Value, path: &str) -> Option<String> {
    match get_path(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other @ (Value::Number(_) | Value::Bool(_)) => Some(other.to_string()),
        _ => None,
    }
}

/// 🏗️ Write `new_value` at a dot path, building objects (and arrays, for numeric
/// segments) on the way down. Existing scalars in the way get replaced.
pub fn set_path(target: &mut Value, path: &str, new_value: Value) {
    let mut current = target;
    for segment in path.split('.') {
        let index = segment.parse::<usize>().ok();
        current = match index {
            Some(i) => {
                if !current.is_array() {
                    *current = Value::Array(Vec::new());
                }
                let items = match current {
                    Value::Array(items) => items,
                    _ => unreachable!("just made it an array"),
                };
                if items.len() <= i {
                    items.resize(i + 1, Value::Null);
                }
                &mut items[i]
            }
            None => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let map = match current {
                    Value::Object(map) => map,
                    _ => unreachable!("just made it an object"),
                };
                map.entry(segment.to_string()).or_insert(Value::Null)
            }
        };
    }
    *current = new_value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const THE_TABLE: &[FieldMapping] = &[
        FieldMapping::required("d.number", "documentNumber"),
        FieldMapping::new("d.partner.name", "customer.name"),
        FieldMapping::new("d.items.0.sku", "firstSku"),
        FieldMapping::new("d.nope", "customer.nickname"),
    ];

    #[test]
    fn the_one_where_the_table_does_the_typing_for_us() {
        let the_source = json!({
            "d": {
                "number": "4711",
                "partner": { "name": "ACME" },
                "items": [{ "sku": "A-1" }, { "sku": "B-2" }]
            }
        });
        let the_target = map_json(&the_source, THE_TABLE).expect("required field present");
        assert_eq!(
            the_target,
            json!({
                "documentNumber": "4711",
                "customer": { "name": "ACME", "nickname": "" },
                "firstSku": "A-1"
            })
        );
        // 📐 preserve_order keeps the table's seating chart
        let the_keys: Vec<_> = the_target.as_object().expect("object").keys().cloned().collect();
        assert_eq!(the_keys, vec!["documentNumber", "customer", "firstSku"]);
    }

    #[test]
    fn the_one_where_omitting_means_omitting() {
        let the_target =
            map_json_omitting(&json!({"d": {"number": 1}}), THE_TABLE).expect("required present");
        assert_eq!(the_target, json!({"documentNumber": 1}));
    }

    #[test]
    fn the_one_where_a_required_field_goes_missing() {
        match map_json(&json!({"d": {}}), THE_TABLE) {
            Err(IntegrationError::MissingField { field, .. }) => assert_eq!(field, "d.number"),
            honestly_who_knows => panic!("💀 expected MissingField, got {honestly_who_knows:?}"),
        }
    }

    #[test]
    fn the_one_where_null_counts_as_missing() {
        let the_target = map_json(
            &json!({"d": {"number": "1", "partner": {"name": null}}}),
            THE_TABLE,
        )
        .expect("required present");
        assert_eq!(the_target["customer"]["name"], json!(""));
    }

    #[test]
    fn the_one_where_map_each_walks_the_array() {
        let the_source = json!({"rows": [{"id": 1}, {"id": 2}]});
        let table = [FieldMapping::new("id", "code")];
        let mapped = map_each(&the_source, "rows", &table).expect("maps");
        assert_eq!(mapped, vec![json!({"code": 1}), json!({"code": 2})]);
        assert!(map_each(&the_source, "nope", &table).expect("maps").is_empty());
    }

    #[test]
    fn the_one_where_set_path_builds_arrays_too() {
        let mut the_target = json!({});
        set_path(&mut the_target, "lines.1.qty", json!(3));
        assert_eq!(the_target, json!({"lines": [null, {"qty": 3}]}));
        assert_eq!(get_string(&the_target, "lines.1.qty").as_deref(), Some("3"));
        assert_eq!(get_string(&the_target, "lines.0"), None);
    }
}
