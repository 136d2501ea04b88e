//! 🔀 JSON ⇄ XML — two formats, one tree, a handful of conventions.
//!
//! - Object keys become child elements, in key order.
//! - Arrays become repeated elements named after their key.
//! - `@name` keys become attributes; `#text` becomes text content.
//! - Scalars become text. `null` becomes an empty element.
//!
//! The reverse direction folds repeated children back into arrays, and leaf
//! elements (no attributes, no child elements) back into plain strings.
//! Everything XML says is a string, because XML never commits to anything else.

use serde_json::{Map, Value};

use crate::xml::{XmlElement, XmlNode};

const TEXT_KEY: &str = "#text";
const ATTRIBUTE_PREFIX: char = '@';
const ARRAY_ITEM: &str = "item";

/// 📤 Build an element called `name` out of a JSON value.
pub fn json_to_xml(name: &str, value: &Value) -> XmlElement {
    let mut element = XmlElement::new(name);
    fill(&mut element, value);
    element
}

fn fill(element: &mut XmlElement, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => element.children.push(XmlNode::Text(s.clone())),
        Value::Number(_) | Value::Bool(_) => element.children.push(XmlNode::Text(value.to_string())),
        Value::Array(items) => {
            // 🤷 A bare array has no key to borrow a name from.
            for item in items {
                element.push(json_to_xml(ARRAY_ITEM, item));
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    element
                        .attributes
                        .push((attribute.to_string(), scalar_text(child)));
                } else if key == TEXT_KEY {
                    element.children.push(XmlNode::Text(scalar_text(child)));
                } else if let Value::Array(items) = child {
                    for item in items {
                        element.push(json_to_xml(key, item));
                    }
                } else {
                    element.push(json_to_xml(key, child));
                }
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 📥 Fold an element back into JSON.
pub fn xml_to_json(element: &XmlElement) -> Value {
    let has_child_elements = element.elements().next().is_some();
    if element.attributes.is_empty() && !has_child_elements {
        return Value::String(element.text_content());
    }

    let mut map = Map::new();
    for (key, value) in &element.attributes {
        map.insert(format!("{ATTRIBUTE_PREFIX}{key}"), Value::String(value.clone()));
    }
    for child in element.elements() {
        let key = child.local_name().to_string();
        let value = xml_to_json(child);
        match map.get_mut(&key) {
            // 🔁 Second sighting: it was a list all along.
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    let text = element.text_content();
    if !text.trim().is_empty() {
        map.insert(TEXT_KEY.to_string(), Value::String(text));
    }
    Value::Object(map)
}
