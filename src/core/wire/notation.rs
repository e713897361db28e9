//! Purpose: Object-notation rendering and parsing of `Node` trees.
//! Exports: `write`, `parse`.
//! Role: Object-notation half of the wire encoder; mirrors the markup half field for field.
//! Invariants: Object keys are emitted in node order (attributes first), relying on `preserve_order`.
//! Invariants: List elements become arrays of objects tagged with `__type`.
use crate::core::error::{Error, ErrorKind};
use crate::core::node::{Node, NodeValue, TEXT_KEY, TYPE_KEY};
use serde_json::{Map, Value};

pub fn write(root: &Node) -> Result<String, Error> {
    let mut document = Map::new();
    document.insert(root.name.clone(), content(root));
    serde_json::to_string(&Value::Object(document)).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to write object notation")
            .with_source(err)
    })
}

fn content(node: &Node) -> Value {
    match &node.value {
        NodeValue::List(items) => Value::Array(items.iter().map(typed_entry).collect()),
        NodeValue::Text(text) if node.attributes.is_empty() => Value::String(text.clone()),
        _ => Value::Object(object_fields(node)),
    }
}

fn typed_entry(node: &Node) -> Value {
    let mut object = Map::new();
    object.insert(TYPE_KEY.to_string(), Value::String(node.name.clone()));
    match content(node) {
        Value::Object(fields) => object.extend(fields),
        other => {
            object.insert(TEXT_KEY.to_string(), other);
        }
    }
    Value::Object(object)
}

fn object_fields(node: &Node) -> Map<String, Value> {
    let mut object = Map::new();
    for (key, value) in &node.attributes {
        object.insert(key.clone(), Value::String(value.clone()));
    }
    match &node.value {
        NodeValue::Text(text) => {
            object.insert(TEXT_KEY.to_string(), Value::String(text.clone()));
        }
        NodeValue::Children(children) => {
            // Repeated child names share one key holding an array, keyed at first occurrence.
            let mut names: Vec<&str> = Vec::new();
            for child in children {
                if !names.contains(&child.name.as_str()) {
                    names.push(&child.name);
                }
            }
            for name in names {
                let mut values: Vec<Value> = children
                    .iter()
                    .filter(|child| child.name == name)
                    .map(content)
                    .collect();
                let value = if values.len() == 1 {
                    values.remove(0)
                } else {
                    Value::Array(values)
                };
                object.insert(name.to_string(), value);
            }
        }
        NodeValue::Empty | NodeValue::List(_) => {}
    }
    object
}

pub fn parse(body: &str) -> Result<Node, Error> {
    let value: Value = serde_json::from_str(body).map_err(|err| {
        Error::new(ErrorKind::MalformedResponse)
            .with_message("invalid object-notation document")
            .with_source(err)
    })?;
    let Value::Object(document) = value else {
        return Err(Error::new(ErrorKind::MalformedResponse)
            .with_message("object-notation document must be an object"));
    };
    if document.len() != 1 {
        return Err(Error::new(ErrorKind::MalformedResponse)
            .with_message("object-notation document must have exactly one root key"));
    }
    let (name, value) = document
        .into_iter()
        .next()
        .ok_or_else(|| Error::new(ErrorKind::MalformedResponse).with_message("empty document"))?;
    let mut nodes = nodes_from_value(&name, value);
    if nodes.len() != 1 {
        return Err(Error::new(ErrorKind::MalformedResponse)
            .with_message("object-notation root must not be an array"));
    }
    Ok(nodes.remove(0).into_decoded())
}

fn nodes_from_value(name: &str, value: Value) -> Vec<Node> {
    match value {
        Value::Null => vec![Node::decoded(name, NodeValue::Empty)],
        Value::Bool(flag) => vec![Node::decoded(name, NodeValue::Text(flag.to_string()))],
        Value::Number(number) => vec![Node::decoded(name, NodeValue::Text(number.to_string()))],
        Value::String(text) => vec![Node::decoded(name, NodeValue::Text(text))],
        Value::Object(fields) => vec![Node::decoded(name, children_value(fields))],
        Value::Array(entries) => {
            if entries.is_empty() {
                return vec![Node::decoded(name, NodeValue::Empty)];
            }
            if entries.iter().all(is_typed_entry) {
                let children = entries
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Value::Object(mut fields) => {
                            let tag = match fields.shift_remove(TYPE_KEY) {
                                Some(Value::String(tag)) => tag,
                                _ => return None,
                            };
                            Some(Node::decoded(tag, children_value(fields)))
                        }
                        _ => None,
                    })
                    .collect();
                return vec![Node::decoded(name, NodeValue::Children(children))];
            }
            entries
                .into_iter()
                .flat_map(|entry| nodes_from_value(name, entry))
                .collect()
        }
    }
}

fn children_value(fields: Map<String, Value>) -> NodeValue {
    let children: Vec<Node> = fields
        .into_iter()
        .flat_map(|(key, value)| nodes_from_value(&key, value))
        .collect();
    if children.is_empty() {
        NodeValue::Empty
    } else {
        NodeValue::Children(children)
    }
}

fn is_typed_entry(entry: &Value) -> bool {
    matches!(entry, Value::Object(fields) if matches!(fields.get(TYPE_KEY), Some(Value::String(_))))
}

#[cfg(test)]
mod tests {
    use super::{parse, write};
    use crate::core::error::ErrorKind;
    use crate::core::node::{Namespace, Node};
    use serde_json::{Value, json};

    #[test]
    fn write_orders_attributes_before_children_and_tags_list_entries() {
        let root = Node::element(Namespace::Messages, "DeleteItem")
            .with_attribute("DeleteType", "HardDelete")
            .with_child(Node::list(
                Namespace::Messages,
                "ItemIds",
                vec![Node::element(Namespace::Types, "ItemId").with_attribute("Id", "A")],
            ));
        let body = write(&root).expect("write");
        assert_eq!(
            body,
            r#"{"DeleteItem":{"DeleteType":"HardDelete","ItemIds":[{"__type":"ItemId","Id":"A"}]}}"#
        );
    }

    #[test]
    fn repeated_children_share_an_array() {
        let root = Node::element(Namespace::Messages, "Items")
            .with_child(Node::text(Namespace::Types, "Subject", "a"))
            .with_child(Node::text(Namespace::Types, "Subject", "b"));
        let value: Value = serde_json::from_str(&write(&root).expect("write")).expect("json");
        assert_eq!(value, json!({"Items": {"Subject": ["a", "b"]}}));
    }

    #[test]
    fn parse_reads_scalars_as_text() {
        let root = parse(r#"{"Root":{"Count":3,"Flag":true,"Missing":null}}"#).expect("parse");
        assert_eq!(root.value_of("Count"), Some("3"));
        assert_eq!(root.value_of("Flag"), Some("true"));
        assert!(root.child("Missing").expect("missing").is_empty());
    }

    #[test]
    fn parse_rejects_multiple_roots() {
        let err = parse(r#"{"A":{},"B":{}}"#).expect_err("roots");
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        let err = parse("[1,2]").expect_err("array");
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }
}
