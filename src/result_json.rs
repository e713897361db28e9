//! Purpose: JSON renderings of catalog rows, batch results and event batches for CLI output.
//! Exports: `operation_json`, `batch_json`, `message_json`, `event_batch_json`.
//! Role: Keep stdout envelopes consistent across `ops`, `decode`, `call` and `stream`.
//! Invariants: Stable key names; optional fields are omitted rather than null, except payload leaves.
//! Invariants: Repeated payload elements render as arrays under one key, in document order.

use mailrpc::api::{BatchOutcome, BatchResult, Event, EventBatch, ResponseMessage};
use mailrpc::core::node::{Node, NodeValue};
use mailrpc::core::operation::{Cardinality, ExpectedCount, OperationDescriptor};
use serde::Serialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Serialize)]
struct OperationRow<'a> {
    id: &'a str,
    name: &'a str,
    min_version: &'a str,
    batch: bool,
    expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    targets: Option<&'a str>,
    fields: Vec<&'a str>,
}

pub(crate) fn operation_json(descriptor: &OperationDescriptor) -> Value {
    let expected = match descriptor.cardinality {
        Cardinality::Single => "1".to_string(),
        Cardinality::Batch(ExpectedCount::PerTarget) => "per-target".to_string(),
        Cardinality::Batch(ExpectedCount::Fixed(count)) => count.to_string(),
    };
    let row = OperationRow {
        id: descriptor.id,
        name: descriptor.name,
        min_version: descriptor.min_version.as_str(),
        batch: descriptor.is_batch(),
        expected,
        targets: descriptor.targets.map(|spec| spec.group),
        fields: descriptor.fields.iter().map(|spec| spec.name).collect(),
    };
    serde_json::to_value(row).unwrap_or(Value::Null)
}

pub(crate) fn batch_json(result: &BatchResult) -> Value {
    let outcome = match result.outcome() {
        BatchOutcome::AllSucceeded => "all_succeeded",
        BatchOutcome::PartialFailure => "partial_failure",
    };
    json!({
        "operation": result.operation(),
        "outcome": outcome,
        "messages": result.iter().map(message_json).collect::<Vec<_>>(),
    })
}

pub(crate) fn message_json(message: &ResponseMessage) -> Value {
    let mut map = Map::new();
    map.insert("index".to_string(), json!(message.index));
    map.insert("status".to_string(), json!(message.status.as_str()));
    if let Some(code) = &message.error_code {
        map.insert("code".to_string(), json!(code));
    }
    if let Some(text) = &message.error_message {
        map.insert("message".to_string(), json!(text));
    }
    if !message.payload.is_empty() {
        map.insert(
            "payload".to_string(),
            Value::Object(grouped(message.payload.nodes())),
        );
    }
    Value::Object(map)
}

fn node_json(node: &Node) -> Value {
    match &node.value {
        NodeValue::Empty => Value::Null,
        NodeValue::Text(text) => json!(text),
        NodeValue::Children(children) | NodeValue::List(children) => {
            Value::Object(grouped(children))
        }
    }
}

// `node_json` never yields an array, so an array here always means a repeated element.
fn grouped(nodes: &[Node]) -> Map<String, Value> {
    let mut map = Map::new();
    for node in nodes {
        let value = node_json(node);
        match map.get_mut(&node.name) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(node.name.clone(), value);
            }
        }
    }
    map
}

pub(crate) fn event_batch_json(batch: &EventBatch) -> Value {
    let mut map = Map::new();
    map.insert("subscription_id".to_string(), json!(batch.subscription_id));
    if let Some(previous) = &batch.previous_watermark {
        map.insert("previous_watermark".to_string(), json!(previous));
    }
    if let Some(watermark) = batch.watermark() {
        map.insert("watermark".to_string(), json!(watermark));
    }
    map.insert("more_events".to_string(), json!(batch.more_events));
    if let Some(received) = format_time(batch.received_at) {
        map.insert("received_at".to_string(), json!(received));
    }
    map.insert(
        "events".to_string(),
        Value::Array(batch.events.iter().map(event_json).collect()),
    );
    Value::Object(map)
}

fn event_json(event: &Event) -> Value {
    let mut map = Map::new();
    map.insert("kind".to_string(), json!(event.kind.tag()));
    let optional = [
        ("watermark", event.watermark.clone()),
        ("timestamp", event.timestamp.and_then(format_time)),
        ("item_id", event.item_id.clone()),
        ("folder_id", event.folder_id.clone()),
        ("parent_folder_id", event.parent_folder_id.clone()),
        ("old_id", event.old_id.clone()),
        ("old_parent_folder_id", event.old_parent_folder_id.clone()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            map.insert(key.to_string(), json!(value));
        }
    }
    if let Some(unread) = event.unread_count {
        map.insert("unread_count".to_string(), json!(unread));
    }
    Value::Object(map)
}

fn format_time(value: OffsetDateTime) -> Option<String> {
    value.format(&Rfc3339).ok()
}
