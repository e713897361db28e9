//! Purpose: Map requests to wire documents and wire documents to response messages.
//! Exports: `WireFormat`, `WireDocument`, `encode`, `render`, `request_tree`, `parse_tree`, `decode`.
//! Role: The single encoder/decoder entry point; both formats share one tree builder and one interpreter.
//! Invariants: Root attributes, then fields in schema order, then the target group, in both formats.
//! Invariants: Response messages are indexed by document order; status is read before payload.
//! Invariants: Structural decode failures are errors, never defaults.
pub mod markup;
pub mod notation;

use super::error::{Error, ErrorKind};
use super::node::{Namespace, Node};
use super::operation::{FieldPlacement, OperationDescriptor};
use super::request::ServiceRequest;
use super::response::{Payload, ResponseClass, ResponseMessage};
use std::fmt;
use std::str::FromStr;

const STATUS_FIELDS: [&str; 5] = [
    "ResponseClass",
    "ResponseCode",
    "MessageText",
    "DescriptiveLinkKey",
    "MessageXml",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum WireFormat {
    Markup,
    ObjectNotation,
}

impl WireFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            WireFormat::Markup => "xml",
            WireFormat::ObjectNotation => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Markup => "text/xml; charset=utf-8",
            WireFormat::ObjectNotation => "application/json; charset=utf-8",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "xml" | "markup" => Ok(WireFormat::Markup),
            "json" | "notation" => Ok(WireFormat::ObjectNotation),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown wire format: {value}"))
                .with_hint("Use xml or json.")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WireDocument {
    pub format: WireFormat,
    pub body: String,
}

impl WireDocument {
    pub fn new(format: WireFormat, body: impl Into<String>) -> Self {
        Self {
            format,
            body: body.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Builds the format-neutral tree for a request. Does not validate.
pub fn request_tree(request: &ServiceRequest) -> Node {
    let descriptor = request.descriptor();
    let mut root = Node::element(Namespace::Messages, descriptor.name);

    for spec in descriptor.fields {
        match spec.placement {
            FieldPlacement::Attribute => {
                if let Some((key, value)) =
                    request.attributes().iter().find(|(key, _)| key == spec.name)
                {
                    root = root.with_attribute(key.as_str(), value.as_str());
                }
            }
            FieldPlacement::Element => {
                if let Some(field) = request.fields().iter().find(|field| field.name == spec.name) {
                    root = root.with_child(field.clone());
                }
            }
            FieldPlacement::Shape => {
                if let Some(shape) = request.shape() {
                    root = root.with_child(shape.to_node(spec.name));
                }
            }
        }
    }

    if let Some(spec) = descriptor.targets {
        let targets = request.targets().iter().map(|target| target.to_node()).collect();
        root = root.with_child(Node::list(Namespace::Messages, spec.group, targets));
    }
    root
}

pub fn render(root: &Node, format: WireFormat) -> Result<WireDocument, Error> {
    let body = match format {
        WireFormat::Markup => markup::write(root)?,
        WireFormat::ObjectNotation => notation::write(root)?,
    };
    Ok(WireDocument::new(format, body))
}

pub fn encode(request: &ServiceRequest, format: WireFormat) -> Result<WireDocument, Error> {
    render(&request_tree(request), format)
}

/// Parses a document into its decoded tree, skipping a SOAP envelope if present.
pub fn parse_tree(document: &WireDocument) -> Result<Node, Error> {
    let root = match document.format {
        WireFormat::Markup => markup::parse(&document.body)?,
        WireFormat::ObjectNotation => notation::parse(&document.body)?,
    };
    if root.name != "Envelope" {
        return Ok(root);
    }
    let body = root.child("Body").ok_or_else(|| {
        Error::new(ErrorKind::MalformedResponse).with_message("envelope has no Body element")
    })?;
    if let Some(fault) = body.child("Fault") {
        let reason = fault
            .value_of("faultstring")
            .unwrap_or("server returned a fault")
            .to_string();
        return Err(Error::new(ErrorKind::ProtocolMismatch).with_message(reason));
    }
    body.children().first().cloned().ok_or_else(|| {
        Error::new(ErrorKind::MalformedResponse).with_message("envelope Body is empty")
    })
}

pub fn decode(
    document: &WireDocument,
    descriptor: &OperationDescriptor,
) -> Result<Vec<ResponseMessage>, Error> {
    let root = parse_tree(document).map_err(|err| err.with_operation(descriptor.name))?;
    interpret(&root, descriptor).map_err(|err| err.with_operation(descriptor.name))
}

fn interpret(root: &Node, descriptor: &OperationDescriptor) -> Result<Vec<ResponseMessage>, Error> {
    if root.name != descriptor.response_tag {
        return Err(Error::new(ErrorKind::ProtocolMismatch).with_message(format!(
            "expected root {}, found {}",
            descriptor.response_tag, root.name
        )));
    }
    let group = root.child("ResponseMessages").ok_or_else(|| {
        Error::new(ErrorKind::MalformedResponse).with_message("missing ResponseMessages")
    })?;

    group
        .children()
        .iter()
        .enumerate()
        .map(|(index, node)| read_message(index, node, descriptor))
        .collect()
}

fn read_message(
    index: usize,
    node: &Node,
    descriptor: &OperationDescriptor,
) -> Result<ResponseMessage, Error> {
    if node.name != descriptor.message_tag {
        return Err(Error::new(ErrorKind::ProtocolMismatch)
            .with_index(index)
            .with_message(format!(
                "expected {}, found {}",
                descriptor.message_tag, node.name
            )));
    }
    let class = node.value_of("ResponseClass").ok_or_else(|| {
        Error::new(ErrorKind::MalformedResponse)
            .with_index(index)
            .with_message("response message is missing ResponseClass")
    })?;
    let status = ResponseClass::parse(class).ok_or_else(|| {
        Error::new(ErrorKind::MalformedResponse)
            .with_index(index)
            .with_message(format!("unknown ResponseClass {class}"))
    })?;
    let error_code = node.value_of("ResponseCode").map(str::to_string);
    if status == ResponseClass::Error && error_code.is_none() {
        return Err(Error::new(ErrorKind::MalformedResponse)
            .with_index(index)
            .with_message("error response message is missing ResponseCode"));
    }
    let error_message = node.value_of("MessageText").map(str::to_string);

    let payload = if status == ResponseClass::Error {
        Payload::default()
    } else {
        Payload::new(
            node.children()
                .iter()
                .filter(|child| !STATUS_FIELDS.contains(&child.name.as_str()))
                .cloned()
                .collect(),
        )
    };

    Ok(ResponseMessage {
        index,
        status,
        error_code,
        error_message,
        payload,
    })
}
