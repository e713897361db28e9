//! Purpose: Decoded per-target outcomes and the aggregate handed back to callers.
//! Exports: `ResponseClass`, `ResponseMessage`, `Payload`, `BatchResult`, `BatchOutcome`,
//! `ObjectFactory`.
//! Role: Output side of the executor; positions here are the correlation to request targets.
//! Invariants: `BatchResult` is read-only once built; `messages()[i].index == i`.
//! Invariants: Error entries never carry a payload.
use super::error::{Error, ErrorKind};
use super::node::Node;
use super::shape::Shape;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseClass {
    Success,
    Warning,
    Error,
}

impl ResponseClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseClass::Success => "Success",
            ResponseClass::Warning => "Warning",
            ResponseClass::Error => "Error",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "Success" => Some(ResponseClass::Success),
            "Warning" => Some(ResponseClass::Warning),
            "Error" => Some(ResponseClass::Error),
            _ => None,
        }
    }
}

/// Operation-specific content of one response message, in document order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Payload {
    nodes: Vec<Node>,
}

impl Payload {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Walks nested children by name, e.g. `["Items", "Message", "Subject"]`.
    pub fn path(&self, names: &[&str]) -> Option<&Node> {
        let (first, rest) = names.split_first()?;
        let mut node = self.find(first)?;
        for name in rest {
            node = node.child(name)?;
        }
        Some(node)
    }

    pub fn text(&self, names: &[&str]) -> Option<&str> {
        self.path(names).and_then(Node::as_text)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponseMessage {
    pub index: usize,
    pub status: ResponseClass,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub payload: Payload,
}

impl ResponseMessage {
    pub fn is_error(&self) -> bool {
        self.status == ResponseClass::Error
    }

    pub(crate) fn to_error(&self, operation: &str) -> Error {
        let mut err = Error::new(ErrorKind::Service)
            .with_operation(operation)
            .with_index(self.index);
        if let Some(code) = &self.error_code {
            err = err.with_code(code.clone());
        }
        let message = self
            .error_message
            .clone()
            .or_else(|| self.error_code.clone())
            .unwrap_or_else(|| "service reported an error".to_string());
        err.with_message(message)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BatchOutcome {
    /// Every entry is Success or Warning.
    AllSucceeded,
    /// At least one entry is Error (only possible under `ReturnAllResults`).
    PartialFailure,
}

/// Builds a typed domain object from one successful response payload.
pub trait ObjectFactory {
    type Output;

    fn materialize(&self, payload: &Payload, shape: Option<&Shape>) -> Result<Self::Output, Error>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchResult {
    operation: &'static str,
    messages: Vec<ResponseMessage>,
    outcome: BatchOutcome,
}

impl BatchResult {
    pub(crate) fn new(operation: &'static str, messages: Vec<ResponseMessage>) -> Self {
        let outcome = if messages.iter().any(ResponseMessage::is_error) {
            BatchOutcome::PartialFailure
        } else {
            BatchOutcome::AllSucceeded
        };
        Self {
            operation,
            messages,
            outcome,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn outcome(&self) -> BatchOutcome {
        self.outcome
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[ResponseMessage] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&ResponseMessage> {
        self.messages.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResponseMessage> {
        self.messages.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResponseMessage> {
        self.messages.iter().filter(|message| message.is_error())
    }

    /// Per-item failures as errors, in target order.
    pub fn errors(&self) -> Vec<Error> {
        self.failures()
            .map(|message| message.to_error(self.operation))
            .collect()
    }

    pub fn into_messages(self) -> Vec<ResponseMessage> {
        self.messages
    }

    /// Calls `factory` once per non-error entry; error entries yield `None`.
    pub fn materialize<F: ObjectFactory>(
        &self,
        factory: &F,
        shape: Option<&Shape>,
    ) -> Result<Vec<Option<F::Output>>, Error> {
        self.messages
            .iter()
            .map(|message| {
                if message.is_error() {
                    Ok(None)
                } else {
                    factory.materialize(&message.payload, shape).map(Some)
                }
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a ResponseMessage;
    type IntoIter = std::slice::Iter<'a, ResponseMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
