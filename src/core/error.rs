//! Purpose: Single error type shared by the codecs, the executor and subscriptions.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Carries the failure taxonomy plus optional operation/item/service-code context.
//! Invariants: Structural kinds (protocol, count, version) are never downgraded to per-item data.
//! Invariants: Exit codes per kind are stable once published.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Validation,
    EmptyBatch,
    UnsupportedVersion,
    ProtocolMismatch,
    MalformedResponse,
    ResponseCountMismatch,
    Transport,
    Service,
    SubscriptionExpired,
    InvalidTimeout,
    IncompatibleParameter,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal",
            ErrorKind::Usage => "Usage",
            ErrorKind::Validation => "Validation",
            ErrorKind::EmptyBatch => "EmptyBatch",
            ErrorKind::UnsupportedVersion => "UnsupportedVersion",
            ErrorKind::ProtocolMismatch => "ProtocolMismatch",
            ErrorKind::MalformedResponse => "MalformedResponse",
            ErrorKind::ResponseCountMismatch => "ResponseCountMismatch",
            ErrorKind::Transport => "Transport",
            ErrorKind::Service => "Service",
            ErrorKind::SubscriptionExpired => "SubscriptionExpired",
            ErrorKind::InvalidTimeout => "InvalidTimeout",
            ErrorKind::IncompatibleParameter => "IncompatibleParameter",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    operation: Option<String>,
    index: Option<usize>,
    code: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            operation: None,
            index: None,
            code: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Position of the failing target for per-item service errors.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Service response code (e.g. `ErrorAccessDenied`) for per-item errors.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        if let Some(operation) = &self.operation {
            write!(f, " (operation: {operation})")?;
        }
        if let Some(index) = self.index {
            write!(f, " (index: {index})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Validation => 3,
        ErrorKind::EmptyBatch => 4,
        ErrorKind::UnsupportedVersion => 5,
        ErrorKind::ProtocolMismatch => 6,
        ErrorKind::MalformedResponse => 7,
        ErrorKind::ResponseCountMismatch => 8,
        ErrorKind::Transport => 9,
        ErrorKind::Service => 10,
        ErrorKind::SubscriptionExpired => 11,
        ErrorKind::InvalidTimeout => 12,
        ErrorKind::IncompatibleParameter => 13,
    }
}
