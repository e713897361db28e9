//! Purpose: Run one request through validate, gate, encode, send, decode.
//! Exports: `ServiceClient`, `ClientOptions`.
//! Role: Shared round trip for single calls, batches and subscription sessions.
//! Invariants: Validation and the version gate run before any transport call.
//! Invariants: Exactly one `Transport::send` per executed request.
#![allow(clippy::result_large_err)]

use super::batch::correlate;
use super::transport::{EventSource, Transport};
use crate::core::error::{Error, ErrorKind};
use crate::core::request::{ErrorHandlingMode, ServiceRequest};
use crate::core::response::ResponseMessage;
use crate::core::version::{self, FixedVersion, ProtocolVersion, VersionNegotiator};
use crate::core::wire::{self, WireDocument, WireFormat};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub format: WireFormat,
    /// Slice used when waiting on a stream, so cancellation is seen promptly.
    pub poll_interval: Duration,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self {
            format: WireFormat::Markup,
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ServiceClient<T, V = FixedVersion> {
    transport: T,
    version: V,
    options: ClientOptions,
}

impl<T: Transport, V: VersionNegotiator> ServiceClient<T, V> {
    pub fn new(transport: T, version: V) -> Self {
        Self {
            transport,
            version,
            options: ClientOptions::new(),
        }
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn negotiated_version(&self) -> ProtocolVersion {
        self.version.negotiated_version()
    }

    /// Validates, gates and encodes a request without sending it.
    pub fn prepare(&self, request: &ServiceRequest) -> Result<WireDocument, Error> {
        request.validate()?;
        version::check(request.descriptor(), self.negotiated_version())?;
        wire::encode(request, self.options.format)
    }

    pub(crate) fn round_trip(
        &self,
        request: &ServiceRequest,
    ) -> Result<Vec<ResponseMessage>, Error> {
        let descriptor = request.descriptor();
        let document = self.prepare(request)?;
        tracing::debug!(
            operation = descriptor.name,
            targets = request.targets().len(),
            format = %document.format,
            bytes = document.len(),
            "sending request"
        );
        let reply = self.transport.send(&document, descriptor.name)?;
        let messages = wire::decode(&reply, descriptor)?;
        tracing::debug!(
            operation = descriptor.name,
            messages = messages.len(),
            bytes = reply.len(),
            "decoded response"
        );
        Ok(messages)
    }

    /// Runs a request with exactly one expected outcome. Any Error entry is raised;
    /// Warning entries are returned.
    pub fn execute(&self, request: &ServiceRequest) -> Result<ResponseMessage, Error> {
        let expected = request.expected_count();
        if expected != 1 {
            return Err(Error::new(ErrorKind::Validation)
                .with_operation(request.operation_name())
                .with_message(format!(
                    "execute expects one outcome; request has {expected}"
                ))
                .with_hint("Use execute_batch for multi-target requests."));
        }
        let messages = self.round_trip(request)?;
        let result = correlate(
            request.descriptor(),
            messages,
            expected,
            ErrorHandlingMode::ThrowOnFirstError,
        )?;
        result.into_messages().into_iter().next().ok_or_else(|| {
            Error::new(ErrorKind::ResponseCountMismatch)
                .with_operation(request.operation_name())
                .with_message("response carried no messages")
        })
    }

    pub(crate) fn open_stream(
        &self,
        request: &ServiceRequest,
    ) -> Result<Box<dyn EventSource>, Error> {
        let descriptor = request.descriptor();
        let document = self.prepare(request)?;
        tracing::debug!(
            operation = descriptor.name,
            format = %document.format,
            bytes = document.len(),
            "opening stream"
        );
        self.transport.open_stream(&document, descriptor.name)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientOptions, ServiceClient};
    use crate::api::transport::Transport;
    use crate::core::catalog;
    use crate::core::error::{Error, ErrorKind};
    use crate::core::request::{ErrorHandlingMode, ServiceRequest};
    use crate::core::response::ResponseClass;
    use crate::core::target::TargetId;
    use crate::core::version::{FixedVersion, ProtocolVersion};
    use crate::core::wire::{WireDocument, WireFormat};
    use std::cell::{Cell, RefCell};

    struct Canned {
        reply: String,
        sent: Cell<usize>,
        last: RefCell<Option<WireDocument>>,
    }

    impl Canned {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                sent: Cell::new(0),
                last: RefCell::new(None),
            }
        }
    }

    impl Transport for Canned {
        fn send(&self, document: &WireDocument, _operation: &str) -> Result<WireDocument, Error> {
            self.sent.set(self.sent.get() + 1);
            *self.last.borrow_mut() = Some(document.clone());
            Ok(WireDocument::new(document.format, self.reply.clone()))
        }
    }

    fn unsubscribe() -> ServiceRequest {
        ServiceRequest::new(&catalog::UNSUBSCRIBE, ErrorHandlingMode::ThrowOnFirstError)
            .with_field("SubscriptionId", "sub-1")
    }

    #[test]
    fn execute_returns_warning_entries() {
        let transport = Canned::new(
            r#"{"UnsubscribeResponse":{"ResponseMessages":[{"__type":"UnsubscribeResponseMessage","ResponseClass":"Warning","ResponseCode":"ErrorBatchProcessingStopped"}]}}"#,
        );
        let client = ServiceClient::new(&transport, FixedVersion(ProtocolVersion::Exchange2016))
            .with_options(ClientOptions::new().with_format(WireFormat::ObjectNotation));
        let message = client.execute(&unsubscribe()).expect("execute");
        assert_eq!(message.status, ResponseClass::Warning);
        assert_eq!(transport.sent.get(), 1);
    }

    #[test]
    fn execute_raises_service_error_even_when_returning_all() {
        let transport = Canned::new(
            r#"<m:UnsubscribeResponse><m:ResponseMessages><m:UnsubscribeResponseMessage ResponseClass="Error"><m:MessageText>gone</m:MessageText><m:ResponseCode>ErrorSubscriptionNotFound</m:ResponseCode></m:UnsubscribeResponseMessage></m:ResponseMessages></m:UnsubscribeResponse>"#,
        );
        let client = ServiceClient::new(&transport, FixedVersion(ProtocolVersion::Exchange2016));
        let mut request = unsubscribe();
        request.set_error_mode(ErrorHandlingMode::ReturnAllResults);
        let err = client.execute(&request).expect_err("service");
        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(err.code(), Some("ErrorSubscriptionNotFound"));
        assert_eq!(err.message(), Some("gone"));
    }

    #[test]
    fn execute_rejects_multi_target_requests_before_io() {
        let transport = Canned::new("");
        let client = ServiceClient::new(&transport, FixedVersion(ProtocolVersion::Exchange2016));
        let request =
            ServiceRequest::new(&catalog::DELETE_ITEM, ErrorHandlingMode::ThrowOnFirstError)
                .with_attribute("DeleteType", "HardDelete")
                .with_target(TargetId::item("a"))
                .with_target(TargetId::item("b"));
        let err = client.execute(&request).expect_err("validation");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(transport.sent.get(), 0);
    }

    #[test]
    fn version_gate_runs_before_send() {
        let transport = Canned::new("");
        let client = ServiceClient::new(&transport, FixedVersion(ProtocolVersion::Exchange2010));
        let request =
            ServiceRequest::new(&catalog::MARK_AS_JUNK, ErrorHandlingMode::ThrowOnFirstError)
                .with_attribute("IsJunk", "true")
                .with_attribute("MoveItem", "true")
                .with_target(TargetId::item("a"));
        let err = client.execute(&request).expect_err("gate");
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
        assert_eq!(transport.sent.get(), 0);
        assert!(transport.last.borrow().is_none());
    }
}
