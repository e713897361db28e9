//! Purpose: Correlate a multi-target call's response messages to its targets.
//! Exports: `correlate`, `ServiceClient::execute_batch`.
//! Role: Applies the count check and the per-request error-handling policy.
//! Invariants: Count mismatch aborts in every mode; position is the only correlation key.
//! Invariants: `ThrowOnFirstError` never returns a partial result.
#![allow(clippy::result_large_err)]

use super::executor::ServiceClient;
use super::transport::Transport;
use crate::core::error::{Error, ErrorKind};
use crate::core::operation::OperationDescriptor;
use crate::core::request::{ErrorHandlingMode, ServiceRequest};
use crate::core::response::{BatchResult, ResponseMessage};
use crate::core::version::VersionNegotiator;

/// Builds a `BatchResult` from decoded messages, or the error the policy calls for.
/// Each message is re-indexed by its position; incoming `index` values are ignored.
pub fn correlate(
    descriptor: &'static OperationDescriptor,
    messages: Vec<ResponseMessage>,
    expected: usize,
    mode: ErrorHandlingMode,
) -> Result<BatchResult, Error> {
    if messages.len() != expected {
        return Err(Error::new(ErrorKind::ResponseCountMismatch)
            .with_operation(descriptor.name)
            .with_message(format!(
                "expected {expected} response message(s), received {}",
                messages.len()
            )));
    }

    let messages = messages
        .into_iter()
        .enumerate()
        .map(|(position, mut message)| {
            message.index = position;
            message
        })
        .collect();
    let result = BatchResult::new(descriptor.name, messages);
    match mode {
        ErrorHandlingMode::ThrowOnFirstError => {
            if let Some(first) = result.failures().next() {
                return Err(first.to_error(descriptor.name));
            }
        }
        ErrorHandlingMode::ReturnAllResults => {
            for failure in result.failures() {
                tracing::warn!(
                    operation = descriptor.name,
                    index = failure.index,
                    code = failure.error_code.as_deref().unwrap_or_default(),
                    "item failed"
                );
            }
        }
    }
    Ok(result)
}

impl<T: Transport, V: VersionNegotiator> ServiceClient<T, V> {
    /// Sends all targets in one document and returns one entry per expected outcome.
    pub fn execute_batch(&self, request: &ServiceRequest) -> Result<BatchResult, Error> {
        let messages = self.round_trip(request)?;
        correlate(
            request.descriptor(),
            messages,
            request.expected_count(),
            request.error_mode(),
        )
    }
}
