//! Purpose: Public client surface: executor, batch correlation, subscriptions, transport.
//! Exports: `ServiceClient`, `ClientOptions`, `Transport`, `HttpTransport`, sessions and events.
//! Role: Runs `core` requests against a transport; the CLI and tests only go through here.
//! Invariants: Every network call goes through `Transport`; nothing here touches sockets directly.
//! Invariants: Re-exports stay additive so callers can import from `mailrpc::api` alone.

mod batch;
mod events;
mod executor;
mod streaming;
mod subscription;
mod transport;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::request::{ErrorHandlingMode, ServiceRequest};
pub use crate::core::response::{
    BatchOutcome, BatchResult, ObjectFactory, Payload, ResponseClass, ResponseMessage,
};
pub use crate::core::shape::{BaseShape, Shape};
pub use crate::core::target::{ResponseObjectKind, TargetId, TargetList};
pub use crate::core::version::{FixedVersion, ProtocolVersion, VersionNegotiator};
pub use crate::core::wire::{WireDocument, WireFormat};
pub use batch::correlate;
pub use events::{Event, EventBatch, EventKind};
pub use executor::{ClientOptions, ServiceClient};
pub use streaming::{CancelToken, EventStream, MAX_CONNECTION_TIMEOUT_MINUTES, ReceiveOptions};
pub use subscription::{
    MAX_TIMEOUT_MINUTES, MIN_TIMEOUT_MINUTES, SessionState, SubscriptionMode, SubscriptionParams,
    SubscriptionSession,
};
pub use transport::{DEFAULT_STREAM_READ_SLICE, EventSource, HttpTransport, StreamRead, Transport};
