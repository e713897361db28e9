//! Purpose: Lazy, cancellable reader over a streaming subscription's open connection.
//! Exports: `EventStream`, `ReceiveOptions`, `CancelToken`, `SubscriptionSession::receive`.
//! Role: Turns stream documents into event batches and owns the stop conditions.
//! Invariants: The stream ends on heartbeat timeout, server close, caller disconnect or cancel.
//! Invariants: Any end terminates the session; dropping the stream early keeps the connection.
//! Invariants: Waits are bounded by the client poll interval so cancellation is seen promptly.
#![allow(clippy::result_large_err)]

use super::events::EventBatch;
use super::executor::ServiceClient;
use super::subscription::{SubscriptionMode, SubscriptionSession};
use super::transport::{StreamRead, Transport};
use crate::core::catalog;
use crate::core::error::{Error, ErrorKind};
use crate::core::node::{Namespace, Node};
use crate::core::request::{ErrorHandlingMode, ServiceRequest};
use crate::core::version::VersionNegotiator;
use crate::core::wire::{self, WireDocument};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const MAX_CONNECTION_TIMEOUT_MINUTES: u32 = 30;

/// Shared flag a caller (or a signal handler) sets to stop a stream.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing flag, e.g. one registered with `signal_hook::flag::register`.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct ReceiveOptions {
    /// Longest silence (no documents, not even keep-alives) before the stream ends.
    pub heartbeat: Duration,
    /// Minutes the server keeps one streaming connection open (1..=30).
    pub connection_timeout_minutes: u32,
    pub cancel: Option<CancelToken>,
}

impl ReceiveOptions {
    pub fn new() -> Self {
        Self {
            heartbeat: Duration::from_secs(120),
            connection_timeout_minutes: MAX_CONNECTION_TIMEOUT_MINUTES,
            cancel: None,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_connection_timeout(mut self, minutes: u32) -> Self {
        self.connection_timeout_minutes = minutes;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if !(1..=MAX_CONNECTION_TIMEOUT_MINUTES).contains(&self.connection_timeout_minutes) {
            return Err(Error::new(ErrorKind::InvalidTimeout).with_message(format!(
                "connection timeout must be between 1 and {MAX_CONNECTION_TIMEOUT_MINUTES} minutes; got {}",
                self.connection_timeout_minutes
            )));
        }
        if self.heartbeat.is_zero() {
            return Err(
                Error::new(ErrorKind::InvalidTimeout).with_message("heartbeat must be non-zero")
            );
        }
        Ok(())
    }
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionSession {
    /// Opens (or reuses) the streaming connection and returns a lazy batch iterator.
    pub fn receive<'s, T: Transport, V: VersionNegotiator>(
        &'s mut self,
        client: &ServiceClient<T, V>,
        options: ReceiveOptions,
    ) -> Result<EventStream<'s>, Error> {
        if self.mode() != SubscriptionMode::Streaming {
            return Err(Error::new(ErrorKind::IncompatibleParameter)
                .with_message("only streaming sessions can receive")
                .with_hint("Use poll for pull sessions."));
        }
        let id = self.active_id()?.to_string();
        options.validate()?;

        if self.connection.is_none() {
            let request = ServiceRequest::new(
                &catalog::GET_STREAMING_EVENTS,
                ErrorHandlingMode::ThrowOnFirstError,
            )
            .with_field_node(Node::list(
                Namespace::Messages,
                "SubscriptionIds",
                vec![Node::text(Namespace::Types, "SubscriptionId", id.as_str())],
            ))
            .with_field(
                "ConnectionTimeout",
                options.connection_timeout_minutes.to_string(),
            );
            let connection = match client.open_stream(&request) {
                Ok(connection) => connection,
                Err(err) => return Err(self.expire_on(err)),
            };
            self.connection = Some(connection);
            tracing::info!(subscription = id.as_str(), "stream connected");
        }

        Ok(EventStream {
            session: self,
            poll_interval: client.options().poll_interval,
            heartbeat: options.heartbeat,
            cancel: options.cancel,
            last_activity: Instant::now(),
            pending: VecDeque::new(),
            closing: false,
            finished: false,
        })
    }
}

pub struct EventStream<'s> {
    session: &'s mut SubscriptionSession,
    poll_interval: Duration,
    heartbeat: Duration,
    cancel: Option<CancelToken>,
    last_activity: Instant,
    pending: VecDeque<EventBatch>,
    closing: bool,
    finished: bool,
}

impl EventStream<'_> {
    pub fn session(&self) -> &SubscriptionSession {
        self.session
    }

    /// Ends the stream and the session without waiting for the server.
    pub fn disconnect(&mut self) {
        self.pending.clear();
        self.finish("disconnected");
    }

    pub fn next_batch(&mut self) -> Result<Option<EventBatch>, Error> {
        loop {
            if let Some(batch) = self.pending.pop_front() {
                return Ok(Some(batch));
            }
            if self.finished {
                return Ok(None);
            }
            if self.closing {
                self.finish("server closed connection");
                return Ok(None);
            }
            if self
                .cancel
                .as_ref()
                .is_some_and(CancelToken::is_cancelled)
            {
                self.finish("cancelled");
                return Ok(None);
            }
            let idle = self.last_activity.elapsed();
            if idle >= self.heartbeat {
                tracing::warn!(
                    subscription = self.session.id().unwrap_or_default(),
                    idle_ms = idle.as_millis() as u64,
                    "stream heartbeat timed out"
                );
                self.finish("heartbeat timeout");
                return Ok(None);
            }
            let wait = (self.heartbeat - idle).min(self.poll_interval);

            let Some(connection) = self.session.connection.as_mut() else {
                self.finish("connection closed");
                return Ok(None);
            };
            match connection.next_document(wait) {
                Ok(StreamRead::Idle) => {}
                Ok(StreamRead::Closed) => {
                    self.finish("connection closed");
                    return Ok(None);
                }
                Ok(StreamRead::Document(document)) => {
                    self.last_activity = Instant::now();
                    if let Err(err) = self.absorb(&document) {
                        self.finish("stream error");
                        return Err(err);
                    }
                }
                Err(err) => {
                    self.finish("transport error");
                    return Err(err);
                }
            }
        }
    }

    fn absorb(&mut self, document: &WireDocument) -> Result<(), Error> {
        let descriptor = &catalog::GET_STREAMING_EVENTS;
        let messages = wire::decode(document, descriptor)?;
        for message in messages {
            if message.is_error() {
                return Err(self.session.expire_on(message.to_error(descriptor.name)));
            }
            if message.payload.text(&["ConnectionStatus"]) == Some("Closed") {
                self.closing = true;
            }
            let Some(notifications) = message.payload.find("Notifications") else {
                continue;
            };
            for node in notifications.children_named("Notification") {
                let batch = EventBatch::from_notification(node)
                    .map_err(|err| err.with_operation(descriptor.name))?;
                self.session.advance(&batch);
                self.pending.push_back(batch);
            }
        }
        Ok(())
    }

    fn finish(&mut self, reason: &str) {
        self.finished = true;
        self.session.terminate(reason);
    }
}

impl Iterator for EventStream<'_> {
    type Item = Result<EventBatch, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}
