//! Purpose: Stateful change-notification sessions (pull, push, streaming).
//! Exports: `SubscriptionSession`, `SubscriptionMode`, `SubscriptionParams`, `SessionState`.
//! Role: Owns the subscription id, the watermark and, for streaming, the open connection.
//! Invariants: States only move Unsubscribed -> Active -> Terminated; Terminated is final.
//! Invariants: Parameters are validated before the subscribe call is sent.
//! Invariants: Expired or unknown subscriptions surface as `SubscriptionExpired` and terminate.
#![allow(clippy::result_large_err)]

use super::batch::correlate;
use super::events::{EventBatch, EventKind};
use super::executor::ServiceClient;
use super::transport::{EventSource, Transport};
use crate::core::catalog;
use crate::core::error::{Error, ErrorKind};
use crate::core::node::{Namespace, Node};
use crate::core::operation::TargetKind;
use crate::core::request::{ErrorHandlingMode, ServiceRequest};
use crate::core::response::{BatchResult, Payload, ResponseMessage};
use crate::core::target::TargetId;
use crate::core::version::VersionNegotiator;
use crate::core::wire::{self, WireDocument, WireFormat};

const EXPIRED_CODES: [&str; 3] = [
    "ErrorSubscriptionNotFound",
    "ErrorExpiredSubscription",
    "ErrorInvalidSubscription",
];

pub const MIN_TIMEOUT_MINUTES: u32 = 1;
pub const MAX_TIMEOUT_MINUTES: u32 = 1440;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscriptionMode {
    Pull,
    Push,
    Streaming,
}

impl SubscriptionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionMode::Pull => "pull",
            SubscriptionMode::Push => "push",
            SubscriptionMode::Streaming => "streaming",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Unsubscribed,
    Active,
    Terminated,
}

#[derive(Clone, Debug)]
pub struct SubscriptionParams {
    pub folders: Vec<TargetId>,
    pub event_kinds: Vec<EventKind>,
    /// Resume point for pull and push sessions.
    pub watermark: Option<String>,
    /// Pull only: minutes the server keeps the subscription without a poll.
    pub timeout_minutes: u32,
    /// Push only.
    pub callback_url: Option<String>,
    /// Push only: minutes between status notifications.
    pub status_frequency: u32,
}

impl SubscriptionParams {
    pub fn new(folders: impl IntoIterator<Item = TargetId>) -> Self {
        Self {
            folders: folders.into_iter().collect(),
            event_kinds: vec![EventKind::NewMail],
            watermark: None,
            timeout_minutes: 30,
            callback_url: None,
            status_frequency: 30,
        }
    }

    pub fn with_event_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.event_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_watermark(mut self, watermark: impl Into<String>) -> Self {
        self.watermark = Some(watermark.into());
        self
    }

    pub fn with_timeout(mut self, minutes: u32) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    pub fn with_callback(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_status_frequency(mut self, minutes: u32) -> Self {
        self.status_frequency = minutes;
        self
    }

    fn validate(&self, mode: SubscriptionMode) -> Result<(), Error> {
        if self.folders.is_empty() {
            return Err(Error::new(ErrorKind::Validation)
                .with_message("subscription needs at least one folder"));
        }
        if let Some(index) = self
            .folders
            .iter()
            .position(|folder| folder.kind() != TargetKind::Folder)
        {
            return Err(Error::new(ErrorKind::Validation)
                .with_index(index)
                .with_message("subscriptions only accept folder ids"));
        }
        if self.event_kinds.is_empty() {
            return Err(Error::new(ErrorKind::Validation)
                .with_message("subscription needs at least one event type"));
        }
        if self.event_kinds.contains(&EventKind::Status) {
            return Err(Error::new(ErrorKind::Validation)
                .with_message("status events cannot be subscribed to"));
        }

        match mode {
            SubscriptionMode::Pull => check_minutes("timeout", self.timeout_minutes),
            SubscriptionMode::Push => {
                if self.callback_url.is_none() {
                    return Err(Error::new(ErrorKind::Validation)
                        .with_message("push subscription needs a callback url"));
                }
                check_minutes("status frequency", self.status_frequency)
            }
            SubscriptionMode::Streaming => {
                if self.watermark.is_some() {
                    return Err(Error::new(ErrorKind::IncompatibleParameter)
                        .with_message("streaming subscriptions do not accept a watermark"));
                }
                Ok(())
            }
        }
    }

    fn request_node(&self, mode: SubscriptionMode) -> Node {
        let tag = match mode {
            SubscriptionMode::Pull => "PullSubscriptionRequest",
            SubscriptionMode::Push => "PushSubscriptionRequest",
            SubscriptionMode::Streaming => "StreamingSubscriptionRequest",
        };
        let folders = self.folders.iter().map(TargetId::to_node).collect();
        let kinds = self
            .event_kinds
            .iter()
            .map(|kind| Node::text(Namespace::Types, "EventType", kind.tag()))
            .collect();
        let mut node = Node::element(Namespace::Messages, tag)
            .with_child(Node::list(Namespace::Types, "FolderIds", folders))
            .with_child(Node::list(Namespace::Types, "EventTypes", kinds));
        if mode != SubscriptionMode::Streaming {
            if let Some(watermark) = &self.watermark {
                node = node.with_child(Node::text(Namespace::Types, "Watermark", watermark));
            }
        }
        match mode {
            SubscriptionMode::Pull => node.with_child(Node::text(
                Namespace::Types,
                "Timeout",
                self.timeout_minutes.to_string(),
            )),
            SubscriptionMode::Push => {
                node = node.with_child(Node::text(
                    Namespace::Types,
                    "StatusFrequency",
                    self.status_frequency.to_string(),
                ));
                match &self.callback_url {
                    Some(url) => node.with_child(Node::text(Namespace::Types, "URL", url)),
                    None => node,
                }
            }
            SubscriptionMode::Streaming => node,
        }
    }
}

fn check_minutes(label: &str, minutes: u32) -> Result<(), Error> {
    if !(MIN_TIMEOUT_MINUTES..=MAX_TIMEOUT_MINUTES).contains(&minutes) {
        return Err(Error::new(ErrorKind::InvalidTimeout)
            .with_message(format!(
                "{label} must be between {MIN_TIMEOUT_MINUTES} and {MAX_TIMEOUT_MINUTES} minutes; got {minutes}"
            )));
    }
    Ok(())
}

pub struct SubscriptionSession {
    mode: SubscriptionMode,
    params: SubscriptionParams,
    state: SessionState,
    id: Option<String>,
    watermark: Option<String>,
    pub(crate) connection: Option<Box<dyn EventSource>>,
}

impl SubscriptionSession {
    pub fn new(mode: SubscriptionMode, params: SubscriptionParams) -> Self {
        Self {
            mode,
            params,
            state: SessionState::Unsubscribed,
            id: None,
            watermark: None,
            connection: None,
        }
    }

    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    pub fn params(&self) -> &SubscriptionParams {
        &self.params
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn watermark(&self) -> Option<&str> {
        self.watermark.as_deref()
    }

    pub fn subscribe<T: Transport, V: VersionNegotiator>(
        &mut self,
        client: &ServiceClient<T, V>,
    ) -> Result<(), Error> {
        if self.state != SessionState::Unsubscribed {
            return Err(Error::new(ErrorKind::Validation)
                .with_message("session has already subscribed")
                .with_hint("Create a new session to subscribe again."));
        }
        self.params.validate(self.mode)?;

        let descriptor = match self.mode {
            SubscriptionMode::Streaming => &catalog::SUBSCRIBE_STREAMING,
            SubscriptionMode::Pull | SubscriptionMode::Push => &catalog::SUBSCRIBE,
        };
        let request = ServiceRequest::new(descriptor, ErrorHandlingMode::ThrowOnFirstError)
            .with_field_node(self.params.request_node(self.mode));
        let message = client.execute(&request)?;

        let id = message.payload.text(&["SubscriptionId"]).ok_or_else(|| {
            Error::new(ErrorKind::MalformedResponse)
                .with_operation(descriptor.name)
                .with_message("subscribe response is missing SubscriptionId")
        })?;
        self.id = Some(id.to_string());
        self.watermark = match self.mode {
            SubscriptionMode::Streaming => None,
            _ => message
                .payload
                .text(&["Watermark"])
                .map(str::to_string)
                .or_else(|| self.params.watermark.clone()),
        };
        self.state = SessionState::Active;
        tracing::info!(
            mode = self.mode.as_str(),
            subscription = id,
            "subscription active"
        );
        Ok(())
    }

    /// Fetches events since the stored watermark and stores the returned one.
    pub fn poll<T: Transport, V: VersionNegotiator>(
        &mut self,
        client: &ServiceClient<T, V>,
    ) -> Result<EventBatch, Error> {
        if self.mode == SubscriptionMode::Streaming {
            return Err(Error::new(ErrorKind::IncompatibleParameter)
                .with_message("streaming sessions are read with receive, not poll"));
        }
        let id = self.active_id()?.to_string();
        let watermark = self.watermark.clone().ok_or_else(|| {
            Error::new(ErrorKind::MalformedResponse).with_message("session has no watermark")
        })?;
        let request = ServiceRequest::new(&catalog::GET_EVENTS, ErrorHandlingMode::ThrowOnFirstError)
            .with_field("SubscriptionId", id)
            .with_field("Watermark", watermark);
        let message = match client.execute(&request) {
            Ok(message) => message,
            Err(err) => return Err(self.expire_on(err)),
        };
        let batch = notification(&message.payload, catalog::GET_EVENTS.name)?;
        self.advance(&batch);
        Ok(batch)
    }

    /// Ends the subscription on the server. Calling it again is a no-op.
    pub fn unsubscribe<T: Transport, V: VersionNegotiator>(
        &mut self,
        client: &ServiceClient<T, V>,
    ) -> Result<(), Error> {
        let id = match (self.state, self.id.clone()) {
            (SessionState::Active, Some(id)) => id,
            _ => {
                self.terminate("unsubscribed");
                return Ok(());
            }
        };
        self.close_connection();
        let request =
            ServiceRequest::new(&catalog::UNSUBSCRIBE, ErrorHandlingMode::ThrowOnFirstError)
                .with_field("SubscriptionId", id);
        match client.execute(&request) {
            Ok(_) => {}
            Err(err) if is_expired(&err) => {
                tracing::debug!(code = err.code().unwrap_or_default(), "subscription already gone");
            }
            Err(err) => return Err(err),
        }
        self.terminate("unsubscribed");
        Ok(())
    }

    /// Drops the connection and ends the session without contacting the server.
    pub fn disconnect(&mut self) {
        self.close_connection();
        self.terminate("disconnected");
    }

    /// Decodes a notification the server posted to a push callback.
    pub fn accept_notification(&mut self, document: &WireDocument) -> Result<EventBatch, Error> {
        if self.mode != SubscriptionMode::Push {
            return Err(Error::new(ErrorKind::IncompatibleParameter)
                .with_message("only push sessions accept posted notifications"));
        }
        let id = self.active_id()?.to_string();
        let descriptor = &catalog::SEND_NOTIFICATION;
        let messages = wire::decode(document, descriptor)?;
        let message = first_message(correlate(
            descriptor,
            messages,
            1,
            ErrorHandlingMode::ThrowOnFirstError,
        ))
        .map_err(|err| self.expire_on(err))?;
        let batch = notification(&message.payload, descriptor.name)?;
        if batch.subscription_id != id {
            return Err(Error::new(ErrorKind::Validation)
                .with_operation(descriptor.name)
                .with_message(format!(
                    "notification is for subscription {}, session holds {id}",
                    batch.subscription_id
                )));
        }
        self.advance(&batch);
        Ok(batch)
    }

    /// Builds the acknowledgement for a push notification. Declining ends the session.
    pub fn notification_reply(
        &mut self,
        keep: bool,
        format: WireFormat,
    ) -> Result<WireDocument, Error> {
        let keep = keep && self.state == SessionState::Active;
        let status = if keep { "OK" } else { "Unsubscribe" };
        let root = Node::element(Namespace::Messages, "SendNotificationResult").with_child(
            Node::text(Namespace::Messages, "SubscriptionStatus", status),
        );
        if !keep {
            self.terminate("declined push notification");
        }
        wire::render(&root, format)
    }

    pub(crate) fn active_id(&self) -> Result<&str, Error> {
        match (self.state, self.id.as_deref()) {
            (SessionState::Active, Some(id)) => Ok(id),
            (SessionState::Terminated, _) => Err(Error::new(ErrorKind::SubscriptionExpired)
                .with_message("subscription session has terminated")),
            _ => Err(Error::new(ErrorKind::SubscriptionExpired)
                .with_message("session has no subscription")
                .with_hint("Call subscribe first.")),
        }
    }

    pub(crate) fn advance(&mut self, batch: &EventBatch) {
        if self.mode == SubscriptionMode::Streaming {
            return;
        }
        if let Some(watermark) = batch.watermark() {
            self.watermark = Some(watermark.to_string());
        }
    }

    /// Maps expired-subscription service codes to `SubscriptionExpired` and terminates.
    pub(crate) fn expire_on(&mut self, err: Error) -> Error {
        if !is_expired(&err) {
            return err;
        }
        let code = err.code().unwrap_or_default().to_string();
        tracing::warn!(
            subscription = self.id.as_deref().unwrap_or_default(),
            code = code.as_str(),
            "subscription expired"
        );
        self.close_connection();
        self.terminate("expired");
        let mut expired = Error::new(ErrorKind::SubscriptionExpired)
            .with_code(code)
            .with_message(err.message().unwrap_or("subscription expired").to_string());
        if let Some(operation) = err.operation() {
            expired = expired.with_operation(operation.to_string());
        }
        expired.with_source(err)
    }

    pub(crate) fn terminate(&mut self, reason: &str) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.close_connection();
        self.state = SessionState::Terminated;
        tracing::info!(
            mode = self.mode.as_str(),
            subscription = self.id.as_deref().unwrap_or_default(),
            reason,
            "subscription terminated"
        );
    }

    fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}

fn is_expired(err: &Error) -> bool {
    err.kind() == ErrorKind::Service
        && err
            .code()
            .is_some_and(|code| EXPIRED_CODES.contains(&code))
}

fn first_message(result: Result<BatchResult, Error>) -> Result<ResponseMessage, Error> {
    let operation = catalog::SEND_NOTIFICATION.name;
    result?.into_messages().into_iter().next().ok_or_else(|| {
        Error::new(ErrorKind::ResponseCountMismatch)
            .with_operation(operation)
            .with_message("notification carried no messages")
    })
}

pub(crate) fn notification(payload: &Payload, operation: &str) -> Result<EventBatch, Error> {
    let node = payload.find("Notification").ok_or_else(|| {
        Error::new(ErrorKind::MalformedResponse)
            .with_operation(operation)
            .with_message("response is missing Notification")
    })?;
    EventBatch::from_notification(node).map_err(|err| err.with_operation(operation))
}

#[cfg(test)]
mod tests {
    use super::{SessionState, SubscriptionMode, SubscriptionParams, SubscriptionSession};
    use crate::core::error::ErrorKind;
    use crate::core::target::TargetId;
    use crate::core::wire::{WireDocument, WireFormat};

    fn inbox() -> SubscriptionParams {
        SubscriptionParams::new([TargetId::distinguished("inbox")])
    }

    #[test]
    fn pull_timeout_bounds_are_inclusive() {
        for minutes in [0, 1441] {
            let err = inbox()
                .with_timeout(minutes)
                .validate(SubscriptionMode::Pull)
                .expect_err("out of range");
            assert_eq!(err.kind(), ErrorKind::InvalidTimeout);
        }
        for minutes in [1, 1440] {
            inbox()
                .with_timeout(minutes)
                .validate(SubscriptionMode::Pull)
                .expect("in range");
        }
    }

    #[test]
    fn streaming_rejects_watermark() {
        let err = inbox()
            .with_watermark("w")
            .validate(SubscriptionMode::Streaming)
            .expect_err("watermark");
        assert_eq!(err.kind(), ErrorKind::IncompatibleParameter);
    }

    #[test]
    fn push_needs_callback_and_valid_frequency() {
        let err = inbox().validate(SubscriptionMode::Push).expect_err("callback");
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = inbox()
            .with_callback("https://listener.example.com/notify")
            .with_status_frequency(0)
            .validate(SubscriptionMode::Push)
            .expect_err("frequency");
        assert_eq!(err.kind(), ErrorKind::InvalidTimeout);
    }

    #[test]
    fn subscriptions_only_take_folders() {
        let err = SubscriptionParams::new([TargetId::item("i")])
            .validate(SubscriptionMode::Pull)
            .expect_err("kind");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn pull_request_node_lists_folders_then_events_then_timeout() {
        let node = inbox().with_watermark("w0").request_node(SubscriptionMode::Pull);
        let names: Vec<_> = node.children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["FolderIds", "EventTypes", "Watermark", "Timeout"]);
    }

    #[test]
    fn unsubscribed_session_refuses_poll_and_reply_ends_it() {
        let mut session = SubscriptionSession::new(SubscriptionMode::Push, inbox());
        let err = session
            .accept_notification(&WireDocument::new(WireFormat::Markup, ""))
            .expect_err("inactive");
        assert_eq!(err.kind(), ErrorKind::SubscriptionExpired);

        let reply = session
            .notification_reply(true, WireFormat::ObjectNotation)
            .expect("reply");
        assert_eq!(
            reply.body,
            r#"{"SendNotificationResult":{"SubscriptionStatus":"Unsubscribe"}}"#
        );
        assert_eq!(session.state(), SessionState::Terminated);
    }
}
