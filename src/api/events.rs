//! Purpose: Typed view of notification events delivered by pull, push and streaming sessions.
//! Exports: `EventKind`, `Event`, `EventBatch`.
//! Role: Turns a decoded `Notification` node into events with ids, watermarks and timestamps.
//! Invariants: Events keep document order; a batch's watermark is its last event's watermark.
//! Invariants: Unparseable timestamps are errors, missing ones are `None`.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use crate::core::node::Node;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    Copied,
    Created,
    Deleted,
    Modified,
    Moved,
    NewMail,
    /// Server heartbeat for pull and push sessions; never subscribed to explicitly.
    Status,
    FreeBusyChanged,
}

impl EventKind {
    pub const SUBSCRIBABLE: [EventKind; 7] = [
        EventKind::Copied,
        EventKind::Created,
        EventKind::Deleted,
        EventKind::Modified,
        EventKind::Moved,
        EventKind::NewMail,
        EventKind::FreeBusyChanged,
    ];

    /// Element name used both in `EventTypes` and for the event itself.
    pub fn tag(self) -> &'static str {
        match self {
            EventKind::Copied => "CopiedEvent",
            EventKind::Created => "CreatedEvent",
            EventKind::Deleted => "DeletedEvent",
            EventKind::Modified => "ModifiedEvent",
            EventKind::Moved => "MovedEvent",
            EventKind::NewMail => "NewMailEvent",
            EventKind::Status => "StatusEvent",
            EventKind::FreeBusyChanged => "FreeBusyChangedEvent",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CopiedEvent" => Some(EventKind::Copied),
            "CreatedEvent" => Some(EventKind::Created),
            "DeletedEvent" => Some(EventKind::Deleted),
            "ModifiedEvent" => Some(EventKind::Modified),
            "MovedEvent" => Some(EventKind::Moved),
            "NewMailEvent" => Some(EventKind::NewMail),
            "StatusEvent" => Some(EventKind::Status),
            "FreeBusyChangedEvent" => Some(EventKind::FreeBusyChanged),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    /// Accepts `NewMail`, `newmail` or `NewMailEvent`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.to_ascii_lowercase();
        let bare = lowered.strip_suffix("event").unwrap_or(&lowered);
        [EventKind::Status]
            .into_iter()
            .chain(EventKind::SUBSCRIBABLE)
            .find(|kind| kind.tag().to_ascii_lowercase().trim_end_matches("event") == bare)
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown event type: {value}"))
                    .with_hint("Use one of: copied, created, deleted, modified, moved, newmail, freebusychanged.")
            })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub watermark: Option<String>,
    pub timestamp: Option<OffsetDateTime>,
    pub item_id: Option<String>,
    pub folder_id: Option<String>,
    pub parent_folder_id: Option<String>,
    /// Previous id for copied and moved objects.
    pub old_id: Option<String>,
    pub old_parent_folder_id: Option<String>,
    pub unread_count: Option<u32>,
}

impl Event {
    fn from_node(kind: EventKind, node: &Node) -> Result<Self, Error> {
        let timestamp = match node.value_of("TimeStamp") {
            Some(raw) => Some(OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| {
                Error::new(ErrorKind::MalformedResponse)
                    .with_message(format!("invalid event timestamp {raw}"))
                    .with_source(err)
            })?),
            None => None,
        };
        let unread_count = match node.value_of("UnreadCount") {
            Some(raw) => Some(raw.parse::<u32>().map_err(|err| {
                Error::new(ErrorKind::MalformedResponse)
                    .with_message(format!("invalid unread count {raw}"))
                    .with_source(err)
            })?),
            None => None,
        };
        Ok(Self {
            kind,
            watermark: node.value_of("Watermark").map(str::to_string),
            timestamp,
            item_id: id_of(node, "ItemId"),
            folder_id: id_of(node, "FolderId"),
            parent_folder_id: id_of(node, "ParentFolderId"),
            old_id: id_of(node, "OldItemId").or_else(|| id_of(node, "OldFolderId")),
            old_parent_folder_id: id_of(node, "OldParentFolderId"),
            unread_count,
        })
    }
}

fn id_of(node: &Node, name: &str) -> Option<String> {
    node.child(name)
        .and_then(|child| child.value_of("Id"))
        .map(str::to_string)
}

/// One `Notification`: the events delivered for a subscription in a single read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EventBatch {
    pub subscription_id: String,
    pub previous_watermark: Option<String>,
    pub more_events: bool,
    pub events: Vec<Event>,
    pub received_at: OffsetDateTime,
}

impl EventBatch {
    pub fn watermark(&self) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .find_map(|event| event.watermark.as_deref())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events other than status heartbeats.
    pub fn changes(&self) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(|event| event.kind != EventKind::Status)
    }

    pub(crate) fn from_notification(node: &Node) -> Result<Self, Error> {
        let subscription_id = node.value_of("SubscriptionId").ok_or_else(|| {
            Error::new(ErrorKind::MalformedResponse)
                .with_message("notification is missing SubscriptionId")
        })?;
        let events = node
            .children()
            .iter()
            .filter_map(|child| {
                EventKind::from_tag(&child.name).map(|kind| Event::from_node(kind, child))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            subscription_id: subscription_id.to_string(),
            previous_watermark: node.value_of("PreviousWatermark").map(str::to_string),
            more_events: node.value_of("MoreEvents") == Some("true"),
            events,
            received_at: OffsetDateTime::now_utc(),
        })
    }
}
