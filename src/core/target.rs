//! Purpose: Identify the objects an operation addresses.
//! Exports: `TargetId`, `TargetList`, `ResponseObjectKind`.
//! Role: Ordered target lists are the correlation key for batch responses.
//! Invariants: `TargetList` order is preserved from construction to encoding.
//! Invariants: Every target renders to exactly one element in the types namespace.
use super::node::{Namespace, Node};
use super::operation::TargetKind;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseObjectKind {
    Accept,
    TentativelyAccept,
    Decline,
    Reply,
    ReplyAll,
    Forward,
    CancelCalendarItem,
    Remove,
    SuppressReadReceipt,
}

impl ResponseObjectKind {
    pub fn element_name(self) -> &'static str {
        match self {
            ResponseObjectKind::Accept => "AcceptItem",
            ResponseObjectKind::TentativelyAccept => "TentativelyAcceptItem",
            ResponseObjectKind::Decline => "DeclineItem",
            ResponseObjectKind::Reply => "ReplyToItem",
            ResponseObjectKind::ReplyAll => "ReplyAllToItem",
            ResponseObjectKind::Forward => "ForwardItem",
            ResponseObjectKind::CancelCalendarItem => "CancelCalendarItem",
            ResponseObjectKind::Remove => "RemoveItem",
            ResponseObjectKind::SuppressReadReceipt => "SuppressReadReceipt",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TargetId {
    Item {
        id: String,
        change_key: Option<String>,
    },
    Folder {
        id: String,
        change_key: Option<String>,
    },
    /// Well-known folder (`inbox`, `sentitems`, ...), optionally in another mailbox.
    DistinguishedFolder {
        name: String,
        mailbox: Option<String>,
    },
    User {
        smtp_address: String,
    },
    ResponseObject {
        kind: ResponseObjectKind,
        item_id: String,
        change_key: Option<String>,
    },
}

impl TargetId {
    pub fn item(id: impl Into<String>) -> Self {
        Self::Item {
            id: id.into(),
            change_key: None,
        }
    }

    pub fn folder(id: impl Into<String>) -> Self {
        Self::Folder {
            id: id.into(),
            change_key: None,
        }
    }

    pub fn distinguished(name: impl Into<String>) -> Self {
        Self::DistinguishedFolder {
            name: name.into(),
            mailbox: None,
        }
    }

    pub fn user(smtp_address: impl Into<String>) -> Self {
        Self::User {
            smtp_address: smtp_address.into(),
        }
    }

    pub fn response_object(kind: ResponseObjectKind, item_id: impl Into<String>) -> Self {
        Self::ResponseObject {
            kind,
            item_id: item_id.into(),
            change_key: None,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            TargetId::Item { .. } => TargetKind::Item,
            TargetId::Folder { .. } | TargetId::DistinguishedFolder { .. } => TargetKind::Folder,
            TargetId::User { .. } => TargetKind::User,
            TargetId::ResponseObject { .. } => TargetKind::ResponseObject,
        }
    }

    /// Identifier text used in logs and CLI output.
    pub fn describe(&self) -> &str {
        match self {
            TargetId::Item { id, .. } | TargetId::Folder { id, .. } => id,
            TargetId::DistinguishedFolder { name, .. } => name,
            TargetId::User { smtp_address } => smtp_address,
            TargetId::ResponseObject { item_id, .. } => item_id,
        }
    }

    pub fn to_node(&self) -> Node {
        match self {
            TargetId::Item { id, change_key } => id_node("ItemId", id, change_key.as_deref()),
            TargetId::Folder { id, change_key } => id_node("FolderId", id, change_key.as_deref()),
            TargetId::DistinguishedFolder { name, mailbox } => {
                let node = Node::element(Namespace::Types, "DistinguishedFolderId")
                    .with_attribute("Id", name.as_str());
                match mailbox {
                    Some(address) => node.with_child(
                        Node::element(Namespace::Types, "Mailbox").with_child(Node::text(
                            Namespace::Types,
                            "EmailAddress",
                            address.as_str(),
                        )),
                    ),
                    None => node,
                }
            }
            TargetId::User { smtp_address } => Node::element(Namespace::Types, "UserId")
                .with_child(Node::text(
                    Namespace::Types,
                    "PrimarySmtpAddress",
                    smtp_address.as_str(),
                )),
            TargetId::ResponseObject {
                kind,
                item_id,
                change_key,
            } => Node::element(Namespace::Types, kind.element_name()).with_child(id_node(
                "ReferenceItemId",
                item_id,
                change_key.as_deref(),
            )),
        }
    }
}

fn id_node(name: &str, id: &str, change_key: Option<&str>) -> Node {
    let node = Node::element(Namespace::Types, name).with_attribute("Id", id);
    match change_key {
        Some(change_key) => node.with_attribute("ChangeKey", change_key),
        None => node,
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TargetList {
    targets: Vec<TargetId>,
}

impl TargetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: TargetId) {
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TargetId> {
        self.targets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TargetId> {
        self.targets.iter()
    }
}

impl From<Vec<TargetId>> for TargetList {
    fn from(targets: Vec<TargetId>) -> Self {
        Self { targets }
    }
}

impl FromIterator<TargetId> for TargetList {
    fn from_iter<I: IntoIterator<Item = TargetId>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TargetList {
    type Item = &'a TargetId;
    type IntoIter = std::slice::Iter<'a, TargetId>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{ResponseObjectKind, TargetId, TargetList};
    use crate::core::operation::TargetKind;

    #[test]
    fn item_id_carries_change_key_as_attribute() {
        let target = TargetId::Item {
            id: "AAMk=".to_string(),
            change_key: Some("CQAA".to_string()),
        };
        let node = target.to_node();
        assert_eq!(node.name, "ItemId");
        assert_eq!(
            node.attributes,
            vec![
                ("Id".to_string(), "AAMk=".to_string()),
                ("ChangeKey".to_string(), "CQAA".to_string())
            ]
        );
    }

    #[test]
    fn distinguished_folder_counts_as_folder() {
        let target = TargetId::DistinguishedFolder {
            name: "inbox".to_string(),
            mailbox: Some("shared@example.com".to_string()),
        };
        assert_eq!(target.kind(), TargetKind::Folder);
        let node = target.to_node();
        let mailbox = node.child("Mailbox").expect("mailbox");
        assert_eq!(mailbox.value_of("EmailAddress"), Some("shared@example.com"));
    }

    #[test]
    fn response_object_wraps_reference_item() {
        let node = TargetId::response_object(ResponseObjectKind::Decline, "MTG1").to_node();
        assert_eq!(node.name, "DeclineItem");
        let reference = node.child("ReferenceItemId").expect("reference");
        assert_eq!(reference.value_of("Id"), Some("MTG1"));
    }

    #[test]
    fn list_preserves_insertion_order() {
        let list: TargetList = ["a", "b", "c"].into_iter().map(TargetId::item).collect();
        let ids: Vec<_> = list.iter().map(TargetId::describe).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
