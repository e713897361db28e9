//! Purpose: Catalog of leaf operations expressed as descriptors.
//! Exports: One `static` per operation, `ALL`, `find`.
//! Role: The only place per-operation wire metadata lives; the executor is generic over it.
//! Invariants: Field lists are in schema order; `ALL` lists every descriptor exactly once.
use super::operation::{
    Cardinality, ExpectedCount, FieldSpec, OperationDescriptor, TargetKind, TargetSpec,
};
use super::version::ProtocolVersion;

const ITEM_TARGETS: Option<TargetSpec> = Some(TargetSpec {
    group: "ItemIds",
    kind: TargetKind::Item,
});

const FOLDER_TARGETS: Option<TargetSpec> = Some(TargetSpec {
    group: "FolderIds",
    kind: TargetKind::Folder,
});

const USER_TARGETS: Option<TargetSpec> = Some(TargetSpec {
    group: "UserIds",
    kind: TargetKind::User,
});

const PER_TARGET: Cardinality = Cardinality::Batch(ExpectedCount::PerTarget);

pub static GET_ITEM: OperationDescriptor = OperationDescriptor {
    id: "GetItem",
    name: "GetItem",
    response_tag: "GetItemResponse",
    message_tag: "GetItemResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[FieldSpec::shape("ItemShape")],
    targets: ITEM_TARGETS,
    cardinality: PER_TARGET,
};

pub static MOVE_ITEM: OperationDescriptor = OperationDescriptor {
    id: "MoveItem",
    name: "MoveItem",
    response_tag: "MoveItemResponse",
    message_tag: "MoveItemResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[
        FieldSpec::element("ToFolderId").required(),
        FieldSpec::element("ReturnNewItemIds"),
    ],
    targets: ITEM_TARGETS,
    cardinality: PER_TARGET,
};

pub static COPY_ITEM: OperationDescriptor = OperationDescriptor {
    id: "CopyItem",
    name: "CopyItem",
    response_tag: "CopyItemResponse",
    message_tag: "CopyItemResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[
        FieldSpec::element("ToFolderId").required(),
        FieldSpec::element("ReturnNewItemIds"),
    ],
    targets: ITEM_TARGETS,
    cardinality: PER_TARGET,
};

pub static DELETE_ITEM: OperationDescriptor = OperationDescriptor {
    id: "DeleteItem",
    name: "DeleteItem",
    response_tag: "DeleteItemResponse",
    message_tag: "DeleteItemResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[
        FieldSpec::attribute("DeleteType").required(),
        FieldSpec::attribute("SendMeetingCancellations"),
        FieldSpec::attribute("AffectedTaskOccurrences"),
        FieldSpec::attribute("SuppressReadReceipts"),
    ],
    targets: ITEM_TARGETS,
    cardinality: PER_TARGET,
};

pub static MARK_AS_JUNK: OperationDescriptor = OperationDescriptor {
    id: "MarkAsJunk",
    name: "MarkAsJunk",
    response_tag: "MarkAsJunkResponse",
    message_tag: "MarkAsJunkResponseMessage",
    min_version: ProtocolVersion::Exchange2013,
    fields: &[
        FieldSpec::attribute("IsJunk").required(),
        FieldSpec::attribute("MoveItem").required(),
    ],
    targets: ITEM_TARGETS,
    cardinality: PER_TARGET,
};

pub static GET_FOLDER: OperationDescriptor = OperationDescriptor {
    id: "GetFolder",
    name: "GetFolder",
    response_tag: "GetFolderResponse",
    message_tag: "GetFolderResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[FieldSpec::shape("FolderShape")],
    targets: FOLDER_TARGETS,
    cardinality: PER_TARGET,
};

pub static MOVE_FOLDER: OperationDescriptor = OperationDescriptor {
    id: "MoveFolder",
    name: "MoveFolder",
    response_tag: "MoveFolderResponse",
    message_tag: "MoveFolderResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[FieldSpec::element("ToFolderId").required()],
    targets: FOLDER_TARGETS,
    cardinality: PER_TARGET,
};

pub static COPY_FOLDER: OperationDescriptor = OperationDescriptor {
    id: "CopyFolder",
    name: "CopyFolder",
    response_tag: "CopyFolderResponse",
    message_tag: "CopyFolderResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[FieldSpec::element("ToFolderId").required()],
    targets: FOLDER_TARGETS,
    cardinality: PER_TARGET,
};

pub static DELETE_FOLDER: OperationDescriptor = OperationDescriptor {
    id: "DeleteFolder",
    name: "DeleteFolder",
    response_tag: "DeleteFolderResponse",
    message_tag: "DeleteFolderResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[FieldSpec::attribute("DeleteType").required()],
    targets: FOLDER_TARGETS,
    cardinality: PER_TARGET,
};

pub static EMPTY_FOLDER: OperationDescriptor = OperationDescriptor {
    id: "EmptyFolder",
    name: "EmptyFolder",
    response_tag: "EmptyFolderResponse",
    message_tag: "EmptyFolderResponseMessage",
    min_version: ProtocolVersion::Exchange2010Sp1,
    fields: &[
        FieldSpec::attribute("DeleteType").required(),
        FieldSpec::attribute("DeleteSubFolders").required(),
    ],
    targets: FOLDER_TARGETS,
    cardinality: PER_TARGET,
};

pub static GET_DELEGATE: OperationDescriptor = OperationDescriptor {
    id: "GetDelegate",
    name: "GetDelegate",
    response_tag: "GetDelegateResponse",
    message_tag: "DelegateUserResponseMessageType",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[
        FieldSpec::attribute("IncludePermissions").required(),
        FieldSpec::element("Mailbox").required(),
    ],
    targets: USER_TARGETS,
    cardinality: PER_TARGET,
};

pub static REMOVE_DELEGATE: OperationDescriptor = OperationDescriptor {
    id: "RemoveDelegate",
    name: "RemoveDelegate",
    response_tag: "RemoveDelegateResponse",
    message_tag: "DelegateUserResponseMessageType",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[FieldSpec::element("Mailbox").required()],
    targets: USER_TARGETS,
    cardinality: PER_TARGET,
};

/// Accept/decline/reply style responses; the server answers with one message
/// however the request is shaped.
pub static CREATE_RESPONSE_OBJECT: OperationDescriptor = OperationDescriptor {
    id: "CreateResponseObject",
    name: "CreateItem",
    response_tag: "CreateItemResponse",
    message_tag: "CreateItemResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[
        FieldSpec::attribute("MessageDisposition").required(),
        FieldSpec::element("SavedItemFolderId"),
    ],
    targets: Some(TargetSpec {
        group: "Items",
        kind: TargetKind::ResponseObject,
    }),
    cardinality: Cardinality::Batch(ExpectedCount::Fixed(1)),
};

pub static SUBSCRIBE: OperationDescriptor = OperationDescriptor {
    id: "Subscribe",
    name: "Subscribe",
    response_tag: "SubscribeResponse",
    message_tag: "SubscribeResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[
        FieldSpec::element("PullSubscriptionRequest").one_of("SubscriptionRequest"),
        FieldSpec::element("PushSubscriptionRequest").one_of("SubscriptionRequest"),
    ],
    targets: None,
    cardinality: Cardinality::Single,
};

pub static SUBSCRIBE_STREAMING: OperationDescriptor = OperationDescriptor {
    id: "SubscribeStreaming",
    name: "Subscribe",
    response_tag: "SubscribeResponse",
    message_tag: "SubscribeResponseMessage",
    min_version: ProtocolVersion::Exchange2010Sp1,
    fields: &[FieldSpec::element("StreamingSubscriptionRequest").required()],
    targets: None,
    cardinality: Cardinality::Single,
};

pub static GET_EVENTS: OperationDescriptor = OperationDescriptor {
    id: "GetEvents",
    name: "GetEvents",
    response_tag: "GetEventsResponse",
    message_tag: "GetEventsResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[
        FieldSpec::element("SubscriptionId").required(),
        FieldSpec::element("Watermark").required(),
    ],
    targets: None,
    cardinality: Cardinality::Single,
};

pub static UNSUBSCRIBE: OperationDescriptor = OperationDescriptor {
    id: "Unsubscribe",
    name: "Unsubscribe",
    response_tag: "UnsubscribeResponse",
    message_tag: "UnsubscribeResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[FieldSpec::element("SubscriptionId").required()],
    targets: None,
    cardinality: Cardinality::Single,
};

pub static GET_STREAMING_EVENTS: OperationDescriptor = OperationDescriptor {
    id: "GetStreamingEvents",
    name: "GetStreamingEvents",
    response_tag: "GetStreamingEventsResponse",
    message_tag: "GetStreamingEventsResponseMessage",
    min_version: ProtocolVersion::Exchange2010Sp1,
    fields: &[
        FieldSpec::element("SubscriptionIds").required(),
        FieldSpec::element("ConnectionTimeout").required(),
    ],
    targets: None,
    cardinality: Cardinality::Single,
};

/// Inbound push notification posted by the server to a callback; never sent by the client.
pub static SEND_NOTIFICATION: OperationDescriptor = OperationDescriptor {
    id: "SendNotification",
    name: "SendNotification",
    response_tag: "SendNotification",
    message_tag: "SendNotificationResponseMessage",
    min_version: ProtocolVersion::Exchange2007Sp1,
    fields: &[],
    targets: None,
    cardinality: Cardinality::Single,
};

pub static ALL: &[&OperationDescriptor] = &[
    &GET_ITEM,
    &MOVE_ITEM,
    &COPY_ITEM,
    &DELETE_ITEM,
    &MARK_AS_JUNK,
    &GET_FOLDER,
    &MOVE_FOLDER,
    &COPY_FOLDER,
    &DELETE_FOLDER,
    &EMPTY_FOLDER,
    &GET_DELEGATE,
    &REMOVE_DELEGATE,
    &CREATE_RESPONSE_OBJECT,
    &SUBSCRIBE,
    &SUBSCRIBE_STREAMING,
    &GET_EVENTS,
    &UNSUBSCRIBE,
    &GET_STREAMING_EVENTS,
];

pub fn find(id: &str) -> Option<&'static OperationDescriptor> {
    ALL.iter()
        .copied()
        .find(|descriptor| descriptor.id.eq_ignore_ascii_case(id))
}
