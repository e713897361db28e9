//! Purpose: End-to-end tests for batch execution through `ServiceClient`.
//! Exports: None (integration test module).
//! Role: Validate correlation, error policies and wire-format equivalence over a scripted transport.
//! Invariants: No network; the transport answers from the request document it receives.
//! Invariants: Each call sends exactly one document.

use mailrpc::api::{
    BatchOutcome, ClientOptions, Error, ErrorHandlingMode, ErrorKind, FixedVersion,
    ProtocolVersion, ResponseClass, ServiceClient, ServiceRequest, TargetId, Transport,
    WireDocument, WireFormat,
};
use mailrpc::core::catalog;
use mailrpc::core::node::{Namespace, Node};
use mailrpc::core::wire;
use std::cell::{Cell, RefCell};

/// Answers each request with one message per target; `statuses` cycles per position.
struct EchoService {
    statuses: Vec<ResponseClass>,
    message_count: Option<usize>,
    sent: Cell<usize>,
    last: RefCell<Option<WireDocument>>,
}

impl EchoService {
    fn new(statuses: &[ResponseClass]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            message_count: None,
            sent: Cell::new(0),
            last: RefCell::new(None),
        }
    }

    /// Overrides the number of messages in the reply.
    fn with_message_count(mut self, count: usize) -> Self {
        self.message_count = Some(count);
        self
    }
}

impl Transport for EchoService {
    fn send(&self, document: &WireDocument, _operation: &str) -> Result<WireDocument, Error> {
        self.sent.set(self.sent.get() + 1);
        *self.last.borrow_mut() = Some(document.clone());

        let request = wire::parse_tree(document)?;
        let ids: Vec<String> = request
            .child("ItemIds")
            .map(|group| {
                group
                    .children()
                    .iter()
                    .filter_map(|item| item.value_of("Id").map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let message_tag = format!("{}ResponseMessage", request.name);
        let mut messages = Vec::new();
        for position in 0..self.message_count.unwrap_or(ids.len()) {
            let status = self.statuses[position % self.statuses.len()];
            let mut message =
                Node::element(Namespace::Messages, message_tag.as_str())
                    .with_attribute("ResponseClass", status.as_str());
            if status == ResponseClass::Error {
                message = message
                    .with_child(Node::text(
                        Namespace::Messages,
                        "MessageText",
                        "The specified object was not found in the store.",
                    ))
                    .with_child(Node::text(
                        Namespace::Messages,
                        "ResponseCode",
                        "ErrorItemNotFound",
                    ));
            } else {
                let id = ids.get(position).cloned().unwrap_or_default();
                message = message
                    .with_child(Node::text(Namespace::Messages, "ResponseCode", "NoError"))
                    .with_child(
                        Node::element(Namespace::Messages, "Items").with_child(
                            Node::element(Namespace::Types, "Message")
                                .with_child(
                                    Node::element(Namespace::Types, "ItemId")
                                        .with_attribute("Id", id),
                                )
                                .with_child(Node::text(Namespace::Types, "Subject", "  padded  ")),
                        ),
                    );
            }
            messages.push(message);
        }
        let root = Node::element(Namespace::Messages, format!("{}Response", request.name))
            .with_child(Node::list(Namespace::Messages, "ResponseMessages", messages));
        wire::render(&root, document.format)
    }
}

fn client(transport: &EchoService, format: WireFormat) -> ServiceClient<&EchoService> {
    ServiceClient::new(transport, FixedVersion(ProtocolVersion::Exchange2016))
        .with_options(ClientOptions::new().with_format(format))
}

fn move_items(ids: &[&str], mode: ErrorHandlingMode) -> ServiceRequest {
    ServiceRequest::new(&catalog::MOVE_ITEM, mode)
        .with_folder_field("ToFolderId", &TargetId::distinguished("archive"))
        .with_targets(ids.iter().map(|id| TargetId::item(*id)))
}

#[test]
fn each_target_gets_the_message_at_its_position() {
    let transport = EchoService::new(&[ResponseClass::Success]);
    let client = client(&transport, WireFormat::Markup);
    let result = client
        .execute_batch(&move_items(
            &["a", "b", "c", "d"],
            ErrorHandlingMode::ThrowOnFirstError,
        ))
        .expect("batch");

    assert_eq!(transport.sent.get(), 1);
    assert_eq!(result.len(), 4);
    assert_eq!(result.outcome(), BatchOutcome::AllSucceeded);
    for (position, (message, id)) in result.iter().zip(["a", "b", "c", "d"]).enumerate() {
        assert_eq!(message.index, position);
        assert_eq!(message.payload.text(&["Items", "Message", "ItemId", "Id"]), Some(id));
    }
}

#[test]
fn throw_mode_raises_the_first_failure_with_its_index() {
    let transport = EchoService::new(&[
        ResponseClass::Success,
        ResponseClass::Error,
        ResponseClass::Success,
    ]);
    let client = client(&transport, WireFormat::Markup);
    let err = client
        .execute_batch(&move_items(
            &["a", "b", "c"],
            ErrorHandlingMode::ThrowOnFirstError,
        ))
        .expect_err("service error");
    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.index(), Some(1));
    assert_eq!(err.code(), Some("ErrorItemNotFound"));
    assert_eq!(err.operation(), Some("MoveItem"));
    assert_eq!(transport.sent.get(), 1);
}

#[test]
fn return_mode_keeps_every_outcome() {
    let transport = EchoService::new(&[
        ResponseClass::Success,
        ResponseClass::Error,
        ResponseClass::Success,
    ]);
    let client = client(&transport, WireFormat::ObjectNotation);
    let result = client
        .execute_batch(&move_items(
            &["a", "b", "c"],
            ErrorHandlingMode::ReturnAllResults,
        ))
        .expect("batch");
    assert_eq!(result.outcome(), BatchOutcome::PartialFailure);
    let statuses: Vec<_> = result.iter().map(|message| message.status).collect();
    assert_eq!(
        statuses,
        vec![
            ResponseClass::Success,
            ResponseClass::Error,
            ResponseClass::Success
        ]
    );
    let errors = result.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].index(), Some(1));
    assert!(result.get(1).expect("entry").payload.is_empty());
}

#[test]
fn count_mismatch_aborts_in_both_modes() {
    for count in [3, 1, 0] {
        for mode in [
            ErrorHandlingMode::ThrowOnFirstError,
            ErrorHandlingMode::ReturnAllResults,
        ] {
            for format in [WireFormat::Markup, WireFormat::ObjectNotation] {
                let transport =
                    EchoService::new(&[ResponseClass::Success]).with_message_count(count);
                let client = client(&transport, format);
                let err = client
                    .execute_batch(&move_items(&["a", "b"], mode))
                    .expect_err("count");
                assert_eq!(err.kind(), ErrorKind::ResponseCountMismatch, "{count} messages");
                assert_eq!(transport.sent.get(), 1);
            }
        }
    }
}

#[test]
fn empty_batch_is_rejected_before_sending() {
    let transport = EchoService::new(&[ResponseClass::Success]);
    let client = client(&transport, WireFormat::Markup);
    let err = client
        .execute_batch(&move_items(&[], ErrorHandlingMode::ThrowOnFirstError))
        .expect_err("empty");
    assert_eq!(err.kind(), ErrorKind::EmptyBatch);
    assert_eq!(transport.sent.get(), 0);
}

#[test]
fn both_wire_formats_decode_to_the_same_result() {
    let statuses = [ResponseClass::Warning, ResponseClass::Error];
    let xml = EchoService::new(&statuses);
    let json = EchoService::new(&statuses);
    let request = move_items(&["a", "b", "c"], ErrorHandlingMode::ReturnAllResults);

    let from_xml = client(&xml, WireFormat::Markup)
        .execute_batch(&request)
        .expect("xml");
    let from_json = client(&json, WireFormat::ObjectNotation)
        .execute_batch(&request)
        .expect("json");
    assert_eq!(from_xml, from_json);
    let subject = &["Items", "Message", "Subject"];
    assert_eq!(from_xml.get(0).expect("entry").payload.text(subject), Some("  padded  "));
    assert_eq!(from_json.get(0).expect("entry").payload.text(subject), Some("  padded  "));

    let xml_sent = xml.last.borrow().clone().expect("xml document");
    let json_sent = json.last.borrow().clone().expect("json document");
    assert_eq!(xml_sent.format, WireFormat::Markup);
    assert_eq!(json_sent.format, WireFormat::ObjectNotation);
    assert_eq!(
        wire::parse_tree(&xml_sent).expect("xml tree"),
        wire::parse_tree(&json_sent).expect("json tree")
    );
}

#[test]
fn execute_returns_the_single_outcome() {
    let transport = EchoService::new(&[ResponseClass::Success]);
    let client = client(&transport, WireFormat::Markup);
    let request = ServiceRequest::new(&catalog::DELETE_ITEM, ErrorHandlingMode::ThrowOnFirstError)
        .with_attribute("DeleteType", "HardDelete")
        .with_target(TargetId::item("only"));
    let message = client.execute(&request).expect("execute");
    assert_eq!(message.index, 0);
    assert_eq!(message.status, ResponseClass::Success);
}
