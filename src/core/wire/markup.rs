//! Purpose: Namespaced markup rendering and parsing of `Node` trees.
//! Exports: `write`, `parse`.
//! Role: Markup half of the wire encoder; knows syntax only, never operation semantics.
//! Invariants: Attributes are written in node order before any child element.
//! Invariants: Parsed trees are returned in decoded form (no namespaces, attributes folded).
//! Invariants: Leaf text is never trimmed, so both wire formats decode the same values.
use crate::core::error::{Error, ErrorKind};
use crate::core::node::{Namespace, Node, NodeValue};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error as StdError;
use std::io::Cursor;

pub fn write(root: &Node) -> Result<String, Error> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(write_error)?;
    write_node(&mut writer, root, true)?;
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("markup writer produced invalid utf-8")
            .with_source(err)
    })
}

fn qualified(node: &Node) -> String {
    match node.namespace {
        Some(namespace) => format!("{}:{}", namespace.prefix(), node.name),
        None => node.name.clone(),
    }
}

fn write_node(writer: &mut Writer<Cursor<Vec<u8>>>, node: &Node, root: bool) -> Result<(), Error> {
    let name = qualified(node);
    let mut start = BytesStart::new(name.as_str());
    if root {
        for namespace in [Namespace::Messages, Namespace::Types] {
            let key = format!("xmlns:{}", namespace.prefix());
            start.push_attribute((key.as_str(), namespace.uri()));
        }
    }
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    match &node.value {
        NodeValue::Empty => {
            writer.write_event(Event::Empty(start)).map_err(write_error)?;
        }
        NodeValue::Text(text) => {
            writer.write_event(Event::Start(start)).map_err(write_error)?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(write_error)?;
        }
        NodeValue::Children(children) | NodeValue::List(children) => {
            if children.is_empty() {
                writer.write_event(Event::Empty(start)).map_err(write_error)?;
                return Ok(());
            }
            writer.write_event(Event::Start(start)).map_err(write_error)?;
            for child in children {
                write_node(writer, child, false)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(write_error)?;
        }
    }
    Ok(())
}

fn write_error<E: StdError + Send + Sync + 'static>(err: E) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to write markup")
        .with_source(err)
}

fn parse_error<E: StdError + Send + Sync + 'static>(err: E) -> Error {
    Error::new(ErrorKind::MalformedResponse)
        .with_message("invalid markup document")
        .with_source(err)
}

struct Frame {
    node: Node,
    text: String,
    children: Vec<Node>,
}

impl Frame {
    fn finish(self) -> Node {
        let Frame {
            mut node,
            text,
            children,
        } = self;
        node.value = if !children.is_empty() {
            NodeValue::Children(children)
        } else if text.is_empty() || is_indentation(&text) {
            NodeValue::Empty
        } else {
            NodeValue::Text(text)
        };
        node
    }
}

/// Whitespace that spans a line break is layout, not content.
fn is_indentation(text: &str) -> bool {
    text.contains('\n') && text.chars().all(char::is_whitespace)
}

/// Text content is kept verbatim; whitespace between elements is dropped.
pub fn parse(body: &str) -> Result<Node, Error> {
    let mut reader = Reader::from_str(body);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event().map_err(parse_error)? {
            Event::Start(start) => {
                let node = open_node(&start)?;
                stack.push(Frame {
                    node,
                    text: String::new(),
                    children: Vec::new(),
                });
            }
            Event::Empty(start) => {
                let node = open_node(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape().map_err(parse_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| {
                    Error::new(ErrorKind::MalformedResponse).with_message("unbalanced end tag")
                })?;
                attach(&mut stack, &mut root, frame.finish())?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::new(ErrorKind::MalformedResponse).with_message("unclosed element"));
    }
    root.map(Node::into_decoded)
        .ok_or_else(|| Error::new(ErrorKind::MalformedResponse).with_message("empty document"))
}

fn open_node(start: &BytesStart<'_>) -> Result<Node, Error> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
    let mut node = Node::decoded(name, NodeValue::Empty);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(parse_error)?;
        let key = attribute.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let local = String::from_utf8_lossy(attribute.key.local_name().as_ref()).to_string();
        let value = attribute.unescape_value().map_err(parse_error)?.to_string();
        node.attributes.push((local, value));
    }
    Ok(node)
}

fn attach(stack: &mut [Frame], root: &mut Option<Node>, node: Node) -> Result<(), Error> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(
            Error::new(ErrorKind::MalformedResponse).with_message("multiple root elements")
        );
    }
    *root = Some(node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse, write};
    use crate::core::error::ErrorKind;
    use crate::core::node::{Namespace, Node};

    #[test]
    fn write_places_namespaces_and_attributes_on_root() {
        let root = Node::element(Namespace::Messages, "DeleteItem")
            .with_attribute("DeleteType", "HardDelete")
            .with_child(Node::list(
                Namespace::Messages,
                "ItemIds",
                vec![Node::element(Namespace::Types, "ItemId").with_attribute("Id", "A&B")],
            ));
        let body = write(&root).expect("write");
        assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(body.contains(
            "<m:DeleteItem xmlns:m=\"http://schemas.microsoft.com/exchange/services/2006/messages\" \
             xmlns:t=\"http://schemas.microsoft.com/exchange/services/2006/types\" \
             DeleteType=\"HardDelete\">"
        ));
        assert!(body.contains("<m:ItemIds><t:ItemId Id=\"A&amp;B\"/></m:ItemIds>"));
    }

    #[test]
    fn parse_strips_prefixes_and_folds_attributes() {
        let body = r#"<?xml version="1.0"?>
<m:Root xmlns:m="urn:m" xmlns:t="urn:t">
  <t:ItemId Id="X1" ChangeKey="CK"/>
  <t:Subject>Tom &amp; Jerry</t:Subject>
</m:Root>"#;
        let root = parse(body).expect("parse");
        assert_eq!(root.name, "Root");
        let item = root.child("ItemId").expect("item");
        assert_eq!(item.value_of("Id"), Some("X1"));
        assert_eq!(item.value_of("ChangeKey"), Some("CK"));
        assert_eq!(root.value_of("Subject"), Some("Tom & Jerry"));
    }

    #[test]
    fn parse_keeps_leaf_whitespace_and_drops_layout() {
        let body = "<m:Root xmlns:m=\"urn:m\">\n  <m:Subject>  padded  </m:Subject>\n  <m:Blank> </m:Blank>\n  <m:Group>\n  </m:Group>\n</m:Root>";
        let root = parse(body).expect("parse");
        assert_eq!(root.value_of("Subject"), Some("  padded  "));
        assert_eq!(root.value_of("Blank"), Some(" "));
        assert!(root.child("Group").expect("group").is_empty());
        assert_eq!(root.children().len(), 3);
    }

    #[test]
    fn parse_rejects_truncated_documents() {
        let err = parse("<m:Root><m:Child>").expect_err("truncated");
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        let err = parse("").expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }
}
