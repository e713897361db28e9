//! Purpose: Field/shape selection passed through to the encoder and object factories.
//! Exports: `Shape`, `BaseShape`.
//! Role: Opaque to the executor; only rendered under the descriptor's shape tag.
//! Invariants: Additional property paths render in insertion order.
use super::node::{Namespace, Node};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BaseShape {
    IdOnly,
    #[default]
    Default,
    AllProperties,
}

impl BaseShape {
    pub fn as_str(self) -> &'static str {
        match self {
            BaseShape::IdOnly => "IdOnly",
            BaseShape::Default => "Default",
            BaseShape::AllProperties => "AllProperties",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Shape {
    pub base: BaseShape,
    pub additional: Vec<String>,
}

impl Shape {
    pub fn new(base: BaseShape) -> Self {
        Self {
            base,
            additional: Vec::new(),
        }
    }

    /// Adds a property path such as `item:Subject` or `folder:DisplayName`.
    pub fn with_property(mut self, path: impl Into<String>) -> Self {
        self.additional.push(path.into());
        self
    }

    pub fn to_node(&self, tag: &str) -> Node {
        let mut node = Node::element(Namespace::Messages, tag).with_child(Node::text(
            Namespace::Types,
            "BaseShape",
            self.base.as_str(),
        ));
        if !self.additional.is_empty() {
            let paths = self
                .additional
                .iter()
                .map(|path| {
                    Node::element(Namespace::Types, "FieldURI").with_attribute("FieldURI", path)
                })
                .collect();
            node = node.with_child(Node::list(
                Namespace::Types,
                "AdditionalProperties",
                paths,
            ));
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseShape, Shape};

    #[test]
    fn shape_renders_base_then_additional_properties() {
        let node = Shape::new(BaseShape::IdOnly)
            .with_property("item:Subject")
            .with_property("item:DateTimeReceived")
            .to_node("ItemShape");
        assert_eq!(node.value_of("BaseShape"), Some("IdOnly"));
        let extra = node.child("AdditionalProperties").expect("additional");
        let paths: Vec<_> = extra
            .children()
            .iter()
            .filter_map(|child| child.value_of("FieldURI"))
            .collect();
        assert_eq!(paths, vec!["item:Subject", "item:DateTimeReceived"]);
    }

    #[test]
    fn default_shape_has_no_additional_properties() {
        let node = Shape::default().to_node("FolderShape");
        assert!(node.child("AdditionalProperties").is_none());
    }
}
