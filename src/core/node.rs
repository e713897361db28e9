//! Purpose: Format-neutral element tree shared by both wire encoders and both decoders.
//! Exports: `Node`, `NodeValue`, `Namespace`, `TEXT_KEY`, `TYPE_KEY`.
//! Role: Requests are described once as a `Node` tree; each wire format only renders/parses it.
//! Invariants: Child order is wire order; attributes always precede children.
//! Invariants: Decoded trees carry no namespaces or attributes (attributes fold into leading text children).

/// Key used for element text when the element also carries attributes.
pub const TEXT_KEY: &str = "Value";
/// Key naming the element of an entry inside an object-notation list.
pub const TYPE_KEY: &str = "__type";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Namespace {
    Messages,
    Types,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::Messages => "m",
            Namespace::Types => "t",
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Messages => "http://schemas.microsoft.com/exchange/services/2006/messages",
            Namespace::Types => "http://schemas.microsoft.com/exchange/services/2006/types",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeValue {
    Empty,
    Text(String),
    Children(Vec<Node>),
    /// Grouping element whose children form an ordered list (rendered as an array).
    List(Vec<Node>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    pub name: String,
    pub namespace: Option<Namespace>,
    pub attributes: Vec<(String, String)>,
    pub value: NodeValue,
}

impl Node {
    pub fn element(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace),
            attributes: Vec::new(),
            value: NodeValue::Empty,
        }
    }

    pub fn text(namespace: Namespace, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::element(namespace, name).with_text(text)
    }

    pub fn list(namespace: Namespace, name: impl Into<String>, items: Vec<Node>) -> Self {
        Self {
            value: NodeValue::List(items),
            ..Self::element(namespace, name)
        }
    }

    /// Node produced by a decoder: no namespace, no attributes.
    pub fn decoded(name: impl Into<String>, value: NodeValue) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            attributes: Vec::new(),
            value,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.value = NodeValue::Text(text.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        match &mut self.value {
            NodeValue::Children(children) | NodeValue::List(children) => children.push(child),
            _ => self.value = NodeValue::Children(vec![child]),
        }
        self
    }

    pub fn children(&self) -> &[Node] {
        match &self.value {
            NodeValue::Children(children) | NodeValue::List(children) => children,
            _ => &[],
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children().iter().filter(move |child| child.name == name)
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Text of a direct child, or of an attribute on an undecoded node.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        if let Some((_, value)) = self.attributes.iter().find(|(key, _)| key == name) {
            return Some(value);
        }
        self.child(name).and_then(Node::as_text)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && matches!(self.value, NodeValue::Empty)
    }

    /// Canonical decoded form: attributes become leading text children and empty
    /// text/children collapse to `Empty`. Both decoders finish with this.
    pub(crate) fn into_decoded(self) -> Node {
        let Node {
            name,
            attributes,
            value,
            ..
        } = self;
        let mut folded: Vec<Node> = attributes
            .into_iter()
            .map(|(key, text)| Node::decoded(key, normalize_text(text)))
            .collect();
        let value = match value {
            NodeValue::Empty => NodeValue::Empty,
            NodeValue::Text(text) if folded.is_empty() => normalize_text(text),
            NodeValue::Text(text) => {
                folded.push(Node::decoded(TEXT_KEY, normalize_text(text)));
                NodeValue::Empty
            }
            NodeValue::Children(children) | NodeValue::List(children) => {
                folded.extend(children.into_iter().map(Node::into_decoded));
                NodeValue::Empty
            }
        };
        if folded.is_empty() {
            Node::decoded(name, value)
        } else {
            Node::decoded(name, NodeValue::Children(folded))
        }
    }
}

fn normalize_text(text: String) -> NodeValue {
    if text.is_empty() {
        NodeValue::Empty
    } else {
        NodeValue::Text(text)
    }
}
