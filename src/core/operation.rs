//! Purpose: Declarative description of a leaf operation.
//! Exports: `OperationDescriptor`, `FieldSpec`, `FieldPlacement`, `TargetSpec`, `TargetKind`,
//! `Cardinality`, `ExpectedCount`.
//! Role: Replaces one hand-written request/response type per operation with `const` data.
//! Invariants: `fields` is in schema order; encoders emit in this order, never caller order.
//! Invariants: Expected response count is derived from the descriptor alone.
use super::version::ProtocolVersion;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldPlacement {
    /// Attribute on the operation root element.
    Attribute,
    /// Child element of the operation root.
    Element,
    /// Shape element built from a `Shape` value.
    Shape,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub placement: FieldPlacement,
    pub required: bool,
    /// Fields sharing a choice group are mutually exclusive; exactly one must be set.
    pub choice: Option<&'static str>,
}

impl FieldSpec {
    pub const fn attribute(name: &'static str) -> Self {
        Self {
            name,
            placement: FieldPlacement::Attribute,
            required: false,
            choice: None,
        }
    }

    pub const fn element(name: &'static str) -> Self {
        Self {
            name,
            placement: FieldPlacement::Element,
            required: false,
            choice: None,
        }
    }

    pub const fn shape(name: &'static str) -> Self {
        Self {
            name,
            placement: FieldPlacement::Shape,
            required: true,
            choice: None,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn one_of(self, group: &'static str) -> Self {
        Self {
            choice: Some(group),
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetKind {
    Item,
    Folder,
    User,
    ResponseObject,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Item => "item",
            TargetKind::Folder => "folder",
            TargetKind::User => "user",
            TargetKind::ResponseObject => "response-object",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TargetSpec {
    /// Grouping element written after all fields.
    pub group: &'static str,
    pub kind: TargetKind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExpectedCount {
    PerTarget,
    Fixed(usize),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    /// Exactly one logical outcome; no target list semantics.
    Single,
    Batch(ExpectedCount),
}

#[derive(Debug, Eq, PartialEq)]
pub struct OperationDescriptor {
    /// Catalog name used for lookup (usually equal to `name`).
    pub id: &'static str,
    /// Wire tag of the request root.
    pub name: &'static str,
    pub response_tag: &'static str,
    pub message_tag: &'static str,
    pub min_version: ProtocolVersion,
    pub fields: &'static [FieldSpec],
    pub targets: Option<TargetSpec>,
    pub cardinality: Cardinality,
}

impl OperationDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn is_batch(&self) -> bool {
        matches!(self.cardinality, Cardinality::Batch(_))
    }

    pub fn expected_count(&self, target_count: usize) -> usize {
        match self.cardinality {
            Cardinality::Single => 1,
            Cardinality::Batch(ExpectedCount::PerTarget) => target_count,
            Cardinality::Batch(ExpectedCount::Fixed(count)) => count,
        }
    }

    /// Distinct choice groups in schema order.
    pub fn choice_groups(&self) -> Vec<&'static str> {
        let mut groups: Vec<&'static str> = Vec::new();
        for group in self.fields.iter().filter_map(|spec| spec.choice) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    pub fn shape_tag(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|spec| spec.placement == FieldPlacement::Shape)
            .map(|spec| spec.name)
    }
}
