//! Purpose: Caller-owned request value bound to an operation descriptor.
//! Exports: `ServiceRequest`, `ErrorHandlingMode`.
//! Role: Collects attributes, fields, shape and targets; validates them before any I/O.
//! Invariants: Error-handling mode is chosen per request at construction, never ambient.
//! Invariants: Setting a value twice replaces it; caller order never affects wire order.
use super::error::{Error, ErrorKind};
use super::node::{Namespace, Node};
use super::operation::{Cardinality, ExpectedCount, FieldPlacement, OperationDescriptor};
use super::shape::Shape;
use super::target::{TargetId, TargetList};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorHandlingMode {
    /// Any per-item error aborts the call with that item's code and text.
    ThrowOnFirstError,
    /// Every per-item outcome is returned; callers inspect each status.
    ReturnAllResults,
}

#[derive(Clone, Debug)]
pub struct ServiceRequest {
    descriptor: &'static OperationDescriptor,
    error_mode: ErrorHandlingMode,
    attributes: Vec<(String, String)>,
    fields: Vec<Node>,
    shape: Option<Shape>,
    targets: TargetList,
}

impl ServiceRequest {
    pub fn new(descriptor: &'static OperationDescriptor, error_mode: ErrorHandlingMode) -> Self {
        Self {
            descriptor,
            error_mode,
            attributes: Vec::new(),
            fields: Vec::new(),
            shape: None,
            targets: TargetList::new(),
        }
    }

    pub fn descriptor(&self) -> &'static OperationDescriptor {
        self.descriptor
    }

    pub fn operation_name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn error_mode(&self) -> ErrorHandlingMode {
        self.error_mode
    }

    pub fn set_error_mode(&mut self, error_mode: ErrorHandlingMode) {
        self.error_mode = error_mode;
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn fields(&self) -> &[Node] {
        &self.fields
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn targets(&self) -> &TargetList {
        &self.targets
    }

    pub fn expected_count(&self) -> usize {
        self.descriptor.expected_count(self.targets.len())
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn with_field(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_field_node(Node::text(Namespace::Messages, name, text))
    }

    /// Element field whose content is a single folder reference (e.g. `ToFolderId`).
    pub fn with_folder_field(self, name: impl Into<String>, folder: &TargetId) -> Self {
        self.with_field_node(Node::element(Namespace::Messages, name).with_child(folder.to_node()))
    }

    pub fn with_field_node(mut self, node: Node) -> Self {
        match self.fields.iter_mut().find(|field| field.name == node.name) {
            Some(slot) => *slot = node,
            None => self.fields.push(node),
        }
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_target(mut self, target: TargetId) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = TargetId>) -> Self {
        for target in targets {
            self.targets.push(target);
        }
        self
    }

    /// Field and target checks that must pass before the version gate and encoding.
    pub fn validate(&self) -> Result<(), Error> {
        let descriptor = self.descriptor;
        if descriptor.is_batch() && self.targets.is_empty() {
            return Err(Error::new(ErrorKind::EmptyBatch)
                .with_operation(descriptor.name)
                .with_message("batch request has no targets"));
        }

        for (name, _) in &self.attributes {
            match descriptor.field(name) {
                Some(spec) if spec.placement == FieldPlacement::Attribute => {}
                _ => return Err(invalid(descriptor, format!("unknown attribute {name}"))),
            }
        }
        for field in &self.fields {
            match descriptor.field(&field.name) {
                Some(spec) if spec.placement == FieldPlacement::Element => {}
                _ => return Err(invalid(descriptor, format!("unknown field {}", field.name))),
            }
        }
        if self.shape.is_some() && descriptor.shape_tag().is_none() {
            return Err(invalid(descriptor, "operation does not accept a shape"));
        }

        for spec in descriptor.fields.iter().filter(|spec| spec.required) {
            let present = match spec.placement {
                FieldPlacement::Attribute => self.attributes.iter().any(|(key, _)| key == spec.name),
                FieldPlacement::Element => self.fields.iter().any(|field| field.name == spec.name),
                FieldPlacement::Shape => self.shape.is_some(),
            };
            if !present {
                return Err(invalid(
                    descriptor,
                    format!("missing required field {}", spec.name),
                ));
            }
        }

        for group in descriptor.choice_groups() {
            let members: Vec<&str> = descriptor
                .fields
                .iter()
                .filter(|spec| spec.choice == Some(group))
                .map(|spec| spec.name)
                .collect();
            let set = self
                .fields
                .iter()
                .filter(|field| members.contains(&field.name.as_str()))
                .count();
            if set != 1 {
                return Err(invalid(
                    descriptor,
                    format!("exactly one of {} is required; got {set}", members.join(", ")),
                ));
            }
        }

        match descriptor.targets {
            None if !self.targets.is_empty() => {
                return Err(invalid(descriptor, "operation does not take targets"));
            }
            None => {}
            Some(spec) => {
                for (index, target) in self.targets.iter().enumerate() {
                    if target.kind() != spec.kind {
                        return Err(invalid(
                            descriptor,
                            format!(
                                "target {} is a {} id; expected a {} id",
                                index,
                                target.kind().as_str(),
                                spec.kind.as_str()
                            ),
                        )
                        .with_index(index));
                    }
                }
            }
        }

        if let Cardinality::Batch(ExpectedCount::Fixed(count)) = descriptor.cardinality {
            if self.targets.len() != count {
                return Err(invalid(
                    descriptor,
                    format!(
                        "operation takes exactly {count} target(s); got {}",
                        self.targets.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(descriptor: &OperationDescriptor, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Validation)
        .with_operation(descriptor.name)
        .with_message(message)
}
