// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptions of the methods and constructors that make up a test unit.
//!
//! Executables are supplied by an external discoverer. This crate only reads their declared
//! parameters in order to resolve arguments for them.

use crate::value::{TypeInfo, Value};
use itertools::Itertools;
use smol_str::SmolStr;
use std::{any::Any, collections::BTreeSet, fmt};

/// Whether an executable is a method or a constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutableKind {
    /// A method, static or bound to a target instance.
    Method,

    /// A constructor of a test unit.
    Constructor,
}

impl ExecutableKind {
    /// A lowercase label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Constructor => "constructor",
        }
    }
}

impl fmt::Display for ExecutableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The declared type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// A type that must always receive a value. Absence is rejected.
    Primitive(TypeInfo),

    /// A type that may also receive absence.
    Reference(TypeInfo),

    /// Accepts any value, and absence.
    Any,
}

impl ParamType {
    /// A primitive parameter of type `T`.
    pub fn primitive<T: Any>() -> Self {
        Self::Primitive(TypeInfo::of::<T>())
    }

    /// A reference parameter of type `T`.
    pub fn reference<T: Any>() -> Self {
        Self::Reference(TypeInfo::of::<T>())
    }

    /// Returns true if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// The concrete type, if any.
    pub fn type_info(&self) -> Option<TypeInfo> {
        match self {
            Self::Primitive(info) | Self::Reference(info) => Some(*info),
            Self::Any => None,
        }
    }

    /// Returns true if this parameter's concrete type is `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_info()
            .is_some_and(|info| info == TypeInfo::of::<T>())
    }

    /// The name of the type for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Primitive(info) | Self::Reference(info) => info.name(),
            Self::Any => "any",
        }
    }

    /// Returns true if `value` can be passed for a parameter of this type.
    ///
    /// Absence is assignable to everything except primitives; a present value is assignable if its
    /// concrete type is exactly the declared type.
    pub fn accepts(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Primitive(_), None) => false,
            (Self::Reference(_), None) => true,
            (Self::Primitive(info) | Self::Reference(info), Some(value)) => {
                value.type_info().id() == info.id()
            }
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One formal parameter of an executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    name: SmolStr,
    ty: ParamType,
    annotations: BTreeSet<SmolStr>,
}

impl Parameter {
    /// Creates a new parameter.
    pub fn new(name: impl Into<SmolStr>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: BTreeSet::new(),
        }
    }

    /// Adds a marker annotation, for resolvers that select parameters by annotation.
    pub fn with_annotation(mut self, annotation: impl Into<SmolStr>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn ty(&self) -> ParamType {
        self.ty
    }

    /// Returns true if the parameter carries the given annotation.
    pub fn is_annotated(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    /// The annotations on this parameter, in sorted order.
    pub fn annotations(&self) -> impl Iterator<Item = &str> + '_ {
        self.annotations.iter().map(SmolStr::as_str)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// A method or constructor declared by a test unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executable {
    kind: ExecutableKind,
    declaring_type: SmolStr,
    name: SmolStr,
    parameters: Vec<Parameter>,
}

impl Executable {
    /// The name used for constructors in signatures.
    pub const CONSTRUCTOR_NAME: &'static str = "new";

    /// Describes a method `name` declared on `declaring_type`.
    pub fn method(declaring_type: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            kind: ExecutableKind::Method,
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Describes a constructor of `declaring_type`.
    pub fn constructor(declaring_type: impl Into<SmolStr>) -> Self {
        Self {
            kind: ExecutableKind::Constructor,
            declaring_type: declaring_type.into(),
            name: SmolStr::new_static(Self::CONSTRUCTOR_NAME),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn with_parameter(mut self, name: impl Into<SmolStr>, ty: ParamType) -> Self {
        self.parameters.push(Parameter::new(name, ty));
        self
    }

    /// Appends a fully described parameter.
    pub fn with(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Whether this is a method or a constructor.
    pub fn kind(&self) -> ExecutableKind {
        self.kind
    }

    /// The type that declares this executable.
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// The executable's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared parameters, in order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns the full signature, for example `Calculator::add(a: i32, b: i32)`.
    pub fn signature(&self) -> String {
        format!(
            "{}::{}({})",
            self.declaring_type,
            self.name,
            self.parameters.iter().join(", ")
        )
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.kind, self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn signature_lists_parameters_in_order() {
        let executable = Executable::method("Calculator", "add")
            .with_parameter("a", ParamType::primitive::<i32>())
            .with_parameter("label", ParamType::reference::<String>());
        assert_eq!(
            executable.signature(),
            "Calculator::add(a: i32, label: alloc::string::String)"
        );
        assert_eq!(
            executable.to_string(),
            "method [Calculator::add(a: i32, label: alloc::string::String)]"
        );

        let constructor = Executable::constructor("Inner").with_parameter("outer", ParamType::Any);
        assert_eq!(constructor.to_string(), "constructor [Inner::new(outer: any)]");
    }

    #[test_case(ParamType::primitive::<i32>(), None, false ; "primitive rejects absence")]
    #[test_case(ParamType::reference::<i32>(), None, true ; "reference accepts absence")]
    #[test_case(ParamType::primitive::<i32>(), Some(Value::new(7_i32)), true ; "primitive accepts same type")]
    #[test_case(ParamType::primitive::<i64>(), Some(Value::new(7_i32)), false ; "no numeric widening")]
    #[test_case(ParamType::reference::<String>(), Some(Value::new("x")), false ; "str is not String")]
    #[test_case(ParamType::Any, Some(Value::new(1.5_f64)), true ; "any accepts values")]
    #[test_case(ParamType::Any, None, true ; "any accepts absence")]
    fn assignability(ty: ParamType, value: Option<Value>, expected: bool) {
        assert_eq!(ty.accepts(value.as_ref()), expected);
    }
}
