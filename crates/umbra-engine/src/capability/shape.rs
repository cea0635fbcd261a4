//! Parameter and return shapes of capability members

use std::fmt;

use umbra_sdk::{ClassId, Primitive, TypeRef};

use super::CapabilityType;

/// Reference to a capability type from inside a shape.
///
/// `Lazy` takes a function so that capability types can name themselves or
/// each other before they exist; the function is only called at dispatch
/// time.
#[derive(Clone)]
pub enum CapabilityRef {
    /// Resolved on use
    Lazy(fn() -> CapabilityType),
    /// Already built
    Shared(CapabilityType),
}

impl CapabilityRef {
    /// The referenced capability type
    pub fn get(&self) -> CapabilityType {
        match self {
            CapabilityRef::Lazy(f) => f(),
            CapabilityRef::Shared(capability) => capability.clone(),
        }
    }
}

impl PartialEq for CapabilityRef {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl fmt::Debug for CapabilityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityRef::Lazy(_) => f.write_str("CapabilityRef::Lazy"),
            CapabilityRef::Shared(capability) => write!(f, "CapabilityRef::Shared({})", capability.name()),
        }
    }
}

/// Declared shape of a capability parameter or return value
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// No value
    Void,
    /// A host type, passed through as-is
    Type(TypeRef),
    /// A value bound to another capability type
    Capability(CapabilityRef),
    /// One-dimensional array of the component shape
    Array(Box<Shape>),
}

impl Shape {
    /// A host type
    pub fn ty(ty: impl Into<TypeRef>) -> Self {
        Shape::Type(ty.into())
    }

    /// A capability type, referenced lazily
    pub fn capability(capability: fn() -> CapabilityType) -> Self {
        Shape::Capability(CapabilityRef::Lazy(capability))
    }

    /// A capability type that is already built
    pub fn capability_of(capability: &CapabilityType) -> Self {
        Shape::Capability(CapabilityRef::Shared(capability.clone()))
    }

    /// Array of the component shape
    pub fn array_of(component: Shape) -> Self {
        Shape::Array(Box::new(component))
    }

    /// Check if this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, Shape::Void)
    }

    /// The capability type of a capability shape
    pub fn as_capability(&self) -> Option<CapabilityType> {
        match self {
            Shape::Capability(capability) => Some(capability.get()),
            _ => None,
        }
    }

    /// Component of an array shape
    pub fn component(&self) -> Option<&Shape> {
        match self {
            Shape::Array(component) => Some(component),
            _ => None,
        }
    }
}

impl From<TypeRef> for Shape {
    fn from(ty: TypeRef) -> Self {
        match ty {
            TypeRef::Void => Shape::Void,
            other => Shape::Type(other),
        }
    }
}

impl From<Primitive> for Shape {
    fn from(p: Primitive) -> Self {
        Shape::Type(TypeRef::Primitive(p))
    }
}

impl From<ClassId> for Shape {
    fn from(id: ClassId) -> Self {
        Shape::Type(TypeRef::Class(id))
    }
}

impl From<&CapabilityType> for Shape {
    fn from(capability: &CapabilityType) -> Self {
        Shape::capability_of(capability)
    }
}
