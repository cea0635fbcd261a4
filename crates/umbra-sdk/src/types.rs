//! Type descriptors exposed by a host
//!
//! These are the reflection records the binding layer reads to match
//! members. They describe, they never execute: execution goes through the
//! member handles ([`FieldRef`], [`MethodRef`], [`ConstructorRef`]) and
//! [`HostContext`](crate::HostContext).

use std::fmt;

use crate::value::Primitive;

/// Identifier of a class or interface registered with a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

impl ClassId {
    /// Universal base type
    pub const OBJECT: ClassId = ClassId(0);
    /// Abstract base of the boxed numeric classes
    pub const NUMBER: ClassId = ClassId(1);
    /// String class
    pub const STRING: ClassId = ClassId(2);
    /// Boxed `boolean`
    pub const BOOLEAN: ClassId = ClassId(3);
    /// Boxed `byte`
    pub const BYTE: ClassId = ClassId(4);
    /// Boxed `short`
    pub const SHORT: ClassId = ClassId(5);
    /// Boxed `char`
    pub const CHARACTER: ClassId = ClassId(6);
    /// Boxed `int`
    pub const INTEGER: ClassId = ClassId(7);
    /// Boxed `long`
    pub const LONG: ClassId = ClassId(8);
    /// Boxed `float`
    pub const FLOAT: ClassId = ClassId(9);
    /// Boxed `double`
    pub const DOUBLE: ClassId = ClassId(10);
    /// Interface implemented by `String`
    pub const CHAR_SEQUENCE: ClassId = ClassId(11);
    /// Interface implemented by `String` and the boxed classes
    pub const COMPARABLE: ClassId = ClassId(12);

    /// Number of reserved ids; user classes start here
    pub const FIRST_USER_ID: usize = 13;

    /// Create a class ID from its index
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the numeric index
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Whether this is one of the ids a host must reserve
    pub const fn is_well_known(self) -> bool {
        self.0 < Self::FIRST_USER_ID
    }
}

/// Reference to a type as it appears in a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// No value (method return only)
    Void,
    /// Primitive type
    Primitive(Primitive),
    /// Class or interface type
    Class(ClassId),
    /// One-dimensional array of the component type
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// The universal base type
    pub const fn object() -> Self {
        TypeRef::Class(ClassId::OBJECT)
    }

    /// The string type
    pub const fn string() -> Self {
        TypeRef::Class(ClassId::STRING)
    }

    /// Array type with the given component
    pub fn array_of(component: TypeRef) -> Self {
        TypeRef::Array(Box::new(component))
    }

    /// Check if this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    /// Check if this is an array type
    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    /// Component type of an array type
    pub fn component(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(component) => Some(component),
            _ => None,
        }
    }

    /// The class of a class type
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            TypeRef::Class(id) => Some(*id),
            _ => None,
        }
    }

    /// Boxed class type for primitives; other types are returned unchanged
    pub fn boxed(&self) -> TypeRef {
        match self {
            TypeRef::Primitive(p) => TypeRef::Class(p.boxed()),
            other => other.clone(),
        }
    }
}

impl From<Primitive> for TypeRef {
    fn from(p: Primitive) -> Self {
        TypeRef::Primitive(p)
    }
}

impl From<ClassId> for TypeRef {
    fn from(id: ClassId) -> Self {
        TypeRef::Class(id)
    }
}

/// Member visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Visible everywhere
    #[default]
    Public,
    /// Visible to subclasses
    Protected,
    /// Visible inside the declaring package
    Package,
    /// Visible inside the declaring class only
    Private,
}

/// Modifier flags for class members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Declared visibility
    pub visibility: Visibility,
    /// Static member
    pub is_static: bool,
    /// Final (non-reassignable) member
    pub is_final: bool,
}

/// Field information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Modifiers
    pub modifiers: Modifiers,
}

/// Method information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name
    pub name: String,
    /// Declared parameter types
    pub parameters: Vec<TypeRef>,
    /// Declared return type
    pub return_type: TypeRef,
    /// Modifiers
    pub modifiers: Modifiers,
}

/// Constructor information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorInfo {
    /// Declared parameter types
    pub parameters: Vec<TypeRef>,
    /// Modifiers
    pub modifiers: Modifiers,
}

/// Whether a type descriptor is a class or an interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Instantiable (or abstract) class
    #[default]
    Class,
    /// Interface
    Interface,
}

/// Reflection record for one class or interface.
///
/// Member lists hold *declared* members only, in declaration order;
/// inherited members are found by walking `superclass` and `interfaces`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Class ID in the host
    pub id: ClassId,
    /// Fully qualified name
    pub name: String,
    /// Class or interface
    pub kind: ClassKind,
    /// Direct superclass (None for the universal base type and interfaces)
    pub superclass: Option<ClassId>,
    /// Directly implemented (or extended, for interfaces) interfaces
    pub interfaces: Vec<ClassId>,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Declared methods
    pub methods: Vec<MethodInfo>,
    /// Declared constructors
    pub constructors: Vec<ConstructorInfo>,
}

impl ClassInfo {
    /// Check if this descriptor is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Find a declared field by name
    pub fn declared_field(&self, name: &str) -> Option<(FieldRef, &FieldInfo)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(index, f)| (FieldRef::new(self.id, index), f))
    }

    /// Find a declared method by name and exact parameter types
    pub fn declared_method<'a>(&'a self, name: &'a str, parameters: &[TypeRef]) -> Option<(MethodRef, &'a MethodInfo)> {
        self.declared_methods_named(name)
            .find(|(_, m)| m.parameters == parameters)
    }

    /// Iterate declared methods with the given name
    pub fn declared_methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (MethodRef, &'a MethodInfo)> + 'a {
        self.methods
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.name == name)
            .map(move |(index, m)| (MethodRef::new(self.id, index), m))
    }

    /// Find a declared constructor by exact parameter types
    pub fn declared_constructor(&self, parameters: &[TypeRef]) -> Option<(ConstructorRef, &ConstructorInfo)> {
        self.declared_constructors()
            .find(|(_, c)| c.parameters == parameters)
    }

    /// Iterate declared constructors
    pub fn declared_constructors(&self) -> impl Iterator<Item = (ConstructorRef, &ConstructorInfo)> + '_ {
        self.constructors
            .iter()
            .enumerate()
            .map(move |(index, c)| (ConstructorRef::new(self.id, index), c))
    }
}

macro_rules! member_ref {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            /// Declaring class
            pub class: ClassId,
            /// Index into the declaring class's member list
            pub index: usize,
        }

        impl $name {
            /// Create a member handle
            pub const fn new(class: ClassId, index: usize) -> Self {
                Self { class, index }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}{}", self.class.index(), $label, self.index)
            }
        }
    };
}

member_ref!(
    /// Handle to a declared field
    FieldRef,
    "field"
);
member_ref!(
    /// Handle to a declared method
    MethodRef,
    "method"
);
member_ref!(
    /// Handle to a declared constructor
    ConstructorRef,
    "init"
);

#[cfg(test)]
mod tests {
    use super::*;

    fn point_class() -> ClassInfo {
        ClassInfo {
            id: ClassId::new(20),
            name: "geo.Point".to_string(),
            kind: ClassKind::Class,
            superclass: Some(ClassId::OBJECT),
            interfaces: Vec::new(),
            fields: vec![
                FieldInfo {
                    name: "x".to_string(),
                    ty: TypeRef::Primitive(Primitive::Int),
                    modifiers: Modifiers::default(),
                },
                FieldInfo {
                    name: "y".to_string(),
                    ty: TypeRef::Primitive(Primitive::Int),
                    modifiers: Modifiers::default(),
                },
            ],
            methods: vec![
                MethodInfo {
                    name: "move".to_string(),
                    parameters: vec![TypeRef::Primitive(Primitive::Int)],
                    return_type: TypeRef::Void,
                    modifiers: Modifiers::default(),
                },
                MethodInfo {
                    name: "move".to_string(),
                    parameters: vec![TypeRef::Primitive(Primitive::Int), TypeRef::Primitive(Primitive::Int)],
                    return_type: TypeRef::Void,
                    modifiers: Modifiers::default(),
                },
            ],
            constructors: vec![ConstructorInfo {
                parameters: Vec::new(),
                modifiers: Modifiers::default(),
            }],
        }
    }

    #[test]
    fn test_declared_lookups() {
        let class = point_class();
        let (field, info) = class.declared_field("y").unwrap();
        assert_eq!(field, FieldRef::new(ClassId::new(20), 1));
        assert_eq!(info.name, "y");
        assert!(class.declared_field("z").is_none());

        let int = TypeRef::Primitive(Primitive::Int);
        let (method, _) = class.declared_method("move", &[int.clone(), int.clone()]).unwrap();
        assert_eq!(method.index, 1);
        assert_eq!(class.declared_methods_named("move").count(), 2);
        assert!(class.declared_constructor(&[]).is_some());
        assert!(class.declared_constructor(&[int]).is_none());
    }

    #[test]
    fn test_type_ref_helpers() {
        let ints = TypeRef::array_of(TypeRef::Primitive(Primitive::Int));
        assert!(ints.is_array());
        assert_eq!(ints.component(), Some(&TypeRef::Primitive(Primitive::Int)));
        assert_eq!(
            TypeRef::Primitive(Primitive::Int).boxed(),
            TypeRef::Class(ClassId::INTEGER)
        );
        assert!(ClassId::COMPARABLE.is_well_known());
        assert!(!ClassId::new(ClassId::FIRST_USER_ID).is_well_known());
    }
}
