//! Runtime Class Definitions
//!
//! Builders for classes whose members are backed by Rust closures. A
//! definition is handed to [`Heap::define_class`](crate::Heap::define_class),
//! which validates it and turns it into a [`ClassInfo`] record plus the
//! executable bodies.

use std::fmt;
use std::sync::Arc;

use umbra_sdk::{
    ClassId, ClassKind, ConstructorInfo, FieldInfo, HostResult, MethodInfo, Modifiers, ObjectRef,
    TypeRef, Value, Visibility,
};

use crate::heap::Heap;

/// Body of a method: `(heap, receiver, args) -> result`.
///
/// The receiver is `None` for static methods.
pub type NativeMethod = Arc<dyn Fn(&Heap, Option<&Value>, &[Value]) -> HostResult<Value> + Send + Sync>;

/// Body of a constructor: `(heap, this, args)`.
///
/// Runs on a freshly allocated instance whose fields hold their defaults.
pub type NativeConstructor = Arc<dyn Fn(&Heap, ObjectRef, &[Value]) -> HostResult<()> + Send + Sync>;

/// Definition for a field
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Modifiers
    pub modifiers: Modifiers,
    /// Initial value (defaults to the type's zero value)
    pub initial_value: Option<Value>,
}

impl FieldDefinition {
    /// Create a new private instance field
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            modifiers: Modifiers {
                visibility: Visibility::Private,
                ..Modifiers::default()
            },
            initial_value: None,
        }
    }

    /// Set the initial value
    pub fn initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    /// Mark as static field
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Mark as final field
    pub fn as_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    /// Set the visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.modifiers.visibility = visibility;
        self
    }

    pub(crate) fn info(&self) -> FieldInfo {
        FieldInfo {
            name: self.name.clone(),
            ty: self.ty.clone(),
            modifiers: self.modifiers,
        }
    }

    pub(crate) fn zero_value(&self) -> Value {
        match (&self.initial_value, &self.ty) {
            (Some(v), _) => v.clone(),
            (None, TypeRef::Primitive(p)) => p.default_value(),
            (None, _) => Value::Null,
        }
    }
}

/// Definition for a method
#[derive(Clone)]
pub struct MethodDefinition {
    /// Method name
    pub name: String,
    /// Parameter types
    pub parameters: Vec<TypeRef>,
    /// Return type
    pub return_type: TypeRef,
    /// Modifiers
    pub modifiers: Modifiers,
    /// Implementation
    pub body: NativeMethod,
}

impl MethodDefinition {
    /// Create a new private instance method returning `void`
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Heap, Option<&Value>, &[Value]) -> HostResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: TypeRef::Void,
            modifiers: Modifiers {
                visibility: Visibility::Private,
                ..Modifiers::default()
            },
            body: Arc::new(body),
        }
    }

    /// Add a parameter
    pub fn param(mut self, ty: impl Into<TypeRef>) -> Self {
        self.parameters.push(ty.into());
        self
    }

    /// Set return type
    pub fn returns(mut self, ty: impl Into<TypeRef>) -> Self {
        self.return_type = ty.into();
        self
    }

    /// Mark as static method
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Set the visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.modifiers.visibility = visibility;
        self
    }

    pub(crate) fn info(&self) -> MethodInfo {
        MethodInfo {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
            return_type: self.return_type.clone(),
            modifiers: self.modifiers,
        }
    }
}

impl fmt::Debug for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDefinition")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

/// Definition for a constructor
#[derive(Clone)]
pub struct ConstructorDefinition {
    /// Parameter types
    pub parameters: Vec<TypeRef>,
    /// Modifiers
    pub modifiers: Modifiers,
    /// Implementation
    pub body: NativeConstructor,
}

impl ConstructorDefinition {
    /// Create a new private constructor
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Heap, ObjectRef, &[Value]) -> HostResult<()> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            modifiers: Modifiers {
                visibility: Visibility::Private,
                ..Modifiers::default()
            },
            body: Arc::new(body),
        }
    }

    /// Add a parameter
    pub fn param(mut self, ty: impl Into<TypeRef>) -> Self {
        self.parameters.push(ty.into());
        self
    }

    /// Set the visibility
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.modifiers.visibility = visibility;
        self
    }

    pub(crate) fn info(&self) -> ConstructorInfo {
        ConstructorInfo {
            parameters: self.parameters.clone(),
            modifiers: self.modifiers,
        }
    }
}

impl fmt::Debug for ConstructorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDefinition")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Definition of a whole class or interface
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    /// Fully qualified name
    pub name: String,
    /// Class or interface
    pub kind: ClassKind,
    /// Superclass (defaults to the universal base type for classes)
    pub superclass: Option<ClassId>,
    /// Implemented interfaces
    pub interfaces: Vec<ClassId>,
    /// Declared fields
    pub fields: Vec<FieldDefinition>,
    /// Declared methods
    pub methods: Vec<MethodDefinition>,
    /// Declared constructors
    pub constructors: Vec<ConstructorDefinition>,
}

impl ClassDefinition {
    /// Start a class extending the universal base type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class,
            superclass: Some(ClassId::OBJECT),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// Start an interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Interface,
            superclass: None,
            ..Self::new(name)
        }
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: ClassId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: ClassId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a static field
    pub fn static_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field.as_static());
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, constructor: ConstructorDefinition) -> Self {
        self.constructors.push(constructor);
        self
    }
}
