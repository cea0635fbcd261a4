//! HostContext trait: the member access primitives
//!
//! Defines the interface a host implements so the binding layer can
//! describe and touch its objects. The binding layer only sees this trait;
//! how a host reaches private or final members is its own business, but it
//! must reach them.
//!
//! # Performance
//!
//! Dynamic dispatch (`&dyn HostContext`) is used throughout. Binding
//! definitions cache every resolved handle, so descriptor queries happen
//! once per member and the steady-state cost is one `invoke`/`get_field`
//! call per dispatched call.

use std::sync::Arc;

use crate::error::HostResult;
use crate::types::{ClassId, ClassInfo, ConstructorRef, FieldRef, MethodRef, TypeRef};
use crate::value::{ObjectRef, Value};

/// Abstract host for the binding layer.
pub trait HostContext: Send + Sync {
    // ========================================================================
    // Type Descriptors
    // ========================================================================

    /// Get the reflection record of a class
    fn class_info(&self, class: ClassId) -> HostResult<Arc<ClassInfo>>;

    /// Find a class by fully qualified name
    fn class_by_name(&self, name: &str) -> HostResult<ClassId>;

    /// Get the runtime type of an object (class or array type)
    fn type_of(&self, object: ObjectRef) -> HostResult<TypeRef>;

    // ========================================================================
    // Member Access
    // ========================================================================

    /// Read a field; `receiver` is `None` for static fields
    fn get_field(&self, field: FieldRef, receiver: Option<&Value>) -> HostResult<Value>;

    /// Write a field, ignoring `final`; `receiver` is `None` for static fields
    fn set_field(&self, field: FieldRef, receiver: Option<&Value>, value: Value) -> HostResult<()>;

    /// Invoke a method; `receiver` is `None` for static methods
    fn invoke(&self, method: MethodRef, receiver: Option<&Value>, args: &[Value]) -> HostResult<Value>;

    /// Allocate a new instance and run the constructor on it
    fn construct(&self, constructor: ConstructorRef, args: &[Value]) -> HostResult<ObjectRef>;

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Allocate a one-dimensional array with the given component type
    fn new_array(&self, component: &TypeRef, elements: Vec<Value>) -> HostResult<ObjectRef>;

    /// Snapshot the elements of an array
    fn array_elements(&self, array: ObjectRef) -> HostResult<Vec<Value>>;

    // ========================================================================
    // Provided
    // ========================================================================

    /// Runtime type of any value.
    ///
    /// Scalars report their boxed class, strings report `STRING`, and null
    /// has no runtime type.
    fn type_of_value(&self, value: &Value) -> HostResult<Option<TypeRef>> {
        Ok(match value {
            Value::Null => None,
            Value::Str(_) => Some(TypeRef::Class(ClassId::STRING)),
            Value::Object(r) => Some(self.type_of(*r)?),
            scalar => scalar.primitive().map(|p| TypeRef::Class(p.boxed())),
        })
    }

    /// Human-readable name of a type
    fn type_name(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Void => "void".to_string(),
            TypeRef::Primitive(p) => p.name().to_string(),
            TypeRef::Class(id) => self
                .class_info(*id)
                .map(|info| info.name.clone())
                .unwrap_or_else(|_| format!("<class {}>", id.index())),
            TypeRef::Array(component) => format!("{}[]", self.type_name(component)),
        }
    }
}
