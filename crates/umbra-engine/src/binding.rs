//! Live bindings and bound values

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use umbra_sdk::{ObjectRef, Value};

use crate::capability::CapabilityType;
use crate::convert::{FromBound, IntoArgs};
use crate::definition::BindingDefinition;
use crate::dispatch;
use crate::error::{BindError, BindResult, CallSite};
use crate::registry::Registry;

/// A capability type bound to one target object, or to none for a static
/// binding.
///
/// Bindings are cheap values: every request creates a new one and all
/// resolved state lives in the shared [`BindingDefinition`]. Two bindings
/// are equal when they share the capability type and their targets are
/// equal.
#[derive(Clone)]
pub struct LiveBinding {
    definition: Arc<BindingDefinition>,
    target: Option<Value>,
    registry: Registry,
}

impl LiveBinding {
    pub(crate) fn new(definition: Arc<BindingDefinition>, target: Option<Value>, registry: Registry) -> Self {
        Self {
            definition,
            target,
            registry,
        }
    }

    /// The target object; `None` for a static binding
    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }

    /// The target object handle, if the target is an object
    pub fn target_object(&self) -> Option<ObjectRef> {
        self.target.as_ref().and_then(Value::as_object)
    }

    /// Check if this is a static binding
    pub fn is_static(&self) -> bool {
        self.target.is_none()
    }

    /// The capability type
    pub fn capability(&self) -> &CapabilityType {
        self.definition.capability()
    }

    /// The resolved definition shared by all bindings of the capability
    pub fn definition(&self) -> &Arc<BindingDefinition> {
        &self.definition
    }

    /// The registry this binding was created by
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Call a member by name
    pub fn invoke(&self, name: &str, args: Vec<BoundValue>) -> BindResult<BoundValue> {
        dispatch::dispatch(self, name, args)
    }

    /// Call a member with typed arguments and result
    pub fn call<A: IntoArgs, R: FromBound>(&self, name: &str, args: A) -> BindResult<R> {
        let result = self.invoke(name, args.into_args())?;
        R::from_bound(result).map_err(|value| BindError::TypeMismatch {
            site: self.definition.site(name),
            expected: std::any::type_name::<R>().to_string(),
            actual: value.kind_name().to_string(),
        })
    }
}

impl PartialEq for LiveBinding {
    fn eq(&self, other: &Self) -> bool {
        self.capability() == other.capability() && self.target == other.target
    }
}

impl Eq for LiveBinding {}

impl Hash for LiveBinding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.capability().hash(state);
        self.target.hash(state);
    }
}

impl fmt::Display for LiveBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Binding(capability={}, target_class={}, target=",
            self.capability(),
            self.definition.target().name
        )?;
        match &self.target {
            Some(target) => write!(f, "{})", target),
            None => f.write_str("static)"),
        }
    }
}

impl fmt::Debug for LiveBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveBinding")
            .field("capability", &self.capability().name())
            .field("target_class", &self.definition.target().name)
            .field("target", &self.target)
            .finish()
    }
}

/// A value on the capability side of a call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundValue {
    /// Plain host value
    Value(Value),
    /// Value bound to a capability type
    Binding(LiveBinding),
    /// Array with individually wrapped elements
    Array(Vec<BoundValue>),
}

impl BoundValue {
    /// Check if this is the null reference
    pub fn is_null(&self) -> bool {
        matches!(self, BoundValue::Value(Value::Null))
    }

    /// The plain value, if this is one
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            BoundValue::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The binding, if this is one
    pub fn as_binding(&self) -> Option<&LiveBinding> {
        match self {
            BoundValue::Binding(binding) => Some(binding),
            _ => None,
        }
    }

    /// Take the binding, if this is one
    pub fn into_binding(self) -> Option<LiveBinding> {
        match self {
            BoundValue::Binding(binding) => Some(binding),
            _ => None,
        }
    }

    /// The elements, if this is an array
    pub fn as_array(&self) -> Option<&[BoundValue]> {
        match self {
            BoundValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Short description of the value's kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            BoundValue::Value(value) => value.kind_name(),
            BoundValue::Binding(_) => "binding",
            BoundValue::Array(_) => "array",
        }
    }

    /// Target of the value: the value itself, or a binding's target.
    /// Arrays and static bindings have none.
    pub(crate) fn into_target(self, site: impl FnOnce() -> CallSite) -> BindResult<Value> {
        match self {
            BoundValue::Value(value) => Ok(value),
            BoundValue::Binding(binding) => Ok(binding.target.unwrap_or(Value::Null)),
            BoundValue::Array(_) => Err(BindError::ArrayShape {
                site: site(),
                detail: "an array of bound values cannot be a binding target".to_string(),
            }),
        }
    }
}

impl Default for BoundValue {
    fn default() -> Self {
        BoundValue::Value(Value::Null)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BoundValue {
                fn from(v: $ty) -> Self {
                    BoundValue::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_from_value!(bool, i8, i16, char, i32, i64, f32, f64, &str, String, ObjectRef);

impl From<Value> for BoundValue {
    fn from(value: Value) -> Self {
        BoundValue::Value(value)
    }
}

impl From<LiveBinding> for BoundValue {
    fn from(binding: LiveBinding) -> Self {
        BoundValue::Binding(binding)
    }
}

impl<T: Into<BoundValue>> From<Vec<T>> for BoundValue {
    fn from(items: Vec<T>) -> Self {
        BoundValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<BoundValue>> From<Option<T>> for BoundValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use umbra_heap::{ClassDefinition, Heap};

    fn hash_of(value: &impl Hash) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_by_capability_and_target() {
        let heap = Arc::new(Heap::new());
        let class = heap.define_class(ClassDefinition::new("test.Box")).unwrap();
        let registry = Registry::new(heap.clone());
        let boxed = CapabilityType::builder("Box").target_class(class).build().unwrap();
        let other = CapabilityType::builder("Box").target_class(class).build().unwrap();
        let object = heap.alloc(class).unwrap();

        let a = registry.bind(&boxed, object).unwrap();
        let b = registry.bind(&boxed, object).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = registry.bind(&other, object).unwrap();
        assert_ne!(a, c);
        let d = registry.bind(&boxed, heap.alloc(class).unwrap()).unwrap();
        assert_ne!(a, d);
        assert_ne!(a, registry.static_bind(&boxed).unwrap());
    }

    #[test]
    fn test_display() {
        let heap = Arc::new(Heap::new());
        let class = heap.define_class(ClassDefinition::new("test.Box")).unwrap();
        let registry = Registry::new(heap.clone());
        let boxed = CapabilityType::builder("Box").target_class(class).build().unwrap();

        let binding = registry.static_bind(&boxed).unwrap();
        assert_eq!(binding.to_string(), "Binding(capability=Box, target_class=test.Box, target=static)");
        assert!(binding.is_static());
    }

    #[test]
    fn test_bound_value_conversions() {
        assert_eq!(BoundValue::from(5i32), BoundValue::Value(Value::Int(5)));
        assert_eq!(BoundValue::from("x"), BoundValue::Value(Value::string("x")));
        assert!(BoundValue::from(None::<i32>).is_null());
        assert_eq!(
            BoundValue::from(vec![1i32, 2]),
            BoundValue::Array(vec![BoundValue::from(1i32), BoundValue::from(2i32)])
        );
        assert_eq!(BoundValue::from(vec![1i32]).kind_name(), "array");
    }
}
