//! Wrap and unwrap strategies
//!
//! Values cross the boundary between a binding and its target twice per
//! call: arguments are *unwrapped* from [`BoundValue`]s into host values,
//! and results are *wrapped* from host values back into [`BoundValue`]s
//! according to the declared return [`Shape`].
//!
//! | Strategy           | Unwraps                              | Wraps                                   |
//! |--------------------|--------------------------------------|-----------------------------------------|
//! | [`NoWrapping`]     | plain values only                    | nothing                                 |
//! | [`ForBindings`]    | a binding to its target              | a result declared as a capability       |
//! | [`ForBindingArrays`] | each element of an array of bindings | each element of an array result       |

use umbra_sdk::{HostContext, HostError, TypeRef, Value};

use crate::binding::{BoundValue, LiveBinding};
use crate::capability::Shape;
use crate::error::{BindError, BindResult, CallSite, HostResultExt};
use crate::matcher::assign;
use crate::registry::Registry;

/// What a strategy may touch while converting a value
pub struct WrapContext<'a> {
    registry: &'a Registry,
    site: &'a CallSite,
}

impl<'a> WrapContext<'a> {
    /// Context for a conversion at `site`
    pub fn new(registry: &'a Registry, site: &'a CallSite) -> Self {
        Self { registry, site }
    }

    /// Registry owning the binding being called
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The host
    pub fn host(&self) -> &'a dyn HostContext {
        self.registry.host()
    }

    /// Call site of the conversion
    pub fn site(&self) -> &'a CallSite {
        self.site
    }

    fn array_shape(&self, detail: impl Into<String>) -> BindError {
        BindError::ArrayShape {
            site: self.site.clone(),
            detail: detail.into(),
        }
    }

    /// Target a binding stands for. A static binding has nothing to pass.
    fn target_of(&self, binding: &LiveBinding) -> BindResult<Value> {
        binding.target().cloned().ok_or_else(|| BindError::Scope {
            site: self.site.clone(),
            reason: format!("static binding of {} has no target to pass", binding.capability()),
        })
    }
}

/// Converts raw results into bound values
pub trait Wrapper: Send + Sync {
    /// Wrap `raw` as the declared shape `expected`
    fn wrap(&self, raw: Value, expected: &Shape, cx: &WrapContext<'_>) -> BindResult<BoundValue>;
}

/// Converts bound arguments into raw values
pub trait Unwrapper: Send + Sync {
    /// Unwrap `value` for a parameter of real type `expected`
    fn unwrap(&self, value: BoundValue, expected: &TypeRef, cx: &WrapContext<'_>) -> BindResult<Value>;

    /// Real type standing behind a declared parameter shape
    fn unwrap_shape(&self, shape: &Shape, cx: &WrapContext<'_>) -> BindResult<TypeRef>;

    /// Unwrap every argument; arguments past the end of `expected` are
    /// unwrapped for the universal base type
    fn unwrap_all(&self, values: Vec<BoundValue>, expected: &[TypeRef], cx: &WrapContext<'_>) -> BindResult<Vec<Value>> {
        let object = TypeRef::object();
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| self.unwrap(value, expected.get(i).unwrap_or(&object), cx))
            .collect()
    }

    /// Unwrap every parameter shape
    fn unwrap_shapes(&self, shapes: &[Shape], cx: &WrapContext<'_>) -> BindResult<Vec<TypeRef>> {
        shapes.iter().map(|shape| self.unwrap_shape(shape, cx)).collect()
    }
}

/// Passes values through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWrapping;

impl Wrapper for NoWrapping {
    fn wrap(&self, raw: Value, _expected: &Shape, _cx: &WrapContext<'_>) -> BindResult<BoundValue> {
        Ok(BoundValue::Value(raw))
    }
}

impl Unwrapper for NoWrapping {
    fn unwrap(&self, value: BoundValue, expected: &TypeRef, cx: &WrapContext<'_>) -> BindResult<Value> {
        match value {
            BoundValue::Value(raw) => Ok(raw),
            BoundValue::Binding(binding) => Err(BindError::TypeMismatch {
                site: cx.site().clone(),
                expected: cx.host().type_name(expected),
                actual: format!("binding of {}", binding.capability()),
            }),
            BoundValue::Array(_) => Err(cx.array_shape("array of bound values given to a strategy that does not unwrap")),
        }
    }

    fn unwrap_shape(&self, shape: &Shape, cx: &WrapContext<'_>) -> BindResult<TypeRef> {
        Ok(match shape {
            Shape::Void => TypeRef::Void,
            Shape::Type(ty) => ty.clone(),
            Shape::Capability(_) => TypeRef::object(),
            Shape::Array(component) => TypeRef::array_of(self.unwrap_shape(component, cx)?),
        })
    }
}

/// Wraps results declared as capability types into bindings and unwraps
/// bindings to their targets
#[derive(Debug, Clone, Copy, Default)]
pub struct ForBindings;

impl Wrapper for ForBindings {
    fn wrap(&self, raw: Value, expected: &Shape, cx: &WrapContext<'_>) -> BindResult<BoundValue> {
        if raw.is_null() {
            return Ok(BoundValue::Value(raw));
        }
        match expected.as_capability() {
            Some(capability) => Ok(BoundValue::Binding(cx.registry().bind(&capability, raw)?)),
            None => Ok(BoundValue::Value(raw)),
        }
    }
}

impl Unwrapper for ForBindings {
    fn unwrap(&self, value: BoundValue, _expected: &TypeRef, cx: &WrapContext<'_>) -> BindResult<Value> {
        match value {
            BoundValue::Value(raw) => Ok(raw),
            BoundValue::Binding(binding) => cx.target_of(&binding),
            BoundValue::Array(_) => Err(cx.array_shape("arrays of bindings need element-wise unwrapping")),
        }
    }

    fn unwrap_shape(&self, shape: &Shape, cx: &WrapContext<'_>) -> BindResult<TypeRef> {
        Ok(match shape {
            Shape::Void => TypeRef::Void,
            Shape::Type(ty) => ty.clone(),
            Shape::Capability(capability) => cx.registry().target_type_of(&capability.get())?,
            Shape::Array(component) => TypeRef::array_of(self.unwrap_shape(component, cx)?),
        })
    }
}

/// Wraps and unwraps one-dimensional arrays element by element
///
/// Unwrapping builds a fresh host array on every call. The host owns it
/// from then on, like any other object it allocates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForBindingArrays;

impl ForBindingArrays {
    fn capability_component<'s>(shape: &'s Shape, cx: &WrapContext<'_>) -> BindResult<&'s Shape> {
        match shape.component() {
            Some(component @ Shape::Capability(_)) => Ok(component),
            Some(other) => Err(cx.array_shape(format!("component {:?} is not a capability type", other))),
            None => Err(cx.array_shape(format!("declared shape {:?} is not an array", shape))),
        }
    }

    /// One element of an array argument: null, or a binding whose target
    /// fits the component type
    fn unwrap_element(item: BoundValue, component: &TypeRef, cx: &WrapContext<'_>) -> BindResult<Value> {
        let binding = match item {
            BoundValue::Value(Value::Null) => return Ok(Value::Null),
            BoundValue::Binding(binding) => binding,
            other => return Err(cx.array_shape(format!("expected a binding element, found {}", other.kind_name()))),
        };
        let target = cx.target_of(&binding)?;
        let site = || cx.site().clone();
        let fits = match cx.host().type_of_value(&target).at(site)? {
            Some(actual) => assign::is_assignable(cx.host(), component, &actual).at(site)?,
            None => true,
        };
        if !fits {
            return Err(cx.array_shape(format!(
                "element bound as {} does not fit component {}",
                binding.capability(),
                cx.host().type_name(component)
            )));
        }
        Ok(target)
    }
}

impl Wrapper for ForBindingArrays {
    fn wrap(&self, raw: Value, expected: &Shape, cx: &WrapContext<'_>) -> BindResult<BoundValue> {
        if raw.is_null() {
            return Ok(BoundValue::Value(raw));
        }
        let component = Self::capability_component(expected, cx)?;
        let Some(array) = raw.as_object() else {
            return Err(cx.array_shape(format!("expected an array, found {}", raw.kind_name())));
        };
        let elements = match cx.host().array_elements(array) {
            Ok(elements) => elements,
            Err(HostError::NotAnArray(detail)) => return Err(cx.array_shape(detail)),
            Err(e) => return Err(BindError::host(cx.site().clone(), e)),
        };

        elements
            .into_iter()
            .map(|element| ForBindings.wrap(element, component, cx))
            .collect::<BindResult<Vec<_>>>()
            .map(BoundValue::Array)
    }
}

impl Unwrapper for ForBindingArrays {
    fn unwrap(&self, value: BoundValue, expected: &TypeRef, cx: &WrapContext<'_>) -> BindResult<Value> {
        let items = match value {
            BoundValue::Value(Value::Null) => return Ok(Value::Null),
            BoundValue::Array(items) => items,
            BoundValue::Value(other) => {
                return Err(cx.array_shape(format!("expected an array of bindings, found {}", other.kind_name())))
            }
            BoundValue::Binding(binding) => {
                return Err(cx.array_shape(format!(
                    "expected an array of bindings, found a binding of {}",
                    binding.capability()
                )))
            }
        };
        let Some(component) = expected.component() else {
            return Err(cx.array_shape(format!("parameter type {} is not an array", cx.host().type_name(expected))));
        };

        let elements = items
            .into_iter()
            .map(|item| Self::unwrap_element(item, component, cx))
            .collect::<BindResult<Vec<_>>>()?;
        let array = cx.host().new_array(component, elements).at(|| cx.site().clone())?;
        Ok(Value::Object(array))
    }

    fn unwrap_shape(&self, shape: &Shape, cx: &WrapContext<'_>) -> BindResult<TypeRef> {
        let component = Self::capability_component(shape, cx)?;
        Ok(TypeRef::array_of(ForBindings.unwrap_shape(component, cx)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityType;
    use std::sync::Arc;
    use umbra_heap::{ClassDefinition, Heap};
    use umbra_sdk::{ClassId, Primitive};

    fn setup() -> (Arc<Heap>, Registry, CapabilityType) {
        let heap = Arc::new(Heap::new());
        let class = heap.define_class(ClassDefinition::new("test.Node")).unwrap();
        let registry = Registry::new(heap.clone());
        let node = CapabilityType::builder("Node").target_class(class).build().unwrap();
        (heap, registry, node)
    }

    #[test]
    fn test_for_bindings_round_trip() {
        let (heap, registry, node) = setup();
        let site = CallSite::new("Node");
        let cx = WrapContext::new(&registry, &site);
        let class = registry.target_type_of(&node).unwrap();
        let object = heap.alloc(class.class_id().unwrap()).unwrap();

        let wrapped = ForBindings
            .wrap(Value::Object(object), &Shape::capability_of(&node), &cx)
            .unwrap();
        assert!(matches!(&wrapped, BoundValue::Binding(b) if b.capability() == &node));
        assert_eq!(ForBindings.unwrap(wrapped, &class, &cx).unwrap(), Value::Object(object));

        assert_eq!(
            ForBindings.wrap(Value::Null, &Shape::capability_of(&node), &cx).unwrap(),
            BoundValue::Value(Value::Null)
        );
        assert_eq!(
            ForBindings.wrap(Value::Int(3), &Shape::from(Primitive::Int), &cx).unwrap(),
            BoundValue::Value(Value::Int(3))
        );
    }

    #[test]
    fn test_unwrap_shapes() {
        let (_heap, registry, node) = setup();
        let site = CallSite::new("Node");
        let cx = WrapContext::new(&registry, &site);
        let target = registry.target_type_of(&node).unwrap();

        assert_eq!(ForBindings.unwrap_shape(&Shape::capability_of(&node), &cx).unwrap(), target);
        assert_eq!(NoWrapping.unwrap_shape(&Shape::capability_of(&node), &cx).unwrap(), TypeRef::object());
        let nodes = Shape::array_of(Shape::capability_of(&node));
        assert_eq!(ForBindingArrays.unwrap_shape(&nodes, &cx).unwrap(), TypeRef::array_of(target));
        assert!(matches!(
            ForBindingArrays.unwrap_shape(&Shape::from(ClassId::STRING), &cx),
            Err(BindError::ArrayShape { .. })
        ));
    }

    #[test]
    fn test_array_round_trip() {
        let (heap, registry, node) = setup();
        let site = CallSite::new("Node");
        let cx = WrapContext::new(&registry, &site);
        let class = registry.target_type_of(&node).unwrap();
        let a = heap.alloc(class.class_id().unwrap()).unwrap();
        let b = heap.alloc(class.class_id().unwrap()).unwrap();
        let array = heap.alloc_array(class.clone(), vec![Value::Object(a), Value::Null, Value::Object(b)]);

        let nodes = Shape::array_of(Shape::capability_of(&node));
        let wrapped = ForBindingArrays.wrap(Value::Object(array), &nodes, &cx).unwrap();
        let BoundValue::Array(items) = &wrapped else {
            panic!("expected an array, got {:?}", wrapped);
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], BoundValue::Binding(_)));
        assert_eq!(items[1], BoundValue::Value(Value::Null));

        let param = ForBindingArrays.unwrap_shape(&nodes, &cx).unwrap();
        let raw = ForBindingArrays.unwrap(wrapped, &param, &cx).unwrap();
        let copy = raw.as_object().unwrap();
        assert_ne!(copy, array);
        assert_eq!(
            heap.array_elements(copy).unwrap(),
            vec![Value::Object(a), Value::Null, Value::Object(b)]
        );
    }

    #[test]
    fn test_array_shape_errors() {
        let (heap, registry, node) = setup();
        let site = CallSite::new("Node");
        let cx = WrapContext::new(&registry, &site);
        let class = registry.target_type_of(&node).unwrap();
        let object = heap.alloc(class.class_id().unwrap()).unwrap();
        let nodes = Shape::array_of(Shape::capability_of(&node));

        assert!(matches!(
            ForBindingArrays.wrap(Value::Object(object), &nodes, &cx),
            Err(BindError::ArrayShape { .. })
        ));
        assert!(matches!(
            ForBindingArrays.wrap(Value::Int(1), &nodes, &cx),
            Err(BindError::ArrayShape { .. })
        ));
        assert!(matches!(
            ForBindingArrays.unwrap(BoundValue::Value(Value::Int(1)), &TypeRef::array_of(class), &cx),
            Err(BindError::ArrayShape { .. })
        ));
        assert!(matches!(
            NoWrapping.unwrap(BoundValue::Array(Vec::new()), &TypeRef::object(), &cx),
            Err(BindError::ArrayShape { .. })
        ));
    }

    #[test]
    fn test_static_binding_has_no_target() {
        let (_heap, registry, node) = setup();
        let site = CallSite::new("Node");
        let cx = WrapContext::new(&registry, &site);
        let class = registry.target_type_of(&node).unwrap();

        let unbound = BoundValue::Binding(registry.static_bind(&node).unwrap());
        let err = ForBindings.unwrap(unbound, &class, &cx).unwrap_err();
        assert!(matches!(&err, BindError::Scope { reason, .. } if reason.contains("static binding of Node")));
    }

    #[test]
    fn test_array_elements_checked_against_component() {
        let (heap, registry, node) = setup();
        let site = CallSite::new("Node");
        let cx = WrapContext::new(&registry, &site);
        let class = registry.target_type_of(&node).unwrap();
        let node_class = class.class_id().unwrap();
        let leaf_class = heap.define_class(ClassDefinition::new("test.Leaf").extends(node_class)).unwrap();
        let other_class = heap.define_class(ClassDefinition::new("test.Other")).unwrap();
        let leaf = CapabilityType::builder("Leaf").target_class(leaf_class).build().unwrap();
        let other = CapabilityType::builder("Other").target_class(other_class).build().unwrap();
        let param = TypeRef::array_of(class);

        let stranger = registry.bind(&other, heap.alloc(other_class).unwrap()).unwrap();
        let before = heap.object_count();
        for items in [
            vec![BoundValue::from(3i32)],
            vec![BoundValue::Binding(stranger)],
            vec![BoundValue::Array(Vec::new())],
        ] {
            assert!(matches!(
                ForBindingArrays.unwrap(BoundValue::Array(items), &param, &cx),
                Err(BindError::ArrayShape { .. })
            ));
        }
        assert!(matches!(
            ForBindingArrays.unwrap(
                BoundValue::Array(vec![BoundValue::Binding(registry.static_bind(&node).unwrap())]),
                &param,
                &cx
            ),
            Err(BindError::Scope { .. })
        ));
        assert_eq!(heap.object_count(), before);

        // Subclass targets fit, and nulls pass through.
        let a = heap.alloc(leaf_class).unwrap();
        let items = vec![
            BoundValue::Binding(registry.bind(&leaf, a).unwrap()),
            BoundValue::Value(Value::Null),
        ];
        let raw = ForBindingArrays.unwrap(BoundValue::Array(items), &param, &cx).unwrap();
        assert_eq!(
            heap.array_elements(raw.as_object().unwrap()).unwrap(),
            vec![Value::Object(a), Value::Null]
        );
    }
}
