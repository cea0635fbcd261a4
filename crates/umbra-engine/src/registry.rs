//! Binding registry
//!
//! The entry point for creating bindings. A registry belongs to one host and
//! keeps one [`BindingDefinition`] per capability type for as long as it
//! lives; definitions are created on first use, never up front.

use std::fmt;
use std::sync::Arc;

use umbra_sdk::{HostContext, TypeRef, Value};

use crate::binding::{BoundValue, LiveBinding};
use crate::cache::LoadingCache;
use crate::capability::{CapabilityId, CapabilityType};
use crate::convert::Capability;
use crate::definition::BindingDefinition;
use crate::error::{BindError, BindResult, CallSite, HostResultExt};
use crate::matcher::assign;
use crate::strategy::{ResolverChain, TargetResolver};
use crate::wrap::{ForBindings, Unwrapper, WrapContext, Wrapper};

/// Registry configuration
#[derive(Clone)]
pub struct RegistryOptions {
    /// Infer field names from `get`/`is`/`set` accessor names
    pub fuzzy_accessor_names: bool,

    /// Wrap strategy for members without an override
    pub wrapper: Arc<dyn Wrapper>,

    /// Unwrap strategy for members without an override
    pub unwrapper: Arc<dyn Unwrapper>,
}

impl RegistryOptions {
    /// Enable or disable accessor-name inference
    pub fn fuzzy_accessor_names(mut self, enabled: bool) -> Self {
        self.fuzzy_accessor_names = enabled;
        self
    }

    /// Set the default wrap strategy
    pub fn wrapper(mut self, wrapper: impl Wrapper + 'static) -> Self {
        self.wrapper = Arc::new(wrapper);
        self
    }

    /// Set the default unwrap strategy
    pub fn unwrapper(mut self, unwrapper: impl Unwrapper + 'static) -> Self {
        self.unwrapper = Arc::new(unwrapper);
        self
    }
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            fuzzy_accessor_names: true,
            wrapper: Arc::new(ForBindings),
            unwrapper: Arc::new(ForBindings),
        }
    }
}

impl fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("fuzzy_accessor_names", &self.fuzzy_accessor_names)
            .finish_non_exhaustive()
    }
}

struct RegistryInner {
    host: Arc<dyn HostContext>,
    resolvers: ResolverChain,
    definitions: LoadingCache<CapabilityId, Arc<BindingDefinition>>,
    options: RegistryOptions,
}

/// Table of binding definitions for one host; cheap to clone and share
/// across threads
#[derive(Clone)]
pub struct Registry(Arc<RegistryInner>);

impl Registry {
    /// Create a registry with default options
    pub fn new(host: Arc<dyn HostContext>) -> Self {
        Self::with_options(host, RegistryOptions::default())
    }

    /// Create a registry with the given options
    pub fn with_options(host: Arc<dyn HostContext>, options: RegistryOptions) -> Self {
        let resolvers = ResolverChain::builtin(options.fuzzy_accessor_names);
        Registry(Arc::new(RegistryInner {
            host,
            resolvers,
            definitions: LoadingCache::new(),
            options,
        }))
    }

    /// The host
    pub fn host(&self) -> &dyn HostContext {
        self.0.host.as_ref()
    }

    /// The resolver chain
    pub fn resolvers(&self) -> &ResolverChain {
        &self.0.resolvers
    }

    /// Options the registry was created with
    pub fn options(&self) -> &RegistryOptions {
        &self.0.options
    }

    pub(crate) fn default_wrapper(&self) -> Arc<dyn Wrapper> {
        Arc::clone(&self.0.options.wrapper)
    }

    pub(crate) fn default_unwrapper(&self) -> Arc<dyn Unwrapper> {
        Arc::clone(&self.0.options.unwrapper)
    }

    /// Insert a resolver ahead of every registered one.
    ///
    /// Returns `false` if a resolver with the same name is already present.
    /// Definitions and members already resolved are not revisited.
    pub fn register_resolver(&self, resolver: impl TargetResolver + 'static) -> bool {
        self.0.resolvers.register(Arc::new(resolver))
    }

    /// Number of definitions created so far
    pub fn definition_count(&self) -> usize {
        self.0.definitions.len()
    }

    /// Definition for `capability`, resolving its target type on first use
    pub fn definition(&self, capability: &CapabilityType) -> BindResult<Arc<BindingDefinition>> {
        self.0
            .definitions
            .get_or_load(capability.id(), || self.create_definition(capability))
    }

    fn create_definition(&self, capability: &CapabilityType) -> BindResult<Arc<BindingDefinition>> {
        let host = self.host();
        let site = || CallSite::new(capability.name());
        let Some(class) = self.0.resolvers.lookup_class(capability, host)? else {
            return Err(BindError::UnresolvedTarget {
                site: site(),
                detail: "no resolver names a target type".to_string(),
            });
        };
        let target = host.class_info(class).at(site)?;
        Ok(Arc::new(BindingDefinition::new(capability.clone(), target)))
    }

    /// Resolved target type of `capability`
    pub fn target_type_of(&self, capability: &CapabilityType) -> BindResult<TypeRef> {
        Ok(self.definition(capability)?.target_type())
    }

    /// Bind `capability` to `target`.
    ///
    /// The target must be a non-null value whose runtime type is assignable
    /// to the capability's target type. A binding given as the target is
    /// replaced by its own target.
    pub fn bind(&self, capability: &CapabilityType, target: impl Into<BoundValue>) -> BindResult<LiveBinding> {
        let definition = self.definition(capability)?;
        let site = || CallSite::new(capability.name()).target(definition.target().name.as_str());
        let target = target.into().into_target(site)?;

        let host = self.host();
        let expected = definition.target_type();
        let actual = host.type_of_value(&target).at(site)?;
        let assignable = match &actual {
            Some(actual) => assign::is_assignable(host, &expected, actual).at(site)?,
            None => false,
        };
        if !assignable {
            return Err(BindError::TypeMismatch {
                site: site(),
                expected: definition.target().name.clone(),
                actual: actual.map_or_else(|| "null".to_string(), |ty| host.type_name(&ty)),
            });
        }

        Ok(LiveBinding::new(definition, Some(target), self.clone()))
    }

    /// Bind `capability` to no target; only static-scope members can be
    /// called
    pub fn static_bind(&self, capability: &CapabilityType) -> BindResult<LiveBinding> {
        let definition = self.definition(capability)?;
        Ok(LiveBinding::new(definition, None, self.clone()))
    }

    /// Construct a new target object from `args` and bind to it
    pub fn construct_and_bind(&self, capability: &CapabilityType, args: Vec<BoundValue>) -> BindResult<LiveBinding> {
        let unwrapper = self.default_unwrapper();
        self.construct_and_bind_with(capability, unwrapper.as_ref(), args)
    }

    /// Construct a new target object from `args`, unwrapped with
    /// `unwrapper`, and bind to it
    pub fn construct_and_bind_with(
        &self,
        capability: &CapabilityType,
        unwrapper: &dyn Unwrapper,
        args: Vec<BoundValue>,
    ) -> BindResult<LiveBinding> {
        let definition = self.definition(capability)?;
        let site = CallSite::new(capability.name()).target(definition.target().name.as_str());
        let cx = WrapContext::new(self, &site);
        let host = self.host();

        let expected = args
            .iter()
            .map(|arg| self.argument_type(arg, &site))
            .collect::<BindResult<Vec<_>>>()?;
        let raw_args = unwrapper.unwrap_all(args, &expected, &cx)?;
        let arg_types = raw_args
            .iter()
            .map(|value| Ok(host.type_of_value(value).at(|| site.clone())?.unwrap_or_else(TypeRef::object)))
            .collect::<BindResult<Vec<_>>>()?;

        let constructor = definition.constructor(host, &arg_types)?;
        let object = constructor.construct(host, &raw_args).at(|| site.clone())?;
        self.bind(capability, Value::Object(object))
    }

    /// Real type `arg` has once unwrapped. An array takes its component
    /// from the first binding in it.
    fn argument_type(&self, arg: &BoundValue, site: &CallSite) -> BindResult<TypeRef> {
        Ok(match arg {
            BoundValue::Value(raw) => self
                .host()
                .type_of_value(raw)
                .at(|| site.clone())?
                .unwrap_or_else(TypeRef::object),
            BoundValue::Binding(binding) => binding.definition().target_type(),
            BoundValue::Array(items) => {
                let component = items.iter().find_map(|item| match item {
                    BoundValue::Binding(binding) => Some(binding.definition().target_type()),
                    _ => None,
                });
                TypeRef::array_of(component.unwrap_or_else(TypeRef::object))
            }
        })
    }

    /// Bind the facade `C` to `target`
    pub fn bind_as<C: Capability>(&self, target: impl Into<BoundValue>) -> BindResult<C> {
        self.bind(&C::capability(), target).map(C::from_binding)
    }

    /// Bind the facade `C` to no target
    pub fn static_bind_as<C: Capability>(&self) -> BindResult<C> {
        self.static_bind(&C::capability()).map(C::from_binding)
    }

    /// Construct a target object and bind the facade `C` to it
    pub fn construct_as<C: Capability>(&self, args: Vec<BoundValue>) -> BindResult<C> {
        self.construct_and_bind(&C::capability(), args).map(C::from_binding)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("definitions", &self.0.definitions.len())
            .field("resolvers", &self.0.resolvers)
            .field("options", &self.0.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Member;
    use crate::wrap::{ForBindingArrays, NoWrapping};
    use umbra_heap::{ClassDefinition, ConstructorDefinition, FieldDefinition, Heap};
    use umbra_sdk::{ClassId, Primitive};

    fn shape_class(heap: &Heap) -> (ClassId, ClassId) {
        let shape = heap
            .define_class(ClassDefinition::new("test.Shape").field(FieldDefinition::new("sides", Primitive::Int)))
            .unwrap();
        let square = heap
            .define_class(
                ClassDefinition::new("test.Square")
                    .extends(shape)
                    .constructor(ConstructorDefinition::new(|heap, this, _| heap.write(this, "sides", 4i32))),
            )
            .unwrap();
        (shape, square)
    }

    #[test]
    fn test_definitions_are_shared() {
        let heap = Arc::new(Heap::new());
        let (shape, _) = shape_class(&heap);
        let registry = Registry::new(heap.clone());
        let capability = CapabilityType::builder("Shape").target_class(shape).build().unwrap();

        let a = registry.definition(&capability).unwrap();
        let b = registry.definition(&capability).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.definition_count(), 1);
        assert_eq!(registry.target_type_of(&capability).unwrap(), TypeRef::Class(shape));
    }

    #[test]
    fn test_bind_checks_target_type() {
        let heap = Arc::new(Heap::new());
        let (shape, square) = shape_class(&heap);
        let registry = Registry::new(heap.clone());
        let capability = CapabilityType::builder("Shape").target_class(shape).build().unwrap();

        assert!(registry.bind(&capability, heap.alloc(square).unwrap()).is_ok());
        for wrong in [BoundValue::from("text"), BoundValue::default(), BoundValue::from(3i32)] {
            assert!(matches!(
                registry.bind(&capability, wrong),
                Err(BindError::TypeMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_bind_unwraps_bindings() {
        let heap = Arc::new(Heap::new());
        let (shape, square) = shape_class(&heap);
        let registry = Registry::new(heap.clone());
        let shape_cap = CapabilityType::builder("Shape").target_class(shape).build().unwrap();
        let square_cap = CapabilityType::builder("Square").target_class(square).build().unwrap();

        let object = heap.alloc(square).unwrap();
        let inner = registry.bind(&square_cap, object).unwrap();
        let outer = registry.bind(&shape_cap, inner).unwrap();
        assert_eq!(outer.target_object(), Some(object));
    }

    #[test]
    fn test_unresolved_target() {
        let heap = Arc::new(Heap::new());
        let registry = Registry::new(heap);
        let capability = CapabilityType::builder("Nowhere").build().unwrap();
        assert!(matches!(
            registry.static_bind(&capability),
            Err(BindError::UnresolvedTarget { .. })
        ));
        assert_eq!(registry.definition_count(), 0);
    }

    #[test]
    fn test_construct_and_bind() {
        let heap = Arc::new(Heap::new());
        let (_, square) = shape_class(&heap);
        let registry = Registry::new(heap.clone());
        let capability = CapabilityType::builder("Square")
            .target_class(square)
            .member(Member::field("getSides").returns(Primitive::Int))
            .build()
            .unwrap();

        let binding = registry.construct_and_bind(&capability, vec![]).unwrap();
        let sides: i32 = binding.call("getSides", ()).unwrap();
        assert_eq!(sides, 4);

        let other = registry
            .construct_and_bind_with(&capability, &NoWrapping, vec![])
            .unwrap();
        assert_ne!(binding, other);
        assert!(matches!(
            registry.construct_and_bind(&capability, vec![BoundValue::from(1i32)]),
            Err(BindError::MemberNotFound { kind: "constructor", .. })
        ));
    }

    #[test]
    fn test_construct_with_bound_arguments() {
        let heap = Arc::new(Heap::new());
        let (shape, square) = shape_class(&heap);
        let shapes = TypeRef::array_of(TypeRef::Class(shape));
        let group = heap
            .define_class(
                ClassDefinition::new("test.Group")
                    .field(FieldDefinition::new("first", shape))
                    .field(FieldDefinition::new("all", shapes.clone()))
                    .constructor(
                        ConstructorDefinition::new(|heap, this, args| heap.write(this, "first", args[0].clone()))
                            .param(shape),
                    )
                    .constructor(
                        ConstructorDefinition::new(|heap, this, args| heap.write(this, "all", args[0].clone()))
                            .param(shapes),
                    ),
            )
            .unwrap();
        let registry = Registry::new(heap.clone());
        let square_cap = CapabilityType::builder("Square").target_class(square).build().unwrap();
        let group_cap = CapabilityType::builder("Group").target_class(group).build().unwrap();

        let object = heap.alloc(square).unwrap();
        let member = registry.bind(&square_cap, object).unwrap();

        let single = registry.construct_and_bind(&group_cap, vec![member.clone().into()]).unwrap();
        let single = single.target_object().unwrap();
        assert_eq!(heap.read(single, "first").unwrap(), Value::Object(object));

        let args = vec![BoundValue::Array(vec![member.into(), BoundValue::default()])];
        let many = registry.construct_and_bind_with(&group_cap, &ForBindingArrays, args).unwrap();
        let all = heap.read(many.target_object().unwrap(), "all").unwrap();
        assert_eq!(
            heap.array_elements(all.as_object().unwrap()).unwrap(),
            vec![Value::Object(object), Value::Null]
        );
    }

    #[test]
    fn test_options() {
        let heap = Arc::new(Heap::new());
        let registry = Registry::with_options(heap, RegistryOptions::default().fuzzy_accessor_names(false));
        assert_eq!(registry.resolvers().names().len(), 3);
        assert!(!registry.options().fuzzy_accessor_names);
    }
}
