//! Binding definitions
//!
//! A [`BindingDefinition`] records how one capability type maps onto its
//! target type. It is created the first time the capability is used and
//! then only grows: each member is resolved at most once per key and the
//! result is kept for the lifetime of the registry.
//!
//! | Cache        | Key                                   | Value                 |
//! |--------------|---------------------------------------|-----------------------|
//! | methods      | member index + unwrapped argument types | [`MethodBinding`]   |
//! | fields       | member index                          | [`FieldBinding`]      |
//! | constructors | argument types                        | [`ConstructorBinding`]|

use std::fmt;
use std::sync::Arc;

use umbra_sdk::{
    ClassInfo, ConstructorInfo, ConstructorRef, FieldInfo, FieldRef, HostContext, HostError, HostResult, MethodInfo,
    MethodRef, ObjectRef, TypeRef, Value,
};

use crate::cache::LoadingCache;
use crate::capability::{CapabilityType, Member};
use crate::error::{BindError, BindResult, CallSite, HostResultExt};
use crate::matcher;
use crate::strategy::ResolverChain;

/// A capability member resolved to a real method
#[derive(Debug, Clone)]
pub struct MethodBinding {
    /// Real method handle
    pub method: MethodRef,
    /// Real method descriptor
    pub info: MethodInfo,
    /// Transformation cost the matcher settled on
    pub cost: f32,
}

impl MethodBinding {
    /// Invoke the method, on `receiver` unless it is static
    pub fn invoke(&self, host: &dyn HostContext, receiver: Option<&Value>, args: &[Value]) -> HostResult<Value> {
        if self.info.modifiers.is_static {
            return host.invoke(self.method, None, args);
        }
        match receiver {
            Some(receiver) => host.invoke(self.method, Some(receiver), args),
            None => Err(HostError::MissingReceiver(self.info.name.clone())),
        }
    }
}

/// A capability accessor resolved to a real field
#[derive(Debug, Clone)]
pub struct FieldBinding {
    /// Real field handle
    pub field: FieldRef,
    /// Real field descriptor
    pub info: FieldInfo,
}

impl FieldBinding {
    fn receiver<'a>(&self, receiver: Option<&'a Value>) -> HostResult<Option<&'a Value>> {
        if self.info.modifiers.is_static {
            return Ok(None);
        }
        receiver
            .map(Some)
            .ok_or_else(|| HostError::MissingReceiver(self.info.name.clone()))
    }

    /// Read the field
    pub fn get(&self, host: &dyn HostContext, receiver: Option<&Value>) -> HostResult<Value> {
        host.get_field(self.field, self.receiver(receiver)?)
    }

    /// Write the field
    pub fn set(&self, host: &dyn HostContext, receiver: Option<&Value>, value: Value) -> HostResult<()> {
        host.set_field(self.field, self.receiver(receiver)?, value)
    }
}

/// Argument types resolved to a real constructor
#[derive(Debug, Clone)]
pub struct ConstructorBinding {
    /// Real constructor handle
    pub constructor: ConstructorRef,
    /// Real constructor descriptor
    pub info: ConstructorInfo,
    /// Transformation cost the matcher settled on
    pub cost: f32,
}

impl ConstructorBinding {
    /// Run the constructor
    pub fn construct(&self, host: &dyn HostContext, args: &[Value]) -> HostResult<ObjectRef> {
        host.construct(self.constructor, args)
    }
}

/// How many resolutions each cache of a definition has performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolutions {
    /// Method resolutions
    pub methods: usize,
    /// Field resolutions
    pub fields: usize,
    /// Constructor resolutions
    pub constructors: usize,
}

/// Resolved mapping of one capability type onto its target type
pub struct BindingDefinition {
    capability: CapabilityType,
    target: Arc<ClassInfo>,
    methods: LoadingCache<(usize, Vec<TypeRef>), Arc<MethodBinding>>,
    fields: LoadingCache<usize, Arc<FieldBinding>>,
    constructors: LoadingCache<Vec<TypeRef>, Arc<ConstructorBinding>>,
}

impl BindingDefinition {
    /// Create an empty definition for `capability` over `target`
    pub fn new(capability: CapabilityType, target: Arc<ClassInfo>) -> Self {
        tracing::debug!(capability = %capability, target = %target.name, "created binding definition");
        Self {
            capability,
            target,
            methods: LoadingCache::new(),
            fields: LoadingCache::new(),
            constructors: LoadingCache::new(),
        }
    }

    /// The capability type
    pub fn capability(&self) -> &CapabilityType {
        &self.capability
    }

    /// The target type
    pub fn target(&self) -> &Arc<ClassInfo> {
        &self.target
    }

    /// The target type as a type reference
    pub fn target_type(&self) -> TypeRef {
        TypeRef::Class(self.target.id)
    }

    /// Resolution counts so far
    pub fn resolutions(&self) -> Resolutions {
        Resolutions {
            methods: self.methods.load_count(),
            fields: self.fields.load_count(),
            constructors: self.constructors.load_count(),
        }
    }

    pub(crate) fn site(&self, member: &str) -> CallSite {
        CallSite::new(self.capability.name())
            .member(member)
            .target(self.target.name.as_str())
    }

    fn member(&self, index: usize) -> BindResult<&Member> {
        self.capability.member_at(index).ok_or_else(|| BindError::UnclassifiedMember {
            site: CallSite::new(self.capability.name()).target(self.target.name.as_str()),
        })
    }

    fn shape(host: &dyn HostContext, args: &[TypeRef]) -> String {
        args.iter().map(|ty| host.type_name(ty)).collect::<Vec<_>>().join(", ")
    }

    fn check_scope(&self, member: &Member, real_name: &str, real_is_static: bool) -> BindResult<()> {
        if member.is_static() == real_is_static {
            return Ok(());
        }
        let reason = if member.is_static() {
            format!(
                "{} is static-scope but {}.{} is an instance member",
                member.name(),
                self.target.name,
                real_name
            )
        } else {
            format!(
                "{} is an instance member but {}.{} is static",
                member.name(),
                self.target.name,
                real_name
            )
        };
        Err(BindError::Scope {
            site: self.site(member.name()),
            reason,
        })
    }

    /// Method binding for the member at `index` called with `args`
    pub fn method(
        &self,
        host: &dyn HostContext,
        resolvers: &ResolverChain,
        index: usize,
        args: &[TypeRef],
    ) -> BindResult<Arc<MethodBinding>> {
        let member = self.member(index)?;
        self.methods
            .get_or_load((index, args.to_vec()), || self.resolve_method(host, resolvers, member, args))
    }

    fn resolve_method(
        &self,
        host: &dyn HostContext,
        resolvers: &ResolverChain,
        member: &Member,
        args: &[TypeRef],
    ) -> BindResult<Arc<MethodBinding>> {
        let real_name = resolvers
            .lookup_method(member, &self.capability, &self.target)?
            .unwrap_or_else(|| member.name().to_string());

        let found = matcher::find_method(host, self.target.id, &real_name, args).at(|| self.site(member.name()))?;
        let Some(found) = found else {
            return Err(BindError::MemberNotFound {
                site: self.site(member.name()),
                kind: "method",
                name: real_name,
                shape: Self::shape(host, args),
            });
        };
        self.check_scope(member, &real_name, found.info.modifiers.is_static)?;

        tracing::debug!(
            capability = %self.capability,
            member = member.name(),
            real = %real_name,
            cost = found.cost,
            "resolved method binding"
        );
        Ok(Arc::new(MethodBinding {
            method: found.method,
            info: found.info,
            cost: found.cost,
        }))
    }

    /// Field binding for the accessor at `index`
    pub fn field(&self, host: &dyn HostContext, resolvers: &ResolverChain, index: usize) -> BindResult<Arc<FieldBinding>> {
        let member = self.member(index)?;
        self.fields
            .get_or_load(index, || self.resolve_field(host, resolvers, member))
    }

    fn resolve_field(
        &self,
        host: &dyn HostContext,
        resolvers: &ResolverChain,
        member: &Member,
    ) -> BindResult<Arc<FieldBinding>> {
        let real_name = resolvers
            .lookup_field(member, &self.capability, &self.target)?
            .unwrap_or_else(|| member.name().to_string());

        let found = matcher::find_field(host, self.target.id, &real_name).at(|| self.site(member.name()))?;
        let Some(found) = found else {
            return Err(BindError::MemberNotFound {
                site: self.site(member.name()),
                kind: "field",
                name: real_name,
                shape: String::new(),
            });
        };
        self.check_scope(member, &real_name, found.info.modifiers.is_static)?;

        tracing::debug!(
            capability = %self.capability,
            member = member.name(),
            real = %real_name,
            "resolved field binding"
        );
        Ok(Arc::new(FieldBinding {
            field: found.field,
            info: found.info,
        }))
    }

    /// Constructor binding for `args`
    pub fn constructor(&self, host: &dyn HostContext, args: &[TypeRef]) -> BindResult<Arc<ConstructorBinding>> {
        self.constructors
            .get_or_load(args.to_vec(), || self.resolve_constructor(host, args))
    }

    fn resolve_constructor(&self, host: &dyn HostContext, args: &[TypeRef]) -> BindResult<Arc<ConstructorBinding>> {
        let site = || CallSite::new(self.capability.name()).target(self.target.name.as_str());
        let found = matcher::find_constructor(host, self.target.id, args).at(site)?;
        let Some(found) = found else {
            return Err(BindError::MemberNotFound {
                site: site(),
                kind: "constructor",
                name: self.target.name.clone(),
                shape: Self::shape(host, args),
            });
        };

        tracing::debug!(
            capability = %self.capability,
            target = %self.target.name,
            cost = found.cost,
            "resolved constructor binding"
        );
        Ok(Arc::new(ConstructorBinding {
            constructor: found.constructor,
            info: found.info,
            cost: found.cost,
        }))
    }
}

impl fmt::Debug for BindingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingDefinition")
            .field("capability", &self.capability.name())
            .field("target", &self.target.name)
            .field("methods", &self.methods.len())
            .field("fields", &self.fields.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
