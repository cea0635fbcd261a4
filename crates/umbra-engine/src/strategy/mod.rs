//! Resolution strategies
//!
//! A [`TargetResolver`] answers up to three questions about a capability:
//! its target type, the real name behind a delegated method, and the real
//! name behind a field accessor. Resolvers are asked in chain order and the
//! first present answer wins.
//!
//! Built-in chain, highest priority first (user resolvers go in front):
//!
//! | Resolver             | Class | Method | Field |
//! |----------------------|-------|--------|-------|
//! | `ConstantTarget`     | yes   |        |       |
//! | `NamedTarget`        | yes   | yes    | yes   |
//! | `ComputedTarget`     | yes   | yes    | yes   |
//! | `FuzzyAccessorNames` |       |        | yes   |

mod builtin;
mod discovery;

pub use builtin::{ClassFunction, ComputedTarget, ConstantTarget, FuzzyAccessorNames, NameFunction, NamedTarget};
pub use discovery::{discover, DiscoveryStep, Provide, Provider};

use std::sync::Arc;

use parking_lot::RwLock;
use umbra_sdk::{ClassId, ClassInfo, HostContext};

use crate::capability::{CapabilityType, Member};
use crate::error::BindResult;

/// A pluggable resolution strategy
pub trait TargetResolver: Send + Sync {
    /// Identity used to make registration idempotent
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Target type of a capability
    fn lookup_class(&self, _capability: &CapabilityType, _host: &dyn HostContext) -> BindResult<Option<ClassId>> {
        Ok(None)
    }

    /// Real method name behind a delegated member
    fn lookup_method(
        &self,
        _member: &Member,
        _capability: &CapabilityType,
        _target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        Ok(None)
    }

    /// Real field name behind a field accessor
    fn lookup_field(
        &self,
        _member: &Member,
        _capability: &CapabilityType,
        _target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        Ok(None)
    }
}

type Chain = Arc<Vec<Arc<dyn TargetResolver>>>;

/// Ordered, copy-on-write list of resolvers.
///
/// Lookups work on a snapshot, so registration never blocks a lookup that
/// is already running.
pub struct ResolverChain {
    resolvers: RwLock<Chain>,
}

impl ResolverChain {
    /// Chain with the given resolvers, highest priority first
    pub fn new(resolvers: Vec<Arc<dyn TargetResolver>>) -> Self {
        Self {
            resolvers: RwLock::new(Arc::new(resolvers)),
        }
    }

    /// The built-in chain
    pub fn builtin(fuzzy_accessor_names: bool) -> Self {
        let mut resolvers: Vec<Arc<dyn TargetResolver>> = vec![
            Arc::new(ConstantTarget),
            Arc::new(NamedTarget),
            Arc::new(ComputedTarget),
        ];
        if fuzzy_accessor_names {
            resolvers.push(Arc::new(FuzzyAccessorNames));
        }
        Self::new(resolvers)
    }

    /// Insert a resolver at the highest priority.
    ///
    /// Returns `false` and leaves the chain unchanged if a resolver with the
    /// same name is already registered.
    pub fn register(&self, resolver: Arc<dyn TargetResolver>) -> bool {
        let mut chain = self.resolvers.write();
        if chain.iter().any(|r| r.name() == resolver.name()) {
            tracing::trace!(resolver = resolver.name(), "resolver already registered");
            return false;
        }

        let mut next = Vec::with_capacity(chain.len() + 1);
        next.push(Arc::clone(&resolver));
        next.extend(chain.iter().cloned());
        *chain = Arc::new(next);
        tracing::trace!(resolver = resolver.name(), "registered resolver");
        true
    }

    fn snapshot(&self) -> Chain {
        Arc::clone(&self.resolvers.read())
    }

    /// Resolver names in chain order
    pub fn names(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(|r| r.name()).collect()
    }

    /// First target type any resolver answers
    pub fn lookup_class(&self, capability: &CapabilityType, host: &dyn HostContext) -> BindResult<Option<ClassId>> {
        for resolver in self.snapshot().iter() {
            if let Some(class) = resolver.lookup_class(capability, host)? {
                return Ok(Some(class));
            }
        }
        Ok(None)
    }

    /// First real method name any resolver answers
    pub fn lookup_method(
        &self,
        member: &Member,
        capability: &CapabilityType,
        target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        for resolver in self.snapshot().iter() {
            if let Some(name) = resolver.lookup_method(member, capability, target)? {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// First real field name any resolver answers
    pub fn lookup_field(
        &self,
        member: &Member,
        capability: &CapabilityType,
        target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        for resolver in self.snapshot().iter() {
            if let Some(name) = resolver.lookup_field(member, capability, target)? {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
