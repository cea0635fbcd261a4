//! Capability types
//!
//! A capability type describes the members a caller wants to reach on some
//! target type, and how to find that target type. It carries no
//! implementation: a [`Registry`](crate::Registry) resolves each member
//! against the real type and a [`LiveBinding`](crate::LiveBinding)
//! dispatches calls.
//!
//! ```ignore
//! static POINT: Lazy<CapabilityType> = Lazy::new(|| {
//!     CapabilityType::builder("Point")
//!         .target_named("geo.Point")
//!         .member(Member::field("getX").returns(Primitive::Int))
//!         .member(Member::field("setX").param(Primitive::Int))
//!         .member(Member::method("translate").param(Primitive::Int).param(Primitive::Int))
//!         .build()
//!         .expect("valid capability")
//! });
//! ```

mod member;
mod shape;

pub use member::{DefaultBody, Member, MemberKind, NameMarker};
pub use shape::{CapabilityRef, Shape};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use umbra_sdk::ClassId;

use crate::error::{BindError, BindResult};
use crate::strategy::{ClassFunction, Provide, Provider};

/// Member names answered by every binding without consulting the
/// capability's own members
pub const RESERVED_MEMBER_NAMES: [&str; 5] = ["target", "capability", "toString", "equals", "hashCode"];

static NEXT_CAPABILITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a capability type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(u64);

impl CapabilityId {
    fn next() -> Self {
        CapabilityId(NEXT_CAPABILITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// How the target type of a capability is named
#[derive(Debug, Clone)]
pub enum TargetMarker {
    /// Constant class
    Class(ClassId),
    /// Fully qualified class name, looked up through the host
    Named(String),
    /// Class computed on demand
    Computed(Provider<dyn ClassFunction>),
}

struct CapabilityInner {
    id: CapabilityId,
    name: String,
    target: Option<TargetMarker>,
    members: Vec<Member>,
    index: FxHashMap<String, usize>,
}

/// A described capability; cheap to clone, compared by identity
#[derive(Clone)]
pub struct CapabilityType(Arc<CapabilityInner>);

impl CapabilityType {
    /// Start describing a capability type
    pub fn builder(name: impl Into<String>) -> CapabilityBuilder {
        CapabilityBuilder {
            name: name.into(),
            target: None,
            members: Vec::new(),
        }
    }

    /// Identity of this capability type
    pub fn id(&self) -> CapabilityId {
        self.0.id
    }

    /// Descriptive name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Target marker, if one was declared
    pub fn target_marker(&self) -> Option<&TargetMarker> {
        self.0.target.as_ref()
    }

    /// All members in declaration order
    pub fn members(&self) -> &[Member] {
        &self.0.members
    }

    /// Look up a member by name, with its index
    pub fn member(&self, name: &str) -> Option<(usize, &Member)> {
        let index = *self.0.index.get(name)?;
        Some((index, &self.0.members[index]))
    }

    /// Member at `index`
    pub fn member_at(&self, index: usize) -> Option<&Member> {
        self.0.members.get(index)
    }
}

impl PartialEq for CapabilityType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for CapabilityType {}

impl Hash for CapabilityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityType")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("target", &self.0.target)
            .field("members", &self.0.members.len())
            .finish()
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Builder for [`CapabilityType`]
pub struct CapabilityBuilder {
    name: String,
    target: Option<TargetMarker>,
    members: Vec<Member>,
}

impl CapabilityBuilder {
    /// Target a constant class
    pub fn target_class(mut self, class: ClassId) -> Self {
        self.target = Some(TargetMarker::Class(class));
        self
    }

    /// Target the class with the given fully qualified name
    pub fn target_named(mut self, name: impl Into<String>) -> Self {
        self.target = Some(TargetMarker::Named(name.into()));
        self
    }

    /// Target a class computed by a function discovered from `P`
    pub fn target_computed<P: Provide<dyn ClassFunction>>(mut self) -> Self {
        self.target = Some(TargetMarker::Computed(Provider::<dyn ClassFunction>::discover::<P>()));
        self
    }

    /// Target a class computed by the given function
    pub fn target_computed_with(mut self, function: Arc<dyn ClassFunction>) -> Self {
        self.target = Some(TargetMarker::Computed(Provider::<dyn ClassFunction>::instance(function)));
        self
    }

    /// Add a member
    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Validate and build
    pub fn build(self) -> BindResult<CapabilityType> {
        let invalid = |reason: String| BindError::InvalidCapability {
            capability: self.name.clone(),
            reason,
        };

        let mut index = FxHashMap::default();
        for (i, member) in self.members.iter().enumerate() {
            if RESERVED_MEMBER_NAMES.contains(&member.name()) {
                return Err(invalid(format!("member name '{}' is reserved", member.name())));
            }
            if index.insert(member.name().to_string(), i).is_some() {
                return Err(invalid(format!("duplicate member '{}'", member.name())));
            }
        }

        let capability = CapabilityType(Arc::new(CapabilityInner {
            id: CapabilityId::next(),
            name: self.name,
            target: self.target,
            members: self.members,
            index,
        }));
        tracing::trace!(capability = %capability.name(), id = capability.id().as_u64(), "built capability type");
        Ok(capability)
    }
}
