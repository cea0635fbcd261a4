//! Umbra Engine - dynamic binding over host objects
//!
//! A caller describes the members it wants to reach on some target type as a
//! [`CapabilityType`], and a [`Registry`] turns that description into a
//! [`LiveBinding`] over a real object. Calls on the binding are resolved
//! against the target's real members on first use and dispatched through the
//! host's [`HostContext`](umbra_sdk::HostContext) primitives afterwards.
//!
//! # Architecture
//!
//! ```text
//! Registry ──► BindingDefinition ──► method / field / constructor caches
//!    │                                   ▲
//!    │                                   │ first miss
//!    ▼                                   │
//! LiveBinding ──► dispatch ──► ResolverChain + matcher
//!                    │
//!                    └──► Wrapper / Unwrapper at the call boundary
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use umbra_engine::{CapabilityType, Member, Registry};
//! use umbra_heap::Heap;
//! use umbra_sdk::Primitive;
//!
//! let heap = Arc::new(Heap::new());
//! let registry = Registry::new(heap.clone());
//!
//! let person = CapabilityType::builder("Person")
//!     .target_named("app.Person")
//!     .member(Member::field("getAge").returns(Primitive::Int))
//!     .member(Member::field("setAge").param(Primitive::Int))
//!     .build()?;
//!
//! let binding = registry.bind(&person, object)?;
//! binding.call::<_, ()>("setAge", (6,))?;
//! let age: i32 = binding.call("getAge", ())?;
//! ```

#![warn(missing_docs)]

pub mod binding;
pub mod cache;
pub mod capability;
pub mod convert;
pub mod definition;
mod dispatch;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod strategy;
pub mod wrap;

pub use binding::{BoundValue, LiveBinding};
pub use capability::{
    CapabilityBuilder, CapabilityId, CapabilityRef, CapabilityType, DefaultBody, Member, MemberKind, NameMarker,
    Shape, TargetMarker, RESERVED_MEMBER_NAMES,
};
pub use convert::{Capability, FromBound, IntoArgs, IntoBound};
pub use definition::{BindingDefinition, ConstructorBinding, FieldBinding, MethodBinding, Resolutions};
pub use error::{BindError, BindResult, CallSite};
pub use registry::{Registry, RegistryOptions};
pub use strategy::{
    discover, ClassFunction, ComputedTarget, ConstantTarget, DiscoveryStep, FuzzyAccessorNames, NameFunction,
    NamedTarget, Provide, Provider, ResolverChain, TargetResolver,
};
pub use wrap::{ForBindingArrays, ForBindings, NoWrapping, Unwrapper, WrapContext, Wrapper};
