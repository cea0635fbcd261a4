//! Umbra SDK - the host boundary of the binding layer
//!
//! This crate provides the minimal types and traits a host needs to expose
//! its objects to `umbra-engine` without depending on it:
//!
//! - [`Value`] / [`ObjectRef`]: the host value model
//! - [`ClassInfo`] and friends: reflection records for classes and members
//! - [`HostContext`]: the member access primitives (read/write a field,
//!   invoke a method, run a constructor, allocate an array)
//!
//! # Example
//!
//! ```ignore
//! use umbra_sdk::{HostContext, TypeRef, Value};
//!
//! fn describe(host: &dyn HostContext, value: &Value) -> String {
//!     match host.type_of_value(value) {
//!         Ok(Some(ty)) => host.type_name(&ty),
//!         Ok(None) => "null".to_string(),
//!         Err(e) => e.to_string(),
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod types;
pub mod value;

pub use context::HostContext;
pub use error::{HostError, HostResult};
pub use types::{
    ClassId, ClassInfo, ClassKind, ConstructorInfo, ConstructorRef, FieldInfo, FieldRef,
    MethodInfo, MethodRef, Modifiers, TypeRef, Visibility,
};
pub use value::{ObjectRef, Primitive, Value};
