//! Umbra Heap - a reference in-process host
//!
//! A managed object heap whose classes are defined at runtime and whose
//! methods and constructors are Rust closures. [`Heap`] implements
//! [`HostContext`](umbra_sdk::HostContext), so it can sit behind a binding
//! registry as-is; tests and benchmarks use it as their target world.
//!
//! ```ignore
//! use umbra_heap::{ClassDefinition, FieldDefinition, Heap};
//! use umbra_sdk::Primitive;
//!
//! let heap = Heap::new();
//! let point = heap.define_class(
//!     ClassDefinition::new("geo.Point")
//!         .field(FieldDefinition::new("x", Primitive::Int))
//!         .field(FieldDefinition::new("y", Primitive::Int)),
//! )?;
//! let p = heap.alloc(point)?;
//! heap.write(p, "x", 3)?;
//! ```

#![warn(missing_docs)]

mod bootstrap;
pub mod class;
pub mod heap;

pub use class::{
    ClassDefinition, ConstructorDefinition, FieldDefinition, MethodDefinition, NativeConstructor,
    NativeMethod,
};
pub use heap::Heap;
