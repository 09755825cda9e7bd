//! Guest object model and reference runtime.
//!
//! This crate is the collaborator the native bridge consumes. It provides:
//!
//! - [`Value`] - the nine-kind guest value union
//! - [`Object`] / [`ArrayData`] - heap objects, arrays and strings
//! - [`Class`] / [`Field`] / [`Method`] / [`ClassBuilder`] - guest types
//! - [`Monitor`] - the intrinsic lock every object carries
//! - [`GuestRuntime`] / [`NativeLinker`] - the seams between runtime and bridge
//! - [`Vm`] - a reference runtime implementing [`GuestRuntime`]
//!
//! # Examples
//!
//! ```
//! use object_model::{ClassBuilder, GuestRuntime, Value, Vm, VmConfig};
//!
//! let vm = Vm::new(VmConfig::default());
//! let point = vm
//!     .define_class(ClassBuilder::new("demo/Point").field("x", "I"))
//!     .unwrap();
//! let p = vm.allocate_instance(&point).unwrap();
//! let x = vm.resolve_field(&point, "x", "I", false).unwrap();
//! assert!(p.set_field(&x, Value::Int(3)));
//! assert_eq!(p.get_field(&x), Some(Value::Int(3)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod class;
mod monitor;
mod object;
mod runtime;
mod value;
pub mod vm;

pub use class::{
    Class, ClassBuilder, ClassKind, Component, DefineError, Field, GuestFn, Method, MethodBody, CONSTRUCTOR_NAME,
    INITIALIZER_NAME,
};
pub use monitor::{Monitor, NotOwner};
pub use object::{ArrayData, Member, Object, ObjectBody};
pub use runtime::{GuestResult, GuestRuntime, NativeLinker, Thrown};
pub use value::{ObjectRef, Value, WeakObjectRef};
pub use vm::{Vm, VmConfig};
