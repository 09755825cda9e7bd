//! Core types shared by every component of the native bridge.
//!
//! This crate provides the vocabulary the other components speak:
//!
//! - [`Kind`] - the nine guest value kinds plus `Void`
//! - [`TypeDescriptor`] / [`MethodDescriptor`] - parsed type descriptors
//! - [`abi`] - stable ABI codes: reference kinds, status codes, versions
//! - [`ErrorKind`] / [`GuestError`] - recoverable guest-level errors
//! - [`ContractViolation`] / [`fatal`] - implementation-fatal ABI misuse
//! - [`mutf8`] - the modified UTF-8 codec used for native-side text
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, GuestError, Kind, MethodDescriptor};
//!
//! let desc = MethodDescriptor::parse("(II)I").unwrap();
//! assert_eq!(desc.param_kinds(), vec![Kind::Int, Kind::Int]);
//!
//! let error = GuestError::new(ErrorKind::NoSuchMethod, "add(II)I");
//! assert_eq!(error.kind, ErrorKind::NoSuchMethod);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod abi;
mod descriptor;
mod error;
mod kind;
pub mod mutf8;

pub use abi::RefKind;
pub use descriptor::{DescriptorError, MethodDescriptor, TypeDescriptor};
pub use error::{fatal, ContractViolation, ErrorKind, GuestError};
pub use kind::Kind;
