//! Native Bridge - the native-interface layer of the guest runtime
//!
//! This component lets compiled native code and the guest runtime call each
//! other through the standard native interface:
//!
//! - [`Bridge`] - one bridge per runtime; owns globals, buffers, member ids,
//!   bindings and the function table, and attaches native threads
//! - [`NativeContext`] / [`JniEnv`] - per-thread locals and pending exception
//! - [`Signature`] / [`SignatureCache`] - parsed method descriptors and their
//!   ABI strings
//! - [`pop_args`] / [`pack_return`] - signature-driven marshalling
//! - [`ConversionPolicy`] - what happens when a value's kind differs from the
//!   kind an entry point names
//! - [`PendingException`] - the exception relay between guest and native code
//! - [`Binder`] - `RegisterNatives` bindings and lazy symbol linking
//! - [`entries`] - the implemented entry points
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use native_bridge::entries::version::get_version;
//! use native_bridge::{Bridge, BridgeConfig};
//! use object_model::{Vm, VmConfig};
//!
//! let vm = Arc::new(Vm::new(VmConfig::default()));
//! let bridge = Bridge::new(vm, BridgeConfig::default()).unwrap();
//! let env = bridge.attach_current_thread();
//! // SAFETY: env is this thread's live environment
//! let version = unsafe { get_version(env) };
//! assert_eq!(version, bridge.version());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binder;
mod bridge;
mod config;
mod context;
mod conversion;
pub mod entries;
mod exception;
mod guard;
mod marshal;
mod members;
mod signature;
pub mod sys;
pub mod table;
mod trampoline;
mod varargs;

pub use binder::{BindError, Binder, NativeBinding};
pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError, ConversionMode};
pub use context::{JniEnv, NativeContext};
pub use conversion::{ConversionError, ConversionPolicy, NullPolicy};
pub use exception::PendingException;
pub use guard::EntryError;
pub use marshal::{pack_return, pop_args, AbiReturn, AbiValue};
pub use members::MemberTable;
pub use signature::{Signature, SignatureCache};
pub use varargs::{ArgCursor, JValueCursor};
