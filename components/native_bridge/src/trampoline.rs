//! Calls into native method implementations.
//!
//! A native method is called through a libffi call interface built from its
//! binding's ABI signature. Call interfaces are built once per ABI string on
//! each thread. Every call runs in its own local frame: the receiver (or the
//! class object, for static methods) and the reference arguments become
//! locals of that frame, and an object result is resolved before the frame is
//! popped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;

use core_types::Kind;
use libffi::middle::{Arg, Cif, CodePtr, Type};
use memory_manager::{Handle, MIN_LOCAL_CAPACITY};
use object_model::{ObjectRef, Value};

use crate::binder::NativeBinding;
use crate::context::{JniEnv, NativeContext};
use crate::conversion::NullPolicy;
use crate::guard::EntryError;
use crate::signature::Signature;

thread_local! {
    static CALL_INTERFACES: RefCell<HashMap<String, Cif>> = RefCell::new(HashMap::new());
}

fn ffi_type(kind: Kind) -> Type {
    match kind {
        Kind::Boolean => Type::u8(),
        Kind::Byte => Type::i8(),
        Kind::Char => Type::u16(),
        Kind::Short => Type::i16(),
        Kind::Int => Type::i32(),
        Kind::Float => Type::f32(),
        Kind::Long => Type::i64(),
        Kind::Double => Type::f64(),
        Kind::Object => Type::pointer(),
        Kind::Void => Type::void(),
    }
}

/// The call interface for `abi`, built on first use on this thread.
///
/// The cache is not borrowed while the native function runs, so nested
/// native calls on the same thread are fine.
fn call_interface(signature: &Signature, abi: &str) -> Cif {
    CALL_INTERFACES.with(|cache| {
        cache
            .borrow_mut()
            .entry(abi.to_string())
            .or_insert_with(|| {
                log::debug!("building call interface {abi}");
                let params = [Kind::Object, Kind::Object]
                    .iter()
                    .chain(signature.params())
                    .map(|&k| ffi_type(k))
                    .collect::<Vec<_>>();
                Cif::new(params, ffi_type(signature.return_kind()))
            })
            .clone()
    })
}

/// One argument in its native representation.
enum NativeArg {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    I32(i32),
    F32(f32),
    I64(i64),
    F64(f64),
    Pointer(*mut c_void),
}

impl NativeArg {
    fn arg(&self) -> Arg {
        match self {
            NativeArg::U8(v) => Arg::new(v),
            NativeArg::I8(v) => Arg::new(v),
            NativeArg::U16(v) => Arg::new(v),
            NativeArg::I16(v) => Arg::new(v),
            NativeArg::I32(v) => Arg::new(v),
            NativeArg::F32(v) => Arg::new(v),
            NativeArg::I64(v) => Arg::new(v),
            NativeArg::F64(v) => Arg::new(v),
            NativeArg::Pointer(v) => Arg::new(v),
        }
    }
}

fn handle_arg(ctx: &NativeContext, object: Option<ObjectRef>) -> Result<NativeArg, EntryError> {
    Ok(NativeArg::Pointer(ctx.new_local(object)?.raw() as *mut c_void))
}

fn native_arg(ctx: &NativeContext, kind: Kind, value: &Value) -> Result<NativeArg, EntryError> {
    let value = ctx.policy().coerce(value.clone(), kind, NullPolicy::DefaultIfNull)?;
    Ok(match value {
        Value::Boolean(b) => NativeArg::U8(b as u8),
        Value::Byte(b) => NativeArg::I8(b),
        Value::Char(c) => NativeArg::U16(c),
        Value::Short(s) => NativeArg::I16(s),
        Value::Int(i) => NativeArg::I32(i),
        Value::Float(f) => NativeArg::F32(f),
        Value::Long(l) => NativeArg::I64(l),
        Value::Double(d) => NativeArg::F64(d),
        Value::Object(object) => return handle_arg(ctx, object),
        Value::Void => NativeArg::Pointer(std::ptr::null_mut()),
    })
}

/// Calls the native implementation of a binding.
///
/// `receiver` is the instance for instance methods and the class object for
/// static ones. A guest exception left pending by the native code is taken
/// from the slot and returned as [`EntryError::Thrown`].
pub(crate) fn invoke(
    ctx: &NativeContext,
    env: *mut JniEnv,
    binding: &NativeBinding,
    receiver: ObjectRef,
    args: &[Value],
) -> Result<Value, EntryError> {
    ctx.push_frame(MIN_LOCAL_CAPACITY.max(args.len() + 1))?;
    let result = invoke_in_frame(ctx, env, binding, receiver, args);
    ctx.pop_frame(None)?;
    let value = result?;
    if let Some(thrown) = ctx.pending().take() {
        log::debug!("native {binding:?} returned with {} pending", thrown.class().name());
        return Err(EntryError::Thrown(object_model::Thrown(thrown)));
    }
    Ok(value)
}

fn invoke_in_frame(
    ctx: &NativeContext,
    env: *mut JniEnv,
    binding: &NativeBinding,
    receiver: ObjectRef,
    args: &[Value],
) -> Result<Value, EntryError> {
    let signature = binding.signature();
    let mut native = Vec::with_capacity(args.len() + 2);
    native.push(NativeArg::Pointer(env as *mut c_void));
    native.push(handle_arg(ctx, Some(receiver))?);
    for (&kind, value) in signature.params().iter().zip(args) {
        native.push(native_arg(ctx, kind, value)?);
    }
    let cif = call_interface(signature, binding.abi());
    let ffi_args: Vec<Arg> = native.iter().map(NativeArg::arg).collect();
    let code = CodePtr(binding.address() as *mut c_void);
    log::trace!("calling {binding:?}");
    // SAFETY: the binding's function was registered for this exact signature,
    // and integral results narrower than a register come back widened
    let value = unsafe {
        match signature.return_kind() {
            Kind::Void => {
                cif.call::<()>(code, &ffi_args);
                Value::Void
            }
            Kind::Boolean => Value::Boolean(cif.call::<u64>(code, &ffi_args) as u8 != 0),
            Kind::Byte => Value::Byte(cif.call::<u64>(code, &ffi_args) as i8),
            Kind::Char => Value::Char(cif.call::<u64>(code, &ffi_args) as u16),
            Kind::Short => Value::Short(cif.call::<u64>(code, &ffi_args) as i16),
            Kind::Int => Value::Int(cif.call::<u64>(code, &ffi_args) as i32),
            Kind::Float => Value::Float(cif.call::<f32>(code, &ffi_args)),
            Kind::Long => Value::Long(cif.call::<i64>(code, &ffi_args)),
            Kind::Double => Value::Double(cif.call::<f64>(code, &ffi_args)),
            Kind::Object => {
                let raw = cif.call::<*mut c_void>(code, &ffi_args);
                Value::Object(ctx.resolve(Handle::from_raw(raw as usize)))
            }
        }
    };
    Ok(value)
}
