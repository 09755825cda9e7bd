//! Signature-driven marshalling.
//!
//! [`pop_args`] turns native call arguments into guest values, one typed pop
//! per declared parameter, strictly in declaration order. [`pack_return`]
//! brings a guest result into the declared return kind. The [`AbiReturn`] and
//! [`AbiValue`] traits connect guest values with the ABI types the typed
//! entry points traffic in.

use std::ffi::c_void;

use core_types::Kind;
use memory_manager::Handle;
use object_model::{ObjectRef, Value};

use crate::context::NativeContext;
use crate::conversion::{ConversionError, ConversionPolicy, NullPolicy};
use crate::guard::EntryError;
use crate::signature::Signature;
use crate::sys::{jboolean, jbyte, jchar, jdouble, jfloat, jint, jlong, jobject, jshort};
use crate::varargs::ArgCursor;

/// Pops one value per parameter of `signature`, in declaration order.
///
/// Reference arguments are popped as handles and resolved with `resolve`;
/// dead or foreign handles resolve to null.
pub fn pop_args<C, F>(cursor: &mut C, signature: &Signature, mut resolve: F) -> Vec<Value>
where
    C: ArgCursor + ?Sized,
    F: FnMut(Handle) -> Option<ObjectRef>,
{
    signature
        .params()
        .iter()
        .map(|kind| match kind {
            Kind::Boolean => Value::Boolean(cursor.pop_boolean() != 0),
            Kind::Byte => Value::Byte(cursor.pop_byte()),
            Kind::Char => Value::Char(cursor.pop_char()),
            Kind::Short => Value::Short(cursor.pop_short()),
            Kind::Int => Value::Int(cursor.pop_int()),
            Kind::Float => Value::Float(cursor.pop_float()),
            Kind::Long => Value::Long(cursor.pop_long()),
            Kind::Double => Value::Double(cursor.pop_double()),
            Kind::Object => Value::Object(resolve(cursor.pop_object())),
            Kind::Void => Value::Void,
        })
        .collect()
}

/// Brings a guest result into the declared return kind.
///
/// Void produces [`Value::Void`]. Reference returns go through the policy's
/// object fallback; primitive returns are coerced, null reading as the
/// kind's default.
pub fn pack_return(policy: &ConversionPolicy, value: Value, kind: Kind) -> Result<Value, ConversionError> {
    match kind {
        Kind::Void => Ok(Value::Void),
        Kind::Object => policy.object_fallback(value).map(Value::Object),
        primitive => policy.coerce(value, primitive, NullPolicy::DefaultIfNull),
    }
}

/// An ABI return type of the typed entry points.
pub trait AbiReturn: Sized {
    /// The guest kind this type carries.
    const KIND: Kind;

    /// The value returned when an exception is raised.
    fn default_value() -> Self;

    /// Converts a guest result, creating a local handle for references.
    fn from_value(ctx: &NativeContext, value: Value) -> Result<Self, EntryError>;
}

/// An ABI type that also travels from native code into the guest.
pub trait AbiValue: AbiReturn + Copy {
    /// Converts a native value, resolving handles for references.
    fn into_value(self, ctx: &NativeContext) -> Value;
}

macro_rules! abi_primitives {
    ($($ty:ty => $kind:ident, $variant:ident($bind:ident) => $out:expr, $into:expr;)*) => {
        $(
            impl AbiReturn for $ty {
                const KIND: Kind = Kind::$kind;

                fn default_value() -> Self {
                    <$ty>::default()
                }

                fn from_value(ctx: &NativeContext, value: Value) -> Result<Self, EntryError> {
                    match pack_return(&ctx.policy(), value, Kind::$kind)? {
                        Value::$variant($bind) => Ok($out),
                        _ => Ok(Self::default_value()),
                    }
                }
            }

            impl AbiValue for $ty {
                fn into_value(self, _ctx: &NativeContext) -> Value {
                    let convert: fn($ty) -> Value = $into;
                    convert(self)
                }
            }
        )*
    };
}

abi_primitives! {
    jboolean => Boolean, Boolean(b) => b as jboolean, |z| Value::Boolean(z != 0);
    jbyte => Byte, Byte(b) => b, Value::Byte;
    jchar => Char, Char(c) => c, Value::Char;
    jshort => Short, Short(s) => s, Value::Short;
    jint => Int, Int(i) => i, Value::Int;
    jlong => Long, Long(l) => l, Value::Long;
    jfloat => Float, Float(f) => f, Value::Float;
    jdouble => Double, Double(d) => d, Value::Double;
}

impl AbiReturn for jobject {
    const KIND: Kind = Kind::Object;

    fn default_value() -> Self {
        std::ptr::null_mut::<c_void>()
    }

    fn from_value(ctx: &NativeContext, value: Value) -> Result<Self, EntryError> {
        let object = ctx.policy().object_fallback(value)?;
        ctx.local(object)
    }
}

impl AbiValue for jobject {
    fn into_value(self, ctx: &NativeContext) -> Value {
        Value::Object(ctx.object(self))
    }
}

impl AbiReturn for () {
    const KIND: Kind = Kind::Void;

    fn default_value() -> Self {}

    fn from_value(_ctx: &NativeContext, _value: Value) -> Result<Self, EntryError> {
        Ok(())
    }
}
