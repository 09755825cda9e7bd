//! Method identifiers and the `Call...MethodA` family.
//!
//! Calls come in three flavours: virtual calls select the implementation for
//! the receiver's class, nonvirtual calls run exactly the identified method on
//! the receiver, and static calls run it with no receiver. Every flavour exists
//! once per return type; the result passes through the conversion policy
//! before it reaches native code.

use std::os::raw::c_char;

use core_types::{ErrorKind, GuestError};
use object_model::Value;

use super::arguments;
use crate::context::{JniEnv, NativeContext};
use crate::guard::{guard, EntryError};
use crate::marshal::AbiReturn;
use crate::sys::{jboolean, jbyte, jchar, jclass, jdouble, jfloat, jint, jlong, jmethodID, jobject, jshort, jvalue};

unsafe fn method_id(env: *mut JniEnv, entry: &'static str, clazz: jclass, name: *const c_char, sig: *const c_char, is_static: bool) -> jmethodID {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, std::ptr::null_mut(), |ctx| {
            let class = ctx.class(clazz)?;
            ctx.runtime().initialize_class(&class)?;
            let name = ctx.text(name, "method name")?;
            let sig = ctx.text(sig, "method signature")?;
            let method = ctx.runtime().resolve_method(&class, &name, &sig, is_static)?;
            Ok(ctx.method_id(&method))
        })
    }
}

/// `GetMethodID`: resolves an instance method or constructor, initializing
/// the class first.
///
/// # Safety
///
/// `env` must be the calling thread's environment; `name` and `sig` must be
/// NUL-terminated.
pub unsafe extern "system" fn get_method_id(env: *mut JniEnv, clazz: jclass, name: *const c_char, sig: *const c_char) -> jmethodID {
    // SAFETY: forwarded from the caller
    unsafe { method_id(env, "GetMethodID", clazz, name, sig, false) }
}

/// `GetStaticMethodID`
///
/// # Safety
///
/// `env` must be the calling thread's environment; `name` and `sig` must be
/// NUL-terminated.
pub unsafe extern "system" fn get_static_method_id(
    env: *mut JniEnv,
    clazz: jclass,
    name: *const c_char,
    sig: *const c_char,
) -> jmethodID {
    // SAFETY: forwarded from the caller
    unsafe { method_id(env, "GetStaticMethodID", clazz, name, sig, true) }
}

/// Who receives a call.
#[derive(Clone, Copy)]
enum Target {
    Virtual(jobject),
    Nonvirtual(jobject, jclass),
    Static(jclass),
}

/// # Safety
///
/// A non-null `args` must hold one `jvalue` per parameter of the method.
unsafe fn call(ctx: &NativeContext, target: Target, method: jmethodID, args: *const jvalue) -> Result<Value, EntryError> {
    let method = ctx.method(method)?;
    let wants_static = matches!(target, Target::Static(_));
    if method.is_static() != wants_static {
        return Err(GuestError::new(
            ErrorKind::IllegalArgument,
            format!("{method:?} called as {}", if wants_static { "static" } else { "instance method" }),
        )
        .into());
    }
    // SAFETY: forwarded from the caller
    let args = unsafe { arguments(ctx, &method, args) }?;
    let runtime = ctx.runtime();
    let result = match target {
        Target::Virtual(obj) => {
            let receiver = ctx.require(obj, "receiver")?;
            let selected = runtime.vtable_lookup(receiver.class(), &method)?;
            runtime.invoke(&selected, Some(&receiver), &args)
        }
        Target::Nonvirtual(obj, clazz) => {
            let receiver = ctx.require(obj, "receiver")?;
            let class = ctx.class(clazz)?;
            if !receiver.is_instance_of(&class) {
                return Err(GuestError::new(
                    ErrorKind::IllegalArgument,
                    format!("{} is not a {}", receiver.class().dotted_name(), class.dotted_name()),
                )
                .into());
            }
            runtime.invoke(&method, Some(&receiver), &args)
        }
        Target::Static(clazz) => {
            ctx.class(clazz)?;
            runtime.invoke(&method, None, &args)
        }
    };
    Ok(result?)
}

unsafe fn call_a<R: AbiReturn>(env: *mut JniEnv, entry: &'static str, target: Target, method: jmethodID, args: *const jvalue) -> R {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, R::default_value(), |ctx| {
            let value = call(ctx, target, method, args)?;
            R::from_value(ctx, value)
        })
    }
}

macro_rules! call_entries {
    ($($ty:ty => $virt:ident $virt_name:literal, $nonvirt:ident $nonvirt_name:literal, $stat:ident $stat_name:literal;)*) => {
        $(
            #[doc = concat!("`", $virt_name, "`: calls an instance method with virtual dispatch.")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment; `args` must
            /// hold one `jvalue` per parameter.
            pub unsafe extern "system" fn $virt(env: *mut JniEnv, obj: jobject, method: jmethodID, args: *const jvalue) -> $ty {
                // SAFETY: forwarded from the caller
                unsafe { call_a(env, $virt_name, Target::Virtual(obj), method, args) }
            }

            #[doc = concat!("`", $nonvirt_name, "`: calls exactly the identified instance method.")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment; `args` must
            /// hold one `jvalue` per parameter.
            pub unsafe extern "system" fn $nonvirt(
                env: *mut JniEnv,
                obj: jobject,
                clazz: jclass,
                method: jmethodID,
                args: *const jvalue,
            ) -> $ty {
                // SAFETY: forwarded from the caller
                unsafe { call_a(env, $nonvirt_name, Target::Nonvirtual(obj, clazz), method, args) }
            }

            #[doc = concat!("`", $stat_name, "`: calls a static method.")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment; `args` must
            /// hold one `jvalue` per parameter.
            pub unsafe extern "system" fn $stat(env: *mut JniEnv, clazz: jclass, method: jmethodID, args: *const jvalue) -> $ty {
                // SAFETY: forwarded from the caller
                unsafe { call_a(env, $stat_name, Target::Static(clazz), method, args) }
            }
        )*

        pub(super) fn entries() -> Vec<(&'static str, usize)> {
            vec![$(
                ($virt_name, $virt as usize),
                ($nonvirt_name, $nonvirt as usize),
                ($stat_name, $stat as usize),
            )*]
        }
    };
}

call_entries! {
    jobject => call_object_method_a "CallObjectMethodA",
        call_nonvirtual_object_method_a "CallNonvirtualObjectMethodA",
        call_static_object_method_a "CallStaticObjectMethodA";
    jboolean => call_boolean_method_a "CallBooleanMethodA",
        call_nonvirtual_boolean_method_a "CallNonvirtualBooleanMethodA",
        call_static_boolean_method_a "CallStaticBooleanMethodA";
    jbyte => call_byte_method_a "CallByteMethodA",
        call_nonvirtual_byte_method_a "CallNonvirtualByteMethodA",
        call_static_byte_method_a "CallStaticByteMethodA";
    jchar => call_char_method_a "CallCharMethodA",
        call_nonvirtual_char_method_a "CallNonvirtualCharMethodA",
        call_static_char_method_a "CallStaticCharMethodA";
    jshort => call_short_method_a "CallShortMethodA",
        call_nonvirtual_short_method_a "CallNonvirtualShortMethodA",
        call_static_short_method_a "CallStaticShortMethodA";
    jint => call_int_method_a "CallIntMethodA",
        call_nonvirtual_int_method_a "CallNonvirtualIntMethodA",
        call_static_int_method_a "CallStaticIntMethodA";
    jlong => call_long_method_a "CallLongMethodA",
        call_nonvirtual_long_method_a "CallNonvirtualLongMethodA",
        call_static_long_method_a "CallStaticLongMethodA";
    jfloat => call_float_method_a "CallFloatMethodA",
        call_nonvirtual_float_method_a "CallNonvirtualFloatMethodA",
        call_static_float_method_a "CallStaticFloatMethodA";
    jdouble => call_double_method_a "CallDoubleMethodA",
        call_nonvirtual_double_method_a "CallNonvirtualDoubleMethodA",
        call_static_double_method_a "CallStaticDoubleMethodA";
    () => call_void_method_a "CallVoidMethodA",
        call_nonvirtual_void_method_a "CallNonvirtualVoidMethodA",
        call_static_void_method_a "CallStaticVoidMethodA";
}
