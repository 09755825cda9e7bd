//! Native method registration.

use core_types::abi::status;
use core_types::{ErrorKind, GuestError};

use super::capacity;
use crate::context::JniEnv;
use crate::guard::guard;
use crate::sys::{jclass, jint, JNINativeMethod};

/// `RegisterNatives`: binds each listed native method of `clazz` to its
/// function.
///
/// Entries are bound in order; the first failure stops registration, leaves
/// the earlier bindings in place and raises `NoSuchMethodError`.
///
/// # Safety
///
/// `env` must be the calling thread's environment; `methods` must point at
/// `count` entries whose names and signatures are NUL-terminated.
pub unsafe extern "system" fn register_natives(
    env: *mut JniEnv,
    clazz: jclass,
    methods: *const JNINativeMethod,
    count: jint,
) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "RegisterNatives", status::ERR, |ctx| {
            let class = ctx.class(clazz)?;
            let count = capacity(count)?;
            if count == 0 {
                return Ok(status::OK);
            }
            if methods.is_null() {
                return Err(GuestError::new(ErrorKind::NullPointer, "method table is null").into());
            }
            let binder = ctx.shared().binder();
            for entry in std::slice::from_raw_parts(methods, count) {
                let name = ctx.text(entry.name, "method name")?;
                let signature = ctx.text(entry.signature, "method signature")?;
                binder.register_native(&class, &name, &signature, entry.fnPtr as usize)?;
            }
            Ok(status::OK)
        })
    }
}

/// `UnregisterNatives`: drops every binding of `clazz`. The methods link
/// again on their next invocation.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn unregister_natives(env: *mut JniEnv, clazz: jclass) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "UnregisterNatives", status::ERR, |ctx| {
            let class = ctx.class(clazz)?;
            ctx.shared().binder().unregister_natives(&class);
            Ok(status::OK)
        })
    }
}
