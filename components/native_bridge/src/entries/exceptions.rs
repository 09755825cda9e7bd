//! The pending-exception slot as native code sees it.

use std::os::raw::c_char;

use core_types::abi::{status, FALSE};
use core_types::{ContractViolation, ErrorKind, GuestError};
use object_model::vm::THROWABLE;

use super::jbool;
use crate::context::JniEnv;
use crate::guard::guard;
use crate::sys::{jboolean, jclass, jint, jthrowable};

/// `Throw`: makes `obj` the pending exception.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn throw(env: *mut JniEnv, obj: jthrowable) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "Throw", status::ERR, |ctx| {
            let throwable = ctx.require(obj, "throwable")?;
            let base = ctx.runtime().find_class(THROWABLE)?;
            if !throwable.is_instance_of(&base) {
                return Err(GuestError::new(
                    ErrorKind::IllegalArgument,
                    format!("{} is not throwable", throwable.class().dotted_name()),
                )
                .into());
            }
            ctx.pending().set(throwable);
            Ok(status::OK)
        })
    }
}

/// `ThrowNew`: constructs a throwable of `clazz` with `message` and makes it
/// the pending exception.
///
/// # Safety
///
/// `env` must be the calling thread's environment; a non-null `message`
/// must be NUL-terminated.
pub unsafe extern "system" fn throw_new(env: *mut JniEnv, clazz: jclass, message: *const c_char) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "ThrowNew", status::ERR, |ctx| {
            let class = ctx.class(clazz)?;
            let message = if message.is_null() {
                None
            } else {
                Some(ctx.text(message, "message")?)
            };
            let throwable = ctx.runtime().new_throwable(&class, message.as_deref())?;
            ctx.pending().set(throwable);
            Ok(status::OK)
        })
    }
}

/// `ExceptionOccurred`: a new local handle to the pending exception, or null.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn exception_occurred(env: *mut JniEnv) -> jthrowable {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "ExceptionOccurred", std::ptr::null_mut(), |ctx| ctx.local(ctx.pending().get())) }
}

/// `ExceptionDescribe`: runs the pending exception's `printStackTrace`.
///
/// The exception is still pending afterwards, whatever the guest call did
/// to the slot in between.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn exception_describe(env: *mut JniEnv) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "ExceptionDescribe", (), |ctx| {
            let Some(throwable) = ctx.pending().get() else {
                return Ok(());
            };
            let runtime = ctx.runtime();
            let class = throwable.class();
            let printed = ctx.pending().preserve(|| {
                runtime
                    .resolve_method(class, "printStackTrace", "()V", false)
                    .and_then(|method| runtime.vtable_lookup(class, &method))
                    .and_then(|method| runtime.invoke(&method, Some(&throwable), &[]))
            });
            if let Err(thrown) = printed {
                log::debug!("ExceptionDescribe: printStackTrace threw {}", thrown.class_name());
            }
            Ok(())
        })
    }
}

/// `ExceptionClear`: clearing an empty slot does nothing.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn exception_clear(env: *mut JniEnv) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "ExceptionClear", (), |ctx| {
            ctx.pending().clear();
            Ok(())
        })
    }
}

/// `ExceptionCheck`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn exception_check(env: *mut JniEnv) -> jboolean {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "ExceptionCheck", FALSE, |ctx| Ok(jbool(ctx.pending().is_pending()))) }
}

/// `FatalError`: logs `message` and aborts the process.
///
/// # Safety
///
/// `env` must be the calling thread's environment; a non-null `message`
/// must be NUL-terminated.
pub unsafe extern "system" fn fatal_error(env: *mut JniEnv, message: *const c_char) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "FatalError", (), |ctx| {
            let message = ctx.text(message, "message").unwrap_or_default();
            Err(ContractViolation::Requested(message).into())
        })
    }
}
