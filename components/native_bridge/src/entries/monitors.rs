//! Intrinsic locks.
//!
//! Every guest object carries a reentrant monitor; native code enters and
//! exits it directly.

use core_types::abi::status;
use core_types::{ErrorKind, GuestError};

use crate::context::JniEnv;
use crate::guard::guard;
use crate::sys::{jint, jobject};

/// `MonitorEnter`: blocks until the calling thread owns the monitor of `obj`.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn monitor_enter(env: *mut JniEnv, obj: jobject) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "MonitorEnter", status::ERR, |ctx| {
            ctx.require(obj, "object")?.monitor().enter();
            Ok(status::OK)
        })
    }
}

/// `MonitorExit`: releases one level of ownership.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn monitor_exit(env: *mut JniEnv, obj: jobject) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "MonitorExit", status::ERR, |ctx| {
            let object = ctx.require(obj, "object")?;
            object.monitor().exit().map_err(|_| {
                GuestError::new(
                    ErrorKind::IllegalMonitorState,
                    format!("current thread does not own the monitor of {}", object.class().dotted_name()),
                )
            })?;
            Ok(status::OK)
        })
    }
}
