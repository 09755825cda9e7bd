//! Version and thread queries.

use core_types::abi::FALSE;

use crate::context::JniEnv;
use crate::guard::guard;
use crate::sys::{jboolean, jint, jobject};

/// `GetVersion`: the interface version selected by the language level.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_version(env: *mut JniEnv) -> jint {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "GetVersion", 0, |ctx| Ok(ctx.shared().version())) }
}

/// `IsVirtualThread`: guest threads are always platform threads.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn is_virtual_thread(env: *mut JniEnv, _thread: jobject) -> jboolean {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "IsVirtualThread", FALSE, |_| Ok(FALSE)) }
}
