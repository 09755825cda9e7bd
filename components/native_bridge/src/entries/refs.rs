//! Reference management: global, weak-global and local handles, local
//! frames and identity comparison.

use std::sync::Arc;

use core_types::abi::{status, FALSE};
use core_types::{ContractViolation, RefKind};

use super::{handle, jbool};
use crate::context::{JniEnv, NativeContext};
use crate::guard::{guard, EntryError};
use crate::sys::{jboolean, jint, jobject, jobjectRefType, jweak};

fn delete_global_kind(ctx: &NativeContext, raw: jobject, kind: RefKind, expected: &'static str) -> Result<(), EntryError> {
    let handle = handle(raw);
    if handle.is_null() {
        return Ok(());
    }
    if handle.tag_kind() != kind {
        return Err(ContractViolation::InvalidHandle {
            handle: handle.raw(),
            expected,
        }
        .into());
    }
    Ok(ctx.shared().globals().delete(handle)?)
}

/// `NewGlobalRef`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn new_global_ref(env: *mut JniEnv, obj: jobject) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "NewGlobalRef", std::ptr::null_mut(), |ctx| {
            let handle = ctx.shared().globals().create_global(ctx.object(obj))?;
            Ok(handle.raw() as jobject)
        })
    }
}

/// `DeleteGlobalRef`: deleting anything but a live global handle is fatal.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn delete_global_ref(env: *mut JniEnv, obj: jobject) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "DeleteGlobalRef", (), |ctx| {
            delete_global_kind(ctx, obj, RefKind::Global, "global")
        })
    }
}

/// `NewWeakGlobalRef`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn new_weak_global_ref(env: *mut JniEnv, obj: jobject) -> jweak {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "NewWeakGlobalRef", std::ptr::null_mut(), |ctx| {
            let handle = ctx.shared().globals().create_weak(ctx.object(obj))?;
            Ok(handle.raw() as jweak)
        })
    }
}

/// `DeleteWeakGlobalRef`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn delete_weak_global_ref(env: *mut JniEnv, obj: jweak) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "DeleteWeakGlobalRef", (), |ctx| {
            delete_global_kind(ctx, obj, RefKind::WeakGlobal, "weak global")
        })
    }
}

/// `NewLocalRef`: an expired weak handle yields null.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn new_local_ref(env: *mut JniEnv, obj: jobject) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "NewLocalRef", std::ptr::null_mut(), |ctx| ctx.local(ctx.object(obj))) }
}

/// `DeleteLocalRef`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn delete_local_ref(env: *mut JniEnv, obj: jobject) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "DeleteLocalRef", (), |ctx| {
            let handle = handle(obj);
            if handle.is_null() || ctx.delete_local(handle) {
                return Ok(());
            }
            Err(ContractViolation::InvalidHandle {
                handle: handle.raw(),
                expected: "local",
            }
            .into())
        })
    }
}

/// `PushLocalFrame`: returns 0, or a negative status with
/// `OutOfMemoryError` pending.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn push_local_frame(env: *mut JniEnv, capacity: jint) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "PushLocalFrame", status::ERR, |ctx| {
            ctx.push_frame(super::capacity(capacity)?)?;
            Ok(status::OK)
        })
    }
}

/// `PopLocalFrame`: releases the innermost frame and returns `result` as a
/// local of the enclosing one.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn pop_local_frame(env: *mut JniEnv, result: jobject) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "PopLocalFrame", std::ptr::null_mut(), |ctx| {
            let result = ctx.object(result);
            Ok(ctx.pop_frame(result)?.raw() as jobject)
        })
    }
}

/// `EnsureLocalCapacity`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn ensure_local_capacity(env: *mut JniEnv, capacity: jint) -> jint {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "EnsureLocalCapacity", status::ERR, |ctx| {
            ctx.ensure_capacity(super::capacity(capacity)?)?;
            Ok(status::OK)
        })
    }
}

/// `IsSameObject`: two nulls (or expired weak handles) are the same.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn is_same_object(env: *mut JniEnv, a: jobject, b: jobject) -> jboolean {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "IsSameObject", FALSE, |ctx| {
            let same = match (ctx.object(a), ctx.object(b)) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
                _ => false,
            };
            Ok(jbool(same))
        })
    }
}

/// `GetObjectRefType`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_object_ref_type(env: *mut JniEnv, obj: jobject) -> jobjectRefType {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetObjectRefType", jobjectRefType::JNIInvalidRefType, |ctx| {
            Ok(ctx.ref_kind(handle(obj)).into())
        })
    }
}
