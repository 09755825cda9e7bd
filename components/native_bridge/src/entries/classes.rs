//! Class lookup, type tests and object allocation.

use std::os::raw::c_char;

use core_types::abi::FALSE;
use core_types::{ErrorKind, GuestError};

use super::{arguments, jbool};
use crate::context::JniEnv;
use crate::guard::guard;
use crate::sys::{jboolean, jclass, jmethodID, jobject, jvalue};

/// `FindClass`: looks a class up by internal name and initializes it.
///
/// # Safety
///
/// `env` must be the calling thread's environment; `name` must be
/// NUL-terminated.
pub unsafe extern "system" fn find_class(env: *mut JniEnv, name: *const c_char) -> jclass {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "FindClass", std::ptr::null_mut(), |ctx| {
            let name = ctx.text(name, "class name")?;
            let class = ctx.runtime().find_class(&name)?;
            ctx.runtime().initialize_class(&class)?;
            ctx.class_local(&class)
        })
    }
}

/// `GetSuperclass`: null for interfaces and the root class.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_superclass(env: *mut JniEnv, clazz: jclass) -> jclass {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetSuperclass", std::ptr::null_mut(), |ctx| {
            let class = ctx.class(clazz)?;
            match class.superclass() {
                Some(parent) if !class.is_interface() => ctx.class_local(parent),
                _ => Ok(std::ptr::null_mut()),
            }
        })
    }
}

/// `IsAssignableFrom`: whether a `sub` value can be stored where a `sup` is
/// expected.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn is_assignable_from(env: *mut JniEnv, sub: jclass, sup: jclass) -> jboolean {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "IsAssignableFrom", FALSE, |ctx| {
            let sub = ctx.class(sub)?;
            let sup = ctx.class(sup)?;
            Ok(jbool(sub.is_subclass_of(&sup)))
        })
    }
}

/// `GetObjectClass`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_object_class(env: *mut JniEnv, obj: jobject) -> jclass {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetObjectClass", std::ptr::null_mut(), |ctx| {
            let object = ctx.require(obj, "object")?;
            ctx.class_local(object.class())
        })
    }
}

/// `IsInstanceOf`: null is an instance of every class.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn is_instance_of(env: *mut JniEnv, obj: jobject, clazz: jclass) -> jboolean {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "IsInstanceOf", FALSE, |ctx| {
            let class = ctx.class(clazz)?;
            Ok(jbool(ctx.object(obj).map_or(true, |o| o.is_instance_of(&class))))
        })
    }
}

/// `AllocObject`: an instance with default field values; no constructor runs.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn alloc_object(env: *mut JniEnv, clazz: jclass) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "AllocObject", std::ptr::null_mut(), |ctx| {
            let class = ctx.class(clazz)?;
            let object = ctx.runtime().allocate_instance(&class)?;
            ctx.local(Some(object))
        })
    }
}

/// `NewObjectA`: allocates an instance and runs the constructor `method`.
///
/// # Safety
///
/// `env` must be the calling thread's environment; `args` must hold one
/// `jvalue` per constructor parameter.
pub unsafe extern "system" fn new_object_a(
    env: *mut JniEnv,
    clazz: jclass,
    method: jmethodID,
    args: *const jvalue,
) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "NewObjectA", std::ptr::null_mut(), |ctx| {
            let class = ctx.class(clazz)?;
            let constructor = ctx.method(method)?;
            if !constructor.is_constructor() {
                return Err(GuestError::new(
                    ErrorKind::IllegalArgument,
                    format!("{constructor:?} is not a constructor"),
                )
                .into());
            }
            let args = arguments(ctx, &constructor, args)?;
            let object = ctx.runtime().allocate_instance(&class)?;
            ctx.runtime().invoke(&constructor, Some(&object), &args)?;
            ctx.local(Some(object))
        })
    }
}
