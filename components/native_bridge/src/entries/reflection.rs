//! Conversions between member identifiers and reflection objects.

use std::ptr;
use std::sync::Arc;

use core_types::{ErrorKind, GuestError};
use object_model::{Class, Member, ObjectRef};

use crate::context::{JniEnv, NativeContext};
use crate::guard::{guard, EntryError};
use crate::sys::{jboolean, jclass, jfieldID, jmethodID, jobject};

fn member(ctx: &NativeContext, raw: jobject, what: &str) -> Result<(ObjectRef, Member), EntryError> {
    let object = ctx.require(raw, what)?;
    match object.member().cloned() {
        Some(member) => Ok((object, member)),
        None => Err(not_a(&object, what)),
    }
}

fn not_a(object: &ObjectRef, what: &str) -> EntryError {
    GuestError::new(
        ErrorKind::IllegalArgument,
        format!("{} is not a reflected {what}", object.class().dotted_name()),
    )
    .into()
}

/// Checks that a member declared by `declaring` is reachable from `class`
/// with the given static flag.
fn check_owner(class: &Class, declaring: Option<Arc<Class>>, member_is_static: bool, is_static: jboolean, what: &str) -> Result<(), EntryError> {
    if member_is_static != (is_static != 0) {
        return Err(GuestError::new(
            ErrorKind::IllegalArgument,
            format!("{what} static flag does not match"),
        )
        .into());
    }
    match declaring {
        Some(declaring) if class.is_subclass_of(&declaring) => Ok(()),
        _ => Err(GuestError::new(
            ErrorKind::IllegalArgument,
            format!("{what} is not a member of {}", class.dotted_name()),
        )
        .into()),
    }
}

/// `FromReflectedMethod`: the identifier of a reflected method or
/// constructor.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn from_reflected_method(env: *mut JniEnv, method: jobject) -> jmethodID {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "FromReflectedMethod", ptr::null_mut(), |ctx| match member(ctx, method, "method")? {
            (_, Member::Method(method)) => Ok(ctx.method_id(&method)),
            (object, Member::Field(_)) => Err(not_a(&object, "method")),
        })
    }
}

/// `FromReflectedField`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn from_reflected_field(env: *mut JniEnv, field: jobject) -> jfieldID {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "FromReflectedField", ptr::null_mut(), |ctx| match member(ctx, field, "field")? {
            (_, Member::Field(field)) => Ok(ctx.field_id(&field)),
            (object, Member::Method(_)) => Err(not_a(&object, "field")),
        })
    }
}

/// `ToReflectedMethod`: a reflection object for a method of `cls`.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn to_reflected_method(env: *mut JniEnv, cls: jclass, method: jmethodID, is_static: jboolean) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "ToReflectedMethod", ptr::null_mut(), |ctx| {
            let class = ctx.class(cls)?;
            let method = ctx.method(method)?;
            check_owner(&class, method.declaring_class(), method.is_static(), is_static, &format!("{method:?}"))?;
            let reflected = ctx.runtime().reflect_method(&method)?;
            ctx.local(Some(reflected))
        })
    }
}

/// `ToReflectedField`: a reflection object for a field of `cls`.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn to_reflected_field(env: *mut JniEnv, cls: jclass, field: jfieldID, is_static: jboolean) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "ToReflectedField", ptr::null_mut(), |ctx| {
            let class = ctx.class(cls)?;
            let field = ctx.field(field)?;
            check_owner(&class, field.declaring_class(), field.is_static(), is_static, &format!("{field:?}"))?;
            let reflected = ctx.runtime().reflect_field(&field)?;
            ctx.local(Some(reflected))
        })
    }
}
