//! Field identifiers and typed field access.
//!
//! Reads pass the stored value through the conversion policy into the
//! entry's type; writes bring the native value into the field's declared
//! kind. Static access initializes the declaring class first.

use std::os::raw::c_char;
use std::sync::Arc;

use core_types::{ErrorKind, GuestError, Kind};
use object_model::{Class, Field, Object, Value};

use crate::context::{JniEnv, NativeContext};
use crate::conversion::NullPolicy;
use crate::guard::{guard, EntryError};
use crate::marshal::{AbiReturn, AbiValue};
use crate::sys::{jboolean, jbyte, jchar, jclass, jdouble, jfieldID, jfloat, jint, jlong, jobject, jshort};

unsafe fn field_id(env: *mut JniEnv, entry: &'static str, clazz: jclass, name: *const c_char, sig: *const c_char, is_static: bool) -> jfieldID {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, std::ptr::null_mut(), |ctx| {
            let class = ctx.class(clazz)?;
            ctx.runtime().initialize_class(&class)?;
            let name = ctx.text(name, "field name")?;
            let sig = ctx.text(sig, "field signature")?;
            let field = ctx.runtime().resolve_field(&class, &name, &sig, is_static)?;
            Ok(ctx.field_id(&field))
        })
    }
}

/// `GetFieldID`
///
/// # Safety
///
/// `env` must be the calling thread's environment; `name` and `sig` must be
/// NUL-terminated.
pub unsafe extern "system" fn get_field_id(env: *mut JniEnv, clazz: jclass, name: *const c_char, sig: *const c_char) -> jfieldID {
    // SAFETY: forwarded from the caller
    unsafe { field_id(env, "GetFieldID", clazz, name, sig, false) }
}

/// `GetStaticFieldID`
///
/// # Safety
///
/// `env` must be the calling thread's environment; `name` and `sig` must be
/// NUL-terminated.
pub unsafe extern "system" fn get_static_field_id(
    env: *mut JniEnv,
    clazz: jclass,
    name: *const c_char,
    sig: *const c_char,
) -> jfieldID {
    // SAFETY: forwarded from the caller
    unsafe { field_id(env, "GetStaticFieldID", clazz, name, sig, true) }
}

fn missing(owner: &str, field: &Field) -> EntryError {
    GuestError::new(ErrorKind::NoSuchField, format!("{owner} has no field {}", field.name())).into()
}

/// The instance field `id` names, checked against the receiver's class.
fn instance_field(ctx: &NativeContext, object: &Object, id: jfieldID) -> Result<Arc<Field>, EntryError> {
    let field = ctx.field(id)?;
    if field.is_static() {
        return Err(GuestError::new(ErrorKind::IllegalArgument, format!("{field:?} is static")).into());
    }
    if let Some(declaring) = field.declaring_class() {
        if !object.is_instance_of(&declaring) {
            return Err(GuestError::new(
                ErrorKind::IllegalArgument,
                format!(
                    "{} is not an instance of {}, which declares {}",
                    object.class().dotted_name(),
                    declaring.dotted_name(),
                    field.name()
                ),
            )
            .into());
        }
    }
    Ok(field)
}

/// The field and its initialized declaring class.
fn static_field(ctx: &NativeContext, clazz: jclass, id: jfieldID) -> Result<(Arc<Class>, Arc<Field>), EntryError> {
    let class = ctx.class(clazz)?;
    let field = ctx.field(id)?;
    if !field.is_static() {
        return Err(GuestError::new(ErrorKind::IllegalArgument, format!("{field:?} is not static")).into());
    }
    let declaring = field.declaring_class().unwrap_or(class);
    ctx.runtime().initialize_class(&declaring)?;
    Ok((declaring, field))
}

/// Brings a native value into the field's declared kind.
fn stored(ctx: &NativeContext, field: &Field, value: Value) -> Result<Value, EntryError> {
    let policy = ctx.policy();
    Ok(match field.kind() {
        Kind::Object => Value::Object(policy.object_fallback(value)?),
        kind => policy.coerce(value, kind, NullPolicy::Reject)?,
    })
}

unsafe fn get_field<T: AbiReturn>(env: *mut JniEnv, entry: &'static str, obj: jobject, id: jfieldID) -> T {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, T::default_value(), |ctx| {
            let object = ctx.require(obj, "object")?;
            let field = instance_field(ctx, &object, id)?;
            let value = object
                .get_field(&field)
                .ok_or_else(|| missing(&object.class().dotted_name(), &field))?;
            T::from_value(ctx, value)
        })
    }
}

unsafe fn set_field<T: AbiValue>(env: *mut JniEnv, entry: &'static str, obj: jobject, id: jfieldID, value: T) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, (), |ctx| {
            let object = ctx.require(obj, "object")?;
            let field = instance_field(ctx, &object, id)?;
            let value = stored(ctx, &field, value.into_value(ctx))?;
            if !object.set_field(&field, value) {
                return Err(missing(&object.class().dotted_name(), &field));
            }
            Ok(())
        })
    }
}

unsafe fn get_static<T: AbiReturn>(env: *mut JniEnv, entry: &'static str, clazz: jclass, id: jfieldID) -> T {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, T::default_value(), |ctx| {
            let (class, field) = static_field(ctx, clazz, id)?;
            let value = class
                .get_static(&field)
                .ok_or_else(|| missing(&class.dotted_name(), &field))?;
            T::from_value(ctx, value)
        })
    }
}

unsafe fn set_static<T: AbiValue>(env: *mut JniEnv, entry: &'static str, clazz: jclass, id: jfieldID, value: T) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, (), |ctx| {
            let (class, field) = static_field(ctx, clazz, id)?;
            let value = stored(ctx, &field, value.into_value(ctx))?;
            if !class.set_static(&field, value) {
                return Err(missing(&class.dotted_name(), &field));
            }
            Ok(())
        })
    }
}

macro_rules! field_entries {
    ($($ty:ty => $get:ident $get_name:literal, $set:ident $set_name:literal,
        $get_static:ident $get_static_name:literal, $set_static:ident $set_static_name:literal;)*) => {
        $(
            #[doc = concat!("`", $get_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment.
            pub unsafe extern "system" fn $get(env: *mut JniEnv, obj: jobject, field: jfieldID) -> $ty {
                // SAFETY: forwarded from the caller
                unsafe { get_field(env, $get_name, obj, field) }
            }

            #[doc = concat!("`", $set_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment.
            pub unsafe extern "system" fn $set(env: *mut JniEnv, obj: jobject, field: jfieldID, value: $ty) {
                // SAFETY: forwarded from the caller
                unsafe { set_field(env, $set_name, obj, field, value) }
            }

            #[doc = concat!("`", $get_static_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment.
            pub unsafe extern "system" fn $get_static(env: *mut JniEnv, clazz: jclass, field: jfieldID) -> $ty {
                // SAFETY: forwarded from the caller
                unsafe { get_static(env, $get_static_name, clazz, field) }
            }

            #[doc = concat!("`", $set_static_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment.
            pub unsafe extern "system" fn $set_static(env: *mut JniEnv, clazz: jclass, field: jfieldID, value: $ty) {
                // SAFETY: forwarded from the caller
                unsafe { set_static(env, $set_static_name, clazz, field, value) }
            }
        )*

        pub(super) fn entries() -> Vec<(&'static str, usize)> {
            vec![$(
                ($get_name, $get as usize),
                ($set_name, $set as usize),
                ($get_static_name, $get_static as usize),
                ($set_static_name, $set_static as usize),
            )*]
        }
    };
}

field_entries! {
    jobject => get_object_field "GetObjectField", set_object_field "SetObjectField",
        get_static_object_field "GetStaticObjectField", set_static_object_field "SetStaticObjectField";
    jboolean => get_boolean_field "GetBooleanField", set_boolean_field "SetBooleanField",
        get_static_boolean_field "GetStaticBooleanField", set_static_boolean_field "SetStaticBooleanField";
    jbyte => get_byte_field "GetByteField", set_byte_field "SetByteField",
        get_static_byte_field "GetStaticByteField", set_static_byte_field "SetStaticByteField";
    jchar => get_char_field "GetCharField", set_char_field "SetCharField",
        get_static_char_field "GetStaticCharField", set_static_char_field "SetStaticCharField";
    jshort => get_short_field "GetShortField", set_short_field "SetShortField",
        get_static_short_field "GetStaticShortField", set_static_short_field "SetStaticShortField";
    jint => get_int_field "GetIntField", set_int_field "SetIntField",
        get_static_int_field "GetStaticIntField", set_static_int_field "SetStaticIntField";
    jlong => get_long_field "GetLongField", set_long_field "SetLongField",
        get_static_long_field "GetStaticLongField", set_static_long_field "SetStaticLongField";
    jfloat => get_float_field "GetFloatField", set_float_field "SetFloatField",
        get_static_float_field "GetStaticFloatField", set_static_float_field "SetStaticFloatField";
    jdouble => get_double_field "GetDoubleField", set_double_field "SetDoubleField",
        get_static_double_field "GetStaticDoubleField", set_static_double_field "SetStaticDoubleField";
}
