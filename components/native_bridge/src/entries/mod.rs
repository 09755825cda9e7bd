//! Implemented entry points.
//!
//! Every function here is an `extern "system"` function native code reaches
//! through the function table. Each one runs its body under
//! [`guard`](crate::guard::guard): a guest error leaves an exception pending
//! and the function returns its type's default value.
//!
//! Entry points are grouped the way the interface documents them:
//!
//! - [`version`] - interface version and thread queries
//! - [`refs`] - handles and local frames
//! - [`exceptions`] - the pending-exception slot
//! - [`classes`] - class lookup, type tests and allocation
//! - [`methods`] - method identifiers and calls
//! - [`fields`] - field identifiers and field access
//! - [`strings`] - string creation and text access
//! - [`arrays`] - array creation and element access
//! - [`natives`] - native method registration
//! - [`monitors`] - intrinsic locks
//! - [`reflection`] - conversions to and from reflection objects

pub mod arrays;
pub mod classes;
pub mod exceptions;
pub mod fields;
pub mod methods;
pub mod monitors;
pub mod natives;
pub mod reflection;
pub mod refs;
pub mod strings;
pub mod version;

use core_types::abi::{FALSE, TRUE};
use core_types::{ErrorKind, GuestError};
use memory_manager::Handle;
use object_model::{Method, Value};

use crate::binder::BindError;
use crate::context::NativeContext;
use crate::guard::EntryError;
use crate::marshal::pop_args;
use crate::sys::{jboolean, jint, jobject, jvalue};
use crate::varargs::JValueCursor;

/// Every implemented entry point with its standard name.
pub(crate) fn implemented() -> Vec<(&'static str, usize)> {
    let mut entries = vec![
        ("GetVersion", version::get_version as usize),
        ("IsVirtualThread", version::is_virtual_thread as usize),
        ("NewGlobalRef", refs::new_global_ref as usize),
        ("DeleteGlobalRef", refs::delete_global_ref as usize),
        ("NewWeakGlobalRef", refs::new_weak_global_ref as usize),
        ("DeleteWeakGlobalRef", refs::delete_weak_global_ref as usize),
        ("NewLocalRef", refs::new_local_ref as usize),
        ("DeleteLocalRef", refs::delete_local_ref as usize),
        ("PushLocalFrame", refs::push_local_frame as usize),
        ("PopLocalFrame", refs::pop_local_frame as usize),
        ("EnsureLocalCapacity", refs::ensure_local_capacity as usize),
        ("IsSameObject", refs::is_same_object as usize),
        ("GetObjectRefType", refs::get_object_ref_type as usize),
        ("Throw", exceptions::throw as usize),
        ("ThrowNew", exceptions::throw_new as usize),
        ("ExceptionOccurred", exceptions::exception_occurred as usize),
        ("ExceptionDescribe", exceptions::exception_describe as usize),
        ("ExceptionClear", exceptions::exception_clear as usize),
        ("ExceptionCheck", exceptions::exception_check as usize),
        ("FatalError", exceptions::fatal_error as usize),
        ("FindClass", classes::find_class as usize),
        ("GetSuperclass", classes::get_superclass as usize),
        ("IsAssignableFrom", classes::is_assignable_from as usize),
        ("GetObjectClass", classes::get_object_class as usize),
        ("IsInstanceOf", classes::is_instance_of as usize),
        ("AllocObject", classes::alloc_object as usize),
        ("NewObjectA", classes::new_object_a as usize),
        ("GetMethodID", methods::get_method_id as usize),
        ("GetStaticMethodID", methods::get_static_method_id as usize),
        ("GetFieldID", fields::get_field_id as usize),
        ("GetStaticFieldID", fields::get_static_field_id as usize),
        ("NewString", strings::new_string as usize),
        ("GetStringLength", strings::get_string_length as usize),
        ("GetStringChars", strings::get_string_chars as usize),
        ("ReleaseStringChars", strings::release_string_chars as usize),
        ("NewStringUTF", strings::new_string_utf as usize),
        ("GetStringUTFLength", strings::get_string_utf_length as usize),
        ("GetStringUTFLengthAsLong", strings::get_string_utf_length_as_long as usize),
        ("GetStringUTFChars", strings::get_string_utf_chars as usize),
        ("ReleaseStringUTFChars", strings::release_string_utf_chars as usize),
        ("GetStringRegion", strings::get_string_region as usize),
        ("GetStringUTFRegion", strings::get_string_utf_region as usize),
        ("GetStringCritical", strings::get_string_critical as usize),
        ("ReleaseStringCritical", strings::release_string_critical as usize),
        ("GetArrayLength", arrays::get_array_length as usize),
        ("NewObjectArray", arrays::new_object_array as usize),
        ("GetObjectArrayElement", arrays::get_object_array_element as usize),
        ("SetObjectArrayElement", arrays::set_object_array_element as usize),
        ("GetPrimitiveArrayCritical", arrays::get_primitive_array_critical as usize),
        ("ReleasePrimitiveArrayCritical", arrays::release_primitive_array_critical as usize),
        ("RegisterNatives", natives::register_natives as usize),
        ("UnregisterNatives", natives::unregister_natives as usize),
        ("MonitorEnter", monitors::monitor_enter as usize),
        ("MonitorExit", monitors::monitor_exit as usize),
        ("FromReflectedMethod", reflection::from_reflected_method as usize),
        ("FromReflectedField", reflection::from_reflected_field as usize),
        ("ToReflectedMethod", reflection::to_reflected_method as usize),
        ("ToReflectedField", reflection::to_reflected_field as usize),
    ];
    entries.extend(methods::entries());
    entries.extend(fields::entries());
    entries.extend(arrays::entries());
    entries
}

// =============================================================================
// Shared helpers
// =============================================================================

pub(crate) fn handle(raw: jobject) -> Handle {
    Handle::from_raw(raw as usize)
}

pub(crate) fn jbool(value: bool) -> jboolean {
    if value {
        TRUE
    } else {
        FALSE
    }
}

/// Reports a copy through a native `is_copy` out-parameter.
pub(crate) fn set_copy_flag(is_copy: *mut jboolean) {
    if !is_copy.is_null() {
        // SAFETY: a non-null flag pointer is writable per the interface
        unsafe { is_copy.write(TRUE) };
    }
}

/// A frame capacity requested by native code.
pub(crate) fn capacity(requested: jint) -> Result<usize, EntryError> {
    usize::try_from(requested)
        .map_err(|_| GuestError::new(ErrorKind::IllegalArgument, format!("negative capacity {requested}")).into())
}

/// Checks `start..start + len` against a sequence of `total` elements.
pub(crate) fn region(start: jint, len: jint, total: usize, kind: ErrorKind) -> Result<(usize, usize), EntryError> {
    match (usize::try_from(start), usize::try_from(len)) {
        (Ok(s), Ok(l)) if s.checked_add(l).is_some_and(|end| end <= total) => Ok((s, l)),
        _ => Err(GuestError::new(kind, format!("region {start}+{len} out of bounds for length {total}")).into()),
    }
}

/// Pops the arguments of a `...A` call for `method`.
///
/// # Safety
///
/// A non-null `args` must point at one `jvalue` per parameter of `method`.
pub(crate) unsafe fn arguments(ctx: &NativeContext, method: &Method, args: *const jvalue) -> Result<Vec<Value>, EntryError> {
    let signature = ctx
        .shared()
        .signatures()
        .get(method.descriptor().as_str())
        .map_err(BindError::from)?;
    if signature.params().is_empty() {
        return Ok(Vec::new());
    }
    if args.is_null() {
        return Err(GuestError::new(
            ErrorKind::NullPointer,
            format!("null argument array for {}{}", method.name(), method.descriptor()),
        )
        .into());
    }
    // SAFETY: forwarded from the caller
    let mut cursor = unsafe { JValueCursor::new(args) };
    Ok(pop_args(&mut cursor, &signature, |h| ctx.resolve(h)))
}
