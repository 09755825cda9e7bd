//! Arrays.
//!
//! Reference arrays are accessed one element at a time. Primitive arrays are
//! exposed to native code as copies: `Get<T>ArrayElements` and the critical
//! variant hand out a native buffer that the matching release call writes
//! back and frees according to its mode, while the region calls copy straight
//! between the array and caller-owned memory.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use core_types::abi::{ABORT, COMMIT};
use core_types::{ErrorKind, GuestError, Kind};
use object_model::{ArrayData, Component, Object, Value};

use super::{region, set_copy_flag};
use crate::context::{JniEnv, NativeContext};
use crate::guard::{guard, EntryError};
use crate::marshal::AbiReturn;
use crate::sys::{jarray, jboolean, jbyte, jchar, jclass, jdouble, jfloat, jint, jlong, jobject, jshort, jsize};

fn with_array<R>(
    ctx: &NativeContext,
    raw: jarray,
    f: impl FnOnce(&Object, &ArrayData) -> Result<R, EntryError>,
) -> Result<R, EntryError> {
    let object = ctx.require(raw, "array")?;
    let object: &Object = &object;
    match object.array() {
        Some(data) => f(object, data),
        None => Err(GuestError::new(
            ErrorKind::IllegalArgument,
            format!("{} is not an array", object.class().dotted_name()),
        )
        .into()),
    }
}

/// Runs `f` on a primitive array, of kind `expected` when given.
fn with_primitive<R>(
    ctx: &NativeContext,
    raw: jarray,
    expected: Option<Kind>,
    f: impl FnOnce(&ArrayData) -> Result<R, EntryError>,
) -> Result<R, EntryError> {
    with_array(ctx, raw, |object, data| {
        let kind = data.element_kind();
        if !kind.is_primitive() || expected.is_some_and(|e| e != kind) {
            let wanted = expected.map_or_else(|| "primitive".to_string(), |e| e.to_string());
            return Err(GuestError::new(
                ErrorKind::IllegalArgument,
                format!("{} is not a {wanted} array", object.class().dotted_name()),
            )
            .into());
        }
        f(data)
    })
}

fn element_index(index: jsize, len: usize) -> Result<usize, EntryError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| {
            GuestError::new(
                ErrorKind::ArrayIndexOutOfBounds,
                format!("index {index} out of bounds for length {len}"),
            )
            .into()
        })
}

/// Native-endian bytes of every element, in a new native buffer.
/// Copies raw element bytes into `data` at `start`.
fn write_elements(data: &ArrayData, start: usize, bytes: &[u8]) -> Result<(), EntryError> {
    if data.write_region(start, bytes) {
        return Ok(());
    }
    Err(GuestError::new(
        ErrorKind::ArrayIndexOutOfBounds,
        format!("cannot write {} bytes at element {start} of a {}-element array", bytes.len(), data.len()),
    )
    .into())
}

fn elements_buffer(ctx: &NativeContext, data: &ArrayData) -> Result<*mut c_void, EntryError> {
    let bytes = data.read_region(0, data.len()).unwrap_or_default();
    Ok(ctx.shared().buffers().allocate_from(&bytes)?.as_ptr().cast())
}

/// Finishes with a buffer from [`elements_buffer`].
///
/// Mode 0 writes back and frees, [`COMMIT`] only writes back, [`ABORT`] only
/// frees.
fn release_buffer(ctx: &NativeContext, raw: jarray, expected: Option<Kind>, addr: usize, mode: jint) -> Result<(), EntryError> {
    if !matches!(mode, 0 | COMMIT | ABORT) {
        return Err(GuestError::new(ErrorKind::IllegalArgument, format!("unknown release mode {mode}")).into());
    }
    let buffers = ctx.shared().buffers();
    let bytes = buffers.contents(addr)?;
    let written = if mode == ABORT {
        Ok(())
    } else {
        with_primitive(ctx, raw, expected, |data| {
            if data.write_region(0, &bytes) {
                Ok(())
            } else {
                Err(GuestError::new(
                    ErrorKind::IllegalArgument,
                    format!("{} byte buffer does not match a {}-element array", bytes.len(), data.len()),
                )
                .into())
            }
        })
    };
    if mode != COMMIT {
        buffers.release(addr)?;
    }
    written
}

/// `GetArrayLength`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_array_length(env: *mut JniEnv, array: jarray) -> jsize {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "GetArrayLength", 0, |ctx| with_array(ctx, array, |_, data| Ok(data.len() as jsize))) }
}

/// `NewObjectArray`: every element starts as `initial`.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn new_object_array(env: *mut JniEnv, len: jsize, element_class: jclass, initial: jobject) -> jarray {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "NewObjectArray", ptr::null_mut(), |ctx| {
            let element = ctx.class(element_class)?;
            let array = ctx.runtime().new_object_array(&element, len, ctx.object(initial))?;
            ctx.local(Some(array))
        })
    }
}

/// `GetObjectArrayElement`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_object_array_element(env: *mut JniEnv, array: jarray, index: jsize) -> jobject {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetObjectArrayElement", ptr::null_mut(), |ctx| {
            let element = with_array(ctx, array, |object, data| {
                let index = element_index(index, data.len())?;
                match data.get(index) {
                    Some(Value::Object(element)) => Ok(element),
                    _ => Err(GuestError::new(
                        ErrorKind::IllegalArgument,
                        format!("{} is not a reference array", object.class().dotted_name()),
                    )
                    .into()),
                }
            })?;
            ctx.local(element)
        })
    }
}

/// `SetObjectArrayElement`: the value must be assignable to the element class.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn set_object_array_element(env: *mut JniEnv, array: jarray, index: jsize, value: jobject) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "SetObjectArrayElement", (), |ctx| {
            let value = ctx.object(value);
            with_array(ctx, array, |object, data| {
                let Some(Component::Reference(element)) = object.class().component() else {
                    return Err(GuestError::new(
                        ErrorKind::IllegalArgument,
                        format!("{} is not a reference array", object.class().dotted_name()),
                    )
                    .into());
                };
                let index = element_index(index, data.len())?;
                if let Some(value) = &value {
                    if !value.is_instance_of(element) {
                        return Err(GuestError::new(
                            ErrorKind::ArrayStore,
                            format!("{} cannot be stored in {}", value.class().dotted_name(), object.class().dotted_name()),
                        )
                        .into());
                    }
                }
                data.set(index, Value::Object(value));
                Ok(())
            })
        })
    }
}

/// `GetPrimitiveArrayCritical`: a copy of any primitive array's elements.
///
/// # Safety
///
/// `env` must be the calling thread's environment; a non-null `is_copy`
/// must be writable.
pub unsafe extern "system" fn get_primitive_array_critical(env: *mut JniEnv, array: jarray, is_copy: *mut jboolean) -> *mut c_void {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetPrimitiveArrayCritical", ptr::null_mut(), |ctx| {
            let elements = with_primitive(ctx, array, None, |data| elements_buffer(ctx, data))?;
            set_copy_flag(is_copy);
            Ok(elements)
        })
    }
}

/// `ReleasePrimitiveArrayCritical`
///
/// # Safety
///
/// `env` must be the calling thread's environment; `elements` must come from
/// `GetPrimitiveArrayCritical`.
pub unsafe extern "system" fn release_primitive_array_critical(env: *mut JniEnv, array: jarray, elements: *mut c_void, mode: jint) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "ReleasePrimitiveArrayCritical", (), |ctx| {
            release_buffer(ctx, array, None, elements as usize, mode)
        })
    }
}

// =============================================================================
// Typed primitive arrays
// =============================================================================

unsafe fn new_array<T: AbiReturn>(env: *mut JniEnv, entry: &'static str, len: jsize) -> jarray {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, ptr::null_mut(), |ctx| {
            let array = ctx.runtime().new_primitive_array(T::KIND, len)?;
            ctx.local(Some(array))
        })
    }
}

unsafe fn get_elements<T: AbiReturn>(env: *mut JniEnv, entry: &'static str, array: jarray, is_copy: *mut jboolean) -> *mut T {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, ptr::null_mut(), |ctx| {
            let elements = with_primitive(ctx, array, Some(T::KIND), |data| elements_buffer(ctx, data))?;
            set_copy_flag(is_copy);
            Ok(elements.cast())
        })
    }
}

unsafe fn release_elements<T: AbiReturn>(env: *mut JniEnv, entry: &'static str, array: jarray, elements: *mut T, mode: jint) {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, entry, (), |ctx| release_buffer(ctx, array, Some(T::KIND), elements as usize, mode)) }
}

/// # Safety
///
/// `buf` must have room for `len` elements.
unsafe fn get_region<T: AbiReturn>(env: *mut JniEnv, entry: &'static str, array: jarray, start: jsize, len: jsize, buf: *mut T) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, (), |ctx| {
            with_primitive(ctx, array, Some(T::KIND), |data| {
                let (start, len) = region(start, len, data.len(), ErrorKind::ArrayIndexOutOfBounds)?;
                if len == 0 {
                    return Ok(());
                }
                if buf.is_null() {
                    return Err(GuestError::new(ErrorKind::NullPointer, "destination buffer is null").into());
                }
                let bytes = data.read_region(start, len).unwrap_or_default();
                ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len());
                Ok(())
            })
        })
    }
}

/// # Safety
///
/// `buf` must hold `len` elements.
unsafe fn set_region<T: AbiReturn>(env: *mut JniEnv, entry: &'static str, array: jarray, start: jsize, len: jsize, buf: *const T) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, entry, (), |ctx| {
            with_primitive(ctx, array, Some(T::KIND), |data| {
                let (start, len) = region(start, len, data.len(), ErrorKind::ArrayIndexOutOfBounds)?;
                if len == 0 {
                    return Ok(());
                }
                if buf.is_null() {
                    return Err(GuestError::new(ErrorKind::NullPointer, "source buffer is null").into());
                }
                let bytes = std::slice::from_raw_parts(buf.cast::<u8>(), len * mem::size_of::<T>());
                write_elements(data, start, bytes)
            })
        })
    }
}

macro_rules! array_entries {
    ($($ty:ty =>
        $new:ident $new_name:literal,
        $get_elements:ident $get_elements_name:literal,
        $release_elements:ident $release_elements_name:literal,
        $get_region:ident $get_region_name:literal,
        $set_region:ident $set_region_name:literal;)*) => {
        $(
            #[doc = concat!("`", $new_name, "`: a zero-filled array.")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment.
            pub unsafe extern "system" fn $new(env: *mut JniEnv, len: jsize) -> jarray {
                // SAFETY: forwarded from the caller
                unsafe { new_array::<$ty>(env, $new_name, len) }
            }

            #[doc = concat!("`", $get_elements_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment; a non-null
            /// `is_copy` must be writable.
            pub unsafe extern "system" fn $get_elements(env: *mut JniEnv, array: jarray, is_copy: *mut jboolean) -> *mut $ty {
                // SAFETY: forwarded from the caller
                unsafe { get_elements(env, $get_elements_name, array, is_copy) }
            }

            #[doc = concat!("`", $release_elements_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment; `elements`
            #[doc = concat!("must come from `", $get_elements_name, "`.")]
            pub unsafe extern "system" fn $release_elements(env: *mut JniEnv, array: jarray, elements: *mut $ty, mode: jint) {
                // SAFETY: forwarded from the caller
                unsafe { release_elements(env, $release_elements_name, array, elements, mode) }
            }

            #[doc = concat!("`", $get_region_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment; `buf` must
            /// have room for `len` elements.
            pub unsafe extern "system" fn $get_region(env: *mut JniEnv, array: jarray, start: jsize, len: jsize, buf: *mut $ty) {
                // SAFETY: forwarded from the caller
                unsafe { get_region(env, $get_region_name, array, start, len, buf) }
            }

            #[doc = concat!("`", $set_region_name, "`")]
            ///
            /// # Safety
            ///
            /// `env` must be the calling thread's environment; `buf` must
            /// hold `len` elements.
            pub unsafe extern "system" fn $set_region(env: *mut JniEnv, array: jarray, start: jsize, len: jsize, buf: *const $ty) {
                // SAFETY: forwarded from the caller
                unsafe { set_region(env, $set_region_name, array, start, len, buf) }
            }
        )*

        pub(super) fn entries() -> Vec<(&'static str, usize)> {
            vec![$(
                ($new_name, $new as usize),
                ($get_elements_name, $get_elements as usize),
                ($release_elements_name, $release_elements as usize),
                ($get_region_name, $get_region as usize),
                ($set_region_name, $set_region as usize),
            )*]
        }
    };
}

array_entries! {
    jboolean => new_boolean_array "NewBooleanArray",
        get_boolean_array_elements "GetBooleanArrayElements",
        release_boolean_array_elements "ReleaseBooleanArrayElements",
        get_boolean_array_region "GetBooleanArrayRegion",
        set_boolean_array_region "SetBooleanArrayRegion";
    jbyte => new_byte_array "NewByteArray",
        get_byte_array_elements "GetByteArrayElements",
        release_byte_array_elements "ReleaseByteArrayElements",
        get_byte_array_region "GetByteArrayRegion",
        set_byte_array_region "SetByteArrayRegion";
    jchar => new_char_array "NewCharArray",
        get_char_array_elements "GetCharArrayElements",
        release_char_array_elements "ReleaseCharArrayElements",
        get_char_array_region "GetCharArrayRegion",
        set_char_array_region "SetCharArrayRegion";
    jshort => new_short_array "NewShortArray",
        get_short_array_elements "GetShortArrayElements",
        release_short_array_elements "ReleaseShortArrayElements",
        get_short_array_region "GetShortArrayRegion",
        set_short_array_region "SetShortArrayRegion";
    jint => new_int_array "NewIntArray",
        get_int_array_elements "GetIntArrayElements",
        release_int_array_elements "ReleaseIntArrayElements",
        get_int_array_region "GetIntArrayRegion",
        set_int_array_region "SetIntArrayRegion";
    jlong => new_long_array "NewLongArray",
        get_long_array_elements "GetLongArrayElements",
        release_long_array_elements "ReleaseLongArrayElements",
        get_long_array_region "GetLongArrayRegion",
        set_long_array_region "SetLongArrayRegion";
    jfloat => new_float_array "NewFloatArray",
        get_float_array_elements "GetFloatArrayElements",
        release_float_array_elements "ReleaseFloatArrayElements",
        get_float_array_region "GetFloatArrayRegion",
        set_float_array_region "SetFloatArrayRegion";
    jdouble => new_double_array "NewDoubleArray",
        get_double_array_elements "GetDoubleArrayElements",
        release_double_array_elements "ReleaseDoubleArrayElements",
        get_double_array_region "GetDoubleArrayRegion",
        set_double_array_region "SetDoubleArrayRegion";
}
