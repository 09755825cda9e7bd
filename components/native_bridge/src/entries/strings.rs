//! Strings.
//!
//! Guest strings hold UTF-16 code units; native code sees either those units
//! or their modified UTF-8 encoding. Every pointer returned here is a native
//! buffer that must be handed back to the matching release function.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use core_types::{mutf8, ErrorKind, GuestError};

use super::{region, set_copy_flag};
use crate::context::{JniEnv, NativeContext};
use crate::guard::{guard, EntryError};
use crate::sys::{jboolean, jchar, jlong, jsize, jstring};

fn with_units<R>(ctx: &NativeContext, raw: jstring, f: impl FnOnce(&[u16]) -> R) -> Result<R, EntryError> {
    let string = ctx.require(raw, "string")?;
    match string.string_units() {
        Some(units) => Ok(f(units)),
        None => Err(GuestError::new(
            ErrorKind::IllegalArgument,
            format!("{} is not a string", string.class().dotted_name()),
        )
        .into()),
    }
}

/// Copies `units` into a native buffer.
fn units_buffer(ctx: &NativeContext, units: &[u16]) -> Result<*const jchar, EntryError> {
    let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_ne_bytes()).collect();
    Ok(ctx.shared().buffers().allocate_from(&bytes)?.as_ptr() as *const jchar)
}

fn release(ctx: &NativeContext, addr: usize) -> Result<(), EntryError> {
    ctx.shared().buffers().release(addr)?;
    Ok(())
}

/// `NewString`: a string of `len` UTF-16 units.
///
/// # Safety
///
/// `env` must be the calling thread's environment; `unicode` must point at
/// `len` units.
pub unsafe extern "system" fn new_string(env: *mut JniEnv, unicode: *const jchar, len: jsize) -> jstring {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "NewString", ptr::null_mut(), |ctx| {
            let len = super::capacity(len)?;
            let units = if len == 0 {
                Vec::new()
            } else if unicode.is_null() {
                return Err(GuestError::new(ErrorKind::NullPointer, "string units are null").into());
            } else {
                std::slice::from_raw_parts(unicode, len).to_vec()
            };
            let string = ctx.runtime().new_string(units)?;
            ctx.local(Some(string))
        })
    }
}

/// `GetStringLength`: length in UTF-16 units.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_string_length(env: *mut JniEnv, string: jstring) -> jsize {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "GetStringLength", 0, |ctx| with_units(ctx, string, |u| u.len() as jsize)) }
}

/// `GetStringChars`: a copy of the string's units, not NUL-terminated.
///
/// # Safety
///
/// `env` must be the calling thread's environment; a non-null `is_copy`
/// must be writable.
pub unsafe extern "system" fn get_string_chars(env: *mut JniEnv, string: jstring, is_copy: *mut jboolean) -> *const jchar {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetStringChars", ptr::null(), |ctx| {
            let chars = with_units(ctx, string, |units| units_buffer(ctx, units))??;
            set_copy_flag(is_copy);
            Ok(chars)
        })
    }
}

/// `ReleaseStringChars`
///
/// # Safety
///
/// `env` must be the calling thread's environment; `chars` must come from
/// `GetStringChars`.
pub unsafe extern "system" fn release_string_chars(env: *mut JniEnv, _string: jstring, chars: *const jchar) {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "ReleaseStringChars", (), |ctx| release(ctx, chars as usize)) }
}

/// `NewStringUTF`: decodes NUL-terminated modified UTF-8. A null pointer
/// yields null.
///
/// # Safety
///
/// `env` must be the calling thread's environment; a non-null `bytes` must
/// be NUL-terminated.
pub unsafe extern "system" fn new_string_utf(env: *mut JniEnv, bytes: *const c_char) -> jstring {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "NewStringUTF", ptr::null_mut(), |ctx| {
            if bytes.is_null() {
                return Ok(ptr::null_mut());
            }
            let units = mutf8::decode_lossy(CStr::from_ptr(bytes).to_bytes());
            let string = ctx.runtime().new_string(units)?;
            ctx.local(Some(string))
        })
    }
}

/// `GetStringUTFLength`: length in modified UTF-8 bytes.
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_string_utf_length(env: *mut JniEnv, string: jstring) -> jsize {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetStringUTFLength", 0, |ctx| {
            with_units(ctx, string, |u| jsize::try_from(mutf8::encoded_len(u)).unwrap_or(jsize::MAX))
        })
    }
}

/// `GetStringUTFLengthAsLong`
///
/// # Safety
///
/// `env` must be the calling thread's environment.
pub unsafe extern "system" fn get_string_utf_length_as_long(env: *mut JniEnv, string: jstring) -> jlong {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetStringUTFLengthAsLong", 0, |ctx| {
            with_units(ctx, string, |u| mutf8::encoded_len(u) as jlong)
        })
    }
}

/// `GetStringUTFChars`: NUL-terminated modified UTF-8.
///
/// # Safety
///
/// `env` must be the calling thread's environment; a non-null `is_copy`
/// must be writable.
pub unsafe extern "system" fn get_string_utf_chars(env: *mut JniEnv, string: jstring, is_copy: *mut jboolean) -> *const c_char {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetStringUTFChars", ptr::null(), |ctx| {
            let mut bytes = with_units(ctx, string, mutf8::encode)?;
            bytes.push(0);
            let chars = ctx.shared().buffers().allocate_from(&bytes)?;
            set_copy_flag(is_copy);
            Ok(chars.as_ptr() as *const c_char)
        })
    }
}

/// `ReleaseStringUTFChars`
///
/// # Safety
///
/// `env` must be the calling thread's environment; `chars` must come from
/// `GetStringUTFChars`.
pub unsafe extern "system" fn release_string_utf_chars(env: *mut JniEnv, _string: jstring, chars: *const c_char) {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "ReleaseStringUTFChars", (), |ctx| release(ctx, chars as usize)) }
}

/// `GetStringRegion`: copies `len` units starting at `start` into `buf`.
///
/// # Safety
///
/// `env` must be the calling thread's environment; `buf` must have room for
/// `len` units.
pub unsafe extern "system" fn get_string_region(env: *mut JniEnv, string: jstring, start: jsize, len: jsize, buf: *mut jchar) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetStringRegion", (), |ctx| {
            with_units(ctx, string, |units| -> Result<(), EntryError> {
                let (start, len) = region(start, len, units.len(), ErrorKind::StringIndexOutOfBounds)?;
                if len > 0 {
                    if buf.is_null() {
                        return Err(GuestError::new(ErrorKind::NullPointer, "destination buffer is null").into());
                    }
                    ptr::copy_nonoverlapping(units[start..].as_ptr(), buf, len);
                }
                Ok(())
            })?
        })
    }
}

/// `GetStringUTFRegion`: encodes `len` units starting at `start` into `buf`,
/// followed by a NUL byte.
///
/// # Safety
///
/// `env` must be the calling thread's environment; `buf` must have room for
/// the encoded region and its terminator.
pub unsafe extern "system" fn get_string_utf_region(env: *mut JniEnv, string: jstring, start: jsize, len: jsize, buf: *mut c_char) {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetStringUTFRegion", (), |ctx| {
            with_units(ctx, string, |units| -> Result<(), EntryError> {
                let (start, len) = region(start, len, units.len(), ErrorKind::StringIndexOutOfBounds)?;
                if buf.is_null() {
                    return Err(GuestError::new(ErrorKind::NullPointer, "destination buffer is null").into());
                }
                let bytes = mutf8::encode(&units[start..start + len]);
                ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len());
                buf.add(bytes.len()).write(0);
                Ok(())
            })?
        })
    }
}

/// `GetStringCritical`: like `GetStringChars`.
///
/// # Safety
///
/// `env` must be the calling thread's environment; a non-null `is_copy`
/// must be writable.
pub unsafe extern "system" fn get_string_critical(env: *mut JniEnv, string: jstring, is_copy: *mut jboolean) -> *const jchar {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, "GetStringCritical", ptr::null(), |ctx| {
            let chars = with_units(ctx, string, |units| units_buffer(ctx, units))??;
            set_copy_flag(is_copy);
            Ok(chars)
        })
    }
}

/// `ReleaseStringCritical`
///
/// # Safety
///
/// `env` must be the calling thread's environment; `chars` must come from
/// `GetStringCritical`.
pub unsafe extern "system" fn release_string_critical(env: *mut JniEnv, _string: jstring, chars: *const jchar) {
    // SAFETY: forwarded from the caller
    unsafe { guard(env, "ReleaseStringCritical", (), |ctx| release(ctx, chars as usize)) }
}
