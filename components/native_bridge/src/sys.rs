//! ABI types of the native interface.
//!
//! These mirror the C declarations compiled native libraries are built
//! against. Reference types are pointer-sized handle values; member
//! identifiers are pointer-sized table indices.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::c_char;

pub use crate::context::JniEnv;

// =============================================================================
// Primitive Types
// =============================================================================

/// `int`
pub type jint = i32;
/// `long`
pub type jlong = i64;
/// `byte`
pub type jbyte = i8;
/// `boolean`
pub type jboolean = u8;
/// `char`
pub type jchar = u16;
/// `short`
pub type jshort = i16;
/// `float`
pub type jfloat = f32;
/// `double`
pub type jdouble = f64;
/// Array lengths and indices
pub type jsize = jint;

// =============================================================================
// Reference Types
// =============================================================================

/// Any reference handle
pub type jobject = *mut c_void;
/// Class reference
pub type jclass = jobject;
/// String reference
pub type jstring = jobject;
/// Array reference
pub type jarray = jobject;
/// Throwable reference
pub type jthrowable = jobject;
/// Weak global reference
pub type jweak = jobject;

/// Method identifier
pub type jmethodID = *mut c_void;
/// Field identifier
pub type jfieldID = *mut c_void;

/// One argument of the array (`...A`) calling variants.
#[repr(C)]
#[derive(Copy, Clone)]
pub union jvalue {
    /// `boolean`
    pub z: jboolean,
    /// `byte`
    pub b: jbyte,
    /// `char`
    pub c: jchar,
    /// `short`
    pub s: jshort,
    /// `int`
    pub i: jint,
    /// `long`
    pub j: jlong,
    /// `float`
    pub f: jfloat,
    /// `double`
    pub d: jdouble,
    /// reference
    pub l: jobject,
}

impl jvalue {
    /// A zeroed value.
    pub fn zeroed() -> Self {
        jvalue { j: 0 }
    }
}

impl Default for jvalue {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// One entry of a `RegisterNatives` call.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct JNINativeMethod {
    /// Method name, modified UTF-8, NUL-terminated
    pub name: *const c_char,
    /// Method descriptor, modified UTF-8, NUL-terminated
    pub signature: *const c_char,
    /// Native implementation
    pub fnPtr: *mut c_void,
}

/// Result of `GetObjectRefType`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum jobjectRefType {
    /// Not a live handle
    JNIInvalidRefType = 0,
    /// Local handle
    JNILocalRefType = 1,
    /// Global handle
    JNIGlobalRefType = 2,
    /// Weak global handle
    JNIWeakGlobalRefType = 3,
}

impl From<core_types::RefKind> for jobjectRefType {
    fn from(kind: core_types::RefKind) -> Self {
        match kind {
            core_types::RefKind::Invalid => jobjectRefType::JNIInvalidRefType,
            core_types::RefKind::Local => jobjectRefType::JNILocalRefType,
            core_types::RefKind::Global => jobjectRefType::JNIGlobalRefType,
            core_types::RefKind::WeakGlobal => jobjectRefType::JNIWeakGlobalRefType,
        }
    }
}
