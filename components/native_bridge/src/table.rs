//! The native interface function table.
//!
//! Four reserved slots come first, then every standard function in standard
//! order. Each slot holds whatever [`lookup`] returns for that name, so the
//! table is complete even where the bridge has no implementation.

use std::sync::OnceLock;

use crate::binder::lookup;

/// Slots before the first function.
pub const RESERVED_SLOTS: usize = 4;

const PRIMITIVES: [&str; 8] = ["Boolean", "Byte", "Char", "Short", "Int", "Long", "Float", "Double"];
const FIELD_KINDS: [&str; 9] = ["Object", "Boolean", "Byte", "Char", "Short", "Int", "Long", "Float", "Double"];
const RETURN_KINDS: [&str; 10] = [
    "Object", "Boolean", "Byte", "Char", "Short", "Int", "Long", "Float", "Double", "Void",
];

fn push_all(names: &mut Vec<String>, items: &[&str]) {
    names.extend(items.iter().map(|s| s.to_string()));
}

fn push_calls(names: &mut Vec<String>, prefix: &str) {
    for kind in RETURN_KINDS {
        for suffix in ["", "V", "A"] {
            names.push(format!("{prefix}{kind}Method{suffix}"));
        }
    }
}

fn push_typed(names: &mut Vec<String>, kinds: &[&str], pattern: &str) {
    names.extend(kinds.iter().map(|kind| pattern.replace("{}", kind)));
}

fn build_names() -> Vec<String> {
    let mut names = Vec::with_capacity(232);
    push_all(
        &mut names,
        &[
            "GetVersion",
            "DefineClass",
            "FindClass",
            "FromReflectedMethod",
            "FromReflectedField",
            "ToReflectedMethod",
            "GetSuperclass",
            "IsAssignableFrom",
            "ToReflectedField",
            "Throw",
            "ThrowNew",
            "ExceptionOccurred",
            "ExceptionDescribe",
            "ExceptionClear",
            "FatalError",
            "PushLocalFrame",
            "PopLocalFrame",
            "NewGlobalRef",
            "DeleteGlobalRef",
            "DeleteLocalRef",
            "IsSameObject",
            "NewLocalRef",
            "EnsureLocalCapacity",
            "AllocObject",
            "NewObject",
            "NewObjectV",
            "NewObjectA",
            "GetObjectClass",
            "IsInstanceOf",
            "GetMethodID",
        ],
    );
    push_calls(&mut names, "Call");
    push_calls(&mut names, "CallNonvirtual");
    names.push("GetFieldID".to_string());
    push_typed(&mut names, &FIELD_KINDS, "Get{}Field");
    push_typed(&mut names, &FIELD_KINDS, "Set{}Field");
    names.push("GetStaticMethodID".to_string());
    push_calls(&mut names, "CallStatic");
    names.push("GetStaticFieldID".to_string());
    push_typed(&mut names, &FIELD_KINDS, "GetStatic{}Field");
    push_typed(&mut names, &FIELD_KINDS, "SetStatic{}Field");
    push_all(
        &mut names,
        &[
            "NewString",
            "GetStringLength",
            "GetStringChars",
            "ReleaseStringChars",
            "NewStringUTF",
            "GetStringUTFLength",
            "GetStringUTFChars",
            "ReleaseStringUTFChars",
            "GetArrayLength",
            "NewObjectArray",
            "GetObjectArrayElement",
            "SetObjectArrayElement",
        ],
    );
    push_typed(&mut names, &PRIMITIVES, "New{}Array");
    push_typed(&mut names, &PRIMITIVES, "Get{}ArrayElements");
    push_typed(&mut names, &PRIMITIVES, "Release{}ArrayElements");
    push_typed(&mut names, &PRIMITIVES, "Get{}ArrayRegion");
    push_typed(&mut names, &PRIMITIVES, "Set{}ArrayRegion");
    push_all(
        &mut names,
        &[
            "RegisterNatives",
            "UnregisterNatives",
            "MonitorEnter",
            "MonitorExit",
            "GetJavaVM",
            "GetStringRegion",
            "GetStringUTFRegion",
            "GetPrimitiveArrayCritical",
            "ReleasePrimitiveArrayCritical",
            "GetStringCritical",
            "ReleaseStringCritical",
            "NewWeakGlobalRef",
            "DeleteWeakGlobalRef",
            "ExceptionCheck",
            "NewDirectByteBuffer",
            "GetDirectBufferAddress",
            "GetDirectBufferCapacity",
            "GetObjectRefType",
            "GetModule",
            "IsVirtualThread",
            "GetStringUTFLengthAsLong",
        ],
    );
    names
}

/// Every standard function name, in table order.
pub fn standard_names() -> &'static [String] {
    static NAMES: OnceLock<Vec<String>> = OnceLock::new();
    NAMES.get_or_init(build_names)
}

/// The table slot of a standard function.
///
/// # Examples
///
/// ```
/// use native_bridge::table::slot_of;
///
/// assert_eq!(slot_of("GetVersion"), Some(4));
/// assert_eq!(slot_of("RegisterNatives"), Some(215));
/// assert_eq!(slot_of("Frobnicate"), None);
/// ```
pub fn slot_of(name: &str) -> Option<usize> {
    standard_names()
        .iter()
        .position(|n| n == name)
        .map(|i| i + RESERVED_SLOTS)
}

/// Builds a function table.
pub fn build() -> Box<[usize]> {
    let names = standard_names();
    let mut table = vec![0usize; RESERVED_SLOTS + names.len()];
    let mut implemented = 0;
    for (slot, name) in table[RESERVED_SLOTS..].iter_mut().zip(names) {
        let found = lookup(name);
        implemented += usize::from(found.is_implemented());
        *slot = found.address();
    }
    log::debug!("function table: {implemented} of {} functions implemented", names.len());
    table.into_boxed_slice()
}
