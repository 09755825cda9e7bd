//! Unit tests for strings, arrays, throwables and reflection objects

use core_types::{ErrorKind, GuestError, Kind};
use object_model::{GuestRuntime, Member, Value, Vm, VmConfig};

#[test]
fn test_string_round_trip() {
    let vm = Vm::new(VmConfig::default());
    let s = vm.new_string("h\u{e9}llo".encode_utf16().collect()).unwrap();
    assert_eq!(s.class().name(), "java/lang/String");
    assert_eq!(s.to_rust_string().as_deref(), Some("h\u{e9}llo"));
    assert_eq!(s.string_units().map(<[u16]>::len), Some(5));
}

#[test]
fn test_object_array_rejects_bad_initializer() {
    let vm = Vm::new(VmConfig::default());
    let strings = vm.find_class("java/lang/String").unwrap();
    let not_a_string = vm.new_primitive_array(Kind::Byte, 1).unwrap();
    let err = vm.new_object_array(&strings, 2, Some(not_a_string)).unwrap_err();
    assert_eq!(err.class_name(), "java/lang/ArrayStoreException");

    let ok = vm.new_object_array(&strings, 2, Some(vm.new_string_from("x"))).unwrap();
    assert_eq!(ok.class().name(), "[Ljava/lang/String;");
    assert_eq!(ok.array().map(|a| a.len()), Some(2));
}

#[test]
fn test_throw_new_runs_constructor() {
    let vm = Vm::new(VmConfig::default());
    let class = vm.find_class("java/lang/IllegalStateException").ok();
    assert!(class.is_none());
    let class = vm.find_class("java/lang/IllegalArgumentException").unwrap();
    let throwable = vm.new_throwable(&class, Some("bad value")).unwrap();
    assert_eq!(vm.describe(&throwable), "java.lang.IllegalArgumentException: bad value");
}

#[test]
fn test_print_stack_trace_records_line() {
    let vm = Vm::new(VmConfig::default());
    let thrown = vm.throw(GuestError::new(ErrorKind::OutOfMemory, "handles"));
    let method = vm
        .resolve_method(thrown.object().class(), "printStackTrace", "()V", false)
        .unwrap();
    vm.invoke_virtual(&method, thrown.object(), &[]).unwrap();
    assert_eq!(vm.diagnostics(), vec!["java.lang.OutOfMemoryError: handles".to_string()]);
}

#[test]
fn test_mirror_is_stable() {
    let vm = Vm::new(VmConfig::default());
    let class = vm.find_class("java/lang/String").unwrap();
    let a = vm.class_mirror(&class);
    let b = vm.class_mirror(&class);
    assert_eq!(Value::from_object(a.clone()), Value::from_object(b));
    assert_eq!(a.class().name(), "java/lang/Class");
    assert!(std::sync::Arc::ptr_eq(a.mirrored_class().unwrap(), &class));
}

#[test]
fn test_reflect_constructor_uses_constructor_class() {
    let vm = Vm::new(VmConfig::default());
    let object = vm.find_class("java/lang/Object").unwrap();
    let init = vm.resolve_method(&object, "<init>", "()V", false).unwrap();
    let reflected = vm.reflect_method(&init).unwrap();
    assert_eq!(reflected.class().name(), "java/lang/reflect/Constructor");
    assert!(matches!(reflected.member(), Some(Member::Method(m)) if m.name() == "<init>"));
}
