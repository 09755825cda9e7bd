//! Unit tests for classes, member identifiers, calls, fields, monitors and
//! reflection

use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

use core_types::abi::{status, FALSE, TRUE};
use core_types::ErrorKind;
use native_bridge::entries::{classes, exceptions, fields, methods, monitors, reflection, refs, strings};
use native_bridge::sys::{jclass, jfieldID, jmethodID, jvalue};
use native_bridge::{Bridge, BridgeConfig, JniEnv};
use object_model::{ClassBuilder, GuestRuntime, Value, Vm, VmConfig};

fn define_counters(vm: &Vm) {
    vm.define_class(
        ClassBuilder::new("t/Counter")
            .field("count", "I")
            .static_field("total", "J")
            .method("<init>", "(I)V", |vm, this, args| {
                let this = this.unwrap();
                let count = vm.resolve_field(this.class(), "count", "I", false)?;
                this.set_field(&count, args[0].clone());
                Ok(Value::Void)
            })
            .method("add", "(I)I", |vm, this, args| {
                let this = this.unwrap();
                let count = vm.resolve_field(this.class(), "count", "I", false)?;
                match (this.get_field(&count), &args[0]) {
                    (Some(Value::Int(c)), Value::Int(n)) => Ok(Value::Int(c + n)),
                    _ => unreachable!(),
                }
            })
            .method("name", "()Ljava/lang/String;", |vm, _, _| {
                Ok(Value::from_object(vm.new_string_from("counter")))
            })
            .static_method("twice", "(I)I", |_, _, args| match args[0] {
                Value::Int(n) => Ok(Value::Int(n * 2)),
                _ => unreachable!(),
            }),
    )
    .unwrap();
    vm.define_class(
        ClassBuilder::new("t/Sub")
            .superclass("t/Counter")
            .method("add", "(I)I", |_, _, _| Ok(Value::Int(-1))),
    )
    .unwrap();
}

fn attach() -> (Bridge, *mut JniEnv) {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    define_counters(&vm);
    let bridge = Bridge::new(vm, BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    (bridge, env)
}

unsafe fn class(env: *mut JniEnv, name: &str) -> jclass {
    let name = CString::new(name).unwrap();
    unsafe { classes::find_class(env, name.as_ptr()) }
}

unsafe fn method(env: *mut JniEnv, class: jclass, name: &str, sig: &str) -> jmethodID {
    let name = CString::new(name).unwrap();
    let sig = CString::new(sig).unwrap();
    unsafe { methods::get_method_id(env, class, name.as_ptr(), sig.as_ptr()) }
}

unsafe fn pending_class(env: *mut JniEnv) -> Option<String> {
    let ctx = unsafe { (*env).context() };
    ctx.pending().get().map(|t| t.class().name().to_string())
}

fn int(i: i32) -> [jvalue; 1] {
    [jvalue { i }]
}

#[test]
fn test_construct_and_call() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let init = method(env, counter, "<init>", "(I)V");
        let obj = classes::new_object_a(env, counter, init, int(5).as_ptr());
        assert!(!obj.is_null());

        let add = method(env, counter, "add", "(I)I");
        assert_eq!(methods::call_int_method_a(env, obj, add, int(3).as_ptr()), 8);
        // the int result widened through the conversion policy
        assert_eq!(methods::call_long_method_a(env, obj, add, int(3).as_ptr()), 8);

        let name = method(env, counter, "name", "()Ljava/lang/String;");
        let text = methods::call_object_method_a(env, obj, name, ptr::null());
        assert_eq!(strings::get_string_length(env, text), 7);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_virtual_and_nonvirtual_dispatch() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let sub = class(env, "t/Sub");
        let init = method(env, counter, "<init>", "(I)V");
        let add = method(env, counter, "add", "(I)I");
        let obj = classes::new_object_a(env, sub, init, int(5).as_ptr());

        assert_eq!(methods::call_int_method_a(env, obj, add, int(3).as_ptr()), -1);
        assert_eq!(methods::call_nonvirtual_int_method_a(env, obj, counter, add, int(3).as_ptr()), 8);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_static_call_and_flavour_check() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let name = CString::new("twice").unwrap();
        let sig = CString::new("(I)I").unwrap();
        let twice = methods::get_static_method_id(env, counter, name.as_ptr(), sig.as_ptr());
        assert!(!twice.is_null());
        assert_eq!(methods::call_static_int_method_a(env, counter, twice, int(21).as_ptr()), 42);

        let add = method(env, counter, "add", "(I)I");
        assert_eq!(methods::call_static_int_method_a(env, counter, add, int(1).as_ptr()), 0);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
    }
}

#[test]
fn test_missing_method_raises() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        assert!(method(env, counter, "missing", "()V").is_null());
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::NoSuchMethod.class_name()));
    }
}

#[test]
fn test_call_with_null_receiver_raises() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let add = method(env, counter, "add", "(I)I");
        assert_eq!(methods::call_int_method_a(env, ptr::null_mut(), add, int(1).as_ptr()), 0);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::NullPointer.class_name()));
    }
}

#[test]
fn test_instance_and_static_fields() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let init = method(env, counter, "<init>", "(I)V");
        let obj = classes::new_object_a(env, counter, init, int(5).as_ptr());

        let name = CString::new("count").unwrap();
        let sig = CString::new("I").unwrap();
        let count: jfieldID = fields::get_field_id(env, counter, name.as_ptr(), sig.as_ptr());
        assert_eq!(fields::get_int_field(env, obj, count), 5);
        fields::set_int_field(env, obj, count, 11);
        assert_eq!(fields::get_int_field(env, obj, count), 11);

        let name = CString::new("total").unwrap();
        let sig = CString::new("J").unwrap();
        let total = fields::get_static_field_id(env, counter, name.as_ptr(), sig.as_ptr());
        assert_eq!(fields::get_static_long_field(env, counter, total), 0);
        fields::set_static_long_field(env, counter, total, 99);
        assert_eq!(fields::get_static_long_field(env, counter, total), 99);

        // instance accessors refuse static field ids
        fields::get_int_field(env, obj, total);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
    }
}

#[test]
fn test_instance_field_rejects_unrelated_receiver() {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    define_counters(&vm);
    vm.define_class(ClassBuilder::new("t/Other").field("tag", "I")).unwrap();
    let bridge = Bridge::new(vm, BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    unsafe {
        let counter = class(env, "t/Counter");
        let name = CString::new("count").unwrap();
        let sig = CString::new("I").unwrap();
        let count = fields::get_field_id(env, counter, name.as_ptr(), sig.as_ptr());

        let other = classes::alloc_object(env, class(env, "t/Other"));
        assert_eq!(fields::get_int_field(env, other, count), 0);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
        exceptions::exception_clear(env);
        fields::set_int_field(env, other, count, 9);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
        exceptions::exception_clear(env);

        // inherited fields stay reachable through subclass instances
        let sub = classes::alloc_object(env, class(env, "t/Sub"));
        fields::set_int_field(env, sub, count, 4);
        assert_eq!(fields::get_int_field(env, sub, count), 4);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_class_queries() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let sub = class(env, "t/Sub");
        assert_eq!(classes::is_assignable_from(env, sub, counter), TRUE);
        assert_eq!(classes::is_assignable_from(env, counter, sub), FALSE);

        let parent = classes::get_superclass(env, sub);
        assert_eq!(refs::is_same_object(env, parent, counter), TRUE);
        let object = class(env, "java/lang/Object");
        assert!(classes::get_superclass(env, object).is_null());

        let instance = classes::alloc_object(env, sub);
        let of = classes::get_object_class(env, instance);
        assert_eq!(refs::is_same_object(env, of, sub), TRUE);
        assert_eq!(classes::is_instance_of(env, instance, counter), TRUE);
        assert_eq!(classes::is_instance_of(env, ptr::null_mut(), sub), TRUE);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_find_unknown_class_raises() {
    let (_bridge, env) = attach();
    unsafe {
        assert!(class(env, "t/Nope").is_null());
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::NoClassDefFound.class_name()));
    }
}

#[test]
fn test_monitor_enter_exit() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let obj = classes::alloc_object(env, counter);
        assert_eq!(monitors::monitor_enter(env, obj), status::OK);
        assert_eq!(monitors::monitor_enter(env, obj), status::OK);
        assert_eq!(monitors::monitor_exit(env, obj), status::OK);
        assert_eq!(monitors::monitor_exit(env, obj), status::OK);
        assert_eq!(exceptions::exception_check(env), FALSE);

        assert_eq!(monitors::monitor_exit(env, obj), status::ERR);
        assert_eq!(
            pending_class(env).as_deref(),
            Some(ErrorKind::IllegalMonitorState.class_name())
        );
    }
}

#[test]
fn test_reflection_round_trip() {
    let (_bridge, env) = attach();
    unsafe {
        let counter = class(env, "t/Counter");
        let add = method(env, counter, "add", "(I)I");
        let reflected = reflection::to_reflected_method(env, counter, add, FALSE);
        assert!(!reflected.is_null());
        assert_eq!(reflection::from_reflected_method(env, reflected), add);

        let name = CString::new("count").unwrap();
        let sig = CString::new("I").unwrap();
        let count = fields::get_field_id(env, counter, name.as_ptr(), sig.as_ptr());
        let reflected = reflection::to_reflected_field(env, counter, count, FALSE);
        assert_eq!(reflection::from_reflected_field(env, reflected), count);

        // a field object is not a method
        assert!(reflection::from_reflected_method(env, reflected).is_null());
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
        exceptions::exception_clear(env);

        assert!(reflection::to_reflected_method(env, counter, add, TRUE).is_null());
        assert_eq!(exceptions::exception_check(env), TRUE);
    }
}
