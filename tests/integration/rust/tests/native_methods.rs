//! Native Method Integration Tests
//!
//! Guest code calls native functions through the bridge, and native code
//! calls back into the guest through the entry points.

use std::ffi::{c_void, CString};
use std::sync::Arc;

use core_types::abi::status;
use core_types::{ErrorKind, GuestError};
use native_bridge::entries::{classes, exceptions, methods, natives, refs};
use native_bridge::sys::{jclass, jint, jvalue, JNINativeMethod};
use native_bridge::{Bridge, BridgeConfig, JniEnv};
use object_model::{ClassBuilder, GuestRuntime, Value, Vm, VmConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cstr(text: &str) -> CString {
    CString::new(text).unwrap()
}

fn math_vm(config: VmConfig) -> Arc<Vm> {
    let vm = Arc::new(Vm::new(config));
    vm.define_class(
        ClassBuilder::new("app/Math")
            .static_native_method("add", "(II)I")
            .static_native_method("recurse", "(I)I")
            .static_method("twice", "(I)I", |_, _, args| {
                Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
            }),
    )
    .unwrap();
    vm
}

unsafe extern "system" fn add(_env: *mut JniEnv, _class: jclass, a: jint, b: jint) -> jint {
    a + b
}

/// Calls `twice` in the guest and adds one.
unsafe extern "system" fn add_after_twice(env: *mut JniEnv, class: jclass, a: jint, _b: jint) -> jint {
    let name = cstr("twice");
    let sig = cstr("(I)I");
    unsafe {
        let twice = methods::get_static_method_id(env, class, name.as_ptr(), sig.as_ptr());
        let arg = jvalue { i: a };
        methods::call_static_int_method_a(env, class, twice, &arg) + 1
    }
}

/// Recurses through the guest until the call stack overflows.
unsafe extern "system" fn recurse(env: *mut JniEnv, class: jclass, depth: jint) -> jint {
    let name = cstr("recurse");
    let sig = cstr("(I)I");
    unsafe {
        let method = methods::get_static_method_id(env, class, name.as_ptr(), sig.as_ptr());
        let arg = jvalue { i: depth + 1 };
        let result = methods::call_static_int_method_a(env, class, method, &arg);
        if exceptions::exception_check(env) != 0 {
            return 0;
        }
        result
    }
}

unsafe fn register(env: *mut JniEnv, class: &str, name: &str, sig: &str, function: *mut c_void) -> jint {
    let class = cstr(class);
    let name = cstr(name);
    let sig = cstr(sig);
    let entry = JNINativeMethod {
        name: name.as_ptr(),
        signature: sig.as_ptr(),
        fnPtr: function,
    };
    unsafe {
        let class = classes::find_class(env, class.as_ptr());
        natives::register_natives(env, class, &entry, 1)
    }
}

/// Test: RegisterNatives binds a function the guest then calls
#[test]
fn test_register_natives_add() {
    init_logging();
    let vm = math_vm(VmConfig::default());
    let bridge = Bridge::new(vm.clone(), BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();

    unsafe {
        assert_eq!(register(env, "app/Math", "add", "(II)I", add as *mut c_void), status::OK);
    }
    let sum = vm
        .invoke_static("app/Math", "add", "(II)I", &[Value::Int(2), Value::Int(3)])
        .unwrap();
    assert_eq!(sum, Value::Int(5));
}

/// Test: Re-registering replaces the previous binding
#[test]
fn test_reregister_replaces_binding() {
    init_logging();
    let vm = math_vm(VmConfig::default());
    let bridge = Bridge::new(vm.clone(), BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();

    unsafe {
        register(env, "app/Math", "add", "(II)I", add as *mut c_void);
        register(env, "app/Math", "add", "(II)I", add_after_twice as *mut c_void);
    }
    assert_eq!(bridge.binder().binding_count(), 1);
    let result = vm
        .invoke_static("app/Math", "add", "(II)I", &[Value::Int(10), Value::Int(0)])
        .unwrap();
    assert_eq!(result, Value::Int(21));
}

/// Test: UnregisterNatives leaves the method unlinked
#[test]
fn test_unregister_natives() {
    init_logging();
    let vm = math_vm(VmConfig::default());
    let bridge = Bridge::new(vm.clone(), BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    let class_name = cstr("app/Math");

    unsafe {
        register(env, "app/Math", "add", "(II)I", add as *mut c_void);
        let class = classes::find_class(env, class_name.as_ptr());
        assert_eq!(natives::unregister_natives(env, class), status::OK);
    }
    assert_eq!(bridge.binder().binding_count(), 0);
    let err = vm
        .invoke_static("app/Math", "add", "(II)I", &[Value::Int(2), Value::Int(3)])
        .unwrap_err();
    assert_eq!(err.class_name(), ErrorKind::UnsatisfiedLink.class_name());
}

/// Test: A native method links lazily against a registered symbol
#[test]
fn test_lazy_linking() {
    init_logging();
    let vm = math_vm(VmConfig::default());
    let bridge = Bridge::new(vm.clone(), BridgeConfig::default()).unwrap();

    let err = vm
        .invoke_static("app/Math", "add", "(II)I", &[Value::Int(1), Value::Int(1)])
        .unwrap_err();
    assert_eq!(err.class_name(), ErrorKind::UnsatisfiedLink.class_name());

    bridge.binder().register_symbol("Java_app_Math_add", add as usize);
    let sum = vm
        .invoke_static("app/Math", "add", "(II)I", &[Value::Int(1), Value::Int(1)])
        .unwrap();
    assert_eq!(sum, Value::Int(2));
}

/// Test: Unbounded recursion through native code ends in StackOverflowError
#[test]
fn test_recursion_overflows_call_stack() {
    init_logging();
    let vm = math_vm(VmConfig { max_call_depth: 16 });
    let bridge = Bridge::new(vm.clone(), BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();

    unsafe {
        register(env, "app/Math", "recurse", "(I)I", recurse as *mut c_void);
    }
    let ctx = unsafe { (*env).context() };
    let locals = ctx.local_count();

    let err = vm
        .invoke_static("app/Math", "recurse", "(I)I", &[Value::Int(0)])
        .unwrap_err();
    assert_eq!(err.class_name(), ErrorKind::StackOverflow.class_name());
    assert_eq!(ctx.frame_depth(), 1);
    assert_eq!(ctx.local_count(), locals);
    assert!(ctx.pending().get().is_none());
}

/// Test: ExceptionDescribe restores the pending exception even when
/// printing it throws
#[test]
fn test_exception_describe_restores_pending() {
    init_logging();
    let vm = Arc::new(Vm::new(VmConfig::default()));
    vm.define_class(
        ClassBuilder::new("app/NoisyException")
            .superclass("java/lang/RuntimeException")
            .method("printStackTrace", "()V", |vm, _, _| {
                Err(vm.throw(GuestError::new(ErrorKind::IllegalArgument, "cannot print")))
            }),
    )
    .unwrap();
    let bridge = Bridge::new(vm.clone(), BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    let class_name = cstr("app/NoisyException");
    let message = cstr("original");

    unsafe {
        let class = classes::find_class(env, class_name.as_ptr());
        assert_eq!(exceptions::throw_new(env, class, message.as_ptr()), status::OK);
        let before = exceptions::exception_occurred(env);

        exceptions::exception_describe(env);

        let after = exceptions::exception_occurred(env);
        assert_ne!(refs::is_same_object(env, before, after), 0);
        let pending = (*env).context().pending().get().unwrap();
        assert_eq!(vm.describe(&pending), "app.NoisyException: original");
    }
    assert!(vm.diagnostics().is_empty());
}

/// Test: ExceptionClear is idempotent
#[test]
fn test_exception_clear_idempotent() {
    init_logging();
    let vm = Arc::new(Vm::new(VmConfig::default()));
    let bridge = Bridge::new(vm, BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    let class_name = cstr("java/lang/RuntimeException");

    unsafe {
        exceptions::exception_clear(env);
        assert_eq!(exceptions::exception_check(env), 0);

        let class = classes::find_class(env, class_name.as_ptr());
        exceptions::throw_new(env, class, std::ptr::null());
        assert_ne!(exceptions::exception_check(env), 0);

        exceptions::exception_clear(env);
        exceptions::exception_clear(env);
        assert_eq!(exceptions::exception_check(env), 0);
        assert!(exceptions::exception_occurred(env).is_null());
    }
}
