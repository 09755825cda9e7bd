//! Unit tests for the exception relay

use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

use core_types::abi::{status, FALSE, TRUE};
use core_types::ErrorKind;
use native_bridge::binder::lookup;
use native_bridge::entries::{classes, exceptions, refs};
use native_bridge::sys::{jclass, jlong};
use native_bridge::{Bridge, BridgeConfig, JniEnv};
use object_model::{Vm, VmConfig};

fn attach() -> (Arc<Vm>, Bridge, *mut JniEnv) {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    let bridge = Bridge::new(vm.clone(), BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    (vm, bridge, env)
}

unsafe fn class(env: *mut JniEnv, name: &str) -> jclass {
    let name = CString::new(name).unwrap();
    unsafe { classes::find_class(env, name.as_ptr()) }
}

unsafe fn pending_class(env: *mut JniEnv) -> Option<String> {
    let ctx = unsafe { (*env).context() };
    ctx.pending().get().map(|t| t.class().name().to_string())
}

#[test]
fn test_throw_new_then_clear() {
    let (_vm, _bridge, env) = attach();
    unsafe {
        let runtime_exception = class(env, "java/lang/RuntimeException");
        let message = CString::new("boom").unwrap();
        assert_eq!(exceptions::throw_new(env, runtime_exception, message.as_ptr()), status::OK);
        assert_eq!(exceptions::exception_check(env), TRUE);

        let thrown = exceptions::exception_occurred(env);
        assert!(!thrown.is_null());
        assert_eq!(classes::is_instance_of(env, thrown, runtime_exception), TRUE);

        exceptions::exception_clear(env);
        assert_eq!(exceptions::exception_check(env), FALSE);
        assert!(exceptions::exception_occurred(env).is_null());
    }
}

#[test]
fn test_exception_clear_is_idempotent() {
    let (_vm, _bridge, env) = attach();
    unsafe {
        exceptions::exception_clear(env);
        exceptions::exception_clear(env);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_throw_rethrows_object() {
    let (_vm, _bridge, env) = attach();
    unsafe {
        let error = class(env, "java/lang/Error");
        assert_eq!(exceptions::throw_new(env, error, ptr::null()), status::OK);
        let thrown = exceptions::exception_occurred(env);
        exceptions::exception_clear(env);

        assert_eq!(exceptions::throw(env, thrown), status::OK);
        let again = exceptions::exception_occurred(env);
        assert_eq!(refs::is_same_object(env, thrown, again), TRUE);
    }
}

#[test]
fn test_throw_rejects_non_throwable() {
    let (_vm, _bridge, env) = attach();
    unsafe {
        let object = class(env, "java/lang/Object");
        assert_eq!(exceptions::throw(env, object), status::ERR);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
    }
}

#[test]
fn test_exception_describe_keeps_exception_pending() {
    let (vm, _bridge, env) = attach();
    unsafe {
        let runtime_exception = class(env, "java/lang/RuntimeException");
        let message = CString::new("described").unwrap();
        exceptions::throw_new(env, runtime_exception, message.as_ptr());
        let before = exceptions::exception_occurred(env);

        exceptions::exception_describe(env);

        assert_eq!(exceptions::exception_check(env), TRUE);
        let after = exceptions::exception_occurred(env);
        assert_eq!(refs::is_same_object(env, before, after), TRUE);
    }
    let lines = vm.diagnostics();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("described"), "{lines:?}");
}

#[test]
fn test_exception_describe_without_pending_does_nothing() {
    let (vm, _bridge, env) = attach();
    unsafe {
        exceptions::exception_describe(env);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
    assert!(vm.diagnostics().is_empty());
}

#[test]
fn test_unimplemented_function_raises() {
    let (_vm, _bridge, env) = attach();
    let address = lookup("CallIntMethod").address();
    unsafe {
        let stub: unsafe extern "system" fn(*mut JniEnv) -> jlong = std::mem::transmute(address);
        assert_eq!(stub(env), 0);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::UnsupportedOperation.class_name()));
    }
}

#[test]
fn test_null_class_raises_null_pointer() {
    let (_vm, _bridge, env) = attach();
    unsafe {
        assert!(classes::alloc_object(env, ptr::null_mut()).is_null());
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::NullPointer.class_name()));
    }
}
