//! Unit tests for handles and local frames

use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

use core_types::abi::{status, FALSE, TRUE};
use core_types::ErrorKind;
use native_bridge::entries::{classes, exceptions, refs, strings};
use native_bridge::sys::{jclass, jobject, jobjectRefType};
use native_bridge::{Bridge, BridgeConfig, JniEnv};
use object_model::{Vm, VmConfig};

fn attach() -> (Bridge, *mut JniEnv) {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    let bridge = Bridge::new(vm, BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    (bridge, env)
}

unsafe fn object_class(env: *mut JniEnv) -> jclass {
    let name = CString::new("java/lang/Object").unwrap();
    unsafe { classes::find_class(env, name.as_ptr()) }
}

unsafe fn pending_kind(env: *mut JniEnv) -> Option<String> {
    let ctx = unsafe { (*env).context() };
    ctx.pending().get().map(|t| t.class().name().to_string())
}

#[test]
fn test_global_survives_frame_pop() {
    let (_bridge, env) = attach();
    unsafe {
        assert_eq!(refs::push_local_frame(env, 4), status::OK);
        let class = object_class(env);
        let local = classes::alloc_object(env, class);
        assert!(!local.is_null());
        let global = refs::new_global_ref(env, local);
        assert_eq!(refs::get_object_ref_type(env, local), jobjectRefType::JNILocalRefType);
        assert_eq!(refs::get_object_ref_type(env, global), jobjectRefType::JNIGlobalRefType);

        assert!(refs::pop_local_frame(env, ptr::null_mut()).is_null());
        assert_eq!(refs::get_object_ref_type(env, local), jobjectRefType::JNIInvalidRefType);
        assert_eq!(refs::get_object_ref_type(env, global), jobjectRefType::JNIGlobalRefType);
        assert_eq!(refs::is_same_object(env, global, global), TRUE);

        refs::delete_global_ref(env, global);
        assert_eq!(refs::get_object_ref_type(env, global), jobjectRefType::JNIInvalidRefType);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_pop_local_frame_promotes_result() {
    let (_bridge, env) = attach();
    unsafe {
        assert_eq!(refs::push_local_frame(env, 8), status::OK);
        let text = CString::new("kept").unwrap();
        let inner = strings::new_string_utf(env, text.as_ptr());
        let promoted = refs::pop_local_frame(env, inner);
        assert!(!promoted.is_null());
        assert_eq!(refs::get_object_ref_type(env, promoted), jobjectRefType::JNILocalRefType);
        assert_eq!(strings::get_string_length(env, promoted), 4);
    }
}

#[test]
fn test_frames_release_their_locals() {
    let (_bridge, env) = attach();
    unsafe {
        let ctx = (*env).context();
        let class = object_class(env);
        let before = ctx.local_count();
        let depth = ctx.frame_depth();
        for n in 0..3 {
            assert_eq!(refs::push_local_frame(env, 2), status::OK);
            for _ in 0..=n {
                assert!(!classes::alloc_object(env, class).is_null());
            }
        }
        assert_eq!(ctx.frame_depth(), depth + 3);
        assert_eq!(ctx.local_count(), before + 6);
        for _ in 0..3 {
            refs::pop_local_frame(env, ptr::null_mut());
        }
        assert_eq!(ctx.frame_depth(), depth);
        assert_eq!(ctx.local_count(), before);
    }
}

#[test]
fn test_delete_local_ref_releases_slot() {
    let (_bridge, env) = attach();
    unsafe {
        let ctx = (*env).context();
        let class = object_class(env);
        let before = ctx.local_count();
        let copy = refs::new_local_ref(env, class);
        assert_eq!(ctx.local_count(), before + 1);
        assert_eq!(refs::is_same_object(env, copy, class), TRUE);
        refs::delete_local_ref(env, copy);
        assert_eq!(ctx.local_count(), before);
        refs::delete_local_ref(env, ptr::null_mut());
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_weak_global_ref_kind() {
    let (_bridge, env) = attach();
    unsafe {
        let class = object_class(env);
        let weak = refs::new_weak_global_ref(env, class);
        assert_eq!(refs::get_object_ref_type(env, weak), jobjectRefType::JNIWeakGlobalRefType);
        assert_eq!(refs::is_same_object(env, weak, class), TRUE);
        refs::delete_weak_global_ref(env, weak);
        assert_eq!(refs::get_object_ref_type(env, weak), jobjectRefType::JNIInvalidRefType);
    }
}

#[test]
fn test_null_handles() {
    let (_bridge, env) = attach();
    unsafe {
        let null: jobject = ptr::null_mut();
        assert_eq!(refs::is_same_object(env, null, null), TRUE);
        assert!(refs::new_global_ref(env, null).is_null());
        assert!(refs::new_local_ref(env, null).is_null());
        assert_eq!(refs::get_object_ref_type(env, null), jobjectRefType::JNIInvalidRefType);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_negative_capacity_raises() {
    let (_bridge, env) = attach();
    unsafe {
        assert_eq!(refs::ensure_local_capacity(env, -1), status::ERR);
        assert_eq!(pending_kind(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
        exceptions::exception_clear(env);
        assert_eq!(refs::push_local_frame(env, -5), status::ERR);
        assert_eq!(exceptions::exception_check(env), TRUE);
    }
}

#[test]
fn test_local_limit_reports_out_of_memory() {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    let config = BridgeConfig {
        max_locals: 4,
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(vm, config).unwrap();
    let env = bridge.attach_current_thread();
    unsafe {
        assert_eq!(refs::ensure_local_capacity(env, 17), status::ERR);
        assert_eq!(pending_kind(env).as_deref(), Some(ErrorKind::OutOfMemory.class_name()));
    }
}

#[test]
fn test_pop_local_frame_into_full_parent_reports_out_of_memory() {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    let config = BridgeConfig {
        max_locals: 16,
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(vm, config).unwrap();
    let env = bridge.attach_current_thread();
    unsafe {
        let ctx = (*env).context();
        let class = object_class(env);
        while ctx.local_count() < 16 {
            assert!(!refs::new_local_ref(env, class).is_null());
        }
        assert_eq!(refs::push_local_frame(env, 0), status::OK);
        assert!(refs::pop_local_frame(env, class).is_null());
        assert_eq!(pending_kind(env).as_deref(), Some(ErrorKind::OutOfMemory.class_name()));
        assert_eq!(ctx.frame_depth(), 1);
    }
}

#[test]
fn test_released_local_does_not_alias_new_local() {
    let (_bridge, env) = attach();
    unsafe {
        let class = object_class(env);
        let deleted = refs::new_local_ref(env, class);
        refs::delete_local_ref(env, deleted);
        let name = CString::new("x").unwrap();
        let fresh = strings::new_string_utf(env, name.as_ptr());
        assert!(!fresh.is_null());
        assert_eq!(refs::get_object_ref_type(env, deleted), jobjectRefType::JNIInvalidRefType);
        assert_eq!(refs::get_object_ref_type(env, fresh), jobjectRefType::JNILocalRefType);

        assert_eq!(refs::push_local_frame(env, 4), status::OK);
        let inner = strings::new_string_utf(env, name.as_ptr());
        let promoted = refs::pop_local_frame(env, inner);
        assert!(!promoted.is_null());
        assert_ne!(promoted, inner);
        assert_eq!(refs::get_object_ref_type(env, inner), jobjectRefType::JNIInvalidRefType);
        assert_eq!(refs::is_same_object(env, promoted, fresh), FALSE);
    }
}
