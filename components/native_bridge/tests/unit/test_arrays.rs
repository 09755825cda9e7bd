//! Unit tests for array entry points

use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

use core_types::abi::{ABORT, COMMIT, FALSE, TRUE};
use core_types::ErrorKind;
use native_bridge::entries::{arrays, classes, exceptions, refs, strings};
use native_bridge::sys::{jboolean, jint};
use native_bridge::{Bridge, BridgeConfig, JniEnv};
use object_model::{Vm, VmConfig};

fn attach() -> (Bridge, *mut JniEnv) {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    let bridge = Bridge::new(vm, BridgeConfig::default()).unwrap();
    let env = bridge.attach_current_thread();
    (bridge, env)
}

unsafe fn pending_class(env: *mut JniEnv) -> Option<String> {
    let ctx = unsafe { (*env).context() };
    ctx.pending().get().map(|t| t.class().name().to_string())
}

#[test]
fn test_int_region_round_trip() {
    let (_bridge, env) = attach();
    unsafe {
        let array = arrays::new_int_array(env, 4);
        assert_eq!(arrays::get_array_length(env, array), 4);

        let values: [jint; 4] = [1, 2, 3, 4];
        arrays::set_int_array_region(env, array, 0, 4, values.as_ptr());
        let mut middle = [0 as jint; 2];
        arrays::get_int_array_region(env, array, 1, 2, middle.as_mut_ptr());
        assert_eq!(middle, [2, 3]);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_region_out_of_bounds_copies_nothing() {
    let (_bridge, env) = attach();
    unsafe {
        let array = arrays::new_boolean_array(env, 4);
        let mut buf: [jboolean; 5] = [9; 5];
        arrays::get_boolean_array_region(env, array, 2, 5, buf.as_mut_ptr());
        assert_eq!(buf, [9; 5]);
        assert_eq!(
            pending_class(env).as_deref(),
            Some(ErrorKind::ArrayIndexOutOfBounds.class_name())
        );
        exceptions::exception_clear(env);

        let ones: [jboolean; 4] = [1; 4];
        arrays::set_boolean_array_region(env, array, -1, 2, ones.as_ptr());
        assert_eq!(exceptions::exception_check(env), TRUE);
        let mut check: [jboolean; 4] = [9; 4];
        exceptions::exception_clear(env);
        arrays::get_boolean_array_region(env, array, 0, 4, check.as_mut_ptr());
        assert_eq!(check, [0; 4]);
    }
}

#[test]
fn test_release_modes() {
    let (bridge, env) = attach();
    unsafe {
        let array = arrays::new_long_array(env, 3);

        let elements = arrays::get_long_array_elements(env, array, ptr::null_mut());
        *elements.add(1) = 42;
        arrays::release_long_array_elements(env, array, elements, ABORT);
        assert_eq!(bridge.buffers().live_blocks(), 0);
        let mut current = [0i64; 3];
        arrays::get_long_array_region(env, array, 0, 3, current.as_mut_ptr());
        assert_eq!(current, [0, 0, 0]);

        let mut is_copy: jboolean = FALSE;
        let elements = arrays::get_long_array_elements(env, array, &mut is_copy);
        assert_eq!(is_copy, TRUE);
        *elements.add(2) = 7;
        arrays::release_long_array_elements(env, array, elements, COMMIT);
        assert_eq!(bridge.buffers().live_blocks(), 1);
        arrays::get_long_array_region(env, array, 0, 3, current.as_mut_ptr());
        assert_eq!(current, [0, 0, 7]);

        *elements = -1;
        arrays::release_long_array_elements(env, array, elements, 0);
        assert_eq!(bridge.buffers().live_blocks(), 0);
        arrays::get_long_array_region(env, array, 0, 3, current.as_mut_ptr());
        assert_eq!(current, [-1, 0, 7]);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_unknown_release_mode_raises() {
    let (bridge, env) = attach();
    unsafe {
        let array = arrays::new_short_array(env, 2);
        let elements = arrays::get_short_array_elements(env, array, ptr::null_mut());
        arrays::release_short_array_elements(env, array, elements, 9);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
        assert_eq!(bridge.buffers().live_blocks(), 1);
        exceptions::exception_clear(env);
        arrays::release_short_array_elements(env, array, elements, ABORT);
        assert_eq!(bridge.buffers().live_blocks(), 0);
    }
}

#[test]
fn test_critical_access_copies_any_primitive_array() {
    let (bridge, env) = attach();
    unsafe {
        let array = arrays::new_double_array(env, 2);
        let critical = arrays::get_primitive_array_critical(env, array, ptr::null_mut()).cast::<f64>();
        *critical = 0.5;
        arrays::release_primitive_array_critical(env, array, critical.cast(), 0);
        let mut values = [0f64; 2];
        arrays::get_double_array_region(env, array, 0, 2, values.as_mut_ptr());
        assert_eq!(values, [0.5, 0.0]);
        assert_eq!(bridge.buffers().live_blocks(), 0);
    }
}

#[test]
fn test_element_kind_must_match_entry() {
    let (bridge, env) = attach();
    unsafe {
        let bytes = arrays::new_byte_array(env, 8);
        assert!(arrays::get_int_array_elements(env, bytes, ptr::null_mut()).is_null());
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
        assert_eq!(bridge.buffers().live_blocks(), 0);
    }
}

#[test]
fn test_negative_length_raises() {
    let (_bridge, env) = attach();
    unsafe {
        assert!(arrays::new_float_array(env, -1).is_null());
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::NegativeArraySize.class_name()));
    }
}

#[test]
fn test_object_array_elements() {
    let (_bridge, env) = attach();
    unsafe {
        let string_name = CString::new("java/lang/String").unwrap();
        let string_class = classes::find_class(env, string_name.as_ptr());
        let array = arrays::new_object_array(env, 2, string_class, ptr::null_mut());
        assert_eq!(arrays::get_array_length(env, array), 2);
        assert!(arrays::get_object_array_element(env, array, 0).is_null());

        let text = CString::new("x").unwrap();
        let value = strings::new_string_utf(env, text.as_ptr());
        arrays::set_object_array_element(env, array, 1, value);
        let stored = arrays::get_object_array_element(env, array, 1);
        assert_eq!(refs::is_same_object(env, stored, value), TRUE);

        arrays::get_object_array_element(env, array, 2);
        assert_eq!(
            pending_class(env).as_deref(),
            Some(ErrorKind::ArrayIndexOutOfBounds.class_name())
        );
        exceptions::exception_clear(env);

        // a class object is not a string
        arrays::set_object_array_element(env, array, 0, string_class);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::ArrayStore.class_name()));
        exceptions::exception_clear(env);
        assert!(arrays::get_object_array_element(env, array, 0).is_null());
    }
}
