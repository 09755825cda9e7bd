//! Unit tests for string entry points

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use core_types::abi::{FALSE, TRUE};
use core_types::ErrorKind;
use native_bridge::entries::{exceptions, strings};
use native_bridge::sys::{jboolean, jchar};
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
fn test_utf_chars_round_trip() {
    let (bridge, env) = attach();
    unsafe {
        let text = CString::new("h\u{e9}llo").unwrap();
        let string = strings::new_string_utf(env, text.as_ptr());
        assert_eq!(strings::get_string_length(env, string), 5);
        assert_eq!(strings::get_string_utf_length(env, string), 6);
        assert_eq!(strings::get_string_utf_length_as_long(env, string), 6);

        let mut is_copy: jboolean = FALSE;
        let chars = strings::get_string_utf_chars(env, string, &mut is_copy);
        assert_eq!(is_copy, TRUE);
        assert_eq!(CStr::from_ptr(chars).to_str().unwrap(), "h\u{e9}llo");
        assert_eq!(bridge.buffers().live_blocks(), 1);

        strings::release_string_utf_chars(env, string, chars);
        assert_eq!(bridge.buffers().live_blocks(), 0);
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_modified_utf8_lengths() {
    let (_bridge, env) = attach();
    unsafe {
        // U+1F600 as a surrogate pair, then an embedded NUL
        let units: [jchar; 3] = [0xD83D, 0xDE00, 0x0000];
        let string = strings::new_string(env, units.as_ptr(), 3);
        assert_eq!(strings::get_string_length(env, string), 3);
        assert_eq!(strings::get_string_utf_length(env, string), 3 + 3 + 2);

        let mut buf = [0x7F as c_char; 9];
        strings::get_string_utf_region(env, string, 2, 1, buf.as_mut_ptr());
        assert_eq!(buf[0] as u8, 0xC0);
        assert_eq!(buf[1] as u8, 0x80);
        assert_eq!(buf[2], 0);
        assert_eq!(buf[3], 0x7F);
    }
}

#[test]
fn test_string_chars_copy_units() {
    let (bridge, env) = attach();
    unsafe {
        let units: [jchar; 2] = [0x41, 0x263A];
        let string = strings::new_string(env, units.as_ptr(), 2);
        let chars = strings::get_string_chars(env, string, ptr::null_mut());
        assert_eq!(std::slice::from_raw_parts(chars, 2), &units);
        strings::release_string_chars(env, string, chars);

        let critical = strings::get_string_critical(env, string, ptr::null_mut());
        assert_eq!(*critical.add(1), 0x263A);
        strings::release_string_critical(env, string, critical);
        assert_eq!(bridge.buffers().live_blocks(), 0);
    }
}

#[test]
fn test_string_region_bounds() {
    let (_bridge, env) = attach();
    unsafe {
        let text = CString::new("abc").unwrap();
        let string = strings::new_string_utf(env, text.as_ptr());

        let mut buf: [jchar; 4] = [0xFFFF; 4];
        strings::get_string_region(env, string, 1, 2, buf.as_mut_ptr());
        assert_eq!(buf, [b'b' as jchar, b'c' as jchar, 0xFFFF, 0xFFFF]);

        let mut untouched: [jchar; 4] = [0xFFFF; 4];
        strings::get_string_region(env, string, 2, 2, untouched.as_mut_ptr());
        assert_eq!(untouched, [0xFFFF; 4]);
        assert_eq!(
            pending_class(env).as_deref(),
            Some(ErrorKind::StringIndexOutOfBounds.class_name())
        );
    }
}

#[test]
fn test_new_string_utf_null_is_null() {
    let (_bridge, env) = attach();
    unsafe {
        assert!(strings::new_string_utf(env, ptr::null()).is_null());
        assert_eq!(exceptions::exception_check(env), FALSE);
    }
}

#[test]
fn test_length_of_non_string_raises() {
    let (_bridge, env) = attach();
    unsafe {
        let name = CString::new("java/lang/Object").unwrap();
        let class = native_bridge::entries::classes::find_class(env, name.as_ptr());
        assert_eq!(strings::get_string_length(env, class), 0);
        assert_eq!(pending_class(env).as_deref(), Some(ErrorKind::IllegalArgument.class_name()));
    }
}
