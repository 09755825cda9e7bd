//! Contract tests verifying the memory_manager API.
//! These tests pin the handle semantics native code depends on.

use std::sync::Arc;

use core_types::{ContractViolation, RefKind};
use memory_manager::{
    AllocError, FrameError, GlobalTable, Handle, LocalFrames, NativeBufferRegistry, MIN_LOCAL_CAPACITY,
};
use object_model::{GuestRuntime, ObjectRef, Vm, VmConfig};

fn object(vm: &Vm) -> ObjectRef {
    vm.new_string("x".encode_utf16().collect()).unwrap()
}

/// Test Handle contract: raw value 0 is the null handle
#[test]
fn contract_null_handle_is_zero() {
    assert_eq!(Handle::NULL.raw(), 0);
    assert!(Handle::from_raw(0).is_null());
}

/// Test Handle contract: every kind tags its handles distinctly
#[test]
fn contract_handle_tags_match_ref_kind_codes() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    let globals = GlobalTable::default();
    let local = locals.handlify(Some(object(&vm))).unwrap();
    let global = globals.create_global(Some(object(&vm))).unwrap();
    let weak = globals.create_weak(Some(object(&vm))).unwrap();
    assert_eq!(local.tag_kind().code(), 1);
    assert_eq!(global.tag_kind().code(), 2);
    assert_eq!(weak.tag_kind().code(), 3);
}

/// Test LocalFrames contract: the root frame holds at least 16 locals
#[test]
fn contract_root_frame_minimum_capacity() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::new(0);
    for _ in 0..MIN_LOCAL_CAPACITY {
        assert!(locals.handlify(Some(object(&vm))).is_ok());
    }
}

/// Test LocalFrames contract: pop_frame(result) -> handle in the parent frame
#[test]
fn contract_pop_frame_promotes_result() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    locals.push_frame(8).unwrap();
    let temp = object(&vm);
    let h = locals.handlify(Some(Arc::clone(&temp))).unwrap();
    let promoted = locals.pop_frame(locals.resolve(h)).unwrap();
    assert_eq!(promoted.tag_kind(), RefKind::Local);
    assert!(Arc::ptr_eq(&locals.resolve(promoted).unwrap(), &temp));
    assert_eq!(locals.depth(), 1);
}

/// Test LocalFrames contract: pop without push is a contract violation
#[test]
fn contract_unbalanced_pop() {
    let mut locals = LocalFrames::default();
    assert_eq!(
        locals.pop_frame(None),
        Err(FrameError::Unbalanced(ContractViolation::UnbalancedFrame))
    );
}

/// Test GlobalTable contract: create_global(None) -> null handle, no error
#[test]
fn contract_global_of_null() {
    let globals = GlobalTable::default();
    assert_eq!(globals.create_global(None), Ok(Handle::NULL));
    assert_eq!(globals.create_weak(None), Ok(Handle::NULL));
    assert_eq!(globals.live_count(), 0);
}

/// Test GlobalTable contract: exhaustion is an allocation error
#[test]
fn contract_global_limit() {
    let vm = Vm::new(VmConfig::default());
    let globals = GlobalTable::new(2);
    globals.create_global(Some(object(&vm))).unwrap();
    globals.create_global(Some(object(&vm))).unwrap();
    assert_eq!(
        globals.create_global(Some(object(&vm))),
        Err(AllocError::GlobalLimit { limit: 2 })
    );
}

/// Test NativeBufferRegistry contract: release(unknown) -> contract violation
#[test]
fn contract_release_unknown_buffer() {
    let registry = NativeBufferRegistry::default();
    assert_eq!(registry.release(0xdead_0000), Err(ContractViolation::UnknownBuffer(0xdead_0000)));
}
