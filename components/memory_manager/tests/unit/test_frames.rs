//! Unit tests for local frames

use std::sync::Arc;

use memory_manager::{AllocError, FrameError, Handle, LocalFrames, MIN_LOCAL_CAPACITY};
use object_model::{GuestRuntime, ObjectRef, Vm, VmConfig};

fn object(vm: &Vm, tag: u16) -> ObjectRef {
    vm.new_string(vec![tag]).unwrap()
}

#[test]
fn test_push_allocate_pop_restores_count() {
    let vm = Vm::new(VmConfig::default());
    for n in [0usize, 1, 5, 16, 40] {
        for promote in [false, true] {
            let mut locals = LocalFrames::default();
            locals.handlify(Some(object(&vm, 1))).unwrap();
            let before = locals.live_count();

            locals.push_frame(4).unwrap();
            let mut last = Handle::NULL;
            for i in 0..n {
                last = locals.handlify(Some(object(&vm, i as u16))).unwrap();
            }
            let result = if promote { locals.resolve(last) } else { None };
            let promoted = locals.pop_frame(result).unwrap();

            let expected = before + usize::from(!promoted.is_null());
            assert_eq!(locals.live_count(), expected, "n={n} promote={promote}");
            assert!(locals.live_count() <= before + 1);
        }
    }
}

#[test]
fn test_nested_frames_pop_in_order() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    locals.push_frame(2).unwrap();
    let a = locals.handlify(Some(object(&vm, 1))).unwrap();
    locals.push_frame(2).unwrap();
    let b = locals.handlify(Some(object(&vm, 2))).unwrap();
    assert_eq!(locals.depth(), 3);

    locals.pop_frame(None).unwrap();
    assert!(locals.is_live(a));
    assert!(!locals.is_live(b));
    locals.pop_frame(None).unwrap();
    assert!(!locals.is_live(a));
    assert_eq!(locals.live_count(), 0);
}

#[test]
fn test_parent_local_deleted_in_child_frame() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    let parent = locals.handlify(Some(object(&vm, 1))).unwrap();
    locals.push_frame(4).unwrap();
    assert!(locals.delete(parent));
    let child = locals.handlify(Some(object(&vm, 2))).unwrap();
    assert_ne!(child, parent);
    locals.pop_frame(None).unwrap();
    assert!(!locals.is_live(child));
    assert_eq!(locals.live_count(), 0);
}

#[test]
fn test_capacity_hint_is_advisory() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    locals.push_frame(1).unwrap();
    for i in 0..50 {
        locals.handlify(Some(object(&vm, i))).unwrap();
    }
    assert_eq!(locals.live_count(), 50);
    locals.ensure_capacity(100).unwrap();
    assert_eq!(locals.frame_capacity(), 100);
}

#[test]
fn test_reset_clears_everything() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    locals.handlify(Some(object(&vm, 1))).unwrap();
    locals.push_frame(1).unwrap();
    locals.handlify(Some(object(&vm, 2))).unwrap();
    locals.reset();
    assert_eq!(locals.depth(), 1);
    assert_eq!(locals.live_count(), 0);
}

#[test]
fn test_deleted_handle_does_not_resolve_to_new_occupant() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    let keep = locals.handlify(Some(object(&vm, 1))).unwrap();
    let a = locals.handlify(Some(object(&vm, 2))).unwrap();
    let _b = locals.handlify(Some(object(&vm, 3))).unwrap();
    assert!(locals.delete(a));
    let y = object(&vm, 4);
    let reused = locals.handlify(Some(Arc::clone(&y))).unwrap();
    assert_ne!(reused, a);
    assert!(locals.resolve(a).is_none());
    assert!(!locals.is_live(a));
    assert!(!locals.delete(a));
    assert!(Arc::ptr_eq(&locals.resolve(reused).unwrap(), &y));
    assert!(locals.is_live(keep));
}

#[test]
fn test_popped_handle_does_not_alias_promoted_result() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    locals.push_frame(4).unwrap();
    let inner = locals.handlify(Some(object(&vm, 1))).unwrap();
    let y = object(&vm, 2);
    let promoted = locals.pop_frame(Some(Arc::clone(&y))).unwrap();
    assert_ne!(promoted, inner);
    assert!(!locals.is_live(inner));
    assert!(locals.resolve(inner).is_none());
    assert!(Arc::ptr_eq(&locals.resolve(promoted).unwrap(), &y));
}

#[test]
fn test_reset_invalidates_outstanding_handles() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    let before = locals.handlify(Some(object(&vm, 1))).unwrap();
    locals.reset();
    let after = locals.handlify(Some(object(&vm, 2))).unwrap();
    assert_ne!(after, before);
    assert!(locals.resolve(before).is_none());
    assert!(locals.is_live(after));
}

#[test]
fn test_slot_reuse_never_revives_old_handles() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    let mut stale = Vec::new();
    for i in 0..600u16 {
        let h = locals.handlify(Some(object(&vm, i))).unwrap();
        assert!(locals.delete(h));
        stale.push(h);
    }
    let current = locals.handlify(Some(object(&vm, 0))).unwrap();
    assert!(stale.iter().all(|&h| h != current && locals.resolve(h).is_none()));
}

#[test]
fn test_failed_promotion_is_allocation_failure() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::new(MIN_LOCAL_CAPACITY);
    for i in 0..MIN_LOCAL_CAPACITY {
        locals.handlify(Some(object(&vm, i as u16))).unwrap();
    }
    locals.push_frame(0).unwrap();
    let result = locals.pop_frame(Some(object(&vm, 99)));
    assert_eq!(
        result,
        Err(FrameError::Promotion(AllocError::LocalLimit { limit: MIN_LOCAL_CAPACITY }))
    );
    assert_eq!(locals.depth(), 1);
    assert_eq!(locals.live_count(), MIN_LOCAL_CAPACITY);
}
