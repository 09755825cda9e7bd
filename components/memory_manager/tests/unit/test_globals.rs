//! Unit tests for the shared global table

use std::sync::Arc;
use std::thread;

use core_types::RefKind;
use memory_manager::{GlobalTable, LocalFrames};
use object_model::{GuestRuntime, Vm, VmConfig};

#[test]
fn test_global_survives_frame_pops() {
    let vm = Vm::new(VmConfig::default());
    let mut locals = LocalFrames::default();
    let globals = GlobalTable::default();

    locals.push_frame(4).unwrap();
    locals.push_frame(4).unwrap();
    let local = locals.handlify(Some(vm.new_string(vec![0x7a]).unwrap())).unwrap();
    let global = globals.create_global(locals.resolve(local)).unwrap();
    while locals.depth() > 1 {
        locals.pop_frame(None).unwrap();
    }
    assert!(locals.resolve(local).is_none());
    let object = globals.resolve(global).unwrap();
    assert_eq!(object.to_rust_string().as_deref(), Some("z"));
}

#[test]
fn test_global_kind_until_deleted() {
    let vm = Vm::new(VmConfig::default());
    let globals = GlobalTable::default();
    let h = globals.create_global(Some(vm.new_string(vec![]).unwrap())).unwrap();
    assert_eq!(h.tag_kind(), RefKind::Global);
    assert!(globals.is_live(h));
    globals.delete(h).unwrap();
    assert!(!globals.is_live(h));
    assert!(globals.resolve(h).is_none());
}

#[test]
fn test_concurrent_create_delete() {
    let vm = Arc::new(Vm::new(VmConfig::default()));
    let globals = Arc::new(GlobalTable::default());
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let vm = Arc::clone(&vm);
            let globals = Arc::clone(&globals);
            thread::spawn(move || {
                for _ in 0..250 {
                    let h = globals.create_global(Some(vm.new_string(vec![1]).unwrap())).unwrap();
                    assert!(globals.resolve(h).is_some());
                    globals.delete(h).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(globals.live_count(), 0);
}

#[test]
fn test_stale_global_stays_dead_across_many_reuses() {
    let vm = Vm::new(VmConfig::default());
    let globals = GlobalTable::default();
    let first = globals.create_global(Some(vm.new_string(vec![]).unwrap())).unwrap();
    globals.delete(first).unwrap();
    for _ in 0..1000 {
        let next = globals.create_global(Some(vm.new_string(vec![]).unwrap())).unwrap();
        assert_ne!(next, first);
        assert!(globals.resolve(first).is_none());
        assert!(!globals.is_live(first));
        globals.delete(next).unwrap();
    }
    assert_eq!(globals.live_count(), 0);
}
