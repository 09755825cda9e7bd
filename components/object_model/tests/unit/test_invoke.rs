//! Unit tests for invocation and dispatch

use std::sync::Arc;

use core_types::Kind;
use object_model::{ClassBuilder, GuestResult, GuestRuntime, Method, NativeLinker, ObjectRef, Value, Vm, VmConfig};

fn animals(vm: &Vm) {
    vm.define_class(
        ClassBuilder::new("t/Animal")
            .abstract_class()
            .method("<init>", "()V", |_, _, _| Ok(Value::Void))
            .abstract_method("legs", "()I")
            .method("describe", "()I", |vm, this, _| {
                let this = this.cloned().unwrap();
                let legs = vm.resolve_method(this.class(), "legs", "()I", false)?;
                vm.invoke_virtual(&legs, &this, &[])
            }),
    )
    .unwrap();
    vm.define_class(
        ClassBuilder::new("t/Bird")
            .superclass("t/Animal")
            .method("legs", "()I", |_, _, _| Ok(Value::Int(2))),
    )
    .unwrap();
}

#[test]
fn test_virtual_dispatch_selects_override() {
    let vm = Vm::new(VmConfig::default());
    animals(&vm);
    let animal = vm.find_class("t/Animal").unwrap();
    let bird = vm.find_class("t/Bird").unwrap();
    let legs = vm.resolve_method(&animal, "legs", "()I", false).unwrap();
    let tweety = vm.construct(&bird, "()V", &[]).unwrap();
    assert_eq!(vm.invoke_virtual(&legs, &tweety, &[]).unwrap(), Value::Int(2));

    let describe = vm.resolve_method(&bird, "describe", "()I", false).unwrap();
    assert_eq!(vm.invoke_virtual(&describe, &tweety, &[]).unwrap(), Value::Int(2));
}

#[test]
fn test_direct_invoke_of_abstract_method() {
    let vm = Vm::new(VmConfig::default());
    animals(&vm);
    let animal = vm.find_class("t/Animal").unwrap();
    let bird = vm.find_class("t/Bird").unwrap();
    let legs = vm.resolve_method(&animal, "legs", "()I", false).unwrap();
    let tweety = vm.allocate_instance(&bird).unwrap();
    let err = vm.invoke(&legs, Some(&tweety), &[]).unwrap_err();
    assert_eq!(err.class_name(), "java/lang/AbstractMethodError");
    let err = vm.allocate_instance(&animal).unwrap_err();
    assert_eq!(err.class_name(), "java/lang/InstantiationException");
}

#[test]
fn test_invoke_checks_arity_and_receiver() {
    let vm = Vm::new(VmConfig::default());
    animals(&vm);
    let bird = vm.find_class("t/Bird").unwrap();
    let legs = vm.resolve_method(&bird, "legs", "()I", false).unwrap();
    let err = vm.invoke(&legs, None, &[]).unwrap_err();
    assert_eq!(err.class_name(), "java/lang/NullPointerException");
    let tweety = vm.allocate_instance(&bird).unwrap();
    let err = vm.invoke(&legs, Some(&tweety), &[Value::Int(1)]).unwrap_err();
    assert_eq!(err.class_name(), "java/lang/IllegalArgumentException");
}

#[test]
fn test_deep_recursion_raises_stack_overflow() {
    let vm = Vm::new(VmConfig { max_call_depth: 32 });
    vm.define_class(ClassBuilder::new("t/Loop").static_method("spin", "(I)I", |vm, _, args| {
        vm.invoke_static("t/Loop", "spin", "(I)I", args)
    }))
    .unwrap();
    let err = vm.invoke_static("t/Loop", "spin", "(I)I", &[Value::Int(0)]).unwrap_err();
    assert_eq!(err.class_name(), "java/lang/StackOverflowError");

    // the depth counter unwinds with the calls
    vm.define_class(ClassBuilder::new("t/One").static_method("one", "()I", |_, _, _| Ok(Value::Int(1))))
        .unwrap();
    assert_eq!(vm.invoke_static("t/One", "one", "()I", &[]).unwrap(), Value::Int(1));
}

struct Doubler;

impl NativeLinker for Doubler {
    fn invoke_native(&self, _: &Arc<Method>, _: Option<&ObjectRef>, args: &[Value]) -> GuestResult<Value> {
        Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
    }
}

#[test]
fn test_native_methods_use_installed_linker() {
    let vm = Vm::new(VmConfig::default());
    vm.define_class(ClassBuilder::new("t/Native").static_native_method("twice", "(I)I"))
        .unwrap();
    let err = vm.invoke_static("t/Native", "twice", "(I)I", &[Value::Int(4)]).unwrap_err();
    assert_eq!(err.class_name(), "java/lang/UnsatisfiedLinkError");

    vm.set_native_linker(Arc::new(Doubler));
    let result = vm.invoke_static("t/Native", "twice", "(I)I", &[Value::Int(4)]).unwrap();
    assert_eq!(result, Value::Int(8));
    assert_eq!(result.kind(), Kind::Int);
}
