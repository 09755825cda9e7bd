//! The collaborator surface the native bridge consumes.
//!
//! The bridge never looks inside the type system: member resolution, class
//! initialization, allocation, virtual dispatch and invocation all go through
//! [`GuestRuntime`]. Native method bodies flow the other way, through the
//! [`NativeLinker`] the bridge installs.

use std::fmt;
use std::sync::Arc;

use core_types::{GuestError, Kind};

use crate::class::{Class, Field, Method};
use crate::value::{ObjectRef, Value};

/// A guest throwable in flight.
#[derive(Clone)]
pub struct Thrown(pub ObjectRef);

impl Thrown {
    /// The throwable object.
    pub fn object(&self) -> &ObjectRef {
        &self.0
    }

    /// The throwable's class name.
    pub fn class_name(&self) -> &str {
        self.0.class().name()
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thrown({})", self.0.class().name())
    }
}

/// Result of a guest operation: a value or a thrown guest exception.
pub type GuestResult<T> = Result<T, Thrown>;

/// Runs native method bodies on behalf of the guest runtime.
pub trait NativeLinker: Send + Sync {
    /// Invokes the native implementation of `method`.
    ///
    /// `receiver` is `None` for static methods. Arguments are in
    /// declaration order.
    fn invoke_native(&self, method: &Arc<Method>, receiver: Option<&ObjectRef>, args: &[Value]) -> GuestResult<Value>;
}

/// Operations the native bridge needs from the guest runtime.
pub trait GuestRuntime: Send + Sync {
    /// Looks a class up by internal name, array names included.
    fn find_class(&self, name: &str) -> GuestResult<Arc<Class>>;

    /// Resolves a field by name and descriptor.
    fn resolve_field(&self, class: &Arc<Class>, name: &str, descriptor: &str, is_static: bool) -> GuestResult<Arc<Field>>;

    /// Resolves a method by name and descriptor.
    fn resolve_method(
        &self,
        class: &Arc<Class>,
        name: &str,
        descriptor: &str,
        is_static: bool,
    ) -> GuestResult<Arc<Method>>;

    /// Runs the static initializer of `class` (and its superclasses) once.
    fn initialize_class(&self, class: &Arc<Class>) -> GuestResult<()>;

    /// Allocates an instance with every field at its default value.
    /// Constructors are not run.
    fn allocate_instance(&self, class: &Arc<Class>) -> GuestResult<ObjectRef>;

    /// Selects the implementation of `method` for `receiver_class`.
    fn vtable_lookup(&self, receiver_class: &Arc<Class>, method: &Arc<Method>) -> GuestResult<Arc<Method>>;

    /// Invokes exactly `method`, without virtual dispatch.
    fn invoke(&self, method: &Arc<Method>, receiver: Option<&ObjectRef>, args: &[Value]) -> GuestResult<Value>;

    /// Creates a string from UTF-16 code units.
    fn new_string(&self, units: Vec<u16>) -> GuestResult<ObjectRef>;

    /// Creates a zero-filled primitive array.
    fn new_primitive_array(&self, kind: Kind, len: i32) -> GuestResult<ObjectRef>;

    /// Creates a reference array with every element set to `init`.
    fn new_object_array(&self, element: &Arc<Class>, len: i32, init: Option<ObjectRef>) -> GuestResult<ObjectRef>;

    /// Materializes a guest error into a throwable object.
    fn materialize(&self, error: &GuestError) -> ObjectRef;

    /// Creates a throwable of `class` carrying `message`.
    fn new_throwable(&self, class: &Arc<Class>, message: Option<&str>) -> GuestResult<ObjectRef>;

    /// The class object standing for `class`.
    fn class_mirror(&self, class: &Arc<Class>) -> ObjectRef;

    /// A reflection object for a method or constructor.
    fn reflect_method(&self, method: &Arc<Method>) -> GuestResult<ObjectRef>;

    /// A reflection object for a field.
    fn reflect_field(&self, field: &Arc<Field>) -> GuestResult<ObjectRef>;

    /// Installs the linker that runs native method bodies.
    fn set_native_linker(&self, linker: Arc<dyn NativeLinker>);

    /// Wraps a guest error as a thrown exception.
    fn throw(&self, error: GuestError) -> Thrown {
        Thrown(self.materialize(&error))
    }
}
