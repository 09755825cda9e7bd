//! Guest classes and their members.
//!
//! A [`Class`] is immutable once defined apart from its static field values,
//! its initialization state and its lazily created class object. Fields and
//! methods point back at their declaring class through weak references so
//! that a class can own its members without a reference cycle.
//!
//! Classes are described with a [`ClassBuilder`] and defined through
//! [`Vm::define_class`](crate::Vm::define_class).

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, ThreadId};

use core_types::{DescriptorError, Kind, MethodDescriptor, TypeDescriptor};
use parking_lot::{Condvar, Mutex, RwLock};
use thiserror::Error;

use crate::runtime::{GuestResult, GuestRuntime};
use crate::value::{ObjectRef, Value};
use crate::vm::Vm;

/// A guest method body written in Rust.
///
/// Receives the VM, the receiver (`None` for static methods) and the
/// arguments in declaration order.
pub type GuestFn = Arc<dyn Fn(&Vm, Option<&ObjectRef>, &[Value]) -> GuestResult<Value> + Send + Sync>;

/// Name of the instance initializer method.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name of the static initializer method.
pub const INITIALIZER_NAME: &str = "<clinit>";

/// Errors raised while defining a class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefineError {
    /// A member descriptor did not parse
    #[error("bad descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    /// The named superclass or interface is not defined
    #[error("unknown class {0}")]
    UnknownClass(String),
    /// A class with this name is already defined
    #[error("class {0} is already defined")]
    Duplicate(String),
    /// Two members share a name and descriptor
    #[error("duplicate member {0}")]
    DuplicateMember(String),
}

/// Element type of an array class.
#[derive(Clone)]
pub enum Component {
    /// A primitive element kind
    Primitive(Kind),
    /// A reference element class
    Reference(Arc<Class>),
}

/// What sort of type a class is.
#[derive(Clone)]
pub enum ClassKind {
    /// An instantiable class
    Concrete,
    /// An abstract class
    Abstract,
    /// An interface
    Interface,
    /// An array class
    Array(Component),
}

/// A field declared by a class.
pub struct Field {
    name: String,
    descriptor: TypeDescriptor,
    is_static: bool,
    slot: usize,
    declaring: Weak<Class>,
}

impl Field {
    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field type.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// The kind of the values this field holds.
    pub fn kind(&self) -> Kind {
        self.descriptor.kind()
    }

    /// Returns true for static fields.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Index into the instance field vector, or the static field vector.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// The class that declares this field.
    pub fn declaring_class(&self) -> Option<Arc<Class>> {
        self.declaring.upgrade()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({}:{})", self.name, self.descriptor)
    }
}

/// How a method executes.
#[derive(Clone)]
pub enum MethodBody {
    /// Guest code expressed as a Rust closure
    Rust(GuestFn),
    /// Implemented by native code behind the installed native linker
    Native,
    /// No body; must be overridden
    Abstract,
}

/// A method declared by a class.
pub struct Method {
    name: String,
    descriptor: MethodDescriptor,
    is_static: bool,
    body: MethodBody,
    vtable_index: Option<usize>,
    declaring: Weak<Class>,
}

impl Method {
    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The method descriptor.
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Returns true for static methods.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns true for methods implemented in native code.
    pub fn is_native(&self) -> bool {
        matches!(self.body, MethodBody::Native)
    }

    /// Returns true for methods without a body.
    pub fn is_abstract(&self) -> bool {
        matches!(self.body, MethodBody::Abstract)
    }

    /// Returns true for instance initializers.
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// The method body.
    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    /// Position in the declaring class's vtable, for virtual methods.
    pub fn vtable_index(&self) -> Option<usize> {
        self.vtable_index
    }

    /// The class that declares this method.
    pub fn declaring_class(&self) -> Option<Arc<Class>> {
        self.declaring.upgrade()
    }

    /// Returns true if `other` has the same name and descriptor.
    pub fn same_signature(&self, other: &Method) -> bool {
        self.name == other.name && self.descriptor == other.descriptor
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.declaring.upgrade().map(|c| c.name().to_string()).unwrap_or_default();
        write!(f, "Method({}.{}{})", owner, self.name, self.descriptor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    InProgress(ThreadId),
    Initialized,
    Failed,
}

/// Outcome of claiming a class for initialization.
pub(crate) enum InitClaim {
    /// Nothing to do: initialized, or being initialized by this thread
    Done,
    /// A previous attempt failed
    Failed,
    /// The caller now owns initialization and must call `finish_init`
    Claimed,
}

/// A guest class.
pub struct Class {
    name: String,
    kind: ClassKind,
    superclass: Option<Arc<Class>>,
    interfaces: Vec<Arc<Class>>,
    fields: Vec<Arc<Field>>,
    methods: Vec<Arc<Method>>,
    instance_layout: Vec<Kind>,
    statics: RwLock<Vec<Value>>,
    vtable: Vec<Arc<Method>>,
    init: Mutex<InitState>,
    init_done: Condvar,
    mirror: OnceLock<ObjectRef>,
}

impl Class {
    /// The internal name, e.g. `java/lang/String` or `[I`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name with `/` replaced by `.`.
    pub fn dotted_name(&self) -> String {
        self.name.replace('/', ".")
    }

    /// What sort of type this is.
    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    /// The direct superclass, `None` for the root class and interfaces.
    pub fn superclass(&self) -> Option<&Arc<Class>> {
        self.superclass.as_ref()
    }

    /// Directly implemented interfaces.
    pub fn interfaces(&self) -> &[Arc<Class>] {
        &self.interfaces
    }

    /// Fields declared by this class (not inherited ones).
    pub fn fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    /// Methods declared by this class (not inherited ones).
    pub fn methods(&self) -> &[Arc<Method>] {
        &self.methods
    }

    /// Kinds of every instance slot, superclass slots first.
    pub fn instance_layout(&self) -> &[Kind] {
        &self.instance_layout
    }

    /// Virtual methods by vtable index.
    pub fn vtable(&self) -> &[Arc<Method>] {
        &self.vtable
    }

    /// Returns true for interfaces.
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, ClassKind::Interface)
    }

    /// Returns true for array classes.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClassKind::Array(_))
    }

    /// Returns true if instances can be allocated directly.
    pub fn is_instantiable(&self) -> bool {
        matches!(self.kind, ClassKind::Concrete)
    }

    /// The element type of an array class.
    pub fn component(&self) -> Option<&Component> {
        match &self.kind {
            ClassKind::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Returns true if this class is `other`, or extends or implements it.
    ///
    /// Reference arrays are covariant in their element class; every class
    /// is a subtype of the root class.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if other.superclass.is_none() && !other.is_interface() && !other.is_array() {
            // the root class
            return true;
        }
        if let (Some(Component::Reference(mine)), Some(Component::Reference(theirs))) =
            (self.component(), other.component())
        {
            return mine.is_subclass_of(theirs);
        }
        if self.superclass.as_ref().is_some_and(|s| s.is_subclass_of(other)) {
            return true;
        }
        self.interfaces.iter().any(|i| i.is_subclass_of(other))
    }

    /// Finds a field by name and descriptor in this class, its interfaces
    /// and its superclasses.
    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<Arc<Field>> {
        if let Some(field) = self
            .fields
            .iter()
            .find(|f| f.name == name && f.descriptor.as_str() == descriptor)
        {
            return Some(Arc::clone(field));
        }
        for interface in &self.interfaces {
            if let Some(field) = interface.find_field(name, descriptor) {
                return Some(field);
            }
        }
        self.superclass.as_ref().and_then(|s| s.find_field(name, descriptor))
    }

    /// Finds a method by name and descriptor in this class, its
    /// superclasses and its interfaces.
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<Arc<Method>> {
        if let Some(method) = self
            .methods
            .iter()
            .find(|m| m.name == name && m.descriptor.as_str() == descriptor)
        {
            return Some(Arc::clone(method));
        }
        if let Some(method) = self.superclass.as_ref().and_then(|s| s.find_method(name, descriptor)) {
            return Some(method);
        }
        self.interfaces.iter().find_map(|i| i.find_method(name, descriptor))
    }

    /// Selects the implementation of `method` for instances of this class.
    pub fn select_virtual(&self, method: &Method) -> Option<Arc<Method>> {
        if let Some(index) = method.vtable_index {
            if let Some(candidate) = self.vtable.get(index) {
                if candidate.same_signature(method) {
                    return Some(Arc::clone(candidate));
                }
            }
        }
        self.vtable.iter().find(|m| m.same_signature(method)).cloned()
    }

    /// Reads a static field of this class.
    pub fn get_static(&self, field: &Field) -> Option<Value> {
        if !field.is_static || !self.declares(field) {
            return None;
        }
        self.statics.read().get(field.slot).cloned()
    }

    /// Writes a static field of this class.
    pub fn set_static(&self, field: &Field, value: Value) -> bool {
        if !field.is_static || !self.declares(field) {
            return false;
        }
        match self.statics.write().get_mut(field.slot) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn declares(&self, field: &Field) -> bool {
        self.fields.iter().any(|f| std::ptr::eq(f.as_ref(), field))
    }

    /// Returns true once the static initializer has completed.
    pub fn is_initialized(&self) -> bool {
        *self.init.lock() == InitState::Initialized
    }

    pub(crate) fn claim_init(&self) -> InitClaim {
        let me = thread::current().id();
        let mut state = self.init.lock();
        loop {
            match *state {
                InitState::Initialized => return InitClaim::Done,
                InitState::Failed => return InitClaim::Failed,
                InitState::InProgress(owner) if owner == me => return InitClaim::Done,
                InitState::InProgress(_) => self.init_done.wait(&mut state),
                InitState::Uninitialized => {
                    *state = InitState::InProgress(me);
                    return InitClaim::Claimed;
                }
            }
        }
    }

    pub(crate) fn finish_init(&self, succeeded: bool) {
        *self.init.lock() = if succeeded {
            InitState::Initialized
        } else {
            InitState::Failed
        };
        self.init_done.notify_all();
    }

    pub(crate) fn mirror_cell(&self) -> &OnceLock<ObjectRef> {
        &self.mirror
    }

    pub(crate) fn new_array(name: String, component: Component, root: &Arc<Class>) -> Arc<Class> {
        Arc::new(Class {
            name,
            kind: ClassKind::Array(component),
            superclass: Some(Arc::clone(root)),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            instance_layout: Vec::new(),
            statics: RwLock::new(Vec::new()),
            vtable: root.vtable.clone(),
            init: Mutex::new(InitState::Initialized),
            init_done: Condvar::new(),
            mirror: OnceLock::new(),
        })
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.name)
    }
}

struct FieldSpec {
    name: String,
    descriptor: String,
    is_static: bool,
}

struct MethodSpec {
    name: String,
    descriptor: String,
    is_static: bool,
    body: MethodBody,
}

/// Describes a class before it is defined.
///
/// # Examples
///
/// ```
/// use object_model::{ClassBuilder, Value, Vm, VmConfig};
///
/// let vm = Vm::new(VmConfig::default());
/// let class = vm
///     .define_class(
///         ClassBuilder::new("demo/Counter")
///             .field("count", "I")
///             .static_method("zero", "()I", |_, _, _| Ok(Value::Int(0))),
///     )
///     .unwrap();
/// assert_eq!(class.name(), "demo/Counter");
/// assert!(class.find_method("zero", "()I").is_some());
/// ```
pub struct ClassBuilder {
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    kind: ClassKind,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
}

impl ClassBuilder {
    /// Starts a concrete class extending the root class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: Some(crate::vm::OBJECT.to_string()),
            interfaces: Vec::new(),
            kind: ClassKind::Concrete,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the superclass by internal name.
    pub fn superclass(mut self, name: impl Into<String>) -> Self {
        self.superclass = Some(name.into());
        self
    }

    pub(crate) fn root(mut self) -> Self {
        self.superclass = None;
        self
    }

    /// Adds an implemented interface by internal name.
    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Marks the class abstract.
    pub fn abstract_class(mut self) -> Self {
        self.kind = ClassKind::Abstract;
        self
    }

    /// Marks the type as an interface.
    pub fn interface_type(mut self) -> Self {
        self.kind = ClassKind::Interface;
        self.superclass = None;
        self
    }

    /// Adds an instance field.
    pub fn field(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.add_field(name.into(), descriptor.into(), false)
    }

    /// Adds a static field.
    pub fn static_field(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.add_field(name.into(), descriptor.into(), true)
    }

    /// Adds an instance method with a Rust body.
    pub fn method<F>(self, name: impl Into<String>, descriptor: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Vm, Option<&ObjectRef>, &[Value]) -> GuestResult<Value> + Send + Sync + 'static,
    {
        self.add_method(name.into(), descriptor.into(), false, MethodBody::Rust(Arc::new(body)))
    }

    /// Adds a static method with a Rust body.
    pub fn static_method<F>(self, name: impl Into<String>, descriptor: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Vm, Option<&ObjectRef>, &[Value]) -> GuestResult<Value> + Send + Sync + 'static,
    {
        self.add_method(name.into(), descriptor.into(), true, MethodBody::Rust(Arc::new(body)))
    }

    /// Adds an instance method implemented in native code.
    pub fn native_method(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.add_method(name.into(), descriptor.into(), false, MethodBody::Native)
    }

    /// Adds a static method implemented in native code.
    pub fn static_native_method(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.add_method(name.into(), descriptor.into(), true, MethodBody::Native)
    }

    /// Adds an abstract instance method.
    pub fn abstract_method(self, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        self.add_method(name.into(), descriptor.into(), false, MethodBody::Abstract)
    }

    /// Sets the static initializer, run once on first active use.
    pub fn initializer<F>(self, body: F) -> Self
    where
        F: Fn(&Vm, &Arc<Class>) -> GuestResult<()> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.add_method(
            INITIALIZER_NAME.to_string(),
            "()V".to_string(),
            true,
            MethodBody::Rust(Arc::new(move |vm: &Vm, _: Option<&ObjectRef>, _: &[Value]| {
                let class = vm.find_class(&name)?;
                body(vm, &class)?;
                Ok(Value::Void)
            })),
        )
    }

    /// The internal name of the class being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn superclass_name(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    pub(crate) fn interface_names(&self) -> &[String] {
        &self.interfaces
    }

    fn add_field(mut self, name: String, descriptor: String, is_static: bool) -> Self {
        self.fields.push(FieldSpec {
            name,
            descriptor,
            is_static,
        });
        self
    }

    fn add_method(mut self, name: String, descriptor: String, is_static: bool, body: MethodBody) -> Self {
        self.methods.push(MethodSpec {
            name,
            descriptor,
            is_static,
            body,
        });
        self
    }

    /// Resolves member descriptors, lays out fields and builds the vtable.
    pub(crate) fn build(
        self,
        superclass: Option<Arc<Class>>,
        interfaces: Vec<Arc<Class>>,
    ) -> Result<Arc<Class>, DefineError> {
        let mut instance_layout = superclass
            .as_ref()
            .map(|s| s.instance_layout.clone())
            .unwrap_or_default();
        let mut static_count = 0;

        let mut fields: Vec<(String, TypeDescriptor, bool, usize)> = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            let descriptor = TypeDescriptor::parse(&spec.descriptor)?;
            if fields.iter().any(|(n, d, ..)| n == &spec.name && d == &descriptor) {
                return Err(DefineError::DuplicateMember(format!("{}:{}", spec.name, spec.descriptor)));
            }
            let slot = if spec.is_static {
                static_count += 1;
                static_count - 1
            } else {
                instance_layout.push(descriptor.kind());
                instance_layout.len() - 1
            };
            fields.push((spec.name.clone(), descriptor, spec.is_static, slot));
        }

        let mut vtable_specs: Vec<(String, MethodDescriptor)> = superclass
            .as_ref()
            .map(|s| {
                s.vtable
                    .iter()
                    .map(|m| (m.name.clone(), m.descriptor.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let mut methods: Vec<(String, MethodDescriptor, bool, MethodBody, Option<usize>)> =
            Vec::with_capacity(self.methods.len());
        for spec in self.methods {
            let descriptor = MethodDescriptor::parse(&spec.descriptor)?;
            if methods.iter().any(|(n, d, ..)| n == &spec.name && d == &descriptor) {
                return Err(DefineError::DuplicateMember(format!("{}{}", spec.name, spec.descriptor)));
            }
            let virtual_method = !spec.is_static && spec.name != CONSTRUCTOR_NAME;
            let vtable_index = if virtual_method {
                match vtable_specs
                    .iter()
                    .position(|(n, d)| n == &spec.name && d == &descriptor)
                {
                    Some(index) => Some(index),
                    None => {
                        vtable_specs.push((spec.name.clone(), descriptor.clone()));
                        Some(vtable_specs.len() - 1)
                    }
                }
            } else {
                None
            };
            methods.push((spec.name, descriptor, spec.is_static, spec.body, vtable_index));
        }

        let statics = fields
            .iter()
            .filter(|(_, _, is_static, _)| *is_static)
            .map(|(_, d, _, _)| Value::default_for(d.kind()))
            .collect();
        let initial_state = if methods.iter().any(|(n, ..)| n == INITIALIZER_NAME) {
            InitState::Uninitialized
        } else if superclass.as_ref().map_or(true, |s| s.is_initialized()) {
            InitState::Initialized
        } else {
            InitState::Uninitialized
        };

        let class = Arc::new_cyclic(|me: &Weak<Class>| {
            let fields: Vec<Arc<Field>> = fields
                .into_iter()
                .map(|(name, descriptor, is_static, slot)| {
                    Arc::new(Field {
                        name,
                        descriptor,
                        is_static,
                        slot,
                        declaring: me.clone(),
                    })
                })
                .collect();
            let methods: Vec<Arc<Method>> = methods
                .into_iter()
                .map(|(name, descriptor, is_static, body, vtable_index)| {
                    Arc::new(Method {
                        name,
                        descriptor,
                        is_static,
                        body,
                        vtable_index,
                        declaring: me.clone(),
                    })
                })
                .collect();

            let mut vtable: Vec<Arc<Method>> = superclass.as_ref().map(|s| s.vtable.clone()).unwrap_or_default();
            for method in &methods {
                if let Some(index) = method.vtable_index {
                    if index < vtable.len() {
                        vtable[index] = Arc::clone(method);
                    } else {
                        vtable.push(Arc::clone(method));
                    }
                }
            }

            Class {
                name: self.name,
                kind: self.kind,
                superclass,
                interfaces,
                fields,
                methods,
                instance_layout,
                statics: RwLock::new(statics),
                vtable,
                init: Mutex::new(initial_state),
                init_done: Condvar::new(),
                mirror: OnceLock::new(),
            }
        });
        Ok(class)
    }
}
