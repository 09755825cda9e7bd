//! Reference guest runtime.
//!
//! [`Vm`] owns the class registry and implements [`GuestRuntime`]: member
//! resolution, class initialization, allocation, virtual dispatch and direct
//! invocation. Method bodies are Rust closures or native methods run through
//! the installed [`NativeLinker`].

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use core_types::{ErrorKind, GuestError, Kind};
use parking_lot::{Mutex, RwLock};

use crate::class::{Class, ClassBuilder, Component, DefineError, Field, InitClaim, Method, MethodBody, INITIALIZER_NAME};
use crate::object::{ArrayData, Member, Object, ObjectBody};
use crate::runtime::{GuestResult, GuestRuntime, NativeLinker, Thrown};
use crate::value::{ObjectRef, Value};

/// The root class.
pub const OBJECT: &str = "java/lang/Object";
/// The class of class objects.
pub const CLASS: &str = "java/lang/Class";
/// The string class.
pub const STRING: &str = "java/lang/String";
/// The root of the throwable hierarchy.
pub const THROWABLE: &str = "java/lang/Throwable";
/// Checked exceptions.
pub const EXCEPTION: &str = "java/lang/Exception";
/// Serious errors.
pub const ERROR: &str = "java/lang/Error";
/// Unchecked exceptions.
pub const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";
/// Reflected methods.
pub const REFLECT_METHOD: &str = "java/lang/reflect/Method";
/// Reflected fields.
pub const REFLECT_FIELD: &str = "java/lang/reflect/Field";
/// Reflected constructors.
pub const REFLECT_CONSTRUCTOR: &str = "java/lang/reflect/Constructor";

const DETAIL_MESSAGE: &str = "detailMessage";
const STRING_DESCRIPTOR: &str = "Ljava/lang/String;";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Nested invocations allowed before `StackOverflowError` is thrown
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self { max_call_depth: 256 }
    }
}

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct DepthGuard;

impl DepthGuard {
    fn enter(max: usize) -> Option<DepthGuard> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= max {
                None
            } else {
                depth.set(depth.get() + 1);
                Some(DepthGuard)
            }
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// The reference guest runtime.
///
/// # Examples
///
/// ```
/// use object_model::{ClassBuilder, Value, Vm, VmConfig};
///
/// let vm = Vm::new(VmConfig::default());
/// vm.define_class(
///     ClassBuilder::new("demo/Math").static_method("twice", "(I)I", |_, _, args| {
///         Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
///     }),
/// )
/// .unwrap();
/// let result = vm.invoke_static("demo/Math", "twice", "(I)I", &[Value::Int(21)]).unwrap();
/// assert_eq!(result, Value::Int(42));
/// ```
pub struct Vm {
    config: VmConfig,
    classes: RwLock<HashMap<String, Arc<Class>>>,
    native_linker: RwLock<Option<Arc<dyn NativeLinker>>>,
    diagnostics: Mutex<Vec<String>>,
    next_identity: AtomicU64,
}

impl Vm {
    /// Creates a runtime with the bootstrap classes defined.
    pub fn new(config: VmConfig) -> Self {
        let vm = Self {
            config,
            classes: RwLock::new(HashMap::new()),
            native_linker: RwLock::new(None),
            diagnostics: Mutex::new(Vec::new()),
            next_identity: AtomicU64::new(1),
        };
        vm.bootstrap();
        vm
    }

    /// The runtime configuration.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    fn bootstrap(&self) {
        let mut core = vec![
            ClassBuilder::new(OBJECT)
                .root()
                .method("<init>", "()V", |_, _, _| Ok(Value::Void))
                .method("hashCode", "()I", |_, this, _| {
                    Ok(Value::Int(this.map_or(0, |o| o.identity() as i32)))
                })
                .method("equals", "(Ljava/lang/Object;)Z", |_, this, args| {
                    let same = match (this, args.first().and_then(Value::as_object)) {
                        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                        _ => false,
                    };
                    Ok(Value::Boolean(same))
                }),
            ClassBuilder::new(CLASS),
            ClassBuilder::new(STRING).method("length", "()I", |_, this, _| {
                let len = this.and_then(|s| s.string_units().map(<[u16]>::len)).unwrap_or(0);
                Ok(Value::Int(len as i32))
            }),
            ClassBuilder::new(THROWABLE)
                .field(DETAIL_MESSAGE, STRING_DESCRIPTOR)
                .method("<init>", "()V", |_, _, _| Ok(Value::Void))
                .method("<init>", "(Ljava/lang/String;)V", |vm, this, args| {
                    if let (Some(this), Some(message)) = (this, args.first()) {
                        vm.set_detail_message(this, message.clone());
                    }
                    Ok(Value::Void)
                })
                .method("getMessage", "()Ljava/lang/String;", |vm, this, _| {
                    Ok(this.map_or(Value::null(), |t| vm.detail_message(t)))
                })
                .method("printStackTrace", "()V", |vm, this, _| {
                    if let Some(this) = this {
                        let line = vm.describe(this);
                        log::warn!("{line}");
                        vm.diagnostics.lock().push(line);
                    }
                    Ok(Value::Void)
                }),
            ClassBuilder::new(EXCEPTION).superclass(THROWABLE),
            ClassBuilder::new(ERROR).superclass(THROWABLE),
            ClassBuilder::new(RUNTIME_EXCEPTION).superclass(EXCEPTION),
            ClassBuilder::new(REFLECT_METHOD),
            ClassBuilder::new(REFLECT_FIELD),
            ClassBuilder::new(REFLECT_CONSTRUCTOR),
        ];
        for kind in ErrorKind::ALL {
            let parent = if kind.is_error() {
                ERROR
            } else if kind == ErrorKind::Instantiation {
                EXCEPTION
            } else {
                RUNTIME_EXCEPTION
            };
            core.push(ClassBuilder::new(kind.class_name()).superclass(parent));
        }
        for builder in core {
            self.define_class(builder).expect("bootstrap class definitions are well-formed");
        }
        log::debug!("bootstrapped {} classes", self.classes.read().len());
    }

    fn core_class(&self, name: &str) -> Arc<Class> {
        self.lookup(name).expect("bootstrap classes are always defined")
    }

    fn lookup(&self, name: &str) -> Option<Arc<Class>> {
        self.classes.read().get(name).cloned()
    }

    fn next_identity(&self) -> u64 {
        self.next_identity.fetch_add(1, Ordering::Relaxed)
    }

    fn new_object(&self, class: Arc<Class>, body: ObjectBody) -> ObjectRef {
        Arc::new(Object::new(class, body, self.next_identity()))
    }

    /// Defines a class, resolving its superclass and interfaces by name.
    pub fn define_class(&self, builder: ClassBuilder) -> Result<Arc<Class>, DefineError> {
        let name = builder.name().to_string();
        if self.classes.read().contains_key(&name) {
            return Err(DefineError::Duplicate(name));
        }
        let superclass = match builder.superclass_name() {
            Some(parent) => Some(self.lookup(parent).ok_or_else(|| DefineError::UnknownClass(parent.to_string()))?),
            None => None,
        };
        let interfaces = builder
            .interface_names()
            .iter()
            .map(|i| self.lookup(i).ok_or_else(|| DefineError::UnknownClass(i.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let class = builder.build(superclass, interfaces)?;

        let mut classes = self.classes.write();
        if classes.contains_key(&name) {
            return Err(DefineError::Duplicate(name));
        }
        classes.insert(name.clone(), Arc::clone(&class));
        log::debug!("defined class {name}");
        Ok(class)
    }

    /// The array class with the given element type, created on first use.
    pub fn array_class(&self, component: Component) -> Arc<Class> {
        let name = match &component {
            Component::Primitive(kind) => format!("[{}", kind.type_char()),
            Component::Reference(element) if element.is_array() => format!("[{}", element.name()),
            Component::Reference(element) => format!("[L{};", element.name()),
        };
        if let Some(class) = self.lookup(&name) {
            return class;
        }
        let root = self.core_class(OBJECT);
        let mut classes = self.classes.write();
        Arc::clone(
            classes
                .entry(name.clone())
                .or_insert_with(|| Class::new_array(name, component, &root)),
        )
    }

    /// Creates a string from Rust text.
    pub fn new_string_from(&self, text: &str) -> ObjectRef {
        self.new_object(self.core_class(STRING), ObjectBody::String(text.encode_utf16().collect()))
    }

    /// Invokes `method` with virtual dispatch on `receiver`.
    pub fn invoke_virtual(&self, method: &Arc<Method>, receiver: &ObjectRef, args: &[Value]) -> GuestResult<Value> {
        let target = self.vtable_lookup(receiver.class(), method)?;
        self.invoke(&target, Some(receiver), args)
    }

    /// Resolves and invokes a static method by class name, name and descriptor.
    pub fn invoke_static(&self, class: &str, name: &str, descriptor: &str, args: &[Value]) -> GuestResult<Value> {
        let class = self.find_class(class)?;
        let method = self.resolve_method(&class, name, descriptor, true)?;
        self.invoke(&method, None, args)
    }

    /// Allocates an instance of `class` and runs the constructor matching
    /// `descriptor`.
    pub fn construct(&self, class: &Arc<Class>, descriptor: &str, args: &[Value]) -> GuestResult<ObjectRef> {
        let constructor = self.resolve_method(class, "<init>", descriptor, false)?;
        let object = self.allocate_instance(class)?;
        self.invoke(&constructor, Some(&object), args)?;
        Ok(object)
    }

    /// The detail message of a throwable, null if unset.
    pub fn detail_message(&self, throwable: &ObjectRef) -> Value {
        throwable
            .class()
            .find_field(DETAIL_MESSAGE, STRING_DESCRIPTOR)
            .and_then(|field| throwable.get_field(&field))
            .unwrap_or_else(Value::null)
    }

    fn set_detail_message(&self, throwable: &ObjectRef, message: Value) {
        if let Some(field) = throwable.class().find_field(DETAIL_MESSAGE, STRING_DESCRIPTOR) {
            throwable.set_field(&field, message);
        }
    }

    /// One-line description of a throwable: `java.lang.Foo: message`.
    pub fn describe(&self, throwable: &ObjectRef) -> String {
        let class = throwable.class().dotted_name();
        match self.detail_message(throwable).as_object().and_then(|m| m.to_rust_string()) {
            Some(message) => format!("{class}: {message}"),
            None => class,
        }
    }

    /// Lines recorded by `printStackTrace`, oldest first.
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().clone()
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> Thrown {
        self.throw(GuestError::new(kind, message))
    }

    fn run_initializers(&self, class: &Arc<Class>) -> GuestResult<()> {
        if let Some(parent) = class.superclass() {
            self.initialize_class(parent)?;
        }
        let initializer = class
            .methods()
            .iter()
            .find(|m| m.is_static() && m.name() == INITIALIZER_NAME)
            .cloned();
        if let Some(initializer) = initializer {
            log::debug!("initializing class {}", class.name());
            self.invoke(&initializer, None, &[])?;
        }
        Ok(())
    }
}

impl GuestRuntime for Vm {
    fn find_class(&self, name: &str) -> GuestResult<Arc<Class>> {
        if let Some(class) = self.lookup(name) {
            return Ok(class);
        }
        let Some(element) = name.strip_prefix('[') else {
            return Err(self.error(ErrorKind::NoClassDefFound, name));
        };
        let component = if element.starts_with('[') {
            Component::Reference(self.find_class(element)?)
        } else if let Some(class_name) = element.strip_prefix('L').and_then(|e| e.strip_suffix(';')) {
            Component::Reference(self.find_class(class_name)?)
        } else {
            let mut chars = element.chars();
            match (chars.next().and_then(Kind::from_type_char), chars.next()) {
                (Some(kind), None) if kind.is_primitive() => Component::Primitive(kind),
                _ => return Err(self.error(ErrorKind::NoClassDefFound, name)),
            }
        };
        Ok(self.array_class(component))
    }

    fn resolve_field(&self, class: &Arc<Class>, name: &str, descriptor: &str, is_static: bool) -> GuestResult<Arc<Field>> {
        class
            .find_field(name, descriptor)
            .filter(|f| f.is_static() == is_static)
            .ok_or_else(|| self.error(ErrorKind::NoSuchField, name))
    }

    fn resolve_method(
        &self,
        class: &Arc<Class>,
        name: &str,
        descriptor: &str,
        is_static: bool,
    ) -> GuestResult<Arc<Method>> {
        class
            .find_method(name, descriptor)
            .filter(|m| m.is_static() == is_static)
            .ok_or_else(|| self.error(ErrorKind::NoSuchMethod, format!("{name}{descriptor}")))
    }

    fn initialize_class(&self, class: &Arc<Class>) -> GuestResult<()> {
        match class.claim_init() {
            InitClaim::Done => Ok(()),
            InitClaim::Failed => Err(self.error(
                ErrorKind::NoClassDefFound,
                format!("could not initialize class {}", class.dotted_name()),
            )),
            InitClaim::Claimed => {
                let result = self.run_initializers(class);
                class.finish_init(result.is_ok());
                result
            }
        }
    }

    fn allocate_instance(&self, class: &Arc<Class>) -> GuestResult<ObjectRef> {
        if !class.is_instantiable() {
            return Err(self.error(ErrorKind::Instantiation, class.dotted_name()));
        }
        self.initialize_class(class)?;
        let fields = class.instance_layout().iter().map(|&k| Value::default_for(k)).collect();
        Ok(self.new_object(Arc::clone(class), ObjectBody::Instance(RwLock::new(fields))))
    }

    fn vtable_lookup(&self, receiver_class: &Arc<Class>, method: &Arc<Method>) -> GuestResult<Arc<Method>> {
        if method.is_static() || method.is_constructor() {
            return Ok(Arc::clone(method));
        }
        if let Some(declaring) = method.declaring_class() {
            if !receiver_class.is_subclass_of(&declaring) {
                return Err(self.error(
                    ErrorKind::IllegalArgument,
                    format!("{} is not a subtype of {}", receiver_class.dotted_name(), declaring.dotted_name()),
                ));
            }
        }
        Ok(receiver_class
            .select_virtual(method)
            .unwrap_or_else(|| Arc::clone(method)))
    }

    fn invoke(&self, method: &Arc<Method>, receiver: Option<&ObjectRef>, args: &[Value]) -> GuestResult<Value> {
        let Some(_depth) = DepthGuard::enter(self.config.max_call_depth) else {
            return Err(self.error(
                ErrorKind::StackOverflow,
                format!("call depth exceeded {}", self.config.max_call_depth),
            ));
        };
        if args.len() != method.descriptor().params().len() {
            return Err(self.error(
                ErrorKind::IllegalArgument,
                format!("{}{} expects {} arguments, got {}", method.name(), method.descriptor(), method.descriptor().params().len(), args.len()),
            ));
        }
        if method.is_static() {
            if let Some(class) = method.declaring_class() {
                self.initialize_class(&class)?;
            }
        } else if receiver.is_none() {
            return Err(self.error(ErrorKind::NullPointer, format!("null receiver for {}", method.name())));
        }
        match method.body() {
            MethodBody::Rust(body) => body(self, receiver, args),
            MethodBody::Native => {
                let linker = self.native_linker.read().clone();
                match linker {
                    Some(linker) => linker.invoke_native(method, receiver, args),
                    None => Err(self.error(ErrorKind::UnsatisfiedLink, format!("{method:?}"))),
                }
            }
            MethodBody::Abstract => Err(self.error(ErrorKind::AbstractMethod, format!("{method:?}"))),
        }
    }

    fn new_string(&self, units: Vec<u16>) -> GuestResult<ObjectRef> {
        Ok(self.new_object(self.core_class(STRING), ObjectBody::String(units)))
    }

    fn new_primitive_array(&self, kind: Kind, len: i32) -> GuestResult<ObjectRef> {
        if len < 0 {
            return Err(self.error(ErrorKind::NegativeArraySize, len.to_string()));
        }
        let data = ArrayData::primitive(kind, len as usize)
            .ok_or_else(|| self.error(ErrorKind::IllegalArgument, format!("{kind} is not a primitive kind")))?;
        let class = self.array_class(Component::Primitive(kind));
        Ok(self.new_object(class, ObjectBody::Array(data)))
    }

    fn new_object_array(&self, element: &Arc<Class>, len: i32, init: Option<ObjectRef>) -> GuestResult<ObjectRef> {
        if len < 0 {
            return Err(self.error(ErrorKind::NegativeArraySize, len.to_string()));
        }
        if let Some(init) = &init {
            if !init.is_instance_of(element) {
                return Err(self.error(ErrorKind::ArrayStore, init.class().dotted_name()));
            }
        }
        let class = self.array_class(Component::Reference(Arc::clone(element)));
        Ok(self.new_object(class, ObjectBody::Array(ArrayData::objects(len as usize, init))))
    }

    fn materialize(&self, error: &GuestError) -> ObjectRef {
        let class = self
            .lookup(error.kind.class_name())
            .unwrap_or_else(|| self.core_class(THROWABLE));
        let fields = class.instance_layout().iter().map(|&k| Value::default_for(k)).collect();
        let throwable = self.new_object(class, ObjectBody::Instance(RwLock::new(fields)));
        let message = self.new_string_from(&error.message);
        self.set_detail_message(&throwable, Value::from_object(message));
        log::trace!("materialized {error}");
        throwable
    }

    fn new_throwable(&self, class: &Arc<Class>, message: Option<&str>) -> GuestResult<ObjectRef> {
        if !class.is_subclass_of(&self.core_class(THROWABLE)) {
            return Err(self.error(
                ErrorKind::IllegalArgument,
                format!("{} is not a throwable class", class.dotted_name()),
            ));
        }
        let message = message.map_or(Value::null(), |m| Value::from_object(self.new_string_from(m)));
        self.construct(class, "(Ljava/lang/String;)V", &[message])
    }

    fn class_mirror(&self, class: &Arc<Class>) -> ObjectRef {
        Arc::clone(
            class
                .mirror_cell()
                .get_or_init(|| self.new_object(self.core_class(CLASS), ObjectBody::Mirror(Arc::clone(class)))),
        )
    }

    fn reflect_method(&self, method: &Arc<Method>) -> GuestResult<ObjectRef> {
        let class = if method.is_constructor() {
            REFLECT_CONSTRUCTOR
        } else {
            REFLECT_METHOD
        };
        Ok(self.new_object(self.core_class(class), ObjectBody::Member(Member::Method(Arc::clone(method)))))
    }

    fn reflect_field(&self, field: &Arc<Field>) -> GuestResult<ObjectRef> {
        Ok(self.new_object(
            self.core_class(REFLECT_FIELD),
            ObjectBody::Member(Member::Field(Arc::clone(field))),
        ))
    }

    fn set_native_linker(&self, linker: Arc<dyn NativeLinker>) {
        *self.native_linker.write() = Some(linker);
    }
}
