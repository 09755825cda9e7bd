//! Native method binder.
//!
//! Two directions meet here:
//!
//! - Bridge functions by name. [`lookup`] resolves a standard function name
//!   against a registry built once from every implemented entry point.
//!   Standard functions without an implementation, and names nobody knows,
//!   resolve to stubs that raise `UnsupportedOperationException` when
//!   invoked, never before.
//! - Guest native methods. [`Binder`] keeps the binding of each native method
//!   to a native function pointer, created by explicit registration or by lazy
//!   linking against symbol sources, and dropped by unregistration.

use std::collections::HashMap;
use std::ffi::{c_void, OsStr};
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use core_types::{DescriptorError, ErrorKind, GuestError, MethodDescriptor};
use libloading::Library;
use object_model::{Class, Method};
use parking_lot::RwLock;
use thiserror::Error;

use crate::context::JniEnv;
use crate::entries;
use crate::guard::guard;
use crate::signature::{Signature, SignatureCache};
use crate::sys::jlong;

/// Native method registration and linking failures.
#[derive(Debug, Error)]
pub enum BindError {
    /// The class declares no method with that name and descriptor
    #[error("no method {class}.{name}{descriptor}")]
    NoSuchMethod {
        /// Internal class name
        class: String,
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
    },
    /// The method exists but is not declared native
    #[error("method {class}.{name}{descriptor} is not native")]
    NotNative {
        /// Internal class name
        class: String,
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
    },
    /// Registration with a null function pointer
    #[error("null function pointer for {name}{descriptor}")]
    NullFunction {
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
    },
    /// A binding was presented for a method it was not created for
    #[error("native binding for {bound} does not apply to {called}")]
    DoesNotApply {
        /// The method the binding targets
        bound: String,
        /// The method being invoked
        called: String,
    },
    /// No symbol source provides the method
    #[error("{method} (tried {})", .symbols.join(", "))]
    Unsatisfied {
        /// The method being linked
        method: String,
        /// Symbol names searched for
        symbols: Vec<String>,
    },
    /// A native library failed to load
    #[error("cannot load native library {path}: {source}")]
    Library {
        /// Library path
        path: String,
        /// Loader error
        #[source]
        source: libloading::Error,
    },
    /// The descriptor does not parse
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

impl BindError {
    /// The guest error this failure surfaces as.
    pub fn to_guest_error(&self) -> GuestError {
        let kind = match self {
            BindError::NoSuchMethod { .. } | BindError::NotNative { .. } | BindError::Descriptor(_) => {
                ErrorKind::NoSuchMethod
            }
            BindError::NullFunction { .. } | BindError::DoesNotApply { .. } => ErrorKind::IllegalArgument,
            BindError::Unsatisfied { .. } | BindError::Library { .. } => ErrorKind::UnsatisfiedLink,
        };
        GuestError::new(kind, self.to_string())
    }
}

// =============================================================================
// Bridge function registry
// =============================================================================

/// Result of resolving a bridge function by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// An implemented entry point
    Implemented(usize),
    /// A standard function without an implementation; raises when invoked
    Unimplemented(usize),
    /// A name outside the standard set; raises when invoked
    Unknown(usize),
}

impl Lookup {
    /// The function's address.
    pub fn address(self) -> usize {
        match self {
            Lookup::Implemented(a) | Lookup::Unimplemented(a) | Lookup::Unknown(a) => a,
        }
    }

    /// Returns true for an implemented entry point.
    pub fn is_implemented(self) -> bool {
        matches!(self, Lookup::Implemented(_))
    }
}

struct Registry {
    implemented: HashMap<&'static str, usize>,
    stubs: HashMap<&'static str, usize>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let implemented: HashMap<_, _> = entries::implemented().into_iter().collect();
        let stubs: HashMap<_, _> = stubs::all().into_iter().collect();
        log::debug!(
            "native interface registry: {} implemented, {} stubbed",
            implemented.len(),
            stubs.len()
        );
        Registry { implemented, stubs }
    })
}

/// Resolves a bridge function by its exact standard name.
///
/// # Examples
///
/// ```
/// use native_bridge::binder::{lookup, Lookup};
///
/// assert!(lookup("GetVersion").is_implemented());
/// assert!(matches!(lookup("CallIntMethod"), Lookup::Unimplemented(_)));
/// assert!(matches!(lookup("NoSuchFunction"), Lookup::Unknown(_)));
/// ```
pub fn lookup(name: &str) -> Lookup {
    let registry = registry();
    if let Some(&address) = registry.implemented.get(name) {
        Lookup::Implemented(address)
    } else if let Some(&address) = registry.stubs.get(name) {
        Lookup::Unimplemented(address)
    } else {
        Lookup::Unknown(unknown_function as usize)
    }
}

/// Raises the unsupported-operation error for an unimplemented function.
///
/// # Safety
///
/// `env` must be null or an environment pointer handed out by a bridge.
unsafe fn raise_unimplemented(env: *mut JniEnv, name: &'static str) -> jlong {
    // SAFETY: forwarded from the caller
    unsafe {
        guard(env, name, 0, |_| {
            Err(GuestError::new(
                ErrorKind::UnsupportedOperation,
                format!("native interface function {name} is not implemented"),
            )
            .into())
        })
    }
}

unsafe extern "system" fn unknown_function(env: *mut JniEnv) -> jlong {
    // SAFETY: called through a function table with the caller's environment
    unsafe { raise_unimplemented(env, "<unknown>") }
}

macro_rules! unimplemented_stubs {
    ($($name:ident),* $(,)?) => {
        #[allow(non_snake_case)]
        mod stubs {
            $(
                pub(super) mod $name {
                    pub(in crate::binder) unsafe extern "system" fn stub(env: *mut crate::context::JniEnv) -> crate::sys::jlong {
                        // SAFETY: called through a function table with the caller's environment
                        unsafe { crate::binder::raise_unimplemented(env, stringify!($name)) }
                    }
                }
            )*

            pub(super) fn all() -> Vec<(&'static str, usize)> {
                vec![$((stringify!($name), $name::stub as usize)),*]
            }
        }
    };
}

// C variadic and va_list entry points cannot be defined on stable Rust.
unimplemented_stubs! {
    DefineClass,
    NewObject, NewObjectV,
    CallObjectMethod, CallObjectMethodV,
    CallBooleanMethod, CallBooleanMethodV,
    CallByteMethod, CallByteMethodV,
    CallCharMethod, CallCharMethodV,
    CallShortMethod, CallShortMethodV,
    CallIntMethod, CallIntMethodV,
    CallLongMethod, CallLongMethodV,
    CallFloatMethod, CallFloatMethodV,
    CallDoubleMethod, CallDoubleMethodV,
    CallVoidMethod, CallVoidMethodV,
    CallNonvirtualObjectMethod, CallNonvirtualObjectMethodV,
    CallNonvirtualBooleanMethod, CallNonvirtualBooleanMethodV,
    CallNonvirtualByteMethod, CallNonvirtualByteMethodV,
    CallNonvirtualCharMethod, CallNonvirtualCharMethodV,
    CallNonvirtualShortMethod, CallNonvirtualShortMethodV,
    CallNonvirtualIntMethod, CallNonvirtualIntMethodV,
    CallNonvirtualLongMethod, CallNonvirtualLongMethodV,
    CallNonvirtualFloatMethod, CallNonvirtualFloatMethodV,
    CallNonvirtualDoubleMethod, CallNonvirtualDoubleMethodV,
    CallNonvirtualVoidMethod, CallNonvirtualVoidMethodV,
    CallStaticObjectMethod, CallStaticObjectMethodV,
    CallStaticBooleanMethod, CallStaticBooleanMethodV,
    CallStaticByteMethod, CallStaticByteMethodV,
    CallStaticCharMethod, CallStaticCharMethodV,
    CallStaticShortMethod, CallStaticShortMethodV,
    CallStaticIntMethod, CallStaticIntMethodV,
    CallStaticLongMethod, CallStaticLongMethodV,
    CallStaticFloatMethod, CallStaticFloatMethodV,
    CallStaticDoubleMethod, CallStaticDoubleMethodV,
    CallStaticVoidMethod, CallStaticVoidMethodV,
    GetJavaVM,
    NewDirectByteBuffer, GetDirectBufferAddress, GetDirectBufferCapacity,
    GetModule,
}

// =============================================================================
// Native method bindings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    class: String,
    name: String,
    descriptor: String,
}

impl BindingKey {
    fn of(class: &Class, method: &Method) -> Self {
        Self {
            class: class.name().to_string(),
            name: method.name().to_string(),
            descriptor: method.descriptor().as_str().to_string(),
        }
    }
}

/// A native method bound to a native function pointer.
pub struct NativeBinding {
    method: Arc<Method>,
    class: String,
    address: usize,
    signature: Arc<Signature>,
    abi: String,
}

impl NativeBinding {
    /// The method this binding was created for.
    pub fn method(&self) -> &Arc<Method> {
        &self.method
    }

    /// The native function's address.
    pub fn address(&self) -> usize {
        self.address
    }

    /// The method's signature.
    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    /// The ABI signature string the function is called with.
    pub fn abi(&self) -> &str {
        &self.abi
    }

    /// Fails unless `method` is exactly the method this binding targets.
    pub fn check_target(&self, method: &Method) -> Result<(), BindError> {
        if std::ptr::eq(Arc::as_ptr(&self.method), method) {
            return Ok(());
        }
        Err(BindError::DoesNotApply {
            bound: format!("{}.{}{}", self.class, self.method.name(), self.method.descriptor()),
            called: format!("{method:?}"),
        })
    }
}

impl std::fmt::Debug for NativeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBinding")
            .field("method", &format_args!("{}.{}{}", self.class, self.method.name(), self.method.descriptor()))
            .field("address", &format_args!("{:#x}", self.address))
            .field("abi", &self.abi)
            .finish()
    }
}

/// Bindings of guest native methods to native functions.
pub struct Binder {
    signatures: Arc<SignatureCache>,
    bindings: RwLock<HashMap<BindingKey, Arc<NativeBinding>>>,
    symbols: RwLock<HashMap<String, usize>>,
    libraries: RwLock<Vec<Library>>,
}

impl Binder {
    /// Creates a binder with no bindings and no symbol sources.
    pub fn new(signatures: Arc<SignatureCache>) -> Self {
        Self {
            signatures,
            bindings: RwLock::new(HashMap::new()),
            symbols: RwLock::new(HashMap::new()),
            libraries: RwLock::new(Vec::new()),
        }
    }

    /// Binds the native method `name` `descriptor` declared by `class` to
    /// the function at `address`.
    ///
    /// Any previous binding of the same method is replaced.
    pub fn register_native(
        &self,
        class: &Arc<Class>,
        name: &str,
        descriptor: &str,
        address: usize,
    ) -> Result<Arc<NativeBinding>, BindError> {
        let method = class
            .methods()
            .iter()
            .find(|m| m.name() == name && m.descriptor().as_str() == descriptor)
            .cloned()
            .ok_or_else(|| BindError::NoSuchMethod {
                class: class.name().to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })?;
        if !method.is_native() {
            return Err(BindError::NotNative {
                class: class.name().to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            });
        }
        if address == 0 {
            return Err(BindError::NullFunction {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            });
        }
        let key = BindingKey::of(class, &method);
        if let Some(previous) = self.bindings.write().remove(&key) {
            log::debug!("unbinding {previous:?} before re-registration");
        }
        self.bind(key, method, address)
    }

    fn bind(&self, key: BindingKey, method: Arc<Method>, address: usize) -> Result<Arc<NativeBinding>, BindError> {
        let signature = self.signatures.get(&key.descriptor)?;
        let binding = Arc::new(NativeBinding {
            abi: signature.abi_string(),
            class: key.class.clone(),
            method,
            address,
            signature,
        });
        log::debug!("bound {binding:?}");
        self.bindings.write().insert(key, Arc::clone(&binding));
        Ok(binding)
    }

    /// Drops every binding of methods declared by `class`, returning how many
    /// were dropped. The methods link again on their next invocation.
    pub fn unregister_natives(&self, class: &Class) -> usize {
        let mut bindings = self.bindings.write();
        let before = bindings.len();
        bindings.retain(|key, _| key.class != class.name());
        let dropped = before - bindings.len();
        log::debug!("unregistered {dropped} natives of {}", class.name());
        dropped
    }

    /// The current binding of `method`, if any.
    pub fn binding_for(&self, method: &Method) -> Option<Arc<NativeBinding>> {
        let class = method.declaring_class()?;
        self.bindings.read().get(&BindingKey::of(&class, method)).cloned()
    }

    /// The binding of `method`, linking it lazily if it has none.
    pub fn resolve(&self, method: &Arc<Method>) -> Result<Arc<NativeBinding>, BindError> {
        if let Some(binding) = self.binding_for(method) {
            return Ok(binding);
        }
        let unsatisfied = |symbols| BindError::Unsatisfied {
            method: format!("{method:?}"),
            symbols,
        };
        let Some(class) = method.declaring_class() else {
            return Err(unsatisfied(Vec::new()));
        };
        let candidates = vec![
            short_name(class.name(), method.name()),
            long_name(class.name(), method.name(), method.descriptor()),
        ];
        for symbol in &candidates {
            if let Some(address) = self.find_symbol(symbol) {
                log::debug!("linked {method:?} to {symbol}");
                return self.bind(BindingKey::of(&class, method), Arc::clone(method), address);
            }
        }
        Err(unsatisfied(candidates))
    }

    /// Adds an in-process symbol to link native methods against.
    pub fn register_symbol(&self, name: impl Into<String>, address: usize) {
        self.symbols.write().insert(name.into(), address);
    }

    /// Opens a native library as a symbol source.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisers; the library must be sound to
    /// load into this process.
    pub unsafe fn load_library(&self, path: impl AsRef<OsStr>) -> Result<(), BindError> {
        let path = path.as_ref();
        // SAFETY: forwarded from the caller
        let library = unsafe { Library::new(path) }.map_err(|source| BindError::Library {
            path: path.to_string_lossy().into_owned(),
            source,
        })?;
        log::debug!("loaded native library {}", path.to_string_lossy());
        self.libraries.write().push(library);
        Ok(())
    }

    fn find_symbol(&self, name: &str) -> Option<usize> {
        if let Some(&address) = self.symbols.read().get(name) {
            return Some(address);
        }
        self.libraries.read().iter().find_map(|library| {
            // SAFETY: the symbol is only used as an address
            let symbol = unsafe { library.get::<*mut c_void>(name.as_bytes()) }.ok()?;
            let address = *symbol as usize;
            (address != 0).then_some(address)
        })
    }

    /// Number of live bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.read().len()
    }
}

// =============================================================================
// Symbol names
// =============================================================================

/// Escapes a name for use in a native symbol.
///
/// # Examples
///
/// ```
/// use native_bridge::binder::mangle;
///
/// assert_eq!(mangle("com/acme/My_Class"), "com_acme_My_1Class");
/// assert_eq!(mangle("[Ljava/lang/String;"), "_3Ljava_lang_String_2");
/// ```
pub fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' => out.push('_'),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            c if c.is_ascii_alphanumeric() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "_0{unit:04x}");
                }
            }
        }
    }
    out
}

/// The short symbol name of a native method: `Java_<class>_<method>`.
pub fn short_name(class: &str, method: &str) -> String {
    format!("Java_{}_{}", mangle(class), mangle(method))
}

/// The long symbol name, which appends the mangled parameter descriptor.
pub fn long_name(class: &str, method: &str, descriptor: &MethodDescriptor) -> String {
    format!("{}__{}", short_name(class, method), mangle(descriptor.param_text()))
}
