//! The bridge instance.
//!
//! A [`Bridge`] ties a guest runtime to native code. It owns everything
//! shared between native threads (the global handle table, the native buffer
//! registry, member identifiers, signatures, native method bindings and the
//! function table) and hands out one environment per attached thread.
//!
//! Creating a bridge installs it as the runtime's [`NativeLinker`], so guest
//! calls to native methods are dispatched through it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use core_types::abi::{status, version};
use core_types::{fatal, ErrorKind, GuestError};
use memory_manager::{GlobalTable, NativeBufferRegistry};
use object_model::{Field, GuestResult, GuestRuntime, Method, NativeLinker, ObjectRef, Thrown, Value};

use crate::binder::Binder;
use crate::config::{BridgeConfig, ConfigError};
use crate::context::{self, JniEnv, NativeContext};
use crate::conversion::ConversionPolicy;
use crate::guard::EntryError;
use crate::members::MemberTable;
use crate::signature::SignatureCache;
use crate::sys::jint;
use crate::{table, trampoline};

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by every thread attached to one bridge.
pub(crate) struct BridgeShared {
    id: u64,
    config: BridgeConfig,
    version: jint,
    policy: ConversionPolicy,
    runtime: Arc<dyn GuestRuntime>,
    globals: GlobalTable,
    buffers: NativeBufferRegistry,
    signatures: Arc<SignatureCache>,
    binder: Binder,
    methods: MemberTable<Method>,
    fields: MemberTable<Field>,
    functions: Box<[usize]>,
}

impl BridgeShared {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub(crate) fn version(&self) -> jint {
        self.version
    }

    pub(crate) fn policy(&self) -> ConversionPolicy {
        self.policy
    }

    pub(crate) fn runtime(&self) -> &Arc<dyn GuestRuntime> {
        &self.runtime
    }

    pub(crate) fn globals(&self) -> &GlobalTable {
        &self.globals
    }

    pub(crate) fn buffers(&self) -> &NativeBufferRegistry {
        &self.buffers
    }

    pub(crate) fn signatures(&self) -> &SignatureCache {
        &self.signatures
    }

    pub(crate) fn binder(&self) -> &Binder {
        &self.binder
    }

    pub(crate) fn methods(&self) -> &MemberTable<Method> {
        &self.methods
    }

    pub(crate) fn fields(&self) -> &MemberTable<Field> {
        &self.fields
    }

    pub(crate) fn function_table(&self) -> &[usize] {
        &self.functions
    }

    /// Runs a guest native method on the current thread.
    fn dispatch(self: &Arc<Self>, method: &Arc<Method>, receiver: Option<&ObjectRef>, args: &[Value]) -> GuestResult<Value> {
        let env = context::attach(self);
        // SAFETY: attach returns the live environment of the current thread
        let ctx = match unsafe { NativeContext::from_env(env) } {
            Ok(ctx) => ctx,
            Err(violation) => fatal(&violation),
        };
        let result = self.dispatch_in(ctx, env, method, receiver, args);
        result.map_err(|error| match error {
            EntryError::Thrown(thrown) => thrown,
            other => Thrown(other.into_throwable(ctx, method.name())),
        })
    }

    fn dispatch_in(
        &self,
        ctx: &NativeContext,
        env: *mut JniEnv,
        method: &Arc<Method>,
        receiver: Option<&ObjectRef>,
        args: &[Value],
    ) -> Result<Value, EntryError> {
        let binding = self.binder.resolve(method)?;
        if self.config.check_call_target {
            binding.check_target(method)?;
        }
        let receiver = match receiver {
            Some(receiver) => Arc::clone(receiver),
            None => {
                let class = method.declaring_class().ok_or_else(|| {
                    GuestError::new(ErrorKind::Internal, format!("{method:?} has no declaring class"))
                })?;
                self.runtime.class_mirror(&class)
            }
        };
        trampoline::invoke(ctx, env, &binding, receiver, args)
    }
}

struct BridgeLinker {
    shared: Weak<BridgeShared>,
    runtime: Weak<dyn GuestRuntime>,
}

impl NativeLinker for BridgeLinker {
    fn invoke_native(&self, method: &Arc<Method>, receiver: Option<&ObjectRef>, args: &[Value]) -> GuestResult<Value> {
        if let Some(shared) = self.shared.upgrade() {
            return shared.dispatch(method, receiver, args);
        }
        let error = GuestError::new(ErrorKind::UnsatisfiedLink, format!("{method:?}: native bridge is gone"));
        match self.runtime.upgrade() {
            Some(runtime) => Err(runtime.throw(error)),
            None => panic!("{error}"),
        }
    }
}

/// A native-interface bridge for one guest runtime.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use core_types::abi::{status, version};
/// use native_bridge::{Bridge, BridgeConfig};
/// use object_model::{Vm, VmConfig};
///
/// let vm = Arc::new(Vm::new(VmConfig::default()));
/// let bridge = Bridge::new(vm, BridgeConfig::default()).unwrap();
/// assert_eq!(bridge.get_env(version::V1_8).unwrap_err(), status::DETACHED);
///
/// let env = bridge.attach_current_thread();
/// assert_eq!(bridge.get_env(version::V1_8), Ok(env));
/// assert_eq!(bridge.detach_current_thread(), status::OK);
/// ```
pub struct Bridge {
    shared: Arc<BridgeShared>,
}

impl Bridge {
    /// Creates a bridge and installs it as `runtime`'s native linker.
    pub fn new(runtime: Arc<dyn GuestRuntime>, config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let signatures = Arc::new(SignatureCache::new());
        let shared = Arc::new(BridgeShared {
            id: NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed),
            version: config.interface_version(),
            policy: ConversionPolicy::new(config.conversion_mode),
            globals: GlobalTable::new(config.max_globals),
            buffers: NativeBufferRegistry::new(config.max_buffer_bytes),
            binder: Binder::new(Arc::clone(&signatures)),
            signatures,
            methods: MemberTable::new("method"),
            fields: MemberTable::new("field"),
            functions: table::build(),
            runtime: Arc::clone(&runtime),
            config,
        });
        runtime.set_native_linker(Arc::new(BridgeLinker {
            shared: Arc::downgrade(&shared),
            runtime: Arc::downgrade(&runtime),
        }));
        log::debug!(
            "native bridge {} ready: version {}.{}, {:?} conversions",
            shared.id,
            version::major(shared.version),
            version::minor(shared.version),
            shared.config.conversion_mode
        );
        Ok(Self { shared })
    }

    /// The configuration the bridge was created with.
    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    /// The interface version reported to native code.
    pub fn version(&self) -> jint {
        self.shared.version
    }

    /// The guest runtime.
    pub fn runtime(&self) -> &Arc<dyn GuestRuntime> {
        &self.shared.runtime
    }

    /// Native method bindings and symbol sources.
    pub fn binder(&self) -> &Binder {
        &self.shared.binder
    }

    /// The global and weak-global handle table.
    pub fn globals(&self) -> &GlobalTable {
        &self.shared.globals
    }

    /// The native buffer registry.
    pub fn buffers(&self) -> &NativeBufferRegistry {
        &self.shared.buffers
    }

    /// Parsed method signatures.
    pub fn signatures(&self) -> &SignatureCache {
        &self.shared.signatures
    }

    /// The function table native code calls through.
    pub fn function_table(&self) -> &[usize] {
        &self.shared.functions
    }

    /// Attaches the current thread, returning its environment.
    ///
    /// Attaching an attached thread returns the same environment.
    pub fn attach_current_thread(&self) -> *mut JniEnv {
        context::attach(&self.shared)
    }

    /// The current thread's environment.
    ///
    /// Fails with [`status::DETACHED`] if the thread is not attached and
    /// with [`status::VERSION`] if `requested` is not supported.
    pub fn get_env(&self, requested: jint) -> Result<*mut JniEnv, jint> {
        let env = context::current(self.shared.id).ok_or(status::DETACHED)?;
        if !version::is_supported(requested, self.shared.version) {
            return Err(status::VERSION);
        }
        Ok(env)
    }

    /// Detaches the current thread, dropping its locals and any pending
    /// exception.
    ///
    /// Returns [`status::DETACHED`] if the thread was not attached, and
    /// [`status::ERR`] while a native method is running on it.
    pub fn detach_current_thread(&self) -> jint {
        if context::current(self.shared.id).is_none() {
            return status::DETACHED;
        }
        if context::detach(self.shared.id) {
            status::OK
        } else {
            status::ERR
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("id", &self.shared.id)
            .field("version", &format_args!("{:#x}", self.shared.version))
            .field("config", &self.shared.config)
            .finish()
    }
}
