//! Per-thread native contexts.
//!
//! Native code receives a `JNIEnv*`: a pointer to a [`JniEnv`] whose first
//! word is the function-table pointer. Behind it sits the thread's
//! [`NativeContext`] with its local frames and pending-exception slot. Both
//! are confined to the thread that attached; only the bridge's global table
//! and buffer registry are shared.
//!
//! Guest calls made from an entry point may re-enter the bridge on the same
//! thread, so the context is only ever borrowed for the duration of a single
//! table operation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use core_types::{mutf8, ContractViolation, ErrorKind, GuestError, RefKind};
use memory_manager::{AllocError, FrameError, Handle, LocalFrames};
use object_model::{Class, Field, GuestRuntime, Method, ObjectRef};

use crate::bridge::BridgeShared;
use crate::conversion::ConversionPolicy;
use crate::exception::PendingException;
use crate::guard::EntryError;
use crate::sys::{jfieldID, jmethodID, jobject};

/// The structure a `JNIEnv*` points at.
#[repr(C)]
pub struct JniEnv {
    functions: *const usize,
    context: NativeContext,
}

impl JniEnv {
    /// The function table, four reserved slots first.
    pub fn functions(&self) -> *const usize {
        self.functions
    }

    /// The native context behind this environment.
    pub fn context(&self) -> &NativeContext {
        &self.context
    }
}

/// State of one native thread attached to one bridge.
pub struct NativeContext {
    shared: Arc<BridgeShared>,
    locals: RefCell<LocalFrames>,
    pending: PendingException,
    thread: ThreadId,
}

impl NativeContext {
    /// Validates an environment pointer received from native code.
    ///
    /// # Safety
    ///
    /// A non-null `env` must be a pointer produced by this crate whose
    /// context has not been detached.
    pub unsafe fn from_env<'a>(env: *mut JniEnv) -> Result<&'a NativeContext, ContractViolation> {
        if env.is_null() {
            return Err(ContractViolation::InvalidEnvironment("null environment".to_string()));
        }
        // SAFETY: non-null and live per the caller's contract
        let context = unsafe { &(*env).context };
        if context.thread != thread::current().id() {
            return Err(ContractViolation::InvalidEnvironment(format!(
                "environment of {:?} used on {:?}",
                context.thread,
                thread::current().id()
            )));
        }
        Ok(context)
    }

    pub(crate) fn shared(&self) -> &Arc<BridgeShared> {
        &self.shared
    }

    /// The guest runtime this context calls into.
    pub fn runtime(&self) -> &Arc<dyn GuestRuntime> {
        self.shared.runtime()
    }

    /// The pending-exception slot.
    pub fn pending(&self) -> &PendingException {
        &self.pending
    }

    /// The conversion policy in force.
    pub fn policy(&self) -> ConversionPolicy {
        self.shared.policy()
    }

    /// Materializes `error` and makes it the pending exception.
    pub fn raise(&self, error: &GuestError) {
        let throwable = self.runtime().materialize(error);
        self.pending.set(throwable);
    }

    // =========================================================================
    // Handles
    // =========================================================================

    /// Creates a local handle in the innermost frame.
    pub fn new_local(&self, object: Option<ObjectRef>) -> Result<Handle, AllocError> {
        self.locals.borrow_mut().handlify(object)
    }

    /// Resolves a handle of any kind. Null, deleted and foreign handles
    /// resolve to `None`.
    pub fn resolve(&self, handle: Handle) -> Option<ObjectRef> {
        match handle.tag_kind() {
            RefKind::Local => self.locals.borrow().resolve(handle),
            RefKind::Global | RefKind::WeakGlobal => self.shared.globals().resolve(handle),
            RefKind::Invalid => None,
        }
    }

    /// The kind of a live handle; `Invalid` for anything else.
    pub fn ref_kind(&self, handle: Handle) -> RefKind {
        let live = match handle.tag_kind() {
            RefKind::Local => self.locals.borrow().is_live(handle),
            RefKind::Global | RefKind::WeakGlobal => self.shared.globals().is_live(handle),
            RefKind::Invalid => false,
        };
        if live {
            handle.tag_kind()
        } else {
            RefKind::Invalid
        }
    }

    /// Releases a local handle early. Returns false if it was not live.
    pub fn delete_local(&self, handle: Handle) -> bool {
        self.locals.borrow_mut().delete(handle)
    }

    /// Opens a local frame.
    pub fn push_frame(&self, capacity: usize) -> Result<(), AllocError> {
        self.locals.borrow_mut().push_frame(capacity)
    }

    /// Closes the innermost local frame, promoting `result`.
    pub fn pop_frame(&self, result: Option<ObjectRef>) -> Result<Handle, FrameError> {
        self.locals.borrow_mut().pop_frame(result)
    }

    /// Reserves room for `capacity` locals in the innermost frame.
    pub fn ensure_capacity(&self, capacity: usize) -> Result<(), AllocError> {
        self.locals.borrow_mut().ensure_capacity(capacity)
    }

    /// Number of live local handles.
    pub fn local_count(&self) -> usize {
        self.locals.borrow().live_count()
    }

    /// Number of open local frames, the root frame included.
    pub fn frame_depth(&self) -> usize {
        self.locals.borrow().depth()
    }

    // =========================================================================
    // Entry-point helpers
    // =========================================================================

    /// Resolves a raw reference argument.
    pub(crate) fn object(&self, raw: jobject) -> Option<ObjectRef> {
        self.resolve(Handle::from_raw(raw as usize))
    }

    /// Resolves a raw reference argument that must not be null.
    pub(crate) fn require(&self, raw: jobject, what: &str) -> Result<ObjectRef, EntryError> {
        self.object(raw)
            .ok_or_else(|| GuestError::new(ErrorKind::NullPointer, format!("{what} is null")).into())
    }

    /// Resolves a class argument.
    pub(crate) fn class(&self, raw: jobject) -> Result<Arc<Class>, EntryError> {
        let mirror = self.require(raw, "class")?;
        mirror.mirrored_class().cloned().ok_or_else(|| {
            GuestError::new(
                ErrorKind::IllegalArgument,
                format!("{} is not a class", mirror.class().dotted_name()),
            )
            .into()
        })
    }

    /// Returns `object` to native code as a new local handle.
    pub(crate) fn local(&self, object: Option<ObjectRef>) -> Result<jobject, EntryError> {
        Ok(self.new_local(object)?.raw() as jobject)
    }

    /// Returns the class object of `class` as a new local handle.
    pub(crate) fn class_local(&self, class: &Arc<Class>) -> Result<jobject, EntryError> {
        self.local(Some(self.runtime().class_mirror(class)))
    }

    pub(crate) fn method(&self, id: jmethodID) -> Result<Arc<Method>, EntryError> {
        Ok(self.shared.methods().get(id as usize)?)
    }

    pub(crate) fn method_id(&self, method: &Arc<Method>) -> jmethodID {
        self.shared.methods().id_for(method) as jmethodID
    }

    pub(crate) fn field(&self, id: jfieldID) -> Result<Arc<Field>, EntryError> {
        Ok(self.shared.fields().get(id as usize)?)
    }

    pub(crate) fn field_id(&self, field: &Arc<Field>) -> jfieldID {
        self.shared.fields().id_for(field) as jfieldID
    }

    /// Decodes a NUL-terminated modified UTF-8 string from native code.
    pub(crate) fn text(&self, raw: *const c_char, what: &str) -> Result<String, EntryError> {
        if raw.is_null() {
            return Err(GuestError::new(ErrorKind::NullPointer, format!("{what} is null")).into());
        }
        // SAFETY: native code passes NUL-terminated strings
        let bytes = unsafe { CStr::from_ptr(raw) }.to_bytes();
        Ok(String::from_utf16_lossy(&mutf8::decode_lossy(bytes)))
    }
}

// =============================================================================
// Attachment
// =============================================================================

thread_local! {
    static ENVIRONMENTS: RefCell<HashMap<u64, Box<JniEnv>>> = RefCell::new(HashMap::new());
}

/// The current thread's environment for `shared`, creating it if needed.
pub(crate) fn attach(shared: &Arc<BridgeShared>) -> *mut JniEnv {
    ENVIRONMENTS.with(|envs| {
        let mut envs = envs.borrow_mut();
        let env = envs.entry(shared.id()).or_insert_with(|| {
            log::debug!("attaching {:?} to bridge {}", thread::current().id(), shared.id());
            Box::new(JniEnv {
                functions: shared.function_table().as_ptr(),
                context: NativeContext {
                    shared: Arc::clone(shared),
                    locals: RefCell::new(LocalFrames::new(shared.config().max_locals)),
                    pending: PendingException::new(),
                    thread: thread::current().id(),
                },
            })
        });
        &mut **env as *mut JniEnv
    })
}

/// The current thread's environment for bridge `id`, if attached.
pub(crate) fn current(id: u64) -> Option<*mut JniEnv> {
    ENVIRONMENTS.with(|envs| {
        envs.borrow_mut()
            .get_mut(&id)
            .map(|env| &mut **env as *mut JniEnv)
    })
}

/// Drops the current thread's environment for bridge `id`.
///
/// Refused while a native method is running on this thread.
pub(crate) fn detach(id: u64) -> bool {
    let removed = ENVIRONMENTS.with(|envs| {
        let mut envs = envs.borrow_mut();
        let busy = envs.get(&id).is_some_and(|env| env.context.frame_depth() > 1);
        if busy {
            log::warn!("refusing to detach {:?} inside a native call", thread::current().id());
            return None;
        }
        envs.remove(&id)
    });
    match removed {
        Some(env) => {
            log::debug!("detached {:?} from bridge {id}", thread::current().id());
            // dropping the environment may drop guest objects, keep it out of the borrow
            drop(env);
            true
        }
        None => false,
    }
}
