//! The outer layer of every entry point.
//!
//! [`guard`] validates the environment, runs the entry's body and converts
//! whatever goes wrong into the ABI's conventions: guest errors, allocation
//! failures and panics become a pending exception plus the type's default
//! return value; contract violations end the process.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use core_types::{fatal, ContractViolation, ErrorKind, GuestError};
use memory_manager::{AllocError, FrameError};
use object_model::{ObjectRef, Thrown};
use thiserror::Error;

use crate::binder::BindError;
use crate::context::{JniEnv, NativeContext};
use crate::conversion::ConversionError;

/// Why an entry point did not complete.
#[derive(Debug, Error)]
pub enum EntryError {
    /// A guest error raised by the bridge itself
    #[error(transparent)]
    Guest(#[from] GuestError),
    /// A guest exception thrown by a guest call
    #[error("guest exception {}", .0.class_name())]
    Thrown(Thrown),
    /// Handle or buffer exhaustion
    #[error(transparent)]
    Alloc(#[from] AllocError),
    /// The conversion policy refused a value
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// Native method registration or linking failed
    #[error(transparent)]
    Bind(#[from] BindError),
    /// Native code broke the interface contract
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

impl From<FrameError> for EntryError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Unbalanced(violation) => EntryError::Contract(violation),
            FrameError::Promotion(error) => EntryError::Alloc(error),
        }
    }
}

impl From<Thrown> for EntryError {
    fn from(thrown: Thrown) -> Self {
        EntryError::Thrown(thrown)
    }
}

impl EntryError {
    /// The throwable standing for this error.
    ///
    /// Contract violations do not return.
    pub(crate) fn into_throwable(self, ctx: &NativeContext, entry: &str) -> ObjectRef {
        let error = match self {
            EntryError::Thrown(thrown) => {
                log::debug!("{entry}: guest exception {}", thrown.class_name());
                return thrown.0;
            }
            EntryError::Contract(violation) => fatal(&violation),
            EntryError::Guest(error) => error,
            EntryError::Alloc(error) => GuestError::new(ErrorKind::OutOfMemory, error.to_string()),
            EntryError::Conversion(error) => {
                if matches!(error, ConversionError::Strict { .. }) {
                    log::error!("{entry}: {error}");
                }
                error.to_guest_error()
            }
            EntryError::Bind(error) => error.to_guest_error(),
        };
        log::warn!("{entry}: {error}");
        ctx.runtime().materialize(&error)
    }
}

/// Runs an entry point body for native code.
///
/// # Safety
///
/// `env` must be null or an environment pointer handed out by a bridge.
pub(crate) unsafe fn guard<R>(
    env: *mut JniEnv,
    entry: &'static str,
    default: R,
    body: impl FnOnce(&NativeContext) -> Result<R, EntryError>,
) -> R {
    // SAFETY: forwarded from the caller
    let ctx = match unsafe { NativeContext::from_env(env) } {
        Ok(ctx) => ctx,
        Err(violation) => fatal(&violation),
    };
    match panic::catch_unwind(AssertUnwindSafe(|| body(ctx))) {
        Ok(Ok(value)) => value,
        Ok(Err(error)) => {
            let throwable = error.into_throwable(ctx, entry);
            ctx.pending().set(throwable);
            default
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("{entry}: panicked: {message}");
            ctx.raise(&GuestError::new(ErrorKind::Internal, format!("{entry}: {message}")));
            default
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
