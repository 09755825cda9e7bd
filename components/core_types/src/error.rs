//! Error taxonomy of the native bridge.
//!
//! Two families live here:
//! - [`ErrorKind`] / [`GuestError`]: recoverable guest-level errors. They are
//!   materialized into guest throwables and surfaced through the pending
//!   exception slot.
//! - [`ContractViolation`]: misuse of the native-interface contract by native
//!   code. These are implementation-fatal; see [`fatal`].

use std::fmt;

use thiserror::Error;

/// The kind of a guest-level error raised at the boundary.
///
/// Each kind corresponds to a guest throwable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A field lookup by name and descriptor failed
    NoSuchField,
    /// A method lookup by name and descriptor failed
    NoSuchMethod,
    /// A class lookup by name failed
    NoClassDefFound,
    /// A reference of the wrong type was supplied
    ClassCast,
    /// An array access outside its bounds
    ArrayIndexOutOfBounds,
    /// A string access outside its bounds
    StringIndexOutOfBounds,
    /// Allocation failure or a resource limit was exceeded
    OutOfMemory,
    /// Nested calls exceeded the configured depth
    StackOverflow,
    /// A null reference where an object was required
    NullPointer,
    /// An argument value is invalid
    IllegalArgument,
    /// Monitor exit by a thread that does not own the monitor
    IllegalMonitorState,
    /// A bridge operation without an implementation was invoked
    UnsupportedOperation,
    /// A native method could not be linked
    UnsatisfiedLink,
    /// Allocation of an abstract type or interface
    Instantiation,
    /// Storing an incompatible element into an object array
    ArrayStore,
    /// Creating an array with a negative length
    NegativeArraySize,
    /// Invoking an abstract method
    AbstractMethod,
    /// An internal failure of the bridge itself
    Internal,
}

impl ErrorKind {
    /// Every kind, used to bootstrap the guest throwable classes.
    pub const ALL: [ErrorKind; 18] = [
        ErrorKind::NoSuchField,
        ErrorKind::NoSuchMethod,
        ErrorKind::NoClassDefFound,
        ErrorKind::ClassCast,
        ErrorKind::ArrayIndexOutOfBounds,
        ErrorKind::StringIndexOutOfBounds,
        ErrorKind::OutOfMemory,
        ErrorKind::StackOverflow,
        ErrorKind::NullPointer,
        ErrorKind::IllegalArgument,
        ErrorKind::IllegalMonitorState,
        ErrorKind::UnsupportedOperation,
        ErrorKind::UnsatisfiedLink,
        ErrorKind::Instantiation,
        ErrorKind::ArrayStore,
        ErrorKind::NegativeArraySize,
        ErrorKind::AbstractMethod,
        ErrorKind::Internal,
    ];

    /// Internal name of the guest throwable class for this kind.
    pub fn class_name(self) -> &'static str {
        match self {
            ErrorKind::NoSuchField => "java/lang/NoSuchFieldError",
            ErrorKind::NoSuchMethod => "java/lang/NoSuchMethodError",
            ErrorKind::NoClassDefFound => "java/lang/NoClassDefFoundError",
            ErrorKind::ClassCast => "java/lang/ClassCastException",
            ErrorKind::ArrayIndexOutOfBounds => "java/lang/ArrayIndexOutOfBoundsException",
            ErrorKind::StringIndexOutOfBounds => "java/lang/StringIndexOutOfBoundsException",
            ErrorKind::OutOfMemory => "java/lang/OutOfMemoryError",
            ErrorKind::StackOverflow => "java/lang/StackOverflowError",
            ErrorKind::NullPointer => "java/lang/NullPointerException",
            ErrorKind::IllegalArgument => "java/lang/IllegalArgumentException",
            ErrorKind::IllegalMonitorState => "java/lang/IllegalMonitorStateException",
            ErrorKind::UnsupportedOperation => "java/lang/UnsupportedOperationException",
            ErrorKind::UnsatisfiedLink => "java/lang/UnsatisfiedLinkError",
            ErrorKind::Instantiation => "java/lang/InstantiationException",
            ErrorKind::ArrayStore => "java/lang/ArrayStoreException",
            ErrorKind::NegativeArraySize => "java/lang/NegativeArraySizeException",
            ErrorKind::AbstractMethod => "java/lang/AbstractMethodError",
            ErrorKind::Internal => "java/lang/InternalError",
        }
    }

    /// Returns true if the guest class derives from the error branch
    /// rather than the exception branch of the throwable hierarchy.
    pub fn is_error(self) -> bool {
        self.class_name().ends_with("Error")
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// A guest-level error that has not been materialized into a throwable yet.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, GuestError};
///
/// let err = GuestError::new(ErrorKind::NoSuchField, "count");
/// assert_eq!(err.to_string(), "java/lang/NoSuchFieldError: count");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GuestError {
    /// The throwable kind
    pub kind: ErrorKind,
    /// Detail message
    pub message: String,
}

impl GuestError {
    /// Creates a guest error with a detail message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Misuse of the native-interface contract by native code.
///
/// There is no recoverable ABI path for these: the entry-point layer hands
/// them to [`fatal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// Release of an address that was never handed out
    #[error("release of unknown native buffer at {0:#x}")]
    UnknownBuffer(usize),
    /// Second release of an address
    #[error("double release of native buffer at {0:#x}")]
    DoubleRelease(usize),
    /// A handle that is not live for the operation requested
    #[error("invalid {expected} handle {handle:#x}")]
    InvalidHandle {
        /// Raw handle value
        handle: usize,
        /// Which kind the operation expected
        expected: &'static str,
    },
    /// A frame pop without a matching push
    #[error("local frame pop without matching push")]
    UnbalancedFrame,
    /// An identifier that does not name a live field or method
    #[error("invalid {kind} id {id:#x}")]
    InvalidMemberId {
        /// `field` or `method`
        kind: &'static str,
        /// Raw identifier
        id: usize,
    },
    /// A null environment pointer or a thread using another thread's environment
    #[error("invalid native environment: {0}")]
    InvalidEnvironment(String),
    /// Native code asked for a fatal stop
    #[error("fatal error requested by native code: {0}")]
    Requested(String),
}

/// Terminates the process after a contract violation.
///
/// Logs the violation at error level first; there is no way back.
pub fn fatal(violation: &ContractViolation) -> ! {
    log::error!("native interface contract violation: {violation}");
    eprintln!("FATAL: native interface contract violation: {violation}");
    std::process::abort()
}
