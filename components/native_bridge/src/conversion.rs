//! Primitive conversion policy.
//!
//! Entry points are nominally typed (`GetIntField`, `CallLongMethodA`, ...)
//! but the value actually stored or returned may be of another kind. The
//! policy decides what happens then:
//!
//! - [`ConversionMode::Strict`]: any mismatch is an internal error.
//! - [`ConversionMode::Compatibility`]: the value is reinterpreted through a
//!   64-bit intermediate. Booleans become 0/1, integral kinds truncate or
//!   sign-extend, floating kinds travel as their IEEE bit patterns.
//!
//! A null where a primitive is wanted resolves to the kind's default only when
//! the call site passes [`NullPolicy::DefaultIfNull`].

use core_types::{ErrorKind, GuestError, Kind};
use object_model::{ObjectRef, Value};
use thiserror::Error;

use crate::config::ConversionMode;

/// What a call site allows when the value is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Null becomes the kind's default value
    DefaultIfNull,
    /// Null is an error
    Reject,
}

/// A value that the policy refused to convert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Strict mode met a kind mismatch
    #[error("strict conversion: {found} value where {expected} was expected")]
    Strict {
        /// Kind the entry point is typed for
        expected: Kind,
        /// Kind of the value present
        found: Kind,
    },
    /// Null where the call site requires a value
    #[error("null where {0} was expected")]
    Null(Kind),
    /// A reference where a primitive was expected, or the reverse
    #[error("cannot convert {found} to {expected}")]
    Incompatible {
        /// Kind the entry point is typed for
        expected: Kind,
        /// Kind of the value present
        found: Kind,
    },
}

impl ConversionError {
    /// The guest error this failure surfaces as.
    ///
    /// Strict-mode mismatches are bridge bugs, not guest errors, and surface
    /// as internal errors.
    pub fn to_guest_error(&self) -> GuestError {
        let kind = match self {
            ConversionError::Strict { .. } => ErrorKind::Internal,
            ConversionError::Null(_) => ErrorKind::NullPointer,
            ConversionError::Incompatible { .. } => ErrorKind::ClassCast,
        };
        GuestError::new(kind, self.to_string())
    }
}

/// Reconciles kind mismatches between stored values and typed entry points.
///
/// # Examples
///
/// ```
/// use core_types::Kind;
/// use native_bridge::{ConversionMode, ConversionPolicy, NullPolicy};
/// use object_model::Value;
///
/// let compat = ConversionPolicy::new(ConversionMode::Compatibility);
/// assert_eq!(compat.coerce(Value::Long(-1), Kind::Byte, NullPolicy::Reject), Ok(Value::Byte(-1)));
/// assert_eq!(compat.coerce(Value::Boolean(true), Kind::Int, NullPolicy::Reject), Ok(Value::Int(1)));
///
/// let strict = ConversionPolicy::new(ConversionMode::Strict);
/// assert!(strict.coerce(Value::Long(-1), Kind::Byte, NullPolicy::Reject).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionPolicy {
    mode: ConversionMode,
}

impl ConversionPolicy {
    /// Creates a policy for `mode`.
    pub fn new(mode: ConversionMode) -> Self {
        Self { mode }
    }

    /// The configured mode.
    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    /// Converts `value` to kind `want`.
    ///
    /// Values already of kind `want` pass through untouched. `Void` as the
    /// wanted kind discards the value.
    pub fn coerce(&self, value: Value, want: Kind, nulls: NullPolicy) -> Result<Value, ConversionError> {
        if want == Kind::Void {
            return Ok(Value::Void);
        }
        if want == Kind::Object {
            return self.object_fallback(value).map(Value::Object);
        }
        let found = value.kind();
        if found == want {
            return Ok(value);
        }
        match value {
            Value::Object(None) | Value::Void => match nulls {
                NullPolicy::DefaultIfNull => Ok(Value::default_for(want)),
                NullPolicy::Reject => Err(ConversionError::Null(want)),
            },
            Value::Object(Some(_)) => Err(ConversionError::Incompatible { expected: want, found }),
            _ if self.mode == ConversionMode::Strict => Err(ConversionError::Strict { expected: want, found }),
            primitive => {
                let bits = to_bits(&primitive).ok_or(ConversionError::Incompatible { expected: want, found })?;
                log::trace!("reinterpreting {found} as {want}");
                Ok(from_bits(bits, want))
            }
        }
    }

    /// Resolves a value that should be a reference.
    ///
    /// References and void pass through. A primitive is a mismatch: in
    /// compatibility mode an all-zero primitive reads as null and anything
    /// else is incompatible; strict mode rejects every primitive.
    pub fn object_fallback(&self, value: Value) -> Result<Option<ObjectRef>, ConversionError> {
        match value {
            Value::Object(object) => Ok(object),
            Value::Void => Ok(None),
            primitive => {
                let found = primitive.kind();
                if self.mode == ConversionMode::Strict {
                    return Err(ConversionError::Strict {
                        expected: Kind::Object,
                        found,
                    });
                }
                match to_bits(&primitive) {
                    Some(0) => Ok(None),
                    _ => Err(ConversionError::Incompatible {
                        expected: Kind::Object,
                        found,
                    }),
                }
            }
        }
    }
}

/// The 64-bit intermediate of a primitive value.
fn to_bits(value: &Value) -> Option<u64> {
    Some(match *value {
        Value::Boolean(b) => b as u64,
        Value::Byte(b) => b as i64 as u64,
        Value::Char(c) => c as u64,
        Value::Short(s) => s as i64 as u64,
        Value::Int(i) => i as i64 as u64,
        Value::Float(f) => f.to_bits() as u64,
        Value::Long(l) => l as u64,
        Value::Double(d) => d.to_bits(),
        Value::Object(_) | Value::Void => return None,
    })
}

fn from_bits(bits: u64, kind: Kind) -> Value {
    match kind {
        Kind::Boolean => Value::Boolean(bits != 0),
        Kind::Byte => Value::Byte(bits as i8),
        Kind::Char => Value::Char(bits as u16),
        Kind::Short => Value::Short(bits as i16),
        Kind::Int => Value::Int(bits as i32),
        Kind::Float => Value::Float(f32::from_bits(bits as u32)),
        Kind::Long => Value::Long(bits as i64),
        Kind::Double => Value::Double(f64::from_bits(bits)),
        Kind::Object => Value::null(),
        Kind::Void => Value::Void,
    }
}
