//! Guest value representation.
//!
//! [`Value`] is an explicit tagged union over the nine guest value kinds.
//! References are shared [`ObjectRef`] pointers; a weak reference primitive
//! ([`WeakObjectRef`]) is what weak-global handles store.

use std::fmt;
use std::sync::{Arc, Weak};

use core_types::Kind;

use crate::object::Object;

/// Strong reference to a guest object.
pub type ObjectRef = Arc<Object>;

/// Weak reference to a guest object; does not keep the referent alive.
pub type WeakObjectRef = Weak<Object>;

/// A guest value of one of the nine kinds, or `Void` for method returns.
///
/// # Examples
///
/// ```
/// use core_types::Kind;
/// use object_model::Value;
///
/// let v = Value::Int(7);
/// assert_eq!(v.kind(), Kind::Int);
/// assert_eq!(Value::default_for(Kind::Double), Value::Double(0.0));
/// assert!(Value::null().is_null());
/// ```
#[derive(Clone)]
pub enum Value {
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `char` (one UTF-16 code unit)
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `float`
    Float(f32),
    /// `long`
    Long(i64),
    /// `double`
    Double(f64),
    /// A reference, `None` being the guest null
    Object(Option<ObjectRef>),
    /// Result of a void method
    Void,
}

impl Value {
    /// The guest null reference.
    pub fn null() -> Value {
        Value::Object(None)
    }

    /// Wraps an object reference.
    pub fn from_object(obj: ObjectRef) -> Value {
        Value::Object(Some(obj))
    }

    /// The kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Boolean(_) => Kind::Boolean,
            Value::Byte(_) => Kind::Byte,
            Value::Char(_) => Kind::Char,
            Value::Short(_) => Kind::Short,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Long(_) => Kind::Long,
            Value::Double(_) => Kind::Double,
            Value::Object(_) => Kind::Object,
            Value::Void => Kind::Void,
        }
    }

    /// The zero value of a kind: `false`, `0`, `0.0`, null or `Void`.
    pub fn default_for(kind: Kind) -> Value {
        match kind {
            Kind::Boolean => Value::Boolean(false),
            Kind::Byte => Value::Byte(0),
            Kind::Char => Value::Char(0),
            Kind::Short => Value::Short(0),
            Kind::Int => Value::Int(0),
            Kind::Float => Value::Float(0.0),
            Kind::Long => Value::Long(0),
            Kind::Double => Value::Double(0.0),
            Kind::Object => Value::Object(None),
            Kind::Void => Value::Void,
        }
    }

    /// Returns true for the null reference.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Object(None))
    }

    /// The referenced object, if this is a non-null reference.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(Some(obj)) => Some(obj),
            _ => None,
        }
    }

    /// Takes the reference out of an object value.
    pub fn into_object(self) -> Option<ObjectRef> {
        match self {
            Value::Object(obj) => obj,
            _ => None,
        }
    }

    /// The int payload, only for `Int` values.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The long payload, only for `Long` values.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// The double payload, only for `Double` values.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The boolean payload, only for `Boolean` values.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Object(None), Value::Object(None)) => true,
            (Value::Object(Some(a)), Value::Object(Some(b))) => Arc::ptr_eq(a, b),
            (Value::Void, Value::Void) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => f.debug_tuple("Boolean").field(v).finish(),
            Value::Byte(v) => f.debug_tuple("Byte").field(v).finish(),
            Value::Char(v) => f.debug_tuple("Char").field(v).finish(),
            Value::Short(v) => f.debug_tuple("Short").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Long(v) => f.debug_tuple("Long").field(v).finish(),
            Value::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Value::Object(None) => write!(f, "Null"),
            Value::Object(Some(obj)) => write!(f, "Object({}@{:x})", obj.class().name(), obj.identity()),
            Value::Void => write!(f, "Void"),
        }
    }
}
