//! Guest heap objects.
//!
//! An [`Object`] pairs its class with a body: instance fields, array
//! elements, string text, a class mirror or a reflected member. Every object
//! carries its own intrinsic [`Monitor`].

use std::fmt;
use std::sync::Arc;

use core_types::Kind;
use parking_lot::RwLock;

use crate::class::{Class, Field, Method};
use crate::monitor::Monitor;
use crate::value::{ObjectRef, Value};

/// A reflected class member carried by reflection objects.
#[derive(Clone)]
pub enum Member {
    /// A method or constructor
    Method(Arc<Method>),
    /// A field
    Field(Arc<Field>),
}

macro_rules! array_data {
    ($($variant:ident => $elem:ty, $kind:ident, $wrap:expr, $unwrap:pat => $out:expr;)*) => {
        /// Element storage of a guest array.
        ///
        /// Primitive arrays store unboxed elements so that region copies to
        /// native memory are plain slice copies.
        pub enum ArrayData {
            $(
                #[doc = concat!("`", stringify!($elem), "` elements")]
                $variant(RwLock<Vec<$elem>>),
            )*
            /// Reference elements
            Object(RwLock<Vec<Option<ObjectRef>>>),
        }

        impl ArrayData {
            /// Zero-filled storage for a primitive element kind.
            ///
            /// Returns `None` for `Object` and `Void`.
            pub fn primitive(kind: Kind, len: usize) -> Option<ArrayData> {
                match kind {
                    $(Kind::$kind => Some(ArrayData::$variant(RwLock::new(vec![<$elem>::default(); len]))),)*
                    _ => None,
                }
            }

            /// Number of elements.
            pub fn len(&self) -> usize {
                match self {
                    $(ArrayData::$variant(v) => v.read().len(),)*
                    ArrayData::Object(v) => v.read().len(),
                }
            }

            /// Kind of the elements.
            pub fn element_kind(&self) -> Kind {
                match self {
                    $(ArrayData::$variant(_) => Kind::$kind,)*
                    ArrayData::Object(_) => Kind::Object,
                }
            }

            /// Reads one element.
            pub fn get(&self, index: usize) -> Option<Value> {
                match self {
                    $(ArrayData::$variant(v) => v.read().get(index).map(|&e| $wrap(e)),)*
                    ArrayData::Object(v) => v.read().get(index).map(|e| Value::Object(e.clone())),
                }
            }

            /// Writes one element. Fails on a kind mismatch or a bad index.
            pub fn set(&self, index: usize, value: Value) -> bool {
                match (self, value) {
                    $(
                        (ArrayData::$variant(v), $unwrap) => match v.write().get_mut(index) {
                            Some(slot) => {
                                *slot = $out;
                                true
                            }
                            None => false,
                        },
                    )*
                    (ArrayData::Object(v), Value::Object(obj)) => match v.write().get_mut(index) {
                        Some(slot) => {
                            *slot = obj;
                            true
                        }
                        None => false,
                    },
                    _ => false,
                }
            }

            /// Native-endian bytes of `len` elements starting at `start`.
            ///
            /// `None` for reference arrays and for ranges outside the array;
            /// nothing is read in that case.
            pub fn read_region(&self, start: usize, len: usize) -> Option<Vec<u8>> {
                let end = start.checked_add(len)?;
                match self {
                    $(
                        ArrayData::$variant(v) => {
                            let v = v.read();
                            let elements = v.get(start..end)?;
                            Some(elements.iter().flat_map(|e| e.to_ne_bytes()).collect())
                        }
                    )*
                    ArrayData::Object(_) => None,
                }
            }

            /// Overwrites elements starting at `start` from native-endian bytes.
            ///
            /// Fails without writing anything if `bytes` is not a whole number
            /// of elements or the range leaves the array.
            pub fn write_region(&self, start: usize, bytes: &[u8]) -> bool {
                match self {
                    $(
                        ArrayData::$variant(v) => {
                            const WIDTH: usize = std::mem::size_of::<$elem>();
                            if bytes.len() % WIDTH != 0 {
                                return false;
                            }
                            let mut v = v.write();
                            let Some(end) = start.checked_add(bytes.len() / WIDTH) else {
                                return false;
                            };
                            let Some(elements) = v.get_mut(start..end) else {
                                return false;
                            };
                            for (slot, chunk) in elements.iter_mut().zip(bytes.chunks_exact(WIDTH)) {
                                let mut raw = [0u8; WIDTH];
                                raw.copy_from_slice(chunk);
                                *slot = <$elem>::from_ne_bytes(raw);
                            }
                            true
                        }
                    )*
                    ArrayData::Object(_) => false,
                }
            }
        }
    };
}

array_data! {
    Boolean => u8, Boolean, |e: u8| Value::Boolean(e != 0), Value::Boolean(b) => b as u8;
    Byte => i8, Byte, Value::Byte, Value::Byte(b) => b;
    Char => u16, Char, Value::Char, Value::Char(c) => c;
    Short => i16, Short, Value::Short, Value::Short(s) => s;
    Int => i32, Int, Value::Int, Value::Int(i) => i;
    Float => f32, Float, Value::Float, Value::Float(f) => f;
    Long => i64, Long, Value::Long, Value::Long(l) => l;
    Double => f64, Double, Value::Double, Value::Double(d) => d;
}

impl ArrayData {
    /// Reference storage, every element set to `init`.
    pub fn objects(len: usize, init: Option<ObjectRef>) -> ArrayData {
        ArrayData::Object(RwLock::new(vec![init; len]))
    }

    /// Returns true for a zero-length array.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The payload of a guest object.
pub enum ObjectBody {
    /// Instance fields, indexed by [`Field::slot`]
    Instance(RwLock<Vec<Value>>),
    /// Array elements
    Array(ArrayData),
    /// Immutable string text in UTF-16 code units
    String(Vec<u16>),
    /// The class object of a guest class
    Mirror(Arc<Class>),
    /// A reflection object
    Member(Member),
}

/// A guest heap object.
pub struct Object {
    class: Arc<Class>,
    body: ObjectBody,
    monitor: Monitor,
    identity: u64,
}

impl Object {
    pub(crate) fn new(class: Arc<Class>, body: ObjectBody, identity: u64) -> Self {
        Self {
            class,
            body,
            monitor: Monitor::new(),
            identity,
        }
    }

    /// The class of this object.
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// The object's payload.
    pub fn body(&self) -> &ObjectBody {
        &self.body
    }

    /// The object's intrinsic monitor.
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Identity hash, unique per object for the life of the VM.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// Reads an instance field. `None` if this object has no such slot.
    pub fn get_field(&self, field: &Field) -> Option<Value> {
        match &self.body {
            ObjectBody::Instance(values) if !field.is_static() => values.read().get(field.slot()).cloned(),
            _ => None,
        }
    }

    /// Writes an instance field. Returns false if this object has no such slot.
    pub fn set_field(&self, field: &Field, value: Value) -> bool {
        match &self.body {
            ObjectBody::Instance(values) if !field.is_static() => match values.write().get_mut(field.slot()) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Array storage, for array objects.
    pub fn array(&self) -> Option<&ArrayData> {
        match &self.body {
            ObjectBody::Array(data) => Some(data),
            _ => None,
        }
    }

    /// String text, for string objects.
    pub fn string_units(&self) -> Option<&[u16]> {
        match &self.body {
            ObjectBody::String(units) => Some(units),
            _ => None,
        }
    }

    /// String text decoded lossily, for string objects.
    pub fn to_rust_string(&self) -> Option<String> {
        self.string_units().map(String::from_utf16_lossy)
    }

    /// The class a class object stands for.
    pub fn mirrored_class(&self) -> Option<&Arc<Class>> {
        match &self.body {
            ObjectBody::Mirror(class) => Some(class),
            _ => None,
        }
    }

    /// The member a reflection object stands for.
    pub fn member(&self) -> Option<&Member> {
        match &self.body {
            ObjectBody::Member(member) => Some(member),
            _ => None,
        }
    }

    /// Returns true if this object's class is `class` or a subtype of it.
    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.class.is_subclass_of(class)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name())
            .field("identity", &self.identity)
            .finish()
    }
}
