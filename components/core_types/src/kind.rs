//! Value kinds shared by every layer of the native bridge.
//!
//! A [`Kind`] names one of the nine guest value kinds (eight primitives plus
//! object references) or `Void` for method returns. Kinds drive signature
//! parsing, argument marshalling and the primitive conversion policy.

use std::fmt;

/// The kind of a guest value as seen across the native boundary.
///
/// # Examples
///
/// ```
/// use core_types::Kind;
///
/// assert_eq!(Kind::from_type_char('I'), Some(Kind::Int));
/// assert_eq!(Kind::Long.type_char(), 'J');
/// assert!(Kind::Double.is_wide());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `Z`: unsigned 8-bit truth value
    Boolean,
    /// `B`: signed 8-bit integer
    Byte,
    /// `C`: unsigned 16-bit UTF-16 code unit
    Char,
    /// `S`: signed 16-bit integer
    Short,
    /// `I`: signed 32-bit integer
    Int,
    /// `F`: IEEE 754 single precision
    Float,
    /// `J`: signed 64-bit integer
    Long,
    /// `D`: IEEE 754 double precision
    Double,
    /// `L...;` or `[...`: reference to a guest object (possibly null)
    Object,
    /// `V`: no value (method returns only)
    Void,
}

impl Kind {
    /// All eight primitive kinds, in descriptor order.
    pub const PRIMITIVES: [Kind; 8] = [
        Kind::Boolean,
        Kind::Byte,
        Kind::Char,
        Kind::Short,
        Kind::Int,
        Kind::Float,
        Kind::Long,
        Kind::Double,
    ];

    /// Maps a descriptor character to its kind.
    ///
    /// Both `L` and `[` map to [`Kind::Object`].
    pub fn from_type_char(c: char) -> Option<Kind> {
        match c {
            'Z' => Some(Kind::Boolean),
            'B' => Some(Kind::Byte),
            'C' => Some(Kind::Char),
            'S' => Some(Kind::Short),
            'I' => Some(Kind::Int),
            'F' => Some(Kind::Float),
            'J' => Some(Kind::Long),
            'D' => Some(Kind::Double),
            'L' | '[' => Some(Kind::Object),
            'V' => Some(Kind::Void),
            _ => None,
        }
    }

    /// The descriptor character for this kind (`L` for objects).
    pub fn type_char(self) -> char {
        match self {
            Kind::Boolean => 'Z',
            Kind::Byte => 'B',
            Kind::Char => 'C',
            Kind::Short => 'S',
            Kind::Int => 'I',
            Kind::Float => 'F',
            Kind::Long => 'J',
            Kind::Double => 'D',
            Kind::Object => 'L',
            Kind::Void => 'V',
        }
    }

    /// Returns true for the eight primitive kinds.
    pub fn is_primitive(self) -> bool {
        !matches!(self, Kind::Object | Kind::Void)
    }

    /// Returns true for the kinds stored as 64-bit values.
    pub fn is_wide(self) -> bool {
        matches!(self, Kind::Long | Kind::Double)
    }

    /// Returns true for boolean, byte, char, short, int and long.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Kind::Boolean | Kind::Byte | Kind::Char | Kind::Short | Kind::Int | Kind::Long
        )
    }

    /// Size in bytes of one element of this kind in native memory.
    ///
    /// Objects are pointer sized; `Void` has no storage.
    pub fn byte_size(self) -> usize {
        match self {
            Kind::Boolean | Kind::Byte => 1,
            Kind::Char | Kind::Short => 2,
            Kind::Int | Kind::Float => 4,
            Kind::Long | Kind::Double => 8,
            Kind::Object => std::mem::size_of::<usize>(),
            Kind::Void => 0,
        }
    }

    /// The guest language keyword for this kind.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::Byte => "byte",
            Kind::Char => "char",
            Kind::Short => "short",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Long => "long",
            Kind::Double => "double",
            Kind::Object => "Object",
            Kind::Void => "void",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
