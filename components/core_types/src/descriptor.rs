//! Type and method descriptor parsing.
//!
//! Descriptors are the textual type encoding used by member lookups and
//! native registration: `I`, `[J`, `Ljava/lang/String;` for types and
//! `(ID[Ljava/lang/Object;)V` for methods.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::Kind;

/// Errors raised while parsing a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The descriptor was empty
    #[error("empty descriptor")]
    Empty,
    /// A character that does not start any type
    #[error("unexpected character {found:?} at offset {offset} in {descriptor:?}")]
    UnexpectedChar {
        /// Full descriptor text
        descriptor: String,
        /// Byte offset of the offending character
        offset: usize,
        /// The offending character
        found: char,
    },
    /// An object type without its terminating `;`
    #[error("unterminated class name in {0:?}")]
    UnterminatedClass(String),
    /// `V` used anywhere but a method return
    #[error("void is only legal as a method return type in {0:?}")]
    MisplacedVoid(String),
    /// Method descriptor without its parameter list
    #[error("method descriptor {0:?} must start with '('")]
    MissingParameters(String),
    /// Characters left after a complete descriptor
    #[error("trailing characters in {0:?}")]
    TrailingInput(String),
}

/// One parsed type: its kind plus the exact descriptor text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    kind: Kind,
    text: String,
}

impl TypeDescriptor {
    /// Parses a single field descriptor such as `I` or `[Ljava/lang/String;`.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        let (ty, end) = parse_one(descriptor, 0)?;
        if end != descriptor.len() {
            return Err(DescriptorError::TrailingInput(descriptor.to_string()));
        }
        if ty.kind == Kind::Void {
            return Err(DescriptorError::MisplacedVoid(descriptor.to_string()));
        }
        Ok(ty)
    }

    /// The kind this type marshals as.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The descriptor text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns true for array types.
    pub fn is_array(&self) -> bool {
        self.text.starts_with('[')
    }

    /// The internal class name of a reference type.
    ///
    /// `Ljava/lang/String;` yields `java/lang/String`; array types yield the
    /// descriptor itself, which is how array classes are named.
    pub fn class_name(&self) -> Option<&str> {
        match self.kind {
            Kind::Object if self.is_array() => Some(&self.text),
            Kind::Object => Some(&self.text[1..self.text.len() - 1]),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A parsed method descriptor.
///
/// # Examples
///
/// ```
/// use core_types::{Kind, MethodDescriptor};
///
/// let desc: MethodDescriptor = "(IDZLjava/lang/Object;)V".parse().unwrap();
/// assert_eq!(
///     desc.param_kinds(),
///     vec![Kind::Int, Kind::Double, Kind::Boolean, Kind::Object]
/// );
/// assert_eq!(desc.return_kind(), Kind::Void);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    params: Vec<TypeDescriptor>,
    ret: TypeDescriptor,
    text: String,
}

impl MethodDescriptor {
    /// Parses a method descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        if !descriptor.starts_with('(') {
            return Err(DescriptorError::MissingParameters(descriptor.to_string()));
        }
        let mut params = Vec::new();
        let mut offset = 1;
        loop {
            match descriptor[offset..].chars().next() {
                Some(')') => {
                    offset += 1;
                    break;
                }
                Some(_) => {
                    let (ty, end) = parse_one(descriptor, offset)?;
                    if ty.kind == Kind::Void {
                        return Err(DescriptorError::MisplacedVoid(descriptor.to_string()));
                    }
                    params.push(ty);
                    offset = end;
                }
                None => return Err(DescriptorError::MissingParameters(descriptor.to_string())),
            }
        }
        if offset >= descriptor.len() {
            return Err(DescriptorError::Empty);
        }
        let (ret, end) = parse_one(descriptor, offset)?;
        if end != descriptor.len() {
            return Err(DescriptorError::TrailingInput(descriptor.to_string()));
        }
        Ok(Self {
            params,
            ret,
            text: descriptor.to_string(),
        })
    }

    /// Parameter types in declaration order.
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    /// The return type (possibly `V`).
    pub fn return_type(&self) -> &TypeDescriptor {
        &self.ret
    }

    /// Parameter kinds in declaration order.
    pub fn param_kinds(&self) -> Vec<Kind> {
        self.params.iter().map(TypeDescriptor::kind).collect()
    }

    /// The return kind.
    pub fn return_kind(&self) -> Kind {
        self.ret.kind
    }

    /// The descriptor text between the parentheses.
    pub fn param_text(&self) -> &str {
        let close = self.text.find(')').unwrap_or(self.text.len());
        &self.text[1..close]
    }

    /// The full descriptor text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for MethodDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MethodDescriptor::parse(s)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Parses one type starting at `start`, returning it and the offset just past it.
fn parse_one(descriptor: &str, start: usize) -> Result<(TypeDescriptor, usize), DescriptorError> {
    let bytes = descriptor.as_bytes();
    let mut offset = start;
    while offset < bytes.len() && bytes[offset] == b'[' {
        offset += 1;
    }
    let Some(&lead) = bytes.get(offset) else {
        return Err(DescriptorError::UnterminatedClass(descriptor.to_string()));
    };
    let end = match lead {
        b'L' => match descriptor[offset..].find(';') {
            Some(rel) if rel > 1 => offset + rel + 1,
            _ => return Err(DescriptorError::UnterminatedClass(descriptor.to_string())),
        },
        b'V' if offset > start => {
            return Err(DescriptorError::MisplacedVoid(descriptor.to_string()));
        }
        b'Z' | b'B' | b'C' | b'S' | b'I' | b'F' | b'J' | b'D' | b'V' => offset + 1,
        _ => {
            return Err(DescriptorError::UnexpectedChar {
                descriptor: descriptor.to_string(),
                offset,
                found: descriptor[offset..].chars().next().unwrap_or('\0'),
            })
        }
    };
    let kind = if offset > start {
        Kind::Object
    } else {
        Kind::from_type_char(lead as char).unwrap_or(Kind::Object)
    };
    Ok((
        TypeDescriptor {
            kind,
            text: descriptor[start..end].to_string(),
        },
        end,
    ))
}
