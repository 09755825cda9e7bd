//! Parsed method signatures and their ABI encoding.
//!
//! A [`Signature`] is the marshalling view of a method descriptor: parameter
//! kinds in declaration order plus the return kind. Signatures are immutable
//! and shared through a [`SignatureCache`].
//!
//! The ABI string spells out the native calling convention of a native
//! method implementation, including the two leading pointers every native
//! method receives (environment and receiver or class):
//!
//! ```text
//! (II)I  ->  (pointer, pointer, sint32, sint32): sint32
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use core_types::{DescriptorError, Kind, MethodDescriptor};
use parking_lot::RwLock;

/// The ABI type name of a kind.
pub fn abi_type_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Boolean => "uint8",
        Kind::Byte => "sint8",
        Kind::Char => "uint16",
        Kind::Short => "sint16",
        Kind::Int => "sint32",
        Kind::Float => "float",
        Kind::Long => "sint64",
        Kind::Double => "double",
        Kind::Object => "pointer",
        Kind::Void => "void",
    }
}

/// Parameter and return kinds of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    descriptor: String,
    params: Vec<Kind>,
    ret: Kind,
}

impl Signature {
    /// Parses a method descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Kind;
    /// use native_bridge::Signature;
    ///
    /// let sig = Signature::parse("(IDZLjava/lang/Object;)V").unwrap();
    /// assert_eq!(sig.params(), &[Kind::Int, Kind::Double, Kind::Boolean, Kind::Object]);
    /// assert_eq!(
    ///     sig.abi_string(),
    ///     "(pointer, pointer, sint32, double, uint8, pointer): void"
    /// );
    /// ```
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        Ok(Self::from_descriptor(&MethodDescriptor::parse(descriptor)?))
    }

    /// Builds the signature of an already parsed descriptor.
    pub fn from_descriptor(descriptor: &MethodDescriptor) -> Self {
        Self {
            descriptor: descriptor.as_str().to_string(),
            params: descriptor.param_kinds(),
            ret: descriptor.return_kind(),
        }
    }

    /// Parameter kinds in declaration order.
    pub fn params(&self) -> &[Kind] {
        &self.params
    }

    /// The return kind.
    pub fn return_kind(&self) -> Kind {
        self.ret
    }

    /// The descriptor this signature was parsed from.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Deterministic encoding of the native implementation's C signature.
    pub fn abi_string(&self) -> String {
        let params: Vec<&str> = [Kind::Object, Kind::Object]
            .iter()
            .chain(self.params.iter())
            .map(|&k| abi_type_name(k))
            .collect();
        format!("({}): {}", params.join(", "), abi_type_name(self.ret))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

/// Shared cache of parsed signatures, keyed by descriptor text.
#[derive(Default)]
pub struct SignatureCache {
    entries: RwLock<HashMap<String, Arc<Signature>>>,
}

impl SignatureCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached signature for `descriptor`, parsing it on first use.
    pub fn get(&self, descriptor: &str) -> Result<Arc<Signature>, DescriptorError> {
        if let Some(sig) = self.entries.read().get(descriptor) {
            return Ok(Arc::clone(sig));
        }
        let sig = Arc::new(Signature::parse(descriptor)?);
        let mut entries = self.entries.write();
        Ok(Arc::clone(entries.entry(descriptor.to_string()).or_insert(sig)))
    }

    /// Number of cached signatures.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
