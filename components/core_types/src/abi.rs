//! Stable numeric codes of the native-interface ABI.
//!
//! These values are part of the binary contract with compiled native
//! libraries and are never renumbered.

/// Kind of reference a handle denotes, as reported by `GetObjectRefType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RefKind {
    /// Not a live handle
    Invalid = 0,
    /// Frame-owned handle
    Local = 1,
    /// Explicitly owned strong handle
    Global = 2,
    /// Explicitly owned handle that does not keep its referent alive
    WeakGlobal = 3,
}

impl RefKind {
    /// The ABI code of this kind.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decodes an ABI code; unknown codes are [`RefKind::Invalid`].
    pub fn from_code(code: i32) -> RefKind {
        match code {
            1 => RefKind::Local,
            2 => RefKind::Global,
            3 => RefKind::WeakGlobal,
            _ => RefKind::Invalid,
        }
    }
}

/// Status codes returned by status-reporting entry points.
pub mod status {
    /// Success
    pub const OK: i32 = 0;
    /// Unspecified failure
    pub const ERR: i32 = -1;
    /// Calling thread is not attached
    pub const DETACHED: i32 = -2;
    /// Requested interface version is not supported
    pub const VERSION: i32 = -3;
    /// Not enough memory
    pub const NO_MEMORY: i32 = -4;
    /// Already exists
    pub const EXISTS: i32 = -5;
    /// Invalid arguments
    pub const INVALID: i32 = -6;
}

/// Interface version constants (high 16 bits major, low 16 bits minor).
pub mod version {
    /// 1.1
    pub const V1_1: i32 = 0x0001_0001;
    /// 1.2
    pub const V1_2: i32 = 0x0001_0002;
    /// 1.4
    pub const V1_4: i32 = 0x0001_0004;
    /// 1.6
    pub const V1_6: i32 = 0x0001_0006;
    /// 1.8
    pub const V1_8: i32 = 0x0001_0008;
    /// 9
    pub const V9: i32 = 0x0009_0000;
    /// 10
    pub const V10: i32 = 0x000a_0000;
    /// 19
    pub const V19: i32 = 0x0013_0000;
    /// 20
    pub const V20: i32 = 0x0014_0000;
    /// 21
    pub const V21: i32 = 0x0015_0000;

    /// Every version the bridge accepts in `GetEnv`-style queries.
    pub const SUPPORTED: [i32; 10] = [V1_1, V1_2, V1_4, V1_6, V1_8, V9, V10, V19, V20, V21];

    /// The interface version advertised for a guest language level.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::abi::version;
    ///
    /// assert_eq!(version::for_language_level(8), version::V1_8);
    /// assert_eq!(version::for_language_level(17), version::V10);
    /// assert_eq!(version::for_language_level(21), version::V21);
    /// ```
    pub fn for_language_level(level: u32) -> i32 {
        match level {
            0..=8 => V1_8,
            9 => V9,
            10..=18 => V10,
            19 => V19,
            20 => V20,
            _ => V21,
        }
    }

    /// Returns true if `requested` does not exceed `current` and is a known version.
    pub fn is_supported(requested: i32, current: i32) -> bool {
        SUPPORTED.contains(&requested) && requested <= current
    }

    /// Major component of a version value.
    pub fn major(version: i32) -> u16 {
        (version as u32 >> 16) as u16
    }

    /// Minor component of a version value.
    pub fn minor(version: i32) -> u16 {
        (version as u32 & 0xffff) as u16
    }
}

/// Boolean encoding on the native side.
pub const TRUE: u8 = 1;
/// Boolean encoding on the native side.
pub const FALSE: u8 = 0;

/// Release mode: copy back and keep the buffer.
pub const COMMIT: i32 = 1;
/// Release mode: free the buffer without copying back.
pub const ABORT: i32 = 2;
