//! Member identifier tables.
//!
//! `jmethodID` and `jfieldID` values are one-based indices into append-only
//! tables owned by the bridge. The same member always yields the same id, and
//! every id received from native code is checked before use.

use std::collections::HashMap;
use std::sync::Arc;

use core_types::ContractViolation;
use parking_lot::RwLock;

struct Entries<T> {
    members: Vec<Arc<T>>,
    ids: HashMap<usize, usize>,
}

/// Append-only table mapping members to stable identifiers.
pub struct MemberTable<T> {
    kind: &'static str,
    entries: RwLock<Entries<T>>,
}

impl<T> MemberTable<T> {
    /// Creates an empty table; `kind` names the member kind in errors.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(Entries {
                members: Vec::new(),
                ids: HashMap::new(),
            }),
        }
    }

    /// The identifier of `member`, assigning one on first use.
    pub fn id_for(&self, member: &Arc<T>) -> usize {
        let key = Arc::as_ptr(member) as usize;
        if let Some(&id) = self.entries.read().ids.get(&key) {
            return id;
        }
        let mut entries = self.entries.write();
        if let Some(&id) = entries.ids.get(&key) {
            return id;
        }
        entries.members.push(Arc::clone(member));
        let id = entries.members.len();
        entries.ids.insert(key, id);
        id
    }

    /// The member behind `id`.
    pub fn get(&self, id: usize) -> Result<Arc<T>, ContractViolation> {
        id.checked_sub(1)
            .and_then(|index| self.entries.read().members.get(index).cloned())
            .ok_or(ContractViolation::InvalidMemberId { kind: self.kind, id })
    }

    /// Number of identifiers handed out.
    pub fn len(&self) -> usize {
        self.entries.read().members.len()
    }

    /// Returns true if no identifier was handed out yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
