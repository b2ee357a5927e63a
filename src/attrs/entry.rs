use bincode::{Decode, Encode};

use crate::attrs::types::AttributeType;

pub type ContainerId = u64;
pub type RowId = u64;
pub type ObjectId = u64;

/// Whether a name entry is the preferred spelling or an alternate one.
/// * An alias always points at a primary entry, never at another alias.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Encode, Decode)]
pub enum Identity {
    Primary,
    Alias(RowId),
}

impl Identity {
    pub fn aliased_id(self) -> Option<RowId> {
        match self {
            Identity::Primary => None,
            Identity::Alias(target) => Some(target),
        }
    }
}

/// A definition row of the name store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrEntry {
    pub ty: AttributeType,
    pub row_id: RowId,
    pub container: ContainerId,
    pub name: String,
    pub identity: Identity,
}

impl AttrEntry {
    pub fn is_alias(&self) -> bool {
        matches!(self.identity, Identity::Alias(_))
    }

    /// The rowId of the aliased primary, or None if this entry is primary.
    pub fn aliased_id(&self) -> Option<RowId> {
        self.identity.aliased_id()
    }

    /// The primary rowId of this entry's alias group.
    pub fn group_id(&self) -> RowId {
        match self.identity {
            Identity::Primary => self.row_id,
            Identity::Alias(target) => target,
        }
    }

    // single-line rendering for conflict reports
    pub(crate) fn describe(&self) -> String {
        match self.identity {
            Identity::Primary => format!("{} (id={}, primary)", self.name, self.row_id),
            Identity::Alias(target) => {
                format!("{} (id={}, alias of {})", self.name, self.row_id, target)
            }
        }
    }
}
