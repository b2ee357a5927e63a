use std::fmt;
use std::io;

use bincode::error::DecodeError;
use redb::{CommitError, TransactionError};
use thiserror::Error;

use crate::attrs::entry::AttrEntry;
use crate::attrs::types::AttributeType;

#[derive(Error, Debug)]
pub enum AttrError {
    #[error("Attribute name must not be empty")]
    EmptyName,
    #[error("Invalid {ty} name '{name}': {reason}")]
    Parse {
        ty: AttributeType,
        name: String,
        reason: String,
    },
    #[error(transparent)]
    Casing(#[from] CasingMismatch),
    #[error("Attribute not found")]
    AttributeNotFound,
    #[error("Can't create alias of an alias")]
    AliasOfAlias,
    #[error("The {ty} attribute '{alias}' is already an alias of '{of}'")]
    AlreadyAliased {
        ty: AttributeType,
        alias: String,
        of: String,
    },
    #[error("The {ty} attribute '{name}' has aliases and can't be made an alias of '{target}'")]
    HasAliases {
        ty: AttributeType,
        name: String,
        target: String,
    },
    #[error("There are objects that have both attributes: {count}")]
    ObjectHasBothAttributes { count: u64 },
    #[error("The {ty} '{name}' has {count} aliases and can't be deleted")]
    DeleteHasAliases {
        ty: AttributeType,
        name: String,
        count: usize,
    },
    #[error("The {ty} '{name}' has {count} usages and can't be deleted")]
    DeleteHasUsages {
        ty: AttributeType,
        name: String,
        count: usize,
    },
    #[error("Object not found")]
    ObjectNotFound,
    #[error("Attribute belongs to a different container")]
    ContainerMismatch,
    #[error("Serialization error: {0}")]
    BincodeError(#[from] bincode::error::EncodeError),
    #[error("Database IO error: {0}")]
    DbError(#[from] redb::Error),
    #[error("Database table error: {0}")]
    TableError(#[from] redb::TableError),
    #[error("Storage error: {0}")]
    StorageError(#[from] redb::StorageError),
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),
    #[error("Commit error: {0}")]
    CommitError(#[from] CommitError),
    #[error("Error decoding data")]
    DecodeError(#[from] DecodeError),
}

/// A name collided with existing entries under case-insensitive comparison
/// in a context where the difference can't be adopted or ignored.
/// Carries every colliding entry so an operator can resolve the conflict.
#[derive(Debug, Clone)]
pub struct CasingMismatch {
    pub detail: String,
    pub sample_label: Option<String>,
    pub ty: AttributeType,
    pub existing: Vec<AttrEntry>,
    pub name: String,
}

impl CasingMismatch {
    pub(crate) fn new(
        detail: impl Into<String>,
        sample_label: Option<&str>,
        ty: AttributeType,
        existing: Vec<AttrEntry>,
        name: &str,
    ) -> Self {
        Self {
            detail: detail.into(),
            sample_label: sample_label.map(str::to_string),
            ty,
            existing,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for CasingMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.sample_label {
            write!(f, "Sample {label}: ")?;
        }
        write!(f, "{} Existing {}", self.detail, self.ty)?;
        if self.existing.len() > 1 {
            write!(f, "s")?;
        }
        write!(
            f,
            " with different casing from the requested name '{}': ",
            self.name
        )?;
        let mut sep = "";
        for other in &self.existing {
            write!(f, "{sep}{}", other.describe())?;
            sep = ", ";
        }
        Ok(())
    }
}

impl std::error::Error for CasingMismatch {}
