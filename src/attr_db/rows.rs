use bincode::{Decode, Encode, config};
use redb::ReadableTable;
use roaring::RoaringTreemap;

use crate::{
    attrs::{
        entry::{AttrEntry, ContainerId, Identity, ObjectId, RowId},
        types::AttributeType,
    },
    errors::AttrError,
};

/// Stored form of a name store row; the rowId is the table key.
#[derive(Debug, Encode, Decode)]
pub(crate) struct AttrRecord {
    pub(crate) container: ContainerId,
    pub(crate) name: String,
    pub(crate) identity: Identity,
}

/// An attribute value; the variant must agree with the attribute type.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub enum AttrValue {
    Keyword(String),
    Statistic(f64),
    Graph(Vec<u8>),
}

impl AttrValue {
    /// Empty values are never stored; setting one deletes the row.
    /// * A non-finite statistic counts as "no value".
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Keyword(s) => s.trim().is_empty(),
            AttrValue::Statistic(v) => !v.is_finite(),
            AttrValue::Graph(bytes) => bytes.is_empty(),
        }
    }

    pub fn type_of(&self) -> AttributeType {
        match self {
            AttrValue::Keyword(_) => AttributeType::Keyword,
            AttrValue::Statistic(_) => AttributeType::Statistic,
            AttrValue::Graph(_) => AttributeType::Graph,
        }
    }

    // rendering for audit records
    pub(crate) fn render(&self) -> String {
        match self {
            AttrValue::Keyword(s) => s.clone(),
            AttrValue::Statistic(v) => v.to_string(),
            AttrValue::Graph(bytes) => format!("{} bytes", bytes.len()),
        }
    }
}

/// Stored form of a value store row; the (objectId, resolved rowId) pair is
/// the table key, so the original (possibly alias) id rides in the value.
#[derive(Debug, Encode, Decode)]
pub(crate) struct ValueRow {
    pub(crate) original_id: RowId,
    pub(crate) value: AttrValue,
}

/// A registered data object that attribute values hang off.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct AttrObject {
    pub row_id: ObjectId,
    pub container: ContainerId,
    pub uri: Option<String>,
}

// Lookup helpers shared by the reader and writer transaction wrappers.

pub(crate) fn read_entry(
    attrs: &impl ReadableTable<u64, Vec<u8>>,
    ty: AttributeType,
    row_id: RowId,
) -> Result<Option<AttrEntry>, AttrError> {
    let Some(bytes) = attrs.get(row_id)? else {
        return Ok(None);
    };
    let (record, _): (AttrRecord, _) =
        bincode::decode_from_slice(&bytes.value(), config::standard())?;
    Ok(Some(AttrEntry {
        ty,
        row_id,
        container: record.container,
        name: record.name,
        identity: record.identity,
    }))
}

pub(crate) fn find_exact(
    names: &impl ReadableTable<(u64, &'static str), u64>,
    attrs: &impl ReadableTable<u64, Vec<u8>>,
    container: ContainerId,
    ty: AttributeType,
    name: &str,
) -> Result<Option<AttrEntry>, AttrError> {
    let Some(row_id) = names.get((container, name))? else {
        return Ok(None);
    };
    let row_id = row_id.value();
    read_entry(attrs, ty, row_id)
}

/// All entries in the container, sorted by name (byte order).
pub(crate) fn scan_names(
    names: &impl ReadableTable<(u64, &'static str), u64>,
    attrs: &impl ReadableTable<u64, Vec<u8>>,
    container: ContainerId,
    ty: AttributeType,
) -> Result<Vec<AttrEntry>, AttrError> {
    let mut entries = vec![];
    for item in names.range((container, "")..)? {
        let (key, row_id) = item?;
        let (c, _) = key.value();
        if c != container {
            break;
        }
        if let Some(entry) = read_entry(attrs, ty, row_id.value())? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Entries matching the name case-insensitively, sorted by name.
pub(crate) fn find_case_insensitive(
    names: &impl ReadableTable<(u64, &'static str), u64>,
    attrs: &impl ReadableTable<u64, Vec<u8>>,
    container: ContainerId,
    ty: AttributeType,
    name: &str,
) -> Result<Vec<AttrEntry>, AttrError> {
    let folded = name.to_lowercase();
    let mut entries = vec![];
    for item in names.range((container, "")..)? {
        let (key, row_id) = item?;
        let (c, candidate) = key.value();
        if c != container {
            break;
        }
        if candidate.to_lowercase() == folded
            && let Some(entry) = read_entry(attrs, ty, row_id.value())?
        {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Aliases of the entry (entries in its container pointing at its rowId).
pub(crate) fn scan_aliases(
    names: &impl ReadableTable<(u64, &'static str), u64>,
    attrs: &impl ReadableTable<u64, Vec<u8>>,
    entry: &AttrEntry,
) -> Result<Vec<AttrEntry>, AttrError> {
    let mut aliases = scan_names(names, attrs, entry.container, entry.ty)?;
    aliases.retain(|a| a.identity == Identity::Alias(entry.row_id));
    Ok(aliases)
}

/// Rows of the container whose alias group has no value row at all.
/// * A group is "used" when its primary id appears as a resolved value id;
///   aliases of a used group count as used.
pub(crate) fn unused_entries(
    names: &impl ReadableTable<(u64, &'static str), u64>,
    attrs: &impl ReadableTable<u64, Vec<u8>>,
    values: &impl ReadableTable<(u64, u64), Vec<u8>>,
    container: ContainerId,
    ty: AttributeType,
) -> Result<Vec<AttrEntry>, AttrError> {
    let mut used = RoaringTreemap::new();
    for item in values.iter()? {
        let (key, _) = item?;
        used.insert(key.value().1);
    }

    let mut entries = scan_names(names, attrs, container, ty)?;
    entries.retain(|entry| !used.contains(entry.group_id()));
    Ok(entries)
}
