use std::collections::BTreeMap;

use bincode::config;
use redb::{ReadTransaction, ReadableTable};

use crate::{
    attr_db::{
        rows::{
            AttrObject, AttrValue, ValueRow, find_case_insensitive, find_exact, read_entry,
            scan_aliases, scan_names, unused_entries,
        },
        tables::{OBJECTS, attrs_table, names_table, values_table},
    },
    attrs::{
        entry::{AttrEntry, ContainerId, ObjectId, RowId},
        types::AttributeType,
    },
    errors::AttrError,
    specs::{graph::GraphSpec, statistic::StatisticSpec},
};

pub struct AttrReader {
    pub(crate) rt: ReadTransaction,
}

impl AttrReader {
    pub(crate) fn new(rt: ReadTransaction) -> Self {
        Self { rt }
    }

    // ---- name store lookups ----

    /// Get the entry for a name, matching exact casing.
    pub fn attribute_entry(
        &self,
        container: ContainerId,
        ty: AttributeType,
        name: &str,
    ) -> Result<Option<AttrEntry>, AttrError> {
        let names = self.rt.open_table(names_table(ty))?;
        let attrs = self.rt.open_table(attrs_table(ty))?;
        find_exact(&names, &attrs, container, ty, name)
    }

    /// Get the entries matching a name case-insensitively, sorted by name.
    pub fn attribute_entries_case_insensitive(
        &self,
        container: ContainerId,
        ty: AttributeType,
        name: &str,
    ) -> Result<Vec<AttrEntry>, AttrError> {
        let names = self.rt.open_table(names_table(ty))?;
        let attrs = self.rt.open_table(attrs_table(ty))?;
        find_case_insensitive(&names, &attrs, container, ty, name)
    }

    pub fn attribute_entry_by_id(
        &self,
        ty: AttributeType,
        row_id: RowId,
    ) -> Result<Option<AttrEntry>, AttrError> {
        let attrs = self.rt.open_table(attrs_table(ty))?;
        read_entry(&attrs, ty, row_id)
    }

    /// Get all entries in the container, sorted by name.
    pub fn attribute_entries(
        &self,
        container: ContainerId,
        ty: AttributeType,
    ) -> Result<Vec<AttrEntry>, AttrError> {
        let names = self.rt.open_table(names_table(ty))?;
        let attrs = self.rt.open_table(attrs_table(ty))?;
        scan_names(&names, &attrs, container, ty)
    }

    /// The primary entry an alias points at, or None if the entry is primary.
    pub fn aliased(&self, entry: &AttrEntry) -> Result<Option<AttrEntry>, AttrError> {
        match entry.aliased_id() {
            Some(target) => self.attribute_entry_by_id(entry.ty, target),
            None => Ok(None),
        }
    }

    /// Aliases of a primary entry, or empty if the entry is an alias.
    pub fn aliases(&self, entry: &AttrEntry) -> Result<Vec<AttrEntry>, AttrError> {
        let names = self.rt.open_table(names_table(entry.ty))?;
        let attrs = self.rt.open_table(attrs_table(entry.ty))?;
        scan_aliases(&names, &attrs, entry)
    }

    // ---- usage accounting ----

    /// Objects whose value rows were written under exactly this entry,
    /// excluding usages of its aliases.
    pub fn usages(&self, ty: AttributeType, row_id: RowId) -> Result<Vec<ObjectId>, AttrError> {
        let values = self.rt.open_table(values_table(ty))?;
        let mut objects = vec![];
        for item in values.iter()? {
            let (key, bytes) = item?;
            let (row, _): (ValueRow, _) =
                bincode::decode_from_slice(&bytes.value(), config::standard())?;
            if row.original_id == row_id {
                objects.push(key.value().0);
            }
        }
        Ok(objects)
    }

    /// Objects holding this primary attribute under any spelling, grouped by
    /// the original (possibly alias) id each value was written with.
    pub fn all_usages(
        &self,
        ty: AttributeType,
        row_id: RowId,
    ) -> Result<BTreeMap<RowId, Vec<ObjectId>>, AttrError> {
        let values = self.rt.open_table(values_table(ty))?;
        let mut usages: BTreeMap<RowId, Vec<ObjectId>> = BTreeMap::new();
        for item in values.iter()? {
            let (key, bytes) = item?;
            let (object, resolved) = key.value();
            if resolved != row_id {
                continue;
            }
            let (row, _): (ValueRow, _) =
                bincode::decode_from_slice(&bytes.value(), config::standard())?;
            usages.entry(row.original_id).or_default().push(object);
        }
        Ok(usages)
    }

    /// All rows of the container whose alias group has no usages at all.
    /// * Includes the aliases of unused primaries, matching what
    ///   `delete_unused` would remove.
    pub fn unused(
        &self,
        container: ContainerId,
        ty: AttributeType,
    ) -> Result<Vec<AttrEntry>, AttrError> {
        let names = self.rt.open_table(names_table(ty))?;
        let attrs = self.rt.open_table(attrs_table(ty))?;
        let values = self.rt.open_table(values_table(ty))?;
        unused_entries(&names, &attrs, &values, container, ty)
    }

    // ---- objects ----

    pub fn object(&self, object: ObjectId) -> Result<Option<AttrObject>, AttrError> {
        let table = self.rt.open_table(OBJECTS)?;
        let Some(bytes) = table.get(object)? else {
            return Ok(None);
        };
        let (record, _) = bincode::decode_from_slice(&bytes.value(), config::standard())?;
        Ok(Some(record))
    }

    pub fn objects_in(&self, container: ContainerId) -> Result<Vec<AttrObject>, AttrError> {
        let table = self.rt.open_table(OBJECTS)?;
        let mut objects: Vec<AttrObject> = vec![];
        for item in table.iter()? {
            let (_, bytes) = item?;
            let (record, _): (AttrObject, _) =
                bincode::decode_from_slice(&bytes.value(), config::standard())?;
            if record.container == container {
                objects.push(record);
            }
        }
        Ok(objects)
    }

    // ---- value lookups ----

    /// Get a keyword value by any accepted spelling of the keyword.
    pub fn keyword(&self, object: ObjectId, name: &str) -> Result<Option<String>, AttrError> {
        match self.attribute_value(object, AttributeType::Keyword, name)? {
            Some(AttrValue::Keyword(value)) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// All keyword values of an object, keyed by the preferred spelling.
    pub fn keywords(&self, object: ObjectId) -> Result<BTreeMap<String, String>, AttrError> {
        let values = self.rt.open_table(values_table(AttributeType::Keyword))?;
        let attrs = self.rt.open_table(attrs_table(AttributeType::Keyword))?;
        let mut keywords = BTreeMap::new();
        for item in values.range((object, 0)..=(object, u64::MAX))? {
            let (key, bytes) = item?;
            let (row, _): (ValueRow, _) =
                bincode::decode_from_slice(&bytes.value(), config::standard())?;
            let Some(entry) = read_entry(&attrs, AttributeType::Keyword, key.value().1)? else {
                continue;
            };
            if let AttrValue::Keyword(value) = row.value {
                keywords.insert(entry.name, value);
            }
        }
        Ok(keywords)
    }

    pub fn statistic(
        &self,
        object: ObjectId,
        spec: &StatisticSpec,
    ) -> Result<Option<f64>, AttrError> {
        match self.attribute_value(object, AttributeType::Statistic, &spec.to_string())? {
            Some(AttrValue::Statistic(value)) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    pub fn graph_bytes(
        &self,
        object: ObjectId,
        spec: &GraphSpec,
    ) -> Result<Option<Vec<u8>>, AttrError> {
        match self.attribute_value(object, AttributeType::Graph, &spec.to_string())? {
            Some(AttrValue::Graph(bytes)) => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }

    pub(crate) fn attribute_value(
        &self,
        object: ObjectId,
        ty: AttributeType,
        name: &str,
    ) -> Result<Option<AttrValue>, AttrError> {
        let Some(obj) = self.object(object)? else {
            return Ok(None);
        };
        let Some(entry) = self.attribute_entry(obj.container, ty, name)? else {
            return Ok(None);
        };
        let values = self.rt.open_table(values_table(ty))?;
        let Some(bytes) = values.get((object, entry.group_id()))? else {
            return Ok(None);
        };
        let (row, _): (ValueRow, _) =
            bincode::decode_from_slice(&bytes.value(), config::standard())?;
        Ok(Some(row.value))
    }
}
