use bincode::config;
use redb::{ReadableTable, WriteTransaction};
use roaring::RoaringTreemap;

use crate::{
    attr_db::{
        rows::{
            AttrRecord, AttrValue, ValueRow, find_case_insensitive, find_exact, read_entry,
            scan_aliases, scan_names, unused_entries,
        },
        tables::{
            PROTOCOLS, SEQ_GRAPH_ID, SEQ_KEYWORD_ID, SEQ_OBJECT_ID, SEQ_STATISTIC_ID, SEQUENCES,
            attrs_table, names_table, values_table,
        },
    },
    attrs::{
        entry::{AttrEntry, ContainerId, Identity, ObjectId, RowId},
        types::AttributeType,
    },
    errors::AttrError,
    protocol::ProtocolSettings,
};

/// A write transaction over the attribute store.
/// * Post-commit hooks registered with `on_commit` run only after the
///   transaction commits; dropping the writer discards them with the writes.
pub struct AttrWriter<'h> {
    pub(crate) wt: WriteTransaction,
    object_id_cursor: u64,
    keyword_id_cursor: u64,
    statistic_id_cursor: u64,
    graph_id_cursor: u64,
    commit_hooks: Vec<Box<dyn FnOnce() + 'h>>,
}

impl<'h> AttrWriter<'h> {
    pub(crate) fn new(wt: WriteTransaction) -> Result<Self, AttrError> {
        let object_id_cursor;
        let keyword_id_cursor;
        let statistic_id_cursor;
        let graph_id_cursor;
        {
            let seq_table = wt.open_table(SEQUENCES)?;
            object_id_cursor = seq_table.get(SEQ_OBJECT_ID)?.map(|v| v.value()).unwrap_or(1);
            keyword_id_cursor = seq_table
                .get(SEQ_KEYWORD_ID)?
                .map(|v| v.value())
                .unwrap_or(1);
            statistic_id_cursor = seq_table
                .get(SEQ_STATISTIC_ID)?
                .map(|v| v.value())
                .unwrap_or(1);
            graph_id_cursor = seq_table.get(SEQ_GRAPH_ID)?.map(|v| v.value()).unwrap_or(1);
        }
        Ok(Self {
            wt,
            object_id_cursor,
            keyword_id_cursor,
            statistic_id_cursor,
            graph_id_cursor,
            commit_hooks: vec![],
        })
    }

    pub(crate) fn next_row_id(&mut self, ty: AttributeType) -> RowId {
        let cursor = match ty {
            AttributeType::Keyword => &mut self.keyword_id_cursor,
            AttributeType::Statistic => &mut self.statistic_id_cursor,
            AttributeType::Graph => &mut self.graph_id_cursor,
        };
        let id = *cursor;
        *cursor += 1;
        id
    }

    pub(crate) fn next_object_id(&mut self) -> ObjectId {
        let id = self.object_id_cursor;
        self.object_id_cursor += 1;
        id
    }

    /// Register a hook to run after this transaction commits.
    pub fn on_commit(&mut self, hook: impl FnOnce() + 'h) {
        self.commit_hooks.push(Box::new(hook));
    }

    pub fn commit(self) -> Result<(), AttrError> {
        let AttrWriter {
            wt,
            object_id_cursor,
            keyword_id_cursor,
            statistic_id_cursor,
            graph_id_cursor,
            commit_hooks,
        } = self;
        {
            let mut seq_table = wt.open_table(SEQUENCES)?;
            seq_table.insert(SEQ_OBJECT_ID, object_id_cursor)?;
            seq_table.insert(SEQ_KEYWORD_ID, keyword_id_cursor)?;
            seq_table.insert(SEQ_STATISTIC_ID, statistic_id_cursor)?;
            seq_table.insert(SEQ_GRAPH_ID, graph_id_cursor)?;
        }
        wt.commit()?;
        for hook in commit_hooks {
            hook();
        }
        Ok(())
    }

    // ---- name store rows ----

    pub(crate) fn insert_name_row(
        &mut self,
        ty: AttributeType,
        container: ContainerId,
        name: &str,
        identity: Identity,
    ) -> Result<RowId, AttrError> {
        let row_id = self.next_row_id(ty);
        {
            let mut names = self.wt.open_table(names_table(ty))?;
            let _prev = names.insert((container, name), row_id)?;
            debug_assert!(_prev.is_none()); // callers check for collisions first
        }
        let mut attrs = self.wt.open_table(attrs_table(ty))?;
        let record = AttrRecord {
            container,
            name: name.to_string(),
            identity,
        };
        attrs.insert(row_id, bincode::encode_to_vec(&record, config::standard())?)?;
        Ok(row_id)
    }

    pub(crate) fn update_name_row(
        &mut self,
        entry: &AttrEntry,
        name: &str,
        identity: Identity,
    ) -> Result<(), AttrError> {
        {
            let mut names = self.wt.open_table(names_table(entry.ty))?;
            if name != entry.name {
                names.remove((entry.container, entry.name.as_str()))?;
            }
            names.insert((entry.container, name), entry.row_id)?;
        }
        let mut attrs = self.wt.open_table(attrs_table(entry.ty))?;
        let record = AttrRecord {
            container: entry.container,
            name: name.to_string(),
            identity,
        };
        attrs.insert(
            entry.row_id,
            bincode::encode_to_vec(&record, config::standard())?,
        )?;
        Ok(())
    }

    pub(crate) fn delete_name_row(&mut self, entry: &AttrEntry) -> Result<(), AttrError> {
        {
            let mut names = self.wt.open_table(names_table(entry.ty))?;
            names.remove((entry.container, entry.name.as_str()))?;
        }
        let mut attrs = self.wt.open_table(attrs_table(entry.ty))?;
        attrs.remove(entry.row_id)?;
        Ok(())
    }

    /// Delete every name store row of the container whose alias group is
    /// unreferenced by the value store.
    pub(crate) fn delete_unused_rows(
        &mut self,
        container: ContainerId,
        ty: AttributeType,
    ) -> Result<u64, AttrError> {
        let unused = {
            let names = self.wt.open_table(names_table(ty))?;
            let attrs = self.wt.open_table(attrs_table(ty))?;
            let values = self.wt.open_table(values_table(ty))?;
            unused_entries(&names, &attrs, &values, container, ty)?
        };
        for entry in &unused {
            self.delete_name_row(entry)?;
        }
        Ok(unused.len() as u64)
    }

    pub(crate) fn delete_container_names(
        &mut self,
        container: ContainerId,
        ty: AttributeType,
    ) -> Result<(), AttrError> {
        let entries = {
            let names = self.wt.open_table(names_table(ty))?;
            let attrs = self.wt.open_table(attrs_table(ty))?;
            scan_names(&names, &attrs, container, ty)?
        };
        for entry in &entries {
            self.delete_name_row(entry)?;
        }
        Ok(())
    }

    // ---- value store rows ----

    pub(crate) fn put_value(
        &mut self,
        ty: AttributeType,
        object: ObjectId,
        resolved: RowId,
        original: RowId,
        value: AttrValue,
    ) -> Result<(), AttrError> {
        let mut table = self.wt.open_table(values_table(ty))?;
        let row = ValueRow {
            original_id: original,
            value,
        };
        table.insert(
            (object, resolved),
            bincode::encode_to_vec(&row, config::standard())?,
        )?;
        Ok(())
    }

    pub(crate) fn delete_value(
        &mut self,
        ty: AttributeType,
        object: ObjectId,
        resolved: RowId,
    ) -> Result<bool, AttrError> {
        let mut table = self.wt.open_table(values_table(ty))?;
        Ok(table.remove((object, resolved))?.is_some())
    }

    /// Move every value row resolved to `from` over to `to`, keeping each
    /// row's original id untouched. Returns the number of rows moved.
    pub(crate) fn repoint_values(
        &mut self,
        ty: AttributeType,
        from: RowId,
        to: RowId,
    ) -> Result<u64, AttrError> {
        let mut table = self.wt.open_table(values_table(ty))?;
        let mut moves = vec![];
        for item in table.iter()? {
            let (key, row) = item?;
            let (object, resolved) = key.value();
            if resolved == from {
                moves.push((object, row.value()));
            }
        }
        for (object, bytes) in &moves {
            table.remove((*object, from))?;
            table.insert((*object, to), bytes.clone())?;
        }
        Ok(moves.len() as u64)
    }

    /// Count objects holding value rows under both resolved ids.
    /// * A positive count means an alias merge would collide on the
    ///   (object, resolved) key.
    pub(crate) fn objects_with_both(
        &self,
        ty: AttributeType,
        a: RowId,
        b: RowId,
    ) -> Result<u64, AttrError> {
        let table = self.wt.open_table(values_table(ty))?;
        let mut with_a = RoaringTreemap::new();
        let mut with_b = RoaringTreemap::new();
        for item in table.iter()? {
            let (key, _) = item?;
            let (object, resolved) = key.value();
            if resolved == a {
                with_a.insert(object);
            } else if resolved == b {
                with_b.insert(object);
            }
        }
        Ok((with_a & with_b).len())
    }

    // ---- lookups against this transaction's view ----

    pub(crate) fn attribute_entry(
        &self,
        container: ContainerId,
        ty: AttributeType,
        name: &str,
    ) -> Result<Option<AttrEntry>, AttrError> {
        let names = self.wt.open_table(names_table(ty))?;
        let attrs = self.wt.open_table(attrs_table(ty))?;
        find_exact(&names, &attrs, container, ty, name)
    }

    pub(crate) fn attribute_entry_by_id(
        &self,
        ty: AttributeType,
        row_id: RowId,
    ) -> Result<Option<AttrEntry>, AttrError> {
        let attrs = self.wt.open_table(attrs_table(ty))?;
        read_entry(&attrs, ty, row_id)
    }

    pub(crate) fn attribute_entries_case_insensitive(
        &self,
        container: ContainerId,
        ty: AttributeType,
        name: &str,
    ) -> Result<Vec<AttrEntry>, AttrError> {
        let names = self.wt.open_table(names_table(ty))?;
        let attrs = self.wt.open_table(attrs_table(ty))?;
        find_case_insensitive(&names, &attrs, container, ty, name)
    }

    pub(crate) fn aliases(&self, entry: &AttrEntry) -> Result<Vec<AttrEntry>, AttrError> {
        let names = self.wt.open_table(names_table(entry.ty))?;
        let attrs = self.wt.open_table(attrs_table(entry.ty))?;
        scan_aliases(&names, &attrs, entry)
    }

    pub(crate) fn protocol_settings(
        &self,
        container: ContainerId,
    ) -> Result<ProtocolSettings, AttrError> {
        let table = self.wt.open_table(PROTOCOLS)?;
        match table.get(container)? {
            Some(bytes) => {
                let (settings, _) =
                    bincode::decode_from_slice(&bytes.value(), config::standard())?;
                Ok(settings)
            }
            None => Ok(ProtocolSettings::default()),
        }
    }
}
