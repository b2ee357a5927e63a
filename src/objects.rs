use std::collections::BTreeSet;

use bincode::config;
use redb::ReadableTable;

use crate::{
    AttrDb, AttrWriter,
    attr_db::{
        rows::AttrObject,
        tables::{OBJECTS, PROTOCOLS, values_table},
    },
    attrs::{
        entry::{ContainerId, ObjectId},
        types::AttributeType,
    },
    cache::AttributeCache,
    errors::AttrError,
};

impl AttrWriter<'_> {
    /// Register a data object that attribute values can attach to.
    pub fn create_object(
        &mut self,
        container: ContainerId,
        uri: Option<&str>,
    ) -> Result<ObjectId, AttrError> {
        let row_id = self.next_object_id();
        let object = AttrObject {
            row_id,
            container,
            uri: uri.map(str::to_string),
        };
        let mut table = self.wt.open_table(OBJECTS)?;
        table.insert(row_id, bincode::encode_to_vec(&object, config::standard())?)?;
        Ok(row_id)
    }

    pub(crate) fn object(&self, object: ObjectId) -> Result<Option<AttrObject>, AttrError> {
        let table = self.wt.open_table(OBJECTS)?;
        let Some(bytes) = table.get(object)? else {
            return Ok(None);
        };
        let (record, _) = bincode::decode_from_slice(&bytes.value(), config::standard())?;
        Ok(Some(record))
    }

    // remove the object row and every value row hanging off it
    pub(crate) fn delete_object_rows(&mut self, object: ObjectId) -> Result<(), AttrError> {
        for ty in AttributeType::ALL {
            let mut values = self.wt.open_table(values_table(ty))?;
            let mut keys = vec![];
            for item in values.range((object, 0)..=(object, u64::MAX))? {
                let (key, _) = item?;
                keys.push(key.value());
            }
            for key in keys {
                values.remove(key)?;
            }
        }
        let mut table = self.wt.open_table(OBJECTS)?;
        table.remove(object)?;
        Ok(())
    }
}

impl AttrDb {
    /// Delete data objects and their attribute values in one transaction.
    pub fn delete_objects(
        &self,
        cache: &AttributeCache,
        objects: &[ObjectId],
    ) -> Result<(), AttrError> {
        if objects.is_empty() {
            return Ok(());
        }
        let mut writer = self.begin_write()?;
        let mut containers = BTreeSet::new();
        for &object in objects {
            if let Some(record) = writer.object(object)? {
                containers.insert(record.container);
                writer.delete_object_rows(object)?;
            }
        }
        writer.on_commit(move || {
            for container in containers {
                cache.uncache_all_now(Some(container));
            }
        });
        writer.commit()?;
        Ok(())
    }

    /// Remove a container entirely: objects, values, attribute definitions
    /// and its casing policy, in one transaction.
    pub fn delete_container(
        &self,
        cache: &AttributeCache,
        container: ContainerId,
    ) -> Result<(), AttrError> {
        let objects: Vec<ObjectId> = self
            .begin_read()?
            .objects_in(container)?
            .into_iter()
            .map(|o| o.row_id)
            .collect();

        let mut writer = self.begin_write()?;
        for object in objects {
            writer.delete_object_rows(object)?;
        }
        for ty in AttributeType::ALL {
            writer.delete_container_names(container, ty)?;
        }
        {
            let mut protocols = writer.wt.open_table(PROTOCOLS)?;
            protocols.remove(container)?;
        }
        cache.uncache_all_after_commit(&mut writer, Some(container));
        writer.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NullAudit, persist::set_keyword};

    const C: ContainerId = 7;

    #[test]
    fn test_delete_objects_cascades_value_rows() {
        let (db, _file) = AttrDb::create_temporary().unwrap();
        let cache = AttributeCache::new();

        let mut writer = db.begin_write().unwrap();
        let well1 = writer.create_object(C, Some("well1.fcs")).unwrap();
        let well2 = writer.create_object(C, Some("well2.fcs")).unwrap();
        writer.commit().unwrap();

        set_keyword(&db, &cache, &NullAudit, C, well1, "keyword1", Some("v1")).unwrap();
        set_keyword(&db, &cache, &NullAudit, C, well2, "keyword1", Some("v2")).unwrap();

        db.delete_objects(&cache, &[well1]).unwrap();

        let reader = db.begin_read().unwrap();
        assert!(reader.object(well1).unwrap().is_none());
        assert_eq!(reader.keyword(well1, "keyword1").unwrap(), None);
        // the other object and the definition row survive
        assert_eq!(reader.keyword(well2, "keyword1").unwrap().as_deref(), Some("v2"));
        assert!(
            reader
                .attribute_entry(C, AttributeType::Keyword, "keyword1")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_delete_container_removes_definitions_too() {
        let (db, _file) = AttrDb::create_temporary().unwrap();
        let cache = AttributeCache::new();

        let mut writer = db.begin_write().unwrap();
        let well1 = writer.create_object(C, Some("well1.fcs")).unwrap();
        writer.commit().unwrap();
        set_keyword(&db, &cache, &NullAudit, C, well1, "keyword1", Some("v1")).unwrap();

        db.delete_container(&cache, C).unwrap();

        let reader = db.begin_read().unwrap();
        assert!(reader.object(well1).unwrap().is_none());
        assert!(reader.objects_in(C).unwrap().is_empty());
        assert!(
            reader
                .attribute_entries(C, AttributeType::Keyword)
                .unwrap()
                .is_empty()
        );
    }
}
