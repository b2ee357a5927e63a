use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use log::{debug, warn};

use crate::{
    AttrDb, AttrWriter,
    attrs::{
        entry::{AttrEntry, ContainerId, ObjectId, RowId},
        types::AttributeType,
    },
    errors::AttrError,
};

/// Read-through cache of attribute names and aliases within a container.
/// * One instance is constructed at process start and handed to every
///   caller; there are no global caches.
/// * Snapshots are rebuilt wholesale from the name store on a miss and
///   dropped by the explicit invalidation calls, never patched in place.
#[derive(Default)]
pub struct AttributeCache {
    keywords: TypeCache,
    statistics: TypeCache,
    graphs: TypeCache,
}

#[derive(Default)]
struct TypeCache {
    snapshots: RwLock<HashMap<ContainerId, Arc<Attributes>>>,
}

/// A container's attribute snapshot with its derived indices.
struct Attributes {
    entries: Vec<Arc<AttrEntry>>,
    // case-folded name -> entry; first by sort order wins on legacy duplicates
    by_name: HashMap<String, Arc<AttrEntry>>,
    by_row_id: HashMap<RowId, Arc<AttrEntry>>,
    // primary rowId -> alias rowIds
    aliases: HashMap<RowId, Vec<RowId>>,
}

impl Attributes {
    fn build(ty: AttributeType, container: ContainerId, all: Vec<AttrEntry>) -> Self {
        let entries: Vec<Arc<AttrEntry>> = all.into_iter().map(Arc::new).collect();

        let mut by_name: HashMap<String, Arc<AttrEntry>> = HashMap::new();
        let mut by_row_id = HashMap::new();
        let mut aliases: HashMap<RowId, Vec<RowId>> = HashMap::new();
        for entry in &entries {
            by_row_id.insert(entry.row_id, entry.clone());

            if let Some(existing) = by_name.get(&entry.name.to_lowercase()) {
                // legacy data may hold rows differing only by case; tolerated
                // unless the rows aren't linked through the alias graph
                if existing.group_id() != entry.group_id() {
                    warn!(
                        "Duplicate {ty} in container {container}: '{}' and '{}'",
                        existing.describe(),
                        entry.describe()
                    );
                }
            } else {
                by_name.insert(entry.name.to_lowercase(), entry.clone());
            }

            if let Some(target) = entry.aliased_id() {
                aliases.entry(target).or_default().push(entry.row_id);
            }
        }

        Self {
            entries,
            by_name,
            by_row_id,
            aliases,
        }
    }
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn for_type(&self, ty: AttributeType) -> &TypeCache {
        match ty {
            AttributeType::Keyword => &self.keywords,
            AttributeType::Statistic => &self.statistics,
            AttributeType::Graph => &self.graphs,
        }
    }

    // load-or-get the container snapshot
    fn attributes(
        &self,
        db: &AttrDb,
        container: ContainerId,
        ty: AttributeType,
    ) -> Result<Arc<Attributes>, AttrError> {
        let cache = self.for_type(ty);
        if let Some(snapshot) = cache.snapshots.read().unwrap().get(&container) {
            return Ok(snapshot.clone());
        }

        debug!("Loading {ty} snapshot for container {container}");
        let entries = db.begin_read()?.attribute_entries(container, ty)?;
        let snapshot = Arc::new(Attributes::build(ty, container, entries));

        let mut snapshots = cache.snapshots.write().unwrap();
        // a concurrent loader may have won; keep the first snapshot
        Ok(snapshots
            .entry(container)
            .or_insert_with(|| snapshot.clone())
            .clone())
    }

    /// All entries of the type in the container, sorted by name.
    pub fn entries(
        &self,
        db: &AttrDb,
        container: ContainerId,
        ty: AttributeType,
    ) -> Result<Vec<Arc<AttrEntry>>, AttrError> {
        Ok(self.attributes(db, container, ty)?.entries.clone())
    }

    /// Get an entry by name, case-insensitively.
    pub fn by_name(
        &self,
        db: &AttrDb,
        container: ContainerId,
        ty: AttributeType,
        name: &str,
    ) -> Result<Option<Arc<AttrEntry>>, AttrError> {
        Ok(self
            .attributes(db, container, ty)?
            .by_name
            .get(&name.to_lowercase())
            .cloned())
    }

    /// Get the preferred (primary) entry for a name, resolving an alias.
    pub fn preferred(
        &self,
        db: &AttrDb,
        container: ContainerId,
        ty: AttributeType,
        name: &str,
    ) -> Result<Option<Arc<AttrEntry>>, AttrError> {
        let Some(entry) = self.by_name(db, container, ty, name)? else {
            return Ok(None);
        };
        match self.aliased_entry(db, &entry)? {
            Some(primary) => Ok(Some(primary)),
            None => Ok(Some(entry)),
        }
    }

    /// Get an entry by rowId.
    pub fn by_row_id(
        &self,
        db: &AttrDb,
        container: ContainerId,
        ty: AttributeType,
        row_id: RowId,
    ) -> Result<Option<Arc<AttrEntry>>, AttrError> {
        Ok(self
            .attributes(db, container, ty)?
            .by_row_id
            .get(&row_id)
            .cloned())
    }

    /// The primary entry an alias points at, or None for a primary.
    pub fn aliased_entry(
        &self,
        db: &AttrDb,
        entry: &AttrEntry,
    ) -> Result<Option<Arc<AttrEntry>>, AttrError> {
        match entry.aliased_id() {
            Some(target) => self.by_row_id(db, entry.container, entry.ty, target),
            None => Ok(None),
        }
    }

    /// The aliases of a primary entry; empty for an alias.
    pub fn aliases(
        &self,
        db: &AttrDb,
        entry: &AttrEntry,
    ) -> Result<Vec<Arc<AttrEntry>>, AttrError> {
        let attributes = self.attributes(db, entry.container, entry.ty)?;
        let Some(alias_ids) = attributes.aliases.get(&entry.row_id) else {
            return Ok(vec![]);
        };
        Ok(alias_ids
            .iter()
            .filter_map(|id| attributes.by_row_id.get(id).cloned())
            .collect())
    }

    /// Usages of this entry alone, excluding its aliases.
    pub fn usages(&self, db: &AttrDb, entry: &AttrEntry) -> Result<Vec<ObjectId>, AttrError> {
        db.begin_read()?.usages(entry.ty, entry.row_id)
    }

    /// Usages of this entry and all its aliases, keyed by the original
    /// rowId each value was written with. Unused spellings map to an
    /// empty list.
    pub fn all_usages(
        &self,
        db: &AttrDb,
        entry: &AttrEntry,
    ) -> Result<BTreeMap<RowId, Vec<ObjectId>>, AttrError> {
        let mut usages = db.begin_read()?.all_usages(entry.ty, entry.row_id)?;
        usages.entry(entry.row_id).or_default();
        for alias in self.aliases(db, entry)? {
            usages.entry(alias.row_id).or_default();
        }
        Ok(usages)
    }

    // ---- invalidation ----

    /// Drop the snapshot of one type, for one container or for all.
    pub fn uncache_now(&self, container: Option<ContainerId>, ty: AttributeType) {
        match container {
            Some(c) => {
                debug!("Uncache {ty}: container={c}");
                self.for_type(ty).snapshots.write().unwrap().remove(&c);
            }
            None => {
                debug!("Uncache {ty}: entire world");
                self.for_type(ty).snapshots.write().unwrap().clear();
            }
        }
    }

    /// Drop the snapshots of every type, for one container or for all.
    pub fn uncache_all_now(&self, container: Option<ContainerId>) {
        for ty in AttributeType::ALL {
            self.uncache_now(container, ty);
        }
    }

    /// Drop one type's snapshot after the writer commits.
    /// * Invalidating before commit would let a concurrent reader repopulate
    ///   the cache from a not-yet-committed view.
    pub fn uncache_after_commit<'h>(
        &'h self,
        writer: &mut AttrWriter<'h>,
        container: ContainerId,
        ty: AttributeType,
    ) {
        writer.on_commit(move || self.uncache_now(Some(container), ty));
    }

    /// Drop every type's snapshot after the writer commits.
    pub fn uncache_all_after_commit<'h>(
        &'h self,
        writer: &mut AttrWriter<'h>,
        container: Option<ContainerId>,
    ) {
        writer.on_commit(move || self.uncache_all_now(container));
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::attrs::entry::Identity;

    const C: ContainerId = 7;
    const KW: AttributeType = AttributeType::Keyword;

    fn setup() -> (AttrDb, AttributeCache, NamedTempFile) {
        let (db, file) = AttrDb::create_temporary().unwrap();
        (db, AttributeCache::new(), file)
    }

    fn seed_raw(db: &AttrDb, name: &str, identity: Identity) -> RowId {
        let mut writer = db.begin_write().unwrap();
        let row_id = writer.insert_name_row(KW, C, name, identity).unwrap();
        writer.commit().unwrap();
        row_id
    }

    #[test]
    fn test_by_name_is_case_insensitive() {
        let (db, cache, _file) = setup();
        let row_id = seed_raw(&db, "Tube Name", Identity::Primary);

        let entry = cache.by_name(&db, C, KW, "TUBE NAME").unwrap().unwrap();
        assert_eq!(entry.row_id, row_id);
        assert_eq!(entry.name, "Tube Name");
        assert!(cache.by_name(&db, C, KW, "missing").unwrap().is_none());
    }

    #[test]
    fn test_preferred_resolves_an_alias() {
        let (db, cache, _file) = setup();
        let primary = seed_raw(&db, "keyword1", Identity::Primary);
        seed_raw(&db, "keyword1-alias", Identity::Alias(primary));

        let preferred = cache
            .preferred(&db, C, KW, "keyword1-alias")
            .unwrap()
            .unwrap();
        assert_eq!(preferred.row_id, primary);

        let entry = cache.by_name(&db, C, KW, "keyword1").unwrap().unwrap();
        let aliases = cache.aliases(&db, &entry).unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].name, "keyword1-alias");
        assert_eq!(
            cache
                .aliased_entry(&db, &aliases[0])
                .unwrap()
                .unwrap()
                .row_id,
            primary
        );
    }

    #[test]
    fn test_legacy_case_collapsed_rows_are_tolerated() {
        let (db, cache, _file) = setup();

        // legacy inconsistency: two unlinked primaries differing only by case
        let upper = seed_raw(&db, "CASE-TEST", Identity::Primary);
        let lower = seed_raw(&db, "case-test", Identity::Primary);

        // by name, the spelling that sorts first wins
        let entry = cache.by_name(&db, C, KW, "case-TEST").unwrap().unwrap();
        assert_eq!(entry.row_id, upper);
        assert_eq!(entry.name, "CASE-TEST");

        // both rows stay reachable by rowId
        assert_eq!(
            cache.by_row_id(&db, C, KW, upper).unwrap().unwrap().name,
            "CASE-TEST"
        );
        assert_eq!(
            cache.by_row_id(&db, C, KW, lower).unwrap().unwrap().name,
            "case-test"
        );
    }

    #[test]
    fn test_snapshot_is_stale_until_invalidated() {
        let (db, cache, _file) = setup();
        seed_raw(&db, "keyword1", Identity::Primary);

        // populate the snapshot, then write behind its back
        assert!(cache.by_name(&db, C, KW, "keyword1").unwrap().is_some());
        seed_raw(&db, "keyword2", Identity::Primary);

        assert!(cache.by_name(&db, C, KW, "keyword2").unwrap().is_none());
        cache.uncache_now(Some(C), KW);
        assert!(cache.by_name(&db, C, KW, "keyword2").unwrap().is_some());
    }

    #[test]
    fn test_post_commit_invalidation_ordering() {
        let (db, cache, _file) = setup();
        seed_raw(&db, "keyword1", Identity::Primary);
        assert!(cache.by_name(&db, C, KW, "keyword1").unwrap().is_some());

        let mut writer = db.begin_write().unwrap();
        writer.insert_name_row(KW, C, "keyword9", Identity::Primary).unwrap();
        cache.uncache_after_commit(&mut writer, C, KW);

        // before the commit, readers still see the pre-write snapshot
        assert!(cache.by_name(&db, C, KW, "keyword9").unwrap().is_none());

        writer.commit().unwrap();

        // after the commit, a fresh lookup sees the new entry
        assert!(cache.by_name(&db, C, KW, "keyword9").unwrap().is_some());
    }

    #[test]
    fn test_dropped_writer_discards_writes_and_hooks() {
        let (db, cache, _file) = setup();
        seed_raw(&db, "keyword1", Identity::Primary);
        assert!(cache.by_name(&db, C, KW, "keyword1").unwrap().is_some());

        {
            let mut writer = db.begin_write().unwrap();
            writer.insert_name_row(KW, C, "keyword9", Identity::Primary).unwrap();
            cache.uncache_after_commit(&mut writer, C, KW);
            // dropped without commit
        }

        // the write rolled back and the snapshot was never invalidated
        cache.uncache_now(Some(C), KW);
        assert!(cache.by_name(&db, C, KW, "keyword9").unwrap().is_none());
    }

    #[test]
    fn test_world_invalidation_clears_every_type() {
        let (db, cache, _file) = setup();
        seed_raw(&db, "keyword1", Identity::Primary);

        assert!(cache.by_name(&db, C, KW, "keyword1").unwrap().is_some());
        seed_raw(&db, "keyword2", Identity::Primary);

        cache.uncache_all_now(None);
        assert!(cache.by_name(&db, C, KW, "keyword2").unwrap().is_some());
    }
}
