use log::info;

use crate::{
    AttrDb,
    attrs::{
        entry::{AttrEntry, ContainerId, Identity, RowId},
        types::AttributeType,
    },
    cache::AttributeCache,
    errors::{AttrError, CasingMismatch},
};

impl AttrDb {
    /// Ensure a keyword name exists, returning its rowId.
    pub fn ensure_keyword_name(
        &self,
        cache: &AttributeCache,
        container: ContainerId,
        sample_label: Option<&str>,
        name: &str,
    ) -> Result<RowId, AttrError> {
        self.ensure_name_and_aliases(
            cache,
            container,
            sample_label,
            AttributeType::Keyword,
            name,
            &[],
        )
    }

    /// Ensure a statistic name exists, returning its rowId.
    pub fn ensure_statistic_name(
        &self,
        cache: &AttributeCache,
        container: ContainerId,
        sample_label: Option<&str>,
        name: &str,
    ) -> Result<RowId, AttrError> {
        self.ensure_name_and_aliases(
            cache,
            container,
            sample_label,
            AttributeType::Statistic,
            name,
            &[],
        )
    }

    /// Ensure a graph name exists, returning its rowId.
    pub fn ensure_graph_name(
        &self,
        cache: &AttributeCache,
        container: ContainerId,
        sample_label: Option<&str>,
        name: &str,
    ) -> Result<RowId, AttrError> {
        self.ensure_name_and_aliases(
            cache,
            container,
            sample_label,
            AttributeType::Graph,
            name,
            &[],
        )
    }

    /// Ensure a name and its declared aliases exist as one alias group.
    /// Returns the rowId of the group's primary entry.
    /// * If any of the names already exists, its group adopts the rest.
    /// * Manages its own write transactions; must not be called while the
    ///   calling operation holds an open writer.
    pub fn ensure_name_and_aliases(
        &self,
        cache: &AttributeCache,
        container: ContainerId,
        sample_label: Option<&str>,
        ty: AttributeType,
        name: &str,
        aliases: &[&str],
    ) -> Result<RowId, AttrError> {
        let result = self.ensure_name_and_aliases_inner(container, sample_label, ty, name, aliases);
        cache.uncache_now(Some(container), ty);
        result
    }

    pub(crate) fn ensure_name_and_aliases_inner(
        &self,
        container: ContainerId,
        sample_label: Option<&str>,
        ty: AttributeType,
        name: &str,
        aliases: &[&str],
    ) -> Result<RowId, AttrError> {
        // check for an existing entry among the declared names; the first
        // exact-case hit supplies the group's primary id
        let mut group_id = None;
        {
            let reader = self.begin_read()?;
            for candidate in std::iter::once(&name).chain(aliases) {
                if let Some(entry) = reader.attribute_entry(container, ty, candidate)? {
                    group_id = Some(entry.group_id());
                    break;
                }
            }
        }

        // no existing group: insert the provided name as the preferred
        // spelling; otherwise register the name against the found group
        let group_id = match group_id {
            None => self.ensure_attribute_name(container, sample_label, ty, name, None, false)?,
            Some(id) => {
                self.ensure_attribute_name(container, sample_label, ty, name, Some(id), false)?;
                id
            }
        };

        if !aliases.is_empty() {
            let entry = self.entry_for_aliasing(ty, group_id)?;
            for alias in aliases {
                self.ensure_alias_inner(&entry, alias, false)?;
            }
        }

        Ok(group_id)
    }

    /// Ensure `alias_name` is an alias of the primary entry `row_id`.
    /// * An existing unused entry is demoted into the alias: its value rows
    ///   are re-pointed at the primary and its identity updated, atomically.
    pub fn ensure_alias(
        &self,
        cache: &AttributeCache,
        ty: AttributeType,
        row_id: RowId,
        alias_name: &str,
        allow_case_change_alias: bool,
    ) -> Result<(), AttrError> {
        let entry = self.entry_for_aliasing(ty, row_id)?;
        let container = entry.container;
        let result = self.ensure_alias_inner(&entry, alias_name, allow_case_change_alias);
        cache.uncache_now(Some(container), ty);
        result
    }

    fn entry_for_aliasing(&self, ty: AttributeType, row_id: RowId) -> Result<AttrEntry, AttrError> {
        let entry = self
            .begin_read()?
            .attribute_entry_by_id(ty, row_id)?
            .ok_or(AttrError::AttributeNotFound)?;
        if entry.is_alias() {
            return Err(AttrError::AliasOfAlias);
        }
        Ok(entry)
    }

    fn ensure_alias_inner(
        &self,
        entry: &AttrEntry,
        alias_name: &str,
        allow_case_change_alias: bool,
    ) -> Result<(), AttrError> {
        let ty = entry.ty;

        let existing = self
            .begin_read()?
            .attribute_entry(entry.container, ty, alias_name)?;
        let Some(existing) = existing else {
            // no entry for the alias name yet, insert a fresh alias row;
            // this fails on a casing collision unless allow_case_change_alias
            return self
                .ensure_attribute_name(
                    entry.container,
                    None,
                    ty,
                    alias_name,
                    Some(entry.row_id),
                    allow_case_change_alias,
                )
                .map(|_| ());
        };

        if existing == *entry {
            return Ok(());
        }
        if existing.identity == Identity::Alias(entry.row_id) {
            return Ok(());
        }
        if let Identity::Alias(target) = existing.identity {
            let of = self
                .begin_read()?
                .attribute_entry_by_id(ty, target)?
                .map(|e| e.name)
                .unwrap_or_default();
            return Err(AttrError::AlreadyAliased {
                ty,
                alias: existing.name,
                of,
            });
        }

        // demote the existing entry; guards and the re-point commit together
        let mut writer = self.begin_write()?;
        let aliases = writer.aliases(&existing)?;
        if !aliases.is_empty() {
            return Err(AttrError::HasAliases {
                ty,
                name: existing.name,
                target: entry.name.clone(),
            });
        }
        let both = writer.objects_with_both(ty, existing.row_id, entry.row_id)?;
        if both > 0 {
            return Err(AttrError::ObjectHasBothAttributes { count: both });
        }
        writer.repoint_values(ty, existing.row_id, entry.row_id)?;
        writer.update_name_row(&existing, &existing.name, Identity::Alias(entry.row_id))?;
        writer.commit()?;
        Ok(())
    }

    /// Ensure the attribute exists, returning its rowId.
    /// * With an alias target, the new entry points at that primary;
    ///   without one it becomes a primary itself.
    /// * A name matching existing entries only case-insensitively is
    ///   adopted, rejected or allowed through depending on the container's
    ///   casing policy and `allow_case_change_alias`.
    fn ensure_attribute_name(
        &self,
        container: ContainerId,
        sample_label: Option<&str>,
        ty: AttributeType,
        name: &str,
        alias_target: Option<RowId>,
        allow_case_change_alias: bool,
    ) -> Result<RowId, AttrError> {
        ty.validate_name(name)?;

        let mut writer = self.begin_write()?;
        let settings = writer.protocol_settings(container)?;
        let case_sensitive = ty.is_case_sensitive(&settings);

        // idempotent fast path: exact casing already registered
        if let Some(existing) = writer.attribute_entry(container, ty, name)? {
            return Ok(existing.row_id);
        }

        let others = writer.attribute_entries_case_insensitive(container, ty, name)?;
        if !others.is_empty() {
            if !case_sensitive {
                // adopt the first spelling, sorted by name
                let adopted = others[0].row_id;

                // multiple candidates must agree on one preferred attribute
                if others.len() > 1 {
                    let preferred = others[0].group_id();
                    if others.iter().any(|other| other.group_id() != preferred) {
                        return Err(CasingMismatch::new(
                            format!(
                                "Can't create {ty} with same casing as other {ty}s when there is more than one preferred attribute."
                            ),
                            sample_label,
                            ty,
                            others,
                            name,
                        )
                        .into());
                    }
                }

                info!(
                    "{}",
                    CasingMismatch::new(
                        format!("Using existing attribute {adopted} with different casing."),
                        sample_label,
                        ty,
                        others,
                        name,
                    )
                );
                return Ok(adopted);
            }

            match alias_target {
                Some(target) if allow_case_change_alias => {
                    // an explicit cross-casing alias is allowed, but only if
                    // the target itself is among the alternate casings
                    if !others.iter().any(|other| other.row_id == target) {
                        return Err(CasingMismatch::new(
                            "Item to be aliased wasn't found in the set of alternate cased items.",
                            sample_label,
                            ty,
                            others,
                            name,
                        )
                        .into());
                    }
                    info!(
                        "{}",
                        CasingMismatch::new("Creating alias.", sample_label, ty, others, name)
                    );
                }
                _ => {
                    return Err(CasingMismatch::new(
                        format!("Can't create {ty} with same casing as other {ty}s."),
                        sample_label,
                        ty,
                        others,
                        name,
                    )
                    .into());
                }
            }
        }

        let identity = match alias_target {
            Some(target) => Identity::Alias(target),
            None => Identity::Primary,
        };
        let row_id = writer.insert_name_row(ty, container, name, identity)?;
        writer.commit()?;
        Ok(row_id)
    }

    /// Administrative rename or re-point of an existing entry.
    pub fn update_attribute(
        &self,
        cache: &AttributeCache,
        ty: AttributeType,
        row_id: RowId,
        name: &str,
        identity: Identity,
    ) -> Result<(), AttrError> {
        ty.validate_name(name)?;
        let mut writer = self.begin_write()?;
        let entry = writer
            .attribute_entry_by_id(ty, row_id)?
            .ok_or(AttrError::AttributeNotFound)?;
        let container = entry.container;
        writer.update_name_row(&entry, name, identity)?;
        cache.uncache_after_commit(&mut writer, container, ty);
        writer.commit()?;
        Ok(())
    }

    /// Delete an entry that has no aliases and no usages.
    pub fn delete_attribute(
        &self,
        cache: &AttributeCache,
        container: ContainerId,
        ty: AttributeType,
        row_id: RowId,
    ) -> Result<(), AttrError> {
        let reader = self.begin_read()?;
        let Some(entry) = reader.attribute_entry_by_id(ty, row_id)? else {
            return Ok(());
        };
        if entry.container != container {
            return Err(AttrError::ContainerMismatch);
        }
        let aliases = reader.aliases(&entry)?;
        if !aliases.is_empty() {
            return Err(AttrError::DeleteHasAliases {
                ty,
                name: entry.name,
                count: aliases.len(),
            });
        }
        let usages = reader.usages(ty, row_id)?;
        if !usages.is_empty() {
            return Err(AttrError::DeleteHasUsages {
                ty,
                name: entry.name,
                count: usages.len(),
            });
        }
        drop(reader);

        let mut writer = self.begin_write()?;
        writer.delete_name_row(&entry)?;
        cache.uncache_after_commit(&mut writer, container, ty);
        writer.commit()?;
        Ok(())
    }

    /// Delete every unused alias group of the container, across all three
    /// attribute types in one transaction.
    pub fn delete_unused(
        &self,
        cache: &AttributeCache,
        container: ContainerId,
    ) -> Result<(), AttrError> {
        let mut writer = self.begin_write()?;
        for ty in AttributeType::ALL {
            writer.delete_unused_rows(container, ty)?;
        }
        cache.uncache_all_after_commit(&mut writer, Some(container));
        writer.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::{
        AttributeCache, NullAudit, ProtocolSettings,
        attrs::entry::ObjectId,
        persist::set_keyword,
    };

    const C: ContainerId = 7;
    const KW: AttributeType = AttributeType::Keyword;

    fn setup() -> (AttrDb, AttributeCache, NamedTempFile) {
        let (db, file) = AttrDb::create_temporary().unwrap();
        (db, AttributeCache::new(), file)
    }

    fn entry(db: &AttrDb, name: &str) -> AttrEntry {
        db.begin_read()
            .unwrap()
            .attribute_entry(C, KW, name)
            .unwrap()
            .unwrap()
    }

    fn new_object(db: &AttrDb, uri: &str) -> ObjectId {
        let mut writer = db.begin_write().unwrap();
        let object = writer.create_object(C, Some(uri)).unwrap();
        writer.commit().unwrap();
        object
    }

    // seed a definition row directly, the way legacy data would appear
    fn seed_raw(db: &AttrDb, name: &str, identity: Identity) -> RowId {
        let mut writer = db.begin_write().unwrap();
        let row_id = writer.insert_name_row(KW, C, name, identity).unwrap();
        writer.commit().unwrap();
        row_id
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let (db, cache, _file) = setup();

        let first = db.ensure_keyword_name(&cache, C, None, "WELL ID").unwrap();
        let second = db.ensure_keyword_name(&cache, C, None, "WELL ID").unwrap();
        assert_eq!(first, second);

        let entries = db.begin_read().unwrap().attribute_entries(C, KW).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identity, Identity::Primary);
    }

    #[test]
    fn test_case_sensitive_keywords_reject_other_casings() {
        let (db, cache, _file) = setup();

        let row_id = db.ensure_keyword_name(&cache, C, None, "Keyword1").unwrap();
        let err = db
            .ensure_keyword_name(&cache, C, Some("TEST"), "KEYWORD1")
            .unwrap_err();
        match err {
            AttrError::Casing(mismatch) => {
                assert_eq!(mismatch.existing.len(), 1);
                assert_eq!(mismatch.existing[0].name, "Keyword1");
                assert_eq!(mismatch.existing[0].row_id, row_id);
                let message = mismatch.to_string();
                assert!(message.starts_with("Sample TEST: "));
                assert!(message.contains("Can't create keyword with same casing as other keywords."));
                assert!(message.contains("with different casing from the requested name 'KEYWORD1'"));
            }
            other => panic!("expected casing mismatch, got {other}"),
        }
    }

    #[test]
    fn test_case_insensitive_keywords_adopt_existing_spelling() {
        let (db, cache, _file) = setup();
        db.set_protocol_settings(
            C,
            ProtocolSettings {
                case_sensitive_keywords: false,
                case_sensitive_stats_and_graphs: false,
            },
        )
        .unwrap();

        let first = db.ensure_keyword_name(&cache, C, None, "Keyword1").unwrap();
        let second = db.ensure_keyword_name(&cache, C, None, "KEYWORD1").unwrap();
        assert_eq!(first, second);
        assert_eq!(db.begin_read().unwrap().attribute_entries(C, KW).unwrap().len(), 1);
    }

    #[test]
    fn test_statistics_are_case_insensitive_by_default() {
        let (db, cache, _file) = setup();

        let first = db
            .ensure_statistic_name(&cache, C, None, "Lymphocytes:Count")
            .unwrap();
        let second = db
            .ensure_statistic_name(&cache, C, None, "LYMPHOCYTES:Count")
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_adoption_picks_first_spelling_by_sort_order() {
        let (db, cache, _file) = setup();
        db.set_protocol_settings(
            C,
            ProtocolSettings {
                case_sensitive_keywords: false,
                case_sensitive_stats_and_graphs: false,
            },
        )
        .unwrap();

        // linked legacy rows: the lower-cased one aliases the upper-cased one
        let upper = seed_raw(&db, "CASE-TEST", Identity::Primary);
        seed_raw(&db, "case-test", Identity::Alias(upper));

        let adopted = db.ensure_keyword_name(&cache, C, None, "Case-Test").unwrap();
        assert_eq!(adopted, upper); // upper case sorts first
    }

    #[test]
    fn test_adoption_fails_across_divergent_groups() {
        let (db, cache, _file) = setup();
        db.set_protocol_settings(
            C,
            ProtocolSettings {
                case_sensitive_keywords: false,
                case_sensitive_stats_and_graphs: false,
            },
        )
        .unwrap();

        // two unlinked primaries that only differ by case
        seed_raw(&db, "CASE-TEST", Identity::Primary);
        seed_raw(&db, "case-test", Identity::Primary);

        let err = db
            .ensure_keyword_name(&cache, C, None, "Case-Test")
            .unwrap_err();
        match err {
            AttrError::Casing(mismatch) => {
                assert!(mismatch.detail.contains("more than one preferred attribute"));
                assert_eq!(mismatch.existing.len(), 2);
            }
            other => panic!("expected casing mismatch, got {other}"),
        }
    }

    #[test]
    fn test_conflict_reports_every_colliding_entry() {
        let (db, cache, _file) = setup();

        let upper = seed_raw(&db, "CASE-TEST", Identity::Primary);
        let lower = seed_raw(&db, "case-test", Identity::Primary);

        let err = db
            .ensure_keyword_name(&cache, C, Some("TEST"), "CaSe-TeSt")
            .unwrap_err();
        match err {
            AttrError::Casing(mismatch) => {
                let message = mismatch.to_string();
                assert!(message.contains(&format!("CASE-TEST (id={upper}")));
                assert!(message.contains(&format!("case-test (id={lower}")));
            }
            other => panic!("expected casing mismatch, got {other}"),
        }
    }

    #[test]
    fn test_alias_of_alias_is_rejected() {
        let (db, cache, _file) = setup();

        let primary = db.ensure_keyword_name(&cache, C, None, "keyword1").unwrap();
        db.ensure_alias(&cache, KW, primary, "keyword1-alias", false)
            .unwrap();

        let alias = entry(&db, "keyword1-alias");
        assert!(alias.is_alias());

        let err = db
            .ensure_alias(&cache, KW, alias.row_id, "keyword2", false)
            .unwrap_err();
        assert!(matches!(err, AttrError::AliasOfAlias));
    }

    #[test]
    fn test_alias_of_missing_attribute_is_rejected() {
        let (db, cache, _file) = setup();
        let err = db.ensure_alias(&cache, KW, 999, "keyword2", false).unwrap_err();
        assert!(matches!(err, AttrError::AttributeNotFound));
    }

    #[test]
    fn test_alias_name_already_aliased_elsewhere_is_rejected() {
        let (db, cache, _file) = setup();

        let keyword1 = db.ensure_keyword_name(&cache, C, None, "keyword1").unwrap();
        let keyword2 = db.ensure_keyword_name(&cache, C, None, "keyword2").unwrap();
        db.ensure_alias(&cache, KW, keyword2, "keyword2-alias", false)
            .unwrap();

        let err = db
            .ensure_alias(&cache, KW, keyword1, "keyword2-alias", false)
            .unwrap_err();
        match err {
            AttrError::AlreadyAliased { alias, of, .. } => {
                assert_eq!(alias, "keyword2-alias");
                assert_eq!(of, "keyword2");
            }
            other => panic!("expected AlreadyAliased, got {other}"),
        }
    }

    #[test]
    fn test_demoting_a_primary_with_aliases_is_rejected() {
        let (db, cache, _file) = setup();

        let keyword1 = db.ensure_keyword_name(&cache, C, None, "keyword1").unwrap();
        let keyword2 = db.ensure_keyword_name(&cache, C, None, "keyword2").unwrap();
        db.ensure_alias(&cache, KW, keyword2, "keyword2-alias", false)
            .unwrap();

        let err = db
            .ensure_alias(&cache, KW, keyword1, "keyword2", false)
            .unwrap_err();
        match err {
            AttrError::HasAliases { name, target, .. } => {
                assert_eq!(name, "keyword2");
                assert_eq!(target, "keyword1");
            }
            other => panic!("expected HasAliases, got {other}"),
        }
    }

    #[test]
    fn test_alias_rejected_when_an_object_holds_both() {
        let (db, cache, _file) = setup();
        let object = new_object(&db, "well1.fcs");

        set_keyword(&db, &cache, &NullAudit, C, object, "keyword1", Some("v1")).unwrap();
        set_keyword(&db, &cache, &NullAudit, C, object, "keyword3", Some("v3")).unwrap();

        let keyword1 = entry(&db, "keyword1");
        let err = db
            .ensure_alias(&cache, KW, keyword1.row_id, "keyword3", false)
            .unwrap_err();
        assert!(matches!(err, AttrError::ObjectHasBothAttributes { count: 1 }));
    }

    #[test]
    fn test_alias_demotes_existing_unused_entry_and_repoints_values() {
        let (db, cache, _file) = setup();
        let object = new_object(&db, "well1.fcs");

        // keyword3 is used; keyword5 exists but has no usages
        set_keyword(&db, &cache, &NullAudit, C, object, "keyword3", Some("v3")).unwrap();
        let keyword5 = db.ensure_keyword_name(&cache, C, None, "keyword5").unwrap();

        let keyword3 = entry(&db, "keyword3");
        db.ensure_alias(&cache, KW, keyword5, "keyword3", false).unwrap();

        // keyword3 is now an alias of keyword5
        let demoted = entry(&db, "keyword3");
        assert_eq!(demoted.identity, Identity::Alias(keyword5));

        // the value row was re-pointed but kept its original id
        let reader = db.begin_read().unwrap();
        let usages = reader.all_usages(KW, keyword5).unwrap();
        assert_eq!(usages.get(&keyword3.row_id), Some(&vec![object]));

        // the value reads back through both spellings
        assert_eq!(reader.keyword(object, "keyword3").unwrap().as_deref(), Some("v3"));
        assert_eq!(reader.keyword(object, "keyword5").unwrap().as_deref(), Some("v3"));
    }

    #[test]
    fn test_case_change_alias_needs_explicit_permission() {
        let (db, cache, _file) = setup();

        let primary = db.ensure_keyword_name(&cache, C, None, "WELL ID").unwrap();

        // differs only by case: rejected without the flag
        let err = db
            .ensure_alias(&cache, KW, primary, "Well Id", false)
            .unwrap_err();
        assert!(matches!(err, AttrError::Casing(_)));

        // allowed through with the flag, pointing at the primary
        db.ensure_alias(&cache, KW, primary, "Well Id", true).unwrap();
        let alias = entry(&db, "Well Id");
        assert_eq!(alias.identity, Identity::Alias(primary));
    }

    #[test]
    fn test_case_change_alias_target_must_be_among_casings() {
        let (db, cache, _file) = setup();

        db.ensure_keyword_name(&cache, C, None, "WELL ID").unwrap();
        let other = db.ensure_keyword_name(&cache, C, None, "OTHER").unwrap();

        // "well id" collides with "WELL ID", but OTHER isn't a casing of it
        let err = db
            .ensure_alias(&cache, KW, other, "well id", true)
            .unwrap_err();
        match err {
            AttrError::Casing(mismatch) => {
                assert!(mismatch.detail.contains("wasn't found in the set of alternate cased items"));
            }
            other => panic!("expected casing mismatch, got {other}"),
        }
    }

    #[test]
    fn test_ensure_name_and_aliases_builds_one_group() {
        let (db, cache, _file) = setup();

        let primary = db
            .ensure_name_and_aliases(&cache, C, None, KW, "keyword2", &["keyword2-alias"])
            .unwrap();

        let alias = entry(&db, "keyword2-alias");
        assert_eq!(alias.identity, Identity::Alias(primary));

        // resolving through any member of the group is stable
        let again = db
            .ensure_name_and_aliases(&cache, C, None, KW, "keyword2-alias", &[])
            .unwrap();
        assert_eq!(again, primary);
    }

    #[test]
    fn test_delete_attribute_guards() {
        let (db, cache, _file) = setup();
        let object = new_object(&db, "well1.fcs");

        let keyword1 = db.ensure_keyword_name(&cache, C, None, "keyword1").unwrap();
        db.ensure_alias(&cache, KW, keyword1, "keyword1-alias", false)
            .unwrap();
        let err = db.delete_attribute(&cache, C, KW, keyword1).unwrap_err();
        assert!(matches!(err, AttrError::DeleteHasAliases { count: 1, .. }));

        set_keyword(&db, &cache, &NullAudit, C, object, "keyword2", Some("v2")).unwrap();
        let keyword2 = entry(&db, "keyword2");
        let err = db.delete_attribute(&cache, C, KW, keyword2.row_id).unwrap_err();
        assert!(matches!(err, AttrError::DeleteHasUsages { count: 1, .. }));

        let keyword3 = db.ensure_keyword_name(&cache, C, None, "keyword3").unwrap();
        db.delete_attribute(&cache, C, KW, keyword3).unwrap();
        assert!(
            db.begin_read()
                .unwrap()
                .attribute_entry(C, KW, "keyword3")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_unused_groups_are_listed_and_deleted_together() {
        let (db, cache, _file) = setup();
        let object = new_object(&db, "well1.fcs");

        // an unused primary+alias pair and one used keyword
        let keyword1 = db.ensure_keyword_name(&cache, C, None, "keyword1").unwrap();
        db.ensure_alias(&cache, KW, keyword1, "keyword1-alias", false)
            .unwrap();
        set_keyword(&db, &cache, &NullAudit, C, object, "keyword2", Some("v2")).unwrap();

        let reader = db.begin_read().unwrap();
        let unused = reader.unused(C, KW).unwrap();
        let names: Vec<&str> = unused.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["keyword1", "keyword1-alias"]);
        drop(reader);

        db.delete_unused(&cache, C).unwrap();

        let reader = db.begin_read().unwrap();
        assert!(reader.unused(C, KW).unwrap().is_empty());
        assert!(reader.attribute_entry(C, KW, "keyword1").unwrap().is_none());
        assert!(reader.attribute_entry(C, KW, "keyword1-alias").unwrap().is_none());
        assert!(reader.attribute_entry(C, KW, "keyword2").unwrap().is_some());
    }
}
