use crate::{
    AttrDb,
    attr_db::rows::AttrValue,
    attrs::{
        entry::{ContainerId, ObjectId},
        set::AttributeSet,
        types::AttributeType,
    },
    cache::AttributeCache,
    errors::AttrError,
    specs::{graph::GraphSpec, statistic::StatisticSpec},
};

/// One attribute value change, handed to the audit collaborator.
#[derive(Clone, Debug)]
pub struct AuditRecord {
    pub container: ContainerId,
    pub ty: AttributeType,
    pub attribute: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub object: ObjectId,
    pub object_uri: Option<String>,
}

/// Audit sink for attribute value changes.
/// * Fire-and-forget: a sink failure must stay inside the sink; the value
///   write never rolls back because auditing failed.
pub trait AuditLog {
    fn attribute_value_changed(&self, record: &AuditRecord);
}

/// Discards all audit records.
pub struct NullAudit;

impl AuditLog for NullAudit {
    fn attribute_value_changed(&self, _record: &AuditRecord) {}
}

/// Set or clear a single keyword value on an object.
/// * A blank value deletes the stored row.
pub fn set_keyword(
    db: &AttrDb,
    cache: &AttributeCache,
    audit: &dyn AuditLog,
    container: ContainerId,
    object: ObjectId,
    keyword: &str,
    value: Option<&str>,
) -> Result<(), AttrError> {
    let value = value
        .map(str::trim)
        .map(|v| AttrValue::Keyword(v.to_string()));
    set_attribute_value(
        db,
        cache,
        audit,
        container,
        object,
        AttributeType::Keyword,
        keyword,
        value,
    )
}

/// Set or clear a single statistic value on an object.
/// * NaN and infinite values delete the stored row.
pub fn set_statistic(
    db: &AttrDb,
    cache: &AttributeCache,
    audit: &dyn AuditLog,
    container: ContainerId,
    object: ObjectId,
    stat: &StatisticSpec,
    value: Option<f64>,
) -> Result<(), AttrError> {
    let value = value.map(AttrValue::Statistic);
    set_attribute_value(
        db,
        cache,
        audit,
        container,
        object,
        AttributeType::Statistic,
        &stat.to_string(),
        value,
    )
}

/// Set or clear a single graph payload on an object.
pub fn set_graph(
    db: &AttrDb,
    cache: &AttributeCache,
    audit: &dyn AuditLog,
    container: ContainerId,
    object: ObjectId,
    graph: &GraphSpec,
    data: Option<Vec<u8>>,
) -> Result<(), AttrError> {
    let value = data.map(AttrValue::Graph);
    set_attribute_value(
        db,
        cache,
        audit,
        container,
        object,
        AttributeType::Graph,
        &graph.to_string(),
        value,
    )
}

#[allow(clippy::too_many_arguments)]
fn set_attribute_value(
    db: &AttrDb,
    cache: &AttributeCache,
    audit: &dyn AuditLog,
    container: ContainerId,
    object: ObjectId,
    ty: AttributeType,
    name: &str,
    value: Option<AttrValue>,
) -> Result<(), AttrError> {
    // an empty value means "delete the row"
    let value = value.filter(|v| !v.is_empty());

    let reader = db.begin_read()?;
    let obj = reader.object(object)?.ok_or(AttrError::ObjectNotFound)?;
    if obj.container != container {
        return Err(AttrError::ContainerMismatch);
    }
    let old = reader.attribute_value(object, ty, name)?;
    drop(reader);
    if old == value {
        return Ok(());
    }

    db.ensure_name_and_aliases(cache, container, obj.uri.as_deref(), ty, name, &[])?;
    let entry = cache
        .by_name(db, container, ty, name)?
        .ok_or(AttrError::AttributeNotFound)?;
    let resolved = entry.group_id();
    let original = entry.row_id;

    let mut writer = db.begin_write()?;
    writer.delete_value(ty, object, resolved)?;
    if let Some(value) = &value {
        writer.put_value(ty, object, resolved, original, value.clone())?;
    }
    audit.attribute_value_changed(&AuditRecord {
        container,
        ty,
        attribute: name.to_string(),
        old_value: old.map(|v| v.render()),
        new_value: value.map(|v| v.render()),
        object,
        object_uri: obj.uri,
    });
    writer.commit()?;
    Ok(())
}

/// Flush an attribute set onto an object.
/// * Every name and declared alias is resolved through the canonicalization
///   engine first; the value rows are then written in one transaction with
///   both the resolved and the original attribute id.
pub fn save(
    db: &AttrDb,
    cache: &AttributeCache,
    set: &AttributeSet,
    object: ObjectId,
) -> Result<(), AttrError> {
    let obj = db
        .begin_read()?
        .object(object)?
        .ok_or(AttrError::ObjectNotFound)?;
    let container = obj.container;

    resolve_attributes(db, cache, set, container, obj.uri.as_deref())?;

    let mut writer = db.begin_write()?;
    for (name, value) in set.keywords() {
        let Some(value) = value else {
            continue;
        };
        let entry = cache
            .by_name(db, container, AttributeType::Keyword, name)?
            .ok_or(AttrError::AttributeNotFound)?;
        writer.put_value(
            AttributeType::Keyword,
            object,
            entry.group_id(),
            entry.row_id,
            AttrValue::Keyword(value.clone()),
        )?;
    }
    for (spec, value) in set.statistics() {
        let entry = cache
            .by_name(db, container, AttributeType::Statistic, &spec.to_string())?
            .ok_or(AttrError::AttributeNotFound)?;
        writer.put_value(
            AttributeType::Statistic,
            object,
            entry.group_id(),
            entry.row_id,
            AttrValue::Statistic(*value),
        )?;
    }
    for (spec, data) in set.graphs() {
        if data.is_empty() {
            continue;
        }
        let entry = cache
            .by_name(db, container, AttributeType::Graph, &spec.to_string())?
            .ok_or(AttrError::AttributeNotFound)?;
        writer.put_value(
            AttributeType::Graph,
            object,
            entry.group_id(),
            entry.row_id,
            AttrValue::Graph(data.clone()),
        )?;
    }
    writer.commit()?;
    Ok(())
}

// Resolve every declared name through the engine, invalidating each touched
// type's cache once at the end rather than per name.
fn resolve_attributes(
    db: &AttrDb,
    cache: &AttributeCache,
    set: &AttributeSet,
    container: ContainerId,
    sample_label: Option<&str>,
) -> Result<(), AttrError> {
    let result = (|| -> Result<(), AttrError> {
        for name in set.keyword_names() {
            let aliases = set.keyword_aliases_of(&name);
            db.ensure_name_and_aliases_inner(
                container,
                sample_label,
                AttributeType::Keyword,
                &name,
                &aliases,
            )?;
        }
        for spec in set.statistic_names() {
            let aliases: Vec<String> = set
                .statistic_aliases_of(&spec)
                .iter()
                .map(|a| a.to_string())
                .collect();
            let aliases: Vec<&str> = aliases.iter().map(String::as_str).collect();
            db.ensure_name_and_aliases_inner(
                container,
                sample_label,
                AttributeType::Statistic,
                &spec.to_string(),
                &aliases,
            )?;
        }
        for spec in set.graph_names() {
            let aliases: Vec<String> = set
                .graph_aliases_of(&spec)
                .iter()
                .map(|a| a.to_string())
                .collect();
            let aliases: Vec<&str> = aliases.iter().map(String::as_str).collect();
            db.ensure_name_and_aliases_inner(
                container,
                sample_label,
                AttributeType::Graph,
                &spec.to_string(),
                &aliases,
            )?;
        }
        Ok(())
    })();

    if !set.keyword_names().is_empty() {
        cache.uncache_now(Some(container), AttributeType::Keyword);
    }
    if !set.statistic_names().is_empty() {
        cache.uncache_now(Some(container), AttributeType::Statistic);
    }
    if !set.graph_names().is_empty() {
        cache.uncache_now(Some(container), AttributeType::Graph);
    }
    result
}
