use redb::TableDefinition;

use crate::attrs::types::AttributeType;

// SEQUENCES (u64 Counters)
pub const SEQUENCES: TableDefinition<u8, u64> = TableDefinition::new("_cyto_seq");
pub const SEQ_OBJECT_ID: u8 = 1;
pub const SEQ_KEYWORD_ID: u8 = 2;
pub const SEQ_STATISTIC_ID: u8 = 3;
pub const SEQ_GRAPH_ID: u8 = 4;

// NAME STORE
// (ContainerId, Name) -> RowId; the table key is the exact-case uniqueness constraint
pub const KEYWORD_NAMES: TableDefinition<(u64, &str), u64> =
    TableDefinition::new("_cyto_keyword_names");
pub const STATISTIC_NAMES: TableDefinition<(u64, &str), u64> =
    TableDefinition::new("_cyto_statistic_names");
pub const GRAPH_NAMES: TableDefinition<(u64, &str), u64> =
    TableDefinition::new("_cyto_graph_names");
// RowId -> AttrRecord (encoded)
pub const KEYWORD_ATTRS: TableDefinition<u64, Vec<u8>> =
    TableDefinition::new("_cyto_keyword_attrs");
pub const STATISTIC_ATTRS: TableDefinition<u64, Vec<u8>> =
    TableDefinition::new("_cyto_statistic_attrs");
pub const GRAPH_ATTRS: TableDefinition<u64, Vec<u8>> = TableDefinition::new("_cyto_graph_attrs");

// VALUE STORE
// (ObjectId, resolved RowId) -> ValueRow (encoded); values always key on the primary id
pub const KEYWORD_VALUES: TableDefinition<(u64, u64), Vec<u8>> =
    TableDefinition::new("_cyto_keyword_values");
pub const STATISTIC_VALUES: TableDefinition<(u64, u64), Vec<u8>> =
    TableDefinition::new("_cyto_statistic_values");
pub const GRAPH_VALUES: TableDefinition<(u64, u64), Vec<u8>> =
    TableDefinition::new("_cyto_graph_values");

// OBJECTS
// ObjectId -> AttrObject (encoded)
pub const OBJECTS: TableDefinition<u64, Vec<u8>> = TableDefinition::new("_cyto_objects");

// PROTOCOLS
// ContainerId -> ProtocolSettings (encoded)
pub const PROTOCOLS: TableDefinition<u64, Vec<u8>> = TableDefinition::new("_cyto_protocols");

pub(crate) fn names_table(ty: AttributeType) -> TableDefinition<'static, (u64, &'static str), u64> {
    match ty {
        AttributeType::Keyword => KEYWORD_NAMES,
        AttributeType::Statistic => STATISTIC_NAMES,
        AttributeType::Graph => GRAPH_NAMES,
    }
}

pub(crate) fn attrs_table(ty: AttributeType) -> TableDefinition<'static, u64, Vec<u8>> {
    match ty {
        AttributeType::Keyword => KEYWORD_ATTRS,
        AttributeType::Statistic => STATISTIC_ATTRS,
        AttributeType::Graph => GRAPH_ATTRS,
    }
}

pub(crate) fn values_table(ty: AttributeType) -> TableDefinition<'static, (u64, u64), Vec<u8>> {
    match ty {
        AttributeType::Keyword => KEYWORD_VALUES,
        AttributeType::Statistic => STATISTIC_VALUES,
        AttributeType::Graph => GRAPH_VALUES,
    }
}
