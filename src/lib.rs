mod attr_db;
pub use attr_db::db::AttrDb;
pub use attr_db::reader::AttrReader;
pub use attr_db::rows::{AttrObject, AttrValue};
pub use attr_db::writer::AttrWriter;

mod errors;
pub use errors::{AttrError, CasingMismatch};

mod attrs;
pub use attrs::entry::{AttrEntry, ContainerId, Identity, ObjectId, RowId};
pub use attrs::set::AttributeSet;
pub use attrs::types::AttributeType;

mod specs;
pub use specs::graph::GraphSpec;
pub use specs::statistic::{Stat, StatisticSpec};
pub use specs::subset::SubsetSpec;

mod cache;
pub use cache::AttributeCache;

mod naming;

mod objects;

mod persist;
pub use persist::{
    AuditLog, AuditRecord, NullAudit, save, set_graph, set_keyword, set_statistic,
};

mod protocol;
pub use protocol::ProtocolSettings;
