use bincode::{Decode, Encode, config};
use redb::ReadableTable;

use crate::{
    AttrDb,
    attr_db::tables::PROTOCOLS,
    attrs::entry::ContainerId,
    errors::AttrError,
};

/// Per-container casing policy, read at the start of every ensure call.
/// * Keywords are compared case-sensitively by default; instrument exports
///   disagree on statistic and graph casing often enough that those default
///   to case-insensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ProtocolSettings {
    pub case_sensitive_keywords: bool,
    pub case_sensitive_stats_and_graphs: bool,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            case_sensitive_keywords: true,
            case_sensitive_stats_and_graphs: false,
        }
    }
}

impl AttrDb {
    /// Get the container's casing policy, falling back to the defaults.
    pub fn protocol_settings(&self, container: ContainerId) -> Result<ProtocolSettings, AttrError> {
        let rt = self.begin_read()?;
        let table = rt.rt.open_table(PROTOCOLS)?;
        match table.get(container)? {
            Some(bytes) => {
                let (settings, _) =
                    bincode::decode_from_slice(&bytes.value(), config::standard())?;
                Ok(settings)
            }
            None => Ok(ProtocolSettings::default()),
        }
    }

    /// Administrative setter for the container's casing policy.
    pub fn set_protocol_settings(
        &self,
        container: ContainerId,
        settings: ProtocolSettings,
    ) -> Result<(), AttrError> {
        let writer = self.begin_write()?;
        {
            let mut table = writer.wt.open_table(PROTOCOLS)?;
            let bytes = bincode::encode_to_vec(settings, config::standard())?;
            table.insert(container, bytes)?;
        }
        writer.commit()?;
        Ok(())
    }
}
