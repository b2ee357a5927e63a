use std::fmt;

use bincode::{Decode, Encode};

use crate::{
    errors::AttrError,
    protocol::ProtocolSettings,
    specs::{graph::GraphSpec, statistic::StatisticSpec},
};

/// The closed set of attribute categories.
/// * Each category selects its own name store, value store and casing policy.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Encode, Decode)]
pub enum AttributeType {
    Keyword,
    Statistic,
    Graph,
}

impl AttributeType {
    pub const ALL: [AttributeType; 3] = [
        AttributeType::Keyword,
        AttributeType::Statistic,
        AttributeType::Graph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::Keyword => "keyword",
            AttributeType::Statistic => "statistic",
            AttributeType::Graph => "graph",
        }
    }

    /// Casing policy for this category under the container's settings.
    pub fn is_case_sensitive(self, settings: &ProtocolSettings) -> bool {
        match self {
            AttributeType::Keyword => settings.case_sensitive_keywords,
            AttributeType::Statistic | AttributeType::Graph => {
                settings.case_sensitive_stats_and_graphs
            }
        }
    }

    /// Check that a name is well-formed for this category.
    /// * Keywords are free-form; statistics and graphs must parse as specs.
    pub fn validate_name(self, name: &str) -> Result<(), AttrError> {
        if name.is_empty() {
            return Err(AttrError::EmptyName);
        }
        match self {
            AttributeType::Keyword => Ok(()),
            AttributeType::Statistic => StatisticSpec::parse(name).map(|_| ()),
            AttributeType::Graph => GraphSpec::parse(name).map(|_| ()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
