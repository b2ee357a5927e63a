use std::fmt;

use crate::{attrs::types::AttributeType, errors::AttrError, specs::subset::SubsetSpec};

/// A graph name: `[subset](param[:param])`.
/// * "Lymphocytes(FSC-A:SSC-A)" is a bivariate plot of the Lymphocytes
///   population, "(FSC-A)" a histogram of the whole sample.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct GraphSpec {
    pub subset: Option<SubsetSpec>,
    pub parameters: Vec<String>,
}

impl GraphSpec {
    pub fn new(subset: Option<SubsetSpec>, parameters: &[&str]) -> Self {
        Self {
            subset,
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, AttrError> {
        let err = |reason: String| AttrError::Parse {
            ty: AttributeType::Graph,
            name: s.to_string(),
            reason,
        };

        let open = s.find('(').ok_or_else(|| err("missing '('".to_string()))?;
        if !s.ends_with(')') {
            return Err(err("must end with ')'".to_string()));
        }

        let subset = match &s[..open] {
            "" => None,
            path => Some(
                SubsetSpec::parse(path).ok_or_else(|| err(format!("invalid subset '{path}'")))?,
            ),
        };

        let parameters: Vec<String> = s[open + 1..s.len() - 1]
            .split(':')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if parameters.is_empty() {
            return Err(err("at least one parameter is required".to_string()));
        }

        Ok(Self { subset, parameters })
    }
}

impl fmt::Display for GraphSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(subset) = &self.subset {
            write!(f, "{subset}")?;
        }
        write!(f, "({})", self.parameters.join(":"))
    }
}
