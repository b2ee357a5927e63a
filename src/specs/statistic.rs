use std::fmt;

use crate::{attrs::types::AttributeType, errors::AttrError, specs::subset::SubsetSpec};

/// The closed set of statistic kinds.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stat {
    Count,
    Frequency,
    FreqOfParent,
    FreqOfGrandparent,
    FreqOfAncestor,
    Min,
    Max,
    Mean,
    Median,
    GeometricMean,
    StdDev,
    Cv,
    MedianAbsDev,
    RobustCv,
    Percentile,
    Spill,
}

impl Stat {
    pub const ALL: [Stat; 16] = [
        Stat::Count,
        Stat::Frequency,
        Stat::FreqOfParent,
        Stat::FreqOfGrandparent,
        Stat::FreqOfAncestor,
        Stat::Min,
        Stat::Max,
        Stat::Mean,
        Stat::Median,
        Stat::GeometricMean,
        Stat::StdDev,
        Stat::Cv,
        Stat::MedianAbsDev,
        Stat::RobustCv,
        Stat::Percentile,
        Stat::Spill,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Stat::Count => "Count",
            Stat::Frequency => "%",
            Stat::FreqOfParent => "%P",
            Stat::FreqOfGrandparent => "%G",
            Stat::FreqOfAncestor => "%of",
            Stat::Min => "Min",
            Stat::Max => "Max",
            Stat::Mean => "Mean",
            Stat::Median => "Median",
            Stat::GeometricMean => "GeomMean",
            Stat::StdDev => "StdDev",
            Stat::Cv => "CV",
            Stat::MedianAbsDev => "MAD",
            Stat::RobustCv => "rCV",
            Stat::Percentile => "%ile",
            Stat::Spill => "Spill",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Stat> {
        Stat::ALL.into_iter().find(|s| s.symbol() == symbol)
    }

    /// Population statistics stand alone; channel statistics, percentile,
    /// spill and freq-of-ancestor need a parameter.
    pub fn requires_parameter(self) -> bool {
        !matches!(
            self,
            Stat::Count | Stat::Frequency | Stat::FreqOfParent | Stat::FreqOfGrandparent
        )
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A statistic name: `[subset:]stat[(parameter)]`.
/// * "Lymphocytes:Count", "Singlets:Median(FSC-A)", "Spill(FITC:PE)".
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatisticSpec {
    pub subset: Option<SubsetSpec>,
    pub stat: Stat,
    pub parameter: Option<String>,
}

impl StatisticSpec {
    pub fn new(subset: Option<SubsetSpec>, stat: Stat, parameter: Option<&str>) -> Self {
        Self {
            subset,
            stat,
            parameter: parameter.map(str::to_string),
        }
    }

    pub fn parse(s: &str) -> Result<Self, AttrError> {
        let err = |reason: String| AttrError::Parse {
            ty: AttributeType::Statistic,
            name: s.to_string(),
            reason,
        };

        // the parameter is everything inside the last parenthesis group
        let (head, parameter) = match s.strip_suffix(')') {
            Some(rest) => {
                let open = rest
                    .rfind('(')
                    .ok_or_else(|| err("unbalanced ')'".to_string()))?;
                let parameter = &rest[open + 1..];
                if parameter.is_empty() {
                    return Err(err("empty parameter".to_string()));
                }
                (&rest[..open], Some(parameter.to_string()))
            }
            None => (s, None),
        };

        // the statistic symbol follows the last ':' outside the parameter
        let (subset, symbol) = match head.rfind(':') {
            Some(split) => (Some(&head[..split]), &head[split + 1..]),
            None => (None, head),
        };

        let stat = Stat::from_symbol(symbol)
            .ok_or_else(|| err(format!("unknown statistic '{symbol}'")))?;
        if stat.requires_parameter() && parameter.is_none() {
            return Err(err(format!("statistic '{symbol}' requires a parameter")));
        }
        if !stat.requires_parameter() && parameter.is_some() {
            return Err(err(format!("statistic '{symbol}' takes no parameter")));
        }

        let subset = match subset {
            Some(path) => Some(
                SubsetSpec::parse(path).ok_or_else(|| err(format!("invalid subset '{path}'")))?,
            ),
            None => None,
        };

        Ok(Self {
            subset,
            stat,
            parameter,
        })
    }
}

impl fmt::Display for StatisticSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(subset) = &self.subset {
            write!(f, "{subset}:")?;
        }
        write!(f, "{}", self.stat)?;
        if let Some(parameter) = &self.parameter {
            write!(f, "({parameter})")?;
        }
        Ok(())
    }
}
