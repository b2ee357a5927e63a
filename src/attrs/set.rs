use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::warn;

use crate::specs::{graph::GraphSpec, statistic::StatisticSpec};

/// The transient bundle of attributes an analysis produces per sample,
/// flushed through the canonicalization engine at persistence time.
/// * Names fold case-insensitively; the first casing added wins.
/// * Declared aliases map onto the interchange format's `<aliases>` lists.
#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    uri: Option<String>,

    keywords: BTreeMap<String, Option<String>>,
    keyword_aliases: BTreeMap<String, BTreeSet<String>>,
    // case-folded keyword name -> canonical casing (the first added)
    keyword_names: HashMap<String, String>,

    statistics: BTreeMap<StatisticSpec, f64>,
    statistic_aliases: BTreeMap<StatisticSpec, BTreeSet<StatisticSpec>>,
    // case-folded statistic name -> canonical spec (the first added)
    statistic_names: HashMap<String, StatisticSpec>,

    graphs: BTreeMap<GraphSpec, Vec<u8>>,
    graph_aliases: BTreeMap<GraphSpec, BTreeSet<GraphSpec>>,
    // case-folded graph name -> canonical spec (the first added)
    graph_names: HashMap<String, GraphSpec>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    // ---- keywords ----

    /// Set a keyword value; a blank value is recorded as "no value".
    pub fn set_keyword(&mut self, keyword: &str, value: Option<&str>) {
        let value = value.map(str::trim).filter(|v| !v.is_empty());

        let folded = keyword.to_lowercase();
        let canonical = match self.keyword_names.get(&folded).cloned() {
            Some(existing) => {
                if existing != keyword {
                    warn!("Duplicate keyword '{existing}' and '{keyword}'");
                }
                existing
            }
            None => {
                self.keyword_names.insert(folded, keyword.to_string());
                keyword.to_string()
            }
        };
        self.keywords
            .insert(canonical, value.map(str::to_string));
    }

    pub fn set_keywords(&mut self, keywords: impl IntoIterator<Item = (String, String)>) {
        for (keyword, value) in keywords {
            self.set_keyword(&keyword, Some(&value));
        }
    }

    /// Declare an alternate accepted spelling for a keyword.
    pub fn add_keyword_alias(&mut self, keyword: &str, alias: &str) {
        self.keyword_aliases
            .entry(keyword.to_string())
            .or_default()
            .insert(alias.to_string());
    }

    /// Keyword values, excluding declared aliases.
    pub fn keywords(&self) -> &BTreeMap<String, Option<String>> {
        &self.keywords
    }

    pub fn keyword_aliases_of(&self, keyword: &str) -> Vec<&str> {
        self.keyword_aliases
            .get(keyword)
            .map(|aliases| aliases.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All keyword names, including names that were only declared as alias
    /// targets without a value of their own.
    pub fn keyword_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.keywords.keys().cloned().collect();
        names.extend(self.keyword_aliases.keys().cloned());
        names
    }

    /// Keyword names that are not declared as an alias of another name.
    pub fn keyword_names_without_aliases(&self) -> BTreeSet<String> {
        let mut names = self.keyword_names();
        for aliases in self.keyword_aliases.values() {
            for alias in aliases {
                names.remove(alias);
            }
        }
        names
    }

    // ---- statistics ----

    /// Set a statistic value.
    /// * NaN and infinite values are "no value" and remove the statistic.
    pub fn set_statistic(&mut self, stat: StatisticSpec, value: f64) {
        let folded = stat.to_string().to_lowercase();
        if !value.is_finite() {
            if let Some(existing) = self.statistic_names.remove(&folded) {
                self.statistics.remove(&existing);
            }
            return;
        }

        let canonical = match self.statistic_names.get(&folded).cloned() {
            Some(existing) => {
                if existing != stat {
                    warn!("Duplicate statistic '{existing}' and '{stat}'");
                }
                existing
            }
            None => {
                self.statistic_names.insert(folded, stat.clone());
                stat
            }
        };
        self.statistics.insert(canonical, value);
    }

    pub fn add_statistic_alias(&mut self, stat: StatisticSpec, alias: StatisticSpec) {
        self.statistic_aliases.entry(stat).or_default().insert(alias);
    }

    /// Statistic values, excluding declared aliases.
    pub fn statistics(&self) -> &BTreeMap<StatisticSpec, f64> {
        &self.statistics
    }

    pub fn statistic_aliases_of(&self, stat: &StatisticSpec) -> Vec<&StatisticSpec> {
        self.statistic_aliases
            .get(stat)
            .map(|aliases| aliases.iter().collect())
            .unwrap_or_default()
    }

    pub fn statistic_names(&self) -> BTreeSet<StatisticSpec> {
        let mut names: BTreeSet<StatisticSpec> = self.statistics.keys().cloned().collect();
        names.extend(self.statistic_aliases.keys().cloned());
        names
    }

    pub fn statistic_names_without_aliases(&self) -> BTreeSet<StatisticSpec> {
        let mut names = self.statistic_names();
        for aliases in self.statistic_aliases.values() {
            for alias in aliases {
                names.remove(alias);
            }
        }
        names
    }

    // ---- graphs ----

    pub fn set_graph(&mut self, graph: GraphSpec, data: Vec<u8>) {
        let folded = graph.to_string().to_lowercase();
        let canonical = match self.graph_names.get(&folded).cloned() {
            Some(existing) => {
                if existing != graph {
                    warn!("Duplicate graph '{existing}' and '{graph}'");
                }
                existing
            }
            None => {
                self.graph_names.insert(folded, graph.clone());
                graph
            }
        };
        self.graphs.insert(canonical, data);
    }

    pub fn add_graph_alias(&mut self, graph: GraphSpec, alias: GraphSpec) {
        self.graph_aliases.entry(graph).or_default().insert(alias);
    }

    /// Graph payloads, excluding declared aliases.
    pub fn graphs(&self) -> &BTreeMap<GraphSpec, Vec<u8>> {
        &self.graphs
    }

    pub fn graph_aliases_of(&self, graph: &GraphSpec) -> Vec<&GraphSpec> {
        self.graph_aliases
            .get(graph)
            .map(|aliases| aliases.iter().collect())
            .unwrap_or_default()
    }

    pub fn graph_names(&self) -> BTreeSet<GraphSpec> {
        let mut names: BTreeSet<GraphSpec> = self.graphs.keys().cloned().collect();
        names.extend(self.graph_aliases.keys().cloned());
        names
    }

    pub fn graph_names_without_aliases(&self) -> BTreeSet<GraphSpec> {
        let mut names = self.graph_names();
        for aliases in self.graph_aliases.values() {
            for alias in aliases {
                names.remove(alias);
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.keyword_aliases.is_empty()
            && self.statistics.is_empty()
            && self.statistic_aliases.is_empty()
            && self.graphs.is_empty()
            && self.graph_aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::statistic::Stat;
    use crate::specs::subset::SubsetSpec;

    fn stat(s: &str) -> StatisticSpec {
        StatisticSpec::parse(s).unwrap()
    }

    #[test]
    fn test_keyword_casing_folds_to_first_added() {
        let mut set = AttributeSet::new();
        set.set_keyword("Tube Name", Some("A1"));
        set.set_keyword("TUBE NAME", Some("A2"));

        assert_eq!(set.keywords().len(), 1);
        assert_eq!(
            set.keywords().get("Tube Name"),
            Some(&Some("A2".to_string()))
        );
    }

    #[test]
    fn test_blank_keyword_value_records_no_value() {
        let mut set = AttributeSet::new();
        set.set_keyword("$DATE", Some("   "));
        assert_eq!(set.keywords().get("$DATE"), Some(&None));
    }

    #[test]
    fn test_non_finite_statistic_is_removed() {
        let mut set = AttributeSet::new();
        set.set_statistic(stat("Lymphocytes:Count"), 42.0);
        assert_eq!(set.statistics().len(), 1);

        set.set_statistic(stat("Lymphocytes:Count"), f64::NAN);
        assert!(set.statistics().is_empty());

        set.set_statistic(stat("Lymphocytes:Count"), f64::INFINITY);
        assert!(set.statistics().is_empty());
    }

    #[test]
    fn test_statistic_spec_construction_round_trips() {
        let spec = StatisticSpec::new(SubsetSpec::parse("Singlets"), Stat::Median, Some("FSC-A"));
        assert_eq!(spec, stat("Singlets:Median(FSC-A)"));
    }

    #[test]
    fn test_names_include_alias_targets_without_values() {
        let mut set = AttributeSet::new();
        set.set_keyword("keyword2-alias", Some("value2"));
        set.add_keyword_alias("keyword2", "keyword2-alias");

        let names = set.keyword_names();
        assert!(names.contains("keyword2"));
        assert!(names.contains("keyword2-alias"));

        let primaries = set.keyword_names_without_aliases();
        assert!(primaries.contains("keyword2"));
        assert!(!primaries.contains("keyword2-alias"));
    }
}
