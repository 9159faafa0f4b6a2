//! curated lookup tables handed in by the caller: known regulators and
//! druggability. matching is on whole gene symbols, case-insensitive.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatorRole {
    TranscriptionFactor,
    Kinase,
    GrowthFactor,
    Epigenetic,
}

/// gene symbol -> regulator role.
///
/// a feature id matches when the whole id, or one of its `_`-separated
/// tokens, equals a symbol. `CD274_expression` hits `CD274`; `TP53BP1` does
/// not hit `TP53`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegulatorTable", into = "RegulatorTable")]
pub struct RegulatorLookup {
    roles: HashMap<String, RegulatorRole>,
}

impl RegulatorLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, role: RegulatorRole) -> Self {
        self.insert(symbol, role);
        self
    }

    pub fn insert(&mut self, symbol: &str, role: RegulatorRole) {
        self.roles.insert(symbol.to_uppercase(), role);
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn role(&self, feature_id: &str) -> Option<RegulatorRole> {
        let upper = feature_id.to_uppercase();
        self.roles.get(&upper).copied().or_else(|| {
            upper
                .split('_')
                .filter(|token| !token.is_empty())
                .find_map(|token| self.roles.get(token).copied())
        })
    }

    pub fn is_regulator(&self, feature_id: &str) -> bool {
        self.role(feature_id).is_some()
    }
}

/// on-disk shape: one symbol list per role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RegulatorTable {
    transcription_factors: Vec<String>,
    kinases: Vec<String>,
    growth_factors: Vec<String>,
    epigenetic: Vec<String>,
}

impl From<RegulatorTable> for RegulatorLookup {
    fn from(table: RegulatorTable) -> Self {
        let mut lookup = RegulatorLookup::new();
        let groups = [
            (table.transcription_factors, RegulatorRole::TranscriptionFactor),
            (table.kinases, RegulatorRole::Kinase),
            (table.growth_factors, RegulatorRole::GrowthFactor),
            (table.epigenetic, RegulatorRole::Epigenetic),
        ];
        for (symbols, role) in groups {
            for symbol in symbols {
                lookup.insert(&symbol, role);
            }
        }
        lookup
    }
}

impl From<RegulatorLookup> for RegulatorTable {
    fn from(lookup: RegulatorLookup) -> Self {
        let mut table = RegulatorTable::default();
        let mut entries: Vec<_> = lookup.roles.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (symbol, role) in entries {
            match role {
                RegulatorRole::TranscriptionFactor => table.transcription_factors.push(symbol),
                RegulatorRole::Kinase => table.kinases.push(symbol),
                RegulatorRole::GrowthFactor => table.growth_factors.push(symbol),
                RegulatorRole::Epigenetic => table.epigenetic.push(symbol),
            }
        }
        table
    }
}

/// druggability of a target. genes missing from the table are `Unknown`,
/// never "not druggable"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Druggability {
    Druggable {
        class: String,
        #[serde(default)]
        drugs: Vec<String>,
    },
    /// known target without an approved or tractable modality
    Challenging { class: String },
    #[default]
    Unknown,
}

impl Druggability {
    pub fn is_known(&self) -> bool {
        !matches!(self, Druggability::Unknown)
    }
}

/// gene symbol -> druggability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "HashMap<String, Druggability>",
    into = "HashMap<String, Druggability>"
)]
pub struct DruggabilityLookup {
    targets: HashMap<String, Druggability>,
}

impl DruggabilityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, druggability: Druggability) -> Self {
        self.targets.insert(symbol.to_uppercase(), druggability);
        self
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// whole id first, then the leading gene symbol (`EGFR_mut` -> `EGFR`)
    pub fn assess(&self, feature_id: &str) -> Druggability {
        let upper = feature_id.to_uppercase();
        let symbol = upper.split('_').next().unwrap_or(&upper);
        self.targets
            .get(&upper)
            .or_else(|| self.targets.get(symbol))
            .cloned()
            .unwrap_or_default()
    }
}

impl From<HashMap<String, Druggability>> for DruggabilityLookup {
    fn from(targets: HashMap<String, Druggability>) -> Self {
        Self {
            targets: targets
                .into_iter()
                .map(|(symbol, d)| (symbol.to_uppercase(), d))
                .collect(),
        }
    }
}

impl From<DruggabilityLookup> for HashMap<String, Druggability> {
    fn from(lookup: DruggabilityLookup) -> Self {
        lookup.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regulators() -> RegulatorLookup {
        RegulatorLookup::new()
            .with("TP53", RegulatorRole::TranscriptionFactor)
            .with("egfr", RegulatorRole::Kinase)
            .with("IL6", RegulatorRole::GrowthFactor)
    }

    #[test]
    fn test_regulator_matches_whole_symbols_only() {
        let lookup = regulators();

        assert_eq!(lookup.role("TP53"), Some(RegulatorRole::TranscriptionFactor));
        assert_eq!(lookup.role("EGFR_expression"), Some(RegulatorRole::Kinase));
        assert_eq!(lookup.role("mut_tp53"), Some(RegulatorRole::TranscriptionFactor));
        // substrings are not matches
        assert!(!lookup.is_regulator("TP53BP1"));
        assert!(!lookup.is_regulator("IL6R"));
    }

    #[test]
    fn test_regulator_table_from_toml() {
        let lookup: RegulatorLookup = toml::from_str(
            r#"
            transcription_factors = ["MYC", "STAT3"]
            kinases = ["MTOR"]
            epigenetic = ["EZH2"]
            "#,
        )
        .unwrap();

        assert_eq!(lookup.len(), 4);
        assert_eq!(lookup.role("ezh2"), Some(RegulatorRole::Epigenetic));
        assert_eq!(lookup.role("VEGFA"), None);
    }

    #[test]
    fn test_druggability_tri_state() {
        let lookup = DruggabilityLookup::new()
            .with(
                "EGFR",
                Druggability::Druggable {
                    class: "kinase inhibitor".into(),
                    drugs: vec!["Erlotinib".into()],
                },
            )
            .with("MYC", Druggability::Challenging { class: "transcription factor".into() });

        assert!(matches!(lookup.assess("EGFR_mut"), Druggability::Druggable { .. }));
        assert!(matches!(lookup.assess("myc"), Druggability::Challenging { .. }));
        assert_eq!(lookup.assess("ZNF99"), Druggability::Unknown);
        assert!(!lookup.assess("ZNF99").is_known());
    }

    #[test]
    fn test_druggability_from_toml() {
        let lookup: DruggabilityLookup = toml::from_str(
            r#"
            [IL6]
            status = "druggable"
            class = "cytokine inhibitor"
            drugs = ["Tocilizumab", "Siltuximab"]

            [ctnnb1]
            status = "challenging"
            class = "protein-protein interaction"
            "#,
        )
        .unwrap();

        match lookup.assess("IL6") {
            Druggability::Druggable { drugs, .. } => assert_eq!(drugs.len(), 2),
            other => panic!("expected druggable, got {:?}", other),
        }
        assert!(matches!(lookup.assess("CTNNB1"), Druggability::Challenging { .. }));
    }
}
