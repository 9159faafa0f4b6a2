//! network evidence consumed by the scorer.
//!
//! the correlation network itself is built upstream; all the scorer needs is
//! each feature's centrality, clustering and neighbour list. anything that can
//! answer [`NetworkEvidenceProvider::evidence`] will do.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{error::Result, matrix::Dimension};

/// a neighbouring node and, when known, the dimension it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub feature_id: String,
    #[serde(default)]
    pub dimension: Option<Dimension>,
}

impl Neighbor {
    pub fn new(feature_id: impl Into<String>, dimension: Option<Dimension>) -> Self {
        Self {
            feature_id: feature_id.into(),
            dimension,
        }
    }
}

/// precomputed topology for one feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkEvidence {
    pub degree: usize,
    pub degree_centrality: f64,
    pub betweenness: f64,
    pub eigenvector: f64,
    pub clustering_coefficient: f64,
    pub neighbors: Vec<Neighbor>,
}

impl NetworkEvidence {
    /// distinct dimensions other than `own` among the neighbours
    pub fn other_dimensions(&self, own: Dimension) -> usize {
        self.neighbors
            .iter()
            .filter_map(|n| n.dimension)
            .filter(|d| *d != own)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// edges that leave `own`
    pub fn cross_dimension_edges(&self, own: Dimension) -> usize {
        self.neighbors
            .iter()
            .filter(|n| n.dimension.is_some_and(|d| d != own))
            .count()
    }
}

/// source of per-feature network evidence
pub trait NetworkEvidenceProvider: Send + Sync {
    /// `None` when the feature isn't in the network
    fn evidence(&self, feature_id: &str) -> Option<NetworkEvidence>;
}

/// provider backed by a map, loadable from JSON (`{"TP53": {...}, ...}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryNetworkEvidence {
    nodes: HashMap<String, NetworkEvidence>,
}

impl InMemoryNetworkEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature_id: &str, evidence: NetworkEvidence) -> Self {
        self.insert(feature_id, evidence);
        self
    }

    pub fn insert(&mut self, feature_id: &str, evidence: NetworkEvidence) {
        self.nodes.insert(feature_id.to_string(), evidence);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl NetworkEvidenceProvider for InMemoryNetworkEvidence {
    fn evidence(&self, feature_id: &str) -> Option<NetworkEvidence> {
        self.nodes.get(feature_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> NetworkEvidence {
        NetworkEvidence {
            degree: 4,
            degree_centrality: 0.4,
            betweenness: 0.2,
            eigenvector: 0.3,
            clustering_coefficient: 0.5,
            neighbors: vec![
                Neighbor::new("CD8A", Some(Dimension::Immune)),
                Neighbor::new("CD4", Some(Dimension::Immune)),
                Neighbor::new("COL1A1", Some(Dimension::ExtracellularMatrix)),
                Neighbor::new("MKI67", Some(Dimension::TumorIntrinsic)),
                Neighbor::new("orphan", None),
            ],
        }
    }

    #[test]
    fn test_cross_dimension_counts_ignore_own_and_unknown() {
        let e = hub();
        assert_eq!(e.other_dimensions(Dimension::TumorIntrinsic), 2);
        assert_eq!(e.cross_dimension_edges(Dimension::TumorIntrinsic), 3);
        assert_eq!(e.other_dimensions(Dimension::Stromal), 3);
        assert_eq!(e.cross_dimension_edges(Dimension::Stromal), 4);
    }

    #[test]
    fn test_in_memory_provider() {
        let provider = InMemoryNetworkEvidence::new().with("TP53", hub());
        assert_eq!(provider.evidence("TP53").unwrap().degree, 4);
        assert!(provider.evidence("MYC").is_none());
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{
            "TGFB1": {
                "degree": 7,
                "betweenness": 0.31,
                "neighbors": [{"feature_id": "COL1A1", "dimension": "extracellular_matrix"}]
            }
        }"#;
        let provider = InMemoryNetworkEvidence::from_json_str(json).unwrap();
        let e = provider.evidence("TGFB1").unwrap();

        assert_eq!(e.degree, 7);
        assert_eq!(e.eigenvector, 0.0);
        assert_eq!(e.neighbors[0].dimension, Some(Dimension::ExtracellularMatrix));
        assert_eq!(provider.len(), 1);
    }
}
