//! evidence cards: read-only bundles for the top of the ranking.
//! nothing is recomputed here, it's lookups over finished results.

use serde::{Deserialize, Serialize};

use crate::{
    lookup::{Druggability, DruggabilityLookup},
    matrix::Dimension,
    network::{Neighbor, NetworkEvidenceProvider},
    scorer::{LinchpinRecord, MasterRegulator, NormalizedScoreSet},
};

pub const DEFAULT_TOP_K: usize = 10;

/// neighbours shown per card
pub const MAX_NEIGHBORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProperties {
    pub degree: usize,
    pub clustering_coefficient: f64,
    pub neighbors: Vec<Neighbor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCard {
    pub rank: usize,
    pub feature_id: String,
    pub dimension: Dimension,
    pub composite_score: f64,
    pub scores: NormalizedScoreSet,
    pub master_regulator: Option<MasterRegulator>,
    pub druggability: Druggability,
    /// `None` when the feature isn't in the network
    pub network: Option<NetworkProperties>,
}

impl EvidenceCard {
    fn from_record(
        record: &LinchpinRecord,
        network: &dyn NetworkEvidenceProvider,
        druggability: &DruggabilityLookup,
    ) -> Self {
        let network = network.evidence(&record.feature_id).map(|e| NetworkProperties {
            degree: e.degree,
            clustering_coefficient: e.clustering_coefficient,
            neighbors: e.neighbors.into_iter().take(MAX_NEIGHBORS).collect(),
        });

        Self {
            rank: record.rank,
            feature_id: record.feature_id.clone(),
            dimension: record.dimension,
            composite_score: record.composite_score,
            scores: record.scores,
            master_regulator: record.master_regulator,
            druggability: druggability.assess(&record.feature_id),
            network,
        }
    }
}

/// cards for the first `top_k` records of an already-ranked list
pub fn generate_evidence_cards(
    ranking: &[LinchpinRecord],
    network: &dyn NetworkEvidenceProvider,
    druggability: &DruggabilityLookup,
    top_k: usize,
) -> Vec<EvidenceCard> {
    ranking
        .iter()
        .take(top_k)
        .map(|record| EvidenceCard::from_record(record, network, druggability))
        .collect()
}
