//! linchpin composite scoring.
//!
//! composite = w1 prognostic + w2 hub + w3 cross_domain + w4 regulator, with
//! every component normalised to [0, 1] first. candidates are every feature
//! that produced an association result in any dimension.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    lookup::{RegulatorLookup, RegulatorRole},
    matrix::Dimension,
    network::{NetworkEvidence, NetworkEvidenceProvider},
    normalise::{cross_domain_score, hub_raw, max_scale, prognostic_raw, regulator_score},
    screening::{AssociationResult, DimensionSummary},
    weights::LinchpinWeights,
};

/// the four normalised components for one feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedScoreSet {
    pub prognostic: f64,
    pub hub: f64,
    pub cross_domain: f64,
    pub regulator: f64,
}

impl NormalizedScoreSet {
    pub fn as_array(&self) -> [f64; 4] {
        [self.prognostic, self.hub, self.cross_domain, self.regulator]
    }

    /// weighted sum, clamped into [0, 1]
    pub fn composite(&self, weights: &LinchpinWeights) -> f64 {
        let w = [
            weights.prognostic(),
            weights.hub(),
            weights.cross_domain(),
            weights.regulator(),
        ];
        let sum: f64 = self.as_array().iter().zip(w.iter()).map(|(s, w)| s * w).sum();
        sum.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatorEvidence {
    /// listed in the curated regulator table
    KnownRegulator,
    /// unlisted, but degree above the threshold
    NetworkTopology,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasterRegulator {
    pub score: f64,
    pub role: Option<RegulatorRole>,
    pub evidence: RegulatorEvidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinchpinRecord {
    /// 1-based
    pub rank: usize,
    pub feature_id: String,
    pub dimension: Dimension,
    pub composite_score: f64,
    pub scores: NormalizedScoreSet,
    pub master_regulator: Option<MasterRegulator>,
}

impl LinchpinRecord {
    pub fn is_master_regulator(&self) -> bool {
        self.master_regulator.is_some()
    }
}

/// ranks candidates under fixed weights and a regulator table
#[derive(Debug, Clone, Default)]
pub struct LinchpinScorer {
    weights: LinchpinWeights,
    regulators: RegulatorLookup,
}

impl LinchpinScorer {
    pub fn new(weights: LinchpinWeights, regulators: RegulatorLookup) -> Self {
        Self { weights, regulators }
    }

    pub fn weights(&self) -> &LinchpinWeights {
        &self.weights
    }

    fn master_regulator(&self, feature_id: &str, degree: usize) -> Option<MasterRegulator> {
        let role = self.regulators.role(feature_id);
        let score = regulator_score(role.is_some(), degree);
        if score <= 0.0 {
            return None;
        }
        Some(MasterRegulator {
            score,
            role,
            evidence: if role.is_some() {
                RegulatorEvidence::KnownRegulator
            } else {
                RegulatorEvidence::NetworkTopology
            },
        })
    }

    /// score and rank every tested feature across `summaries`
    pub fn rank(
        &self,
        summaries: &[DimensionSummary],
        network: &dyn NetworkEvidenceProvider,
    ) -> Vec<LinchpinRecord> {
        let candidates: Vec<&AssociationResult> =
            summaries.iter().flat_map(|s| s.results.iter()).collect();
        if candidates.is_empty() {
            info!("no candidates to rank");
            return Vec::new();
        }

        let evidence: Vec<Option<NetworkEvidence>> =
            candidates.iter().map(|c| network.evidence(&c.feature_id)).collect();

        let prognostic = max_scale(
            &candidates
                .iter()
                .map(|c| prognostic_raw(c.p_value, c.log_hazard_ratio))
                .collect::<Vec<_>>(),
        );
        let hub = max_scale(
            &evidence
                .iter()
                .map(|e| e.as_ref().map(hub_raw).unwrap_or(0.0))
                .collect::<Vec<_>>(),
        );

        let mut records: Vec<LinchpinRecord> = candidates
            .iter()
            .zip(&evidence)
            .enumerate()
            .map(|(i, (candidate, evidence))| {
                let degree = evidence.as_ref().map_or(0, |e| e.degree);
                let master_regulator = self.master_regulator(&candidate.feature_id, degree);
                if evidence.is_none() {
                    debug!(feature = %candidate.feature_id, "no network evidence");
                }

                let scores = NormalizedScoreSet {
                    prognostic: prognostic[i],
                    hub: hub[i],
                    cross_domain: evidence
                        .as_ref()
                        .map_or(0.0, |e| cross_domain_score(e, candidate.dimension)),
                    regulator: master_regulator.map_or(0.0, |m| m.score),
                };

                LinchpinRecord {
                    rank: 0,
                    feature_id: candidate.feature_id.clone(),
                    dimension: candidate.dimension,
                    composite_score: scores.composite(&self.weights),
                    scores,
                    master_regulator,
                }
            })
            .collect();

        records.sort_by(|a, b| {
            b.composite_score
                .total_cmp(&a.composite_score)
                .then_with(|| a.dimension.cmp(&b.dimension))
                .then_with(|| a.feature_id.cmp(&b.feature_id))
        });
        for (i, record) in records.iter_mut().enumerate() {
            record.rank = i + 1;
        }

        info!(
            candidates = records.len(),
            master_regulators = records.iter().filter(|r| r.is_master_regulator()).count(),
            "linchpin ranking computed"
        );
        records
    }
}

/// rank every tested feature by composite linchpin score
pub fn compute_linchpin_ranking(
    summaries: &[DimensionSummary],
    network: &dyn NetworkEvidenceProvider,
    regulators: &RegulatorLookup,
    weights: &LinchpinWeights,
) -> Vec<LinchpinRecord> {
    LinchpinScorer::new(*weights, regulators.clone()).rank(summaries, network)
}
