//! whole-run orchestration: screen all five dimensions, rank, build cards.
//!
//! dimensions are independent, so they're screened side by side. a dimension
//! that fails outright (bad data, no matrix) comes back empty with the reason
//! attached; the rest of the run carries on. only cancellation aborts.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    cancel::CancellationToken,
    config::AnalysisConfig,
    data::ClinicalTable,
    error::{LinchpinError, Result},
    evidence::{generate_evidence_cards, EvidenceCard},
    matrix::{Dimension, FeatureMatrix},
    network::NetworkEvidenceProvider,
    scorer::{LinchpinRecord, LinchpinScorer},
    screening::{screen_dimension, DimensionSummary},
};

/// per-run state threaded through every call
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    config: &'a AnalysisConfig,
    cancel: CancellationToken,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a AnalysisConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// screen one dimension; anything but cancellation becomes a failed summary
    pub fn screen(
        &self,
        clinical: &ClinicalTable,
        dimension: Dimension,
        matrix: Option<&FeatureMatrix>,
    ) -> Result<DimensionSummary> {
        let Some(matrix) = matrix else {
            info!(%dimension, "no matrix supplied");
            return Ok(DimensionSummary::empty(dimension));
        };

        match screen_dimension(clinical, matrix, &self.config.screening, &self.cancel) {
            Ok(summary) => Ok(summary),
            Err(LinchpinError::Cancelled) => Err(LinchpinError::Cancelled),
            Err(error) => {
                warn!(%dimension, %error, "dimension could not be screened");
                Ok(DimensionSummary::failed(dimension, error.to_string()))
            }
        }
    }
}

/// counts for one dimension of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionCounts {
    pub dimension: Dimension,
    pub features: usize,
    pub tested: usize,
    pub skipped: usize,
    pub significant: usize,
    pub failure: Option<String>,
}

/// everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summaries: Vec<DimensionSummary>,
    pub ranking: Vec<LinchpinRecord>,
    pub cards: Vec<EvidenceCard>,
    pub counts: Vec<DimensionCounts>,
}

impl AnalysisReport {
    pub fn summary(&self, dimension: Dimension) -> Option<&DimensionSummary> {
        self.summaries.iter().find(|s| s.dimension == dimension)
    }

    pub fn print(&self) {
        println!("screening");
        println!("=========");
        println!(
            "{:<22} {:>9} {:>7} {:>8} {:>12}",
            "dimension", "features", "tested", "skipped", "significant"
        );
        for c in &self.counts {
            println!(
                "{:<22} {:>9} {:>7} {:>8} {:>12}{}",
                c.dimension.as_str(),
                c.features,
                c.tested,
                c.skipped,
                c.significant,
                c.failure.as_ref().map(|f| format!("  ({})", f)).unwrap_or_default()
            );
        }

        println!();
        println!("top linchpins");
        println!("=============");
        println!(
            "{:>4} {:<16} {:<22} {:>9} {:>6} {:>6} {:>6} {:>6}",
            "rank", "feature", "dimension", "score", "prog", "hub", "cross", "reg"
        );
        for card in &self.cards {
            let s = &card.scores;
            println!(
                "{:>4} {:<16} {:<22} {:>9.4} {:>6.3} {:>6.3} {:>6.3} {:>6.3}",
                card.rank,
                card.feature_id,
                card.dimension.as_str(),
                card.composite_score,
                s.prognostic,
                s.hub,
                s.cross_domain,
                s.regulator
            );
        }
    }
}

pub struct LinchpinPipeline {
    config: AnalysisConfig,
    cancel: CancellationToken,
}

impl LinchpinPipeline {
    /// config is validated here; a bad one never starts a run
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// clone of the run's token, for cancelling from another thread
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// at most one matrix per dimension; missing dimensions screen as empty
    pub fn run(
        &self,
        clinical: &ClinicalTable,
        matrices: &[FeatureMatrix],
        network: &dyn NetworkEvidenceProvider,
    ) -> Result<AnalysisReport> {
        for (i, m) in matrices.iter().enumerate() {
            if matrices[..i].iter().any(|o| o.dimension() == m.dimension()) {
                return Err(LinchpinError::invalid_dimensions(format!(
                    "more than one matrix for {}",
                    m.dimension()
                )));
            }
        }

        let ctx = RunContext::new(&self.config, self.cancel.clone());
        let matrix_for = |d: Dimension| matrices.iter().find(|m| m.dimension() == d);
        info!(
            entities = clinical.len(),
            events = clinical.n_events(),
            matrices = matrices.len(),
            "starting linchpin run"
        );

        let screen = |d: &Dimension| ctx.screen(clinical, *d, matrix_for(*d));

        #[cfg(feature = "parallel")]
        let summaries = {
            use rayon::prelude::*;
            Dimension::ALL.par_iter().map(screen).collect::<Result<Vec<_>>>()
        };
        #[cfg(not(feature = "parallel"))]
        let summaries = Dimension::ALL.iter().map(screen).collect::<Result<Vec<_>>>();

        let summaries = summaries.inspect_err(|e| {
            if matches!(e, LinchpinError::Cancelled) {
                warn!("run cancelled during screening");
            }
        })?;
        self.cancel.check()?;

        let counts = summaries
            .iter()
            .map(|s| DimensionCounts {
                dimension: s.dimension,
                features: matrix_for(s.dimension).map_or(0, |m| m.n_features()),
                tested: s.n_tested(),
                skipped: s.skipped.len(),
                significant: s.n_significant(),
                failure: s.failure.clone(),
            })
            .collect();

        let scorer = LinchpinScorer::new(self.config.weights, self.config.regulators.clone());
        let ranking = scorer.rank(&summaries, network);
        let cards = generate_evidence_cards(
            &ranking,
            network,
            &self.config.druggability,
            self.config.top_k,
        );

        info!(ranked = ranking.len(), cards = cards.len(), "linchpin run finished");
        Ok(AnalysisReport {
            summaries,
            ranking,
            cards,
            counts,
        })
    }
}
