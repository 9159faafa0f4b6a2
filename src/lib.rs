//! # linchpin
//!
//! survival biomarker screening + composite target ranking for cancer cohorts
//!
//! ## what you get
//!
//! - kaplan-meier curves and log-rank tests, from scratch
//! - per-feature cox (or median-split log-rank) screening across five biological dimensions
//! - bonferroni / benjamini-hochberg correction
//! - linchpin scoring: prognostic + network hub + cross-domain + regulator evidence
//! - evidence cards for the top of the list
//! - parallel screening when you want it (`parallel` feature, on by default)
//!
//! ## quick start
//!
//! ```rust
//! use linchpin::{
//!     AnalysisConfig, ClinicalTable, Dimension, FeatureKind, FeatureMatrix,
//!     InMemoryNetworkEvidence, LinchpinPipeline, SurvivalRecord,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // who died when
//! let clinical = ClinicalTable::new(
//!     (1..=12)
//!         .map(|i| SurvivalRecord::new(format!("p{}", i), i as f64, i % 4 != 0))
//!         .collect(),
//! )?;
//!
//! // one immune signature, measured on the same patients
//! let ids: Vec<String> = (1..=12).map(|i| format!("p{}", i)).collect();
//! let score = vec![9.0, 7.5, 8.0, 6.0, 6.5, 4.0, 5.0, 3.5, 2.0, 3.0, 1.0, 1.5];
//! let immune = FeatureMatrix::from_rows(
//!     Dimension::Immune,
//!     ids,
//!     vec![("CD8_signature".to_string(), FeatureKind::Signature, score.into_iter().map(Some).collect())],
//! )?;
//!
//! let pipeline = LinchpinPipeline::new(AnalysisConfig::default())?;
//! let report = pipeline.run(&clinical, &[immune], &InMemoryNetworkEvidence::new())?;
//!
//! assert_eq!(report.summaries.len(), 5);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod correction;
pub mod data;
pub mod error;
pub mod evidence;
pub mod export;
pub mod lookup;
pub mod matrix;
pub mod model;
pub mod network;
pub mod normalise;
pub mod optimization;
pub mod pipeline;
pub mod scorer;
pub mod screening;
pub mod survival;
pub mod weights;

pub use cancel::CancellationToken;
pub use config::AnalysisConfig;
pub use correction::MultipleTesting;
pub use data::{ClinicalTable, SurvivalData, SurvivalRecord};
pub use error::{LinchpinError, Result};
pub use evidence::{generate_evidence_cards, EvidenceCard};
pub use lookup::{Druggability, DruggabilityLookup, RegulatorLookup, RegulatorRole};
pub use matrix::{Dimension, FeatureKind, FeatureMatrix, FeatureObservation};
pub use model::CoxModel;
pub use network::{InMemoryNetworkEvidence, Neighbor, NetworkEvidence, NetworkEvidenceProvider};
pub use pipeline::{AnalysisReport, LinchpinPipeline, RunContext};
pub use scorer::{compute_linchpin_ranking, LinchpinRecord, LinchpinScorer, NormalizedScoreSet};
pub use screening::{
    run_screening, AssociationMethod, AssociationResult, DimensionSummary, ScreeningConfig,
    SkipReason,
};
pub use survival::{estimate_survival_curve, logrank_test, SurvivalPoint};
pub use weights::LinchpinWeights;
