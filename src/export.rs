//! writers for run outputs: CSV tables and JSON cards.
//! floats go out with rust's shortest round-trip formatting, so p-values
//! down at 1e-10 keep full precision.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::{
    error::Result,
    evidence::EvidenceCard,
    matrix::Dimension,
    pipeline::AnalysisReport,
    scorer::LinchpinRecord,
    screening::{AssociationResult, SkippedFeature},
};

#[derive(Serialize)]
struct RankingRow<'a> {
    rank: usize,
    feature_id: &'a str,
    dimension: Dimension,
    composite_score: f64,
    prognostic: f64,
    hub: f64,
    cross_domain: f64,
    regulator: f64,
    is_master_regulator: bool,
}

#[derive(Serialize)]
struct SkippedRow<'a> {
    feature_id: &'a str,
    dimension: Dimension,
    reason: String,
}

/// one row per association result
pub fn write_associations<W: Write>(writer: W, results: &[AssociationResult]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for result in results {
        csv.serialize(result)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_skipped<W: Write>(writer: W, skipped: &[SkippedFeature]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for skip in skipped {
        csv.serialize(SkippedRow {
            feature_id: &skip.feature_id,
            dimension: skip.dimension,
            reason: skip.reason.to_string(),
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_ranking<W: Write>(writer: W, ranking: &[LinchpinRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in ranking {
        csv.serialize(RankingRow {
            rank: record.rank,
            feature_id: &record.feature_id,
            dimension: record.dimension,
            composite_score: record.composite_score,
            prognostic: record.scores.prognostic,
            hub: record.scores.hub,
            cross_domain: record.scores.cross_domain,
            regulator: record.scores.regulator,
            is_master_regulator: record.is_master_regulator(),
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_cards<W: Write>(writer: W, cards: &[EvidenceCard]) -> Result<()> {
    serde_json::to_writer_pretty(writer, cards)?;
    Ok(())
}

/// associations.csv, skipped.csv, linchpin_ranking.csv and evidence_cards.json
/// under `dir` (created if missing)
pub fn write_report(dir: impl AsRef<Path>, report: &AnalysisReport) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let results: Vec<AssociationResult> = report
        .summaries
        .iter()
        .flat_map(|s| s.results.iter().cloned())
        .collect();
    let skipped: Vec<SkippedFeature> = report
        .summaries
        .iter()
        .flat_map(|s| s.skipped.iter().cloned())
        .collect();

    write_associations(File::create(dir.join("associations.csv"))?, &results)?;
    write_skipped(File::create(dir.join("skipped.csv"))?, &skipped)?;
    write_ranking(File::create(dir.join("linchpin_ranking.csv"))?, &report.ranking)?;
    write_cards(File::create(dir.join("evidence_cards.json"))?, &report.cards)?;

    info!(
        dir = %dir.display(),
        associations = results.len(),
        skipped = skipped.len(),
        ranked = report.ranking.len(),
        "report written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        matrix::FeatureKind,
        scorer::NormalizedScoreSet,
        screening::{AssociationMethod, SkipReason},
    };

    fn association() -> AssociationResult {
        AssociationResult {
            feature_id: "VEGFA".to_string(),
            dimension: Dimension::Stromal,
            kind: FeatureKind::Expression,
            method: AssociationMethod::CoxRegression,
            hazard_ratio: 1.8,
            log_hazard_ratio: 1.8f64.ln(),
            p_value: 1.234_567_890_123e-10,
            adjusted_p_value: 2.469_135_780_246e-9,
            ci_lower: 1.2,
            ci_upper: 2.7,
            log2_fold_change: None,
            n_samples: 240,
            n_events: 97,
            significant: false,
        }
    }

    #[test]
    fn test_association_csv_keeps_precision() {
        let mut buf = Vec::new();
        write_associations(&mut buf, &[association()]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("feature_id,dimension,kind,method,hazard_ratio"));
        let row = lines.next().unwrap();
        assert!(row.contains("stromal"));
        assert!(row.contains("cox_regression"));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let parsed: AssociationResult = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(parsed.p_value, 1.234_567_890_123e-10);
        assert_eq!(parsed.log2_fold_change, None);
    }

    #[test]
    fn test_ranking_csv_is_flat() {
        let record = LinchpinRecord {
            rank: 1,
            feature_id: "TGFB1".to_string(),
            dimension: Dimension::CytokineSignaling,
            composite_score: 0.75,
            scores: NormalizedScoreSet {
                prognostic: 1.0,
                hub: 0.5,
                cross_domain: 0.75,
                regulator: 1.0,
            },
            master_regulator: None,
        };
        let mut buf = Vec::new();
        write_ranking(&mut buf, &[record]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text.lines().next().unwrap(),
            "rank,feature_id,dimension,composite_score,prognostic,hub,cross_domain,regulator,is_master_regulator"
        );
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "1,TGFB1,cytokine_signaling,0.75,1.0,0.5,0.75,1.0,false"
        );
    }

    #[test]
    fn test_skipped_csv_carries_reason() {
        let skipped = SkippedFeature {
            feature_id: "FLAT".to_string(),
            dimension: Dimension::Immune,
            reason: SkipReason::InsufficientDistinctValues { distinct: 1 },
        };
        let mut buf = Vec::new();
        write_skipped(&mut buf, &[skipped]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("FLAT,immune,1 distinct value(s)"));
    }
}
