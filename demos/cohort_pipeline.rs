//! full run on a synthetic cohort: five dimensions, network evidence, export.
//!
//! `RUST_LOG=linchpin=debug cargo run --example cohort_pipeline`

use std::path::Path;

use linchpin::{
    export, AnalysisConfig, ClinicalTable, Dimension, FeatureKind, FeatureMatrix,
    InMemoryNetworkEvidence, LinchpinPipeline, Neighbor, NetworkEvidence, SurvivalRecord,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

const N_PATIENTS: usize = 250;

/// (feature, kind, weight on the latent risk)
const PANELS: [(Dimension, &[(&str, FeatureKind, f64)]); 5] = [
    (
        Dimension::TumorIntrinsic,
        &[
            ("TP53_mut", FeatureKind::Mutation, 1.0),
            ("MYC", FeatureKind::Expression, 0.8),
            ("PIK3CA", FeatureKind::Expression, 0.3),
            ("MKI67", FeatureKind::Expression, 0.6),
            ("GAPDH", FeatureKind::Expression, 0.0),
        ],
    ),
    (
        Dimension::Immune,
        &[
            ("CD8_infiltration", FeatureKind::Signature, -0.9),
            ("CD274", FeatureKind::Expression, -0.4),
            ("STAT3", FeatureKind::Expression, 0.5),
        ],
    ),
    (
        Dimension::Stromal,
        &[
            ("CAF_score", FeatureKind::Signature, 0.7),
            ("VEGFA", FeatureKind::Expression, 0.5),
        ],
    ),
    (
        Dimension::ExtracellularMatrix,
        &[
            ("COL1A1", FeatureKind::Expression, 0.6),
            ("FN1", FeatureKind::Expression, 0.2),
        ],
    ),
    (
        Dimension::CytokineSignaling,
        &[
            ("TGFB1", FeatureKind::Expression, 0.9),
            ("IL6", FeatureKind::Expression, 0.4),
            ("IFNG", FeatureKind::Expression, -0.5),
        ],
    ),
];

fn simulate(rng: &mut StdRng) -> Result<(ClinicalTable, Vec<FeatureMatrix>), linchpin::LinchpinError> {
    let latent: Vec<f64> = (0..N_PATIENTS).map(|_| rng.gen_range(-1.5..1.5)).collect();

    let records = latent
        .iter()
        .enumerate()
        .map(|(i, &z)| {
            let hazard = 0.05 * (0.9 * z).exp();
            let time: f64 = (-rng.r#gen::<f64>().ln() / hazard).max(0.5);
            let censoring: f64 = rng.gen_range(6.0..60.0);
            SurvivalRecord::new(format!("PT-{:03}", i), time.min(censoring), time < censoring)
        })
        .collect();
    let clinical = ClinicalTable::new(records)?;
    let ids: Vec<String> = clinical.records().iter().map(|r| r.entity_id.clone()).collect();

    let mut matrices = Vec::new();
    for (dimension, panel) in PANELS {
        let rows = panel
            .iter()
            .map(|&(name, kind, weight)| {
                let values = latent
                    .iter()
                    .map(|&z| {
                        // ~3% of measurements missing
                        if rng.gen_bool(0.03) {
                            return None;
                        }
                        let signal = weight * z + rng.gen_range(-0.7..0.7);
                        Some(match kind {
                            FeatureKind::Mutation => (signal > 0.6) as u8 as f64,
                            FeatureKind::Expression => 2f64.powf(4.0 + 2.0 * signal),
                            FeatureKind::Signature => signal,
                        })
                    })
                    .collect();
                (name.to_string(), kind, values)
            })
            .collect();
        matrices.push(FeatureMatrix::from_rows(dimension, ids.clone(), rows)?);
    }

    Ok((clinical, matrices))
}

/// stands in for the upstream correlation network
fn network_evidence() -> InMemoryNetworkEvidence {
    let node = |degree: usize, betweenness: f64, eigenvector: f64, neighbors: Vec<Neighbor>| {
        NetworkEvidence {
            degree,
            degree_centrality: degree as f64 / 16.0,
            betweenness,
            eigenvector,
            clustering_coefficient: 1.0 / (1.0 + degree as f64),
            neighbors,
        }
    };

    InMemoryNetworkEvidence::new()
        .with(
            "TGFB1",
            node(
                9,
                0.42,
                0.55,
                vec![
                    Neighbor::new("CAF_score", Some(Dimension::Stromal)),
                    Neighbor::new("COL1A1", Some(Dimension::ExtracellularMatrix)),
                    Neighbor::new("FN1", Some(Dimension::ExtracellularMatrix)),
                    Neighbor::new("CD8_infiltration", Some(Dimension::Immune)),
                    Neighbor::new("MYC", Some(Dimension::TumorIntrinsic)),
                    Neighbor::new("IL6", Some(Dimension::CytokineSignaling)),
                ],
            ),
        )
        .with(
            "TP53_mut",
            node(
                6,
                0.30,
                0.40,
                vec![
                    Neighbor::new("MKI67", Some(Dimension::TumorIntrinsic)),
                    Neighbor::new("CD8_infiltration", Some(Dimension::Immune)),
                    Neighbor::new("CD274", Some(Dimension::Immune)),
                ],
            ),
        )
        .with(
            "CAF_score",
            node(
                7,
                0.25,
                0.35,
                vec![
                    Neighbor::new("COL1A1", Some(Dimension::ExtracellularMatrix)),
                    Neighbor::new("TGFB1", Some(Dimension::CytokineSignaling)),
                    Neighbor::new("VEGFA", Some(Dimension::Stromal)),
                ],
            ),
        )
        .with(
            "CD8_infiltration",
            node(
                4,
                0.10,
                0.20,
                vec![
                    Neighbor::new("IFNG", Some(Dimension::CytokineSignaling)),
                    Neighbor::new("CD274", Some(Dimension::Immune)),
                ],
            ),
        )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/linchpin.toml");
    let config = AnalysisConfig::from_path(&config_path)?;

    let mut rng = StdRng::seed_from_u64(2024);
    let (clinical, matrices) = simulate(&mut rng)?;
    println!(
        "cohort: {} patients, {} events\n",
        clinical.len(),
        clinical.n_events()
    );

    let pipeline = LinchpinPipeline::new(config)?;
    let report = pipeline.run(&clinical, &matrices, &network_evidence())?;
    report.print();

    for summary in &report.summaries {
        if summary.positive.is_empty() && summary.negative.is_empty() {
            continue;
        }
        println!("\n{}", summary.dimension);
        for r in summary.positive.iter().chain(&summary.negative) {
            println!(
                "  {:<18} HR {:>6.3} [{:.3}, {:.3}]  p {:.2e}  adj {:.2e}",
                r.feature_id, r.hazard_ratio, r.ci_lower, r.ci_upper, r.p_value, r.adjusted_p_value
            );
        }
    }

    let out = std::env::temp_dir().join("linchpin-demo");
    export::write_report(&out, &report)?;
    println!("\nresults written to {}", out.display());

    Ok(())
}
