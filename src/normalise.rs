//! score normalisation - every component ends up in [0, 1].

use crate::matrix::Dimension;
use crate::network::NetworkEvidence;

/// floor on p before taking -log10, so p = 0 stays finite
pub const MIN_P_VALUE: f64 = 1e-10;

/// other dimensions a feature can reach
pub const MAX_OTHER_DIMENSIONS: f64 = 4.0;

/// cross-dimension edges that count as saturated connectivity
pub const SATURATING_CROSS_EDGES: f64 = 10.0;

/// degree above which an unlisted feature still gets partial regulator credit
pub const REGULATOR_DEGREE_THRESHOLD: usize = 5;

/// divide by the maximum. all-zero (or empty) input stays zero; negative and
/// non-finite values count as zero
pub fn max_scale(raw: &[f64]) -> Vec<f64> {
    let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    let max = raw.iter().copied().map(clean).fold(0.0, f64::max);
    if max <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|&v| (clean(v) / max).clamp(0.0, 1.0)).collect()
}

/// -log10(p) * |log HR|, before scaling
pub fn prognostic_raw(p_value: f64, log_hazard_ratio: f64) -> f64 {
    let p = if p_value.is_nan() { 1.0 } else { p_value };
    let effect = log_hazard_ratio.abs();
    if !effect.is_finite() {
        return 0.0;
    }
    -p.max(MIN_P_VALUE).min(1.0).log10() * effect
}

/// 0.4 betweenness + 0.3 degree centrality + 0.3 eigenvector, before scaling
pub fn hub_raw(evidence: &NetworkEvidence) -> f64 {
    0.4 * evidence.betweenness + 0.3 * evidence.degree_centrality + 0.3 * evidence.eigenvector
}

/// 0.6 min(dims/4, 1) + 0.4 min(edges/10, 1)
pub fn cross_domain_score(evidence: &NetworkEvidence, own: Dimension) -> f64 {
    let diversity = (evidence.other_dimensions(own) as f64 / MAX_OTHER_DIMENSIONS).min(1.0);
    let connectivity =
        (evidence.cross_dimension_edges(own) as f64 / SATURATING_CROSS_EDGES).min(1.0);
    0.6 * diversity + 0.4 * connectivity
}

/// 1 for a curated regulator, 0.5 for a well-connected node, else 0
pub fn regulator_score(is_known_regulator: bool, degree: usize) -> f64 {
    if is_known_regulator {
        1.0
    } else if degree > REGULATOR_DEGREE_THRESHOLD {
        0.5
    } else {
        0.0
    }
}
