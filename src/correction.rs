//! multiple-testing correction over one screening run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleTesting {
    #[default]
    Bonferroni,
    BenjaminiHochberg,
}

impl MultipleTesting {
    /// adjusted p-values in input order. always raw <= adjusted <= 1
    pub fn adjust(&self, p_values: &[f64]) -> Vec<f64> {
        match self {
            MultipleTesting::Bonferroni => {
                let n = p_values.len();
                p_values.iter().map(|&p| bonferroni(p, n)).collect()
            }
            MultipleTesting::BenjaminiHochberg => benjamini_hochberg(p_values),
        }
    }
}

/// min(p * n, 1)
pub fn bonferroni(p_value: f64, n_tests: usize) -> f64 {
    if p_value.is_nan() {
        return 1.0;
    }
    (p_value * n_tests.max(1) as f64).clamp(p_value.clamp(0.0, 1.0), 1.0)
}

/// step-up FDR: q_(i) = min over j >= i of p_(j) * n / j, kept monotone
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut adjusted = vec![1.0; n];
    let mut running_min: f64 = 1.0;
    for (rank, &i) in order.iter().enumerate().rev() {
        let p = if p_values[i].is_nan() { 1.0 } else { p_values[i] };
        let q = p * n as f64 / (rank + 1) as f64;
        running_min = running_min.min(q);
        adjusted[i] = running_min.max(p).min(1.0);
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bonferroni_caps_at_one() {
        assert_relative_eq!(bonferroni(0.01, 10), 0.1, epsilon = 1e-12);
        assert_eq!(bonferroni(0.2, 10), 1.0);
        assert_eq!(bonferroni(f64::NAN, 3), 1.0);
        assert_eq!(bonferroni(0.03, 0), 0.03);
    }

    #[test]
    fn test_adjusted_never_below_raw_or_above_one() {
        let raw = [1e-10, 0.001, 0.04, 0.04, 0.3, 0.99, 1.0];
        for method in [MultipleTesting::Bonferroni, MultipleTesting::BenjaminiHochberg] {
            let adjusted = method.adjust(&raw);
            for (p, q) in raw.iter().zip(&adjusted) {
                assert!(q >= p, "{:?}: {} < {}", method, q, p);
                assert!(*q <= 1.0);
            }
        }
    }

    #[test]
    fn test_benjamini_hochberg_known_values() {
        // textbook example: p * n / rank then cumulative min from the top
        let raw = [0.01, 0.04, 0.03, 0.005];
        let q = benjamini_hochberg(&raw);

        assert_relative_eq!(q[3], 0.02, epsilon = 1e-12);
        assert_relative_eq!(q[0], 0.02, epsilon = 1e-12);
        assert_relative_eq!(q[2], 0.04, epsilon = 1e-12);
        assert_relative_eq!(q[1], 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_input() {
        assert!(MultipleTesting::BenjaminiHochberg.adjust(&[]).is_empty());
        assert!(MultipleTesting::Bonferroni.adjust(&[]).is_empty());
    }
}
