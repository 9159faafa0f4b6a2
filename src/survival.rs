//! non-parametric survival - kaplan-meier curves and the two-group log-rank test.
//!
//! neither function ever fails: degenerate input collapses to "no evidence"
//! (an empty curve, or p = 1.0) so thousands of screening calls can run
//! without one odd feature taking the batch down.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// one step of a kaplan-meier curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivalPoint {
    pub time: f64,
    pub probability: f64,
}

/// kaplan-meier estimate. emits a point only at times with at least one event,
/// so an all-censored cohort gives an empty curve (survival stays at 1).
///
/// `times` and `events` are paired up to the shorter of the two; non-finite
/// times are dropped.
pub fn estimate_survival_curve(times: &[f64], events: &[bool]) -> Vec<SurvivalPoint> {
    let mut data: Vec<(f64, bool)> = times
        .iter()
        .copied()
        .zip(events.iter().copied())
        .filter(|(t, _)| t.is_finite())
        .collect();
    data.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut curve = Vec::new();
    let mut n_at_risk = data.len();
    let mut survival_prob = 1.0;

    let mut i = 0;
    while i < data.len() {
        let current_time = data[i].0;
        let mut deaths = 0usize;
        let mut censored = 0usize;

        while i < data.len() && data[i].0 == current_time {
            if data[i].1 {
                deaths += 1;
            } else {
                censored += 1;
            }
            i += 1;
        }

        if deaths > 0 {
            survival_prob *= (n_at_risk - deaths) as f64 / n_at_risk as f64;
            curve.push(SurvivalPoint {
                time: current_time,
                probability: survival_prob,
            });
        }

        n_at_risk -= deaths + censored;
    }

    curve
}

/// first time the curve reaches 0.5 or below
pub fn median_survival_time(curve: &[SurvivalPoint]) -> Option<f64> {
    curve
        .iter()
        .find(|point| point.probability <= 0.5)
        .map(|point| point.time)
}

/// everything the log-rank sweep accumulates, group 1 relative to group 2
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRankResult {
    pub statistic: f64, // chi-square, 1 df
    pub p_value: f64,
    pub observed_1: f64,
    pub expected_1: f64,
    pub observed_2: f64,
    pub expected_2: f64,
    pub variance: f64,
}

impl LogRankResult {
    fn no_evidence(observed_1: f64, expected_1: f64, observed_2: f64, expected_2: f64) -> Self {
        Self {
            statistic: 0.0,
            p_value: 1.0,
            observed_1,
            expected_1,
            observed_2,
            expected_2,
            variance: 0.0,
        }
    }

    /// (O1/E1) / (O2/E2) - the usual log-rank hazard ratio estimate
    pub fn hazard_ratio(&self) -> Option<f64> {
        if self.expected_1 <= 0.0 || self.expected_2 <= 0.0 || self.observed_2 <= 0.0 {
            return None;
        }
        let hr = (self.observed_1 / self.expected_1) / (self.observed_2 / self.expected_2);
        (hr.is_finite() && hr > 0.0).then_some(hr)
    }

    /// se of log(HR) as sqrt(1/E1 + 1/E2)
    pub fn log_hazard_ratio_se(&self) -> Option<f64> {
        if self.expected_1 <= 0.0 || self.expected_2 <= 0.0 {
            return None;
        }
        Some((1.0 / self.expected_1 + 1.0 / self.expected_2).sqrt())
    }
}

/// log-rank p-value comparing group 1 against group 2
pub fn logrank_test(
    g1_times: &[f64],
    g1_events: &[bool],
    g2_times: &[f64],
    g2_events: &[bool],
) -> f64 {
    logrank(g1_times, g1_events, g2_times, g2_events).p_value
}

/// full log-rank sweep. a time step whose pooled risk set has <= 1 member adds
/// no variance; zero total variance (or an empty group) means p = 1.0.
pub fn logrank(
    g1_times: &[f64],
    g1_events: &[bool],
    g2_times: &[f64],
    g2_events: &[bool],
) -> LogRankResult {
    // (time, is_group_1, event)
    let mut pooled: Vec<(f64, bool, bool)> = g1_times
        .iter()
        .copied()
        .zip(g1_events.iter().copied())
        .map(|(t, e)| (t, true, e))
        .chain(
            g2_times
                .iter()
                .copied()
                .zip(g2_events.iter().copied())
                .map(|(t, e)| (t, false, e)),
        )
        .filter(|(t, _, _)| t.is_finite())
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut n1 = pooled.iter().filter(|(_, g1, _)| *g1).count();
    let mut n2 = pooled.len() - n1;

    if n1 == 0 || n2 == 0 {
        return LogRankResult::no_evidence(0.0, 0.0, 0.0, 0.0);
    }

    let mut observed_1 = 0.0;
    let mut expected_1 = 0.0;
    let mut observed_2 = 0.0;
    let mut expected_2 = 0.0;
    let mut variance = 0.0;

    let mut i = 0;
    while i < pooled.len() {
        let t = pooled[i].0;
        let (mut d1, mut d2, mut c1, mut c2) = (0usize, 0usize, 0usize, 0usize);

        while i < pooled.len() && pooled[i].0 == t {
            match (pooled[i].1, pooled[i].2) {
                (true, true) => d1 += 1,
                (true, false) => c1 += 1,
                (false, true) => d2 += 1,
                (false, false) => c2 += 1,
            }
            i += 1;
        }

        let n = (n1 + n2) as f64;
        let d = (d1 + d2) as f64;

        if n > 0.0 && d > 0.0 {
            let e1 = (n1 as f64 / n) * d;
            observed_1 += d1 as f64;
            expected_1 += e1;
            observed_2 += d2 as f64;
            expected_2 += d - e1;

            if n > 1.0 {
                variance += (n1 as f64 * n2 as f64 * d * (n - d)) / (n * n * (n - 1.0));
            }
        }

        n1 -= d1 + c1;
        n2 -= d2 + c2;
    }

    let observed_minus_expected = observed_1 - expected_1;

    if variance <= 0.0 || !variance.is_finite() || observed_minus_expected == 0.0 {
        return LogRankResult::no_evidence(observed_1, expected_1, observed_2, expected_2);
    }

    let statistic = observed_minus_expected * observed_minus_expected / variance;
    let p_value = match ChiSquared::new(1.0) {
        Ok(dist) => dist.sf(statistic),
        Err(_) => 1.0,
    };
    let p_value = if p_value.is_finite() {
        p_value.clamp(0.0, 1.0)
    } else {
        1.0
    };

    LogRankResult {
        statistic,
        p_value,
        observed_1,
        expected_1,
        observed_2,
        expected_2,
        variance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_and_all_censored_give_empty_curves() {
        assert!(estimate_survival_curve(&[], &[]).is_empty());
        assert!(estimate_survival_curve(&[1.0, 2.0, 3.0], &[false, false, false]).is_empty());
    }

    #[test]
    fn test_single_entity() {
        assert_eq!(
            estimate_survival_curve(&[7.5], &[true]),
            vec![SurvivalPoint { time: 7.5, probability: 0.0 }]
        );
        assert!(estimate_survival_curve(&[7.5], &[false]).is_empty());
    }

    #[test]
    fn test_uncensored_curve_steps_evenly() {
        let curve = estimate_survival_curve(&[4.0, 1.0, 3.0, 2.0], &[true; 4]);
        let probs: Vec<f64> = curve.iter().map(|p| p.probability).collect();
        let times: Vec<f64> = curve.iter().map(|p| p.time).collect();

        assert_eq!(times, vec![1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(probs[0], 0.75, epsilon = 1e-12);
        assert_relative_eq!(probs[1], 0.50, epsilon = 1e-12);
        assert_relative_eq!(probs[2], 0.25, epsilon = 1e-12);
        assert_relative_eq!(probs[3], 0.0, epsilon = 1e-12);
        assert_eq!(median_survival_time(&curve), Some(2.0));
    }

    #[test]
    fn test_censoring_shrinks_risk_set() {
        // t=1 death (5 at risk), t=2 censored, t=3 death (3 at risk), t=4 two deaths (2 at risk)
        let curve = estimate_survival_curve(
            &[1.0, 2.0, 3.0, 4.0, 4.0],
            &[true, false, true, true, true],
        );
        assert_eq!(curve.len(), 3);
        assert_relative_eq!(curve[0].probability, 0.8, epsilon = 1e-12);
        assert_relative_eq!(curve[1].probability, 0.8 * 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(curve[2].probability, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_curve_is_non_increasing_and_ends_above_zero_when_last_is_censored() {
        let times = [5.0, 1.0, 9.0, 3.0, 3.0, 12.0, 7.0, 2.0];
        let events = [true, true, false, true, false, false, true, true];
        let curve = estimate_survival_curve(&times, &events);

        for pair in curve.windows(2) {
            assert!(pair[1].probability <= pair[0].probability);
            assert!(pair[1].time > pair[0].time);
        }
        assert!(curve.iter().all(|p| p.probability > 0.0));
    }

    #[test]
    fn test_median_is_none_when_curve_stays_high() {
        let curve = estimate_survival_curve(&[1.0, 2.0, 3.0, 4.0], &[true, false, false, false]);
        assert_eq!(median_survival_time(&curve), None);
    }

    #[test]
    fn test_identical_groups_give_exactly_one() {
        let times = [3.0, 6.0, 6.0, 9.0, 14.0, 20.0];
        let events = [true, false, true, true, false, true];
        assert_eq!(logrank_test(&times, &events, &times, &events), 1.0);
    }

    #[test]
    fn test_interleaved_groups_scenario() {
        let p = logrank_test(
            &[10.0, 20.0, 30.0],
            &[true, true, true],
            &[5.0, 15.0, 25.0],
            &[true, true, true],
        );
        assert!(p.is_finite());
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_hand_computed_statistic() {
        let result = logrank(&[1.0, 3.0], &[true, true], &[2.0, 4.0], &[true, true]);

        assert_relative_eq!(result.statistic, 8.0 / 13.0, epsilon = 1e-12);
        assert_relative_eq!(result.observed_1, 2.0, epsilon = 1e-12);
        assert_relative_eq!(result.expected_1, 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.variance, 13.0 / 18.0, epsilon = 1e-12);
        assert!(result.p_value > 0.4 && result.p_value < 0.5);
    }

    #[test]
    fn test_separated_groups_are_significant() {
        let early: Vec<f64> = (1..=10).map(f64::from).collect();
        let late: Vec<f64> = (20..=29).map(f64::from).collect();
        let all_events = [true; 10];

        let result = logrank(&early, &all_events, &late, &all_events);
        assert!(result.p_value < 0.001);
        assert!(result.hazard_ratio().unwrap() > 1.0);
    }

    #[test]
    fn test_degenerate_inputs_never_fail() {
        assert_eq!(logrank_test(&[], &[], &[1.0, 2.0], &[true, true]), 1.0);
        assert_eq!(logrank_test(&[1.0], &[false], &[2.0], &[false]), 1.0);
        // a lone pair with one death: the only informative step has 2 at risk
        let p = logrank_test(&[1.0], &[true], &[2.0], &[false]);
        assert!(p.is_finite() && (0.0..=1.0).contains(&p));
        assert_eq!(logrank_test(&[f64::NAN], &[true], &[1.0], &[true]), 1.0);
    }
}
