//! per-feature survival-association screening.
//!
//! every feature in a dimension's matrix is tested on its own against the
//! clinical table. a feature either yields an [`AssociationResult`] or is
//! recorded as a [`SkippedFeature`] with the reason - statistical trouble in
//! one feature never aborts the dimension. after the map step the tested
//! features are corrected for multiple testing and reduced to a
//! [`DimensionSummary`] (top 5 risk / top 5 protective).

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    cancel::CancellationToken,
    correction::MultipleTesting,
    data::{ClinicalTable, SurvivalData},
    error::{LinchpinError, Result},
    matrix::{Dimension, FeatureKind, FeatureMatrix, FeatureObservation},
    model::{CoxModel, Z_95},
    survival::logrank,
};

/// entries per side of a dimension summary
pub const SUMMARY_SIZE: usize = 5;

/// guards the fold-change ratio against zero means
const FOLD_CHANGE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationMethod {
    /// single-covariate cox model, wald test
    #[default]
    CoxRegression,
    /// high vs low around the median, log-rank test
    MedianSplitLogRank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    pub p_threshold: f64,
    pub fold_change_threshold: f64,
    pub min_samples_per_group: usize,
    pub method: AssociationMethod,
    /// fall back to median-split log-rank when a cox fit doesn't converge
    pub logrank_fallback: bool,
    pub correction: MultipleTesting,
    pub l2_penalty: f64,
    pub max_iterations: usize,
    /// features per dimension before the map goes parallel
    pub parallel_threshold: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            p_threshold: 0.05,
            fold_change_threshold: 2.0,
            min_samples_per_group: 3,
            method: AssociationMethod::default(),
            logrank_fallback: false,
            correction: MultipleTesting::default(),
            l2_penalty: 0.0,
            max_iterations: 50,
            parallel_threshold: 64,
        }
    }
}

impl ScreeningConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.p_threshold > 0.0 && self.p_threshold <= 1.0) {
            return Err(LinchpinError::config("p_threshold", self.p_threshold.to_string()));
        }
        if !(self.fold_change_threshold >= 1.0) || !self.fold_change_threshold.is_finite() {
            return Err(LinchpinError::config(
                "fold_change_threshold",
                self.fold_change_threshold.to_string(),
            ));
        }
        if self.min_samples_per_group == 0 {
            return Err(LinchpinError::config("min_samples_per_group", "0"));
        }
        if !(self.l2_penalty >= 0.0) || !self.l2_penalty.is_finite() {
            return Err(LinchpinError::config("l2_penalty", self.l2_penalty.to_string()));
        }
        if self.max_iterations == 0 {
            return Err(LinchpinError::config("max_iterations", "0"));
        }
        Ok(())
    }
}

/// one feature's survival association. created once per screening run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationResult {
    pub feature_id: String,
    pub dimension: Dimension,
    pub kind: FeatureKind,
    pub method: AssociationMethod,
    pub hazard_ratio: f64,
    pub log_hazard_ratio: f64,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub log2_fold_change: Option<f64>,
    pub n_samples: usize,
    pub n_events: usize,
    pub significant: bool,
}

/// why a feature produced no result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientDistinctValues { distinct: usize },
    InsufficientSamples { high: usize, low: usize, required: usize },
    Convergence { message: String },
    Data { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientDistinctValues { distinct } => {
                write!(f, "{} distinct value(s), need 2", distinct)
            }
            SkipReason::InsufficientSamples { high, low, required } => {
                write!(f, "groups of {} / {}, need {} each", high, low, required)
            }
            SkipReason::Convergence { message } => write!(f, "no convergence: {}", message),
            SkipReason::Data { message } => write!(f, "bad data: {}", message),
        }
    }
}

impl SkipReason {
    fn from_error(error: LinchpinError) -> Self {
        match error {
            LinchpinError::Convergence { message } => SkipReason::Convergence { message },
            LinchpinError::NumericalError { message } => SkipReason::Convergence { message },
            other => SkipReason::Data {
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFeature {
    pub feature_id: String,
    pub dimension: Dimension,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// tagged per-feature outcome
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutcome {
    Tested(AssociationResult),
    Skipped(SkippedFeature),
}

/// per-dimension reduction of a screening run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub dimension: Dimension,
    /// significant, HR > 1, ascending p, at most 5
    pub positive: Vec<AssociationResult>,
    /// significant, HR < 1, ascending p, at most 5
    pub negative: Vec<AssociationResult>,
    /// every tested feature, ascending p
    pub results: Vec<AssociationResult>,
    pub skipped: Vec<SkippedFeature>,
    /// set when the whole dimension could not be screened
    pub failure: Option<String>,
}

impl DimensionSummary {
    pub fn empty(dimension: Dimension) -> Self {
        Self {
            dimension,
            positive: Vec::new(),
            negative: Vec::new(),
            results: Vec::new(),
            skipped: Vec::new(),
            failure: None,
        }
    }

    pub fn failed(dimension: Dimension, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::empty(dimension)
        }
    }

    /// sort ascending by p (feature id breaks ties) and pick the top 5 each way
    pub fn from_results(
        dimension: Dimension,
        mut results: Vec<AssociationResult>,
        skipped: Vec<SkippedFeature>,
    ) -> Self {
        results.sort_by(|a, b| {
            a.p_value
                .total_cmp(&b.p_value)
                .then_with(|| a.feature_id.cmp(&b.feature_id))
        });

        let top = |keep: fn(&AssociationResult) -> bool| -> Vec<AssociationResult> {
            results
                .iter()
                .filter(|r| r.significant && keep(r))
                .take(SUMMARY_SIZE)
                .cloned()
                .collect()
        };
        let positive = top(|r| r.hazard_ratio > 1.0);
        let negative = top(|r| r.hazard_ratio < 1.0);

        Self {
            dimension,
            positive,
            negative,
            results,
            skipped,
            failure: None,
        }
    }

    pub fn n_tested(&self) -> usize {
        self.results.len()
    }

    pub fn n_significant(&self) -> usize {
        self.results.iter().filter(|r| r.significant).count()
    }
}

/// hazard ratio + inference from whichever method produced it
struct Estimate {
    method: AssociationMethod,
    hazard_ratio: f64,
    log_hazard_ratio: f64,
    p_value: f64,
    ci_lower: f64,
    ci_upper: f64,
}

impl Estimate {
    /// no evidence either way
    fn neutral(method: AssociationMethod) -> Self {
        Self {
            method,
            hazard_ratio: 1.0,
            log_hazard_ratio: 0.0,
            p_value: 1.0,
            ci_lower: 0.0,
            ci_upper: f64::INFINITY,
        }
    }
}

/// complete-case (time, event, value) triples for one feature
struct Observations {
    times: Vec<f64>,
    events: Vec<bool>,
    values: Vec<f64>,
}

impl Observations {
    fn collect(
        clinical: &ClinicalTable,
        alignment: &[Option<usize>],
        feature: &FeatureObservation<'_>,
    ) -> Self {
        let records = clinical.records();
        let mut obs = Self {
            times: Vec::new(),
            events: Vec::new(),
            values: Vec::new(),
        };

        for (column, row) in alignment.iter().enumerate() {
            let (Some(row), Some(value)) = (row, feature.value(column)) else {
                continue;
            };
            let record = &records[*row];
            obs.times.push(record.time);
            obs.events.push(record.event);
            obs.values.push(value);
        }
        obs
    }

    fn n_distinct(&self) -> usize {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted.dedup();
        sorted.len()
    }

    fn median(&self) -> f64 {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        if n % 2 == 1 {
            sorted[n / 2]
        } else {
            0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
        }
    }

    /// high = value >= median, or > median when >= would empty the low group
    fn median_split(&self) -> Vec<bool> {
        let median = self.median();
        let high: Vec<bool> = self.values.iter().map(|&v| v >= median).collect();
        if high.iter().all(|&h| h) {
            self.values.iter().map(|&v| v > median).collect()
        } else {
            high
        }
    }

    fn group(&self, high: &[bool], want_high: bool) -> (Vec<f64>, Vec<bool>) {
        high.iter()
            .enumerate()
            .filter(|(_, &h)| h == want_high)
            .map(|(i, _)| (self.times[i], self.events[i]))
            .unzip()
    }

    fn group_mean(&self, high: &[bool], want_high: bool) -> f64 {
        let (sum, count) = high
            .iter()
            .zip(&self.values)
            .filter(|(&h, _)| h == want_high)
            .fold((0.0, 0usize), |(s, c), (_, &v)| (s + v, c + 1));
        sum / count.max(1) as f64
    }
}

fn cox_estimate(obs: &Observations, config: &ScreeningConfig) -> Result<Estimate> {
    let covariates = Array2::from_shape_vec((obs.values.len(), 1), obs.values.clone())
        .map_err(|e| LinchpinError::invalid_dimensions(e.to_string()))?;
    let data = SurvivalData::new(obs.times.clone(), obs.events.clone(), covariates)?;

    let mut model = CoxModel::new()
        .with_l2_penalty(config.l2_penalty)
        .with_max_iterations(config.max_iterations);
    model.fit(&data)?;

    let summary = model.summary()?;
    let term = summary
        .terms
        .first()
        .ok_or_else(|| LinchpinError::convergence("fit produced no coefficient"))?;

    Ok(Estimate {
        method: AssociationMethod::CoxRegression,
        hazard_ratio: term.hazard_ratio,
        log_hazard_ratio: term.coefficient,
        p_value: term.p_value,
        ci_lower: term.ci_lower,
        ci_upper: term.ci_upper,
    })
}

fn logrank_estimate(obs: &Observations, high: &[bool]) -> Estimate {
    let (high_times, high_events) = obs.group(high, true);
    let (low_times, low_events) = obs.group(high, false);
    let result = logrank(&high_times, &high_events, &low_times, &low_events);

    match (result.hazard_ratio(), result.log_hazard_ratio_se()) {
        (Some(hr), Some(se)) => {
            let log_hr = hr.ln();
            Estimate {
                method: AssociationMethod::MedianSplitLogRank,
                hazard_ratio: hr,
                log_hazard_ratio: log_hr,
                p_value: result.p_value,
                ci_lower: (log_hr - Z_95 * se).exp(),
                ci_upper: (log_hr + Z_95 * se).exp(),
            }
        }
        // zero expected (or observed) events on one side: nothing to compare
        _ => Estimate::neutral(AssociationMethod::MedianSplitLogRank),
    }
}

/// test one feature. the result's `adjusted_p_value` covers this single test;
/// [`screen_dimension`] re-adjusts across the whole dimension
pub fn screen_feature(
    clinical: &ClinicalTable,
    alignment: &[Option<usize>],
    feature: &FeatureObservation<'_>,
    config: &ScreeningConfig,
) -> FeatureOutcome {
    let skip = |reason: SkipReason| {
        FeatureOutcome::Skipped(SkippedFeature {
            feature_id: feature.feature_id.to_string(),
            dimension: feature.dimension,
            reason,
        })
    };

    let obs = Observations::collect(clinical, alignment, feature);

    let distinct = obs.n_distinct();
    if distinct < 2 {
        return skip(SkipReason::InsufficientDistinctValues { distinct });
    }

    let high = obs.median_split();
    let n_high = high.iter().filter(|&&h| h).count();
    let n_low = high.len() - n_high;
    if n_high < config.min_samples_per_group || n_low < config.min_samples_per_group {
        return skip(SkipReason::InsufficientSamples {
            high: n_high,
            low: n_low,
            required: config.min_samples_per_group,
        });
    }

    let estimate = match config.method {
        AssociationMethod::MedianSplitLogRank => logrank_estimate(&obs, &high),
        AssociationMethod::CoxRegression => match cox_estimate(&obs, config) {
            Ok(estimate) => estimate,
            // no events or a flat likelihood: a neutral finding, not a skip
            Err(LinchpinError::DegenerateInput { .. }) => {
                Estimate::neutral(AssociationMethod::CoxRegression)
            }
            Err(error) if config.logrank_fallback && error.is_recoverable() => {
                debug!(
                    dimension = %feature.dimension,
                    feature = feature.feature_id,
                    %error,
                    "cox fit failed, falling back to log-rank"
                );
                logrank_estimate(&obs, &high)
            }
            Err(error) => return skip(SkipReason::from_error(error)),
        },
    };

    let log2_fold_change = match feature.kind {
        FeatureKind::Expression => {
            let fold_change =
                obs.group_mean(&high, true) / (obs.group_mean(&high, false) + FOLD_CHANGE_EPSILON);
            Some((fold_change + FOLD_CHANGE_EPSILON).log2()).filter(|l| l.is_finite())
        }
        FeatureKind::Mutation | FeatureKind::Signature => None,
    };

    let passes_fold_change = match feature.kind {
        FeatureKind::Expression => log2_fold_change
            .map(|l| l.abs() > config.fold_change_threshold.log2())
            .unwrap_or(false),
        FeatureKind::Mutation | FeatureKind::Signature => true,
    };

    let p_value = if estimate.p_value.is_finite() {
        estimate.p_value.clamp(0.0, 1.0)
    } else {
        1.0
    };

    FeatureOutcome::Tested(AssociationResult {
        feature_id: feature.feature_id.to_string(),
        dimension: feature.dimension,
        kind: feature.kind,
        method: estimate.method,
        hazard_ratio: estimate.hazard_ratio,
        log_hazard_ratio: estimate.log_hazard_ratio,
        p_value,
        adjusted_p_value: p_value,
        ci_lower: estimate.ci_lower,
        ci_upper: estimate.ci_upper,
        log2_fold_change,
        n_samples: obs.values.len(),
        n_events: obs.events.iter().filter(|&&e| e).count(),
        significant: p_value < config.p_threshold && passes_fold_change,
    })
}

fn screen_all(
    clinical: &ClinicalTable,
    matrix: &FeatureMatrix,
    alignment: &[Option<usize>],
    config: &ScreeningConfig,
    cancel: &CancellationToken,
) -> Result<Vec<FeatureOutcome>> {
    let test = |index: usize| -> Result<Option<FeatureOutcome>> {
        cancel.check()?;
        Ok(matrix
            .feature(index)
            .map(|feature| screen_feature(clinical, alignment, &feature, config)))
    };

    #[cfg(feature = "parallel")]
    {
        if matrix.n_features() > config.parallel_threshold {
            use rayon::prelude::*;
            let outcomes = (0..matrix.n_features())
                .into_par_iter()
                .map(&test)
                .collect::<Result<Vec<_>>>()?;
            return Ok(outcomes.into_iter().flatten().collect());
        }
    }

    let outcomes = (0..matrix.n_features())
        .map(&test)
        .collect::<Result<Vec<_>>>()?;
    Ok(outcomes.into_iter().flatten().collect())
}

/// screen every feature of one dimension and reduce to its summary.
/// `total_features_tested` for the correction is the number of features that
/// produced a result
pub fn screen_dimension(
    clinical: &ClinicalTable,
    matrix: &FeatureMatrix,
    config: &ScreeningConfig,
    cancel: &CancellationToken,
) -> Result<DimensionSummary> {
    config.validate()?;
    let dimension = matrix.dimension();

    if matrix.is_empty() {
        info!(%dimension, "no features to screen");
        return Ok(DimensionSummary::empty(dimension));
    }

    let alignment = matrix.align(clinical);
    let outcomes = screen_all(clinical, matrix, &alignment, config, cancel)?;

    let mut tested = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            FeatureOutcome::Tested(result) => tested.push(result),
            FeatureOutcome::Skipped(skip) => {
                debug!(
                    %dimension,
                    feature = %skip.feature_id,
                    reason = %skip.reason,
                    "feature skipped"
                );
                skipped.push(skip);
            }
        }
    }

    let raw: Vec<f64> = tested.iter().map(|r| r.p_value).collect();
    let adjusted = config.correction.adjust(&raw);
    let results: Vec<AssociationResult> = tested
        .into_iter()
        .zip(adjusted)
        .map(|(result, adjusted_p_value)| AssociationResult {
            adjusted_p_value,
            ..result
        })
        .collect();

    let summary = DimensionSummary::from_results(dimension, results, skipped);
    info!(
        %dimension,
        tested = summary.n_tested(),
        skipped = summary.skipped.len(),
        significant = summary.n_significant(),
        "dimension screened"
    );
    Ok(summary)
}

/// screen one dimension. a missing matrix gives an empty summary
pub fn run_screening(
    clinical: &ClinicalTable,
    feature_matrix: Option<&FeatureMatrix>,
    dimension: Dimension,
    config: &ScreeningConfig,
) -> Result<DimensionSummary> {
    match feature_matrix {
        None => {
            config.validate()?;
            Ok(DimensionSummary::empty(dimension))
        }
        Some(matrix) if matrix.dimension() != dimension => {
            Err(LinchpinError::invalid_dimensions(format!(
                "matrix is tagged {} but was passed as {}",
                matrix.dimension(),
                dimension
            )))
        }
        Some(matrix) => screen_dimension(clinical, matrix, config, &CancellationToken::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SurvivalRecord;

    /// 12 patients, times 1..12, everyone dies; `risk` drives early death
    fn clinical() -> ClinicalTable {
        let records = (1..=12)
            .map(|i| SurvivalRecord::new(format!("p{}", i), i as f64, i % 4 != 0))
            .collect();
        ClinicalTable::new(records).unwrap()
    }

    fn entity_ids() -> Vec<String> {
        (1..=12).map(|i| format!("p{}", i)).collect()
    }

    fn matrix(rows: Vec<(&str, FeatureKind, Vec<Option<f64>>)>) -> FeatureMatrix {
        FeatureMatrix::from_rows(
            Dimension::TumorIntrinsic,
            entity_ids(),
            rows.into_iter()
                .map(|(id, kind, values)| (id.to_string(), kind, values))
                .collect(),
        )
        .unwrap()
    }

    fn all(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    fn result(id: &str, hr: f64, p: f64, significant: bool) -> AssociationResult {
        AssociationResult {
            feature_id: id.to_string(),
            dimension: Dimension::Immune,
            kind: FeatureKind::Signature,
            method: AssociationMethod::CoxRegression,
            hazard_ratio: hr,
            log_hazard_ratio: hr.ln(),
            p_value: p,
            adjusted_p_value: p,
            ci_lower: hr * 0.5,
            ci_upper: hr * 2.0,
            log2_fold_change: None,
            n_samples: 12,
            n_events: 9,
            significant,
        }
    }

    #[test]
    fn test_constant_feature_is_skipped_without_error() {
        let m = matrix(vec![("FLAT", FeatureKind::Expression, all(&[3.0; 12]))]);
        let summary =
            screen_dimension(&clinical(), &m, &ScreeningConfig::default(), &CancellationToken::new())
                .unwrap();

        assert!(summary.results.is_empty());
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(
            summary.skipped[0].reason,
            SkipReason::InsufficientDistinctValues { distinct: 1 }
        );
    }

    #[test]
    fn test_small_groups_are_skipped() {
        let mut values = vec![Some(0.0); 12];
        values[0] = Some(1.0);
        values[1] = Some(1.0);
        let m = matrix(vec![("RARE", FeatureKind::Mutation, values)]);
        let summary =
            screen_dimension(&clinical(), &m, &ScreeningConfig::default(), &CancellationToken::new())
                .unwrap();

        assert_eq!(
            summary.skipped[0].reason,
            SkipReason::InsufficientSamples { high: 2, low: 10, required: 3 }
        );
    }

    #[test]
    fn test_sparse_binary_feature_splits_on_strictly_above_median() {
        let mut values = vec![Some(0.0); 12];
        for v in values.iter_mut().take(4) {
            *v = Some(1.0);
        }
        let m = matrix(vec![("KRAS", FeatureKind::Mutation, values)]);
        let config = ScreeningConfig {
            method: AssociationMethod::MedianSplitLogRank,
            ..Default::default()
        };
        let summary =
            screen_dimension(&clinical(), &m, &config, &CancellationToken::new()).unwrap();

        assert_eq!(summary.results.len(), 1);
        // mutated patients are the first to die
        assert!(summary.results[0].hazard_ratio > 1.0);
        assert_eq!(summary.results[0].log2_fold_change, None);
    }

    #[test]
    fn test_cox_screen_finds_the_risk_direction() {
        // noisy decreasing risk with time, not perfectly separated
        let risk = [9.0, 7.5, 8.0, 6.0, 6.5, 4.0, 5.0, 3.5, 2.0, 3.0, 1.0, 1.5];
        let protective: Vec<f64> = risk.iter().map(|r| 10.0 - r).collect();
        let m = matrix(vec![
            ("RISK", FeatureKind::Signature, all(&risk)),
            ("PROTECT", FeatureKind::Signature, all(&protective)),
        ]);
        let summary =
            screen_dimension(&clinical(), &m, &ScreeningConfig::default(), &CancellationToken::new())
                .unwrap();

        assert!(summary.skipped.is_empty());
        let find = |id: &str| summary.results.iter().find(|r| r.feature_id == id).unwrap();
        assert!(find("RISK").hazard_ratio > 1.0);
        assert!(find("PROTECT").hazard_ratio < 1.0);
        assert!(find("RISK").significant && find("PROTECT").significant);
        assert_eq!(summary.positive.len(), 1);
        assert_eq!(summary.negative.len(), 1);

        for r in &summary.results {
            assert_eq!(r.method, AssociationMethod::CoxRegression);
            assert!(r.adjusted_p_value >= r.p_value);
            assert!(r.adjusted_p_value <= 1.0);
            assert!(r.ci_lower <= r.hazard_ratio && r.hazard_ratio <= r.ci_upper);
        }
    }

    #[test]
    fn test_separated_feature_is_a_convergence_skip_or_fallback() {
        let perfect: Vec<f64> = (0..12).map(|i| 12.0 - i as f64).collect();
        let m = matrix(vec![("SEP", FeatureKind::Signature, all(&perfect))]);

        let records = (1..=12)
            .map(|i| SurvivalRecord::new(format!("p{}", i), i as f64, true))
            .collect();
        let clinical = ClinicalTable::new(records).unwrap();

        let strict =
            screen_dimension(&clinical, &m, &ScreeningConfig::default(), &CancellationToken::new())
                .unwrap();
        assert!(strict.results.is_empty());
        assert!(matches!(strict.skipped[0].reason, SkipReason::Convergence { .. }));

        let lenient = ScreeningConfig {
            logrank_fallback: true,
            ..Default::default()
        };
        let fallback = screen_dimension(&clinical, &m, &lenient, &CancellationToken::new()).unwrap();
        assert_eq!(fallback.results.len(), 1);
        assert_eq!(fallback.results[0].method, AssociationMethod::MedianSplitLogRank);
    }

    #[test]
    fn test_expression_needs_fold_change_to_be_significant() {
        // strong survival signal but the two halves differ by well under 2x
        let values: Vec<f64> = (0..12).map(|i| 10.0 + (12 - i) as f64 * 0.1).collect();
        let m = matrix(vec![("SUBTLE", FeatureKind::Expression, all(&values))]);
        let config = ScreeningConfig {
            method: AssociationMethod::MedianSplitLogRank,
            p_threshold: 1.0,
            ..Default::default()
        };
        let summary =
            screen_dimension(&clinical(), &m, &config, &CancellationToken::new()).unwrap();

        let r = &summary.results[0];
        assert!(r.log2_fold_change.unwrap().abs() < 1.0);
        assert!(!r.significant);
        assert!(summary.positive.is_empty() && summary.negative.is_empty());
    }

    #[test]
    fn test_missing_values_are_dropped() {
        let mut values = all(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        values[3] = None;
        values[7] = None;
        let m = matrix(vec![("GAPPY", FeatureKind::Signature, values)]);
        let config = ScreeningConfig {
            method: AssociationMethod::MedianSplitLogRank,
            ..Default::default()
        };
        let summary =
            screen_dimension(&clinical(), &m, &config, &CancellationToken::new()).unwrap();
        assert_eq!(summary.results[0].n_samples, 10);
    }

    #[test]
    fn test_summary_caps_and_orders() {
        let mut results = Vec::new();
        for i in 0..8 {
            results.push(result(&format!("up{}", i), 2.0, 0.001 * (8 - i) as f64, true));
            results.push(result(&format!("down{}", i), 0.5, 0.002 * (i + 1) as f64, true));
        }
        results.push(result("null", 3.0, 0.0001, false));

        let summary = DimensionSummary::from_results(Dimension::Immune, results, Vec::new());

        assert_eq!(summary.positive.len(), SUMMARY_SIZE);
        assert_eq!(summary.negative.len(), SUMMARY_SIZE);
        assert!(summary.positive.iter().all(|r| r.hazard_ratio > 1.0 && r.significant));
        assert!(summary.negative.iter().all(|r| r.hazard_ratio < 1.0));
        for list in [&summary.positive, &summary.negative, &summary.results] {
            for pair in list.windows(2) {
                assert!(pair[0].p_value <= pair[1].p_value);
            }
        }
        assert_eq!(summary.positive[0].feature_id, "up7");
        assert_eq!(summary.results[0].feature_id, "null");
    }

    #[test]
    fn test_missing_matrix_gives_empty_summary() {
        let summary = run_screening(
            &clinical(),
            None,
            Dimension::ExtracellularMatrix,
            &ScreeningConfig::default(),
        )
        .unwrap();
        assert!(summary.positive.is_empty() && summary.negative.is_empty());
        assert_eq!(summary.dimension, Dimension::ExtracellularMatrix);
    }

    #[test]
    fn test_mismatched_dimension_tag_is_an_error() {
        let m = matrix(vec![("X", FeatureKind::Signature, all(&[1.0; 12]))]);
        assert!(run_screening(&clinical(), Some(&m), Dimension::Immune, &ScreeningConfig::default())
            .is_err());
    }

    #[test]
    fn test_cancelled_run_stops() {
        let m = matrix(vec![("A", FeatureKind::Signature, all(&[1.0; 12]))]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            screen_dimension(&clinical(), &m, &ScreeningConfig::default(), &cancel),
            Err(LinchpinError::Cancelled)
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        for config in [
            ScreeningConfig { p_threshold: 0.0, ..Default::default() },
            ScreeningConfig { fold_change_threshold: 0.5, ..Default::default() },
            ScreeningConfig { min_samples_per_group: 0, ..Default::default() },
            ScreeningConfig { l2_penalty: -1.0, ..Default::default() },
        ] {
            assert!(matches!(config.validate(), Err(LinchpinError::Config { .. })));
        }
    }
}
