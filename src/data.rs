use std::collections::{BTreeMap, HashMap};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{LinchpinError, Result};

/// one patient/sample in the cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalRecord {
    pub entity_id: String,
    pub time: f64,   // time to event/censoring, >= 0
    pub event: bool, // true = event, false = censored
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub covariates: BTreeMap<String, f64>,
}

impl SurvivalRecord {
    pub fn new(entity_id: impl Into<String>, time: f64, event: bool) -> Self {
        Self {
            entity_id: entity_id.into(),
            time,
            event,
            covariates: BTreeMap::new(),
        }
    }

    pub fn with_covariate(mut self, name: impl Into<String>, value: f64) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }
}

/// clinical table - entity id -> (time, event). built once per cohort load
#[derive(Debug, Clone)]
pub struct ClinicalTable {
    records: Vec<SurvivalRecord>,
    index: HashMap<String, usize>, // entity id -> position in records
}

impl ClinicalTable {
    pub fn new(records: Vec<SurvivalRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());

        for (pos, record) in records.iter().enumerate() {
            if !record.time.is_finite() || record.time < 0.0 {
                return Err(LinchpinError::data(format!(
                    "entity {} has invalid survival time {}",
                    record.entity_id, record.time
                )));
            }

            if index.insert(record.entity_id.clone(), pos).is_some() {
                return Err(LinchpinError::data(format!(
                    "entity {} appears twice in the clinical table",
                    record.entity_id
                )));
            }
        }

        Ok(Self { records, index })
    }

    /// convenience for parallel id/time/event vectors
    pub fn from_columns(ids: Vec<String>, times: Vec<f64>, events: Vec<bool>) -> Result<Self> {
        if ids.len() != times.len() || ids.len() != events.len() {
            return Err(LinchpinError::invalid_dimensions(format!(
                "ids ({}), times ({}) and events ({}) must have the same length",
                ids.len(),
                times.len(),
                events.len()
            )));
        }

        let records = ids
            .into_iter()
            .zip(times)
            .zip(events)
            .map(|((id, time), event)| SurvivalRecord::new(id, time, event))
            .collect();

        Self::new(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SurvivalRecord] {
        &self.records
    }

    pub fn get(&self, entity_id: &str) -> Option<&SurvivalRecord> {
        self.index.get(entity_id).map(|&pos| &self.records[pos])
    }

    pub fn position(&self, entity_id: &str) -> Option<usize> {
        self.index.get(entity_id).copied()
    }

    pub fn n_events(&self) -> usize {
        self.records.iter().filter(|r| r.event).count()
    }
}

/// survival data for a regression fit - times, events, and covariates
#[derive(Debug, Clone)]
pub struct SurvivalData {
    times: Array1<f64>,      // time to event/censoring
    events: Vec<bool>,       // true = event, false = censored
    covariates: Array2<f64>, // n_samples x n_features
}

impl SurvivalData {
    pub fn new(times: Vec<f64>, events: Vec<bool>, covariates: Array2<f64>) -> Result<Self> {
        let n_samples = times.len();

        if events.len() != n_samples {
            return Err(LinchpinError::invalid_dimensions(format!(
                "times len ({}) != events len ({})",
                n_samples,
                events.len()
            )));
        }

        if covariates.nrows() != n_samples {
            return Err(LinchpinError::invalid_dimensions(format!(
                "covariates rows ({}) != n_samples ({})",
                covariates.nrows(),
                n_samples
            )));
        }

        if times.iter().any(|&t| t < 0.0 || !t.is_finite()) {
            return Err(LinchpinError::data("survival times must be non-negative & finite"));
        }

        if covariates.iter().any(|x| !x.is_finite()) {
            return Err(LinchpinError::data("covariates must be finite"));
        }

        Ok(Self {
            times: Array1::from(times),
            events,
            covariates,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.times.len()
    }

    pub fn n_features(&self) -> usize {
        self.covariates.ncols()
    }

    pub fn n_events(&self) -> usize {
        self.events.iter().filter(|&&e| e).count()
    }

    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.times.view()
    }

    pub fn events(&self) -> &[bool] {
        &self.events
    }

    pub fn covariates(&self) -> ArrayView2<'_, f64> {
        self.covariates.view()
    }

    /// sample indices sorted by time descending, events before censorings on ties
    pub fn descending_time_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.n_samples()).collect();
        order.sort_by(|&a, &b| {
            self.times[b]
                .total_cmp(&self.times[a])
                .then_with(|| self.events[b].cmp(&self.events[a]))
        });
        order
    }

    /// center every covariate on its mean - coefficients are unchanged, exp() stays tame
    pub fn center_covariates(&mut self) -> Result<Array1<f64>> {
        let means = self
            .covariates
            .mean_axis(Axis(0))
            .ok_or_else(|| LinchpinError::degenerate("no samples to center"))?;
        let stds = self.covariates.std_axis(Axis(0), 0.0);

        for j in 0..self.n_features() {
            if stds[j] == 0.0 {
                return Err(LinchpinError::degenerate(format!(
                    "covariate {} has zero variance",
                    j
                )));
            }
        }

        self.covariates -= &means;
        Ok(means)
    }
}
