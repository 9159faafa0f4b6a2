//! feature matrices - one per biological dimension, features x entities.
//!
//! missing values are stored as NaN and surface as `None` through
//! [`FeatureObservation::value`].

use std::collections::HashSet;
use std::fmt;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::data::ClinicalTable;
use crate::error::{LinchpinError, Result};

/// the five biological categories screened independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TumorIntrinsic,
    Immune,
    Stromal,
    ExtracellularMatrix,
    CytokineSignaling,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::TumorIntrinsic,
        Dimension::Immune,
        Dimension::Stromal,
        Dimension::ExtracellularMatrix,
        Dimension::CytokineSignaling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::TumorIntrinsic => "tumor_intrinsic",
            Dimension::Immune => "immune",
            Dimension::Stromal => "stromal",
            Dimension::ExtracellularMatrix => "extracellular_matrix",
            Dimension::CytokineSignaling => "cytokine_signaling",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// what a feature row measures - only expression rows carry the fold-change rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    #[default]
    Expression,
    Mutation,
    Signature,
}

/// one feature row viewed against the matrix's entities
#[derive(Debug, Clone, Copy)]
pub struct FeatureObservation<'a> {
    pub feature_id: &'a str,
    pub dimension: Dimension,
    pub kind: FeatureKind,
    pub values: ArrayView1<'a, f64>,
}

impl FeatureObservation<'_> {
    pub fn value(&self, entity: usize) -> Option<f64> {
        self.values.get(entity).copied().filter(|v| !v.is_nan())
    }

    pub fn n_present(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    dimension: Dimension,
    feature_ids: Vec<String>,
    kinds: Vec<FeatureKind>,
    entity_ids: Vec<String>,
    values: Array2<f64>, // n_features x n_entities, NaN = missing
}

impl FeatureMatrix {
    /// every row defaults to [`FeatureKind::Expression`]
    pub fn new(
        dimension: Dimension,
        feature_ids: Vec<String>,
        entity_ids: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if values.nrows() != feature_ids.len() || values.ncols() != entity_ids.len() {
            return Err(LinchpinError::invalid_dimensions(format!(
                "{} matrix is {}x{} but has {} feature ids and {} entity ids",
                dimension,
                values.nrows(),
                values.ncols(),
                feature_ids.len(),
                entity_ids.len()
            )));
        }

        ensure_unique(&feature_ids, "feature", dimension)?;
        ensure_unique(&entity_ids, "entity", dimension)?;

        if values.iter().any(|v| v.is_infinite()) {
            return Err(LinchpinError::data(format!(
                "{} matrix contains infinite values",
                dimension
            )));
        }

        let kinds = vec![FeatureKind::default(); feature_ids.len()];
        Ok(Self {
            dimension,
            feature_ids,
            kinds,
            entity_ids,
            values,
        })
    }

    /// build from rows of optional values - handy when the source has explicit gaps
    pub fn from_rows(
        dimension: Dimension,
        entity_ids: Vec<String>,
        rows: Vec<(String, FeatureKind, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let n_entities = entity_ids.len();
        let mut feature_ids = Vec::with_capacity(rows.len());
        let mut kinds = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * n_entities);

        for (feature_id, kind, row) in rows {
            if row.len() != n_entities {
                return Err(LinchpinError::invalid_dimensions(format!(
                    "feature {} has {} values for {} entities",
                    feature_id,
                    row.len(),
                    n_entities
                )));
            }
            flat.extend(row.into_iter().map(|v| v.unwrap_or(f64::NAN)));
            feature_ids.push(feature_id);
            kinds.push(kind);
        }

        let values = Array2::from_shape_vec((feature_ids.len(), n_entities), flat)
            .map_err(|e| LinchpinError::invalid_dimensions(e.to_string()))?;

        let mut matrix = Self::new(dimension, feature_ids, entity_ids, values)?;
        matrix.kinds = kinds;
        Ok(matrix)
    }

    /// an empty matrix for a dimension with no data
    pub fn empty(dimension: Dimension) -> Self {
        Self {
            dimension,
            feature_ids: Vec::new(),
            kinds: Vec::new(),
            entity_ids: Vec::new(),
            values: Array2::zeros((0, 0)),
        }
    }

    pub fn with_kind(mut self, kind: FeatureKind) -> Self {
        self.kinds = vec![kind; self.feature_ids.len()];
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<FeatureKind>) -> Result<Self> {
        if kinds.len() != self.feature_ids.len() {
            return Err(LinchpinError::invalid_dimensions(format!(
                "{} kinds for {} features",
                kinds.len(),
                self.feature_ids.len()
            )));
        }
        self.kinds = kinds;
        Ok(self)
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    pub fn n_entities(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty() || self.entity_ids.is_empty()
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn entity_ids(&self) -> &[String] {
        &self.entity_ids
    }

    pub fn feature(&self, index: usize) -> Option<FeatureObservation<'_>> {
        let feature_id = self.feature_ids.get(index)?;
        Some(FeatureObservation {
            feature_id,
            dimension: self.dimension,
            kind: self.kinds[index],
            values: self.values.row(index),
        })
    }

    pub fn features(&self) -> impl Iterator<Item = FeatureObservation<'_>> + '_ {
        (0..self.n_features()).filter_map(move |i| self.feature(i))
    }

    /// matrix column -> clinical row, `None` for entities the clinical table doesn't know
    pub fn align(&self, clinical: &ClinicalTable) -> Vec<Option<usize>> {
        self.entity_ids
            .iter()
            .map(|id| clinical.position(id))
            .collect()
    }
}

fn ensure_unique(ids: &[String], what: &str, dimension: Dimension) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(LinchpinError::data(format!(
                "duplicate {} id {} in {} matrix",
                what, id, dimension
            )));
        }
    }
    Ok(())
}
