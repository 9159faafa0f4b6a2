//! composite weights. always a convex combination - checked at construction,
//! then rescaled so the accepted weights sum to exactly 1.

use serde::{Deserialize, Serialize};

use crate::error::{LinchpinError, Result};

const SUM_TOLERANCE: f64 = 1e-6;
const ROUNDING_SLACK: f64 = 4.0 * f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights", into = "RawWeights")]
pub struct LinchpinWeights {
    prognostic: f64,
    hub: f64,
    cross_domain: f64,
    regulator: f64,
}

impl Default for LinchpinWeights {
    fn default() -> Self {
        Self::normalised(0.4, 0.3, 0.2, 0.1)
    }
}

impl LinchpinWeights {
    /// finite, non-negative, summing to 1 (within 1e-6) or a config error
    pub fn new(prognostic: f64, hub: f64, cross_domain: f64, regulator: f64) -> Result<Self> {
        let named = [
            ("prognostic", prognostic),
            ("hub", hub),
            ("cross_domain", cross_domain),
            ("regulator", regulator),
        ];
        for (name, w) in named {
            if !w.is_finite() || w < 0.0 {
                return Err(LinchpinError::config(format!("weights.{}", name), w.to_string()));
            }
        }

        let sum = prognostic + hub + cross_domain + regulator;
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(LinchpinError::config("weights (sum)", sum.to_string()));
        }

        Ok(Self::normalised(prognostic, hub, cross_domain, regulator))
    }

    /// divide through by the sum unless it's already 1 to within rounding,
    /// so a serialised set reloads unchanged
    fn normalised(prognostic: f64, hub: f64, cross_domain: f64, regulator: f64) -> Self {
        let sum = prognostic + hub + cross_domain + regulator;
        if (sum - 1.0).abs() <= ROUNDING_SLACK {
            return Self {
                prognostic,
                hub,
                cross_domain,
                regulator,
            };
        }
        Self {
            prognostic: prognostic / sum,
            hub: hub / sum,
            cross_domain: cross_domain / sum,
            regulator: regulator / sum,
        }
    }

    pub fn prognostic(&self) -> f64 {
        self.prognostic
    }

    pub fn hub(&self) -> f64 {
        self.hub
    }

    pub fn cross_domain(&self) -> f64 {
        self.cross_domain
    }

    pub fn regulator(&self) -> f64 {
        self.regulator
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawWeights {
    prognostic: f64,
    hub: f64,
    cross_domain: f64,
    regulator: f64,
}

impl TryFrom<RawWeights> for LinchpinWeights {
    type Error = LinchpinError;

    fn try_from(raw: RawWeights) -> Result<Self> {
        LinchpinWeights::new(raw.prognostic, raw.hub, raw.cross_domain, raw.regulator)
    }
}

impl From<LinchpinWeights> for RawWeights {
    fn from(w: LinchpinWeights) -> Self {
        Self {
            prognostic: w.prognostic,
            hub: w.hub,
            cross_domain: w.cross_domain,
            regulator: w.regulator,
        }
    }
}
