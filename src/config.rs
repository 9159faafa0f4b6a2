//! run configuration, loaded from TOML.
//!
//! ```toml
//! top_k = 10
//!
//! [screening]
//! p_threshold = 0.05
//! method = "cox_regression"
//!
//! [weights]
//! prognostic = 0.4
//! hub = 0.3
//! cross_domain = 0.2
//! regulator = 0.1
//!
//! [regulators]
//! transcription_factors = ["TP53", "MYC"]
//!
//! [druggability.EGFR]
//! status = "druggable"
//! class = "kinase inhibitor"
//! drugs = ["Erlotinib"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{LinchpinError, Result},
    evidence::DEFAULT_TOP_K,
    lookup::{DruggabilityLookup, RegulatorLookup},
    screening::ScreeningConfig,
    weights::LinchpinWeights,
};

/// env var naming the config file for [`AnalysisConfig::load`]
pub const CONFIG_ENV: &str = "LINCHPIN_CONFIG";

/// everything a run needs apart from the data. immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub top_k: usize,
    pub screening: ScreeningConfig,
    pub weights: LinchpinWeights,
    pub regulators: RegulatorLookup,
    pub druggability: DruggabilityLookup,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            screening: ScreeningConfig::default(),
            weights: LinchpinWeights::default(),
            regulators: RegulatorLookup::default(),
            druggability: DruggabilityLookup::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.screening.validate()?;
        if self.top_k == 0 {
            return Err(LinchpinError::config("top_k", "0"));
        }
        Ok(())
    }

    /// parse and validate. bad weights fail here, not mid-run
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            regulators = config.regulators.len(),
            druggable_targets = config.druggability.len(),
            "loaded analysis config"
        );
        Ok(config)
    }

    /// `$LINCHPIN_CONFIG`, else `linchpin.toml` in the working directory
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "linchpin.toml".to_string());
        Self::from_path(path)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| LinchpinError::config("config", e.to_string()))
    }
}
