use ndarray::{Array1, ArrayView1};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::{
    data::SurvivalData,
    error::{LinchpinError, Result},
    optimization::{invert, CoxOptimizer, OptimizationConfig},
};

/// two-sided 95% normal quantile
pub const Z_95: f64 = 1.959_963_984_540_054;

/// cox proportional hazards model w/ wald inference
#[derive(Debug, Clone)]
pub struct CoxModel {
    coefficients: Option<Array1<f64>>,    // fitted betas
    standard_errors: Option<Array1<f64>>, // sqrt(diag(inverse information))
    log_likelihood: Option<f64>,
    iterations: usize,
    l2_penalty: f64,
    max_iterations: usize,
    tolerance: f64,
    feature_names: Option<Vec<String>>, // defaults to x0, x1, ...
}

impl Default for CoxModel {
    fn default() -> Self {
        let defaults = OptimizationConfig::default();
        Self {
            coefficients: None,
            standard_errors: None,
            log_likelihood: None,
            iterations: 0,
            l2_penalty: defaults.l2_penalty,
            max_iterations: defaults.max_iterations,
            tolerance: defaults.tolerance,
            feature_names: None,
        }
    }
}

impl CoxModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// ridge penalty (L2) - keeps near-separated features from running off
    pub fn with_l2_penalty(mut self, penalty: f64) -> Self {
        self.l2_penalty = penalty.max(0.0);
        self
    }

    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// fit to data. covariates are centered internally, which leaves the
    /// coefficients alone; a constant covariate is a degenerate-input error
    pub fn fit(&mut self, data: &SurvivalData) -> Result<&mut Self> {
        let mut centered = data.clone();
        centered.center_covariates()?;

        let config = OptimizationConfig {
            l2_penalty: self.l2_penalty,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            ..Default::default()
        };

        let fit = CoxOptimizer::new(config).optimize(&centered)?;
        let covariance = invert(&fit.information)
            .map_err(|_| LinchpinError::convergence("information matrix is not invertible"))?;

        let standard_errors: Array1<f64> = covariance.diag().mapv(f64::sqrt);
        if standard_errors.iter().any(|se| !se.is_finite() || *se <= 0.0) {
            return Err(LinchpinError::convergence(
                "non-positive variance at the fitted coefficients",
            ));
        }

        self.coefficients = Some(fit.beta);
        self.standard_errors = Some(standard_errors);
        self.log_likelihood = Some(fit.log_likelihood);
        self.iterations = fit.iterations;

        Ok(self)
    }

    pub fn coefficients(&self) -> Result<ArrayView1<'_, f64>> {
        match &self.coefficients {
            Some(coefs) => Ok(coefs.view()),
            None => Err(LinchpinError::ModelNotFitted),
        }
    }

    pub fn standard_errors(&self) -> Result<ArrayView1<'_, f64>> {
        match &self.standard_errors {
            Some(se) => Ok(se.view()),
            None => Err(LinchpinError::ModelNotFitted),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// newton iterations the last fit took
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn summary(&self) -> Result<CoxModelSummary> {
        let coefficients = self.coefficients()?;
        let standard_errors = self.standard_errors()?;
        let log_likelihood = self.log_likelihood.ok_or(LinchpinError::ModelNotFitted)?;

        let terms = coefficients
            .iter()
            .zip(standard_errors.iter())
            .enumerate()
            .map(|(j, (&beta, &se))| {
                let name = self
                    .feature_names
                    .as_ref()
                    .and_then(|names| names.get(j).cloned())
                    .unwrap_or_else(|| format!("x{}", j));
                CoefficientSummary::wald(name, beta, se)
            })
            .collect();

        Ok(CoxModelSummary {
            terms,
            log_likelihood,
            l2_penalty: self.l2_penalty,
        })
    }
}

/// wald inference for one coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientSummary {
    pub name: String,
    pub coefficient: f64, // log hazard ratio
    pub hazard_ratio: f64,
    pub standard_error: f64,
    pub z: f64,
    pub p_value: f64,
    pub ci_lower: f64, // 95% CI on the hazard ratio scale
    pub ci_upper: f64,
}

impl CoefficientSummary {
    pub fn wald(name: String, coefficient: f64, standard_error: f64) -> Self {
        let z = coefficient / standard_error;
        Self {
            name,
            coefficient,
            hazard_ratio: coefficient.exp(),
            standard_error,
            z,
            p_value: two_sided_p(z),
            ci_lower: (coefficient - Z_95 * standard_error).exp(),
            ci_upper: (coefficient + Z_95 * standard_error).exp(),
        }
    }
}

/// two-sided standard normal tail, clamped into [0, 1]
pub fn two_sided_p(z: f64) -> f64 {
    if !z.is_finite() {
        return if z.is_nan() { 1.0 } else { 0.0 };
    }
    let p = 2.0 * Normal::standard().sf(z.abs());
    p.clamp(0.0, 1.0)
}

/// what the model learned
#[derive(Debug, Clone, Serialize)]
pub struct CoxModelSummary {
    pub terms: Vec<CoefficientSummary>,
    pub log_likelihood: f64,
    pub l2_penalty: f64,
}

impl CoxModelSummary {
    pub fn print(&self) {
        println!("cox proportional hazards model summary");
        println!("======================================");
        println!("l2 penalty (ridge): {:.6}", self.l2_penalty);
        println!("log partial likelihood: {:.6}", self.log_likelihood);
        println!();

        println!(
            "{:<20} {:>10} {:>10} {:>10} {:>12} {:>21}",
            "feature", "coef", "HR", "se", "p", "95% CI"
        );
        println!("{:-<88}", "");

        for term in &self.terms {
            println!(
                "{:<20} {:>10.4} {:>10.4} {:>10.4} {:>12.3e} [{:>8.4}, {:>8.4}]",
                term.name,
                term.coefficient,
                term.hazard_ratio,
                term.standard_error,
                term.p_value,
                term.ci_lower,
                term.ci_upper
            );
        }
    }
}
