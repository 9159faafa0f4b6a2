use ndarray::{Array1, Array2, Axis};

use crate::{
    data::SurvivalData,
    error::{LinchpinError, Result},
};

/// knobs for the partial-likelihood solver
#[derive(Debug, Clone)]
pub struct OptimizationConfig {
    pub l2_penalty: f64,            // ridge, 0 = plain cox
    pub max_iterations: usize,
    pub tolerance: f64,             // on the change in penalized log-likelihood
    pub step_tolerance: f64,        // largest newton step at convergence, per sd of x
    pub max_step_halvings: usize,   // line search before giving up on a step
    pub max_abs_coefficient: f64,   // |beta| * sd(x) beyond this is separation, not a fit
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            l2_penalty: 0.0,
            max_iterations: 50,
            tolerance: 1e-9,
            step_tolerance: 1e-6,
            max_step_halvings: 10,
            max_abs_coefficient: 30.0,
        }
    }
}

/// converged solver state
#[derive(Debug, Clone)]
pub struct CoxFit {
    pub beta: Array1<f64>,
    pub information: Array2<f64>, // observed (penalized) information at beta
    pub log_likelihood: f64,      // unpenalized partial log-likelihood
    pub iterations: usize,
}

/// log partial likelihood and its first two derivatives at one beta
struct Derivatives {
    loglik: f64,
    gradient: Array1<f64>,
    hessian: Array2<f64>,
}

/// newton-raphson on the cox partial likelihood, breslow ties, optional ridge
pub struct CoxOptimizer {
    config: OptimizationConfig,
}

impl CoxOptimizer {
    pub fn new(config: OptimizationConfig) -> Self {
        Self { config }
    }

    pub fn optimize(&self, data: &SurvivalData) -> Result<CoxFit> {
        if data.n_events() == 0 {
            return Err(LinchpinError::degenerate("no events - partial likelihood is flat"));
        }

        let order = data.descending_time_order();
        // guards run on the standardized scale so a rescaled covariate behaves the same
        let scales = data.covariates().std_axis(Axis(0), 0.0);
        let mut beta: Array1<f64> = Array1::zeros(data.n_features());
        let mut current = self.compute_likelihood_derivatives(data, &order, &beta)?;

        for iteration in 0..self.config.max_iterations {
            let penalized_loglik = self.penalized(current.loglik, &beta);
            let gradient = &current.gradient - &(self.config.l2_penalty * &beta);
            let information = self.information(&current.hessian);

            let step = solve_linear_system(&information, &gradient).map_err(|_| {
                LinchpinError::convergence("information matrix is singular")
            })?;

            // step halving until the penalized likelihood stops going down
            let mut scale: f64 = 1.0;
            let mut accepted = None;
            for _ in 0..=self.config.max_step_halvings {
                let candidate = &beta + &(scale * &step);
                if let Ok(next) = self.compute_likelihood_derivatives(data, &order, &candidate) {
                    if self.penalized(next.loglik, &candidate) >= penalized_loglik - 1e-12 {
                        accepted = Some((candidate, next));
                        break;
                    }
                }
                scale *= 0.5;
            }

            let Some((candidate, next)) = accepted else {
                return Err(LinchpinError::convergence(format!(
                    "line search failed at iteration {}",
                    iteration
                )));
            };

            let diverging = candidate
                .iter()
                .zip(scales.iter())
                .any(|(b, sd)| {
                    !b.is_finite() || b.abs() * sd > self.config.max_abs_coefficient
                });
            if diverging {
                return Err(LinchpinError::convergence(
                    "coefficient diverging - looks like complete separation",
                ));
            }

            let change = (self.penalized(next.loglik, &candidate) - penalized_loglik).abs();
            let step_size = step
                .iter()
                .zip(scales.iter())
                .fold(0.0_f64, |acc, (s, sd)| acc.max((scale * s * sd).abs()));
            beta = candidate;
            current = next;

            if change < self.config.tolerance && step_size < self.config.step_tolerance {
                let information = self.information(&current.hessian);
                return Ok(CoxFit {
                    beta,
                    information,
                    log_likelihood: current.loglik,
                    iterations: iteration + 1,
                });
            }
        }

        Err(LinchpinError::convergence(format!(
            "newton-raphson failed to converge in {} iterations",
            self.config.max_iterations
        )))
    }

    fn penalized(&self, loglik: f64, beta: &Array1<f64>) -> f64 {
        loglik - 0.5 * self.config.l2_penalty * beta.dot(beta)
    }

    /// -hessian + ridge on the diagonal
    fn information(&self, hessian: &Array2<f64>) -> Array2<f64> {
        let mut information = -hessian;
        for i in 0..information.nrows() {
            information[[i, i]] += self.config.l2_penalty;
        }
        information
    }

    /// one backwards sweep: risk sets grow as time decreases, so running sums
    /// of exp(x.b), x*exp(x.b) and x x' exp(x.b) give every risk set for free
    fn compute_likelihood_derivatives(
        &self,
        data: &SurvivalData,
        order: &[usize],
        beta: &Array1<f64>,
    ) -> Result<Derivatives> {
        let n_features = data.n_features();
        let covariates = data.covariates();
        let times = data.times();
        let events = data.events();

        let mut loglik = 0.0;
        let mut gradient = Array1::zeros(n_features);
        let mut hessian = Array2::zeros((n_features, n_features));

        let mut risk_sum = 0.0;
        let mut weighted_sum: Array1<f64> = Array1::zeros(n_features);
        let mut weighted_outer: Array2<f64> = Array2::zeros((n_features, n_features));

        let mut start = 0;
        while start < order.len() {
            let t = times[order[start]];
            let mut end = start;
            while end < order.len() && times[order[end]] == t {
                end += 1;
            }

            // everyone tied at t joins the risk set before their events count
            for &i in &order[start..end] {
                let row = covariates.row(i);
                let exp_pred = row.dot(beta).exp();
                if !exp_pred.is_finite() {
                    return Err(LinchpinError::numerical_error(format!(
                        "exp(linear predictor) overflowed: {}",
                        exp_pred
                    )));
                }

                risk_sum += exp_pred;
                weighted_sum.scaled_add(exp_pred, &row);
                for j in 0..n_features {
                    for k in 0..n_features {
                        weighted_outer[[j, k]] += exp_pred * row[j] * row[k];
                    }
                }
            }

            let n_events_here = order[start..end].iter().filter(|&&i| events[i]).count();
            if n_events_here > 0 {
                if risk_sum <= 0.0 {
                    return Err(LinchpinError::numerical_error("risk set sum is non-positive"));
                }

                let log_sum = risk_sum.ln();
                let weighted_mean = &weighted_sum / risk_sum;
                let mut weighted_variance = &weighted_outer / risk_sum;
                for j in 0..n_features {
                    for k in 0..n_features {
                        weighted_variance[[j, k]] -= weighted_mean[j] * weighted_mean[k];
                    }
                }

                for &i in order[start..end].iter().filter(|&&i| events[i]) {
                    let row = covariates.row(i);
                    loglik += row.dot(beta) - log_sum;
                    gradient += &(&row - &weighted_mean);
                }
                hessian.scaled_add(-(n_events_here as f64), &weighted_variance);
            }

            start = end;
        }

        Ok(Derivatives {
            loglik,
            gradient,
            hessian,
        })
    }
}

/// solve Ax = b by gaussian elimination w/ partial pivoting
pub fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return Err(LinchpinError::invalid_dimensions("matrix dimensions mismatch"));
    }

    let mut a_copy = a.clone();
    let mut b_copy = b.clone();

    // forward elimination
    for i in 0..n {
        let mut max_row = i;
        for k in i + 1..n {
            if a_copy[[k, i]].abs() > a_copy[[max_row, i]].abs() {
                max_row = k;
            }
        }

        if a_copy[[max_row, i]].abs() < 1e-12 {
            return Err(LinchpinError::numerical_error("matrix is singular"));
        }

        if max_row != i {
            for j in 0..n {
                a_copy.swap([i, j], [max_row, j]);
            }
            b_copy.swap(i, max_row);
        }

        for k in i + 1..n {
            let factor = a_copy[[k, i]] / a_copy[[i, i]];
            for j in i..n {
                a_copy[[k, j]] -= factor * a_copy[[i, j]];
            }
            b_copy[k] -= factor * b_copy[i];
        }
    }

    // back substitution
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = b_copy[i];
        for j in i + 1..n {
            x[i] -= a_copy[[i, j]] * x[j];
        }
        x[i] /= a_copy[[i, i]];
    }

    Ok(x)
}

/// invert a small symmetric positive-definite matrix column by column
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let mut inverse = Array2::zeros((n, n));
    for j in 0..n {
        let mut unit = Array1::zeros(n);
        unit[j] = 1.0;
        let column = solve_linear_system(a, &unit)?;
        inverse.column_mut(j).assign(&column);
    }
    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn create_test_data() -> SurvivalData {
        let times = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let events = vec![true, true, false, true, true, false];
        let covariates =
            Array2::from_shape_vec((6, 1), vec![2.0, 0.0, 1.0, 1.0, -1.0, 0.0]).unwrap();

        SurvivalData::new(times, events, covariates).unwrap()
    }

    #[test]
    fn test_solve_linear_system() {
        let a = Array2::from_shape_vec((2, 2), vec![2.0, 1.0, 1.0, 3.0]).unwrap();
        let b = Array1::from(vec![3.0, 5.0]);
        let x = solve_linear_system(&a, &b).unwrap();

        assert_relative_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_system_is_an_error() {
        let a = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 2.0, 4.0]).unwrap();
        assert!(solve_linear_system(&a, &Array1::from(vec![1.0, 1.0])).is_err());
    }

    #[test]
    fn test_invert() {
        let a = Array2::from_shape_vec((2, 2), vec![4.0, 1.0, 1.0, 2.0]).unwrap();
        let inv = invert(&a).unwrap();
        let identity = a.dot(&inv);

        assert_relative_eq!(identity[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(identity[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(identity[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_vanishes_at_the_optimum() {
        let data = create_test_data();
        let optimizer = CoxOptimizer::new(OptimizationConfig::default());
        let fit = optimizer.optimize(&data).unwrap();

        let order = data.descending_time_order();
        let at_optimum = optimizer
            .compute_likelihood_derivatives(&data, &order, &fit.beta)
            .unwrap();

        assert!(at_optimum.gradient[0].abs() < 1e-5);
        assert!(fit.information[[0, 0]] > 0.0);
        assert!(fit.log_likelihood.is_finite());
    }

    #[test]
    fn test_ridge_shrinks_the_coefficient() {
        let data = create_test_data();
        let plain = CoxOptimizer::new(OptimizationConfig::default())
            .optimize(&data)
            .unwrap();
        let ridge = CoxOptimizer::new(OptimizationConfig {
            l2_penalty: 5.0,
            ..Default::default()
        })
        .optimize(&data)
        .unwrap();

        assert!(ridge.beta[0].abs() < plain.beta[0].abs());
    }

    #[test]
    fn test_no_events_is_degenerate() {
        let covariates = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let data = SurvivalData::new(vec![1.0, 2.0, 3.0], vec![false; 3], covariates).unwrap();

        let result = CoxOptimizer::new(OptimizationConfig::default()).optimize(&data);
        assert!(matches!(result, Err(LinchpinError::DegenerateInput { .. })));
    }

    #[test]
    fn test_rescaled_covariate_fits_the_same() {
        let data = create_test_data();
        let scaled = SurvivalData::new(
            data.times().to_vec(),
            data.events().to_vec(),
            data.covariates().mapv(|x| x * 0.001),
        )
        .unwrap();

        let optimizer = CoxOptimizer::new(OptimizationConfig::default());
        let fit = optimizer.optimize(&data).unwrap();
        let fit_scaled = optimizer.optimize(&scaled).unwrap();

        // beta soaks up the unit change
        assert!(fit_scaled.beta[0].abs() > 30.0);
        assert_relative_eq!(fit_scaled.beta[0] * 0.001, fit.beta[0], epsilon = 1e-6);
        assert_relative_eq!(fit_scaled.log_likelihood, fit.log_likelihood, epsilon = 1e-8);
    }

    #[test]
    fn test_complete_separation_does_not_converge() {
        // higher covariate always dies first - the MLE is at infinity
        let covariates =
            Array2::from_shape_vec((6, 1), vec![6.0, 5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        let data = SurvivalData::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![true; 6],
            covariates,
        )
        .unwrap();

        let result = CoxOptimizer::new(OptimizationConfig::default()).optimize(&data);
        assert!(matches!(result, Err(LinchpinError::Convergence { .. })));
    }
}
