//! Binary logistic regression with L2 regularization
//!
//! Minimizes `0.5 * ||w||^2 + C * sum(log_loss)` with an unpenalized
//! intercept, solved by damped Newton iterations.

use faer::prelude::*;
use faer::Mat;
use serde::Serialize;

use super::error::PipelineError;

/// Armijo sufficient-decrease constant for the line search
const ARMIJO: f64 = 1e-4;

/// Maximum number of step halvings per iteration
const MAX_HALVINGS: usize = 40;

/// Optimizer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolverConfig {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest absolute gradient entry drops to this value
    pub tol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 200,
            tol: 1e-4,
        }
    }
}

/// Fitted classifier parameters and solver diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub n_iter: usize,
    pub converged: bool,
}

impl LogisticModel {
    /// Linear score `w.x + b`.
    pub fn decision(&self, row: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(row)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }

    /// Probability of the positive class.
    pub fn probability(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision(row))
    }
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(z))` without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

struct Problem<'a> {
    x: &'a Mat<f64>,
    y: &'a [u8],
    c: f64,
}

impl Problem<'_> {
    fn dims(&self) -> usize {
        self.x.ncols()
    }

    fn scores(&self, theta: &[f64]) -> Vec<f64> {
        let d = self.dims();
        (0..self.x.nrows())
            .map(|i| (0..d).map(|j| self.x[(i, j)] * theta[j]).sum::<f64>() + theta[d])
            .collect()
    }

    fn objective(&self, theta: &[f64]) -> f64 {
        let d = self.dims();
        let penalty = 0.5 * theta[..d].iter().map(|w| w * w).sum::<f64>();
        let loss: f64 = self
            .scores(theta)
            .iter()
            .zip(self.y)
            .map(|(&z, &y)| softplus(z) - f64::from(y) * z)
            .sum();
        penalty + self.c * loss
    }

    /// Gradient (length d + 1) and Hessian ((d + 1) x (d + 1)).
    fn derivatives(&self, theta: &[f64]) -> (Vec<f64>, Mat<f64>) {
        let n = self.x.nrows();
        let d = self.dims();
        let scores = self.scores(theta);

        let mut grad = vec![0.0; d + 1];
        // Rows of the augmented design [x, 1], pre-scaled by the curvature
        let mut weighted = Mat::<f64>::zeros(n, d + 1);
        let augmented =
            Mat::<f64>::from_fn(n, d + 1, |i, j| if j < d { self.x[(i, j)] } else { 1.0 });

        for i in 0..n {
            let p = sigmoid(scores[i]);
            let residual = p - f64::from(self.y[i]);
            let curvature = self.c * p * (1.0 - p);
            for j in 0..=d {
                grad[j] += self.c * residual * augmented[(i, j)];
                weighted[(i, j)] = curvature * augmented[(i, j)];
            }
        }
        for j in 0..d {
            grad[j] += theta[j];
        }

        let mut hessian = augmented.transpose() * &weighted;
        for j in 0..d {
            hessian[(j, j)] += 1.0;
        }

        (grad, hessian)
    }
}

/// Fit on a dense design matrix and 0/1 targets.
///
/// Reaching `max_iter` is not an error; the returned model carries
/// `converged = false` so callers can warn.
pub fn fit_logistic(
    x: &Mat<f64>,
    y: &[u8],
    config: &SolverConfig,
) -> Result<LogisticModel, PipelineError> {
    if x.nrows() == 0 || x.nrows() != y.len() {
        return Err(PipelineError::NoRows);
    }

    let problem = Problem { x, y, c: config.c };
    let d = problem.dims();
    let mut theta = vec![0.0; d + 1];
    let mut current = problem.objective(&theta);
    let mut converged = false;
    let mut n_iter = 0;

    loop {
        let (grad, hessian) = problem.derivatives(&theta);
        let grad_norm = grad.iter().fold(0.0f64, |m, g| m.max(g.abs()));
        if grad_norm <= config.tol {
            converged = true;
            break;
        }
        if n_iter == config.max_iter {
            break;
        }
        n_iter += 1;

        let rhs = Mat::<f64>::from_fn(d + 1, 1, |i, _| grad[i]);
        let direction = hessian.partial_piv_lu().solve(&rhs);
        let step: Vec<f64> = (0..=d).map(|i| direction[(i, 0)]).collect();
        if step.iter().any(|s| !s.is_finite()) {
            return Err(PipelineError::Diverged(n_iter));
        }

        let slope: f64 = grad.iter().zip(&step).map(|(g, s)| g * s).sum();
        let mut t = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_HALVINGS {
            let candidate: Vec<f64> = theta.iter().zip(&step).map(|(th, s)| th - t * s).collect();
            let value = problem.objective(&candidate);
            if value <= current - ARMIJO * t * slope {
                theta = candidate;
                current = value;
                accepted = true;
                break;
            }
            t *= 0.5;
        }

        // Objective is flat to machine precision along the Newton direction
        if !accepted {
            break;
        }
    }

    Ok(LogisticModel {
        coefficients: theta[..d].to_vec(),
        intercept: theta[d],
        n_iter,
        converged,
    })
}
