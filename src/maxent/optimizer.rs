use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use super::params::MaxEntropyParams;
use crate::error::{ModelError, Result};

// Curvature products at or below this are treated as zero.
const CURVATURE_FLOOR: f64 = 1e-12;
const LINE_SEARCH_MAX_ITERATIONS: usize = 200;

/// A smooth function of a weight vector that can report its own gradient.
pub trait Objective {
    fn value(&self, weights: &DVector<f64>) -> f64;
    fn gradient(&self, weights: &DVector<f64>) -> DVector<f64>;
}

/// Result of a [`Bfgs::minimize`] run.
#[derive(Clone, Debug)]
pub struct OptimizationOutcome {
    pub weights: DVector<f64>,
    pub steps: usize,
    pub gradient_norm: f64,
    pub converged: bool,
    pub skipped_updates: usize,
}

/// Minimizes a unimodal `f` on `[lower, upper]` and returns the midpoint of the final bracket.
pub fn golden_section_search<F>(f: F, lower: f64, upper: f64, tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let (mut lo, mut hi) = (lower, upper);
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let (mut f1, mut f2) = (f(x1), f(x2));

    let mut iterations = 0;
    while hi - lo > tolerance && iterations < LINE_SEARCH_MAX_ITERATIONS {
        iterations += 1;
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = f(x2);
        }
    }

    (lo + hi) / 2.0
}

/// BFGS quasi-Newton minimizer keeping a dense approximation of the Hessian.
#[derive(Clone, Debug)]
pub struct Bfgs {
    params: MaxEntropyParams,
}

impl Bfgs {
    pub fn new(params: MaxEntropyParams) -> Self {
        Self { params }
    }

    /// Minimizes `objective` over `dimension` weights starting from a random point in `[0, 1)`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SingularMatrix`] if the search direction can't be solved.
    pub fn minimize<O: Objective>(
        &self,
        objective: &O,
        dimension: usize,
    ) -> Result<OptimizationOutcome> {
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let weights = DVector::from_fn(dimension, |_, _| rng.gen::<f64>());
        self.minimize_from(objective, weights)
    }

    pub fn minimize_from<O: Objective>(
        &self,
        objective: &O,
        mut weights: DVector<f64>,
    ) -> Result<OptimizationOutcome> {
        let epsilon = self.params.epsilon;
        let mut hessian = DMatrix::<f64>::identity(weights.len(), weights.len());
        let mut gradient = objective.gradient(&weights);
        let mut skipped_updates = 0;
        let mut steps = 0;

        while steps < self.params.max_steps && gradient.norm() >= epsilon {
            let direction = Self::direction(&hessian, &gradient)?;
            let step = golden_section_search(
                |lambda| objective.value(&(&weights + &direction * lambda)),
                0.0,
                self.params.line_search_upper,
                epsilon,
            );

            let delta_w = direction * step;
            weights += &delta_w;
            let next_gradient = objective.gradient(&weights);
            let delta_g = &next_gradient - &gradient;
            gradient = next_gradient;
            steps += 1;

            debug!(
                step = steps,
                line_search = step,
                gradient_norm = gradient.norm(),
                "BFGS step"
            );

            if gradient.norm() < epsilon {
                break;
            }

            let hessian_dw = &hessian * &delta_w;
            let secant = delta_g.dot(&delta_w);
            let curvature = hessian_dw.dot(&delta_w);
            if !Self::usable(secant) || !Self::usable(curvature) {
                skipped_updates += 1;
                warn!(step = steps, secant, curvature, "Degenerate curvature, skipping BFGS update");
                continue;
            }

            hessian += &delta_g * delta_g.transpose() / secant
                - &hessian_dw * hessian_dw.transpose() / curvature;
        }

        let gradient_norm = gradient.norm();
        Ok(OptimizationOutcome {
            weights,
            steps,
            gradient_norm,
            converged: gradient_norm < epsilon,
            skipped_updates,
        })
    }

    fn usable(product: f64) -> bool {
        product.is_finite() && product > CURVATURE_FLOOR
    }

    /// Solves `B p = -g`, trying Cholesky before LU.
    fn direction(hessian: &DMatrix<f64>, gradient: &DVector<f64>) -> Result<DVector<f64>> {
        let rhs = -gradient;
        let solved = match hessian.clone().cholesky() {
            Some(cholesky) => Some(cholesky.solve(&rhs)),
            None => hessian.clone().lu().solve(&rhs),
        };

        solved
            .filter(|direction| direction.iter().all(|value| value.is_finite()))
            .ok_or(ModelError::SingularMatrix)
    }
}
