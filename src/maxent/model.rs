use nalgebra::{DMatrix, DVector};
use tracing::info;

use super::optimizer::{Bfgs, Objective, OptimizationOutcome};
use super::params::MaxEntropyParams;
use crate::error::{ModelError, Result};

/// Conditional maximum-entropy classifier `p_w(y|x) ∝ exp(Σ_i w_i f_i(x, y))`.
///
/// Trained on an empirical joint table `p_data` with one row per context `x` and one
/// column per outcome `y`, plus feature tables of the same shape.
#[derive(Clone, Debug, Default)]
pub struct MaxEntropy {
    params: MaxEntropyParams,
    fitted: Option<Fitted>,
}

#[derive(Clone, Debug)]
struct Fitted {
    outcome: OptimizationOutcome,
    probabilities: DMatrix<f64>,
}

/// Dual objective of the max-entropy problem, written with log-sum-exp.
struct LogLinearObjective<'a> {
    p_data: &'a DMatrix<f64>,
    features: &'a [DMatrix<f64>],
    p_x: DVector<f64>,
    expectations: DVector<f64>,
}

impl<'a> LogLinearObjective<'a> {
    fn new(p_data: &'a DMatrix<f64>, features: &'a [DMatrix<f64>]) -> Self {
        let p_x = DVector::from_iterator(p_data.nrows(), p_data.row_iter().map(|row| row.sum()));
        let expectations = DVector::from_iterator(
            features.len(),
            features.iter().map(|feature| p_data.component_mul(feature).sum()),
        );
        Self {
            p_data,
            features,
            p_x,
            expectations,
        }
    }

    fn scores(&self, weights: &DVector<f64>) -> DMatrix<f64> {
        self.features.iter().zip(weights.iter()).fold(
            DMatrix::zeros(self.p_data.nrows(), self.p_data.ncols()),
            |acc, (feature, &weight)| acc + feature * weight,
        )
    }

    /// Row-wise softmax of the scores.
    fn conditional(&self, weights: &DVector<f64>) -> DMatrix<f64> {
        let mut probabilities = self.scores(weights);
        for mut row in probabilities.row_iter_mut() {
            let max = row.max();
            row.apply(|score| *score = (*score - max).exp());
            let total = row.sum();
            row /= total;
        }
        probabilities
    }
}

impl Objective for LogLinearObjective<'_> {
    fn value(&self, weights: &DVector<f64>) -> f64 {
        let scores = self.scores(weights);
        let normalizer: f64 = scores
            .row_iter()
            .zip(self.p_x.iter())
            .map(|(row, &p_x)| {
                let max = row.max();
                p_x * (max + row.map(|score| (score - max).exp()).sum().ln())
            })
            .sum();
        normalizer - self.p_data.component_mul(&scores).sum()
    }

    fn gradient(&self, weights: &DVector<f64>) -> DVector<f64> {
        let mut model_joint = self.conditional(weights);
        for (mut row, &p_x) in model_joint.row_iter_mut().zip(self.p_x.iter()) {
            row *= p_x;
        }
        DVector::from_iterator(
            self.features.len(),
            self.features
                .iter()
                .zip(self.expectations.iter())
                .map(|(feature, &expected)| model_joint.component_mul(feature).sum() - expected),
        )
    }
}

impl MaxEntropy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: MaxEntropyParams) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    pub fn params(&self) -> &MaxEntropyParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut MaxEntropyParams {
        &mut self.params
    }

    /// Fits one weight per feature table so the model's feature expectations match the data's.
    ///
    /// # Errors
    ///
    /// Fails on an empty table, no features, feature tables of the wrong shape, non-finite or
    /// negative probabilities, or a singular search direction. A failed fit keeps the
    /// previous weights.
    pub fn fit(&mut self, p_data: &DMatrix<f64>, features: &[DMatrix<f64>]) -> Result<String> {
        Self::validate(p_data, features)?;
        info!(
            contexts = p_data.nrows(),
            outcomes = p_data.ncols(),
            features = features.len(),
            "Training max-entropy model"
        );

        let objective = LogLinearObjective::new(p_data, features);
        let outcome = Bfgs::new(self.params.clone()).minimize(&objective, features.len())?;
        let probabilities = objective.conditional(&outcome.weights);

        let message = match outcome.converged {
            true => format!("Finished training in {} steps.", outcome.steps),
            false => format!(
                "Reached maximum steps without converging, gradient norm {:e}.",
                outcome.gradient_norm
            ),
        };
        self.fitted = Some(Fitted {
            outcome,
            probabilities,
        });
        Ok(message)
    }

    fn validate(p_data: &DMatrix<f64>, features: &[DMatrix<f64>]) -> Result<()> {
        if p_data.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if features.is_empty() {
            return Err(ModelError::invalid_parameter(
                "features",
                "At least one feature table is required.",
            ));
        }
        if let Some(feature) = features.iter().find(|f| f.shape() != p_data.shape()) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{:?}", p_data.shape()),
                actual: format!("{:?}", feature.shape()),
            });
        }
        if p_data.iter().any(|&p| !p.is_finite() || p < 0.0) {
            return Err(ModelError::invalid_parameter(
                "p_data",
                "Probabilities must be finite and non-negative.",
            ));
        }
        if features.iter().flat_map(|f| f.iter()).any(|v| !v.is_finite()) {
            return Err(ModelError::invalid_parameter(
                "features",
                "Feature values must be finite.",
            ));
        }
        Ok(())
    }

    /// `p_w(y|x)` of the fitted model.
    pub fn predict(&self, x: usize, y: usize) -> Result<f64> {
        let probabilities = self.probabilities()?;
        if x >= probabilities.nrows() || y >= probabilities.ncols() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("index within {:?}", probabilities.shape()),
                actual: format!("({}, {})", x, y),
            });
        }
        Ok(probabilities[(x, y)])
    }

    /// The whole conditional table, one row per context.
    pub fn probabilities(&self) -> Result<&DMatrix<f64>> {
        self.fitted
            .as_ref()
            .map(|fitted| &fitted.probabilities)
            .ok_or(ModelError::UnfittedModel)
    }

    pub fn weights(&self) -> Option<&DVector<f64>> {
        self.fitted.as_ref().map(|fitted| &fitted.outcome.weights)
    }

    pub fn outcome(&self) -> Option<&OptimizationOutcome> {
        self.fitted.as_ref().map(|fitted| &fitted.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p_data() -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 3, &[0.125, 0.25, 0.125, 0.5, 0.0, 0.0])
    }

    fn feature(values: [f64; 6]) -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 3, &values)
    }

    fn model() -> MaxEntropy {
        let mut params = MaxEntropyParams::new();
        params.set_seed(Some(42));
        MaxEntropy::with_params(params)
    }

    fn assert_row(model: &MaxEntropy, x: usize, expected: [f64; 3]) {
        for (y, &p) in expected.iter().enumerate() {
            assert_relative_eq!(model.predict(x, y).unwrap(), p, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_single_indicator_feature() {
        let mut model = model();
        model
            .fit(&p_data(), &[feature([1.0, 0.0, 0.0, 0.0, 0.0, 0.0])])
            .unwrap();

        assert!(model.outcome().unwrap().converged);
        assert_row(&model, 0, [0.25, 0.375, 0.375]);
        assert_row(&model, 1, [1.0 / 3.0; 3]);
        assert_relative_eq!(
            model.weights().unwrap()[0],
            (2.0f64 / 3.0).ln(),
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_scaled_feature_gives_same_distribution() {
        let mut model = model();
        model
            .fit(&p_data(), &[feature([0.5, 0.0, 0.0, 0.0, 0.0, 0.0])])
            .unwrap();

        assert_row(&model, 0, [0.25, 0.375, 0.375]);
        assert_row(&model, 1, [1.0 / 3.0; 3]);
    }

    #[test]
    fn test_feature_on_complement() {
        let mut model = model();
        model
            .fit(&p_data(), &[feature([0.0, 1.0, 1.0, 0.0, 0.0, 0.0])])
            .unwrap();

        assert_row(&model, 0, [0.25, 0.375, 0.375]);
        assert_row(&model, 1, [1.0 / 3.0; 3]);
    }

    #[test]
    fn test_unobserved_pair_is_pushed_towards_zero() {
        let mut model = model();
        model
            .fit(
                &p_data(),
                &[
                    feature([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
                    feature([0.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
                ],
            )
            .unwrap();

        assert_row(&model, 0, [0.25, 0.375, 0.375]);
        assert!(model.predict(1, 1).unwrap() < 1e-3);
        assert_relative_eq!(model.predict(1, 0).unwrap(), model.predict(1, 2).unwrap());
    }

    #[test]
    fn test_rows_are_distributions() {
        let mut model = model();
        model
            .fit(&p_data(), &[feature([0.0, 1.0, 0.5, 0.0, 0.0, 0.0])])
            .unwrap();

        for row in model.probabilities().unwrap().row_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        // Matching the feature expectation is what the optimum satisfies.
        let p = model.probabilities().unwrap();
        let model_expectation = 0.5 * (p[(0, 1)] + 0.5 * p[(0, 2)]);
        assert_relative_eq!(model_expectation, 0.25 + 0.0625, epsilon = 1e-5);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut model = model();
        assert!(matches!(
            model.fit(&DMatrix::zeros(0, 0), &[]),
            Err(ModelError::EmptyDataset)
        ));
        assert!(matches!(
            model.fit(&p_data(), &[]),
            Err(ModelError::InvalidParameter { .. })
        ));
        assert!(matches!(
            model.fit(&p_data(), &[DMatrix::zeros(3, 2)]),
            Err(ModelError::ShapeMismatch { .. })
        ));
        let negative = DMatrix::from_row_slice(1, 2, &[-0.5, 1.5]);
        assert!(matches!(
            model.fit(&negative, &[DMatrix::zeros(1, 2)]),
            Err(ModelError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_unfitted_and_out_of_range() {
        let mut model = model();
        assert!(matches!(model.predict(0, 0), Err(ModelError::UnfittedModel)));
        assert!(model.probabilities().is_err());

        model
            .fit(&p_data(), &[feature([1.0, 0.0, 0.0, 0.0, 0.0, 0.0])])
            .unwrap();
        assert!(matches!(
            model.predict(2, 0),
            Err(ModelError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            model.predict(0, 3),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
