use std::marker::PhantomData;

use crate::{
    data::dataset::{Category, Dataset, RealNumber, WholeNumber},
    error::{ModelError, Result},
    metrics::confusion::ClassificationMetrics,
};
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{info, trace};

/// Binary logistic regression trained by gradient ascent on the mean log-likelihood.
///
/// Labels must be `0` or `1`. The first weight is the bias.
#[derive(Clone, Debug)]
pub struct LogisticRegression<XT: RealNumber, YT: WholeNumber> {
    weights: Option<DVector<XT>>,
    lr: XT,
    max_steps: usize,
    epsilon: Option<XT>,
    seed: Option<u64>,

    _marker: PhantomData<YT>,
}

impl<XT: RealNumber, YT: WholeNumber> Default for LogisticRegression<XT, YT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<XT: RealNumber, YT: WholeNumber + Category + Ord> ClassificationMetrics<YT>
    for LogisticRegression<XT, YT>
{
}

fn cast<XT: RealNumber>(value: f64) -> XT {
    XT::from_f64(value).unwrap_or_else(XT::nan)
}

impl<XT: RealNumber, YT: WholeNumber> LogisticRegression<XT, YT> {
    /// Learning rate 1, 1000 steps, no early stopping and a random starting point.
    pub fn new() -> Self {
        Self {
            weights: None,
            lr: XT::one(),
            max_steps: 1000,
            epsilon: None,
            seed: None,
            _marker: PhantomData,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the learning rate isn't positive, `max_steps` is zero or `epsilon`
    /// isn't positive.
    pub fn with_params(
        lr: Option<XT>,
        max_steps: Option<usize>,
        epsilon: Option<XT>,
        seed: Option<u64>,
    ) -> Result<Self> {
        let mut model = Self::new();
        if let Some(lr) = lr {
            model.set_lr(lr)?;
        }
        if let Some(max_steps) = max_steps {
            model.set_max_steps(max_steps)?;
        }
        model.set_epsilon(epsilon)?;
        model.seed = seed;
        Ok(model)
    }

    pub fn set_lr(&mut self, lr: XT) -> Result<()> {
        if !(lr > XT::zero()) || !lr.is_finite() {
            return Err(ModelError::invalid_parameter(
                "lr",
                "The learning rate must be a positive number.",
            ));
        }
        self.lr = lr;
        Ok(())
    }

    pub fn set_max_steps(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(ModelError::invalid_parameter(
                "max_steps",
                "The number of steps must be greater than 0.",
            ));
        }
        self.max_steps = max_steps;
        Ok(())
    }

    /// Stops early once the squared change of the weights falls below `epsilon`.
    pub fn set_epsilon(&mut self, epsilon: Option<XT>) -> Result<()> {
        if epsilon.is_some_and(|epsilon| !(epsilon > XT::zero())) {
            return Err(ModelError::invalid_parameter(
                "epsilon",
                "The tolerance must be a positive number.",
            ));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    pub fn weights(&self) -> Option<&DVector<XT>> {
        self.weights.as_ref()
    }

    pub fn fit(&mut self, dataset: &Dataset<XT, YT>) -> Result<String> {
        dataset.validate()?;
        let (x, y) = dataset.into_parts();
        let y = Self::targets(y)?;
        let x_with_bias = x.clone().insert_column(0, XT::one());

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut weights =
            DVector::from_fn(x_with_bias.ncols(), |_, _| cast::<XT>(rng.gen::<f64>()));
        info!(
            n_samples = x.nrows(),
            n_features = x.ncols(),
            max_steps = self.max_steps,
            "Training logistic regression"
        );

        for step in 0..self.max_steps {
            let gradient = Self::gradient(&weights, &x_with_bias, &y);
            let update = gradient * self.lr;
            weights += &update;

            trace!(step, loss = ?Self::loss(&weights, &x_with_bias, &y), "Gradient ascent step");

            let delta = update.iter().fold(XT::zero(), |acc, &u| acc + u * u);
            if self.epsilon.is_some_and(|epsilon| delta < epsilon) {
                self.weights = Some(weights);
                return Ok(format!("Finished training in {} steps.", step + 1));
            }
        }

        self.weights = Some(weights);
        Ok("Reached maximum steps without converging.".into())
    }

    /// Probability of class `1` for every row.
    pub fn predict_proba(&self, x_pred: &DMatrix<XT>) -> Result<DVector<XT>> {
        let weights = self.fitted_weights(x_pred)?;
        let x_with_bias = x_pred.clone().insert_column(0, XT::one());
        Ok(Self::h(weights, &x_with_bias))
    }

    pub fn predict(&self, x_pred: &DMatrix<XT>) -> Result<DVector<YT>> {
        let threshold = cast::<XT>(0.5);
        Ok(self.predict_proba(x_pred)?.map(|p| match p > threshold {
            true => YT::one(),
            false => YT::zero(),
        }))
    }

    /// Mean binary cross entropy of the fitted model on `(x, y)`.
    pub fn cross_entropy(&self, x: &DMatrix<XT>, y: &DVector<YT>) -> Result<XT> {
        let weights = self.fitted_weights(x)?;
        let x_with_bias = x.clone().insert_column(0, XT::one());
        Ok(Self::loss(weights, &x_with_bias, &Self::targets(y)?))
    }

    fn fitted_weights(&self, x: &DMatrix<XT>) -> Result<&DVector<XT>> {
        let weights = self.weights.as_ref().ok_or(ModelError::UnfittedModel)?;
        if x.ncols() + 1 != weights.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} columns", weights.len() - 1),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(weights)
    }

    fn targets(y: &DVector<YT>) -> Result<DVector<XT>> {
        if let Some(label) = y.iter().find(|&&label| label != YT::zero() && label != YT::one()) {
            return Err(ModelError::InvalidLabel(format!(
                "{} is not a binary label, expected 0 or 1.",
                label
            )));
        }
        Ok(y.map(|label| match label == YT::one() {
            true => XT::one(),
            false => XT::zero(),
        }))
    }

    /// Gradient of the mean log-likelihood: `X^T (y - p) / n`.
    fn gradient(weights: &DVector<XT>, x: &DMatrix<XT>, y: &DVector<XT>) -> DVector<XT> {
        let errors = y - Self::h(weights, x);
        x.transpose() * errors / cast::<XT>(y.len() as f64)
    }

    fn loss(weights: &DVector<XT>, x: &DMatrix<XT>, y: &DVector<XT>) -> XT {
        let y_pred = Self::h(weights, x);
        let one = XT::one();
        let eps = cast::<XT>(f64::EPSILON);

        y.iter()
            .zip(y_pred.iter())
            .map(|(&y_i, &p_i)| -y_i * (p_i + eps).ln() - (one - y_i) * (one - p_i + eps).ln())
            .fold(XT::zero(), |acc, x| acc + x)
            / cast::<XT>(y.len() as f64)
    }

    fn h(weights: &DVector<XT>, x: &DMatrix<XT>) -> DVector<XT> {
        let z = x * weights;
        z.map(Self::sigmoid)
    }

    fn sigmoid(z: XT) -> XT {
        let one = XT::one();
        match z >= XT::zero() {
            true => one / (one + (-z).exp()),
            false => {
                let e = z.exp();
                e / (one + e)
            }
        }
    }
}
