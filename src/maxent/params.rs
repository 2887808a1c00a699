use crate::error::{ModelError, Result};

/// Configuration of the max-entropy optimizer.
#[derive(Clone, Debug)]
pub struct MaxEntropyParams {
    pub epsilon: f64,
    pub max_steps: usize,
    pub line_search_upper: f64,
    pub seed: Option<u64>,
}

impl Default for MaxEntropyParams {
    fn default() -> Self {
        Self::new()
    }
}

impl MaxEntropyParams {
    pub fn new() -> Self {
        Self {
            epsilon: 1e-6,
            max_steps: 1000,
            line_search_upper: 100.0,
            seed: None,
        }
    }

    /// Gradient norm below which the optimizer stops. Also the line search tolerance.
    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "epsilon",
                format!("{} is not a finite, positive number.", epsilon),
            ));
        }
        self.epsilon = epsilon;
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

    /// Right end of the interval `[0, upper]` searched for the step length.
    pub fn set_line_search_upper(&mut self, upper: f64) -> Result<()> {
        if !upper.is_finite() || upper <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "line_search_upper",
                format!("{} is not a finite, positive number.", upper),
            ));
        }
        self.line_search_upper = upper;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }
}
