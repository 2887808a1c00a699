use crate::error::{ModelError, Result};

/// Configuration of the CART regression tree.
#[derive(Clone, Debug)]
pub struct TreeParams {
    pub max_depth: Option<u16>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeParams {
    pub fn new() -> Self {
        Self { max_depth: None }
    }

    /// `None` grows the tree until every leaf is pure or cannot be split.
    pub fn set_max_depth(&mut self, max_depth: Option<u16>) -> Result<()> {
        if max_depth.is_some_and(|depth| depth < 1) {
            return Err(ModelError::invalid_parameter(
                "max_depth",
                "The maximum depth must be greater than 0.",
            ));
        }
        self.max_depth = max_depth;
        Ok(())
    }

    pub fn max_depth(&self) -> Option<u16> {
        self.max_depth
    }
}

/// Configuration of the C4.5 classifier.
#[derive(Clone, Debug)]
pub struct C45Params {
    pub information_gain_threshold: f64,
}

impl Default for C45Params {
    fn default() -> Self {
        Self::new()
    }
}

impl C45Params {
    pub fn new() -> Self {
        Self {
            information_gain_threshold: 0.0,
        }
    }

    /// A node only splits when the best gain ratio is strictly greater than the threshold.
    pub fn set_information_gain_threshold(&mut self, threshold: f64) -> Result<()> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ModelError::invalid_parameter(
                "information_gain_threshold",
                format!("{} is not a finite, non-negative number.", threshold),
            ));
        }
        self.information_gain_threshold = threshold;
        Ok(())
    }

    pub fn information_gain_threshold(&self) -> f64 {
        self.information_gain_threshold
    }
}
