//! Decision trees: a C4.5 classifier for categorical attributes and a CART regression tree.

pub mod classifier;
pub mod criterion;
pub mod node;
pub mod params;
pub mod query;
pub mod regressor;

use crate::data::dataset::Dataset;
use crate::error::Result;
use nalgebra::{DMatrix, DVector, Scalar};
use std::sync::Arc;
use tracing::debug;

/// Capability shared by the tree models: train once, then answer read-only queries.
pub trait TreeModel<XT: Scalar, YT: Scalar> {
    type Node;

    /// Builds the tree from a dataset, replacing any previously fitted tree.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::EmptyDataset` for a dataset without records and
    /// `ModelError::ShapeMismatch` when the label count differs from the record count.
    fn fit(&mut self, dataset: &Dataset<XT, YT>) -> Result<String>;

    /// Predicts one label per row of `features`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::UnfittedModel` if `fit` wasn't called yet.
    fn predict(&self, features: &DMatrix<XT>) -> Result<DVector<YT>>;

    /// The fitted tree, if any.
    fn root(&self) -> Option<&Self::Node>;
}

/// One decision taken while growing a tree.
#[derive(Clone, Debug, PartialEq)]
pub enum SplitEvent {
    Categorical {
        depth: usize,
        column: usize,
        gain_ratio: f64,
        n_samples: usize,
    },
    Continuous {
        depth: usize,
        column: usize,
        threshold: f64,
        squared_error: f64,
        n_samples: usize,
    },
    Leaf {
        depth: usize,
        n_samples: usize,
    },
}

/// Callback invoked for every split or leaf decision during `fit`.
pub type SplitObserver = Arc<dyn Fn(&SplitEvent) + Send + Sync>;

pub(crate) fn emit(observer: Option<&SplitObserver>, event: SplitEvent) {
    match &event {
        SplitEvent::Categorical {
            depth,
            column,
            gain_ratio,
            n_samples,
        } => debug!(depth, column, gain_ratio, n_samples, "Split on categorical column"),
        SplitEvent::Continuous {
            depth,
            column,
            threshold,
            squared_error,
            n_samples,
        } => debug!(
            depth,
            column,
            threshold,
            squared_error,
            n_samples,
            "Split on threshold"
        ),
        SplitEvent::Leaf { depth, n_samples } => debug!(depth, n_samples, "No split"),
    }
    if let Some(observer) = observer {
        observer(&event);
    }
}
