//! C4.5 Decision Tree Classifier
use super::{
    criterion, emit,
    node::CategoricalNode,
    params::C45Params,
    query, SplitEvent, SplitObserver, TreeModel,
};
use crate::{
    data::dataset::{Category, Dataset},
    error::{ModelError, Result},
    metrics::confusion::ClassificationMetrics,
};
use nalgebra::{DMatrix, DVector};
use std::{collections::BTreeSet, fmt, sync::Arc};
use tracing::info;

/// Multi-way decision tree over categorical attributes, split by information gain ratio.
///
/// Each attribute is used at most once on any root-to-leaf path and every node keeps its
/// majority class, which answers queries whose attribute value was never seen at that node.
#[derive(Clone)]
pub struct C45Classifier<XT: Category, YT: Category> {
    root: Option<CategoricalNode<XT, YT>>,
    n_columns: usize,
    params: C45Params,
    observer: Option<SplitObserver>,
}

impl<XT: Category, YT: Category> fmt::Debug for C45Classifier<XT, YT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("C45Classifier")
            .field("root", &self.root)
            .field("n_columns", &self.n_columns)
            .field("params", &self.params)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl<XT: Category, YT: Category> Default for C45Classifier<XT, YT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<XT: Category, YT: Category + Ord> ClassificationMetrics<YT> for C45Classifier<XT, YT> {}

impl<XT: Category, YT: Category> C45Classifier<XT, YT> {
    /// Creates a classifier that splits whenever the best gain ratio is positive.
    pub fn new() -> Self {
        Self {
            root: None,
            n_columns: 0,
            params: C45Params::new(),
            observer: None,
        }
    }

    /// Creates a classifier with a custom gain-ratio threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is negative or not finite.
    pub fn with_params(information_gain_threshold: Option<f64>) -> Result<Self> {
        let mut tree = Self::new();
        tree.set_information_gain_threshold(information_gain_threshold.unwrap_or(0.0))?;
        Ok(tree)
    }

    pub fn set_information_gain_threshold(&mut self, threshold: f64) -> Result<()> {
        self.params.set_information_gain_threshold(threshold)
    }

    pub fn information_gain_threshold(&self) -> f64 {
        self.params.information_gain_threshold()
    }

    /// Registers a callback that receives every split and leaf decision of the next fits.
    pub fn set_split_observer<F>(&mut self, observer: F)
    where
        F: Fn(&SplitEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
    }

    fn build_tree(
        &self,
        dataset: &Dataset<XT, YT>,
        selected: &BTreeSet<usize>,
        depth: usize,
    ) -> Result<CategoricalNode<XT, YT>> {
        let labels = dataset.y.as_slice();
        let label = criterion::majority_label(labels).ok_or(ModelError::EmptyDataset)?;
        let mut node = CategoricalNode::leaf(label, labels.len());

        let is_pure = labels.iter().all(|y| *y == labels[0]);
        if selected.len() == dataset.ncols() || is_pure {
            emit(self.observer.as_ref(), Self::leaf_event(depth, labels.len()));
            return Ok(node);
        }

        match Self::best_column(dataset, selected) {
            Some((column, gain_ratio)) if gain_ratio > self.information_gain_threshold() => {
                emit(
                    self.observer.as_ref(),
                    SplitEvent::Categorical {
                        depth,
                        column,
                        gain_ratio,
                        n_samples: labels.len(),
                    },
                );
                let mut path = selected.clone();
                path.insert(column);

                for (value, partition) in dataset.partition_by_value(column) {
                    let child = self.build_tree(&partition, &path, depth + 1)?;
                    node.children.insert(value, child);
                }
                node.column = Some(column);
            }
            _ => emit(self.observer.as_ref(), Self::leaf_event(depth, labels.len())),
        }

        Ok(node)
    }

    /// Unused column with the largest gain ratio, scanning columns in ascending order so that
    /// ties keep the first one. Columns holding a single value have no ratio and are skipped.
    fn best_column(dataset: &Dataset<XT, YT>, selected: &BTreeSet<usize>) -> Option<(usize, f64)> {
        let labels = dataset.y.as_slice();
        let mut best: Option<(usize, f64)> = None;

        for column in (0..dataset.ncols()).filter(|column| !selected.contains(column)) {
            let column_view = dataset.x.column(column);
            let values: Vec<&XT> = column_view.iter().collect();
            let Some(gain_ratio) = criterion::information_gain_ratio(&values, labels) else {
                continue;
            };
            if best.map_or(true, |(_, best_ratio)| gain_ratio > best_ratio) {
                best = Some((column, gain_ratio));
            }
        }
        best
    }

    fn leaf_event(depth: usize, n_samples: usize) -> SplitEvent {
        SplitEvent::Leaf { depth, n_samples }
    }
}

impl<XT: Category, YT: Category> TreeModel<XT, YT> for C45Classifier<XT, YT> {
    type Node = CategoricalNode<XT, YT>;

    fn fit(&mut self, dataset: &Dataset<XT, YT>) -> Result<String> {
        dataset.validate()?;
        info!(
            n_samples = dataset.nrows(),
            n_columns = dataset.ncols(),
            threshold = self.information_gain_threshold(),
            "Building C4.5 tree"
        );

        let root = self.build_tree(dataset, &BTreeSet::new(), 0)?;
        let message = format!(
            "Finished building the tree with {} leaves and depth {}.",
            root.n_leaves(),
            root.depth()
        );
        self.root = Some(root);
        self.n_columns = dataset.ncols();
        Ok(message)
    }

    fn predict(&self, features: &DMatrix<XT>) -> Result<DVector<YT>> {
        let root = self.root.as_ref().ok_or(ModelError::UnfittedModel)?;
        if features.ncols() != self.n_columns {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} columns", self.n_columns),
                actual: format!("{} columns", features.ncols()),
            });
        }
        Ok(query::predict_rows(root, features))
    }

    fn root(&self) -> Option<&CategoricalNode<XT, YT>> {
        self.root.as_ref()
    }
}
