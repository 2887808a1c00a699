//! CART Regression Tree
use super::{
    criterion::{self, SquaredErrorAccumulator},
    emit,
    node::ContinuousNode,
    params::TreeParams,
    query, SplitEvent, SplitObserver, TreeModel,
};
use crate::{
    data::dataset::{Dataset, RealNumber},
    error::{ModelError, Result},
    metrics::errors::RegressionMetrics,
};
use nalgebra::{DMatrix, DVector};
use std::{cmp::Ordering, fmt, sync::Arc};
use tracing::info;

struct SplitData<T: RealNumber> {
    feature_index: usize,
    threshold: T,
    squared_error: f64,
}

/// Binary regression tree that picks the split minimising the total squared error of both halves.
#[derive(Clone)]
pub struct RegressionCart<T: RealNumber> {
    root: Option<ContinuousNode<T>>,
    n_columns: usize,
    tree_params: TreeParams,
    observer: Option<SplitObserver>,
}

impl<T: RealNumber> fmt::Debug for RegressionCart<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegressionCart")
            .field("root", &self.root)
            .field("n_columns", &self.n_columns)
            .field("tree_params", &self.tree_params)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl<T: RealNumber> Default for RegressionCart<T> {
    /// Creates a new instance of the regression tree with default parameters.
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealNumber> RegressionMetrics<T> for RegressionCart<T> {}

impl<T: RealNumber> RegressionCart<T> {
    /// Creates a new instance of the regression tree without a depth limit.
    pub fn new() -> Self {
        Self {
            root: None,
            n_columns: 0,
            tree_params: TreeParams::new(),
            observer: None,
        }
    }

    /// Creates a new instance of the regression tree with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `max_depth` - The maximum depth of the tree. The root sits at depth 0, so a depth of 1
    ///   yields a single split.
    ///
    /// # Errors
    ///
    /// This method will return an error if the maximum depth is less than 1.
    pub fn with_params(max_depth: Option<u16>) -> Result<Self> {
        let mut tree = Self::new();
        tree.set_max_depth(max_depth)?;
        Ok(tree)
    }

    /// Sets the maximum depth of the tree.
    ///
    /// # Errors
    ///
    /// This method will return an error if the maximum depth is less than 1.
    pub fn set_max_depth(&mut self, max_depth: Option<u16>) -> Result<()> {
        self.tree_params.set_max_depth(max_depth)
    }

    /// Returns the maximum depth of the tree.
    pub fn max_depth(&self) -> Option<u16> {
        self.tree_params.max_depth()
    }

    /// Registers a callback that receives every split and leaf decision of the next fits.
    pub fn set_split_observer<F>(&mut self, observer: F)
    where
        F: Fn(&SplitEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
    }

    fn build_tree(&self, dataset: &Dataset<T, T>, depth: usize) -> Result<ContinuousNode<T>> {
        let labels = dataset.y.as_slice();
        if labels.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        let mut node = ContinuousNode::new(criterion::mean(labels), labels.len());

        let depth_reached = self
            .max_depth()
            .is_some_and(|max_depth| depth >= max_depth as usize);
        let is_pure = labels.iter().all(|&y| y == labels[0]);
        if depth_reached || is_pure {
            emit(self.observer.as_ref(), Self::leaf_event(depth, labels.len()));
            return Ok(node);
        }

        let mut best_split: Option<SplitData<T>> = None;
        for feature_index in 0..dataset.ncols() {
            if let Some(split) = Self::get_split(dataset, feature_index) {
                if best_split
                    .as_ref()
                    .map_or(true, |best| split.squared_error < best.squared_error)
                {
                    best_split = Some(split);
                }
            }
        }

        // every column is constant on this partition
        let Some(best_split) = best_split else {
            emit(self.observer.as_ref(), Self::leaf_event(depth, labels.len()));
            return Ok(node);
        };

        emit(
            self.observer.as_ref(),
            SplitEvent::Continuous {
                depth,
                column: best_split.feature_index,
                threshold: best_split.threshold.to_f64().unwrap_or(f64::NAN),
                squared_error: best_split.squared_error,
                n_samples: labels.len(),
            },
        );

        let (left_child, right_child) =
            dataset.split_on_threshold(best_split.feature_index, best_split.threshold);
        node.feature_index = Some(best_split.feature_index);
        node.threshold = Some(best_split.threshold);
        node.left = Some(Box::new(self.build_tree(&left_child, depth + 1)?));
        node.right = Some(Box::new(self.build_tree(&right_child, depth + 1)?));
        Ok(node)
    }

    /// Best threshold of one column.
    ///
    /// Records are swept in ascending order of the column. Suffix errors are accumulated once
    /// from the right, so each candidate costs O(1). A candidate sits after the last record of a
    /// run of equal values; the largest value is never a candidate, so both halves are non-empty.
    fn get_split(dataset: &Dataset<T, T>, feature_index: usize) -> Option<SplitData<T>> {
        let column = dataset.x.column(feature_index);
        let labels = &dataset.y;
        let num_samples = column.len();

        let mut order: Vec<usize> = (0..num_samples).collect();
        order.sort_by(|&a, &b| column[a].partial_cmp(&column[b]).unwrap_or(Ordering::Equal));

        let mut suffix_errors = vec![0.0; num_samples + 1];
        let mut right = SquaredErrorAccumulator::new();
        for position in (0..num_samples).rev() {
            right.push(Self::as_f64(labels[order[position]]));
            suffix_errors[position] = right.squared_error();
        }

        let mut left = SquaredErrorAccumulator::new();
        let mut best_split: Option<SplitData<T>> = None;
        for position in 0..num_samples.saturating_sub(1) {
            left.push(Self::as_f64(labels[order[position]]));

            let value = column[order[position]];
            if value == column[order[position + 1]] {
                continue;
            }

            let squared_error = left.squared_error() + suffix_errors[position + 1];
            if best_split
                .as_ref()
                .map_or(true, |best| squared_error < best.squared_error)
            {
                best_split = Some(SplitData {
                    feature_index,
                    threshold: value,
                    squared_error,
                });
            }
        }
        best_split
    }

    fn as_f64(value: T) -> f64 {
        value.to_f64().unwrap_or(f64::NAN)
    }

    fn leaf_event(depth: usize, n_samples: usize) -> SplitEvent {
        SplitEvent::Leaf { depth, n_samples }
    }
}

impl<T: RealNumber> TreeModel<T, T> for RegressionCart<T> {
    type Node = ContinuousNode<T>;

    fn fit(&mut self, dataset: &Dataset<T, T>) -> Result<String> {
        dataset.validate()?;
        dataset.check_finite()?;
        info!(
            n_samples = dataset.nrows(),
            n_columns = dataset.ncols(),
            max_depth = ?self.max_depth(),
            "Building regression tree"
        );

        let root = self.build_tree(dataset, 0)?;
        let message = format!(
            "Finished building the tree with {} leaves and depth {}.",
            root.n_leaves(),
            root.depth()
        );
        self.root = Some(root);
        self.n_columns = dataset.ncols();
        Ok(message)
    }

    fn predict(&self, features: &DMatrix<T>) -> Result<DVector<T>> {
        let root = self.root.as_ref().ok_or(ModelError::UnfittedModel)?;
        if features.ncols() != self.n_columns {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} columns", self.n_columns),
                actual: format!("{} columns", features.ncols()),
            });
        }
        Ok(query::predict_rows(root, features))
    }

    fn root(&self) -> Option<&ContinuousNode<T>> {
        self.root.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    const Y: [f64; 10] = [4.5, 4.75, 4.91, 5.34, 5.8, 7.05, 7.90, 8.23, 8.70, 9.00];

    fn textbook_dataset() -> Dataset<f64, f64> {
        let x = DMatrix::from_fn(10, 1, |i, _| (i + 1) as f64);
        Dataset::new(x, DVector::from_row_slice(&Y))
    }

    #[test]
    fn test_with_params() {
        assert!(RegressionCart::<f64>::with_params(Some(0)).is_err());
        let tree = RegressionCart::<f64>::with_params(Some(3)).unwrap();
        assert_eq!(tree.max_depth(), Some(3));
    }

    #[test]
    fn test_first_split_minimises_squared_error() {
        let dataset = textbook_dataset();
        let mut tree = RegressionCart::new();
        tree.fit(&dataset).unwrap();

        let root = tree.root().unwrap();
        let threshold = root.threshold.unwrap();
        assert_eq!(root.feature_index, Some(0));
        assert_eq!(threshold, 5.0);

        let split_error = |t: f64| {
            let (left, right): (Vec<(f64, f64)>, Vec<(f64, f64)>) = (1..=10)
                .zip(Y)
                .map(|(x, y)| (x as f64, y))
                .partition(|&(x, _)| x <= t);
            let left: Vec<f64> = left.into_iter().map(|(_, y)| y).collect();
            let right: Vec<f64> = right.into_iter().map(|(_, y)| y).collect();
            criterion::squared_error(&left) + criterion::squared_error(&right)
        };
        let chosen = split_error(threshold);
        for t in 1..10 {
            assert!(chosen <= split_error(t as f64) + 1e-12);
        }
        assert_relative_eq!(chosen, 3.35872, epsilon = 1e-9);
    }

    #[test]
    fn test_unbounded_tree_fits_training_set() {
        let dataset = textbook_dataset();
        let mut tree = RegressionCart::new();
        tree.fit(&dataset).unwrap();

        let predictions = tree.predict(&dataset.x).unwrap();
        assert_eq!(predictions, dataset.y);
        assert_relative_eq!(tree.mse(&dataset.y, &predictions).unwrap(), 0.0);
    }

    #[test]
    fn test_max_depth_one_is_a_stump() {
        let dataset = textbook_dataset();
        let mut tree = RegressionCart::with_params(Some(1)).unwrap();
        tree.fit(&dataset).unwrap();

        let root = tree.root().unwrap();
        assert!(!root.is_leaf());
        assert!(root.left.as_ref().unwrap().is_leaf());
        assert!(root.right.as_ref().unwrap().is_leaf());
        assert_relative_eq!(root.left.as_ref().unwrap().value, 5.06, epsilon = 1e-9);
        assert_relative_eq!(root.right.as_ref().unwrap().value, 8.176, epsilon = 1e-9);

        let predictions = tree.predict(&DMatrix::from_row_slice(2, 1, &[5.0, 5.5])).unwrap();
        assert_relative_eq!(predictions[0], 5.06, epsilon = 1e-9);
        assert_relative_eq!(predictions[1], 8.176, epsilon = 1e-9);
    }

    #[test]
    fn test_max_depth_three_bounds_every_path() {
        let dataset = textbook_dataset();
        let mut tree = RegressionCart::with_params(Some(3)).unwrap();
        tree.fit(&dataset).unwrap();

        let root = tree.root().unwrap();
        assert_eq!(root.depth(), 3);
        assert!(root.n_leaves() <= 8);
    }

    #[test]
    fn test_ties_keep_first_column() {
        // both columns order the records identically
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0]);
        let y = DVector::from_vec(vec![1.0, 1.0, 5.0, 5.0]);
        let mut tree = RegressionCart::new();
        tree.fit(&Dataset::new(x, y)).unwrap();

        let root = tree.root().unwrap();
        assert_eq!(root.feature_index, Some(0));
        assert_eq!(root.threshold, Some(2.0));
    }

    #[test]
    fn test_duplicate_values_are_never_separated() {
        let x = DMatrix::from_row_slice(5, 1, &[1.0, 2.0, 2.0, 2.0, 3.0]);
        let y = DVector::from_vec(vec![0.0, 0.0, 10.0, 10.0, 10.0]);
        let mut tree = RegressionCart::with_params(Some(1)).unwrap();
        tree.fit(&Dataset::new(x, y)).unwrap();

        let root = tree.root().unwrap();
        let (left, right) = (root.left.as_ref().unwrap(), root.right.as_ref().unwrap());
        assert_eq!(left.n_samples + right.n_samples, 5);
        assert!(left.n_samples > 0 && right.n_samples > 0);
        assert!(root.threshold == Some(1.0) || root.threshold == Some(2.0));
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let x = DMatrix::from_row_slice(3, 1, &[2.0, 2.0, 2.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let mut tree = RegressionCart::new();
        tree.fit(&Dataset::new(x, y)).unwrap();

        let root = tree.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.value, 2.0);
    }

    #[test]
    fn test_predict_is_idempotent() {
        let dataset = textbook_dataset();
        let mut tree = RegressionCart::with_params(Some(2)).unwrap();
        tree.fit(&dataset).unwrap();

        let test_x = dataset.x.map(|x| x + 0.5);
        let first = tree.predict(&test_x).unwrap();
        let second = tree.predict(&test_x).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_observer_receives_root_split_first() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut tree = RegressionCart::with_params(Some(1)).unwrap();
        tree.set_split_observer(move |event| sink.lock().unwrap().push(event.clone()));
        tree.fit(&textbook_dataset()).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        match &events[0] {
            SplitEvent::Continuous {
                depth,
                column,
                threshold,
                n_samples,
                ..
            } => {
                assert_eq!((*depth, *column, *n_samples), (0, 0, 10));
                assert_eq!(*threshold, 5.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_refit_replaces_tree() {
        let mut tree = RegressionCart::new();
        tree.fit(&textbook_dataset()).unwrap();
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let dataset = Dataset::new(x, DVector::from_vec(vec![3.0, 3.0]));
        tree.fit(&dataset).unwrap();

        assert!(tree.root().unwrap().is_leaf());
        assert_eq!(tree.root().unwrap().value, 3.0);
    }

    #[test]
    fn test_fit_empty_dataset() {
        let dataset = Dataset::new(DMatrix::<f64>::zeros(0, 1), DVector::<f64>::zeros(0));
        let mut tree = RegressionCart::new();
        assert!(matches!(tree.fit(&dataset), Err(ModelError::EmptyDataset)));
    }

    #[test]
    fn test_fit_rejects_nan_feature() {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, f64::NAN, 3.0, 4.0]);
        let dataset = Dataset::new(x, DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]));
        let mut tree = RegressionCart::new();

        assert!(matches!(
            tree.fit(&dataset),
            Err(ModelError::NonFiniteValue { row: 1, .. })
        ));
        assert!(tree.root().is_none());
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = RegressionCart::<f64>::new();
        let result = tree.predict(&DMatrix::from_row_slice(1, 1, &[1.0]));
        assert!(matches!(result, Err(ModelError::UnfittedModel)));
    }
}
