//! Walking a fitted tree from the root down to the node that answers a query.

use super::node::{CategoricalNode, ContinuousNode};
use crate::data::dataset::{Category, RealNumber};
use nalgebra::{DMatrix, DVector, Scalar};
use rayon::prelude::*;

/// A tree node that knows its own answer and which child a record should visit next.
pub trait QueryNode<XT: Scalar> {
    type Label: Clone;

    fn label(&self) -> &Self::Label;

    /// The child to descend into, or `None` if the walk stops here.
    fn descend(&self, record: &DVector<XT>) -> Option<&Self>;
}

/// Follows `descend` from `root` until it stops and returns the landing node.
pub fn query<'a, XT: Scalar, N: QueryNode<XT>>(root: &'a N, record: &DVector<XT>) -> &'a N {
    let mut node = root;
    while let Some(next) = node.descend(record) {
        node = next;
    }
    node
}

pub fn predict_record<XT: Scalar, N: QueryNode<XT>>(root: &N, record: &DVector<XT>) -> N::Label {
    query(root, record).label().clone()
}

/// Answers every row of `features` independently. The tree is only read, so rows run in parallel.
pub fn predict_rows<XT, N>(root: &N, features: &DMatrix<XT>) -> DVector<N::Label>
where
    XT: Scalar + Send + Sync,
    N: QueryNode<XT> + Sync,
    N::Label: Scalar + Send,
{
    let predictions: Vec<_> = (0..features.nrows())
        .into_par_iter()
        .map(|index| {
            let record = DVector::from_iterator(features.ncols(), features.row(index).iter().cloned());
            predict_record(root, &record)
        })
        .collect();

    DVector::from_vec(predictions)
}

impl<XT: Category, YT: Category> QueryNode<XT> for CategoricalNode<XT, YT> {
    type Label = YT;

    fn label(&self) -> &YT {
        &self.label
    }

    // Values never seen at this node during training stop the walk here.
    fn descend(&self, record: &DVector<XT>) -> Option<&Self> {
        self.column
            .and_then(|column| self.children.get(&record[column]))
    }
}

impl<T: RealNumber> QueryNode<T> for ContinuousNode<T> {
    type Label = T;

    fn label(&self) -> &T {
        &self.value
    }

    fn descend(&self, record: &DVector<T>) -> Option<&Self> {
        let (feature_index, threshold) = (self.feature_index?, self.threshold?);
        match record[feature_index] > threshold {
            true => self.right.as_deref(),
            false => self.left.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> ContinuousNode<f64> {
        let mut root = ContinuousNode::new(5.0, 4);
        root.feature_index = Some(0);
        root.threshold = Some(2.0);
        root.left = Some(Box::new(ContinuousNode::new(1.0, 2)));
        root.right = Some(Box::new(ContinuousNode::new(9.0, 2)));
        root
    }

    #[test]
    fn test_continuous_query_lands_on_leaf() {
        let root = stump();
        assert_eq!(predict_record(&root, &DVector::from_vec(vec![2.0])), 1.0);
        assert_eq!(predict_record(&root, &DVector::from_vec(vec![2.5])), 9.0);
        assert_eq!(query(&root, &DVector::from_vec(vec![0.0])).n_samples, 2);
    }

    #[test]
    fn test_categorical_query_falls_back_on_unseen_value() {
        let mut root = CategoricalNode::leaf("approve", 5);
        root.column = Some(0);
        root.children
            .insert("young", CategoricalNode::leaf("reject", 2));
        root.children
            .insert("old", CategoricalNode::leaf("approve", 3));

        let young = DVector::from_vec(vec!["young"]);
        let middle = DVector::from_vec(vec!["middle"]);
        assert_eq!(predict_record(&root, &young), "reject");
        assert_eq!(predict_record(&root, &middle), "approve");
    }

    #[test]
    fn test_predict_rows_keeps_row_order() {
        let root = stump();
        let features = DMatrix::from_row_slice(4, 1, &[3.0, 1.0, 2.0, 7.5]);
        let predictions = predict_rows(&root, &features);
        assert_eq!(predictions, DVector::from_vec(vec![9.0, 1.0, 1.0, 9.0]));
    }
}
