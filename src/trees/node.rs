use crate::data::dataset::{Category, RealNumber};
use std::collections::HashMap;

/// Multi-way node of a C4.5 tree.
///
/// `label` is the majority class of the training records that reached the node, so an
/// internal node can answer for attribute values it never saw.
#[derive(Clone, Debug)]
pub struct CategoricalNode<XT: Category, YT: Category> {
    pub label: YT,
    pub n_samples: usize,
    pub column: Option<usize>,
    pub children: HashMap<XT, CategoricalNode<XT, YT>>,
}

impl<XT: Category, YT: Category> CategoricalNode<XT, YT> {
    pub fn leaf(label: YT, n_samples: usize) -> Self {
        Self {
            label,
            n_samples,
            column: None,
            children: HashMap::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.column.is_none()
    }

    /// Number of edges on the longest path down to a leaf.
    pub fn depth(&self) -> usize {
        self.children
            .values()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn n_leaves(&self) -> usize {
        match self.is_leaf() {
            true => 1,
            false => self.children.values().map(Self::n_leaves).sum(),
        }
    }
}

/// Binary node of a CART regression tree. Records with `x[feature_index] <= threshold` go left.
#[derive(Clone, Debug)]
pub struct ContinuousNode<T: RealNumber> {
    pub feature_index: Option<usize>,
    pub threshold: Option<T>,
    pub left: Option<Box<ContinuousNode<T>>>,
    pub right: Option<Box<ContinuousNode<T>>>,
    pub value: T,
    pub n_samples: usize,
}

impl<T: RealNumber> ContinuousNode<T> {
    pub fn new(value: T, n_samples: usize) -> Self {
        Self {
            feature_index: None,
            threshold: None,
            left: None,
            right: None,

            value,
            n_samples,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_index.is_none()
    }

    pub fn depth(&self) -> usize {
        self.left
            .iter()
            .chain(self.right.iter())
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn n_leaves(&self) -> usize {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => left.n_leaves() + right.n_leaves(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorical_leaf() {
        let leaf: CategoricalNode<&str, &str> = CategoricalNode::leaf("yes", 3);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.depth(), 0);
        assert_eq!(leaf.n_leaves(), 1);
    }

    #[test]
    fn test_categorical_depth() {
        let mut inner = CategoricalNode::leaf("yes", 4);
        inner.column = Some(1);
        inner.children.insert("a", CategoricalNode::leaf("yes", 3));
        inner.children.insert("b", CategoricalNode::leaf("no", 1));

        let mut root = CategoricalNode::leaf("no", 6);
        root.column = Some(0);
        root.children.insert("x", inner);
        root.children.insert("y", CategoricalNode::leaf("no", 2));

        assert_eq!(root.depth(), 2);
        assert_eq!(root.n_leaves(), 3);
    }

    #[test]
    fn test_continuous_depth() {
        let mut root = ContinuousNode::new(2.0, 2);
        root.feature_index = Some(0);
        root.threshold = Some(1.5);
        root.left = Some(Box::new(ContinuousNode::new(1.0, 1)));
        root.right = Some(Box::new(ContinuousNode::new(3.0, 1)));

        assert!(!root.is_leaf());
        assert_eq!(root.depth(), 1);
        assert_eq!(root.n_leaves(), 2);
    }
}
