use std::collections::BTreeSet;

use nalgebra::{DMatrix, DVector};

use crate::{
    data::dataset::Category,
    error::{ModelError, Result},
};

/// Counts of (true class, predicted class) pairs over the classes seen in either vector.
///
/// Classes are kept in ascending `Ord` order; `counts[(i, j)]` is the number of records of
/// class `classes[i]` predicted as `classes[j]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionMatrix<T: Category + Ord> {
    pub classes: Vec<T>,
    pub counts: DMatrix<usize>,
}

impl<T: Category + Ord> ConfusionMatrix<T> {
    pub fn new(y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        let classes: Vec<T> = y_true
            .iter()
            .chain(y_pred.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut counts = DMatrix::from_element(classes.len(), classes.len(), 0usize);
        for (actual, predicted) in y_true.iter().zip(y_pred.iter()) {
            if let (Ok(row), Ok(col)) = (classes.binary_search(actual), classes.binary_search(predicted)) {
                counts[(row, col)] += 1;
            }
        }

        Ok(Self { classes, counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn accuracy(&self) -> f64 {
        self.counts.diagonal().iter().sum::<usize>() as f64 / self.total() as f64
    }

    fn index_of(&self, class: &T) -> Result<usize> {
        self.classes.binary_search(class).map_err(|_| {
            ModelError::UndefinedMetric(format!("{:?} appears in neither vector.", class))
        })
    }

    /// Share of the records predicted as `class` that really are `class`. 0 when nothing was
    /// predicted as `class`.
    pub fn precision(&self, class: &T) -> Result<f64> {
        let index = self.index_of(class)?;
        Ok(Self::ratio(self.counts[(index, index)], self.counts.column(index).sum()))
    }

    /// Share of the records of `class` that were predicted as `class`.
    pub fn recall(&self, class: &T) -> Result<f64> {
        let index = self.index_of(class)?;
        Ok(Self::ratio(self.counts[(index, index)], self.counts.row(index).sum()))
    }

    pub fn f1(&self, class: &T) -> Result<f64> {
        let (precision, recall) = (self.precision(class)?, self.recall(class)?);
        match precision + recall {
            sum if sum > 0.0 => Ok(2.0 * precision * recall / sum),
            _ => Ok(0.0),
        }
    }

    fn ratio(hits: usize, total: usize) -> f64 {
        match total {
            0 => 0.0,
            total => hits as f64 / total as f64,
        }
    }

    fn macro_average<F>(&self, metric: F) -> Result<f64>
    where
        F: Fn(&Self, &T) -> Result<f64>,
    {
        let total = self
            .classes
            .iter()
            .map(|class| metric(self, class))
            .sum::<Result<f64>>()?;
        Ok(total / self.classes.len() as f64)
    }
}

/// Classification metrics, available on every model that predicts class labels.
///
/// `precision`, `recall` and `f1_score` are macro averages over the classes; use
/// [`ConfusionMatrix`] for the value of a single class.
pub trait ClassificationMetrics<T: Category + Ord> {
    fn confusion_matrix(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<ConfusionMatrix<T>> {
        ConfusionMatrix::new(y_true, y_pred)
    }

    fn accuracy(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64> {
        Ok(self.confusion_matrix(y_true, y_pred)?.accuracy())
    }

    fn precision(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64> {
        self.confusion_matrix(y_true, y_pred)?
            .macro_average(ConfusionMatrix::precision)
    }

    fn recall(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64> {
        self.confusion_matrix(y_true, y_pred)?
            .macro_average(ConfusionMatrix::recall)
    }

    fn f1_score(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<f64> {
        self.confusion_matrix(y_true, y_pred)?
            .macro_average(ConfusionMatrix::f1)
    }
}
