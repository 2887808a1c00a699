use crate::error::{ModelError, Result};
use nalgebra::{DMatrix, DVector, Scalar};
use num_traits::{Float, FromPrimitive, Num, ToPrimitive};
use std::cmp::PartialOrd;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

pub trait DataValue:
    Debug
    + Clone
    + Copy
    + Num
    + FromPrimitive
    + ToPrimitive
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
    + Display
    + 'static
{
}

impl<T> DataValue for T where
    T: Debug
        + Clone
        + Copy
        + Num
        + FromPrimitive
        + ToPrimitive
        + AddAssign
        + SubAssign
        + MulAssign
        + DivAssign
        + Send
        + Sync
        + Display
        + 'static
{
}

pub trait Number: DataValue + PartialOrd {}
impl<T> Number for T where T: DataValue + PartialOrd {}

pub trait WholeNumber: Number + Eq + Hash {}
impl<T> WholeNumber for T where T: Number + Eq + Hash {}

pub trait RealNumber: Number + Float {}
impl<T> RealNumber for T where T: Number + Float {}

/// A discrete attribute value or class label, e.g. `String`, `&'static str` or `u8`.
pub trait Category: Scalar + Eq + Hash + Send + Sync {}
impl<T> Category for T where T: Scalar + Eq + Hash + Send + Sync {}

/// Feature matrix with one record per row and the parallel label vector.
pub struct Dataset<XT: Scalar, YT: Scalar> {
    pub x: DMatrix<XT>,
    pub y: DVector<YT>,
}

impl<XT: Scalar, YT: Scalar> Clone for Dataset<XT, YT> {
    fn clone(&self) -> Self {
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }
}

impl<XT: Scalar, YT: Scalar> Debug for Dataset<XT, YT> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Dataset {{\n    x: [\n")?;

        for i in 0..self.x.nrows() {
            write!(f, "        [")?;
            for j in 0..self.x.ncols() {
                write!(f, "{:?}, ", self.x[(i, j)])?;
            }
            writeln!(f, "],")?;
        }

        write!(f, "    ],\n    y: [")?;
        for i in 0..self.y.len() {
            write!(f, "{:?}, ", self.y[i])?;
        }
        write!(f, "]\n}}")
    }
}

impl<XT: Scalar, YT: Scalar> Dataset<XT, YT> {
    pub fn new(x: DMatrix<XT>, y: DVector<YT>) -> Self {
        Self { x, y }
    }

    /// Builds a dataset from row-major records, the way literal tables are usually written.
    pub fn from_rows(rows: &[Vec<XT>], labels: Vec<YT>) -> Result<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|row| row.len() != ncols) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} columns", ncols),
                actual: format!("{} columns", row.len()),
            });
        }
        let x = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j].clone());
        let dataset = Self::new(x, DVector::from_vec(labels));
        dataset.check_shape()?;
        Ok(dataset)
    }

    pub fn into_parts(&self) -> (&DMatrix<XT>, &DVector<YT>) {
        (&self.x, &self.y)
    }

    pub fn is_not_empty(&self) -> bool {
        !(self.x.is_empty() || self.y.is_empty())
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    /// Checks the preconditions shared by every `fit`: at least one record and one label per record.
    pub fn validate(&self) -> Result<()> {
        if self.x.nrows() == 0 || self.y.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        self.check_shape()
    }

    fn check_shape(&self) -> Result<()> {
        if self.x.nrows() != self.y.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} labels", self.x.nrows()),
                actual: format!("{} labels", self.y.len()),
            });
        }
        Ok(())
    }

    /// Rejects NaN and infinite features or labels, which have no place in an ordering.
    pub fn check_finite(&self) -> Result<()>
    where
        XT: Float,
        YT: Float,
    {
        for (row, record) in self.x.row_iter().enumerate() {
            if let Some(column) = record.iter().position(|value| !value.is_finite()) {
                return Err(ModelError::NonFiniteValue {
                    row,
                    location: format!("column {}", column),
                });
            }
        }
        match self.y.iter().position(|label| !label.is_finite()) {
            Some(row) => Err(ModelError::NonFiniteValue {
                row,
                location: "label".into(),
            }),
            None => Ok(()),
        }
    }

    /// Copies the given rows, in the given order, into a new dataset.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let x = DMatrix::from_fn(indices.len(), self.x.ncols(), |i, j| {
            self.x[(indices[i], j)].clone()
        });
        let y = DVector::from_iterator(
            indices.len(),
            indices.iter().map(|&index| self.y[index].clone()),
        );
        Self::new(x, y)
    }

    pub fn split_on_threshold(&self, feature_index: usize, threshold: XT) -> (Self, Self)
    where
        XT: PartialOrd,
    {
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = (0..self.x.nrows())
            .partition(|&index| self.x[(index, feature_index)] <= threshold);

        (
            self.select_rows(&left_indices),
            self.select_rows(&right_indices),
        )
    }

    /// Groups the rows by their value in `feature_index`, keeping the first-seen order of values.
    pub fn partition_by_value(&self, feature_index: usize) -> Vec<(XT, Self)>
    where
        XT: Category,
    {
        let mut positions: HashMap<XT, usize> = HashMap::new();
        let mut groups: Vec<(XT, Vec<usize>)> = Vec::new();

        for index in 0..self.x.nrows() {
            let value = &self.x[(index, feature_index)];
            match positions.get(value) {
                Some(&position) => groups[position].1.push(index),
                None => {
                    positions.insert(value.clone(), groups.len());
                    groups.push((value.clone(), vec![index]));
                }
            }
        }

        groups
            .into_iter()
            .map(|(value, indices)| (value, self.select_rows(&indices)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_new() {
        let x = DMatrix::from_row_slice(2, 2, &[1, 2, 3, 4]);
        let y = DVector::from_vec(vec![5, 6]);
        let dataset = Dataset::new(x.clone(), y.clone());
        assert_eq!(dataset.x, x);
        assert_eq!(dataset.y, y);
    }

    #[test]
    fn test_check_finite() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, f64::NAN]);
        let dataset = Dataset::new(x, DVector::from_vec(vec![0.0, 1.0]));
        assert!(matches!(
            dataset.check_finite(),
            Err(ModelError::NonFiniteValue { row: 1, .. })
        ));

        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let dataset = Dataset::new(x.clone(), DVector::from_vec(vec![f64::INFINITY, 1.0]));
        assert!(matches!(
            dataset.check_finite(),
            Err(ModelError::NonFiniteValue { row: 0, .. })
        ));
        assert!(Dataset::new(x, DVector::from_vec(vec![0.5, 1.0])).check_finite().is_ok());
    }

    #[test]
    fn test_dataset_from_rows() {
        let rows = vec![vec!["a", "x"], vec!["b", "y"], vec!["a", "y"]];
        let dataset = Dataset::from_rows(&rows, vec![1u8, 0, 1]).unwrap();
        assert_eq!(dataset.nrows(), 3);
        assert_eq!(dataset.ncols(), 2);
        assert_eq!(dataset.x[(2, 1)], "y");
    }

    #[test]
    fn test_dataset_from_rows_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let result = Dataset::from_rows(&rows, vec![1.0, 2.0]);
        assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_dataset_formatting() {
        let x = DMatrix::from_row_slice(2, 2, &[1, 2, 3, 4]);
        let y = DVector::from_vec(vec![5, 6]);
        let dataset = Dataset::new(x, y);

        let dataset_str = format!("{:?}", dataset);

        let expected_str = "\
Dataset {
    x: [
        [1, 2, ],
        [3, 4, ],
    ],
    y: [5, 6, ]
}";

        assert_eq!(dataset_str, expected_str);
    }

    #[test]
    fn test_dataset_is_not_empty() {
        let x = DMatrix::from_row_slice(2, 2, &[1, 2, 3, 4]);
        let y = DVector::from_vec(vec![5, 6]);
        let dataset = Dataset::new(x, y);
        assert!(dataset.is_not_empty());

        let empty_x = DMatrix::<f64>::from_row_slice(0, 2, &[]);
        let empty_y = DVector::<f64>::from_vec(vec![]);
        let empty_dataset = Dataset::new(empty_x, empty_y);
        assert!(!empty_dataset.is_not_empty());
    }

    #[test]
    fn test_dataset_validate() {
        let empty = Dataset::new(DMatrix::<f64>::zeros(0, 3), DVector::<f64>::zeros(0));
        assert!(matches!(empty.validate(), Err(ModelError::EmptyDataset)));

        let mismatched = Dataset::new(
            DMatrix::from_row_slice(2, 1, &[1.0, 2.0]),
            DVector::from_vec(vec![1.0]),
        );
        assert!(matches!(
            mismatched.validate(),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_dataset_split_on_threshold() {
        let x = DMatrix::from_row_slice(4, 2, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let y = DVector::from_vec(vec![9, 10, 11, 12]);
        let dataset = Dataset::new(x, y);

        let (left_dataset, right_dataset) = dataset.split_on_threshold(0, 3);
        assert_eq!(left_dataset.x.nrows(), 2);
        assert_eq!(right_dataset.x.nrows(), 2);
        assert_eq!(left_dataset.y, DVector::from_vec(vec![9, 10]));
        assert_eq!(right_dataset.y, DVector::from_vec(vec![11, 12]));
    }

    #[test]
    fn test_dataset_split_on_threshold_left_empty() {
        let x = DMatrix::from_row_slice(4, 2, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let y = DVector::from_vec(vec![9, 10, 11, 12]);
        let dataset = Dataset::new(x, y);

        let (left_dataset, right_dataset) = dataset.split_on_threshold(0, -1);
        assert_eq!(left_dataset.x.nrows(), 0);
        assert_eq!(left_dataset.x.ncols(), 2);
        assert_eq!(right_dataset.x.nrows(), 4);
    }

    #[test]
    fn test_dataset_partition_by_value() {
        let rows = vec![
            vec!["old", "no"],
            vec!["young", "yes"],
            vec!["old", "yes"],
            vec!["middle", "no"],
        ];
        let dataset = Dataset::from_rows(&rows, vec!["a", "b", "c", "d"]).unwrap();

        let groups = dataset.partition_by_value(0);
        let values: Vec<_> = groups.iter().map(|(value, _)| *value).collect();
        assert_eq!(values, vec!["old", "young", "middle"]);
        assert_eq!(groups[0].1.y, DVector::from_vec(vec!["a", "c"]));
        assert_eq!(groups[2].1.nrows(), 1);
    }
}
