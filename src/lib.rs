//! # statlearn
//!
//! `statlearn` implements a handful of classical supervised-learning algorithms: a C4.5
//! decision tree for categorical data, a CART regression tree, binary logistic regression
//! and a conditional maximum-entropy model trained with BFGS.
//!
//! ## Example Usage
//!
//! Fitting a regression tree stump on a small dataset:
//!
//! ```rust
//! use statlearn::data::dataset::Dataset;
//! use statlearn::trees::{regressor::RegressionCart, TreeModel};
//! use nalgebra::{DMatrix, DVector};
//!
//! let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
//! let y = DVector::from_vec(vec![1.0, 1.2, 5.0, 5.2]);
//! let dataset = Dataset::new(x, y);
//!
//! let mut tree = RegressionCart::<f64>::with_params(Some(1)).unwrap();
//! tree.fit(&dataset).unwrap();
//!
//! let predictions = tree.predict(&DMatrix::from_row_slice(2, 1, &[1.5, 3.5])).unwrap();
//! assert!((predictions[0] - 1.1).abs() < 1e-9);
//! assert!((predictions[1] - 5.1).abs() < 1e-9);
//! ```

/// Dataset and data loading utilities
pub mod data;
/// Error type shared by every model
pub mod error;
/// Maximum-entropy classification
pub mod maxent;
/// Functions for evaluating model performance
pub mod metrics;
/// Regression analysis algorithms
pub mod regression;
/// Decision trees
pub mod trees;
