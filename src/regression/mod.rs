/// Binary logistic regression
pub mod logistic;
