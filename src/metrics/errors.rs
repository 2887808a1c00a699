use nalgebra::DVector;

use crate::{
    data::dataset::RealNumber,
    error::{ModelError, Result},
};

fn check_lengths<T: RealNumber>(y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<T> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    T::from_usize(y_true.len())
        .ok_or_else(|| ModelError::Parse("Couldn't transform from usize".into()))
}

pub trait RegressionMetrics<T: RealNumber> {
    fn mse(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<T> {
        let n = check_lengths(y_true, y_pred)?;
        let errors = y_pred - y_true;
        let errors_sq = errors.component_mul(&errors);

        Ok(errors_sq.sum() / n)
    }

    fn mae(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<T> {
        let n = check_lengths(y_true, y_pred)?;
        let abs_errors_sum = y_pred
            .iter()
            .zip(y_true.iter())
            .map(|(&y_p, &y_t)| (y_p - y_t).abs())
            .fold(T::zero(), |acc, x| acc + x);

        Ok(abs_errors_sum / n)
    }

    fn r2(&self, y_true: &DVector<T>, y_pred: &DVector<T>) -> Result<T> {
        let n = check_lengths(y_true, y_pred)?;

        let y_true_mean = y_true.sum() / n;

        let y_true_mean_vec = DVector::from_element(y_true.len(), y_true_mean);

        let mse_model = self.mse(y_true, y_pred)?;
        let mse_base = self.mse(y_true, &y_true_mean_vec)?;

        Ok(T::one() - (mse_model / mse_base))
    }
}
