//! Impurity and error measures used to rank candidate splits.
//!
//! Everything here is a pure function of its inputs, so both tree builders share it.

use crate::data::dataset::{Category, RealNumber};
use std::collections::HashMap;
use std::hash::Hash;

/// Counts every distinct value, keeping the order in which the values were first seen.
fn counts<'a, T, I>(values: I) -> Vec<(&'a T, usize)>
where
    T: Eq + Hash + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut positions: HashMap<&T, usize> = HashMap::new();
    let mut counts: Vec<(&T, usize)> = Vec::new();
    for value in values {
        match positions.get(value) {
            Some(&position) => counts[position].1 += 1,
            None => {
                positions.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }
    counts
}

fn entropy_of_counts<'a, T: 'a>(counts: Vec<(&'a T, usize)>, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .into_iter()
        .map(|(_, count)| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Base-2 entropy of the empirical distribution of `labels`. Zero for an empty slice.
pub fn entropy<T: Eq + Hash>(labels: &[T]) -> f64 {
    entropy_of_counts(counts(labels), labels.len())
}

/// Entropy of `labels` conditioned on the parallel attribute `values`.
///
/// Groups are summed in the order their value is first seen, so equal inputs give bit-identical
/// results.
pub fn conditional_entropy<XT: Eq + Hash, YT: Eq + Hash>(values: &[XT], labels: &[YT]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let mut positions: HashMap<&XT, usize> = HashMap::new();
    let mut groups: Vec<Vec<&YT>> = Vec::new();
    for (value, label) in values.iter().zip(labels) {
        match positions.get(value) {
            Some(&position) => groups[position].push(label),
            None => {
                positions.insert(value, groups.len());
                groups.push(vec![label]);
            }
        }
    }

    let total = labels.len() as f64;
    groups
        .iter()
        .map(|group| {
            let weight = group.len() as f64 / total;
            weight * entropy_of_counts(counts(group.iter().copied()), group.len())
        })
        .sum()
}

/// Split information: the entropy of the attribute's own value distribution.
pub fn intrinsic_value<XT: Eq + Hash>(values: &[XT]) -> f64 {
    entropy(values)
}

pub fn information_gain<XT: Eq + Hash, YT: Eq + Hash>(values: &[XT], labels: &[YT]) -> f64 {
    entropy(labels) - conditional_entropy(values, labels)
}

/// Information gain normalised by the intrinsic value of the attribute.
///
/// Returns `None` when the attribute takes a single value, since the ratio is undefined there.
pub fn information_gain_ratio<XT: Eq + Hash, YT: Eq + Hash>(
    values: &[XT],
    labels: &[YT],
) -> Option<f64> {
    let intrinsic = intrinsic_value(values);
    if intrinsic <= 0.0 {
        return None;
    }
    Some(information_gain(values, labels) / intrinsic)
}

/// Most frequent label. Ties go to the label seen first. `None` for an empty slice.
pub fn majority_label<T: Category>(labels: &[T]) -> Option<T> {
    let mut best: Option<(&T, usize)> = None;
    for (label, count) in counts(labels) {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.clone())
}

pub fn mean<T: RealNumber>(labels: &[T]) -> T {
    let sum = labels.iter().fold(T::zero(), |acc, &y| acc + y);
    sum / T::from_usize(labels.len()).unwrap_or_else(T::one)
}

/// Residual sum of squares around the mean.
pub fn squared_error<T: RealNumber>(labels: &[T]) -> f64 {
    let mut accumulator = SquaredErrorAccumulator::new();
    labels
        .iter()
        .for_each(|y| accumulator.push(y.to_f64().unwrap_or(f64::NAN)));
    accumulator.squared_error()
}

/// Running squared error using Welford's update, so that sweeping a sorted column costs O(1)
/// per candidate split without the cancellation of `sum(y^2) - n * mean^2`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SquaredErrorAccumulator {
    count: usize,
    mean: f64,
    m2: f64,
}

impl SquaredErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, y: f64) {
        self.count += 1;
        let delta = y - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (y - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn squared_error(&self) -> f64 {
        self.m2
    }
}
