//! Climate normals: a per-month baseline taken from the years before a
//! reference year, and the deviation of a series from that baseline.

use crate::types::observation::{MonthlySample, MonthlyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default reference year. Samples strictly before it form the
/// pre-industrial baseline.
pub const START_INDUSTRIAL_PERIOD: i32 = 1900;

#[derive(Debug, Error, PartialEq)]
pub enum ClimateNormalError {
    #[error("No observations before {reference_year} for month {month}, the climate normal is undefined")]
    InsufficientData { month: u32, reference_year: i32 },
}

/// Mean value per calendar month over all samples before `reference_year`.
///
/// Months without a single qualifying sample are absent from the map rather
/// than defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateNormal {
    reference_year: i32,
    means: BTreeMap<u32, f64>,
}

impl ClimateNormal {
    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// The normal of `month` (1-12).
    pub fn mean(&self, month: u32) -> Result<f64, ClimateNormalError> {
        self.means
            .get(&month)
            .copied()
            .ok_or(ClimateNormalError::InsufficientData {
                month,
                reference_year: self.reference_year,
            })
    }

    pub fn get(&self, month: u32) -> Option<f64> {
        self.means.get(&month).copied()
    }

    /// Months that have a normal, ascending.
    pub fn months(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.means.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Fails with the first month (1-12) that has no normal.
    pub fn ensure_complete(&self) -> Result<(), ClimateNormalError> {
        (1..=12).try_for_each(|month| self.mean(month).map(|_| ()))
    }
}

/// Computes the per-month mean of every sample with `year < reference_year`.
/// Missing values count towards neither the sum nor the number of samples.
pub fn compute_normal<'a, T, I>(series: I, reference_year: i32) -> ClimateNormal
where
    T: MonthlySample + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut acc: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for sample in series {
        if sample.year() >= reference_year {
            continue;
        }
        if let Some(v) = sample.value() {
            let entry = acc.entry(sample.month()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }

    ClimateNormal {
        reference_year,
        means: acc
            .into_iter()
            .map(|(month, (sum, n))| (month, sum / n as f64))
            .collect(),
    }
}

/// Replaces every value by its difference from the month's normal.
///
/// Inner-join semantics: samples whose month has no normal are dropped.
/// Samples with a missing value stay missing.
pub fn deviation_from_normal<'a, T, I>(aggregated: I, normal: &ClimateNormal) -> Vec<MonthlyValue>
where
    T: MonthlySample + 'a,
    I: IntoIterator<Item = &'a T>,
{
    aggregated
        .into_iter()
        .filter_map(|sample| {
            let baseline = normal.get(sample.month())?;
            Some(MonthlyValue {
                year: sample.year(),
                month: sample.month(),
                value: sample.value().map(|v| v - baseline),
            })
        })
        .collect()
}

/// Mean per `(year, month)`, ordered chronologically. A month whose values
/// are all missing yields `value: None`.
pub fn monthly_means<'a, T, I>(series: I) -> Vec<MonthlyValue>
where
    T: MonthlySample + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut acc: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for sample in series {
        let entry = acc.entry((sample.year(), sample.month())).or_insert((0.0, 0));
        if let Some(v) = sample.value() {
            entry.0 += v;
            entry.1 += 1;
        }
    }
    acc.into_iter()
        .map(|((year, month), (sum, n))| MonthlyValue {
            year,
            month,
            value: (n > 0).then(|| sum / n as f64),
        })
        .collect()
}
