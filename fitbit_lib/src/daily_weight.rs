use itertools::Itertools;
use time::Date;

use crate::weight_timestamp::WeightMeasurement;

/// How one field of a day's measurements collapses to a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldReduction {
    Minimum,
    /// First value carried by any of the day's records, in file order.
    FirstInInputOrder,
}

impl FieldReduction {
    pub fn reduce(self, values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
        let mut values = values.into_iter().flatten();
        match self {
            Self::Minimum => values.reduce(f64::min),
            Self::FirstInInputOrder => values.next(),
        }
    }
}

/// Per-field reductions applied to each calendar day.
///
/// Each field is reduced on its own, so a day's `bmi` and `fat` need not come
/// from the record holding the minimum weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReductionPolicy {
    pub weight: FieldReduction,
    pub bmi: FieldReduction,
    pub fat: FieldReduction,
}

pub const FITBIT_DAILY_POLICY: DailyReductionPolicy = DailyReductionPolicy {
    weight: FieldReduction::Minimum,
    bmi: FieldReduction::FirstInInputOrder,
    fat: FieldReduction::FirstInInputOrder,
};

impl Default for DailyReductionPolicy {
    fn default() -> Self {
        FITBIT_DAILY_POLICY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyWeight {
    pub day: Date,
    pub weight: f64,
    pub bmi: Option<f64>,
    pub fat: Option<f64>,
}

impl DailyReductionPolicy {
    /// Collapse measurements, given in input order, to one record per day.
    /// The result is not sorted.
    #[must_use]
    pub fn aggregate(&self, measurements: &[WeightMeasurement]) -> Vec<DailyWeight> {
        measurements
            .iter()
            .into_group_map_by(|m| m.day())
            .into_iter()
            .filter_map(|(day, group)| {
                let weight = self.weight.reduce(group.iter().map(|m| Some(m.weight)))?;
                let bmi = self.bmi.reduce(group.iter().map(|m| m.bmi));
                let fat = self.fat.reduce(group.iter().map(|m| m.fat));
                Some(DailyWeight {
                    day,
                    weight,
                    bmi,
                    fat,
                })
            })
            .collect()
    }
}
