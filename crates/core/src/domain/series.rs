use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ascending, one observation per date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingSeries {
    observations: Vec<Observation>,
}

impl TrainingSeries {
    /// Builds a series from raw rows, summing rows that share a date.
    pub fn from_observations<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut by_date = BTreeMap::<NaiveDate, f64>::new();
        for row in rows {
            *by_date.entry(row.date).or_insert(0.0) += row.value;
        }

        Self {
            observations: by_date
                .into_iter()
                .map(|(date, value)| Observation { date, value })
                .collect(),
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.observations.iter().map(|o| o.date)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|o| o.value)
    }

    /// Copy of the observations within `[start, end]`; an open bound is unbounded.
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let observations = self
            .observations
            .iter()
            .filter(|o| start.map_or(true, |s| o.date >= s))
            .filter(|o| end.map_or(true, |e| o.date <= e))
            .copied()
            .collect();
        Self { observations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(y: i32, m: u32, d: u32, value: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            value,
        }
    }

    #[test]
    fn duplicate_dates_are_summed() {
        let series = TrainingSeries::from_observations([
            obs(2024, 1, 7, 100.0),
            obs(2024, 1, 7, 50.0),
            obs(2024, 1, 14, 120.0),
        ]);
        assert_eq!(
            series.observations(),
            &[obs(2024, 1, 7, 150.0), obs(2024, 1, 14, 120.0)]
        );
    }

    #[test]
    fn output_is_sorted_ascending() {
        let series = TrainingSeries::from_observations([
            obs(2024, 3, 3, 1.0),
            obs(2024, 1, 7, 2.0),
            obs(2024, 2, 4, 3.0),
            obs(2024, 1, 7, 4.0),
        ]);
        let dates: Vec<_> = series.dates().collect();
        let mut sorted = dates.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(dates, sorted);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn between_is_inclusive_and_open_ended() {
        let series = TrainingSeries::from_observations([
            obs(2024, 1, 7, 1.0),
            obs(2024, 1, 14, 2.0),
            obs(2024, 1, 21, 3.0),
        ]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 14);
        assert_eq!(series.between(start, start).len(), 1);
        assert_eq!(series.between(start, None).len(), 2);
        assert_eq!(series.between(None, None), series);
        assert!(series.between(NaiveDate::from_ymd_opt(2025, 1, 1), None).is_empty());
    }
}
