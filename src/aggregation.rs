use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::period::{Granularity, Period};
use crate::types::ComputedRecord;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Total,
    Category,
    Location,
    Scope,
    Period(Granularity),
}

impl GroupBy {
    fn key(&self, record: &ComputedRecord) -> String {
        match self {
            GroupBy::Total => "total".to_string(),
            GroupBy::Category => record.category.as_str().to_string(),
            GroupBy::Location => record.location.clone(),
            GroupBy::Scope => record.scope.as_str().to_string(),
            GroupBy::Period(g) => Period::containing(record.date, *g).label(),
        }
    }
}

/// Order-independent sum: values are sorted, then added with Neumaier
/// compensation, so any permutation of the input yields the same bits.
pub fn stable_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateSummary {
    pub group_by: GroupBy,
    pub total: f64,
    pub record_count: usize,
    pub breakdown: BTreeMap<String, f64>,
}

impl AggregateSummary {
    /// Percent of the total per key; empty when the total is zero.
    pub fn shares(&self) -> BTreeMap<String, f64> {
        if self.total <= 0.0 {
            return BTreeMap::new();
        }
        self.breakdown
            .iter()
            .map(|(k, v)| (k.clone(), v / self.total * 100.0))
            .collect()
    }

    pub fn get(&self, key: &str) -> f64 {
        self.breakdown.get(key).copied().unwrap_or(0.0)
    }
}

pub fn aggregate(records: &[ComputedRecord], group_by: GroupBy) -> AggregateSummary {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        groups.entry(group_by.key(r)).or_default().push(r.emissions_tco2e);
    }
    let breakdown = groups
        .into_iter()
        .map(|(k, values)| (k, stable_sum(values)))
        .collect();

    AggregateSummary {
        group_by,
        total: stable_sum(records.iter().map(|r| r.emissions_tco2e).collect()),
        record_count: records.len(),
        breakdown,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub period: Period,
    pub value: f64,
    pub cumulative: f64,
}

/// Per-period totals in chronological order. Periods without records are absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendSeries {
    pub granularity: Granularity,
    pub points: Vec<TrendPoint>,
}

impl TrendSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn trend(records: &[ComputedRecord], granularity: Granularity) -> TrendSeries {
    let mut buckets: BTreeMap<Period, Vec<f64>> = BTreeMap::new();
    for r in records {
        buckets
            .entry(Period::containing(r.date, granularity))
            .or_default()
            .push(r.emissions_tco2e);
    }

    let mut cumulative = 0.0;
    let points = buckets
        .into_iter()
        .map(|(period, values)| {
            let value = stable_sum(values);
            cumulative += value;
            TrendPoint {
                period,
                value,
                cumulative,
            }
        })
        .collect();

    TrendSeries { granularity, points }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntryStatistics {
    pub count: usize,
    pub total: f64,
    pub largest: f64,
    pub average: f64,
    pub zero_count: usize,
}

pub fn statistics(records: &[ComputedRecord]) -> EntryStatistics {
    if records.is_empty() {
        return EntryStatistics::default();
    }
    let total = stable_sum(records.iter().map(|r| r.emissions_tco2e).collect());
    let largest = records
        .iter()
        .map(|r| r.emissions_tco2e)
        .fold(0.0_f64, f64::max);
    EntryStatistics {
        count: records.len(),
        total,
        largest,
        average: total / records.len() as f64,
        zero_count: records.iter().filter(|r| r.emissions_tco2e == 0.0).count(),
    }
}
