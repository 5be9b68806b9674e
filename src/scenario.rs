use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregation::stable_sum;
use crate::error::EngineError;
use crate::period::{Granularity, Period};
use crate::projection::Forecast;
use crate::types::{Category, ComputedRecord};
use crate::validation::ValidationReport;

/// A decarbonisation measure that cuts one category's emissions by a fixed fraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MitigationLever {
    pub name: String,
    pub category: Category,
    /// Fraction of the category's emissions removed, in [0, 1].
    pub reduction: f64,
    /// Forecast periods before the lever takes effect.
    #[serde(default)]
    pub start_offset: u32,
    pub upfront_cost: f64,
    pub annual_savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub levers: Vec<MitigationLever>,
}

/// Lever catalogue offered by the scenario builder.
pub fn default_levers() -> Vec<MitigationLever> {
    vec![
        MitigationLever {
            name: "Fleet Electrification".into(),
            category: Category::Fuel,
            reduction: 0.40,
            start_offset: 0,
            upfront_cost: 5_000_000.0,
            annual_savings: 1_200_000.0,
        },
        MitigationLever {
            name: "Renewable Adoption".into(),
            category: Category::Electricity,
            reduction: 0.60,
            start_offset: 0,
            upfront_cost: 0.0,
            annual_savings: 600_000.0,
        },
        MitigationLever {
            name: "Methane Capture".into(),
            category: Category::Fugitive,
            reduction: 0.50,
            start_offset: 0,
            upfront_cost: 2_500_000.0,
            annual_savings: 800_000.0,
        },
        MitigationLever {
            name: "Operational Efficiency".into(),
            category: Category::Fuel,
            reduction: 0.05,
            start_offset: 0,
            upfront_cost: 150_000.0,
            annual_savings: 250_000.0,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioPoint {
    pub period: Period,
    pub baseline: f64,
    pub scenario: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialSummary {
    pub upfront_cost: f64,
    pub annual_savings: f64,
    pub npv: f64,
    /// Discount rate at which the NPV is zero; absent when no such rate exists in
    /// (-99%, 1000%].
    pub irr: Option<f64>,
    /// Years until savings repay the upfront cost; absent without savings.
    pub simple_payback_years: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioOutcome {
    pub name: String,
    pub points: Vec<ScenarioPoint>,
    pub total_abated: f64,
    pub financials: FinancialSummary,
}

/// Fraction of total emissions contributed by each category.
pub fn category_fractions(records: &[ComputedRecord]) -> BTreeMap<Category, f64> {
    let total = stable_sum(records.iter().map(|r| r.emissions_tco2e).collect());
    if total <= 0.0 {
        return BTreeMap::new();
    }
    Category::ALL
        .iter()
        .filter_map(|c| {
            let values: Vec<f64> = records
                .iter()
                .filter(|r| r.category == *c)
                .map(|r| r.emissions_tco2e)
                .collect();
            if values.is_empty() {
                None
            } else {
                Some((*c, stable_sum(values) / total))
            }
        })
        .collect()
}

fn periods_per_year(granularity: Granularity) -> f64 {
    match granularity {
        Granularity::Day => 365.0,
        Granularity::Week => 52.0,
        Granularity::Month => 12.0,
        Granularity::Quarter => 4.0,
        Granularity::Year => 1.0,
    }
}

const SHARE_TOLERANCE: f64 = 1e-9;

fn check_inputs(
    scenario: &Scenario,
    category_shares: &BTreeMap<Category, f64>,
    discount_rate: f64,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    if !discount_rate.is_finite() || discount_rate <= -1.0 {
        report.reject("discount_rate", "Discount rate must be greater than -1");
    }
    for (category, share) in category_shares {
        if !(share.is_finite() && (0.0..=1.0).contains(share)) {
            report.reject(&format!("shares[{category}]"), "Share must be between 0 and 1");
        }
    }
    if report.is_valid() && category_shares.values().sum::<f64>() > 1.0 + SHARE_TOLERANCE {
        report.reject("shares", "Category shares must not sum to more than 1");
    }
    for (i, lever) in scenario.levers.iter().enumerate() {
        if !(0.0..=1.0).contains(&lever.reduction) {
            report.reject(&format!("levers[{i}].reduction"), "Reduction must be between 0 and 1");
        }
        if !(lever.upfront_cost.is_finite() && lever.upfront_cost >= 0.0) {
            report.reject(&format!("levers[{i}].upfront_cost"), "Upfront cost cannot be negative");
        }
        if !(lever.annual_savings.is_finite() && lever.annual_savings >= 0.0) {
            report.reject(
                &format!("levers[{i}].annual_savings"),
                "Annual savings cannot be negative",
            );
        }
    }
    report
}

fn net_present_value(upfront_cost: f64, annual_savings: f64, years: u32, rate: f64) -> f64 {
    let discounted: f64 = (1..=years)
        .map(|t| annual_savings / (1.0 + rate).powi(t as i32))
        .sum();
    discounted - upfront_cost
}

const IRR_BRACKET: (f64, f64) = (-0.99, 10.0);
const IRR_ITERATIONS: usize = 200;

/// Bisection on the NPV, which falls monotonically as the rate rises for an upfront
/// outlay followed by constant savings.
fn internal_rate_of_return(upfront_cost: f64, annual_savings: f64, years: u32) -> Option<f64> {
    if upfront_cost <= 0.0 || annual_savings <= 0.0 || years == 0 {
        return None;
    }
    let npv = |rate| net_present_value(upfront_cost, annual_savings, years, rate);
    let (mut lo, mut hi) = IRR_BRACKET;
    if npv(lo) < 0.0 || npv(hi) > 0.0 {
        return None;
    }
    for _ in 0..IRR_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if npv(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 {
            break;
        }
    }
    Some((lo + hi) / 2.0)
}

fn financials(scenario: &Scenario, horizon_years: u32, discount_rate: f64) -> FinancialSummary {
    let upfront_cost: f64 = scenario.levers.iter().map(|l| l.upfront_cost).sum();
    let annual_savings: f64 = scenario.levers.iter().map(|l| l.annual_savings).sum();
    FinancialSummary {
        upfront_cost,
        annual_savings,
        npv: net_present_value(upfront_cost, annual_savings, horizon_years, discount_rate),
        irr: internal_rate_of_return(upfront_cost, annual_savings, horizon_years),
        simple_payback_years: (annual_savings > 0.0).then(|| upfront_cost / annual_savings),
    }
}

/// Applies the scenario's levers to a baseline forecast. Each category's share
/// of a period is cut by `1 - prod(1 - r)` over its levers active in that period;
/// the unattributed remainder of the baseline is left untouched.
pub fn simulate(
    baseline: &Forecast,
    category_shares: &BTreeMap<Category, f64>,
    scenario: &Scenario,
    discount_rate: f64,
) -> Result<ScenarioOutcome, EngineError> {
    let report = check_inputs(scenario, category_shares, discount_rate);
    if !report.is_valid() {
        return Err(EngineError::ValidationFailed(report));
    }

    let attributed: f64 = category_shares.values().sum();
    let unattributed = (1.0 - attributed).max(0.0);

    let points: Vec<ScenarioPoint> = baseline
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut remaining = unattributed;
            for (category, share) in category_shares {
                let kept: f64 = scenario
                    .levers
                    .iter()
                    .filter(|l| l.category == *category && (i as u32) >= l.start_offset)
                    .map(|l| 1.0 - l.reduction)
                    .product();
                remaining += share * kept;
            }
            ScenarioPoint {
                period: p.period,
                baseline: p.forecast_value,
                scenario: p.forecast_value * remaining,
            }
        })
        .collect();

    let total_abated = stable_sum(points.iter().map(|p| p.baseline - p.scenario).collect());
    let horizon_years = match baseline.points.first() {
        Some(first) => {
            let per_year = periods_per_year(first.period.granularity);
            (baseline.points.len() as f64 / per_year).ceil() as u32
        }
        None => 0,
    };

    Ok(ScenarioOutcome {
        name: scenario.name.clone(),
        points,
        total_abated,
        financials: financials(scenario, horizon_years, discount_rate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{ForecastPoint, METHOD_LINEAR_LEAST_SQUARES};
    use chrono::NaiveDate;

    fn flat_baseline(periods: u32, value: f64) -> Forecast {
        let start = Period::containing(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            Granularity::Year,
        );
        Forecast {
            method: METHOD_LINEAR_LEAST_SQUARES.into(),
            slope_per_period: 0.0,
            points: (0..periods)
                .map(|k| ForecastPoint {
                    period: start.advance(k).unwrap(),
                    forecast_value: value,
                })
                .collect(),
        }
    }

    fn lever(category: Category, reduction: f64, start_offset: u32) -> MitigationLever {
        MitigationLever {
            name: "test".into(),
            category,
            reduction,
            start_offset,
            upfront_cost: 100.0,
            annual_savings: 50.0,
        }
    }

    #[test]
    fn test_no_levers_matches_baseline() {
        let shares = BTreeMap::from([(Category::Fuel, 0.7), (Category::Electricity, 0.3)]);
        let scenario = Scenario {
            name: "Business as Usual".into(),
            levers: vec![],
        };
        let outcome = simulate(&flat_baseline(3, 1000.0), &shares, &scenario, 0.08).unwrap();
        assert!(outcome.points.iter().all(|p| (p.scenario - p.baseline).abs() < 1e-9));
        assert!(outcome.total_abated.abs() < 1e-9);
        assert_eq!(outcome.financials.simple_payback_years, None);
    }

    #[test]
    fn test_levers_cut_their_category() {
        let shares = BTreeMap::from([(Category::Fuel, 0.5), (Category::Electricity, 0.5)]);
        let scenario = Scenario {
            name: "Aggressive Electrification".into(),
            levers: vec![lever(Category::Fuel, 0.4, 0), lever(Category::Fuel, 0.5, 1)],
        };
        let outcome = simulate(&flat_baseline(2, 1000.0), &shares, &scenario, 0.0).unwrap();
        // Period 0: fuel 500 * 0.6 = 300, electricity 500.
        assert!((outcome.points[0].scenario - 800.0).abs() < 1e-9);
        // Period 1: fuel 500 * 0.6 * 0.5 = 150.
        assert!((outcome.points[1].scenario - 650.0).abs() < 1e-9);
        assert!((outcome.total_abated - 550.0).abs() < 1e-9);
    }

    #[test]
    fn test_financials() {
        let shares = BTreeMap::from([(Category::Fuel, 1.0)]);
        let scenario = Scenario {
            name: "s".into(),
            levers: vec![lever(Category::Fuel, 0.1, 0)],
        };
        let outcome = simulate(&flat_baseline(2, 10.0), &shares, &scenario, 0.0).unwrap();
        assert_eq!(outcome.financials.npv, 0.0);
        assert_eq!(outcome.financials.simple_payback_years, Some(2.0));

        let discounted = simulate(&flat_baseline(2, 10.0), &shares, &scenario, 0.1).unwrap();
        let expected = 50.0 / 1.1 + 50.0 / 1.21 - 100.0;
        assert!((discounted.financials.npv - expected).abs() < 1e-9);
        // Two years of 50 exactly repay 100 undiscounted.
        assert!(discounted.financials.irr.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let irr = internal_rate_of_return(100.0, 60.0, 2).unwrap();
        assert!(irr > 0.13 && irr < 0.131);
        assert!(net_present_value(100.0, 60.0, 2, irr).abs() < 1e-6);

        // Savings that never repay the outlay give a negative rate.
        let losing = internal_rate_of_return(100.0, 10.0, 2).unwrap();
        assert!(losing < -0.62 && losing > -0.64);
        assert_eq!(internal_rate_of_return(0.0, 10.0, 2), None);
        assert_eq!(internal_rate_of_return(100.0, 10.0, 0), None);
    }

    #[test]
    fn test_rejects_bad_levers() {
        let scenario = Scenario {
            name: "bad".into(),
            levers: vec![lever(Category::Fuel, 1.5, 0)],
        };
        let err = simulate(&flat_baseline(1, 1.0), &BTreeMap::new(), &scenario, -1.0).unwrap_err();
        match err {
            EngineError::ValidationFailed(report) => {
                assert!(report.get("levers[0].reduction").is_some());
                assert!(report.get("discount_rate").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_default_catalogue_is_valid() {
        let scenario = Scenario {
            name: "all".into(),
            levers: default_levers(),
        };
        let shares = BTreeMap::from([(Category::Fuel, 0.6), (Category::Electricity, 0.4)]);
        assert!(check_inputs(&scenario, &shares, 0.08).is_valid());
    }

    #[test]
    fn test_rejects_out_of_range_shares() {
        let scenario = Scenario {
            name: "Business as Usual".into(),
            levers: vec![],
        };
        let shares = BTreeMap::from([(Category::Fuel, 1.5), (Category::Electricity, -0.2)]);
        match simulate(&flat_baseline(3, 8.04), &shares, &scenario, 0.08).unwrap_err() {
            EngineError::ValidationFailed(report) => {
                assert!(report.get("shares[Fuel]").is_some());
                assert!(report.get("shares[Electricity]").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let nan = BTreeMap::from([(Category::Fugitive, f64::NAN)]);
        assert!(simulate(&flat_baseline(1, 1.0), &nan, &scenario, 0.08).is_err());
    }

    #[test]
    fn test_rejects_shares_over_one() {
        let scenario = Scenario {
            name: "s".into(),
            levers: vec![],
        };
        let shares = BTreeMap::from([(Category::Fuel, 0.7), (Category::Electricity, 0.6)]);
        match simulate(&flat_baseline(1, 1.0), &shares, &scenario, 0.08).unwrap_err() {
            EngineError::ValidationFailed(report) => assert!(report.get("shares").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
