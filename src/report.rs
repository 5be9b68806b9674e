use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregation::{aggregate, stable_sum, statistics, EntryStatistics, GroupBy};
use crate::error::EngineError;
use crate::sequestration::{portfolio, SequestrationProject};
use crate::types::{Activity, ComputedRecord, EntryId, RawEntry};

/// Dashboard KPIs for one set of records and projects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySnapshot {
    pub as_of: NaiveDate,
    pub total_emissions: f64,
    pub by_scope: BTreeMap<String, f64>,
    pub by_category: BTreeMap<String, f64>,
    pub sequestered_to_date: f64,
    /// Emissions minus sequestration; negative means net removal.
    pub net_balance: f64,
    /// tCO2e per tonne of coal produced.
    pub emission_intensity: Option<f64>,
    pub statistics: EntryStatistics,
}

/// Tonnes of coal reported by fugitive-methane entries that produced a record.
/// Rejected entries are not counted.
pub fn coal_production(entries: &[RawEntry], records: &[ComputedRecord]) -> f64 {
    let computed: BTreeSet<&EntryId> = records.iter().map(|r| &r.raw_entry_id).collect();
    stable_sum(
        entries
            .iter()
            .filter(|e| computed.contains(&e.id))
            .filter_map(|e| match &e.activity {
                Activity::Fugitive(f) => f.production,
                _ => None,
            })
            .collect(),
    )
}

impl InventorySnapshot {
    pub fn build(
        entries: &[RawEntry],
        records: &[ComputedRecord],
        projects: &[SequestrationProject],
        as_of: NaiveDate,
    ) -> Result<Self, EngineError> {
        let total = aggregate(records, GroupBy::Total).total;
        let sequestered = portfolio(projects, as_of)?.sequestered_to_date;
        let production = coal_production(entries, records);

        Ok(InventorySnapshot {
            as_of,
            total_emissions: total,
            by_scope: aggregate(records, GroupBy::Scope).breakdown,
            by_category: aggregate(records, GroupBy::Category).breakdown,
            sequestered_to_date: sequestered,
            net_balance: total - sequestered,
            emission_intensity: (production > 0.0).then(|| total / production),
            statistics: statistics(records),
        })
    }
}

/// Presentation-time rendering of a tCO2e value. This is the only place values are rounded.
pub fn format_emissions(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }
    let magnitude = value.abs();
    // Two decimals for anything below 10, negatives included.
    let decimals: usize = if value < 10.0 { 2 } else { 1 };
    let (scaled, suffix) = if magnitude >= 1e9 {
        (value / 1e9, "B")
    } else if magnitude >= 1e6 {
        (value / 1e6, "M")
    } else if magnitude >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    format!("{scaled:.decimals$}{suffix} tCO₂e")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::EmissionCalculator;
    use crate::sequestration::{ProjectStatus, ProjectType};
    use crate::types::{ElectricityActivity, FugitiveActivity, FuelActivity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_emissions() {
        assert_eq!(format_emissions(13.4), "13.4 tCO₂e");
        assert_eq!(format_emissions(2.5), "2.50 tCO₂e");
        assert_eq!(format_emissions(1_240_000.0), "1.2M tCO₂e");
        assert_eq!(format_emissions(-890_000.0), "-890.00K tCO₂e");
        assert_eq!(format_emissions(-3.5), "-3.50 tCO₂e");
        assert_eq!(format_emissions(12.0), "12.0 tCO₂e");
        assert_eq!(format_emissions(f64::NAN), "N/A");
    }

    #[test]
    fn test_snapshot() {
        let entries = vec![
            RawEntry::new(
                date(2025, 8, 20),
                "Mine A",
                Activity::Fuel(FuelActivity {
                    fuel_type: "Diesel".into(),
                    quantity: Some(5000.0),
                    unit: "Litres".into(),
                    equipment: None,
                }),
                "operator-a",
            ),
            RawEntry::new(
                date(2025, 8, 20),
                "Mine A",
                Activity::Electricity(ElectricityActivity {
                    consumption: Some(15000.0),
                    grid_factor: Some(0.82),
                    source: "Grid".into(),
                }),
                "operator-a",
            ),
            RawEntry::new(
                date(2025, 8, 15),
                "Mine A",
                Activity::Fugitive(FugitiveActivity {
                    production: Some(25000.0),
                    degree: "Degree II".into(),
                    seam: Some("Upper Seam".into()),
                }),
                "operator-a",
            ),
        ];
        let outcome = EmissionCalculator::default().compute_all(&entries);
        assert!(outcome.failures.is_empty());

        let project = SequestrationProject {
            id: "p-1".into(),
            name: "West Ridge Afforestation".into(),
            project_type: ProjectType::Afforestation,
            area_hectares: 50.0,
            rate_per_hectare_year: 3.5,
            planted_date: date(2022, 3, 15),
            expected_maturity_date: date(2032, 3, 15),
            status: ProjectStatus::Active,
            investment: 0.0,
        };

        let snapshot = InventorySnapshot::build(
            &entries,
            &outcome.records,
            &[project],
            date(2023, 3, 15),
        )
        .unwrap();
        // 13.4 + 12.3 + 45.0
        assert!((snapshot.total_emissions - 70.7).abs() < 1e-9);
        assert!((snapshot.by_scope["Scope 2"] - 12.3).abs() < 1e-9);
        assert_eq!(snapshot.sequestered_to_date, 175.0);
        assert!((snapshot.net_balance - (70.7 - 175.0)).abs() < 1e-9);
        let intensity = snapshot.emission_intensity.unwrap();
        assert!((intensity - 70.7 / 25000.0).abs() < 1e-12);
        assert_eq!(snapshot.statistics.count, 3);
    }

    #[test]
    fn test_intensity_ignores_rejected_entries() {
        let methane = |degree: &str, production: f64| {
            RawEntry::new(
                date(2025, 8, 15),
                "Mine A",
                Activity::Fugitive(FugitiveActivity {
                    production: Some(production),
                    degree: degree.into(),
                    seam: None,
                }),
                "operator-b",
            )
        };
        let entries = vec![methane("Degree II", 25000.0), methane("Degree IV", 75000.0)];
        let outcome = EmissionCalculator::default().compute_all(&entries);
        assert_eq!(outcome.failures.len(), 1);

        assert_eq!(coal_production(&entries, &outcome.records), 25000.0);
        let snapshot =
            InventorySnapshot::build(&entries, &outcome.records, &[], date(2025, 8, 31)).unwrap();
        let intensity = snapshot.emission_intensity.unwrap();
        assert!((intensity - 0.0018).abs() < 1e-12);
    }

    #[test]
    fn test_no_production_no_intensity() {
        let snapshot = InventorySnapshot::build(&[], &[], &[], date(2025, 1, 1)).unwrap();
        assert_eq!(snapshot.total_emissions, 0.0);
        assert_eq!(snapshot.emission_intensity, None);
    }
}
