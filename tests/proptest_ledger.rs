use chrono::{Days, NaiveDate};
use mine_carbon_ledger::{
    aggregate, Activity, ElectricityActivity, EmissionCalculator, ExplosivesActivity,
    FugitiveActivity, FuelActivity, Granularity, GroupBy, ProjectStatus, ProjectType, RawEntry,
    SequestrationProject,
};
use proptest::prelude::*;
use proptest::test_runner::Config;

const LOCATIONS: [&str; 3] = ["Mine A", "Mine B", "Mine C"];

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("base date")
}

fn activity_strategy() -> impl Strategy<Value = Activity> {
    prop_oneof![
        (
            prop::sample::select(vec!["Diesel", "Natural Gas", "Heavy Fuel Oil", "Petrol"]),
            0.1_f64..100_000.0
        )
            .prop_map(|(fuel_type, quantity)| Activity::Fuel(FuelActivity {
                fuel_type: fuel_type.into(),
                quantity: Some(quantity),
                unit: "Litres".into(),
                equipment: None,
            })),
        (0.0_f64..=2.0, 0.1_f64..100_000.0).prop_map(|(grid_factor, consumption)| {
            Activity::Electricity(ElectricityActivity {
                consumption: Some(consumption),
                grid_factor: Some(grid_factor),
                source: "Grid".into(),
            })
        }),
        (
            prop::sample::select(vec!["Degree I", "Degree II", "Degree III"]),
            1.0_f64..500_000.0
        )
            .prop_map(|(degree, production)| Activity::Fugitive(FugitiveActivity {
                production: Some(production),
                degree: degree.into(),
                seam: None,
            })),
        (prop::sample::select(vec!["ANFO", "Emulsion", "Dynamite"]), 0.1_f64..10_000.0).prop_map(
            |(explosive_type, quantity)| Activity::Explosives(ExplosivesActivity {
                explosive_type: explosive_type.into(),
                quantity: Some(quantity),
                blast_area: "North Face".into(),
            })
        ),
    ]
}

fn entry_strategy() -> impl Strategy<Value = RawEntry> {
    (activity_strategy(), 0_u64..730, 0_usize..LOCATIONS.len()).prop_map(|(activity, offset, loc)| {
        RawEntry::new(
            base_date() + Days::new(offset),
            LOCATIONS[loc],
            activity,
            "operator-a",
        )
    })
}

proptest! {
    #![proptest_config(Config::with_cases(128))]
    #[test]
    fn valid_entries_never_compute_negative(entry in entry_strategy()) {
        let record = EmissionCalculator::default().compute(&entry).expect("valid entry");
        prop_assert!(record.emissions_tco2e >= 0.0);
        prop_assert!(record.emissions_tco2e.is_finite());
        prop_assert_eq!(record.category, entry.category());
    }

    #[test]
    fn aggregation_ignores_record_order(
        entries in prop::collection::vec(entry_strategy(), 0..40),
        rotate in 0_usize..40
    ) {
        let records = EmissionCalculator::default().compute_all(&entries).records;
        let mut shuffled = records.clone();
        shuffled.reverse();
        if !shuffled.is_empty() {
            let k = rotate % shuffled.len();
            shuffled.rotate_left(k);
        }
        for group_by in [
            GroupBy::Total,
            GroupBy::Category,
            GroupBy::Location,
            GroupBy::Period(Granularity::Month),
        ] {
            let a = aggregate(&records, group_by);
            let b = aggregate(&shuffled, group_by);
            prop_assert_eq!(a.total.to_bits(), b.total.to_bits());
            prop_assert_eq!(a.breakdown, b.breakdown);
        }
    }

    #[test]
    fn breakdown_sums_to_total(entries in prop::collection::vec(entry_strategy(), 1..40)) {
        let records = EmissionCalculator::default().compute_all(&entries).records;
        for group_by in [GroupBy::Category, GroupBy::Location, GroupBy::Scope] {
            let summary = aggregate(&records, group_by);
            let sum: f64 = summary.breakdown.values().sum();
            prop_assert!((sum - summary.total).abs() <= 1e-9 * summary.total.max(1.0));
        }
    }

    #[test]
    fn sequestration_grows_and_is_capped(
        area in 0.1_f64..10_000.0,
        rate in 0.0_f64..20.0,
        maturity_days in 1_u64..20_000,
        first in 0_u64..25_000,
        step in 0_u64..5_000
    ) {
        let planted = base_date();
        let project = SequestrationProject {
            id: "p".into(),
            name: "Property Project".into(),
            project_type: ProjectType::Wetland,
            area_hectares: area,
            rate_per_hectare_year: rate,
            planted_date: planted,
            expected_maturity_date: planted + Days::new(maturity_days),
            status: ProjectStatus::Active,
            investment: 0.0,
        };
        let projected = project.projected_total().expect("valid range");
        let earlier = project
            .current_sequestration(planted + Days::new(first))
            .expect("after planting");
        let later = project
            .current_sequestration(planted + Days::new(first + step))
            .expect("after planting");
        prop_assert!(earlier >= 0.0);
        prop_assert!(earlier <= later);
        prop_assert!(later <= projected);
    }
}
