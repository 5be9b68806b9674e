use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mine_carbon_ledger::scenario::category_fractions;
use mine_carbon_ledger::{
    aggregate, default_levers, format_emissions, simulate, trend, Activity, ElectricityActivity,
    EmissionCalculator, EngineConfig, EngineError, ExplosivesActivity, FugitiveActivity,
    FuelActivity, GroupBy, InMemoryRepository, Inventory, InventorySnapshot, ProjectStatus,
    ProjectType, ProjectionEngine, RawEntry, Scenario, SequestrationProject,
};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("invalid date {y}-{m}-{d}").into())
}

fn fuel(
    on: NaiveDate,
    location: &str,
    fuel_type: &str,
    quantity: f64,
    unit: &str,
    equipment: &str,
) -> RawEntry {
    RawEntry::new(
        on,
        location,
        Activity::Fuel(FuelActivity {
            fuel_type: fuel_type.to_string(),
            quantity: Some(quantity),
            unit: unit.to_string(),
            equipment: Some(equipment.to_string()),
        }),
        "operator-a",
    )
}

fn electricity(
    on: NaiveDate,
    location: &str,
    consumption: f64,
    grid_factor: f64,
    source: &str,
) -> RawEntry {
    RawEntry::new(
        on,
        location,
        Activity::Electricity(ElectricityActivity {
            consumption: Some(consumption),
            grid_factor: Some(grid_factor),
            source: source.to_string(),
        }),
        "operator-a",
    )
}

fn fugitive(on: NaiveDate, location: &str, production: f64, degree: &str, seam: &str) -> RawEntry {
    RawEntry::new(
        on,
        location,
        Activity::Fugitive(FugitiveActivity {
            production: Some(production),
            degree: degree.to_string(),
            seam: Some(seam.to_string()),
        }),
        "operator-b",
    )
}

fn explosives(
    on: NaiveDate,
    location: &str,
    explosive_type: &str,
    quantity: f64,
    blast_area: &str,
) -> RawEntry {
    RawEntry::new(
        on,
        location,
        Activity::Explosives(ExplosivesActivity {
            explosive_type: explosive_type.to_string(),
            quantity: Some(quantity),
            blast_area: blast_area.to_string(),
        }),
        "operator-b",
    )
}

fn sample_entries() -> Result<Vec<RawEntry>, Box<dyn Error>> {
    Ok(vec![
        fuel(date(2025, 6, 18)?, "Mine A", "Diesel", 6200.0, "Litres", "Hauler"),
        fuel(date(2025, 7, 19)?, "Mine A", "Diesel", 5600.0, "Litres", "Hauler"),
        fuel(date(2025, 8, 20)?, "Mine A", "Diesel", 5000.0, "Litres", "Excavator"),
        fuel(date(2025, 8, 21)?, "Mine B", "Natural Gas", 1200.0, "Cubic Meters", "Generator"),
        fuel(date(2025, 8, 22)?, "Mine A", "Diesel", 7500.0, "Litres", "Hauler"),
        fuel(date(2025, 8, 23)?, "Mine C", "Heavy Fuel Oil", 2500.0, "Litres", "Crusher"),
        fugitive(date(2025, 8, 15)?, "Mine A", 25000.0, "Degree II", "Upper Seam"),
        fugitive(date(2025, 8, 16)?, "Mine B", 28000.0, "Degree II", "Lower Seam"),
        fugitive(date(2025, 8, 17)?, "Mine A", 22000.0, "Degree III", "Deep Seam"),
        electricity(date(2025, 8, 20)?, "Mine A", 15000.0, 0.82, "Grid"),
        electricity(date(2025, 8, 21)?, "Mine B", 18500.0, 0.82, "Grid"),
        electricity(date(2025, 8, 22)?, "Mine C", 25000.0, 0.04, "Solar"),
        explosives(date(2025, 8, 18)?, "Mine A", "ANFO", 2500.0, "North Face"),
        explosives(date(2025, 8, 19)?, "Mine B", "Emulsion", 1800.0, "South Pit"),
    ])
}

fn sample_projects() -> Result<Vec<SequestrationProject>, Box<dyn Error>> {
    let project = |id: &str,
                   name: &str,
                   project_type: ProjectType,
                   (area_hectares, rate_per_hectare_year): (f64, f64),
                   (planted_date, expected_maturity_date): (NaiveDate, NaiveDate),
                   status: ProjectStatus| SequestrationProject {
        id: id.to_string(),
        name: name.to_string(),
        project_type,
        area_hectares,
        rate_per_hectare_year,
        planted_date,
        expected_maturity_date,
        status,
        investment: 0.0,
    };
    Ok(vec![
        project(
            "p-1",
            "West Ridge Afforestation",
            ProjectType::Afforestation,
            (50.0, 3.5),
            (date(2022, 3, 15)?, date(2042, 3, 15)?),
            ProjectStatus::Active,
        ),
        project(
            "p-2",
            "North Block Reclamation",
            ProjectType::Reclamation,
            (120.0, 4.1),
            (date(2021, 6, 1)?, date(2036, 6, 1)?),
            ProjectStatus::Active,
        ),
        project(
            "p-3",
            "Old Pit Grassland",
            ProjectType::Grassland,
            (75.0, 1.2),
            (date(2019, 4, 1)?, date(2024, 4, 1)?),
            ProjectStatus::Completed,
        ),
    ])
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let table = Arc::new(config.factor_table()?);
    info!(version = table.version(), factors = table.len(), "factor table loaded");

    let calculator = EmissionCalculator::new(table, config.factor_fallback);
    let mut inventory = Inventory::new(InMemoryRepository::default(), calculator);

    let entries = sample_entries()?;
    let outcome = inventory.import(entries.clone());
    for (id, err) in &outcome.rejected {
        warn!(entry = %id, error = %err, "entry rejected");
    }
    let records = inventory.records().records;

    println!("group,key,emissions");
    for group_by in [GroupBy::Category, GroupBy::Location, GroupBy::Scope] {
        let summary = aggregate(&records, group_by);
        for (key, value) in &summary.breakdown {
            println!("{group_by:?},{key},{}", format_emissions(*value));
        }
    }

    let series = trend(&records, config.default_granularity);
    let engine = ProjectionEngine::new(config.projection_window);
    match engine.project(&series, 6) {
        Ok(forecast) => {
            println!("period,forecast");
            for point in &forecast.points {
                println!("{},{}", point.period, format_emissions(point.forecast_value));
            }

            let scenario = Scenario {
                name: "Aggressive Electrification".to_string(),
                levers: default_levers(),
            };
            let shares = category_fractions(&records);
            let result = simulate(&forecast, &shares, &scenario, config.discount_rate)?;
            let irr = match result.financials.irr {
                Some(rate) => format!("{:.1}%", rate * 100.0),
                None => "N/A".to_string(),
            };
            println!(
                "scenario,{},abated,{},npv,{:.0},irr,{irr}",
                result.name,
                format_emissions(result.total_abated),
                result.financials.npv
            );
        }
        Err(EngineError::InsufficientHistory { points }) => {
            println!("forecast,not enough data ({points} period(s))");
        }
        Err(err) => return Err(err.into()),
    }

    let projects = sample_projects()?;
    let snapshot = InventorySnapshot::build(&entries, &records, &projects, date(2025, 8, 31)?)?;
    println!(
        "snapshot,total,{},sequestered,{},net,{}",
        format_emissions(snapshot.total_emissions),
        format_emissions(snapshot.sequestered_to_date),
        format_emissions(snapshot.net_balance)
    );

    Ok(())
}
