use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sequestration::SequestrationProject;
use crate::types::{
    Activity, ElectricityActivity, ExplosivesActivity, FugitiveActivity, FuelActivity, RawEntry,
};

pub const FUEL_TYPES: [&str; 4] = ["Diesel", "Natural Gas", "Heavy Fuel Oil", "Petrol"];
pub const GASSINESS_DEGREES: [&str; 3] = ["Degree I", "Degree II", "Degree III"];
pub const EXPLOSIVE_TYPES: [&str; 3] = ["ANFO", "Emulsion", "Dynamite"];
pub const GRID_FACTOR_RANGE: (f64, f64) = (0.0, 2.0);

/// Field -> message for every violated rule. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        // Keep the first violation per field.
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

fn require_text(report: &mut ValidationReport, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        report.reject(field, format!("{label} is required"));
    }
}

fn require_number(
    report: &mut ValidationReport,
    field: &str,
    value: Option<f64>,
    label: &str,
) -> Option<f64> {
    match value {
        None => {
            report.reject(field, format!("{label} is required"));
            None
        }
        Some(v) if !v.is_finite() => {
            report.reject(field, format!("{label} must be a valid number"));
            None
        }
        Some(v) => Some(v),
    }
}

fn require_positive(report: &mut ValidationReport, field: &str, value: Option<f64>, label: &str) {
    if let Some(v) = require_number(report, field, value, label) {
        if v <= 0.0 {
            report.reject(field, format!("{label} must be greater than 0"));
        }
    }
}

fn require_one_of(
    report: &mut ValidationReport,
    field: &str,
    value: &str,
    allowed: &[&str],
    label: &str,
) {
    if value.trim().is_empty() {
        report.reject(field, format!("{label} is required"));
    } else if !allowed.contains(&value) {
        report.reject(field, format!("{label} must be one of: {}", allowed.join(", ")));
    }
}

/// Per-category rule set.
pub trait ActivityRules {
    fn check(&self, report: &mut ValidationReport);
}

impl ActivityRules for FuelActivity {
    fn check(&self, report: &mut ValidationReport) {
        require_one_of(report, "fuel_type", &self.fuel_type, &FUEL_TYPES, "Fuel type");
        require_positive(report, "quantity", self.quantity, "Quantity");
        require_text(report, "unit", &self.unit, "Unit");
    }
}

impl ActivityRules for ElectricityActivity {
    fn check(&self, report: &mut ValidationReport) {
        require_positive(report, "consumption", self.consumption, "Consumption");
        if let Some(g) = require_number(report, "grid_factor", self.grid_factor, "Grid factor") {
            let (lo, hi) = GRID_FACTOR_RANGE;
            if g < lo || g > hi {
                report.reject("grid_factor", "Grid factor must be between 0 and 2");
            }
        }
        require_text(report, "source", &self.source, "Source");
    }
}

impl ActivityRules for FugitiveActivity {
    fn check(&self, report: &mut ValidationReport) {
        if let Some(p) = require_number(report, "production", self.production, "Production") {
            if p < 1.0 {
                report.reject("production", "Production must be at least 1 tonne");
            }
        }
        require_one_of(report, "degree", &self.degree, &GASSINESS_DEGREES, "Mine gassiness degree");
    }
}

impl ActivityRules for ExplosivesActivity {
    fn check(&self, report: &mut ValidationReport) {
        require_one_of(
            report,
            "explosive_type",
            &self.explosive_type,
            &EXPLOSIVE_TYPES,
            "Explosive type",
        );
        require_positive(report, "quantity", self.quantity, "Quantity");
        require_text(report, "blast_area", &self.blast_area, "Blast area");
    }
}

impl ActivityRules for Activity {
    fn check(&self, report: &mut ValidationReport) {
        match self {
            Activity::Fuel(a) => a.check(report),
            Activity::Electricity(a) => a.check(report),
            Activity::Fugitive(a) => a.check(report),
            Activity::Explosives(a) => a.check(report),
        }
    }
}

/// Checks an entry against its category's rules. Collects every violation.
pub fn validate(entry: &RawEntry) -> ValidationReport {
    let mut report = ValidationReport::default();

    let location = entry.location.trim();
    if location.is_empty() {
        report.reject("location", "Location is required");
    } else if !(2..=100).contains(&location.chars().count()) {
        report.reject("location", "Location must be between 2 and 100 characters");
    }

    entry.activity.check(&mut report);
    report
}

pub fn validate_project(project: &SequestrationProject) -> ValidationReport {
    let mut report = ValidationReport::default();

    let name = project.name.trim();
    if name.is_empty() {
        report.reject("name", "Project name is required");
    } else if !(3..=100).contains(&name.chars().count()) {
        report.reject("name", "Project name must be between 3 and 100 characters");
    }
    if !(project.area_hectares.is_finite() && project.area_hectares > 0.0) {
        report.reject("area_hectares", "Area must be greater than 0");
    }
    if !(project.rate_per_hectare_year.is_finite() && project.rate_per_hectare_year > 0.0) {
        report.reject("rate_per_hectare_year", "Sequestration rate must be greater than 0");
    }
    if !(project.investment.is_finite() && project.investment >= 0.0) {
        report.reject("investment", "Investment cannot be negative");
    }
    if project.expected_maturity_date <= project.planted_date {
        report.reject(
            "expected_maturity_date",
            "Expected maturity date must be after the planting date",
        );
    }
    report
}
