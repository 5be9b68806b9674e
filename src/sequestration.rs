use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProjectType {
    Afforestation,
    Reclamation,
    Grassland,
    Wetland,
}

/// Lifecycle of a carbon-sink project. Moves forward only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProjectStatus {
    Planning,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequestrationProject {
    pub id: String,
    pub name: String,
    pub project_type: ProjectType,
    pub area_hectares: f64,
    /// tCO2 per hectare per year.
    pub rate_per_hectare_year: f64,
    pub planted_date: NaiveDate,
    pub expected_maturity_date: NaiveDate,
    pub status: ProjectStatus,
    pub investment: f64,
}

fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(years.checked_mul(12)?))
}

/// Whole anniversaries from `from` to `to` plus the elapsed fraction of the
/// current anniversary year. Zero when `to` precedes `from`.
pub fn years_elapsed(from: NaiveDate, to: NaiveDate) -> f64 {
    if to <= from {
        return 0.0;
    }
    let mut whole = 0_u32;
    let mut anchor = from;
    while let Some(next) = add_years(from, whole + 1) {
        if next > to {
            let span = (next - anchor).num_days() as f64;
            let into = (to - anchor).num_days() as f64;
            return f64::from(whole) + into / span;
        }
        whole += 1;
        anchor = next;
    }
    f64::from(whole)
}

impl SequestrationProject {
    fn annual_rate(&self) -> f64 {
        self.area_hectares * self.rate_per_hectare_year
    }

    fn maturity_years(&self) -> Result<f64, EngineError> {
        if self.expected_maturity_date <= self.planted_date {
            return Err(EngineError::InvalidDateRange(
                "expected maturity date must be after the planting date",
            ));
        }
        Ok(years_elapsed(self.planted_date, self.expected_maturity_date))
    }

    /// Total tCO2 sequestered by the time the project matures.
    pub fn projected_total(&self) -> Result<f64, EngineError> {
        Ok(self.annual_rate() * self.maturity_years()?)
    }

    /// tCO2 sequestered from planting up to `as_of`, capped at the projected total.
    pub fn current_sequestration(&self, as_of: NaiveDate) -> Result<f64, EngineError> {
        let projected = self.projected_total()?;
        if as_of < self.planted_date {
            return Err(EngineError::InvalidDateRange(
                "as-of date precedes the planting date",
            ));
        }
        let current = self.annual_rate() * years_elapsed(self.planted_date, as_of);
        Ok(current.min(projected).max(0.0))
    }

    /// Explicit start action: Planning -> Active.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.status != ProjectStatus::Planning {
            return Err(EngineError::InvalidStatusTransition {
                from: self.status,
                to: ProjectStatus::Active,
            });
        }
        self.status = ProjectStatus::Active;
        Ok(())
    }

    /// Active -> Completed, allowed once the project has reached maturity.
    pub fn complete(&mut self, as_of: NaiveDate) -> Result<(), EngineError> {
        if self.status != ProjectStatus::Active || as_of < self.expected_maturity_date {
            return Err(EngineError::InvalidStatusTransition {
                from: self.status,
                to: ProjectStatus::Completed,
            });
        }
        self.status = ProjectStatus::Completed;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    pub project_count: usize,
    pub active_count: usize,
    pub total_area_hectares: f64,
    pub total_investment: f64,
    pub sequestered_to_date: f64,
    pub projected_total: f64,
    /// Investment per projected tonne; absent when nothing is projected.
    pub cost_per_tonne: Option<f64>,
}

/// Portfolio totals as of `as_of`. Projects not yet planted count as zero
/// sequestered; projects with an invalid date range fail the whole summary.
pub fn portfolio(
    projects: &[SequestrationProject],
    as_of: NaiveDate,
) -> Result<PortfolioSummary, EngineError> {
    let mut summary = PortfolioSummary {
        project_count: projects.len(),
        ..PortfolioSummary::default()
    };
    for p in projects {
        if p.status == ProjectStatus::Active {
            summary.active_count += 1;
        }
        summary.total_area_hectares += p.area_hectares;
        summary.total_investment += p.investment;
        summary.projected_total += p.projected_total()?;
        if as_of >= p.planted_date {
            summary.sequestered_to_date += p.current_sequestration(as_of)?;
        }
    }
    if summary.projected_total > 0.0 {
        summary.cost_per_tonne = Some(summary.total_investment / summary.projected_total);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn west_ridge() -> SequestrationProject {
        SequestrationProject {
            id: "p-1".into(),
            name: "West Ridge Afforestation".into(),
            project_type: ProjectType::Afforestation,
            area_hectares: 50.0,
            rate_per_hectare_year: 3.5,
            planted_date: date(2022, 3, 15),
            expected_maturity_date: date(2032, 3, 15),
            status: ProjectStatus::Active,
            investment: 250_000.0,
        }
    }

    #[test]
    fn test_one_year_of_growth() {
        let p = west_ridge();
        assert_eq!(p.current_sequestration(date(2023, 3, 15)).unwrap(), 175.0);
    }

    #[test]
    fn test_years_elapsed() {
        assert_eq!(years_elapsed(date(2022, 3, 15), date(2023, 3, 15)), 1.0);
        assert_eq!(years_elapsed(date(2023, 3, 15), date(2024, 3, 15)), 1.0);
        assert_eq!(years_elapsed(date(2022, 3, 15), date(2032, 3, 15)), 10.0);
        assert_eq!(years_elapsed(date(2022, 3, 15), date(2022, 3, 15)), 0.0);
        let half = years_elapsed(date(2023, 1, 1), date(2023, 7, 2));
        assert!((half - 182.0 / 365.0).abs() < 1e-12);
        // Feb 29 anniversaries land on Feb 28 in common years.
        assert_eq!(years_elapsed(date(2024, 2, 29), date(2025, 2, 28)), 1.0);
    }

    #[test]
    fn test_projected_total_and_clamp() {
        let p = west_ridge();
        assert_eq!(p.projected_total().unwrap(), 1750.0);
        assert_eq!(p.current_sequestration(date(2040, 1, 1)).unwrap(), 1750.0);
        assert_eq!(p.current_sequestration(date(2022, 3, 15)).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_date_ranges() {
        let p = west_ridge();
        assert!(matches!(
            p.current_sequestration(date(2022, 3, 14)),
            Err(EngineError::InvalidDateRange(_))
        ));

        let mut inverted = west_ridge();
        inverted.expected_maturity_date = inverted.planted_date;
        assert!(matches!(inverted.projected_total(), Err(EngineError::InvalidDateRange(_))));
        assert!(matches!(
            inverted.current_sequestration(date(2023, 1, 1)),
            Err(EngineError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_status_transitions() {
        let mut p = west_ridge();
        p.status = ProjectStatus::Planning;

        // Cannot complete before starting.
        assert!(p.complete(date(2033, 1, 1)).is_err());
        p.start().unwrap();
        assert_eq!(p.status, ProjectStatus::Active);
        assert_eq!(
            p.start(),
            Err(EngineError::InvalidStatusTransition {
                from: ProjectStatus::Active,
                to: ProjectStatus::Active
            })
        );

        // Not mature yet.
        assert!(p.complete(date(2032, 3, 14)).is_err());
        p.complete(date(2032, 3, 15)).unwrap();
        assert_eq!(p.status, ProjectStatus::Completed);
        assert!(p.start().is_err());
    }

    #[test]
    fn test_portfolio() {
        let mut planned = west_ridge();
        planned.id = "p-2".into();
        planned.status = ProjectStatus::Planning;
        planned.planted_date = date(2026, 1, 1);
        planned.expected_maturity_date = date(2036, 1, 1);
        planned.investment = 0.0;

        let summary = portfolio(&[west_ridge(), planned], date(2023, 3, 15)).unwrap();
        assert_eq!(summary.project_count, 2);
        assert_eq!(summary.active_count, 1);
        assert_eq!(summary.total_area_hectares, 100.0);
        assert_eq!(summary.sequestered_to_date, 175.0);
        assert_eq!(summary.projected_total, 3500.0);
        assert_eq!(summary.cost_per_tonne, Some(250_000.0 / 3500.0));
    }
}
