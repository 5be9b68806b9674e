use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::factors::{FactorTable, SharedFactorTable};
use crate::types::{
    Activity, Category, ComputedRecord, ElectricityActivity, EntryId, ExplosivesActivity,
    FactorSource, FugitiveActivity, FuelActivity, RawEntry,
};
use crate::validation::validate;

/// Factors are expressed per 1000 activity units (kg/L/m3/kWh -> tonnes scale).
pub const UNIT_NORMALIZATION: f64 = 1000.0;

/// What to do when the table has no factor for an entry's subtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Apply the category's documented default factor and flag the record.
    #[default]
    UseDefault,
    /// Fail the entry with `UnknownFactor`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedFactor {
    pub value: f64,
    pub source: FactorSource,
}

/// Resolves subtype factors against one pinned table snapshot.
pub struct FactorResolver<'a> {
    table: &'a FactorTable,
    policy: FallbackPolicy,
}

impl<'a> FactorResolver<'a> {
    pub fn new(table: &'a FactorTable, policy: FallbackPolicy) -> Self {
        FactorResolver { table, policy }
    }

    pub fn resolve(&self, category: Category, subtype: &str) -> Result<AppliedFactor, EngineError> {
        match self.table.lookup(category, subtype) {
            Ok(f) => Ok(AppliedFactor {
                value: f.factor,
                source: FactorSource::Table,
            }),
            Err(err) => match (self.policy, self.table.default_for(category)) {
                (FallbackPolicy::UseDefault, Some(fallback)) => {
                    warn!(
                        category = %category,
                        subtype,
                        fallback = %fallback.subtype,
                        version = self.table.version(),
                        "unknown emission factor, applying category default"
                    );
                    Ok(AppliedFactor {
                        value: fallback.factor,
                        source: FactorSource::Default,
                    })
                }
                _ => Err(err),
            },
        }
    }
}

/// Per-category emission formula. Inputs are assumed validated.
pub trait ActivityEmissions {
    fn emissions(&self, resolver: &FactorResolver<'_>) -> Result<(f64, AppliedFactor), EngineError>;
}

fn scaled(amount: Option<f64>, factor: AppliedFactor) -> (f64, AppliedFactor) {
    (amount.unwrap_or(0.0) * factor.value / UNIT_NORMALIZATION, factor)
}

impl ActivityEmissions for FuelActivity {
    fn emissions(
        &self,
        resolver: &FactorResolver<'_>,
    ) -> Result<(f64, AppliedFactor), EngineError> {
        let f = resolver.resolve(Category::Fuel, &self.fuel_type)?;
        Ok(scaled(self.quantity, f))
    }
}

impl ActivityEmissions for ElectricityActivity {
    fn emissions(
        &self,
        _resolver: &FactorResolver<'_>,
    ) -> Result<(f64, AppliedFactor), EngineError> {
        let f = AppliedFactor {
            value: self.grid_factor.unwrap_or(0.0),
            source: FactorSource::EntryProvided,
        };
        Ok(scaled(self.consumption, f))
    }
}

impl ActivityEmissions for FugitiveActivity {
    fn emissions(
        &self,
        resolver: &FactorResolver<'_>,
    ) -> Result<(f64, AppliedFactor), EngineError> {
        let f = resolver.resolve(Category::Fugitive, &self.degree)?;
        Ok(scaled(self.production, f))
    }
}

impl ActivityEmissions for ExplosivesActivity {
    fn emissions(
        &self,
        resolver: &FactorResolver<'_>,
    ) -> Result<(f64, AppliedFactor), EngineError> {
        let f = resolver.resolve(Category::Explosives, &self.explosive_type)?;
        Ok(scaled(self.quantity, f))
    }
}

impl ActivityEmissions for Activity {
    fn emissions(
        &self,
        resolver: &FactorResolver<'_>,
    ) -> Result<(f64, AppliedFactor), EngineError> {
        match self {
            Activity::Fuel(a) => a.emissions(resolver),
            Activity::Electricity(a) => a.emissions(resolver),
            Activity::Fugitive(a) => a.emissions(resolver),
            Activity::Explosives(a) => a.emissions(resolver),
        }
    }
}

/// Result of computing a batch: every success and every failure.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<ComputedRecord>,
    pub failures: Vec<(EntryId, EngineError)>,
}

/// Turns validated raw entries into tCO2e records against a pinned factor table.
#[derive(Debug, Clone)]
pub struct EmissionCalculator {
    table: Arc<FactorTable>,
    policy: FallbackPolicy,
}

impl EmissionCalculator {
    pub fn new(table: Arc<FactorTable>, policy: FallbackPolicy) -> Self {
        EmissionCalculator { table, policy }
    }

    /// Pins the shared table's current snapshot.
    pub fn from_shared(shared: &SharedFactorTable, policy: FallbackPolicy) -> Self {
        Self::new(shared.snapshot(), policy)
    }

    pub fn table(&self) -> &FactorTable {
        &self.table
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn compute(&self, entry: &RawEntry) -> Result<ComputedRecord, EngineError> {
        let report = validate(entry);
        if !report.is_valid() {
            return Err(EngineError::ValidationFailed(report));
        }

        let resolver = FactorResolver::new(&self.table, self.policy);
        let (emissions, factor) = entry.activity.emissions(&resolver)?;
        let category = entry.category();

        debug!(
            entry = %entry.id,
            category = %category,
            emissions_tco2e = emissions,
            "computed emissions"
        );

        Ok(ComputedRecord {
            raw_entry_id: entry.id.clone(),
            category,
            scope: category.scope(),
            date: entry.date,
            location: entry.location.trim().to_string(),
            emissions_tco2e: emissions,
            factor_applied: factor.value,
            factor_source: factor.source,
            factor_version: self.table.version().to_string(),
        })
    }

    pub fn compute_all(&self, entries: &[RawEntry]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for entry in entries {
            match self.compute(entry) {
                Ok(record) => outcome.records.push(record),
                Err(err) => outcome.failures.push((entry.id.clone(), err)),
            }
        }
        outcome
    }
}

impl Default for EmissionCalculator {
    fn default() -> Self {
        Self::new(Arc::new(FactorTable::builtin()), FallbackPolicy::default())
    }
}
