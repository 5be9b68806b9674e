#![forbid(unsafe_code)]

//! Emissions-accounting engine for mining operations: validates raw activity
//! data, converts it to tCO2e with a versioned factor table, aggregates and
//! projects it, and tracks carbon-sink projects against it.

pub mod aggregation;
pub mod calculator;
pub mod config;
pub mod error;
pub mod factors;
pub mod inventory;
pub mod period;
pub mod projection;
pub mod report;
pub mod scenario;
pub mod sequestration;
pub mod types;
pub mod validation;

pub use aggregation::{
    aggregate, statistics, trend, AggregateSummary, EntryStatistics, GroupBy, TrendPoint,
    TrendSeries,
};
pub use calculator::{BatchOutcome, EmissionCalculator, FallbackPolicy};
pub use config::EngineConfig;
pub use error::{ConfigError, EngineError};
pub use factors::{EmissionFactor, FactorTable, SharedFactorTable};
pub use inventory::{EntryRepository, ImportOutcome, InMemoryRepository, Inventory};
pub use period::{Granularity, Period};
pub use projection::{Forecast, ForecastPoint, ProjectionEngine};
pub use report::{format_emissions, InventorySnapshot};
pub use scenario::{default_levers, simulate, MitigationLever, Scenario, ScenarioOutcome};
pub use sequestration::{
    portfolio, PortfolioSummary, ProjectStatus, ProjectType, SequestrationProject,
};
pub use types::{
    Activity, Category, ComputedRecord, ElectricityActivity, EntryId, ExplosivesActivity,
    FactorSource, FugitiveActivity, FuelActivity, RawEntry, Scope,
};
pub use validation::{validate, validate_project, ValidationReport};
