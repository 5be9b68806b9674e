use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emission source category of a raw activity entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Fuel,
    Electricity,
    Fugitive,
    Explosives,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Fuel,
        Category::Electricity,
        Category::Fugitive,
        Category::Explosives,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fuel => "Fuel",
            Category::Electricity => "Electricity",
            Category::Fugitive => "Fugitive",
            Category::Explosives => "Explosives",
        }
    }

    /// GHG-protocol scope the category reports under.
    pub fn scope(&self) -> Scope {
        match self {
            Category::Fuel | Category::Fugitive | Category::Explosives => Scope::Scope1,
            Category::Electricity => Scope::Scope2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Scope1,
    Scope2,
    Scope3,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Scope1 => "Scope 1",
            Scope::Scope2 => "Scope 2",
            Scope::Scope3 => "Scope 3",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of a raw entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn generate() -> Self {
        EntryId(Uuid::new_v4().to_string())
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        EntryId(value.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelActivity {
    pub fuel_type: String,
    pub quantity: Option<f64>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElectricityActivity {
    /// kWh.
    pub consumption: Option<f64>,
    /// tCO2e per MWh; the source's table factor is used when absent.
    #[serde(default)]
    pub grid_factor: Option<f64>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FugitiveActivity {
    /// Tonnes of coal produced.
    pub production: Option<f64>,
    /// Mine gassiness degree.
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seam: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplosivesActivity {
    pub explosive_type: String,
    /// kg.
    pub quantity: Option<f64>,
    pub blast_area: String,
}

/// Category-specific activity data. The variant fixes the entry's category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "category")]
pub enum Activity {
    Fuel(FuelActivity),
    Electricity(ElectricityActivity),
    Fugitive(FugitiveActivity),
    Explosives(ExplosivesActivity),
}

impl Activity {
    pub fn category(&self) -> Category {
        match self {
            Activity::Fuel(_) => Category::Fuel,
            Activity::Electricity(_) => Category::Electricity,
            Activity::Fugitive(_) => Category::Fugitive,
            Activity::Explosives(_) => Category::Explosives,
        }
    }
}

/// One submitted activity record, as collected by a form or bulk import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub location: String,
    pub activity: Activity,
    pub created_by: String,
}

impl RawEntry {
    pub fn new(
        date: NaiveDate,
        location: impl Into<String>,
        activity: Activity,
        created_by: impl Into<String>,
    ) -> Self {
        RawEntry {
            id: EntryId::generate(),
            date,
            location: location.into(),
            activity,
            created_by: created_by.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<EntryId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn category(&self) -> Category {
        self.activity.category()
    }
}

/// Where the factor applied to a record came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FactorSource {
    Table,
    Default,
    EntryProvided,
}

/// Emissions derived from exactly one raw entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputedRecord {
    pub raw_entry_id: EntryId,
    pub category: Category,
    pub scope: Scope,
    pub date: NaiveDate,
    pub location: String,
    pub emissions_tco2e: f64,
    pub factor_applied: f64,
    pub factor_source: FactorSource,
    /// Factor dataset version pinned at calculation time.
    pub factor_version: String,
}
