use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, EngineError};
use crate::types::Category;

pub const BUILTIN_VERSION: &str = "builtin-2025.1";

/// tCO2e per 1000 declared units (L, m3, kWh, kg, tonnes of coal).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmissionFactor {
    pub category: Category,
    pub subtype: String,
    pub factor: f64,
    pub unit: String,
}

/// Serialized form of a factor table, as shipped in a JSON dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorDataset {
    pub version: String,
    pub factors: Vec<EmissionFactor>,
    /// Category -> subtype whose factor is the documented fallback.
    #[serde(default)]
    pub defaults: BTreeMap<Category, String>,
}

/// Immutable, versioned emission-factor reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    version: String,
    factors: BTreeMap<(Category, String), EmissionFactor>,
    defaults: BTreeMap<Category, EmissionFactor>,
}

fn factor(category: Category, subtype: &str, value: f64, unit: &str) -> EmissionFactor {
    EmissionFactor {
        category,
        subtype: subtype.to_string(),
        factor: value,
        unit: unit.to_string(),
    }
}

impl FactorTable {
    /// Reference factors used by the inventory forms.
    pub fn builtin() -> Self {
        let factors: BTreeMap<_, _> = [
            factor(Category::Fuel, "Diesel", 2.68, "1000 L"),
            factor(Category::Fuel, "Natural Gas", 1.91, "1000 m3"),
            factor(Category::Fuel, "Heavy Fuel Oil", 3.12, "1000 L"),
            factor(Category::Fuel, "Petrol", 2.31, "1000 L"),
            factor(Category::Electricity, "Grid", 0.82, "MWh"),
            factor(Category::Electricity, "Solar", 0.04, "MWh"),
            factor(Category::Electricity, "Wind", 0.01, "MWh"),
            factor(Category::Electricity, "Hydro", 0.02, "MWh"),
            factor(Category::Explosives, "ANFO", 1.68, "tonne"),
            factor(Category::Explosives, "Emulsion", 2.11, "tonne"),
            factor(Category::Explosives, "Dynamite", 2.85, "tonne"),
            factor(Category::Fugitive, "Degree I", 0.8, "1000 t coal"),
            factor(Category::Fugitive, "Degree II", 1.8, "1000 t coal"),
            factor(Category::Fugitive, "Degree III", 2.9, "1000 t coal"),
        ]
        .into_iter()
        .map(|f| ((f.category, f.subtype.clone()), f))
        .collect();

        let defaults = [
            (Category::Fuel, "Diesel"),
            (Category::Electricity, "Grid"),
            (Category::Explosives, "ANFO"),
            (Category::Fugitive, "Degree II"),
        ]
        .iter()
        .filter_map(|(category, subtype)| {
            factors
                .get(&(*category, subtype.to_string()))
                .map(|f| (*category, f.clone()))
        })
        .collect();

        FactorTable {
            version: BUILTIN_VERSION.to_string(),
            factors,
            defaults,
        }
    }

    pub fn from_dataset(dataset: FactorDataset) -> Result<Self, ConfigError> {
        let mut factors = BTreeMap::new();
        for f in dataset.factors {
            if !f.factor.is_finite() || f.factor < 0.0 {
                return Err(ConfigError::InvalidFactor {
                    category: f.category,
                    subtype: f.subtype,
                    factor: f.factor,
                });
            }
            let key = (f.category, f.subtype.clone());
            if factors.contains_key(&key) {
                return Err(ConfigError::DuplicateFactor {
                    category: f.category,
                    subtype: f.subtype,
                });
            }
            factors.insert(key, f);
        }

        let mut defaults = BTreeMap::new();
        for (category, subtype) in dataset.defaults {
            match factors.get(&(category, subtype.clone())) {
                Some(f) => {
                    defaults.insert(category, f.clone());
                }
                None => {
                    return Err(ConfigError::Invalid(
                        "default factor refers to a missing subtype",
                    ))
                }
            }
        }

        Ok(FactorTable {
            version: dataset.version,
            factors,
            defaults,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let dataset: FactorDataset = serde_json::from_str(json)?;
        Self::from_dataset(dataset)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn lookup(
        &self,
        category: Category,
        subtype: &str,
    ) -> Result<&EmissionFactor, EngineError> {
        self.factors
            .get(&(category, subtype.to_string()))
            .ok_or_else(|| EngineError::UnknownFactor {
                category,
                subtype: subtype.to_string(),
            })
    }

    /// Documented fallback factor for a category, if the dataset declares one.
    pub fn default_for(&self, category: Category) -> Option<&EmissionFactor> {
        self.defaults.get(&category)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl Default for FactorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Factor table shared between callers. Updates swap the whole table, so a
/// snapshot is never observed half-updated.
#[derive(Debug, Clone, Default)]
pub struct SharedFactorTable {
    inner: Arc<RwLock<Arc<FactorTable>>>,
}

impl SharedFactorTable {
    pub fn new(table: FactorTable) -> Self {
        SharedFactorTable {
            inner: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    pub fn snapshot(&self) -> Arc<FactorTable> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `table` and returns the one it replaced.
    pub fn replace(&self, table: FactorTable) -> Arc<FactorTable> {
        let next = Arc::new(table);
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        info!(
            from = guard.version(),
            to = next.version(),
            "emission factor table replaced"
        );
        std::mem::replace(&mut *guard, next)
    }
}
