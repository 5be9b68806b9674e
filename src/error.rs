use std::path::PathBuf;

use thiserror::Error;

use crate::sequestration::ProjectStatus;
use crate::types::{Category, EntryId};
use crate::validation::ValidationReport;

/// Per-call failures of the engine. None of them is fatal to the process.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    ValidationFailed(ValidationReport),
    #[error("no emission factor for {category} / {subtype}")]
    UnknownFactor { category: Category, subtype: String },
    #[error("invalid date range: {0}")]
    InvalidDateRange(&'static str),
    #[error("invalid trend series: {0}")]
    InvalidSeries(&'static str),
    #[error("insufficient history: {points} point(s), at least 2 required")]
    InsufficientHistory { points: usize },
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        from: ProjectStatus,
        to: ProjectStatus,
    },
    #[error("entry {0} already exists")]
    DuplicateEntry(EntryId),
    #[error("entry {0} not found")]
    UnknownEntry(EntryId),
}

/// Load-time failures for configuration and factor datasets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid factor dataset: {0}")]
    Json(#[from] serde_json::Error),
    #[error("factor {category} / {subtype} must be finite and non-negative, got {factor}")]
    InvalidFactor {
        category: Category,
        subtype: String,
        factor: f64,
    },
    #[error("duplicate factor {category} / {subtype}")]
    DuplicateFactor { category: Category, subtype: String },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
