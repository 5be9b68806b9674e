use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::calculator::{BatchOutcome, EmissionCalculator};
use crate::error::EngineError;
use crate::factors::FactorTable;
use crate::types::{ComputedRecord, EntryId, RawEntry};

/// Storage collaborator for raw entries. Entries are never edited in place:
/// a revision supersedes the current version and the old one stays in history.
pub trait EntryRepository {
    fn insert(&mut self, entry: RawEntry) -> Result<(), EngineError>;

    /// Replaces the current version of `entry.id`, returning the superseded one.
    fn supersede(&mut self, entry: RawEntry) -> Result<RawEntry, EngineError>;

    fn current(&self, id: &EntryId) -> Option<&RawEntry>;

    /// Current version of every entry.
    fn entries(&self) -> Vec<&RawEntry>;

    /// All versions of an entry, oldest first.
    fn history(&self, id: &EntryId) -> &[RawEntry];
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    versions: BTreeMap<EntryId, Vec<RawEntry>>,
}

impl EntryRepository for InMemoryRepository {
    fn insert(&mut self, entry: RawEntry) -> Result<(), EngineError> {
        if self.versions.contains_key(&entry.id) {
            return Err(EngineError::DuplicateEntry(entry.id));
        }
        self.versions.insert(entry.id.clone(), vec![entry]);
        Ok(())
    }

    fn supersede(&mut self, entry: RawEntry) -> Result<RawEntry, EngineError> {
        let versions = self
            .versions
            .get_mut(&entry.id)
            .ok_or_else(|| EngineError::UnknownEntry(entry.id.clone()))?;
        let previous = versions
            .last()
            .cloned()
            .ok_or_else(|| EngineError::UnknownEntry(entry.id.clone()))?;
        versions.push(entry);
        Ok(previous)
    }

    fn current(&self, id: &EntryId) -> Option<&RawEntry> {
        self.versions.get(id).and_then(|v| v.last())
    }

    fn entries(&self) -> Vec<&RawEntry> {
        self.versions.values().filter_map(|v| v.last()).collect()
    }

    fn history(&self, id: &EntryId) -> &[RawEntry] {
        self.versions.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Accepted and rejected entries from a bulk import.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub accepted: Vec<ComputedRecord>,
    pub rejected: Vec<(EntryId, EngineError)>,
}

/// Emissions inventory: validates and computes entries before they reach the
/// repository, and derives records from the current versions on demand.
#[derive(Debug, Clone)]
pub struct Inventory<R: EntryRepository> {
    repository: R,
    calculator: EmissionCalculator,
}

impl<R: EntryRepository> Inventory<R> {
    pub fn new(repository: R, calculator: EmissionCalculator) -> Self {
        Inventory {
            repository,
            calculator,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn calculator(&self) -> &EmissionCalculator {
        &self.calculator
    }

    pub fn submit(&mut self, entry: RawEntry) -> Result<ComputedRecord, EngineError> {
        if self.repository.current(&entry.id).is_some() {
            return Err(EngineError::DuplicateEntry(entry.id));
        }
        let record = self.calculator.compute(&entry)?;
        self.repository.insert(entry)?;
        Ok(record)
    }

    /// Supersedes an existing entry with a corrected version.
    pub fn revise(&mut self, entry: RawEntry) -> Result<ComputedRecord, EngineError> {
        if self.repository.current(&entry.id).is_none() {
            return Err(EngineError::UnknownEntry(entry.id));
        }
        let record = self.calculator.compute(&entry)?;
        self.repository.supersede(entry)?;
        Ok(record)
    }

    /// Submits every entry, collecting each rejection rather than stopping at the first.
    pub fn import(&mut self, entries: Vec<RawEntry>) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();
        for entry in entries {
            let id = entry.id.clone();
            match self.submit(entry) {
                Ok(record) => outcome.accepted.push(record),
                Err(err) => outcome.rejected.push((id, err)),
            }
        }
        info!(
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "bulk import finished"
        );
        outcome
    }

    /// Recomputes records for the current version of every entry.
    pub fn records(&self) -> BatchOutcome {
        let entries: Vec<RawEntry> = self.repository.entries().into_iter().cloned().collect();
        self.calculator.compute_all(&entries)
    }

    pub fn replace_factor_table(&mut self, table: Arc<FactorTable>) {
        info!(
            from = self.calculator.table().version(),
            to = table.version(),
            "inventory factor table replaced"
        );
        self.calculator = EmissionCalculator::new(table, self.calculator.policy());
    }
}
