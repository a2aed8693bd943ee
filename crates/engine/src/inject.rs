use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::set::ScienceResultEntry;

/// The live registry was not ready to enumerate; the injector retries on
/// the next tick. Never surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("experiment registry is not available yet")]
pub struct RegistryUnavailable;

/// Seam to the host's live experiment registry. Insertion is guarded by
/// `has_result` at the call site, so implementations only need plain
/// contains-key and insert semantics.
pub trait ExperimentRegistry {
    fn experiment_ids(&self) -> Result<Vec<String>, RegistryUnavailable>;
    fn has_result(&self, experiment_id: &str, region_name: &str) -> bool;
    fn insert_result(&mut self, experiment_id: &str, region_name: &str, result_text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionState {
    Pending,
    Injected,
}

/// Session-wide staging area for parsed science results and the one-way
/// injected flag. Created once per host session; the host calls `tick`
/// from its frame loop until it returns `Injected`.
#[derive(Debug, Clone)]
pub struct InjectionSession {
    pending: Vec<ScienceResultEntry>,
    state: InjectionState,
}

impl Default for InjectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectionSession {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            state: InjectionState::Pending,
        }
    }

    /// Appends parsed entries to the staging list. Entries staged after the
    /// session reached `Injected` are never merged; that single-shot
    /// behavior is part of the session contract.
    pub fn stage(&mut self, entries: impl IntoIterator<Item = ScienceResultEntry>) {
        self.pending.extend(entries);
    }

    pub fn pending(&self) -> &[ScienceResultEntry] {
        &self.pending
    }

    pub fn state(&self) -> InjectionState {
        self.state
    }

    /// One poll of the injection state machine.
    ///
    /// While `Pending`: if the registry cannot enumerate yet, nothing is
    /// consumed and the session stays `Pending` for a retry next tick.
    /// Otherwise every staged entry whose experiment id exists in the
    /// registry is inserted under its region name unless that key is
    /// already present; existing results are never overwritten and entries
    /// for unknown experiment ids are dropped silently. A completed pass
    /// moves the session to `Injected` permanently.
    pub fn tick(&mut self, registry: &mut dyn ExperimentRegistry) -> InjectionState {
        if self.state == InjectionState::Injected {
            return InjectionState::Injected;
        }

        let ids = match registry.experiment_ids() {
            Ok(ids) => ids,
            Err(RegistryUnavailable) => {
                debug!(staged = self.pending.len(), "science_injection_deferred");
                return InjectionState::Pending;
            }
        };

        let mut inserted = 0usize;
        let mut already_present = 0usize;
        for id in &ids {
            for entry in &self.pending {
                if entry.experiment_id != *id {
                    continue;
                }
                if registry.has_result(id, &entry.region_name) {
                    already_present += 1;
                    continue;
                }
                registry.insert_result(id, &entry.region_name, &entry.result_text);
                inserted += 1;
            }
        }

        self.state = InjectionState::Injected;
        info!(
            inserted,
            already_present,
            staged = self.pending.len(),
            "science_injection_complete"
        );
        InjectionState::Injected
    }
}

/// BTreeMap-backed registry. Backs the CLI's registry-file mode and tests;
/// hosts with a live registry implement `ExperimentRegistry` directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryExperimentRegistry {
    experiments: BTreeMap<String, BTreeMap<String, String>>,
    unavailable: bool,
}

impl MemoryExperimentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_experiments(experiments: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self {
            experiments,
            unavailable: false,
        }
    }

    pub fn add_experiment(&mut self, experiment_id: impl Into<String>) {
        self.experiments.entry(experiment_id.into()).or_default();
    }

    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn results(&self, experiment_id: &str) -> Option<&BTreeMap<String, String>> {
        self.experiments.get(experiment_id)
    }

    pub fn into_experiments(self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.experiments
    }
}

impl ExperimentRegistry for MemoryExperimentRegistry {
    fn experiment_ids(&self) -> Result<Vec<String>, RegistryUnavailable> {
        if self.unavailable {
            return Err(RegistryUnavailable);
        }
        Ok(self.experiments.keys().cloned().collect())
    }

    fn has_result(&self, experiment_id: &str, region_name: &str) -> bool {
        self.experiments
            .get(experiment_id)
            .is_some_and(|results| results.contains_key(region_name))
    }

    fn insert_result(&mut self, experiment_id: &str, region_name: &str, result_text: &str) {
        if let Some(results) = self.experiments.get_mut(experiment_id) {
            results
                .entry(region_name.to_string())
                .or_insert_with(|| result_text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(experiment_id: &str, region_name: &str, result_text: &str) -> ScienceResultEntry {
        ScienceResultEntry {
            experiment_id: experiment_id.to_string(),
            region_name: region_name.to_string(),
            result_text: result_text.to_string(),
        }
    }

    fn staged_session() -> InjectionSession {
        let mut session = InjectionSession::new();
        session.stage(vec![
            entry("exp1", "Highlands", "result A"),
            entry("exp1", "Lowlands", "result B"),
            entry("exp2", "Highlands", "result C"),
        ]);
        session
    }

    #[test]
    fn existing_results_are_never_overwritten() {
        let mut session = staged_session();
        let mut registry = MemoryExperimentRegistry::new();
        registry.add_experiment("exp1");
        registry.insert_result("exp1", "Highlands", "old");

        assert_eq!(session.tick(&mut registry), InjectionState::Injected);
        let results = registry.results("exp1").expect("exp1");
        assert_eq!(results.get("Highlands").map(String::as_str), Some("old"));
        assert_eq!(
            results.get("Lowlands").map(String::as_str),
            Some("result B")
        );
    }

    #[test]
    fn unknown_experiment_ids_are_dropped_silently() {
        let mut session = staged_session();
        let mut registry = MemoryExperimentRegistry::new();
        registry.add_experiment("exp1");

        session.tick(&mut registry);
        assert!(registry.results("exp2").is_none());
        let results = registry.results("exp1").expect("exp1");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn unavailable_registry_defers_without_consuming_entries() {
        let mut session = staged_session();
        let mut registry = MemoryExperimentRegistry::new();
        registry.add_experiment("exp1");
        registry.set_unavailable(true);

        assert_eq!(session.tick(&mut registry), InjectionState::Pending);
        assert_eq!(session.state(), InjectionState::Pending);
        assert_eq!(session.pending().len(), 3);

        registry.set_unavailable(false);
        assert_eq!(session.tick(&mut registry), InjectionState::Injected);
        assert_eq!(
            registry
                .results("exp1")
                .expect("exp1")
                .get("Highlands")
                .map(String::as_str),
            Some("result A")
        );
    }

    #[test]
    fn injection_is_idempotent() {
        let mut first_session = staged_session();
        let mut once = MemoryExperimentRegistry::new();
        once.add_experiment("exp1");
        once.insert_result("exp1", "Highlands", "old");
        first_session.tick(&mut once);

        let mut second_session = staged_session();
        let mut twice = MemoryExperimentRegistry::new();
        twice.add_experiment("exp1");
        twice.insert_result("exp1", "Highlands", "old");
        second_session.tick(&mut twice);
        second_session.tick(&mut twice);

        assert_eq!(once.results("exp1"), twice.results("exp1"));
    }

    #[test]
    fn injected_state_is_terminal_even_for_newly_staged_entries() {
        let mut session = InjectionSession::new();
        let mut registry = MemoryExperimentRegistry::new();
        registry.add_experiment("exp1");
        assert_eq!(session.tick(&mut registry), InjectionState::Injected);

        session.stage(vec![entry("exp1", "Highlands", "late")]);
        assert_eq!(session.tick(&mut registry), InjectionState::Injected);
        assert!(registry
            .results("exp1")
            .expect("exp1")
            .get("Highlands")
            .is_none());
    }

    #[test]
    fn empty_experiment_id_entries_never_match() {
        let mut session = InjectionSession::new();
        session.stage(vec![entry("", "Highlands", "orphan")]);
        let mut registry = MemoryExperimentRegistry::new();
        registry.add_experiment("exp1");

        session.tick(&mut registry);
        assert!(registry
            .results("exp1")
            .expect("exp1")
            .get("Highlands")
            .is_none());
    }

    #[test]
    fn first_staged_entry_wins_for_duplicate_keys() {
        let mut session = InjectionSession::new();
        session.stage(vec![
            entry("exp1", "Highlands", "first"),
            entry("exp1", "Highlands", "second"),
        ]);
        let mut registry = MemoryExperimentRegistry::new();
        registry.add_experiment("exp1");

        session.tick(&mut registry);
        assert_eq!(
            registry
                .results("exp1")
                .expect("exp1")
                .get("Highlands")
                .map(String::as_str),
            Some("first")
        );
    }
}
