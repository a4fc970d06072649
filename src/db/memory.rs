use std::collections::HashMap;

use parking_lot::RwLock;

use crate::db::{ProficiencyStore, StoreError};
use crate::proficiency::types::ProficiencyState;

type Key = (String, String);

#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<Key, ProficiencyState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl ProficiencyStore for MemoryStore {
    async fn load(
        &self,
        learner_id: &str,
        skill_name: &str,
    ) -> Result<Option<ProficiencyState>, StoreError> {
        let key = (learner_id.to_string(), skill_name.to_string());
        Ok(self.states.read().get(&key).cloned())
    }

    async fn upsert(
        &self,
        learner_id: &str,
        skill_name: &str,
        state: &ProficiencyState,
    ) -> Result<(), StoreError> {
        let key = (learner_id.to_string(), skill_name.to_string());
        self.states.write().insert(key, state.clone());
        Ok(())
    }

    async fn list_for_learner(
        &self,
        learner_id: &str,
    ) -> Result<Vec<(String, ProficiencyState)>, StoreError> {
        let guard = self.states.read();
        let mut out: Vec<(String, ProficiencyState)> = guard
            .iter()
            .filter(|((learner, _), _)| learner == learner_id)
            .map(|((_, skill), state)| (skill.clone(), state.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}
