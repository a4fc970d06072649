use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{ProficiencyStore, StoreError};
use crate::proficiency::config::EstimatorParams;
use crate::proficiency::estimator::decay_on_load;
use crate::proficiency::types::ProficiencyState;

/// Service over a `ProficiencyStore`. Reads never fail: an absent record or an
/// unreachable store both yield a cold-start state.
pub struct ProficiencyRepository<S> {
    store: Arc<S>,
    params: EstimatorParams,
}

impl<S> Clone for ProficiencyRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            params: self.params.clone(),
        }
    }
}

impl<S: ProficiencyStore> ProficiencyRepository<S> {
    pub fn new(store: Arc<S>, params: EstimatorParams) -> Self {
        Self { store, params }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn get_proficiency(&self, skill_name: &str, learner_id: &str) -> ProficiencyState {
        self.get_proficiency_at(skill_name, learner_id, Utc::now()).await
    }

    pub async fn get_proficiency_at(
        &self,
        skill_name: &str,
        learner_id: &str,
        now: DateTime<Utc>,
    ) -> ProficiencyState {
        match self.store.load(learner_id, skill_name).await {
            Ok(Some(state)) => {
                let loaded = decay_on_load(&state, now, &self.params);
                tracing::debug!(
                    learner_id,
                    skill = skill_name,
                    stored_theta = state.theta,
                    theta = loaded.theta,
                    "proficiency loaded"
                );
                loaded
            }
            Ok(None) => {
                tracing::debug!(learner_id, skill = skill_name, "no proficiency record, cold start");
                ProficiencyState::cold_start(&self.params, now)
            }
            Err(err) => {
                tracing::warn!(
                    learner_id,
                    skill = skill_name,
                    error = %err,
                    "proficiency read failed, falling back to cold start"
                );
                ProficiencyState::cold_start(&self.params, now)
            }
        }
    }

    pub async fn save_proficiency(
        &self,
        skill_name: &str,
        learner_id: &str,
        state: &ProficiencyState,
    ) -> Result<(), StoreError> {
        self.store.upsert(learner_id, skill_name, state).await
    }

    /// Every stored skill for `learner_id`, with decay applied. Read failures
    /// propagate here since there is no sensible default list.
    pub async fn list_proficiencies(
        &self,
        learner_id: &str,
    ) -> Result<Vec<(String, ProficiencyState)>, StoreError> {
        let now = Utc::now();
        let states = self.store.list_for_learner(learner_id).await?;
        Ok(states
            .into_iter()
            .map(|(skill, state)| {
                let loaded = decay_on_load(&state, now, &self.params);
                (skill, loaded)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::Duration;

    fn repository() -> ProficiencyRepository<MemoryStore> {
        ProficiencyRepository::new(Arc::new(MemoryStore::new()), EstimatorParams::default())
    }

    #[tokio::test]
    async fn test_absent_record_is_cold_start() {
        let repo = repository();
        let state = repo.get_proficiency("fractions", "u1").await;
        assert_eq!(state.theta, -1.0);
        assert_eq!(state.sigma, 1.2);
        assert_eq!(state.question_count, 0);
        assert!(!state.mastery_achieved());
        assert!(repo.store().is_empty());
    }

    #[tokio::test]
    async fn test_decay_applied_on_read_not_persisted() {
        let repo = repository();
        let then = Utc::now() - Duration::days(5);
        let mut state = ProficiencyState::cold_start(&EstimatorParams::default(), then);
        state.theta = 0.5;
        repo.save_proficiency("fractions", "u1", &state).await.unwrap();

        let loaded = repo.get_proficiency_at("fractions", "u1", then + Duration::days(5)).await;
        assert!((loaded.theta - 0.4).abs() < 1e-9);

        let stored = repo.store().load("u1", "fractions").await.unwrap().unwrap();
        assert_eq!(stored.theta, 0.5);
    }
}
