//! Session controller: the stateful object a session driver calls once per
//! answered item.
//!
//! Phases run `Warmup` (first items of the session) -> `Adaptive` -> `Mastery`.
//! `Mastery` is terminal. Every recorded answer is written through to the
//! repository; write failures are logged and the in-memory state stays
//! authoritative for the rest of the session.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use uuid::Uuid;

use crate::db::ProficiencyStore;
use crate::proficiency::config::EngineConfig;
use crate::proficiency::estimator;
use crate::proficiency::irt::parameters_for_label;
use crate::proficiency::mastery;
use crate::proficiency::persistence::ProficiencyRepository;
use crate::proficiency::selector::{ItemSelector, Selection, SelectionContext};
use crate::proficiency::types::{
    CandidateItem, ItemParameters, ProficiencyState, SessionPhase, SessionState, StopDecision,
    StopReason, UpdateResult,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub learner_id: String,
    pub skill_name: String,
    pub answered: u32,
    pub correct: u32,
    pub accuracy: Option<f64>,
    pub starting_theta: f64,
    pub theta: f64,
    pub sigma: f64,
    pub phase: SessionPhase,
    pub mastery_achieved: bool,
    pub elapsed_secs: i64,
}

pub struct SessionController<S> {
    repository: ProficiencyRepository<S>,
    config: EngineConfig,
    selector: ItemSelector,
    learner_id: String,
    skill_name: String,
    session_id: Uuid,
    state: ProficiencyState,
    session: SessionState,
    starting_theta: f64,
    started_at: DateTime<Utc>,
    rng: StdRng,
}

impl<S: ProficiencyStore> SessionController<S> {
    pub async fn start(
        repository: ProficiencyRepository<S>,
        config: EngineConfig,
        learner_id: impl Into<String>,
        skill_name: impl Into<String>,
    ) -> Self {
        Self::start_with_rng(repository, config, learner_id, skill_name, StdRng::from_os_rng()).await
    }

    /// Same as `start` with a caller-provided RNG, for reproducible selection.
    pub async fn start_with_rng(
        repository: ProficiencyRepository<S>,
        config: EngineConfig,
        learner_id: impl Into<String>,
        skill_name: impl Into<String>,
        rng: StdRng,
    ) -> Self {
        let learner_id = learner_id.into();
        let skill_name = skill_name.into();
        let state = repository.get_proficiency(&skill_name, &learner_id).await;
        let session_id = Uuid::new_v4();

        let mut controller = Self {
            selector: ItemSelector::new(config.selector.clone()),
            session: SessionState::new(config.session.window_size),
            starting_theta: state.theta,
            started_at: Utc::now(),
            repository,
            config,
            learner_id,
            skill_name,
            session_id,
            state,
            rng,
        };
        controller.session.phase = controller.current_phase();

        tracing::info!(
            session_id = %controller.session_id,
            learner_id = %controller.learner_id,
            skill = %controller.skill_name,
            theta = controller.state.theta,
            sigma = controller.state.sigma,
            phase = controller.session.phase.as_str(),
            "practice session started"
        );

        controller
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn proficiency(&self) -> &ProficiencyState {
        &self.state
    }

    pub fn session_state(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub async fn record_answer(&mut self, is_correct: bool, item: &ItemParameters) -> UpdateResult {
        let now = Utc::now();
        let estimate =
            estimator::apply(&mut self.state, is_correct, item, &self.config.estimator, now);

        self.session.recent_answers.push(is_correct);
        self.session.answered += 1;
        if is_correct {
            self.session.correct += 1;
        }

        let recent_accuracy = self.session.recent_answers.full_window_accuracy();
        let mastered = mastery::is_mastered(
            self.state.mastery_achieved(),
            self.state.theta,
            self.state.sigma,
            recent_accuracy,
            &self.config.mastery,
        );
        let mastery_newly_achieved = mastered && self.state.mark_mastered(now);
        self.session.phase = self.current_phase();

        tracing::debug!(
            session_id = %self.session_id,
            is_correct,
            p = estimate.predicted_probability,
            theta = estimate.theta,
            sigma = estimate.sigma,
            phase = self.session.phase.as_str(),
            "answer recorded"
        );
        if mastery_newly_achieved {
            tracing::info!(
                session_id = %self.session_id,
                learner_id = %self.learner_id,
                skill = %self.skill_name,
                theta = self.state.theta,
                question_count = self.state.question_count,
                "mastery achieved"
            );
        }

        self.persist().await;

        UpdateResult {
            new_theta: estimate.theta,
            new_sigma: estimate.sigma,
            predicted_probability: estimate.predicted_probability,
            information_gain: estimate.information_gain,
            phase: self.session.phase,
            mastery_newly_achieved,
        }
    }

    pub async fn record_item_answer(&mut self, item: &CandidateItem, is_correct: bool) -> UpdateResult {
        let parameters = parameters_for_label(&item.difficulty_label);
        self.record_answer(is_correct, &parameters).await
    }

    pub fn select_next_item(&mut self, pool: &[CandidateItem]) -> Option<Selection> {
        let ctx = SelectionContext {
            skill_name: &self.skill_name,
            theta: self.state.theta,
            question_count: self.state.question_count,
            phase: self.session.phase,
        };
        let selection =
            self.selector
                .select(&ctx, pool, &mut self.session.used_item_ids, &mut self.rng);

        match &selection {
            Some(chosen) => tracing::debug!(
                session_id = %self.session_id,
                item_id = %chosen.item.id,
                reason = ?chosen.reason,
                "item selected"
            ),
            None => tracing::warn!(
                session_id = %self.session_id,
                skill = %self.skill_name,
                "no eligible items for skill"
            ),
        }

        selection
    }

    pub fn should_stop(&self) -> StopDecision {
        if self.state.mastery_achieved() || self.session.phase == SessionPhase::Mastery {
            return StopDecision::stop(StopReason::MasteryAchieved);
        }
        if self.session.answered >= self.config.session.max_questions {
            return StopDecision::stop(StopReason::MaxQuestionsReached);
        }
        // Overlaps the mastery detector's accuracy branch but has no sigma gate.
        if let Some(accuracy) = self.session.recent_answers.full_window_accuracy() {
            if accuracy >= self.config.mastery.accuracy_threshold
                && self.state.theta >= self.config.mastery.theta_threshold
            {
                return StopDecision::stop(StopReason::ConsistentPerformance);
            }
        }
        StopDecision::proceed()
    }

    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// Advisory wall-clock check for the session driver.
    pub fn time_limit_reached(&self) -> bool {
        self.elapsed() >= Duration::minutes(i64::from(self.config.session.max_session_minutes))
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            learner_id: self.learner_id.clone(),
            skill_name: self.skill_name.clone(),
            answered: self.session.answered,
            correct: self.session.correct,
            accuracy: (self.session.answered > 0)
                .then(|| f64::from(self.session.correct) / f64::from(self.session.answered)),
            starting_theta: self.starting_theta,
            theta: self.state.theta,
            sigma: self.state.sigma,
            phase: self.session.phase,
            mastery_achieved: self.state.mastery_achieved(),
            elapsed_secs: self.elapsed().num_seconds(),
        }
    }

    /// Ends the session. Session bookkeeping is dropped; the proficiency
    /// record has already been written through.
    pub fn finish(self) -> SessionSummary {
        let summary = self.summary();
        tracing::info!(
            session_id = %summary.session_id,
            answered = summary.answered,
            theta = summary.theta,
            mastery = summary.mastery_achieved,
            "practice session finished"
        );
        summary
    }

    fn current_phase(&self) -> SessionPhase {
        if self.state.mastery_achieved() {
            SessionPhase::Mastery
        } else if self.session.answered < self.config.session.warmup_items {
            SessionPhase::Warmup
        } else {
            SessionPhase::Adaptive
        }
    }

    async fn persist(&self) {
        if let Err(err) = self
            .repository
            .save_proficiency(&self.skill_name, &self.learner_id, &self.state)
            .await
        {
            tracing::warn!(
                session_id = %self.session_id,
                learner_id = %self.learner_id,
                skill = %self.skill_name,
                error = %err,
                "proficiency write failed, keeping in-memory state"
            );
        }
    }
}
