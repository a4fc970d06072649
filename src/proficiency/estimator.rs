//! Online ability estimation.
//!
//! A single gradient step on the 2PL log-likelihood, scaled by the current
//! uncertainty. This is an approximation of posterior inference, not an exact
//! Bayesian update: sigma shrinks by a fixed factor per observation regardless
//! of how surprising the answer was.

use chrono::{DateTime, Utc};

use crate::proficiency::config::EstimatorParams;
use crate::proficiency::irt::probability_correct;
use crate::proficiency::types::{ItemParameters, ProficiencyState};

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub theta: f64,
    pub sigma: f64,
    pub predicted_probability: f64,
    /// Diagnostic only, never fed back into the update.
    pub information_gain: f64,
}

pub fn estimate(
    state: &ProficiencyState,
    is_correct: bool,
    item: &ItemParameters,
    params: &EstimatorParams,
) -> Estimate {
    let p = probability_correct(state.theta, item);
    let r = if is_correct { 1.0 } else { 0.0 };
    let alpha = params.alpha_0 * state.sigma;

    let theta = (state.theta + alpha * (r - p)).clamp(params.theta_min, params.theta_max);
    let sigma = (state.sigma * params.sigma_decay).clamp(params.sigma_min, params.sigma_max);

    Estimate {
        theta,
        sigma,
        predicted_probability: p,
        information_gain: (r - p).abs(),
    }
}

/// Applies `estimate` and advances the bookkeeping fields of `state`.
pub fn apply(
    state: &mut ProficiencyState,
    is_correct: bool,
    item: &ItemParameters,
    params: &EstimatorParams,
    now: DateTime<Utc>,
) -> Estimate {
    let update = estimate(state, is_correct, item, params);
    state.theta = update.theta;
    state.sigma = update.sigma;
    state.question_count = state.question_count.saturating_add(1);
    state.last_updated = now;
    update
}

/// Fades ability for skills that have not been practised since `last_updated`.
/// Mastered skills are exempt.
pub fn decay_on_load(
    state: &ProficiencyState,
    now: DateTime<Utc>,
    params: &EstimatorParams,
) -> ProficiencyState {
    let mut loaded = state.clone();
    if state.mastery_achieved() {
        return loaded;
    }

    let elapsed_ms = (now - state.last_updated).num_milliseconds();
    if elapsed_ms <= 0 {
        return loaded;
    }

    let days_since = elapsed_ms as f64 / MS_PER_DAY;
    loaded.theta =
        (state.theta - params.daily_decay * days_since).clamp(params.theta_min, params.theta_max);
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proficiency::irt::parameters_for_label;
    use chrono::Duration;

    fn default_state() -> ProficiencyState {
        ProficiencyState::cold_start(&EstimatorParams::default(), Utc::now())
    }

    #[test]
    fn test_worked_example() {
        let state = default_state();
        let update = estimate(&state, true, &parameters_for_label("medium"), &EstimatorParams::default());
        assert!((update.predicted_probability - 0.2315).abs() < 1e-3);
        assert!((update.theta - (-0.6768)).abs() < 1e-3);
        assert!((update.sigma - 1.14).abs() < 1e-3);
        assert!((update.information_gain - 0.7685).abs() < 1e-3);
    }

    #[test]
    fn test_wrong_answer_lowers_theta() {
        let state = default_state();
        let update = estimate(&state, false, &parameters_for_label("easy"), &EstimatorParams::default());
        assert!(update.theta < state.theta);
        assert!((update.information_gain - update.predicted_probability).abs() < 1e-12);
    }

    #[test]
    fn test_theta_clamped_at_bounds() {
        let params = EstimatorParams::default();
        let mut state = default_state();
        state.theta = 2.999;
        state.sigma = 2.0;
        let update = estimate(&state, true, &parameters_for_label("hard"), &params);
        assert_eq!(update.theta, 3.0);
    }

    #[test]
    fn test_sigma_floor() {
        let params = EstimatorParams::default();
        let mut state = default_state();
        state.sigma = 0.2;
        let update = estimate(&state, true, &parameters_for_label("medium"), &params);
        assert_eq!(update.sigma, 0.2);
    }

    #[test]
    fn test_apply_advances_count_and_timestamp() {
        let params = EstimatorParams::default();
        let mut state = default_state();
        let later = state.last_updated + Duration::minutes(3);
        apply(&mut state, true, &parameters_for_label("medium"), &params, later);
        assert_eq!(state.question_count, 1);
        assert_eq!(state.last_updated, later);
    }

    #[test]
    fn test_decay_after_ten_days() {
        let params = EstimatorParams::default();
        let mut state = default_state();
        state.theta = 1.0;
        let now = state.last_updated + Duration::days(10);
        let loaded = decay_on_load(&state, now, &params);
        assert!((loaded.theta - 0.8).abs() < 1e-9);
        assert_eq!(loaded.sigma, state.sigma);
    }

    #[test]
    fn test_decay_respects_floor() {
        let params = EstimatorParams::default();
        let mut state = default_state();
        state.theta = -2.9;
        let loaded = decay_on_load(&state, state.last_updated + Duration::days(365), &params);
        assert_eq!(loaded.theta, -3.0);
    }

    #[test]
    fn test_mastered_skill_does_not_decay() {
        let params = EstimatorParams::default();
        let mut state = default_state();
        state.theta = 2.0;
        state.mark_mastered(state.last_updated);
        let loaded = decay_on_load(&state, state.last_updated + Duration::days(90), &params);
        assert_eq!(loaded.theta, 2.0);
    }
}
