//! Property-based tests for the proficiency engine.
//!
//! Invariants covered:
//! - Response model is strictly increasing in theta
//! - Updates move theta in the direction of the residual
//! - Sigma never increases across recorded answers
//! - Mastery, once reached, survives every later answer
//! - Selection never repeats an item while unused on-skill items remain
//! - Every session stops within the question ceiling

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use danci_proficiency::db::MemoryStore;
use danci_proficiency::proficiency::config::{EngineConfig, EstimatorParams, SelectorParams};
use danci_proficiency::proficiency::estimator;
use danci_proficiency::proficiency::irt::{parameters_for_label, probability_correct};
use danci_proficiency::proficiency::mastery::is_mastered;
use danci_proficiency::proficiency::selector::SelectionContext;
use danci_proficiency::proficiency::{
    CandidateItem, ItemParameters, ItemSelector, ProficiencyRepository, ProficiencyState,
    SelectionReason, SessionController, SessionPhase,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_label() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("easy"), Just("medium"), Just("hard"), Just("unknown")]
}

fn arb_item() -> impl Strategy<Value = ItemParameters> {
    ((0.3f64..=2.5f64), (-3.0f64..=3.0f64)).prop_map(|(a, b)| ItemParameters::new(a, b))
}

fn arb_state() -> impl Strategy<Value = ProficiencyState> {
    ((-3.0f64..=3.0f64), (0.2f64..=2.0f64), (0u32..500u32)).prop_map(|(theta, sigma, count)| {
        let mut state = ProficiencyState::cold_start(&EstimatorParams::default(), Utc::now());
        state.theta = theta;
        state.sigma = sigma;
        state.question_count = count;
        state
    })
}

fn arb_answers(max: usize) -> impl Strategy<Value = Vec<(bool, &'static str)>> {
    prop::collection::vec((any::<bool>(), arb_label()), 1..max)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
}

// ============================================================================
// Model properties
// ============================================================================

proptest! {
    #[test]
    fn prop_response_model_strictly_increasing(
        item in arb_item(),
        theta in -3.0f64..2.9f64,
        step in 0.01f64..0.1f64,
    ) {
        let low = probability_correct(theta, &item);
        let high = probability_correct(theta + step, &item);
        prop_assert!(high > low, "p({}) = {} !< p({}) = {}", theta, low, theta + step, high);
        prop_assert!((0.0..=1.0).contains(&low));
    }

    #[test]
    fn prop_update_follows_residual_sign(
        state in arb_state(),
        item in arb_item(),
        correct in any::<bool>(),
    ) {
        let params = EstimatorParams::default();
        let update = estimator::estimate(&state, correct, &item, &params);
        let residual = (if correct { 1.0 } else { 0.0 }) - update.predicted_probability;
        let delta = update.theta - state.theta;

        if delta != 0.0 {
            prop_assert_eq!(delta.signum(), residual.signum());
        } else {
            // Only a clamp at the bound can swallow the step.
            prop_assert!(state.theta == params.theta_max || state.theta == params.theta_min || residual.abs() < 1e-12);
        }
        prop_assert!((update.information_gain - residual.abs()).abs() < 1e-12);
    }

    #[test]
    fn prop_sigma_non_increasing(state in arb_state(), answers in arb_answers(60)) {
        let params = EstimatorParams::default();
        let mut state = state;
        for (correct, label) in answers {
            let before = state.sigma;
            estimator::apply(&mut state, correct, &parameters_for_label(label), &params, Utc::now());
            prop_assert!(state.sigma <= before);
            prop_assert!(state.sigma >= params.sigma_min);
            prop_assert!((params.theta_min..=params.theta_max).contains(&state.theta));
        }
    }

    #[test]
    fn prop_mastery_is_sticky(answers in arb_answers(60)) {
        let config = EngineConfig::default();
        let mut state = ProficiencyState::cold_start(&config.estimator, Utc::now());
        state.theta = 2.0;
        state.sigma = 0.3;
        prop_assert!(is_mastered(false, state.theta, state.sigma, None, &config.mastery));
        prop_assert!(state.mark_mastered(Utc::now()));
        let stamped = state.mastery_timestamp();

        for (correct, label) in answers {
            estimator::apply(&mut state, correct, &parameters_for_label(label), &config.estimator, Utc::now());
            let mastered = is_mastered(state.mastery_achieved(), state.theta, state.sigma, Some(0.0), &config.mastery);
            prop_assert!(mastered);
            prop_assert!(!state.mark_mastered(Utc::now()));
            prop_assert_eq!(state.mastery_timestamp(), stamped);
        }
    }

    #[test]
    fn prop_selection_avoids_used_items(
        labels in prop::collection::vec(arb_label(), 1..30),
        used_mask in prop::collection::vec(any::<bool>(), 30),
        theta in -3.0f64..=3.0f64,
        question_count in 0u32..100u32,
        seed in any::<u64>(),
    ) {
        let pool: Vec<CandidateItem> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| CandidateItem::new(format!("i{i}"), "algebra", *label))
            .chain(std::iter::once(CandidateItem::new("other", "geometry", "medium")))
            .collect();
        let mut used: HashSet<String> = pool
            .iter()
            .zip(used_mask.iter())
            .filter(|(item, mask)| **mask && item.skill_name == "algebra")
            .map(|(item, _)| item.id.clone())
            .collect();
        let fresh_remaining = labels.len() > used.len();
        let before = used.clone();

        let selector = ItemSelector::new(SelectorParams::default());
        let ctx = SelectionContext {
            skill_name: "algebra",
            theta,
            question_count,
            phase: SessionPhase::Adaptive,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let selection = selector.select(&ctx, &pool, &mut used, &mut rng).unwrap();

        prop_assert_eq!(selection.item.skill_name.as_str(), "algebra");
        prop_assert!(used.contains(&selection.item.id));
        if fresh_remaining {
            prop_assert!(!before.contains(&selection.item.id));
            prop_assert_ne!(selection.reason, SelectionReason::PoolRecycled);
        } else {
            prop_assert_eq!(selection.reason, SelectionReason::PoolRecycled);
            prop_assert_eq!(used.len(), 1);
        }
    }
}

// ============================================================================
// Session properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_session_stops_within_forty_answers(answers in prop::collection::vec(any::<bool>(), 40..=40), seed in any::<u64>()) {
        let rt = runtime();
        let stopped_at = rt.block_on(async {
            let config = EngineConfig::default();
            let repo = ProficiencyRepository::new(Arc::new(MemoryStore::new()), config.estimator.clone());
            let mut session = SessionController::start_with_rng(
                repo,
                config,
                "learner",
                "algebra",
                StdRng::seed_from_u64(seed),
            )
            .await;
            let medium = parameters_for_label("medium");

            for (i, correct) in answers.iter().enumerate() {
                if session.should_stop().stop {
                    return Some(i);
                }
                let before = session.proficiency().sigma;
                session.record_answer(*correct, &medium).await;
                assert!(session.proficiency().sigma <= before);
            }
            session.should_stop().stop.then_some(answers.len())
        });

        prop_assert!(matches!(stopped_at, Some(n) if n <= 40));
    }
}
