//! Next-item selection over a caller-supplied candidate pool.
//!
//! Candidates are scored by a blend of informativeness (discrimination near
//! the current ability) and proximity to a target slightly above it. A fixed
//! exploration rate and periodic confidence-boost items keep coverage diverse.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::proficiency::config::SelectorParams;
use crate::proficiency::irt::parameters_for_label;
use crate::proficiency::types::{CandidateItem, ItemParameters, SessionPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionReason {
    BestScore,
    Exploration,
    ConfidenceBoost,
    /// Every on-skill item had been used; the used set was reset.
    PoolRecycled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub item: CandidateItem,
    pub parameters: ItemParameters,
    pub reason: SelectionReason,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub skill_name: &'a str,
    pub theta: f64,
    pub question_count: u32,
    pub phase: SessionPhase,
}

struct Scored<'a> {
    item: &'a CandidateItem,
    parameters: ItemParameters,
    score: f64,
}

pub struct ItemSelector {
    params: SelectorParams,
}

impl ItemSelector {
    pub fn new(params: SelectorParams) -> Self {
        Self { params }
    }

    /// Warm-up and adaptive phases currently share one target.
    pub fn target_difficulty(&self, theta: f64, phase: SessionPhase) -> f64 {
        match phase {
            SessionPhase::Warmup | SessionPhase::Adaptive | SessionPhase::Mastery => {
                theta + self.params.target_offset
            }
        }
    }

    pub fn informativeness(&self, theta: f64, item: &ItemParameters) -> f64 {
        let z = (theta - item.b) / self.params.informativeness_width;
        item.a * (-0.5 * z * z).exp()
    }

    pub fn proximity(&self, target: f64, item: &ItemParameters) -> f64 {
        1.0 / (1.0 + (item.b - target).abs())
    }

    pub fn score(&self, theta: f64, target: f64, item: &ItemParameters) -> f64 {
        self.params.informativeness_weight * self.informativeness(theta, item)
            + self.params.proximity_weight * self.proximity(target, item)
    }

    /// Picks the next item and records it in `used_item_ids`.
    /// Returns `None` only when the pool has nothing for the skill.
    pub fn select<R: Rng + ?Sized>(
        &self,
        ctx: &SelectionContext<'_>,
        pool: &[CandidateItem],
        used_item_ids: &mut HashSet<String>,
        rng: &mut R,
    ) -> Option<Selection> {
        let on_skill: Vec<&CandidateItem> = pool
            .iter()
            .filter(|item| item.skill_name == ctx.skill_name)
            .collect();
        if on_skill.is_empty() {
            tracing::debug!(skill = ctx.skill_name, pool_size = pool.len(), "no eligible items");
            return None;
        }

        let fresh: Vec<&CandidateItem> = on_skill
            .iter()
            .copied()
            .filter(|item| !used_item_ids.contains(&item.id))
            .collect();

        if fresh.is_empty() {
            tracing::debug!(skill = ctx.skill_name, "all items used, recycling pool");
            used_item_ids.clear();
            let item = (*on_skill.choose(rng)?).clone();
            used_item_ids.insert(item.id.clone());
            return Some(Selection {
                parameters: parameters_for_label(&item.difficulty_label),
                item,
                reason: SelectionReason::PoolRecycled,
                score: None,
            });
        }

        let target = self.target_difficulty(ctx.theta, ctx.phase);
        let scored: Vec<Scored<'_>> = fresh
            .into_iter()
            .map(|item| {
                let parameters = parameters_for_label(&item.difficulty_label);
                Scored {
                    item,
                    parameters,
                    score: self.score(ctx.theta, target, &parameters),
                }
            })
            .collect();

        let (chosen, reason) = self.choose(ctx, target, &scored, rng)?;
        used_item_ids.insert(chosen.item.id.clone());

        Some(Selection {
            item: chosen.item.clone(),
            parameters: chosen.parameters,
            reason,
            score: Some(chosen.score),
        })
    }

    fn choose<'s, 'a, R: Rng + ?Sized>(
        &self,
        ctx: &SelectionContext<'_>,
        target: f64,
        scored: &'s [Scored<'a>],
        rng: &mut R,
    ) -> Option<(&'s Scored<'a>, SelectionReason)> {
        if scored.len() >= 2 && rng.random_bool(self.params.exploration_rate.clamp(0.0, 1.0)) {
            return scored.choose(rng).map(|s| (s, SelectionReason::Exploration));
        }

        let interval = self.params.confidence_interval;
        if interval > 0 && ctx.question_count > 0 && ctx.question_count % interval == 0 {
            let ceiling = target - self.params.confidence_margin;
            let easier: Vec<&Scored<'a>> =
                scored.iter().filter(|s| s.parameters.b < ceiling).collect();
            if let Some(pick) = easier.choose(rng) {
                return Some((*pick, SelectionReason::ConfidenceBoost));
            }
        }

        // First maximum wins so ties keep pool order.
        let mut best: Option<&Scored<'a>> = None;
        for candidate in scored {
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best.map(|s| (s, SelectionReason::BestScore))
    }
}
