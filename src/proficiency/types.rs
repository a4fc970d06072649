use std::collections::{HashSet, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::proficiency::config::EstimatorParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLabel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Two-parameter logistic item parameters with an optional guessing floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemParameters {
    pub a: f64,
    pub b: f64,
    #[serde(default)]
    pub c: f64,
}

impl ItemParameters {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b, c: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem {
    pub id: String,
    pub skill_name: String,
    pub difficulty_label: String,
}

impl CandidateItem {
    pub fn new(id: impl Into<String>, skill_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            skill_name: skill_name.into(),
            difficulty_label: label.into(),
        }
    }
}

/// One-way mastery flag. There is no transition back to `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MasteryStatus {
    #[default]
    InProgress,
    Mastered { at: DateTime<Utc> },
}

impl MasteryStatus {
    pub fn is_mastered(&self) -> bool {
        matches!(self, Self::Mastered { .. })
    }

    pub fn achieved_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Mastered { at } => Some(*at),
            Self::InProgress => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyState {
    pub theta: f64,
    pub sigma: f64,
    pub last_updated: DateTime<Utc>,
    pub question_count: u32,
    mastery: MasteryStatus,
}

impl ProficiencyState {
    pub fn cold_start(params: &EstimatorParams, now: DateTime<Utc>) -> Self {
        Self {
            theta: params.initial_theta,
            sigma: params.initial_sigma,
            last_updated: now,
            question_count: 0,
            mastery: MasteryStatus::InProgress,
        }
    }

    /// Rebuilds a state from its persisted columns.
    pub fn restore(
        theta: f64,
        sigma: f64,
        last_updated: DateTime<Utc>,
        question_count: u32,
        mastery_timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            theta,
            sigma,
            last_updated,
            question_count,
            mastery: match mastery_timestamp {
                Some(at) => MasteryStatus::Mastered { at },
                None => MasteryStatus::InProgress,
            },
        }
    }

    pub fn mastery(&self) -> MasteryStatus {
        self.mastery
    }

    pub fn mastery_achieved(&self) -> bool {
        self.mastery.is_mastered()
    }

    pub fn mastery_timestamp(&self) -> Option<DateTime<Utc>> {
        self.mastery.achieved_at()
    }

    /// Returns true only on the transition; later calls keep the first timestamp.
    pub fn mark_mastered(&mut self, at: DateTime<Utc>) -> bool {
        if self.mastery.is_mastered() {
            return false;
        }
        self.mastery = MasteryStatus::Mastered { at };
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Warmup,
    Adaptive,
    Mastery,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Adaptive => "adaptive",
            Self::Mastery => "mastery",
        }
    }
}

/// Bounded FIFO of recent correctness flags.
#[derive(Debug, Clone)]
pub struct RecentAnswers {
    answers: VecDeque<bool>,
    capacity: usize,
}

impl RecentAnswers {
    pub fn new(capacity: usize) -> Self {
        Self {
            answers: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, correct: bool) {
        if self.answers.len() == self.capacity {
            self.answers.pop_front();
        }
        self.answers.push_back(correct);
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.answers.len() == self.capacity
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.answers.is_empty() {
            return None;
        }
        let correct = self.answers.iter().filter(|&&c| c).count();
        Some(correct as f64 / self.answers.len() as f64)
    }

    /// Accuracy only once the window holds `capacity` answers.
    pub fn full_window_accuracy(&self) -> Option<f64> {
        if self.is_full() {
            self.accuracy()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub recent_answers: RecentAnswers,
    pub used_item_ids: HashSet<String>,
    pub answered: u32,
    pub correct: u32,
}

impl SessionState {
    pub fn new(window_size: usize) -> Self {
        Self {
            phase: SessionPhase::Warmup,
            recent_answers: RecentAnswers::new(window_size),
            used_item_ids: HashSet::new(),
            answered: 0,
            correct: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub new_theta: f64,
    pub new_sigma: f64,
    pub predicted_probability: f64,
    pub information_gain: f64,
    pub phase: SessionPhase,
    pub mastery_newly_achieved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MasteryAchieved,
    MaxQuestionsReached,
    ConsistentPerformance,
}

impl StopReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MasteryAchieved => "Mastery achieved!",
            Self::MaxQuestionsReached => "Maximum questions reached",
            Self::ConsistentPerformance => "Consistent high performance achieved",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopDecision {
    pub stop: bool,
    pub reason: Option<StopReason>,
}

impl StopDecision {
    pub fn proceed() -> Self {
        Self { stop: false, reason: None }
    }

    pub fn stop(reason: StopReason) -> Self {
        Self {
            stop: true,
            reason: Some(reason),
        }
    }
}
