use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorParams {
    pub alpha_0: f64,
    pub sigma_decay: f64,
    pub theta_min: f64,
    pub theta_max: f64,
    pub sigma_min: f64,
    pub sigma_max: f64,
    /// Ability lost per day without practice, applied on load.
    pub daily_decay: f64,
    pub initial_theta: f64,
    pub initial_sigma: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            alpha_0: 0.35,
            sigma_decay: 0.95,
            theta_min: -3.0,
            theta_max: 3.0,
            sigma_min: 0.2,
            sigma_max: 2.0,
            daily_decay: 0.02,
            initial_theta: -1.0,
            initial_sigma: 1.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryParams {
    pub theta_threshold: f64,
    pub sigma_threshold: f64,
    pub accuracy_threshold: f64,
}

impl Default for MasteryParams {
    fn default() -> Self {
        Self {
            theta_threshold: 1.5,
            sigma_threshold: 0.35,
            accuracy_threshold: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorParams {
    pub target_offset: f64,
    pub informativeness_weight: f64,
    pub proximity_weight: f64,
    pub informativeness_width: f64,
    pub exploration_rate: f64,
    pub confidence_interval: u32,
    pub confidence_margin: f64,
}

impl Default for SelectorParams {
    fn default() -> Self {
        Self {
            target_offset: 0.3,
            informativeness_weight: 0.7,
            proximity_weight: 0.3,
            informativeness_width: 1.5,
            exploration_rate: 0.15,
            confidence_interval: 6,
            confidence_margin: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    pub warmup_items: u32,
    pub max_questions: u32,
    pub window_size: usize,
    /// Wall-clock ceiling, enforced by the session driver.
    pub max_session_minutes: u32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            warmup_items: 5,
            max_questions: 40,
            window_size: 8,
            max_session_minutes: 45,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub estimator: EstimatorParams,
    pub mastery: MasteryParams,
    pub selector: SelectorParams,
    pub session: SessionParams,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_f64("PROFICIENCY_ALPHA") {
            config.estimator.alpha_0 = val;
        }
        if let Some(val) = env_f64("PROFICIENCY_DAILY_DECAY") {
            config.estimator.daily_decay = val;
        }
        if let Some(val) = env_f64("PROFICIENCY_MASTERY_THETA") {
            config.mastery.theta_threshold = val;
        }
        if let Some(val) = env_f64("PROFICIENCY_MASTERY_SIGMA") {
            config.mastery.sigma_threshold = val;
        }
        if let Some(val) = env_f64("PROFICIENCY_EXPLORATION_RATE") {
            config.selector.exploration_rate = val;
        }
        if let Some(val) = std::env::var("PROFICIENCY_MAX_QUESTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.session.max_questions = val;
        }

        config
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let est = &self.estimator;
        if est.alpha_0 <= 0.0 {
            return Err(ConfigError::Invalid("estimator.alpha_0 must be positive".into()));
        }
        if !(0.0 < est.sigma_decay && est.sigma_decay <= 1.0) {
            return Err(ConfigError::Invalid("estimator.sigma_decay must be in (0, 1]".into()));
        }
        if est.theta_min >= est.theta_max || est.sigma_min >= est.sigma_max || est.sigma_min <= 0.0 {
            return Err(ConfigError::Invalid("estimator bounds are inverted".into()));
        }
        if est.daily_decay < 0.0 {
            return Err(ConfigError::Invalid("estimator.daily_decay must not be negative".into()));
        }
        if !(0.0..=1.0).contains(&self.mastery.accuracy_threshold) {
            return Err(ConfigError::Invalid("mastery.accuracy_threshold must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.selector.exploration_rate) {
            return Err(ConfigError::Invalid("selector.exploration_rate must be in [0, 1]".into()));
        }
        if self.selector.informativeness_width <= 0.0 {
            return Err(ConfigError::Invalid("selector.informativeness_width must be positive".into()));
        }
        if self.session.window_size == 0 || self.session.max_questions == 0 {
            return Err(ConfigError::Invalid("session window and question limit must be non-zero".into()));
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|value| value.parse::<f64>().ok())
}
