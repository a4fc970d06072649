use crate::proficiency::config::MasteryParams;

/// Mastery check. The accuracy criterion only applies when a full recency
/// window is supplied; without one, theta and sigma alone decide.
pub fn is_mastered(
    already_mastered: bool,
    theta: f64,
    sigma: f64,
    recent_accuracy: Option<f64>,
    params: &MasteryParams,
) -> bool {
    if already_mastered {
        return true;
    }

    let stable_ability = theta >= params.theta_threshold && sigma <= params.sigma_threshold;
    match recent_accuracy {
        Some(accuracy) => stable_ability && accuracy >= params.accuracy_threshold,
        None => stable_ability,
    }
}
