use crate::proficiency::types::{DifficultyLabel, ItemParameters};

const EASY_B: f64 = -1.5;
const MEDIUM_B: f64 = 0.0;
const HARD_B: f64 = 1.5;

const EASY_A: f64 = 0.8;
const MEDIUM_A: f64 = 1.2;
const HARD_A: f64 = 1.0;

const FALLBACK: ItemParameters = ItemParameters { a: EASY_A, b: MEDIUM_B, c: 0.0 };

pub fn parameters_for(label: DifficultyLabel) -> ItemParameters {
    match label {
        DifficultyLabel::Easy => ItemParameters::new(EASY_A, EASY_B),
        DifficultyLabel::Medium => ItemParameters::new(MEDIUM_A, MEDIUM_B),
        DifficultyLabel::Hard => ItemParameters::new(HARD_A, HARD_B),
    }
}

/// Maps a raw catalog label. Unknown labels fall back to a neutral item.
pub fn parameters_for_label(label: &str) -> ItemParameters {
    match DifficultyLabel::parse(label) {
        Some(known) => parameters_for(known),
        None => {
            tracing::trace!(label, "unknown difficulty label, using fallback parameters");
            FALLBACK
        }
    }
}

pub fn probability_correct(theta: f64, item: &ItemParameters) -> f64 {
    let c = item.c.clamp(0.0, 1.0);
    let p = c + (1.0 - c) / (1.0 + (-item.a * (theta - item.b)).exp());
    p.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table() {
        let medium = parameters_for_label("medium");
        assert_eq!((medium.a, medium.b), (1.2, 0.0));
        let hard = parameters_for_label("HARD");
        assert_eq!((hard.a, hard.b), (1.0, 1.5));
        let easy = parameters_for_label("easy");
        assert_eq!((easy.a, easy.b), (0.8, -1.5));
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let item = parameters_for_label("legendary");
        assert_eq!((item.a, item.b, item.c), (0.8, 0.0, 0.0));
        let empty = parameters_for_label("");
        assert_eq!(empty, item);
    }

    #[test]
    fn test_probability_at_threshold_is_half() {
        let item = ItemParameters::new(1.2, 0.0);
        assert!((probability_correct(0.0, &item) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_probability_increases_with_theta() {
        let item = ItemParameters::new(1.0, 1.5);
        let low = probability_correct(-1.0, &item);
        let high = probability_correct(2.0, &item);
        assert!(high > low);
    }

    #[test]
    fn test_guessing_floor() {
        let item = ItemParameters { a: 1.0, b: 0.0, c: 0.25 };
        let p = probability_correct(-50.0, &item);
        assert!((p - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_worked_example_probability() {
        let p = probability_correct(-1.0, &parameters_for(DifficultyLabel::Medium));
        assert!((p - 0.2315).abs() < 1e-3);
    }
}
