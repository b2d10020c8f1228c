//! Range and step properties of the adaptive controller.

use coach_adaptive::{analyze_trend, recommend, DifficultyLevel, SessionRecord, Trend};
use proptest::prelude::*;

fn level() -> impl Strategy<Value = DifficultyLevel> {
    prop_oneof![
        Just(DifficultyLevel::Easy),
        Just(DifficultyLevel::Medium),
        Just(DifficultyLevel::Hard),
    ]
}

fn record() -> impl Strategy<Value = SessionRecord> {
    (0.0f64..=1.0, proptest::option::of(any::<bool>()), 0usize..3).prop_map(
        |(score, correct, errors)| {
            let mut record = SessionRecord::new(score);
            record.is_correct = correct;
            if errors > 0 {
                record = record.with_major_inconsistencies(
                    (0..errors).map(|i| serde_json::json!(i)).collect(),
                );
            }
            record
        },
    )
}

proptest! {
    #[test]
    fn prop_moves_at_most_one_level(
        history in proptest::collection::vec(record(), 1..20),
        current in level(),
    ) {
        let rec = recommend(&history, current);
        let from = current.index() as i64;
        let to = rec.recommended_difficulty.index() as i64;
        prop_assert!((from - to).abs() <= 1);
    }

    #[test]
    fn prop_short_history_has_low_confidence(
        history in proptest::collection::vec(record(), 0..3),
        current in level(),
    ) {
        let rec = recommend(&history, current);
        prop_assert!(rec.confidence <= 0.5);
    }

    #[test]
    fn prop_confidence_and_accuracy_in_unit_range(
        history in proptest::collection::vec(record(), 0..30),
        current in level(),
    ) {
        let rec = recommend(&history, current);
        prop_assert!((0.0..=1.0).contains(&rec.confidence));
        if let Some(perf) = rec.current_performance {
            prop_assert!((0.0..=1.0).contains(&perf.accuracy_rate));
            prop_assert!((0.0..=1.0).contains(&perf.consistency_score));
        }
    }

    #[test]
    fn prop_trend_label_matches_slope(scores in proptest::collection::vec(0.0f64..=1.0, 0..12)) {
        let analysis = analyze_trend(&scores);
        let expected = if scores.len() < 2 {
            Trend::InsufficientData
        } else if analysis.slope > 0.05 {
            Trend::Improving
        } else if analysis.slope < -0.05 {
            Trend::Declining
        } else {
            Trend::Stable
        };
        prop_assert_eq!(analysis.trend, expected);
    }

    #[test]
    fn prop_empty_history_ignores_current(current in level()) {
        let rec = recommend(&[], current);
        prop_assert_eq!(rec.recommended_difficulty, DifficultyLevel::Medium);
        prop_assert_eq!(rec.confidence, 0.5);
    }
}

#[test]
fn trend_uses_only_last_ten_sessions() {
    // Ten flat sessions preceded by a steep climb: the climb is outside the window.
    let mut history: Vec<_> = [0.0, 0.2, 0.4, 0.6]
        .into_iter()
        .map(SessionRecord::new)
        .collect();
    history.extend(std::iter::repeat(SessionRecord::new(0.7)).take(10));

    let rec = recommend(&history, DifficultyLevel::Medium);
    assert_eq!(rec.current_performance.unwrap().trend, Trend::Stable);
}

#[test]
fn empty_history_overrides_hard() {
    let rec = recommend(&[], DifficultyLevel::Hard);
    assert_eq!(rec.recommended_difficulty, DifficultyLevel::Medium);
    assert_eq!(rec.confidence, 0.5);
}
