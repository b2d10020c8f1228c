//! Adaptive difficulty controller
//!
//! A pure scoring/decision procedure over a session history:
//! 1. Average consistency over the recent window
//! 2. Blended accuracy estimate over the same window
//! 3. Least-squares trend over the longer trend window
//! 4. Threshold decision relative to the current level (first match wins)
//! 5. Confidence from data volume, plus textual hints
//!
//! The controller never moves more than one level per call.

use crate::level::DifficultyLevel;
use crate::record::SessionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Margin above/below thresholds for a decisive move
const DECISIVE_MARGIN: f64 = 0.2;
/// Slope beyond which a trend is considered non-stable
const TREND_SLOPE: f64 = 0.05;

/// Direction of recent consistency scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Slope above the trend threshold
    Improving,
    /// Slope below the negative trend threshold
    Declining,
    /// Slope within the threshold band
    Stable,
    /// Fewer than two data points
    InsufficientData,
}

impl Trend {
    /// Wire label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trend label plus the regression slope behind it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAnalysis {
    /// Classified trend
    pub trend: Trend,
    /// Least-squares slope of consistency against session index
    pub slope: f64,
}

/// Performance summary used for the decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Mean consistency over the recent window
    pub consistency_score: f64,
    /// Blended accuracy estimate over the recent window
    pub accuracy_rate: f64,
    /// Trend over the trend window
    pub trend: Trend,
}

/// Controller output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Level for the next session
    pub recommended_difficulty: DifficultyLevel,
    /// Human-readable justification
    pub reasoning: String,
    /// Confidence in the recommendation (0.0 - 1.0)
    pub confidence: f64,
    /// Metrics behind the decision (absent without history)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_performance: Option<PerformanceSnapshot>,
    /// Actionable hints for the student
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

/// Adaptive difficulty controller
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveController {
    recent_window: usize,
    trend_window: usize,
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self {
            recent_window: 5,
            trend_window: 10,
        }
    }
}

impl AdaptiveController {
    /// Create controller with the default windows (5 recent, 10 for trend)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recommend the next difficulty level
    ///
    /// An empty history always yields `medium` with confidence 0.5,
    /// regardless of `current`.
    #[must_use]
    pub fn recommend(
        &self,
        history: &[SessionRecord],
        current: DifficultyLevel,
    ) -> Recommendation {
        if history.is_empty() {
            return Recommendation {
                recommended_difficulty: DifficultyLevel::Medium,
                reasoning: "No history available, starting with medium difficulty".to_string(),
                confidence: 0.5,
                current_performance: None,
                recommendations: Vec::new(),
            };
        }

        let recent = tail(history, self.recent_window);
        let consistency = mean(recent.iter().map(|r| r.consistency_score));
        let accuracy = estimate_accuracy(recent);

        let scores: Vec<f64> = tail(history, self.trend_window)
            .iter()
            .map(|r| r.consistency_score)
            .collect();
        let trend = analyze_trend(&scores);

        let (recommended_difficulty, reasoning) = decide(current, consistency, accuracy, trend);
        let confidence = confidence(history.len(), recent.len());

        tracing::debug!(
            %current,
            recommended = %recommended_difficulty,
            consistency,
            accuracy,
            trend = %trend.trend,
            "Adaptive difficulty decided"
        );

        Recommendation {
            recommended_difficulty,
            reasoning,
            confidence,
            current_performance: Some(PerformanceSnapshot {
                consistency_score: consistency,
                accuracy_rate: accuracy,
                trend: trend.trend,
            }),
            recommendations: recommendations(consistency, accuracy, trend.trend),
        }
    }
}

/// Recommend with the default controller
#[must_use]
pub fn recommend(history: &[SessionRecord], current: DifficultyLevel) -> Recommendation {
    AdaptiveController::default().recommend(history, current)
}

fn tail(history: &[SessionRecord], window: usize) -> &[SessionRecord] {
    &history[history.len().saturating_sub(window)..]
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn bool_score(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Three-signal accuracy blend
///
/// With at least one explicit `is_correct == true`, explicit correctness
/// dominates (0.7) over the consistency proxy (0.3). Otherwise the
/// consistency proxy (0.6) and absence of major inconsistencies (0.4) are used.
#[must_use]
pub fn estimate_accuracy(sessions: &[SessionRecord]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }

    let explicit: Vec<bool> = sessions.iter().filter_map(|s| s.is_correct).collect();
    let consistency_proxy = mean(sessions.iter().map(|s| {
        if s.consistency_score >= 0.7 {
            1.0
        } else if s.consistency_score >= 0.5 {
            0.5
        } else {
            0.0
        }
    }));

    if explicit.iter().any(|&c| c) {
        let explicit_accuracy = mean(explicit.iter().map(|&c| bool_score(c)));
        0.7 * explicit_accuracy + 0.3 * consistency_proxy
    } else {
        let error_proxy = mean(
            sessions
                .iter()
                .map(|s| bool_score(!s.has_major_inconsistencies())),
        );
        0.6 * consistency_proxy + 0.4 * error_proxy
    }
}

/// Ordinary least-squares slope of scores against their index
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze_trend(scores: &[f64]) -> TrendAnalysis {
    let n = scores.len();
    if n < 2 {
        return TrendAnalysis {
            trend: Trend::InsufficientData,
            slope: 0.0,
        };
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(scores.iter().copied());

    let (numerator, denominator) =
        scores
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(num, den), (i, &y)| {
                let dx = i as f64 - x_mean;
                (num + dx * (y - y_mean), den + dx * dx)
            });

    // Zero variance in x means a flat line, not a failure
    let slope = if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    };

    let trend = if slope > TREND_SLOPE {
        Trend::Improving
    } else if slope < -TREND_SLOPE {
        Trend::Declining
    } else {
        Trend::Stable
    };

    TrendAnalysis { trend, slope }
}

fn decide(
    current: DifficultyLevel,
    consistency: f64,
    accuracy: f64,
    trend: TrendAnalysis,
) -> (DifficultyLevel, String) {
    let t = current.thresholds();

    if consistency >= t.min_consistency + DECISIVE_MARGIN
        && accuracy >= t.min_accuracy + DECISIVE_MARGIN
    {
        let target = current.harder();
        let reasoning = if target == current {
            format!(
                "Excellent performance (consistency: {consistency:.2}, accuracy: {accuracy:.2}). Already at the hardest level."
            )
        } else {
            format!(
                "Excellent performance (consistency: {consistency:.2}, accuracy: {accuracy:.2}). Ready for harder problems."
            )
        };
        return (target, reasoning);
    }

    if consistency < t.min_consistency - DECISIVE_MARGIN
        || accuracy < t.min_accuracy - DECISIVE_MARGIN
    {
        let target = current.easier();
        let reasoning = if target == current {
            format!(
                "Struggling with current level (consistency: {consistency:.2}, accuracy: {accuracy:.2}). Already at the easiest level."
            )
        } else {
            format!(
                "Struggling with current level (consistency: {consistency:.2}, accuracy: {accuracy:.2}). Moving to easier problems."
            )
        };
        return (target, reasoning);
    }

    if trend.trend == Trend::Declining && consistency < t.min_consistency {
        return (
            current.easier(),
            format!(
                "Performance declining (trend: {:.3}, consistency: {consistency:.2}). Reducing difficulty to maintain engagement.",
                trend.slope
            ),
        );
    }

    if trend.trend == Trend::Improving && consistency >= t.min_consistency {
        return (
            current.harder(),
            format!(
                "Performance improving (trend: {:.3}, consistency: {consistency:.2}). Increasing difficulty to maintain challenge.",
                trend.slope
            ),
        );
    }

    (
        current,
        format!(
            "Performance appropriate for current level (consistency: {consistency:.2}, accuracy: {accuracy:.2})."
        ),
    )
}

#[allow(clippy::cast_precision_loss)]
fn confidence(history_len: usize, recent_len: usize) -> f64 {
    if history_len < 3 {
        return 0.3;
    }
    if recent_len < 3 {
        return 0.5;
    }

    let data_quality = (history_len as f64 / 10.0).min(1.0);
    let recency_bonus = (recent_len as f64 / 10.0).min(0.3);
    (0.4 + data_quality + recency_bonus).min(1.0)
}

fn recommendations(consistency: f64, accuracy: f64, trend: Trend) -> Vec<String> {
    let mut out = Vec::new();

    if consistency < 0.5 {
        out.push("Focus on step-by-step problem solving to improve consistency".to_string());
    }
    if accuracy < 0.6 {
        out.push("Practice basic mathematical operations to improve accuracy".to_string());
    }
    if trend == Trend::Declining {
        out.push("Consider taking breaks between sessions to maintain focus".to_string());
    }
    if consistency > 0.8 && accuracy > 0.8 {
        out.push("Excellent progress! Ready for more challenging problems".to_string());
    }
    if out.is_empty() {
        out.push("Continue with current approach - performance is on track".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repeated(record: SessionRecord, n: usize) -> Vec<SessionRecord> {
        std::iter::repeat(record).take(n).collect()
    }

    #[test]
    fn empty_history_defaults_to_medium() {
        for current in DifficultyLevel::ALL {
            let rec = recommend(&[], current);
            assert_eq!(rec.recommended_difficulty, DifficultyLevel::Medium);
            assert_eq!(rec.confidence, 0.5);
            assert!(rec.current_performance.is_none());
        }
    }

    #[test]
    fn strong_history_promotes_medium_to_hard() {
        let history = repeated(SessionRecord::new(0.9).with_correct(true), 5);
        let rec = recommend(&history, DifficultyLevel::Medium);

        assert_eq!(rec.recommended_difficulty, DifficultyLevel::Hard);
        let perf = rec.current_performance.unwrap();
        assert!((perf.consistency_score - 0.9).abs() < 1e-9);
        assert!((perf.accuracy_rate - 1.0).abs() < 1e-9);
        assert!(rec.reasoning.contains("0.90"));
    }

    #[test]
    fn weak_history_demotes_medium_to_easy() {
        let history = repeated(SessionRecord::new(0.2).with_correct(false), 5);
        let rec = recommend(&history, DifficultyLevel::Medium);

        assert_eq!(rec.recommended_difficulty, DifficultyLevel::Easy);
        let perf = rec.current_performance.unwrap();
        // No explicit true: 0.6 * 0.0 + 0.4 * 1.0
        assert!((perf.accuracy_rate - 0.4).abs() < 1e-9);
    }

    #[test]
    fn easy_promotion_by_threshold_is_unreachable() {
        // Easy needs accuracy >= 1.1 for a decisive promotion, which cannot happen.
        let history = repeated(SessionRecord::new(1.0).with_correct(true), 10);
        let rec = recommend(&history, DifficultyLevel::Easy);

        assert_eq!(rec.recommended_difficulty, DifficultyLevel::Easy);
        assert!(rec.reasoning.starts_with("Performance appropriate"));
    }

    #[test]
    fn improving_trend_promotes_easy() {
        let history: Vec<_> = [0.65, 0.75, 0.85, 0.95, 1.0]
            .into_iter()
            .map(|s| SessionRecord::new(s).with_correct(true))
            .collect();
        let rec = recommend(&history, DifficultyLevel::Easy);

        assert_eq!(rec.recommended_difficulty, DifficultyLevel::Medium);
        assert!(rec.reasoning.starts_with("Performance improving"));
    }

    #[test]
    fn declining_trend_demotes() {
        // consistency 0.54 < 0.6 for medium, accuracy 0.7 * 1.0 + 0.3 * 0.3 = 0.79
        let history: Vec<_> = [0.66, 0.60, 0.54, 0.48, 0.42]
            .into_iter()
            .map(|s| SessionRecord::new(s).with_correct(true))
            .collect();
        let rec = recommend(&history, DifficultyLevel::Medium);

        assert_eq!(rec.recommended_difficulty, DifficultyLevel::Easy);
        assert!(rec.reasoning.starts_with("Performance declining"));
        assert_eq!(rec.current_performance.unwrap().trend, Trend::Declining);
    }

    #[test]
    fn hard_stays_hard_on_excellent_performance() {
        let history = repeated(SessionRecord::new(0.95).with_correct(true), 6);
        let rec = recommend(&history, DifficultyLevel::Hard);
        assert_eq!(rec.recommended_difficulty, DifficultyLevel::Hard);
    }

    #[test]
    fn accuracy_uses_error_proxy_without_explicit_true() {
        let sessions = vec![
            SessionRecord::new(0.8).with_major_inconsistencies(vec![json!("x")]),
            SessionRecord::new(0.6),
        ];
        // consistency proxy: (1.0 + 0.5) / 2 = 0.75; error proxy: 0.5
        let accuracy = estimate_accuracy(&sessions);
        assert!((accuracy - (0.6 * 0.75 + 0.4 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn accuracy_uses_explicit_when_any_true() {
        let sessions = vec![
            SessionRecord::new(0.3).with_correct(true),
            SessionRecord::new(0.3).with_correct(false),
            SessionRecord::new(0.3),
        ];
        // explicit: 0.5; consistency proxy: 0.0
        let accuracy = estimate_accuracy(&sessions);
        assert!((accuracy - 0.35).abs() < 1e-9);
    }

    #[test]
    fn trend_labels() {
        assert_eq!(analyze_trend(&[0.5]).trend, Trend::InsufficientData);
        assert_eq!(analyze_trend(&[]).slope, 0.0);
        assert_eq!(analyze_trend(&[0.5, 0.5, 0.5]).trend, Trend::Stable);
        assert_eq!(analyze_trend(&[0.1, 0.3]).trend, Trend::Improving);
        assert_eq!(analyze_trend(&[0.9, 0.5, 0.1]).trend, Trend::Declining);

        let analysis = analyze_trend(&[0.0, 0.1, 0.2]);
        assert!((analysis.slope - 0.1).abs() < 1e-9);
    }

    #[test]
    fn confidence_scales_with_history() {
        assert_eq!(confidence(1, 1), 0.3);
        assert_eq!(confidence(2, 2), 0.3);
        assert!((confidence(3, 3) - 1.0).abs() < 1e-9);
        assert!((confidence(12, 5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn on_track_message_when_nothing_triggers() {
        let out = recommendations(0.7, 0.7, Trend::Stable);
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("on track"));
    }

    #[test]
    fn recommendation_serializes_wire_shape() {
        let history = repeated(SessionRecord::new(0.9).with_correct(true), 5);
        let value = serde_json::to_value(recommend(&history, DifficultyLevel::Medium)).unwrap();

        assert_eq!(value["recommended_difficulty"], "hard");
        assert_eq!(value["current_performance"]["trend"], "stable");
        assert!(value["recommendations"].is_array());
    }
}
