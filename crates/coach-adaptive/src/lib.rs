//! Coach Adaptive - difficulty recommendation
//!
//! A deterministic controller that turns a student's session history into a
//! recommendation for the next problem's difficulty:
//! - Recent consistency and blended accuracy
//! - Least-squares trend of consistency scores
//! - Per-level thresholds with one-level moves, clamped to the scale
//!
//! # Example
//!
//! ```rust
//! use coach_adaptive::{recommend, DifficultyLevel, SessionRecord};
//!
//! let history = vec![SessionRecord::new(0.9).with_correct(true); 5];
//! let rec = recommend(&history, DifficultyLevel::Medium);
//! assert_eq!(rec.recommended_difficulty, DifficultyLevel::Hard);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod controller;
pub mod error;
pub mod level;
pub mod record;

// Re-exports
pub use controller::{
    analyze_trend, estimate_accuracy, recommend, AdaptiveController, PerformanceSnapshot,
    Recommendation, Trend, TrendAnalysis,
};
pub use error::AdaptiveError;
pub use level::{DifficultyLevel, Thresholds};
pub use record::{history_from_value, parse_history, ConsistencyResults, HistoryInput, SessionRecord};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
