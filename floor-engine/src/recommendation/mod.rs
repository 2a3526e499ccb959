//! 智能桌台推荐

pub mod ranker;

pub use ranker::{
    Recommendation, RecommendationRanker, RecommendationResult, SeatingPreferences, Suitability,
};
