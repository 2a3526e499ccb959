//! Recommendation Ranker
//!
//! 为新到的一桌客人筛选并排序候选桌台，附带理由和建议操作。
//!
//! # 评分权重
//!
//! | 因子 | 权重 |
//! |------|------|
//! | 容量匹配 | 40% |
//! | 状态就绪 | 30% |
//! | 区域偏好 | 15% |
//! | 预计等待 | 10% |
//! | 服务等级 | 5% |

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::models::{DiningTable, ServicePriority, TableStatus};
use shared::util::now_millis;

use crate::availability::AvailabilityPredictor;
use crate::utils::round2;

const CAPACITY_WEIGHT: f64 = 0.40;
const STATUS_WEIGHT: f64 = 0.30;
const ZONE_WEIGHT: f64 = 0.15;
const WAIT_WEIGHT: f64 = 0.10;
const SERVICE_WEIGHT: f64 = 0.05;

/// Neutral factor value when the guest expressed no preference
const NEUTRAL_PREFERENCE: f64 = 0.7;

pub const DEFAULT_LIMIT: usize = 5;
pub const DEFAULT_MAX_WAIT_MINUTES: i64 = 15;

/// 客人的软偏好
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatingPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_zone: Option<String>,
    /// 可接受的最长等待 (分钟)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_level: Option<ServicePriority>,
}

/// 匹配程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suitability {
    Perfect,
    Good,
    Acceptable,
}

impl Suitability {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Suitability::Perfect
        } else if score >= 0.6 {
            Suitability::Good
        } else {
            Suitability::Acceptable
        }
    }
}

/// 单个桌台推荐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub table: DiningTable,
    /// 0..=1, two decimals
    pub score: f64,
    pub suitability: Suitability,
    pub estimated_wait: i64,
    pub reasons: Vec<String>,
}

/// 一次推荐请求的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Descending by score, at most `limit` entries
    pub recommendations: Vec<Recommendation>,
    /// Minimum wait across every fitting table in the snapshot
    pub estimated_wait: i64,
    pub suggested_actions: Vec<String>,
}

/// 桌台推荐排序器
#[derive(Debug, Clone)]
pub struct RecommendationRanker {
    predictor: Arc<AvailabilityPredictor>,
    limit: usize,
    default_max_wait: i64,
}

impl RecommendationRanker {
    pub fn new(predictor: Arc<AvailabilityPredictor>) -> Self {
        Self {
            predictor,
            limit: DEFAULT_LIMIT,
            default_max_wait: DEFAULT_MAX_WAIT_MINUTES,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_default_max_wait(mut self, minutes: i64) -> Self {
        self.default_max_wait = minutes;
        self
    }

    pub fn predictor(&self) -> &Arc<AvailabilityPredictor> {
        &self.predictor
    }

    /// Rank the predictor's current snapshot for a party
    pub fn get_smart_recommendations(
        &self,
        party_size: u32,
        preferences: &SeatingPreferences,
    ) -> RecommendationResult {
        self.get_smart_recommendations_at(party_size, preferences, now_millis())
    }

    pub fn get_smart_recommendations_at(
        &self,
        party_size: u32,
        preferences: &SeatingPreferences,
        now: i64,
    ) -> RecommendationResult {
        let tables = self.predictor.tables();
        let max_wait = preferences.max_wait_time.unwrap_or(self.default_max_wait);

        let mut candidates: Vec<Recommendation> = tables
            .iter()
            .filter(|t| t.fits(party_size))
            .filter_map(|t| {
                let wait = self.predictor.predict_availability_time_at(t, now);
                (t.status == TableStatus::Available || wait <= max_wait)
                    .then(|| self.score_table(t, party_size, wait, preferences))
            })
            .collect();

        candidates.sort_by(compare_recommendations);

        let estimated_wait = self
            .predictor
            .calculate_wait_time_at(party_size, &tables, now);
        let suggested_actions = suggest_actions(&candidates, party_size, estimated_wait);

        tracing::debug!(
            party_size,
            candidates = candidates.len(),
            estimated_wait,
            "Seating recommendations computed"
        );

        candidates.truncate(self.limit);
        RecommendationResult {
            recommendations: candidates,
            estimated_wait,
            suggested_actions,
        }
    }

    fn score_table(
        &self,
        table: &DiningTable,
        party_size: u32,
        wait: i64,
        preferences: &SeatingPreferences,
    ) -> Recommendation {
        let raw = CAPACITY_WEIGHT * capacity_score(party_size, table.capacity)
            + STATUS_WEIGHT * status_readiness(table.status)
            + ZONE_WEIGHT * zone_preference_score(table, preferences.preferred_zone.as_deref())
            + WAIT_WEIGHT * wait_score(wait)
            + SERVICE_WEIGHT * service_level_score(table, preferences.service_level);
        let score = round2(raw);

        Recommendation {
            reasons: build_reasons(table, party_size, wait, preferences),
            table: table.clone(),
            score,
            suitability: Suitability::from_score(score),
            estimated_wait: wait,
        }
    }
}

/// score desc, then shorter wait, smaller table, table id
fn compare_recommendations(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.estimated_wait.cmp(&b.estimated_wait))
        .then(a.table.capacity.cmp(&b.table.capacity))
        .then_with(|| a.table.id.cmp(&b.table.id))
}

/// 容量匹配度 (party / capacity)
pub fn capacity_score(party_size: u32, capacity: u32) -> f64 {
    if capacity < party_size || capacity == 0 {
        return 0.0;
    }
    let ratio = f64::from(party_size) / f64::from(capacity);
    if ratio >= 0.8 {
        1.0
    } else if ratio >= 0.6 {
        0.9
    } else if ratio >= 0.4 {
        0.7
    } else if ratio >= 0.25 {
        0.5
    } else {
        0.3
    }
}

/// 状态就绪度
pub fn status_readiness(status: TableStatus) -> f64 {
    match status {
        TableStatus::Available => 1.0,
        TableStatus::Cleaning => 0.8,
        TableStatus::NeedsService => 0.6,
        TableStatus::Dining => 0.4,
        TableStatus::WaitingFood => 0.3,
        TableStatus::Ordered => 0.2,
        TableStatus::Seated => 0.1,
        TableStatus::Reserved => 0.0,
    }
}

/// Zone match is case-insensitive
pub fn zone_preference_score(table: &DiningTable, preferred_zone: Option<&str>) -> f64 {
    match preferred_zone {
        None => NEUTRAL_PREFERENCE,
        Some(zone) if table.zone.eq_ignore_ascii_case(zone) => 1.0,
        Some(_) => 0.3,
    }
}

pub fn wait_score(minutes: i64) -> f64 {
    match minutes {
        i64::MIN..=0 => 1.0,
        1..=5 => 0.9,
        6..=10 => 0.7,
        11..=15 => 0.5,
        16..=30 => 0.3,
        _ => 0.1,
    }
}

pub fn service_level_score(table: &DiningTable, requested: Option<ServicePriority>) -> f64 {
    match requested {
        None => NEUTRAL_PREFERENCE,
        Some(level) if table.priority.rank() >= level.rank() => 1.0,
        Some(_) => 0.5,
    }
}

fn build_reasons(
    table: &DiningTable,
    party_size: u32,
    wait: i64,
    preferences: &SeatingPreferences,
) -> Vec<String> {
    let mut reasons = Vec::new();

    let fit = capacity_score(party_size, table.capacity);
    if fit >= 1.0 {
        reasons.push(format!(
            "Ideal size: {} seats for {} guests",
            table.capacity, party_size
        ));
    } else if fit >= 0.7 {
        reasons.push(format!(
            "Comfortable fit: {} seats for {} guests",
            table.capacity, party_size
        ));
    } else {
        reasons.push(format!(
            "Spacious: {} seats for {} guests",
            table.capacity, party_size
        ));
    }

    if wait == 0 {
        reasons.push("Available now".to_string());
    } else {
        reasons.push(format!("Estimated wait {wait} minutes"));
    }

    if let Some(zone) = preferences.preferred_zone.as_deref()
        && table.zone.eq_ignore_ascii_case(zone)
    {
        reasons.push(format!("In preferred zone ({})", table.zone));
    }

    if table.priority.is_elevated() {
        reasons.push("High-priority service table".to_string());
    }

    if let Some(notes) = table.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        reasons.push(format!("Note: {notes}"));
    }

    reasons
}

fn suggest_actions(candidates: &[Recommendation], party_size: u32, estimated_wait: i64) -> Vec<String> {
    let mut actions = Vec::new();

    if candidates.is_empty() {
        actions.push("No suitable table right now; offer the waitlist or a reservation".to_string());
        return actions;
    }

    if candidates.iter().any(|c| c.estimated_wait == 0) {
        actions.push("Seat immediately".to_string());
    } else if estimated_wait <= 10 {
        actions.push(format!("Ask the party to wait about {estimated_wait} minutes"));
    } else if estimated_wait <= 30 {
        actions.push("Hand out a queue number or take a reservation".to_string());
    } else {
        actions.push("Suggest reserving a later time slot".to_string());
    }

    let perfect = candidates
        .iter()
        .filter(|c| c.suitability == Suitability::Perfect)
        .count();
    if perfect > 0 {
        actions.push(format!("{perfect} perfect match(es) found"));
    }

    if candidates
        .iter()
        .any(|c| c.table.capacity >= party_size.saturating_mul(2).max(1))
    {
        actions.push("Larger tables are open if the party does not mind extra space".to_string());
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60_000;
    const NOW: i64 = 1_700_000_000_000;

    fn table(id: &str, capacity: u32, status: TableStatus, zone: &str) -> DiningTable {
        DiningTable::new(id, capacity, zone).with_status(status)
    }

    fn ranker(tables: Vec<DiningTable>) -> RecommendationRanker {
        RecommendationRanker::new(Arc::new(AvailabilityPredictor::new(tables)))
    }

    #[test]
    fn test_capacity_score_bands() {
        assert_eq!(capacity_score(2, 2), 1.0);
        assert_eq!(capacity_score(4, 5), 1.0);
        assert_eq!(capacity_score(3, 5), 0.9);
        assert_eq!(capacity_score(2, 5), 0.7);
        assert_eq!(capacity_score(2, 8), 0.5);
        assert_eq!(capacity_score(1, 8), 0.3);
        assert_eq!(capacity_score(5, 4), 0.0);
    }

    #[test]
    fn test_wait_score_bands() {
        let cases = [(0, 1.0), (5, 0.9), (10, 0.7), (15, 0.5), (30, 0.3), (31, 0.1)];
        for (minutes, expected) in cases {
            assert_eq!(wait_score(minutes), expected, "minutes = {minutes}");
        }
    }

    #[test]
    fn test_preference_scores() {
        let t = table("A", 4, TableStatus::Available, "Terrace").with_priority(ServicePriority::High);
        assert_eq!(zone_preference_score(&t, None), 0.7);
        assert_eq!(zone_preference_score(&t, Some("terrace")), 1.0);
        assert_eq!(zone_preference_score(&t, Some("hall")), 0.3);

        assert_eq!(service_level_score(&t, None), 0.7);
        assert_eq!(service_level_score(&t, Some(ServicePriority::Normal)), 1.0);
        assert_eq!(service_level_score(&t, Some(ServicePriority::High)), 1.0);
        assert_eq!(service_level_score(&t, Some(ServicePriority::Urgent)), 0.5);
    }

    #[test]
    fn test_suitability_thresholds() {
        assert_eq!(Suitability::from_score(0.8), Suitability::Perfect);
        assert_eq!(Suitability::from_score(0.79), Suitability::Good);
        assert_eq!(Suitability::from_score(0.6), Suitability::Good);
        assert_eq!(Suitability::from_score(0.59), Suitability::Acceptable);
    }

    #[test]
    fn test_exact_fit_available_table() {
        let r = ranker(vec![table("A1", 2, TableStatus::Available, "hall")]);
        let result = r.get_smart_recommendations_at(2, &SeatingPreferences::default(), NOW);

        assert_eq!(result.estimated_wait, 0);
        let top = &result.recommendations[0];
        // 0.4 + 0.3 + 0.105 + 0.1 + 0.035
        assert_eq!(top.score, 0.94);
        assert_eq!(top.suitability, Suitability::Perfect);
        assert!(top.reasons.contains(&"Available now".to_string()));
        assert_eq!(result.suggested_actions[0], "Seat immediately");
        assert!(result.suggested_actions.iter().any(|a| a.contains("perfect match")));
    }

    #[test]
    fn test_candidates_filtered_by_capacity_and_wait() {
        let r = ranker(vec![
            table("small", 2, TableStatus::Available, "hall"),
            table("clean", 4, TableStatus::Cleaning, "hall"),
            table("busy", 4, TableStatus::WaitingFood, "hall"),
            table("free", 6, TableStatus::Available, "hall"),
        ]);
        let result = r.get_smart_recommendations_at(4, &SeatingPreferences::default(), NOW);

        let ids: Vec<_> = result.recommendations.iter().map(|c| c.table.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"clean"));
        assert!(ids.contains(&"free"));
    }

    #[test]
    fn test_max_wait_preference_widens_candidates() {
        let r = ranker(vec![table("busy", 4, TableStatus::WaitingFood, "hall")]);
        let strict = r.get_smart_recommendations_at(4, &SeatingPreferences::default(), NOW);
        assert!(strict.recommendations.is_empty());
        assert_eq!(strict.estimated_wait, 60);
        assert!(strict.suggested_actions[0].starts_with("No suitable table"));

        let relaxed = SeatingPreferences {
            max_wait_time: Some(60),
            ..Default::default()
        };
        let result = r.get_smart_recommendations_at(4, &relaxed, NOW);
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.suggested_actions[0], "Suggest reserving a later time slot");
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let tables: Vec<_> = (0..8)
            .map(|i| {
                let status = if i % 2 == 0 {
                    TableStatus::Available
                } else {
                    TableStatus::Cleaning
                };
                table(&format!("T{i}"), 2 + i, status, "hall")
            })
            .collect();
        let r = ranker(tables);
        let result = r.get_smart_recommendations_at(2, &SeatingPreferences::default(), NOW);

        assert_eq!(result.recommendations.len(), 5);
        for pair in result.recommendations.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(result.recommendations[0].table.id, "T0");
        assert!(result.suggested_actions.iter().any(|a| a.contains("Larger tables")));
    }

    #[test]
    fn test_zone_preference_breaks_ranking() {
        let r = ranker(vec![
            table("hall", 4, TableStatus::Available, "hall"),
            table("terrace", 4, TableStatus::Available, "terrace"),
        ]);
        let prefs = SeatingPreferences {
            preferred_zone: Some("Terrace".into()),
            ..Default::default()
        };
        let result = r.get_smart_recommendations_at(4, &prefs, NOW);
        assert_eq!(result.recommendations[0].table.id, "terrace");
        assert!(result.recommendations[0]
            .reasons
            .iter()
            .any(|r| r.contains("preferred zone")));
    }

    #[test]
    fn test_tie_break_prefers_shorter_wait_then_id() {
        let r = ranker(vec![
            table("B", 4, TableStatus::Available, "hall"),
            table("A", 4, TableStatus::Available, "hall"),
        ]);
        let result = r.get_smart_recommendations_at(4, &SeatingPreferences::default(), NOW);
        let ids: Vec<_> = result.recommendations.iter().map(|c| c.table.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_wait_tier_advice() {
        let mut soon = table("D", 4, TableStatus::Dining, "hall");
        soon.dining_start_time = Some(NOW - 50 * MIN);
        let r = ranker(vec![table("C", 4, TableStatus::Cleaning, "hall"), soon]);
        let result = r.get_smart_recommendations_at(4, &SeatingPreferences::default(), NOW);
        assert_eq!(result.estimated_wait, 10);
        assert_eq!(result.suggested_actions[0], "Ask the party to wait about 10 minutes");
        assert_eq!(result.recommendations.len(), 2);
    }

    #[test]
    fn test_reasons_echo_table_notes_and_priority() {
        let mut t = table("V", 4, TableStatus::Available, "vip").with_priority(ServicePriority::Urgent);
        t.notes = Some("Window view".into());
        let r = ranker(vec![t]);
        let result = r.get_smart_recommendations_at(3, &SeatingPreferences::default(), NOW);
        let reasons = &result.recommendations[0].reasons;
        assert!(reasons.iter().any(|r| r == "High-priority service table"));
        assert!(reasons.iter().any(|r| r == "Note: Window view"));
    }
}
