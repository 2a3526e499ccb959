//! Service Priority Scorer
//!
//! Combines wait time, table class, party size, special-needs notes and VIP
//! signals into a 0-100 score. Each factor is clamped to its own weight before
//! summation. Pure function of (order, table, now).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared::models::{DiningTable, ServiceOrder};
use shared::util::{elapsed_minutes, now_millis};

use super::config::PriorityConfig;

/// Score thresholds for the level when no wait override applies
const URGENT_SCORE: u8 = 80;
const HIGH_SCORE: u8 = 60;
const NORMAL_SCORE: u8 = 30;

/// 优先级等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    Normal,
    High,
    Urgent,
}

/// Per-factor contribution, each within `[0, weight]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityFactors {
    pub wait_time: f64,
    pub table_type: f64,
    pub party_size: f64,
    pub special_needs: f64,
    pub vip_status: f64,
}

impl PriorityFactors {
    pub fn sum(&self) -> f64 {
        self.wait_time + self.table_type + self.party_size + self.special_needs + self.vip_status
    }
}

/// 订单服务优先级 (每次计算新建，不持久化)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub order_id: String,
    pub factors: PriorityFactors,
    /// 0..=100
    pub total: u8,
    pub level: PriorityLevel,
    pub wait_minutes: i64,
    /// Matched special-needs categories, in table order
    pub special_needs: Vec<String>,
    pub reasons: Vec<String>,
}

/// 服务优先级评分器
///
/// 无内部可变状态，可跨线程共享。
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    config: PriorityConfig,
}

impl PriorityScorer {
    pub fn new(config: PriorityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PriorityConfig {
        &self.config
    }

    /// Score one order against the current clock
    pub fn calculate_service_priority(
        &self,
        order: &ServiceOrder,
        table: Option<&DiningTable>,
    ) -> PriorityScore {
        self.calculate_service_priority_at(order, table, now_millis())
    }

    pub fn calculate_service_priority_at(
        &self,
        order: &ServiceOrder,
        table: Option<&DiningTable>,
        now: i64,
    ) -> PriorityScore {
        let wait_minutes = elapsed_minutes(order.created_at, now);
        let party_size = table
            .and_then(|t| t.current_party_size)
            .or(order.guest_count)
            .unwrap_or(0);
        let notes = order.combined_notes();
        let special_needs = self.matched_special_needs(&notes);

        let factors = PriorityFactors {
            wait_time: self.wait_time_score(wait_minutes),
            table_type: table.map_or(0.0, |t| self.table_type_score(t)),
            party_size: self.party_size_score(party_size),
            special_needs: self.special_needs_score(&special_needs),
            vip_status: table.map_or(0.0, |t| self.vip_status_score(t)),
        };

        let total = factors.sum().round().clamp(0.0, 100.0) as u8;
        let level = self.level_for(total, wait_minutes);
        let reasons = self.build_reasons(wait_minutes, table, party_size, &factors, &special_needs);

        tracing::trace!(
            order_id = %order.id,
            total,
            ?level,
            wait_minutes,
            "Service priority calculated"
        );

        PriorityScore {
            order_id: order.id.clone(),
            factors,
            total,
            level,
            wait_minutes,
            special_needs,
            reasons,
        }
    }

    /// 批量评分，按 `table_id` 匹配桌台；未匹配的订单按无桌台信息处理
    pub fn calculate_batch_priority(
        &self,
        orders: &[ServiceOrder],
        tables: &[DiningTable],
    ) -> Vec<PriorityScore> {
        self.calculate_batch_priority_at(orders, tables, now_millis())
    }

    pub fn calculate_batch_priority_at(
        &self,
        orders: &[ServiceOrder],
        tables: &[DiningTable],
        now: i64,
    ) -> Vec<PriorityScore> {
        let by_id: HashMap<&str, &DiningTable> =
            tables.iter().map(|t| (t.id.as_str(), t)).collect();

        orders
            .iter()
            .map(|order| {
                let table = order
                    .table_id
                    .as_deref()
                    .and_then(|id| by_id.get(id).copied());
                self.calculate_service_priority_at(order, table, now)
            })
            .collect()
    }

    /// Level: wait overrides first, then score bands
    pub fn level_for(&self, total: u8, wait_minutes: i64) -> PriorityLevel {
        let t = &self.config.thresholds;
        if wait_minutes >= t.urgent {
            return PriorityLevel::Urgent;
        }
        if wait_minutes >= t.high {
            return PriorityLevel::High;
        }
        match total {
            s if s >= URGENT_SCORE => PriorityLevel::Urgent,
            s if s >= HIGH_SCORE => PriorityLevel::High,
            s if s >= NORMAL_SCORE => PriorityLevel::Normal,
            _ => PriorityLevel::Low,
        }
    }

    fn wait_time_score(&self, minutes: i64) -> f64 {
        let t = &self.config.thresholds;
        let w = self.config.weights.wait_time;
        let score = if minutes >= t.urgent {
            w
        } else if minutes >= t.high {
            w * 0.8
        } else if minutes >= t.normal {
            w * 0.5
        } else if minutes >= t.low {
            w * 0.2
        } else {
            0.0
        };
        score.min(w)
    }

    fn table_type_score(&self, table: &DiningTable) -> f64 {
        let w = self.config.weights.table_type;
        let mut score = 0.0;
        if table.is_vip_zone() {
            score += w * 0.6 * self.config.vip_multiplier;
        }
        if table.capacity >= self.config.large_table_capacity {
            score += w * 0.1 * f64::from(table.capacity);
        }
        if table.priority.is_elevated() {
            score += w * 0.2;
        }
        score.min(w)
    }

    fn party_size_score(&self, party_size: u32) -> f64 {
        let w = self.config.weights.party_size;
        let threshold = self.config.large_party_threshold;
        let score = if party_size >= threshold {
            w * (1.0 + 0.2 * f64::from(party_size - threshold + 1))
        } else {
            w * 0.1 * f64::from(party_size)
        };
        score.min(w)
    }

    fn matched_special_needs(&self, notes: &str) -> Vec<String> {
        if notes.is_empty() {
            return Vec::new();
        }
        self.config
            .special_needs
            .iter()
            .filter(|c| c.matches(notes))
            .map(|c| c.category.clone())
            .collect()
    }

    fn special_needs_score(&self, matched: &[String]) -> f64 {
        let w = self.config.weights.special_needs;
        let score: f64 = self
            .config
            .special_needs
            .iter()
            .filter(|c| matched.contains(&c.category))
            .map(|c| c.points)
            .fold(0.0, |acc, points| acc + points);
        score.min(w)
    }

    fn vip_status_score(&self, table: &DiningTable) -> f64 {
        let w = self.config.weights.vip_status;
        let mut score = 0.0;
        if table.is_vip_zone() {
            score += w * 0.7;
        }
        if table.priority.is_elevated() {
            score += w * 0.3;
        }
        score.min(w)
    }

    fn build_reasons(
        &self,
        wait_minutes: i64,
        table: Option<&DiningTable>,
        party_size: u32,
        factors: &PriorityFactors,
        special_needs: &[String],
    ) -> Vec<String> {
        let t = &self.config.thresholds;
        let mut reasons = Vec::new();

        if wait_minutes >= t.high {
            reasons.push(format!("Long wait: {wait_minutes} minutes since order"));
        } else if wait_minutes >= t.normal {
            reasons.push(format!("Waiting {wait_minutes} minutes"));
        }

        if let Some(table) = table {
            if table.is_vip_zone() {
                reasons.push(format!("VIP area ({})", table.zone));
            } else if table.priority.is_elevated() {
                reasons.push("High-priority table".to_string());
            }
            if table.capacity >= self.config.large_table_capacity {
                reasons.push(format!("Large table ({} seats)", table.capacity));
            }
        }

        if party_size >= self.config.large_party_threshold {
            reasons.push(format!("Large party ({party_size} guests)"));
        }

        if factors.special_needs > 0.0 {
            reasons.push(format!("Special needs: {}", special_needs.join(", ")));
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ServicePriority, TableStatus};

    const MIN: i64 = 60_000;
    const NOW: i64 = 1_700_000_000_000;

    fn scorer() -> PriorityScorer {
        PriorityScorer::default()
    }

    fn order_waited(minutes: i64) -> ServiceOrder {
        ServiceOrder::new("o1", NOW - minutes * MIN)
    }

    fn table(capacity: u32, zone: &str) -> DiningTable {
        DiningTable::new("T1", capacity, zone).with_status(TableStatus::Dining)
    }

    #[test]
    fn test_long_wait_without_table_is_urgent() {
        let score = scorer().calculate_service_priority_at(&order_waited(22), None, NOW);
        assert_eq!(score.factors.wait_time, 30.0);
        assert_eq!(score.factors.table_type, 0.0);
        assert_eq!(score.factors.vip_status, 0.0);
        assert_eq!(score.level, PriorityLevel::Urgent);
        assert_eq!(score.total, 30);
        assert_eq!(score.wait_minutes, 22);
    }

    #[test]
    fn test_wait_time_steps() {
        let s = scorer();
        let cases = [(0, 0.0), (4, 0.0), (5, 6.0), (9, 6.0), (10, 15.0), (15, 24.0), (19, 24.0), (20, 30.0), (90, 30.0)];
        for (minutes, expected) in cases {
            let score = s.calculate_service_priority_at(&order_waited(minutes), None, NOW);
            assert_eq!(score.factors.wait_time, expected, "minutes = {minutes}");
        }
    }

    #[test]
    fn test_wait_overrides_level() {
        let s = scorer();
        assert_eq!(s.level_for(0, 20), PriorityLevel::Urgent);
        assert_eq!(s.level_for(0, 15), PriorityLevel::High);
        assert_eq!(s.level_for(90, 16), PriorityLevel::High);
        assert_eq!(s.level_for(80, 0), PriorityLevel::Urgent);
        assert_eq!(s.level_for(60, 0), PriorityLevel::High);
        assert_eq!(s.level_for(30, 0), PriorityLevel::Normal);
        assert_eq!(s.level_for(29, 0), PriorityLevel::Low);
    }

    #[test]
    fn test_vip_zone_table() {
        let vip = table(4, "VIP Lounge").with_priority(ServicePriority::High);
        let score = scorer().calculate_service_priority_at(&order_waited(0), Some(&vip), NOW);
        // 0.6 * 20 * 1.5 = 18, + 4 for high class, clamped to 20
        assert_eq!(score.factors.table_type, 20.0);
        // 0.7 * 15 + 0.3 * 15
        assert!((score.factors.vip_status - 15.0).abs() < 1e-9);
        assert!(score.reasons.iter().any(|r| r.contains("VIP area")));
    }

    #[test]
    fn test_large_table_contribution() {
        let big = table(8, "hall");
        let score = scorer().calculate_service_priority_at(&order_waited(0), Some(&big), NOW);
        assert_eq!(score.factors.table_type, 16.0);
        assert_eq!(score.factors.vip_status, 0.0);
        assert!(score.reasons.iter().any(|r| r.contains("Large table (8 seats)")));
    }

    #[test]
    fn test_party_size_factor() {
        let s = scorer();
        let mut t = table(10, "hall");

        t.current_party_size = Some(3);
        let small = s.calculate_service_priority_at(&order_waited(0), Some(&t), NOW);
        assert!((small.factors.party_size - 6.0).abs() < 1e-9);

        t.current_party_size = Some(6);
        let large = s.calculate_service_priority_at(&order_waited(0), Some(&t), NOW);
        assert_eq!(large.factors.party_size, 20.0);
        assert!(large.reasons.iter().any(|r| r.contains("Large party (6 guests)")));
    }

    #[test]
    fn test_party_size_falls_back_to_guest_count() {
        let mut order = order_waited(0);
        order.guest_count = Some(2);
        let score = scorer().calculate_service_priority_at(&order, None, NOW);
        assert!((score.factors.party_size - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_special_needs_keyword_table() {
        let s = scorer();
        let cases: [(&str, f64, &[&str]); 5] = [
            ("Peanut ALLERGY at seat 2", 10.0, &["allergy"]),
            ("vegan please", 8.0, &["special_diet"]),
            ("birthday cake after mains", 12.0, &["celebration"]),
            ("business lunch with client", 15.0, &["business"]),
            ("allergy + birthday", 15.0, &["allergy", "celebration"]),
        ];
        for (note, expected, categories) in cases {
            let order = order_waited(0).with_note(note);
            let score = s.calculate_service_priority_at(&order, None, NOW);
            assert_eq!(score.factors.special_needs, expected, "note = {note}");
            assert_eq!(score.special_needs, categories, "note = {note}");
        }
    }

    #[test]
    fn test_special_needs_from_item_notes() {
        let order = order_waited(0)
            .with_item("Pad Thai", Some("no shellfish"))
            .with_item("Tea", None);
        let score = scorer().calculate_service_priority_at(&order, None, NOW);
        assert_eq!(score.factors.special_needs, 10.0);
        assert!(score.reasons.iter().any(|r| r.starts_with("Special needs")));
    }

    #[test]
    fn test_no_notes_no_special_needs_reason() {
        let score = scorer().calculate_service_priority_at(&order_waited(3), None, NOW);
        assert_eq!(score.factors.special_needs, 0.0);
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn test_unmatched_note_serializes_positive_zero() {
        let order = order_waited(3).with_note("table by the window");
        let score = scorer().calculate_service_priority_at(&order, None, NOW);

        assert!(score.factors.special_needs.is_sign_positive());
        let json = serde_json::to_value(&score).unwrap();
        assert_eq!(json["factors"]["special_needs"].to_string(), "0.0");
    }

    #[test]
    fn test_wait_reason_tiers() {
        let s = scorer();
        let short = s.calculate_service_priority_at(&order_waited(12), None, NOW);
        assert_eq!(short.reasons, vec!["Waiting 12 minutes".to_string()]);
        let long = s.calculate_service_priority_at(&order_waited(17), None, NOW);
        assert!(long.reasons[0].starts_with("Long wait"));
    }

    #[test]
    fn test_total_clamped_to_100() {
        let mut t = table(12, "VIP room").with_priority(ServicePriority::Urgent);
        t.current_party_size = Some(12);
        let order = order_waited(45).with_note("urgent business birthday allergy vegan");
        let score = scorer().calculate_service_priority_at(&order, Some(&t), NOW);
        assert_eq!(score.total, 100);
        assert_eq!(score.level, PriorityLevel::Urgent);
    }

    #[test]
    fn test_score_is_deterministic() {
        let t = table(4, "terrace");
        let order = order_waited(11).with_note("gluten free");
        let s = scorer();
        let a = s.calculate_service_priority_at(&order, Some(&t), NOW);
        let b = s.calculate_service_priority_at(&order, Some(&t), NOW);
        assert_eq!(a, b);
    }

    #[test]
    fn test_future_order_counts_as_zero_wait() {
        let order = ServiceOrder::new("o1", NOW + 5 * MIN);
        let score = scorer().calculate_service_priority_at(&order, None, NOW);
        assert_eq!(score.wait_minutes, 0);
        assert_eq!(score.level, PriorityLevel::Low);
    }

    #[test]
    fn test_batch_matches_tables_by_id() {
        let vip = DiningTable::new("V1", 4, "vip");
        let orders = vec![
            order_waited(0).at_table("V1"),
            ServiceOrder::new("o2", NOW).at_table("missing"),
            ServiceOrder::new("o3", NOW),
        ];

        let scores = scorer().calculate_batch_priority_at(&orders, &[vip], NOW);

        assert_eq!(scores.len(), 3);
        assert!(scores[0].factors.vip_status > 0.0);
        assert_eq!(scores[1].order_id, "o2");
        assert_eq!(scores[1].factors.table_type, 0.0);
        assert_eq!(scores[1].factors.vip_status, 0.0);
        assert_eq!(scores[2].total, 0);
    }
}
