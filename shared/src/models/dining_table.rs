//! Dining Table Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// 桌台状态
///
/// 任何来源都可以写入任意状态，[`TableStatus::is_expected_transition`]
/// 只用于诊断日志，不做强制校验。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// 空闲
    Available,
    /// 已入座，未点单
    Seated,
    /// 已预订
    Reserved,
    /// 已点单
    Ordered,
    /// 等待上菜
    WaitingFood,
    /// 用餐中
    Dining,
    /// 需要服务（呼叫服务员、结账等）
    NeedsService,
    /// 清台中
    Cleaning,
}

impl TableStatus {
    pub const ALL: [TableStatus; 8] = [
        TableStatus::Available,
        TableStatus::Seated,
        TableStatus::Reserved,
        TableStatus::Ordered,
        TableStatus::WaitingFood,
        TableStatus::Dining,
        TableStatus::NeedsService,
        TableStatus::Cleaning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Seated => "seated",
            TableStatus::Reserved => "reserved",
            TableStatus::Ordered => "ordered",
            TableStatus::WaitingFood => "waiting_food",
            TableStatus::Dining => "dining",
            TableStatus::NeedsService => "needs_service",
            TableStatus::Cleaning => "cleaning",
        }
    }

    /// Usual floor flow. Writes outside this table are still accepted.
    pub fn is_expected_transition(&self, to: TableStatus) -> bool {
        use TableStatus::*;
        if *self == to {
            return true;
        }
        matches!(
            (self, to),
            (Available, Seated | Reserved | Cleaning)
                | (Reserved, Seated | Available)
                | (Seated, Ordered | NeedsService | Cleaning)
                | (Ordered, WaitingFood | Dining | NeedsService)
                | (WaitingFood, Dining | NeedsService)
                | (Dining, NeedsService | Ordered | WaitingFood | Cleaning)
                | (NeedsService, Dining | Ordered | WaitingFood | Cleaning)
                | (Cleaning, Available)
        )
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 桌台服务优先级 (normal < high < urgent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePriority {
    #[default]
    Normal,
    High,
    /// 前端请求中的 "vip" 与 urgent 同级
    #[serde(alias = "vip")]
    Urgent,
}

impl ServicePriority {
    /// Ordinal used when comparing a table's class with a requested level
    pub fn rank(&self) -> u8 {
        match self {
            ServicePriority::Normal => 0,
            ServicePriority::High => 1,
            ServicePriority::Urgent => 2,
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.rank() >= ServicePriority::High.rank()
    }
}

/// Dining table snapshot (桌台)
///
/// Owned by floor management; the engine only reads it and replaces it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub capacity: u32,
    pub status: TableStatus,
    /// 区域标签 (大厅、露台、VIP 包厢等)
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub priority: ServicePriority,
    /// 预订时间 (Unix millis)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<i64>,
    /// 开始用餐时间 (Unix millis)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dining_start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_party_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DiningTable {
    /// Minimal table in `available` state, mostly for tests and seeding
    pub fn new(id: impl Into<String>, capacity: u32, zone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            capacity: capacity.max(1),
            status: TableStatus::Available,
            zone: zone.into(),
            priority: ServicePriority::Normal,
            reserved_at: None,
            dining_start_time: None,
            current_party_size: None,
            notes: None,
        }
    }

    pub fn with_status(mut self, status: TableStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: ServicePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Zone tag denotes a VIP area (case-insensitive "vip" substring)
    pub fn is_vip_zone(&self) -> bool {
        self.zone.to_lowercase().contains("vip")
    }

    pub fn fits(&self, party_size: u32) -> bool {
        self.capacity >= party_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&TableStatus::WaitingFood).unwrap();
        assert_eq!(json, "\"waiting_food\"");
        let parsed: TableStatus = serde_json::from_str("\"needs_service\"").unwrap();
        assert_eq!(parsed, TableStatus::NeedsService);
    }

    #[test]
    fn test_vip_alias_maps_to_urgent() {
        let parsed: ServicePriority = serde_json::from_str("\"vip\"").unwrap();
        assert_eq!(parsed, ServicePriority::Urgent);
        assert!(ServicePriority::High.rank() < ServicePriority::Urgent.rank());
    }

    #[test]
    fn test_vip_zone_detection() {
        assert!(DiningTable::new("V1", 4, "VIP Room").is_vip_zone());
        assert!(DiningTable::new("V2", 4, "terrace-vip").is_vip_zone());
        assert!(!DiningTable::new("H1", 4, "hall").is_vip_zone());
    }

    #[test]
    fn test_expected_transitions() {
        assert!(TableStatus::Available.is_expected_transition(TableStatus::Seated));
        assert!(TableStatus::Cleaning.is_expected_transition(TableStatus::Available));
        assert!(!TableStatus::Available.is_expected_transition(TableStatus::Dining));
        assert!(TableStatus::Dining.is_expected_transition(TableStatus::Dining));
    }

    #[test]
    fn test_table_deserialize_with_defaults() {
        let table: DiningTable =
            serde_json::from_str(r#"{"id":"A1","capacity":4,"status":"dining"}"#).unwrap();
        assert_eq!(table.priority, ServicePriority::Normal);
        assert!(table.zone.is_empty());
        assert!(table.dining_start_time.is_none());
    }
}
