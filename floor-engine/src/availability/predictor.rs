//! Availability Predictor
//!
//! 根据桌台当前状态估算空出时间 (分钟)，检查预订冲突。
//! 估算值只是建议，不会触发任何定时器。

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::models::{DiningTable, TableStatus};
use shared::util::{elapsed_minutes, minutes_until, now_millis};

/// Wait returned when no table can seat the party
pub const NO_TABLE_FALLBACK_MINUTES: i64 = 60;
/// Buffer added after a reservation time before the table counts as free
pub const RESERVATION_BUFFER_MINUTES: i64 = 15;
/// A dining table never predicts less than this
pub const MIN_DINING_REMAINING_MINUTES: i64 = 15;
/// Reservation requests closer than this to an existing one conflict
pub const RESERVATION_CONFLICT_WINDOW_MS: i64 = 2 * 60 * 60 * 1000;
/// Fixed estimate while a table is being cleaned
pub const CLEANING_MINUTES: i64 = 10;

/// 平均用餐时长 (按容量)
pub fn average_dining_minutes(capacity: u32) -> i64 {
    match capacity {
        0..=2 => 45,
        3..=4 => 60,
        5..=6 => 75,
        _ => 90,
    }
}

/// Real-time availability answer for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub available: bool,
    pub estimated_minutes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AvailabilityCheck {
    fn available() -> Self {
        Self {
            available: true,
            estimated_minutes: 0,
            reason: None,
        }
    }

    fn busy(estimated_minutes: i64, reason: impl Into<String>) -> Self {
        Self {
            available: false,
            estimated_minutes,
            reason: Some(reason.into()),
        }
    }
}

/// 桌台可用性预测器
///
/// 除了可替换的桌台快照外无其它状态；快照由调用方通过
/// [`update_tables`](Self::update_tables) 整体替换。
#[derive(Debug, Default)]
pub struct AvailabilityPredictor {
    tables: RwLock<Vec<DiningTable>>,
}

impl AvailabilityPredictor {
    pub fn new(tables: Vec<DiningTable>) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// 替换桌台快照
    pub fn update_tables(&self, tables: Vec<DiningTable>) {
        tracing::debug!(count = tables.len(), "Availability snapshot updated");
        *self.tables.write() = tables;
    }

    /// 当前快照的副本
    pub fn tables(&self) -> Vec<DiningTable> {
        self.tables.read().clone()
    }

    pub fn find_table(&self, table_id: &str) -> Option<DiningTable> {
        self.tables.read().iter().find(|t| t.id == table_id).cloned()
    }

    /// Minutes until the table is expected to be free
    pub fn predict_availability_time(&self, table: &DiningTable) -> i64 {
        self.predict_availability_time_at(table, now_millis())
    }

    pub fn predict_availability_time_at(&self, table: &DiningTable, now: i64) -> i64 {
        match table.status {
            TableStatus::Available => 0,
            TableStatus::Cleaning => CLEANING_MINUTES,
            TableStatus::Seated => 20,
            TableStatus::Ordered => 45,
            TableStatus::WaitingFood => 60,
            TableStatus::NeedsService => 15,
            TableStatus::Dining => {
                let dined = table
                    .dining_start_time
                    .map_or(0, |start| elapsed_minutes(start, now));
                (average_dining_minutes(table.capacity) - dined).max(MIN_DINING_REMAINING_MINUTES)
            }
            TableStatus::Reserved => {
                let until = table
                    .reserved_at
                    .map_or(0, |at| minutes_until(at, now));
                // A lapsed reservation still reports 1 minute; 0 means available
                (until + RESERVATION_BUFFER_MINUTES).max(1)
            }
        }
    }

    pub fn check_real_time_availability(&self, table: &DiningTable) -> AvailabilityCheck {
        self.check_real_time_availability_at(table, now_millis())
    }

    pub fn check_real_time_availability_at(&self, table: &DiningTable, now: i64) -> AvailabilityCheck {
        let estimate = self.predict_availability_time_at(table, now);
        match table.status {
            TableStatus::Available => AvailabilityCheck::available(),
            TableStatus::Cleaning => {
                AvailabilityCheck::busy(CLEANING_MINUTES, "Table is being cleaned")
            }
            TableStatus::Dining => {
                let dined = table
                    .dining_start_time
                    .map_or(0, |start| elapsed_minutes(start, now));
                if dined > average_dining_minutes(table.capacity) {
                    AvailabilityCheck::busy(
                        estimate,
                        format!("Dining for {dined} minutes, may free up soon"),
                    )
                } else {
                    AvailabilityCheck::busy(estimate, "Guests are dining")
                }
            }
            TableStatus::Seated => AvailabilityCheck::busy(estimate, "Guests just seated"),
            TableStatus::Reserved => AvailabilityCheck::busy(estimate, "Table is reserved"),
            TableStatus::Ordered => AvailabilityCheck::busy(estimate, "Order placed, meal not started"),
            TableStatus::WaitingFood => AvailabilityCheck::busy(estimate, "Guests are waiting for food"),
            TableStatus::NeedsService => {
                AvailabilityCheck::busy(estimate, "Guests requested service")
            }
        }
    }

    /// 按 ID 查询快照中的桌台；未知桌台返回保守的不可用结果
    pub fn check_table(&self, table_id: &str) -> AvailabilityCheck {
        match self.find_table(table_id) {
            Some(table) => self.check_real_time_availability(&table),
            None => {
                tracing::debug!(table_id = %table_id, "Availability check for unknown table");
                AvailabilityCheck::busy(NO_TABLE_FALLBACK_MINUTES, "Table not found")
            }
        }
    }

    /// 预订冲突：桌台已预订且请求时间与预订时间相差不足 2 小时
    pub fn validate_reservation_conflict(&self, table: &DiningTable, requested_time: i64) -> bool {
        match (table.status, table.reserved_at) {
            (TableStatus::Reserved, Some(reserved_at)) => {
                (requested_time - reserved_at).abs() < RESERVATION_CONFLICT_WINDOW_MS
            }
            _ => false,
        }
    }

    /// Minimum wait across tables that fit the party
    ///
    /// 0 if any fitting table is available; [`NO_TABLE_FALLBACK_MINUTES`] if none fit.
    pub fn calculate_wait_time(&self, party_size: u32, tables: &[DiningTable]) -> i64 {
        self.calculate_wait_time_at(party_size, tables, now_millis())
    }

    pub fn calculate_wait_time_at(&self, party_size: u32, tables: &[DiningTable], now: i64) -> i64 {
        let mut fitting = tables.iter().filter(|t| t.fits(party_size)).peekable();
        if fitting.peek().is_none() {
            return NO_TABLE_FALLBACK_MINUTES;
        }
        fitting
            .map(|t| self.predict_availability_time_at(t, now))
            .min()
            .unwrap_or(NO_TABLE_FALLBACK_MINUTES)
    }

    /// [`calculate_wait_time`](Self::calculate_wait_time) over the current snapshot
    pub fn estimate_wait(&self, party_size: u32) -> i64 {
        let tables = self.tables.read();
        self.calculate_wait_time(party_size, &tables)
    }
}
