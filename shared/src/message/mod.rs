//! 桌台状态同步消息类型
//!
//! 这些类型在 floor-engine 与点单、后厨显示 (KDS)、楼面管理等子系统之间共享。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::models::TableStatus;

/// 状态变更来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateSource {
    /// 点单终端
    #[serde(rename = "order-entry")]
    OrderEntry,
    /// 后厨显示
    #[serde(rename = "kds")]
    KitchenDisplay,
    /// 楼面管理
    #[serde(rename = "floor-management")]
    FloorManagement,
    /// 系统自动
    #[serde(rename = "automatic")]
    Automatic,
}

impl UpdateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateSource::OrderEntry => "order-entry",
            UpdateSource::KitchenDisplay => "kds",
            UpdateSource::FloorManagement => "floor-management",
            UpdateSource::Automatic => "automatic",
        }
    }
}

impl fmt::Display for UpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UpdateSource {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "order-entry" => Ok(UpdateSource::OrderEntry),
            "kds" => Ok(UpdateSource::KitchenDisplay),
            "floor-management" => Ok(UpdateSource::FloorManagement),
            "automatic" => Ok(UpdateSource::Automatic),
            _ => Err(()),
        }
    }
}

/// 桌台状态变更事件 (发布后不可变)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateEvent {
    pub event_id: String,
    pub order_id: String,
    pub table_id: String,
    /// None = 总线尚不知道该桌台的上一个状态
    pub previous_status: Option<TableStatus>,
    pub new_status: TableStatus,
    pub source: UpdateSource,
    /// Unix millis
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl StatusUpdateEvent {
    pub fn new(
        order_id: impl Into<String>,
        table_id: impl Into<String>,
        previous_status: Option<TableStatus>,
        new_status: TableStatus,
        source: UpdateSource,
        timestamp: i64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            table_id: table_id.into(),
            previous_status,
            new_status,
            source,
            timestamp,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// 订阅过滤器
///
/// 每个字段都是可选的白名单；`None` 表示不限制。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<UpdateSource>>,
}

impl SubscriptionFilter {
    pub fn tables<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn orders<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn sources(sources: impl IntoIterator<Item = UpdateSource>) -> Self {
        Self {
            sources: Some(sources.into_iter().collect()),
            ..Default::default()
        }
    }

    /// 事件是否通过所有已设置的白名单
    pub fn matches(&self, event: &StatusUpdateEvent) -> bool {
        if let Some(tables) = &self.table_ids
            && !tables.iter().any(|t| t == &event.table_id)
        {
            return false;
        }
        if let Some(orders) = &self.order_ids
            && !orders.iter().any(|o| o == &event.order_id)
        {
            return false;
        }
        if let Some(sources) = &self.sources
            && !sources.contains(&event.source)
        {
            return false;
        }
        true
    }
}
