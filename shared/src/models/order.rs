//! Order Model
//!
//! Active order as seen by floor operations. Owned by order entry; read-only here.

use serde::{Deserialize, Serialize};

/// Order line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Item note (e.g. "no peanuts")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

/// Active service order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: String,
    /// 下单时间 (Unix millis)
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 就餐人数 (order-entry headcount)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<u32>,
}

impl ServiceOrder {
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            created_at,
            table_id: None,
            items: Vec::new(),
            note: None,
            guest_count: None,
        }
    }

    pub fn at_table(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_item(mut self, name: impl Into<String>, note: Option<&str>) -> Self {
        self.items.push(OrderItem {
            name: name.into(),
            quantity: 1,
            note: note.map(str::to_string),
        });
        self
    }

    /// Order note followed by every item note, lowercased and space-joined
    pub fn combined_notes(&self) -> String {
        self.note
            .iter()
            .chain(self.items.iter().filter_map(|item| item.note.as_ref()))
            .map(|n| n.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
