//! 服务优先级配置
//!
//! 权重表、等待阈值和特殊需求关键字表。关键字表是数据驱动的，
//! 可以通过 JSON 文件整体替换 (新增类别或语言无需改代码)。

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::{AppError, AppResult};

/// 各因子权重 (总和 100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub wait_time: f64,
    pub table_type: f64,
    pub party_size: f64,
    pub special_needs: f64,
    pub vip_status: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            wait_time: 30.0,
            table_type: 20.0,
            party_size: 20.0,
            special_needs: 15.0,
            vip_status: 15.0,
        }
    }
}

impl PriorityWeights {
    pub fn total(&self) -> f64 {
        self.wait_time + self.table_type + self.party_size + self.special_needs + self.vip_status
    }
}

/// 等待时间阈值 (分钟)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitThresholds {
    pub low: i64,
    pub normal: i64,
    pub high: i64,
    pub urgent: i64,
}

impl Default for WaitThresholds {
    fn default() -> Self {
        Self {
            low: 5,
            normal: 10,
            high: 15,
            urgent: 20,
        }
    }
}

/// 特殊需求关键字类别
///
/// 备注 (已转小写) 中出现任意一个关键字子串即计入该类别分值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub category: String,
    pub points: f64,
    /// 统一转小写 (包括从 JSON 读入的)
    #[serde(deserialize_with = "lowercase_keywords")]
    pub keywords: Vec<String>,
}

fn lowercase_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let keywords = Vec::<String>::deserialize(deserializer)?;
    Ok(keywords.iter().map(|k| k.to_lowercase()).collect())
}

impl KeywordCategory {
    pub fn new(category: &str, points: f64, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            points,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// `notes` must already be case-folded
    pub fn matches(&self, notes: &str) -> bool {
        self.keywords.iter().any(|k| notes.contains(k.as_str()))
    }
}

/// Built-in categories: allergy alert, special diet, celebration, business dining, explicit urgent
pub fn default_special_needs() -> Vec<KeywordCategory> {
    vec![
        KeywordCategory::new(
            "allergy",
            10.0,
            &["allergy", "allergic", "gluten", "peanut", "shellfish", "lactose", "过敏"],
        ),
        KeywordCategory::new(
            "special_diet",
            8.0,
            &["vegetarian", "vegan", "halal", "kosher", "diabetic", "low salt", "素食", "清真"],
        ),
        KeywordCategory::new(
            "celebration",
            12.0,
            &["birthday", "anniversary", "celebration", "proposal", "生日", "纪念日"],
        ),
        KeywordCategory::new(
            "business",
            15.0,
            &["business", "client", "meeting", "executive", "商务", "宴请"],
        ),
        KeywordCategory::new(
            "urgent",
            20.0,
            &["urgent", "rush", "asap", "hurry", "加急", "催"],
        ),
    ]
}

/// 优先级评分配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub weights: PriorityWeights,
    pub thresholds: WaitThresholds,
    /// VIP 区域加成倍数
    pub vip_multiplier: f64,
    /// 大团人数阈值
    pub large_party_threshold: u32,
    /// 大桌容量阈值
    pub large_table_capacity: u32,
    pub special_needs: Vec<KeywordCategory>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            thresholds: WaitThresholds::default(),
            vip_multiplier: 1.5,
            large_party_threshold: 6,
            large_table_capacity: 8,
            special_needs: default_special_needs(),
        }
    }
}

impl PriorityConfig {
    /// Parse a full config; missing fields take their defaults
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件替换关键字表
    ///
    /// 文件内容为 [`KeywordCategory`] 数组。
    pub fn load_keywords(&mut self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        let categories: Vec<KeywordCategory> = serde_json::from_str(&raw)?;
        validate_categories(&categories)?;

        tracing::info!(
            path = %path.display(),
            categories = categories.len(),
            "Loaded special-needs keyword table"
        );
        self.special_needs = categories;
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        let total = self.weights.total();
        if (total - 100.0).abs() > f64::EPSILON * 100.0 {
            return Err(AppError::validation(format!(
                "priority weights must sum to 100, got {total}"
            )));
        }
        let t = &self.thresholds;
        if !(t.low <= t.normal && t.normal <= t.high && t.high <= t.urgent) {
            return Err(AppError::validation("wait thresholds must be non-decreasing"));
        }
        validate_categories(&self.special_needs)
    }
}

fn validate_categories(categories: &[KeywordCategory]) -> AppResult<()> {
    for c in categories {
        if c.points < 0.0 {
            return Err(AppError::validation(format!(
                "category '{}' has negative points",
                c.category
            )));
        }
        if c.keywords.is_empty() {
            return Err(AppError::validation(format!(
                "category '{}' has no keywords",
                c.category
            )));
        }
        // a blank keyword is a substring of every note
        if c.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(AppError::validation(format!(
                "category '{}' has a blank keyword",
                c.category
            )));
        }
    }
    Ok(())
}
