//! 計劃參數配置

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PlanError;

/// 日銷售速度的固定正規化天數（不依月份天數調整）
pub const VELOCITY_WINDOW_DAYS: u32 = 30;

/// 計劃參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// 計劃時界（天），呼叫端未指定時使用
    pub planning_horizon_days: u32,

    /// 外部資料中損耗率的表示法
    pub scrap_rate_format: ScrapRateFormat,

    /// 匯入拒絕明細預覽筆數
    pub rejection_preview_limit: usize,

    /// 倉庫庫存在多門市間的分配方式
    pub warehouse_drawdown: WarehouseDrawdown,

    /// 是否納入已停用的物料與門市
    pub include_inactive: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            planning_horizon_days: 30,
            scrap_rate_format: ScrapRateFormat::Fraction,
            rejection_preview_limit: 10,
            warehouse_drawdown: WarehouseDrawdown::Independent,
            include_inactive: false,
        }
    }
}

impl PlannerConfig {
    /// 從 JSON 文件載入（缺少的欄位使用預設值）
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| PlanError::Other(format!("配置解析失敗: {}", e)))
    }

    /// 建構器模式：設置計劃時界
    pub fn with_planning_horizon(mut self, days: u32) -> Self {
        self.planning_horizon_days = days;
        self
    }

    /// 建構器模式：設置損耗率表示法
    pub fn with_scrap_rate_format(mut self, format: ScrapRateFormat) -> Self {
        self.scrap_rate_format = format;
        self
    }

    /// 建構器模式：設置拒絕明細預覽筆數
    pub fn with_rejection_preview_limit(mut self, limit: usize) -> Self {
        self.rejection_preview_limit = limit;
        self
    }

    /// 建構器模式：設置倉庫分配方式
    pub fn with_warehouse_drawdown(mut self, drawdown: WarehouseDrawdown) -> Self {
        self.warehouse_drawdown = drawdown;
        self
    }

    /// 建構器模式：設置是否納入停用主檔
    pub fn with_include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }
}

/// 損耗率表示法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapRateFormat {
    /// 0-1 小數（0.03 = 3%）
    Fraction,
    /// 0-100 百分比（3 = 3%）
    Percent,
}

impl ScrapRateFormat {
    /// 轉換為內部使用的 0-1 小數
    pub fn normalize(&self, value: Decimal) -> Decimal {
        match self {
            ScrapRateFormat::Fraction => value,
            ScrapRateFormat::Percent => value / Decimal::ONE_HUNDRED,
        }
    }
}

/// 倉庫庫存分配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseDrawdown {
    /// 每個門市都以完整倉庫庫存判斷
    Independent,

    /// 依門市優先級順序出貨，前面門市的出貨量會扣減可用倉庫庫存
    PriorityOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();

        assert_eq!(config.planning_horizon_days, 30);
        assert_eq!(config.scrap_rate_format, ScrapRateFormat::Fraction);
        assert_eq!(config.rejection_preview_limit, 10);
        assert_eq!(config.warehouse_drawdown, WarehouseDrawdown::Independent);
        assert!(!config.include_inactive);
    }

    #[test]
    fn test_config_builder() {
        let config = PlannerConfig::default()
            .with_planning_horizon(45)
            .with_scrap_rate_format(ScrapRateFormat::Percent)
            .with_rejection_preview_limit(5)
            .with_warehouse_drawdown(WarehouseDrawdown::PriorityOrder)
            .with_include_inactive(true);

        assert_eq!(config.planning_horizon_days, 45);
        assert_eq!(config.scrap_rate_format, ScrapRateFormat::Percent);
        assert_eq!(config.rejection_preview_limit, 5);
        assert_eq!(config.warehouse_drawdown, WarehouseDrawdown::PriorityOrder);
        assert!(config.include_inactive);
    }

    #[test]
    fn test_from_json_partial() {
        let config = PlannerConfig::from_json_str(
            r#"{ "planning_horizon_days": 14, "scrap_rate_format": "percent" }"#,
        )
        .unwrap();

        assert_eq!(config.planning_horizon_days, 14);
        assert_eq!(config.scrap_rate_format, ScrapRateFormat::Percent);
        assert_eq!(config.rejection_preview_limit, 10);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(PlannerConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_normalize_scrap_rate() {
        assert_eq!(ScrapRateFormat::Percent.normalize(Decimal::from(3)), Decimal::new(3, 2));
        assert_eq!(ScrapRateFormat::Fraction.normalize(Decimal::new(3, 2)), Decimal::new(3, 2));
    }
}
