//! # Consumables Planning Core
//!
//! 核心資料模型與類型定義

pub mod config;
pub mod material;
pub mod performance;
pub mod period;
pub mod report;
pub mod stock;
pub mod store;

// Re-export 主要類型
pub use config::{PlannerConfig, ScrapRateFormat, WarehouseDrawdown};
pub use material::{
    Channel, ChannelOverrides, Material, MeasurementUnit, PackInfo, RecordStatus, TriggerEvent,
};
pub use performance::StorePerformance;
pub use period::Period;
pub use report::{
    ConsumptionBreakdown, ConsumptionResult, PackRequirement, PurchaseOrderCandidate,
    ReplenishmentAction, ReplenishmentDecision, ShipmentCandidate,
};
pub use stock::StoreMaterialStock;
pub use store::Store;

/// 無效輸入的具體原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInputReason {
    NegativeTriggerCount,
    NegativeRate,
    NegativeScrapRate,
}

impl std::fmt::Display for InvalidInputReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NegativeTriggerCount => "觸發次數不可為負 (negative trigger count)",
            Self::NegativeRate => "消耗係數不可為負 (negative rate)",
            Self::NegativeScrapRate => "損耗率不可為負 (negative scrap rate)",
        };
        f.write_str(text)
    }
}

/// 計劃錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("無效的輸入: {0}")]
    InvalidInput(InvalidInputReason),

    #[error("物料資料不完整 ({code}): {reason}")]
    InvalidMaterial { code: String, reason: String },

    #[error("無效的期間: {0}")]
    InvalidPeriod(String),

    #[error("計算錯誤: {0}")]
    CalculationError(String),

    #[error("其他錯誤: {0}")]
    Other(String),
}

impl PlanError {
    /// 建立物料資料錯誤
    pub fn invalid_material(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMaterial {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// 是否為單筆物料錯誤（批次計算可略過）
    pub fn is_material_error(&self) -> bool {
        matches!(self, Self::InvalidMaterial { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
