//! # Consumables Calculation Engine
//!
//! 耗材消耗計算與補貨分配引擎

pub mod bulk;
pub mod candidates;
pub mod consumption;
pub mod rate;
pub mod replenishment;
pub mod snapshot;

// Re-export 主要類型
pub use bulk::{BulkConsumptionPlanner, BulkPlanReport, OrderLine, TriggerCounts};
pub use candidates::CandidateFinder;
pub use consumption::ConsumptionEngine;
pub use rate::RateResolver;
pub use replenishment::{Allocation, ReplenishmentAllocator, ReplenishmentPlan};
pub use snapshot::PlanningSnapshot;

use serde::Serialize;

/// 計劃警告（單筆資料問題，不中斷整批計算）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanWarning {
    /// 相關的物料或門市代碼
    pub subject: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl PlanWarning {
    pub fn new(subject: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            subject,
            message,
            severity,
        }
    }

    pub fn info(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Info)
    }

    pub fn warning(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Warning,
}
