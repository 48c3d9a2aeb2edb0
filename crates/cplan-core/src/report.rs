//! 計算結果模型（不持久化）

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Channel, MeasurementUnit, TriggerEvent};

/// 消耗明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionBreakdown {
    pub trigger_count: i64,
    pub rate: Decimal,
    pub scrap_rate: Decimal,
    /// 理論消耗 = 觸發次數 × 係數
    pub theoretical: Decimal,
    /// 損耗量 = 理論消耗 × 損耗率
    pub scrap_amount: Decimal,
    /// 淨消耗 = 理論消耗 + 損耗量
    pub net: Decimal,
}

impl ConsumptionBreakdown {
    /// 損耗率百分比標籤，例如 "%3.0"
    pub fn scrap_rate_label(&self) -> String {
        let percent = (self.scrap_rate * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        format!("%{:.1}", percent)
    }
}

/// 包裝需求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackRequirement {
    pub pack_name: String,
    pub units_per_pack: Decimal,
    /// 小數包裝數
    pub fractional: Decimal,
    /// 向上取整後的訂購包裝數
    pub packs: Decimal,
}

/// 單一物料的消耗計算結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionResult {
    pub material_code: String,
    pub material_name: String,
    pub unit: MeasurementUnit,
    pub trigger: TriggerEvent,
    /// None 表示使用預設值（不分通路）
    pub channel: Option<Channel>,
    pub breakdown: ConsumptionBreakdown,
    pub pack: Option<PackRequirement>,
}

impl ConsumptionResult {
    /// 通路標籤，未指定時為 "general"
    pub fn channel_label(&self) -> &'static str {
        self.channel.map(|c| c.as_str()).unwrap_or("general")
    }

    /// 向上取整後的包裝數（無包裝規格時為 None）
    pub fn packs_to_order(&self) -> Option<Decimal> {
        self.pack.as_ref().map(|p| p.packs)
    }
}

/// 補貨動作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplenishmentAction {
    /// 門市庫存充足
    Sufficient,
    /// 由倉庫出貨
    ShipFromWarehouse,
    /// 倉庫出清並向供應商下單
    ShipAndOrder,
    /// 向供應商下單
    OrderFromSupplier,
}

impl ReplenishmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplenishmentAction::Sufficient => "sufficient",
            ReplenishmentAction::ShipFromWarehouse => "ship_from_warehouse",
            ReplenishmentAction::ShipAndOrder => "ship_and_order",
            ReplenishmentAction::OrderFromSupplier => "order_from_supplier",
        }
    }

    pub fn needs_shipment(&self) -> bool {
        matches!(
            self,
            ReplenishmentAction::ShipFromWarehouse | ReplenishmentAction::ShipAndOrder
        )
    }

    pub fn needs_order(&self) -> bool {
        matches!(
            self,
            ReplenishmentAction::ShipAndOrder | ReplenishmentAction::OrderFromSupplier
        )
    }
}

impl fmt::Display for ReplenishmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 門市 × 物料 的補貨建議
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentDecision {
    pub store_code: String,
    pub store_name: String,
    pub material_code: String,
    pub material_name: String,
    pub store_stock: Decimal,
    /// 日銷售速度 = 期間銷售 / 30
    pub daily_velocity: Decimal,
    /// 計劃期需求 = 日銷售速度 × 計劃天數
    pub period_need: Decimal,
    pub scrap_rate: Decimal,
    pub safety_stock: Decimal,
    /// 淨需求（保留正負號，用於判斷動作）
    pub net_required: Decimal,
    /// 判斷時可用的倉庫庫存
    pub warehouse_stock: Decimal,
    pub action: ReplenishmentAction,
    pub shipment_qty: Decimal,
    pub order_qty: Decimal,
    /// 到貨前置天數（出貨：運送天數；採購：交期 + 緩衝 + 運送天數）
    pub lead_time_days: u32,
}

impl ReplenishmentDecision {
    /// 顯示用淨需求（負值顯示為 0）
    pub fn display_net_required(&self) -> Decimal {
        self.net_required.max(Decimal::ZERO)
    }
}

/// 出貨候選物料（倉庫有庫存）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentCandidate {
    pub material_code: String,
    pub material_name: String,
    pub warehouse_stock: Decimal,
    pub min_shipment_qty: Decimal,
    pub supplier_lead_time_days: u32,
    pub buffer_days: u32,
    pub safety_stock: Decimal,
}

/// 採購候選物料（倉庫低於安全庫存）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderCandidate {
    pub material_code: String,
    pub material_name: String,
    pub warehouse_stock: Decimal,
    pub safety_stock: Decimal,
    pub min_order_qty: Decimal,
    /// 建議採購量 = max(安全庫存 - 倉庫庫存, 最小採購量)
    pub order_qty: Decimal,
    pub lead_time_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Decimal::new(3, 2), "%3.0")]
    #[case(Decimal::new(10, 2), "%10.0")]
    #[case(Decimal::new(125, 4), "%1.3")]
    #[case(Decimal::ZERO, "%0.0")]
    fn test_scrap_rate_label(#[case] scrap_rate: Decimal, #[case] expected: &str) {
        let breakdown = ConsumptionBreakdown {
            trigger_count: 1,
            rate: Decimal::ONE,
            scrap_rate,
            theoretical: Decimal::ONE,
            scrap_amount: Decimal::ZERO,
            net: Decimal::ONE,
        };
        assert_eq!(breakdown.scrap_rate_label(), expected);
    }

    #[test]
    fn test_action_flags() {
        assert!(!ReplenishmentAction::Sufficient.needs_shipment());
        assert!(!ReplenishmentAction::Sufficient.needs_order());
        assert!(ReplenishmentAction::ShipFromWarehouse.needs_shipment());
        assert!(!ReplenishmentAction::ShipFromWarehouse.needs_order());
        assert!(ReplenishmentAction::ShipAndOrder.needs_shipment());
        assert!(ReplenishmentAction::ShipAndOrder.needs_order());
        assert!(!ReplenishmentAction::OrderFromSupplier.needs_shipment());
        assert!(ReplenishmentAction::OrderFromSupplier.needs_order());
    }
}
