//! 消耗量計算

use cplan_core::{ConsumptionBreakdown, InvalidInputReason, PackInfo, PackRequirement, PlanError};
use rust_decimal::Decimal;

/// 消耗量計算器
///
/// 純數值計算，不保存狀態。
pub struct ConsumptionEngine;

impl ConsumptionEngine {
    /// 理論消耗 = 觸發次數 × 消耗係數
    pub fn theoretical(trigger_count: i64, rate: Decimal) -> cplan_core::Result<Decimal> {
        if trigger_count < 0 {
            return Err(PlanError::InvalidInput(InvalidInputReason::NegativeTriggerCount));
        }
        if rate < Decimal::ZERO {
            return Err(PlanError::InvalidInput(InvalidInputReason::NegativeRate));
        }

        Decimal::from(trigger_count)
            .checked_mul(rate)
            .ok_or_else(|| overflow("theoretical", trigger_count))
    }

    /// 含損耗的淨消耗 = 理論消耗 × (1 + 損耗率)
    pub fn net(trigger_count: i64, rate: Decimal, scrap_rate: Decimal) -> cplan_core::Result<Decimal> {
        Self::check_scrap_rate(scrap_rate)?;
        let theoretical = Self::theoretical(trigger_count, rate)?;
        Self::apply_scrap(theoretical, scrap_rate)
    }

    /// 將損耗率套用到任意數量上
    ///
    /// 補貨分配也用這個函數把期間需求換算成含損耗需求。
    pub fn apply_scrap(quantity: Decimal, scrap_rate: Decimal) -> cplan_core::Result<Decimal> {
        Self::check_scrap_rate(scrap_rate)?;
        quantity
            .checked_mul(Decimal::ONE + scrap_rate)
            .ok_or_else(|| PlanError::CalculationError(format!("數值溢出: {} × (1 + {})", quantity, scrap_rate)))
    }

    /// 消耗明細（理論、損耗、淨消耗）
    pub fn breakdown(
        trigger_count: i64,
        rate: Decimal,
        scrap_rate: Decimal,
    ) -> cplan_core::Result<ConsumptionBreakdown> {
        Self::check_scrap_rate(scrap_rate)?;
        let theoretical = Self::theoretical(trigger_count, rate)?;
        let scrap_amount = theoretical
            .checked_mul(scrap_rate)
            .ok_or_else(|| overflow("scrap", trigger_count))?;
        let net = theoretical
            .checked_add(scrap_amount)
            .ok_or_else(|| overflow("net", trigger_count))?;

        Ok(ConsumptionBreakdown {
            trigger_count,
            rate,
            scrap_rate,
            theoretical,
            scrap_amount,
            net,
        })
    }

    /// 小數包裝數 = 淨消耗 / 每包數量
    ///
    /// 每包數量 <= 0 時回傳 0，不做除法。
    pub fn packs_required(net_quantity: Decimal, units_per_pack: Decimal) -> cplan_core::Result<Decimal> {
        if units_per_pack <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        net_quantity.checked_div(units_per_pack).ok_or_else(|| {
            PlanError::CalculationError(format!("數值溢出: {} / {}", net_quantity, units_per_pack))
        })
    }

    /// 向上取整的包裝數
    pub fn packs_required_ceiling(
        net_quantity: Decimal,
        units_per_pack: Decimal,
    ) -> cplan_core::Result<Decimal> {
        Ok(Self::packs_required(net_quantity, units_per_pack)?.ceil())
    }

    /// 依包裝規格計算包裝需求
    pub fn pack_requirement(net_quantity: Decimal, pack: &PackInfo) -> cplan_core::Result<PackRequirement> {
        let fractional = Self::packs_required(net_quantity, pack.units_per_pack)?;
        Ok(PackRequirement {
            pack_name: pack.pack_name.clone(),
            units_per_pack: pack.units_per_pack,
            fractional,
            packs: fractional.ceil(),
        })
    }

    fn check_scrap_rate(scrap_rate: Decimal) -> cplan_core::Result<()> {
        if scrap_rate < Decimal::ZERO {
            return Err(PlanError::InvalidInput(InvalidInputReason::NegativeScrapRate));
        }
        Ok(())
    }
}

fn overflow(stage: &str, trigger_count: i64) -> PlanError {
    PlanError::CalculationError(format!("數值溢出 ({}): 觸發次數 {}", stage, trigger_count))
}
