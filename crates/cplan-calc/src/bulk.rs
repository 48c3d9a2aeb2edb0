//! 批次消耗計劃

use cplan_core::{Channel, ConsumptionResult, Material, MeasurementUnit, TriggerEvent};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{ConsumptionEngine, PlanWarning, RateResolver};

/// 觸發次數輸入
#[derive(Debug, Clone)]
pub enum TriggerCounts {
    /// 依物料代碼提供觸發次數
    ByMaterial(HashMap<String, i64>),

    /// 依觸發類型提供觸發次數，同類型的物料共用同一次數
    ByTrigger(HashMap<TriggerEvent, i64>),
}

impl TriggerCounts {
    pub fn by_material<I, K>(counts: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        Self::ByMaterial(counts.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn by_trigger<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (TriggerEvent, i64)>,
    {
        Self::ByTrigger(counts.into_iter().collect())
    }

    /// 取物料的觸發次數；None 表示本次不計算該物料
    ///
    /// 依觸發類型分組時，次數為 0 的群組也不列出。
    pub fn count_for(&self, material: &Material) -> Option<i64> {
        match self {
            TriggerCounts::ByMaterial(counts) => counts.get(&material.code).copied(),
            TriggerCounts::ByTrigger(counts) => counts
                .get(&material.trigger)
                .copied()
                .filter(|count| *count != 0),
        }
    }
}

/// 採購清單行（以包裝為單位）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub material_code: String,
    pub material_name: String,
    pub pack_name: Option<String>,
    /// 訂購包裝數（無包裝規格時為 None）
    pub packs: Option<Decimal>,
    pub unit: MeasurementUnit,
    /// 總淨消耗量（基本單位）
    pub total_quantity: Decimal,
}

/// 批次計劃結果
#[derive(Debug, Clone, Serialize)]
pub struct BulkPlanReport {
    pub id: Uuid,

    pub channel: Option<Channel>,

    /// 依輸入物料順序排列
    pub results: Vec<ConsumptionResult>,

    /// 被略過的物料
    pub warnings: Vec<PlanWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl BulkPlanReport {
    /// 創建空的計劃結果
    pub fn empty(channel: Option<Channel>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            results: Vec::new(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: PlanWarning) {
        self.warnings.push(warning);
    }

    pub fn material_count(&self) -> usize {
        self.results.len()
    }

    /// 損耗總量
    pub fn total_scrap(&self) -> Decimal {
        self.results.iter().map(|r| r.breakdown.scrap_amount).sum()
    }

    /// 訂購包裝總數（只計有包裝規格的物料）
    pub fn total_packs(&self) -> Decimal {
        self.results.iter().filter_map(|r| r.packs_to_order()).sum()
    }

    pub fn find(&self, material_code: &str) -> Option<&ConsumptionResult> {
        self.results.iter().find(|r| r.material_code == material_code)
    }

    /// 轉換為採購清單
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.results
            .iter()
            .map(|r| OrderLine {
                material_code: r.material_code.clone(),
                material_name: r.material_name.clone(),
                pack_name: r.pack.as_ref().map(|p| p.pack_name.clone()),
                packs: r.packs_to_order(),
                unit: r.unit,
                total_quantity: r.breakdown.net,
            })
            .collect()
    }
}

/// 批次消耗計劃器
pub struct BulkConsumptionPlanner;

impl BulkConsumptionPlanner {
    /// 單一物料需求計算
    pub fn material_need(
        material: &Material,
        trigger_count: i64,
        channel: Option<Channel>,
        custom_scrap: Option<Decimal>,
    ) -> cplan_core::Result<ConsumptionResult> {
        let (rate, scrap_rate) = RateResolver::resolve_with_custom_scrap(material, channel, custom_scrap)?;
        let breakdown = ConsumptionEngine::breakdown(trigger_count, rate, scrap_rate)?;

        let pack = material
            .pack
            .as_ref()
            .map(|pack| ConsumptionEngine::pack_requirement(breakdown.net, pack))
            .transpose()?;

        Ok(ConsumptionResult {
            material_code: material.code.clone(),
            material_name: material.name.clone(),
            unit: material.unit,
            trigger: material.trigger.clone(),
            channel,
            breakdown,
            pack,
        })
    }

    /// 批次計算
    ///
    /// 不在輸入中的物料直接略過；主檔不完整的物料記為警告後略過；
    /// 負數等無效輸入立即回傳錯誤。
    pub fn plan(
        materials: &[Material],
        counts: &TriggerCounts,
        channel: Option<Channel>,
    ) -> cplan_core::Result<BulkPlanReport> {
        tracing::info!(
            "開始批次消耗計算：物料 {} 筆，通路 {}",
            materials.len(),
            channel.map(|c| c.as_str()).unwrap_or("general")
        );

        let start_time = std::time::Instant::now();
        let mut report = BulkPlanReport::empty(channel);

        for material in materials {
            let Some(trigger_count) = counts.count_for(material) else {
                continue;
            };

            match Self::material_need(material, trigger_count, channel, None) {
                Ok(result) => {
                    tracing::debug!(
                        "物料 {}: 觸發 {} 次，淨消耗 {}",
                        material.code,
                        trigger_count,
                        result.breakdown.net
                    );
                    report.results.push(result);
                }
                Err(err) if err.is_material_error() => {
                    tracing::warn!("略過物料 {}: {}", material.code, err);
                    report.add_warning(PlanWarning::warning(material.code.clone(), err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        report.calculation_time_ms = Some(start_time.elapsed().as_millis());
        tracing::info!(
            "批次消耗計算完成：結果 {} 筆，警告 {} 筆，耗時 {:?}",
            report.results.len(),
            report.warnings.len(),
            start_time.elapsed()
        );

        Ok(report)
    }
}
