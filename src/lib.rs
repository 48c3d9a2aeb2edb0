//! # cplan
//!
//! 耗材消耗計算與門市補貨分配引擎。
//!
//! 持久層以 [`PlanningRepository`] 注入，計算層只接收快照，不讀取外部狀態。

pub mod logging;

pub use cplan_calc::{
    BulkConsumptionPlanner, BulkPlanReport, CandidateFinder, ConsumptionEngine, OrderLine, PlanWarning,
    PlanningSnapshot, RateResolver, ReplenishmentAllocator, ReplenishmentPlan, TriggerCounts, WarningSeverity,
};
pub use cplan_core::{
    Channel, ChannelOverrides, ConsumptionBreakdown, ConsumptionResult, Material, MeasurementUnit, PackInfo,
    Period, PlanError, PlannerConfig, PurchaseOrderCandidate, RecordStatus, ReplenishmentAction,
    ReplenishmentDecision, ScrapRateFormat, ShipmentCandidate, Store, StoreMaterialStock, StorePerformance,
    TriggerEvent, WarehouseDrawdown,
};
pub use cplan_store::{
    CsvImporter, ImportKind, InMemoryRepository, PlanningRepository, ReportRow, SqliteRepository, StockFactFilter,
    StockFactRow, StoreError, StoreResult, UpsertSummary,
};

use rust_decimal::Decimal;
use std::io::Read;

/// 計劃服務：連接持久層與計算器
pub struct PlanningService<R: PlanningRepository> {
    repository: R,
    config: PlannerConfig,
}

impl<R: PlanningRepository> PlanningService<R> {
    pub fn new(repository: R, config: PlannerConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    /// 匯入 CSV 並寫入持久層
    pub fn import_csv<T: Read>(&mut self, kind: ImportKind, reader: T) -> StoreResult<UpsertSummary> {
        CsvImporter::new(self.config.clone()).import(kind, reader, &mut self.repository)
    }

    /// 單一物料需求
    pub fn material_need(
        &self,
        material_code: &str,
        trigger_count: i64,
        channel: Option<Channel>,
        custom_scrap: Option<Decimal>,
    ) -> StoreResult<ConsumptionResult> {
        let material = self
            .repository
            .get_material(material_code)?
            .ok_or_else(|| StoreError::not_found("material", material_code))?;

        Ok(BulkConsumptionPlanner::material_need(
            &material,
            trigger_count,
            channel,
            custom_scrap,
        )?)
    }

    /// 批次消耗計劃
    pub fn bulk_plan(&self, counts: &TriggerCounts, channel: Option<Channel>) -> StoreResult<BulkPlanReport> {
        let materials = self.repository.list_materials(!self.config.include_inactive)?;
        Ok(BulkConsumptionPlanner::plan(&materials, counts, channel)?)
    }

    /// 門市補貨計劃，未指定天數時使用設定值
    pub fn replenishment_plan(&self, horizon_days: Option<u32>) -> StoreResult<ReplenishmentPlan> {
        let snapshot = self.repository.snapshot(self.config.include_inactive)?;
        let allocator = ReplenishmentAllocator::new(self.config.clone());
        Ok(allocator.allocate(&snapshot, horizon_days)?)
    }

    pub fn shipment_candidates(&self) -> StoreResult<Vec<ShipmentCandidate>> {
        let materials = self.repository.list_materials(true)?;
        Ok(CandidateFinder::shipment_candidates(&materials))
    }

    pub fn purchase_order_candidates(&self) -> StoreResult<Vec<PurchaseOrderCandidate>> {
        let materials = self.repository.list_materials(true)?;
        Ok(CandidateFinder::purchase_order_candidates(&materials))
    }

    /// 庫存事實（含物料與績效欄位）
    pub fn stock_report(&self, filter: &StockFactFilter) -> StoreResult<Vec<StockFactRow>> {
        self.repository.list_stock_facts(filter)
    }
}
