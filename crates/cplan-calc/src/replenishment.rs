//! 門市補貨分配

use cplan_core::config::VELOCITY_WINDOW_DAYS;
use cplan_core::{
    Material, PlannerConfig, ReplenishmentAction, ReplenishmentDecision, Store, WarehouseDrawdown,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::{ConsumptionEngine, PlanWarning, PlanningSnapshot};

/// 單一門市物料的分配結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub action: ReplenishmentAction,
    pub shipment_qty: Decimal,
    pub order_qty: Decimal,
}

impl Allocation {
    fn sufficient() -> Self {
        Self {
            action: ReplenishmentAction::Sufficient,
            shipment_qty: Decimal::ZERO,
            order_qty: Decimal::ZERO,
        }
    }
}

/// 補貨計劃結果
#[derive(Debug, Clone, Serialize)]
pub struct ReplenishmentPlan {
    pub id: Uuid,

    /// 計劃時界（天）
    pub horizon_days: u32,

    pub decisions: Vec<ReplenishmentDecision>,

    pub warnings: Vec<PlanWarning>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl ReplenishmentPlan {
    /// 創建空的補貨計劃
    pub fn empty(horizon_days: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            horizon_days,
            decisions: Vec::new(),
            warnings: Vec::new(),
            calculation_time_ms: None,
        }
    }

    pub fn find(&self, store_code: &str, material_code: &str) -> Option<&ReplenishmentDecision> {
        self.decisions
            .iter()
            .find(|d| d.store_code == store_code && d.material_code == material_code)
    }

    /// 需要動作（出貨或採購）的建議
    pub fn actionable(&self) -> impl Iterator<Item = &ReplenishmentDecision> {
        self.decisions
            .iter()
            .filter(|d| d.action != ReplenishmentAction::Sufficient)
    }

    /// 各動作的筆數
    pub fn count_by_action(&self) -> HashMap<ReplenishmentAction, usize> {
        let mut counts = HashMap::new();
        for decision in &self.decisions {
            *counts.entry(decision.action).or_insert(0) += 1;
        }
        counts
    }

    /// 各物料出貨總量
    pub fn shipment_totals(&self) -> BTreeMap<String, Decimal> {
        let mut totals = BTreeMap::new();
        for decision in self.decisions.iter().filter(|d| d.shipment_qty > Decimal::ZERO) {
            *totals
                .entry(decision.material_code.clone())
                .or_insert(Decimal::ZERO) += decision.shipment_qty;
        }
        totals
    }

    /// 各物料向供應商採購總量
    pub fn order_totals(&self) -> BTreeMap<String, Decimal> {
        let mut totals = BTreeMap::new();
        for decision in self.decisions.iter().filter(|d| d.order_qty > Decimal::ZERO) {
            *totals
                .entry(decision.material_code.clone())
                .or_insert(Decimal::ZERO) += decision.order_qty;
        }
        totals
    }
}

/// 門市補貨分配器
pub struct ReplenishmentAllocator {
    config: PlannerConfig,
}

impl ReplenishmentAllocator {
    /// 創建新的補貨分配器
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// 日銷售速度 = 期間銷售 / 30
    pub fn daily_velocity(sales_qty: Decimal) -> Decimal {
        sales_qty / Decimal::from(VELOCITY_WINDOW_DAYS)
    }

    /// 計劃期需求 = 日銷售速度 × 計劃天數
    ///
    /// 先乘後除，避免 1/30 的循環小數造成誤差。
    pub fn period_need(sales_qty: Decimal, horizon_days: u32) -> cplan_core::Result<Decimal> {
        sales_qty
            .checked_mul(Decimal::from(horizon_days))
            .map(|total| total / Decimal::from(VELOCITY_WINDOW_DAYS))
            .ok_or_else(|| {
                cplan_core::PlanError::CalculationError(format!(
                    "數值溢出: 銷售 {} × {} 天",
                    sales_qty, horizon_days
                ))
            })
    }

    /// 淨需求 = 計劃期需求 × (1 + 損耗率) + 安全庫存 - 門市庫存（保留正負號）
    pub fn net_required(
        period_need: Decimal,
        scrap_rate: Decimal,
        safety_stock: Decimal,
        store_stock: Decimal,
    ) -> cplan_core::Result<Decimal> {
        ConsumptionEngine::apply_scrap(period_need, scrap_rate)?
            .checked_add(safety_stock)
            .and_then(|gross| gross.checked_sub(store_stock))
            .ok_or_else(|| {
                cplan_core::PlanError::CalculationError(format!(
                    "數值溢出: 需求 {} + 安全庫存 {} - 門市庫存 {}",
                    period_need, safety_stock, store_stock
                ))
            })
    }

    /// 依淨需求與倉庫庫存決定補貨動作（依序判斷，先符合者為準）
    pub fn classify(
        required: Decimal,
        warehouse_stock: Decimal,
        min_shipment_qty: Decimal,
        min_order_qty: Decimal,
    ) -> Allocation {
        if required <= Decimal::ZERO {
            return Allocation::sufficient();
        }

        if warehouse_stock >= required {
            return Allocation {
                action: ReplenishmentAction::ShipFromWarehouse,
                shipment_qty: required.max(min_shipment_qty),
                order_qty: Decimal::ZERO,
            };
        }

        if warehouse_stock > Decimal::ZERO {
            return Allocation {
                action: ReplenishmentAction::ShipAndOrder,
                shipment_qty: warehouse_stock,
                order_qty: (required - warehouse_stock).max(min_order_qty),
            };
        }

        Allocation {
            action: ReplenishmentAction::OrderFromSupplier,
            shipment_qty: Decimal::ZERO,
            order_qty: required.max(min_order_qty),
        }
    }

    /// 計算所有門市 × 物料 的補貨建議
    ///
    /// 沒有庫存事實的組合視為庫存 0、銷售 0。
    /// 只輸出有淨需求或門市目前有庫存的組合。
    pub fn allocate(
        &self,
        snapshot: &PlanningSnapshot,
        horizon_days: Option<u32>,
    ) -> cplan_core::Result<ReplenishmentPlan> {
        let horizon_days = horizon_days.unwrap_or(self.config.planning_horizon_days);
        let include_inactive = self.config.include_inactive;

        let materials = snapshot.materials(include_inactive);
        let mut stores = snapshot.stores(include_inactive);
        if self.config.warehouse_drawdown == WarehouseDrawdown::PriorityOrder {
            stores.sort_by(|a, b| (a.priority, &a.code).cmp(&(b.priority, &b.code)));
        }

        tracing::info!(
            "開始補貨分配：門市 {} 家，物料 {} 筆，庫存事實 {} 筆，計劃 {} 天",
            stores.len(),
            materials.len(),
            snapshot.stock_facts.len(),
            horizon_days
        );

        let start_time = std::time::Instant::now();
        let facts = snapshot.latest_facts();
        let stores_with_history: HashSet<&str> = facts.keys().map(|(store, _)| *store).collect();

        let mut warehouse: HashMap<&str, Decimal> = materials
            .iter()
            .map(|m| (m.code.as_str(), m.warehouse_stock))
            .collect();

        let mut plan = ReplenishmentPlan::empty(horizon_days);

        let materials: Vec<&Material> = materials
            .into_iter()
            .filter(|material| {
                if material.scrap_rate < Decimal::ZERO {
                    tracing::warn!("略過物料 {}: 損耗率為負", material.code);
                    plan.warnings.push(PlanWarning::warning(
                        material.code.clone(),
                        "損耗率為負，略過補貨計算".to_string(),
                    ));
                    return false;
                }
                true
            })
            .collect();

        for store in &stores {
            if !stores_with_history.contains(store.code.as_str()) {
                plan.warnings.push(PlanWarning::info(
                    store.code.clone(),
                    "快照中沒有該門市的庫存事實".to_string(),
                ));
            }

            for material in &materials {
                let (store_stock, sales_qty) = facts
                    .get(&(store.code.as_str(), material.code.as_str()))
                    .map(|fact| (fact.store_stock, fact.sales_qty))
                    .unwrap_or((Decimal::ZERO, Decimal::ZERO));

                let warehouse_stock = warehouse
                    .get(material.code.as_str())
                    .copied()
                    .unwrap_or(material.warehouse_stock);

                let decision = Self::decide(store, material, store_stock, sales_qty, warehouse_stock, horizon_days)?;

                if self.config.warehouse_drawdown == WarehouseDrawdown::PriorityOrder
                    && decision.shipment_qty > Decimal::ZERO
                {
                    if let Some(available) = warehouse.get_mut(material.code.as_str()) {
                        *available = (*available - decision.shipment_qty).max(Decimal::ZERO);
                    }
                }

                if decision.net_required > Decimal::ZERO || !decision.store_stock.is_zero() {
                    tracing::debug!(
                        "門市 {} 物料 {}: 淨需求 {}，動作 {}",
                        store.code,
                        material.code,
                        decision.net_required,
                        decision.action
                    );
                    plan.decisions.push(decision);
                }
            }
        }

        plan.calculation_time_ms = Some(start_time.elapsed().as_millis());
        tracing::info!(
            "補貨分配完成：建議 {} 筆，耗時 {:?}",
            plan.decisions.len(),
            start_time.elapsed()
        );

        Ok(plan)
    }

    /// 單一門市物料的補貨建議
    fn decide(
        store: &Store,
        material: &Material,
        store_stock: Decimal,
        sales_qty: Decimal,
        warehouse_stock: Decimal,
        horizon_days: u32,
    ) -> cplan_core::Result<ReplenishmentDecision> {
        let daily_velocity = Self::daily_velocity(sales_qty);
        let period_need = Self::period_need(sales_qty, horizon_days)?;
        let net_required = Self::net_required(period_need, material.scrap_rate, material.safety_stock, store_stock)?;

        let allocation = Self::classify(
            net_required,
            warehouse_stock,
            material.min_shipment_qty,
            material.min_order_qty,
        );

        let lead_time_days = match allocation.action {
            ReplenishmentAction::Sufficient => 0,
            ReplenishmentAction::ShipFromWarehouse => store.transit_days,
            ReplenishmentAction::ShipAndOrder | ReplenishmentAction::OrderFromSupplier => {
                material.replenishment_lead_time_days().saturating_add(store.transit_days)
            }
        };

        Ok(ReplenishmentDecision {
            store_code: store.code.clone(),
            store_name: store.name.clone(),
            material_code: material.code.clone(),
            material_name: material.name.clone(),
            store_stock,
            daily_velocity,
            period_need,
            scrap_rate: material.scrap_rate,
            safety_stock: material.safety_stock,
            net_required,
            warehouse_stock,
            action: allocation.action,
            shipment_qty: allocation.shipment_qty,
            order_qty: allocation.order_qty,
            lead_time_days,
        })
    }
}

impl Default for ReplenishmentAllocator {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}
