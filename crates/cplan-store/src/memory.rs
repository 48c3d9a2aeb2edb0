//! 記憶體內持久層

use cplan_core::{Material, Period, Store, StoreMaterialStock, StorePerformance};
use std::collections::BTreeMap;

use crate::error::StoreResult;
use crate::repository::{
    material_key, material_problem, performance_key, performance_problem, screen, stock_key, stock_problem,
    store_key, store_problem, PlanningRepository, StockFactFilter, StockFactRow, UpsertSummary,
};

/// 以 BTreeMap 保存的持久層，讀取順序依業務鍵排序
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    materials: BTreeMap<String, Material>,
    stores: BTreeMap<String, Store>,
    stock_facts: BTreeMap<(String, String, Period), StoreMaterialStock>,
    performance: BTreeMap<(String, Period), StorePerformance>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 依鍵新增或覆寫，並記錄計數
fn upsert_into<K: Ord, V: Clone>(map: &mut BTreeMap<K, V>, key: K, value: &V, summary: &mut UpsertSummary) {
    if map.insert(key, value.clone()).is_some() {
        summary.record_updated();
    } else {
        summary.record_inserted();
    }
}

impl PlanningRepository for InMemoryRepository {
    fn list_materials(&self, active_only: bool) -> StoreResult<Vec<Material>> {
        Ok(self
            .materials
            .values()
            .filter(|m| !active_only || m.is_active())
            .cloned()
            .collect())
    }

    fn get_material(&self, code: &str) -> StoreResult<Option<Material>> {
        Ok(self.materials.get(code).cloned())
    }

    fn list_stores(&self, active_only: bool) -> StoreResult<Vec<Store>> {
        Ok(self
            .stores
            .values()
            .filter(|s| !active_only || s.is_active())
            .cloned()
            .collect())
    }

    fn list_stock_facts(&self, filter: &StockFactFilter) -> StoreResult<Vec<StockFactRow>> {
        Ok(self
            .stock_facts
            .values()
            .filter(|fact| filter.matches(fact))
            .map(|fact| {
                let performance = self.performance.get(&(fact.store_code.clone(), fact.period));
                StockFactRow::new(fact.clone())
                    .with_material(self.materials.get(&fact.material_code))
                    .with_performance(performance)
            })
            .collect())
    }

    fn list_performance(&self, store_code: Option<&str>) -> StoreResult<Vec<StorePerformance>> {
        Ok(self
            .performance
            .values()
            .filter(|p| store_code.map_or(true, |code| p.store_code == code))
            .cloned()
            .collect())
    }

    fn upsert_materials(&mut self, materials: &[Material]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for material in screen(materials, material_key, material_problem, &mut summary) {
            upsert_into(&mut self.materials, material.code.clone(), material, &mut summary);
        }
        tracing::debug!("物料寫入: {}", summary);
        Ok(summary)
    }

    fn upsert_stores(&mut self, stores: &[Store]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for store in screen(stores, store_key, store_problem, &mut summary) {
            upsert_into(&mut self.stores, store.code.clone(), store, &mut summary);
        }
        tracing::debug!("門市寫入: {}", summary);
        Ok(summary)
    }

    fn upsert_stock_facts(&mut self, facts: &[StoreMaterialStock]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for fact in screen(facts, stock_key, stock_problem, &mut summary) {
            let key = (fact.store_code.clone(), fact.material_code.clone(), fact.period);
            upsert_into(&mut self.stock_facts, key, fact, &mut summary);
        }
        tracing::debug!("庫存事實寫入: {}", summary);
        Ok(summary)
    }

    fn upsert_performance_facts(&mut self, facts: &[StorePerformance]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for performance in screen(facts, performance_key, performance_problem, &mut summary) {
            let key = (performance.store_code.clone(), performance.period);
            upsert_into(&mut self.performance, key, performance, &mut summary);
        }
        tracing::debug!("門市績效寫入: {}", summary);
        Ok(summary)
    }

    fn deactivate_material(&mut self, code: &str) -> StoreResult<bool> {
        Ok(self
            .materials
            .get_mut(code)
            .map(|material| material.deactivate())
            .is_some())
    }

    fn deactivate_store(&mut self, code: &str) -> StoreResult<bool> {
        Ok(self.stores.get_mut(code).map(|store| store.deactivate()).is_some())
    }
}
