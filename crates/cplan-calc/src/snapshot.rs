//! 計劃輸入快照

use cplan_core::{Material, Store, StoreMaterialStock};
use std::collections::HashMap;

/// 一次計算所需的完整輸入快照
///
/// 由持久層讀出後傳入，計算過程不再讀取外部狀態。
#[derive(Debug, Clone, Default)]
pub struct PlanningSnapshot {
    pub materials: Vec<Material>,
    pub stores: Vec<Store>,
    pub stock_facts: Vec<StoreMaterialStock>,
}

impl PlanningSnapshot {
    pub fn new(materials: Vec<Material>, stores: Vec<Store>, stock_facts: Vec<StoreMaterialStock>) -> Self {
        Self {
            materials,
            stores,
            stock_facts,
        }
    }

    /// 建立 (門市, 物料) → 最新期間庫存事實 的索引
    pub fn latest_facts(&self) -> HashMap<(&str, &str), &StoreMaterialStock> {
        let mut index: HashMap<(&str, &str), &StoreMaterialStock> = HashMap::new();
        for fact in &self.stock_facts {
            let key = (fact.store_code.as_str(), fact.material_code.as_str());
            let newer = index
                .get(&key)
                .map_or(true, |existing| fact.period > existing.period);
            if newer {
                index.insert(key, fact);
            }
        }
        index
    }

    /// 篩選物料（預設只取啟用中）
    pub fn materials(&self, include_inactive: bool) -> Vec<&Material> {
        self.materials
            .iter()
            .filter(|m| include_inactive || m.is_active())
            .collect()
    }

    /// 篩選門市（預設只取啟用中）
    pub fn stores(&self, include_inactive: bool) -> Vec<&Store> {
        self.stores
            .iter()
            .filter(|s| include_inactive || s.is_active())
            .collect()
    }

    pub fn find_material(&self, code: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.code == code)
    }
}
