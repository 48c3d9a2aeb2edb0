//! 持久層介面與批次寫入結果

use cplan_calc::PlanningSnapshot;
use cplan_core::{Material, Store, StoreMaterialStock, StorePerformance};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::StoreResult;

/// 單筆被拒絕的資料列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    /// 資料列編號（從 1 開始；CSV 匯入時為檔案行號）
    pub row: usize,
    /// 業務鍵
    pub key: String,
    pub reason: String,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "第 {} 列 [{}]: {}", self.row, self.key, self.reason)
    }
}

/// 批次新增/更新結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
    pub rejections: Vec<RowRejection>,
}

impl UpsertSummary {
    pub fn record_inserted(&mut self) {
        self.inserted += 1;
    }

    pub fn record_updated(&mut self) {
        self.updated += 1;
    }

    pub fn reject(&mut self, row: usize, key: impl Into<String>, reason: impl Into<String>) {
        self.rejected += 1;
        self.rejections.push(RowRejection {
            row,
            key: key.into(),
            reason: reason.into(),
        });
    }

    /// 合併另一批結果
    pub fn merge(&mut self, other: UpsertSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.rejected += other.rejected;
        self.rejections.extend(other.rejections);
        self.rejections.sort_by_key(|r| r.row);
    }

    /// 處理的總列數
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.rejected
    }

    pub fn has_rejections(&self) -> bool {
        self.rejected > 0
    }

    /// 前 N 筆拒絕原因（完整筆數仍以 `rejected` 為準）
    pub fn preview(&self, limit: usize) -> &[RowRejection] {
        &self.rejections[..self.rejections.len().min(limit)]
    }
}

impl fmt::Display for UpsertSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "新增 {} 筆，更新 {} 筆，拒絕 {} 筆",
            self.inserted, self.updated, self.rejected
        )
    }
}

/// 庫存事實查詢條件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockFactFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub store_code: Option<String>,
}

impl StockFactFilter {
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_store(mut self, store_code: impl Into<String>) -> Self {
        self.store_code = Some(store_code.into());
        self
    }

    pub fn matches(&self, fact: &StoreMaterialStock) -> bool {
        self.year.map_or(true, |y| fact.period.year == y)
            && self.month.map_or(true, |m| fact.period.month == m)
            && self
                .store_code
                .as_deref()
                .map_or(true, |code| fact.store_code == code)
    }
}

/// 讀取時組合的庫存事實列
///
/// 附帶物料的消耗係數/損耗率，以及同門市同期間的績效欄位。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockFactRow {
    pub fact: StoreMaterialStock,
    pub consumption_rate: Option<Decimal>,
    pub scrap_rate: Option<Decimal>,
    pub receipt_count: Option<u64>,
    pub units_sold: Option<Decimal>,
    pub store_revenue: Option<Decimal>,
}

impl StockFactRow {
    pub fn new(fact: StoreMaterialStock) -> Self {
        Self {
            fact,
            consumption_rate: None,
            scrap_rate: None,
            receipt_count: None,
            units_sold: None,
            store_revenue: None,
        }
    }

    pub fn with_material(mut self, material: Option<&Material>) -> Self {
        if let Some(material) = material {
            self.consumption_rate = material.consumption_rate;
            self.scrap_rate = Some(material.scrap_rate);
        }
        self
    }

    pub fn with_performance(mut self, performance: Option<&StorePerformance>) -> Self {
        if let Some(performance) = performance {
            self.receipt_count = Some(performance.receipt_count);
            self.units_sold = Some(performance.units_sold);
            self.store_revenue = Some(performance.revenue);
        }
        self
    }
}

/// 計劃資料持久層
///
/// 以業務鍵（代碼、期間）讀寫，計算層只透過快照取得資料。
pub trait PlanningRepository {
    fn list_materials(&self, active_only: bool) -> StoreResult<Vec<Material>>;

    fn get_material(&self, code: &str) -> StoreResult<Option<Material>>;

    fn list_stores(&self, active_only: bool) -> StoreResult<Vec<Store>>;

    fn list_stock_facts(&self, filter: &StockFactFilter) -> StoreResult<Vec<StockFactRow>>;

    fn list_performance(&self, store_code: Option<&str>) -> StoreResult<Vec<StorePerformance>>;

    fn upsert_materials(&mut self, materials: &[Material]) -> StoreResult<UpsertSummary>;

    fn upsert_stores(&mut self, stores: &[Store]) -> StoreResult<UpsertSummary>;

    fn upsert_stock_facts(&mut self, facts: &[StoreMaterialStock]) -> StoreResult<UpsertSummary>;

    fn upsert_performance_facts(&mut self, facts: &[StorePerformance]) -> StoreResult<UpsertSummary>;

    /// 軟刪除物料，回傳是否找到該物料
    fn deactivate_material(&mut self, code: &str) -> StoreResult<bool>;

    fn deactivate_store(&mut self, code: &str) -> StoreResult<bool>;

    /// 讀出一次計算所需的完整快照
    fn snapshot(&self, include_inactive: bool) -> StoreResult<PlanningSnapshot> {
        let materials = self.list_materials(!include_inactive)?;
        let stores = self.list_stores(!include_inactive)?;
        let stock_facts = self
            .list_stock_facts(&StockFactFilter::default())?
            .into_iter()
            .map(|row| row.fact)
            .collect();

        Ok(PlanningSnapshot::new(materials, stores, stock_facts))
    }
}

/// 篩出可寫入的資料列，其餘記入拒絕清單
///
/// 同一批次內重複的業務鍵，保留第一筆。
pub(crate) fn screen<'a, T>(
    records: &'a [T],
    key: impl Fn(&T) -> String,
    problem: impl Fn(&T) -> Option<String>,
    summary: &mut UpsertSummary,
) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let key = key(record);
        if let Some(reason) = problem(record) {
            summary.reject(index + 1, key, reason);
        } else if !seen.insert(key.clone()) {
            summary.reject(index + 1, key, "批次內業務鍵重複");
        } else {
            accepted.push(record);
        }
    }

    accepted
}

pub(crate) fn material_key(material: &Material) -> String {
    material.code.clone()
}

pub(crate) fn store_key(store: &Store) -> String {
    store.code.clone()
}

pub(crate) fn stock_key(fact: &StoreMaterialStock) -> String {
    format!("{}/{}/{}", fact.store_code, fact.material_code, fact.period)
}

pub(crate) fn performance_key(performance: &StorePerformance) -> String {
    format!("{}/{}", performance.store_code, performance.period)
}

pub(crate) fn material_problem(material: &Material) -> Option<String> {
    if material.code.trim().is_empty() {
        return Some("物料代碼為空".to_string());
    }
    if let Err(err) = material.validate() {
        // 缺少係數仍可保存，計算時才略過
        if material.consumption_rate.is_some() {
            return Some(err.to_string());
        }
    }
    if material.scrap_rate < Decimal::ZERO {
        return Some("損耗率為負".to_string());
    }
    if material
        .pack
        .as_ref()
        .is_some_and(|pack| pack.units_per_pack < Decimal::ZERO)
    {
        return Some("每包數量為負".to_string());
    }
    let negative = [
        ("最小出貨量", material.min_shipment_qty),
        ("最小採購量", material.min_order_qty),
        ("安全庫存", material.safety_stock),
    ]
    .into_iter()
    .find(|(_, value)| *value < Decimal::ZERO);
    negative.map(|(field, _)| format!("{}為負", field))
}

pub(crate) fn store_problem(store: &Store) -> Option<String> {
    if store.code.trim().is_empty() {
        return Some("門市代碼為空".to_string());
    }
    if store.floor_area < Decimal::ZERO {
        return Some("營業面積為負".to_string());
    }
    None
}

pub(crate) fn stock_problem(fact: &StoreMaterialStock) -> Option<String> {
    if fact.store_code.trim().is_empty() || fact.material_code.trim().is_empty() {
        return Some("門市或物料代碼為空".to_string());
    }
    if fact.sales_qty < Decimal::ZERO {
        return Some("銷售數量為負".to_string());
    }
    None
}

pub(crate) fn performance_problem(performance: &StorePerformance) -> Option<String> {
    if performance.store_code.trim().is_empty() {
        return Some("門市代碼為空".to_string());
    }
    if performance.units_sold < Decimal::ZERO {
        return Some("銷售數量為負".to_string());
    }
    None
}
