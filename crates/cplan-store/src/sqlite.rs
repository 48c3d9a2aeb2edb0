//! SQLite 持久層
//!
//! 數量與金額以 TEXT 保存 Decimal 字串，通路覆寫與包裝規格以 JSON 保存。

use chrono::Utc;
use cplan_core::{
    Material, MeasurementUnit, Period, RecordStatus, Store, StoreMaterialStock, StorePerformance, TriggerEvent,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};
use crate::repository::{
    material_key, material_problem, performance_key, performance_problem, screen, stock_key, stock_problem,
    store_key, store_problem, PlanningRepository, StockFactFilter, StockFactRow, UpsertSummary,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS materials (
  code TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  unit TEXT NOT NULL,
  trigger_event TEXT NOT NULL,
  trigger_note TEXT,
  consumption_rate TEXT,
  consumption_note TEXT,
  scrap_rate TEXT NOT NULL DEFAULT '0',
  overrides TEXT NOT NULL DEFAULT '{}',
  pack TEXT,
  warehouse_stock TEXT NOT NULL DEFAULT '0',
  min_shipment_qty TEXT NOT NULL DEFAULT '0',
  min_order_qty TEXT NOT NULL DEFAULT '0',
  safety_stock TEXT NOT NULL DEFAULT '0',
  supplier_lead_time_days INTEGER NOT NULL DEFAULT 7,
  buffer_days INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL DEFAULT 'active',
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stores (
  code TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  city TEXT,
  region TEXT,
  regional_manager TEXT,
  capacity INTEGER NOT NULL DEFAULT 0,
  floor_area TEXT NOT NULL DEFAULT '0',
  transit_days INTEGER NOT NULL DEFAULT 1,
  priority INTEGER NOT NULL DEFAULT 5,
  status TEXT NOT NULL DEFAULT 'active',
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS store_material_stock (
  store_code TEXT NOT NULL,
  material_code TEXT NOT NULL,
  year INTEGER NOT NULL,
  month INTEGER NOT NULL,
  store_stock TEXT NOT NULL DEFAULT '0',
  sales_qty TEXT NOT NULL DEFAULT '0',
  in_transit_qty TEXT NOT NULL DEFAULT '0',
  revenue TEXT NOT NULL DEFAULT '0',
  cost_of_goods TEXT NOT NULL DEFAULT '0',
  gross_margin TEXT NOT NULL DEFAULT '0',
  stock_value TEXT NOT NULL DEFAULT '0',
  updated_at TEXT NOT NULL,
  PRIMARY KEY (store_code, material_code, year, month)
);

CREATE TABLE IF NOT EXISTS store_performance (
  store_code TEXT NOT NULL,
  year INTEGER NOT NULL,
  month INTEGER NOT NULL,
  receipt_count INTEGER NOT NULL DEFAULT 0,
  units_sold TEXT NOT NULL DEFAULT '0',
  units_per_receipt TEXT NOT NULL DEFAULT '0',
  revenue TEXT NOT NULL DEFAULT '0',
  average_unit_price TEXT NOT NULL DEFAULT '0',
  returns TEXT NOT NULL DEFAULT '0',
  channel_orders TEXT NOT NULL DEFAULT '0',
  stock TEXT NOT NULL DEFAULT '0',
  profit TEXT NOT NULL DEFAULT '0',
  updated_at TEXT NOT NULL,
  PRIMARY KEY (store_code, year, month)
);

CREATE INDEX IF NOT EXISTS idx_stock_period ON store_material_stock(year, month);
"#;

const MATERIAL_COLUMNS: &str = "code, name, unit, trigger_event, trigger_note, consumption_rate, consumption_note, \
     scrap_rate, overrides, pack, warehouse_stock, min_shipment_qty, min_order_qty, safety_stock, \
     supplier_lead_time_days, buffer_days, status";

const STORE_COLUMNS: &str =
    "code, name, city, region, regional_manager, capacity, floor_area, transit_days, priority, status";

const PERFORMANCE_COLUMNS: &str = "store_code, year, month, receipt_count, units_sold, units_per_receipt, revenue, \
     average_unit_price, returns, channel_orders, stock, profit";

/// SQLite 持久層
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// 開啟（或建立）資料庫檔案
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(Arc::new(Mutex::new(Connection::open(path)?)))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    /// 從已有連線建立，並確保資料表存在
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let repo = Self { conn };
        repo.ensure_schema()?;
        Ok(repo)
    }

    /// 共用同一連線（供其他元件建立實例）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn get_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| StoreError::LockError(e.to_string()))
    }

    fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// 在交易中逐筆寫入，以事先查詢判斷新增或更新
    fn upsert_batch<T>(
        &self,
        accepted: Vec<&T>,
        mut summary: UpsertSummary,
        exists: impl Fn(&Transaction<'_>, &T) -> rusqlite::Result<bool>,
        write: impl Fn(&Transaction<'_>, &T, &str) -> rusqlite::Result<usize>,
    ) -> StoreResult<UpsertSummary> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        for record in accepted {
            let existed = exists(&tx, record)?;
            write(&tx, record, &now)?;
            if existed {
                summary.record_updated();
            } else {
                summary.record_inserted();
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    fn set_inactive(&self, table: &str, code: &str) -> StoreResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            &format!("UPDATE {} SET status = 'inactive', updated_at = ?2 WHERE code = ?1", table),
            params![code, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }
}

fn conversion_error(idx: usize, ty: Type, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn to_sql_error(err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| Decimal::from_str(&text).map_err(|e| conversion_error(idx, Type::Text, e)))
        .transpose()
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, Type::Text, e))
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn period_at(row: &Row<'_>, year_idx: usize) -> rusqlite::Result<Period> {
    Period::new(row.get(year_idx)?, row.get(year_idx + 1)?)
        .map_err(|e| conversion_error(year_idx, Type::Integer, e))
}

fn material_from_row(row: &Row<'_>) -> rusqlite::Result<Material> {
    let pack: Option<String> = row.get(9)?;
    let pack = pack
        .map(|text| serde_json::from_str(&text).map_err(|e| conversion_error(9, Type::Text, e)))
        .transpose()?;

    Ok(Material {
        code: row.get(0)?,
        name: row.get(1)?,
        unit: parsed_at::<MeasurementUnit>(row, 2)?,
        trigger: TriggerEvent::from(row.get::<_, String>(3)?),
        trigger_note: row.get(4)?,
        consumption_rate: optional_decimal_at(row, 5)?,
        consumption_note: row.get(6)?,
        scrap_rate: decimal_at(row, 7)?,
        overrides: json_at(row, 8)?,
        pack,
        warehouse_stock: decimal_at(row, 10)?,
        min_shipment_qty: decimal_at(row, 11)?,
        min_order_qty: decimal_at(row, 12)?,
        safety_stock: decimal_at(row, 13)?,
        supplier_lead_time_days: row.get(14)?,
        buffer_days: row.get(15)?,
        status: parsed_at::<RecordStatus>(row, 16)?,
    })
}

fn store_from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    Ok(Store {
        code: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        region: row.get(3)?,
        regional_manager: row.get(4)?,
        capacity: row.get(5)?,
        floor_area: decimal_at(row, 6)?,
        transit_days: row.get(7)?,
        priority: row.get(8)?,
        status: parsed_at::<RecordStatus>(row, 9)?,
    })
}

fn performance_from_row(row: &Row<'_>) -> rusqlite::Result<StorePerformance> {
    Ok(StorePerformance {
        store_code: row.get(0)?,
        period: period_at(row, 1)?,
        receipt_count: row.get::<_, i64>(3)?.max(0) as u64,
        units_sold: decimal_at(row, 4)?,
        units_per_receipt: decimal_at(row, 5)?,
        revenue: decimal_at(row, 6)?,
        average_unit_price: decimal_at(row, 7)?,
        returns: decimal_at(row, 8)?,
        channel_orders: decimal_at(row, 9)?,
        stock: decimal_at(row, 10)?,
        profit: decimal_at(row, 11)?,
    })
}

fn stock_row_from_row(row: &Row<'_>) -> rusqlite::Result<StockFactRow> {
    let fact = StoreMaterialStock {
        store_code: row.get(0)?,
        material_code: row.get(1)?,
        period: period_at(row, 2)?,
        store_stock: decimal_at(row, 4)?,
        sales_qty: decimal_at(row, 5)?,
        in_transit_qty: decimal_at(row, 6)?,
        revenue: decimal_at(row, 7)?,
        cost_of_goods: decimal_at(row, 8)?,
        gross_margin: decimal_at(row, 9)?,
        stock_value: decimal_at(row, 10)?,
    };

    Ok(StockFactRow {
        fact,
        consumption_rate: optional_decimal_at(row, 11)?,
        scrap_rate: optional_decimal_at(row, 12)?,
        receipt_count: row.get::<_, Option<i64>>(13)?.map(|count| count.max(0) as u64),
        units_sold: optional_decimal_at(row, 14)?,
        store_revenue: optional_decimal_at(row, 15)?,
    })
}

impl PlanningRepository for SqliteRepository {
    fn list_materials(&self, active_only: bool) -> StoreResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM materials WHERE (?1 = 0 OR status = 'active') ORDER BY code",
            MATERIAL_COLUMNS
        ))?;
        let materials = stmt
            .query_map(params![active_only], material_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(materials)
    }

    fn get_material(&self, code: &str) -> StoreResult<Option<Material>> {
        let conn = self.get_conn()?;
        let material = conn
            .query_row(
                &format!("SELECT {} FROM materials WHERE code = ?1", MATERIAL_COLUMNS),
                params![code],
                material_from_row,
            )
            .optional()?;
        Ok(material)
    }

    fn list_stores(&self, active_only: bool) -> StoreResult<Vec<Store>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stores WHERE (?1 = 0 OR status = 'active') ORDER BY code",
            STORE_COLUMNS
        ))?;
        let stores = stmt
            .query_map(params![active_only], store_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stores)
    }

    fn list_stock_facts(&self, filter: &StockFactFilter) -> StoreResult<Vec<StockFactRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                s.store_code, s.material_code, s.year, s.month,
                s.store_stock, s.sales_qty, s.in_transit_qty,
                s.revenue, s.cost_of_goods, s.gross_margin, s.stock_value,
                m.consumption_rate, m.scrap_rate,
                p.receipt_count, p.units_sold, p.revenue
            FROM store_material_stock s
            LEFT JOIN materials m ON m.code = s.material_code
            LEFT JOIN store_performance p
                ON p.store_code = s.store_code AND p.year = s.year AND p.month = s.month
            WHERE (?1 IS NULL OR s.year = ?1)
              AND (?2 IS NULL OR s.month = ?2)
              AND (?3 IS NULL OR s.store_code = ?3)
            ORDER BY s.store_code, s.material_code, s.year, s.month
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![filter.year, filter.month, filter.store_code],
                stock_row_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn list_performance(&self, store_code: Option<&str>) -> StoreResult<Vec<StorePerformance>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM store_performance WHERE (?1 IS NULL OR store_code = ?1) \
             ORDER BY store_code, year, month",
            PERFORMANCE_COLUMNS
        ))?;
        let performance = stmt
            .query_map(params![store_code], performance_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(performance)
    }

    fn upsert_materials(&mut self, materials: &[Material]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let accepted = screen(materials, material_key, material_problem, &mut summary);

        let summary = self.upsert_batch(
            accepted,
            summary,
            |tx, m| {
                tx.query_row("SELECT 1 FROM materials WHERE code = ?1", params![m.code], |_| Ok(()))
                    .optional()
                    .map(|found| found.is_some())
            },
            |tx, m, now| {
                let overrides = serde_json::to_string(&m.overrides).map_err(to_sql_error)?;
                let pack = m
                    .pack
                    .as_ref()
                    .map(|pack| serde_json::to_string(pack).map_err(to_sql_error))
                    .transpose()?;
                tx.execute(
                    r#"
                    INSERT INTO materials (
                        code, name, unit, trigger_event, trigger_note, consumption_rate, consumption_note,
                        scrap_rate, overrides, pack, warehouse_stock, min_shipment_qty, min_order_qty,
                        safety_stock, supplier_lead_time_days, buffer_days, status, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                    ON CONFLICT(code) DO UPDATE SET
                        name = excluded.name,
                        unit = excluded.unit,
                        trigger_event = excluded.trigger_event,
                        trigger_note = excluded.trigger_note,
                        consumption_rate = excluded.consumption_rate,
                        consumption_note = excluded.consumption_note,
                        scrap_rate = excluded.scrap_rate,
                        overrides = excluded.overrides,
                        pack = excluded.pack,
                        warehouse_stock = excluded.warehouse_stock,
                        min_shipment_qty = excluded.min_shipment_qty,
                        min_order_qty = excluded.min_order_qty,
                        safety_stock = excluded.safety_stock,
                        supplier_lead_time_days = excluded.supplier_lead_time_days,
                        buffer_days = excluded.buffer_days,
                        status = excluded.status,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        m.code,
                        m.name,
                        m.unit.as_str(),
                        m.trigger.as_str(),
                        m.trigger_note,
                        m.consumption_rate.map(|r| r.to_string()),
                        m.consumption_note,
                        m.scrap_rate.to_string(),
                        overrides,
                        pack,
                        m.warehouse_stock.to_string(),
                        m.min_shipment_qty.to_string(),
                        m.min_order_qty.to_string(),
                        m.safety_stock.to_string(),
                        m.supplier_lead_time_days,
                        m.buffer_days,
                        m.status.as_str(),
                        now,
                    ],
                )
            },
        )?;

        tracing::info!("物料寫入 SQLite: {}", summary);
        Ok(summary)
    }

    fn upsert_stores(&mut self, stores: &[Store]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let accepted = screen(stores, store_key, store_problem, &mut summary);

        let summary = self.upsert_batch(
            accepted,
            summary,
            |tx, s| {
                tx.query_row("SELECT 1 FROM stores WHERE code = ?1", params![s.code], |_| Ok(()))
                    .optional()
                    .map(|found| found.is_some())
            },
            |tx, s, now| {
                tx.execute(
                    r#"
                    INSERT INTO stores (
                        code, name, city, region, regional_manager, capacity, floor_area,
                        transit_days, priority, status, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(code) DO UPDATE SET
                        name = excluded.name,
                        city = excluded.city,
                        region = excluded.region,
                        regional_manager = excluded.regional_manager,
                        capacity = excluded.capacity,
                        floor_area = excluded.floor_area,
                        transit_days = excluded.transit_days,
                        priority = excluded.priority,
                        status = excluded.status,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        s.code,
                        s.name,
                        s.city,
                        s.region,
                        s.regional_manager,
                        s.capacity,
                        s.floor_area.to_string(),
                        s.transit_days,
                        s.priority,
                        s.status.as_str(),
                        now,
                    ],
                )
            },
        )?;

        tracing::info!("門市寫入 SQLite: {}", summary);
        Ok(summary)
    }

    fn upsert_stock_facts(&mut self, facts: &[StoreMaterialStock]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let accepted = screen(facts, stock_key, stock_problem, &mut summary);

        let summary = self.upsert_batch(
            accepted,
            summary,
            |tx, f| {
                tx.query_row(
                    "SELECT 1 FROM store_material_stock \
                     WHERE store_code = ?1 AND material_code = ?2 AND year = ?3 AND month = ?4",
                    params![f.store_code, f.material_code, f.period.year, f.period.month],
                    |_| Ok(()),
                )
                .optional()
                .map(|found| found.is_some())
            },
            |tx, f, now| {
                tx.execute(
                    r#"
                    INSERT INTO store_material_stock (
                        store_code, material_code, year, month, store_stock, sales_qty, in_transit_qty,
                        revenue, cost_of_goods, gross_margin, stock_value, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    ON CONFLICT(store_code, material_code, year, month) DO UPDATE SET
                        store_stock = excluded.store_stock,
                        sales_qty = excluded.sales_qty,
                        in_transit_qty = excluded.in_transit_qty,
                        revenue = excluded.revenue,
                        cost_of_goods = excluded.cost_of_goods,
                        gross_margin = excluded.gross_margin,
                        stock_value = excluded.stock_value,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        f.store_code,
                        f.material_code,
                        f.period.year,
                        f.period.month,
                        f.store_stock.to_string(),
                        f.sales_qty.to_string(),
                        f.in_transit_qty.to_string(),
                        f.revenue.to_string(),
                        f.cost_of_goods.to_string(),
                        f.gross_margin.to_string(),
                        f.stock_value.to_string(),
                        now,
                    ],
                )
            },
        )?;

        tracing::info!("庫存事實寫入 SQLite: {}", summary);
        Ok(summary)
    }

    fn upsert_performance_facts(&mut self, facts: &[StorePerformance]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        let accepted = screen(facts, performance_key, performance_problem, &mut summary);

        let summary = self.upsert_batch(
            accepted,
            summary,
            |tx, p| {
                tx.query_row(
                    "SELECT 1 FROM store_performance WHERE store_code = ?1 AND year = ?2 AND month = ?3",
                    params![p.store_code, p.period.year, p.period.month],
                    |_| Ok(()),
                )
                .optional()
                .map(|found| found.is_some())
            },
            |tx, p, now| {
                tx.execute(
                    r#"
                    INSERT INTO store_performance (
                        store_code, year, month, receipt_count, units_sold, units_per_receipt, revenue,
                        average_unit_price, returns, channel_orders, stock, profit, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                    ON CONFLICT(store_code, year, month) DO UPDATE SET
                        receipt_count = excluded.receipt_count,
                        units_sold = excluded.units_sold,
                        units_per_receipt = excluded.units_per_receipt,
                        revenue = excluded.revenue,
                        average_unit_price = excluded.average_unit_price,
                        returns = excluded.returns,
                        channel_orders = excluded.channel_orders,
                        stock = excluded.stock,
                        profit = excluded.profit,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        p.store_code,
                        p.period.year,
                        p.period.month,
                        i64::try_from(p.receipt_count).unwrap_or(i64::MAX),
                        p.units_sold.to_string(),
                        p.units_per_receipt.to_string(),
                        p.revenue.to_string(),
                        p.average_unit_price.to_string(),
                        p.returns.to_string(),
                        p.channel_orders.to_string(),
                        p.stock.to_string(),
                        p.profit.to_string(),
                        now,
                    ],
                )
            },
        )?;

        tracing::info!("門市績效寫入 SQLite: {}", summary);
        Ok(summary)
    }

    fn deactivate_material(&mut self, code: &str) -> StoreResult<bool> {
        self.set_inactive("materials", code)
    }

    fn deactivate_store(&mut self, code: &str) -> StoreResult<bool> {
        self.set_inactive("stores", code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplan_core::{Channel, ChannelOverrides, PackInfo};

    fn period(month: u32) -> Period {
        Period::new(2025, month).unwrap()
    }

    fn thermal_roll() -> Material {
        Material::new(
            "SRF001",
            "Thermal Paper Roll",
            MeasurementUnit::Meter,
            TriggerEvent::ReceiptCount,
            Decimal::new(25, 2),
        )
        .with_scrap_rate(Decimal::new(3, 2))
        .with_overrides(ChannelOverrides::default().with_rate(Channel::Online, Decimal::new(40, 2)))
        .with_pack(PackInfo::new("Roll", Decimal::from(30), MeasurementUnit::Meter))
        .with_notes("every receipt uses 25cm", "25cm per receipt")
        .with_warehouse_stock(Decimal::from(500))
        .with_minimums(Decimal::from(10), Decimal::from(100))
        .with_safety_stock(Decimal::from(200))
        .with_lead_time(10, 3)
    }

    #[test]
    fn test_material_round_trip() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let summary = repo.upsert_materials(&[thermal_roll()]).unwrap();
        assert_eq!(summary.inserted, 1);

        let loaded = repo.get_material("SRF001").unwrap().unwrap();
        assert_eq!(loaded, thermal_roll());
    }

    #[test]
    fn test_material_without_rate_is_stored() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        let mut material = thermal_roll();
        material.consumption_rate = None;

        repo.upsert_materials(&[material]).unwrap();
        let loaded = repo.get_material("SRF001").unwrap().unwrap();
        assert_eq!(loaded.consumption_rate, None);
    }

    #[test]
    fn test_upsert_counts_updates() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.upsert_stores(&[Store::new("M001", "Kadikoy")]).unwrap();

        let summary = repo
            .upsert_stores(&[
                Store::new("M001", "Kadikoy AVM").with_priority(1),
                Store::new("M002", "Bornova").with_location("Izmir", "Ege"),
            ])
            .unwrap();

        assert_eq!((summary.inserted, summary.updated, summary.rejected), (1, 1, 0));
        let stores = repo.list_stores(true).unwrap();
        assert_eq!(stores[0].name, "Kadikoy AVM");
        assert_eq!(stores[0].priority, 1);
        assert_eq!(stores[1].city.as_deref(), Some("Izmir"));
    }

    #[test]
    fn test_soft_delete() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.upsert_materials(&[thermal_roll()]).unwrap();

        assert!(repo.deactivate_material("SRF001").unwrap());
        assert!(!repo.deactivate_material("SRF404").unwrap());
        assert!(repo.list_materials(true).unwrap().is_empty());
        assert_eq!(repo.list_materials(false).unwrap()[0].status, RecordStatus::Inactive);
    }

    #[test]
    fn test_stock_facts_join_and_filter() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.upsert_materials(&[thermal_roll()]).unwrap();
        repo.upsert_performance_facts(&[
            StorePerformance::new("M001", period(10), 1200, Decimal::from(3000)).with_revenue(Decimal::from(45000))
        ])
        .unwrap();
        let summary = repo
            .upsert_stock_facts(&[
                StoreMaterialStock::new("M001", "SRF001", period(10), Decimal::from(80), Decimal::from(300)),
                StoreMaterialStock::new("M001", "SRF001", period(11), Decimal::from(60), Decimal::ZERO),
                StoreMaterialStock::new("M002", "SRF001", period(10), Decimal::from(40), Decimal::from(100)),
            ])
            .unwrap();
        assert_eq!(summary.inserted, 3);

        let october = repo
            .list_stock_facts(&StockFactFilter::default().with_year(2025).with_month(10).with_store("M001"))
            .unwrap();
        assert_eq!(october.len(), 1);
        assert_eq!(october[0].consumption_rate, Some(Decimal::new(25, 2)));
        assert_eq!(october[0].receipt_count, Some(1200));
        assert_eq!(october[0].store_revenue, Some(Decimal::from(45000)));

        let november = repo.list_stock_facts(&StockFactFilter::default().with_month(11)).unwrap();
        assert_eq!(november[0].receipt_count, None);
        assert_eq!(november[0].fact.stock_to_sales_ratio(), Decimal::ZERO);

        assert_eq!(repo.list_stock_facts(&StockFactFilter::default()).unwrap().len(), 3);
        assert_eq!(repo.list_performance(Some("M001")).unwrap().len(), 1);
        assert!(repo.list_performance(Some("M002")).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_from_sqlite() {
        let mut repo = SqliteRepository::open_in_memory().unwrap();
        repo.upsert_materials(&[thermal_roll()]).unwrap();
        repo.upsert_stores(&[Store::new("M001", "Kadikoy")]).unwrap();

        let snapshot = repo.snapshot(false).unwrap();
        assert_eq!(snapshot.materials.len(), 1);
        assert_eq!(snapshot.stores.len(), 1);
        assert!(snapshot.stock_facts.is_empty());
    }
}
