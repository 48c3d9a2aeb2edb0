//! 報表列 CSV 匯出

use cplan_calc::OrderLine;
use cplan_core::{ConsumptionResult, PurchaseOrderCandidate, ReplenishmentDecision, ShipmentCandidate};
use std::io::Write;
use std::path::Path;

use crate::error::StoreResult;
use crate::repository::StockFactRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 可匯出為表格的報表列
///
/// `values` 的順序必須與 `columns` 一致。
pub trait ReportRow {
    fn columns() -> &'static [&'static str];

    fn values(&self) -> Vec<String>;
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ReportRow for ConsumptionResult {
    fn columns() -> &'static [&'static str] {
        &[
            "material_code",
            "material_name",
            "trigger",
            "channel",
            "trigger_count",
            "rate",
            "scrap_rate",
            "theoretical",
            "scrap_amount",
            "net",
            "unit",
            "pack_name",
            "units_per_pack",
            "packs_fractional",
            "packs",
        ]
    }

    fn values(&self) -> Vec<String> {
        let pack = self.pack.as_ref();
        vec![
            self.material_code.clone(),
            self.material_name.clone(),
            self.trigger.to_string(),
            self.channel_label().to_string(),
            self.breakdown.trigger_count.to_string(),
            self.breakdown.rate.normalize().to_string(),
            self.breakdown.scrap_rate_label(),
            self.breakdown.theoretical.normalize().to_string(),
            self.breakdown.scrap_amount.normalize().to_string(),
            self.breakdown.net.normalize().to_string(),
            self.unit.to_string(),
            optional(pack.map(|p| p.pack_name.clone())),
            optional(pack.map(|p| p.units_per_pack.normalize())),
            optional(pack.map(|p| p.fractional.round_dp(4).normalize())),
            optional(pack.map(|p| p.packs.normalize())),
        ]
    }
}

impl ReportRow for OrderLine {
    fn columns() -> &'static [&'static str] {
        &["material_code", "material_name", "pack_name", "packs", "unit", "total_quantity"]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.material_code.clone(),
            self.material_name.clone(),
            self.pack_name.clone().unwrap_or_default(),
            optional(self.packs.map(|p| p.normalize())),
            self.unit.to_string(),
            self.total_quantity.normalize().to_string(),
        ]
    }
}

impl ReportRow for ReplenishmentDecision {
    fn columns() -> &'static [&'static str] {
        &[
            "store_code",
            "store_name",
            "material_code",
            "material_name",
            "store_stock",
            "daily_velocity",
            "period_need",
            "scrap_rate",
            "safety_stock",
            "net_required",
            "warehouse_stock",
            "action",
            "shipment_qty",
            "order_qty",
            "lead_time_days",
        ]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.store_code.clone(),
            self.store_name.clone(),
            self.material_code.clone(),
            self.material_name.clone(),
            self.store_stock.normalize().to_string(),
            self.daily_velocity.round_dp(2).normalize().to_string(),
            self.period_need.round_dp(2).normalize().to_string(),
            self.scrap_rate.normalize().to_string(),
            self.safety_stock.normalize().to_string(),
            self.display_net_required().round_dp(2).normalize().to_string(),
            self.warehouse_stock.normalize().to_string(),
            self.action.to_string(),
            self.shipment_qty.round_dp(2).normalize().to_string(),
            self.order_qty.round_dp(2).normalize().to_string(),
            self.lead_time_days.to_string(),
        ]
    }
}

impl ReportRow for ShipmentCandidate {
    fn columns() -> &'static [&'static str] {
        &[
            "material_code",
            "material_name",
            "warehouse_stock",
            "min_shipment_qty",
            "supplier_lead_time_days",
            "buffer_days",
            "safety_stock",
        ]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.material_code.clone(),
            self.material_name.clone(),
            self.warehouse_stock.normalize().to_string(),
            self.min_shipment_qty.normalize().to_string(),
            self.supplier_lead_time_days.to_string(),
            self.buffer_days.to_string(),
            self.safety_stock.normalize().to_string(),
        ]
    }
}

impl ReportRow for PurchaseOrderCandidate {
    fn columns() -> &'static [&'static str] {
        &[
            "material_code",
            "material_name",
            "warehouse_stock",
            "safety_stock",
            "min_order_qty",
            "order_qty",
            "lead_time_days",
        ]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.material_code.clone(),
            self.material_name.clone(),
            self.warehouse_stock.normalize().to_string(),
            self.safety_stock.normalize().to_string(),
            self.min_order_qty.normalize().to_string(),
            self.order_qty.normalize().to_string(),
            self.lead_time_days.to_string(),
        ]
    }
}

impl ReportRow for StockFactRow {
    fn columns() -> &'static [&'static str] {
        &[
            "store_code",
            "material_code",
            "period",
            "store_stock",
            "sales_qty",
            "in_transit_qty",
            "stock_to_sales_ratio",
            "consumption_rate",
            "scrap_rate",
            "receipt_count",
            "units_sold",
            "store_revenue",
        ]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.fact.store_code.clone(),
            self.fact.material_code.clone(),
            self.fact.period.to_string(),
            self.fact.store_stock.normalize().to_string(),
            self.fact.sales_qty.normalize().to_string(),
            self.fact.in_transit_qty.normalize().to_string(),
            self.fact.stock_to_sales_ratio().round_dp(2).normalize().to_string(),
            optional(self.consumption_rate.map(|r| r.normalize())),
            optional(self.scrap_rate.map(|r| r.normalize())),
            optional(self.receipt_count),
            optional(self.units_sold.map(|u| u.normalize())),
            optional(self.store_revenue.map(|r| r.normalize())),
        ]
    }
}

/// 寫出 CSV（標題列依 `columns` 順序）
pub fn write_csv<W: Write, T: ReportRow>(mut writer: W, rows: &[T], with_bom: bool) -> StoreResult<()> {
    if with_bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(T::columns())?;
    for row in rows {
        csv_writer.write_record(row.values())?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_file<T: ReportRow>(path: impl AsRef<Path>, rows: &[T], with_bom: bool) -> StoreResult<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_csv(file, rows, with_bom)?;
    tracing::info!("已匯出 {} 列至 {}", rows.len(), path.as_ref().display());
    Ok(())
}

/// 輸出為 CSV 字串
pub fn to_csv_string<T: ReportRow>(rows: &[T], with_bom: bool) -> StoreResult<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, rows, with_bom)?;
    String::from_utf8(buffer).map_err(|e| crate::StoreError::invalid_data("csv", e.to_string()))
}
