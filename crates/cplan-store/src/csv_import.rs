//! CSV 匯入
//!
//! 每列獨立驗證：格式錯誤、非數值、負值、批次內重複鍵都只拒絕該列，不中斷整批。

use cplan_core::{
    Channel, ChannelOverrides, Material, MeasurementUnit, PackInfo, Period, PlannerConfig, RecordStatus, Store,
    StoreMaterialStock, StorePerformance, TriggerEvent,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::StoreResult;
use crate::repository::{PlanningRepository, UpsertSummary};

/// 匯入的資料種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Materials,
    Stores,
    StockFacts,
    Performance,
}

/// 已解析的批次（尚未寫入）
#[derive(Debug, Clone)]
pub struct ImportBatch<T> {
    pub records: Vec<T>,
    /// 每筆記錄對應的檔案行號
    pub lines: Vec<usize>,
    /// 解析階段的拒絕
    pub summary: UpsertSummary,
}

impl<T> Default for ImportBatch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            lines: Vec::new(),
            summary: UpsertSummary::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MaterialCsvRow {
    #[serde(default, alias = "material_code")]
    code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, alias = "trigger_event")]
    trigger: Option<String>,
    #[serde(default)]
    trigger_note: Option<String>,
    #[serde(default, alias = "rate")]
    consumption_rate: Option<String>,
    #[serde(default)]
    consumption_note: Option<String>,
    #[serde(default)]
    scrap_rate: Option<String>,
    #[serde(default)]
    channel_rates: Option<String>,
    #[serde(default)]
    channel_scrap_rates: Option<String>,
    #[serde(default)]
    pack_name: Option<String>,
    #[serde(default)]
    units_per_pack: Option<String>,
    #[serde(default)]
    pack_unit: Option<String>,
    #[serde(default)]
    warehouse_stock: Option<String>,
    #[serde(default)]
    min_shipment_qty: Option<String>,
    #[serde(default)]
    min_order_qty: Option<String>,
    #[serde(default)]
    safety_stock: Option<String>,
    #[serde(default)]
    supplier_lead_time_days: Option<String>,
    #[serde(default)]
    buffer_days: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoreCsvRow {
    #[serde(default, alias = "store_code")]
    code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    regional_manager: Option<String>,
    #[serde(default)]
    capacity: Option<String>,
    #[serde(default)]
    floor_area: Option<String>,
    #[serde(default)]
    transit_days: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StockCsvRow {
    #[serde(default)]
    store_code: Option<String>,
    #[serde(default)]
    material_code: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    month: Option<String>,
    #[serde(default)]
    store_stock: Option<String>,
    #[serde(default)]
    sales_qty: Option<String>,
    #[serde(default)]
    in_transit_qty: Option<String>,
    #[serde(default)]
    revenue: Option<String>,
    #[serde(default)]
    cost_of_goods: Option<String>,
    #[serde(default)]
    gross_margin: Option<String>,
    #[serde(default)]
    stock_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PerformanceCsvRow {
    #[serde(default)]
    store_code: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    month: Option<String>,
    #[serde(default)]
    receipt_count: Option<String>,
    #[serde(default)]
    units_sold: Option<String>,
    #[serde(default)]
    revenue: Option<String>,
    #[serde(default)]
    returns: Option<String>,
    #[serde(default)]
    channel_orders: Option<String>,
    #[serde(default)]
    stock: Option<String>,
    #[serde(default)]
    profit: Option<String>,
}

type RowResult<T> = std::result::Result<T, String>;

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &str) -> RowResult<&'a str> {
    text(value).ok_or_else(|| format!("缺少欄位 {}", field))
}

fn parse_number(raw: &str) -> Option<Decimal> {
    // 只有逗號沒有句點時，視為小數逗號
    let normalized = if raw.contains(',') && !raw.contains('.') {
        raw.replace(',', ".")
    } else {
        raw.to_string()
    };
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// 空值視為 None，非數值為錯誤
fn optional_decimal(value: &Option<String>, field: &str) -> RowResult<Option<Decimal>> {
    text(value)
        .map(|raw| parse_number(raw).ok_or_else(|| format!("欄位 {} 不是數值: {}", field, raw)))
        .transpose()
}

/// 空值視為 0
fn decimal(value: &Option<String>, field: &str) -> RowResult<Decimal> {
    Ok(optional_decimal(value, field)?.unwrap_or(Decimal::ZERO))
}

fn non_negative(value: &Option<String>, field: &str) -> RowResult<Decimal> {
    let parsed = decimal(value, field)?;
    if parsed < Decimal::ZERO {
        return Err(format!("欄位 {} 不可為負: {}", field, parsed));
    }
    Ok(parsed)
}

fn integer<T: FromStr>(value: &Option<String>, field: &str, default: T) -> RowResult<T> {
    match text(value) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("欄位 {} 不是有效整數: {}", field, raw)),
    }
}

fn period(year: &Option<String>, month: &Option<String>) -> RowResult<Period> {
    let year: i32 = integer(year, "year", 0)?;
    let month: u32 = integer(month, "month", 0)?;
    Period::new(year, month).map_err(|e| e.to_string())
}

fn status(value: &Option<String>) -> RowResult<RecordStatus> {
    text(value)
        .map(|raw| RecordStatus::from_str(raw).map_err(|e| e.to_string()))
        .transpose()
        .map(Option::unwrap_or_default)
}

/// 解析 "online=0.8;retail=0.3" 格式的通路覆寫
fn channel_values(value: &Option<String>, field: &str) -> RowResult<Vec<(Channel, Decimal)>> {
    let Some(raw) = text(value) else {
        return Ok(Vec::new());
    };

    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (channel, amount) = entry
                .split_once('=')
                .ok_or_else(|| format!("欄位 {} 格式錯誤: {}", field, entry))?;
            let channel = Channel::from_str(channel).map_err(|e| e.to_string())?;
            let amount = parse_number(amount.trim())
                .ok_or_else(|| format!("欄位 {} 不是數值: {}", field, amount))?;
            if amount < Decimal::ZERO {
                return Err(format!("欄位 {} 不可為負: {}", field, entry));
            }
            Ok((channel, amount))
        })
        .collect()
}

fn row_key(parts: &[&Option<String>]) -> String {
    parts
        .iter()
        .map(|part| text(part).unwrap_or("?"))
        .collect::<Vec<_>>()
        .join("/")
}

/// CSV 匯入器
pub struct CsvImporter {
    config: PlannerConfig,
}

impl CsvImporter {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// 讀入並寫入持久層，回傳合併後的統計
    pub fn import<R: Read, P: PlanningRepository + ?Sized>(
        &self,
        kind: ImportKind,
        reader: R,
        repo: &mut P,
    ) -> StoreResult<UpsertSummary> {
        let summary = match kind {
            ImportKind::Materials => {
                let batch = self.parse_materials(reader)?;
                Self::commit(batch, |records| repo.upsert_materials(records))?
            }
            ImportKind::Stores => {
                let batch = self.parse_stores(reader)?;
                Self::commit(batch, |records| repo.upsert_stores(records))?
            }
            ImportKind::StockFacts => {
                let batch = self.parse_stock_facts(reader)?;
                Self::commit(batch, |records| repo.upsert_stock_facts(records))?
            }
            ImportKind::Performance => {
                let batch = self.parse_performance(reader)?;
                Self::commit(batch, |records| repo.upsert_performance_facts(records))?
            }
        };

        tracing::info!("匯入 {:?}: {}", kind, summary);
        for rejection in summary.preview(self.config.rejection_preview_limit) {
            tracing::warn!("{}", rejection);
        }
        Ok(summary)
    }

    pub fn import_file<P: PlanningRepository + ?Sized>(
        &self,
        kind: ImportKind,
        path: impl AsRef<Path>,
        repo: &mut P,
    ) -> StoreResult<UpsertSummary> {
        let file = std::fs::File::open(path)?;
        self.import(kind, file, repo)
    }

    pub fn parse_materials<R: Read>(&self, reader: R) -> StoreResult<ImportBatch<Material>> {
        let format = self.config.scrap_rate_format;
        parse_rows(
            reader,
            |row: &MaterialCsvRow| row_key(&[&row.code]),
            |row: &MaterialCsvRow| {
                let code = required(&row.code, "code")?;
                let trigger = TriggerEvent::from(required(&row.trigger, "trigger")?);
                let unit = text(&row.unit)
                    .map(|raw| MeasurementUnit::from_str(raw).map_err(|e| e.to_string()))
                    .transpose()?
                    .unwrap_or(MeasurementUnit::Piece);

                let rate = optional_decimal(&row.consumption_rate, "consumption_rate")?;
                if rate.is_some_and(|r| r < Decimal::ZERO) {
                    return Err("消耗係數不可為負".to_string());
                }
                let scrap_rate = format.normalize(non_negative(&row.scrap_rate, "scrap_rate")?);

                let mut overrides = ChannelOverrides::default();
                for (channel, value) in channel_values(&row.channel_rates, "channel_rates")? {
                    overrides = overrides.with_rate(channel, value);
                }
                for (channel, value) in channel_values(&row.channel_scrap_rates, "channel_scrap_rates")? {
                    overrides = overrides.with_scrap_rate(channel, format.normalize(value));
                }

                let mut material = Material::new(
                    code,
                    text(&row.name).unwrap_or(code),
                    unit,
                    trigger,
                    rate.unwrap_or(Decimal::ZERO),
                )
                .with_scrap_rate(scrap_rate)
                .with_overrides(overrides)
                .with_warehouse_stock(decimal(&row.warehouse_stock, "warehouse_stock")?)
                .with_minimums(
                    non_negative(&row.min_shipment_qty, "min_shipment_qty")?,
                    non_negative(&row.min_order_qty, "min_order_qty")?,
                )
                .with_safety_stock(non_negative(&row.safety_stock, "safety_stock")?)
                .with_lead_time(
                    integer(&row.supplier_lead_time_days, "supplier_lead_time_days", 7)?,
                    integer(&row.buffer_days, "buffer_days", 0)?,
                );
                material.consumption_rate = rate;
                material.trigger_note = text(&row.trigger_note).map(str::to_string);
                material.consumption_note = text(&row.consumption_note).map(str::to_string);
                material.status = status(&row.status)?;

                if let Some(pack_name) = text(&row.pack_name) {
                    let pack_unit = text(&row.pack_unit)
                        .map(|raw| MeasurementUnit::from_str(raw).map_err(|e| e.to_string()))
                        .transpose()?
                        .unwrap_or(unit);
                    let units = non_negative(&row.units_per_pack, "units_per_pack")?;
                    material = material.with_pack(PackInfo::new(pack_name, units, pack_unit));
                }

                Ok(material)
            },
        )
    }

    pub fn parse_stores<R: Read>(&self, reader: R) -> StoreResult<ImportBatch<Store>> {
        parse_rows(
            reader,
            |row: &StoreCsvRow| row_key(&[&row.code]),
            |row: &StoreCsvRow| {
                let code = required(&row.code, "code")?;
                let mut store = Store::new(code, text(&row.name).unwrap_or(code))
                    .with_capacity(
                        integer(&row.capacity, "capacity", 0)?,
                        non_negative(&row.floor_area, "floor_area")?,
                    )
                    .with_transit_days(integer(&row.transit_days, "transit_days", 1)?)
                    .with_priority(integer(&row.priority, "priority", 5)?);
                store.city = text(&row.city).map(str::to_string);
                store.region = text(&row.region).map(str::to_string);
                store.regional_manager = text(&row.regional_manager).map(str::to_string);
                store.status = status(&row.status)?;
                Ok(store)
            },
        )
    }

    pub fn parse_stock_facts<R: Read>(&self, reader: R) -> StoreResult<ImportBatch<StoreMaterialStock>> {
        parse_rows(
            reader,
            |row: &StockCsvRow| row_key(&[&row.store_code, &row.material_code, &row.year, &row.month]),
            |row: &StockCsvRow| {
                let fact = StoreMaterialStock::new(
                    required(&row.store_code, "store_code")?,
                    required(&row.material_code, "material_code")?,
                    period(&row.year, &row.month)?,
                    decimal(&row.store_stock, "store_stock")?,
                    non_negative(&row.sales_qty, "sales_qty")?,
                )
                .with_in_transit(non_negative(&row.in_transit_qty, "in_transit_qty")?)
                .with_financials(
                    decimal(&row.revenue, "revenue")?,
                    decimal(&row.cost_of_goods, "cost_of_goods")?,
                    decimal(&row.gross_margin, "gross_margin")?,
                    decimal(&row.stock_value, "stock_value")?,
                );
                Ok(fact)
            },
        )
    }

    pub fn parse_performance<R: Read>(&self, reader: R) -> StoreResult<ImportBatch<StorePerformance>> {
        parse_rows(
            reader,
            |row: &PerformanceCsvRow| row_key(&[&row.store_code, &row.year, &row.month]),
            |row: &PerformanceCsvRow| {
                let performance = StorePerformance::new(
                    required(&row.store_code, "store_code")?,
                    period(&row.year, &row.month)?,
                    integer(&row.receipt_count, "receipt_count", 0)?,
                    non_negative(&row.units_sold, "units_sold")?,
                )
                .with_revenue(decimal(&row.revenue, "revenue")?)
                .with_returns_and_orders(
                    non_negative(&row.returns, "returns")?,
                    non_negative(&row.channel_orders, "channel_orders")?,
                )
                .with_stock_and_profit(decimal(&row.stock, "stock")?, decimal(&row.profit, "profit")?);
                Ok(performance)
            },
        )
    }

    /// 寫入持久層，並把持久層的列號換回檔案行號
    fn commit<T>(
        batch: ImportBatch<T>,
        upsert: impl FnOnce(&[T]) -> StoreResult<UpsertSummary>,
    ) -> StoreResult<UpsertSummary> {
        let ImportBatch {
            records,
            lines,
            mut summary,
        } = batch;

        let mut written = upsert(&records)?;
        for rejection in &mut written.rejections {
            if let Some(line) = rejection.row.checked_sub(1).and_then(|index| lines.get(index)) {
                rejection.row = *line;
            }
        }

        summary.merge(written);
        Ok(summary)
    }
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

fn record_line(position: Option<&csv::Position>, last_line: usize) -> usize {
    position
        .and_then(|p| usize::try_from(p.line()).ok())
        .unwrap_or(last_line + 1)
}

/// 讀入整份 CSV（去除 UTF-8 BOM）並逐列轉換
fn parse_rows<R, Raw, T>(
    mut reader: R,
    key: impl Fn(&Raw) -> String,
    convert: impl Fn(&Raw) -> RowResult<T>,
) -> StoreResult<ImportBatch<T>>
where
    R: Read,
    Raw: DeserializeOwned,
{
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let content = content.trim_start_matches('\u{feff}');

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = csv_reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut batch = ImportBatch::default();
    // 第 1 行為標題；欄位內含換行時以讀取器的實際行號為準
    let mut last_line = 1;

    loop {
        let line = match csv_reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => record_line(record.position(), last_line),
            Err(err) => {
                let line = record_line(err.position(), last_line);
                last_line = line;
                batch.summary.reject(line, "?", format!("CSV 格式錯誤: {}", err));
                continue;
            }
        };
        last_line = line;

        match record.deserialize::<Raw>(Some(&headers)) {
            Ok(raw) => match convert(&raw) {
                Ok(converted) => {
                    batch.records.push(converted);
                    batch.lines.push(line);
                }
                Err(reason) => batch.summary.reject(line, key(&raw), reason),
            },
            Err(err) => batch.summary.reject(line, "?", format!("CSV 格式錯誤: {}", err)),
        }
    }

    tracing::debug!(
        "CSV 解析完成：有效 {} 列，拒絕 {} 列",
        batch.records.len(),
        batch.summary.rejected
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use cplan_core::ScrapRateFormat;

    const MATERIALS_CSV: &str = "\u{feff}code,name,unit,trigger,consumption_rate,scrap_rate,pack_name,units_per_pack,pack_unit,channel_rates,warehouse_stock,safety_stock
SRF001,Thermal Paper Roll,meter,receipt_count,0.25,3,Roll,30,meter,online=0.4,500,200
SRF002,Packing Tape,piece,shipment_count,0.5,5,,,,,100,0
SRF003,Bag,piece,sale_count,abc,0,,,,,0,0
SRF004,Tape,piece,shipment_count,-1,0,,,,,0,0
SRF001,Duplicate Roll,meter,receipt_count,0.3,3,,,,,0,0
SRF005,No Rate,piece,order_count,,2,,,,,0,0
";

    fn percent_importer() -> CsvImporter {
        CsvImporter::new(PlannerConfig::default().with_scrap_rate_format(ScrapRateFormat::Percent))
    }

    #[test]
    fn test_parse_materials_with_rejections() {
        let batch = percent_importer().parse_materials(MATERIALS_CSV.as_bytes()).unwrap();

        // 重複鍵在寫入時才判斷
        assert_eq!(batch.records.len(), 4);
        assert_eq!(batch.summary.rejected, 2);
        assert_eq!(batch.summary.rejections[0].row, 4);
        assert_eq!(batch.summary.rejections[0].key, "SRF003");
        assert!(batch.summary.rejections[0].reason.contains("consumption_rate"));
        assert_eq!(batch.summary.rejections[1].row, 5);

        let roll = &batch.records[0];
        assert_eq!(roll.code, "SRF001");
        assert_eq!(roll.scrap_rate, Decimal::new(3, 2));
        assert_eq!(roll.overrides.rate_for(Channel::Online), Some(Decimal::new(4, 1)));
        assert_eq!(roll.pack.as_ref().unwrap().describe(), "Roll (30 meter)");
        assert_eq!(batch.lines, vec![2, 3, 6, 7]);

        let no_rate = batch.records.iter().find(|m| m.code == "SRF005").unwrap();
        assert_eq!(no_rate.consumption_rate, None);
    }

    #[test]
    fn test_import_materials_merges_tally() {
        let mut repo = InMemoryRepository::new();
        let summary = percent_importer()
            .import(ImportKind::Materials, MATERIALS_CSV.as_bytes(), &mut repo)
            .unwrap();

        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.rejected, 3);
        assert_eq!(summary.total(), 6);

        let rows: Vec<usize> = summary.rejections.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![4, 5, 6]);
        assert_eq!(repo.list_materials(true).unwrap().len(), 3);
    }

    #[test]
    fn test_fraction_format_keeps_value() {
        let csv = "code,trigger,consumption_rate,scrap_rate\nSRF001,sale_count,1,0.1\n";
        let batch = CsvImporter::default().parse_materials(csv.as_bytes()).unwrap();
        assert_eq!(batch.records[0].scrap_rate, Decimal::new(1, 1));
    }

    #[test]
    fn test_parse_stock_facts() {
        let csv = "store_code,material_code,year,month,store_stock,sales_qty\n\
                   M001,SRF001,2025,10,80,300\n\
                   M001,SRF001,2025,13,80,300\n\
                   M002,SRF001,2025,10,40,\n";
        let batch = CsvImporter::default().parse_stock_facts(csv.as_bytes()).unwrap();

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.summary.rejected, 1);
        assert_eq!(batch.summary.rejections[0].key, "M001/SRF001/2025/13");
        assert_eq!(batch.records[1].sales_qty, Decimal::ZERO);
        assert_eq!(batch.records[1].stock_to_sales_ratio(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_stores_and_performance() {
        let stores = "code,name,city,transit_days,priority\nM001,Kadikoy,Istanbul,2,1\n,Nameless,,,\n";
        let batch = CsvImporter::default().parse_stores(stores.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].transit_days, 2);
        assert_eq!(batch.records[0].city.as_deref(), Some("Istanbul"));
        assert_eq!(batch.summary.rejected, 1);

        let performance = "store_code,year,month,receipt_count,units_sold,revenue\nM001,2025,10,1200,3000,45000\n";
        let batch = CsvImporter::default().parse_performance(performance.as_bytes()).unwrap();
        assert_eq!(batch.records[0].units_per_receipt, Decimal::new(25, 1));
    }

    #[test]
    fn test_unequal_row_length_rejected() {
        let csv = "code,trigger,consumption_rate\nSRF001,sale_count,1,extra\nSRF002,sale_count,1\n";
        let batch = CsvImporter::default().parse_materials(csv.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.summary.rejections[0].row, 2);
    }

    #[test]
    fn test_multiline_field_keeps_file_line_numbers() {
        let csv = "code,name,trigger,consumption_rate\n\
SRF001,\"Thermal Paper\nRoll 80mm\",receipt_count,0.25\n\
SRF002,Packing Tape,shipment_count,abc\n\
SRF003,Bag,sale_count,1\n";
        let batch = CsvImporter::default().parse_materials(csv.as_bytes()).unwrap();

        assert_eq!(batch.records[0].name, "Thermal Paper\nRoll 80mm");
        assert_eq!(batch.summary.rejections[0].row, 4);
        assert_eq!(batch.summary.rejections[0].key, "SRF002");
        assert_eq!(batch.lines, vec![2, 5]);
    }
}
