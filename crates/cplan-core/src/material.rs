//! 耗材物料模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::PlanError;

/// 銷售/作業通路
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// 門市
    Retail,
    /// 線上
    Online,
    /// 批發
    Wholesale,
    /// 倉庫
    Warehouse,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Retail,
        Channel::Online,
        Channel::Wholesale,
        Channel::Warehouse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Retail => "retail",
            Channel::Online => "online",
            Channel::Wholesale => "wholesale",
            Channel::Warehouse => "warehouse",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retail" | "store" => Ok(Channel::Retail),
            "online" => Ok(Channel::Online),
            "wholesale" => Ok(Channel::Wholesale),
            "warehouse" => Ok(Channel::Warehouse),
            other => Err(PlanError::Other(format!("未知的通路: {}", other))),
        }
    }
}

/// 觸發耗材消耗的作業類型
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerEvent {
    /// 開立收據張數
    ReceiptCount,
    /// 出貨箱數
    ShipmentCount,
    /// 銷售件數
    SaleCount,
    /// 線上訂單數
    OrderCount,
    /// 包裝件數
    PackingCount,
    /// 退貨筆數
    ReturnCount,
    /// 貼標件數
    LabelingCount,
    /// 自訂類別
    Other(String),
}

impl TriggerEvent {
    pub fn as_str(&self) -> &str {
        match self {
            TriggerEvent::ReceiptCount => "receipt_count",
            TriggerEvent::ShipmentCount => "shipment_count",
            TriggerEvent::SaleCount => "sale_count",
            TriggerEvent::OrderCount => "order_count",
            TriggerEvent::PackingCount => "packing_count",
            TriggerEvent::ReturnCount => "return_count",
            TriggerEvent::LabelingCount => "labeling_count",
            TriggerEvent::Other(name) => name.as_str(),
        }
    }
}

impl From<String> for TriggerEvent {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "receipt_count" | "receipt" => TriggerEvent::ReceiptCount,
            "shipment_count" | "shipment" => TriggerEvent::ShipmentCount,
            "sale_count" | "sale" => TriggerEvent::SaleCount,
            "order_count" | "order" => TriggerEvent::OrderCount,
            "packing_count" | "packing" => TriggerEvent::PackingCount,
            "return_count" | "return" => TriggerEvent::ReturnCount,
            "labeling_count" | "labeling" => TriggerEvent::LabelingCount,
            _ => TriggerEvent::Other(value.trim().to_string()),
        }
    }
}

impl From<&str> for TriggerEvent {
    fn from(value: &str) -> Self {
        TriggerEvent::from(value.to_string())
    }
}

impl From<TriggerEvent> for String {
    fn from(value: TriggerEvent) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 計量單位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementUnit {
    /// 件（計數）
    Piece,
    /// 公尺（長度）
    Meter,
    /// 公斤（重量）
    Kilogram,
    /// 公升（容量）
    Liter,
}

impl MeasurementUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Piece => "piece",
            MeasurementUnit::Meter => "meter",
            MeasurementUnit::Kilogram => "kg",
            MeasurementUnit::Liter => "liter",
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementUnit {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "piece" | "pcs" | "pc" | "count" => Ok(MeasurementUnit::Piece),
            "meter" | "m" | "metre" => Ok(MeasurementUnit::Meter),
            "kg" | "kilogram" => Ok(MeasurementUnit::Kilogram),
            "liter" | "l" | "litre" => Ok(MeasurementUnit::Liter),
            other => Err(PlanError::Other(format!("未知的計量單位: {}", other))),
        }
    }
}

/// 包裝規格（卷、箱、包、棧板）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackInfo {
    /// 包裝名稱，例如 "Roll"、"Box"
    pub pack_name: String,

    /// 每包裝含基本單位數量（<= 0 時包裝需求視為 0）
    pub units_per_pack: Decimal,

    /// 包裝內容的計量單位
    pub pack_unit: MeasurementUnit,
}

impl PackInfo {
    pub fn new(pack_name: impl Into<String>, units_per_pack: Decimal, pack_unit: MeasurementUnit) -> Self {
        Self {
            pack_name: pack_name.into(),
            units_per_pack,
            pack_unit,
        }
    }

    /// 報表用說明文字，例如 "Roll (30 meter)"
    pub fn describe(&self) -> String {
        format!(
            "{} ({} {})",
            self.pack_name,
            self.units_per_pack.normalize(),
            self.pack_unit
        )
    }
}

/// 通路別覆寫值（消耗係數與損耗率分別查找）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelOverrides {
    #[serde(default)]
    pub rates: BTreeMap<Channel, Decimal>,

    #[serde(default)]
    pub scrap_rates: BTreeMap<Channel, Decimal>,
}

impl ChannelOverrides {
    pub fn with_rate(mut self, channel: Channel, rate: Decimal) -> Self {
        self.rates.insert(channel, rate);
        self
    }

    pub fn with_scrap_rate(mut self, channel: Channel, scrap_rate: Decimal) -> Self {
        self.scrap_rates.insert(channel, scrap_rate);
        self
    }

    pub fn rate_for(&self, channel: Channel) -> Option<Decimal> {
        self.rates.get(&channel).copied()
    }

    pub fn scrap_rate_for(&self, channel: Channel) -> Option<Decimal> {
        self.scrap_rates.get(&channel).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty() && self.scrap_rates.is_empty()
    }
}

/// 主檔生命週期（軟刪除）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" | "1" | "true" => Ok(RecordStatus::Active),
            "inactive" | "0" | "false" => Ok(RecordStatus::Inactive),
            other => Err(PlanError::Other(format!("未知的狀態: {}", other))),
        }
    }
}

/// 耗材物料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// 物料代碼（唯一）
    pub code: String,

    /// 物料名稱
    pub name: String,

    /// 基本計量單位
    pub unit: MeasurementUnit,

    /// 觸發作業類型
    pub trigger: TriggerEvent,

    /// 觸發說明，例如 "每張收據使用 25cm"
    pub trigger_note: Option<String>,

    /// 預設消耗係數（每次觸發消耗量）；缺值表示主檔不完整
    pub consumption_rate: Option<Decimal>,

    /// 消耗係數說明，例如 "1 張收據 = 0.25m"
    pub consumption_note: Option<String>,

    /// 預設損耗率（0-1 小數）
    pub scrap_rate: Decimal,

    /// 通路別覆寫
    #[serde(default)]
    pub overrides: ChannelOverrides,

    /// 包裝規格（缺值時結果維持基本單位）
    pub pack: Option<PackInfo>,

    /// 倉庫現有庫存
    pub warehouse_stock: Decimal,

    /// 最小出貨量
    pub min_shipment_qty: Decimal,

    /// 最小採購量
    pub min_order_qty: Decimal,

    /// 安全庫存
    pub safety_stock: Decimal,

    /// 供應商平均交期（天）
    pub supplier_lead_time_days: u32,

    /// 額外緩衝天數
    pub buffer_days: u32,

    /// 生命週期狀態
    #[serde(default)]
    pub status: RecordStatus,
}

impl Material {
    /// 創建新的耗材物料
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        unit: MeasurementUnit,
        trigger: TriggerEvent,
        consumption_rate: Decimal,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            unit,
            trigger,
            trigger_note: None,
            consumption_rate: Some(consumption_rate),
            consumption_note: None,
            scrap_rate: Decimal::ZERO,
            overrides: ChannelOverrides::default(),
            pack: None,
            warehouse_stock: Decimal::ZERO,
            min_shipment_qty: Decimal::ZERO,
            min_order_qty: Decimal::ZERO,
            safety_stock: Decimal::ZERO,
            supplier_lead_time_days: 7,
            buffer_days: 0,
            status: RecordStatus::Active,
        }
    }

    /// 建構器模式：設置損耗率（0-1 小數）
    pub fn with_scrap_rate(mut self, scrap_rate: Decimal) -> Self {
        self.scrap_rate = scrap_rate;
        self
    }

    /// 建構器模式：設置通路覆寫
    pub fn with_overrides(mut self, overrides: ChannelOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// 建構器模式：設置包裝規格
    pub fn with_pack(mut self, pack: PackInfo) -> Self {
        self.pack = Some(pack);
        self
    }

    /// 建構器模式：設置說明文字
    pub fn with_notes(mut self, trigger_note: impl Into<String>, consumption_note: impl Into<String>) -> Self {
        self.trigger_note = Some(trigger_note.into());
        self.consumption_note = Some(consumption_note.into());
        self
    }

    /// 建構器模式：設置倉庫庫存
    pub fn with_warehouse_stock(mut self, stock: Decimal) -> Self {
        self.warehouse_stock = stock;
        self
    }

    /// 建構器模式：設置最小出貨量與最小採購量
    pub fn with_minimums(mut self, min_shipment_qty: Decimal, min_order_qty: Decimal) -> Self {
        self.min_shipment_qty = min_shipment_qty;
        self.min_order_qty = min_order_qty;
        self
    }

    /// 建構器模式：設置安全庫存
    pub fn with_safety_stock(mut self, stock: Decimal) -> Self {
        self.safety_stock = stock;
        self
    }

    /// 建構器模式：設置供應商交期與緩衝天數
    pub fn with_lead_time(mut self, supplier_lead_time_days: u32, buffer_days: u32) -> Self {
        self.supplier_lead_time_days = supplier_lead_time_days;
        self.buffer_days = buffer_days;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// 軟刪除
    pub fn deactivate(&mut self) {
        self.status = RecordStatus::Inactive;
    }

    /// 採購補貨總前置天數（交期 + 緩衝）
    pub fn replenishment_lead_time_days(&self) -> u32 {
        self.supplier_lead_time_days.saturating_add(self.buffer_days)
    }

    /// 檢查倉庫庫存是否低於安全庫存
    pub fn is_below_safety_stock(&self) -> bool {
        self.warehouse_stock < self.safety_stock
    }

    /// 補足安全庫存所缺的數量
    pub fn safety_stock_shortfall(&self) -> Decimal {
        if self.is_below_safety_stock() {
            self.safety_stock - self.warehouse_stock
        } else {
            Decimal::ZERO
        }
    }

    /// 檢查計算所需的數值欄位
    pub fn validate(&self) -> crate::Result<()> {
        let rate = self
            .consumption_rate
            .ok_or_else(|| PlanError::invalid_material(&self.code, "缺少消耗係數"))?;
        if rate < Decimal::ZERO {
            return Err(PlanError::invalid_material(&self.code, "消耗係數為負"));
        }
        if self.scrap_rate < Decimal::ZERO {
            return Err(PlanError::invalid_material(&self.code, "損耗率為負"));
        }
        if let Some((channel, _)) = self
            .overrides
            .rates
            .iter()
            .chain(self.overrides.scrap_rates.iter())
            .find(|(_, value)| **value < Decimal::ZERO)
        {
            return Err(PlanError::invalid_material(
                &self.code,
                format!("通路 {} 覆寫值為負", channel),
            ));
        }
        Ok(())
    }

    /// 物料說明文字（觸發類型、說明、包裝）
    pub fn describe(&self) -> String {
        let mut text = format!("Trigger: {}", self.trigger);
        if let Some(note) = &self.trigger_note {
            text.push('\n');
            text.push_str(note);
        }
        if let Some(pack) = &self.pack {
            text.push_str(&format!(
                "\n1 {} = {} {}",
                pack.pack_name,
                pack.units_per_pack.normalize(),
                pack.pack_unit
            ));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn receipt_roll() -> Material {
        Material::new(
            "SRF001",
            "Receipt Roll 80mm",
            MeasurementUnit::Meter,
            TriggerEvent::ReceiptCount,
            Decimal::new(25, 2),
        )
        .with_scrap_rate(Decimal::new(10, 2))
        .with_pack(PackInfo::new("Roll", Decimal::from(30), MeasurementUnit::Meter))
        .with_notes("every receipt uses 25cm", "1 receipt = 0.25m")
    }

    #[test]
    fn test_create_material() {
        let material = receipt_roll();

        assert_eq!(material.code, "SRF001");
        assert_eq!(material.consumption_rate, Some(Decimal::new(25, 2)));
        assert_eq!(material.supplier_lead_time_days, 7);
        assert!(material.is_active());
        assert!(material.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_rate() {
        let mut material = receipt_roll();
        material.consumption_rate = None;

        let err = material.validate().unwrap_err();
        assert!(err.is_material_error());
    }

    #[test]
    fn test_validate_negative_override() {
        let material = receipt_roll().with_overrides(
            ChannelOverrides::default().with_scrap_rate(Channel::Online, Decimal::new(-1, 2)),
        );

        assert!(material.validate().is_err());
    }

    #[test]
    fn test_safety_stock_shortfall() {
        let material = receipt_roll()
            .with_warehouse_stock(Decimal::from(5))
            .with_safety_stock(Decimal::from(20));

        assert!(material.is_below_safety_stock());
        assert_eq!(material.safety_stock_shortfall(), Decimal::from(15));

        let stocked = material.with_warehouse_stock(Decimal::from(25));
        assert_eq!(stocked.safety_stock_shortfall(), Decimal::ZERO);
    }

    #[test]
    fn test_lead_time_saturates() {
        let material = receipt_roll().with_lead_time(u32::MAX, 5);
        assert_eq!(material.replenishment_lead_time_days(), u32::MAX);
        assert_eq!(receipt_roll().with_lead_time(10, 2).replenishment_lead_time_days(), 12);
    }

    #[test]
    fn test_deactivate() {
        let mut material = receipt_roll();
        material.deactivate();
        assert_eq!(material.status, RecordStatus::Inactive);
        assert!(!material.is_active());
    }

    #[test]
    fn test_describe() {
        let text = receipt_roll().describe();
        assert!(text.starts_with("Trigger: receipt_count"));
        assert!(text.contains("every receipt uses 25cm"));
        assert!(text.contains("1 Roll = 30 meter"));
    }

    #[rstest]
    #[case("receipt_count", TriggerEvent::ReceiptCount)]
    #[case("Shipment", TriggerEvent::ShipmentCount)]
    #[case("packing_count", TriggerEvent::PackingCount)]
    #[case("gift_wrap", TriggerEvent::Other("gift_wrap".to_string()))]
    fn test_trigger_event_from_str(#[case] input: &str, #[case] expected: TriggerEvent) {
        assert_eq!(TriggerEvent::from(input), expected);
    }

    #[rstest]
    #[case("retail", Channel::Retail)]
    #[case("ONLINE", Channel::Online)]
    #[case("wholesale", Channel::Wholesale)]
    #[case("warehouse", Channel::Warehouse)]
    fn test_channel_from_str(#[case] input: &str, #[case] expected: Channel) {
        assert_eq!(input.parse::<Channel>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_unit() {
        assert!("bushel".parse::<MeasurementUnit>().is_err());
        assert_eq!("metre".parse::<MeasurementUnit>().unwrap(), MeasurementUnit::Meter);
    }

    #[test]
    fn test_pack_describe() {
        let pack = PackInfo::new("Box", Decimal::new(3600, 2), MeasurementUnit::Piece);
        assert_eq!(pack.describe(), "Box (36 piece)");
    }
}
