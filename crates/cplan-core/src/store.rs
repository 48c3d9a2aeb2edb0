//! 門市模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::RecordStatus;

/// 門市
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    /// 門市代碼（唯一）
    pub code: String,

    /// 門市名稱
    pub name: String,

    pub city: Option<String>,

    pub region: Option<String>,

    /// 區域經理
    pub regional_manager: Option<String>,

    /// 容量（件）
    pub capacity: u32,

    /// 賣場面積（平方公尺）
    pub floor_area: Decimal,

    /// 倉庫到門市的運送天數
    pub transit_days: u32,

    /// 優先級（數字越小越優先）
    pub priority: u8,

    #[serde(default)]
    pub status: RecordStatus,
}

impl Store {
    /// 創建新的門市
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            city: None,
            region: None,
            regional_manager: None,
            capacity: 0,
            floor_area: Decimal::ZERO,
            transit_days: 1,
            priority: 5,
            status: RecordStatus::Active,
        }
    }

    /// 建構器模式：設置地點
    pub fn with_location(mut self, city: impl Into<String>, region: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.region = Some(region.into());
        self
    }

    /// 建構器模式：設置區域經理
    pub fn with_regional_manager(mut self, manager: impl Into<String>) -> Self {
        self.regional_manager = Some(manager.into());
        self
    }

    /// 建構器模式：設置容量與面積
    pub fn with_capacity(mut self, capacity: u32, floor_area: Decimal) -> Self {
        self.capacity = capacity;
        self.floor_area = floor_area;
        self
    }

    /// 建構器模式：設置運送天數
    pub fn with_transit_days(mut self, days: u32) -> Self {
        self.transit_days = days;
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// 軟刪除
    pub fn deactivate(&mut self) {
        self.status = RecordStatus::Inactive;
    }
}
