//! 門市月度績效

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Period;

/// 門市 × 年月 的銷售績效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePerformance {
    pub store_code: String,

    pub period: Period,

    /// 收據張數
    pub receipt_count: u64,

    /// 銷售件數
    pub units_sold: Decimal,

    /// 每張收據件數
    pub units_per_receipt: Decimal,

    pub revenue: Decimal,

    pub average_unit_price: Decimal,

    /// 退貨數量
    pub returns: Decimal,

    /// 通路別訂單指標（例如線上訂單數）
    pub channel_orders: Decimal,

    /// 期末庫存快照
    pub stock: Decimal,

    pub profit: Decimal,
}

impl StorePerformance {
    /// 創建新的績效記錄，件單比由收據與件數推得
    pub fn new(store_code: impl Into<String>, period: Period, receipt_count: u64, units_sold: Decimal) -> Self {
        let units_per_receipt = if receipt_count == 0 {
            Decimal::ZERO
        } else {
            units_sold / Decimal::from(receipt_count)
        };
        Self {
            store_code: store_code.into(),
            period,
            receipt_count,
            units_sold,
            units_per_receipt,
            revenue: Decimal::ZERO,
            average_unit_price: Decimal::ZERO,
            returns: Decimal::ZERO,
            channel_orders: Decimal::ZERO,
            stock: Decimal::ZERO,
            profit: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置營收，平均單價由件數推得
    pub fn with_revenue(mut self, revenue: Decimal) -> Self {
        self.revenue = revenue;
        self.average_unit_price = if self.units_sold.is_zero() {
            Decimal::ZERO
        } else {
            revenue / self.units_sold
        };
        self
    }

    /// 建構器模式：設置退貨與通路訂單
    pub fn with_returns_and_orders(mut self, returns: Decimal, channel_orders: Decimal) -> Self {
        self.returns = returns;
        self.channel_orders = channel_orders;
        self
    }

    /// 建構器模式：設置庫存與利潤
    pub fn with_stock_and_profit(mut self, stock: Decimal, profit: Decimal) -> Self {
        self.stock = stock;
        self.profit = profit;
        self
    }
}
