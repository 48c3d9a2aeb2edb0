//! 門市物料庫存事實

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Period;

/// 門市 × 物料 × 年月 的庫存與銷售事實
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMaterialStock {
    pub store_code: String,

    pub material_code: String,

    pub period: Period,

    /// 門市現有庫存
    pub store_stock: Decimal,

    /// 期間內銷售（消耗）數量
    pub sales_qty: Decimal,

    /// 在途數量
    pub in_transit_qty: Decimal,

    pub revenue: Decimal,

    /// 銷貨成本
    pub cost_of_goods: Decimal,

    pub gross_margin: Decimal,

    /// 庫存金額
    pub stock_value: Decimal,
}

impl StoreMaterialStock {
    /// 創建新的庫存事實
    pub fn new(
        store_code: impl Into<String>,
        material_code: impl Into<String>,
        period: Period,
        store_stock: Decimal,
        sales_qty: Decimal,
    ) -> Self {
        Self {
            store_code: store_code.into(),
            material_code: material_code.into(),
            period,
            store_stock,
            sales_qty,
            in_transit_qty: Decimal::ZERO,
            revenue: Decimal::ZERO,
            cost_of_goods: Decimal::ZERO,
            gross_margin: Decimal::ZERO,
            stock_value: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置在途數量
    pub fn with_in_transit(mut self, qty: Decimal) -> Self {
        self.in_transit_qty = qty;
        self
    }

    /// 建構器模式：設置財務欄位
    pub fn with_financials(
        mut self,
        revenue: Decimal,
        cost_of_goods: Decimal,
        gross_margin: Decimal,
        stock_value: Decimal,
    ) -> Self {
        self.revenue = revenue;
        self.cost_of_goods = cost_of_goods;
        self.gross_margin = gross_margin;
        self.stock_value = stock_value;
        self
    }

    /// 業務鍵（門市、物料、期間）
    pub fn key(&self) -> (&str, &str, Period) {
        (&self.store_code, &self.material_code, self.period)
    }

    /// 庫存銷售比（銷售為 0 時回傳 0）
    pub fn stock_to_sales_ratio(&self) -> Decimal {
        if self.sales_qty.is_zero() {
            Decimal::ZERO
        } else {
            self.store_stock / self.sales_qty
        }
    }
}
