//! 倉庫出貨與採購候選清單

use cplan_core::{Material, PurchaseOrderCandidate, ShipmentCandidate};
use rust_decimal::Decimal;

/// 候選物料查詢
pub struct CandidateFinder;

impl CandidateFinder {
    /// 倉庫有庫存的啟用中物料（停用物料不列出，只列屬性，不做補貨判斷）
    pub fn shipment_candidates(materials: &[Material]) -> Vec<ShipmentCandidate> {
        materials
            .iter()
            .filter(|m| m.is_active() && m.warehouse_stock > Decimal::ZERO)
            .map(|m| ShipmentCandidate {
                material_code: m.code.clone(),
                material_name: m.name.clone(),
                warehouse_stock: m.warehouse_stock,
                min_shipment_qty: m.min_shipment_qty,
                supplier_lead_time_days: m.supplier_lead_time_days,
                buffer_days: m.buffer_days,
                safety_stock: m.safety_stock,
            })
            .collect()
    }

    /// 倉庫庫存低於安全庫存的物料
    pub fn purchase_order_candidates(materials: &[Material]) -> Vec<PurchaseOrderCandidate> {
        let candidates: Vec<PurchaseOrderCandidate> = materials
            .iter()
            .filter(|m| m.is_active() && m.is_below_safety_stock())
            .map(|m| PurchaseOrderCandidate {
                material_code: m.code.clone(),
                material_name: m.name.clone(),
                warehouse_stock: m.warehouse_stock,
                safety_stock: m.safety_stock,
                min_order_qty: m.min_order_qty,
                order_qty: m.safety_stock_shortfall().max(m.min_order_qty),
                lead_time_days: m.replenishment_lead_time_days(),
            })
            .collect();

        tracing::debug!("採購候選物料 {} 筆", candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cplan_core::{MeasurementUnit, TriggerEvent};

    fn material(code: &str, warehouse: i64, safety: i64, min_order: i64) -> Material {
        Material::new(code, code, MeasurementUnit::Piece, TriggerEvent::SaleCount, Decimal::ONE)
            .with_warehouse_stock(Decimal::from(warehouse))
            .with_safety_stock(Decimal::from(safety))
            .with_minimums(Decimal::from(10), Decimal::from(min_order))
            .with_lead_time(7, 3)
    }

    #[test]
    fn test_shipment_candidates_positive_stock_only() {
        let materials = vec![material("A", 100, 0, 0), material("B", 0, 0, 0), material("C", -5, 0, 0)];

        let candidates = CandidateFinder::shipment_candidates(&materials);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].material_code, "A");
        assert_eq!(candidates[0].min_shipment_qty, Decimal::from(10));
        assert_eq!(candidates[0].buffer_days, 3);
    }

    #[test]
    fn test_purchase_order_shortfall() {
        let candidates = CandidateFinder::purchase_order_candidates(&[material("A", 20, 100, 50)]);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].order_qty, Decimal::from(80));
        assert_eq!(candidates[0].lead_time_days, 10);
    }

    #[test]
    fn test_purchase_order_min_order_wins() {
        let candidates = CandidateFinder::purchase_order_candidates(&[material("A", 90, 100, 50)]);
        assert_eq!(candidates[0].order_qty, Decimal::from(50));
    }

    #[test]
    fn test_purchase_order_at_safety_stock_excluded() {
        let candidates =
            CandidateFinder::purchase_order_candidates(&[material("A", 100, 100, 50), material("B", 150, 100, 0)]);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_inactive_materials_excluded() {
        let mut retired = material("A", 20, 100, 0);
        retired.deactivate();

        assert!(CandidateFinder::shipment_candidates(&[retired.clone()]).is_empty());
        assert!(CandidateFinder::purchase_order_candidates(&[retired]).is_empty());
    }
}
