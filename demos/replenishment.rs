//! 門市補貨分配示例

use cplan::{
    logging, Material, MeasurementUnit, Period, PlannerConfig, PlanningRepository, PlanningService,
    SqliteRepository, Store, StoreMaterialStock, TriggerEvent, WarehouseDrawdown,
};
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    logging::init();

    println!("=== 門市補貨分配示例 ===\n");

    let mut repo = SqliteRepository::open_in_memory()?;

    repo.upsert_materials(&[
        Material::new("SRF003", "Small Bag 20x30", MeasurementUnit::Piece, TriggerEvent::SaleCount, Decimal::ONE)
            .with_scrap_rate(Decimal::new(8, 2))
            .with_warehouse_stock(Decimal::from(900))
            .with_minimums(Decimal::from(50), Decimal::from(500))
            .with_safety_stock(Decimal::from(100))
            .with_lead_time(7, 2),
        Material::new("SRF005", "Carton 30x20x15", MeasurementUnit::Piece, TriggerEvent::ShipmentCount, Decimal::ONE)
            .with_scrap_rate(Decimal::new(3, 2))
            .with_warehouse_stock(Decimal::from(150))
            .with_minimums(Decimal::from(20), Decimal::from(200))
            .with_safety_stock(Decimal::from(40))
            .with_lead_time(14, 3),
    ])?;

    repo.upsert_stores(&[
        Store::new("M001", "Kadikoy").with_location("Istanbul", "Marmara").with_priority(1),
        Store::new("M002", "Bornova").with_location("Izmir", "Ege").with_transit_days(2).with_priority(2),
        Store::new("M003", "Cankaya").with_location("Ankara", "Ic Anadolu").with_transit_days(2),
    ])?;

    let october = Period::new(2025, 10)?;
    repo.upsert_stock_facts(&[
        StoreMaterialStock::new("M001", "SRF003", october, Decimal::from(120), Decimal::from(600)),
        StoreMaterialStock::new("M001", "SRF005", october, Decimal::from(30), Decimal::from(90)),
        StoreMaterialStock::new("M002", "SRF003", october, Decimal::from(400), Decimal::from(150)),
        StoreMaterialStock::new("M002", "SRF005", october, Decimal::from(10), Decimal::from(120)),
    ])?;

    for drawdown in [WarehouseDrawdown::Independent, WarehouseDrawdown::PriorityOrder] {
        let config = PlannerConfig::default().with_warehouse_drawdown(drawdown);
        let service = PlanningService::new(SqliteRepository::from_connection(repo.connection())?, config);
        let plan = service.replenishment_plan(Some(30))?;

        println!("分配方式 {:?}（{} 筆建議）:", drawdown, plan.decisions.len());
        for decision in &plan.decisions {
            println!(
                "  - {} / {}: 淨需求 {:.1}，{}，出貨 {:.1}，採購 {:.1}，前置 {} 天",
                decision.store_code,
                decision.material_code,
                decision.display_net_required(),
                decision.action,
                decision.shipment_qty,
                decision.order_qty,
                decision.lead_time_days
            );
        }
        for warning in &plan.warnings {
            println!("  ! {}: {}", warning.subject, warning.message);
        }
        println!("  採購合計: {:?}\n", plan.order_totals());
    }

    let service = PlanningService::new(repo, PlannerConfig::default());
    println!("採購候選:");
    for candidate in service.purchase_order_candidates()? {
        println!(
            "  - {}: 倉庫 {}，安全庫存 {}，建議採購 {}，前置 {} 天",
            candidate.material_code,
            candidate.warehouse_stock,
            candidate.safety_stock,
            candidate.order_qty,
            candidate.lead_time_days
        );
    }

    Ok(())
}
