//! 批次耗材消耗計算示例

use cplan::{
    logging, Channel, ImportKind, InMemoryRepository, PlannerConfig, PlanningService, ReportRow, ScrapRateFormat,
    TriggerCounts, TriggerEvent,
};

const MATERIALS: &str = "\
code,name,unit,trigger,trigger_note,consumption_rate,scrap_rate,pack_name,units_per_pack,pack_unit,channel_rates
SRF001,Thermal Paper Roll 80mm,meter,receipt_count,every receipt uses 25cm,0.25,3,Roll,30,meter,
SRF002,Packing Tape 45mm,piece,shipment_count,,0.5,5,Box,36,piece,online=0.8;retail=0.3
SRF003,Small Bag 20x30,piece,sale_count,,1,8,,,,
SRF004,Price Label,piece,labeling_count,,1,2,Roll,1000,piece,
SRF005,Broken Row,piece,order_count,,not-a-number,0,,,,
";

fn main() -> anyhow::Result<()> {
    logging::init();

    println!("=== 批次耗材消耗計算示例 ===\n");

    let config = PlannerConfig::default().with_scrap_rate_format(ScrapRateFormat::Percent);
    let mut service = PlanningService::new(InMemoryRepository::new(), config);

    let summary = service.import_csv(ImportKind::Materials, MATERIALS.as_bytes())?;
    println!("物料匯入: {}", summary);
    for rejection in summary.preview(service.config().rejection_preview_limit) {
        println!("  - {}", rejection);
    }

    // 單一物料
    let roll = service.material_need("SRF001", 120_000, None, None)?;
    println!(
        "\n{}: 理論 {}，損耗 {} ({})，淨消耗 {} {}",
        roll.material_name,
        roll.breakdown.theoretical.normalize(),
        roll.breakdown.scrap_amount.normalize(),
        roll.breakdown.scrap_rate_label(),
        roll.breakdown.net.normalize(),
        roll.unit
    );

    // 依觸發類型批次計算
    let counts = TriggerCounts::by_trigger([
        (TriggerEvent::ReceiptCount, 10_000),
        (TriggerEvent::ShipmentCount, 2_400),
        (TriggerEvent::SaleCount, 15_000),
        (TriggerEvent::LabelingCount, 0),
    ]);
    let report = service.bulk_plan(&counts, Some(Channel::Online))?;

    println!("\n線上通路計算結果 ({} 筆):", report.material_count());
    for result in &report.results {
        println!(
            "  - {} [{}]: 淨消耗 {} {}，包裝 {}",
            result.material_code,
            result.channel_label(),
            result.breakdown.net.normalize(),
            result.unit,
            result
                .pack
                .as_ref()
                .map(|p| format!("{} {}", p.packs, p.pack_name))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    println!("損耗總量: {}", report.total_scrap().normalize());
    println!("訂購包裝總數: {}", report.total_packs());

    println!("\n採購清單:");
    println!("{}", cplan::OrderLine::columns().join(","));
    for line in report.order_lines() {
        println!("{}", line.values().join(","));
    }

    Ok(())
}
