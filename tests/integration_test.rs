//! 集成測試

use cplan::*;
use rstest::rstest;
use rust_decimal::Decimal;
use std::io::Write;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

const MATERIALS_CSV: &str = "\
code,name,unit,trigger,consumption_rate,scrap_rate,pack_name,units_per_pack,pack_unit,warehouse_stock,min_shipment_qty,min_order_qty,safety_stock,supplier_lead_time_days,buffer_days
SRF001,Thermal Paper Roll,meter,receipt_count,0.25,10,Roll,30,meter,800,50,0,0,10,2
SRF002,Packing Tape,piece,shipment_count,1,3,,,,200,0,100,0,5,1
SRF003,Small Bag,piece,sale_count,1,0,,,,0,0,100,50,7,0
";

const STORES_CSV: &str = "\
code,name,city,region,transit_days,priority
M001,Kadikoy,Istanbul,Marmara,1,1
M002,Bornova,Izmir,Ege,2,2
";

const STOCK_CSV: &str = "\
store_code,material_code,year,month,store_stock,sales_qty
M001,SRF001,2025,10,100,400
M001,SRF002,2025,10,0,0
M002,SRF002,2025,9,10,90
M002,SRF002,2025,10,20,60
";

fn seeded<R: PlanningRepository>(repo: R) -> PlanningService<R> {
    let config = PlannerConfig::default().with_scrap_rate_format(ScrapRateFormat::Percent);
    let mut service = PlanningService::new(repo, config);

    let materials = service.import_csv(ImportKind::Materials, MATERIALS_CSV.as_bytes()).unwrap();
    assert_eq!((materials.inserted, materials.rejected), (3, 0));
    let stores = service.import_csv(ImportKind::Stores, STORES_CSV.as_bytes()).unwrap();
    assert_eq!(stores.inserted, 2);
    let stock = service.import_csv(ImportKind::StockFacts, STOCK_CSV.as_bytes()).unwrap();
    assert_eq!(stock.inserted, 4);

    service
}

#[test]
fn test_scenario_single_material_need() {
    // 收據 120000 張，每張 1 單位，損耗 3%
    let material = Material::new("SRF010", "Receipt", MeasurementUnit::Piece, TriggerEvent::ReceiptCount, Decimal::ONE)
        .with_scrap_rate(dec("0.03"));
    let result = BulkConsumptionPlanner::material_need(&material, 120_000, None, None).unwrap();

    assert_eq!(result.breakdown.theoretical, Decimal::from(120_000));
    assert_eq!(result.breakdown.net, Decimal::from(123_600));
    assert!(result.pack.is_none());
}

#[test]
fn test_scenario_pack_requirement() {
    let material = Material::new("SRF001", "Roll", MeasurementUnit::Meter, TriggerEvent::ReceiptCount, dec("0.25"))
        .with_scrap_rate(dec("0.10"))
        .with_pack(PackInfo::new("Roll", Decimal::from(30), MeasurementUnit::Meter));
    let result = BulkConsumptionPlanner::material_need(&material, 10_000, None, None).unwrap();

    assert_eq!(result.breakdown.theoretical, Decimal::from(2500));
    assert_eq!(result.breakdown.scrap_amount, Decimal::from(250));
    assert_eq!(result.breakdown.net, Decimal::from(2750));
    let pack = result.pack.unwrap();
    assert_eq!(pack.fractional.round_dp(3), dec("91.667"));
    assert_eq!(pack.packs, Decimal::from(92));
}

#[rstest]
#[case(dec("500"), dec("800"), dec("50"), dec("0"), ReplenishmentAction::ShipFromWarehouse, dec("500"), dec("0"))]
#[case(dec("500"), dec("200"), dec("0"), dec("100"), ReplenishmentAction::ShipAndOrder, dec("200"), dec("300"))]
#[case(dec("500"), dec("0"), dec("0"), dec("100"), ReplenishmentAction::OrderFromSupplier, dec("0"), dec("500"))]
fn test_scenario_classification(
    #[case] required: Decimal,
    #[case] warehouse: Decimal,
    #[case] min_ship: Decimal,
    #[case] min_order: Decimal,
    #[case] action: ReplenishmentAction,
    #[case] shipment: Decimal,
    #[case] order: Decimal,
) {
    let allocation = ReplenishmentAllocator::classify(required, warehouse, min_ship, min_order);
    assert_eq!(allocation.action, action);
    assert_eq!(allocation.shipment_qty, shipment);
    assert_eq!(allocation.order_qty, order);
}

#[test]
fn test_scenario_zero_sales_ratio() {
    let fact = StoreMaterialStock::new("M001", "SRF001", Period::new(2025, 10).unwrap(), Decimal::from(40), Decimal::ZERO);
    assert_eq!(fact.stock_to_sales_ratio(), Decimal::ZERO);
}

fn check_full_flow<R: PlanningRepository>(service: PlanningService<R>) {
    // 批次：依觸發類型，SaleCount 為 0 不列出
    let counts = TriggerCounts::by_trigger([
        (TriggerEvent::ReceiptCount, 10_000),
        (TriggerEvent::ShipmentCount, 300),
        (TriggerEvent::SaleCount, 0),
    ]);
    let report = service.bulk_plan(&counts, None).unwrap();
    assert_eq!(report.material_count(), 2);
    assert_eq!(report.find("SRF001").unwrap().packs_to_order(), Some(Decimal::from(92)));
    assert_eq!(report.find("SRF002").unwrap().breakdown.net, Decimal::from(309));
    assert!(report.find("SRF003").is_none());

    // 補貨
    let plan = service.replenishment_plan(None).unwrap();
    assert_eq!(plan.horizon_days, 30);

    // M001/SRF001: 400 × 1.10 - 100 = 340，倉庫 800 足夠
    let roll = plan.find("M001", "SRF001").unwrap();
    assert_eq!(roll.net_required, Decimal::from(340));
    assert_eq!(roll.action, ReplenishmentAction::ShipFromWarehouse);
    assert_eq!(roll.shipment_qty, Decimal::from(340));
    assert_eq!(roll.lead_time_days, 1);

    // M002/SRF002 取最新期間（10 月）：60 × 1.03 - 20 = 41.8
    let tape = plan.find("M002", "SRF002").unwrap();
    assert_eq!(tape.net_required, dec("41.8"));
    assert_eq!(tape.action, ReplenishmentAction::ShipFromWarehouse);

    // M001/SRF002 沒有需求也沒有庫存，不輸出
    assert!(plan.find("M001", "SRF002").is_none());

    // SRF003 沒有歷史：需求 = 安全庫存 50，倉庫 0 → 向供應商採購最小量 100
    let bag = plan.find("M002", "SRF003").unwrap();
    assert_eq!(bag.action, ReplenishmentAction::OrderFromSupplier);
    assert_eq!(bag.order_qty, Decimal::from(100));
    assert_eq!(bag.lead_time_days, 7 + 2);

    // 候選清單
    let shipments = service.shipment_candidates().unwrap();
    let codes: Vec<&str> = shipments.iter().map(|c| c.material_code.as_str()).collect();
    assert_eq!(codes, vec!["SRF001", "SRF002"]);

    let orders = service.purchase_order_candidates().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].material_code, "SRF003");
    assert_eq!(orders[0].order_qty, Decimal::from(100));

    // 讀取時組合
    let rows = service
        .stock_report(&StockFactFilter::default().with_store("M002").with_year(2025))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.scrap_rate == Some(dec("0.03"))));
}

#[test]
fn test_full_flow_in_memory() {
    logging::init_test();
    check_full_flow(seeded(InMemoryRepository::new()));
}

#[test]
fn test_full_flow_sqlite() {
    logging::init_test();
    check_full_flow(seeded(SqliteRepository::open_in_memory().unwrap()));
}

#[test]
fn test_invalid_material_does_not_abort_bulk_run() {
    let mut service = seeded(InMemoryRepository::new());
    let mut broken = Material::new("SRF099", "Broken", MeasurementUnit::Piece, TriggerEvent::ReceiptCount, Decimal::ONE);
    broken.consumption_rate = None;
    service.repository_mut().upsert_materials(&[broken]).unwrap();

    let counts = TriggerCounts::by_trigger([(TriggerEvent::ReceiptCount, 100)]);
    let report = service.bulk_plan(&counts, None).unwrap();

    assert_eq!(report.material_count(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].subject, "SRF099");
}

#[test]
fn test_negative_count_is_surfaced() {
    let service = seeded(InMemoryRepository::new());

    let err = service.material_need("SRF001", -1, None, None).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Plan(PlanError::InvalidInput(cplan_core::InvalidInputReason::NegativeTriggerCount))
    ));

    let missing = service.material_need("SRF404", 1, None, None).unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));
}

#[test]
fn test_soft_deleted_material_leaves_plan() {
    let mut service = seeded(SqliteRepository::open_in_memory().unwrap());
    assert!(service.repository_mut().deactivate_material("SRF003").unwrap());

    let plan = service.replenishment_plan(Some(30)).unwrap();
    assert!(plan.decisions.iter().all(|d| d.material_code != "SRF003"));

    // 歷史事實仍保留
    assert_eq!(service.stock_report(&StockFactFilter::default()).unwrap().len(), 4);
}

#[test]
fn test_csv_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("materials.csv");
    {
        let mut file = std::fs::File::create(&input).unwrap();
        file.write_all("\u{feff}".as_bytes()).unwrap();
        file.write_all(MATERIALS_CSV.as_bytes()).unwrap();
        file.write_all(b"SRF004,Bad Row,piece,order_count,x,0,,,,0,0,0,0,0,0\n").unwrap();
    }

    let mut repo = InMemoryRepository::new();
    let importer = CsvImporter::new(PlannerConfig::default().with_scrap_rate_format(ScrapRateFormat::Percent));
    let summary = importer.import_file(ImportKind::Materials, &input, &mut repo).unwrap();
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.rejections[0].row, 5);
    assert_eq!(summary.rejections[0].key, "SRF004");

    let materials = repo.list_materials(true).unwrap();
    let counts = TriggerCounts::by_material([("SRF001", 10_000), ("SRF002", 0)]);
    let report = BulkConsumptionPlanner::plan(&materials, &counts, None).unwrap();
    // 依代碼指定時，0 次也輸出
    assert_eq!(report.material_count(), 2);

    let output = dir.path().join("order.csv");
    cplan_store::write_csv_file(&output, &report.order_lines(), true).unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(&written[..3], b"\xEF\xBB\xBF");
    let text = String::from_utf8(written[3..].to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), "material_code,material_name,pack_name,packs,unit,total_quantity");
    assert_eq!(lines.next().unwrap(), "SRF001,Thermal Paper Roll,Roll,92,meter,2750");
    assert_eq!(lines.next().unwrap(), "SRF002,Packing Tape,,,piece,0");
}

#[test]
fn test_config_from_json() {
    let config = PlannerConfig::from_json_str(
        r#"{"planning_horizon_days": 14, "scrap_rate_format": "percent", "warehouse_drawdown": "priority_order"}"#,
    )
    .unwrap();
    assert_eq!(config.planning_horizon_days, 14);
    assert_eq!(config.scrap_rate_format, ScrapRateFormat::Percent);
    assert_eq!(config.warehouse_drawdown, WarehouseDrawdown::PriorityOrder);
    assert_eq!(config.rejection_preview_limit, 10);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planner.json");
    std::fs::write(&path, r#"{"include_inactive": true}"#).unwrap();
    let loaded = cplan_store::load_config(&path).unwrap();
    assert!(loaded.include_inactive);
    assert_eq!(loaded.planning_horizon_days, 30);
}
