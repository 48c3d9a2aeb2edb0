//! # Consumables Planning Store
//!
//! 計劃資料的持久層：記憶體與 SQLite 實作、CSV 匯入與報表匯出

pub mod csv_import;
pub mod error;
pub mod export;
pub mod memory;
pub mod repository;
pub mod sqlite;

// Re-export 主要類型
pub use csv_import::{CsvImporter, ImportBatch, ImportKind};
pub use error::{StoreError, StoreResult};
pub use export::{to_csv_string, write_csv, write_csv_file, ReportRow};
pub use memory::InMemoryRepository;
pub use repository::{PlanningRepository, RowRejection, StockFactFilter, StockFactRow, UpsertSummary};
pub use sqlite::SqliteRepository;

use cplan_core::PlannerConfig;
use std::path::Path;

/// 從 JSON 檔案讀取計劃設定
pub fn load_config(path: impl AsRef<Path>) -> StoreResult<PlannerConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
