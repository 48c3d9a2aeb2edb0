//! 持久層錯誤類型

use cplan_core::PlanError;
use thiserror::Error;

/// 持久層錯誤
///
/// 單筆資料問題不會變成錯誤，而是記在 [`crate::UpsertSummary`] 的拒絕清單中。
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("資料庫錯誤: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("資料庫鎖取得失敗: {0}")]
    LockError(String),

    #[error("CSV 錯誤: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 錯誤: {0}")]
    Json(#[from] serde_json::Error),

    #[error("記錄未找到: {entity} {key}")]
    NotFound { entity: String, key: String },

    #[error("欄位資料錯誤 (field={field}): {message}")]
    InvalidData { field: String, message: String },

    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn invalid_data(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
