//! 日誌初始化
//!
//! 透過 `RUST_LOG` 調整層級，例如 `RUST_LOG=cplan_calc=debug`。

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日誌（預設 info）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 測試用日誌：debug 層級，重複呼叫不會失敗
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
