use chrono::Local;
use env_logger::{Builder, Env};
use std::io::Write;

/// 初始化日誌系統
///
/// 預設等級為 info，可透過 RUST_LOG 環境變數調整
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}
