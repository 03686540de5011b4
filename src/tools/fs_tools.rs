use anyhow::{Result, bail};
use std::path::Path;

/// 取得檔案的主檔名（檔名去除最後一個副檔名）
#[must_use]
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(String::new, |stem| stem.to_string_lossy().to_string())
}

/// 取得檔案的副檔名（不含點號），沒有副檔名時回傳空字串
#[must_use]
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .map_or_else(String::new, |ext| ext.to_string_lossy().to_string())
}

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("路徑不存在: {}", path.display());
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
