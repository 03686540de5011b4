use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4MB buffer

/// 計算檔案的 BLAKE3 校驗值（十六進位字串），讀取失敗時回傳錯誤
pub fn file_checksum(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("無法開啟檔案: {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    hasher
        .update_reader(BufReader::with_capacity(BUFFER_SIZE, file))
        .with_context(|| format!("讀取檔案失敗: {}", path.display()))?;
    Ok(hasher.finalize().to_hex().to_string())
}
