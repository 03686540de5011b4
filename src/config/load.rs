use crate::config::types::{Config, Target};
use anyhow::{Context, Result, bail};
use log::warn;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// 樣板裡的變數寫法：`{Name}`
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("Invalid regex"));

static EXTENSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("Invalid regex"));

/// 讀取並解析 JSON 設定檔
pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("無法讀取設定檔: {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("無法解析設定檔: {}", path.display()))
}

/// 檢查設定檔與作用中的目標是否可以執行
///
/// 所有問題都會個別記錄成警告，再以單一錯誤收尾
pub fn validate_config(config: &Config, active_targets: &[String]) -> Result<()> {
    let mut valid = true;

    if !config.source.path.is_dir() {
        warn!(
            "來源路徑不存在或不是資料夾: {}",
            config.source.path.display()
        );
        valid = false;
    }

    for name in active_targets {
        match config.targets.get(name) {
            None => {
                warn!("目標 {name} 不存在於設定檔中");
                valid = false;
            }
            Some(target) => {
                if !validate_target(name, target) {
                    valid = false;
                }
            }
        }
    }

    if !valid {
        bail!("設定檔驗證失敗");
    }
    Ok(())
}

fn validate_target(name: &str, target: &Target) -> bool {
    let mut valid = true;

    if target.root.as_os_str().is_empty() {
        warn!("目標 {name} 沒有指定根目錄");
        valid = false;
    } else if !target.root.is_dir() {
        warn!(
            "目標 {name} 的根目錄不存在或不是資料夾: {}",
            target.root.display()
        );
        valid = false;
    }

    if target.file.is_empty() {
        warn!("目標 {name} 沒有指定檔名樣板");
        valid = false;
    }

    if target.extensions.is_empty() {
        warn!("目標 {name} 沒有指定任何副檔名");
        valid = false;
    } else {
        for ext in &target.extensions {
            if !EXTENSION_PATTERN.is_match(ext) {
                warn!("目標 {name} 的副檔名 {ext} 不合法");
                valid = false;
            }
        }
    }

    valid
}

/// 彙整作用中目標允許的副檔名（轉成小寫）
#[must_use]
pub fn collect_extensions(config: &Config, active_targets: &[String]) -> HashSet<String> {
    active_targets
        .iter()
        .filter_map(|name| config.targets.get(name))
        .flat_map(|target| target.extensions.iter())
        .map(|ext| ext.to_lowercase())
        .collect()
}

/// 找出作用中目標的樣板引用的所有變數名稱（轉成小寫）
#[must_use]
pub fn collect_template_variables(
    config: &Config,
    active_targets: &[String],
) -> BTreeSet<String> {
    let mut variables = BTreeSet::new();
    for target in active_targets
        .iter()
        .filter_map(|name| config.targets.get(name))
    {
        for template in [&target.path, &target.file] {
            for caps in TOKEN_PATTERN.captures_iter(template) {
                variables.insert(caps[1].to_lowercase());
            }
        }
    }
    variables
}
