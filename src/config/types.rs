use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 來源資料夾的掃描模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// 深度優先走訪整棵目錄樹
    Recursive,
    /// 只掃描指定的資料夾本身
    Single,
    /// 相機記憶卡的 DCIM 結構
    Dcf,
}

/// 匯入來源設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub path: PathBuf,
    #[serde(default = "default_search_mode")]
    pub mode: SearchMode,
    /// 是否將同目錄、同主檔名的檔案視為同一組
    #[serde(default = "default_true")]
    pub groups: bool,
}

/// 檔名衝突時附加的流水號格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suffix {
    #[serde(default = "default_separator")]
    pub separator: String,
    /// 流水號補零後的位數
    #[serde(default = "default_digits")]
    pub digits: usize,
    /// 即使沒有衝突也一律附加流水號
    #[serde(default)]
    pub always_append: bool,
}

impl Default for Suffix {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            digits: default_digits(),
            always_append: false,
        }
    }
}

impl Suffix {
    /// 將流水號編號轉成檔名後綴
    ///
    /// 編號 0 輸出空字串，除非設定了 `alwaysAppend`
    #[must_use]
    pub fn render(&self, index: u32) -> String {
        if index == 0 && !self.always_append {
            return String::new();
        }
        format!("{}{:0width$}", self.separator, index, width = self.digits)
    }
}

/// 匯入目標設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// 目標根目錄，必須已經存在
    pub root: PathBuf,
    /// 目的資料夾的路徑樣板（相對於 root）
    #[serde(default)]
    pub path: String,
    /// 目的主檔名樣板（不含副檔名）
    pub file: String,
    #[serde(default)]
    pub suffix: Suffix,
    /// 這個目標想收的副檔名
    #[serde(default)]
    pub extensions: Vec<String>,
    /// 副檔名對應的子資料夾，例如 cr2 -> raw
    #[serde(default)]
    pub subfolders: BTreeMap<String, String>,
    /// 複製後是否以校驗值驗證內容
    #[serde(default = "default_true")]
    pub verify: bool,
}

/// 整體選項
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// 依優先順序嘗試讀取 EXIF 的副檔名（小寫）
    #[serde(default = "default_exif_extensions")]
    pub read_exif_from: Vec<String>,
    /// 月份、星期名稱使用的語系，例如 "de_DE"；未設定時使用 en_US
    #[serde(default)]
    pub locale: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            read_exif_from: default_exif_extensions(),
            locale: None,
        }
    }
}

/// 設定檔的完整結構
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: Source,
    #[serde(default)]
    pub options: Options,
    pub targets: BTreeMap<String, Target>,
}

fn default_search_mode() -> SearchMode {
    SearchMode::Recursive
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    "-".to_string()
}

fn default_digits() -> usize {
    1
}

fn default_exif_extensions() -> Vec<String> {
    ["jpg", "jpeg", "tif", "tiff"]
        .iter()
        .map(ToString::to_string)
        .collect()
}
