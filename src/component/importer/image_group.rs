//! 影像群組
//!
//! 同資料夾、同主檔名的檔案屬於同一組（例如 RAW + JPEG 連拍對），
//! 整組共用一個拍攝時間與衍生屬性

use crate::config::Options;
use crate::tools::{base_name, file_extension, read_capture_time};
use chrono::{DateTime, Local, Locale, NaiveDateTime};
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 掃描與分組共用的擷取設定
///
/// 由設定檔明確建立後傳入，不依賴任何全域狀態
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// 依優先順序嘗試讀取 EXIF 的副檔名（小寫）
    pub exif_extensions: Vec<String>,
    /// 月份、星期名稱使用的語系
    pub locale: Locale,
}

impl ImportSettings {
    /// 從設定檔選項建立擷取設定
    #[must_use]
    pub fn from_options(options: &Options) -> Self {
        Self {
            exif_extensions: options
                .read_exif_from
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            locale: resolve_locale(options.locale.as_deref()),
        }
    }
}

fn resolve_locale(name: Option<&str>) -> Locale {
    let Some(name) = name else {
        return Locale::en_US;
    };
    if let Ok(locale) = Locale::try_from(name) {
        return locale;
    }
    // 只給語言代碼時，嘗試補上同名的地區代碼（例如 de -> de_DE）
    if !name.contains('_') {
        let guess = format!("{}_{}", name, name.to_uppercase());
        if let Ok(locale) = Locale::try_from(guess.as_str()) {
            return locale;
        }
    }
    warn!("無法辨識語系 {name}，改用 en_US");
    Locale::en_US
}

/// DCF 編號（目錄編號與檔案編號）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcfNumbers {
    pub path_number: u32,
    pub file_number: u32,
}

impl DcfNumbers {
    /// 完整的 DCF 編號：目錄編號 × 10000 + 檔案編號
    #[must_use]
    pub const fn number(self) -> u32 {
        self.path_number * 10000 + self.file_number
    }
}

/// 一組同主檔名的來源檔案與其衍生屬性
#[derive(Debug, Clone)]
pub struct ImageGroup {
    files: Vec<PathBuf>,
    capture_time: NaiveDateTime,
    properties: HashMap<String, String>,
}

impl ImageGroup {
    /// 建立群組並解析拍攝時間
    ///
    /// 呼叫端必須保證所有檔案位於同一個資料夾且主檔名相同
    #[must_use]
    pub fn from_files(
        files: Vec<PathBuf>,
        dcf: Option<DcfNumbers>,
        settings: &ImportSettings,
    ) -> Self {
        debug_assert!(!files.is_empty(), "群組至少要有一個檔案");

        let capture_time = resolve_capture_time(&files, settings);

        let mut properties = HashMap::new();
        put_datetime_properties(&mut properties, capture_time, settings.locale);
        properties.insert("filename".to_string(), base_name(&files[0]));
        if let Some(numbers) = dcf {
            properties.insert("dcfpathnumber".to_string(), numbers.path_number.to_string());
            properties.insert("dcffilenumber".to_string(), numbers.file_number.to_string());
            properties.insert("dcfnumber".to_string(), numbers.number().to_string());
        }

        Self {
            files,
            capture_time,
            properties,
        }
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    #[must_use]
    pub const fn capture_time(&self) -> NaiveDateTime {
        self.capture_time
    }

    /// 查詢衍生屬性，名稱不分大小寫
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(&name.to_lowercase())
            .map(String::as_str)
    }
}

/// 依副檔名優先順序掃描群組內的檔案，第一個成功讀到的時間即為拍攝時間
///
/// 全部失敗時退回檔案系統的修改時間
fn resolve_capture_time(files: &[PathBuf], settings: &ImportSettings) -> NaiveDateTime {
    let mut first_candidate: Option<&PathBuf> = None;
    for ext in &settings.exif_extensions {
        for file in files {
            if file_extension(file).to_lowercase() != *ext {
                continue;
            }
            if first_candidate.is_none() {
                first_candidate = Some(file);
            }
            match read_capture_time(file) {
                Ok(Some(datetime)) => return datetime,
                Ok(None) => {}
                Err(e) => warn!("讀取中繼資料失敗 {}: {e:#}", file.display()),
            }
        }
    }

    let fallback = first_candidate.unwrap_or(&files[0]);
    warn!(
        "無法從 EXIF 讀取拍攝時間，改用檔案修改時間: {}",
        fallback.display()
    );
    modified_time(fallback)
}

fn modified_time(path: &Path) -> NaiveDateTime {
    match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => DateTime::<Local>::from(modified).naive_local(),
        Err(e) => {
            warn!("無法讀取檔案修改時間 {}: {e}", path.display());
            NaiveDateTime::UNIX_EPOCH
        }
    }
}

fn put_datetime_properties(
    properties: &mut HashMap<String, String>,
    datetime: NaiveDateTime,
    locale: Locale,
) {
    properties.insert("year".to_string(), datetime.format("%Y").to_string());
    properties.insert("month".to_string(), datetime.format("%m").to_string());
    properties.insert("day".to_string(), datetime.format("%d").to_string());
    properties.insert("hour".to_string(), datetime.format("%H").to_string());
    properties.insert("minute".to_string(), datetime.format("%M").to_string());
    properties.insert("second".to_string(), datetime.format("%S").to_string());
    properties.insert(
        "monthname".to_string(),
        datetime.date().format_localized("%B", locale).to_string(),
    );
    properties.insert(
        "dayname".to_string(),
        datetime.date().format_localized("%A", locale).to_string(),
    );
    properties.insert(
        "monthshortname".to_string(),
        datetime.date().format_localized("%b", locale).to_string(),
    );
    properties.insert(
        "dayshortname".to_string(),
        datetime.date().format_localized("%a", locale).to_string(),
    );
}
