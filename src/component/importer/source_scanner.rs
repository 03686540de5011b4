//! 來源掃描
//!
//! 依掃描模式走訪來源資料夾，套用副檔名、DCF 編號與拍攝時間過濾，
//! 並將每個資料夾內同主檔名的檔案分成一組

use super::image_group::{DcfNumbers, ImageGroup, ImportSettings};
use crate::config::{SearchMode, Source};
use crate::tools::{base_name, file_extension};
use chrono::NaiveDateTime;
use log::warn;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// DCIM 子目錄：3 位數字編號加 5 個字元的名稱
static DCF_DIRECTORY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}[0-9A-Z_]{5}$").expect("Invalid regex"));

/// DCF 檔名：4 個字元的前綴加 4 位數字編號與副檔名
static DCF_FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Z_]{4}[0-9]{4}\.[0-9A-Z_]+$").expect("Invalid regex"));

/// 來源掃描器
pub struct SourceScanner {
    source: Source,
    settings: ImportSettings,
    extensions: Option<HashSet<String>>,
    number_min: Option<u32>,
    number_max: Option<u32>,
    date_begin: Option<NaiveDateTime>,
    date_end: Option<NaiveDateTime>,
}

impl SourceScanner {
    #[must_use]
    pub fn new(source: Source, settings: ImportSettings) -> Self {
        Self {
            source,
            settings,
            extensions: None,
            number_min: None,
            number_max: None,
            date_begin: None,
            date_end: None,
        }
    }

    /// 設定允許的副檔名（小寫）
    ///
    /// `None` 表示不過濾；給了空集合則所有檔案都不會通過
    #[must_use]
    pub fn with_extension_filter(mut self, extensions: Option<HashSet<String>>) -> Self {
        self.extensions = extensions;
        self
    }

    /// 設定 DCF 編號範圍，只在 DCF 模式下生效
    ///
    /// 目錄編號不可能落在範圍內的 DCIM 子目錄會整個跳過，
    /// 不需要讀取其中任何檔案
    #[must_use]
    pub fn with_number_filter(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.number_min = min;
        self.number_max = max;
        self
    }

    /// 設定拍攝時間範圍（含兩端）
    ///
    /// 拍攝時間要先讀過中繼資料才知道，所以這個過濾只能在
    /// 群組建立之後進行，不像 DCF 編號過濾能在讀檔前剪枝
    #[must_use]
    pub fn with_date_filter(
        mut self,
        begin: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Self {
        self.date_begin = begin;
        self.date_end = end;
        self
    }

    /// 依掃描模式搜尋來源資料夾，回傳以主檔名分組的影像群組
    ///
    /// 回傳順序即發現順序；找不到任何群組時只記錄警告
    #[must_use]
    pub fn find_groups(&self) -> Vec<ImageGroup> {
        let mut groups = Vec::new();

        match self.source.mode {
            SearchMode::Dcf => self.scan_dcim(&mut groups),
            SearchMode::Single => self.scan_directory(&self.source.path, false, &mut groups),
            SearchMode::Recursive => {
                let walker = WalkDir::new(&self.source.path)
                    .follow_links(false)
                    .sort_by_file_name();
                for entry in walker {
                    match entry {
                        Ok(entry) if entry.file_type().is_dir() => {
                            self.scan_directory(entry.path(), false, &mut groups);
                        }
                        Ok(_) => {}
                        Err(e) => warn!("走訪目錄失敗: {e}"),
                    }
                }
            }
        }

        if groups.is_empty() {
            warn!("來源資料夾中找不到任何影像");
        }
        groups
    }

    fn scan_dcim(&self, groups: &mut Vec<ImageGroup>) {
        let dcim = self.source.path.join("DCIM");
        if !dcim.is_dir() {
            warn!("DCIM 目錄不存在: {}", dcim.display());
            return;
        }

        for directory in sorted_entries(&dcim) {
            if !directory.is_dir() {
                continue;
            }
            let Some(name) = directory.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if self.accept_dcf_directory(name) {
                self.scan_directory(&directory, true, groups);
            }
        }
    }

    /// 掃描單一資料夾，把通過過濾的檔案依主檔名分成群組
    fn scan_directory(&self, directory: &Path, dcf: bool, groups: &mut Vec<ImageGroup>) {
        // 讀不到的資料夾視為空的，只記錄警告
        let mut partitions: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in sorted_entries(directory) {
            if !path.is_file() || !self.accept_file(&path, dcf) {
                continue;
            }
            // 關閉分組時以完整檔名當鍵，讓每個檔案自成一組
            let key = if self.source.groups {
                base_name(&path)
            } else {
                path.file_name()
                    .map_or_else(String::new, |name| name.to_string_lossy().to_string())
            };
            partitions.entry(key).or_default().push(path);
        }

        for partition in partitions.into_values() {
            let dcf_numbers = if dcf {
                parse_dcf_numbers(&partition[0])
            } else {
                None
            };
            let group = ImageGroup::from_files(partition, dcf_numbers, &self.settings);
            if self.accept_capture_time(group.capture_time()) {
                groups.push(group);
            }
        }
    }

    fn accept_dcf_directory(&self, name: &str) -> bool {
        if !DCF_DIRECTORY_PATTERN.is_match(name) {
            return false;
        }
        let Ok(path_number) = name[..3].parse::<u32>() else {
            return false;
        };
        if self.number_min.is_some_and(|min| path_number < min / 10000) {
            return false;
        }
        if self.number_max.is_some_and(|max| path_number > max / 10000) {
            return false;
        }
        true
    }

    fn accept_file(&self, path: &Path, dcf: bool) -> bool {
        if dcf {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                return false;
            };
            if !DCF_FILE_PATTERN.is_match(name) {
                return false;
            }
            if self.number_min.is_some() || self.number_max.is_some() {
                let Some(numbers) = parse_dcf_numbers(path) else {
                    return false;
                };
                let number = numbers.number();
                if self.number_min.is_some_and(|min| number < min) {
                    return false;
                }
                if self.number_max.is_some_and(|max| number > max) {
                    return false;
                }
            }
        }

        if let Some(extensions) = &self.extensions {
            if !extensions.contains(&file_extension(path).to_lowercase()) {
                return false;
            }
        }
        true
    }

    fn accept_capture_time(&self, datetime: NaiveDateTime) -> bool {
        if self.date_begin.is_some_and(|begin| datetime < begin) {
            return false;
        }
        if self.date_end.is_some_and(|end| datetime > end) {
            return false;
        }
        true
    }
}

/// 列出資料夾內容並依名稱排序，確保發現順序固定
fn sorted_entries(directory: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("無法讀取目錄 {}: {e}", directory.display());
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("讀取目錄項目失敗: {e}");
                None
            }
        })
        .collect();
    paths.sort();
    paths
}

/// 從 DCIM 子目錄名稱前 3 碼與檔名第 5 到 8 碼取出 DCF 編號
fn parse_dcf_numbers(path: &Path) -> Option<DcfNumbers> {
    let file_name = path.file_name()?.to_str()?;
    let directory_name = path.parent()?.file_name()?.to_str()?;
    let path_number = directory_name.get(..3)?.parse().ok()?;
    let file_number = file_name.get(4..8)?.parse().ok()?;
    Some(DcfNumbers {
        path_number,
        file_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Locale, TimeZone};
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn test_settings() -> ImportSettings {
        ImportSettings {
            exif_extensions: Vec::new(),
            locale: Locale::en_US,
        }
    }

    fn source(path: &Path, mode: SearchMode) -> Source {
        Source {
            path: path.to_path_buf(),
            mode,
            groups: true,
        }
    }

    fn extension_set(extensions: &[&str]) -> Option<HashSet<String>> {
        Some(extensions.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_grouping_by_base_name() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("IMG_0001.jpg"), "jpeg").unwrap();
        fs::write(temp_dir.path().join("IMG_0001.cr2"), "raw").unwrap();
        fs::write(temp_dir.path().join("IMG_0002.jpg"), "jpeg").unwrap();

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Single), test_settings());
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 2);
        let pair = groups
            .iter()
            .find(|g| g.property("filename") == Some("IMG_0001"))
            .unwrap();
        assert_eq!(pair.files().len(), 2);
    }

    #[test]
    fn test_single_mode_does_not_descend() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("top.jpg"), "jpeg").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/below.jpg"), "jpeg").unwrap();

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Single), test_settings());
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].property("filename"), Some("top"));
    }

    #[test]
    fn test_recursive_mode_groups_each_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("top.jpg"), "jpeg").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/below.jpg"), "jpeg").unwrap();
        // 不同資料夾的同名檔案不屬於同一組
        fs::write(temp_dir.path().join("nested/top.jpg"), "jpeg").unwrap();

        let scanner =
            SourceScanner::new(source(temp_dir.path(), SearchMode::Recursive), test_settings());
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 3);
        for group in &groups {
            assert_eq!(group.files().len(), 1);
        }
    }

    #[test]
    fn test_groups_disabled() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("IMG_0001.jpg"), "jpeg").unwrap();
        fs::write(temp_dir.path().join("IMG_0001.cr2"), "raw").unwrap();

        let mut descriptor = source(temp_dir.path(), SearchMode::Single);
        descriptor.groups = false;
        let scanner = SourceScanner::new(descriptor, test_settings());
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_extension_filter() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("photo.jpg"), "jpeg").unwrap();
        fs::write(temp_dir.path().join("photo.cr2"), "raw").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "text").unwrap();

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Single), test_settings())
            .with_extension_filter(extension_set(&["jpg", "cr2"]));
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files().len(), 2);
    }

    #[test]
    fn test_extension_filter_matches_case_insensitively() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("PHOTO.JPG"), "jpeg").unwrap();

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Single), test_settings())
            .with_extension_filter(extension_set(&["jpg"]));

        assert_eq!(scanner.find_groups().len(), 1);
    }

    #[test]
    fn test_empty_extension_set_rejects_everything() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("photo.jpg"), "jpeg").unwrap();

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Single), test_settings())
            .with_extension_filter(extension_set(&[]));

        assert!(scanner.find_groups().is_empty());
    }

    fn make_dcf_tree(root: &Path) {
        let folder = root.join("DCIM/123ABCDE");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("IMG_0100.JPG"), "jpeg").unwrap();
        fs::write(folder.join("IMG_0100.CR2"), "raw").unwrap();
        fs::write(folder.join("IMG_0099.JPG"), "jpeg").unwrap();
        // 不符合 DCF 檔名規則的檔案
        fs::write(folder.join("notes.txt"), "text").unwrap();
        // 不符合 DCF 目錄規則的資料夾
        let stray = root.join("DCIM/extras");
        fs::create_dir_all(&stray).unwrap();
        fs::write(stray.join("IMG_0500.JPG"), "jpeg").unwrap();
    }

    #[test]
    fn test_dcf_mode() {
        let temp_dir = TempDir::new().unwrap();
        make_dcf_tree(temp_dir.path());

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Dcf), test_settings());
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 2);
        let pair = groups
            .iter()
            .find(|g| g.property("filename") == Some("IMG_0100"))
            .unwrap();
        assert_eq!(pair.files().len(), 2);
        assert_eq!(pair.property("dcfpathnumber"), Some("123"));
        assert_eq!(pair.property("dcffilenumber"), Some("100"));
        assert_eq!(pair.property("dcfnumber"), Some("1230100"));
    }

    #[test]
    fn test_dcf_missing_dcim_directory() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Dcf), test_settings());
        assert!(scanner.find_groups().is_empty());
    }

    #[test]
    fn test_dcf_number_filter() {
        let temp_dir = TempDir::new().unwrap();
        make_dcf_tree(temp_dir.path());
        // 目錄編號 122 低於下限，整個目錄會被剪掉
        let pruned = temp_dir.path().join("DCIM/122AAAAA");
        fs::create_dir_all(&pruned).unwrap();
        fs::write(pruned.join("IMG_9999.JPG"), "jpeg").unwrap();

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Dcf), test_settings())
            .with_number_filter(Some(1_230_100), None);
        let groups = scanner.find_groups();

        // IMG_0099（1230099）被濾掉，IMG_0100（1230100）保留
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].property("dcfnumber"), Some("1230100"));
    }

    #[test]
    fn test_dcf_number_filter_upper_bound() {
        let temp_dir = TempDir::new().unwrap();
        make_dcf_tree(temp_dir.path());

        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Dcf), test_settings())
            .with_number_filter(None, Some(1_230_099));
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].property("dcfnumber"), Some("1230099"));
    }

    #[test]
    fn test_date_filter() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("old.jpg");
        let new = temp_dir.path().join("new.jpg");
        fs::write(&old, "jpeg").unwrap();
        fs::write(&new, "jpeg").unwrap();

        let old_time = Local.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let new_time = Local.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
        for (path, datetime) in [(&old, old_time), (&new, new_time)] {
            File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(SystemTime::from(datetime))
                .unwrap();
        }

        let begin = Local
            .with_ymd_and_hms(2021, 1, 1, 0, 0, 0)
            .unwrap()
            .naive_local();
        let scanner = SourceScanner::new(source(temp_dir.path(), SearchMode::Single), test_settings())
            .with_date_filter(Some(begin), None);
        let groups = scanner.find_groups();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].property("filename"), Some("new"));
    }

    #[test]
    fn test_missing_source_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let scanner = SourceScanner::new(source(&missing, SearchMode::Single), test_settings());
        assert!(scanner.find_groups().is_empty());
    }
}
