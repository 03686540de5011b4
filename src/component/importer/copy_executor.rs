//! 複製執行
//!
//! 對每個群組展開目的路徑、搜尋可用的流水號、依副檔名分配子資料夾，
//! 最後逐檔複製並視設定以校驗值驗證

use super::image_group::ImageGroup;
use super::path_template::PathFormatter;
use crate::config::Target;
use crate::tools::{ensure_directory_exists, file_checksum, file_extension};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 單一目標的複製統計
#[derive(Debug, Default)]
pub struct CopyResult {
    /// 處理完成的群組數
    pub groups_processed: usize,
    /// 因錯誤整組跳過的群組數
    pub groups_skipped: usize,
    /// 成功複製的檔案數
    pub files_copied: usize,
    /// 因目的檔已存在而跳過的檔案數
    pub files_skipped: usize,
    /// 複製或建立資料夾失敗的檔案數
    pub errors: usize,
    /// 驗證時校驗值不符的檔案數
    pub checksum_mismatches: usize,
}

/// 將群組複製到單一目標的執行器
pub struct CopyExecutor<'a> {
    target: &'a Target,
    formatter: PathFormatter,
}

impl<'a> CopyExecutor<'a> {
    #[must_use]
    pub fn new(target: &'a Target, variables: &HashMap<String, String>) -> Self {
        Self {
            target,
            formatter: PathFormatter::new(variables),
        }
    }

    /// 依序將每個群組複製到目標位置
    ///
    /// 呼叫端應該先把群組依拍攝時間排好，流水號的分配才會
    /// 跨次執行保持穩定。任何單一檔案或群組的失敗都不會中斷
    /// 其餘的處理
    pub fn copy_groups(&self, groups: &[ImageGroup]) -> CopyResult {
        let mut result = CopyResult::default();

        let progress_bar = ProgressBar::new(groups.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_message("複製中...");

        for group in groups {
            match self.copy_group(group, &mut result) {
                Ok(()) => result.groups_processed += 1,
                Err(e) => {
                    error!(
                        "群組 {} 處理失敗: {e:#}",
                        group.property("filename").unwrap_or("?")
                    );
                    result.groups_skipped += 1;
                }
            }
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("完成");
        result
    }

    fn copy_group(&self, group: &ImageGroup, result: &mut CopyResult) -> Result<()> {
        let directory = self
            .target
            .root
            .join(self.formatter.format(&self.target.path, group)?);
        let base_name = self.formatter.format(&self.target.file, group)?;

        if !directory.exists() {
            info!("建立資料夾 {}", directory.display());
        }
        ensure_directory_exists(&directory)
            .with_context(|| format!("無法建立資料夾: {}", directory.display()))?;

        // 整組共用同一個流水號，RAW+JPEG 這類連拍對才能維持同名
        let mut index = u32::from(self.target.suffix.always_append);
        let destinations = loop {
            let suffix = self.target.suffix.render(index);
            let candidates: Vec<PathBuf> = group
                .files()
                .iter()
                .map(|file| self.destination_path(&directory, &base_name, &suffix, file))
                .collect();
            if candidates.iter().all(|path| !path.exists()) {
                break candidates;
            }
            index += 1;
        };

        for (source, destination) in group.files().iter().zip(&destinations) {
            // 子資料夾在第一次用到時才建立
            if let Some(parent) = destination.parent() {
                if let Err(e) = ensure_directory_exists(parent) {
                    warn!("無法建立資料夾 {}: {e}", parent.display());
                    result.errors += 1;
                    continue;
                }
            }

            // 流水號搜尋跟複製之間不是原子操作，被其他寫入者
            // 搶先佔走時跳過這個檔案
            if destination.exists() {
                error!("{} 已經存在，不應該發生，跳過複製", destination.display());
                result.files_skipped += 1;
                continue;
            }

            info!(
                "複製檔案 {} -> {}",
                source.display(),
                destination.display()
            );
            match fs::copy(source, destination) {
                Ok(_) => {
                    result.files_copied += 1;
                    if self.target.verify {
                        self.verify_copy(source, destination, result);
                    }
                }
                Err(e) => {
                    warn!("複製失敗 {}: {e}", source.display());
                    result.errors += 1;
                }
            }
        }

        Ok(())
    }

    /// 計算單一檔案的實際目的路徑
    ///
    /// 副檔名有對應的子資料夾時放進子資料夾，否則放在群組的
    /// 目的資料夾
    fn destination_path(
        &self,
        directory: &Path,
        base_name: &str,
        suffix: &str,
        source: &Path,
    ) -> PathBuf {
        let extension = file_extension(source);
        let directory = match self.target.subfolders.get(&extension.to_lowercase()) {
            Some(subfolder) => directory.join(subfolder),
            None => directory.to_path_buf(),
        };
        let file_name = if extension.is_empty() {
            format!("{base_name}{suffix}")
        } else {
            format!("{base_name}{suffix}.{extension}")
        };
        directory.join(file_name)
    }

    /// 比對來源與目的檔的校驗值，只記錄警告、不會中斷
    fn verify_copy(&self, source: &Path, destination: &Path, result: &mut CopyResult) {
        match (file_checksum(source), file_checksum(destination)) {
            (Ok(expected), Ok(actual)) => {
                if expected != actual {
                    warn!(
                        "校驗值不符: {} 與 {}",
                        source.display(),
                        destination.display()
                    );
                    result.checksum_mismatches += 1;
                }
            }
            (Err(e), _) | (_, Err(e)) => warn!("無法計算校驗值: {e:#}"),
        }
    }
}
