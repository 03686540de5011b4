//! 照片匯入元件
//!
//! 掃描來源、依拍攝時間排序，再把群組依序複製到每個作用中的目標

use super::copy_executor::{CopyExecutor, CopyResult};
use super::image_group::{ImageGroup, ImportSettings};
use super::source_scanner::SourceScanner;
use crate::config::{Config, collect_extensions};
use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use console::style;
use log::info;
use std::collections::HashMap;

/// 照片匯入元件
pub struct Importer {
    config: Config,
    active_targets: Vec<String>,
    variables: HashMap<String, String>,
    number_filter: (Option<u32>, Option<u32>),
    date_filter: (Option<NaiveDateTime>, Option<NaiveDateTime>),
}

impl Importer {
    #[must_use]
    pub fn new(
        config: Config,
        active_targets: Vec<String>,
        variables: HashMap<String, String>,
    ) -> Self {
        Self {
            config,
            active_targets,
            variables,
            number_filter: (None, None),
            date_filter: (None, None),
        }
    }

    /// 設定 DCF 編號範圍過濾
    #[must_use]
    pub fn with_number_filter(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.number_filter = (min, max);
        self
    }

    /// 設定拍攝時間範圍過濾
    #[must_use]
    pub fn with_date_filter(
        mut self,
        begin: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Self {
        self.date_filter = (begin, end);
        self
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style("=== 照片匯入 ===").cyan().bold());

        let extensions = collect_extensions(&self.config, &self.active_targets);
        info!("允許的副檔名: {extensions:?}");

        let settings = ImportSettings::from_options(&self.config.options);
        let scanner = SourceScanner::new(self.config.source.clone(), settings)
            .with_extension_filter(Some(extensions))
            .with_number_filter(self.number_filter.0, self.number_filter.1)
            .with_date_filter(self.date_filter.0, self.date_filter.1);

        println!("{}", style("掃描來源資料夾中...").dim());
        let mut groups = scanner.find_groups();

        if groups.is_empty() {
            println!("{}", style("找不到任何可匯入的影像").yellow());
            return Ok(());
        }

        // 穩定排序：時間相同的群組維持發現順序，
        // 流水號因此永遠照時間先後分配
        groups.sort_by_key(ImageGroup::capture_time);
        println!(
            "{}",
            style(format!("找到 {} 個影像群組", groups.len())).green()
        );

        for name in &self.active_targets {
            let Some(target) = self.config.targets.get(name) else {
                bail!("目標 {name} 不存在於設定檔中");
            };

            println!();
            println!("{}", style(format!("=== 目標 {name} ===")).cyan().bold());
            let executor = CopyExecutor::new(target, &self.variables);
            let result = executor.copy_groups(&groups);
            Self::print_result(name, &result);
        }

        Ok(())
    }

    fn print_result(name: &str, result: &CopyResult) {
        println!("  成功複製: {} 個檔案", style(result.files_copied).green());

        if result.files_skipped > 0 {
            println!("  已跳過: {} 個檔案", style(result.files_skipped).yellow());
        }

        if result.groups_skipped > 0 {
            println!("  跳過群組: {} 個", style(result.groups_skipped).yellow());
        }

        if result.errors > 0 {
            println!("  失敗: {} 個檔案", style(result.errors).red());
        }

        if result.checksum_mismatches > 0 {
            println!(
                "  校驗值不符: {} 個檔案",
                style(result.checksum_mismatches).red()
            );
        }

        info!(
            "目標 {name} 處理完成 - 複製: {}, 跳過: {}, 失敗: {}",
            result.files_copied, result.files_skipped, result.errors
        );
    }
}
