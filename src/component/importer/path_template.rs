//! 路徑樣板展開
//!
//! 將 `{Name}` 形式的變數換成實際值。命令列或互動輸入的變數
//! 在整次執行中固定，群組屬性則隨每個群組改變，因此變數表
//! 在建構時給定，樣板與群組在 `format` 時給定

use super::image_group::ImageGroup;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("Invalid regex"));

/// 樣板展開失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// 變數既不在指定的變數表中，也不是群組的衍生屬性
    #[error("樣板變數 {{{0}}} 沒有對應的值")]
    UnresolvedToken(String),
}

/// 以固定的變數表展開路徑與檔名樣板
pub struct PathFormatter {
    variables: HashMap<String, String>,
}

impl PathFormatter {
    /// 建立樣板展開器，變數名稱一律轉成小寫保存
    #[must_use]
    pub fn new(variables: &HashMap<String, String>) -> Self {
        Self {
            variables: variables
                .iter()
                .map(|(name, value)| (name.to_lowercase(), value.clone()))
                .collect(),
        }
    }

    /// 由左至右單趟展開樣板中的所有變數
    ///
    /// 變數表優先於群組屬性，讓使用者提供的值可以覆蓋同名的
    /// 衍生屬性；查不到值的變數回報 [`TemplateError::UnresolvedToken`]
    pub fn format(&self, template: &str, group: &ImageGroup) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(template.len());
        let mut last_end = 0;

        for caps in TOKEN_PATTERN.captures_iter(template) {
            let token = caps.get(0).expect("capture 0 always exists");
            let name = caps[1].to_lowercase();

            let value = self
                .variables
                .get(&name)
                .map(String::as_str)
                .or_else(|| group.property(&name))
                .ok_or_else(|| TemplateError::UnresolvedToken(name.clone()))?;

            output.push_str(&template[last_end..token.start()]);
            output.push_str(value);
            last_end = token.end();
        }
        output.push_str(&template[last_end..]);

        Ok(output)
    }
}
