use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::Parser;
use dialoguer::Input;
use log::info;
use photo_import::component::Importer;
use photo_import::config::{collect_template_variables, load_config, validate_config};
use photo_import::init;
use std::collections::HashMap;
use std::path::PathBuf;

/// 群組自帶的衍生屬性，不需要使用者提供值
const GROUP_PROPERTIES: [&str; 14] = [
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "monthname",
    "dayname",
    "monthshortname",
    "dayshortname",
    "filename",
    "dcfpathnumber",
    "dcffilenumber",
    "dcfnumber",
];

#[derive(Parser)]
#[command(version, about = "依拍攝時間將照片匯入到組織化的目標資料夾")]
struct Args {
    /// 設定檔路徑
    #[arg(short, long, default_value = "default.config")]
    config: PathBuf,

    /// 要執行的目標名稱，可重複或以逗號分隔，省略時執行全部目標
    #[arg(short, long = "target", value_delimiter = ',')]
    targets: Vec<String>,

    /// 變數指定，格式 Name=Value，可重複
    #[arg(short = 'v', long = "variable")]
    variables: Vec<String>,

    /// 只匯入 DCF 編號大於等於這個值的檔案
    #[arg(long)]
    from: Option<u32>,

    /// 只匯入 DCF 編號小於等於這個值的檔案
    #[arg(long)]
    to: Option<u32>,

    /// 只匯入這個時間之後拍攝的影像（YYYY-MM-DD 或 "YYYY-MM-DD HH:MM:SS"）
    #[arg(long, value_parser = parse_datetime)]
    after: Option<NaiveDateTime>,

    /// 只匯入這個時間之前拍攝的影像
    #[arg(long, value_parser = parse_datetime)]
    before: Option<NaiveDateTime>,
}

fn main() -> Result<()> {
    init::init();
    let args = Args::parse();
    info!("photo_import v{}", env!("CARGO_PKG_VERSION"));

    info!("讀取設定檔: {}", args.config.display());
    let config = load_config(&args.config)?;

    let active_targets: Vec<String> = if args.targets.is_empty() {
        config.targets.keys().cloned().collect()
    } else {
        args.targets.clone()
    };
    validate_config(&config, &active_targets)?;

    let mut variables = parse_assignments(&args.variables)?;

    // 樣板有引用但還沒有值的變數，逐一詢問使用者
    let mut missing = collect_template_variables(&config, &active_targets);
    for property in GROUP_PROPERTIES {
        missing.remove(property);
    }
    for name in variables.keys() {
        missing.remove(name);
    }
    for name in missing {
        let value: String = Input::new().with_prompt(&name).interact_text()?;
        variables.insert(name, value.trim().to_string());
    }

    Importer::new(config, active_targets, variables)
        .with_number_filter(args.from, args.to)
        .with_date_filter(args.after, args.before)
        .run()
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime, String> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| format!("無法解析時間: {value}（格式 YYYY-MM-DD 或 YYYY-MM-DD HH:MM:SS）"))
}

/// 解析 Name=Value 形式的變數指定，名稱轉成小寫保存
fn parse_assignments(assignments: &[String]) -> Result<HashMap<String, String>> {
    let mut variables = HashMap::new();
    for assignment in assignments {
        let Some((name, value)) = assignment.split_once('=') else {
            bail!("變數指定必須是 Name=Value 格式: {assignment}");
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("變數名稱不合法: {assignment}");
        }
        variables.insert(name.to_lowercase(), value.to_string());
    }
    Ok(variables)
}
