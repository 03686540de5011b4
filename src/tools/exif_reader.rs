//! EXIF 拍攝時間讀取
//!
//! 依序嘗試拍攝時間、數位化時間與一般修改時間欄位

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const DATETIME_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// 從檔案的 EXIF 中繼資料讀取拍攝時間
///
/// 檔案沒有 EXIF 區段或沒有可用的時間欄位時回傳 `None`
pub fn read_capture_time(path: &Path) -> Result<Option<NaiveDateTime>> {
    let file = File::open(path).with_context(|| format!("無法開啟檔案: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("解析 EXIF 失敗: {}", path.display()));
        }
    };

    for tag in DATETIME_TAGS {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            if let Some(datetime) = field_to_datetime(field) {
                return Ok(Some(datetime));
            }
        }
    }
    Ok(None)
}

fn field_to_datetime(field: &exif::Field) -> Option<NaiveDateTime> {
    let Value::Ascii(values) = &field.value else {
        return None;
    };
    let datetime = exif::DateTime::from_ascii(values.first()?).ok()?;
    NaiveDate::from_ymd_opt(
        datetime.year.into(),
        datetime.month.into(),
        datetime.day.into(),
    )
    .and_then(|date| {
        date.and_hms_opt(
            datetime.hour.into(),
            datetime.minute.into(),
            datetime.second.into(),
        )
    })
}

/// 手工組出只含一個 DateTimeOriginal 欄位的最小 TIFF 檔，供測試使用
#[cfg(test)]
pub(crate) fn write_tiff_with_datetime(path: &Path, datetime: &str) {
    use std::io::Write;

    assert_eq!(datetime.len(), 19, "EXIF 時間字串必須是 19 個字元");

    let mut bytes: Vec<u8> = Vec::new();
    // TIFF 檔頭（little endian），IFD0 位於位移 8
    bytes.extend_from_slice(b"II\x2a\x00");
    bytes.extend_from_slice(&8u32.to_le_bytes());
    // IFD0：一個項目，指向 Exif 子 IFD（位移 26）
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&0x8769u16.to_le_bytes()); // Exif IFD pointer
    bytes.extend_from_slice(&4u16.to_le_bytes()); // LONG
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&26u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // 沒有下一個 IFD
    // Exif 子 IFD：一個項目，DateTimeOriginal（ASCII 20 bytes，位於位移 44）
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&0x9003u16.to_le_bytes()); // DateTimeOriginal
    bytes.extend_from_slice(&2u16.to_le_bytes()); // ASCII
    bytes.extend_from_slice(&20u32.to_le_bytes());
    bytes.extend_from_slice(&44u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    // 時間字串本體（含結尾 NUL）
    bytes.extend_from_slice(datetime.as_bytes());
    bytes.push(0);

    let mut file = File::create(path).unwrap();
    file.write_all(&bytes).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_capture_time_from_tiff() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.tif");
        write_tiff_with_datetime(&path, "2020:05:03 10:20:30");

        let datetime = read_capture_time(&path).unwrap().unwrap();
        assert_eq!(
            datetime,
            NaiveDate::from_ymd_opt(2020, 5, 3)
                .unwrap()
                .and_hms_opt(10, 20, 30)
                .unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(read_capture_time(Path::new("/nonexistent/photo.jpg")).is_err());
    }
}
