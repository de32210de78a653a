// ==========================================
// 管道材料导入系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / UPPER / NULL 标准化 + 图号、尺寸规范化
// 红线: 规范化函数必须幂等（f(f(x)) == f(x)），落库的 drawing_no_norm 即此结果
// ==========================================

use crate::importer::takeoff_importer_trait::DataCleaner as DataCleanerTrait;

/// 尺寸为空时的占位值
pub const NO_SIZE: &str = "NOSIZE";

/// 图号规范化: TRIM + 大写 + 连续空白折叠为一个空格
///
/// `"  p-001 "` → `"P-001"`，`"p  001"` → `"P 001"`
pub fn normalize_drawing(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// 尺寸规范化: 空 → NOSIZE；去掉引号与空白，`/` → `X`，大写
///
/// `2"` → `2`，`1/2"` → `1X2`，`3 x 2` → `3X2`
pub fn normalize_size(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
        .map(|c| if c == '/' { 'X' } else { c })
        .collect::<String>()
        .to_uppercase();

    if cleaned.is_empty() {
        NO_SIZE.to_string()
    } else {
        cleaned
    }
}

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }
}

impl DataCleaner {
    /// 物料编码: 仅 TRIM，保留大小写
    pub fn clean_commodity_code(&self, value: &str) -> String {
        self.clean_text(value, false)
    }

    /// 可选文本字段（空白视为缺失）
    pub fn clean_optional(&self, value: Option<&str>) -> Option<String> {
        self.normalize_null(value.map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drawing() {
        assert_eq!(normalize_drawing("  p-001 "), "P-001");
        assert_eq!(normalize_drawing("p\t 001  a"), "P 001 A");
        assert_eq!(normalize_drawing(""), "");
    }

    #[test]
    fn test_normalize_drawing_idempotent() {
        for raw in ["  p-001 ", "iso  12 /b", "P-001", "x\ty"] {
            let once = normalize_drawing(raw);
            assert_eq!(normalize_drawing(&once), once);
        }
    }

    #[test]
    fn test_normalize_size() {
        assert_eq!(normalize_size(None), "NOSIZE");
        assert_eq!(normalize_size(Some("   ")), "NOSIZE");
        assert_eq!(normalize_size(Some("2\"")), "2");
        assert_eq!(normalize_size(Some("1/2\"")), "1X2");
        assert_eq!(normalize_size(Some(" 3 x 2 ")), "3X2");
        assert_eq!(normalize_size(Some("''")), "NOSIZE");
    }

    #[test]
    fn test_normalize_size_idempotent() {
        for raw in ["1/2\"", "3 x 2", "NOSIZE", "6"] {
            let once = normalize_size(Some(raw));
            assert_eq!(normalize_size(Some(&once)), once);
        }
    }

    #[test]
    fn test_clean_text_and_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  abc ", true), "ABC");
        assert_eq!(cleaner.clean_commodity_code(" v-100a "), "v-100a");
        assert_eq!(cleaner.normalize_null(Some("   ".to_string())), None);
        assert_eq!(cleaner.clean_optional(Some(" CS ")), Some("CS".to_string()));
    }
}
