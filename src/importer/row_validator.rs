// ==========================================
// 管道材料导入系统 - 行校验器
// ==========================================
// 校验顺序（逐行，先命中者定类）:
//   0. 行结构无法解析                  → Error / malformed_data
//   1. 图号为空                        → Error / empty_drawing
//      类型 / 编码 / 数量缺失           → Error / missing_required_field
//   2. 类型不在固定枚举内              → Error / unsupported_type
//   3. 数量: 0 → Skipped / zero_quantity；负数、小数、非数字 → Error / invalid_quantity
// 全局: 展开组件数超出单行 / 整批上限 → 顶层错误（先于标识键展开）
//       非聚合行解析出相同标识键 → 涉及的所有行改判 Error / duplicate_identity_key
// 红线: 存在任一 Error 则整批拒绝；Skipped 仅为警告
// ==========================================

use crate::config::import_config_trait::{
    ImportLimits, DEFAULT_MAX_COMPONENTS_PER_ROW, DEFAULT_MAX_IMPORT_COMPONENTS,
};
use crate::domain::takeoff::{
    CanonicalField, ParsedRow, RawTakeoffRow, ValidationResult, ValidationSummary,
};
use crate::domain::types::{ComponentType, ValidationCategory};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::duplicate_filter::find_intra_batch_duplicates;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::identity_resolver::{component_count, resolve_row};
use crate::importer::takeoff_importer_trait::DataCleaner as _;
use std::collections::HashMap;

/// 数量解析
///
/// - `"2"`、`"2.0"`、`" 3 "` → Ok
/// - `"-1"`、`"1.5"`、`"1e3"`、`"+5"`、`"abc"` → Err(原因)
pub fn parse_quantity(raw: &str) -> Result<u32, String> {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix('-') {
        if split_decimal(rest).is_some() {
            return Err(format!("数量不能为负数: {}", trimmed));
        }
    }

    let (int_part, frac_part) =
        split_decimal(trimmed).ok_or_else(|| format!("数量不是数字: {}", trimmed))?;
    if frac_part.bytes().any(|b| b != b'0') {
        return Err(format!("数量必须为整数: {}", trimmed));
    }

    int_part
        .parse::<u32>()
        .map_err(|_| format!("数量超出范围: {}", trimmed))
}

/// `\d+(\.\d+)?` → (整数部分, 小数部分)
fn split_decimal(text: &str) -> Option<(&str, &str)> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) if !f.is_empty() => (i, f),
        Some(_) => return None,
        None => (text, ""),
    };
    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() || !digits(int_part) || !digits(frac_part) {
        return None;
    }
    Some((int_part, frac_part))
}

// ==========================================
// ComponentLimits - 展开组件数上限
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentLimits {
    pub max_per_row: usize,
    pub max_total: usize,
}

impl Default for ComponentLimits {
    fn default() -> Self {
        Self {
            max_per_row: DEFAULT_MAX_COMPONENTS_PER_ROW,
            max_total: DEFAULT_MAX_IMPORT_COMPONENTS,
        }
    }
}

impl From<&ImportLimits> for ComponentLimits {
    fn from(limits: &ImportLimits) -> Self {
        Self {
            max_per_row: limits.max_components_per_row,
            max_total: limits.max_import_components,
        }
    }
}

pub struct RowValidator {
    cleaner: DataCleaner,
}

impl Default for RowValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RowValidator {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 行数上限检查（整体一个顶层错误）
    pub fn check_row_limit(&self, row_count: usize, max_rows: usize) -> ImporterResult<()> {
        if row_count > max_rows {
            return Err(ImportError::TooManyRows {
                actual: row_count,
                limit: max_rows,
            });
        }
        Ok(())
    }

    /// 展开组件数上限检查（整体一个顶层错误）
    pub fn check_component_limit(
        &self,
        results: &[ValidationResult],
        limits: ComponentLimits,
    ) -> ImporterResult<()> {
        let mut total: usize = 0;
        for result in results {
            if let ValidationResult::Valid { data } = result {
                let count = component_count(data);
                if count > limits.max_per_row {
                    return Err(ImportError::TooManyComponentsInRow {
                        row_number: data.row_number,
                        actual: count,
                        limit: limits.max_per_row,
                    });
                }
                total = total.saturating_add(count);
            }
        }
        if total > limits.max_total {
            return Err(ImportError::TooManyComponents {
                actual: total,
                limit: limits.max_total,
            });
        }
        Ok(())
    }

    /// 单行校验
    pub fn validate_row(&self, raw: &RawTakeoffRow) -> ValidationResult {
        let row_number = raw.row_number;
        let drawing = raw.get(CanonicalField::Drawing).map(str::to_string);

        let error = |category: ValidationCategory, reason: String| ValidationResult::Error {
            row_number,
            reason,
            category,
            drawing: drawing.clone(),
        };

        // 0. 结构
        if let Some(reason) = &raw.malformed {
            return error(ValidationCategory::MalformedData, reason.clone());
        }

        // 1. 必填
        let drawing_value = match raw.get(CanonicalField::Drawing) {
            Some(d) => d,
            None => return error(ValidationCategory::EmptyDrawing, "图号为空".to_string()),
        };
        let type_raw = match raw.get(CanonicalField::Type) {
            Some(t) => t,
            None => {
                return error(
                    ValidationCategory::MissingRequiredField,
                    "缺少组件类型".to_string(),
                )
            }
        };
        let commodity_code = match raw.get(CanonicalField::CommodityCode) {
            Some(c) => self.cleaner.clean_commodity_code(c),
            None => {
                return error(
                    ValidationCategory::MissingRequiredField,
                    "缺少物料编码".to_string(),
                )
            }
        };
        let qty_raw = match raw.get(CanonicalField::Qty) {
            Some(q) => q,
            None => {
                return error(
                    ValidationCategory::MissingRequiredField,
                    "缺少数量".to_string(),
                )
            }
        };

        // 2. 类型
        let component_type = match ComponentType::parse(type_raw) {
            Some(t) => t,
            None => {
                return error(
                    ValidationCategory::UnsupportedType,
                    format!("不支持的组件类型: {}", type_raw),
                )
            }
        };

        // 3. 数量
        let qty = match parse_quantity(qty_raw) {
            Ok(0) => {
                return ValidationResult::Skipped {
                    row_number,
                    reason: "数量为 0，跳过".to_string(),
                    category: ValidationCategory::ZeroQuantity,
                    drawing: drawing.clone(),
                }
            }
            Ok(q) => q,
            Err(reason) => return error(ValidationCategory::InvalidQuantity, reason),
        };

        let optional = |field| self.cleaner.clean_optional(raw.get(field));

        ValidationResult::Valid {
            data: ParsedRow {
                row_number,
                drawing: self.cleaner.clean_text(drawing_value, false),
                component_type,
                qty,
                commodity_code,
                size: optional(CanonicalField::Size),
                spec: optional(CanonicalField::Spec),
                description: optional(CanonicalField::Description),
                comments: optional(CanonicalField::Comments),
                area: optional(CanonicalField::Area),
                system: optional(CanonicalField::System),
                test_package: optional(CanonicalField::TestPackage),
                unmapped_fields: raw.unmapped_fields.clone(),
            },
        }
    }

    /// 整批校验（逐行 + 展开上限 + 全局重复标识键）
    pub fn validate_all(
        &self,
        raw_rows: &[RawTakeoffRow],
        limits: ComponentLimits,
    ) -> ImporterResult<ValidationSummary> {
        let mut results: Vec<ValidationResult> =
            raw_rows.iter().map(|r| self.validate_row(r)).collect();
        self.check_component_limit(&results, limits)?;

        let resolved: Vec<_> = results
            .iter()
            .filter_map(|r| match r {
                ValidationResult::Valid { data } => Some(resolve_row(data)),
                _ => None,
            })
            .collect();

        // 行号 → 冲突描述（一行只记录第一处冲突）
        let mut collisions: HashMap<usize, String> = HashMap::new();
        for dup in find_intra_batch_duplicates(&resolved) {
            let rows = dup
                .row_numbers
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            for n in &dup.row_numbers {
                collisions.entry(*n).or_insert_with(|| {
                    format!(
                        "标识键重复 ({} {})，涉及行: {}",
                        dup.component_type, dup.identity_key, rows
                    )
                });
            }
        }

        if !collisions.is_empty() {
            for result in results.iter_mut() {
                if let ValidationResult::Valid { data } = result {
                    if let Some(reason) = collisions.get(&data.row_number) {
                        *result = ValidationResult::Error {
                            row_number: data.row_number,
                            reason: reason.clone(),
                            category: ValidationCategory::DuplicateIdentityKey,
                            drawing: Some(data.drawing.clone()),
                        };
                    }
                }
            }
        }

        Ok(ValidationSummary::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(row_number: usize, pairs: &[(CanonicalField, &str)]) -> RawTakeoffRow {
        let mut r = RawTakeoffRow::new(row_number);
        for (field, value) in pairs {
            r.fields.insert(*field, value.to_string());
        }
        r
    }

    fn valve(row_number: usize, qty: &str, code: &str) -> RawTakeoffRow {
        raw(
            row_number,
            &[
                (CanonicalField::Drawing, "P-001"),
                (CanonicalField::Type, "Valve"),
                (CanonicalField::Qty, qty),
                (CanonicalField::CommodityCode, code),
            ],
        )
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("2"), Ok(2));
        assert_eq!(parse_quantity(" 2.0 "), Ok(2));
        assert_eq!(parse_quantity("0"), Ok(0));
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("1.5").is_err());
        assert!(parse_quantity("abc").is_err());
        assert!(parse_quantity("NaN").is_err());
        assert_eq!(parse_quantity("3.00"), Ok(3));
        assert!(parse_quantity("1e3").is_err());
        assert!(parse_quantity("+5").is_err());
        assert!(parse_quantity("2.").is_err());
        assert!(parse_quantity(".5").is_err());
        assert!(parse_quantity("4294967296").is_err());
        assert!(parse_quantity("-2.0").unwrap_err().contains("负数"));
    }

    #[test]
    fn test_valid_row() {
        let result = RowValidator::new().validate_row(&valve(1, "2", " V100 "));
        match result {
            ValidationResult::Valid { data } => {
                assert_eq!(data.component_type, ComponentType::Valve);
                assert_eq!(data.qty, 2);
                assert_eq!(data.commodity_code, "V100");
                assert_eq!(data.size, None);
            }
            other => panic!("expected valid, got {:?}", other),
        }
    }

    #[test]
    fn test_required_fields() {
        let v = RowValidator::new();

        let r = v.validate_row(&raw(1, &[(CanonicalField::Type, "valve")]));
        assert_eq!(r.category(), Some(ValidationCategory::EmptyDrawing));

        let r = v.validate_row(&raw(
            2,
            &[
                (CanonicalField::Drawing, "P-001"),
                (CanonicalField::Type, "valve"),
                (CanonicalField::Qty, "1"),
            ],
        ));
        assert_eq!(r.category(), Some(ValidationCategory::MissingRequiredField));
        assert!(r.is_error());
    }

    #[test]
    fn test_unsupported_type_is_error() {
        let mut row = valve(1, "1", "X");
        row.fields.insert(CanonicalField::Type, "widget".to_string());
        let r = RowValidator::new().validate_row(&row);
        assert!(r.is_error());
        assert_eq!(r.category(), Some(ValidationCategory::UnsupportedType));
    }

    #[test]
    fn test_zero_quantity_is_skipped() {
        let r = RowValidator::new().validate_row(&valve(1, "0", "V100"));
        assert!(r.is_skipped());
        assert_eq!(r.category(), Some(ValidationCategory::ZeroQuantity));
    }

    #[test]
    fn test_negative_quantity_single_error() {
        let summary = RowValidator::new()
            .validate_all(&[valve(1, "-1", "V100")], ComponentLimits::default())
            .unwrap();
        assert_eq!(summary.error_count, 1);
        assert!(!summary.can_import);
        assert_eq!(
            summary.results[0].category(),
            Some(ValidationCategory::InvalidQuantity)
        );
    }

    #[test]
    fn test_malformed_row() {
        let mut row = valve(1, "1", "V100");
        row.malformed = Some("bad".to_string());
        let r = RowValidator::new().validate_row(&row);
        assert_eq!(r.category(), Some(ValidationCategory::MalformedData));
    }

    #[test]
    fn test_duplicate_pass_reports_both_rows() {
        let summary = RowValidator::new()
            .validate_all(
                &[
                    valve(1, "1", "V100"),
                    valve(2, "1", "V200"),
                    valve(3, "1", "V100"),
                ],
                ComponentLimits::default(),
            )
            .unwrap();

        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.valid_count, 1);
        let dup_rows: Vec<usize> = summary
            .results
            .iter()
            .filter(|r| r.category() == Some(ValidationCategory::DuplicateIdentityKey))
            .map(|r| r.row_number())
            .collect();
        assert_eq!(dup_rows, vec![1, 3]);
    }

    #[test]
    fn test_row_limit() {
        let v = RowValidator::new();
        assert!(v.check_row_limit(10, 10).is_ok());
        assert!(matches!(
            v.check_row_limit(11, 10),
            Err(ImportError::TooManyRows { actual: 11, limit: 10 })
        ));
    }

    #[test]
    fn test_huge_quantity_rejected_before_explosion() {
        let err = RowValidator::new()
            .validate_all(&[valve(1, "4294967295", "V100")], ComponentLimits::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::TooManyComponentsInRow {
                row_number: 1,
                actual: 4_294_967_295,
                limit: DEFAULT_MAX_COMPONENTS_PER_ROW
            }
        ));
    }

    #[test]
    fn test_total_component_limit() {
        let limits = ComponentLimits {
            max_per_row: 10,
            max_total: 5,
        };
        let v = RowValidator::new();

        let ok = v.validate_all(&[valve(1, "3", "V100"), valve(2, "2", "V200")], limits);
        assert!(ok.is_ok());

        let err = v
            .validate_all(&[valve(1, "3", "V100"), valve(2, "3", "V200")], limits)
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::TooManyComponents { actual: 6, limit: 5 }
        ));
    }
}
