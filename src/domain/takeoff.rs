// ==========================================
// 管道材料导入系统 - Takeoff 领域模型
// ==========================================
// 职责: 列映射、导入中间行、校验结果
// 生命周期: 仅在单次导入调用内
// ==========================================

use crate::domain::types::{ComponentType, MatchTier, ValidationCategory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ==========================================
// CanonicalField - 标准字段
// ==========================================
// 必填: drawing / type / qty / commodityCode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Drawing,
    Type,
    Qty,
    CommodityCode,
    Size,
    Spec,
    Description,
    Comments,
    Area,
    System,
    TestPackage,
}

impl CanonicalField {
    /// 映射优先级顺序（必填在前）
    pub const ALL: [CanonicalField; 11] = [
        CanonicalField::Drawing,
        CanonicalField::Type,
        CanonicalField::Qty,
        CanonicalField::CommodityCode,
        CanonicalField::Size,
        CanonicalField::Spec,
        CanonicalField::Description,
        CanonicalField::Comments,
        CanonicalField::Area,
        CanonicalField::System,
        CanonicalField::TestPackage,
    ];

    pub const REQUIRED: [CanonicalField; 4] = [
        CanonicalField::Drawing,
        CanonicalField::Type,
        CanonicalField::Qty,
        CanonicalField::CommodityCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Drawing => "drawing",
            CanonicalField::Type => "type",
            CanonicalField::Qty => "qty",
            CanonicalField::CommodityCode => "commodityCode",
            CanonicalField::Size => "size",
            CanonicalField::Spec => "spec",
            CanonicalField::Description => "description",
            CanonicalField::Comments => "comments",
            CanonicalField::Area => "area",
            CanonicalField::System => "system",
            CanonicalField::TestPackage => "testPackage",
        }
    }

    pub fn is_required(&self) -> bool {
        CanonicalField::REQUIRED.contains(self)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// ColumnMapping - 源列 → 标准字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_column: String,          // 源文件列名（原样）
    pub canonical_field: CanonicalField, // 标准字段
    pub confidence: u8,                 // 100 / 95 / 85
    pub match_tier: MatchTier,          // 命中层级
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,    // 源列下标（表头重名时按下标取值）
}

// ==========================================
// ColumnMappingResult - 列检测结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMappingResult {
    pub mappings: Vec<ColumnMapping>,
    pub unmapped_columns: Vec<String>,
    pub missing_required: Vec<CanonicalField>,
    pub has_all_required_fields: bool,
}

// ==========================================
// RawTakeoffRow - 导入中间结构体
// ==========================================
// 用途: CSV 路径与结构化请求路径的统一中间产物（列映射 → 此结构 → 校验）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTakeoffRow {
    pub row_number: usize,                          // 1 起始，不含表头
    pub fields: HashMap<CanonicalField, String>,    // 已映射字段（原样值）
    pub unmapped_fields: BTreeMap<String, String>,  // 未识别列
    pub malformed: Option<String>,                  // 行结构无法解析时的原因
}

impl RawTakeoffRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            ..Default::default()
        }
    }

    /// 取字段值（TRIM 后为空视为缺失）
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields
            .get(&field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

// ==========================================
// ParsedRow - 校验通过的标准行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRow {
    pub row_number: usize,
    pub drawing: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub qty: u32,
    pub commodity_code: String,
    pub size: Option<String>,
    pub spec: Option<String>,
    pub description: Option<String>,
    pub comments: Option<String>,
    pub area: Option<String>,
    pub system: Option<String>,
    pub test_package: Option<String>,
    #[serde(default)]
    pub unmapped_fields: BTreeMap<String, String>,
}

// ==========================================
// ValidationResult - 单行校验结果
// ==========================================
// 红线: 存在 Error 则整体拒绝导入；Skipped 仅为警告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid {
        data: ParsedRow,
    },
    Skipped {
        row_number: usize,
        reason: String,
        category: ValidationCategory,
        drawing: Option<String>,
    },
    Error {
        row_number: usize,
        reason: String,
        category: ValidationCategory,
        drawing: Option<String>,
    },
}

impl ValidationResult {
    pub fn row_number(&self) -> usize {
        match self {
            ValidationResult::Valid { data } => data.row_number,
            ValidationResult::Skipped { row_number, .. } => *row_number,
            ValidationResult::Error { row_number, .. } => *row_number,
        }
    }

    pub fn category(&self) -> Option<ValidationCategory> {
        match self {
            ValidationResult::Valid { .. } => None,
            ValidationResult::Skipped { category, .. } | ValidationResult::Error { category, .. } => {
                Some(*category)
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ValidationResult::Skipped { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::Error { .. })
    }
}

// ==========================================
// ValidationSummary - 整批校验汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub results: Vec<ValidationResult>,
    pub valid_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub can_import: bool,
}

impl ValidationSummary {
    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        let valid_count = results.iter().filter(|r| r.is_valid()).count();
        let skipped_count = results.iter().filter(|r| r.is_skipped()).count();
        let error_count = results.iter().filter(|r| r.is_error()).count();

        Self {
            results,
            valid_count,
            skipped_count,
            error_count,
            can_import: error_count == 0,
        }
    }

    /// 校验通过的行（按行号顺序）
    pub fn valid_rows(&self) -> Vec<ParsedRow> {
        self.results
            .iter()
            .filter_map(|r| match r {
                ValidationResult::Valid { data } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}
