// ==========================================
// 管道材料导入系统 - 导入请求 / 结果模型
// ==========================================
// 职责: 结构化导入请求、元数据查找表、导入结果、导入批次审计
// ==========================================

use crate::domain::takeoff::{ColumnMapping, ColumnMappingResult, ValidationSummary};
use crate::domain::types::{ComponentType, FailureKind, MetadataDimension, ValidationCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// ImportRequest - 结构化导入请求
// ==========================================
// rows: 以源列名为键的 JSON 对象；column_mappings 为空时按行键自动识别
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub project_id: String,
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
    #[serde(default)]
    pub metadata: MetadataToCreate,
    #[serde(default)]
    pub source_name: Option<String>,
}

// ==========================================
// MetadataToCreate - 待解析的元数据名称
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataToCreate {
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(default)]
    pub systems: Vec<String>,
    #[serde(default)]
    pub test_packages: Vec<String>,
}

impl MetadataToCreate {
    pub fn names(&self, dimension: MetadataDimension) -> &[String] {
        match dimension {
            MetadataDimension::Area => &self.areas,
            MetadataDimension::System => &self.systems,
            MetadataDimension::TestPackage => &self.test_packages,
        }
    }

    pub fn names_mut(&mut self, dimension: MetadataDimension) -> &mut Vec<String> {
        match dimension {
            MetadataDimension::Area => &mut self.areas,
            MetadataDimension::System => &mut self.systems,
            MetadataDimension::TestPackage => &mut self.test_packages,
        }
    }
}

// ==========================================
// MetadataLookupMaps - 名称 → id
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataLookupMaps {
    pub areas: HashMap<String, String>,
    pub systems: HashMap<String, String>,
    pub test_packages: HashMap<String, String>,
}

impl MetadataLookupMaps {
    pub fn map(&self, dimension: MetadataDimension) -> &HashMap<String, String> {
        match dimension {
            MetadataDimension::Area => &self.areas,
            MetadataDimension::System => &self.systems,
            MetadataDimension::TestPackage => &self.test_packages,
        }
    }

    /// 解析行上的元数据名称；缺失或未解析 → None（外键留空）
    pub fn resolve(&self, dimension: MetadataDimension, name: Option<&str>) -> Option<String> {
        name.map(str::trim)
            .filter(|n| !n.is_empty())
            .and_then(|n| self.map(dimension).get(n).cloned())
    }
}

// ==========================================
// MetadataCreatedCounts - 各维度新建数量
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataCreatedCounts {
    pub areas: usize,
    pub systems: usize,
    pub test_packages: usize,
}

impl MetadataCreatedCounts {
    pub fn set(&mut self, dimension: MetadataDimension, count: usize) {
        match dimension {
            MetadataDimension::Area => self.areas = count,
            MetadataDimension::System => self.systems = count,
            MetadataDimension::TestPackage => self.test_packages = count,
        }
    }
}

// ==========================================
// ImportIssue - 行级问题明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportIssue {
    pub row: usize,
    pub issue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ValidationCategory>,
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
// 用途: 导入边界的统一返回值（成功/失败均以此形态返回，不抛出）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub batch_id: String,
    pub project_id: String,

    // ===== 行统计 =====
    pub rows_total: usize,
    pub rows_skipped: usize,

    // ===== 组件统计 =====
    pub components_created: usize,
    pub components_updated: usize,
    pub components_skipped: usize,
    pub components_by_type: BTreeMap<ComponentType, usize>,

    // ===== 图纸 / 元数据统计 =====
    pub drawings_created: usize,
    pub drawings_reused: usize,
    pub metadata_created: MetadataCreatedCounts,

    pub elapsed_ms: u64,

    // ===== 失败信息 =====
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub details: Vec<ImportIssue>,

    // ===== 警告（跳过行）=====
    pub warnings: Vec<ImportIssue>,
}

impl ImportResult {
    pub fn new(batch_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            success: false,
            batch_id: batch_id.into(),
            project_id: project_id.into(),
            rows_total: 0,
            rows_skipped: 0,
            components_created: 0,
            components_updated: 0,
            components_skipped: 0,
            components_by_type: BTreeMap::new(),
            drawings_created: 0,
            drawings_reused: 0,
            metadata_created: MetadataCreatedCounts::default(),
            elapsed_ms: 0,
            error: None,
            failure_kind: None,
            details: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 标记失败（保留已累计的统计，便于定位已提交的部分）
    pub fn into_failure(
        mut self,
        kind: FailureKind,
        message: impl Into<String>,
        details: Vec<ImportIssue>,
    ) -> Self {
        self.success = false;
        self.failure_kind = Some(kind);
        self.error = Some(message.into());
        self.details = details;
        self
    }

    pub fn record_created(&mut self, component_type: ComponentType, count: usize) {
        if count == 0 {
            return;
        }
        self.components_created += count;
        *self.components_by_type.entry(component_type).or_insert(0) += count;
    }
}

// ==========================================
// ImportPreview - 导入预览（不落库）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub total_rows: usize,
    pub mapping: ColumnMappingResult,
    pub validation: ValidationSummary,
}

// ==========================================
// ImportBatch - 导入批次审计记录
// ==========================================
// 对齐: import_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub project_id: String,
    pub source_name: Option<String>,
    pub total_rows: i64,
    pub components_created: i64,
    pub components_updated: i64,
    pub components_skipped: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub elapsed_ms: i64,
    pub imported_at: DateTime<Utc>,
    pub result_json: Option<String>,
}

impl ImportBatch {
    pub fn from_result(result: &ImportResult, source_name: Option<String>) -> Self {
        Self {
            batch_id: result.batch_id.clone(),
            project_id: result.project_id.clone(),
            source_name,
            total_rows: result.rows_total as i64,
            components_created: result.components_created as i64,
            components_updated: result.components_updated as i64,
            components_skipped: result.components_skipped as i64,
            success: result.success,
            error_message: result.error.clone(),
            elapsed_ms: result.elapsed_ms as i64,
            imported_at: Utc::now(),
            result_json: serde_json::to_string(result).ok(),
        }
    }
}
