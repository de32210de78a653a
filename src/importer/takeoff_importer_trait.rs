// ==========================================
// 管道材料导入系统 - Takeoff 导入 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// ==========================================

use crate::domain::import::{ImportPreview, ImportRequest, ImportResult};
use crate::importer::error::ImporterResult;
use crate::importer::file_parser::TabularData;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// TakeoffImporter Trait
// ==========================================
// 用途: 导入主接口
// 实现者: TakeoffImporterImpl
//
// 所有入口均返回 ImportResult（失败以 success=false + failure_kind 表达，不抛出）
#[async_trait]
pub trait TakeoffImporter: Send + Sync {
    /// 结构化请求导入（权威路径）
    ///
    /// # 导入流程
    /// 1. 限额检查（行数）
    /// 2. 列映射（请求给出映射则直接使用，否则按行键自动识别）
    /// 3. 行校验 + 标识键解析 + 全局重复检查
    /// 4. 元数据解析（三维度并发）
    /// 5. 图纸解析
    /// 6. 重复过滤 → 分批写入组件 / 逐条合并聚合管道
    async fn import_request(&self, request: ImportRequest) -> ImportResult;

    /// 从文件导入（CSV / Excel）
    ///
    /// 解析 → 列检测 → 与结构化路径共用后续流程；元数据名称取自行数据
    async fn import_file(&self, project_id: &str, file_path: &Path) -> ImportResult;

    /// 预览文件（列映射 + 校验汇总，不落库）
    async fn preview_file(&self, file_path: &Path) -> ImporterResult<ImportPreview>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件独立导入，一个文件失败不影响其他文件
    /// - 返回顺序与输入一致
    async fn batch_import(
        &self,
        project_id: &str,
        file_paths: Vec<std::path::PathBuf>,
    ) -> Vec<ImportResult>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为表头 + 数据行
    ///
    /// # 返回
    /// - Ok(TabularData): 完全空白的行已丢弃，行号保留
    /// - Err: 文件不存在、格式不支持、解析失败
    fn parse(&self, file_path: &Path) -> ImporterResult<TabularData>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 文本清洗接口
// 实现者: DataCleaner
pub trait DataCleaner: Send + Sync {
    /// 清洗文本字段（TRIM，可选 UPPER）
    fn clean_text(&self, value: &str, uppercase: bool) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;
}
