// ==========================================
// 管道材料导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::{FailureKind, MetadataDimension};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 请求结构错误 =====
    #[error("请求体过大: {actual} 字节，上限 {limit} 字节")]
    PayloadTooLarge { actual: usize, limit: usize },

    #[error("行数超限: {actual} 行，上限 {limit} 行")]
    TooManyRows { actual: usize, limit: usize },

    #[error("第 {row_number} 行展开组件数超限: {actual} 个，上限 {limit} 个")]
    TooManyComponentsInRow {
        row_number: usize,
        actual: usize,
        limit: usize,
    },

    #[error("展开组件总数超限: {actual} 个，上限 {limit} 个")]
    TooManyComponents { actual: usize, limit: usize },

    #[error("请求格式错误: {0}")]
    MalformedRequest(String),

    #[error("缺少必填列: {0}")]
    MissingRequiredColumns(String),

    // ===== 行级校验错误 =====
    #[error("数据校验未通过: {error_rows} 行错误")]
    ValidationFailed { error_rows: usize },

    // ===== 一致性错误（缺陷信号）=====
    #[error("元数据数量不一致 ({dimension}): 请求 {requested}，实际 {fetched}")]
    MetadataCountMismatch {
        dimension: MetadataDimension,
        requested: usize,
        fetched: usize,
    },

    #[error("图纸数量不一致: 请求 {requested}，实际 {fetched}")]
    DrawingCountMismatch { requested: usize, fetched: usize },

    #[error("图纸未解析: {0}")]
    UnresolvedDrawing(String),

    // ===== 落库错误 =====
    #[error("组件批次 {batch_index} 写入失败（已提交 {committed} 条）: {message}")]
    BatchInsertFailed {
        batch_index: usize,
        committed: usize,
        message: String,
    },

    #[error("聚合管道合并失败 ({pipe_id}): {message}")]
    AggregateMergeFailed { pipe_id: String, message: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 错误 → 调用方可区分的失败类别
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ImportError::FileNotFound(_)
            | ImportError::UnsupportedFormat(_)
            | ImportError::FileReadError(_)
            | ImportError::ExcelParseError(_)
            | ImportError::CsvParseError(_)
            | ImportError::PayloadTooLarge { .. }
            | ImportError::TooManyRows { .. }
            | ImportError::TooManyComponentsInRow { .. }
            | ImportError::TooManyComponents { .. }
            | ImportError::MalformedRequest(_)
            | ImportError::MissingRequiredColumns(_) => FailureKind::Payload,
            ImportError::ValidationFailed { .. } => FailureKind::Validation,
            ImportError::MetadataCountMismatch { .. }
            | ImportError::DrawingCountMismatch { .. }
            | ImportError::UnresolvedDrawing(_) => FailureKind::Consistency,
            ImportError::BatchInsertFailed { .. }
            | ImportError::AggregateMergeFailed { .. }
            | ImportError::Repository(_) => FailureKind::Persistence,
            ImportError::ConfigReadError { .. }
            | ImportError::InternalError(_)
            | ImportError::Other(_) => FailureKind::Unexpected,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::MalformedRequest(err.to_string())
    }
}

/// Result 类型别名
pub type ImporterResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_classification() {
        let err = ImportError::PayloadTooLarge {
            actual: 10,
            limit: 5,
        };
        assert_eq!(err.failure_kind(), FailureKind::Payload);

        let err = ImportError::MetadataCountMismatch {
            dimension: MetadataDimension::Area,
            requested: 2,
            fetched: 1,
        };
        assert_eq!(err.failure_kind(), FailureKind::Consistency);

        let err = ImportError::BatchInsertFailed {
            batch_index: 3,
            committed: 1500,
            message: "disk I/O error".to_string(),
        };
        assert_eq!(err.failure_kind(), FailureKind::Persistence);
        assert!(err.to_string().contains("批次 3"));
        assert!(err.to_string().contains("已提交 1500"));
    }
}
