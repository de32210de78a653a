// ==========================================
// 管道材料导入系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository / Importer 错误为用户友好的错误消息
// 说明: 导入本身的失败以 ImportResult(success=false) 返回；
//       ApiError 只覆盖导入之外的失败（鉴权、连接、查询）
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方错误
    // ==========================================
    #[error("未授权的导入请求")]
    Unauthorized,

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Unauthorized => 401,
            ApiError::InvalidInput(_) | ApiError::ImportError(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) | RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(msg)
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换（预览等不返回 ImportResult 的入口）
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => e.into(),
            ImportError::FileNotFound(path) => ApiError::NotFound(path),
            other if other.failure_kind().is_user_error() => {
                ApiError::ImportError(other.to_string())
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_maps_to_404() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "ImportBatch".to_string(),
            id: "b1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_import_error_classification() {
        let err: ApiError = ImportError::UnsupportedFormat("txt".to_string()).into();
        assert_eq!(err.status_code(), 400);

        let err: ApiError = ImportError::InternalError("boom".to_string()).into();
        assert_eq!(err.status_code(), 500);
    }
}
