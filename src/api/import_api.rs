// ==========================================
// 管道材料导入系统 - 导入API
// ==========================================
// 职责: 封装导入入口（请求体校验、鉴权、导入器装配）
// 说明: 导入失败以 ImportResult(success=false) 返回，调用方按 failure_kind 选择状态码；
//       ApiError 仅用于鉴权失败和基础设施故障
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportLimits};
use crate::db::open_sqlite_connection;
use crate::domain::import::{ImportBatch, ImportPreview, ImportRequest, ImportResult};
use crate::importer::error::ImportError;
use crate::importer::{TakeoffImporter, TakeoffImporterImpl, UniversalFileParser};
use crate::repository::{TakeoffImportRepository, TakeoffImportRepositoryImpl};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

type Importer = TakeoffImporterImpl<TakeoffImportRepositoryImpl, ConfigManager>;

/// 导入结果 → HTTP 状态码
///
/// - 成功 → 200
/// - payload / validation → 400
/// - 其余 → 500
pub fn status_for(result: &ImportResult) -> u16 {
    match result.failure_kind {
        None if result.success => 200,
        Some(kind) if kind.is_user_error() => 400,
        _ => 500,
    }
}

/// 导入API
pub struct ImportApi {
    db_path: String,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// 导入结构化请求体
    ///
    /// # 参数
    /// - body: JSON 请求体（ImportRequest，camelCase）
    /// - authorized: 调用方鉴权结果
    ///
    /// # 返回
    /// - Ok(ImportResult): 成功或结构化失败（超限 / 格式错误 / 校验失败 / 落库失败）
    /// - Err(ApiError::Unauthorized): 未授权，不做任何处理
    pub async fn import_payload(&self, body: &[u8], authorized: bool) -> ApiResult<ImportResult> {
        if !authorized {
            warn!(bytes = body.len(), "拒绝未授权的导入请求");
            return Err(ApiError::Unauthorized);
        }

        let (importer, config) = self.create_importer()?;

        let limits = ImportLimits::load(&config)
            .await
            .map_err(|e| ApiError::InternalError(format!("读取导入配置失败: {}", e)))?;
        if body.len() > limits.max_payload_bytes {
            return Ok(payload_failure(
                "",
                ImportError::PayloadTooLarge {
                    actual: body.len(),
                    limit: limits.max_payload_bytes,
                },
            ));
        }

        let request: ImportRequest = match serde_json::from_slice(body) {
            Ok(r) => r,
            Err(e) => return Ok(payload_failure("", ImportError::from(e))),
        };

        info!(project_id = %request.project_id, rows = request.rows.len(), "收到导入请求");
        Ok(importer.import_request(request).await)
    }

    /// 导入 CSV / Excel 文件
    pub async fn import_file(&self, project_id: &str, file_path: &str) -> ApiResult<ImportResult> {
        let (importer, _) = self.create_importer()?;
        Ok(importer.import_file(project_id, Path::new(file_path)).await)
    }

    /// 并发导入多个文件（每个文件一个结果）
    pub async fn batch_import(
        &self,
        project_id: &str,
        file_paths: &[String],
    ) -> ApiResult<Vec<ImportResult>> {
        let (importer, _) = self.create_importer()?;
        let paths: Vec<PathBuf> = file_paths.iter().map(PathBuf::from).collect();
        Ok(importer.batch_import(project_id, paths).await)
    }

    /// 预览文件（列映射 + 校验汇总，不落库）
    pub async fn preview_file(&self, file_path: &str) -> ApiResult<ImportPreview> {
        let (importer, _) = self.create_importer()?;
        Ok(importer.preview_file(Path::new(file_path)).await?)
    }

    /// 查询导入批次审计记录
    pub async fn get_import_batch(&self, batch_id: &str) -> ApiResult<ImportBatch> {
        let (importer, _) = self.create_importer()?;
        importer
            .repository()
            .get_import_batch(batch_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("导入批次 {}", batch_id)))
    }

    /// 创建导入器实例（仓储与配置共享同一连接）
    fn create_importer(&self) -> ApiResult<(Importer, ConfigManager)> {
        let conn = open_sqlite_connection(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let repo = TakeoffImportRepositoryImpl::from_connection(conn.clone())?;
        let importer_config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::InternalError(format!("创建配置管理器失败: {}", e)))?;
        let api_config = ConfigManager::from_connection(conn)
            .map_err(|e| ApiError::InternalError(format!("创建配置管理器失败: {}", e)))?;

        let importer = TakeoffImporterImpl::new(repo, importer_config, Box::new(UniversalFileParser));
        Ok((importer, api_config))
    }
}

/// 请求体层面的失败（未进入导入流程，不写审计记录）
fn payload_failure(project_id: &str, err: ImportError) -> ImportResult {
    warn!(error = %err, "导入请求体无效");
    let kind = err.failure_kind();
    ImportResult::new(Uuid::new_v4().to_string(), project_id).into_failure(
        kind,
        err.to_string(),
        Vec::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FailureKind;

    #[test]
    fn test_status_for() {
        let mut ok = ImportResult::new("b1", "p1");
        ok.success = true;
        assert_eq!(status_for(&ok), 200);

        let payload = ImportResult::new("b2", "p1").into_failure(FailureKind::Payload, "x", vec![]);
        assert_eq!(status_for(&payload), 400);

        let persistence =
            ImportResult::new("b3", "p1").into_failure(FailureKind::Persistence, "x", vec![]);
        assert_eq!(status_for(&persistence), 500);
    }
}
