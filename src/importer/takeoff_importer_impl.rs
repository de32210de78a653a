// ==========================================
// 管道材料导入系统 - Takeoff 导入器实现
// ==========================================
// 职责: 整合导入流程，从请求 / 文件到数据库
// 流程: 限额 → 列映射 → 行校验 → 标识键 → 元数据 → 图纸 → 去重 → 分批落库 → 聚合合并
// 红线:
// - 任一行校验错误 → 整批拒绝，不写入任何组件
// - 组件批次逐个提交；失败时报告批次序号与已提交数量，不做补偿回滚
// - 所有失败以 ImportResult(success=false) 返回，不向调用方抛出
// ==========================================

use crate::config::{ImportConfigReader, ImportLimits};
use crate::domain::component::{
    initial_milestones, AggregateMergeOutcome, ComponentAttributes, ComponentRecord, Drawing,
};
use crate::domain::identity::IdentityKey;
use crate::domain::import::{
    ImportBatch, ImportIssue, ImportPreview, ImportRequest, ImportResult, MetadataLookupMaps,
    MetadataToCreate,
};
use crate::domain::takeoff::{
    ColumnMappingResult, ParsedRow, RawTakeoffRow, ValidationResult, ValidationSummary,
};
use crate::domain::types::{ComponentType, MetadataDimension};
use crate::importer::aggregate_merger::{merge_intra_batch, AggregateDraft};
use crate::importer::column_mapper::{collect_row_keys, ColumnMapper};
use crate::importer::duplicate_filter::{partition_against_existing, referenced_types};
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::identity_resolver::{resolve_rows, ResolvedRow};
use crate::importer::metadata_resolver::{collect_metadata_names, resolve_all};
use crate::importer::row_validator::{ComponentLimits, RowValidator};
use crate::importer::takeoff_importer_trait::{FileParser, TakeoffImporter};
use crate::repository::TakeoffImportRepository;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// TakeoffImporterImpl - Takeoff 导入器实现
// ==========================================
pub struct TakeoffImporterImpl<R, C>
where
    R: TakeoffImportRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    import_repo: R,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    row_validator: RowValidator,
}

impl<R, C> TakeoffImporterImpl<R, C>
where
    R: TakeoffImportRepository,
    C: ImportConfigReader,
{
    /// 创建新的 TakeoffImporter 实例
    ///
    /// # 参数
    /// - import_repo: 导入数据仓储
    /// - config: 配置读取器
    /// - file_parser: 文件解析器
    pub fn new(import_repo: R, config: C, file_parser: Box<dyn FileParser>) -> Self {
        Self {
            import_repo,
            config,
            file_parser,
            row_validator: RowValidator::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.import_repo
    }
}

#[async_trait::async_trait]
impl<R, C> TakeoffImporter for TakeoffImporterImpl<R, C>
where
    R: TakeoffImportRepository + Send + Sync,
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, request), fields(project_id = %request.project_id))]
    async fn import_request(&self, request: ImportRequest) -> ImportResult {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        info!(batch_id = %batch_id, rows = request.rows.len(), "开始导入结构化请求");

        let source_name = request.source_name.clone();
        let mut result = ImportResult::new(&batch_id, &request.project_id);
        let outcome = self.run_request(request, &mut result).await;

        self.finish(result, outcome, start_time, source_name).await
    }

    #[instrument(skip(self, file_path), fields(project_id = %project_id))]
    async fn import_file(&self, project_id: &str, file_path: &Path) -> ImportResult {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let file_path_str = file_path.display().to_string();
        info!(batch_id = %batch_id, file_path = %file_path_str, "开始导入文件");

        let mut result = ImportResult::new(&batch_id, project_id);
        let outcome = self.run_file(project_id, file_path, &mut result).await;

        self.finish(result, outcome, start_time, Some(file_path_str))
            .await
    }

    #[instrument(skip(self, file_path))]
    async fn preview_file(&self, file_path: &Path) -> ImporterResult<ImportPreview> {
        let limits = self.load_limits().await?;
        let data = self.file_parser.parse(file_path)?;
        let mapper = ColumnMapper::with_extra_synonyms(&limits.column_synonyms);
        let mapping = mapper.detect(&data.headers);

        let raw_rows: Vec<RawTakeoffRow> = data
            .rows
            .iter()
            .map(|row| mapper.apply_to_row(&mapping.mappings, &data.headers, row))
            .collect();
        let validation = self
            .row_validator
            .validate_all(&raw_rows, ComponentLimits::from(&limits))?;

        debug!(
            total_rows = data.row_count(),
            valid = validation.valid_count,
            errors = validation.error_count,
            "文件预览完成"
        );

        Ok(ImportPreview {
            total_rows: data.row_count(),
            mapping,
            validation,
        })
    }

    async fn batch_import(&self, project_id: &str, file_paths: Vec<PathBuf>) -> Vec<ImportResult> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        // 为每个文件创建导入任务
        let import_tasks = file_paths.iter().map(|path| async move {
            let result = self.import_file(project_id, path).await;
            if result.success {
                info!(file = %path.display(), created = result.components_created, "文件导入成功");
            } else {
                error!(
                    file = %path.display(),
                    error = result.error.as_deref().unwrap_or(""),
                    "文件导入失败"
                );
            }
            result
        });

        // 并发执行所有导入任务
        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.success).count(),
            failed = results.iter().filter(|r| !r.success).count(),
            "批量导入完成"
        );

        results
    }
}

// 辅助方法
impl<R, C> TakeoffImporterImpl<R, C>
where
    R: TakeoffImportRepository,
    C: ImportConfigReader,
{
    async fn load_limits(&self) -> ImporterResult<ImportLimits> {
        ImportLimits::load(&self.config)
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "import_limits".to_string(),
                message: e.to_string(),
            })
    }

    /// 结构化请求: 限额 → 列映射 → 共用流程
    async fn run_request(
        &self,
        request: ImportRequest,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        if request.project_id.trim().is_empty() {
            return Err(ImportError::MalformedRequest("缺少 projectId".to_string()));
        }

        let limits = self.load_limits().await?;

        // === 步骤 1: 限额检查 ===
        debug!("步骤 1: 限额检查");
        let payload_len = serde_json::to_vec(&request.rows)?.len();
        if payload_len > limits.max_payload_bytes {
            return Err(ImportError::PayloadTooLarge {
                actual: payload_len,
                limit: limits.max_payload_bytes,
            });
        }
        result.rows_total = request.rows.len();
        self.row_validator
            .check_row_limit(request.rows.len(), limits.max_import_rows)?;

        // === 步骤 2: 列映射 ===
        debug!("步骤 2: 列映射");
        let mapper = ColumnMapper::with_extra_synonyms(&limits.column_synonyms);
        let row_keys = collect_row_keys(&request.rows);
        let mapping = if request.column_mappings.is_empty() {
            mapper.detect(&row_keys)
        } else {
            mapper.from_provided(&request.column_mappings, &row_keys)
        };
        ensure_required_columns(&mapping)?;

        let raw_rows: Vec<RawTakeoffRow> = request
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| mapper.apply_to_object(&mapping.mappings, idx + 1, row))
            .collect();

        self.import_raw_rows(&request.project_id, &raw_rows, &request.metadata, &limits, result)
            .await
    }

    /// 文件: 解析 → 限额 → 列检测 → 共用流程
    async fn run_file(
        &self,
        project_id: &str,
        file_path: &Path,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        if project_id.trim().is_empty() {
            return Err(ImportError::MalformedRequest("缺少 projectId".to_string()));
        }

        let limits = self.load_limits().await?;

        // === 步骤 0: 文件大小检查（解析前） ===
        // 文件不存在时交由解析器报告 FileNotFound
        if let Ok(metadata) = std::fs::metadata(file_path) {
            let file_len = metadata.len() as usize;
            if file_len > limits.max_payload_bytes {
                return Err(ImportError::PayloadTooLarge {
                    actual: file_len,
                    limit: limits.max_payload_bytes,
                });
            }
        }

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let data = self.file_parser.parse(file_path)?;
        info!(total_rows = data.row_count(), byte_len = data.byte_len, "文件解析完成");

        result.rows_total = data.row_count();
        self.row_validator
            .check_row_limit(data.row_count(), limits.max_import_rows)?;

        let mapper = ColumnMapper::with_extra_synonyms(&limits.column_synonyms);
        let mapping = mapper.detect(&data.headers);
        ensure_required_columns(&mapping)?;

        let raw_rows: Vec<RawTakeoffRow> = data
            .rows
            .iter()
            .map(|row| mapper.apply_to_row(&mapping.mappings, &data.headers, row))
            .collect();

        self.import_raw_rows(
            project_id,
            &raw_rows,
            &MetadataToCreate::default(),
            &limits,
            result,
        )
        .await
    }

    /// 共用流程: 校验 → 元数据 → 图纸 → 组件
    async fn import_raw_rows(
        &self,
        project_id: &str,
        raw_rows: &[RawTakeoffRow],
        declared_metadata: &MetadataToCreate,
        limits: &ImportLimits,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        // === 步骤 3: 行校验 ===
        debug!("步骤 3: 行校验");
        let summary = self
            .row_validator
            .validate_all(raw_rows, ComponentLimits::from(limits))?;
        result.rows_skipped = summary.skipped_count;
        result.warnings = collect_issues(&summary, ValidationResult::is_skipped);
        info!(
            valid = summary.valid_count,
            skipped = summary.skipped_count,
            errors = summary.error_count,
            "行校验完成"
        );

        if !summary.can_import {
            result.details = collect_issues(&summary, ValidationResult::is_error);
            return Err(ImportError::ValidationFailed {
                error_rows: summary.error_count,
            });
        }

        // === 步骤 4: 标识键解析 ===
        let valid_rows = summary.valid_rows();
        let resolved = resolve_rows(&valid_rows);

        // === 步骤 5: 元数据解析 ===
        debug!("步骤 5: 元数据解析");
        let names = collect_metadata_names(declared_metadata, &valid_rows);
        let (lookup, created_counts) = resolve_all(&self.import_repo, project_id, &names).await?;
        result.metadata_created = created_counts;

        // === 步骤 6: 图纸解析 ===
        debug!("步骤 6: 图纸解析");
        let drawing_ids = self.resolve_drawings(project_id, &resolved, result).await?;

        // === 步骤 7: 进度模板 ===
        let templates = self.import_repo.get_progress_template_ids().await?;

        // === 步骤 8: 组件落库 ===
        let context = BuildContext {
            project_id,
            drawing_ids: &drawing_ids,
            lookup: &lookup,
            templates: &templates,
        };
        self.insert_components(&context, &resolved, limits.component_batch_size, result)
            .await?;
        self.merge_aggregates(&context, &resolved, result).await?;

        Ok(())
    }

    /// 图纸: 查已存在 → 插入缺失 → 全量重查 → 数量核对
    ///
    /// # 返回
    /// - 规范化图号 → 图纸 id
    async fn resolve_drawings(
        &self,
        project_id: &str,
        rows: &[ResolvedRow],
        result: &mut ImportResult,
    ) -> ImporterResult<HashMap<String, String>> {
        // 规范化图号 → 首次出现的原始写法
        let mut first_seen: Vec<(String, String)> = Vec::new();
        let mut seen = HashSet::new();
        for row in rows {
            if seen.insert(row.drawing_norm.clone()) {
                first_seen.push((row.drawing_norm.clone(), row.row.drawing.clone()));
            }
        }
        if first_seen.is_empty() {
            return Ok(HashMap::new());
        }

        let norms: Vec<String> = first_seen.iter().map(|(norm, _)| norm.clone()).collect();
        let existing = self
            .import_repo
            .find_drawings_by_norms(project_id, &norms)
            .await?;
        let existing_norms: HashSet<&str> =
            existing.iter().map(|d| d.drawing_no_norm.as_str()).collect();

        let now = Utc::now();
        let missing: Vec<Drawing> = first_seen
            .iter()
            .filter(|(norm, _)| !existing_norms.contains(norm.as_str()))
            .map(|(norm, raw)| Drawing {
                id: Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                drawing_no_raw: raw.clone(),
                drawing_no_norm: norm.clone(),
                created_at: now,
            })
            .collect();

        let created = if missing.is_empty() {
            0
        } else {
            self.import_repo.insert_drawings_ignore(&missing).await?
        };

        let fetched = self
            .import_repo
            .find_drawings_by_norms(project_id, &norms)
            .await?;
        if fetched.len() != norms.len() {
            return Err(ImportError::DrawingCountMismatch {
                requested: norms.len(),
                fetched: fetched.len(),
            });
        }

        result.drawings_created = created;
        result.drawings_reused = norms.len() - created;
        info!(created, reused = result.drawings_reused, "图纸解析完成");

        Ok(fetched
            .into_iter()
            .map(|d| (d.drawing_no_norm, d.id))
            .collect())
    }

    /// 非聚合组件: 库内去重 → 分批 INSERT OR IGNORE
    async fn insert_components(
        &self,
        context: &BuildContext<'_>,
        rows: &[ResolvedRow],
        batch_size: usize,
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        let mut components = Vec::new();
        for row in rows.iter().filter(|r| !r.component_type().is_aggregate()) {
            for key in &row.keys {
                components.push(context.build(row, key.clone(), row_attributes(&row.row))?);
            }
        }
        if components.is_empty() {
            return Ok(());
        }

        let existing = self
            .import_repo
            .list_identity_keys(context.project_id, &referenced_types(&components))
            .await?;
        let partition = partition_against_existing(components, &existing);
        result.components_skipped += partition.skipped_existing;
        debug!(
            to_insert = partition.to_insert.len(),
            skipped = partition.skipped_existing,
            "库内去重完成"
        );

        let mut committed = 0;
        for (batch_index, chunk) in partition.to_insert.chunks(batch_size.max(1)).enumerate() {
            match self.import_repo.insert_components_batch(chunk).await {
                Ok(inserted_by_type) => {
                    let inserted: usize = inserted_by_type.values().sum();
                    for (component_type, count) in inserted_by_type {
                        result.record_created(component_type, count);
                    }
                    // 并发导入抢先写入的键
                    result.components_skipped += chunk.len() - inserted;
                    committed += inserted;
                    debug!(batch_index, inserted, "组件批次提交完成");
                }
                Err(e) => {
                    error!(batch_index, committed, error = %e, "组件批次写入失败");
                    return Err(ImportError::BatchInsertFailed {
                        batch_index,
                        committed,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(created = committed, "组件写入完成");
        Ok(())
    }

    /// 聚合管道: 批内合并 → 逐条与库内状态合并
    async fn merge_aggregates(
        &self,
        context: &BuildContext<'_>,
        rows: &[ResolvedRow],
        result: &mut ImportResult,
    ) -> ImporterResult<()> {
        for draft in merge_intra_batch(rows) {
            let pipe_id = draft.identity_key.canonical();
            let component = context.build_aggregate(&draft)?;

            match self.import_repo.merge_aggregate(&component).await {
                Ok(AggregateMergeOutcome::Created { .. }) => {
                    result.record_created(draft.component_type, 1);
                }
                Ok(AggregateMergeOutcome::Updated {
                    total_linear_feet, ..
                }) => {
                    result.components_updated += 1;
                    debug!(pipe_id = %pipe_id, total_linear_feet, "聚合管道已累加");
                }
                Err(e) => {
                    error!(pipe_id = %pipe_id, error = %e, "聚合管道合并失败");
                    return Err(ImportError::AggregateMergeFailed {
                        pipe_id,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 收尾: 耗时、失败转换、批次审计（尽力而为）
    async fn finish(
        &self,
        mut result: ImportResult,
        outcome: ImporterResult<()>,
        start_time: Instant,
        source_name: Option<String>,
    ) -> ImportResult {
        result.elapsed_ms = start_time.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(()) => {
                result.success = true;
                info!(
                    batch_id = %result.batch_id,
                    created = result.components_created,
                    updated = result.components_updated,
                    skipped = result.components_skipped,
                    elapsed_ms = result.elapsed_ms,
                    "导入完成"
                );
                result
            }
            Err(e) => {
                let kind = e.failure_kind();
                warn!(batch_id = %result.batch_id, failure_kind = %kind, error = %e, "导入失败");
                let details = std::mem::take(&mut result.details);
                result.into_failure(kind, e.to_string(), details)
            }
        };

        self.record_batch(&result, source_name).await;
        result
    }

    async fn record_batch(&self, result: &ImportResult, source_name: Option<String>) {
        let batch = ImportBatch::from_result(result, source_name);
        if let Err(e) = self.import_repo.insert_import_batch(&batch).await {
            warn!(batch_id = %result.batch_id, error = %e, "导入批次记录写入失败");
            return;
        }

        match self.config.get_batch_retention_days().await {
            Ok(days) if days > 0 => match self.import_repo.purge_import_batches(days).await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "已清理过期导入批次"),
                Err(e) => warn!(error = %e, "导入批次清理失败"),
            },
            Ok(_) => {}
            Err(e) => warn!(error = %e, "读取批次保留天数失败"),
        }
    }
}

// ==========================================
// BuildContext - 组件构造所需的查找表
// ==========================================
struct BuildContext<'a> {
    project_id: &'a str,
    drawing_ids: &'a HashMap<String, String>,
    lookup: &'a MetadataLookupMaps,
    templates: &'a HashMap<ComponentType, String>,
}

impl BuildContext<'_> {
    fn build(
        &self,
        row: &ResolvedRow,
        identity_key: IdentityKey,
        attributes: ComponentAttributes,
    ) -> ImporterResult<ComponentRecord> {
        let component_type = row.component_type();
        let drawing_id = self
            .drawing_ids
            .get(&row.drawing_norm)
            .cloned()
            .ok_or_else(|| ImportError::UnresolvedDrawing(row.drawing_norm.clone()))?;

        let progress_template_id = self.templates.get(&component_type).cloned();
        if progress_template_id.is_none() {
            warn!(component_type = %component_type, "未找到进度模板，组件不关联模板");
        }

        let parsed = &row.row;
        Ok(ComponentRecord {
            id: Uuid::new_v4().to_string(),
            project_id: self.project_id.to_string(),
            component_type,
            drawing_id,
            identity_key,
            area_id: self.lookup.resolve(MetadataDimension::Area, parsed.area.as_deref()),
            system_id: self
                .lookup
                .resolve(MetadataDimension::System, parsed.system.as_deref()),
            test_package_id: self
                .lookup
                .resolve(MetadataDimension::TestPackage, parsed.test_package.as_deref()),
            attributes,
            current_milestones: initial_milestones(component_type),
            progress_template_id,
            created_at: Utc::now(),
        })
    }

    fn build_aggregate(&self, draft: &AggregateDraft) -> ImporterResult<ComponentRecord> {
        let row = ResolvedRow {
            row: draft.first_row.clone(),
            drawing_norm: draft.drawing_norm.clone(),
            size_norm: String::new(),
            keys: Vec::new(),
        };
        let attributes = ComponentAttributes {
            total_linear_feet: Some(draft.total_linear_feet),
            line_numbers: Some(draft.line_numbers.clone()),
            ..row_attributes(&draft.first_row)
        };
        self.build(&row, draft.identity_key.clone(), attributes)
    }
}

fn row_attributes(row: &ParsedRow) -> ComponentAttributes {
    ComponentAttributes {
        spec: row.spec.clone(),
        description: row.description.clone(),
        size: row.size.clone(),
        commodity_code: row.commodity_code.clone(),
        comments: row.comments.clone(),
        original_qty: row.qty,
        unmapped_fields: row.unmapped_fields.clone(),
        total_linear_feet: None,
        line_numbers: None,
    }
}

fn ensure_required_columns(mapping: &ColumnMappingResult) -> ImporterResult<()> {
    if mapping.has_all_required_fields {
        return Ok(());
    }
    let missing = mapping
        .missing_required
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ImportError::MissingRequiredColumns(missing))
}

fn collect_issues(
    summary: &ValidationSummary,
    keep: fn(&ValidationResult) -> bool,
) -> Vec<ImportIssue> {
    summary
        .results
        .iter()
        .filter(|r| keep(r))
        .filter_map(|r| match r {
            ValidationResult::Skipped {
                row_number,
                reason,
                category,
                drawing,
            }
            | ValidationResult::Error {
                row_number,
                reason,
                category,
                drawing,
            } => Some(ImportIssue {
                row: *row_number,
                issue: reason.clone(),
                drawing: drawing.clone(),
                category: Some(*category),
            }),
            ValidationResult::Valid { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::domain::types::FailureKind;
    use crate::importer::file_parser::UniversalFileParser;
    use crate::repository::TakeoffImportRepositoryImpl;
    use rusqlite::Connection;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn importer() -> TakeoffImporterImpl<TakeoffImportRepositoryImpl, ConfigManager> {
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let repo = TakeoffImportRepositoryImpl::from_connection(conn.clone()).unwrap();
        let config = ConfigManager::from_connection(conn).unwrap();
        TakeoffImporterImpl::new(repo, config, Box::new(UniversalFileParser))
    }

    fn request(rows: Vec<serde_json::Value>) -> ImportRequest {
        ImportRequest {
            project_id: "p1".to_string(),
            rows,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_valve_qty_two_creates_two_components() {
        let importer = importer();
        let result = importer
            .import_request(request(vec![json!({
                "Drawing": "P-001", "Type": "Valve", "QTY": 2, "Cmdty Code": "V100"
            })]))
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.components_created, 2);
        assert_eq!(result.components_by_type.get(&ComponentType::Valve), Some(&2));
        assert_eq!(result.drawings_created, 1);
    }

    #[tokio::test]
    async fn test_missing_required_column_is_payload_failure() {
        let importer = importer();
        let result = importer
            .import_request(request(vec![json!({"Drawing": "P-001", "Type": "Valve"})]))
            .await;

        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::Payload));
        assert_eq!(importer.repository().count_components("p1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_row_details() {
        let importer = importer();
        let result = importer
            .import_request(request(vec![
                json!({"Drawing": "P-001", "Type": "Valve", "QTY": 1, "Cmdty Code": "V100"}),
                json!({"Drawing": "P-001", "Type": "Valve", "QTY": -1, "Cmdty Code": "V200"}),
            ]))
            .await;

        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::Validation));
        assert_eq!(result.details.len(), 1);
        assert_eq!(result.details[0].row, 2);
        assert_eq!(importer.repository().count_components("p1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_recorded_for_audit() {
        let importer = importer();
        let result = importer
            .import_request(request(vec![json!({
                "Drawing": "P-001", "Type": "Gasket", "QTY": 1, "Cmdty Code": "G1"
            })]))
            .await;

        let batch = importer
            .repository()
            .get_import_batch(&result.batch_id)
            .await
            .unwrap()
            .unwrap();
        assert!(batch.success);
        assert_eq!(batch.components_created, 1);
    }
}
