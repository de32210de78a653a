// ==========================================
// 管道材料导入系统 - Takeoff 导入 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: 所有写入均为 insert-or-ignore 或单事务读改写，可被多个导入并发调用
// ==========================================

use crate::domain::component::{AggregateMergeOutcome, ComponentRecord, Drawing, MetadataRecord};
use crate::domain::import::ImportBatch;
use crate::domain::types::{ComponentType, MetadataDimension};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

// ==========================================
// TakeoffImportRepository Trait
// ==========================================
// 实现者: TakeoffImportRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait TakeoffImportRepository: Send + Sync {
    // ===== 元数据维度 =====

    /// 按名称查询已存在的元数据记录
    async fn find_metadata_by_names(
        &self,
        project_id: &str,
        dimension: MetadataDimension,
        names: &[String],
    ) -> RepositoryResult<Vec<MetadataRecord>>;

    /// 插入元数据（INSERT OR IGNORE）
    ///
    /// # 返回
    /// - Ok(usize): 实际新插入的条数（被并发导入抢先的不计入）
    async fn insert_metadata_ignore(
        &self,
        project_id: &str,
        dimension: MetadataDimension,
        names: &[String],
    ) -> RepositoryResult<usize>;

    // ===== 图纸 =====

    /// 按规范化图号查询已存在的图纸
    async fn find_drawings_by_norms(
        &self,
        project_id: &str,
        norms: &[String],
    ) -> RepositoryResult<Vec<Drawing>>;

    /// 插入图纸（INSERT OR IGNORE，单事务）
    async fn insert_drawings_ignore(&self, drawings: &[Drawing]) -> RepositoryResult<usize>;

    // ===== 组件 =====

    /// 查询项目内指定类型的未退役组件标识键（规范字符串）
    async fn list_identity_keys(
        &self,
        project_id: &str,
        component_types: &[ComponentType],
    ) -> RepositoryResult<HashSet<(ComponentType, String)>>;

    /// 批量插入组件（INSERT OR IGNORE，单事务）
    ///
    /// # 返回
    /// - Ok(类型 → 实际插入条数): 与输入的差额为并发导入已写入的重复键
    /// - Err: 整个批次回滚
    async fn insert_components_batch(
        &self,
        components: &[ComponentRecord],
    ) -> RepositoryResult<HashMap<ComponentType, usize>>;

    /// 聚合管道合并（BEGIN IMMEDIATE 读改写）
    ///
    /// - 不存在: 插入新组件（里程碑为初值）
    /// - 已存在: 仅累加 total_linear_feet、合并 line_numbers，不触碰里程碑
    async fn merge_aggregate(
        &self,
        component: &ComponentRecord,
    ) -> RepositoryResult<AggregateMergeOutcome>;

    /// 按 (项目, 类型, 规范键) 查询未退役组件
    async fn find_component_by_key(
        &self,
        project_id: &str,
        component_type: ComponentType,
        identity_key_str: &str,
    ) -> RepositoryResult<Option<ComponentRecord>>;

    /// 项目内全部未退役组件（按创建时间、id 排序）
    async fn list_components(&self, project_id: &str) -> RepositoryResult<Vec<ComponentRecord>>;

    /// 退役组件（供外部子系统使用；退役后同键可再次导入）
    async fn retire_component(&self, component_id: &str) -> RepositoryResult<()>;

    // ===== 进度模板 =====

    /// 组件类型 → 进度模板 id
    async fn get_progress_template_ids(&self) -> RepositoryResult<HashMap<ComponentType, String>>;

    // ===== 导入批次审计 =====

    async fn insert_import_batch(&self, batch: &ImportBatch) -> RepositoryResult<()>;

    async fn get_import_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>>;

    /// 清理超过保留天数的审计记录
    async fn purge_import_batches(&self, retention_days: i32) -> RepositoryResult<usize>;

    // ===== 统计 =====

    async fn count_components(&self, project_id: &str) -> RepositoryResult<usize>;

    async fn count_drawings(&self, project_id: &str) -> RepositoryResult<usize>;

    async fn count_metadata(
        &self,
        project_id: &str,
        dimension: MetadataDimension,
    ) -> RepositoryResult<usize>;
}
