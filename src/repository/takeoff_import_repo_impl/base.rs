use crate::db::open_sqlite_connection;
use crate::domain::component::{ComponentAttributes, ComponentRecord, Drawing};
use crate::domain::identity::IdentityKey;
use crate::domain::import::ImportBatch;
use crate::domain::types::ComponentType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};

/// IN (...) 查询每批最多绑定的名称数
pub(super) const QUERY_CHUNK: usize = 500;

pub(super) const COMPONENT_COLUMNS: &str = r#"
    id, project_id, component_type, drawing_id, identity_key_json, identity_key_str,
    area_id, system_id, test_package_id, attributes_json, current_milestones_json,
    progress_template_id, created_at
"#;

// ==========================================
// TakeoffImportRepositoryImpl
// ==========================================
pub struct TakeoffImportRepositoryImpl {
    pub(super) conn: Arc<Mutex<Connection>>,
}

impl TakeoffImportRepositoryImpl {
    /// 创建新的 Repository 实例（独立连接，并确保表结构存在）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 等共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
            crate::db::init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 开启写事务（BEGIN IMMEDIATE）
    ///
    /// 写锁在事务开始时获取，避免读锁升级写锁时的 SQLITE_BUSY
    pub(super) fn begin_immediate(conn: &Connection) -> RepositoryResult<Transaction<'_>> {
        Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    /// 在事务中插入单个组件（INSERT OR IGNORE）
    ///
    /// # 返回
    /// - 1: 已插入
    /// - 0: 同键未退役组件已存在
    pub(super) fn insert_component_tx(
        tx: &Transaction,
        component: &ComponentRecord,
    ) -> RepositoryResult<usize> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = tx.prepare_cached(
            r#"
            INSERT OR IGNORE INTO component (
                id, project_id, component_type, drawing_id, identity_key_json,
                identity_key_str, area_id, system_id, test_package_id,
                attributes_json, current_milestones_json, progress_template_id,
                created_at, updated_at, retired_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, NULL)
            "#,
        )?;

        let changed = stmt.execute(params![
            component.id,
            component.project_id,
            component.component_type.as_str(),
            component.drawing_id,
            serde_json::to_string(&component.identity_key)?,
            component.identity_key.canonical(),
            component.area_id,
            component.system_id,
            component.test_package_id,
            serde_json::to_string(&component.attributes)?,
            serde_json::to_string(&component.current_milestones)?,
            component.progress_template_id,
            component.created_at.to_rfc3339(),
            now,
        ])?;

        Ok(changed)
    }
}

/// 生成 ?start, ?start+1, ... 占位符
pub(super) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(super) fn parse_component_type(raw: &str) -> RepositoryResult<ComponentType> {
    ComponentType::parse(raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: "component_type".to_string(),
        message: format!("未知组件类型: {}", raw),
    })
}

pub(super) fn map_drawing(row: &Row) -> rusqlite::Result<Drawing> {
    Ok(Drawing {
        id: row.get(0)?,
        project_id: row.get(1)?,
        drawing_no_raw: row.get(2)?,
        drawing_no_norm: row.get(3)?,
        created_at: parse_timestamp(&row.get::<_, String>(4)?),
    })
}

// ==========================================
// ComponentRow - component 表原始行
// ==========================================
// JSON 列在 query_map 闭包外解析，以便返回 RepositoryError
pub(super) struct ComponentRow {
    id: String,
    project_id: String,
    component_type: String,
    drawing_id: String,
    identity_key_json: String,
    area_id: Option<String>,
    system_id: Option<String>,
    test_package_id: Option<String>,
    attributes_json: String,
    current_milestones_json: String,
    progress_template_id: Option<String>,
    created_at: String,
}

impl ComponentRow {
    /// 列顺序与 COMPONENT_COLUMNS 一致
    pub(super) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            component_type: row.get(2)?,
            drawing_id: row.get(3)?,
            identity_key_json: row.get(4)?,
            area_id: row.get(6)?,
            system_id: row.get(7)?,
            test_package_id: row.get(8)?,
            attributes_json: row.get(9)?,
            current_milestones_json: row.get(10)?,
            progress_template_id: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    pub(super) fn into_record(self) -> RepositoryResult<ComponentRecord> {
        let identity_key: IdentityKey = serde_json::from_str(&self.identity_key_json)?;
        let attributes: ComponentAttributes = serde_json::from_str(&self.attributes_json)?;
        let current_milestones: Map<String, Value> =
            serde_json::from_str(&self.current_milestones_json)?;

        Ok(ComponentRecord {
            id: self.id,
            project_id: self.project_id,
            component_type: parse_component_type(&self.component_type)?,
            drawing_id: self.drawing_id,
            identity_key,
            area_id: self.area_id,
            system_id: self.system_id,
            test_package_id: self.test_package_id,
            attributes,
            current_milestones,
            progress_template_id: self.progress_template_id,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

pub(super) fn map_import_batch(row: &Row) -> rusqlite::Result<ImportBatch> {
    Ok(ImportBatch {
        batch_id: row.get(0)?,
        project_id: row.get(1)?,
        source_name: row.get(2)?,
        total_rows: row.get(3)?,
        components_created: row.get(4)?,
        components_updated: row.get(5)?,
        components_skipped: row.get(6)?,
        success: row.get::<_, i64>(7)? != 0,
        error_message: row.get(8)?,
        elapsed_ms: row.get(9)?,
        imported_at: parse_timestamp(&row.get::<_, String>(10)?),
        result_json: row.get(11)?,
    })
}

/// 聚合管道属性合并: 延米累加、行号并集（保持先后顺序）
pub(super) fn merge_aggregate_attributes(
    existing: &mut ComponentAttributes,
    incoming: &ComponentAttributes,
) -> f64 {
    let total = existing.total_linear_feet.unwrap_or(0.0) + incoming.total_linear_feet.unwrap_or(0.0);
    existing.total_linear_feet = Some(total);

    let lines = existing.line_numbers.get_or_insert_with(Vec::new);
    for n in incoming.line_numbers.iter().flatten() {
        if !lines.contains(n) {
            lines.push(*n);
        }
    }

    total
}
