// ==========================================
// 管道材料导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{
    ImportConfigReader, DEFAULT_BATCH_RETENTION_DAYS, DEFAULT_COMPONENT_BATCH_SIZE,
    DEFAULT_MAX_COMPONENTS_PER_ROW, DEFAULT_MAX_IMPORT_COMPONENTS, DEFAULT_MAX_IMPORT_ROWS,
    DEFAULT_MAX_PAYLOAD_BYTES,
};
use crate::db::{init_schema, open_sqlite_connection};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            init_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取正整数配置，非法值回退默认值并记录告警
    fn get_usize_or_default(&self, key: &str, default: usize) -> ConfigResult<usize> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        match value.trim().parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %value,
                    default,
                    "配置值非法，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 写入导入批次审计记录，便于复盘当时的限额
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_import_rows(&self) -> ConfigResult<usize> {
        self.get_usize_or_default(config_keys::MAX_IMPORT_ROWS, DEFAULT_MAX_IMPORT_ROWS)
    }

    async fn get_max_payload_bytes(&self) -> ConfigResult<usize> {
        self.get_usize_or_default(config_keys::MAX_PAYLOAD_BYTES, DEFAULT_MAX_PAYLOAD_BYTES)
    }

    async fn get_max_components_per_row(&self) -> ConfigResult<usize> {
        self.get_usize_or_default(
            config_keys::MAX_COMPONENTS_PER_ROW,
            DEFAULT_MAX_COMPONENTS_PER_ROW,
        )
    }

    async fn get_max_import_components(&self) -> ConfigResult<usize> {
        self.get_usize_or_default(
            config_keys::MAX_IMPORT_COMPONENTS,
            DEFAULT_MAX_IMPORT_COMPONENTS,
        )
    }

    async fn get_component_batch_size(&self) -> ConfigResult<usize> {
        self.get_usize_or_default(
            config_keys::COMPONENT_BATCH_SIZE,
            DEFAULT_COMPONENT_BATCH_SIZE,
        )
    }

    async fn get_column_synonyms(&self) -> ConfigResult<HashMap<String, Vec<String>>> {
        let value = self.get_config_or_default(config_keys::COLUMN_SYNONYMS, "{}")?;
        let synonyms: HashMap<String, Vec<String>> = serde_json::from_str(&value)
            .unwrap_or_else(|_| {
                tracing::warn!(
                    config_key = config_keys::COLUMN_SYNONYMS,
                    raw_value = %value,
                    "列名同义词配置格式错误，使用内置同义词表"
                );
                HashMap::new()
            });
        Ok(synonyms)
    }

    async fn get_batch_retention_days(&self) -> ConfigResult<i32> {
        let value = self.get_config_or_default(
            config_keys::IMPORT_BATCH_RETENTION_DAYS,
            &DEFAULT_BATCH_RETENTION_DAYS.to_string(),
        )?;
        Ok(value.parse::<i32>().unwrap_or(DEFAULT_BATCH_RETENTION_DAYS))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入限额
    pub const MAX_IMPORT_ROWS: &str = "max_import_rows";
    pub const MAX_PAYLOAD_BYTES: &str = "max_payload_bytes";
    pub const MAX_COMPONENTS_PER_ROW: &str = "max_components_per_row"; // 单行展开上限
    pub const MAX_IMPORT_COMPONENTS: &str = "max_import_components"; // 单次导入展开总数上限

    // 批量写入
    pub const COMPONENT_BATCH_SIZE: &str = "component_batch_size";

    // 列映射
    pub const COLUMN_SYNONYMS: &str = "column_synonyms"; // 标准字段 → 别名 (JSON)

    // 审计
    pub const IMPORT_BATCH_RETENTION_DAYS: &str = "import_batch_retention_days";
}
