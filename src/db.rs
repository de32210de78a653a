// ==========================================
// 管道材料导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 / busy_timeout）
// - 并发导入时由 busy_timeout 吸收写锁竞争
// - 建表幂等（CREATE ... IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 唯一约束即并发导入的最后防线:
/// - drawing: (project_id, drawing_no_norm)
/// - metadata_*: (project_id, name)
/// - component: (project_id, component_type, identity_key_str)，仅约束未退役组件
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS drawing (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            drawing_no_raw TEXT NOT NULL,
            drawing_no_norm TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (project_id, drawing_no_norm)
        );

        CREATE TABLE IF NOT EXISTS metadata_area (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (project_id, name)
        );

        CREATE TABLE IF NOT EXISTS metadata_system (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (project_id, name)
        );

        CREATE TABLE IF NOT EXISTS metadata_test_package (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (project_id, name)
        );

        CREATE TABLE IF NOT EXISTS progress_template (
            component_type TEXT PRIMARY KEY,
            template_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS component (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            component_type TEXT NOT NULL,
            drawing_id TEXT NOT NULL REFERENCES drawing(id),
            identity_key_json TEXT NOT NULL,
            identity_key_str TEXT NOT NULL,
            area_id TEXT REFERENCES metadata_area(id),
            system_id TEXT REFERENCES metadata_system(id),
            test_package_id TEXT REFERENCES metadata_test_package(id),
            attributes_json TEXT NOT NULL,
            current_milestones_json TEXT NOT NULL,
            progress_template_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            retired_at TEXT
        );

        CREATE UNIQUE INDEX IF NOT EXISTS ux_component_identity
            ON component (project_id, component_type, identity_key_str)
            WHERE retired_at IS NULL;

        CREATE INDEX IF NOT EXISTS ix_component_drawing
            ON component (drawing_id);

        CREATE TABLE IF NOT EXISTS import_batch (
            batch_id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            source_name TEXT,
            total_rows INTEGER NOT NULL,
            components_created INTEGER NOT NULL,
            components_updated INTEGER NOT NULL,
            components_skipped INTEGER NOT NULL,
            success INTEGER NOT NULL,
            error_message TEXT,
            elapsed_ms INTEGER NOT NULL,
            imported_at TEXT NOT NULL,
            result_json TEXT
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先级: TAKEOFF_IMPORT_DB_PATH → {data_dir}/takeoff-import/takeoff_import.db → ./takeoff_import.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("TAKEOFF_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./takeoff_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("takeoff-import");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("takeoff_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
