// ==========================================
// 管道材料导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 材料清单（Takeoff）导入与组件标识键解析
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 导入接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ComponentType, FailureKind, MetadataDimension, ValidationCategory};

// 领域实体
pub use domain::{ComponentRecord, Drawing, IdentityKey, ImportRequest, ImportResult};

// 导入器
pub use importer::{TakeoffImporter, TakeoffImporterImpl};

// API
pub use api::ImportApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "管道材料导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
