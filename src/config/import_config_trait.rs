// ==========================================
// 管道材料导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;

/// 默认最大行数
pub const DEFAULT_MAX_IMPORT_ROWS: usize = 10_000;
/// 默认请求体上限（5.5 MB）
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 5_767_168;
/// 默认组件批次大小
pub const DEFAULT_COMPONENT_BATCH_SIZE: usize = 500;
/// 默认单行展开组件数上限
pub const DEFAULT_MAX_COMPONENTS_PER_ROW: usize = 1_000;
/// 默认单次导入展开组件总数上限
pub const DEFAULT_MAX_IMPORT_COMPONENTS: usize = 50_000;
/// 默认导入批次保留天数
pub const DEFAULT_BATCH_RETENTION_DAYS: i32 = 90;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 单次导入允许的最大数据行数
    ///
    /// # 默认值
    /// - 10000
    async fn get_max_import_rows(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 请求体字节上限
    ///
    /// # 默认值
    /// - 5767168（5.5 MB）
    async fn get_max_payload_bytes(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 单行按数量展开后的组件数上限
    ///
    /// # 默认值
    /// - 1000
    async fn get_max_components_per_row(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 单次导入展开后的组件总数上限
    ///
    /// # 默认值
    /// - 50000
    async fn get_max_import_components(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 组件写入批次大小（每批一个事务）
    ///
    /// # 默认值
    /// - 500
    async fn get_component_batch_size(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 列名同义词扩展（标准字段 → 别名列表）
    ///
    /// # 返回
    /// - HashMap<String, Vec<String>>: 如 {"drawing": ["ISO", "Sheet"]}
    ///
    /// # 默认值
    /// - {}（仅使用内置同义词表）
    async fn get_column_synonyms(
        &self,
    ) -> Result<HashMap<String, Vec<String>>, Box<dyn Error + Send + Sync>>;

    /// 导入批次审计记录保留天数
    ///
    /// # 默认值
    /// - 90
    async fn get_batch_retention_days(&self) -> Result<i32, Box<dyn Error + Send + Sync>>;
}

// ==========================================
// ImportLimits - 单次导入的配置快照
// ==========================================
// 每次导入开始时读取一次，整个流程使用同一份值
#[derive(Debug, Clone, PartialEq)]
pub struct ImportLimits {
    pub max_import_rows: usize,
    pub max_payload_bytes: usize,
    pub max_components_per_row: usize,
    pub max_import_components: usize,
    pub component_batch_size: usize,
    pub column_synonyms: HashMap<String, Vec<String>>,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_import_rows: DEFAULT_MAX_IMPORT_ROWS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_components_per_row: DEFAULT_MAX_COMPONENTS_PER_ROW,
            max_import_components: DEFAULT_MAX_IMPORT_COMPONENTS,
            component_batch_size: DEFAULT_COMPONENT_BATCH_SIZE,
            column_synonyms: HashMap::new(),
        }
    }
}

impl ImportLimits {
    /// 从配置读取器加载快照
    pub async fn load(
        reader: &dyn ImportConfigReader,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            max_import_rows: reader.get_max_import_rows().await?,
            max_payload_bytes: reader.get_max_payload_bytes().await?,
            max_components_per_row: reader.get_max_components_per_row().await?,
            max_import_components: reader.get_max_import_components().await?,
            // 批次大小为 0 时退回默认值，避免 chunks(0) panic
            component_batch_size: match reader.get_component_batch_size().await? {
                0 => DEFAULT_COMPONENT_BATCH_SIZE,
                n => n,
            },
            column_synonyms: reader.get_column_synonyms().await?,
        })
    }
}
