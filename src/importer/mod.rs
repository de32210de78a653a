// ==========================================
// 管道材料导入系统 - 导入层
// ==========================================
// 职责: 材料清单（Takeoff）导入，生成图纸 / 元数据 / 组件
// 支持: 结构化 JSON 请求, Excel, CSV
// ==========================================

// 模块声明
pub mod aggregate_merger;
pub mod column_mapper;
pub mod data_cleaner;
pub mod duplicate_filter;
pub mod error;
pub mod file_parser;
pub mod identity_resolver;
pub mod metadata_resolver;
pub mod row_validator;
pub mod takeoff_importer_impl;
pub mod takeoff_importer_trait;

// 重导出核心类型
pub use column_mapper::ColumnMapper;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImporterResult};
pub use file_parser::{CsvParser, ExcelParser, TabularData, UniversalFileParser};
pub use row_validator::{ComponentLimits, RowValidator};
pub use takeoff_importer_impl::TakeoffImporterImpl;

// 重导出 Trait 接口
pub use takeoff_importer_trait::{DataCleaner, FileParser, TakeoffImporter};
