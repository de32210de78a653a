// ==========================================
// 管道材料导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、标识键
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod component;
pub mod identity;
pub mod import;
pub mod takeoff;
pub mod types;

// 重导出核心类型
pub use component::{
    initial_milestones, AggregateMergeOutcome, ComponentAttributes, ComponentRecord, Drawing,
    MetadataRecord, MilestoneKind,
};
pub use identity::IdentityKey;
pub use import::{
    ImportBatch, ImportIssue, ImportPreview, ImportRequest, ImportResult, MetadataCreatedCounts,
    MetadataLookupMaps, MetadataToCreate,
};
pub use takeoff::{
    CanonicalField, ColumnMapping, ColumnMappingResult, ParsedRow, RawTakeoffRow,
    ValidationResult, ValidationSummary,
};
pub use types::{
    ComponentType, FailureKind, KeyStrategy, MatchTier, MetadataDimension, ValidationCategory,
};
