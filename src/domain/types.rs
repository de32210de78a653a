// ==========================================
// 管道材料导入系统 - 领域类型定义
// ==========================================
// 职责: 组件类型枚举、标识键策略、校验类别等基础类型
// 序列化格式: snake_case (与数据库 / 导入文件一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 组件类型 (Component Type)
// ==========================================
// 固定枚举: 导入文件中的 type 列必须落在此集合内
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Spool,         // 预制管段
    FieldWeld,     // 现场焊口
    Instrument,    // 仪表
    Pipe,          // 管道（按延米累计）
    ThreadedPipe,  // 螺纹管（按延米累计）
    Valve,         // 阀门
    Fitting,       // 管件
    Flange,        // 法兰
    Support,       // 支吊架
    Gasket,        // 垫片
    Tubing,        // 仪表管
    Hose,          // 软管
    MiscComponent, // 其他
}

impl ComponentType {
    pub const ALL: [ComponentType; 13] = [
        ComponentType::Spool,
        ComponentType::FieldWeld,
        ComponentType::Instrument,
        ComponentType::Pipe,
        ComponentType::ThreadedPipe,
        ComponentType::Valve,
        ComponentType::Fitting,
        ComponentType::Flange,
        ComponentType::Support,
        ComponentType::Gasket,
        ComponentType::Tubing,
        ComponentType::Hose,
        ComponentType::MiscComponent,
    ];

    /// 数据库 / 导入文件中的标准写法
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Spool => "spool",
            ComponentType::FieldWeld => "field_weld",
            ComponentType::Instrument => "instrument",
            ComponentType::Pipe => "pipe",
            ComponentType::ThreadedPipe => "threaded_pipe",
            ComponentType::Valve => "valve",
            ComponentType::Fitting => "fitting",
            ComponentType::Flange => "flange",
            ComponentType::Support => "support",
            ComponentType::Gasket => "gasket",
            ComponentType::Tubing => "tubing",
            ComponentType::Hose => "hose",
            ComponentType::MiscComponent => "misc_component",
        }
    }

    /// 解析导入文件中的类型文本
    ///
    /// 规则: TRIM + 小写，空格/连字符统一为下划线（"Field Weld" → field_weld）
    pub fn parse(raw: &str) -> Option<ComponentType> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        ComponentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
    }

    /// 组件类型 → 标识键策略
    ///
    /// 管道类（pipe / threaded_pipe）按延米累计到一条聚合记录，
    /// 其余离散类型按数量展开。
    pub fn key_strategy(&self) -> KeyStrategy {
        match self {
            ComponentType::Spool => KeyStrategy::Spool,
            ComponentType::FieldWeld => KeyStrategy::FieldWeld,
            ComponentType::Instrument => KeyStrategy::Instrument,
            ComponentType::Pipe | ComponentType::ThreadedPipe => KeyStrategy::Aggregate,
            ComponentType::Valve
            | ComponentType::Fitting
            | ComponentType::Flange
            | ComponentType::Support
            | ComponentType::Gasket
            | ComponentType::Tubing
            | ComponentType::Hose
            | ComponentType::MiscComponent => KeyStrategy::Exploded,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.key_strategy(), KeyStrategy::Aggregate)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 标识键策略 (Key Strategy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    Spool,      // 一条记录，键 = 管段号
    FieldWeld,  // 一条记录，键 = 焊口号
    Instrument, // 一条记录，seq 固定为 1
    Aggregate,  // 延米累计
    Exploded,   // 按数量展开 seq 1..=N
}

// ==========================================
// 校验类别 (Validation Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    UnsupportedType,
    ZeroQuantity,
    MissingRequiredField,
    DuplicateIdentityKey,
    EmptyDrawing,
    InvalidQuantity,
    MalformedData,
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationCategory::UnsupportedType => "unsupported_type",
            ValidationCategory::ZeroQuantity => "zero_quantity",
            ValidationCategory::MissingRequiredField => "missing_required_field",
            ValidationCategory::DuplicateIdentityKey => "duplicate_identity_key",
            ValidationCategory::EmptyDrawing => "empty_drawing",
            ValidationCategory::InvalidQuantity => "invalid_quantity",
            ValidationCategory::MalformedData => "malformed_data",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// 列映射匹配层级 (Match Tier)
// ==========================================
// 置信度: exact=100, case_insensitive=95, synonym=85
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    CaseInsensitive,
    Synonym,
}

impl MatchTier {
    pub fn confidence(&self) -> u8 {
        match self {
            MatchTier::Exact => 100,
            MatchTier::CaseInsensitive => 95,
            MatchTier::Synonym => 85,
        }
    }
}

// ==========================================
// 元数据维度 (Metadata Dimension)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataDimension {
    Area,        // 区域
    System,      // 系统
    TestPackage, // 试压包
}

impl MetadataDimension {
    pub const ALL: [MetadataDimension; 3] = [
        MetadataDimension::Area,
        MetadataDimension::System,
        MetadataDimension::TestPackage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataDimension::Area => "area",
            MetadataDimension::System => "system",
            MetadataDimension::TestPackage => "test_package",
        }
    }

    /// 维度对应的数据表
    pub fn table_name(&self) -> &'static str {
        match self {
            MetadataDimension::Area => "metadata_area",
            MetadataDimension::System => "metadata_system",
            MetadataDimension::TestPackage => "metadata_test_package",
        }
    }
}

impl fmt::Display for MetadataDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 导入失败类别 (Failure Kind)
// ==========================================
// 供调用方区分 HTTP 状态: payload/validation 属于用户错误，其余属于系统错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Payload,     // 请求结构错误 / 超限
    Validation,  // 行级校验错误
    Consistency, // 解析后数量不一致（缺陷信号）
    Persistence, // 批量写入失败
    Unexpected,  // 其他
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Payload => "payload",
            FailureKind::Validation => "validation",
            FailureKind::Consistency => "consistency",
            FailureKind::Persistence => "persistence",
            FailureKind::Unexpected => "unexpected",
        }
    }

    pub fn is_user_error(&self) -> bool {
        matches!(self, FailureKind::Payload | FailureKind::Validation)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
