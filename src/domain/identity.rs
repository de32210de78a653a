// ==========================================
// 管道材料导入系统 - 组件标识键
// ==========================================
// 职责: 按组件类型族区分的标识键（和类型），用于去重与幂等重导
// 红线: 同一项目内未退役组件的 (类型, 标识键) 不可重复
// ==========================================

use crate::domain::types::KeyStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 离散组件展开序号的渲染宽度（001, 002, ...）
pub const SEQ_PAD_WIDTH: usize = 3;

/// 聚合管道标识后缀
pub const AGGREGATE_SUFFIX: &str = "AGG";

// ==========================================
// IdentityKey - 组件标识键
// ==========================================
// 形态完全由组件类型决定:
// - Standard: 通用离散组件，seq 区分同图同编码的多个实例
// - Spool / FieldWeld: 一条记录，与数量无关
// - Instrument: 不展开，序号固定为 1
// - Aggregate: 管道延米累计，pipe_id = "{图号}-{尺寸}-{编码}-AGG"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityKey {
    Standard {
        drawing_norm: String,
        commodity_code: String,
        size: String,
        seq: u32,
    },
    Spool {
        spool_id: String,
    },
    FieldWeld {
        weld_number: String,
    },
    Instrument {
        drawing_norm: String,
        commodity_code: String,
        size: String,
    },
    Aggregate {
        pipe_id: String,
    },
}

impl IdentityKey {
    /// 构造聚合管道标识
    pub fn aggregate(drawing_norm: &str, size_norm: &str, commodity_code: &str) -> Self {
        IdentityKey::Aggregate {
            pipe_id: format!(
                "{}-{}-{}-{}",
                drawing_norm, size_norm, commodity_code, AGGREGATE_SUFFIX
            ),
        }
    }

    /// 去重比较用的规范字符串
    ///
    /// 与 component.identity_key_str 列一致，唯一索引建立在 (项目, 类型, 此字符串) 上
    pub fn canonical(&self) -> String {
        match self {
            IdentityKey::Standard {
                drawing_norm,
                commodity_code,
                size,
                seq,
            } => format!(
                "{}|{}|{}|{:0width$}",
                drawing_norm,
                size,
                commodity_code,
                seq,
                width = SEQ_PAD_WIDTH
            ),
            IdentityKey::Instrument {
                drawing_norm,
                commodity_code,
                size,
            } => format!(
                "{}|{}|{}|{:0width$}",
                drawing_norm,
                size,
                commodity_code,
                1,
                width = SEQ_PAD_WIDTH
            ),
            IdentityKey::Spool { spool_id } => spool_id.clone(),
            IdentityKey::FieldWeld { weld_number } => weld_number.clone(),
            IdentityKey::Aggregate { pipe_id } => pipe_id.clone(),
        }
    }

    /// 展开序号（仪表固定为 1，其余非展开类型为 None）
    pub fn seq(&self) -> Option<u32> {
        match self {
            IdentityKey::Standard { seq, .. } => Some(*seq),
            IdentityKey::Instrument { .. } => Some(1),
            _ => None,
        }
    }

    pub fn strategy(&self) -> KeyStrategy {
        match self {
            IdentityKey::Standard { .. } => KeyStrategy::Exploded,
            IdentityKey::Spool { .. } => KeyStrategy::Spool,
            IdentityKey::FieldWeld { .. } => KeyStrategy::FieldWeld,
            IdentityKey::Instrument { .. } => KeyStrategy::Instrument,
            IdentityKey::Aggregate { .. } => KeyStrategy::Aggregate,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, IdentityKey::Aggregate { .. })
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_standard_pads_seq() {
        let key = IdentityKey::Standard {
            drawing_norm: "P-001".to_string(),
            commodity_code: "V100".to_string(),
            size: "NOSIZE".to_string(),
            seq: 2,
        };
        assert_eq!(key.canonical(), "P-001|NOSIZE|V100|002");
        assert_eq!(key.seq(), Some(2));
    }

    #[test]
    fn test_canonical_instrument_fixed_seq() {
        let key = IdentityKey::Instrument {
            drawing_norm: "P-001".to_string(),
            commodity_code: "FT-100".to_string(),
            size: "2".to_string(),
        };
        assert_eq!(key.canonical(), "P-001|2|FT-100|001");
        assert_eq!(key.seq(), Some(1));
    }

    #[test]
    fn test_aggregate_pipe_id() {
        let key = IdentityKey::aggregate("P-01", "2", "PIPE-A");
        assert_eq!(key.canonical(), "P-01-2-PIPE-A-AGG");
        assert!(key.is_aggregate());
        assert_eq!(key.seq(), None);
    }

    #[test]
    fn test_serde_tagged_shape() {
        let key = IdentityKey::Spool {
            spool_id: "SP-7".to_string(),
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["kind"], "spool");
        assert_eq!(json["spool_id"], "SP-7");

        let back: IdentityKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}
