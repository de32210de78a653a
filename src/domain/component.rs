// ==========================================
// 管道材料导入系统 - 组件 / 图纸 / 元数据领域模型
// ==========================================
// 职责: 持久化实体定义 + 组件初始里程碑
// 红线: 组件由导入引擎创建一次，此后仅由外部里程碑子系统修改
// ==========================================

use crate::domain::identity::IdentityKey;
use crate::domain::types::{ComponentType, KeyStrategy, MetadataDimension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ==========================================
// Drawing - 图纸
// ==========================================
// 对齐: drawing 表，(project_id, drawing_no_norm) 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drawing {
    pub id: String,
    pub project_id: String,
    pub drawing_no_raw: String,  // 首次导入时的原始写法
    pub drawing_no_norm: String, // 规范化图号
    pub created_at: DateTime<Utc>,
}

// ==========================================
// MetadataRecord - 元数据维度记录（区域/系统/试压包）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub project_id: String,
    pub dimension: MetadataDimension,
    pub name: String,
}

// ==========================================
// ComponentAttributes - 组件属性（JSON 列）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentAttributes {
    pub spec: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub commodity_code: String,
    pub comments: Option<String>,
    pub original_qty: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unmapped_fields: BTreeMap<String, String>,

    // ===== 聚合管道专用 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_linear_feet: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_numbers: Option<Vec<usize>>,
}

// ==========================================
// ComponentRecord - 组件
// ==========================================
// 对齐: component 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: String,
    pub project_id: String,
    pub component_type: ComponentType,
    pub drawing_id: String,
    pub identity_key: IdentityKey,
    pub area_id: Option<String>,
    pub system_id: Option<String>,
    pub test_package_id: Option<String>,
    pub attributes: ComponentAttributes,
    pub current_milestones: Map<String, Value>,
    pub progress_template_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// AggregateMergeOutcome - 聚合管道落库结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AggregateMergeOutcome {
    Created {
        component_id: String,
    },
    Updated {
        component_id: String,
        total_linear_feet: f64,
    },
}

// ==========================================
// 里程碑类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneKind {
    Partial,  // 按延米 / 百分比推进，初值 0
    Discrete, // 完成 / 未完成，初值 false
}

/// 组件类型 → 里程碑清单
pub fn milestone_plan(component_type: ComponentType) -> Vec<(&'static str, MilestoneKind)> {
    use MilestoneKind::{Discrete, Partial};

    match component_type.key_strategy() {
        KeyStrategy::Aggregate => vec![
            ("Receive", Partial),
            ("Erect", Partial),
            ("Connect", Partial),
            ("Support", Partial),
            ("Punch", Discrete),
            ("Test", Discrete),
            ("Restore", Discrete),
        ],
        KeyStrategy::Spool => vec![
            ("Receive", Discrete),
            ("Erect", Discrete),
            ("Connect", Discrete),
            ("Punch", Discrete),
            ("Test", Discrete),
            ("Restore", Discrete),
        ],
        KeyStrategy::FieldWeld => vec![
            ("Fit-up", Discrete),
            ("Weld Made", Discrete),
            ("Punch", Discrete),
            ("Test", Discrete),
            ("Restore", Discrete),
        ],
        KeyStrategy::Instrument | KeyStrategy::Exploded => vec![
            ("Receive", Discrete),
            ("Install", Discrete),
            ("Punch", Discrete),
            ("Test", Discrete),
            ("Restore", Discrete),
        ],
    }
}

/// 组件初始里程碑（Partial → 0，Discrete → false）
pub fn initial_milestones(component_type: ComponentType) -> Map<String, Value> {
    milestone_plan(component_type)
        .into_iter()
        .map(|(name, kind)| {
            let value = match kind {
                MilestoneKind::Partial => Value::from(0),
                MilestoneKind::Discrete => Value::Bool(false),
            };
            (name.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_milestones_aggregate() {
        let milestones = initial_milestones(ComponentType::Pipe);
        assert_eq!(milestones["Receive"], Value::from(0));
        assert_eq!(milestones["Support"], Value::from(0));
        assert_eq!(milestones["Punch"], Value::Bool(false));
        assert_eq!(milestones["Restore"], Value::Bool(false));
    }

    #[test]
    fn test_initial_milestones_discrete_all_false() {
        let milestones = initial_milestones(ComponentType::Valve);
        assert!(!milestones.is_empty());
        assert!(milestones.values().all(|v| *v == Value::Bool(false)));
    }

    #[test]
    fn test_attributes_skip_aggregate_fields_when_absent() {
        let attrs = ComponentAttributes {
            commodity_code: "V100".to_string(),
            original_qty: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&attrs).unwrap();
        assert!(json.get("total_linear_feet").is_none());
        assert!(json.get("line_numbers").is_none());
        assert_eq!(json["commodity_code"], "V100");
    }
}
