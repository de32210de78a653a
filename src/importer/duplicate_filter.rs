// ==========================================
// 管道材料导入系统 - 重复过滤器
// ==========================================
// 职责:
// - 批内重复: 两行解析出相同 (类型, 标识键) → 所有相关行号一并报告
// - 库内重复: 已存在的未退役组件 → 跳过（计数，不报错）
// 红线: 聚合管道不参与（由 AggregateMerger 合并）
// ==========================================

use crate::domain::component::ComponentRecord;
use crate::domain::types::ComponentType;
use crate::importer::identity_resolver::ResolvedRow;
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ==========================================
// IntraBatchDuplicate - 批内重复
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntraBatchDuplicate {
    pub component_type: ComponentType,
    pub identity_key: String,
    pub row_numbers: Vec<usize>, // 升序，至少两行
}

/// 检测批内重复标识键
///
/// # 返回
/// - 按 (类型, 标识键) 排序的冲突列表；每项包含涉及的全部行号
pub fn find_intra_batch_duplicates(rows: &[ResolvedRow]) -> Vec<IntraBatchDuplicate> {
    let mut seen: BTreeMap<(ComponentType, String), BTreeSet<usize>> = BTreeMap::new();

    for resolved in rows.iter().filter(|r| !r.component_type().is_aggregate()) {
        for key in &resolved.keys {
            seen.entry((resolved.component_type(), key.canonical()))
                .or_default()
                .insert(resolved.row.row_number);
        }
    }

    seen.into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|((component_type, identity_key), rows)| IntraBatchDuplicate {
            component_type,
            identity_key,
            row_numbers: rows.into_iter().collect(),
        })
        .collect()
}

// ==========================================
// PartitionOutcome - 库内去重结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PartitionOutcome {
    pub to_insert: Vec<ComponentRecord>,
    pub skipped_existing: usize,
}

/// 按已存在键拆分待插入组件
pub fn partition_against_existing(
    components: Vec<ComponentRecord>,
    existing: &HashSet<(ComponentType, String)>,
) -> PartitionOutcome {
    let mut outcome = PartitionOutcome::default();

    for component in components {
        let key = (component.component_type, component.identity_key.canonical());
        if existing.contains(&key) {
            outcome.skipped_existing += 1;
        } else {
            outcome.to_insert.push(component);
        }
    }

    outcome
}

/// 非聚合组件涉及的类型（用于查询已存在键）
pub fn referenced_types(components: &[ComponentRecord]) -> Vec<ComponentType> {
    let set: BTreeSet<ComponentType> = components.iter().map(|c| c.component_type).collect();
    set.into_iter().collect()
}
