// ==========================================
// 管道材料导入系统 - 聚合管道合并器
// ==========================================
// 职责: pipe / threaded_pipe 行按 pipe_id 批内合并
// - 首次出现: total_linear_feet = qty, line_numbers = [行号]
// - 后续出现: 累加 qty，追加行号（不重复）
// 与已落库状态的对账在 Repository::merge_aggregate 中原子完成
// ==========================================

use crate::domain::identity::IdentityKey;
use crate::domain::takeoff::ParsedRow;
use crate::domain::types::ComponentType;
use crate::importer::identity_resolver::ResolvedRow;
use std::collections::HashMap;

// ==========================================
// AggregateDraft - 批内合并后的聚合管道
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDraft {
    pub component_type: ComponentType,
    pub identity_key: IdentityKey,
    pub drawing_norm: String,
    pub first_row: ParsedRow, // 属性（规格/描述/元数据）取首行
    pub total_linear_feet: f64,
    pub line_numbers: Vec<usize>,
}

impl AggregateDraft {
    fn absorb(&mut self, row: &ParsedRow) {
        self.total_linear_feet += f64::from(row.qty);
        if !self.line_numbers.contains(&row.row_number) {
            self.line_numbers.push(row.row_number);
        }
    }
}

/// 批内合并
///
/// # 返回
/// - 按首次出现顺序排列的聚合草稿；非聚合行被忽略
pub fn merge_intra_batch(rows: &[ResolvedRow]) -> Vec<AggregateDraft> {
    let mut drafts: Vec<AggregateDraft> = Vec::new();
    let mut index: HashMap<(ComponentType, String), usize> = HashMap::new();

    for resolved in rows.iter().filter(|r| r.component_type().is_aggregate()) {
        for key in &resolved.keys {
            let slot = (resolved.component_type(), key.canonical());
            match index.get(&slot) {
                Some(&i) => drafts[i].absorb(&resolved.row),
                None => {
                    index.insert(slot, drafts.len());
                    drafts.push(AggregateDraft {
                        component_type: resolved.component_type(),
                        identity_key: key.clone(),
                        drawing_norm: resolved.drawing_norm.clone(),
                        first_row: resolved.row.clone(),
                        total_linear_feet: f64::from(resolved.row.qty),
                        line_numbers: vec![resolved.row.row_number],
                    });
                }
            }
        }
    }

    drafts
}
