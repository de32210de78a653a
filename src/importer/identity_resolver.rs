// ==========================================
// 管道材料导入系统 - 标识键解析器
// ==========================================
// 职责: 校验通过的行 → 组件标识键（纯函数，无 I/O）
// 规则（按 ComponentType::key_strategy）:
// - spool       → Spool{commodity_code}，一条
// - field_weld  → FieldWeld{commodity_code}，一条
// - instrument  → Instrument{图号, 编码, 尺寸}，一条（seq 固定 1）
// - pipe 类     → Aggregate{"{图号}-{尺寸}-{编码}-AGG"}，一条（数量为延米）
// - 其余        → Standard{.., seq}，seq = 1..=qty
// ==========================================

use crate::domain::identity::IdentityKey;
use crate::domain::takeoff::ParsedRow;
use crate::domain::types::{ComponentType, KeyStrategy};
use crate::importer::data_cleaner::{normalize_drawing, normalize_size};

// ==========================================
// ResolvedRow - 已解析标识键的行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    pub row: ParsedRow,
    pub drawing_norm: String,
    pub size_norm: String,
    pub keys: Vec<IdentityKey>,
}

impl ResolvedRow {
    pub fn component_type(&self) -> ComponentType {
        self.row.component_type
    }
}

/// 单行 → 标识键列表
///
/// qty 为 0 的行在校验阶段已被跳过，此处 qty >= 1
pub fn resolve_keys(row: &ParsedRow) -> Vec<IdentityKey> {
    let drawing_norm = normalize_drawing(&row.drawing);
    let size_norm = normalize_size(row.size.as_deref());
    let code = row.commodity_code.clone();

    match row.component_type.key_strategy() {
        KeyStrategy::Spool => vec![IdentityKey::Spool { spool_id: code }],
        KeyStrategy::FieldWeld => vec![IdentityKey::FieldWeld { weld_number: code }],
        KeyStrategy::Instrument => vec![IdentityKey::Instrument {
            drawing_norm,
            commodity_code: code,
            size: size_norm,
        }],
        KeyStrategy::Aggregate => vec![IdentityKey::aggregate(&drawing_norm, &size_norm, &code)],
        KeyStrategy::Exploded => (1..=row.qty)
            .map(|seq| IdentityKey::Standard {
                drawing_norm: drawing_norm.clone(),
                commodity_code: code.clone(),
                size: size_norm.clone(),
                seq,
            })
            .collect(),
    }
}

/// 单行展开后的组件数（不分配标识键，供限额检查）
pub fn component_count(row: &ParsedRow) -> usize {
    match row.component_type.key_strategy() {
        KeyStrategy::Exploded => row.qty as usize,
        _ => 1,
    }
}

/// 单行解析（附带规范化图号与尺寸）
pub fn resolve_row(row: &ParsedRow) -> ResolvedRow {
    ResolvedRow {
        drawing_norm: normalize_drawing(&row.drawing),
        size_norm: normalize_size(row.size.as_deref()),
        keys: resolve_keys(row),
        row: row.clone(),
    }
}

pub fn resolve_rows(rows: &[ParsedRow]) -> Vec<ResolvedRow> {
    rows.iter().map(resolve_row).collect()
}
