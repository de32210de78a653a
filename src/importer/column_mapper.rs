// ==========================================
// 管道材料导入系统 - 列映射器实现
// ==========================================
// 阶段 1: 源列 → 标准字段
// 三级匹配（逐标准字段，先命中者胜）:
//   1. exact            置信度 100
//   2. case_insensitive 置信度 95
//   3. synonym          置信度 85（大小写无关，内置同义词表 + column_synonyms 配置）
// 红线: 缺失必填列只报告，不抛错；一个源列最多映射一个标准字段
// ==========================================

use crate::domain::takeoff::{CanonicalField, ColumnMapping, ColumnMappingResult, RawTakeoffRow};
use crate::domain::types::MatchTier;
use crate::importer::file_parser::TabularRow;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// 内置同义词表（已按 header_key 规则小写化）
fn builtin_synonyms(field: CanonicalField) -> &'static [&'static str] {
    match field {
        CanonicalField::Drawing => &[
            "dwg",
            "dwg no",
            "drawing no",
            "drawing number",
            "iso",
            "isometric",
            "iso no",
        ],
        CanonicalField::Type => &["component type", "comp type", "item type", "category"],
        CanonicalField::Qty => &["quantity", "qty.", "count", "amount"],
        CanonicalField::CommodityCode => &[
            "commodity code",
            "commoditycode",
            "commodity",
            "cmdty code",
            "cmdty",
            "item code",
            "material code",
        ],
        CanonicalField::Size => &["nominal size", "nps", "dia", "diameter", "size in"],
        CanonicalField::Spec => &["specification", "pipe spec", "piping spec", "class"],
        CanonicalField::Description => &["desc", "item description", "material description"],
        CanonicalField::Comments => &["comment", "notes", "remarks"],
        CanonicalField::Area => &["area name", "unit"],
        CanonicalField::System => &["system name", "sys"],
        CanonicalField::TestPackage => &[
            "test package",
            "testpackage",
            "test pkg",
            "tp",
            "test pack",
        ],
    }
}

/// 同义词比较键: TRIM + 小写，`_`/`-` 视为空格，连续空白折叠
fn header_key(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_canonical(raw: &str) -> Option<CanonicalField> {
    let key = header_key(raw);
    CanonicalField::ALL
        .iter()
        .copied()
        .find(|f| header_key(f.as_str()) == key)
}

// ==========================================
// ColumnMapper
// ==========================================
pub struct ColumnMapper {
    synonyms: HashMap<CanonicalField, Vec<String>>,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnMapper {
    /// 仅使用内置同义词表
    pub fn new() -> Self {
        let synonyms = CanonicalField::ALL
            .iter()
            .map(|f| {
                let list = builtin_synonyms(*f).iter().map(|s| s.to_string()).collect();
                (*f, list)
            })
            .collect();
        Self { synonyms }
    }

    /// 内置同义词表 + 配置扩展（键为标准字段名，如 "drawing" / "commodityCode"）
    pub fn with_extra_synonyms(extra: &HashMap<String, Vec<String>>) -> Self {
        let mut mapper = Self::new();
        for (field_name, aliases) in extra {
            match parse_canonical(field_name) {
                Some(field) => {
                    let list = mapper.synonyms.entry(field).or_default();
                    list.extend(aliases.iter().map(|a| header_key(a)));
                }
                None => {
                    warn!(field = %field_name, "列同义词配置引用了未知标准字段，忽略");
                }
            }
        }
        mapper
    }

    fn match_tier(&self, field: CanonicalField, header: &str) -> Option<MatchTier> {
        let trimmed = header.trim();
        if trimmed == field.as_str() {
            return Some(MatchTier::Exact);
        }
        if trimmed.to_lowercase() == field.as_str().to_lowercase() {
            return Some(MatchTier::CaseInsensitive);
        }
        let key = header_key(trimmed);
        if key == header_key(field.as_str())
            || self
                .synonyms
                .get(&field)
                .is_some_and(|list| list.iter().any(|s| *s == key))
        {
            return Some(MatchTier::Synonym);
        }
        None
    }

    /// 列检测
    ///
    /// 对每个标准字段依次尝试三个层级；同层级内按列的左右顺序取第一个未被占用的列
    pub fn detect(&self, headers: &[String]) -> ColumnMappingResult {
        let mut used: HashSet<usize> = HashSet::new();
        let mut mappings = Vec::new();
        let mut missing_required = Vec::new();

        for field in CanonicalField::ALL {
            let mut found = None;
            'tiers: for tier in [MatchTier::Exact, MatchTier::CaseInsensitive, MatchTier::Synonym] {
                for (idx, header) in headers.iter().enumerate() {
                    if used.contains(&idx) {
                        continue;
                    }
                    if self.match_tier(field, header) == Some(tier) {
                        found = Some((idx, tier));
                        break 'tiers;
                    }
                }
            }

            match found {
                Some((idx, tier)) => {
                    used.insert(idx);
                    mappings.push(ColumnMapping {
                        source_column: headers[idx].clone(),
                        canonical_field: field,
                        confidence: tier.confidence(),
                        match_tier: tier,
                        source_index: Some(idx),
                    });
                }
                None if field.is_required() => missing_required.push(field),
                None => {}
            }
        }

        let unmapped_columns = headers
            .iter()
            .enumerate()
            .filter(|(idx, h)| !used.contains(idx) && !h.trim().is_empty())
            .map(|(_, h)| h.clone())
            .collect();

        ColumnMappingResult {
            has_all_required_fields: missing_required.is_empty(),
            mappings,
            unmapped_columns,
            missing_required,
        }
    }

    /// 调用方已给出映射时的整理
    ///
    /// 同一标准字段出现多次时保留第一条；未出现在映射中的源列计入 unmapped_columns
    pub fn from_provided(&self, provided: &[ColumnMapping], source_columns: &[String]) -> ColumnMappingResult {
        let mut seen_fields = HashSet::new();
        let mut seen_sources = HashSet::new();
        let mut mappings = Vec::new();

        for mapping in provided {
            if seen_fields.insert(mapping.canonical_field)
                && seen_sources.insert(mapping.source_column.clone())
            {
                mappings.push(mapping.clone());
            }
        }

        let missing_required: Vec<CanonicalField> = CanonicalField::REQUIRED
            .iter()
            .copied()
            .filter(|f| !seen_fields.contains(f))
            .collect();

        let unmapped_columns = source_columns
            .iter()
            .filter(|c| !mappings.iter().any(|m| &m.source_column == *c))
            .cloned()
            .collect();

        ColumnMappingResult {
            has_all_required_fields: missing_required.is_empty(),
            mappings,
            unmapped_columns,
            missing_required,
        }
    }

    /// 表格行 → RawTakeoffRow
    ///
    /// 按列下标取值；重名表头只有被映射的那一列进入标准字段，其余计入 unmapped_fields
    pub fn apply_to_row(
        &self,
        mappings: &[ColumnMapping],
        headers: &[String],
        row: &TabularRow,
    ) -> RawTakeoffRow {
        let by_index = column_indexes(mappings, headers);

        let mut raw = RawTakeoffRow::new(row.row_number);
        for (idx, header) in headers.iter().enumerate() {
            let value = row.values.get(idx).cloned().unwrap_or_default();
            match by_index.get(&idx) {
                Some(field) => {
                    raw.fields.insert(*field, value);
                }
                None if !header.trim().is_empty() && !value.is_empty() => {
                    raw.unmapped_fields.insert(header.clone(), value);
                }
                None => {}
            }
        }
        raw
    }

    /// JSON 对象行 → RawTakeoffRow
    ///
    /// 非对象行或含数组/对象值的行标记为 malformed，由校验器报告
    pub fn apply_to_object(
        &self,
        mappings: &[ColumnMapping],
        row_number: usize,
        row: &Value,
    ) -> RawTakeoffRow {
        let mut raw = RawTakeoffRow::new(row_number);

        let object = match row.as_object() {
            Some(o) => o,
            None => {
                raw.malformed = Some("行数据不是对象".to_string());
                return raw;
            }
        };

        let by_source: HashMap<&str, CanonicalField> = mappings
            .iter()
            .map(|m| (m.source_column.as_str(), m.canonical_field))
            .collect();

        for (key, value) in object {
            let text = match scalar_to_string(value) {
                Some(t) => t,
                None => {
                    raw.malformed = Some(format!("列 {} 的值不是标量", key));
                    continue;
                }
            };

            match by_source.get(key.as_str()) {
                Some(field) => {
                    raw.fields.insert(*field, text);
                }
                None if !text.trim().is_empty() => {
                    raw.unmapped_fields.insert(key.clone(), text);
                }
                None => {}
            }
        }
        raw
    }
}

/// 映射 → 列下标
///
/// 优先使用检测时记录的下标；调用方给出的映射按列名取最左侧未占用的列
fn column_indexes(mappings: &[ColumnMapping], headers: &[String]) -> HashMap<usize, CanonicalField> {
    let mut by_index = HashMap::new();
    for mapping in mappings {
        let recorded = mapping
            .source_index
            .filter(|idx| headers.get(*idx) == Some(&mapping.source_column));
        let idx = recorded.or_else(|| {
            headers
                .iter()
                .enumerate()
                .find(|(i, h)| **h == mapping.source_column && !by_index.contains_key(i))
                .map(|(i, _)| i)
        });
        if let Some(idx) = idx {
            by_index.entry(idx).or_insert(mapping.canonical_field);
        }
    }
    by_index
}

/// JSON 标量 → 文本；数组/对象返回 None
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// 结构化请求中所有行的键（按首次出现顺序）
pub fn collect_row_keys(rows: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in rows {
        if let Some(object) = row.as_object() {
            for key in object.keys() {
                if seen.insert(key.clone()) {
                    keys.push(key.clone());
                }
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn mapping_of(result: &ColumnMappingResult, field: CanonicalField) -> Option<&ColumnMapping> {
        result.mappings.iter().find(|m| m.canonical_field == field)
    }

    #[test]
    fn test_detect_three_tiers() {
        let mapper = ColumnMapper::new();
        let result = mapper.detect(&headers(&["drawing", "TYPE", "Quantity", "Cmdty Code", "Notes"]));

        assert!(result.has_all_required_fields);
        assert_eq!(mapping_of(&result, CanonicalField::Drawing).unwrap().confidence, 100);
        assert_eq!(mapping_of(&result, CanonicalField::Type).unwrap().confidence, 95);
        let qty = mapping_of(&result, CanonicalField::Qty).unwrap();
        assert_eq!(qty.match_tier, MatchTier::Synonym);
        assert_eq!(qty.confidence, 85);
        assert_eq!(
            mapping_of(&result, CanonicalField::CommodityCode).unwrap().source_column,
            "Cmdty Code"
        );
        assert_eq!(
            mapping_of(&result, CanonicalField::Comments).unwrap().source_column,
            "Notes"
        );
        assert!(result.unmapped_columns.is_empty());
    }

    #[test]
    fn test_detect_reports_missing_required_without_failing() {
        let mapper = ColumnMapper::new();
        let result = mapper.detect(&headers(&["Drawing", "Size", "Vendor"]));

        assert!(!result.has_all_required_fields);
        assert_eq!(
            result.missing_required,
            vec![
                CanonicalField::Type,
                CanonicalField::Qty,
                CanonicalField::CommodityCode
            ]
        );
        assert_eq!(result.unmapped_columns, vec!["Vendor".to_string()]);
    }

    #[test]
    fn test_detect_first_column_wins() {
        let mapper = ColumnMapper::new();
        let result = mapper.detect(&headers(&["DWG", "Drawing No", "type", "qty", "commodityCode"]));

        assert_eq!(
            mapping_of(&result, CanonicalField::Drawing).unwrap().source_column,
            "DWG"
        );
        assert_eq!(result.unmapped_columns, vec!["Drawing No".to_string()]);
    }

    #[test]
    fn test_detect_prefers_exact_over_earlier_synonym() {
        let mapper = ColumnMapper::new();
        let result = mapper.detect(&headers(&["DWG", "drawing"]));

        let drawing = mapping_of(&result, CanonicalField::Drawing).unwrap();
        assert_eq!(drawing.source_column, "drawing");
        assert_eq!(drawing.match_tier, MatchTier::Exact);
    }

    #[test]
    fn test_extra_synonyms_from_config() {
        let mut extra = HashMap::new();
        extra.insert("drawing".to_string(), vec!["Sheet Ref".to_string()]);
        extra.insert("bogus".to_string(), vec!["X".to_string()]);
        let mapper = ColumnMapper::with_extra_synonyms(&extra);

        let result = mapper.detect(&headers(&["SHEET_REF"]));
        assert_eq!(
            mapping_of(&result, CanonicalField::Drawing).unwrap().match_tier,
            MatchTier::Synonym
        );
    }

    #[test]
    fn test_apply_to_row_collects_unmapped() {
        let mapper = ColumnMapper::new();
        let hs = headers(&["Drawing", "Type", "Qty", "Commodity Code", "Vendor"]);
        let result = mapper.detect(&hs);
        let row = TabularRow {
            row_number: 4,
            values: vec!["P-001", "valve", "2", "V100", "ACME"]
                .into_iter()
                .map(String::from)
                .collect(),
        };

        let raw = mapper.apply_to_row(&result.mappings, &hs, &row);
        assert_eq!(raw.row_number, 4);
        assert_eq!(raw.get(CanonicalField::CommodityCode), Some("V100"));
        assert_eq!(raw.unmapped_fields.get("Vendor"), Some(&"ACME".to_string()));
    }

    #[test]
    fn test_apply_to_row_repeated_header_goes_unmapped() {
        let mapper = ColumnMapper::new();
        let hs = headers(&["Drawing", "Type", "Qty", "Commodity Code", "Qty"]);
        let result = mapper.detect(&hs);
        assert_eq!(result.unmapped_columns, vec!["Qty".to_string()]);
        assert_eq!(mapping_of(&result, CanonicalField::Qty).unwrap().source_index, Some(2));

        let row = TabularRow {
            row_number: 1,
            values: vec!["P-001", "valve", "2", "V100", "7"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        let raw = mapper.apply_to_row(&result.mappings, &hs, &row);
        assert_eq!(raw.get(CanonicalField::Qty), Some("2"));
        assert_eq!(raw.unmapped_fields.get("Qty"), Some(&"7".to_string()));
    }

    #[test]
    fn test_row_keys_keep_source_order() {
        let rows: Vec<Value> = serde_json::from_str(
            r#"[{"ISO": "P-LEFT", "DWG": "P-RIGHT", "Type": "valve", "QTY": 1, "Cmdty Code": "V1"}]"#,
        )
        .unwrap();
        let keys = collect_row_keys(&rows);
        assert_eq!(keys, headers(&["ISO", "DWG", "Type", "QTY", "Cmdty Code"]));

        let mapper = ColumnMapper::new();
        let result = mapper.detect(&keys);
        assert_eq!(
            mapping_of(&result, CanonicalField::Drawing).unwrap().source_column,
            "ISO"
        );
        let raw = mapper.apply_to_object(&result.mappings, 1, &rows[0]);
        assert_eq!(raw.get(CanonicalField::Drawing), Some("P-LEFT"));
        assert_eq!(raw.unmapped_fields.get("DWG"), Some(&"P-RIGHT".to_string()));
    }

    #[test]
    fn test_apply_to_object_scalars_and_malformed() {
        let mapper = ColumnMapper::new();
        let rows = vec![json!({"drawing": "P-001", "type": "valve", "qty": 2.0, "commodityCode": "V100"})];
        let keys = collect_row_keys(&rows);
        let result = mapper.detect(&keys);
        assert!(result.has_all_required_fields);

        let raw = mapper.apply_to_object(&result.mappings, 1, &rows[0]);
        assert_eq!(raw.get(CanonicalField::Qty), Some("2.0"));
        assert!(raw.malformed.is_none());

        let bad = mapper.apply_to_object(&result.mappings, 2, &json!({"drawing": ["a"]}));
        assert!(bad.malformed.is_some());

        let not_object = mapper.apply_to_object(&result.mappings, 3, &json!("P-001"));
        assert!(not_object.malformed.is_some());
    }

    #[test]
    fn test_from_provided_dedups_and_reports_missing() {
        let mapper = ColumnMapper::new();
        let provided = vec![
            ColumnMapping {
                source_column: "ISO".to_string(),
                canonical_field: CanonicalField::Drawing,
                confidence: 100,
                match_tier: MatchTier::Exact,
                source_index: None,
            },
            ColumnMapping {
                source_column: "DWG".to_string(),
                canonical_field: CanonicalField::Drawing,
                confidence: 85,
                match_tier: MatchTier::Synonym,
                source_index: None,
            },
        ];

        let result = mapper.from_provided(&provided, &headers(&["ISO", "DWG"]));
        assert_eq!(result.mappings.len(), 1);
        assert_eq!(result.unmapped_columns, vec!["DWG".to_string()]);
        assert!(!result.has_all_required_fields);
        assert_eq!(result.missing_required.len(), 3);
    }
}
