// ==========================================
// 管道材料导入系统 - 元数据解析器
// ==========================================
// 职责: 区域 / 系统 / 试压包 名称 → id
// 流程（每个维度）: 查已存在 → 插入缺失（INSERT OR IGNORE）→ 全量重查 → 数量核对
// 红线: 重查数量 ≠ 请求数量 视为一致性缺陷，整批中止
// 并发: 三个维度互不依赖，try_join! 并发解析
// ==========================================

use crate::domain::import::{MetadataCreatedCounts, MetadataLookupMaps, MetadataToCreate};
use crate::domain::takeoff::ParsedRow;
use crate::domain::types::MetadataDimension;
use crate::importer::error::{ImportError, ImporterResult};
use crate::repository::takeoff_import_repo::TakeoffImportRepository;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// TRIM + 去空 + 去重（保持首次出现顺序）
pub fn dedup_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}

/// 请求声明的名称 ∪ 行上引用的名称
pub fn collect_metadata_names(declared: &MetadataToCreate, rows: &[ParsedRow]) -> MetadataToCreate {
    let mut merged = MetadataToCreate::default();

    for dimension in MetadataDimension::ALL {
        let from_rows = rows.iter().filter_map(|r| match dimension {
            MetadataDimension::Area => r.area.as_deref(),
            MetadataDimension::System => r.system.as_deref(),
            MetadataDimension::TestPackage => r.test_package.as_deref(),
        });
        let declared_names = declared.names(dimension).iter().map(String::as_str);

        *merged.names_mut(dimension) = dedup_names(declared_names.chain(from_rows));
    }

    merged
}

/// 解析单个维度
///
/// # 返回
/// - (名称 → id, 本次新建数量)
pub async fn resolve_dimension<R>(
    repo: &R,
    project_id: &str,
    dimension: MetadataDimension,
    names: &[String],
) -> ImporterResult<(HashMap<String, String>, usize)>
where
    R: TakeoffImportRepository + ?Sized,
{
    let names = dedup_names(names.iter().map(String::as_str));
    if names.is_empty() {
        return Ok((HashMap::new(), 0));
    }

    let existing = repo
        .find_metadata_by_names(project_id, dimension, &names)
        .await?;
    let existing_names: HashSet<&str> = existing.iter().map(|m| m.name.as_str()).collect();

    let missing: Vec<String> = names
        .iter()
        .filter(|n| !existing_names.contains(n.as_str()))
        .cloned()
        .collect();

    let created = if missing.is_empty() {
        0
    } else {
        repo.insert_metadata_ignore(project_id, dimension, &missing)
            .await?
    };

    let fetched = repo
        .find_metadata_by_names(project_id, dimension, &names)
        .await?;

    if fetched.len() != names.len() {
        return Err(ImportError::MetadataCountMismatch {
            dimension,
            requested: names.len(),
            fetched: fetched.len(),
        });
    }

    debug!(
        dimension = %dimension,
        requested = names.len(),
        existing = existing.len(),
        created,
        "元数据维度解析完成"
    );

    let map = fetched.into_iter().map(|m| (m.name, m.id)).collect();
    Ok((map, created))
}

/// 三个维度并发解析
pub async fn resolve_all<R>(
    repo: &R,
    project_id: &str,
    names: &MetadataToCreate,
) -> ImporterResult<(MetadataLookupMaps, MetadataCreatedCounts)>
where
    R: TakeoffImportRepository + ?Sized,
{
    let (areas, systems, test_packages) = futures::try_join!(
        resolve_dimension(repo, project_id, MetadataDimension::Area, &names.areas),
        resolve_dimension(repo, project_id, MetadataDimension::System, &names.systems),
        resolve_dimension(
            repo,
            project_id,
            MetadataDimension::TestPackage,
            &names.test_packages
        ),
    )?;

    let mut counts = MetadataCreatedCounts::default();
    counts.set(MetadataDimension::Area, areas.1);
    counts.set(MetadataDimension::System, systems.1);
    counts.set(MetadataDimension::TestPackage, test_packages.1);

    let maps = MetadataLookupMaps {
        areas: areas.0,
        systems: systems.0,
        test_packages: test_packages.0,
    };

    Ok((maps, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ComponentType;
    use crate::repository::TakeoffImportRepositoryImpl;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn repo() -> TakeoffImportRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        TakeoffImportRepositoryImpl::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_dedup_names() {
        let names = dedup_names([" North", "North", "", "South ", "  "]);
        assert_eq!(names, vec!["North".to_string(), "South".to_string()]);
    }

    #[test]
    fn test_collect_metadata_names_merges_rows() {
        let declared = MetadataToCreate {
            areas: vec!["North".to_string()],
            ..Default::default()
        };
        let row = ParsedRow {
            row_number: 1,
            drawing: "P-001".to_string(),
            component_type: ComponentType::Valve,
            qty: 1,
            commodity_code: "V100".to_string(),
            size: None,
            spec: None,
            description: None,
            comments: None,
            area: Some("East".to_string()),
            system: Some("Cooling".to_string()),
            test_package: None,
            unmapped_fields: Default::default(),
        };

        let merged = collect_metadata_names(&declared, &[row]);
        assert_eq!(merged.areas, vec!["North".to_string(), "East".to_string()]);
        assert_eq!(merged.systems, vec!["Cooling".to_string()]);
        assert!(merged.test_packages.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_same_name_twice_reuses_id() {
        let repo = repo();
        let names = vec!["North".to_string()];

        let (first, created_first) =
            resolve_dimension(&repo, "p1", MetadataDimension::Area, &names)
                .await
                .unwrap();
        let (second, created_second) =
            resolve_dimension(&repo, "p1", MetadataDimension::Area, &names)
                .await
                .unwrap();

        assert_eq!(created_first, 1);
        assert_eq!(created_second, 0);
        assert_eq!(first["North"], second["North"]);
        assert_eq!(
            repo.count_metadata("p1", MetadataDimension::Area).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_resolve_all_dimensions() {
        let repo = repo();
        let names = MetadataToCreate {
            areas: vec!["North".to_string()],
            systems: vec!["Cooling".to_string(), "Steam".to_string()],
            test_packages: vec![],
        };

        let (maps, counts) = resolve_all(&repo, "p1", &names).await.unwrap();
        assert_eq!(counts.areas, 1);
        assert_eq!(counts.systems, 2);
        assert_eq!(counts.test_packages, 0);
        assert!(maps.systems.contains_key("Steam"));
    }
}
