// ==========================================
// 管道材料导入系统 - Takeoff 导入 Repository 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

mod base;

pub use self::base::TakeoffImportRepositoryImpl;

use self::base::{
    map_drawing, map_import_batch, merge_aggregate_attributes, parse_component_type,
    placeholders, ComponentRow, COMPONENT_COLUMNS, QUERY_CHUNK,
};
use crate::domain::component::{
    AggregateMergeOutcome, ComponentAttributes, ComponentRecord, Drawing, MetadataRecord,
};
use crate::domain::import::ImportBatch;
use crate::domain::types::{ComponentType, MetadataDimension};
use crate::repository::error::RepositoryResult;
use crate::repository::takeoff_import_repo::TakeoffImportRepository;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension};
use std::collections::{HashMap, HashSet};

#[async_trait]
impl TakeoffImportRepository for TakeoffImportRepositoryImpl {
    // ===== 元数据维度 =====

    async fn find_metadata_by_names(
        &self,
        project_id: &str,
        dimension: MetadataDimension,
        names: &[String],
    ) -> RepositoryResult<Vec<MetadataRecord>> {
        let conn = self.get_conn()?;
        let mut records = Vec::new();

        for chunk in names.chunks(QUERY_CHUNK) {
            let sql = format!(
                "SELECT id, project_id, name FROM {} WHERE project_id = ?1 AND name IN ({})",
                dimension.table_name(),
                placeholders(2, chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut values = vec![project_id.to_string()];
            values.extend(chunk.iter().cloned());

            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok(MetadataRecord {
                        id: row.get(0)?,
                        project_id: row.get(1)?,
                        dimension,
                        name: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            records.extend(rows);
        }

        Ok(records)
    }

    async fn insert_metadata_ignore(
        &self,
        project_id: &str,
        dimension: MetadataDimension,
        names: &[String],
    ) -> RepositoryResult<usize> {
        if names.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = TakeoffImportRepositoryImpl::begin_immediate(&conn)?;
        let now = Utc::now().to_rfc3339();

        let mut inserted = 0;
        {
            let sql = format!(
                "INSERT OR IGNORE INTO {} (id, project_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                dimension.table_name()
            );
            let mut stmt = tx.prepare(&sql)?;
            for name in names {
                inserted += stmt.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    project_id,
                    name,
                    now
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    // ===== 图纸 =====

    async fn find_drawings_by_norms(
        &self,
        project_id: &str,
        norms: &[String],
    ) -> RepositoryResult<Vec<Drawing>> {
        let conn = self.get_conn()?;
        let mut drawings = Vec::new();

        for chunk in norms.chunks(QUERY_CHUNK) {
            let sql = format!(
                r#"
                SELECT id, project_id, drawing_no_raw, drawing_no_norm, created_at
                FROM drawing
                WHERE project_id = ?1 AND drawing_no_norm IN ({})
                "#,
                placeholders(2, chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut values = vec![project_id.to_string()];
            values.extend(chunk.iter().cloned());

            let rows = stmt
                .query_map(params_from_iter(values.iter()), map_drawing)?
                .collect::<Result<Vec<_>, _>>()?;
            drawings.extend(rows);
        }

        Ok(drawings)
    }

    async fn insert_drawings_ignore(&self, drawings: &[Drawing]) -> RepositoryResult<usize> {
        if drawings.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = TakeoffImportRepositoryImpl::begin_immediate(&conn)?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO drawing (
                    id, project_id, drawing_no_raw, drawing_no_norm, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for drawing in drawings {
                inserted += stmt.execute(params![
                    drawing.id,
                    drawing.project_id,
                    drawing.drawing_no_raw,
                    drawing.drawing_no_norm,
                    drawing.created_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    // ===== 组件 =====

    async fn list_identity_keys(
        &self,
        project_id: &str,
        component_types: &[ComponentType],
    ) -> RepositoryResult<HashSet<(ComponentType, String)>> {
        if component_types.is_empty() {
            return Ok(HashSet::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT component_type, identity_key_str
            FROM component
            WHERE project_id = ?1 AND retired_at IS NULL AND component_type IN ({})
            "#,
            placeholders(2, component_types.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut values = vec![project_id.to_string()];
        values.extend(component_types.iter().map(|t| t.as_str().to_string()));

        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut keys = HashSet::with_capacity(rows.len());
        for (raw_type, key) in rows {
            keys.insert((parse_component_type(&raw_type)?, key));
        }
        Ok(keys)
    }

    async fn insert_components_batch(
        &self,
        components: &[ComponentRecord],
    ) -> RepositoryResult<HashMap<ComponentType, usize>> {
        let mut inserted: HashMap<ComponentType, usize> = HashMap::new();
        if components.is_empty() {
            return Ok(inserted);
        }

        let conn = self.get_conn()?;
        let tx = TakeoffImportRepositoryImpl::begin_immediate(&conn)?;

        for component in components {
            if TakeoffImportRepositoryImpl::insert_component_tx(&tx, component)? > 0 {
                *inserted.entry(component.component_type).or_insert(0) += 1;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    async fn merge_aggregate(
        &self,
        component: &ComponentRecord,
    ) -> RepositoryResult<AggregateMergeOutcome> {
        let conn = self.get_conn()?;
        let tx = TakeoffImportRepositoryImpl::begin_immediate(&conn)?;
        let key_str = component.identity_key.canonical();

        let existing: Option<(String, String)> = tx
            .query_row(
                r#"
                SELECT id, attributes_json
                FROM component
                WHERE project_id = ?1 AND component_type = ?2
                  AND identity_key_str = ?3 AND retired_at IS NULL
                "#,
                params![
                    component.project_id,
                    component.component_type.as_str(),
                    key_str
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let outcome = match existing {
            Some((component_id, attributes_json)) => {
                let mut attributes: ComponentAttributes = serde_json::from_str(&attributes_json)?;
                let total = merge_aggregate_attributes(&mut attributes, &component.attributes);

                // 仅更新属性列，里程碑保持不变
                tx.execute(
                    "UPDATE component SET attributes_json = ?1, updated_at = ?2 WHERE id = ?3",
                    params![
                        serde_json::to_string(&attributes)?,
                        Utc::now().to_rfc3339(),
                        component_id
                    ],
                )?;

                AggregateMergeOutcome::Updated {
                    component_id,
                    total_linear_feet: total,
                }
            }
            None => {
                TakeoffImportRepositoryImpl::insert_component_tx(&tx, component)?;
                AggregateMergeOutcome::Created {
                    component_id: component.id.clone(),
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    async fn find_component_by_key(
        &self,
        project_id: &str,
        component_type: ComponentType,
        identity_key_str: &str,
    ) -> RepositoryResult<Option<ComponentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM component
            WHERE project_id = ?1 AND component_type = ?2
              AND identity_key_str = ?3 AND retired_at IS NULL
            "#,
            COMPONENT_COLUMNS
        );

        let row = conn
            .query_row(
                &sql,
                params![project_id, component_type.as_str(), identity_key_str],
                ComponentRow::from_row,
            )
            .optional()?;

        row.map(ComponentRow::into_record).transpose()
    }

    async fn list_components(&self, project_id: &str) -> RepositoryResult<Vec<ComponentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM component
            WHERE project_id = ?1 AND retired_at IS NULL
            ORDER BY created_at, id
            "#,
            COMPONENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params![project_id], ComponentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ComponentRow::into_record).collect()
    }

    async fn retire_component(&self, component_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();

        let changed = conn.execute(
            "UPDATE component SET retired_at = ?1, updated_at = ?1 WHERE id = ?2 AND retired_at IS NULL",
            params![now, component_id],
        )?;

        if changed == 0 {
            return Err(crate::repository::error::RepositoryError::NotFound {
                entity: "component".to_string(),
                id: component_id.to_string(),
            });
        }
        Ok(())
    }

    // ===== 进度模板 =====

    async fn get_progress_template_ids(&self) -> RepositoryResult<HashMap<ComponentType, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT component_type, template_id FROM progress_template")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut templates = HashMap::new();
        for (raw_type, template_id) in rows {
            match ComponentType::parse(&raw_type) {
                Some(t) => {
                    templates.insert(t, template_id);
                }
                None => {
                    tracing::warn!(component_type = %raw_type, "进度模板引用了未知组件类型，忽略");
                }
            }
        }
        Ok(templates)
    }

    // ===== 导入批次审计 =====

    async fn insert_import_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO import_batch (
                batch_id, project_id, source_name, total_rows,
                components_created, components_updated, components_skipped,
                success, error_message, elapsed_ms, imported_at, result_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                batch.batch_id,
                batch.project_id,
                batch.source_name,
                batch.total_rows,
                batch.components_created,
                batch.components_updated,
                batch.components_skipped,
                batch.success as i32,
                batch.error_message,
                batch.elapsed_ms,
                batch.imported_at.to_rfc3339(),
                batch.result_json,
            ],
        )?;

        Ok(())
    }

    async fn get_import_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;

        let batch = conn
            .query_row(
                r#"
                SELECT batch_id, project_id, source_name, total_rows,
                       components_created, components_updated, components_skipped,
                       success, error_message, elapsed_ms, imported_at, result_json
                FROM import_batch
                WHERE batch_id = ?1
                "#,
                params![batch_id],
                map_import_batch,
            )
            .optional()?;

        Ok(batch)
    }

    async fn purge_import_batches(&self, retention_days: i32) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let cutoff = (Utc::now() - Duration::days(i64::from(retention_days.max(0)))).to_rfc3339();

        let deleted = conn.execute(
            "DELETE FROM import_batch WHERE imported_at < ?1",
            params![cutoff],
        )?;

        Ok(deleted)
    }

    // ===== 统计 =====

    async fn count_components(&self, project_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM component WHERE project_id = ?1 AND retired_at IS NULL",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn count_drawings(&self, project_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM drawing WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn count_metadata(
        &self,
        project_id: &str,
        dimension: MetadataDimension,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE project_id = ?1",
            dimension.table_name()
        );
        let count: i64 = conn.query_row(&sql, params![project_id], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::initial_milestones;
    use crate::domain::identity::IdentityKey;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn repo() -> TakeoffImportRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        TakeoffImportRepositoryImpl::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn drawing(project_id: &str, norm: &str) -> Drawing {
        Drawing {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            drawing_no_raw: norm.to_string(),
            drawing_no_norm: norm.to_string(),
            created_at: Utc::now(),
        }
    }

    fn pipe(project_id: &str, drawing_id: &str, feet: f64, line: usize) -> ComponentRecord {
        ComponentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            component_type: ComponentType::Pipe,
            drawing_id: drawing_id.to_string(),
            identity_key: IdentityKey::aggregate("P-001", "2", "PIPE-A"),
            area_id: None,
            system_id: None,
            test_package_id: None,
            attributes: ComponentAttributes {
                commodity_code: "PIPE-A".to_string(),
                original_qty: feet as u32,
                total_linear_feet: Some(feet),
                line_numbers: Some(vec![line]),
                ..Default::default()
            },
            current_milestones: initial_milestones(ComponentType::Pipe),
            progress_template_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_metadata_insert_ignore_is_idempotent() {
        let repo = repo();
        let names = vec!["North".to_string(), "South".to_string()];

        let first = repo
            .insert_metadata_ignore("p1", MetadataDimension::Area, &names)
            .await
            .unwrap();
        let second = repo
            .insert_metadata_ignore("p1", MetadataDimension::Area, &names)
            .await
            .unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);

        let found = repo
            .find_metadata_by_names("p1", MetadataDimension::Area, &names)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(
            repo.count_metadata("p2", MetadataDimension::Area).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_merge_aggregate_creates_then_updates() {
        let repo = repo();
        let d = drawing("p1", "P-001");
        repo.insert_drawings_ignore(&[d.clone()]).await.unwrap();

        let created = repo.merge_aggregate(&pipe("p1", &d.id, 25.0, 1)).await.unwrap();
        assert!(matches!(created, AggregateMergeOutcome::Created { .. }));

        let updated = repo.merge_aggregate(&pipe("p1", &d.id, 5.0, 3)).await.unwrap();
        match updated {
            AggregateMergeOutcome::Updated {
                total_linear_feet, ..
            } => assert_eq!(total_linear_feet, 30.0),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let stored = repo
            .find_component_by_key("p1", ComponentType::Pipe, "P-001-2-PIPE-A-AGG")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attributes.line_numbers, Some(vec![1, 3]));
        assert_eq!(stored.current_milestones, initial_milestones(ComponentType::Pipe));
        assert_eq!(repo.count_components("p1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_components_ignores_existing_key() {
        let repo = repo();
        let d = drawing("p1", "P-001");
        repo.insert_drawings_ignore(&[d.clone()]).await.unwrap();

        let mut a = pipe("p1", &d.id, 1.0, 1);
        a.component_type = ComponentType::Valve;
        let mut b = a.clone();
        b.id = uuid::Uuid::new_v4().to_string();

        let first = repo.insert_components_batch(&[a.clone()]).await.unwrap();
        assert_eq!(first.get(&ComponentType::Valve), Some(&1));
        let second = repo.insert_components_batch(&[b]).await.unwrap();
        assert!(second.is_empty());

        let keys = repo
            .list_identity_keys("p1", &[ComponentType::Valve])
            .await
            .unwrap();
        assert!(keys.contains(&(ComponentType::Valve, a.identity_key.canonical())));

        repo.retire_component(&a.id).await.unwrap();
        let keys = repo
            .list_identity_keys("p1", &[ComponentType::Valve])
            .await
            .unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_progress_templates_skip_unknown_types() {
        let repo = repo();
        {
            let conn = repo.get_conn().unwrap();
            conn.execute_batch(
                "INSERT INTO progress_template VALUES ('valve', 'tpl-valve');
                 INSERT INTO progress_template VALUES ('widget', 'tpl-widget');",
            )
            .unwrap();
        }

        let templates = repo.get_progress_template_ids().await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[&ComponentType::Valve], "tpl-valve");
    }
}
