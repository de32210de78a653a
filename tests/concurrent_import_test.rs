// ==========================================
// 并发导入测试
// ==========================================
// 测试目标: 同一项目的两个导入并发执行（各自独立连接）
// - 组件 / 图纸 / 元数据不重复
// - 聚合管道的延米被两次导入完整累加
// ==========================================


use serde_json::json;
use takeoff_import::domain::{ComponentType, MetadataDimension};
use takeoff_import::importer::TakeoffImporter;
use takeoff_import::logging;
use takeoff_import::repository::TakeoffImportRepository;
use test_helpers::{create_test_db, create_test_importer, request, row};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_imports_same_project() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let rows = vec![
        json!({"Drawing": "P-001", "Type": "valve", "QTY": 2, "Cmdty Code": "V100", "Area": "North"}),
        row("P-001", "pipe", json!(10), "PIPE-A"),
    ];

    let importer_a = create_test_importer(&db_path);
    let importer_b = create_test_importer(&db_path);
    let request_a = request("p1", rows.clone());
    let request_b = request("p1", rows);

    let task_a = tokio::spawn(async move { importer_a.import_request(request_a).await });
    let task_b = tokio::spawn(async move { importer_b.import_request(request_b).await });

    let result_a = task_a.await.expect("导入任务 A 异常");
    let result_b = task_b.await.expect("导入任务 B 异常");

    assert!(result_a.success, "A 失败: {:?}", result_a.error);
    assert!(result_b.success, "B 失败: {:?}", result_b.error);

    // 阀门: 两个标识键只落库一次，另一方计为跳过
    let valves_created = result_a.components_by_type.get(&ComponentType::Valve).copied().unwrap_or(0)
        + result_b.components_by_type.get(&ComponentType::Valve).copied().unwrap_or(0);
    assert_eq!(valves_created, 2);
    assert_eq!(result_a.components_skipped + result_b.components_skipped, 2);

    // 聚合管道: 一方新建，另一方累加
    let pipes_created = result_a.components_by_type.get(&ComponentType::Pipe).copied().unwrap_or(0)
        + result_b.components_by_type.get(&ComponentType::Pipe).copied().unwrap_or(0);
    assert_eq!(pipes_created, 1);
    assert_eq!(result_a.components_updated + result_b.components_updated, 1);

    assert_eq!(result_a.drawings_created + result_b.drawings_created, 1);
    assert_eq!(
        result_a.metadata_created.areas + result_b.metadata_created.areas,
        1
    );

    let importer = create_test_importer(&db_path);
    let repo = importer.repository();
    assert_eq!(repo.count_components("p1").await.unwrap(), 3);
    assert_eq!(repo.count_drawings("p1").await.unwrap(), 1);
    assert_eq!(
        repo.count_metadata("p1", MetadataDimension::Area).await.unwrap(),
        1
    );

    let pipe = repo
        .find_component_by_key("p1", ComponentType::Pipe, "P-001-NOSIZE-PIPE-A-AGG")
        .await
        .unwrap()
        .expect("缺少聚合管道");
    assert_eq!(pipe.attributes.total_linear_feet, Some(20.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_imports_different_projects_isolated() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let mut tasks = Vec::new();
    for project in ["p1", "p2", "p3"] {
        let importer = create_test_importer(&db_path);
        let req = request(project, vec![row("P-001", "flange", json!(3), "F100")]);
        tasks.push(tokio::spawn(async move { importer.import_request(req).await }));
    }

    for task in tasks {
        let result = task.await.expect("导入任务异常");
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.components_created, 3);
        assert_eq!(result.drawings_created, 1);
    }
}
