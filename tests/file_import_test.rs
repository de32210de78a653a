// ==========================================
// 文件导入测试
// ==========================================
// 测试目标: CSV 文件路径（解析 → 列检测 → 共用流程）、预览、批量导入
// ==========================================


use std::io::Write;
use std::path::{Path, PathBuf};
use takeoff_import::domain::{ComponentType, FailureKind, MetadataDimension};
use takeoff_import::importer::TakeoffImporter;
use takeoff_import::logging;
use takeoff_import::repository::TakeoffImportRepository;
use test_helpers::{create_mock_importer, create_test_db, create_test_importer, write_csv, MockConfig};

const TAKEOFF_CSV: &str = "\
Drawing,Type,QTY,Cmdty Code,Size,Area,Bay
P-001,Valve,2,V100,2,North,B1
P-001,Pipe,10,PIPE-A,2,North,
P-001,Pipe,15,PIPE-A,2,North,
,,,,,,
P-002,Gasket,0,G1,,South,
";

#[tokio::test]
async fn test_import_csv_file() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);
    let csv = write_csv(TAKEOFF_CSV);

    let result = importer.import_file("p1", csv.path()).await;

    assert!(result.success, "导入失败: {:?}", result.error);
    assert_eq!(result.rows_total, 4);
    assert_eq!(result.rows_skipped, 1);
    assert_eq!(result.components_by_type.get(&ComponentType::Valve), Some(&2));
    assert_eq!(result.components_by_type.get(&ComponentType::Pipe), Some(&1));
    // 仅跳过行引用了 P-002 / South
    assert_eq!(result.drawings_created, 1);
    assert_eq!(result.metadata_created.areas, 1);

    let repo = importer.repository();
    let pipe = repo
        .find_component_by_key("p1", ComponentType::Pipe, "P-001-2-PIPE-A-AGG")
        .await
        .unwrap()
        .expect("缺少聚合管道");
    assert_eq!(pipe.attributes.total_linear_feet, Some(25.0));
    assert_eq!(pipe.attributes.line_numbers, Some(vec![2, 3]));

    let valve = repo
        .find_component_by_key("p1", ComponentType::Valve, "P-001|2|V100|001")
        .await
        .unwrap()
        .expect("缺少阀门");
    assert_eq!(
        valve.attributes.unmapped_fields.get("Bay"),
        Some(&"B1".to_string())
    );
    assert_eq!(
        repo.count_metadata("p1", MetadataDimension::Area).await.unwrap(),
        1
    );

    let batch = repo
        .get_import_batch(&result.batch_id)
        .await
        .unwrap()
        .expect("缺少批次记录");
    assert_eq!(batch.source_name.as_deref(), csv.path().to_str());
}

#[tokio::test]
async fn test_csv_missing_required_column() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);
    let csv = write_csv("Drawing,Type,Cmdty Code\nP-001,valve,V100\n");

    let result = importer.import_file("p1", csv.path()).await;

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Payload));
    assert!(result.error.unwrap().contains("qty"));
}

#[tokio::test]
async fn test_missing_file_is_payload_failure() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let result = importer
        .import_file("p1", Path::new("/nonexistent/takeoff.csv"))
        .await;

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Payload));
}

#[tokio::test]
async fn test_preview_does_not_write() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);
    let csv = write_csv(TAKEOFF_CSV);

    let preview = importer.preview_file(csv.path()).await.unwrap();

    assert_eq!(preview.total_rows, 4);
    assert!(preview.mapping.has_all_required_fields);
    assert_eq!(preview.mapping.unmapped_columns, vec!["Bay".to_string()]);
    assert_eq!(preview.validation.valid_count, 3);
    assert_eq!(preview.validation.skipped_count, 1);
    assert!(preview.validation.can_import);
    assert_eq!(importer.repository().count_components("p1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_batch_import_multiple_files() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);

    let first = write_csv("Drawing,Type,QTY,Cmdty Code\nP-010,flange,2,F1\n");
    let second = write_csv("Drawing,Type,QTY,Cmdty Code\nP-011,support,1,S1\n");
    let broken = write_csv("Drawing,Type,QTY,Cmdty Code\nP-012,widget,1,W1\n");

    let results = importer
        .batch_import(
            "p1",
            vec![
                first.path().to_path_buf(),
                second.path().to_path_buf(),
                broken.path().to_path_buf(),
                PathBuf::from("/nonexistent/missing.csv"),
            ],
        )
        .await;

    assert_eq!(results.len(), 4);
    assert!(results[0].success);
    assert!(results[1].success);
    assert_eq!(results[2].failure_kind, Some(FailureKind::Validation));
    assert_eq!(results[3].failure_kind, Some(FailureKind::Payload));
    assert_eq!(importer.repository().count_components("p1").await.unwrap(), 3);
}

#[tokio::test]
async fn test_repeated_header_value_not_used() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path);
    let csv = write_csv("Drawing,Type,Qty,Commodity Code,Qty\nP-001,valve,2,V100,7\n");

    let result = importer.import_file("p1", csv.path()).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.components_created, 2);

    let valve = importer
        .repository()
        .find_component_by_key("p1", ComponentType::Valve, "P-001|NOSIZE|V100|002")
        .await
        .unwrap()
        .expect("缺少阀门");
    assert_eq!(
        valve.attributes.unmapped_fields.get("Qty"),
        Some(&"7".to_string())
    );
}

#[tokio::test]
async fn test_oversized_file_rejected_before_parsing() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_mock_importer(
        &db_path,
        MockConfig {
            max_payload_bytes: 64,
            ..Default::default()
        },
    );

    // 非法 xlsx 内容: 若先解析会得到 Excel 解析错误
    let mut file = tempfile::Builder::new()
        .suffix(".xlsx")
        .tempfile()
        .expect("Failed to create xlsx");
    file.write_all(&[0u8; 256]).expect("Failed to write xlsx");

    let result = importer.import_file("p1", file.path()).await;

    assert!(!result.success);
    assert_eq!(result.failure_kind, Some(FailureKind::Payload));
    let message = result.error.unwrap();
    assert!(message.contains("请求体过大"), "{}", message);
}
