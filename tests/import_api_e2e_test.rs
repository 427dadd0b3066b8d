// ==========================================
// 导入 API 端到端测试
// ==========================================
// 模拟调用方的完整流程: 预览 → 执行（确认警告）→ 历史 → 回滚

use catalog_import::api::{ApiError, ImportApi};
use catalog_import::config::{config_keys, ConfigManager};
use catalog_import::domain::IssueCode;
use std::collections::BTreeSet;

use test_helpers::*;

#[tokio::test]
async fn test_import_api_full_flow() {
    let (_temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let api = ImportApi::new(db_path.clone());

    // 预览：全部为新增，无警告
    let preview = api.preview_workbook(&seed_workbook()).await.unwrap();
    assert!(preview.valid);
    assert!(preview.errors.is_empty());
    assert!(preview.warnings.is_empty());
    let diff = preview.diff.expect("校验通过时应返回差异");
    assert_eq!(diff.summary.parts.added, 2);
    assert_eq!(diff.summary.cross_references.added, 3);

    // 执行
    let executed = api
        .execute_workbook(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();
    assert!(executed.success);
    assert_eq!(executed.summary.parts_added, 2);
    assert_eq!(executed.summary.vehicle_applications_added, 2);
    assert_eq!(executed.summary.aliases_added, 1);

    // 响应字段使用 camelCase
    let json = serde_json::to_value(&executed).unwrap();
    assert!(json.get("importId").is_some());
    assert!(json["summary"].get("partsAdded").is_some());

    // 历史
    let history = api.history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, executed.import_id);
    assert_eq!(history[0].rows_imported, 8);
    assert!(!history[0].consumed);

    // 回滚
    let rolled = api.rollback(&executed.import_id).await.unwrap();
    assert!(rolled.success);
    let again = api.rollback(&executed.import_id).await;
    assert!(matches!(again, Err(ApiError::RollbackRejected(_))));

    // 回滚后重新预览，仍为全部新增
    let preview = api.preview_workbook(&seed_workbook()).await.unwrap();
    assert_eq!(preview.diff.unwrap().summary.parts.added, 2);
}

#[tokio::test]
async fn test_cascade_warning_surfaces_in_preview_and_gates_execute() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path);
    api.execute_workbook(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();

    let wb = workbook(vec![part("", "Eliminar", "ACR-200", "Caliper", "")], vec![], vec![]);
    let preview = api.preview_workbook(&wb).await.unwrap();
    assert!(preview.valid);
    assert_eq!(preview.warnings.len(), 1);
    assert_eq!(preview.warnings[0].code, IssueCode::CascadeDelete);

    let blocked = api.execute_workbook(&wb, &BTreeSet::new()).await;
    match blocked {
        Err(ApiError::WarningsNotAcknowledged(codes)) => {
            assert_eq!(codes, vec![IssueCode::CascadeDelete])
        }
        other => panic!("预期警告门禁拒绝，实际: {:?}", other.map(|r| r.import_id)),
    }

    let acknowledged = ImportApi::parse_acknowledged(&["W9"]).unwrap();
    let executed = api.execute_workbook(&wb, &acknowledged).await.unwrap();
    assert_eq!(executed.summary.parts_deleted, 1);
}

#[tokio::test]
async fn test_invalid_and_no_change_imports_are_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path);

    let invalid = workbook(vec![part("", "Borrar", "ACR-1", "Rotor", "")], vec![], vec![]);
    let report = api.validate_workbook(&invalid).await.unwrap();
    assert!(!report.valid);
    assert_eq!(report.errors[0].code, IssueCode::UnknownRowAction);
    assert!(matches!(
        api.execute_workbook(&invalid, &BTreeSet::new()).await,
        Err(ApiError::Invalid(_))
    ));

    let empty = workbook(vec![], vec![], vec![]);
    assert!(matches!(
        api.execute_workbook(&empty, &BTreeSet::new()).await,
        Err(ApiError::NoChanges)
    ));
    assert!(api.history(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sku_prefix_is_read_from_config() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    ConfigManager::new(&db_path)
        .unwrap()
        .set_global_config_value(config_keys::SKU_PREFIX, "XYZ")
        .unwrap();
    let api = ImportApi::new(db_path);

    let report = api.validate_workbook(&seed_workbook()).await.unwrap();
    assert!(!report.valid);
    assert!(report.errors.iter().all(|e| e.code == IssueCode::SkuFormat));
    assert_eq!(report.errors.len(), 2);
}

#[tokio::test]
async fn test_file_entry_rejects_missing_and_non_xlsx_files() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path);

    assert!(matches!(
        api.preview("tests/fixtures/does_not_exist.xlsx").await,
        Err(ApiError::NotFound(_))
    ));

    let csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    assert!(matches!(
        api.validate(csv.path().to_str().unwrap()).await,
        Err(ApiError::InvalidInput(_))
    ));

    assert!(matches!(
        api.execute("x.xlsx", &["W99".to_string()]).await,
        Err(ApiError::InvalidInput(_))
    ));
}
