// ==========================================
// 导入管道性质测试
// ==========================================
// 覆盖: 幂等 / 执行后回滚复原 / 原子性 / 重复 SKU / 交叉引用拆分 / 年份倒置 / 警告门禁
// ==========================================


use catalog_import::config::ImportRules;
use catalog_import::domain::{
    AddedEntry, DeleteReason, Diff, IssueCode, PartDraft, PartRef, SourceRef, WorkflowStatus,
};
use catalog_import::importer::{
    export_workbook, CatalogImporter, ImportError, ImportExecutor,
};
use catalog_import::repository::CatalogStore;
use std::collections::BTreeSet;
use test_helpers::*;

fn ack(codes: &[IssueCode]) -> BTreeSet<IssueCode> {
    codes.iter().copied().collect()
}

#[tokio::test]
async fn test_export_then_reimport_is_zero_change() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();

    let state = importer.store().load_state().unwrap();
    let exported = export_workbook(&state, &ImportRules::default());
    let preview = importer.preview(&exported).await.unwrap();

    assert!(preview.report.valid, "{:?}", preview.report.errors);
    assert!(preview.report.warnings.is_empty());
    let diff = preview.diff.unwrap();
    assert_eq!(diff.summary.total_changes, 0);

    let second = importer.execute(&exported, &BTreeSet::new()).await;
    assert!(matches!(second, Err(ImportError::NoChanges)));
    assert_eq!(importer.history(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_execute_then_rollback_restores_prior_state() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();
    let before = importer.store().load_state().unwrap();
    let acr_100 = before.parts.iter().find(|p| p.acr_sku == "ACR-100").unwrap();
    let acr_200 = before.parts.iter().find(|p| p.acr_sku == "ACR-200").unwrap();

    // 新增零件 + 更新类型 + 删除零件（级联）+ 删除标记 + 别名更新
    let edit = workbook(
        vec![
            part(&acr_100.id, "Activo", "ACR-100", "Drum", "NAT-100;[DELETE]NAT-101"),
            part(&acr_200.id, "Eliminar", "ACR-200", "Caliper", ""),
            part("", "", "ACR-300", "Pad", "NAT-300"),
        ],
        vec![application("", "", "ACR-300", "FORD", "FOCUS", "2012", "2018")],
        vec![alias("", "Chevy", "CHEVROLET MOTORS", "make")],
    );

    let outcome = importer
        .execute(&edit, &ack(&[IssueCode::PartTypeChanged, IssueCode::CascadeDelete]))
        .await
        .unwrap();
    assert_eq!(outcome.summary.parts_added, 1);
    assert_eq!(outcome.summary.parts_updated, 1);
    assert_eq!(outcome.summary.parts_deleted, 1);
    assert_eq!(outcome.summary.vehicle_applications_deleted, 1);
    assert_eq!(outcome.summary.cross_references_deleted, 2);
    assert_eq!(outcome.summary.aliases_updated, 1);

    let during = importer.store().load_state().unwrap();
    assert_ne!(during, before);

    let rolled = importer.rollback(&outcome.import_id).await.unwrap();
    assert_eq!(rolled.import_id, outcome.import_id);

    let after = importer.store().load_state().unwrap();
    assert_eq!(after, before);

    // 再次回滚被拒绝
    let again = importer.rollback(&outcome.import_id).await;
    assert!(matches!(again, Err(ImportError::RollbackRejected(_))));

    let history = importer.history(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().any(|h| h.id == outcome.import_id && h.consumed));
}

#[tokio::test]
async fn test_rollback_unknown_import_is_not_found() {
    let (_tmp, importer) = create_importer().unwrap();
    let result = importer.rollback("missing-import").await;
    assert!(matches!(result, Err(ImportError::ImportNotFound(_))));
}

#[tokio::test]
async fn test_constraint_violation_mid_batch_leaves_store_unchanged() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();
    let counts_before = importer.store().count_rows().unwrap();

    let draft = |sku: &str| AddedEntry {
        source: SourceRef::new("Parts", 4),
        row: PartDraft {
            acr_sku: sku.to_string(),
            part_type: "Rotor".to_string(),
            position_type: None,
            abs_type: None,
            bolt_pattern: None,
            drive_type: None,
            specifications: None,
            workflow_status: WorkflowStatus::Active,
            image_url: None,
        },
    };

    // 第 3 行与已存储的 ACR-100 冲突（UNIQUE），第 4 行不再执行
    let mut diff = Diff::default();
    diff.parts.added = vec![
        draft("ACR-900"),
        draft("ACR-901"),
        draft("ACR-100"),
        draft("ACR-902"),
    ];
    diff.refresh_summary();

    let result = ImportExecutor::new(importer.store()).execute(&diff);
    assert!(matches!(result, Err(ImportError::TransactionFailed(_))));

    assert_eq!(importer.store().count_rows().unwrap(), counts_before);
    assert_eq!(importer.history(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_sku_single_issue_and_no_diff() {
    let (_tmp, importer) = create_importer().unwrap();
    let wb = workbook(
        vec![
            part("", "", "ACR-500", "Rotor", ""),
            part("", "", "ACR-501", "Rotor", ""),
            part("", "", "ACR-500", "Pad", ""),
        ],
        vec![],
        vec![],
    );

    let preview = importer.preview(&wb).await.unwrap();
    assert!(!preview.report.valid);
    assert!(preview.diff.is_none());

    let dupes: Vec<_> = preview
        .report
        .errors
        .iter()
        .filter(|e| e.code == IssueCode::DuplicateSku)
        .collect();
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0].related_rows, vec![4, 6]);

    let result = importer.execute(&wb, &BTreeSet::new()).await;
    assert!(matches!(result, Err(ImportError::ValidationBlocked { .. })));
}

#[tokio::test]
async fn test_brand_cell_explodes_into_distinct_cross_references() {
    let (_tmp, importer) = create_importer().unwrap();
    let wb = workbook(vec![part("", "", "ACR-600", "Rotor", "NAT-001;NAT-002")], vec![], vec![]);

    let diff = importer.preview(&wb).await.unwrap().diff.unwrap();
    assert_eq!(diff.cross_references.added.len(), 2);
    let skus: Vec<&str> = diff
        .cross_references
        .added
        .iter()
        .map(|a| a.row.competitor_sku.as_str())
        .collect();
    assert_eq!(skus, vec!["NAT-001", "NAT-002"]);
    assert!(diff
        .cross_references
        .added
        .iter()
        .all(|a| a.row.part == PartRef::New("ACR600".to_string())));
}

#[tokio::test]
async fn test_inverted_year_range_blocks_diff() {
    let (_tmp, importer) = create_importer().unwrap();
    let wb = workbook(
        vec![part("", "", "ACR-700", "Rotor", "")],
        vec![application("", "", "ACR-700", "HONDA", "CIVIC", "2025", "2020")],
        vec![],
    );

    let preview = importer.preview(&wb).await.unwrap();
    assert!(!preview.report.valid);
    assert!(preview.diff.is_none());
    assert_eq!(preview.report.errors.len(), 1);
    assert_eq!(preview.report.errors[0].code, IssueCode::YearRangeInverted);
    assert_eq!(preview.report.errors[0].row, Some(4));
}

#[tokio::test]
async fn test_part_type_change_requires_acknowledgement() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();

    // 仅修改 ACR-200 的零件类型，其余字段与存储一致
    let wb = workbook(vec![part("", "", "ACR-200", "Bracket", "NAT-200")], vec![], vec![]);

    let report = importer.validate(&wb).await.unwrap();
    assert!(report.valid);
    assert!(report.errors.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].code, IssueCode::PartTypeChanged);

    let blocked = importer.execute(&wb, &BTreeSet::new()).await;
    match blocked {
        Err(ImportError::WarningsNotAcknowledged(codes)) => {
            assert_eq!(codes, vec![IssueCode::PartTypeChanged])
        }
        other => panic!("预期警告门禁拒绝，实际: {:?}", other.map(|o| o.import_id)),
    }

    let outcome = importer
        .execute(&wb, &ack(&[IssueCode::PartTypeChanged]))
        .await
        .unwrap();
    assert_eq!(outcome.summary.parts_updated, 1);
    assert_eq!(outcome.rows_imported, 1);

    let state = importer.store().load_state().unwrap();
    let updated = state.parts.iter().find(|p| p.acr_sku == "ACR-200").unwrap();
    assert_eq!(updated.part_type, "Bracket");
}

#[tokio::test]
async fn test_cascade_delete_lists_dependents() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();

    let wb = workbook(vec![part("", "Eliminar", "ACR-100", "Rotor", "")], vec![], vec![]);
    let diff = importer.preview(&wb).await.unwrap().diff.unwrap();

    assert_eq!(diff.summary.parts.deleted, 1);
    assert_eq!(diff.summary.vehicle_applications.deleted, 1);
    assert_eq!(diff.summary.cross_references.deleted, 2);
    assert!(diff
        .cross_references
        .deleted
        .iter()
        .all(|d| d.reason == DeleteReason::Cascade && d.source.is_none()));
    assert_eq!(diff.warnings.len(), 1);
    assert_eq!(diff.warnings[0].code, IssueCode::CascadeDelete);

    let blocked = importer.execute(&wb, &BTreeSet::new()).await;
    assert!(matches!(blocked, Err(ImportError::WarningsNotAcknowledged(_))));

    importer
        .execute(&wb, &ack(&[IssueCode::CascadeDelete]))
        .await
        .unwrap();
    let counts = importer.store().count_rows().unwrap();
    assert_eq!(counts.parts, 1);
    assert_eq!(counts.vehicle_applications, 1);
    assert_eq!(counts.cross_references, 1);
}

#[tokio::test]
async fn test_rename_and_old_sku_row_apply_both() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();
    let before = importer.store().load_state().unwrap();
    let acr_100 = before.parts.iter().find(|p| p.acr_sku == "ACR-100").unwrap();

    // 第 4 行按 id 改名，第 5 行以旧 SKU 新建零件
    let wb = workbook(
        vec![
            part(&acr_100.id, "", "ACR-101", "Rotor", ""),
            part("", "", "ACR-100", "Drum", ""),
        ],
        vec![],
        vec![],
    );

    let report = importer.validate(&wb).await.unwrap();
    assert!(report.valid, "{:?}", report.errors);
    let warnings: Vec<IssueCode> = report.warnings.iter().map(|w| w.code).collect();
    assert_eq!(warnings, vec![IssueCode::SkuChanged]);

    let outcome = importer
        .execute(&wb, &ack(&[IssueCode::SkuChanged]))
        .await
        .unwrap();
    assert_eq!(outcome.summary.parts_updated, 1);
    assert_eq!(outcome.summary.parts_added, 1);

    let after = importer.store().load_state().unwrap();
    let renamed = after.parts.iter().find(|p| p.id == acr_100.id).unwrap();
    assert_eq!(renamed.acr_sku, "ACR-101");
    assert_eq!(renamed.part_type, "Rotor");
    let fresh = after.parts.iter().find(|p| p.acr_sku == "ACR-100").unwrap();
    assert_ne!(fresh.id, acr_100.id);
    assert_eq!(fresh.part_type, "Drum");
}

#[tokio::test]
async fn test_sku_held_by_other_stored_part_blocks_import() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();
    let state = importer.store().load_state().unwrap();
    let acr_100 = state.parts.iter().find(|p| p.acr_sku == "ACR-100").unwrap();
    let acr_200 = state.parts.iter().find(|p| p.acr_sku == "ACR-200").unwrap();

    let taken = workbook(vec![part(&acr_100.id, "", "ACR-200", "Rotor", "")], vec![], vec![]);
    let preview = importer.preview(&taken).await.unwrap();
    assert!(!preview.report.valid);
    assert!(preview.diff.is_none());
    assert_eq!(preview.report.errors.len(), 1);
    assert_eq!(preview.report.errors[0].code, IssueCode::SkuTaken);
    assert_eq!(preview.report.errors[0].row, Some(4));

    let swap = workbook(
        vec![
            part(&acr_100.id, "", "ACR-200", "Rotor", ""),
            part(&acr_200.id, "", "ACR-100", "Caliper", ""),
        ],
        vec![],
        vec![],
    );
    let result = importer.execute(&swap, &ack(&[IssueCode::SkuChanged])).await;
    assert!(matches!(result, Err(ImportError::ValidationBlocked { .. })));
    assert_eq!(importer.store().load_state().unwrap(), state);
}

#[tokio::test]
async fn test_rename_chain_executes_in_release_order() {
    let (_tmp, importer) = create_importer().unwrap();
    importer
        .execute(&seed_workbook(), &BTreeSet::new())
        .await
        .unwrap();
    let state = importer.store().load_state().unwrap();
    let acr_100 = state.parts.iter().find(|p| p.acr_sku == "ACR-100").unwrap();
    let acr_200 = state.parts.iter().find(|p| p.acr_sku == "ACR-200").unwrap();

    // ACR-100 → ACR-200 写在前，ACR-200 → ACR-300 写在后
    let wb = workbook(
        vec![
            part(&acr_100.id, "", "ACR-200", "Rotor", ""),
            part(&acr_200.id, "", "ACR-300", "Caliper", ""),
        ],
        vec![],
        vec![],
    );
    let outcome = importer
        .execute(&wb, &ack(&[IssueCode::SkuChanged]))
        .await
        .unwrap();
    assert_eq!(outcome.summary.parts_updated, 2);

    let after = importer.store().load_state().unwrap();
    let sku_of = |id: &str| after.parts.iter().find(|p| p.id == id).map(|p| p.acr_sku.clone());
    assert_eq!(sku_of(&acr_100.id).as_deref(), Some("ACR-200"));
    assert_eq!(sku_of(&acr_200.id).as_deref(), Some("ACR-300"));
}

#[tokio::test]
async fn test_export_keeps_competitor_sku_with_inner_space() {
    let (_tmp, importer) = create_importer().unwrap();
    let wb = workbook(vec![part("", "", "ACR-800", "Rotor", "NAT 800;")], vec![], vec![]);
    importer.execute(&wb, &BTreeSet::new()).await.unwrap();

    let state = importer.store().load_state().unwrap();
    assert_eq!(state.cross_references.len(), 1);
    assert_eq!(state.cross_references[0].competitor_sku, "NAT 800");

    let exported = export_workbook(&state, &ImportRules::default());
    let preview = importer.preview(&exported).await.unwrap();
    assert!(preview.report.valid, "{:?}", preview.report.errors);
    assert!(preview.report.warnings.is_empty(), "{:?}", preview.report.warnings);
    assert_eq!(preview.diff.unwrap().summary.total_changes, 0);
}
