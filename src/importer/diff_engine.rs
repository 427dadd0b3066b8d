// ==========================================
// 零件目录导入 - 差异引擎
// ==========================================
// 职责: 已校验行 × 当前存储 → 各实体 Added / Updated / Deleted
// 红线: 只读，不修改存储；三个集合互不相交
// 红线: 未出现在表格中的存储行保持不变，删除意图只来自 Eliminar / [DELETE]
// 红线: 零件删除的级联影响显式列出并产生 W9，不依赖数据库级联
// ==========================================

use crate::domain::catalog::{CatalogState, Part, VehicleAlias, VehicleApplication};
use crate::domain::diff::{
    AddedEntry, ApplicationDraft, CrossReferenceDraft, DeleteReason, DeletedEntry, Diff,
    FieldChange, PartDraft, UpdatedEntry,
};
use crate::domain::issue::{IssueCode, ValidationIssue};
use crate::domain::rows::{ExtractedRows, PartRef, RowId, VehicleApplicationRow};
use crate::domain::types::{AliasType, EntityKind};
use crate::importer::normalize::{normalize_key, normalize_sku, same_optional};
use crate::importer::store_index::{alias_key, application_key, cross_reference_key, StoreIndex};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// 零件解析结果（供依赖行引用）
#[derive(Debug, Default)]
struct PartResolution {
    by_row: HashMap<usize, PartRef>,   // Parts 表行号 → 零件引用（仅保留行）
    by_sku: HashMap<String, PartRef>,  // 规范化 SKU → 零件引用（仅保留行）
    deleted_ids: HashSet<String>,
}

pub struct DiffEngine<'a> {
    index: StoreIndex<'a>,
}

impl<'a> DiffEngine<'a> {
    pub fn new(state: &'a CatalogState) -> Self {
        Self {
            index: StoreIndex::build(state),
        }
    }

    /// 计算完整差异
    ///
    /// # 参数
    /// - rows: 已通过校验的提取结果
    ///
    /// # 返回
    /// 各实体差异 + 汇总 + 级联删除警告
    #[instrument(skip_all, fields(rows = rows.total_rows()))]
    pub fn compute(&self, rows: &ExtractedRows) -> Diff {
        let mut diff = Diff::default();

        let parts = self.diff_parts(rows, &mut diff);
        self.diff_applications(rows, &parts, &mut diff);
        self.diff_cross_references(rows, &parts, &mut diff);
        self.diff_aliases(rows, &mut diff);
        self.cascade_part_deletes(&mut diff);
        diff.refresh_summary();

        info!(
            total_changes = diff.summary.total_changes,
            parts = ?diff.summary.parts,
            vehicle_applications = ?diff.summary.vehicle_applications,
            cross_references = ?diff.summary.cross_references,
            aliases = ?diff.summary.aliases,
            "差异计算完成"
        );
        diff
    }

    // ==========================================
    // 零件
    // ==========================================
    fn diff_parts(&self, rows: &ExtractedRows, diff: &mut Diff) -> PartResolution {
        let mut resolution = PartResolution::default();
        let matches = self.index.match_part_rows(&rows.parts);

        for row in &rows.parts {
            let stored = matches.get(&row.source.row).copied();

            if row.action.is_delete() {
                if let Some(stored) = stored {
                    if resolution.deleted_ids.insert(stored.id.clone()) {
                        diff.parts.deleted.push(DeletedEntry {
                            source: Some(row.source.clone()),
                            reason: DeleteReason::RowAction,
                            before: stored.clone(),
                        });
                    }
                } else {
                    debug!(row = row.source.row, "删除行未匹配到存储零件，忽略");
                }
                continue;
            }

            match stored {
                Some(stored) => {
                    let after = Part {
                        id: stored.id.clone(),
                        // 仅格式不同（大小写、分隔符）时保留存储原文
                        acr_sku: match row.acr_sku.as_ref() {
                            Some(sku) if normalize_sku(sku) != normalize_sku(&stored.acr_sku) => sku.clone(),
                            _ => stored.acr_sku.clone(),
                        },
                        part_type: row.part_type.clone().unwrap_or_else(|| stored.part_type.clone()),
                        position_type: row.position_type.clone(),
                        abs_type: row.abs_type.clone(),
                        bolt_pattern: row.bolt_pattern.clone(),
                        drive_type: row.drive_type.clone(),
                        specifications: row.specifications.clone(),
                        workflow_status: row.workflow_status.unwrap_or(stored.workflow_status),
                        image_url: row.image_url.clone(),
                    };
                    let changes = part_changes(stored, &after);
                    let part_ref = PartRef::Existing(stored.id.clone());
                    resolution.by_row.insert(row.source.row, part_ref.clone());
                    resolution.by_sku.insert(normalize_sku(&after.acr_sku), part_ref);

                    if !changes.is_empty() {
                        diff.parts.updated.push(UpdatedEntry {
                            source: row.source.clone(),
                            before: stored.clone(),
                            after,
                            changes,
                        });
                    }
                }
                None => {
                    // 带 id 但不存在的行已由 E9 拦截
                    if row.id.existing().is_some() {
                        continue;
                    }
                    let (Some(sku), Some(part_type)) = (row.acr_sku.as_ref(), row.part_type.as_ref()) else {
                        continue;
                    };
                    let key = normalize_sku(sku);
                    let part_ref = PartRef::New(key.clone());
                    resolution.by_row.insert(row.source.row, part_ref.clone());
                    resolution.by_sku.insert(key, part_ref);

                    diff.parts.added.push(AddedEntry {
                        source: row.source.clone(),
                        row: PartDraft {
                            acr_sku: sku.clone(),
                            part_type: part_type.clone(),
                            position_type: row.position_type.clone(),
                            abs_type: row.abs_type.clone(),
                            bolt_pattern: row.bolt_pattern.clone(),
                            drive_type: row.drive_type.clone(),
                            specifications: row.specifications.clone(),
                            workflow_status: row.workflow_status.unwrap_or_default(),
                            image_url: row.image_url.clone(),
                        },
                    });
                }
            }
        }

        order_part_renames(&mut diff.parts.updated);
        resolution
    }

    /// 依赖行引用的零件：优先本次导入的保留行，其次存储（排除本次删除的零件）
    fn resolve_part(&self, sku: &str, parts: &PartResolution) -> Option<PartRef> {
        if let Some(part_ref) = parts.by_sku.get(&normalize_sku(sku)) {
            return Some(part_ref.clone());
        }
        self.index
            .part_by_sku(sku)
            .filter(|p| !parts.deleted_ids.contains(&p.id))
            .map(|p| PartRef::Existing(p.id.clone()))
    }

    // ==========================================
    // 车型适配
    // ==========================================
    fn diff_applications(&self, rows: &ExtractedRows, parts: &PartResolution, diff: &mut Diff) {
        let mut deleted_ids = HashSet::new();
        let mut updated_ids = HashSet::new();
        // 处理后仍存在的组合键（带 id 行的结果 + 新增行）
        let mut seen_keys = HashSet::new();

        // 带 id 的行先认领，无 id 的行不再按组合键匹配已被认领的记录
        let claimed: HashSet<&str> = rows
            .vehicle_applications
            .iter()
            .filter_map(|r| r.id.existing())
            .collect();
        let ordered = rows
            .vehicle_applications
            .iter()
            .filter(|r| r.id.existing().is_some())
            .chain(rows.vehicle_applications.iter().filter(|r| r.id.existing().is_none()));

        for row in ordered {
            let part_ref = row
                .acr_sku
                .as_deref()
                .and_then(|sku| self.resolve_part(sku, parts));
            let stored = self.match_application(row, part_ref.as_ref(), &claimed);

            if row.action.is_delete() {
                if let Some(stored) = stored {
                    if deleted_ids.insert(stored.id.clone()) {
                        diff.vehicle_applications.deleted.push(DeletedEntry {
                            source: Some(row.source.clone()),
                            reason: DeleteReason::RowAction,
                            before: stored.clone(),
                        });
                    }
                }
                continue;
            }

            if row.id.existing().is_some() && stored.is_none() {
                continue;
            }
            let (Some(part), Some(make), Some(model), Some(start_year), Some(end_year)) = (
                part_ref,
                row.make.clone(),
                row.model.clone(),
                row.start_year,
                row.end_year,
            ) else {
                continue;
            };
            let draft = ApplicationDraft {
                part,
                make,
                model,
                start_year,
                end_year,
            };
            let key = (
                draft.part.clone(),
                normalize_key(&draft.make),
                normalize_key(&draft.model),
                draft.start_year,
                draft.end_year,
            );

            match stored {
                Some(stored) => {
                    if deleted_ids.contains(&stored.id) || !updated_ids.insert(stored.id.clone()) {
                        continue;
                    }
                    seen_keys.insert(key);
                    let changes = self.application_changes(stored, &draft, row.acr_sku.as_deref());
                    if changes.is_empty() {
                        continue;
                    }
                    diff.vehicle_applications.updated.push(UpdatedEntry {
                        source: row.source.clone(),
                        before: stored.clone(),
                        after: draft,
                        changes,
                    });
                }
                None => {
                    if seen_keys.insert(key) {
                        diff.vehicle_applications.added.push(AddedEntry {
                            source: row.source.clone(),
                            row: draft,
                        });
                    }
                }
            }
        }
    }

    /// 按 id 匹配；无 id 时按 (零件, make, model, 年份) 组合键匹配未被认领的记录
    fn match_application(
        &self,
        row: &VehicleApplicationRow,
        part_ref: Option<&PartRef>,
        claimed: &HashSet<&str>,
    ) -> Option<&'a VehicleApplication> {
        match &row.id {
            RowId::Existing(id) => self.index.application_by_id(id),
            RowId::New => {
                let Some(PartRef::Existing(part_id)) = part_ref else {
                    return None;
                };
                let key = application_key(
                    part_id,
                    row.make.as_deref()?,
                    row.model.as_deref()?,
                    row.start_year?,
                    row.end_year?,
                );
                self.index
                    .application_by_key(&key)
                    .filter(|va| !claimed.contains(va.id.as_str()))
            }
        }
    }

    fn application_changes(
        &self,
        stored: &VehicleApplication,
        draft: &ApplicationDraft,
        row_sku: Option<&str>,
    ) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if draft.part != PartRef::Existing(stored.part_id.clone()) {
            let was = self
                .index
                .part_by_id(&stored.part_id)
                .map(|p| p.acr_sku.clone())
                .unwrap_or_else(|| stored.part_id.clone());
            changes.push(FieldChange::new("acr_sku", Some(was), row_sku.map(str::to_string)));
        }
        push_text(&mut changes, "make", &stored.make, &draft.make);
        push_text(&mut changes, "model", &stored.model, &draft.model);
        push_number(&mut changes, "start_year", stored.start_year, draft.start_year);
        push_number(&mut changes, "end_year", stored.end_year, draft.end_year);
        changes
    }

    // ==========================================
    // 交叉引用
    // ==========================================
    fn diff_cross_references(&self, rows: &ExtractedRows, parts: &PartResolution, diff: &mut Diff) {
        let mut deleted_ids = HashSet::new();
        let mut updated_ids = HashSet::new();
        let mut seen_added = HashSet::new();

        for row in &rows.cross_references {
            // 父零件被删除时由级联处理；单元格内重复项以首次出现为准
            if row.parent_action.is_delete() || row.repeated_in_cell {
                continue;
            }
            let Some(part) = parts.by_row.get(&row.source.row) else {
                continue;
            };
            let stored = match part {
                PartRef::Existing(part_id) => self.index.cross_reference_by_key(&cross_reference_key(
                    part_id,
                    &row.competitor_brand,
                    &row.competitor_sku,
                )),
                PartRef::New(_) => None,
            };

            if row.delete_marker {
                if let Some(stored) = stored {
                    if !updated_ids.contains(&stored.id) && deleted_ids.insert(stored.id.clone()) {
                        diff.cross_references.deleted.push(DeletedEntry {
                            source: Some(row.source.clone()),
                            reason: DeleteReason::Marker,
                            before: stored.clone(),
                        });
                    }
                }
                continue;
            }

            let draft = CrossReferenceDraft {
                part: part.clone(),
                competitor_brand: row.competitor_brand.clone(),
                competitor_sku: row.competitor_sku.clone(),
            };

            match stored {
                Some(stored) => {
                    if stored.competitor_sku == row.competitor_sku
                        || deleted_ids.contains(&stored.id)
                        || !updated_ids.insert(stored.id.clone())
                    {
                        continue;
                    }
                    diff.cross_references.updated.push(UpdatedEntry {
                        source: row.source.clone(),
                        before: stored.clone(),
                        changes: vec![FieldChange::new(
                            "competitor_sku",
                            Some(stored.competitor_sku.clone()),
                            Some(row.competitor_sku.clone()),
                        )],
                        after: draft,
                    });
                }
                None => {
                    let key = (
                        part.clone(),
                        row.competitor_brand.clone(),
                        normalize_sku(&row.competitor_sku),
                    );
                    if seen_added.insert(key) {
                        diff.cross_references.added.push(AddedEntry {
                            source: row.source.clone(),
                            row: draft,
                        });
                    }
                }
            }
        }
    }

    // ==========================================
    // 别名
    // ==========================================
    fn diff_aliases(&self, rows: &ExtractedRows, diff: &mut Diff) {
        let mut touched: HashSet<(String, AliasType)> = HashSet::new();

        for row in &rows.aliases {
            let (Some(alias), Some(alias_type)) = (row.alias.as_deref(), row.alias_type) else {
                continue;
            };
            if !touched.insert(alias_key(alias, alias_type)) {
                continue;
            }
            let stored = self.index.alias(alias, alias_type);

            if row.action.is_delete() {
                if let Some(stored) = stored {
                    diff.aliases.deleted.push(DeletedEntry {
                        source: Some(row.source.clone()),
                        reason: DeleteReason::RowAction,
                        before: stored.clone(),
                    });
                }
                continue;
            }

            let Some(canonical) = row.canonical_name.as_deref() else {
                continue;
            };
            match stored {
                Some(stored) if stored.canonical_name == canonical => {}
                Some(stored) => diff.aliases.updated.push(UpdatedEntry {
                    source: row.source.clone(),
                    before: stored.clone(),
                    after: VehicleAlias {
                        alias: stored.alias.clone(),
                        canonical_name: canonical.to_string(),
                        alias_type,
                    },
                    changes: vec![FieldChange::new(
                        "canonical_name",
                        Some(stored.canonical_name.clone()),
                        Some(canonical.to_string()),
                    )],
                }),
                None => diff.aliases.added.push(AddedEntry {
                    source: row.source.clone(),
                    row: VehicleAlias {
                        alias: alias.to_string(),
                        canonical_name: canonical.to_string(),
                        alias_type,
                    },
                }),
            }
        }
    }

    // ==========================================
    // 级联删除
    // ==========================================
    fn cascade_part_deletes(&self, diff: &mut Diff) {
        let mut handled_apps: HashSet<String> = diff
            .vehicle_applications
            .deleted
            .iter()
            .map(|d| d.before.id.clone())
            .chain(diff.vehicle_applications.updated.iter().map(|u| u.before.id.clone()))
            .collect();
        let mut handled_refs: HashSet<String> = diff
            .cross_references
            .deleted
            .iter()
            .map(|d| d.before.id.clone())
            .chain(diff.cross_references.updated.iter().map(|u| u.before.id.clone()))
            .collect();

        let deleted_parts: Vec<(Part, Option<usize>)> = diff
            .parts
            .deleted
            .iter()
            .map(|d| (d.before.clone(), d.source.as_ref().map(|s| s.row)))
            .collect();

        for (part, row) in deleted_parts {
            let mut app_count = 0;
            for va in self.index.applications_of(&part.id) {
                if handled_apps.insert(va.id.clone()) {
                    diff.vehicle_applications.deleted.push(DeletedEntry {
                        source: None,
                        reason: DeleteReason::Cascade,
                        before: (*va).clone(),
                    });
                    app_count += 1;
                }
            }

            let mut ref_count = 0;
            for cr in self.index.cross_references_of(&part.id) {
                if handled_refs.insert(cr.id.clone()) {
                    diff.cross_references.deleted.push(DeletedEntry {
                        source: None,
                        reason: DeleteReason::Cascade,
                        before: (*cr).clone(),
                    });
                    ref_count += 1;
                }
            }

            if app_count + ref_count > 0 {
                diff.warnings.push(ValidationIssue::new(
                    IssueCode::CascadeDelete,
                    EntityKind::Part.sheet_name(),
                    row,
                    format!(
                        "删除零件 '{}' 将同时删除 {} 条车型适配与 {} 条交叉引用",
                        part.acr_sku, app_count, ref_count
                    ),
                ));
            }
        }
    }
}

/// 改名链排序：目标 SKU 的当前持有者先更新，避免 UNIQUE 冲突
///
/// 互换（环）已由 E24 拦截，这里对环保持原有顺序
fn order_part_renames(updated: &mut Vec<UpdatedEntry<Part>>) {
    let holder_of: HashMap<String, usize> = updated
        .iter()
        .enumerate()
        .map(|(i, u)| (normalize_sku(&u.before.acr_sku), i))
        .collect();

    let mut placed = vec![false; updated.len()];
    let mut order = Vec::with_capacity(updated.len());
    for start in 0..updated.len() {
        let mut chain: Vec<usize> = Vec::new();
        let mut current = start;
        while !placed[current] && !chain.contains(&current) {
            chain.push(current);
            match holder_of.get(&normalize_sku(&updated[current].after.acr_sku)) {
                Some(&next) if next != current => current = next,
                _ => break,
            }
        }
        for i in chain.into_iter().rev() {
            placed[i] = true;
            order.push(i);
        }
    }

    let mut slots: Vec<Option<UpdatedEntry<Part>>> = std::mem::take(updated).into_iter().map(Some).collect();
    updated.extend(order.into_iter().filter_map(|i| slots[i].take()));
}

// ==========================================
// 字段比较
// ==========================================

fn part_changes(before: &Part, after: &Part) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    push_text(&mut changes, "acr_sku", &before.acr_sku, &after.acr_sku);
    push_text(&mut changes, "part_type", &before.part_type, &after.part_type);
    push_optional(&mut changes, "position_type", &before.position_type, &after.position_type);
    push_optional(&mut changes, "abs_type", &before.abs_type, &after.abs_type);
    push_optional(&mut changes, "bolt_pattern", &before.bolt_pattern, &after.bolt_pattern);
    push_optional(&mut changes, "drive_type", &before.drive_type, &after.drive_type);
    push_optional(&mut changes, "specifications", &before.specifications, &after.specifications);
    if before.workflow_status != after.workflow_status {
        changes.push(FieldChange::new(
            "workflow_status",
            Some(before.workflow_status.as_str().to_string()),
            Some(after.workflow_status.as_str().to_string()),
        ));
    }
    push_optional(&mut changes, "image_url", &before.image_url, &after.image_url);
    changes
}

fn push_text(changes: &mut Vec<FieldChange>, field: &str, was: &str, now: &str) {
    if was.trim() != now.trim() {
        changes.push(FieldChange::new(field, Some(was.to_string()), Some(now.to_string())));
    }
}

fn push_optional(changes: &mut Vec<FieldChange>, field: &str, was: &Option<String>, now: &Option<String>) {
    if !same_optional(was.as_deref(), now.as_deref()) {
        changes.push(FieldChange::new(field, was.clone(), now.clone()));
    }
}

fn push_number(changes: &mut Vec<FieldChange>, field: &str, was: i32, now: i32) {
    if was != now {
        changes.push(FieldChange::new(field, Some(was.to_string()), Some(now.to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::CrossReference;
    use crate::domain::rows::{AliasRow, CrossReferenceRow, PartRow, SourceRef};
    use crate::domain::types::{RowAction, WorkflowStatus};

    const PART_ID: &str = "0d6b3a4e-1c2f-4a5b-9c8d-7e6f5a4b3c2d";
    const APP_ID: &str = "1a2b3c4d-5e6f-4a1b-8c2d-3e4f5a6b7c8d";
    const CR_ID: &str = "9f8e7d6c-5b4a-4c3d-8e2f-1a0b9c8d7e6f";

    fn stored_state() -> CatalogState {
        CatalogState {
            parts: vec![Part {
                id: PART_ID.to_string(),
                acr_sku: "ACR-100".to_string(),
                part_type: "Rotor".to_string(),
                position_type: Some("Front".to_string()),
                abs_type: None,
                bolt_pattern: None,
                drive_type: None,
                specifications: None,
                workflow_status: WorkflowStatus::Active,
                image_url: None,
            }],
            vehicle_applications: vec![VehicleApplication {
                id: APP_ID.to_string(),
                part_id: PART_ID.to_string(),
                make: "HONDA".to_string(),
                model: "CIVIC".to_string(),
                start_year: 2016,
                end_year: 2020,
            }],
            cross_references: vec![CrossReference {
                id: CR_ID.to_string(),
                part_id: PART_ID.to_string(),
                competitor_brand: "NATIONAL".to_string(),
                competitor_sku: "NAT-100".to_string(),
            }],
            aliases: vec![VehicleAlias {
                alias: "CHEVY".to_string(),
                canonical_name: "CHEVROLET".to_string(),
                alias_type: AliasType::Make,
            }],
        }
    }

    fn part_row(row: usize, id: Option<&str>, sku: &str) -> PartRow {
        PartRow {
            source: SourceRef::new("Parts", row),
            id: RowId::from_cell(id),
            action: RowAction::Keep,
            acr_sku: Some(sku.to_string()),
            part_type: Some("Rotor".to_string()),
            position_type: Some("Front".to_string()),
            abs_type: None,
            bolt_pattern: None,
            drive_type: None,
            specifications: None,
            workflow_status: Some(WorkflowStatus::Active),
            image_url: None,
        }
    }

    fn cr_row(row: usize, parent: &PartRow, sku: &str, delete_marker: bool) -> CrossReferenceRow {
        CrossReferenceRow {
            source: SourceRef::new("Parts", row),
            column: "National".to_string(),
            parent_id: parent.id.clone(),
            parent_sku: parent.acr_sku.clone(),
            parent_action: parent.action,
            competitor_brand: "NATIONAL".to_string(),
            competitor_sku: sku.to_string(),
            delete_marker,
            repeated_in_cell: false,
            space_delimited: false,
        }
    }

    fn app_row(row: usize, sku: &str, start: i32, end: i32) -> VehicleApplicationRow {
        VehicleApplicationRow {
            source: SourceRef::new("Vehicle Applications", row),
            id: RowId::New,
            action: RowAction::Keep,
            acr_sku: Some(sku.to_string()),
            make: Some("HONDA".to_string()),
            model: Some("CIVIC".to_string()),
            start_year: Some(start),
            end_year: Some(end),
        }
    }

    #[test]
    fn test_unchanged_rows_produce_empty_diff() {
        let state = stored_state();
        let part = part_row(4, Some(PART_ID), "ACR-100");
        let rows = ExtractedRows {
            cross_references: vec![cr_row(4, &part, "NAT-100", false)],
            parts: vec![part],
            vehicle_applications: vec![app_row(4, "ACR-100", 2016, 2020)],
            aliases: vec![AliasRow {
                source: SourceRef::new("Aliases", 4),
                action: RowAction::Keep,
                alias: Some("Chevy".to_string()),
                canonical_name: Some("CHEVROLET".to_string()),
                alias_type: Some(AliasType::Make),
            }],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert!(diff.is_empty(), "{:?}", diff.summary);
        assert!(diff.warnings.is_empty());
    }

    #[test]
    fn test_cross_reference_list_explodes_into_two_adds() {
        let state = CatalogState::default();
        let part = part_row(4, None, "ACR-200");
        let rows = ExtractedRows {
            cross_references: vec![
                cr_row(4, &part, "NAT-001", false),
                cr_row(4, &part, "NAT-002", false),
            ],
            parts: vec![part],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.parts.added, 1);
        assert_eq!(diff.summary.cross_references.added, 2);
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
            .all(|a| a.row.part == PartRef::New("ACR200".to_string())));
    }

    #[test]
    fn test_update_carries_field_changes() {
        let state = stored_state();
        let mut part = part_row(4, Some(PART_ID), "ACR-100");
        part.part_type = Some("Drum".to_string());
        part.specifications = Some("Vented".to_string());
        let rows = ExtractedRows {
            parts: vec![part],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.total_changes, 1);
        let updated = &diff.parts.updated[0];
        let fields: Vec<&str> = updated.changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["part_type", "specifications"]);
        assert_eq!(updated.changes[0].was.as_deref(), Some("Rotor"));
        assert_eq!(updated.changes[0].now.as_deref(), Some("Drum"));
    }

    #[test]
    fn test_part_delete_cascades_with_warning() {
        let state = stored_state();
        let mut part = part_row(4, Some(PART_ID), "ACR-100");
        part.action = RowAction::Delete;
        let rows = ExtractedRows {
            cross_references: vec![cr_row(4, &part, "NAT-100", false)],
            parts: vec![part],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.parts.deleted, 1);
        assert_eq!(diff.summary.vehicle_applications.deleted, 1);
        assert_eq!(diff.summary.cross_references.deleted, 1);
        assert_eq!(diff.vehicle_applications.deleted[0].reason, DeleteReason::Cascade);
        assert_eq!(diff.warnings.len(), 1);
        assert_eq!(diff.warnings[0].code, IssueCode::CascadeDelete);
        assert_eq!(diff.warnings[0].row, Some(4));
    }

    #[test]
    fn test_delete_marker_removes_only_stored_triple() {
        let state = stored_state();
        let part = part_row(4, Some(PART_ID), "ACR-100");
        let rows = ExtractedRows {
            cross_references: vec![
                cr_row(4, &part, "nat100", true),
                cr_row(4, &part, "NAT-999", true),
            ],
            parts: vec![part],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.total_changes, 1);
        assert_eq!(diff.cross_references.deleted[0].reason, DeleteReason::Marker);
        assert_eq!(diff.cross_references.deleted[0].before.id, CR_ID);
        assert_eq!(diff.summary.parts.deleted, 0);
    }

    #[test]
    fn test_application_references_part_added_in_same_import() {
        let state = stored_state();
        let rows = ExtractedRows {
            parts: vec![part_row(4, None, "ACR-300")],
            vehicle_applications: vec![
                app_row(4, "acr 300", 2018, 2022),
                app_row(5, "ACR-300", 2018, 2022),
            ],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.vehicle_applications.added, 1);
        assert_eq!(
            diff.vehicle_applications.added[0].row.part,
            PartRef::New("ACR300".to_string())
        );
    }

    #[test]
    fn test_alias_canonical_change_is_update() {
        let state = stored_state();
        let rows = ExtractedRows {
            aliases: vec![AliasRow {
                source: SourceRef::new("Aliases", 4),
                action: RowAction::Keep,
                alias: Some("chevy".to_string()),
                canonical_name: Some("CHEVROLET MOTORS".to_string()),
                alias_type: Some(AliasType::Make),
            }],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.aliases.updated, 1);
        assert_eq!(diff.aliases.updated[0].after.alias, "CHEVY");
    }

    #[test]
    fn test_renamed_part_old_sku_row_becomes_new_part() {
        let state = stored_state();
        let mut fresh = part_row(5, None, "ACR-100");
        fresh.part_type = Some("Drum".to_string());
        let rows = ExtractedRows {
            parts: vec![part_row(4, Some(PART_ID), "ACR-101"), fresh],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.parts.updated, 1);
        assert_eq!(diff.summary.parts.added, 1);
        assert_eq!(diff.parts.updated[0].after.id, PART_ID);
        assert_eq!(diff.parts.updated[0].after.acr_sku, "ACR-101");
        assert_eq!(diff.parts.updated[0].after.part_type, "Rotor");
        assert_eq!(diff.parts.added[0].row.acr_sku, "ACR-100");
        assert_eq!(diff.parts.added[0].row.part_type, "Drum");
    }

    #[test]
    fn test_rename_chain_updates_current_holder_first() {
        let other_id = "2b3c4d5e-6f7a-4b8c-9d0e-1f2a3b4c5d6e";
        let mut state = stored_state();
        let template = state.parts[0].clone();
        state.parts.push(Part {
            id: other_id.to_string(),
            acr_sku: "ACR-200".to_string(),
            ..template
        });
        // 第 4 行占用 ACR-200，第 5 行把 ACR-200 改为 ACR-300
        let rows = ExtractedRows {
            parts: vec![
                part_row(4, Some(PART_ID), "ACR-200"),
                part_row(5, Some(other_id), "ACR-300"),
            ],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        let order: Vec<&str> = diff.parts.updated.iter().map(|u| u.after.acr_sku.as_str()).collect();
        assert_eq!(order, vec!["ACR-300", "ACR-200"]);
    }

    #[test]
    fn test_sku_formatting_difference_keeps_stored_text() {
        let state = stored_state();
        let rows = ExtractedRows {
            parts: vec![part_row(4, None, "acr 100")],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert!(diff.is_empty(), "{:?}", diff.parts.updated);
    }

    #[test]
    fn test_application_old_key_row_is_added_when_id_row_moves_years() {
        let state = stored_state();
        let mut moved = app_row(4, "ACR-100", 2017, 2020);
        moved.id = RowId::Existing(APP_ID.to_string());
        let rows = ExtractedRows {
            parts: vec![part_row(4, Some(PART_ID), "ACR-100")],
            // 无 id 行在前，仍不得匹配已由带 id 行认领的记录
            vehicle_applications: vec![app_row(5, "ACR-100", 2016, 2020), moved],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert_eq!(diff.summary.vehicle_applications.updated, 1);
        assert_eq!(diff.summary.vehicle_applications.added, 1);
        assert_eq!(diff.vehicle_applications.updated[0].after.start_year, 2017);
        assert_eq!(diff.vehicle_applications.added[0].row.start_year, 2016);
        assert_eq!(diff.vehicle_applications.added[0].source.row, 5);
    }

    #[test]
    fn test_application_copy_of_unchanged_id_row_is_not_added_twice() {
        let state = stored_state();
        let mut same = app_row(4, "ACR-100", 2016, 2020);
        same.id = RowId::Existing(APP_ID.to_string());
        let rows = ExtractedRows {
            parts: vec![part_row(4, Some(PART_ID), "ACR-100")],
            vehicle_applications: vec![same, app_row(5, "ACR-100", 2016, 2020)],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert!(diff.is_empty(), "{:?}", diff.summary);
    }

    #[test]
    fn test_repeated_competitor_sku_in_cell_does_not_rewrite_stored_text() {
        let state = stored_state();
        let part = part_row(4, Some(PART_ID), "ACR-100");
        let mut repeat = cr_row(4, &part, "nat100", false);
        repeat.repeated_in_cell = true;
        let rows = ExtractedRows {
            cross_references: vec![cr_row(4, &part, "NAT-100", false), repeat],
            parts: vec![part],
            ..Default::default()
        };

        let diff = DiffEngine::new(&state).compute(&rows);
        assert!(diff.is_empty(), "{:?}", diff.cross_references.updated);
    }
}

