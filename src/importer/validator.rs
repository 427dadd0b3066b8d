// ==========================================
// 零件目录导入 - 校验引擎
// ==========================================
// 职责: (rows, storeIndex) -> issues，固定顺序规则集
// 红线: 纯函数，不访问存储；任一错误即 invalid，警告不影响 valid
// 红线: 规则顺序固定，问题列表可复现（规则内按工作表、行号排序）
// ==========================================

use crate::config::import_rules::ImportRules;
use crate::domain::catalog::{CatalogState, Part};
use crate::domain::issue::{IssueCode, ValidationIssue, ValidationReport};
use crate::domain::rows::{ExtractedRows, RowId};
use crate::domain::types::EntityKind;
use crate::importer::columns::{standard_header, Field, HEADER_ROW};
use crate::importer::normalize::{normalize_key, normalize_sku, same_optional};
use crate::importer::store_index::{cross_reference_key, StoreIndex};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 规则执行上下文
pub struct RuleContext<'a> {
    pub rows: &'a ExtractedRows,
    pub index: &'a StoreIndex<'a>,
    pub rules: &'a ImportRules,
    pub part_matches: HashMap<usize, &'a Part>, // Parts 表行号 → 匹配到的存储零件
}

impl<'a> RuleContext<'a> {
    pub fn stored_part(&self, row: usize) -> Option<&'a Part> {
        self.part_matches.get(&row).copied()
    }
}

type Check = fn(&RuleContext) -> Vec<ValidationIssue>;

pub struct Rule {
    pub code: IssueCode,
    pub check: Check,
}

// ==========================================
// 规则表（执行顺序即输出顺序）
// ==========================================
pub const RULES: &[Rule] = &[
    Rule { code: IssueCode::MissingSheet, check: missing_sheet },
    Rule { code: IssueCode::MissingHiddenColumn, check: missing_hidden_column },
    Rule { code: IssueCode::MalformedId, check: malformed_id },
    Rule { code: IssueCode::DuplicateId, check: duplicate_id },
    Rule { code: IssueCode::InvalidNumber, check: invalid_number },
    Rule { code: IssueCode::UnknownRowAction, check: unknown_row_action },
    Rule { code: IssueCode::RequiredFieldEmpty, check: required_field_empty },
    Rule { code: IssueCode::FieldTooLong, check: field_too_long },
    Rule { code: IssueCode::SkuFormat, check: sku_format },
    Rule { code: IssueCode::InvalidUrl, check: invalid_url },
    Rule { code: IssueCode::InvalidEnumValue, check: invalid_enum_value },
    Rule { code: IssueCode::DuplicateSku, check: duplicate_sku },
    Rule { code: IssueCode::SkuTaken, check: sku_taken },
    Rule { code: IssueCode::IdNotFound, check: id_not_found },
    Rule { code: IssueCode::YearRangeInverted, check: year_range_inverted },
    Rule { code: IssueCode::YearOutOfBounds, check: year_out_of_bounds },
    Rule { code: IssueCode::UnresolvedPartReference, check: unresolved_part_reference },
    Rule { code: IssueCode::DuplicateAlias, check: duplicate_alias },
    Rule { code: IssueCode::SkuChanged, check: sku_changed },
    Rule { code: IssueCode::PartTypeChanged, check: part_type_changed },
    Rule { code: IssueCode::PositionChanged, check: position_changed },
    Rule { code: IssueCode::SpecificationsShortened, check: specifications_shortened },
    Rule { code: IssueCode::DuplicateCompetitorSku, check: duplicate_competitor_sku },
    Rule { code: IssueCode::SpaceDelimitedSkus, check: space_delimited_skus },
    Rule { code: IssueCode::DeleteMarkerUnmatched, check: delete_marker_unmatched },
];

// ==========================================
// Validator
// ==========================================
pub struct Validator<'a> {
    rules: &'a ImportRules,
}

impl<'a> Validator<'a> {
    pub fn new(rules: &'a ImportRules) -> Self {
        Self { rules }
    }

    /// 执行全部规则
    #[instrument(skip_all, fields(rows = rows.total_rows()))]
    pub fn validate(&self, rows: &ExtractedRows, state: &CatalogState) -> ValidationReport {
        let index = StoreIndex::build(state);
        let ctx = RuleContext {
            rows,
            index: &index,
            rules: self.rules,
            part_matches: index.match_part_rows(&rows.parts),
        };

        let issues: Vec<ValidationIssue> = RULES.iter().flat_map(|rule| run_rule(rule, &ctx)).collect();
        let report = ValidationReport::from_issues(issues);

        if report.valid {
            info!(warnings = report.warnings.len(), "校验通过");
        } else {
            warn!(
                errors = report.errors.len(),
                warnings = report.warnings.len(),
                "校验未通过"
            );
        }
        report
    }
}

/// 执行单条规则并按 (工作表, 行号) 稳定排序
pub fn run_rule(rule: &Rule, ctx: &RuleContext) -> Vec<ValidationIssue> {
    let mut issues = (rule.check)(ctx);
    issues.sort_by_key(|i| (EntityKind::sheet_rank(&i.sheet), i.row.unwrap_or(0)));
    issues
}

// ==========================================
// 工具函数
// ==========================================

fn is_uuid(raw: &str) -> bool {
    Uuid::parse_str(raw).is_ok()
}

fn header(entity: EntityKind, field: Field) -> &'static str {
    standard_header(entity, field)
}

/// 按键分组，保留首次出现顺序
fn group_rows<K: Hash + Eq + Clone>(items: impl Iterator<Item = (K, usize)>) -> Vec<(K, Vec<usize>)> {
    let mut order: Vec<(K, Vec<usize>)> = Vec::new();
    let mut slots: HashMap<K, usize> = HashMap::new();
    for (key, row) in items {
        match slots.get(&key) {
            Some(&slot) => order[slot].1.push(row),
            None => {
                slots.insert(key.clone(), order.len());
                order.push((key, vec![row]));
            }
        }
    }
    order
}

fn format_rows(rows: &[usize]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 带 id 的删除行只需定位，不检查其余字段
fn identifies_by_id(action_is_delete: bool, id: &RowId) -> bool {
    action_is_delete && id.existing().is_some()
}

fn from_diagnostics(ctx: &RuleContext, code: IssueCode) -> Vec<ValidationIssue> {
    ctx.rows
        .diagnostics
        .iter()
        .filter(|d| d.code == code)
        .map(|d| {
            ValidationIssue::new(code, d.source.sheet.clone(), Some(d.source.row), d.message.clone())
                .with_column(d.column.clone())
        })
        .collect()
}

// ==========================================
// 错误规则
// ==========================================

/// E13 必需工作表缺失
fn missing_sheet(ctx: &RuleContext) -> Vec<ValidationIssue> {
    ctx.rows
        .missing_sheets
        .iter()
        .map(|sheet| {
            ValidationIssue::new(
                IssueCode::MissingSheet,
                sheet.clone(),
                None,
                format!("缺少必需工作表 '{}'", sheet),
            )
        })
        .collect()
}

/// E1 隐藏列缺失
fn missing_hidden_column(ctx: &RuleContext) -> Vec<ValidationIssue> {
    ctx.rows
        .layouts
        .iter()
        .flat_map(|layout| {
            layout.missing_hidden.iter().map(move |column| {
                ValidationIssue::new(
                    IssueCode::MissingHiddenColumn,
                    layout.sheet.clone(),
                    Some(HEADER_ROW),
                    format!("工作表 '{}' 缺少隐藏列 '{}'", layout.sheet, column),
                )
                .with_column(column.clone())
            })
        })
        .collect()
}

/// E4 代理主键格式无效
fn malformed_id(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let parts = ctx.rows.parts.iter().map(|p| (EntityKind::Part, &p.id, p.source.row));
    let apps = ctx
        .rows
        .vehicle_applications
        .iter()
        .map(|v| (EntityKind::VehicleApplication, &v.id, v.source.row));

    parts
        .chain(apps)
        .filter_map(|(entity, id, row)| {
            let raw = id.existing()?;
            if is_uuid(raw) {
                return None;
            }
            Some(
                ValidationIssue::at(
                    IssueCode::MalformedId,
                    entity,
                    row,
                    format!("代理主键格式无效: '{}'", raw),
                )
                .with_column(header(entity, Field::Id)),
            )
        })
        .collect()
}

/// E10 同一工作表内 id 重复
fn duplicate_id(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let groups = [
        (
            EntityKind::Part,
            group_rows(
                ctx.rows
                    .parts
                    .iter()
                    .filter_map(|p| p.id.existing().map(|id| (id.to_lowercase(), p.source.row))),
            ),
        ),
        (
            EntityKind::VehicleApplication,
            group_rows(
                ctx.rows
                    .vehicle_applications
                    .iter()
                    .filter_map(|v| v.id.existing().map(|id| (id.to_lowercase(), v.source.row))),
            ),
        ),
    ];

    for (entity, grouped) in groups {
        for (id, rows) in grouped.into_iter().filter(|(_, rows)| rows.len() > 1) {
            issues.push(
                ValidationIssue::at(
                    IssueCode::DuplicateId,
                    entity,
                    rows[0],
                    format!("id '{}' 在工作表中重复出现（行 {}）", id, format_rows(&rows)),
                )
                .with_column(header(entity, Field::Id))
                .with_related_rows(rows),
            );
        }
    }
    issues
}

/// E11 数字列非数字
fn invalid_number(ctx: &RuleContext) -> Vec<ValidationIssue> {
    from_diagnostics(ctx, IssueCode::InvalidNumber)
}

/// E21 行动作值无法识别
fn unknown_row_action(ctx: &RuleContext) -> Vec<ValidationIssue> {
    from_diagnostics(ctx, IssueCode::UnknownRowAction)
}

/// E12 枚举值无效
fn invalid_enum_value(ctx: &RuleContext) -> Vec<ValidationIssue> {
    from_diagnostics(ctx, IssueCode::InvalidEnumValue)
}

/// E3 必填字段为空
fn required_field_empty(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut missing = |entity: EntityKind, row: usize, field: Field| {
        issues.push(
            ValidationIssue::at(
                IssueCode::RequiredFieldEmpty,
                entity,
                row,
                format!("必填字段 '{}' 为空", header(entity, field)),
            )
            .with_column(header(entity, field)),
        );
    };

    for p in &ctx.rows.parts {
        let by_id = identifies_by_id(p.action.is_delete(), &p.id);
        if p.acr_sku.is_none() && !by_id {
            missing(EntityKind::Part, p.source.row, Field::AcrSku);
        }
        if p.part_type.is_none() && !p.action.is_delete() {
            missing(EntityKind::Part, p.source.row, Field::PartType);
        }
    }

    for v in &ctx.rows.vehicle_applications {
        if identifies_by_id(v.action.is_delete(), &v.id) {
            continue;
        }
        let entity = EntityKind::VehicleApplication;
        if v.acr_sku.is_none() {
            missing(entity, v.source.row, Field::AcrSku);
        }
        if v.make.is_none() {
            missing(entity, v.source.row, Field::Make);
        }
        if v.model.is_none() {
            missing(entity, v.source.row, Field::Model);
        }
        if v.start_year.is_none() {
            missing(entity, v.source.row, Field::StartYear);
        }
        if v.end_year.is_none() {
            missing(entity, v.source.row, Field::EndYear);
        }
    }

    for a in &ctx.rows.aliases {
        if a.alias.is_none() {
            missing(EntityKind::Alias, a.source.row, Field::Alias);
        }
        if a.alias_type.is_none() {
            missing(EntityKind::Alias, a.source.row, Field::AliasType);
        }
        if a.canonical_name.is_none() && !a.action.is_delete() {
            missing(EntityKind::Alias, a.source.row, Field::CanonicalName);
        }
    }

    issues
}

/// E7 字段超长
fn field_too_long(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let limits = &ctx.rules.limits;
    let mut issues = Vec::new();
    let mut check = |entity: EntityKind, row: usize, column: &str, value: Option<&str>, max: usize| {
        if let Some(v) = value {
            let len = v.chars().count();
            if len > max {
                issues.push(
                    ValidationIssue::at(
                        IssueCode::FieldTooLong,
                        entity,
                        row,
                        format!("'{}' 长度 {} 超过上限 {}", column, len, max),
                    )
                    .with_column(column.to_string()),
                );
            }
        }
    };

    for p in &ctx.rows.parts {
        let e = EntityKind::Part;
        let r = p.source.row;
        check(e, r, header(e, Field::AcrSku), p.acr_sku.as_deref(), limits.acr_sku);
        check(e, r, header(e, Field::PartType), p.part_type.as_deref(), limits.part_type);
        check(e, r, header(e, Field::PositionType), p.position_type.as_deref(), limits.position_type);
        check(e, r, header(e, Field::AbsType), p.abs_type.as_deref(), limits.abs_type);
        check(e, r, header(e, Field::BoltPattern), p.bolt_pattern.as_deref(), limits.bolt_pattern);
        check(e, r, header(e, Field::DriveType), p.drive_type.as_deref(), limits.drive_type);
        check(e, r, header(e, Field::Specifications), p.specifications.as_deref(), limits.specifications);
        check(e, r, header(e, Field::ImageUrl), p.image_url.as_deref(), limits.image_url);
    }

    for cr in &ctx.rows.cross_references {
        check(
            EntityKind::CrossReference,
            cr.source.row,
            cr.column.as_str(),
            Some(cr.competitor_sku.as_str()),
            limits.competitor_sku,
        );
    }

    for v in &ctx.rows.vehicle_applications {
        let e = EntityKind::VehicleApplication;
        check(e, v.source.row, header(e, Field::Make), v.make.as_deref(), limits.make);
        check(e, v.source.row, header(e, Field::Model), v.model.as_deref(), limits.model);
    }

    for a in &ctx.rows.aliases {
        let e = EntityKind::Alias;
        check(e, a.source.row, header(e, Field::Alias), a.alias.as_deref(), limits.alias);
        check(
            e,
            a.source.row,
            header(e, Field::CanonicalName),
            a.canonical_name.as_deref(),
            limits.canonical_name,
        );
    }

    issues
}

/// E20 SKU 前缀/格式
fn sku_format(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let prefix = normalize_sku(&ctx.rules.sku_prefix);
    let pattern = match Regex::new(&format!("^{}[A-Z0-9]+$", regex::escape(&prefix))) {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, prefix = %prefix, "SKU 格式规则构建失败，跳过");
            return Vec::new();
        }
    };

    ctx.rows
        .parts
        .iter()
        .filter_map(|p| {
            let sku = p.acr_sku.as_deref()?;
            if pattern.is_match(&normalize_sku(sku)) {
                return None;
            }
            Some(
                ValidationIssue::at(
                    IssueCode::SkuFormat,
                    EntityKind::Part,
                    p.source.row,
                    format!("ACR SKU '{}' 需以 '{}' 开头且仅含字母数字", sku, ctx.rules.sku_prefix),
                )
                .with_column(header(EntityKind::Part, Field::AcrSku)),
            )
        })
        .collect()
}

/// E22 图片地址格式
fn invalid_url(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let pattern = match Regex::new(r"(?i)^https?://[a-z0-9-]+(\.[a-z0-9-]+)*(:\d+)?([/?#]\S*)?$") {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "URL 规则构建失败，跳过");
            return Vec::new();
        }
    };

    ctx.rows
        .parts
        .iter()
        .filter_map(|p| {
            let url = p.image_url.as_deref()?;
            if pattern.is_match(url) {
                return None;
            }
            Some(
                ValidationIssue::at(
                    IssueCode::InvalidUrl,
                    EntityKind::Part,
                    p.source.row,
                    format!("图片地址格式无效: '{}'", url),
                )
                .with_column(header(EntityKind::Part, Field::ImageUrl)),
            )
        })
        .collect()
}

/// E2 文件内 SKU 重复（每个 SKU 一条，列出全部行号）
fn duplicate_sku(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let grouped = group_rows(ctx.rows.parts.iter().filter_map(|p| {
        p.acr_sku
            .as_deref()
            .map(|sku| (normalize_sku(sku), p.source.row))
    }));

    grouped
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(sku, rows)| {
            ValidationIssue::at(
                IssueCode::DuplicateSku,
                EntityKind::Part,
                rows[0],
                format!("ACR SKU '{}' 在文件中重复出现（行 {}）", sku, format_rows(&rows)),
            )
            .with_column(header(EntityKind::Part, Field::AcrSku))
            .with_related_rows(rows)
        })
        .collect()
}

/// SKU 占用者能否在本次导入中让出该 SKU
enum Release {
    Freed,
    Held,
    Swap,
}

/// 沿改名链查找：占用者被删除或改名到空闲 SKU 即可让出；链回到自身为互换
fn release_of<'a>(
    holder: &'a Part,
    own: Option<&str>,
    deleted: &HashSet<&str>,
    renamed_to: &HashMap<&str, String>,
    index: &StoreIndex<'a>,
) -> Release {
    let mut current = holder;
    let mut visited: HashSet<&str> = HashSet::new();
    loop {
        if deleted.contains(current.id.as_str()) {
            return Release::Freed;
        }
        let Some(target) = renamed_to.get(current.id.as_str()) else {
            // 链中后续零件的冲突在其自身行上报告
            return if current.id == holder.id { Release::Held } else { Release::Freed };
        };
        if !visited.insert(current.id.as_str()) {
            return Release::Freed;
        }
        match index.part_by_sku(target) {
            None => return Release::Freed,
            Some(next) if Some(next.id.as_str()) == own => return Release::Swap,
            Some(next) => current = next,
        }
    }
}

/// E24 SKU 已被目录中另一零件占用，且本次导入未删除或改名该零件
fn sku_taken(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let mut deleted: HashSet<&str> = HashSet::new();
    let mut renamed_to: HashMap<&str, String> = HashMap::new();
    for p in &ctx.rows.parts {
        let Some(stored) = ctx.stored_part(p.source.row) else {
            continue;
        };
        if p.action.is_delete() {
            deleted.insert(stored.id.as_str());
        } else if let Some(sku) = p.acr_sku.as_deref() {
            let key = normalize_sku(sku);
            if key != normalize_sku(&stored.acr_sku) {
                renamed_to.insert(stored.id.as_str(), key);
            }
        }
    }

    let mut issues = Vec::new();
    for p in ctx.rows.parts.iter().filter(|p| !p.action.is_delete()) {
        let Some(sku) = p.acr_sku.as_deref() else {
            continue;
        };
        let Some(holder) = ctx.index.part_by_sku(sku) else {
            continue;
        };
        let own = ctx.stored_part(p.source.row).map(|s| s.id.as_str());
        if own == Some(holder.id.as_str()) {
            continue;
        }

        let message = match release_of(holder, own, &deleted, &renamed_to, ctx.index) {
            Release::Freed => continue,
            Release::Held => format!("ACR SKU '{}' 已被目录中的零件 '{}' 占用", sku, holder.acr_sku),
            Release::Swap => format!(
                "ACR SKU '{}' 与零件 '{}' 互换，无法在一次导入中完成",
                sku, holder.acr_sku
            ),
        };
        issues.push(
            ValidationIssue::at(IssueCode::SkuTaken, EntityKind::Part, p.source.row, message)
                .with_column(header(EntityKind::Part, Field::AcrSku)),
        );
    }
    issues
}

/// E9 id 在存储中不存在
fn id_not_found(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for p in &ctx.rows.parts {
        if let Some(id) = p.id.existing() {
            if is_uuid(id) && ctx.index.part_by_id(id).is_none() {
                issues.push(
                    ValidationIssue::at(
                        IssueCode::IdNotFound,
                        EntityKind::Part,
                        p.source.row,
                        format!("零件 id '{}' 在目录中不存在", id),
                    )
                    .with_column(header(EntityKind::Part, Field::Id)),
                );
            }
        }
    }

    for v in &ctx.rows.vehicle_applications {
        if let Some(id) = v.id.existing() {
            if is_uuid(id) && ctx.index.application_by_id(id).is_none() {
                issues.push(
                    ValidationIssue::at(
                        IssueCode::IdNotFound,
                        EntityKind::VehicleApplication,
                        v.source.row,
                        format!("车型适配 id '{}' 在目录中不存在", id),
                    )
                    .with_column(header(EntityKind::VehicleApplication, Field::Id)),
                );
            }
        }
    }

    issues
}

/// E6 起始年份大于结束年份
fn year_range_inverted(ctx: &RuleContext) -> Vec<ValidationIssue> {
    ctx.rows
        .vehicle_applications
        .iter()
        .filter(|v| !identifies_by_id(v.action.is_delete(), &v.id))
        .filter_map(|v| match (v.start_year, v.end_year) {
            (Some(start), Some(end)) if start > end => Some(
                ValidationIssue::at(
                    IssueCode::YearRangeInverted,
                    EntityKind::VehicleApplication,
                    v.source.row,
                    format!("起始年份 {} 大于结束年份 {}", start, end),
                )
                .with_column(header(EntityKind::VehicleApplication, Field::StartYear)),
            ),
            _ => None,
        })
        .collect()
}

/// E8 年份超出合理范围
fn year_out_of_bounds(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let rules = ctx.rules;
    let mut issues = Vec::new();

    for v in &ctx.rows.vehicle_applications {
        if identifies_by_id(v.action.is_delete(), &v.id) {
            continue;
        }
        for (field, year) in [(Field::StartYear, v.start_year), (Field::EndYear, v.end_year)] {
            let Some(year) = year else {
                continue;
            };
            if !rules.year_in_bounds(year) {
                issues.push(
                    ValidationIssue::at(
                        IssueCode::YearOutOfBounds,
                        EntityKind::VehicleApplication,
                        v.source.row,
                        format!(
                            "年份 {} 超出范围 [{}, {}]",
                            year, rules.min_year, rules.max_year
                        ),
                    )
                    .with_column(header(EntityKind::VehicleApplication, field)),
                );
            }
        }
    }
    issues
}

/// E5 车型适配引用的零件在文件与存储中均不存在，或在本次导入中被删除
fn unresolved_part_reference(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let kept: HashSet<String> = ctx
        .rows
        .parts
        .iter()
        .filter(|p| !p.action.is_delete())
        .filter_map(|p| p.acr_sku.as_deref().map(normalize_sku))
        .collect();

    let mut deleted: HashSet<String> = HashSet::new();
    for p in ctx.rows.parts.iter().filter(|p| p.action.is_delete()) {
        if let Some(sku) = p.acr_sku.as_deref() {
            deleted.insert(normalize_sku(sku));
        }
        if let Some(stored) = ctx.stored_part(p.source.row) {
            deleted.insert(normalize_sku(&stored.acr_sku));
        }
    }

    let entity = EntityKind::VehicleApplication;
    ctx.rows
        .vehicle_applications
        .iter()
        .filter(|v| !v.action.is_delete())
        .filter_map(|v| {
            let sku = v.acr_sku.as_deref()?;
            let key = normalize_sku(sku);
            if kept.contains(&key) {
                return None;
            }
            let message = if deleted.contains(&key) {
                format!("引用的零件 '{}' 在本次导入中被删除", sku)
            } else if ctx.index.part_by_sku(sku).is_none() {
                format!("引用的零件 '{}' 在文件与目录中均不存在", sku)
            } else {
                return None;
            };
            Some(
                ValidationIssue::at(IssueCode::UnresolvedPartReference, entity, v.source.row, message)
                    .with_column(header(entity, Field::AcrSku)),
            )
        })
        .collect()
}

/// E23 文件内别名重复
fn duplicate_alias(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let grouped = group_rows(ctx.rows.aliases.iter().filter_map(|a| {
        let alias = a.alias.as_deref()?;
        let alias_type = a.alias_type?;
        Some(((normalize_key(alias), alias_type), a.source.row))
    }));

    grouped
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|((alias, alias_type), rows)| {
            ValidationIssue::at(
                IssueCode::DuplicateAlias,
                EntityKind::Alias,
                rows[0],
                format!(
                    "别名 '{}' ({}) 在文件中重复出现（行 {}）",
                    alias,
                    alias_type,
                    format_rows(&rows)
                ),
            )
            .with_column(header(EntityKind::Alias, Field::Alias))
            .with_related_rows(rows)
        })
        .collect()
}

// ==========================================
// 警告规则（与存储值比较）
// ==========================================

/// 对每个匹配到存储零件的保留行执行比较
fn compare_parts<F>(ctx: &RuleContext, mut compare: F) -> Vec<ValidationIssue>
where
    F: FnMut(&crate::domain::rows::PartRow, &Part) -> Option<ValidationIssue>,
{
    ctx.rows
        .parts
        .iter()
        .filter(|p| !p.action.is_delete())
        .filter_map(|p| {
            let stored = ctx.stored_part(p.source.row)?;
            compare(p, stored)
        })
        .collect()
}

/// W1 SKU 变更
fn sku_changed(ctx: &RuleContext) -> Vec<ValidationIssue> {
    compare_parts(ctx, |p, stored| {
        let sku = p.acr_sku.as_deref()?;
        if normalize_sku(sku) == normalize_sku(&stored.acr_sku) {
            return None;
        }
        Some(
            ValidationIssue::at(
                IssueCode::SkuChanged,
                EntityKind::Part,
                p.source.row,
                format!("ACR SKU 由 '{}' 改为 '{}'", stored.acr_sku, sku),
            )
            .with_column(header(EntityKind::Part, Field::AcrSku)),
        )
    })
}

/// W3 零件类型变更
fn part_type_changed(ctx: &RuleContext) -> Vec<ValidationIssue> {
    compare_parts(ctx, |p, stored| {
        let part_type = p.part_type.as_deref()?;
        if part_type == stored.part_type.trim() {
            return None;
        }
        Some(
            ValidationIssue::at(
                IssueCode::PartTypeChanged,
                EntityKind::Part,
                p.source.row,
                format!("零件类型由 '{}' 改为 '{}'", stored.part_type, part_type),
            )
            .with_column(header(EntityKind::Part, Field::PartType)),
        )
    })
}

/// W4 安装位置变更
fn position_changed(ctx: &RuleContext) -> Vec<ValidationIssue> {
    compare_parts(ctx, |p, stored| {
        if same_optional(p.position_type.as_deref(), stored.position_type.as_deref()) {
            return None;
        }
        Some(
            ValidationIssue::at(
                IssueCode::PositionChanged,
                EntityKind::Part,
                p.source.row,
                format!(
                    "安装位置由 '{}' 改为 '{}'",
                    stored.position_type.as_deref().unwrap_or(""),
                    p.position_type.as_deref().unwrap_or("")
                ),
            )
            .with_column(header(EntityKind::Part, Field::PositionType)),
        )
    })
}

/// W7 规格说明被缩短
fn specifications_shortened(ctx: &RuleContext) -> Vec<ValidationIssue> {
    compare_parts(ctx, |p, stored| {
        let old_len = stored.specifications.as_deref().map(|s| s.trim().chars().count())?;
        let new_len = p
            .specifications
            .as_deref()
            .map(|s| s.chars().count())
            .unwrap_or(0);
        if new_len >= old_len {
            return None;
        }
        Some(
            ValidationIssue::at(
                IssueCode::SpecificationsShortened,
                EntityKind::Part,
                p.source.row,
                format!("规格说明由 {} 字符缩短为 {} 字符", old_len, new_len),
            )
            .with_column(header(EntityKind::Part, Field::Specifications)),
        )
    })
}

/// W11 同一品牌列内竞品 SKU 重复
fn duplicate_competitor_sku(ctx: &RuleContext) -> Vec<ValidationIssue> {
    ctx.rows
        .cross_references
        .iter()
        .filter(|cr| cr.repeated_in_cell)
        .map(|cr| {
            ValidationIssue::at(
                IssueCode::DuplicateCompetitorSku,
                EntityKind::CrossReference,
                cr.source.row,
                format!("竞品 SKU '{}' 在 '{}' 列中重复", cr.competitor_sku, cr.column),
            )
            .with_column(cr.column.clone())
        })
        .collect()
}

/// W12 竞品 SKU 列表使用空格分隔（每个单元格一条）
fn space_delimited_skus(ctx: &RuleContext) -> Vec<ValidationIssue> {
    let mut seen = HashSet::new();
    ctx.rows
        .cross_references
        .iter()
        .filter(|cr| cr.space_delimited && seen.insert((cr.source.row, cr.column.clone())))
        .map(|cr| {
            ValidationIssue::at(
                IssueCode::SpaceDelimitedSkus,
                EntityKind::CrossReference,
                cr.source.row,
                format!("'{}' 列的竞品 SKU 以空格分隔，应使用 ';'", cr.column),
            )
            .with_column(cr.column.clone())
        })
        .collect()
}

/// W13 [DELETE] 标记未匹配到已存储的交叉引用
fn delete_marker_unmatched(ctx: &RuleContext) -> Vec<ValidationIssue> {
    ctx.rows
        .cross_references
        .iter()
        .filter(|cr| cr.delete_marker && !cr.parent_action.is_delete())
        .filter_map(|cr| {
            let matched = ctx
                .stored_part(cr.source.row)
                .and_then(|part| {
                    ctx.index.cross_reference_by_key(&cross_reference_key(
                        &part.id,
                        &cr.competitor_brand,
                        &cr.competitor_sku,
                    ))
                });
            if matched.is_some() {
                return None;
            }
            Some(
                ValidationIssue::at(
                    IssueCode::DeleteMarkerUnmatched,
                    EntityKind::CrossReference,
                    cr.source.row,
                    format!(
                        "删除标记指向的交叉引用 {} '{}' 不存在，将被忽略",
                        cr.competitor_brand, cr.competitor_sku
                    ),
                )
                .with_column(cr.column.clone()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Part;
    use crate::domain::rows::{AliasRow, CrossReferenceRow, PartRow, SourceRef, VehicleApplicationRow};
    use crate::domain::types::{AliasType, RowAction, WorkflowStatus};

    const PART_ID: &str = "6f1c1d2e-3a4b-4c5d-8e9f-0a1b2c3d4e5f";

    fn part_row(row: usize, sku: &str, part_type: &str) -> PartRow {
        PartRow {
            source: SourceRef::new("Parts", row),
            id: RowId::New,
            action: RowAction::Keep,
            acr_sku: Some(sku.to_string()),
            part_type: Some(part_type.to_string()),
            position_type: None,
            abs_type: None,
            bolt_pattern: None,
            drive_type: None,
            specifications: None,
            workflow_status: None,
            image_url: None,
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

    fn stored_part() -> Part {
        Part {
            id: PART_ID.to_string(),
            acr_sku: "ACR-100".to_string(),
            part_type: "Rotor".to_string(),
            position_type: Some("Front".to_string()),
            abs_type: None,
            bolt_pattern: None,
            drive_type: None,
            specifications: Some("Vented 280mm".to_string()),
            workflow_status: WorkflowStatus::Active,
            image_url: None,
        }
    }

    fn validate(rows: &ExtractedRows, state: &CatalogState) -> ValidationReport {
        let rules = ImportRules::default();
        Validator::new(&rules).validate(rows, state)
    }

    #[test]
    fn test_duplicate_sku_one_issue_with_both_rows() {
        let rows = ExtractedRows {
            parts: vec![
                part_row(4, "ACR-1", "Rotor"),
                part_row(5, "ACR-2", "Rotor"),
                part_row(9, "acr 1", "Pad"),
            ],
            ..Default::default()
        };
        let report = validate(&rows, &CatalogState::default());

        assert!(!report.valid);
        assert_eq!(report.count(IssueCode::DuplicateSku), 1);
        let issue = report
            .errors
            .iter()
            .find(|e| e.code == IssueCode::DuplicateSku)
            .unwrap();
        assert_eq!(issue.row, Some(4));
        assert_eq!(issue.related_rows, vec![4, 9]);
    }

    #[test]
    fn test_year_range_inverted_single_issue() {
        let rows = ExtractedRows {
            parts: vec![part_row(4, "ACR-1", "Rotor")],
            vehicle_applications: vec![app_row(4, "ACR-1", 2025, 2020)],
            ..Default::default()
        };
        let report = validate(&rows, &CatalogState::default());

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, IssueCode::YearRangeInverted);
        assert_eq!(report.errors[0].sheet, "Vehicle Applications");
    }

    #[test]
    fn test_year_bounds_and_unresolved_reference() {
        let rows = ExtractedRows {
            vehicle_applications: vec![app_row(4, "ACR-404", 1850, 1860)],
            ..Default::default()
        };
        let report = validate(&rows, &CatalogState::default());

        assert_eq!(report.count(IssueCode::YearOutOfBounds), 2);
        assert_eq!(report.count(IssueCode::UnresolvedPartReference), 1);
    }

    #[test]
    fn test_reference_to_part_deleted_in_same_import() {
        let mut delete = part_row(4, "ACR-100", "Rotor");
        delete.action = RowAction::Delete;
        let rows = ExtractedRows {
            parts: vec![delete],
            vehicle_applications: vec![app_row(4, "ACR-100", 2016, 2020)],
            ..Default::default()
        };
        let state = CatalogState {
            parts: vec![stored_part()],
            ..Default::default()
        };
        let report = validate(&rows, &state);
        assert_eq!(report.error_codes().into_iter().collect::<Vec<_>>(), vec![IssueCode::UnresolvedPartReference]);
    }

    #[test]
    fn test_id_shape_and_existence() {
        let mut bad = part_row(4, "ACR-1", "Rotor");
        bad.id = RowId::Existing("not-a-uuid".to_string());
        let mut unknown = part_row(5, "ACR-2", "Rotor");
        unknown.id = RowId::Existing(PART_ID.to_string());

        let rows = ExtractedRows {
            parts: vec![bad, unknown],
            ..Default::default()
        };
        let report = validate(&rows, &CatalogState::default());

        assert_eq!(report.errors[0].code, IssueCode::MalformedId);
        assert_eq!(report.errors[0].row, Some(4));
        assert_eq!(report.errors[1].code, IssueCode::IdNotFound);
        assert_eq!(report.errors[1].row, Some(5));
    }

    #[test]
    fn test_sku_format_and_url() {
        let mut row = part_row(4, "XYZ-1", "Rotor");
        row.image_url = Some("not a url".to_string());
        let mut ok = part_row(5, "acr-77", "Rotor");
        ok.image_url = Some("https://cdn.example.com/img/77.jpg".to_string());

        let rows = ExtractedRows {
            parts: vec![row, ok],
            ..Default::default()
        };
        let report = validate(&rows, &CatalogState::default());

        let codes: Vec<IssueCode> = report.errors.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![IssueCode::SkuFormat, IssueCode::InvalidUrl]);
    }

    #[test]
    fn test_part_type_change_is_single_warning() {
        let mut row = part_row(4, "ACR-100", "Drum");
        row.id = RowId::Existing(PART_ID.to_string());
        row.position_type = Some("Front".to_string());
        row.specifications = Some("Vented 280mm".to_string());

        let rows = ExtractedRows {
            parts: vec![row],
            ..Default::default()
        };
        let state = CatalogState {
            parts: vec![stored_part()],
            ..Default::default()
        };
        let report = validate(&rows, &state);

        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, IssueCode::PartTypeChanged);
    }

    #[test]
    fn test_specifications_shortened_and_position_changed() {
        let mut row = part_row(4, "ACR-100", "Rotor");
        row.specifications = Some("Vented".to_string());
        let rows = ExtractedRows {
            parts: vec![row],
            ..Default::default()
        };
        let state = CatalogState {
            parts: vec![stored_part()],
            ..Default::default()
        };
        let report = validate(&rows, &state);

        let codes: Vec<IssueCode> = report.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![IssueCode::PositionChanged, IssueCode::SpecificationsShortened]);
    }

    #[test]
    fn test_cross_reference_warnings() {
        let cr = |sku: &str, repeated: bool, spaced: bool, delete: bool| CrossReferenceRow {
            source: SourceRef::new("Parts", 4),
            column: "National".to_string(),
            parent_id: RowId::New,
            parent_sku: Some("ACR-100".to_string()),
            parent_action: RowAction::Keep,
            competitor_brand: "NATIONAL".to_string(),
            competitor_sku: sku.to_string(),
            delete_marker: delete,
            repeated_in_cell: repeated,
            space_delimited: spaced,
        };
        let rows = ExtractedRows {
            parts: vec![part_row(4, "ACR-100", "Rotor")],
            cross_references: vec![
                cr("NAT-1", false, true, false),
                cr("NAT-1", true, true, false),
                cr("NAT-9", false, true, true),
            ],
            ..Default::default()
        };
        let state = CatalogState {
            parts: vec![Part {
                specifications: None,
                position_type: None,
                ..stored_part()
            }],
            ..Default::default()
        };
        let report = validate(&rows, &state);

        assert!(report.valid);
        assert_eq!(report.count(IssueCode::DuplicateCompetitorSku), 1);
        assert_eq!(report.count(IssueCode::SpaceDelimitedSkus), 1);
        assert_eq!(report.count(IssueCode::DeleteMarkerUnmatched), 1);
    }

    #[test]
    fn test_alias_rules() {
        let alias = |row: usize, name: &str, t: Option<AliasType>| AliasRow {
            source: SourceRef::new("Aliases", row),
            action: RowAction::Keep,
            alias: Some(name.to_string()),
            canonical_name: Some("CHEVROLET".to_string()),
            alias_type: t,
        };
        let rows = ExtractedRows {
            aliases: vec![
                alias(4, "Chevy", Some(AliasType::Make)),
                alias(5, "CHEVY", Some(AliasType::Make)),
                alias(6, "Chevy", Some(AliasType::Model)),
                alias(7, "Vette", None),
            ],
            ..Default::default()
        };
        let report = validate(&rows, &CatalogState::default());

        assert_eq!(report.count(IssueCode::DuplicateAlias), 1);
        assert_eq!(report.count(IssueCode::RequiredFieldEmpty), 1);
    }

    #[test]
    fn test_rule_order_is_stable() {
        let codes: Vec<&str> = RULES.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(&codes[..4], &["E13", "E1", "E4", "E10"]);
        assert_eq!(codes.last(), Some(&"W13"));
        assert_eq!(codes.len(), IssueCode::ALL.len() - 1); // W9 由差异引擎产生
    }

    const OTHER_ID: &str = "8a7b6c5d-4e3f-4a2b-9c1d-0e9f8a7b6c5d";

    fn two_stored_parts() -> CatalogState {
        CatalogState {
            parts: vec![
                stored_part(),
                Part {
                    id: OTHER_ID.to_string(),
                    acr_sku: "ACR-200".to_string(),
                    ..stored_part()
                },
            ],
            ..Default::default()
        }
    }

    fn id_row(row: usize, id: &str, sku: &str) -> PartRow {
        let mut p = part_row(row, sku, "Rotor");
        p.id = RowId::Existing(id.to_string());
        p.position_type = Some("Front".to_string());
        p.specifications = Some("Vented 280mm".to_string());
        p
    }

    #[test]
    fn test_sku_held_by_other_stored_part_is_error() {
        let rows = ExtractedRows {
            parts: vec![id_row(4, PART_ID, "ACR-200")],
            ..Default::default()
        };
        let report = validate(&rows, &two_stored_parts());

        assert!(!report.valid);
        assert_eq!(report.error_codes().into_iter().collect::<Vec<_>>(), vec![IssueCode::SkuTaken]);
        assert_eq!(report.errors[0].row, Some(4));
    }

    #[test]
    fn test_sku_released_by_delete_or_rename_is_allowed() {
        let mut delete = part_row(5, "ACR-200", "Rotor");
        delete.action = RowAction::Delete;
        let deleted = ExtractedRows {
            parts: vec![id_row(4, PART_ID, "ACR-200"), delete],
            ..Default::default()
        };
        assert_eq!(validate(&deleted, &two_stored_parts()).count(IssueCode::SkuTaken), 0);

        let chained = ExtractedRows {
            parts: vec![id_row(4, PART_ID, "ACR-200"), id_row(5, OTHER_ID, "ACR-300")],
            ..Default::default()
        };
        let report = validate(&chained, &two_stored_parts());
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.count(IssueCode::SkuChanged), 2);
    }

    #[test]
    fn test_sku_swap_is_rejected_on_both_rows() {
        let rows = ExtractedRows {
            parts: vec![id_row(4, PART_ID, "ACR-200"), id_row(5, OTHER_ID, "ACR-100")],
            ..Default::default()
        };
        let report = validate(&rows, &two_stored_parts());

        assert_eq!(report.count(IssueCode::SkuTaken), 2);
        let rows: Vec<Option<usize>> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![Some(4), Some(5)]);
    }

    #[test]
    fn test_old_sku_row_after_rename_is_not_compared_with_renamed_part() {
        let state = CatalogState {
            parts: vec![stored_part()],
            ..Default::default()
        };
        let rows = ExtractedRows {
            parts: vec![id_row(4, PART_ID, "ACR-101"), part_row(5, "ACR-100", "Drum")],
            ..Default::default()
        };
        let report = validate(&rows, &state);

        assert!(report.valid, "{:?}", report.errors);
        let codes: Vec<IssueCode> = report.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![IssueCode::SkuChanged]);
    }
}

