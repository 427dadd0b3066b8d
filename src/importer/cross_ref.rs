// ==========================================
// 零件目录导入 - 竞品 SKU 列表拆分
// ==========================================
// 输入: Parts 表品牌列单元格，例 "NAT-001;[DELETE]NAT-002"
// 输出: 单条竞品 SKU（含删除标记、重复、空格分隔标志）
// ==========================================

use crate::config::import_rules::DELETE_MARKER;
use crate::importer::normalize::normalize_sku;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorSku {
    pub sku: String,
    pub delete_marker: bool,
    pub repeated_in_cell: bool,
    pub space_delimited: bool,
}

/// 拆分单元格
///
/// # 规则
/// - 以 ';' 分隔；单元格不含 ';' 但含空白时按空白拆分，并标记为空格分隔
/// - "[DELETE]" 前缀（或独立的 "[DELETE]" 标记）作用于紧随的 SKU
/// - 同一单元格内规范化后重复的 SKU 标记为重复
pub fn explode_cell(raw: &str) -> Vec<CompetitorSku> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let semicolon = trimmed.contains(';');
    let tokens: Vec<&str> = if semicolon {
        trimmed.split(';').map(str::trim).filter(|t| !t.is_empty()).collect()
    } else {
        trimmed.split_whitespace().collect()
    };

    let mut parsed: Vec<(String, bool)> = Vec::with_capacity(tokens.len());
    let mut pending_delete = false;
    for token in tokens {
        if token.eq_ignore_ascii_case(DELETE_MARKER) {
            pending_delete = true;
            continue;
        }
        let (sku, marked) = match strip_marker(token) {
            Some(rest) => (rest, true),
            None => (token, false),
        };
        if sku.is_empty() {
            pending_delete = pending_delete || marked;
            continue;
        }
        parsed.push((sku.to_string(), marked || pending_delete));
        pending_delete = false;
    }

    let space_delimited = !semicolon && parsed.len() > 1;
    let mut seen = HashSet::new();

    parsed
        .into_iter()
        .map(|(sku, delete_marker)| {
            let repeated_in_cell = !seen.insert(normalize_sku(&sku));
            CompetitorSku {
                sku,
                delete_marker,
                repeated_in_cell,
                space_delimited,
            }
        })
        .collect()
}

fn strip_marker(token: &str) -> Option<&str> {
    let head = token.get(..DELETE_MARKER.len())?;
    if head.eq_ignore_ascii_case(DELETE_MARKER) {
        Some(token[DELETE_MARKER.len()..].trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skus(raw: &str) -> Vec<String> {
        explode_cell(raw).into_iter().map(|c| c.sku).collect()
    }

    #[test]
    fn test_semicolon_list() {
        assert_eq!(skus("NAT-001;NAT-002"), vec!["NAT-001", "NAT-002"]);
        assert_eq!(skus(" NAT-001 ; ; NAT-002; "), vec!["NAT-001", "NAT-002"]);
        assert!(explode_cell("   ").is_empty());
        assert!(!explode_cell("NAT-001;NAT-002")[0].space_delimited);
    }

    #[test]
    fn test_space_delimited_list_is_flagged() {
        let out = explode_cell("NAT-001 NAT-002");
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.space_delimited));

        let single = explode_cell("NAT-001");
        assert!(!single[0].space_delimited);
    }

    #[test]
    fn test_delete_marker_forms() {
        let out = explode_cell("[DELETE]NAT-001;NAT-002;[delete] NAT-003");
        assert!(out[0].delete_marker);
        assert!(!out[1].delete_marker);
        assert!(out[2].delete_marker);
        assert_eq!(out[2].sku, "NAT-003");

        // 空格分隔的独立标记只作用于下一个 SKU，不算作列表
        let out = explode_cell("[DELETE] NAT-009");
        assert_eq!(out.len(), 1);
        assert!(out[0].delete_marker);
        assert!(!out[0].space_delimited);
    }

    #[test]
    fn test_repeated_sku_in_cell() {
        let out = explode_cell("NAT-001;nat001;NAT-002");
        assert!(!out[0].repeated_in_cell);
        assert!(out[1].repeated_in_cell);
        assert!(!out[2].repeated_in_cell);
    }
}
