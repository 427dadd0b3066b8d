// ==========================================
// 零件目录导入 - 文本规范化
// ==========================================
// 职责: TRIM / NULL 标准化 / SKU 与自然键比较形式
// ==========================================

/// 单元格文本标准化：去首尾空白，空串视为 None
pub fn clean_cell(value: Option<&str>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// SKU 比较形式：大写，去掉空白与连字符
///
/// 例: " acr-12 34 " → "ACR1234"
pub fn normalize_sku(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// 通用自然键比较形式：大写，连续空白折叠为单个空格
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// 可选字段比较（None 与空串等价）
pub fn same_optional(a: Option<&str>, b: Option<&str>) -> bool {
    clean_cell(a) == clean_cell(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_cell() {
        assert_eq!(clean_cell(Some("  x ")), Some("x".to_string()));
        assert_eq!(clean_cell(Some("   ")), None);
        assert_eq!(clean_cell(None), None);
    }

    #[test]
    fn test_normalize_sku() {
        assert_eq!(normalize_sku(" acr-12 34 "), "ACR1234");
        assert_eq!(normalize_sku("NAT-001"), normalize_sku("nat001"));
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  Grand   Cherokee "), "GRAND CHEROKEE");
    }

    #[test]
    fn test_same_optional() {
        assert!(same_optional(Some(""), None));
        assert!(same_optional(Some(" a "), Some("a")));
        assert!(!same_optional(Some("a"), Some("b")));
    }
}
