use unicode_normalization::UnicodeNormalization;

/// 查询词切分：NFC → 按非字母数字切开 → 小写
pub fn analyze(text: &str) -> Vec<String> {
    let normalized: String = text.nfc().collect();
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// 通配符 / 前缀词不切分，只做 NFC + 小写
pub fn normalize_expanded(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}
