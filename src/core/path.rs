use std::sync::OnceLock;

use regex::Regex;

/// 规范分隔符：所有中间表示一律使用 `/`
pub const SEPARATOR: char = '/';

fn drive_root_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]:$").expect("static regex"))
}

fn drive_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z]):").expect("static regex"))
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// 路径归一化：
/// - `\` 统一替换为 `/`
/// - 合并连续分隔符
/// - 去掉尾部分隔符（根 `/` 与 `X:/` 除外）
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;
    for c in path.chars() {
        if is_separator(c) {
            if !prev_sep {
                out.push(SEPARATOR);
            }
            prev_sep = true;
        } else {
            out.push(c);
            prev_sep = false;
        }
    }
    while out.len() > 1 && out.ends_with(SEPARATOR) {
        let without = &out[..out.len() - 1];
        if is_drive_root(without) {
            break;
        }
        out.pop();
    }
    out
}

/// 拆成非空段序列（两种分隔符都识别）；根标记不产生段，盘符 `C:` 作为第一段保留
pub fn segments(path: &str) -> Vec<&str> {
    path.split(is_separator).filter(|s| !s.is_empty()).collect()
}

/// 按最后一个分隔符切成 (左, 最后一段)；没有分隔符时返回 None。
///
/// `"/a"` → `("", "a")`，`"C:/a"` → `("C:", "a")`
pub fn split_last(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind(is_separator)?;
    Some((&path[..idx], &path[idx + 1..]))
}

/// 用规范分隔符连接两段；任一侧为空时直接返回另一侧
pub fn join(left: &str, right: &str) -> String {
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }
    let left = left.trim_end_matches(is_separator);
    let right = right.trim_start_matches(is_separator);
    format!("{left}{SEPARATOR}{right}")
}

pub fn contains_separator(path: &str) -> bool {
    path.contains(is_separator)
}

pub fn is_unix_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

/// `X:` 或 `X:/`
pub fn is_drive_root(path: &str) -> bool {
    let trimmed = path.trim_end_matches(is_separator);
    drive_root_re().is_match(trimmed)
}

/// Windows 盘符（`"C:\\Windows"` → `Some('C')`）
pub fn drive_letter(path: &str) -> Option<char> {
    drive_prefix_re()
        .captures(path)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().chars().next())
}

/// 路径的根前缀：Unix 绝对路径为 `"/"`，盘符路径为 `"X:/"`，相对路径为 `""`
pub fn root_of(path: &str) -> String {
    if path.starts_with(is_separator) {
        return SEPARATOR.to_string();
    }
    match drive_letter(path) {
        Some(d) => format!("{d}:{SEPARATOR}"),
        None => String::new(),
    }
}

/// 段名（最后一段），用于派生临时文件名
pub fn file_name(path: &str) -> &str {
    match split_last(path) {
        Some((_, last)) => last,
        None => path,
    }
}
