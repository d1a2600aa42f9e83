use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::path;

/// 计算从绝对路径 `src` 到绝对路径 `dst` 的最短相对路径。
///
/// 输出示例：
/// ```text
/// ../..
/// ../../path/to/adjacent/file
/// path/to/subfolder
/// ```
///
/// 段比较区分大小写，不处理 `.` / `..`；输出总是 `/` 分隔、无首尾分隔符。
/// 两条路径相同时返回空串。
pub fn relative_path(src: &str, dst: &str) -> String {
    let src_parts = path::segments(src);
    let dst_parts = path::segments(dst);

    let common = src_parts
        .iter()
        .zip(dst_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = Vec::with_capacity(src_parts.len() + dst_parts.len() - 2 * common);
    out.extend(std::iter::repeat("..").take(src_parts.len() - common));
    out.extend_from_slice(&dst_parts[common..]);
    out.join("/")
}

/// `relative_path` 的逆运算：以当前的 `src`（索引根）解析出 `dst` 的绝对路径
pub fn resolve(src: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = path::segments(src);
    for seg in path::segments(relative) {
        if seg == ".." {
            parts.pop();
        } else {
            parts.push(seg);
        }
    }

    let joined = parts.join("/");
    if src.starts_with(['/', '\\']) {
        format!("/{joined}")
    } else if parts.len() == 1 && path::is_drive_root(parts[0]) {
        // "C:" 单独出现时补上根分隔符
        format!("{joined}/")
    } else {
        joined
    }
}

/// 接受文件系统路径的版本：先按当前目录转成绝对路径
pub fn relative_path_of(src: &Path, dst: &Path) -> std::io::Result<String> {
    let src = absolute_string(src)?;
    let dst = absolute_string(dst)?;
    Ok(relative_path(&src, &dst))
}

fn absolute_string(p: &Path) -> std::io::Result<String> {
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };
    Ok(path::normalize(&abs.to_string_lossy()))
}

/// 索引中保存的可移植文档引用（相对索引根）。
///
/// 索引整体搬移后，用新的索引根即可还原文档的绝对路径。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativePathRecord(String);

impl RelativePathRecord {
    pub fn encode(index_root: &str, document: &str) -> Self {
        Self(relative_path(index_root, document))
    }

    pub fn resolve(&self, index_root: &str) -> String {
        resolve(index_root, &self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RelativePathRecord {
    fn from(s: String) -> Self {
        Self(s)
    }
}
