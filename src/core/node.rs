use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 归档内部的文件条目。
///
/// `container` 指向最外层、真实存在于磁盘上的归档文件（不持有它）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub path: String,
    pub container: PathBuf,
    /// 解压后长度（scratch 配额按此计）
    pub length: u64,
    /// 归档元数据中的压缩长度
    pub compressed_length: u64,
}

impl ArchiveEntry {
    pub fn name(&self) -> &str {
        crate::core::path::file_name(&self.path)
    }
}

/// 分类结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedNode {
    RealFile {
        path: String,
    },
    RealDirectory {
        path: String,
    },
    /// 作为目录浏览的归档；嵌套归档时 `container` 为外层真实归档
    ArchiveContainer {
        path: String,
        container: Option<PathBuf>,
    },
    ArchiveEntry(ArchiveEntry),
    /// 归档内部的目录
    ArchiveFolder {
        path: String,
        container: PathBuf,
    },
}

impl ResolvedNode {
    pub fn path(&self) -> &str {
        match self {
            ResolvedNode::RealFile { path }
            | ResolvedNode::RealDirectory { path }
            | ResolvedNode::ArchiveContainer { path, .. }
            | ResolvedNode::ArchiveFolder { path, .. } => path,
            ResolvedNode::ArchiveEntry(e) => &e.path,
        }
    }

    pub fn as_entry(&self) -> Option<&ArchiveEntry> {
        match self {
            ResolvedNode::ArchiveEntry(e) => Some(e),
            _ => None,
        }
    }

    /// 能否继续向下浏览（目录、归档、归档内目录）
    pub fn is_browsable(&self) -> bool {
        matches!(
            self,
            ResolvedNode::RealDirectory { .. }
                | ResolvedNode::ArchiveContainer { .. }
                | ResolvedNode::ArchiveFolder { .. }
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ResolvedNode::RealFile { .. } => "real_file",
            ResolvedNode::RealDirectory { .. } => "real_directory",
            ResolvedNode::ArchiveContainer { .. } => "archive_container",
            ResolvedNode::ArchiveEntry(_) => "archive_entry",
            ResolvedNode::ArchiveFolder { .. } => "archive_folder",
        }
    }
}

/// `split` 的结果：真实前缀 + 虚拟后缀（可能为空）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitResult {
    pub existing: String,
    pub suffix: String,
}

impl SplitResult {
    /// 以规范分隔符重新拼回完整路径
    pub fn joined(&self) -> String {
        crate::core::path::join(&self.existing, &self.suffix)
    }
}
