pub mod detector;
pub mod zipfs;

use std::io::Write;
use std::path::PathBuf;

pub use detector::ArchiveDetector;
pub use zipfs::ZipFs;

/// 节点视图：是否对路径最后一段做归档识别
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum View {
    Detecting,
    /// 末段关闭归档识别（其余段照常）
    LeafAsFile,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    /// 被识别并可打开的归档，按目录浏览
    Archive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualNode {
    pub kind: NodeKind,
    /// 外围归档层数；0 表示真实文件系统上的节点
    pub depth: usize,
    /// 最外层真实归档文件（depth > 0 时才有）
    pub container: Option<PathBuf>,
    pub length: u64,
    pub compressed_length: u64,
}

impl VirtualNode {
    pub fn is_entry(&self) -> bool {
        self.depth > 0
    }
}

/// 目录/归档下的一个子项
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
}

/// 归档感知的虚拟文件系统
///
/// ## 契约
/// - 路径统一按 `/` 或 `\` 分段，不区分两者。
/// - `lookup` 不报错：不可读 / 损坏的归档按普通文件或不存在处理。
pub trait VirtualFs: Send + Sync {
    fn lookup(&self, path: &str, view: View) -> Option<VirtualNode>;

    /// 把归档条目解压后的字节写入 `dst`，返回写入字节数
    fn copy_entry(&self, path: &str, dst: &mut dyn Write) -> std::io::Result<u64>;

    /// 列出目录、归档或归档内目录的直接子项
    fn list_dir(&self, path: &str) -> std::io::Result<Vec<DirEntry>>;

    /// 归档感知视图下是普通文件（归档本身不算）
    fn is_file(&self, path: &str) -> bool {
        matches!(
            self.lookup(path, View::Detecting),
            Some(VirtualNode {
                kind: NodeKind::File,
                ..
            })
        )
    }

    /// 是否位于至少一层归档内部
    fn is_entry(&self, path: &str) -> bool {
        self.lookup(path, View::Detecting)
            .map(|n| n.is_entry())
            .unwrap_or(false)
    }

    fn is_directory(&self, path: &str) -> bool {
        matches!(
            self.lookup(path, View::Detecting),
            Some(VirtualNode {
                kind: NodeKind::Directory | NodeKind::Archive,
                ..
            })
        )
    }

    /// 末段关闭归档识别后是否为文件
    fn is_file_without_detection(&self, path: &str) -> bool {
        matches!(
            self.lookup(path, View::LeafAsFile),
            Some(VirtualNode {
                kind: NodeKind::File,
                ..
            })
        )
    }
}
