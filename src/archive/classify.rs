use std::path::Path;
use std::sync::Arc;

use crate::core::{path, ArchiveEntry, ResolvedNode};
use crate::vfs::{NodeKind, View, VirtualFs};

/// 判断一个节点是普通文件、目录、可浏览的归档，还是归档内部条目。
///
/// 归档按扩展名自动识别，在边界处有歧义：一个叫 `x.zip` 的条目可能是要进入的归档，
/// 也可能只是名字像归档的普通文件。这里用两种视图对比来区分
/// （识别开启 vs. 仅对末段关闭识别）。这是启发式做法，底层 `ZipFs` 另外会在打不开时回退为普通文件。
pub struct ArchiveClassifier {
    vfs: Arc<dyn VirtualFs>,
}

impl ArchiveClassifier {
    pub fn new(vfs: Arc<dyn VirtualFs>) -> Self {
        Self { vfs }
    }

    /// 返回 None 表示路径不存在
    pub fn classify(&self, raw: &str) -> Option<ResolvedNode> {
        let p = path::normalize(raw);

        // 1) 快路径：归档之外的普通文件（归档感知视图只走这一遍，后面复用 node）
        let node = self.vfs.lookup(&p, View::Detecting)?;
        let is_file = node.kind == NodeKind::File;
        if !node.is_entry() && is_file {
            return Some(ResolvedNode::RealFile { path: p });
        }

        // 2) 不在任何归档内：物理文件系统说是文件，就是被当作目录浏览的顶层归档
        if !node.is_entry() {
            let physical = Path::new(&p);
            if physical.is_file() {
                return Some(ResolvedNode::ArchiveContainer {
                    path: p,
                    container: None,
                });
            }
            if physical.is_dir() {
                return Some(ResolvedNode::RealDirectory { path: p });
            }
            return None;
        }

        let container = node.container.clone().unwrap_or_default();

        // 3) 归档内部：先排除普通条目，再用“末段关闭识别”的视图区分嵌套归档与目录
        if is_file {
            return Some(ResolvedNode::ArchiveEntry(ArchiveEntry {
                path: p,
                container,
                length: node.length,
                compressed_length: node.compressed_length,
            }));
        }
        if self.vfs.is_file_without_detection(&p) {
            return Some(ResolvedNode::ArchiveContainer {
                path: p,
                container: Some(container),
            });
        }
        Some(ResolvedNode::ArchiveFolder { path: p, container })
    }
}
