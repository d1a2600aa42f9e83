use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::{IndexingError, MaterializeError, ResolvedNode};
use crate::storage::ScratchProvider;
use crate::vfs::VirtualFs;

/// 把归档条目解包成真实临时文件，交给需要文件句柄的内容提取器。
pub struct ArchiveMaterializer {
    vfs: Arc<dyn VirtualFs>,
    scratch: Arc<dyn ScratchProvider>,
}

impl ArchiveMaterializer {
    pub fn new(vfs: Arc<dyn VirtualFs>, scratch: Arc<dyn ScratchProvider>) -> Self {
        Self { vfs, scratch }
    }

    /// 非 `ArchiveEntry` 节点直接返回 `Ok(None)`。
    ///
    /// 配额检查在任何写入之前进行（按解压后长度计）；复制失败时临时文件留给会话清理。
    pub fn materialize(&self, node: &ResolvedNode) -> Result<Option<PathBuf>, MaterializeError> {
        let Some(entry) = node.as_entry() else {
            return Ok(None);
        };

        self.scratch.check_disk_space(entry.length)?;

        let (file, target) = self
            .scratch
            .create_derived_temp_file(entry.name())
            .map_err(|source| IndexingError {
                entry: entry.path.clone(),
                target: PathBuf::from(entry.name()),
                source,
            })?;

        let mut out = BufWriter::new(file);
        let written = self
            .vfs
            .copy_entry(&entry.path, &mut out)
            .and_then(|n| out.flush().map(|_| n))
            .map_err(|source| IndexingError {
                entry: entry.path.clone(),
                target: target.clone(),
                source,
            })?;

        self.scratch.commit(&target, written);
        tracing::debug!(
            "Unpacked {} -> {:?} ({} bytes, {} remaining)",
            entry.path,
            target,
            written,
            self.scratch.remaining()
        );
        Ok(Some(target))
    }
}
