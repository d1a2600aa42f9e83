use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sysinfo::Disks;
use tempfile::TempDir;

use crate::core::DiskSpaceError;
use crate::stats::ScratchReport;

/// scratch 配额 + 临时文件工厂
///
/// ## 契约
/// - `check_disk_space` 只读一次剩余额度，不预留；检查与 `commit` 之间不是原子的。
///   并发解包在配额边界附近可能短暂超额（软上限，用来挡住失控解包）。
/// - `create_derived_temp_file` 生成的文件名在并发下不冲突。
pub trait ScratchProvider: Send + Sync {
    fn remaining(&self) -> u64;

    fn check_disk_space(&self, required: u64) -> Result<(), DiskSpaceError> {
        let remaining = self.remaining();
        if required > remaining {
            return Err(DiskSpaceError {
                required,
                remaining,
            });
        }
        Ok(())
    }

    /// 按条目名派生唯一临时文件（保留扩展名）
    fn create_derived_temp_file(&self, name: &str) -> std::io::Result<(File, PathBuf)>;

    /// 记账：`path` 实际写入了 `bytes` 字节
    fn commit(&self, path: &Path, bytes: u64);
}

/// 一次索引会话的 scratch 目录。
///
/// 会话开始时按 `min(配额, 磁盘可用空间)` 初始化额度；drop 时整个目录被删除。
pub struct ScratchSpace {
    dir: TempDir,
    quota: u64,
    budget: u64,
    remaining: AtomicU64,
    files: Mutex<Vec<(PathBuf, u64)>>,
}

impl ScratchSpace {
    /// 在 `parent` 下创建会话目录；额度受磁盘可用空间约束
    pub fn open(parent: &Path, quota: u64) -> std::io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let budget = match available_space(parent) {
            Some(avail) => quota.min(avail),
            None => {
                tracing::warn!("Cannot determine free space under {:?}, using quota as-is", parent);
                quota
            }
        };
        Self::with_budget(parent, quota, budget)
    }

    /// 显式指定额度（不探测磁盘）
    pub fn with_budget(parent: &Path, quota: u64, budget: u64) -> std::io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix("docvfs-scratch-")
            .tempdir_in(parent)?;
        tracing::info!(
            "Scratch space at {:?}: quota={} budget={}",
            dir.path(),
            quota,
            budget
        );
        Ok(Self {
            dir,
            quota,
            budget,
            remaining: AtomicU64::new(budget),
            files: Mutex::new(Vec::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// 删除单个临时文件并归还额度。
    ///
    /// 只接受本会话登记过的文件；删除失败时保留登记，留给 `cleanup`。
    /// 归还后的额度不超过会话初始额度（超额提交时 `commit` 只扣到 0）。
    pub fn release(&self, path: &Path) -> std::io::Result<()> {
        if !self.files.lock().iter().any(|(p, _)| p == path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a scratch file of this session: {:?}", path),
            ));
        }

        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let freed = {
            let mut files = self.files.lock();
            match files.iter().position(|(p, _)| p == path) {
                Some(i) => files.swap_remove(i).1,
                None => 0,
            }
        };
        let budget = self.budget;
        let _ = self
            .remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |r| {
                Some(r.saturating_add(freed).min(budget))
            });
        Ok(())
    }

    /// 删除本会话产生的全部临时文件，额度复位
    pub fn cleanup(&self) {
        let files = std::mem::take(&mut *self.files.lock());
        let count = files.len();
        for (p, _) in files {
            if let Err(e) = std::fs::remove_file(&p) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove scratch file {:?}: {}", p, e);
                }
            }
        }
        self.remaining.store(self.budget, Ordering::Relaxed);
        tracing::debug!("Scratch cleanup: {} files removed", count);
    }

    pub fn report(&self) -> ScratchReport {
        let files = self.files.lock();
        ScratchReport {
            dir: self.dir.path().to_path_buf(),
            quota_bytes: self.quota,
            budget_bytes: self.budget,
            remaining_bytes: self.remaining.load(Ordering::Relaxed),
            file_count: files.len(),
            bytes_in_use: files.iter().map(|(_, n)| *n).sum(),
        }
    }
}

impl ScratchProvider for ScratchSpace {
    fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    fn create_derived_temp_file(&self, name: &str) -> std::io::Result<(File, PathBuf)> {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((s, e)) if !s.is_empty() && !e.is_empty() => (s, Some(e)),
            _ => (name, None),
        };
        let prefix = format!("{stem}-");
        let suffix = ext.map(|e| format!(".{e}")).unwrap_or_default();

        let tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(8)
            .tempfile_in(self.dir.path())?;
        let (file, path) = tmp.keep().map_err(|e| e.error)?;
        self.files.lock().push((path.clone(), 0));
        Ok((file, path))
    }

    fn commit(&self, path: &Path, bytes: u64) {
        if let Some(slot) = self.files.lock().iter_mut().find(|(p, _)| p == path) {
            slot.1 = bytes;
        }
        let _ = self
            .remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |r| {
                Some(r.saturating_sub(bytes))
            });
    }
}

/// `dir` 所在磁盘的可用字节数（取最长匹配的挂载点）
fn available_space(dir: &Path) -> Option<u64> {
    let dir = dir.canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|d| dir.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| d.available_space())
}
