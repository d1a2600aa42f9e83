use std::fmt;
use std::path::PathBuf;

/// scratch 目录占用统计
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct ScratchReport {
    pub dir: PathBuf,
    /// 配置的配额
    pub quota_bytes: u64,
    /// 会话初始额度：min(配额, 磁盘可用)
    pub budget_bytes: u64,
    pub remaining_bytes: u64,
    /// 当前仍在磁盘上的临时文件
    pub file_count: usize,
    pub bytes_in_use: u64,
}

pub fn human_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

impl fmt::Display for ScratchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════╗")?;
        writeln!(f, "║           docvfs Scratch Report                  ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════╣")?;
        writeln!(f, "║ dir: {}", self.dir.display())?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(
            f,
            "║   quota:        {:>10}                       ║",
            human_bytes(self.quota_bytes)
        )?;
        writeln!(
            f,
            "║   budget:       {:>10}                       ║",
            human_bytes(self.budget_bytes)
        )?;
        writeln!(
            f,
            "║   remaining:    {:>10}                       ║",
            human_bytes(self.remaining_bytes)
        )?;
        writeln!(
            f,
            "║   files:        {:>10}  ({:>10})          ║",
            self.file_count,
            human_bytes(self.bytes_in_use)
        )?;
        writeln!(f, "╚══════════════════════════════════════════════════╝")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn report_renders_counts() {
        let r = ScratchReport {
            dir: PathBuf::from("/tmp/x"),
            quota_bytes: 1024,
            budget_bytes: 1024,
            remaining_bytes: 24,
            file_count: 2,
            bytes_in_use: 1000,
        };
        let s = r.to_string();
        assert!(s.contains("/tmp/x"));
        assert!(s.contains("1000 B"));
        assert!(s.contains("24 B"));
    }
}
