use wildmatch::WildMatch;

/// 按文件名识别归档（不区分大小写的通配符）
#[derive(Clone, Debug)]
pub struct ArchiveDetector {
    patterns: Vec<WildMatch>,
}

pub const DEFAULT_PATTERNS: &[&str] = &["*.zip", "*.jar"];

impl ArchiveDetector {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| WildMatch::new(&p.as_ref().to_lowercase()))
                .collect(),
        }
    }

    /// 关闭识别：任何名字都不当作归档
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let lower = name.to_lowercase();
        self.patterns.iter().any(|w| w.matches(&lower))
    }
}

impl Default for ArchiveDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS)
    }
}
