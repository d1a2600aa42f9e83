use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::vfs::detector::{ArchiveDetector, DEFAULT_PATTERNS};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scratch: ScratchConfig,
    pub archive: ArchiveConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// 为空时使用系统临时目录
    pub dir: Option<PathBuf>,
    pub quota_mb: u64,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: None,
            quota_mb: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub patterns: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub use_or_operator: bool,
    pub default_field: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            use_or_operator: false,
            default_field: "content".to_string(),
        }
    }
}

impl AppConfig {
    /// 查找顺序：显式路径 → `<config_dir>/docvfs/config.toml` → 默认值
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = default_path().filter(|p| p.is_file()) {
            return Self::from_file(&path);
        }

        tracing::debug!("No config file found, using defaults");
        Ok(AppConfig::default())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<AppConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("failed to parse config {:?}", path))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<AppConfig, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn detector(&self) -> ArchiveDetector {
        ArchiveDetector::new(self.archive.patterns.as_slice())
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch.dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn quota_bytes(&self) -> u64 {
        self.scratch.quota_mb.saturating_mul(1024 * 1024)
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docvfs").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let c = AppConfig::from_toml("").unwrap();
        assert_eq!(c.scratch.quota_mb, 1024);
        assert_eq!(c.quota_bytes(), 1024 * 1024 * 1024);
        assert_eq!(c.archive.patterns, vec!["*.zip", "*.jar"]);
        assert!(!c.search.use_or_operator);
        assert_eq!(c.search.default_field, "content");
        assert_eq!(c.scratch_dir(), std::env::temp_dir());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = AppConfig::from_toml(
            r#"
            [scratch]
            dir = "/var/tmp/docvfs"

            [archive]
            patterns = ["*.ZIP", "*.epub"]

            [search]
            use_or_operator = true
            "#,
        )
        .unwrap();
        assert_eq!(c.scratch_dir(), PathBuf::from("/var/tmp/docvfs"));
        assert_eq!(c.scratch.quota_mb, 1024);
        assert!(c.search.use_or_operator);
        assert_eq!(c.search.default_field, "content");

        let d = c.detector();
        assert!(d.matches("book.EPUB"));
        assert!(d.matches("a.zip"));
        assert!(!d.matches("a.jar"));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(AppConfig::from_toml("[scratch]\nquota_mb = \"lots\"").is_err());

        let missing = std::env::temp_dir().join("docvfs-no-such-config.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }
}
