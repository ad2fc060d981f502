//! 监控文件过滤
//!
//! 文件监控器只对通过过滤器的路径触发重载

use std::collections::BTreeSet;
use std::path::Path;

/// 可由文件配置源解码的扩展名
pub const CONFIG_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// 文件过滤器
pub trait FileFilter: Send + Sync {
    /// 路径上的变化是否需要处理
    fn should_watch(&self, path: &Path) -> bool;

    fn name(&self) -> &str;
}

/// 按扩展名过滤，大小写不敏感
#[derive(Debug, Clone)]
pub struct ExtensionFileFilter {
    extensions: BTreeSet<String>,
}

impl ExtensionFileFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// 内置解码器支持的全部扩展名
    pub fn config_files() -> Self {
        Self::new(CONFIG_EXTENSIONS)
    }
}

impl FileFilter for ExtensionFileFilter {
    fn should_watch(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }

    fn name(&self) -> &str {
        "extension"
    }
}

/// 按 glob 模式过滤
///
/// 模式与完整路径或文件名之一匹配即可
#[derive(Debug, Clone)]
pub struct PatternFileFilter {
    patterns: Vec<glob::Pattern>,
}

impl PatternFileFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, glob::PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| glob::Pattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl FileFilter for PatternFileFilter {
    fn should_watch(&self, path: &Path) -> bool {
        let file_name = path.file_name().map(Path::new);
        self.patterns.iter().any(|pattern| {
            pattern.matches_path(path) || file_name.is_some_and(|name| pattern.matches_path(name))
        })
    }

    fn name(&self) -> &str {
        "pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter_matches_config_files() {
        let filter = ExtensionFileFilter::config_files();
        assert!(filter.should_watch(Path::new("/etc/app/config.TOML")));
        assert!(filter.should_watch(Path::new("app.yml")));
        assert!(!filter.should_watch(Path::new("app.toml.swp")));
        assert!(!filter.should_watch(Path::new("README")));

        let filter = ExtensionFileFilter::new([".Conf"]);
        assert!(filter.should_watch(Path::new("nginx.conf")));
    }

    #[test]
    fn test_pattern_filter() {
        let filter = PatternFileFilter::new(["*/conf.d/*.json", "app-*.toml"]).unwrap();
        assert!(filter.should_watch(Path::new("/etc/conf.d/db.json")));
        assert!(!filter.should_watch(Path::new("/etc/db.json")));
        assert!(filter.should_watch(Path::new("/srv/app-prod.toml")));
        assert!(PatternFileFilter::new(["["]).is_err());
    }
}
