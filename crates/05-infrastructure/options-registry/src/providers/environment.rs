//! 环境变量配置源

use options_abstractions::{ConfigSource, RawValue, SourceContext};
use options_common::{env_key, ConfigResult};
use std::collections::HashMap;
use tracing::debug;

/// 环境变量配置源
///
/// 对每个暴露为环境变量的选项查找 `前缀_分组_选项`（大写，分组分隔符替换为 `_`）
#[derive(Debug, Clone)]
pub struct EnvironmentSource {
    prefix: String,
    separator: String,
    priority: i32,
    vars: Option<HashMap<String, String>>,
}

impl EnvironmentSource {
    /// 创建环境变量配置源，加载时读取进程环境
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_uppercase(),
            separator: "_".to_string(),
            priority: 200,
            vars: None,
        }
    }

    /// 使用给定的变量表代替进程环境
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut source = Self::new(prefix);
        source.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        source
    }

    /// 设置分隔符
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 选项全名对应的环境变量名
    pub fn variable_name(&self, full_name: &str, group_separator: &str) -> String {
        env_key(&self.prefix, full_name, group_separator, &self.separator)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }
}

impl ConfigSource for EnvironmentSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn parse(&mut self, ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        let group_separator = ctx.separator().to_string();
        let mut staged = 0usize;
        for descriptor in ctx.options().into_iter().filter(|d| d.env) {
            let key = self.variable_name(&descriptor.full_name, &group_separator);
            if let Some(value) = self.lookup(&key) {
                debug!("从环境变量 {} 读取选项 {}", key, descriptor.full_name);
                ctx.stage(&descriptor.group, &descriptor.name, RawValue::from(value))?;
                staged += 1;
            }
        }
        debug!("环境变量配置源暂存了 {} 个选项 (前缀: {})", staged, self.prefix);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name() {
        let source = EnvironmentSource::new("app");
        assert_eq!(source.variable_name("db.pool.max_size", "."), "APP_DB_POOL_MAX_SIZE");
        let source = EnvironmentSource::new("").with_separator("__");
        assert_eq!(source.variable_name("db.port", "."), "DB__PORT");
    }

    #[test]
    fn test_injected_vars_take_precedence_over_process_env() {
        let source = EnvironmentSource::from_vars("APP", [("APP_PORT", "1")]);
        assert_eq!(source.lookup("APP_PORT").as_deref(), Some("1"));
        assert_eq!(source.lookup("PATH"), None);
    }
}
