//! 内存配置源

use options_abstractions::{ConfigSource, SourceContext};
use options_common::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use tracing::debug;

/// 内存配置源
///
/// 持有一棵嵌套映射，键既可以是嵌套的分组，也可以是带分隔符的全名
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    priority: i32,
    values: Map<String, Value>,
}

impl MemorySource {
    /// 创建内存配置源
    pub fn new(name: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            values,
        }
    }

    /// 从 JSON 值创建，顶层必须是对象
    pub fn from_value(name: impl Into<String>, value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(values) => Ok(Self::new(name, values)),
            other => Err(ConfigError::Decode {
                format: "memory".to_string(),
                message: format!("顶层必须是键值映射，实际为 {other}"),
            }),
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 设置单个键
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// 当前持有的映射
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl ConfigSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn parse(&mut self, ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        let staged = ctx.stage_tree(&self.values)?;
        debug!("内存配置源 {} 暂存了 {} 个选项", self.name, staged);
        Ok(())
    }
}
