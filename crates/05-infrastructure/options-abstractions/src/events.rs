//! 选项变更事件
//!
//! 每次成功提交产生一个 `Updated` 事件，每次加载结束产生一个 `Reloaded` 事件，
//! 加载中被拒绝的值产生 `ValidationFailed` 事件。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// 事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConfigChangeEventType {
    /// 选项值已提交
    Updated,
    /// 一次加载完成
    Reloaded,
    /// 选项值转换或验证失败
    ValidationFailed,
}

impl ConfigChangeEventType {
    /// 全部事件类型
    pub const ALL: [Self; 3] = [Self::Updated, Self::Reloaded, Self::ValidationFailed];
}

impl fmt::Display for ConfigChangeEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Updated => "updated",
            Self::Reloaded => "reloaded",
            Self::ValidationFailed => "validation-failed",
        })
    }
}

/// 选项变更事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangeEvent {
    /// 事件类型
    pub event_type: ConfigChangeEventType,
    /// 选项全名，重载事件为空
    pub option: String,
    /// 提交前的值
    pub old_value: Option<Value>,
    /// 提交后的值
    pub new_value: Option<Value>,
    /// 事件发生时的代数
    pub generation: u64,
    /// 产生该值的配置源
    pub source: String,
    pub timestamp: DateTime<Utc>,
    /// 附加信息，如拒绝原因、触发重载的文件
    pub metadata: BTreeMap<String, String>,
}

impl ConfigChangeEvent {
    fn new(
        event_type: ConfigChangeEventType,
        option: String,
        generation: u64,
        source: String,
    ) -> Self {
        Self {
            event_type,
            option,
            old_value: None,
            new_value: None,
            generation,
            source,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// 选项提交事件
    pub fn updated(
        option: impl Into<String>,
        old_value: Value,
        new_value: Value,
        generation: u64,
        source: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(
            ConfigChangeEventType::Updated,
            option.into(),
            generation,
            source.into(),
        );
        event.old_value = Some(old_value);
        event.new_value = Some(new_value);
        event
    }

    /// 加载完成事件
    pub fn reloaded(generation: u64, source: impl Into<String>) -> Self {
        Self::new(
            ConfigChangeEventType::Reloaded,
            String::new(),
            generation,
            source.into(),
        )
    }

    /// 值被拒绝事件，原因记录在 `reason` 元数据中
    pub fn rejected(
        option: impl Into<String>,
        generation: u64,
        source: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            ConfigChangeEventType::ValidationFailed,
            option.into(),
            generation,
            source.into(),
        )
        .with_metadata("reason", reason)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 拒绝原因
    pub fn reason(&self) -> Option<&str> {
        self.metadata.get("reason").map(String::as_str)
    }
}

impl fmt::Display for ConfigChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.event_type)?;
        if !self.option.is_empty() {
            write!(f, "{} ", self.option)?;
        }
        if let Some(value) = &self.new_value {
            write!(f, "= {value} ")?;
        }
        write!(f, "(代数 {}, 来源 {})", self.generation, self.source)
    }
}

/// 文件系统事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileSystemEventType {
    Created,
    Modified,
    Deleted,
}

/// 被监控文件上发生的变化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSystemEvent {
    pub event_type: FileSystemEventType,
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

impl FileSystemEvent {
    pub fn new(event_type: FileSystemEventType, path: impl Into<PathBuf>) -> Self {
        Self {
            event_type,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 选项事件监听器
///
/// 回调在提交线程上同步执行，实现应当尽快返回
pub trait ConfigEventListener: Send + Sync {
    /// 处理选项变更事件
    fn on_config_changed(&self, event: &ConfigChangeEvent);

    /// 处理文件系统事件，默认忽略
    fn on_file_system_event(&self, _event: &FileSystemEvent) {}

    /// 监听器名称，用于日志
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }

    /// 关注的事件类型，默认全部
    fn interested_event_types(&self) -> Vec<ConfigChangeEventType> {
        ConfigChangeEventType::ALL.to_vec()
    }

    /// 是否应收到该事件
    fn accepts(&self, event: &ConfigChangeEvent) -> bool {
        self.is_enabled() && self.interested_event_types().contains(&event.event_type)
    }
}
