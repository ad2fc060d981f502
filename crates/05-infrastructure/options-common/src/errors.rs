//! 错误类型定义

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 发生名称冲突的对象类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// 选项
    Option,
    /// 分组
    Group,
    /// 配置源
    Source,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Option => "选项",
            Self::Group => "分组",
            Self::Source => "配置源",
        };
        f.write_str(label)
    }
}

/// 配置源的加载阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// 预处理阶段
    Pre,
    /// 解析阶段
    Parse,
    /// 收尾阶段
    Post,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pre => "pre",
            Self::Parse => "parse",
            Self::Post => "post",
        };
        f.write_str(label)
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{kind}名称重复: {name} (所在分组: {group:?})")]
    DuplicateName {
        kind: NameKind,
        name: String,
        group: String,
    },

    #[error("名称无效: {name:?}, 原因: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("类型转换失败: 期望 {expected}, 实际输入 {input}")]
    Coercion { expected: String, input: String },

    #[error("配置验证失败: {option}, 原因: {message}")]
    Validation { option: String, message: String },

    #[error("选项 {option} 的值无效: {cause}")]
    OptionValue {
        option: String,
        #[source]
        cause: Box<ConfigError>,
    },

    #[error("选项不存在: {name}")]
    UnknownOption { name: String },

    #[error("分组不存在: {path}")]
    UnknownGroup { path: String },

    #[error("选项类型不匹配: {option}, 声明类型 {expected}, 请求类型 {requested}")]
    TypeMismatch {
        option: String,
        expected: String,
        requested: String,
    },

    #[error("内部不变量被破坏: {message}")]
    InvariantViolation { message: String },

    #[error("配置源 {source_name} 在 {phase} 阶段失败: {cause}")]
    Load {
        source_name: String,
        phase: LoadPhase,
        #[source]
        cause: Box<ConfigError>,
    },

    #[error("{0}")]
    Multiple(MultiError),

    #[error("配置文件读取失败: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{format} 配置解析失败: {message}")]
    Decode { format: String, message: String },

    #[error("{version}")]
    VersionRequested { version: String },

    #[error("{usage}")]
    HelpRequested { usage: String },

    #[error("配置文件监控失败: {message}")]
    Watch { message: String },
}

impl ConfigError {
    /// 创建选项名称重复错误
    pub fn duplicate_option(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind: NameKind::Option,
            name: name.into(),
            group: group.into(),
        }
    }

    /// 创建分组名称重复错误
    pub fn duplicate_group(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind: NameKind::Group,
            name: name.into(),
            group: group.into(),
        }
    }

    /// 创建名称无效错误
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// 创建类型转换错误
    pub fn coercion(expected: impl fmt::Display, input: impl Into<String>) -> Self {
        Self::Coercion {
            expected: expected.to_string(),
            input: input.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            option: option.into(),
            message: message.into(),
        }
    }

    /// 创建不变量破坏错误
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// 用选项全名包装值错误
    pub fn for_option(self, option: impl Into<String>) -> Self {
        Self::OptionValue {
            option: option.into(),
            cause: Box::new(self),
        }
    }

    /// 用配置源名称与阶段包装错误
    pub fn in_source(self, source_name: impl Into<String>, phase: LoadPhase) -> Self {
        Self::Load {
            source_name: source_name.into(),
            phase,
            cause: Box::new(self),
        }
    }

    /// 展开聚合错误，返回所有底层原因
    pub fn causes(&self) -> Vec<&ConfigError> {
        match self {
            Self::Multiple(multi) => multi.errors().iter().flat_map(Self::causes).collect(),
            other => vec![other],
        }
    }

    /// 出错的选项全名（若可确定）
    pub fn option_name(&self) -> Option<&str> {
        match self {
            Self::OptionValue { option, .. }
            | Self::Validation { option, .. }
            | Self::TypeMismatch { option, .. } => Some(option),
            Self::UnknownOption { name } => Some(name),
            _ => None,
        }
    }

    /// 剥离配置源与选项包装后的最内层错误
    pub fn innermost(&self) -> &ConfigError {
        match self {
            Self::Load { cause, .. } | Self::OptionValue { cause, .. } => cause.innermost(),
            other => other,
        }
    }

    /// 是否为版本号请求（命令行 `--version`）
    pub fn is_version_request(&self) -> bool {
        match self {
            Self::VersionRequested { .. } => true,
            Self::Load { cause, .. } => cause.is_version_request(),
            _ => false,
        }
    }

    /// 是否为帮助信息请求（命令行 `--help`）
    pub fn is_help_request(&self) -> bool {
        match self {
            Self::HelpRequested { .. } => true,
            Self::Load { cause, .. } => cause.is_help_request(),
            _ => false,
        }
    }
}

/// 一次加载中收集到的多个错误
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<ConfigError>,
}

impl MultiError {
    /// 创建空的错误集合
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// 追加错误
    pub fn push(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// 是否没有任何错误
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 错误数量
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// 所有错误
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// 取出所有错误
    pub fn into_errors(self) -> Vec<ConfigError> {
        self.errors
    }

    /// 无错误时返回 `Ok(())`，否则返回聚合错误
    pub fn into_result(self) -> ConfigResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Multiple(self))
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}个选项加载失败", self.errors.len())?;
        for (idx, error) in self.errors.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

impl FromIterator<ConfigError> for MultiError {
    fn from_iter<I: IntoIterator<Item = ConfigError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causes_flatten_nested_multi_errors() {
        let inner: MultiError = vec![
            ConfigError::coercion("int64", "abc").for_option("a.b"),
            ConfigError::validation("a.c", "too large"),
        ]
        .into_iter()
        .collect();
        let outer: MultiError = vec![
            ConfigError::Multiple(inner),
            ConfigError::UnknownOption {
                name: "x".to_string(),
            },
        ]
        .into_iter()
        .collect();
        let error = ConfigError::Multiple(outer);

        let names: Vec<_> = error.causes().iter().filter_map(|e| e.option_name()).collect();
        assert_eq!(names, vec!["a.b", "a.c", "x"]);
    }

    #[test]
    fn test_multi_error_display_lists_every_cause() {
        let multi: MultiError = vec![
            ConfigError::validation("db.port", "must be > 0"),
            ConfigError::validation("db.host", "empty"),
        ]
        .into_iter()
        .collect();
        let text = multi.to_string();
        assert!(text.starts_with("2个选项加载失败"));
        assert!(text.contains("db.port"));
        assert!(text.contains("db.host"));
    }

    #[test]
    fn test_innermost_unwraps_source_and_option() {
        let error = ConfigError::coercion("int64", "abc")
            .for_option("db.port")
            .in_source("cli", LoadPhase::Parse);
        assert!(matches!(error.innermost(), ConfigError::Coercion { .. }));

        let version = ConfigError::VersionRequested {
            version: "app 1.0".to_string(),
        }
        .in_source("cli", LoadPhase::Parse);
        assert_eq!(version.innermost().to_string(), "app 1.0");
    }

    #[test]
    fn test_empty_multi_error_is_ok() {
        assert!(MultiError::new().into_result().is_ok());
    }

    #[test]
    fn test_version_request_seen_through_load_wrapper() {
        let error = ConfigError::VersionRequested {
            version: "1.0.0".to_string(),
        }
        .in_source("cli", LoadPhase::Parse);
        assert!(error.is_version_request());
        assert!(!error.is_help_request());
    }
}
