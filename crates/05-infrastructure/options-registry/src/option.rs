//! 配置选项

use crate::commit::CommitClock;
use crate::field::{FieldCell, TypedField};
use options_abstractions::{OptionDescriptor, OptionKind, OptionType, OptionValue, RawValue};
use options_common::{ConfigError, ConfigResult};
use std::sync::Arc;

type Validator = Arc<dyn Fn(&OptionValue) -> Result<(), String> + Send + Sync>;

/// 注册后绑定的位置信息
struct Binding {
    group: String,
    full_name: String,
    clock: Arc<CommitClock>,
}

/// 配置选项
///
/// 由名称、帮助文本、默认值、可见性（命令行/环境变量）与一个类型化存储单元组成。
/// 元数据在构建后不可修改；注册到分组之后，写入经过注册中心的提交时钟。
pub struct ConfigOption {
    name: String,
    help: String,
    cli: bool,
    env: bool,
    short: Option<char>,
    deprecated_names: Vec<String>,
    field: Box<dyn FieldCell>,
    validator: Option<Validator>,
    binding: Option<Binding>,
}

impl std::fmt::Debug for ConfigOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigOption")
            .field("full_name", &self.full_name())
            .field("kind", &self.kind())
            .field("value", &self.value())
            .field("cli", &self.cli)
            .field("env", &self.env)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl ConfigOption {
    /// 创建选项构建器
    pub fn builder<T: OptionType>(name: impl Into<String>) -> OptionBuilder<T> {
        OptionBuilder::new(name)
    }

    /// 选项名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 全名，未注册时即选项名
    pub fn full_name(&self) -> &str {
        self.binding
            .as_ref()
            .map_or(self.name.as_str(), |b| b.full_name.as_str())
    }

    /// 所在分组全名，未注册或位于根分组时为空
    pub fn group_name(&self) -> &str {
        self.binding.as_ref().map_or("", |b| b.group.as_str())
    }

    /// 帮助文本
    pub fn help(&self) -> &str {
        &self.help
    }

    /// 声明类型
    pub fn kind(&self) -> OptionKind {
        self.field.kind()
    }

    /// 声明的默认值
    pub fn default_value(&self) -> OptionValue {
        self.field.default_value()
    }

    /// 类型零值
    pub fn zero(&self) -> OptionValue {
        self.field.zero()
    }

    /// 是否暴露为命令行参数
    pub fn is_cli(&self) -> bool {
        self.cli
    }

    /// 是否暴露为环境变量
    pub fn is_env(&self) -> bool {
        self.env
    }

    /// 命令行短参数
    pub fn short(&self) -> Option<char> {
        self.short
    }

    /// 已弃用的别名
    pub fn deprecated_names(&self) -> &[String] {
        &self.deprecated_names
    }

    /// 名称或任一弃用别名是否匹配
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.deprecated_names.iter().any(|alias| alias == name)
    }

    /// 转换并验证原始输入，不修改当前值
    pub fn parse(&self, raw: &RawValue) -> ConfigResult<OptionValue> {
        let value = self.field.parse_value(raw)?;
        if let Some(validator) = &self.validator {
            validator(&value).map_err(|message| ConfigError::validation(self.full_name(), message))?;
        }
        Ok(value)
    }

    /// 转换、验证并写入
    pub fn set_value(&self, raw: impl Into<RawValue>) -> ConfigResult<()> {
        self.set_from(&raw.into(), "direct").map(|_| ())
    }

    /// 以指定来源写入，返回提交后的代数（未注册的选项返回 `None`）
    pub(crate) fn set_from(&self, raw: &RawValue, source: &str) -> ConfigResult<Option<u64>> {
        let value = self.parse(raw)?;
        match &self.binding {
            Some(binding) => binding
                .clock
                .commit(&binding.full_name, self.field.as_ref(), value, source)
                .map(Some),
            None => self.field.set_value(value).map(|()| None),
        }
    }

    /// 当前值
    pub fn value(&self) -> OptionValue {
        self.field.get_value()
    }

    /// 是否被写入过
    pub fn is_set(&self) -> bool {
        self.field.is_set()
    }

    /// 以声明类型读取当前值
    pub fn get<T: OptionType>(&self) -> ConfigResult<T> {
        if T::kind() != self.kind() {
            return Err(ConfigError::TypeMismatch {
                option: self.full_name().to_string(),
                expected: self.kind().to_string(),
                requested: T::kind().to_string(),
            });
        }
        let value = self.value();
        T::from_value(&value).ok_or_else(|| {
            ConfigError::invariant(format!("选项 {} 存储的值 {value} 无法读取", self.full_name()))
        })
    }

    /// 生成描述符
    pub fn descriptor(&self) -> OptionDescriptor {
        OptionDescriptor {
            group: self.group_name().to_string(),
            name: self.name.clone(),
            full_name: self.full_name().to_string(),
            kind: self.kind(),
            help: self.help.clone(),
            default: self.default_value(),
            cli: self.cli,
            env: self.env,
            short: self.short,
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub(crate) fn bind(&mut self, group: &str, full_name: String, clock: Arc<CommitClock>) {
        self.binding = Some(Binding {
            group: group.to_string(),
            full_name,
            clock,
        });
    }
}

/// 选项构建器
pub struct OptionBuilder<T: OptionType> {
    name: String,
    default: Option<T>,
    help: String,
    cli: bool,
    env: bool,
    short: Option<char>,
    deprecated_names: Vec<String>,
    validator: Option<Box<dyn Fn(&T) -> Result<(), String> + Send + Sync>>,
}

impl<T: OptionType> OptionBuilder<T> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            help: String::new(),
            cli: true,
            env: true,
            short: None,
            deprecated_names: Vec::new(),
            validator: None,
        }
    }

    /// 设置默认值，未设置时使用类型零值
    pub fn default(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// 设置帮助文本
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// 是否暴露为命令行参数
    pub fn cli(mut self, enabled: bool) -> Self {
        self.cli = enabled;
        self
    }

    /// 是否暴露为环境变量
    pub fn env(mut self, enabled: bool) -> Self {
        self.env = enabled;
        self
    }

    /// 设置命令行短参数
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// 添加弃用别名，配置源仍可通过别名设置该选项
    pub fn deprecated_name(mut self, alias: impl Into<String>) -> Self {
        self.deprecated_names.push(alias.into());
        self
    }

    /// 设置验证器，在类型转换之后、写入之前执行
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    /// 构建选项
    pub fn build(self) -> ConfigOption {
        let validator = self.validator.map(|check| -> Validator {
            Arc::new(move |value: &OptionValue| match T::from_value(value) {
                Some(typed) => check(&typed),
                None => Err(format!("值 {value} 不是 {}", T::kind())),
            })
        });
        ConfigOption {
            name: self.name,
            help: self.help,
            cli: self.cli,
            env: self.env,
            short: self.short,
            deprecated_names: self.deprecated_names,
            field: Box::new(TypedField::with_default(self.default.unwrap_or_default())),
            validator,
            binding: None,
        }
    }
}
