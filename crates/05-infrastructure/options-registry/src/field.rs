//! 类型化存储单元

use options_abstractions::{OptionKind, OptionType, OptionValue, RawValue};
use options_common::{ConfigError, ConfigResult};
use parking_lot::RwLock;

/// 单个选项值的类型化存储单元
///
/// 读写都是整值替换，读者要么看到旧值，要么看到新值
#[derive(Debug)]
pub struct TypedField<T: OptionType> {
    default: T,
    value: RwLock<Option<T>>,
}

impl<T: OptionType> TypedField<T> {
    /// 以类型零值作为默认值创建
    pub fn new() -> Self {
        Self::with_default(T::default())
    }

    /// 以指定默认值创建
    pub fn with_default(default: T) -> Self {
        Self {
            default,
            value: RwLock::new(None),
        }
    }

    /// 声明的默认值
    pub fn default_value(&self) -> T {
        self.default.clone()
    }

    /// 将原始输入转换为该类型，不修改当前值
    pub fn parse(&self, raw: &RawValue) -> ConfigResult<T> {
        let value = T::kind().coerce(raw)?;
        T::from_value(&value).ok_or_else(|| ConfigError::coercion(T::kind(), raw.describe()))
    }

    /// 写入新值
    pub fn set(&self, value: T) {
        *self.value.write() = Some(value);
    }

    /// 读取当前值，从未写入时返回默认值
    pub fn get(&self) -> T {
        self.value
            .read()
            .clone()
            .unwrap_or_else(|| self.default.clone())
    }

    /// 是否被写入过
    pub fn is_set(&self) -> bool {
        self.value.read().is_some()
    }

    /// 清除已写入的值，恢复为默认值
    pub fn reset(&self) {
        *self.value.write() = None;
    }
}

impl<T: OptionType> Default for TypedField<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 类型擦除后的存储单元接口
pub trait FieldCell: Send + Sync {
    /// 声明类型
    fn kind(&self) -> OptionKind;

    /// 类型零值
    fn zero(&self) -> OptionValue {
        self.kind().zero()
    }

    /// 声明的默认值
    fn default_value(&self) -> OptionValue;

    /// 转换原始输入
    fn parse_value(&self, raw: &RawValue) -> ConfigResult<OptionValue>;

    /// 写入已类型化的值，类型不符时返回 [`ConfigError::InvariantViolation`]
    fn set_value(&self, value: OptionValue) -> ConfigResult<()>;

    /// 读取当前值
    fn get_value(&self) -> OptionValue;

    /// 是否被写入过
    fn is_set(&self) -> bool;

    /// 恢复为默认值
    fn reset(&self);
}

impl<T: OptionType> FieldCell for TypedField<T> {
    fn kind(&self) -> OptionKind {
        T::kind()
    }

    fn default_value(&self) -> OptionValue {
        self.default.clone().into_value()
    }

    fn parse_value(&self, raw: &RawValue) -> ConfigResult<OptionValue> {
        self.parse(raw).map(OptionType::into_value)
    }

    fn set_value(&self, value: OptionValue) -> ConfigResult<()> {
        let typed = Some(&value)
            .filter(|v| v.matches(T::kind()))
            .and_then(T::from_value)
            .ok_or_else(|| {
                ConfigError::invariant(format!("值 {value} 与声明类型 {} 不匹配", T::kind()))
            })?;
        self.set(typed);
        Ok(())
    }

    fn get_value(&self) -> OptionValue {
        self.get().into_value()
    }

    fn is_set(&self) -> bool {
        TypedField::is_set(self)
    }

    fn reset(&self) {
        TypedField::reset(self);
    }
}
