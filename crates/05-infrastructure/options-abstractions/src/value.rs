//! 选项值模型
//!
//! 每个选项在注册时声明一个 [`OptionKind`]，之后所有写入都通过
//! [`OptionKind::coerce`] 转换成匹配该类型的 [`OptionValue`]。

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use options_common::{ConfigError, ConfigResult};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// 标量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Text,
    Duration,
    Timestamp,
}

impl ScalarKind {
    /// 类型名称，用于错误信息与帮助文本
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float => "float",
            Self::Text => "string",
            Self::Duration => "duration",
            Self::Timestamp => "timestamp",
        }
    }

    /// 整数类型的取值范围
    fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Self::Int8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
            Self::Int16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
            Self::Int32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            Self::Int64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            Self::UInt8 => (0, i128::from(u8::MAX)),
            Self::UInt16 => (0, i128::from(u16::MAX)),
            Self::UInt32 => (0, i128::from(u32::MAX)),
            Self::UInt64 => (0, i128::from(u64::MAX)),
            _ => return None,
        };
        Some(range)
    }

    fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }

    /// 该类型的零值
    pub fn zero(self) -> OptionValue {
        match self {
            Self::Bool => OptionValue::Bool(false),
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => OptionValue::Int(0),
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => OptionValue::UInt(0),
            Self::Float => OptionValue::Float(0.0),
            Self::Text => OptionValue::Text(String::new()),
            Self::Duration => OptionValue::Duration(Duration::ZERO),
            Self::Timestamp => OptionValue::Timestamp(DateTime::<Utc>::default()),
        }
    }

    /// 判断一个已类型化的值是否满足该类型（包括整数宽度）
    pub fn accepts(self, value: &OptionValue) -> bool {
        match (self, value) {
            (Self::Bool, OptionValue::Bool(_))
            | (Self::Float, OptionValue::Float(_))
            | (Self::Text, OptionValue::Text(_))
            | (Self::Duration, OptionValue::Duration(_))
            | (Self::Timestamp, OptionValue::Timestamp(_)) => true,
            (kind, OptionValue::Int(i)) if !kind.is_unsigned() => kind
                .int_range()
                .is_some_and(|(min, max)| (min..=max).contains(&i128::from(*i))),
            (kind, OptionValue::UInt(u)) if kind.is_unsigned() => kind
                .int_range()
                .is_some_and(|(_, max)| i128::from(*u) <= max),
            _ => false,
        }
    }

    /// 将原始 JSON 值转换为该类型
    pub fn coerce(self, raw: &Value) -> ConfigResult<OptionValue> {
        let fail = || ConfigError::coercion(self.name(), raw.to_string());
        match self {
            Self::Bool => match raw {
                Value::Bool(b) => Ok(OptionValue::Bool(*b)),
                Value::String(s) => parse_bool(s).map(OptionValue::Bool).ok_or_else(fail),
                Value::Number(n) => match n.as_u64() {
                    Some(0) => Ok(OptionValue::Bool(false)),
                    Some(1) => Ok(OptionValue::Bool(true)),
                    _ => Err(fail()),
                },
                _ => Err(fail()),
            },
            Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::UInt8
            | Self::UInt16
            | Self::UInt32
            | Self::UInt64 => {
                let wide = json_to_i128(raw).ok_or_else(fail)?;
                let (min, max) = self.int_range().ok_or_else(fail)?;
                if wide < min || wide > max {
                    return Err(fail());
                }
                if self.is_unsigned() {
                    u64::try_from(wide).map(OptionValue::UInt).map_err(|_| fail())
                } else {
                    i64::try_from(wide).map(OptionValue::Int).map_err(|_| fail())
                }
            }
            Self::Float => match raw {
                Value::Number(n) => n.as_f64().map(OptionValue::Float).ok_or_else(fail),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(OptionValue::Float)
                    .map_err(|_| fail()),
                _ => Err(fail()),
            },
            Self::Text => match raw {
                Value::String(s) => Ok(OptionValue::Text(s.clone())),
                Value::Number(n) => Ok(OptionValue::Text(n.to_string())),
                Value::Bool(b) => Ok(OptionValue::Text(b.to_string())),
                _ => Err(fail()),
            },
            Self::Duration => match raw {
                Value::String(s) => parse_duration(s).map(OptionValue::Duration).ok_or_else(fail),
                Value::Number(n) => {
                    if let Some(secs) = n.as_u64() {
                        Ok(OptionValue::Duration(Duration::from_secs(secs)))
                    } else {
                        // 负数、非有限值与超出 Duration 范围的秒数均视为转换失败
                        n.as_f64()
                            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                            .map(OptionValue::Duration)
                            .ok_or_else(fail)
                    }
                }
                _ => Err(fail()),
            },
            Self::Timestamp => match raw {
                Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                    .map(|dt| OptionValue::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|_| fail()),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                    .map(OptionValue::Timestamp)
                    .ok_or_else(fail),
                _ => Err(fail()),
            },
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 选项声明类型：标量或同构序列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Scalar(ScalarKind),
    List(ScalarKind),
}

impl OptionKind {
    /// 元素类型（标量即自身）
    pub fn element(self) -> ScalarKind {
        match self {
            Self::Scalar(kind) | Self::List(kind) => kind,
        }
    }

    /// 是否为序列类型
    pub fn is_list(self) -> bool {
        matches!(self, Self::List(_))
    }

    /// 是否为布尔标量
    pub fn is_bool(self) -> bool {
        self == Self::Scalar(ScalarKind::Bool)
    }

    /// 该类型的零值
    pub fn zero(self) -> OptionValue {
        match self {
            Self::Scalar(kind) => kind.zero(),
            Self::List(_) => OptionValue::List(Vec::new()),
        }
    }

    /// 将任意原始输入转换为该类型
    ///
    /// 已类型化且匹配的值原样通过；其余输入按 JSON 形式转换
    pub fn coerce(self, raw: &RawValue) -> ConfigResult<OptionValue> {
        match raw {
            RawValue::Typed(value) if value.matches(self) => Ok(value.clone()),
            RawValue::Typed(value) => self.coerce_json(&value.to_json()),
            RawValue::Json(value) => self.coerce_json(value),
        }
    }

    fn coerce_json(self, raw: &Value) -> ConfigResult<OptionValue> {
        match self {
            Self::Scalar(kind) => kind.coerce(raw),
            Self::List(kind) => {
                let fail = |_| ConfigError::coercion(self, raw.to_string());
                let items = match raw {
                    Value::Array(items) => items
                        .iter()
                        .map(|item| kind.coerce(item))
                        .collect::<ConfigResult<Vec<_>>>()
                        .map_err(fail)?,
                    Value::String(s) if s.trim().is_empty() => Vec::new(),
                    Value::String(s) => s
                        .split(',')
                        .map(|part| kind.coerce(&Value::String(part.trim().to_string())))
                        .collect::<ConfigResult<Vec<_>>>()
                        .map_err(fail)?,
                    Value::Null | Value::Object(_) => {
                        return Err(ConfigError::coercion(self, raw.to_string()))
                    }
                    scalar => vec![kind.coerce(scalar).map_err(fail)?],
                };
                Ok(OptionValue::List(items))
            }
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::List(kind) => write!(f, "list<{kind}>"),
        }
    }
}

/// 已类型化的选项值
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Duration(Duration),
    Timestamp(DateTime<Utc>),
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// 判断该值是否满足声明类型
    pub fn matches(&self, kind: OptionKind) -> bool {
        match (kind, self) {
            (OptionKind::Scalar(scalar), value) => scalar.accepts(value),
            (OptionKind::List(scalar), Self::List(items)) => {
                items.iter().all(|item| scalar.accepts(item))
            }
            _ => false,
        }
    }

    /// 转换为 JSON 表示
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::UInt(u) => Value::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) => Value::String(s.clone()),
            Self::Duration(d) => Value::String(format_duration(*d)),
            Self::Timestamp(ts) => Value::String(ts.to_rfc3339()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// 布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 有符号整数值
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// 无符号整数值
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(u) => Some(*u),
            Self::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// 浮点值
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// 字符串值
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 时长值
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// 时间戳值
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// 序列值
    pub fn as_list(&self) -> Option<&[OptionValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Duration(d) => f.write_str(&format_duration(*d)),
            Self::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
            Self::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// 配置源提供的原始值
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// 来自文件、环境变量、命令行等的未类型化值
    Json(Value),
    /// 已类型化的值
    Typed(OptionValue),
}

impl RawValue {
    /// 用于日志与错误信息的文本表示
    pub fn describe(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Typed(value) => value.to_json().to_string(),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<OptionValue> for RawValue {
    fn from(value: OptionValue) -> Self {
        Self::Typed(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<Duration> for RawValue {
    fn from(value: Duration) -> Self {
        Self::Typed(OptionValue::Duration(value))
    }
}

/// 可作为选项值的 Rust 类型
///
/// `Default::default()` 即该类型的零值
pub trait OptionType: Clone + Default + Send + Sync + 'static {
    /// 对应的声明类型
    fn kind() -> OptionKind;

    /// 从已类型化的值提取
    fn from_value(value: &OptionValue) -> Option<Self>;

    /// 转换为已类型化的值
    fn into_value(self) -> OptionValue;
}

/// 可作为序列元素的标量类型
pub trait ScalarOptionType: OptionType {
    /// 对应的标量类型
    fn scalar_kind() -> ScalarKind;
}

macro_rules! scalar_option_type {
    ($ty:ty, $kind:ident, |$v:ident| $from:expr, |$s:ident| $into:expr) => {
        impl OptionType for $ty {
            fn kind() -> OptionKind {
                OptionKind::Scalar(ScalarKind::$kind)
            }

            fn from_value($v: &OptionValue) -> Option<Self> {
                $from
            }

            fn into_value(self) -> OptionValue {
                let $s = self;
                $into
            }
        }

        impl ScalarOptionType for $ty {
            fn scalar_kind() -> ScalarKind {
                ScalarKind::$kind
            }
        }
    };
}

macro_rules! signed_option_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(scalar_option_type!(
            $ty,
            $kind,
            |v| v.as_i64().and_then(|i| <$ty>::try_from(i).ok()),
            |s| OptionValue::Int(i64::from(s))
        );)*
    };
}

macro_rules! unsigned_option_type {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(scalar_option_type!(
            $ty,
            $kind,
            |v| v.as_u64().and_then(|u| <$ty>::try_from(u).ok()),
            |s| OptionValue::UInt(u64::from(s))
        );)*
    };
}

signed_option_type!(i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64);
unsigned_option_type!(u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64);
scalar_option_type!(bool, Bool, |v| v.as_bool(), |s| OptionValue::Bool(s));
scalar_option_type!(f64, Float, |v| v.as_f64(), |s| OptionValue::Float(s));
scalar_option_type!(
    String,
    Text,
    |v| v.as_str().map(str::to_string),
    |s| OptionValue::Text(s)
);
scalar_option_type!(
    Duration,
    Duration,
    |v| v.as_duration(),
    |s| OptionValue::Duration(s)
);
scalar_option_type!(
    DateTime<Utc>,
    Timestamp,
    |v| v.as_timestamp(),
    |s| OptionValue::Timestamp(s)
);

impl<T: ScalarOptionType> OptionType for Vec<T> {
    fn kind() -> OptionKind {
        OptionKind::List(T::scalar_kind())
    }

    fn from_value(value: &OptionValue) -> Option<Self> {
        value.as_list()?.iter().map(T::from_value).collect()
    }

    fn into_value(self) -> OptionValue {
        OptionValue::List(self.into_iter().map(T::into_value).collect())
    }
}

/// 解析布尔字面量
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn json_to_i128(raw: &Value) -> Option<i128> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(i128::from(u))
            } else {
                // 仅接受整值浮点数
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f.abs() < 1e38).then(|| f as i128)
            }
        }
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}

static DURATION_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)?(?:ns|us|ms|s|m|h|d))+$").expect("duration pattern is valid")
});

static DURATION_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(ns|us|ms|s|m|h|d)").expect("duration pattern is valid")
});

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> u128 {
    match unit {
        "ns" => 1,
        "us" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        _ => 86_400 * NANOS_PER_SEC,
    }
}

/// 解析时长字面量
///
/// 支持 `ns`/`us`/`ms`/`s`/`m`/`h`/`d` 单位的组合（如 `1h30m`、`1.5s`），纯整数按秒处理
pub fn parse_duration(input: &str) -> Option<Duration> {
    let text = input.trim();
    if let Ok(secs) = text.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if !DURATION_FULL.is_match(text) {
        return None;
    }
    let mut total: u128 = 0;
    for caps in DURATION_PART.captures_iter(text) {
        let unit = unit_nanos(&caps[2]);
        let number = &caps[1];
        let nanos = if number.contains('.') {
            let value = number.parse::<f64>().ok()?;
            (value * unit as f64).round() as u128
        } else {
            number.parse::<u128>().ok()?.checked_mul(unit)?
        };
        total = total.checked_add(nanos)?;
    }
    let secs = u64::try_from(total / NANOS_PER_SEC).ok()?;
    let subsec = u32::try_from(total % NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, subsec))
}

/// 将时长格式化为可被 [`parse_duration`] 解析的字面量
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    let mut remaining = duration.as_nanos();
    let mut out = String::new();
    for unit in ["h", "m", "s", "ms", "us", "ns"] {
        let size = unit_nanos(unit);
        let count = remaining / size;
        if count > 0 {
            out.push_str(&format!("{count}{unit}"));
            remaining %= size;
        }
    }
    out
}
