//! 内置配置解码器

use options_abstractions::Decoder;
use options_common::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::path::Path;

/// JSON 解码器
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

/// TOML 解码器
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlDecoder;

/// YAML 解码器
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlDecoder;

fn decode_error(format: &str, message: impl std::fmt::Display) -> ConfigError {
    ConfigError::Decode {
        format: format.to_string(),
        message: message.to_string(),
    }
}

/// 顶层必须是映射；空文档视为空映射
fn into_table(format: &str, value: Value) -> ConfigResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(decode_error(
            format,
            format!("顶层必须是键值映射，实际为 {other}"),
        )),
    }
}

impl Decoder for JsonDecoder {
    fn name(&self) -> &str {
        "json"
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn decode(&self, bytes: &[u8]) -> ConfigResult<Map<String, Value>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| decode_error(self.name(), e))?;
        into_table(self.name(), value)
    }
}

impl TomlDecoder {
    fn toml_to_json(value: &toml::Value) -> Value {
        match value {
            toml::Value::String(s) => Value::String(s.clone()),
            toml::Value::Integer(i) => Value::from(*i),
            toml::Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(*b),
            toml::Value::Array(items) => {
                Value::Array(items.iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::toml_to_json(v)))
                    .collect(),
            ),
            // 日期时间按 RFC 3339 文本交给时间戳选项转换
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        }
    }
}

impl Decoder for TomlDecoder {
    fn name(&self) -> &str {
        "toml"
    }

    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn decode(&self, bytes: &[u8]) -> ConfigResult<Map<String, Value>> {
        let text = std::str::from_utf8(bytes).map_err(|e| decode_error(self.name(), e))?;
        let table: toml::Table = toml::from_str(text).map_err(|e| decode_error(self.name(), e))?;
        Ok(table
            .iter()
            .map(|(k, v)| (k.clone(), Self::toml_to_json(v)))
            .collect())
    }
}

impl Decoder for YamlDecoder {
    fn name(&self) -> &str {
        "yaml"
    }

    fn extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }

    fn decode(&self, bytes: &[u8]) -> ConfigResult<Map<String, Value>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        let value: Value =
            serde_yaml::from_slice(bytes).map_err(|e| decode_error(self.name(), e))?;
        into_table(self.name(), value)
    }
}

/// 内置解码器
pub fn builtin_decoders() -> Vec<Box<dyn Decoder>> {
    vec![
        Box::new(JsonDecoder),
        Box::new(TomlDecoder),
        Box::new(YamlDecoder),
    ]
}

/// 根据文件扩展名选择解码器
pub fn decoder_for_path(path: &Path) -> ConfigResult<Box<dyn Decoder>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    builtin_decoders()
        .into_iter()
        .find(|decoder| {
            decoder
                .extensions()
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .ok_or_else(|| {
            decode_error(
                extension,
                format!("不支持的配置文件格式: {}", path.display()),
            )
        })
}
