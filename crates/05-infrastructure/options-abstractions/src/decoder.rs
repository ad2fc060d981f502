//! 配置解码器抽象接口

use options_common::ConfigResult;
use serde_json::{Map, Value};

/// 配置解码器 trait
///
/// 把原始字节解码为嵌套映射，供文件类配置源统一处理 JSON/TOML/YAML 等格式；
/// 嵌套的键按注册中心的分组路径约定映射到嵌套分组
pub trait Decoder: Send + Sync {
    /// 获取格式名称
    fn name(&self) -> &str;

    /// 支持的文件扩展名
    fn extensions(&self) -> &[&str];

    /// 解码原始字节
    fn decode(&self, bytes: &[u8]) -> ConfigResult<Map<String, Value>>;
}
