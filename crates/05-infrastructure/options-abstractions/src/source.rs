//! 配置源抽象接口

use crate::value::{OptionKind, OptionValue, RawValue};
use options_common::ConfigResult;
use serde_json::{Map, Value};

/// 选项描述符
///
/// 配置源在 `pre` 阶段据此决定需要绑定哪些命令行参数、环境变量
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    /// 所在分组全名（根分组为空）
    pub group: String,
    /// 选项名
    pub name: String,
    /// 选项全名
    pub full_name: String,
    /// 声明类型
    pub kind: OptionKind,
    /// 帮助文本
    pub help: String,
    /// 默认值
    pub default: OptionValue,
    /// 是否暴露为命令行参数
    pub cli: bool,
    /// 是否暴露为环境变量
    pub env: bool,
    /// 命令行短参数
    pub short: Option<char>,
}

/// 加载上下文
///
/// 由注册中心在一次加载期间提供给每个配置源
pub trait SourceContext {
    /// 分组分隔符
    fn separator(&self) -> &str;

    /// 当前已注册的全部选项
    fn options(&self) -> Vec<OptionDescriptor>;

    /// 暂存一个（分组, 选项, 原始值）三元组，提交在所有配置源执行完成后进行
    ///
    /// 分组或选项不存在时按注册中心的未知键策略处理：默认记录警告并忽略，严格模式下计入加载错误
    fn stage(&mut self, group: &str, option: &str, raw: RawValue) -> ConfigResult<()>;

    /// 暂存一棵嵌套映射，嵌套键对应嵌套分组，返回成功暂存的选项数量
    fn stage_tree(&mut self, tree: &Map<String, Value>) -> ConfigResult<usize>;
}

/// 配置源 trait
///
/// 注册中心按优先级从低到高依次调用每个配置源的 `pre`、`parse`、`post`；
/// 同一选项被多个配置源设置时，优先级高（数值大）的配置源胜出，
/// 优先级相同时后注册者胜出
pub trait ConfigSource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置源优先级
    fn priority(&self) -> i32 {
        0
    }

    /// 预处理，例如根据已注册选项构建命令行解析器
    fn pre(&mut self, _ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        Ok(())
    }

    /// 解析并暂存配置值
    fn parse(&mut self, ctx: &mut dyn SourceContext) -> ConfigResult<()>;

    /// 收尾清理
    fn post(&mut self, _ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSource")
            .field("name", &self.name())
            .field("priority", &self.priority())
            .finish()
    }
}
