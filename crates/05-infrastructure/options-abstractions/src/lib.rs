//! # Options Abstractions
//!
//! 选项注册中心的抽象层，定义值模型与外部协作者的契约。
//!
//! ## 核心接口
//!
//! - [`OptionKind`] / [`OptionValue`] - 声明类型与已类型化的值
//! - [`ConfigSource`] - 配置源接口（`pre` / `parse` / `post` + 优先级）
//! - [`SourceContext`] - 加载期间配置源回调注册中心的接口
//! - [`Decoder`] - 文件格式解码接口
//! - [`ConfigEventListener`] - 配置变更监听接口

pub mod decoder;
pub mod events;
pub mod source;
pub mod value;
pub mod watcher;

pub use decoder::*;
pub use events::*;
pub use source::*;
pub use value::*;
pub use watcher::*;
