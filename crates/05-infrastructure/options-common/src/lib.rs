//! # Options Common
//!
//! 这个 crate 提供了 Lorn Options 各层共享的错误类型与命名约定。
//!
//! ## 核心组件
//!
//! - [`ConfigError`] - 统一的配置错误类型
//! - [`MultiError`] - 一次加载中收集到的多个选项错误
//! - [`naming`] - 选项/分组名称校验与全名拼接约定

pub mod errors;
pub mod naming;

pub use errors::*;
pub use naming::*;
