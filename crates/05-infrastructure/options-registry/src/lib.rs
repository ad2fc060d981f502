//! # Options Registry
//!
//! 类型化、分层、线程安全的应用选项注册中心。
//!
//! ## 主要组件
//!
//! - [`ConfigRegistry`] - 注册中心，负责加载与快照
//! - [`OptionGroup`] - 选项分组树
//! - [`ConfigOption`] - 选项及其构建器
//! - [`TypedField`] - 类型化存储单元
//! - [`MemorySource`] / [`EnvironmentSource`] / [`FileSource`] / [`CliSource`] - 内置配置源
//! - [`ConfigFileWatcher`] - 配置文件热重载

mod commit;
pub mod decoders;
pub mod field;
pub mod group;
pub mod option;
pub mod providers;
pub mod registry;
pub mod snapshot;
pub mod watcher;

#[cfg(test)]
mod tests;

pub use decoders::*;
pub use field::*;
pub use group::*;
pub use option::*;
pub use providers::*;
pub use registry::*;
pub use snapshot::*;
pub use watcher::*;
