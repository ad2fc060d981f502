//! 内置配置源
//!
//! 默认优先级：内存 0、JSON 文件 90、YAML 文件 95、TOML 文件 100、环境变量 200、命令行 300

pub mod cli;
pub mod environment;
pub mod file;
pub mod memory;

pub use cli::*;
pub use environment::*;
pub use file::*;
pub use memory::*;
