//! 文件配置源

use crate::decoders::decoder_for_path;
use options_abstractions::{ConfigSource, Decoder, SourceContext};
use options_common::{ConfigError, ConfigResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// 文件配置源
///
/// 每次加载都重新读取文件；可选文件不存在时不暂存任何值
pub struct FileSource {
    name: String,
    path: PathBuf,
    decoder: Box<dyn Decoder>,
    required: bool,
    priority: i32,
    last_modified: Option<SystemTime>,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("format", &self.decoder.name())
            .field("required", &self.required)
            .field("priority", &self.priority)
            .finish()
    }
}

impl FileSource {
    /// 按扩展名选择解码器创建文件配置源
    pub fn new<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let decoder = decoder_for_path(path.as_ref())?;
        Ok(Self::with_decoder(path, decoder))
    }

    /// 使用指定解码器创建文件配置源
    pub fn with_decoder<P: AsRef<Path>>(path: P, decoder: Box<dyn Decoder>) -> Self {
        let path = path.as_ref().to_path_buf();
        let priority = match decoder.name() {
            "toml" => 100,
            "yaml" => 95,
            "json" => 90,
            _ => 50,
        };
        Self {
            name: format!("file:{}", path.display()),
            path,
            decoder,
            required: false,
            priority,
            last_modified: None,
        }
    }

    /// 设置文件是否必须存在
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 设置配置源名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 最近一次加载时文件的修改时间
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn parse(&mut self, ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound && !self.required => {
                debug!("可选配置文件不存在，跳过: {}", self.path.display());
                return Ok(());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        self.last_modified = std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok();
        let tree = self.decoder.decode(&bytes)?;
        let staged = ctx.stage_tree(&tree)?;
        info!(
            "加载{}配置文件: {} (暂存 {} 个选项)",
            self.decoder.name(),
            self.path.display(),
            staged
        );
        Ok(())
    }
}
